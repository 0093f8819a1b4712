//! Tile retrieval for the tilecast workspace.
//!
//! A [`Fetcher`] resolves a [`TileRequest`] to either a decoded tile or a
//! [`FetchStatus`]. The concrete fetchers are [`HttpFetcher`] (URL patterns,
//! conditional requests, optional SQLite response cache) and [`Overzoom`]
//! (zoom-level fallback wrapping another fetcher). [`fetch_tilejson`] and
//! [`build_fetcher`] compose the two from a TileJSON manifest.

mod fetcher;
mod http;
mod overzoom;
mod request;
mod status;
mod tilejson;

pub use fetcher::{FetchResponse, Fetcher};
pub use http::HttpFetcher;
pub use overzoom::Overzoom;
pub use request::TileRequest;
pub use status::FetchStatus;
pub use tilejson::{build_fetcher, fetch_tilejson, fetcher_from_uri, TileJson};
