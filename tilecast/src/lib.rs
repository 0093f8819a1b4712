//! # Tilecast
//!
//! Tilecast is a Rust toolbox for fetching, analyzing and post-processing
//! vector map tiles.
//!
//! ## Features
//! - **Codec**: encode and decode the compact binary tile format.
//! - **Fetch**: resolve tiles over HTTP with conditional caching and
//!   overzoom fallback, composed from a TileJSON manifest.
//! - **Post-process**: run configuration-driven transformation chains over
//!   a tile's layers before re-encoding.
//!
//! ## Usage Example
//!
//! ```no_run
//! use tilecast::{fetch::TileRequest, TileService};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let service = TileService::from_tilejson("https://tiles.example.com/source.json").await?;
//!     service.load_config(r#"{ "roads": [ { "minzoom": 0, "maxzoom": 22, "process": [
//!         { "type": "generalizer", "tolerance": 2.0 }
//!     ] } ] }"#)?;
//!
//!     match service.tile(&TileRequest::new(12, 2200, 1343)?).await {
//!         Ok(blob) => println!("got {} bytes", blob.len()),
//!         Err(status) => println!("no tile: {status}"),
//!     }
//!     Ok(())
//! }
//! ```

mod service;

pub use service::TileService;

pub use tilecast_core as core;
pub use tilecast_fetch as fetch;
pub use tilecast_geometry as geometry;
pub use tilecast_pipeline as pipeline;
