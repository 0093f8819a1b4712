//! The [`Fetcher`] trait is the sole extension point for new tile sources.

use crate::{FetchStatus, TileRequest};
use async_trait::async_trait;
use tilecast_geometry::vector_tile::VectorTile;

/// Outcome of a fetch: either a decoded tile (ownership transferred to the
/// caller) or a status. Exactly one variant is ever populated; failures
/// cross the async boundary as data, never as errors.
pub type FetchResponse = Result<VectorTile, FetchStatus>;

/// A source of tiles. Implementations are composed by decoration, e.g.
/// [`crate::Overzoom`] wraps another boxed `Fetcher`.
#[async_trait]
pub trait Fetcher: Send + Sync {
	async fn fetch(&self, request: &TileRequest) -> FetchResponse;
}
