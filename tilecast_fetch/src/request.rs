//! [`TileRequest`] identifies the tile to fetch plus the optional cache
//! validators of the copy the caller already holds.

use anyhow::Result;
use tilecast_core::TileCoord;
use time::OffsetDateTime;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TileRequest {
	pub coord: TileCoord,
	/// Sent as `If-None-Match` when present.
	pub etag: Option<String>,
	/// Sent as `If-Modified-Since` when present.
	pub if_modified_since: Option<OffsetDateTime>,
}

impl TileRequest {
	pub fn new(level: u8, x: u32, y: u32) -> Result<TileRequest> {
		Ok(TileRequest::with_coord(TileCoord::new(level, x, y)?))
	}

	#[must_use]
	pub fn with_coord(coord: TileCoord) -> TileRequest {
		TileRequest {
			coord,
			etag: None,
			if_modified_since: None,
		}
	}
}
