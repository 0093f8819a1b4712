//! [`Overzoom`] decorates another fetcher with zoom-level fallback: requests
//! beyond `max_zoom` are remapped to their max-zoom ancestor, and a missing
//! tile can be retried once at the coarser `mask_zoom` ancestor.

use crate::{FetchResponse, FetchStatus, Fetcher, TileRequest};
use async_trait::async_trait;

pub struct Overzoom {
	source: Box<dyn Fetcher>,
	max_zoom: u8,
	mask_zoom: Option<u8>,
}

impl Overzoom {
	#[must_use]
	pub fn new(source: Box<dyn Fetcher>, max_zoom: u8, mask_zoom: Option<u8>) -> Overzoom {
		Overzoom {
			source,
			max_zoom,
			mask_zoom,
		}
	}
}

#[async_trait]
impl Fetcher for Overzoom {
	async fn fetch(&self, request: &TileRequest) -> FetchResponse {
		let mut request = request.clone();

		if request.coord.level > self.max_zoom {
			// zoom "out" to max zoom, as we're guaranteed not to find any
			// tiles at z > max zoom
			request.coord = request.coord.as_level(self.max_zoom);
		}

		let response = self.source.fetch(&request).await;

		// if the tile isn't available, try again at the mask zoom level
		// (as long as that is zoomed out from here). the mask fetch only
		// starts once the primary result is known.
		if let (Err(FetchStatus::NotFound), Some(mask_zoom)) = (&response, self.mask_zoom) {
			if request.coord.level > mask_zoom {
				request.coord = request.coord.as_level(mask_zoom);
				return self.source.fetch(&request).await;
			}
		}

		response
	}
}
