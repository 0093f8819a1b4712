//! [`TileService`] is the request-to-tile decision pipeline: resolve the
//! request through the fetcher chain, post-process the tile at the request
//! zoom, encode it back to bytes.
//!
//! Fetch failures pass through as statuses; any internal processing or
//! encoding fault becomes a `ServerError`, so a serving layer can map the
//! outcome straight onto an HTTP response.

use anyhow::Result;
use std::sync::Arc;
use tilecast_core::Blob;
use tilecast_fetch::{fetcher_from_uri, FetchStatus, Fetcher, TileRequest};
use tilecast_pipeline::PostProcessor;

pub struct TileService {
	fetcher: Box<dyn Fetcher>,
	processor: Arc<PostProcessor>,
}

impl TileService {
	/// Builds a service over an existing fetcher chain, with an empty
	/// post-processing configuration.
	#[must_use]
	pub fn new(fetcher: Box<dyn Fetcher>) -> TileService {
		TileService::with_processor(fetcher, Arc::new(PostProcessor::new()))
	}

	#[must_use]
	pub fn with_processor(fetcher: Box<dyn Fetcher>, processor: Arc<PostProcessor>) -> TileService {
		TileService { fetcher, processor }
	}

	/// Builds a service from a TileJSON manifest URI, composing the
	/// overzoom-wrapped HTTP fetcher chain the manifest describes.
	pub async fn from_tilejson(uri: &str) -> Result<TileService> {
		Ok(TileService::new(fetcher_from_uri(uri).await?))
	}

	/// Loads a post-processing configuration, all-or-nothing. In-flight
	/// requests keep the previous configuration.
	pub fn load_config(&self, text: &str) -> Result<()> {
		self.processor.load_str(text)
	}

	#[must_use]
	pub fn processor(&self) -> &Arc<PostProcessor> {
		&self.processor
	}

	/// Resolves a request to encoded tile bytes.
	pub async fn tile(&self, request: &TileRequest) -> Result<Blob, FetchStatus> {
		let mut tile = self.fetcher.fetch(request).await?;

		if let Err(error) = self.processor.process_tile(&mut tile, request.coord.level) {
			log::warn!("post-processing {:?} failed: {error:#}", request.coord);
			return Err(FetchStatus::ServerError);
		}

		match tile.to_blob() {
			Ok(blob) => Ok(blob),
			Err(error) => {
				log::warn!("encoding {:?} failed: {error:#}", request.coord);
				Err(FetchStatus::ServerError)
			}
		}
	}
}
