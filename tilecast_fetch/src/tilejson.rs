//! TileJSON manifest handling: fetch and parse the small JSON document
//! describing a tile source, and compose the fetcher chain
//! `Overzoom(Http(tiles), maxzoom, maskLevel)` from it.

use crate::{Fetcher, HttpFetcher, Overzoom};
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::Path;

fn default_maxzoom() -> u8 {
	22
}

/// The subset of a TileJSON manifest this crate consumes.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct TileJson {
	/// Ordered URL template list; the only required key.
	pub tiles: Vec<String>,
	#[serde(default)]
	pub minzoom: Option<u8>,
	#[serde(default = "default_maxzoom")]
	pub maxzoom: u8,
	#[serde(default, rename = "maskLevel")]
	pub mask_level: Option<u8>,
}

impl TileJson {
	pub fn parse(text: &str) -> Result<TileJson> {
		serde_json::from_str(text).context("failed to parse TileJSON")
	}
}

/// Fetches and parses a TileJSON manifest. `http(s)` URIs go over the
/// network, where any non-success status is an error; `file:` URIs and bare
/// paths are read from disk, which has no status to check at all.
pub async fn fetch_tilejson(uri: &str) -> Result<TileJson> {
	let text = if uri.starts_with("http://") || uri.starts_with("https://") {
		let response = reqwest::get(uri).await.with_context(|| format!("failed to fetch TileJSON '{uri}'"))?;
		let status = response.status();
		if !status.is_success() {
			bail!("unable to fetch TileJSON '{uri}': HTTP status {status}");
		}
		response.text().await.context("failed to read TileJSON body")?
	} else {
		let path = uri.strip_prefix("file://").or_else(|| uri.strip_prefix("file:")).unwrap_or(uri);
		tokio::fs::read_to_string(Path::new(path))
			.await
			.with_context(|| format!("failed to read TileJSON '{path}'"))?
	};

	TileJson::parse(&text)
}

/// Composes the fetcher chain a manifest describes.
pub fn build_fetcher(tilejson: &TileJson) -> Result<Box<dyn Fetcher>> {
	let http = HttpFetcher::with_patterns(tilejson.tiles.clone())?;
	Ok(Box::new(Overzoom::new(
		Box::new(http),
		tilejson.maxzoom,
		tilejson.mask_level,
	)))
}

/// Fetches a manifest and composes its fetcher chain in one step.
pub async fn fetcher_from_uri(uri: &str) -> Result<Box<dyn Fetcher>> {
	build_fetcher(&fetch_tilejson(uri).await?)
}
