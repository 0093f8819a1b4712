//! [`HttpFetcher`] retrieves tiles over HTTP from one or more URL patterns,
//! with conditional requests and an optional SQLite response cache.
//!
//! Patterns use `{z}`/`{x}`/`{y}` placeholders and are tried in order until
//! one succeeds; `NotModified` and `BadRequest` are terminal and stop the
//! scan. The cache is consulted before any network request is made: a fresh
//! entry short-circuits the network entirely, a stale one contributes its
//! validators for revalidation.

mod cache;
mod date;

use crate::{FetchResponse, FetchStatus, Fetcher, TileRequest};
use async_trait::async_trait;
use cache::{CacheEntry, TileCache};
use date::{format_http_date, parse_http_date};
use parking_lot::RwLock;
use reqwest::{
	header::{HeaderMap, CACHE_CONTROL, DATE, ETAG, EXPIRES, IF_MODIFIED_SINCE, IF_NONE_MATCH, LAST_MODIFIED},
	Client, StatusCode,
};
use std::{path::Path, time::Duration};
use tilecast_core::{Blob, TileCoord};
use tilecast_geometry::vector_tile::VectorTile;
use time::OffsetDateTime;

pub struct HttpFetcher {
	patterns: Vec<String>,
	client: Client,
	cache: RwLock<Option<TileCache>>,
}

impl HttpFetcher {
	/// Builds a fetcher for the positional URL layout
	/// `{base}/{z}/{x}/{y}.{ext}`.
	pub fn new(base_url: &str, ext: &str) -> anyhow::Result<HttpFetcher> {
		HttpFetcher::with_patterns(vec![format!("{base_url}/{{z}}/{{x}}/{{y}}.{ext}")])
	}

	/// Builds a fetcher trying the given URL patterns in order.
	pub fn with_patterns(patterns: Vec<String>) -> anyhow::Result<HttpFetcher> {
		anyhow::ensure!(!patterns.is_empty(), "no URL patterns in fetcher");

		let client = Client::builder()
			.tcp_keepalive(Duration::from_secs(600))
			.use_rustls_tls()
			.build()?;

		Ok(HttpFetcher {
			patterns,
			client,
			cache: RwLock::new(None),
		})
	}

	/// Turns on the on-disk response cache. Takes effect for subsequent
	/// fetches.
	pub fn enable_cache(&self, path: &Path) -> anyhow::Result<()> {
		let cache = TileCache::open(path)?;
		*self.cache.write() = Some(cache);
		Ok(())
	}

	/// Turns the cache off immediately; subsequent fetches re-hit the
	/// network even when an entry exists.
	pub fn disable_cache(&self) {
		*self.cache.write() = None;
	}

	async fn fetch_one(&self, url: &str, request: &TileRequest, cache: Option<&TileCache>) -> FetchResponse {
		let now = OffsetDateTime::now_utc().unix_timestamp();

		let cached = cache.and_then(|cache| {
			cache.get(url).unwrap_or_else(|error| {
				log::warn!("cache lookup for '{url}' failed: {error:#}");
				None
			})
		});

		// a fresh cache entry skips the network entirely
		if let Some(entry) = &cached {
			if entry.is_fresh(now) {
				return decode_tile(&entry.body);
			}
		}

		let mut builder = self.client.get(url);
		let caller_validators = request.etag.is_some() || request.if_modified_since.is_some();

		if caller_validators {
			if let Some(etag) = &request.etag {
				builder = builder.header(IF_NONE_MATCH, etag);
			}
			if let Some(since) = request.if_modified_since {
				if let Ok(text) = format_http_date(since) {
					builder = builder.header(IF_MODIFIED_SINCE, text);
				}
			}
		} else if let Some(entry) = &cached {
			// revalidate a stale entry with its own validators
			if let Some(etag) = &entry.etag {
				builder = builder.header(IF_NONE_MATCH, etag);
			}
			if let Some(since) = entry
				.last_modified
				.and_then(|ts| OffsetDateTime::from_unix_timestamp(ts).ok())
			{
				if let Ok(text) = format_http_date(since) {
					builder = builder.header(IF_MODIFIED_SINCE, text);
				}
			}
		}

		let response = match builder.send().await {
			Ok(response) => response,
			Err(error) => {
				log::warn!("GET '{url}' failed: {error}");
				return Err(FetchStatus::ServerError);
			}
		};

		match response.status() {
			StatusCode::OK => {
				let meta = ResponseMeta::from_headers(response.headers());
				let bytes = match response.bytes().await {
					Ok(bytes) => bytes,
					Err(error) => {
						log::warn!("reading body of '{url}' failed: {error}");
						return Err(FetchStatus::ServerError);
					}
				};

				let tile = decode_tile(&bytes)?;

				if let Some(cache) = cache {
					let entry = CacheEntry {
						expires: meta.normalized_expires(now),
						last_modified: meta.last_modified.map(OffsetDateTime::unix_timestamp),
						etag: meta.etag,
						body: bytes.to_vec(),
					};
					if let Err(error) = cache.put(url, &entry) {
						log::warn!("cache write for '{url}' failed: {error:#}");
					}
				}

				Ok(tile)
			}

			StatusCode::NOT_MODIFIED => {
				if caller_validators {
					// the caller's copy is still valid
					return Err(FetchStatus::NotModified);
				}

				match (cache, cached) {
					(Some(cache), Some(entry)) => {
						// the cached body is still valid; refresh its expiry
						let meta = ResponseMeta::from_headers(response.headers());
						let refreshed = CacheEntry {
							expires: meta.normalized_expires(now),
							..entry
						};
						if let Err(error) = cache.put(url, &refreshed) {
							log::warn!("cache refresh for '{url}' failed: {error:#}");
						}
						decode_tile(&refreshed.body)
					}
					_ => Err(FetchStatus::NotModified),
				}
			}

			StatusCode::BAD_REQUEST => Err(FetchStatus::BadRequest),
			StatusCode::NOT_FOUND => Err(FetchStatus::NotFound),
			StatusCode::NOT_IMPLEMENTED => Err(FetchStatus::NotImplemented),
			status => {
				log::warn!("GET '{url}' returned unexpected status {status}");
				Err(FetchStatus::ServerError)
			}
		}
	}
}

#[async_trait]
impl Fetcher for HttpFetcher {
	async fn fetch(&self, request: &TileRequest) -> FetchResponse {
		if !request.coord.is_valid() {
			return Err(FetchStatus::BadRequest);
		}

		// clone the handle so the slot is not locked across the request
		let cache = self.cache.read().clone();

		let mut last_failure = FetchStatus::NotFound;
		for pattern in &self.patterns {
			let url = url_for(pattern, &request.coord);
			match self.fetch_one(&url, request, cache.as_ref()).await {
				Ok(tile) => return Ok(tile),
				Err(status @ (FetchStatus::NotModified | FetchStatus::BadRequest)) => return Err(status),
				Err(status) => last_failure = status,
			}
		}

		Err(last_failure)
	}
}

fn url_for(pattern: &str, coord: &TileCoord) -> String {
	pattern
		.replace("{z}", &coord.level.to_string())
		.replace("{x}", &coord.x.to_string())
		.replace("{y}", &coord.y.to_string())
}

fn decode_tile(bytes: &[u8]) -> FetchResponse {
	match VectorTile::from_blob(&Blob::from(bytes)) {
		Ok(tile) => Ok(tile),
		Err(error) => {
			log::warn!("failed to decode fetched tile: {error:#}");
			Err(FetchStatus::ServerError)
		}
	}
}

struct ResponseMeta {
	base_date: Option<OffsetDateTime>,
	expires: Option<OffsetDateTime>,
	last_modified: Option<OffsetDateTime>,
	etag: Option<String>,
	max_age: Option<i64>,
}

impl ResponseMeta {
	fn from_headers(headers: &HeaderMap) -> ResponseMeta {
		let text = |name| headers.get(name).and_then(|value| value.to_str().ok());

		let max_age = text(CACHE_CONTROL).and_then(|value| {
			value.split(',').find_map(|directive| {
				directive
					.trim()
					.strip_prefix("max-age=")
					.and_then(|age| age.trim().parse::<i64>().ok())
			})
		});

		ResponseMeta {
			base_date: text(DATE).and_then(parse_http_date),
			expires: text(EXPIRES).and_then(parse_http_date),
			last_modified: text(LAST_MODIFIED).and_then(parse_http_date),
			etag: text(ETAG).map(str::to_string),
			max_age,
		}
	}

	/// Collapses `Cache-Control: max-age` and `Expires`/`Date` into a single
	/// absolute expiry timestamp. No expiry means always stale.
	fn normalized_expires(&self, now: i64) -> Option<i64> {
		if let Some(max_age) = self.max_age {
			Some(now + max_age)
		} else if let (Some(expires), Some(date)) = (self.expires, self.base_date) {
			Some(now + (expires.unix_timestamp() - date.unix_timestamp()))
		} else {
			None
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use axum::{
		extract::State,
		http::{header, HeaderMap as AxumHeaderMap, StatusCode as AxumStatus},
		response::IntoResponse,
		routing::get,
		Router,
	};
	use pretty_assertions::assert_eq;
	use std::sync::{
		atomic::{AtomicUsize, Ordering},
		Arc,
	};
	use tilecast_geometry::{GeoFeature, Geometry};
	use tilecast_geometry::vector_tile::VectorTileLayer;

	fn tile_bytes() -> Vec<u8> {
		let mut feature = GeoFeature::new(Geometry::new_point([12.0, 34.0]));
		feature.set_property("kind", "poi");
		let layer = VectorTileLayer::from_features("poi".to_string(), vec![feature], 4096, 1).unwrap();
		VectorTile::new(vec![layer]).to_blob().unwrap().into_vec()
	}

	async fn serve(app: Router) -> String {
		let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
		let addr = listener.local_addr().unwrap();
		tokio::spawn(async move {
			axum::serve(listener, app).await.unwrap();
		});
		format!("http://{addr}")
	}

	#[derive(Clone, Default)]
	struct Hits(Arc<AtomicUsize>);

	impl Hits {
		fn count(&self) -> usize {
			self.0.load(Ordering::SeqCst)
		}
	}

	fn test_app(hits: Hits) -> Router {
		Router::new()
			.route(
				"/tiles/:z/:x/:y",
				get(|State(hits): State<Hits>| async move {
					hits.0.fetch_add(1, Ordering::SeqCst);
					tile_bytes()
				}),
			)
			.route(
				"/cached/:z/:x/:y",
				get(|State(hits): State<Hits>| async move {
					hits.0.fetch_add(1, Ordering::SeqCst);
					([(header::CACHE_CONTROL, "max-age=60")], tile_bytes())
				}),
			)
			.route(
				"/revalidate/:z/:x/:y",
				get(|State(hits): State<Hits>, headers: AxumHeaderMap| async move {
					hits.0.fetch_add(1, Ordering::SeqCst);
					if headers.get(header::IF_NONE_MATCH).is_some_and(|v| v == "\"v1\"") {
						AxumStatus::NOT_MODIFIED.into_response()
					} else {
						([(header::ETAG, "\"v1\"")], tile_bytes()).into_response()
					}
				}),
			)
			.route("/garbage/:z/:x/:y", get(|| async { vec![0xFFu8, 0x00] }))
			.route("/s400/:z/:x/:y", get(|| async { AxumStatus::BAD_REQUEST }))
			.route("/s404/:z/:x/:y", get(|| async { AxumStatus::NOT_FOUND }))
			.route("/s501/:z/:x/:y", get(|| async { AxumStatus::NOT_IMPLEMENTED }))
			.route("/s503/:z/:x/:y", get(|| async { AxumStatus::SERVICE_UNAVAILABLE }))
			.with_state(hits)
	}

	fn pattern(base: &str, prefix: &str) -> String {
		format!("{base}/{prefix}/{{z}}/{{x}}/{{y}}")
	}

	#[test]
	fn url_for_substitutes_placeholders() {
		let coord = TileCoord::new(3, 1, 2).unwrap();
		assert_eq!(
			url_for("http://host/{z}/{x}/{y}.mvt", &coord),
			"http://host/3/1/2.mvt"
		);
	}

	#[test]
	fn new_builds_the_positional_pattern() {
		let fetcher = HttpFetcher::new("http://host/base", "mvt").unwrap();
		assert_eq!(fetcher.patterns, vec!["http://host/base/{z}/{x}/{y}.mvt"]);
	}

	#[test]
	fn empty_pattern_list_is_an_error() {
		assert!(HttpFetcher::with_patterns(vec![]).is_err());
	}

	#[tokio::test]
	async fn fetch_decodes_a_tile() {
		let base = serve(test_app(Hits::default())).await;
		let fetcher = HttpFetcher::with_patterns(vec![pattern(&base, "tiles")]).unwrap();

		let tile = fetcher.fetch(&TileRequest::new(3, 1, 2).unwrap()).await.unwrap();
		assert!(tile.find_layer("poi").is_some());
	}

	#[tokio::test]
	async fn http_statuses_map_to_fetch_statuses() {
		let base = serve(test_app(Hits::default())).await;
		let request = TileRequest::new(3, 1, 2).unwrap();

		for (prefix, expected) in [
			("s400", FetchStatus::BadRequest),
			("s404", FetchStatus::NotFound),
			("s501", FetchStatus::NotImplemented),
			("s503", FetchStatus::ServerError),
		] {
			let fetcher = HttpFetcher::with_patterns(vec![pattern(&base, prefix)]).unwrap();
			assert_eq!(fetcher.fetch(&request).await, Err(expected), "{prefix}");
		}
	}

	#[tokio::test]
	async fn undecodable_body_is_a_server_error() {
		let base = serve(test_app(Hits::default())).await;
		let fetcher = HttpFetcher::with_patterns(vec![pattern(&base, "garbage")]).unwrap();

		let response = fetcher.fetch(&TileRequest::new(3, 1, 2).unwrap()).await;
		assert_eq!(response, Err(FetchStatus::ServerError));
	}

	#[tokio::test]
	async fn transport_errors_are_server_errors() {
		// nothing listens on port 1
		let fetcher = HttpFetcher::with_patterns(vec!["http://127.0.0.1:1/{z}/{x}/{y}".to_string()]).unwrap();

		let response = fetcher.fetch(&TileRequest::new(3, 1, 2).unwrap()).await;
		assert_eq!(response, Err(FetchStatus::ServerError));
	}

	#[tokio::test]
	async fn out_of_range_coordinates_are_a_bad_request() {
		let fetcher = HttpFetcher::with_patterns(vec!["http://127.0.0.1:1/{z}/{x}/{y}".to_string()]).unwrap();

		let request = TileRequest::with_coord(TileCoord { level: 2, x: 4, y: 0 });
		assert_eq!(fetcher.fetch(&request).await, Err(FetchStatus::BadRequest));
	}

	#[tokio::test]
	async fn later_patterns_are_tried_after_a_not_found() {
		let base = serve(test_app(Hits::default())).await;
		let fetcher =
			HttpFetcher::with_patterns(vec![pattern(&base, "s404"), pattern(&base, "tiles")]).unwrap();

		assert!(fetcher.fetch(&TileRequest::new(3, 1, 2).unwrap()).await.is_ok());
	}

	#[tokio::test]
	async fn caller_validators_yield_not_modified() {
		let base = serve(test_app(Hits::default())).await;
		let fetcher = HttpFetcher::with_patterns(vec![pattern(&base, "revalidate")]).unwrap();

		let mut request = TileRequest::new(3, 1, 2).unwrap();
		request.etag = Some("\"v1\"".to_string());
		assert_eq!(fetcher.fetch(&request).await, Err(FetchStatus::NotModified));
	}

	#[tokio::test]
	async fn fresh_cache_entries_skip_the_network() {
		let hits = Hits::default();
		let base = serve(test_app(hits.clone())).await;
		let dir = tempfile::tempdir().unwrap();

		let fetcher = HttpFetcher::with_patterns(vec![pattern(&base, "cached")]).unwrap();
		fetcher.enable_cache(&dir.path().join("cache.db")).unwrap();

		let request = TileRequest::new(3, 1, 2).unwrap();
		assert!(fetcher.fetch(&request).await.is_ok());
		assert_eq!(hits.count(), 1);

		// served from the cache, no second network hit
		assert!(fetcher.fetch(&request).await.is_ok());
		assert_eq!(hits.count(), 1);

		// disabling takes effect immediately
		fetcher.disable_cache();
		assert!(fetcher.fetch(&request).await.is_ok());
		assert_eq!(hits.count(), 2);
	}

	#[tokio::test]
	async fn stale_entries_revalidate_and_serve_the_cached_body() {
		let hits = Hits::default();
		let base = serve(test_app(hits.clone())).await;
		let dir = tempfile::tempdir().unwrap();

		let fetcher = HttpFetcher::with_patterns(vec![pattern(&base, "revalidate")]).unwrap();
		fetcher.enable_cache(&dir.path().join("cache.db")).unwrap();

		let request = TileRequest::new(3, 1, 2).unwrap();
		assert!(fetcher.fetch(&request).await.is_ok());
		assert_eq!(hits.count(), 1);

		// the entry has no expiry, so the second fetch revalidates; the
		// server answers 304 and the cached body is served
		let tile = fetcher.fetch(&request).await.unwrap();
		assert!(tile.find_layer("poi").is_some());
		assert_eq!(hits.count(), 2);
	}
}
