//! SQLite-backed response cache for the HTTP fetcher, keyed by resolved URL.
//! Access goes through an r2d2 pool so concurrent in-flight requests can
//! get/put safely.

use anyhow::{Context, Result};
use r2d2::Pool;
use r2d2_sqlite::{rusqlite::params, SqliteConnectionManager};
use std::path::Path;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CacheEntry {
	/// Unix timestamp after which the entry must be revalidated. `None`
	/// means always stale.
	pub expires: Option<i64>,
	pub last_modified: Option<i64>,
	pub etag: Option<String>,
	pub body: Vec<u8>,
}

impl CacheEntry {
	#[must_use]
	pub fn is_fresh(&self, now: i64) -> bool {
		self.expires.is_some_and(|expires| expires > now)
	}
}

#[derive(Clone)]
pub struct TileCache {
	pool: Pool<SqliteConnectionManager>,
}

impl TileCache {
	pub fn open(path: &Path) -> Result<TileCache> {
		let manager = SqliteConnectionManager::file(path);
		let pool = Pool::builder()
			.max_size(10)
			.build(manager)
			.context("failed to open cache database")?;

		pool
			.get()?
			.execute(
				"CREATE TABLE IF NOT EXISTS cache (url TEXT PRIMARY KEY, expires INTEGER, last_modified INTEGER, etag TEXT, body BLOB)",
				[],
			)
			.context("failed to create cache table")?;

		Ok(TileCache { pool })
	}

	pub fn get(&self, url: &str) -> Result<Option<CacheEntry>> {
		let conn = self.pool.get()?;
		let mut statement = conn.prepare("SELECT expires, last_modified, etag, body FROM cache WHERE url = ?1")?;
		let mut rows = statement.query(params![url])?;

		match rows.next()? {
			Some(row) => Ok(Some(CacheEntry {
				expires: row.get(0)?,
				last_modified: row.get(1)?,
				etag: row.get(2)?,
				body: row.get(3)?,
			})),
			None => Ok(None),
		}
	}

	pub fn put(&self, url: &str, entry: &CacheEntry) -> Result<()> {
		self.pool.get()?.execute(
			"INSERT OR REPLACE INTO cache (url, expires, last_modified, etag, body) VALUES (?1, ?2, ?3, ?4, ?5)",
			params![url, entry.expires, entry.last_modified, entry.etag, entry.body],
		)?;
		Ok(())
	}

	pub fn invalidate(&self, url: &str) -> Result<()> {
		self.pool.get()?.execute("DELETE FROM cache WHERE url = ?1", params![url])?;
		Ok(())
	}
}
