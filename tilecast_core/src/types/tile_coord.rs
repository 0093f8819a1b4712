//! [`TileCoord`] addresses a single tile in a z/x/y tile pyramid.

use anyhow::{ensure, Result};
use std::fmt::{self, Debug};

#[derive(Eq, PartialEq, Clone, Hash, Copy)]
pub struct TileCoord {
	pub x: u32,
	pub y: u32,
	pub level: u8,
}

impl TileCoord {
	pub fn new(level: u8, x: u32, y: u32) -> Result<TileCoord> {
		ensure!(level <= 31, "level ({level}) must be <= 31");
		Ok(TileCoord { x, y, level })
	}

	/// Checks that x and y fit inside the pyramid at this level.
	#[must_use]
	pub fn is_valid(&self) -> bool {
		if self.level > 31 {
			return false;
		}
		let max = 2u32.pow(u32::from(self.level));
		(self.x < max) && (self.y < max)
	}

	/// Remaps this coordinate to another zoom level. Zooming out shifts x/y
	/// down to the covering ancestor tile, zooming in selects the top-left
	/// descendant.
	#[must_use]
	pub fn as_level(&self, level: u8) -> TileCoord {
		if level > self.level {
			let shift = level - self.level;
			TileCoord {
				x: self.x << shift,
				y: self.y << shift,
				level,
			}
		} else if level < self.level {
			let shift = self.level - level;
			TileCoord {
				x: self.x >> shift,
				y: self.y >> shift,
				level,
			}
		} else {
			*self
		}
	}
}

impl Debug for TileCoord {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_fmt(format_args!("TileCoord({}, [{}, {}])", &self.level, &self.x, &self.y))
	}
}

impl PartialOrd for TileCoord {
	fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
		Some(self.cmp(other))
	}
}

impl Ord for TileCoord {
	fn cmp(&self, other: &Self) -> std::cmp::Ordering {
		self
			.level
			.cmp(&other.level)
			.then_with(|| self.y.cmp(&other.y))
			.then_with(|| self.x.cmp(&other.x))
	}
}
