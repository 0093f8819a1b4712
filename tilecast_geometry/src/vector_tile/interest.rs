//! Decides whether a layer is worth descending into when generating a tile
//! pyramid recursively. A layer whose single feature is an empty or
//! full-cover rectangle looks identical in all of its children, so the whole
//! subtree can be pruned.

use super::VectorTileLayer;
use anyhow::{bail, Context, Result};
use tilecast_core::io::{ValueReader, ValueReaderSlice};

/// Tracks up to two distinct coordinate values on one axis.
#[derive(Default)]
struct AxisValues {
	coords: [i64; 2],
	count: usize,
	overflow: bool,
}

impl AxisValues {
	fn add(&mut self, value: i64) {
		if self.coords[..self.count].contains(&value) {
			return;
		}
		if self.count < 2 {
			self.coords[self.count] = value;
			self.count += 1;
		} else {
			self.overflow = true;
		}
	}

	/// True when any seen value lies strictly inside (0, extent).
	fn inside(&self, extent: i64) -> bool {
		self.coords[..self.count].iter().any(|&c| c > 0 && c < extent)
	}
}

/// Returns whether the layer draws anything beyond an empty or full-cover
/// rectangle.
///
/// An empty layer is not interesting. A layer with more than one feature is
/// always interesting (no decoding needed). For a single feature the
/// geometry command stream is decoded; more than two distinct coordinate
/// values on either axis, or any value strictly inside the extent, makes the
/// layer interesting.
pub fn is_interesting(layer: &VectorTileLayer) -> Result<bool> {
	if layer.features.is_empty() {
		return Ok(false);
	}

	if layer.features.len() > 1 {
		return Ok(true);
	}

	let feature = &layer.features[0];
	let extent = i64::from(layer.extent);

	let mut reader = ValueReaderSlice::new_le(feature.geom_data.as_slice());
	let mut x = 0i64;
	let mut y = 0i64;
	let mut xm = AxisValues::default();
	let mut ym = AxisValues::default();

	while reader.has_remaining() {
		let value = reader.read_varint().context("failed to read geometry command")?;
		let command = value & 0x7;
		let count = value >> 3;

		match command {
			1 | 2 => {
				for _ in 0..count {
					x += reader.read_svarint().context("failed to read x coordinate")?;
					y += reader.read_svarint().context("failed to read y coordinate")?;
					xm.add(x);
					ym.add(y);
				}
			}
			// ClosePath returns to a vertex that was already counted
			7 => {}
			_ => bail!("unknown geometry command {command}"),
		}
	}

	if xm.overflow || ym.overflow {
		return Ok(true);
	}

	Ok(xm.inside(extent) || ym.inside(extent))
}
