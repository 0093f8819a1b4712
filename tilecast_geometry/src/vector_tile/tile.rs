//! [`VectorTile`] is the top-level tile message: a list of named layers.

use super::layer::VectorTileLayer;
use anyhow::{bail, Context, Result};
use tilecast_core::{
	io::{ValueReader, ValueReaderSlice, ValueWriter, ValueWriterBlob},
	Blob,
};

#[derive(Clone, Debug, Default, PartialEq)]
pub struct VectorTile {
	pub layers: Vec<VectorTileLayer>,
}

impl VectorTile {
	#[must_use]
	pub fn new(layers: Vec<VectorTileLayer>) -> VectorTile {
		VectorTile { layers }
	}

	/// Decodes a tile from its binary wire form. Malformed input is an
	/// error; no partial tile is returned.
	pub fn from_blob(blob: &Blob) -> Result<VectorTile> {
		let mut reader = ValueReaderSlice::new_le(blob.as_slice());

		let mut tile = VectorTile::default();
		while reader.has_remaining() {
			match reader.read_pbf_key().context("failed to read PBF key")? {
				(3, 2) => {
					tile.layers.push(
						VectorTileLayer::read(
							reader
								.get_pbf_sub_reader()
								.context("failed to get PBF sub-reader")?
								.as_mut(),
						)
						.context("failed to read VectorTileLayer")?,
					);
				}
				(f, w) => bail!("unexpected combination of field number ({f}) and wire type ({w})"),
			}
		}

		Ok(tile)
	}

	pub fn to_blob(&self) -> Result<Blob> {
		let mut writer = ValueWriterBlob::new_le();

		for layer in &self.layers {
			writer.write_pbf_key(3, 2).context("failed to write PBF key")?;
			writer
				.write_pbf_blob(&layer.to_blob().context("failed to convert VectorTileLayer to blob")?)
				.context("failed to write PBF blob")?;
		}

		Ok(writer.into_blob())
	}

	#[must_use]
	pub fn find_layer(&self, name: &str) -> Option<&VectorTileLayer> {
		self.layers.iter().find(|layer| layer.name == name)
	}

	pub fn find_layer_mut(&mut self, name: &str) -> Option<&mut VectorTileLayer> {
		self.layers.iter_mut().find(|layer| layer.name == name)
	}
}
