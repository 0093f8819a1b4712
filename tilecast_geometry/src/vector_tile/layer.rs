//! [`VectorTileLayer`] is one named layer of a tile: a feature list plus the
//! key/value property tables the features reference by index.
//!
//! Wire format fields:
//!  * field 1: `name` (string)
//!  * field 2: repeated `feature` (embedded message)
//!  * field 3: repeated `keys` (string)
//!  * field 4: repeated `values` (embedded message)
//!  * field 5: `extent` (varint, default 4096)
//!  * field 15: `version` (varint, default 1)

use super::{feature::VectorTileFeature, property_manager::PropertyManager, value::GeoValuePbf};
use crate::{GeoFeature, GeoProperties, GeoValue};
use anyhow::{anyhow, bail, Context, Result};
use byteorder::LE;
use tilecast_core::{
	io::{ValueReader, ValueWriter, ValueWriterBlob},
	Blob,
};

#[derive(Clone, Debug, Default, PartialEq)]
pub struct VectorTileLayer {
	/// Tile coordinate extent used to quantize geometry (default 4096).
	pub extent: u32,
	pub features: Vec<VectorTileFeature>,
	pub name: String,
	/// Key/value tables shared by all features in this layer.
	pub property_manager: PropertyManager,
	pub version: u32,
}

impl VectorTileLayer {
	#[must_use]
	pub fn new(name: String, extent: u32, version: u32) -> VectorTileLayer {
		VectorTileLayer {
			extent,
			features: vec![],
			name,
			property_manager: PropertyManager::default(),
			version,
		}
	}

	/// Convenience constructor using the defaults `extent = 4096`, `version = 1`.
	#[must_use]
	pub fn new_standard(name: &str) -> VectorTileLayer {
		VectorTileLayer::new(name.to_string(), 4096, 1)
	}

	pub fn read(reader: &mut dyn ValueReader<'_, LE>) -> Result<VectorTileLayer> {
		let mut extent = 4096;
		let mut features: Vec<VectorTileFeature> = Vec::new();
		let mut name = None;
		let mut property_manager = PropertyManager::new();
		let mut version = 1;

		while reader.has_remaining() {
			match reader.read_pbf_key().context("failed to read PBF key")? {
				(1, 2) => name = Some(reader.read_pbf_string().context("failed to read layer name")?),
				(2, 2) => features.push(
					VectorTileFeature::read(
						reader
							.get_pbf_sub_reader()
							.context("failed to get PBF sub-reader for feature")?
							.as_mut(),
					)
					.context("failed to read VectorTileFeature")?,
				),
				(3, 2) => {
					property_manager.add_key(reader.read_pbf_string().context("failed to read property key")?);
				}
				(4, 2) => {
					property_manager.add_value(
						GeoValue::read(
							reader
								.get_pbf_sub_reader()
								.context("failed to get PBF sub-reader for property value")?
								.as_mut(),
						)
						.context("failed to read GeoValue")?,
					);
				}
				(5, 0) => extent = u32::try_from(reader.read_varint().context("failed to read extent")?)?,
				(15, 0) => version = u32::try_from(reader.read_varint().context("failed to read version")?)?,
				(f, w) => bail!("unexpected combination of field number ({f}) and wire type ({w})"),
			}
		}

		Ok(VectorTileLayer {
			extent,
			features,
			name: name.ok_or(anyhow!("layer name is required"))?,
			property_manager,
			version,
		})
	}

	pub fn to_blob(&self) -> Result<Blob> {
		let mut writer = ValueWriterBlob::new_le();

		writer
			.write_pbf_key(1, 2)
			.context("failed to write PBF key for layer name")?;
		writer.write_pbf_string(&self.name).context("failed to write layer name")?;

		for feature in &self.features {
			writer.write_pbf_key(2, 2).context("failed to write PBF key for feature")?;
			writer
				.write_pbf_blob(&feature.to_blob().context("failed to convert feature to blob")?)
				.context("failed to write feature blob")?;
		}

		for key in self.property_manager.keys.iter() {
			writer
				.write_pbf_key(3, 2)
				.context("failed to write PBF key for property key")?;
			writer.write_pbf_string(key).context("failed to write property key")?;
		}

		for value in self.property_manager.values.iter() {
			writer
				.write_pbf_key(4, 2)
				.context("failed to write PBF key for property value")?;
			writer
				.write_pbf_blob(&value.to_blob().context("failed to convert property value to blob")?)
				.context("failed to write property value blob")?;
		}

		if self.extent != 4096 {
			writer.write_pbf_key(5, 0).context("failed to write PBF key for extent")?;
			writer.write_varint(u64::from(self.extent)).context("failed to write extent")?;
		}

		if self.version != 1 {
			writer.write_pbf_key(15, 0).context("failed to write PBF key for version")?;
			writer
				.write_varint(u64::from(self.version))
				.context("failed to write version")?;
		}

		Ok(writer.into_blob())
	}

	/// Converts all features into high-level [`GeoFeature`]s using this
	/// layer's property tables.
	pub fn to_features(&self) -> Result<Vec<GeoFeature>> {
		self
			.features
			.iter()
			.map(|feature| {
				feature
					.to_feature(self)
					.context("failed to convert VectorTileFeature to GeoFeature")
			})
			.collect()
	}

	/// Builds a layer from high-level [`GeoFeature`]s, aggregating their
	/// properties into fresh key/value tables.
	pub fn from_features(name: String, features: Vec<GeoFeature>, extent: u32, version: u32) -> Result<VectorTileLayer> {
		let mut property_manager = PropertyManager::new();

		let features = features
			.into_iter()
			.map(|feature| {
				VectorTileFeature::from_geometry(
					feature.id,
					property_manager.encode_tag_ids(feature.properties),
					feature.geometry,
				)
			})
			.collect::<Result<Vec<VectorTileFeature>>>()?;

		Ok(VectorTileLayer {
			extent,
			features,
			name,
			property_manager,
			version,
		})
	}

	/// Replaces this layer's feature list, rebuilding the property tables.
	/// Name, extent and version are kept.
	pub fn replace_features(&mut self, features: Vec<GeoFeature>) -> Result<()> {
		let rebuilt = VectorTileLayer::from_features(self.name.clone(), features, self.extent, self.version)?;
		self.features = rebuilt.features;
		self.property_manager = rebuilt.property_manager;
		Ok(())
	}

	/// Encodes a property map to `tag_ids`, growing this layer's property
	/// tables on first use.
	pub fn encode_tag_ids(&mut self, properties: GeoProperties) -> Vec<u32> {
		self.property_manager.encode_tag_ids(properties)
	}

	/// Decodes `tag_ids` back into a property map using this layer's
	/// property tables.
	pub fn decode_tag_ids(&self, tag_ids: &[u32]) -> Result<GeoProperties> {
		self.property_manager.decode_tag_ids(tag_ids)
	}
}
