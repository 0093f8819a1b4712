//! [`VectorTileFeature`] is one feature in its compact wire form: tag index
//! pairs into the layer's property tables plus the raw geometry command
//! stream.

use super::{GeomType, VectorTileLayer};
use crate::{GeoFeature, Geometry};
use anyhow::{bail, ensure, Context, Result};
use byteorder::LE;
use geo_types::{MultiLineString, MultiPoint, MultiPolygon};
use log::trace;
use tilecast_core::{
	io::{ValueReader, ValueReaderSlice, ValueWriter, ValueWriterBlob},
	Blob,
};

/// Signed area of a closed ring; the sign distinguishes outer rings from
/// holes in the tile coordinate system (y grows downwards).
fn area_ring(ring: &[[f64; 2]]) -> f64 {
	let mut sum = 0f64;
	let mut p2 = ring.last().unwrap();
	for p1 in ring {
		sum += (p2[0] - p1[0]) * (p1[1] + p2[1]);
		p2 = p1;
	}
	sum
}

#[derive(Clone, Debug, PartialEq)]
pub struct VectorTileFeature {
	pub id: Option<u64>,
	pub tag_ids: Vec<u32>,
	pub geom_type: GeomType,
	pub geom_data: Blob,
}

impl Default for VectorTileFeature {
	fn default() -> Self {
		VectorTileFeature {
			id: None,
			tag_ids: Vec::new(),
			geom_type: GeomType::Unknown,
			geom_data: Blob::new_empty(),
		}
	}
}

impl VectorTileFeature {
	pub fn read(reader: &mut dyn ValueReader<'_, LE>) -> Result<VectorTileFeature> {
		let mut f = VectorTileFeature::default();

		while reader.has_remaining() {
			match reader.read_pbf_key().context("failed to read PBF key")? {
				(1, 0) => f.id = Some(reader.read_varint().context("failed to read feature id")?),
				(2, 2) => f.tag_ids = reader.read_pbf_packed_uint32().context("failed to read tag ids")?,
				(3, 0) => f.geom_type = GeomType::from(reader.read_varint().context("failed to read geometry type")?),
				(4, 2) => f.geom_data = reader.read_pbf_blob().context("failed to read geometry data")?,
				(f, w) => bail!("unexpected combination of field number ({f}) and wire type ({w})"),
			}
		}

		Ok(f)
	}

	pub fn to_blob(&self) -> Result<Blob> {
		let mut writer = ValueWriterBlob::new_le();

		if let Some(id) = self.id {
			writer.write_pbf_key(1, 0).context("failed to write PBF key for feature id")?;
			writer.write_varint(id).context("failed to write feature id")?;
		}

		if !self.tag_ids.is_empty() {
			writer.write_pbf_key(2, 2).context("failed to write PBF key for tag ids")?;
			writer
				.write_pbf_packed_uint32(&self.tag_ids)
				.context("failed to write tag ids")?;
		}

		writer
			.write_pbf_key(3, 0)
			.context("failed to write PBF key for geometry type")?;
		writer
			.write_varint(self.geom_type.as_u64())
			.context("failed to write geometry type")?;

		if !self.geom_data.is_empty() {
			writer
				.write_pbf_key(4, 2)
				.context("failed to write PBF key for geometry data")?;
			writer
				.write_pbf_blob(&self.geom_data)
				.context("failed to write geometry data")?;
		}

		Ok(writer.into_blob())
	}

	/// Decodes the geometry command stream into a [`Geometry`].
	///
	/// Commands are 1 = MoveTo, 2 = LineTo, 7 = ClosePath, packed as
	/// `(count << 3) | command` followed by zigzag-encoded coordinate deltas.
	pub fn to_geometry(&self) -> Result<Geometry> {
		let lines = {
			let mut reader = ValueReaderSlice::new_le(self.geom_data.as_slice());

			let mut lines: Vec<Vec<[f64; 2]>> = Vec::new();
			let mut line: Vec<[f64; 2]> = Vec::new();
			let mut x = 0i64;
			let mut y = 0i64;

			while reader.has_remaining() {
				let value = reader.read_varint().context("failed to read geometry command")?;
				let command = value & 0x7;
				let count = value >> 3;

				match command {
					1 | 2 => {
						for _ in 0..count {
							if command == 1 && !line.is_empty() {
								// MoveTo starts a new linestring
								lines.push(line);
								line = Vec::new();
							}

							x += reader.read_svarint().context("failed to read x coordinate")?;
							y += reader.read_svarint().context("failed to read y coordinate")?;

							line.push([x as f64, y as f64]);
						}
					}
					7 => {
						ensure!(!line.is_empty(), "ClosePath command found on an empty linestring");
						line.push(line[0]);
					}
					_ => bail!("unknown geometry command {command}"),
				}
			}

			if !line.is_empty() {
				lines.push(line);
			}

			lines
		};

		match self.geom_type {
			GeomType::Unknown => bail!("unknown geometry type"),

			GeomType::Point => {
				ensure!(!lines.is_empty(), "(Multi)Points must not be empty");

				Ok(Geometry::new_multi_point(
					lines
						.into_iter()
						.map(|mut line| {
							ensure!(line.len() == 1, "(Multi)Point entries must have exactly one vertex");
							Ok(line.pop().unwrap())
						})
						.collect::<Result<Vec<[f64; 2]>>>()?,
				))
			}

			GeomType::LineString => {
				ensure!(!lines.is_empty(), "MultiLineStrings must have at least one entry");
				for line in &lines {
					ensure!(
						line.len() >= 2,
						"each entry in MultiLineStrings must have at least two points"
					);
				}
				Ok(Geometry::new_multi_line_string(lines))
			}

			GeomType::Polygon => {
				ensure!(!lines.is_empty(), "Polygons must have at least one ring");
				let mut current_polygon = Vec::new();
				let mut polygons = Vec::new();

				for ring in lines {
					ensure!(
						ring.len() >= 4,
						"each ring in Polygons must have at least four points (A,B,C,A)"
					);
					ensure!(
						ring[0] == ring[ring.len() - 1],
						"first and last point of the ring must be the same"
					);

					let area = area_ring(&ring);

					if area > 1e-14 {
						// outer ring
						if !current_polygon.is_empty() {
							polygons.push(current_polygon);
							current_polygon = Vec::new();
						}
						current_polygon.push(ring);
					} else if area < -1e-14 {
						// inner ring
						if current_polygon.is_empty() {
							trace!("an outer ring must precede inner rings");
						} else {
							current_polygon.push(ring);
						}
					} else {
						trace!("ring with zero area");
					}
				}

				if !current_polygon.is_empty() {
					polygons.push(current_polygon);
				}

				Ok(Geometry::new_multi_polygon(polygons))
			}
		}
	}

	pub fn to_feature(&self, layer: &VectorTileLayer) -> Result<GeoFeature> {
		let mut feature = GeoFeature::new(self.to_geometry().context("failed to convert to geometry")?);

		if let Some(id) = self.id {
			feature.set_id(id);
		}

		feature.properties = layer.decode_tag_ids(&self.tag_ids)?;

		Ok(feature)
	}

	pub fn from_geometry(id: Option<u64>, tag_ids: Vec<u32>, geometry: Geometry) -> Result<VectorTileFeature> {
		fn write_point(writer: &mut ValueWriterBlob<LE>, point0: &mut (i64, i64), x: f64, y: f64) -> Result<()> {
			let x = x.round() as i64;
			let y = y.round() as i64;
			writer.write_svarint(x - point0.0)?;
			writer.write_svarint(y - point0.1)?;
			point0.0 = x;
			point0.1 = y;
			Ok(())
		}

		fn write_points(points: &MultiPoint<f64>) -> Result<Blob> {
			let mut writer = ValueWriterBlob::new_le();
			let point0 = &mut (0i64, 0i64);
			writer.write_varint((points.0.len() as u64) << 3 | 0x1)?;
			for point in &points.0 {
				write_point(&mut writer, point0, point.x(), point.y())?;
			}
			Ok(writer.into_blob())
		}

		fn write_line(writer: &mut ValueWriterBlob<LE>, point0: &mut (i64, i64), coords: &[geo_types::Coord<f64>]) -> Result<()> {
			// MoveTo for the first point, LineTo for the rest
			writer.write_varint(1 << 3 | 0x1)?;
			write_point(writer, point0, coords[0].x, coords[0].y)?;

			if coords.len() > 1 {
				writer.write_varint(((coords.len() - 1) as u64) << 3 | 0x2)?;
				for coord in &coords[1..] {
					write_point(writer, point0, coord.x, coord.y)?;
				}
			}
			Ok(())
		}

		fn write_line_strings(lines: &MultiLineString<f64>) -> Result<Blob> {
			let mut writer = ValueWriterBlob::new_le();
			let point0 = &mut (0i64, 0i64);

			for line in &lines.0 {
				if line.0.is_empty() {
					continue;
				}
				write_line(&mut writer, point0, &line.0)?;
			}

			Ok(writer.into_blob())
		}

		fn write_polygons(polygons: &MultiPolygon<f64>) -> Result<Blob> {
			let mut writer = ValueWriterBlob::new_le();
			let point0 = &mut (0i64, 0i64);

			for polygon in &polygons.0 {
				for ring in std::iter::once(polygon.exterior()).chain(polygon.interiors()) {
					if ring.0.len() < 4 {
						continue;
					}

					// the closing duplicate vertex is implied by ClosePath
					write_line(&mut writer, point0, &ring.0[..ring.0.len() - 1])?;
					writer.write_varint(7)?;
				}
			}

			Ok(writer.into_blob())
		}

		let (geom_type, geom_data) = match &geometry {
			Geometry::MultiPoint(g) => (GeomType::Point, write_points(g)?),
			Geometry::MultiLineString(g) => (GeomType::LineString, write_line_strings(g)?),
			Geometry::MultiPolygon(g) => (GeomType::Polygon, write_polygons(g)?),
		};

		Ok(VectorTileFeature {
			id,
			tag_ids,
			geom_type,
			geom_data,
		})
	}
}
