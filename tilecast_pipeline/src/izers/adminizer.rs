//! The adminizer tags features with attribution from administrative
//! polygons they intersect, loaded from a CSV datasource with a WKT geometry
//! column. Line features can optionally be cut at polygon boundaries
//! (`split`), and multiple matches can be concatenated (`collect`).

use super::Izer;
use anyhow::{anyhow, bail, Context, Result};
use geo::{BooleanOps, BoundingRect, Intersects};
use geo_types::{MultiLineString, Polygon};
use rstar::{RTree, RTreeObject, AABB};
use serde::Deserialize;
use std::fs;
use tilecast_geometry::{GeoFeature, GeoValue, Geometry};
use wkt::TryFromWkt;

fn default_delimiter() -> String {
	",".to_string()
}

#[derive(Debug, Deserialize)]
struct Config {
	/// Attribute key copied from admin polygons onto matching features.
	param_name: String,
	datasource: DatasourceConfig,
	/// Cut line features at polygon boundaries instead of tagging them
	/// whole.
	#[serde(default)]
	split: bool,
	/// Concatenate the values of all intersecting polygons instead of
	/// keeping only the first match.
	#[serde(default)]
	collect: bool,
	#[serde(default = "default_delimiter")]
	delimiter: String,
}

#[derive(Debug, Deserialize)]
struct DatasourceConfig {
	#[serde(rename = "type")]
	kind: String,
	#[serde(default)]
	inline: Option<String>,
	#[serde(default)]
	file: Option<String>,
}

/// One admin polygon with the attribute value it contributes.
#[derive(Debug)]
struct AdminPolygon {
	polygon: Polygon<f64>,
	value: GeoValue,
}

/// R-tree entry: envelope plus the row index into the polygon list, so
/// query results can be resolved back to datasource row order.
struct IndexedEnvelope {
	index: usize,
	envelope: AABB<[f64; 2]>,
}

impl RTreeObject for IndexedEnvelope {
	type Envelope = AABB<[f64; 2]>;

	fn envelope(&self) -> Self::Envelope {
		self.envelope
	}
}

impl std::fmt::Debug for IndexedEnvelope {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("IndexedEnvelope").field("index", &self.index).finish()
	}
}

#[derive(Debug)]
struct Adminizer {
	param_name: String,
	entries: Vec<AdminPolygon>,
	tree: RTree<IndexedEnvelope>,
	split: bool,
	collect: bool,
	delimiter: String,
}

fn envelope_of(polygon: &Polygon<f64>) -> Option<AABB<[f64; 2]>> {
	let rect = polygon.bounding_rect()?;
	Some(AABB::from_corners(
		[rect.min().x, rect.min().y],
		[rect.max().x, rect.max().y],
	))
}

/// Sniffs the column delimiter from a CSV header line.
fn sniff_delimiter(text: &str) -> u8 {
	let header = text.lines().next().unwrap_or("");
	for delimiter in [b',', b';', b'|', b'\t'] {
		if header.contains(delimiter as char) {
			return delimiter;
		}
	}
	b','
}

fn load_entries(config: &Config) -> Result<Vec<AdminPolygon>> {
	anyhow::ensure!(
		config.datasource.kind == "csv",
		"unsupported datasource type '{}', only 'csv' is supported",
		config.datasource.kind
	);

	let text = match (&config.datasource.inline, &config.datasource.file) {
		(Some(inline), _) => inline.clone(),
		(None, Some(file)) => fs::read_to_string(file).with_context(|| format!("failed to read datasource '{file}'"))?,
		(None, None) => bail!("datasource needs either 'inline' or 'file'"),
	};

	let mut reader = csv::ReaderBuilder::new()
		.delimiter(sniff_delimiter(&text))
		.from_reader(text.as_bytes());

	let headers = reader.headers().context("failed to read datasource header")?.clone();
	let wkt_column = headers
		.iter()
		.position(|h| h == "wkt")
		.ok_or_else(|| anyhow!("datasource has no 'wkt' column"))?;
	let value_column = headers
		.iter()
		.position(|h| h == config.param_name)
		.ok_or_else(|| anyhow!("datasource has no '{}' column", config.param_name))?;

	let mut entries = Vec::new();
	for record in reader.records() {
		let record = record.context("failed to read datasource row")?;
		let wkt_text = record
			.get(wkt_column)
			.ok_or_else(|| anyhow!("datasource row is missing the wkt column"))?;
		let value = record
			.get(value_column)
			.ok_or_else(|| anyhow!("datasource row is missing the '{}' column", config.param_name))?;

		let geometry = geo_types::Geometry::<f64>::try_from_wkt_str(wkt_text)
			.map_err(|error| anyhow!("failed to parse WKT '{wkt_text}': {error}"))?;

		// only polygon entries take part in the join
		match geometry {
			geo_types::Geometry::Polygon(polygon) => entries.push(AdminPolygon {
				polygon,
				value: GeoValue::from(value),
			}),
			geo_types::Geometry::MultiPolygon(polygons) => {
				for polygon in polygons {
					entries.push(AdminPolygon {
						polygon,
						value: GeoValue::from(value),
					});
				}
			}
			_ => log::debug!("ignoring non-polygon datasource geometry '{wkt_text}'"),
		}
	}

	Ok(entries)
}

impl Adminizer {
	/// Envelope-intersecting polygon indices in datasource row order.
	fn candidates(&self, geometry: &Geometry) -> Vec<usize> {
		let rect = match geometry {
			Geometry::MultiPoint(g) => g.bounding_rect(),
			Geometry::MultiLineString(g) => g.bounding_rect(),
			Geometry::MultiPolygon(g) => g.bounding_rect(),
		};
		let Some(rect) = rect else {
			return Vec::new();
		};

		let envelope = AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]);
		let mut indices: Vec<usize> = self
			.tree
			.locate_in_envelope_intersecting(&envelope)
			.map(|entry| entry.index)
			.collect();
		indices.sort_unstable();
		indices
	}

	fn intersects(&self, index: usize, geometry: &Geometry) -> bool {
		let polygon = &self.entries[index].polygon;
		match geometry {
			Geometry::MultiPoint(g) => polygon.intersects(g),
			Geometry::MultiLineString(g) => polygon.intersects(g),
			Geometry::MultiPolygon(g) => polygon.intersects(g),
		}
	}

	/// Indices of polygons that actually intersect the geometry, in
	/// datasource row order.
	fn matches(&self, geometry: &Geometry) -> Vec<usize> {
		self
			.candidates(geometry)
			.into_iter()
			.filter(|&index| self.intersects(index, geometry))
			.collect()
	}

	fn joined_value(&self, matches: &[usize]) -> GeoValue {
		if matches.len() == 1 {
			return self.entries[matches[0]].value.clone();
		}
		GeoValue::from(
			matches
				.iter()
				.map(|&index| self.entries[index].value.to_string())
				.collect::<Vec<String>>()
				.join(&self.delimiter),
		)
	}

	/// Default path: tag the whole feature with the first (or, with
	/// `collect`, all) intersecting polygon's value.
	fn tag(&self, feature: &mut GeoFeature, matches: &[usize]) {
		let value = if self.collect {
			self.joined_value(matches)
		} else {
			self.entries[matches[0]].value.clone()
		};
		feature.properties.insert(self.param_name.clone(), value);
	}

	/// Split path without `collect`: one feature per matched polygon
	/// carrying the parts inside it (first match wins in overlaps), plus a
	/// single untagged residue feature for the parts outside all of them.
	fn split_first_match(&self, feature: &GeoFeature, lines: &MultiLineString<f64>, matches: &[usize]) -> Vec<GeoFeature> {
		let mut pieces = Vec::new();
		let mut residue = lines.clone();

		for &index in matches {
			if residue.0.is_empty() {
				break;
			}
			let polygon = &self.entries[index].polygon;
			let inside = polygon.clip(&residue, false);
			if inside.0.is_empty() {
				continue;
			}
			residue = polygon.clip(&residue, true);

			let mut piece = GeoFeature::new(Geometry::MultiLineString(inside));
			piece.properties = feature.properties.clone();
			piece
				.properties
				.insert(self.param_name.clone(), self.entries[index].value.clone());
			pieces.push(piece);
		}

		if !residue.0.is_empty() {
			let mut rest = GeoFeature::new(Geometry::MultiLineString(residue));
			rest.properties = feature.properties.clone();
			pieces.push(rest);
		}

		pieces
	}

	/// Split path with `collect`: refine the line into pieces per polygon
	/// subset, then explode every piece into one feature per part, tagged
	/// with all matched values joined by the delimiter.
	fn split_collect(&self, feature: &GeoFeature, lines: &MultiLineString<f64>, matches: &[usize]) -> Vec<GeoFeature> {
		let mut partition: Vec<(MultiLineString<f64>, Vec<usize>)> = vec![(lines.clone(), Vec::new())];

		for &index in matches {
			let polygon = &self.entries[index].polygon;
			let mut refined = Vec::with_capacity(partition.len() * 2);
			for (piece, matched) in partition {
				let inside = polygon.clip(&piece, false);
				if !inside.0.is_empty() {
					let mut matched_inside = matched.clone();
					matched_inside.push(index);
					refined.push((inside, matched_inside));
				}
				let outside = polygon.clip(&piece, true);
				if !outside.0.is_empty() {
					refined.push((outside, matched));
				}
			}
			partition = refined;
		}

		let mut pieces = Vec::new();
		for (multi_line, matched) in partition {
			for line in multi_line {
				let mut piece = GeoFeature::new(Geometry::MultiLineString(MultiLineString(vec![line])));
				piece.properties = feature.properties.clone();
				if !matched.is_empty() {
					piece.properties.insert(self.param_name.clone(), self.joined_value(&matched));
				}
				pieces.push(piece);
			}
		}
		pieces
	}
}

impl Izer for Adminizer {
	fn process(&self, features: &mut Vec<GeoFeature>) -> Result<()> {
		let mut output = Vec::with_capacity(features.len());

		for mut feature in features.drain(..) {
			let matches = self.matches(&feature.geometry);
			if matches.is_empty() {
				// untouched, geometry unmodified
				output.push(feature);
				continue;
			}

			match (&feature.geometry, self.split) {
				// only line features are ever split
				(Geometry::MultiLineString(lines), true) => {
					let lines = lines.clone();
					let pieces = if self.collect {
						self.split_collect(&feature, &lines, &matches)
					} else {
						self.split_first_match(&feature, &lines, &matches)
					};
					output.extend(pieces);
				}
				_ => {
					self.tag(&mut feature, &matches);
					output.push(feature);
				}
			}
		}

		*features = output;
		Ok(())
	}
}

pub fn create_adminizer(config: &serde_json::Value) -> Result<Box<dyn Izer>> {
	let config: Config = serde_json::from_value(config.clone()).context("invalid adminizer configuration")?;

	let entries = load_entries(&config)?;
	let tree = RTree::bulk_load(
		entries
			.iter()
			.enumerate()
			.filter_map(|(index, entry)| Some(IndexedEnvelope {
				index,
				envelope: envelope_of(&entry.polygon)?,
			}))
			.collect(),
	);

	Ok(Box::new(Adminizer {
		param_name: config.param_name,
		entries,
		tree,
		split: config.split,
		collect: config.collect,
		delimiter: config.delimiter,
	}))
}
