//! [`Geometry`] is the geometry of one feature. Tile features only carry
//! multi geometries, so single-geometry constructors promote to the multi
//! variant.

use geo_types::{Coord, LineString, MultiLineString, MultiPoint, MultiPolygon, Point, Polygon};
use std::fmt::Debug;

#[derive(Clone, Debug, PartialEq)]
pub enum Geometry {
	MultiPoint(MultiPoint<f64>),
	MultiLineString(MultiLineString<f64>),
	MultiPolygon(MultiPolygon<f64>),
}

fn coord(p: [f64; 2]) -> Coord<f64> {
	Coord { x: p[0], y: p[1] }
}

fn line_string(points: &[[f64; 2]]) -> LineString<f64> {
	LineString::new(points.iter().map(|p| coord(*p)).collect())
}

fn polygon(rings: &[Vec<[f64; 2]>]) -> Polygon<f64> {
	let mut iter = rings.iter();
	let exterior = iter.next().map(|r| line_string(r)).unwrap_or_else(|| LineString::new(vec![]));
	Polygon::new(exterior, iter.map(|r| line_string(r)).collect())
}

impl Geometry {
	#[must_use]
	pub fn new_point(p: [f64; 2]) -> Self {
		Self::MultiPoint(MultiPoint(vec![Point::new(p[0], p[1])]))
	}

	#[must_use]
	pub fn new_multi_point(points: Vec<[f64; 2]>) -> Self {
		Self::MultiPoint(MultiPoint(points.into_iter().map(|p| Point::new(p[0], p[1])).collect()))
	}

	#[must_use]
	pub fn new_line_string(points: Vec<[f64; 2]>) -> Self {
		Self::MultiLineString(MultiLineString(vec![line_string(&points)]))
	}

	#[must_use]
	pub fn new_multi_line_string(lines: Vec<Vec<[f64; 2]>>) -> Self {
		Self::MultiLineString(MultiLineString(lines.iter().map(|l| line_string(l)).collect()))
	}

	#[must_use]
	pub fn new_polygon(rings: Vec<Vec<[f64; 2]>>) -> Self {
		Self::MultiPolygon(MultiPolygon(vec![polygon(&rings)]))
	}

	#[must_use]
	pub fn new_multi_polygon(polygons: Vec<Vec<Vec<[f64; 2]>>>) -> Self {
		Self::MultiPolygon(MultiPolygon(polygons.iter().map(|p| polygon(p)).collect()))
	}

	#[must_use]
	pub fn type_name(&self) -> &'static str {
		match self {
			Geometry::MultiPoint(_) => "MultiPoint",
			Geometry::MultiLineString(_) => "MultiLineString",
			Geometry::MultiPolygon(_) => "MultiPolygon",
		}
	}

	/// Total number of geometry parts (points, line strings or polygons).
	#[must_use]
	pub fn part_count(&self) -> usize {
		match self {
			Geometry::MultiPoint(g) => g.0.len(),
			Geometry::MultiLineString(g) => g.0.len(),
			Geometry::MultiPolygon(g) => g.0.len(),
		}
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.part_count() == 0
	}
}

impl From<MultiPoint<f64>> for Geometry {
	fn from(value: MultiPoint<f64>) -> Self {
		Geometry::MultiPoint(value)
	}
}

impl From<MultiLineString<f64>> for Geometry {
	fn from(value: MultiLineString<f64>) -> Self {
		Geometry::MultiLineString(value)
	}
}

impl From<MultiPolygon<f64>> for Geometry {
	fn from(value: MultiPolygon<f64>) -> Self {
		Geometry::MultiPolygon(value)
	}
}
