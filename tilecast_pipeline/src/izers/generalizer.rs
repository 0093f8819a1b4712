//! The generalizer simplifies line and polygon geometry to a tolerance.

use super::Izer;
use anyhow::{bail, Result};
use geo::{Simplify, SimplifyVw};
use serde::Deserialize;
use tilecast_geometry::{GeoFeature, Geometry};

fn default_algorithm() -> String {
	"visvalingam-whyatt".to_string()
}

#[derive(Debug, Deserialize)]
struct Config {
	#[serde(default = "default_algorithm")]
	algorithm: String,
	tolerance: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Algorithm {
	VisvalingamWhyatt,
	DouglasPeucker,
}

#[derive(Debug)]
struct Generalizer {
	algorithm: Algorithm,
	tolerance: f64,
}

impl Izer for Generalizer {
	fn process(&self, features: &mut Vec<GeoFeature>) -> Result<()> {
		for feature in features {
			let simplified = match &feature.geometry {
				Geometry::MultiPoint(_) => continue,
				Geometry::MultiLineString(lines) => Geometry::MultiLineString(match self.algorithm {
					Algorithm::VisvalingamWhyatt => lines.simplify_vw(&self.tolerance),
					Algorithm::DouglasPeucker => lines.simplify(&self.tolerance),
				}),
				Geometry::MultiPolygon(polygons) => Geometry::MultiPolygon(match self.algorithm {
					Algorithm::VisvalingamWhyatt => polygons.simplify_vw(&self.tolerance),
					Algorithm::DouglasPeucker => polygons.simplify(&self.tolerance),
				}),
			};
			feature.geometry = simplified;
		}
		Ok(())
	}
}

pub fn create_generalizer(config: &serde_json::Value) -> Result<Box<dyn Izer>> {
	let config: Config = serde_json::from_value(config.clone())?;

	let algorithm = match config.algorithm.as_str() {
		"visvalingam-whyatt" => Algorithm::VisvalingamWhyatt,
		"douglas-peucker" => Algorithm::DouglasPeucker,
		other => bail!("'{other}' is not supported, try `visvalingam-whyatt' or `douglas-peucker'"),
	};

	Ok(Box::new(Generalizer {
		algorithm,
		tolerance: config.tolerance,
	}))
}
