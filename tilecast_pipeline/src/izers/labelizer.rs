//! The labelizer orders label placement candidates. It never removes a
//! feature; it may reorder the list so higher-priority labels come first.

use super::Izer;
use anyhow::Result;
use serde::Deserialize;
use std::cmp::Ordering;
use tilecast_geometry::{GeoFeature, GeoValue};

#[derive(Debug, Deserialize)]
struct Config {
	/// Attribute holding the numeric placement priority. Without it the
	/// list is left in its original order.
	#[serde(default)]
	priority_key: Option<String>,
}

#[derive(Debug)]
struct Labelizer {
	priority_key: Option<String>,
}

impl Izer for Labelizer {
	fn process(&self, features: &mut Vec<GeoFeature>) -> Result<()> {
		let Some(key) = &self.priority_key else {
			return Ok(());
		};

		// stable sort, descending by priority; features without a numeric
		// priority sink to the end in their original order
		features.sort_by(|a, b| {
			let a = a.properties.get(key).and_then(GeoValue::as_f64);
			let b = b.properties.get(key).and_then(GeoValue::as_f64);
			match (a, b) {
				(Some(a), Some(b)) => b.total_cmp(&a),
				(Some(_), None) => Ordering::Less,
				(None, Some(_)) => Ordering::Greater,
				(None, None) => Ordering::Equal,
			}
		});

		Ok(())
	}
}

pub fn create_labelizer(config: &serde_json::Value) -> Result<Box<dyn Izer>> {
	let config: Config = serde_json::from_value(config.clone())?;
	Ok(Box::new(Labelizer {
		priority_key: config.priority_key,
	}))
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;
	use tilecast_geometry::Geometry;

	fn label(name: &str, priority: Option<u64>) -> GeoFeature {
		let mut feature = GeoFeature::new(Geometry::new_point([0.0, 0.0]));
		feature.set_property("name", name);
		if let Some(priority) = priority {
			feature.set_property("priority", priority);
		}
		feature
	}

	fn names(features: &[GeoFeature]) -> Vec<String> {
		features
			.iter()
			.map(|f| f.properties.get("name").unwrap().to_string())
			.collect()
	}

	#[test]
	fn sorts_descending_with_missing_priorities_last() {
		let izer = create_labelizer(&json!({"type": "labelizer", "priority_key": "priority"})).unwrap();
		let mut features = vec![
			label("b", Some(2)),
			label("x", None),
			label("a", Some(9)),
			label("y", None),
		];
		izer.process(&mut features).unwrap();
		assert_eq!(names(&features), vec!["a", "b", "x", "y"]);
		assert_eq!(features.len(), 4);
	}

	#[test]
	fn without_a_priority_key_the_order_is_kept() {
		let izer = create_labelizer(&json!({"type": "labelizer"})).unwrap();
		let mut features = vec![label("b", Some(2)), label("a", Some(9))];
		izer.process(&mut features).unwrap();
		assert_eq!(names(&features), vec!["b", "a"]);
	}
}
