//! The mergenizer is a registered placeholder with no behavior of its own.

use super::Izer;
use anyhow::Result;
use tilecast_geometry::GeoFeature;

#[derive(Debug)]
struct Mergenizer;

impl Izer for Mergenizer {
	fn process(&self, _features: &mut Vec<GeoFeature>) -> Result<()> {
		Ok(())
	}
}

pub fn create_mergenizer(_config: &serde_json::Value) -> Result<Box<dyn Izer>> {
	Ok(Box::new(Mergenizer))
}

#[cfg(test)]
mod tests {
	use super::*;
	use tilecast_geometry::Geometry;

	#[test]
	fn leaves_features_untouched() {
		let izer = create_mergenizer(&serde_json::json!({"type": "mergenizer"})).unwrap();
		let mut features = vec![GeoFeature::new(Geometry::new_point([1.0, 2.0]))];
		let before = features.clone();
		izer.process(&mut features).unwrap();
		assert_eq!(features, before);
	}
}
