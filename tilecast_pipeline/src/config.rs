//! The raw JSON shape of a post-processing configuration:
//! `{ "<layer>": [ { "minzoom": n, "maxzoom": n, "process": [ { "type": "<izer>", ... } ] } ] }`.

use serde::Deserialize;
use std::collections::BTreeMap;

pub type RawConfig = BTreeMap<String, Vec<RawScaleRange>>;

#[derive(Clone, Debug, Deserialize)]
pub struct RawScaleRange {
	pub minzoom: u8,
	pub maxzoom: u8,
	/// Izer specs; each object carries a `type` key plus free-form
	/// parameters interpreted by the izer's builder.
	pub process: Vec<serde_json::Value>,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_the_documented_shape() {
		let config: RawConfig = serde_json::from_str(
			r#"{
				"roads": [
					{ "minzoom": 10, "maxzoom": 14, "process": [ { "type": "generalizer", "tolerance": 2.0 } ] }
				]
			}"#,
		)
		.unwrap();

		let ranges = &config["roads"];
		assert_eq!(ranges.len(), 1);
		assert_eq!(ranges[0].minzoom, 10);
		assert_eq!(ranges[0].maxzoom, 14);
		assert_eq!(ranges[0].process[0]["type"], "generalizer");
	}

	#[test]
	fn rejects_missing_zoom_bounds() {
		let result: Result<RawConfig, _> = serde_json::from_str(r#"{"roads": [{"process": []}]}"#);
		assert!(result.is_err());
	}
}
