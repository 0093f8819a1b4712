//! The unionizer merges adjacent line features (or line parts) that share
//! matching attribution into longer features.
//!
//! Think of a junction where five linestrings meet at one point: from the
//! perspective of a single linestring there are many possible unions. The
//! heuristic picks between them: "greedy" takes whichever pair is cheapest
//! to join, "obtuse" favors the join whose result is closest to a straight
//! line, "acute" favors the sharpest bend.

use super::Izer;
use anyhow::{bail, Result};
use itertools::Itertools;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use tilecast_geometry::{GeoFeature, GeoProperties, GeoValue, Geometry};

fn default_heuristic() -> String {
	"greedy".to_string()
}

fn default_strategy() -> String {
	"drop".to_string()
}

fn default_sample_ratio() -> f64 {
	1.0
}

#[derive(Debug, Deserialize)]
struct Config {
	#[serde(default = "default_heuristic")]
	union_heuristic: String,
	#[serde(default = "default_strategy")]
	tag_strategy: String,
	#[serde(default)]
	max_iterations: Option<usize>,
	#[serde(default)]
	match_tags: Vec<String>,
	#[serde(default)]
	preserve_direction_tags: Vec<String>,
	#[serde(default = "default_sample_ratio")]
	angle_union_sample_ratio: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Heuristic {
	Greedy,
	Obtuse,
	Acute,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Position {
	Front,
	Back,
}

/// One end of one line part, eligible for union matchmaking.
#[derive(Debug, Clone)]
struct Candidate {
	feature: usize,
	part: usize,
	position: Position,
	directional: bool,
	/// Unit tangent of the curve leaving the endpoint; only computed for
	/// the angle heuristics.
	direction: [f64; 2],
}

#[derive(Debug)]
pub struct Unionizer {
	heuristic: Heuristic,
	max_iterations: usize,
	match_tags: Vec<String>,
	preserve_direction_tags: Vec<String>,
	angle_union_sample_ratio: f64,
}

/// Endpoints group by exact vertex (bit pattern) and the feature's
/// match-tag values; only candidates within one group can pair up.
type GroupKey = (u64, u64, Vec<GeoValue>);

fn lines_of(feature: &GeoFeature) -> Option<&Vec<geo_types::LineString<f64>>> {
	match &feature.geometry {
		Geometry::MultiLineString(lines) => Some(&lines.0),
		_ => None,
	}
}

fn lines_of_mut(feature: &mut GeoFeature) -> Option<&mut Vec<geo_types::LineString<f64>>> {
	match &mut feature.geometry {
		Geometry::MultiLineString(lines) => Some(&mut lines.0),
		_ => None,
	}
}

fn unit_tangent(line: &geo_types::LineString<f64>, position: Position) -> [f64; 2] {
	let coords = &line.0;
	let (from, to) = match position {
		Position::Front => (coords[0], coords[1]),
		Position::Back => (coords[coords.len() - 1], coords[coords.len() - 2]),
	};
	let dx = to.x - from.x;
	let dy = to.y - from.y;
	let length = (dx * dx + dy * dy).sqrt();
	if length == 0.0 {
		[0.0, 0.0]
	} else {
		[dx / length, dy / length]
	}
}

impl Unionizer {
	fn match_values(&self, feature: &GeoFeature) -> Option<Vec<GeoValue>> {
		self
			.match_tags
			.iter()
			.map(|tag| feature.properties.get(tag).cloned())
			.collect()
	}

	fn is_directional(&self, feature: &GeoFeature) -> bool {
		self
			.preserve_direction_tags
			.iter()
			.any(|tag| feature.properties.contains_key(tag))
	}

	/// Collects candidate endpoints grouped by (vertex, match-tag values).
	fn collect_candidates(&self, features: &[GeoFeature]) -> HashMap<GroupKey, Vec<Candidate>> {
		let mut groups: HashMap<GroupKey, Vec<Candidate>> = HashMap::new();

		for (feature_index, feature) in features.iter().enumerate() {
			// features missing a match tag never union
			let Some(values) = self.match_values(feature) else {
				continue;
			};
			let Some(lines) = lines_of(feature) else {
				continue;
			};
			let directional = self.is_directional(feature);

			for (part_index, line) in lines.iter().enumerate() {
				if line.0.len() < 2 {
					continue;
				}
				for position in [Position::Front, Position::Back] {
					let vertex = match position {
						Position::Front => line.0[0],
						Position::Back => line.0[line.0.len() - 1],
					};
					let direction = if self.heuristic == Heuristic::Greedy {
						[0.0, 0.0]
					} else {
						unit_tangent(line, position)
					};
					let key = (vertex.x.to_bits(), vertex.y.to_bits(), values.clone());
					groups.entry(key).or_default().push(Candidate {
						feature: feature_index,
						part: part_index,
						position,
						directional,
						direction,
					});
				}
			}
		}

		groups
	}

	/// All admissible pairs, in a deterministic enumeration order.
	fn admissible_pairs(&self, groups: HashMap<GroupKey, Vec<Candidate>>) -> Vec<(Candidate, Candidate)> {
		let mut pairs: Vec<(Candidate, Candidate)> = groups
			.into_values()
			.flat_map(|group| {
				group
					.into_iter()
					.tuple_combinations()
					.filter(|(a, b): &(Candidate, Candidate)| {
						// a part never unions with itself (that would be a ring)
						if a.feature == b.feature && a.part == b.part {
							return false;
						}
						// they either both care about direction or neither does
						if a.directional != b.directional {
							return false;
						}
						// directional features union head-to-tail only
						if a.directional && a.position == b.position {
							return false;
						}
						true
					})
					.collect::<Vec<_>>()
			})
			.collect();

		pairs.sort_by_key(|(a, b)| (a.feature, a.part, a.position as u8, b.feature, b.part, b.position as u8));
		pairs
	}

	fn score(&self, a: &Candidate, b: &Candidate) -> f64 {
		match self.heuristic {
			// favor pairs by ease of the union operation
			Heuristic::Greedy => {
				if a.position != b.position {
					0.0
				} else if a.position == Position::Back {
					1.0
				} else {
					2.0
				}
			}
			// -1 is opposite directions (a straight continuation), +1 is
			// doubling back on itself
			Heuristic::Obtuse => {
				let dot = a.direction[0] * b.direction[0] + a.direction[1] * b.direction[1];
				(dot + 1.0) * 0.5
			}
			Heuristic::Acute => {
				let dot = a.direction[0] * b.direction[0] + a.direction[1] * b.direction[1];
				1.0 - (dot + 1.0) * 0.5
			}
		}
	}

	/// Joins one pair: the pair's geometry is concatenated onto the
	/// receiving feature, the source part is removed, and the receiving
	/// feature keeps only the match tags.
	fn merge(&self, features: &mut [GeoFeature], a: &Candidate, b: &Candidate) {
		let receiver;

		if a.position != b.position {
			// head-to-tail: append the front part onto the back part
			let (back, front) = if a.position == Position::Back { (a, b) } else { (b, a) };
			let Some(source) = lines_of(&features[front.feature]).map(|lines| lines[front.part].clone()) else {
				return;
			};
			{
				let Some(lines) = lines_of_mut(&mut features[back.feature]) else {
					return;
				};
				// the shared joint vertex is not duplicated
				lines[back.part].0.extend(source.0.iter().skip(1).copied());
			}
			if let Some(lines) = lines_of_mut(&mut features[front.feature]) {
				lines.remove(front.part);
			}
			receiver = back.feature;
		} else if a.position == Position::Back {
			// back-to-back: append the second part reversed
			let Some(source) = lines_of(&features[b.feature]).map(|lines| lines[b.part].clone()) else {
				return;
			};
			{
				let Some(lines) = lines_of_mut(&mut features[a.feature]) else {
					return;
				};
				lines[a.part].0.extend(source.0.iter().rev().skip(1).copied());
			}
			if let Some(lines) = lines_of_mut(&mut features[b.feature]) {
				lines.remove(b.part);
			}
			receiver = a.feature;
		} else {
			// front-to-front: build a new part from the first reversed plus
			// the second
			let Some(first) = lines_of(&features[a.feature]).map(|lines| lines[a.part].clone()) else {
				return;
			};
			let Some(second) = lines_of(&features[b.feature]).map(|lines| lines[b.part].clone()) else {
				return;
			};

			let mut joined: Vec<geo_types::Coord<f64>> = first.0.iter().rev().copied().collect();
			joined.extend(second.0.iter().skip(1).copied());

			// remove the higher part index first so the lower stays valid
			if a.feature == b.feature {
				let lines = match lines_of_mut(&mut features[a.feature]) {
					Some(lines) => lines,
					None => return,
				};
				let (high, low) = if a.part > b.part { (a.part, b.part) } else { (b.part, a.part) };
				lines.remove(high);
				lines.remove(low);
				lines.push(geo_types::LineString(joined));
			} else {
				if let Some(lines) = lines_of_mut(&mut features[a.feature]) {
					lines.remove(a.part);
					lines.push(geo_types::LineString(joined));
				}
				if let Some(lines) = lines_of_mut(&mut features[b.feature]) {
					lines.remove(b.part);
				}
			}
			receiver = a.feature;
		}

		// tag strategy "drop": the unioned feature keeps only the match
		// tags; its id would be arbitrary, so it is cleared
		let feature = &mut features[receiver];
		feature.id = None;
		feature.properties = self
			.match_tags
			.iter()
			.filter_map(|tag| feature.properties.get(tag).map(|value| (tag.clone(), value.clone())))
			.collect::<GeoProperties>();
	}

	/// One merge round. Returns the number of unions performed.
	fn union_round(&self, features: &mut Vec<GeoFeature>) -> usize {
		let groups = self.collect_candidates(features);
		let mut pairs = self.admissible_pairs(groups);

		if self.heuristic != Heuristic::Greedy && self.angle_union_sample_ratio < 1.0 {
			// sample a deterministic prefix of the enumeration order
			let keep = ((pairs.len() as f64) * self.angle_union_sample_ratio).ceil() as usize;
			pairs.truncate(keep.max(1));
		}

		let mut scored: Vec<(f64, Candidate, Candidate)> = pairs
			.into_iter()
			.map(|(a, b)| (self.score(&a, &b), a, b))
			.collect();
		// stable sort: equal scores keep the enumeration order
		scored.sort_by(|(a, ..), (b, ..)| a.total_cmp(b));

		// a feature takes part in at most one union per round, because the
		// bookkeeping to allow more within one round is not worth it
		let mut used: HashSet<usize> = HashSet::new();
		let mut unions = 0;

		for (_, a, b) in scored {
			if used.contains(&a.feature) || used.contains(&b.feature) {
				continue;
			}
			self.merge(features, &a, &b);
			used.insert(a.feature);
			used.insert(b.feature);
			unions += 1;
		}

		unions
	}
}

impl Izer for Unionizer {
	fn process(&self, features: &mut Vec<GeoFeature>) -> Result<()> {
		for _ in 0..self.max_iterations {
			if self.union_round(features) == 0 {
				break;
			}
		}

		// cull features whose line parts were all consumed
		features.retain(|feature| !matches!(&feature.geometry, Geometry::MultiLineString(lines) if lines.0.is_empty()));
		Ok(())
	}
}

pub fn create_unionizer(config: &serde_json::Value) -> Result<Box<dyn Izer>> {
	let config: Config = serde_json::from_value(config.clone())?;

	let heuristic = match config.union_heuristic.as_str() {
		"greedy" => Heuristic::Greedy,
		"obtuse" => Heuristic::Obtuse,
		"acute" => Heuristic::Acute,
		other => bail!("'{other}' is not supported, try `greedy', `obtuse' or `acute'"),
	};

	if config.tag_strategy != "drop" {
		bail!("'{}' is not supported, try `drop'", config.tag_strategy);
	}

	if config.angle_union_sample_ratio <= 0.0 || config.angle_union_sample_ratio > 1.0 {
		bail!("please make sure 0 < angle_union_sample_ratio <= 1");
	}

	Ok(Box::new(Unionizer {
		heuristic,
		max_iterations: config.max_iterations.unwrap_or(usize::MAX),
		match_tags: config.match_tags,
		preserve_direction_tags: config.preserve_direction_tags,
		angle_union_sample_ratio: config.angle_union_sample_ratio,
	}))
}

#[cfg(test)]
mod tests {
	use super::*;
	use pretty_assertions::assert_eq;
	use serde_json::json;

	fn line(points: Vec<[f64; 2]>, tags: Vec<(&str, &str)>) -> GeoFeature {
		let mut feature = GeoFeature::new(Geometry::new_line_string(points));
		for (key, value) in tags {
			feature.set_property(key, value);
		}
		feature
	}

	fn greedy(extra: serde_json::Value) -> Box<dyn Izer> {
		let mut config = json!({"type": "unionizer", "union_heuristic": "greedy"});
		config
			.as_object_mut()
			.unwrap()
			.extend(extra.as_object().unwrap().clone());
		create_unionizer(&config).unwrap()
	}

	fn line_points(feature: &GeoFeature) -> Vec<Vec<(f64, f64)>> {
		match &feature.geometry {
			Geometry::MultiLineString(lines) => lines
				.0
				.iter()
				.map(|l| l.0.iter().map(|c| (c.x, c.y)).collect())
				.collect(),
			_ => panic!("expected a MultiLineString"),
		}
	}

	#[test]
	fn collinear_segments_merge_into_one_three_point_line() {
		let izer = greedy(json!({}));
		let mut features = vec![
			line(vec![[0.0, 0.0], [1.0, 0.0]], vec![]),
			line(vec![[1.0, 0.0], [2.0, 0.0]], vec![]),
		];
		izer.process(&mut features).unwrap();

		assert_eq!(features.len(), 1);
		assert_eq!(line_points(&features[0]), vec![vec![(0.0, 0.0), (1.0, 0.0), (2.0, 0.0)]]);
	}

	#[test]
	fn a_chain_collapses_over_multiple_rounds() {
		let izer = greedy(json!({}));
		let mut features = vec![
			line(vec![[0.0, 0.0], [1.0, 0.0]], vec![]),
			line(vec![[1.0, 0.0], [2.0, 0.0]], vec![]),
			line(vec![[2.0, 0.0], [3.0, 0.0]], vec![]),
		];
		izer.process(&mut features).unwrap();

		assert_eq!(features.len(), 1);
		assert_eq!(line_points(&features[0])[0].len(), 4);
	}

	#[test]
	fn max_iterations_caps_the_merge_rounds() {
		let izer = greedy(json!({"max_iterations": 1}));
		let mut features = vec![
			line(vec![[0.0, 0.0], [1.0, 0.0]], vec![]),
			line(vec![[1.0, 0.0], [2.0, 0.0]], vec![]),
			line(vec![[2.0, 0.0], [3.0, 0.0]], vec![]),
		];
		izer.process(&mut features).unwrap();

		// one round unions one pair; the third segment is left for later
		assert_eq!(features.len(), 2);
	}

	#[test]
	fn differing_match_tags_never_merge() {
		let izer = greedy(json!({"match_tags": ["kind"]}));
		let mut features = vec![
			line(vec![[0.0, 0.0], [1.0, 0.0]], vec![("kind", "road")]),
			line(vec![[1.0, 0.0], [2.0, 0.0]], vec![("kind", "rail")]),
		];
		izer.process(&mut features).unwrap();
		assert_eq!(features.len(), 2);
	}

	#[test]
	fn features_missing_a_match_tag_never_merge() {
		let izer = greedy(json!({"match_tags": ["kind"]}));
		let mut features = vec![
			line(vec![[0.0, 0.0], [1.0, 0.0]], vec![("kind", "road")]),
			line(vec![[1.0, 0.0], [2.0, 0.0]], vec![]),
		];
		izer.process(&mut features).unwrap();
		assert_eq!(features.len(), 2);
	}

	#[test]
	fn non_touching_segments_never_merge() {
		let izer = greedy(json!({}));
		let mut features = vec![
			line(vec![[0.0, 0.0], [1.0, 0.0]], vec![]),
			line(vec![[1.5, 0.0], [2.0, 0.0]], vec![]),
		];
		izer.process(&mut features).unwrap();
		assert_eq!(features.len(), 2);
	}

	#[test]
	fn drop_strategy_keeps_only_match_tags_and_clears_the_id() {
		let izer = greedy(json!({"match_tags": ["kind"]}));
		let mut a = line(vec![[0.0, 0.0], [1.0, 0.0]], vec![("kind", "road"), ("name", "A1")]);
		a.set_id(42);
		let b = line(vec![[1.0, 0.0], [2.0, 0.0]], vec![("kind", "road"), ("surface", "dirt")]);
		let mut features = vec![a, b];
		izer.process(&mut features).unwrap();

		assert_eq!(features.len(), 1);
		assert_eq!(features[0].id, None);
		assert_eq!(
			features[0].properties,
			GeoProperties::from(vec![("kind", GeoValue::from("road"))])
		);
	}

	#[test]
	fn directional_features_merge_head_to_tail() {
		let izer = greedy(json!({
			"match_tags": ["oneway"],
			"preserve_direction_tags": ["oneway"]
		}));
		let mut features = vec![
			line(vec![[0.0, 0.0], [1.0, 0.0]], vec![("oneway", "yes")]),
			line(vec![[1.0, 0.0], [2.0, 0.0]], vec![("oneway", "yes")]),
		];
		izer.process(&mut features).unwrap();

		assert_eq!(features.len(), 1);
		assert_eq!(line_points(&features[0]), vec![vec![(0.0, 0.0), (1.0, 0.0), (2.0, 0.0)]]);
	}

	#[test]
	fn directional_features_never_merge_reversed() {
		let izer = greedy(json!({
			"match_tags": ["oneway"],
			"preserve_direction_tags": ["oneway"]
		}));
		// both lines end at the shared vertex, so a union would flip one
		let mut features = vec![
			line(vec![[0.0, 0.0], [1.0, 0.0]], vec![("oneway", "yes")]),
			line(vec![[2.0, 0.0], [1.0, 0.0]], vec![("oneway", "yes")]),
		];
		izer.process(&mut features).unwrap();
		assert_eq!(features.len(), 2);
	}

	#[test]
	fn non_directional_features_may_merge_reversed() {
		let izer = greedy(json!({}));
		let mut features = vec![
			line(vec![[0.0, 0.0], [1.0, 0.0]], vec![]),
			line(vec![[2.0, 0.0], [1.0, 0.0]], vec![]),
		];
		izer.process(&mut features).unwrap();

		assert_eq!(features.len(), 1);
		assert_eq!(line_points(&features[0]), vec![vec![(0.0, 0.0), (1.0, 0.0), (2.0, 0.0)]]);
	}

	#[test]
	fn front_to_front_joins_reverse_the_first_part() {
		let izer = greedy(json!({}));
		let mut features = vec![
			line(vec![[1.0, 0.0], [0.0, 0.0]], vec![]),
			line(vec![[1.0, 0.0], [2.0, 0.0]], vec![]),
		];
		izer.process(&mut features).unwrap();

		assert_eq!(features.len(), 1);
		assert_eq!(line_points(&features[0]), vec![vec![(0.0, 0.0), (1.0, 0.0), (2.0, 0.0)]]);
	}

	#[test]
	fn parts_of_one_feature_union_with_each_other() {
		let izer = greedy(json!({}));
		let mut features = vec![GeoFeature::new(Geometry::new_multi_line_string(vec![
			vec![[0.0, 0.0], [1.0, 0.0]],
			vec![[1.0, 0.0], [2.0, 0.0]],
		]))];
		izer.process(&mut features).unwrap();

		assert_eq!(features.len(), 1);
		assert_eq!(line_points(&features[0]), vec![vec![(0.0, 0.0), (1.0, 0.0), (2.0, 0.0)]]);
	}

	#[test]
	fn obtuse_prefers_the_straight_continuation() {
		let izer = create_unionizer(&json!({"type": "unionizer", "union_heuristic": "obtuse"})).unwrap();
		let mut features = vec![
			line(vec![[-1.0, 0.0], [0.0, 0.0]], vec![]),
			line(vec![[0.0, 0.0], [1.0, 0.0]], vec![]),
			line(vec![[0.0, 0.0], [0.0, 1.0]], vec![]),
		];
		izer.process(&mut features).unwrap();

		assert_eq!(features.len(), 2);
		// the straight pair merged; the perpendicular spur is untouched
		let merged = line_points(&features[0]);
		assert_eq!(merged, vec![vec![(-1.0, 0.0), (0.0, 0.0), (1.0, 0.0)]]);
	}

	#[test]
	fn acute_prefers_the_sharpest_bend() {
		let izer = create_unionizer(&json!({"type": "unionizer", "union_heuristic": "acute"})).unwrap();
		let mut features = vec![
			line(vec![[-1.0, 0.0], [0.0, 0.0]], vec![]),
			line(vec![[0.0, 0.0], [1.0, 0.0]], vec![]),
			line(vec![[0.0, 0.0], [0.0, 1.0]], vec![]),
		];
		izer.process(&mut features).unwrap();

		assert_eq!(features.len(), 2);
		// the right-angle pair scored better than the straight one
		let merged = line_points(&features[0]);
		assert_eq!(merged, vec![vec![(-1.0, 0.0), (0.0, 0.0), (0.0, 1.0)]]);
	}

	#[test]
	fn points_and_polygons_pass_through() {
		let izer = greedy(json!({}));
		let mut features = vec![
			GeoFeature::new(Geometry::new_point([0.0, 0.0])),
			line(vec![[0.0, 0.0], [1.0, 0.0]], vec![]),
		];
		let before = features.clone();
		izer.process(&mut features).unwrap();
		assert_eq!(features, before);
	}

	#[test]
	fn invalid_configurations_are_rejected() {
		assert!(create_unionizer(&json!({"type": "unionizer", "union_heuristic": "longest"})).is_err());
		assert!(create_unionizer(&json!({"type": "unionizer", "tag_strategy": "preserve"})).is_err());
		assert!(create_unionizer(&json!({"type": "unionizer", "angle_union_sample_ratio": 0.0})).is_err());
		assert!(create_unionizer(&json!({"type": "unionizer", "angle_union_sample_ratio": 1.5})).is_err());
	}
}
