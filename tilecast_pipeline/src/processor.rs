//! [`PostProcessor`] dispatches izer chains per layer and scale range.
//!
//! Configs build completely before they become visible: a failed load leaves
//! the previous plan in force, and the swap is a single atomic pointer
//! replacement, so in-flight requests keep reading their old snapshot.

use crate::{config::RawConfig, factory::IzerFactory, izers::Izer};
use anyhow::{anyhow, Context, Result};
use arc_swap::ArcSwap;
use std::{collections::BTreeMap, sync::Arc};
use tilecast_core::scale_for_zoom;
use tilecast_geometry::{vector_tile::VectorTile, GeoFeature};

struct ScaleRange {
	/// Inclusive scale bounds; the scale domain is inverted relative to
	/// zoom, so `min_scale` comes from the range's maxzoom.
	min_scale: f64,
	max_scale: f64,
	izers: Vec<Box<dyn Izer>>,
}

#[derive(Default)]
struct ProcessPlan {
	layers: BTreeMap<String, Vec<ScaleRange>>,
}

impl ProcessPlan {
	fn build(config: &RawConfig, factory: &IzerFactory) -> Result<ProcessPlan> {
		let mut layers = BTreeMap::new();

		for (layer_name, raw_ranges) in config {
			let mut ranges = Vec::with_capacity(raw_ranges.len());
			for raw_range in raw_ranges {
				let mut izers = Vec::with_capacity(raw_range.process.len());
				for spec in &raw_range.process {
					let type_name = spec
						.get("type")
						.and_then(serde_json::Value::as_str)
						.ok_or_else(|| anyhow!("izer spec without a 'type' in layer '{layer_name}'"))?;
					izers.push(
						factory
							.create(type_name, spec)
							.with_context(|| format!("failed to build izer '{type_name}' for layer '{layer_name}'"))?,
					);
				}
				ranges.push(ScaleRange {
					min_scale: scale_for_zoom(raw_range.maxzoom),
					max_scale: scale_for_zoom(raw_range.minzoom),
					izers,
				});
			}
			layers.insert(layer_name.clone(), ranges);
		}

		Ok(ProcessPlan { layers })
	}

	/// The first range containing the scale, in configured order. Ranges
	/// may overlap; only the first match runs.
	fn find_range(&self, layer_name: &str, scale: f64) -> Option<&ScaleRange> {
		self
			.layers
			.get(layer_name)?
			.iter()
			.find(|range| scale >= range.min_scale && scale <= range.max_scale)
	}
}

pub struct PostProcessor {
	factory: IzerFactory,
	plan: ArcSwap<ProcessPlan>,
}

impl PostProcessor {
	#[must_use]
	pub fn new() -> PostProcessor {
		PostProcessor::with_factory(IzerFactory::new_default())
	}

	#[must_use]
	pub fn with_factory(factory: IzerFactory) -> PostProcessor {
		PostProcessor {
			factory,
			plan: ArcSwap::from_pointee(ProcessPlan::default()),
		}
	}

	/// Loads a configuration, all-or-nothing: on any error the previous
	/// configuration stays in force.
	pub fn load_str(&self, text: &str) -> Result<()> {
		let raw: RawConfig = serde_json::from_str(text).context("failed to parse post-processing configuration")?;
		let plan = ProcessPlan::build(&raw, &self.factory)?;
		self.plan.store(Arc::new(plan));
		Ok(())
	}

	/// Runs the matching izer chain over a layer's features. Returns the
	/// number of izers executed, 0 when no layer entry or range matches.
	pub fn process_layer(&self, features: &mut Vec<GeoFeature>, layer_name: &str, scale: f64) -> Result<usize> {
		let plan = self.plan.load();
		let Some(range) = plan.find_range(layer_name, scale) else {
			return Ok(0);
		};

		for izer in &range.izers {
			izer
				.process(features)
				.with_context(|| format!("izer failed on layer '{layer_name}'"))?;
		}

		Ok(range.izers.len())
	}

	/// Post-processes every layer of a tile at the given zoom. Layers are
	/// only decoded and re-encoded when an izer chain matches. Returns the
	/// total number of izers executed.
	pub fn process_tile(&self, tile: &mut VectorTile, zoom: u8) -> Result<usize> {
		let scale = scale_for_zoom(zoom);
		let mut executed = 0;

		for layer in &mut tile.layers {
			let matches = {
				let plan = self.plan.load();
				plan
					.find_range(&layer.name, scale)
					.is_some_and(|range| !range.izers.is_empty())
			};
			if !matches {
				continue;
			}

			let mut features = layer.to_features().with_context(|| format!("failed to decode layer '{}'", layer.name))?;
			executed += self.process_layer(&mut features, &layer.name.clone(), scale)?;
			layer.replace_features(features)?;
		}

		Ok(executed)
	}
}

impl Default for PostProcessor {
	fn default() -> Self {
		Self::new()
	}
}
