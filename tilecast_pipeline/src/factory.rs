//! [`IzerFactory`] maps izer type names to builder functions. An
//! unrecognized type name is a configuration error, which makes a whole
//! config load fail before anything is swapped in.

use crate::izers::{self, Izer};
use anyhow::{anyhow, Result};
use std::collections::HashMap;

pub type IzerBuilder = fn(&serde_json::Value) -> Result<Box<dyn Izer>>;

pub struct IzerFactory {
	builders: HashMap<String, IzerBuilder>,
}

impl IzerFactory {
	#[must_use]
	pub fn new_empty() -> IzerFactory {
		IzerFactory {
			builders: HashMap::new(),
		}
	}

	/// A factory with all built-in izers registered.
	#[must_use]
	pub fn new_default() -> IzerFactory {
		let mut factory = IzerFactory::new_empty();
		factory.register("adminizer", izers::create_adminizer);
		factory.register("generalizer", izers::create_generalizer);
		factory.register("labelizer", izers::create_labelizer);
		factory.register("mergenizer", izers::create_mergenizer);
		factory.register("unionizer", izers::create_unionizer);
		factory
	}

	pub fn register(&mut self, type_name: &str, builder: IzerBuilder) {
		self.builders.insert(type_name.to_string(), builder);
	}

	pub fn create(&self, type_name: &str, config: &serde_json::Value) -> Result<Box<dyn Izer>> {
		let builder = self
			.builders
			.get(type_name)
			.ok_or_else(|| anyhow!("unknown izer type '{type_name}'"))?;
		builder(config)
	}
}

impl Default for IzerFactory {
	fn default() -> Self {
		Self::new_default()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	#[test]
	fn default_factory_knows_the_builtin_izers() {
		let factory = IzerFactory::new_default();
		assert!(factory.create("mergenizer", &json!({"type": "mergenizer"})).is_ok());
		assert!(factory
			.create("generalizer", &json!({"type": "generalizer", "tolerance": 1.0}))
			.is_ok());
	}

	#[test]
	fn unknown_type_is_an_error() {
		let factory = IzerFactory::new_default();
		assert!(factory.create("minimizer", &json!({})).is_err());
	}

	#[test]
	fn custom_builders_can_be_registered() {
		let mut factory = IzerFactory::new_empty();
		assert!(factory.create("mergenizer", &json!({})).is_err());
		factory.register("mergenizer", izers::create_mergenizer);
		assert!(factory.create("mergenizer", &json!({})).is_ok());
	}
}
