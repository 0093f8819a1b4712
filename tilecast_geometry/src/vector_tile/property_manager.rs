//! Per-layer key/value lookup tables. Features reference attributes by
//! index pairs (`tag_ids`), so the tables must keep stable, deduplicated
//! indexes while the layer is built.

use crate::{GeoProperties, GeoValue};
use anyhow::{anyhow, ensure, Context, Result};
use std::{collections::HashMap, fmt::Debug, hash::Hash};

#[derive(Clone, PartialEq)]
pub struct LookupTable<T>
where
	T: Clone + Eq + Hash,
{
	list: Vec<T>,
	map: HashMap<T, u32>,
}

impl<T> LookupTable<T>
where
	T: Clone + Debug + Eq + Hash,
{
	/// Adds an entry, returning the existing index when already present.
	pub fn add(&mut self, entry: T) -> u32 {
		if let Some(index) = self.map.get(&entry) {
			return *index;
		}
		let index = self.list.len() as u32;
		self.map.insert(entry.clone(), index);
		self.list.push(entry);
		index
	}

	pub fn get(&self, id: u32) -> Result<&T> {
		self.list.get(id as usize).ok_or_else(|| anyhow!("id {id} not found"))
	}

	pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
		self.list.iter()
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.list.len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.list.is_empty()
	}
}

impl<T: Clone + Debug + Eq + Hash> Default for LookupTable<T> {
	fn default() -> LookupTable<T> {
		LookupTable {
			list: Vec::new(),
			map: HashMap::new(),
		}
	}
}

impl<T> Debug for LookupTable<T>
where
	T: Clone + Debug + Eq + Hash,
{
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_list().entries(&self.list).finish()
	}
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct PropertyManager {
	pub keys: LookupTable<String>,
	pub values: LookupTable<GeoValue>,
}

impl PropertyManager {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	pub fn add_key(&mut self, key: String) -> u32 {
		self.keys.add(key)
	}

	pub fn add_value(&mut self, value: GeoValue) -> u32 {
		self.values.add(value)
	}

	/// Encodes a property map into interleaved key/value index pairs,
	/// growing the tables on first use. Entries appear in the tables in
	/// first-use order.
	pub fn encode_tag_ids(&mut self, properties: GeoProperties) -> Vec<u32> {
		let mut tag_ids = Vec::with_capacity(properties.len() * 2);
		for (key, value) in properties {
			tag_ids.push(self.keys.add(key));
			tag_ids.push(self.values.add(value));
		}
		tag_ids
	}

	/// Decodes interleaved key/value index pairs into a property map.
	/// References outside the tables are an error.
	pub fn decode_tag_ids(&self, tag_ids: &[u32]) -> Result<GeoProperties> {
		ensure!(tag_ids.len() % 2 == 0, "tag id count must be even");
		let mut properties = GeoProperties::new();
		for pair in tag_ids.chunks_exact(2) {
			properties.insert(
				self.keys.get(pair[0]).context("failed to get property key")?.clone(),
				self.values.get(pair[1]).context("failed to get property value")?.clone(),
			);
		}
		Ok(properties)
	}
}
