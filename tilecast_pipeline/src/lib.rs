//! Post-processing of tile layers.
//!
//! A [`PostProcessor`] holds a configuration mapping layer names to
//! scale-range entries, each carrying an ordered chain of feature
//! transformers ("izers"). Configs load all-or-nothing and swap in
//! atomically, so in-flight requests always see a coherent snapshot.

mod config;
mod factory;
mod izers;
mod processor;

pub use config::{RawConfig, RawScaleRange};
pub use factory::IzerFactory;
pub use izers::Izer;
pub use processor::PostProcessor;
