//! The izers: feature-list transformers dispatched by the post processor.

mod adminizer;
mod generalizer;
mod labelizer;
mod mergenizer;
mod unionizer;

pub use adminizer::create_adminizer;
pub use generalizer::create_generalizer;
pub use labelizer::create_labelizer;
pub use mergenizer::create_mergenizer;
pub use unionizer::create_unionizer;

use anyhow::Result;
use std::fmt::Debug;
use tilecast_geometry::GeoFeature;

/// One post-processing transform. Mutates a layer's feature list in place.
pub trait Izer: Debug + Send + Sync {
	fn process(&self, features: &mut Vec<GeoFeature>) -> Result<()>;
}
