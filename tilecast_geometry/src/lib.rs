//! Feature model and vector tile codec.
//!
//! The `geo` module holds the high-level feature representation used by the
//! post-processing pipeline; the `vector_tile` module holds the compact
//! binary representation and its codec.

mod geo;
pub mod vector_tile;

pub use geo::*;
