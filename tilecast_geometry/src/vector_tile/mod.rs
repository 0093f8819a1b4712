//! The compact binary tile representation and its codec.
//!
//! Wire layout (length-prefixed nested messages):
//! * `Tile`: field 3 = repeated `Layer`
//! * `Layer`: 1 = name, 2 = repeated `Feature`, 3 = repeated key,
//!   4 = repeated value, 5 = extent (default 4096), 15 = version (default 1)
//! * `Feature`: 1 = id, 2 = packed tag ids, 3 = geometry type,
//!   4 = geometry command stream
//!
//! The geometry command stream packs a command id (1 = MoveTo, 2 = LineTo,
//! 7 = ClosePath) in the low three bits of a run header, the repeat count in
//! the remaining bits, followed by zigzag-encoded coordinate deltas.

mod feature;
mod geometry_type;
mod interest;
mod layer;
mod property_manager;
mod tile;
mod value;

pub use feature::VectorTileFeature;
pub use geometry_type::GeomType;
pub use interest::is_interesting;
pub use layer::VectorTileLayer;
pub use property_manager::PropertyManager;
pub use tile::VectorTile;
