mod blob;
mod scale;
mod tile_coord;

pub use blob::Blob;
pub use scale::{scale_for_zoom, WORLD_SIZE};
pub use tile_coord::TileCoord;
