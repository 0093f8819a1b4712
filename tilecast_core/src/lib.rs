//! Shared primitives for the tilecast workspace: byte buffers, tile
//! coordinates, scale math and the binary io layer used by the tile codec.

pub mod io;
pub mod types;

pub use types::*;
