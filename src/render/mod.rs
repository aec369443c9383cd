//! Software flag renderer
//!
//! The flag is a fixed 31x53 lattice of vertices. Every frame the lattice is
//! displaced by a closed-form wave field, then the source artwork is mapped
//! through each grid cell with a per-triangle affine transform. Shading,
//! outline and ordered-dither passes composite on top.

mod field;
mod mesh;
mod raster;
mod dither;
mod passes;

pub use field::*;
pub use mesh::*;
pub use raster::*;
pub use dither::*;
pub use passes::*;

/// Mesh resolution: cells across / down. The vertex lattice is one larger
/// in each direction.
pub const COLS: usize = 52;
pub const ROWS: usize = 30;

/// Source artwork resolution in logical pixels.
pub const SRC_W: usize = 1050;
pub const SRC_H: usize = 700;

pub const TAU: f32 = std::f32::consts::TAU;
