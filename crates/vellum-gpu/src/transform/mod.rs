//! Transforms applied by the draw dispatcher.
//!
//! - [`GeometryMatrix`]: 2D affine transform applied to quad positions before projection.
//! - [`ColorMatrix`]: 4x5 affine transform applied to sampled straight-alpha colors.

mod color;
mod geometry;

pub use color::ColorMatrix;
pub use geometry::GeometryMatrix;
