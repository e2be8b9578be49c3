//! # Holomag Shapes
//!
//! Building blocks for test objects of the holomag framework:
//!
//! - **Shapes** ([`shapes`]) - Slabs, discs, spheres, ellipsoids, filaments
//!   and single pixels, rasterised into boolean masks on a `(Z, Y, X)` grid.
//! - **Magnetization distributions** ([`magcreator`]) - Homogeneous and
//!   vortex magnetization inside a mask, as `(3, Z, Y, X)` arrays.

pub mod magcreator;
pub mod shapes;

pub use magcreator::{create_mag_dist_homog, create_mag_dist_vortex};
pub use shapes::{Shape, ShapeAxis};
