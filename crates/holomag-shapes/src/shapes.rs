//! Magnetic shapes on a regular grid.
//!
//! Every shape is described in pixel units with coordinates ordered
//! `(z, y, x)`, matching the array layout. A cell `(k, j, i)` belongs to a
//! continuous shape if its centre `(k + 0.5, j + 0.5, i + 0.5)` lies inside.
//! Filaments and pixels are addressed by integer cell indices instead.

use ndarray::Array3;
use serde::{Deserialize, Serialize};

/// A grid axis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeAxis {
    X,
    Y,
    #[default]
    Z,
}

impl ShapeAxis {
    /// Array axis index in `(z, y, x)` order.
    pub fn index(self) -> usize {
        match self {
            ShapeAxis::Z => 0,
            ShapeAxis::Y => 1,
            ShapeAxis::X => 2,
        }
    }

    /// The two other axis indices, in increasing order.
    pub fn others(self) -> [usize; 2] {
        match self {
            ShapeAxis::Z => [1, 2],
            ShapeAxis::Y => [0, 2],
            ShapeAxis::X => [0, 1],
        }
    }
}

/// A magnetic shape that can be rasterised into a mask.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Shape {
    Slab(Slab),
    Disc(Disc),
    Sphere(Sphere),
    Ellipsoid(Ellipsoid),
    Filament(Filament),
    Pixel(Pixel),
}

/// An axis-aligned box.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slab {
    /// Centre (px).
    pub center: [f64; 3],
    /// Full extents along z, y, x (px).
    pub width: [f64; 3],
}

/// A cylinder with its axis along one grid axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Disc {
    /// Centre (px).
    pub center: [f64; 3],
    /// Radius (px).
    pub radius: f64,
    /// Extent along the axis (px).
    pub height: f64,
    #[serde(default)]
    pub axis: ShapeAxis,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sphere {
    /// Centre (px).
    pub center: [f64; 3],
    /// Radius (px).
    pub radius: f64,
}

/// An axis-aligned ellipsoid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ellipsoid {
    /// Centre (px).
    pub center: [f64; 3],
    /// Semi-axis lengths along z, y, x (px).
    pub semi_axes: [f64; 3],
}

/// A one-cell-thick line through the whole grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filament {
    /// Cell indices along the two other axes, in `(z, y, x)` order.
    pub position: [usize; 2],
    #[serde(default)]
    pub axis: ShapeAxis,
}

/// A single cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pixel {
    /// Cell index `(k, j, i)`.
    pub position: [usize; 3],
}

impl Shape {
    /// Whether cell `(k, j, i)` belongs to the shape.
    pub fn contains(&self, cell: [usize; 3]) -> bool {
        let c = cell.map(|idx| idx as f64 + 0.5);
        match self {
            Shape::Slab(s) => (0..3).all(|ax| (c[ax] - s.center[ax]).abs() <= s.width[ax] / 2.0),
            Shape::Disc(d) => {
                let along = d.axis.index();
                let [p, q] = d.axis.others();
                let (dp, dq) = (c[p] - d.center[p], c[q] - d.center[q]);
                dp * dp + dq * dq <= d.radius * d.radius
                    && (c[along] - d.center[along]).abs() <= d.height / 2.0
            }
            Shape::Sphere(s) => {
                let r_sq: f64 = (0..3).map(|ax| (c[ax] - s.center[ax]).powi(2)).sum();
                r_sq <= s.radius * s.radius
            }
            Shape::Ellipsoid(e) => {
                let r_sq: f64 = (0..3)
                    .map(|ax| ((c[ax] - e.center[ax]) / e.semi_axes[ax]).powi(2))
                    .sum();
                r_sq <= 1.0
            }
            Shape::Filament(f) => {
                let [p, q] = f.axis.others();
                cell[p] == f.position[0] && cell[q] == f.position[1]
            }
            Shape::Pixel(px) => cell == px.position,
        }
    }

    /// Rasterise onto a grid of shape `(Z, Y, X)`.
    pub fn mask(&self, dim: [usize; 3]) -> Array3<bool> {
        let mask = Array3::from_shape_fn(dim, |(k, j, i)| self.contains([k, j, i]));
        log::debug!(
            "Rasterised {} onto {dim:?}: {} cells",
            self.name(),
            mask.iter().filter(|&&m| m).count()
        );
        mask
    }

    pub fn name(&self) -> &'static str {
        match self {
            Shape::Slab(_) => "slab",
            Shape::Disc(_) => "disc",
            Shape::Sphere(_) => "sphere",
            Shape::Ellipsoid(_) => "ellipsoid",
            Shape::Filament(_) => "filament",
            Shape::Pixel(_) => "pixel",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count(mask: &Array3<bool>) -> usize {
        mask.iter().filter(|&&m| m).count()
    }

    #[test]
    fn test_slab_covers_whole_cells() {
        let slab = Shape::Slab(Slab {
            center: [2.0, 8.0, 8.0],
            width: [2.0, 6.0, 4.0],
        });
        let mask = slab.mask([4, 16, 16]);
        assert_eq!(count(&mask), 2 * 6 * 4);
        assert!(mask[[1, 5, 6]]);
        assert!(!mask[[1, 5, 10]]);
    }

    #[test]
    fn test_disc_along_each_axis() {
        for axis in [ShapeAxis::X, ShapeAxis::Y, ShapeAxis::Z] {
            let disc = Shape::Disc(Disc {
                center: [8.0, 8.0, 8.0],
                radius: 4.0,
                height: 2.0,
                axis,
            });
            let mask = disc.mask([16, 16, 16]);
            // 2 layers of a radius-4 pixel disc (52 cells each).
            assert_eq!(count(&mask), 2 * 52, "{axis:?}");
        }
    }

    #[test]
    fn test_sphere_volume() {
        let sphere = Shape::Sphere(Sphere {
            center: [16.0, 16.0, 16.0],
            radius: 10.0,
        });
        let n = count(&sphere.mask([32, 32, 32])) as f64;
        let volume = 4.0 / 3.0 * std::f64::consts::PI * 1000.0;
        assert!((n - volume).abs() / volume < 0.05, "{n} cells");
    }

    #[test]
    fn test_ellipsoid_reduces_to_sphere() {
        let ellipsoid = Shape::Ellipsoid(Ellipsoid {
            center: [5.0, 6.0, 7.0],
            semi_axes: [3.0, 3.0, 3.0],
        });
        let sphere = Shape::Sphere(Sphere {
            center: [5.0, 6.0, 7.0],
            radius: 3.0,
        });
        assert_eq!(ellipsoid.mask([10, 12, 14]), sphere.mask([10, 12, 14]));
    }

    #[test]
    fn test_filament_and_pixel() {
        let filament = Shape::Filament(Filament {
            position: [0, 3],
            axis: ShapeAxis::Y,
        });
        let mask = filament.mask([1, 8, 8]);
        assert_eq!(count(&mask), 8);
        assert!(mask[[0, 5, 3]]);

        let pixel = Shape::Pixel(Pixel { position: [0, 2, 1] });
        let mask = pixel.mask([1, 4, 4]);
        assert_eq!(count(&mask), 1);
        assert!(mask[[0, 2, 1]]);
        assert_eq!(count(&Shape::Pixel(Pixel { position: [5, 5, 5] }).mask([1, 4, 4])), 0);
    }

    #[test]
    fn test_shapes_deserialise_from_toml() {
        let shape: Shape = toml::from_str(
            r#"
            type = "disc"
            center = [0.5, 16.0, 16.0]
            radius = 8.0
            height = 1.0
            "#,
        )
        .unwrap();
        assert_eq!(shape.name(), "disc");
        match &shape {
            Shape::Disc(d) => assert_eq!(d.axis, ShapeAxis::Z),
            other => panic!("unexpected shape {other:?}"),
        }
        let text = toml::to_string(&shape).unwrap();
        assert_eq!(toml::from_str::<Shape>(&text).unwrap(), shape);
    }
}
