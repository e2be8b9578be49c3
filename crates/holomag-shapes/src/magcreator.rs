//! Magnetization distributions inside a shape mask.
//!
//! The returned arrays have shape `(3, Z, Y, X)` with the x, y and z
//! components along the leading axis, and are zero outside the mask.

use std::f64::consts::FRAC_PI_2;

use ndarray::{Array3, Array4, Axis, Zip};

use crate::shapes::ShapeAxis;

/// Homogeneous magnetization with azimuth `phi` (from x, in the xy-plane) and
/// polar angle `theta` (from z).
pub fn create_mag_dist_homog(
    mask: &Array3<bool>,
    phi: f64,
    theta: f64,
    amplitude: f64,
) -> Array4<f64> {
    let direction = [
        amplitude * phi.cos() * theta.sin(),
        amplitude * phi.sin() * theta.sin(),
        amplitude * theta.cos(),
    ];
    let (z, y, x) = mask.dim();
    let mut field = Array4::zeros((3, z, y, x));
    for (mut comp, value) in field.axis_iter_mut(Axis(0)).zip(direction) {
        Zip::from(&mut comp).and(mask).for_each(|m, &inside| {
            if inside {
                *m = value;
            }
        });
    }
    field
}

/// In-plane vortex circulating about `axis` through `center` (px, `(z, y, x)`).
///
/// The centre defaults to the middle of the grid. In the plane spanned by
/// the two other axes `(p, q)`, the magnetization at angle
/// $\alpha = \operatorname{atan2}(q, p)$ points along $\alpha - \pi/2$.
pub fn create_mag_dist_vortex(
    mask: &Array3<bool>,
    center: Option<[f64; 3]>,
    axis: ShapeAxis,
    amplitude: f64,
) -> Array4<f64> {
    let (z, y, x) = mask.dim();
    let center = center.unwrap_or([z as f64 / 2.0, y as f64 / 2.0, x as f64 / 2.0]);
    // In-plane axes in (z, y, x) index order, forming a right-handed pair with `axis`.
    let (p, q) = match axis {
        ShapeAxis::Z => (2, 1),
        ShapeAxis::X => (1, 0),
        ShapeAxis::Y => (0, 2),
    };
    // Component slot (x = 0, y = 1, z = 2) of array axis `ax`.
    let slot = |ax: usize| 2 - ax;

    let mut field = Array4::zeros((3, z, y, x));
    for ((k, j, i), &inside) in mask.indexed_iter() {
        if !inside {
            continue;
        }
        let c = [k as f64 + 0.5, j as f64 + 0.5, i as f64 + 0.5];
        let angle = (c[q] - center[q]).atan2(c[p] - center[p]) - FRAC_PI_2;
        field[[slot(p), k, j, i]] = amplitude * angle.cos();
        field[[slot(q), k, j, i]] = amplitude * angle.sin();
    }
    log::debug!("Created vortex about {axis:?} through {center:?}");
    field
}
