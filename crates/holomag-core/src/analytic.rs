//! Closed-form phase maps of homogeneously magnetized bodies.
//!
//! These are used to validate the numerical pipeline. All bodies are
//! magnetized in-plane with angle `phi` from the x-axis and projected along
//! z, so the resulting image has shape `(Y, X)`. Pixel `(j, i)` is evaluated
//! at $x = a(i + 1/2)$, $y = a(j + 1/2)$; centres and sizes are given in
//! pixel units `(z, y, x)`.

use std::f64::consts::PI;

use ndarray::Array2;

use crate::error::{HoloError, Result};
use crate::types::{PhaseMap, PHI_0};

fn validate(dim: [usize; 3], a: f64, b_0: f64, lengths: &[f64]) -> Result<()> {
    if dim.contains(&0) {
        return Err(HoloError::InvalidInput(format!("grid must be non-empty, got {dim:?}")));
    }
    if !(a.is_finite() && a > 0.0) {
        return Err(HoloError::InvalidInput(format!(
            "grid spacing must be positive and finite, got {a}"
        )));
    }
    if !b_0.is_finite() {
        return Err(HoloError::InvalidInput(format!("b_0 must be finite, got {b_0}")));
    }
    if lengths.iter().any(|&l| !(l.is_finite() && l > 0.0)) {
        return Err(HoloError::InvalidInput(format!(
            "body dimensions must be positive, got {lengths:?}"
        )));
    }
    Ok(())
}

/// Evaluate `f(x - x0, y - y0)` on the pixel centres of a `(Y, X)` image.
fn sample<F>(dim: [usize; 3], a: f64, center: [f64; 3], f: F) -> Result<PhaseMap>
where
    F: Fn(f64, f64) -> f64,
{
    let (y0, x0) = (a * center[1], a * center[2]);
    let phase = Array2::from_shape_fn((dim[1], dim[2]), |(j, i)| {
        let x = a * (i as f64 + 0.5);
        let y = a * (j as f64 + 0.5);
        f(x - x0, y - y0)
    });
    PhaseMap::new(a, phase)
}

/// Phase of a disc with axis along z.
pub fn phase_mag_disc(
    dim: [usize; 3],
    a: f64,
    phi: f64,
    center: [f64; 3],
    radius: f64,
    height: f64,
    b_0: f64,
) -> Result<PhaseMap> {
    validate(dim, a, b_0, &[radius, height])?;
    let r_disc = a * radius;
    let coeff = PI * b_0 / (2.0 * PHI_0) * a * height;
    sample(dim, a, center, |x, y| {
        let rho_sq = x * x + y * y;
        let inner = coeff * (y * phi.cos() - x * phi.sin());
        if rho_sq <= r_disc * r_disc {
            inner
        } else {
            inner * r_disc * r_disc / rho_sq
        }
    })
}

/// Phase of a sphere.
pub fn phase_mag_sphere(
    dim: [usize; 3],
    a: f64,
    phi: f64,
    center: [f64; 3],
    radius: f64,
    b_0: f64,
) -> Result<PhaseMap> {
    validate(dim, a, b_0, &[radius])?;
    let r_sphere = a * radius;
    let coeff = 2.0 * PI * b_0 / (3.0 * PHI_0);
    sample(dim, a, center, |x, y| {
        let rho_sq = x * x + y * y;
        let bracket = y * phi.cos() - x * phi.sin();
        let profile = if rho_sq <= r_sphere * r_sphere {
            1.0 - (1.0 - rho_sq / (r_sphere * r_sphere)).powf(1.5)
        } else {
            1.0
        };
        coeff * r_sphere.powi(3) / (rho_sq + 1e-30) * bracket * profile
    })
}

/// Antiderivative with $\partial_x \partial_y F_0 = 2y / (x^2 + y^2)$.
fn f0(x: f64, y: f64) -> f64 {
    let log_term = (x * x + y * y + 1e-30).ln();
    let atan_term = if y == 0.0 { 0.0 } else { (x / y).atan() };
    x * log_term - 2.0 * x + 2.0 * y * atan_term
}

/// Phase of a rectangular slab with edges along the grid axes.
///
/// `width` is the extent `(z, y, x)` of the slab in pixels.
pub fn phase_mag_slab(
    dim: [usize; 3],
    a: f64,
    phi: f64,
    center: [f64; 3],
    width: [f64; 3],
    b_0: f64,
) -> Result<PhaseMap> {
    validate(dim, a, b_0, &width)?;
    let [lz, ly, lx] = width.map(|w| a * w);
    let coeff = b_0 * lz / (4.0 * PHI_0);
    sample(dim, a, center, |x, y| {
        let (n1, n2) = (x - lx / 2.0, x + lx / 2.0);
        let (m1, m2) = (y - ly / 2.0, y + ly / 2.0);
        let along_x = f0(n2, m2) - f0(n1, m2) - f0(n2, m1) + f0(n1, m1);
        let along_y = f0(m2, n2) - f0(m1, n2) - f0(m2, n1) + f0(m1, n1);
        coeff * (phi.cos() * along_x - phi.sin() * along_y)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_disc_is_linear_inside_and_decays_outside() {
        let dim = [1, 64, 64];
        let map = phase_mag_disc(dim, 1.0, 0.0, [0.5, 32.0, 32.0], 10.0, 1.0, 1.0).unwrap();
        let phase = map.phase();
        // Pixel centre y = 40.5 lies 8.5 above the disc centre.
        let coeff = PI / (2.0 * PHI_0);
        assert_relative_eq!(phase[[40, 32]], coeff * 8.5, max_relative = 1e-12);
        assert_relative_eq!(phase[[23, 32]], -coeff * 8.5, max_relative = 1e-12);
        // Outside, at (dx, dy) = (0.5, 20.5): (R / rho)^2 falloff.
        assert_relative_eq!(
            phase[[52, 32]],
            coeff * 20.5 * 100.0 / (20.5 * 20.5 + 0.25),
            max_relative = 1e-12
        );
    }

    #[test]
    fn test_rotating_phi_rotates_the_map() {
        let dim = [1, 32, 32];
        let along_x = phase_mag_sphere(dim, 1.0, 0.0, [0.5, 16.0, 16.0], 6.0, 1.0).unwrap();
        let along_y = phase_mag_sphere(dim, 1.0, FRAC_PI_2, [0.5, 16.0, 16.0], 6.0, 1.0).unwrap();
        // Rotating the magnetization by 90 degrees rotates the map by 90 degrees.
        for (j, i) in [(20usize, 13usize), (5, 25), (16, 30)] {
            let (dy, dx) = (j as f64 - 15.5, i as f64 - 15.5);
            let (jr, ir) = ((15.5 + dx) as usize, (15.5 - dy) as usize);
            assert_abs_diff_eq!(along_x.phase()[[j, i]], along_y.phase()[[jr, ir]], epsilon = 1e-12);
        }
    }

    #[test]
    fn test_slab_is_odd_about_its_centre() {
        let dim = [1, 20, 20];
        let map = phase_mag_slab(dim, 2.0, 0.3, [0.5, 10.0, 10.0], [1.0, 6.0, 4.0], 1.0).unwrap();
        let phase = map.phase();
        for (j, i) in [(3usize, 4usize), (10, 12), (15, 1)] {
            assert_abs_diff_eq!(phase[[j, i]], -phase[[19 - j, 19 - i]], epsilon = 1e-12);
        }
    }

    #[test]
    fn test_invalid_bodies() {
        assert!(phase_mag_disc([1, 4, 4], 1.0, 0.0, [0.5, 2.0, 2.0], 0.0, 1.0, 1.0).is_err());
        assert!(phase_mag_sphere([1, 4, 4], -1.0, 0.0, [0.5, 2.0, 2.0], 1.0, 1.0).is_err());
        assert!(phase_mag_slab([1, 0, 4], 1.0, 0.0, [0.5, 2.0, 2.0], [1.0; 3], 1.0).is_err());
    }
}
