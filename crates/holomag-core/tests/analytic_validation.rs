//! Integration test: simulated phase maps against closed-form solutions.
//!
//! A disc simulated with the disc kernel should approach the analytic disc
//! phase away from its rim, and a pixel-aligned slab simulated with the
//! slab kernel reproduces the analytic slab phase exactly.

use std::f64::consts::FRAC_PI_2;
use std::sync::Arc;

use holomag_core::analytic::{phase_mag_disc, phase_mag_slab};
use holomag_core::dataset::DataSet;
use holomag_core::phasemapper::KernelGeometry;
use holomag_core::projection::{ProjectionAxis, Projector};
use holomag_core::types::{PhaseMap, VectorField};
use holomag_shapes::create_mag_dist_homog;
use holomag_shapes::shapes::{Disc, Shape, ShapeAxis, Slab};
use holomag_spectral::EvenBackend;
use ndarray::{Array2, Array3};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Phase of a homogeneous in-plane magnetization inside `mask`, projected along z.
fn simulate(
    a: f64,
    mask: &Array3<bool>,
    phi: f64,
    geometry: KernelGeometry,
) -> PhaseMap {
    let (z, y, x) = mask.dim();
    let dim = [z, y, x];
    let mut data = DataSet::new(a, dim, 1.0, None, Arc::new(EvenBackend::new()))
        .unwrap()
        .with_kernel_geometry(geometry)
        .unwrap();
    data.append(
        PhaseMap::new(a, Array2::zeros((y, x))).unwrap(),
        Projector::simple(dim, ProjectionAxis::Z).unwrap(),
    )
    .unwrap();
    let mag = VectorField::new(a, create_mag_dist_homog(mask, phi, FRAC_PI_2, 1.0)).unwrap();
    data.create_phase_maps(&mag).unwrap().remove(0)
}

fn max_abs(map: &PhaseMap) -> f64 {
    map.phase().iter().fold(0.0_f64, |acc, p| acc.max(p.abs()))
}

#[test]
fn test_disc_matches_analytic_inside() {
    init_logging();
    let (a, dim, center, radius) = (1.0, [2, 64, 64], [1.0, 32.0, 32.0], 16.0);
    let mask = Shape::Disc(Disc {
        center,
        radius,
        height: 2.0,
        axis: ShapeAxis::Z,
    })
    .mask(dim);

    for phi in [0.0, 0.6] {
        let simulated = simulate(a, &mask, phi, KernelGeometry::Disc);
        let analytic = phase_mag_disc(dim, a, phi, center, radius, 2.0, 1.0).unwrap();
        let scale = max_abs(&analytic);
        for ((j, i), &expected) in analytic.phase().indexed_iter() {
            let (dx, dy) = (i as f64 + 0.5 - center[2], j as f64 + 0.5 - center[1]);
            if dx * dx + dy * dy < (radius / 2.0).powi(2) {
                let found = simulated.phase()[[j, i]];
                assert!(
                    (found - expected).abs() < 1e-2 * scale,
                    "phi = {phi}, pixel ({j}, {i}): {found} vs {expected}"
                );
            }
        }
    }
}

#[test]
fn test_pixel_aligned_slab_is_exact() {
    init_logging();
    let (a, dim, center, width) = (2.0, [2, 32, 32], [1.0, 16.0, 16.0], [2.0, 8.0, 6.0]);
    let mask = Shape::Slab(Slab { center, width }).mask(dim);
    assert_eq!(mask.iter().filter(|&&m| m).count(), 2 * 8 * 6);

    for phi in [0.0, 1.0, -2.3] {
        let simulated = simulate(a, &mask, phi, KernelGeometry::Slab);
        let analytic = phase_mag_slab(dim, a, phi, center, width, 1.0).unwrap();
        let scale = max_abs(&analytic);
        assert!(scale > 0.0);
        for (found, expected) in simulated.phase().iter().zip(analytic.phase()) {
            assert!(
                (found - expected).abs() < 1e-9 * scale,
                "phi = {phi}: {found} vs {expected}"
            );
        }
    }
}
