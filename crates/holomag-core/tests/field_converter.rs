//! Integration test: vector potential and B-field of a uniformly magnetized
//! sphere.

use std::f64::consts::FRAC_PI_2;
use std::sync::Arc;

use approx::assert_relative_eq;
use holomag_core::converter::FieldConverter;
use holomag_core::types::VectorField;
use holomag_shapes::shapes::{Shape, Sphere};
use holomag_shapes::create_mag_dist_homog;
use holomag_spectral::{EvenBackend, PowerOfTwoBackend, SpectralBackend};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Sphere of radius 6 centred on cell (8, 8, 8) of a 17^3 grid.
fn sphere_along(phi: f64, theta: f64) -> VectorField {
    let sphere = Shape::Sphere(Sphere {
        center: [8.5, 8.5, 8.5],
        radius: 6.0,
    });
    let mask = sphere.mask([17, 17, 17]);
    VectorField::new(1.0, create_mag_dist_homog(&mask, phi, theta, 1.0)).unwrap()
}

#[test]
fn test_backends_agree_on_sphere() {
    init_logging();
    let mag = sphere_along(0.4, 1.1);
    let backends: [Arc<dyn SpectralBackend>; 2] =
        [Arc::new(PowerOfTwoBackend::new()), Arc::new(EvenBackend::new())];
    let [pow2, even] = backends.map(|b| FieldConverter::new(b).convert_m_to_a(&mag, 1.0).unwrap());

    let scale = pow2.field().iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
    assert!(scale > 0.0);
    for (p, e) in pow2.field().iter().zip(even.field()) {
        assert!((p - e).abs() <= 1e-6 * scale, "{p} vs {e}");
    }
}

#[test]
fn test_sphere_interior_field_is_two_thirds_of_b_0() {
    init_logging();
    let b_0 = 1.5;
    let mag = sphere_along(0.0, 0.0);
    let converter = FieldConverter::new(Arc::new(EvenBackend::new()));
    let b_field = converter.convert_m_to_b(&mag, b_0).unwrap();
    let centre = |c: usize| b_field.field()[[c, 8, 8, 8]];

    assert_relative_eq!(centre(2), 2.0 / 3.0 * b_0, max_relative = 0.02);
    assert!(centre(0).abs() < 1e-10);
    assert!(centre(1).abs() < 1e-10);
}

#[test]
fn test_rotated_magnetization_rotates_the_field() {
    init_logging();
    let converter = FieldConverter::new(Arc::new(EvenBackend::new()));
    let along_x = converter.convert_m_to_b(&sphere_along(0.0, FRAC_PI_2), 1.0).unwrap();
    let along_y = converter
        .convert_m_to_b(&sphere_along(FRAC_PI_2, FRAC_PI_2), 1.0)
        .unwrap();
    // The sphere is symmetric under x <-> y, which swaps the roles of the
    // two magnetization directions.
    let (bx, by) = (along_x.field(), along_y.field());
    for (k, j, i) in [(8, 8, 8), (3, 8, 10), (12, 5, 9)] {
        assert!((bx[[0, k, j, i]] - by[[1, k, i, j]]).abs() < 1e-10);
        assert!((bx[[2, k, j, i]] - by[[2, k, i, j]]).abs() < 1e-10);
    }
}
