//! Finite-difference gradient and curl on a regular grid.
//!
//! Derivatives are taken in index units: second-order central differences
//! in the interior and first-order one-sided differences at the two edges.
//! An axis of extent 1 has no neighbours and contributes a zero derivative.

use ndarray::{Array3, ArrayView3, Axis, Slice, Zip};

/// Derivative of `f` along `axis`.
pub fn gradient(f: ArrayView3<'_, f64>, axis: Axis) -> Array3<f64> {
    let n = f.len_of(axis);
    let mut grad = Array3::zeros(f.raw_dim());
    if n < 2 {
        return grad;
    }

    if n > 2 {
        let forward = f.slice_axis(axis, Slice::from(2..n));
        let backward = f.slice_axis(axis, Slice::from(0..n - 2));
        Zip::from(grad.slice_axis_mut(axis, Slice::from(1..n - 1)))
            .and(&forward)
            .and(&backward)
            .for_each(|g, &p, &m| *g = 0.5 * (p - m));
    }

    Zip::from(grad.index_axis_mut(axis, 0))
        .and(f.index_axis(axis, 1))
        .and(f.index_axis(axis, 0))
        .for_each(|g, &p, &m| *g = p - m);
    Zip::from(grad.index_axis_mut(axis, n - 1))
        .and(f.index_axis(axis, n - 1))
        .and(f.index_axis(axis, n - 2))
        .for_each(|g, &p, &m| *g = p - m);

    grad
}

/// Curl of a field given as x, y and z component grids of shape `(Z, Y, X)`.
pub fn curl(components: [ArrayView3<'_, f64>; 3]) -> [Array3<f64>; 3] {
    let [f_x, f_y, f_z] = components;
    let (z, y, x) = (Axis(0), Axis(1), Axis(2));

    let b_x = gradient(f_z, y) - gradient(f_y, z);
    let b_y = gradient(f_x, z) - gradient(f_z, x);
    let b_z = gradient(f_y, x) - gradient(f_x, y);
    [b_x, b_y, b_z]
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::Array1;

    #[test]
    fn test_gradient_matches_central_and_edge_differences() {
        let values = Array1::from(vec![1.0, 2.0, 4.0, 7.0, 11.0]);
        let f = values.into_shape_with_order((1, 1, 5)).unwrap();
        let g = gradient(f.view(), Axis(2));
        let expected = [1.0, 1.5, 2.5, 3.5, 4.0];
        for (got, want) in g.iter().zip(expected) {
            assert_abs_diff_eq!(*got, want, epsilon = 1e-15);
        }
    }

    #[test]
    fn test_gradient_two_points_and_singleton_axis() {
        let f = Array3::from_shape_vec((2, 1, 1), vec![3.0, 5.0]).unwrap();
        let g = gradient(f.view(), Axis(0));
        assert_eq!(g.iter().copied().collect::<Vec<_>>(), vec![2.0, 2.0]);

        let g = gradient(f.view(), Axis(1));
        assert!(g.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_curl_of_rotation_field() {
        // A = (-y, x, 0) has curl (0, 0, 2) everywhere, edges included.
        let dim = (2, 4, 5);
        let a_x = Array3::from_shape_fn(dim, |(_, j, _)| -(j as f64));
        let a_y = Array3::from_shape_fn(dim, |(_, _, i)| i as f64);
        let a_z = Array3::zeros(dim);
        let [b_x, b_y, b_z] = curl([a_x.view(), a_y.view(), a_z.view()]);
        assert!(b_x.iter().all(|&v| v.abs() < 1e-15));
        assert!(b_y.iter().all(|&v| v.abs() < 1e-15));
        assert!(b_z.iter().all(|&v| (v - 2.0).abs() < 1e-15));
    }

    #[test]
    fn test_curl_of_gradient_field_vanishes_in_interior() {
        let dim = (5, 5, 5);
        // A = grad(kj + 2ji + ik) with (k, j, i) = (z, y, x).
        let a_x = Array3::from_shape_fn(dim, |(k, j, _)| (2 * j + k) as f64);
        let a_y = Array3::from_shape_fn(dim, |(k, _, i)| (k + 2 * i) as f64);
        let a_z = Array3::from_shape_fn(dim, |(_, j, i)| (j + i) as f64);
        let b = curl([a_x.view(), a_y.view(), a_z.view()]);
        for comp in &b {
            assert!(comp.iter().all(|&v| v.abs() < 1e-12));
        }
    }
}
