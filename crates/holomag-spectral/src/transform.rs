//! N-dimensional real FFTs built from 1-D `rustfft` plans.
//!
//! The forward transform promotes each lane along the last axis to complex,
//! runs a full-length complex FFT on it and keeps the first `n / 2 + 1`
//! bins, then runs complex FFTs along every other axis. The inverse
//! undoes the leading axes first; each remaining lane along the last axis is
//! then Hermitian on its own and is rebuilt to full length before the final
//! complex inverse.

use ndarray::{ArrayD, ArrayViewD, Axis, IxDyn, Slice, Zip};
use num_complex::Complex64;
use rustfft::{FftDirection, FftPlanner};

use crate::backend::SpectralError;

fn validate_shape(shape: &[usize]) -> Result<(), SpectralError> {
    if shape.is_empty() || shape.contains(&0) {
        return Err(SpectralError::InvalidShape(format!(
            "transform shape must be non-empty with positive extents, got {shape:?}"
        )));
    }
    Ok(())
}

/// Shape of the half spectrum produced by `rfftn` over `shape`.
pub(crate) fn half_spectrum_shape(shape: &[usize]) -> Vec<usize> {
    let mut half = shape.to_vec();
    if let Some(last) = half.last_mut() {
        *last = *last / 2 + 1;
    }
    half
}

/// In-place complex FFT along one axis (unnormalised in both directions).
fn transform_axis(
    planner: &mut FftPlanner<f64>,
    data: &mut ArrayD<Complex64>,
    axis: Axis,
    direction: FftDirection,
) {
    let len = data.len_of(axis);
    if len < 2 {
        return;
    }
    let fft = planner.plan_fft(len, direction);
    let mut buffer = vec![Complex64::new(0.0, 0.0); len];
    let mut scratch = vec![Complex64::new(0.0, 0.0); fft.get_inplace_scratch_len()];

    for mut lane in data.lanes_mut(axis) {
        for (b, x) in buffer.iter_mut().zip(lane.iter()) {
            *b = *x;
        }
        fft.process_with_scratch(&mut buffer, &mut scratch);
        for (x, b) in lane.iter_mut().zip(buffer.iter()) {
            *x = *b;
        }
    }
}

/// Real-to-complex transform with numpy `rfftn(input, shape)` semantics.
pub(crate) fn forward_real(
    planner: &mut FftPlanner<f64>,
    input: ArrayViewD<'_, f64>,
    shape: &[usize],
) -> Result<ArrayD<Complex64>, SpectralError> {
    validate_shape(shape)?;
    if input.ndim() != shape.len() {
        return Err(SpectralError::ShapeMismatch {
            expected: shape.to_vec(),
            found: input.shape().to_vec(),
        });
    }

    // Zero-pad (or crop) at the far end of every axis.
    let mut padded = ArrayD::<f64>::zeros(IxDyn(shape));
    let src = input.slice_each_axis(|ax| Slice::from(0..ax.len.min(shape[ax.axis.index()])));
    padded
        .slice_each_axis_mut(|ax| Slice::from(0..src.len_of(ax.axis)))
        .assign(&src);

    let last = shape.len() - 1;
    let n = shape[last];
    let mut spectrum = ArrayD::<Complex64>::zeros(IxDyn(&half_spectrum_shape(shape)));

    let fft = planner.plan_fft(n, FftDirection::Forward);
    let mut buffer = vec![Complex64::new(0.0, 0.0); n];
    let mut scratch = vec![Complex64::new(0.0, 0.0); fft.get_inplace_scratch_len()];
    Zip::from(padded.lanes(Axis(last)))
        .and(spectrum.lanes_mut(Axis(last)))
        .for_each(|src, mut dst| {
            for (b, &x) in buffer.iter_mut().zip(src.iter()) {
                *b = Complex64::new(x, 0.0);
            }
            fft.process_with_scratch(&mut buffer, &mut scratch);
            for (d, b) in dst.iter_mut().zip(buffer.iter()) {
                *d = *b;
            }
        });

    for axis in 0..last {
        transform_axis(planner, &mut spectrum, Axis(axis), FftDirection::Forward);
    }

    Ok(spectrum)
}

/// Complex-to-real inverse of [`forward_real`], normalised by `1 / prod(shape)`.
pub(crate) fn inverse_real(
    planner: &mut FftPlanner<f64>,
    spectrum: ArrayViewD<'_, Complex64>,
    shape: &[usize],
) -> Result<ArrayD<f64>, SpectralError> {
    validate_shape(shape)?;
    let expected = half_spectrum_shape(shape);
    if spectrum.shape() != expected.as_slice() {
        return Err(SpectralError::ShapeMismatch {
            expected,
            found: spectrum.shape().to_vec(),
        });
    }

    let last = shape.len() - 1;
    let n = shape[last];
    let half = n / 2 + 1;

    let mut work = spectrum.to_owned();
    for axis in 0..last {
        transform_axis(planner, &mut work, Axis(axis), FftDirection::Inverse);
    }

    let norm = 1.0 / shape.iter().product::<usize>() as f64;
    let mut output = ArrayD::<f64>::zeros(IxDyn(shape));

    let ifft = planner.plan_fft(n, FftDirection::Inverse);
    let mut buffer = vec![Complex64::new(0.0, 0.0); n];
    let mut scratch = vec![Complex64::new(0.0, 0.0); ifft.get_inplace_scratch_len()];
    Zip::from(work.lanes(Axis(last)))
        .and(output.lanes_mut(Axis(last)))
        .for_each(|src, mut dst| {
            for (k, b) in buffer.iter_mut().enumerate() {
                *b = if k < half { src[k] } else { src[n - k].conj() };
            }
            ifft.process_with_scratch(&mut buffer, &mut scratch);
            for (d, b) in dst.iter_mut().zip(buffer.iter()) {
                *d = b.re * norm;
            }
        });

    Ok(output)
}
