//! Matrix-free conjugate gradients for symmetric positive definite systems.

use crate::error::{check_len, HoloError, Result};

/// Outcome of a conjugate gradient run.
#[derive(Debug, Clone, PartialEq)]
pub struct CgOutcome {
    pub x: Vec<f64>,
    pub iterations: usize,
    /// Final residual norm relative to `||b||`.
    pub residual: f64,
    pub converged: bool,
}

pub(crate) fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

pub(crate) fn norm(a: &[f64]) -> f64 {
    dot(a, a).sqrt()
}

/// Solve `A x = b` starting from zero.
///
/// # Arguments
/// * `a_op` - Closure computing `A * v`; `A` must be symmetric positive (semi-)definite.
/// * `b` - Right-hand side.
/// * `tolerance` - Stop once `||r|| <= tolerance * ||b||`.
/// * `max_iter` - Maximum number of iterations.
pub fn conjugate_gradient<F>(
    a_op: F,
    b: &[f64],
    tolerance: f64,
    max_iter: usize,
) -> Result<CgOutcome>
where
    F: Fn(&[f64]) -> Result<Vec<f64>>,
{
    let n = b.len();
    let mut x = vec![0.0; n];
    let b_norm = norm(b);
    if b_norm == 0.0 {
        return Ok(CgOutcome {
            x,
            iterations: 0,
            residual: 0.0,
            converged: true,
        });
    }

    let mut r = b.to_vec();
    let mut p = r.clone();
    let mut rs = dot(&r, &r);
    let mut iterations = 0;
    let mut converged = false;

    while iterations < max_iter {
        let ap = a_op(&p)?;
        check_len("conjugate_gradient (A p)", n, ap.len())?;
        let pap = dot(&p, &ap);
        if !(pap.is_finite() && pap > 0.0) {
            return Err(HoloError::NumericalDegeneracy(format!(
                "conjugate gradients hit a non-positive curvature p.Ap = {pap} at iteration {iterations}"
            )));
        }
        let alpha = rs / pap;
        for i in 0..n {
            x[i] += alpha * p[i];
            r[i] -= alpha * ap[i];
        }
        iterations += 1;

        let rs_new = dot(&r, &r);
        log::trace!("CG iteration {iterations}: |r| / |b| = {:.3e}", rs_new.sqrt() / b_norm);
        if rs_new.sqrt() <= tolerance * b_norm {
            rs = rs_new;
            converged = true;
            break;
        }
        let beta = rs_new / rs;
        for i in 0..n {
            p[i] = r[i] + beta * p[i];
        }
        rs = rs_new;
    }

    Ok(CgOutcome {
        x,
        iterations,
        residual: rs.sqrt() / b_norm,
        converged,
    })
}
