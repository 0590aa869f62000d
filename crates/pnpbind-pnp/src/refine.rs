//! Levenberg–Marquardt pose refinement for PnP solutions.

use crate::camera::CameraModel;
use crate::so3::SO3;
use crate::types::PnPError;
use glam::DVec3;
use log::trace;
use nalgebra::{Matrix6, Vector6};
use serde::{Deserialize, Serialize};

/// Parameters controlling the LM pose refinement.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LMParams {
    /// Maximum number of LM iterations.
    pub max_iters: usize,
    /// Convergence threshold on the relative decrease of the squared error.
    pub eps: f64,
    /// Convergence threshold on the infinity norm of the gradient.
    pub gradient_tol: f64,
    /// Initial damping factor (lambda).
    pub lambda_init: f64,
    /// Multiplicative factor to increase/decrease lambda.
    pub lambda_mul: f64,
}

impl Default for LMParams {
    fn default() -> Self {
        Self {
            max_iters: 20,
            eps: 1e-10,
            gradient_tol: 1e-12,
            lambda_init: 1e-3,
            lambda_mul: 10.0,
        }
    }
}

impl LMParams {
    /// Set the maximum number of iterations.
    pub fn with_max_iters(mut self, max_iters: usize) -> Self {
        self.max_iters = max_iters;
        self
    }

    /// Set the relative error decrease threshold.
    pub fn with_eps(mut self, eps: f64) -> Self {
        self.eps = eps;
        self
    }
}

const LAMBDA_MAX: f64 = 1e12;

/// Refine a pose (rvec, t) with Levenberg–Marquardt to minimize pixel reprojection error.
///
/// The projection runs through the full camera model, so `points_image` are the
/// raw (distorted) observations.
///
/// - `points_world`: World points (N,3)
/// - `points_image`: Pixel points (N,2)
/// - `camera`: Intrinsics and distortion
/// - `rvec`: Initial axis-angle rotation (input/output)
/// - `t`: Initial translation (input/output)
///
/// Returns `(rmse, num_iters, converged)` and writes refined `rvec` and `t` in place.
pub fn refine_pose_lm(
    points_world: &[[f64; 3]],
    points_image: &[[f64; 2]],
    camera: &CameraModel,
    rvec: &mut [f64; 3],
    t: &mut [f64; 3],
    params: &LMParams,
) -> Result<(f64, usize, bool), PnPError> {
    PnPError::check_lengths(points_world.len(), points_image.len())?;

    let n = points_world.len();
    if n < 3 {
        return Err(PnPError::InsufficientCorrespondences {
            required: 3,
            actual: n,
        });
    }

    // Parameters vector x = [rx, ry, rz, tx, ty, tz]
    let mut x = [rvec[0], rvec[1], rvec[2], t[0], t[1], t[2]];

    let mut residuals = vec![0.0f64; 2 * n];
    let mut residuals_p = vec![0.0f64; 2 * n];
    let mut residuals_m = vec![0.0f64; 2 * n];

    let project_all_in_place = |x: &[f64; 6], out: &mut [f64]| -> f64 {
        let r_mat = SO3::exp(DVec3::new(x[0], x[1], x[2])).matrix();
        let t_vec = DVec3::new(x[3], x[4], x[5]);

        let mut sum_sq = 0.0;
        for (i, (pw, uv)) in points_world.iter().zip(points_image.iter()).enumerate() {
            let [u_hat, v_hat] = camera.project(r_mat * DVec3::from_array(*pw) + t_vec);
            let du = u_hat - uv[0];
            let dv = v_hat - uv[1];
            out[2 * i] = du;
            out[2 * i + 1] = dv;
            sum_sq += du.mul_add(du, dv * dv);
        }
        sum_sq
    };

    let mut lambda = params.lambda_init;
    let mut err_sq_base = project_all_in_place(&x, &mut residuals);

    let mut iters = 0usize;
    let mut converged = false;

    let mut j = vec![0.0f64; 2 * n * 6];

    while iters < params.max_iters {
        iters += 1;

        const H_ROT: f64 = 1e-6;
        let t_scale = x[3].abs().max(x[4].abs()).max(x[5].abs()).max(1.0);
        let h_trans = 1e-6 * t_scale;

        for k_idx in 0..6 {
            // Central differences
            let h = if k_idx < 3 { H_ROT } else { h_trans };
            let mut x_plus = x;
            let mut x_minus = x;
            x_plus[k_idx] += h;
            x_minus[k_idx] -= h;
            project_all_in_place(&x_plus, &mut residuals_p);
            project_all_in_place(&x_minus, &mut residuals_m);
            for i in 0..(2 * n) {
                j[i * 6 + k_idx] = (residuals_p[i] - residuals_m[i]) / (2.0 * h);
            }
        }

        // Normal equations: (J^T J + lambda I) delta = -J^T r
        let mut a = Matrix6::<f64>::zeros();
        let mut b = Vector6::<f64>::zeros();
        for (r_i, &r_val) in residuals.iter().enumerate() {
            let row = &j[r_i * 6..r_i * 6 + 6];
            for c in 0..6 {
                b[c] += row[c] * r_val;
                for d in 0..6 {
                    a[(c, d)] += row[c] * row[d];
                }
            }
        }

        if b.amax() < params.gradient_tol {
            converged = true;
            break;
        }

        let mut accepted = false;
        while lambda <= LAMBDA_MAX {
            let mut damped = a;
            for d in 0..6 {
                damped[(d, d)] += lambda * a[(d, d)].max(1e-12);
            }

            let Some(chol) = damped.cholesky() else {
                lambda *= params.lambda_mul;
                continue;
            };
            let delta = chol.solve(&(-b));

            let mut x_new = x;
            for (xi, di) in x_new.iter_mut().zip(delta.iter()) {
                *xi += di;
            }
            let err_sq_new = project_all_in_place(&x_new, &mut residuals_p);

            if err_sq_new.is_finite() && err_sq_new < err_sq_base {
                let decrease = err_sq_base - err_sq_new;
                x = x_new;
                residuals.copy_from_slice(&residuals_p);
                trace!("LM iter {iters}: err_sq {err_sq_base} -> {err_sq_new}, lambda {lambda}");
                converged = decrease <= params.eps * err_sq_base.max(f64::MIN_POSITIVE);
                err_sq_base = err_sq_new;
                lambda = (lambda / params.lambda_mul).max(1e-12);
                accepted = true;
                break;
            }
            lambda *= params.lambda_mul;
        }

        if !accepted {
            // no descent direction left at any damping level
            converged = true;
            break;
        }
        if converged {
            break;
        }
    }

    rvec.copy_from_slice(&x[0..3]);
    t.copy_from_slice(&x[3..6]);

    let rmse = (err_sq_base / n as f64).sqrt();
    Ok((rmse, iters, converged))
}
