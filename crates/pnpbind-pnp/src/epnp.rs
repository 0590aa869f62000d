//! Efficient Perspective-n-Point (EPnP) solver
//! Paper: https://www.tugraz.at/fileadmin/user_upload/Institute/ICG/Images/team_lepetit/publications/lepetit_ijcv08.pdf
//! Reference: https://github.com/opencv/opencv/blob/4.x/modules/calib3d/src/epnp.cpp

use crate::camera::{CameraIntrinsics, CameraModel};
use crate::ops::{compute_centroid, gauss_newton, pseudo_inverse3, reprojection_rmse, PAIRS};
use crate::rigid::umeyama;
use crate::so3::{mat3_to_rows, SO3};
use crate::types::{NumericTol, PnPError, PnPResult, PnPSolver};
use glam::{DMat3, DVec3};
use log::trace;
use nalgebra::{DMatrix, DVector, Matrix3, Vector4};
use serde::{Deserialize, Serialize};

/// Marker type representing the Efficient PnP algorithm.
pub struct EPnP;

impl PnPSolver for EPnP {
    type Param = EPnPParams;

    fn solve(
        points_world: &[[f64; 3]],
        points_image: &[[f64; 2]],
        k: &[[f64; 3]; 3],
        params: &Self::Param,
    ) -> Result<PnPResult, PnPError> {
        solve_epnp(points_world, points_image, k, params)
    }
}

/// Parameters controlling the EPnP solver.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EPnPParams {
    /// Shared numeric tolerances.
    pub tol: NumericTol,
}

/// Solve Perspective-n-Point (EPnP).
///
/// # Arguments
/// * `points_world` – 3-D coordinates in the world frame, shape *(N,3)* with `N≥4`.
/// * `points_image` – Corresponding undistorted pixel coordinates, shape *(N,2)*.
/// * `k` – Camera intrinsics matrix.
///
/// # Returns
/// A [`PnPResult`] with the rotation **world → camera**, the translation,
/// the Rodrigues vector and the pixel RMSE of the selected solution.
pub fn solve_epnp(
    points_world: &[[f64; 3]],
    points_image: &[[f64; 2]],
    k: &[[f64; 3]; 3],
    params: &EPnPParams,
) -> Result<PnPResult, PnPError> {
    let n = points_world.len();
    PnPError::check_lengths(n, points_image.len())?;
    PnPError::check_finite(points_world, points_image)?;
    if n < 4 {
        return Err(PnPError::InsufficientCorrespondences {
            required: 4,
            actual: n,
        });
    }
    let camera = CameraModel::pinhole(CameraIntrinsics::from_matrix(k)?);

    let cw = select_control_points(points_world)?;
    let alphas = compute_barycentric(points_world, &cw, params.tol.eps)?;

    // Build the 2N×12 design matrix M
    let m_rows = build_m(&alphas, points_image, k);
    let m_flat: Vec<f64> = m_rows.iter().flat_map(|row| row.iter()).copied().collect();
    let m_mat = DMatrix::<f64>::from_row_slice(2 * n, 12, &m_flat);

    // Null-space of M from the eigenvectors of MᵀM with the smallest eigenvalues.
    let mtm = m_mat.transpose() * &m_mat;
    if mtm.iter().any(|v| !v.is_finite()) {
        return Err(PnPError::DegenerateConfiguration(
            "EPnP design matrix is not finite".to_string(),
        ));
    }
    let svd = mtm.svd(false, true);
    let Some(v_t) = svd.v_t else {
        return Err(PnPError::SvdFailed("Failed to compute V^T".to_string()));
    };
    let mut order: Vec<usize> = (0..12).collect();
    order.sort_by(|&a, &b| svd.singular_values[a].total_cmp(&svd.singular_values[b]));

    let mut null4 = DMatrix::<f64>::zeros(12, 4);
    for (c, &row) in order.iter().take(4).enumerate() {
        null4.set_column(c, &v_t.row(row).transpose());
    }

    let l = build_l6x10(&null4);
    let rho = rho_ctrlpts(&cw);
    let rho_vec = DVector::<f64>::from_column_slice(&rho);

    let betas = [
        estimate_beta([0, 1, 3, 6], &l, &rho_vec, params.tol.svd),
        estimate_beta([0, 1, 2], &l, &rho_vec, params.tol.svd),
        estimate_beta([0, 1, 2, 3, 4], &l, &rho_vec, params.tol.svd),
    ];

    let mut best: Option<(f64, DMat3, DVec3)> = None;
    for beta in betas.into_iter().flatten() {
        let beta = gauss_newton(beta, &null4, &rho);
        if beta.iter().any(|b| !b.is_finite()) {
            continue;
        }
        let Ok((r, t)) = pose_from_betas(&beta, &null4, points_world, &alphas) else {
            continue;
        };
        let err = reprojection_rmse(points_world, points_image, &r, t, &camera);
        trace!("EPnP candidate betas={beta:?} rmse={err}");
        if err.is_finite() && best.as_ref().map_or(true, |(e, _, _)| err < *e) {
            best = Some((err, r, t));
        }
    }

    let Some((best_err, r, t)) = best else {
        return Err(PnPError::DegenerateConfiguration(
            "EPnP produced no finite pose candidate".to_string(),
        ));
    };

    Ok(PnPResult {
        rotation: mat3_to_rows(&r),
        translation: t.to_array(),
        rvec: SO3::from_matrix(&r).log().to_array(),
        reproj_rmse: Some(best_err),
        num_iterations: None,
        converged: Some(true),
    })
}

/// Compute pose (R, t) from a set of betas using the null-space vectors.
fn pose_from_betas(
    betas: &[f64; 4],
    null4: &DMatrix<f64>, // 12×4 matrix (V)
    points_world: &[[f64; 3]],
    alphas: &[[f64; 4]],
) -> Result<(DMat3, DVec3), PnPError> {
    let cc_flat = null4 * Vector4::from_column_slice(betas);
    let cc: [DVec3; 4] =
        std::array::from_fn(|i| DVec3::new(cc_flat[3 * i], cc_flat[3 * i + 1], cc_flat[3 * i + 2]));

    let mut pcs: Vec<DVec3> = alphas
        .iter()
        .map(|a| a.iter().zip(cc.iter()).map(|(&w, &c)| c * w).sum())
        .collect();

    // The scene must lie in front of the camera.
    if pcs.first().is_some_and(|p| p.z < 0.0) {
        for p in &mut pcs {
            *p = -*p;
        }
    }

    let pws: Vec<DVec3> = points_world.iter().map(|&p| DVec3::from_array(p)).collect();
    umeyama(&pws, &pcs)
}

/// Control points: the centroid plus one point along each principal axis,
/// scaled by the standard deviation along it.
fn select_control_points(points_world: &[[f64; 3]]) -> Result<[DVec3; 4], PnPError> {
    let n = points_world.len() as f64;
    let c = compute_centroid(points_world);

    let mut cov = Matrix3::<f64>::zeros();
    for p in points_world {
        let d = DVec3::from_array(*p) - c;
        let d = nalgebra::Vector3::new(d.x, d.y, d.z);
        cov += d * d.transpose();
    }
    cov /= n;

    let svd = cov.svd(true, false);
    let Some(u) = svd.u else {
        return Err(PnPError::SvdFailed(
            "Failed to decompose the world point covariance".to_string(),
        ));
    };

    let mut axes: Vec<(f64, DVec3)> = (0..3)
        .map(|i| {
            let col = u.column(i);
            (
                svd.singular_values[i].max(0.0).sqrt(),
                DVec3::new(col[0], col[1], col[2]),
            )
        })
        .collect();
    axes.sort_by(|a, b| b.0.total_cmp(&a.0));

    let mut cw = [c; 4];
    for (i, (sigma, axis)) in axes.iter().enumerate() {
        cw[i + 1] = c + *axis * *sigma;
    }
    Ok(cw)
}

/// Compute barycentric coordinates of world-space points with respect to the
/// 4 control points returned by `select_control_points`.
///
/// If the determinant of `[C1 - C0, C2 - C0, C3 - C0]` is not above `eps`
/// (planar or collinear scenes) a pseudo-inverse is used instead of the inverse.
///
/// Each returned `[α0, α1, α2, α3]` sums to one and reconstructs `pw_i = Σ αj Cw_j`
/// whenever the control points span the point cloud.
fn compute_barycentric(
    points_world: &[[f64; 3]],
    cw: &[DVec3; 4],
    eps: f64,
) -> Result<Vec<[f64; 4]>, PnPError> {
    let c0 = cw[0];
    let b = DMat3::from_cols(cw[1] - c0, cw[2] - c0, cw[3] - c0);

    let b_inv = if b.determinant().abs() > eps {
        b.inverse()
    } else {
        pseudo_inverse3(&b, eps).ok_or_else(|| {
            PnPError::SvdFailed("Failed to pseudo-invert the control point basis".to_string())
        })?
    };

    Ok(points_world
        .iter()
        .map(|p| {
            let lamb = b_inv * (DVec3::from_array(*p) - c0);
            [1.0 - (lamb.x + lamb.y + lamb.z), lamb.x, lamb.y, lamb.z]
        })
        .collect())
}

/// Construct the 2N×12 design matrix **M** used by EPnP, one 12-vector per row.
fn build_m(alphas: &[[f64; 4]], points_image: &[[f64; 2]], k: &[[f64; 3]; 3]) -> Vec<[f64; 12]> {
    let fu = k[0][0];
    let fv = k[1][1];
    let uc = k[0][2];
    let vc = k[1][2];

    let mut m = vec![[0.0f64; 12]; 2 * alphas.len()];

    for (i, (a, &[u, v])) in alphas.iter().zip(points_image.iter()).enumerate() {
        let row_x = 2 * i;
        let row_y = row_x + 1;

        for (j, &alpha) in a.iter().enumerate() {
            let base = 3 * j;
            m[row_x][base] = alpha * fu;
            m[row_x][base + 2] = alpha * (uc - u);
            m[row_y][base + 1] = alpha * fv;
            m[row_y][base + 2] = alpha * (vc - v);
        }
    }

    m
}

/// Build the 6×10 matrix **L** relating the products of betas to the squared
/// control point distances.
///
/// Column layout: `[b11, b12, b22, b13, b23, b33, b14, b24, b34, b44]`.
fn build_l6x10(null4: &DMatrix<f64>) -> [[f64; 10]; 6] {
    let blocks: Vec<[DVec3; 4]> = (0..4)
        .map(|c| {
            let col = null4.column(c);
            std::array::from_fn(|k| DVec3::new(col[3 * k], col[3 * k + 1], col[3 * k + 2]))
        })
        .collect();

    let dv: Vec<Vec<DVec3>> = blocks
        .iter()
        .map(|b| PAIRS.iter().map(|&(i, j)| b[i] - b[j]).collect())
        .collect();

    let mut l = [[0.0f64; 10]; 6];
    for (j, row) in l.iter_mut().enumerate() {
        row[0] = dv[0][j].dot(dv[0][j]);
        row[1] = 2.0 * dv[0][j].dot(dv[1][j]);
        row[2] = dv[1][j].dot(dv[1][j]);
        row[3] = 2.0 * dv[0][j].dot(dv[2][j]);
        row[4] = 2.0 * dv[1][j].dot(dv[2][j]);
        row[5] = dv[2][j].dot(dv[2][j]);
        row[6] = 2.0 * dv[0][j].dot(dv[3][j]);
        row[7] = 2.0 * dv[1][j].dot(dv[3][j]);
        row[8] = 2.0 * dv[2][j].dot(dv[3][j]);
        row[9] = dv[3][j].dot(dv[3][j]);
    }

    l
}

/// Extracts a 6×k `DMatrix` by picking the specified columns from the 6×10 `L` matrix.
fn l_submatrix(l: &[[f64; 10]; 6], cols: &[usize]) -> DMatrix<f64> {
    let data: Vec<f64> = cols
        .iter()
        .flat_map(|&c| (0..6).map(move |r| l[r][c]))
        .collect();
    DMatrix::<f64>::from_column_slice(6, cols.len(), &data)
}

/// Initial beta estimate from a column subset of the 6×10 L matrix.
///
/// Returns `None` if the least-squares solve fails or yields a non-finite estimate.
fn estimate_beta<const K: usize>(
    cols: [usize; K],
    l: &[[f64; 10]; 6],
    rho: &DVector<f64>,
    tol_svd: f64,
) -> Option<[f64; 4]> {
    let l_sub = l_submatrix(l, &cols);
    if l_sub.iter().any(|v| !v.is_finite()) {
        return None;
    }
    let sol = l_sub.svd(true, true).solve(rho, tol_svd).ok()?;
    let x = sol.column(0);

    let beta = match K {
        // [b11, b12, b13, b14]
        4 => {
            let b0 = x[0].abs().sqrt();
            let sign = if x[0] < 0.0 { -1.0 } else { 1.0 };
            [b0, sign * x[1] / b0, sign * x[2] / b0, sign * x[3] / b0]
        }
        // [b11, b12, b22]
        3 => {
            let (b0, b1) = if x[0] < 0.0 {
                ((-x[0]).sqrt(), if x[2] < 0.0 { (-x[2]).sqrt() } else { 0.0 })
            } else {
                (x[0].sqrt(), if x[2] > 0.0 { x[2].sqrt() } else { 0.0 })
            };
            let b0 = if x[1] < 0.0 { -b0 } else { b0 };
            [b0, b1, 0.0, 0.0]
        }
        // [b11, b12, b22, b13, b23]
        5 => {
            let (b0, b1) = if x[0] < 0.0 {
                ((-x[0]).sqrt(), if x[2] < 0.0 { (-x[2]).sqrt() } else { 0.0 })
            } else {
                (x[0].sqrt(), if x[2] > 0.0 { x[2].sqrt() } else { 0.0 })
            };
            let b0 = if x[1] < 0.0 { -b0 } else { b0 };
            [b0, b1, x[3] / b0, 0.0]
        }
        _ => return None,
    };

    beta.iter().all(|b| b.is_finite()).then_some(beta)
}

/// Compute the six squared distances (ρ vector) between the 4 control points.
fn rho_ctrlpts(cw: &[DVec3; 4]) -> [f64; 6] {
    PAIRS.map(|(i, j)| cw[i].distance_squared(cw[j]))
}
