use crate::camera::CameraModel;
use glam::{DMat3, DVec3};
use nalgebra::{DMatrix, Matrix3, Matrix3x4, Matrix4, SMatrix, SVector, Vector3, Vector4};

const EPSILON: f64 = 1e-14;
const NUM_CONTROL_POINTS: usize = 4;
const MAX_ITERATIONS: usize = 6;
pub(crate) const PAIRS: [(usize, usize); 6] = [(0, 1), (0, 2), (0, 3), (1, 2), (1, 3), (2, 3)];
const NUM_PAIRS: usize = PAIRS.len();

/// Compute the centroid of a set of points.
pub(crate) fn compute_centroid(pts: &[[f64; 3]]) -> DVec3 {
    let n = pts.len().max(1) as f64;
    pts.iter()
        .fold(DVec3::ZERO, |acc, &p| acc + DVec3::from_array(p))
        / n
}

/// Moore-Penrose pseudo-inverse of a 3x3 matrix, zeroing singular values below `eps`.
pub(crate) fn pseudo_inverse3(m: &DMat3, eps: f64) -> Option<DMat3> {
    let na = Matrix3::from_column_slice(&m.to_cols_array());
    let pinv = na.pseudo_inverse(eps).ok()?;
    Some(DMat3::from_cols_slice(pinv.as_slice()))
}

/// Root-mean-square pixel reprojection error of a pose through a camera model.
pub(crate) fn reprojection_rmse(
    world: &[[f64; 3]],
    image: &[[f64; 2]],
    r: &DMat3,
    t: DVec3,
    camera: &CameraModel,
) -> f64 {
    let n = world.len().max(1) as f64;
    let sum_sq: f64 = world
        .iter()
        .zip(image.iter())
        .map(|(pw, uv)| {
            let [u, v] = camera.project(*r * DVec3::from_array(*pw) + t);
            let du = u - uv[0];
            let dv = v - uv[1];
            du.mul_add(du, dv * dv)
        })
        .sum();
    (sum_sq / n).sqrt()
}

/// Solves the linear system A * x = b for a 4x4 symmetric positive-definite matrix A
/// using an unrolled Cholesky decomposition.
///
/// Returns `None` if `A` is not positive-definite.
#[inline(always)]
pub(crate) fn solve_4x4_cholesky(a: &Matrix4<f64>, b: &Vector4<f64>) -> Option<Vector4<f64>> {
    if a.m11 < EPSILON {
        return None;
    }
    let l_11 = a.m11.sqrt();
    let l_21 = a.m21 / l_11;
    let l_31 = a.m31 / l_11;
    let l_41 = a.m41 / l_11;

    let l_22_sq = a.m22 - l_21 * l_21;
    if l_22_sq < EPSILON {
        return None;
    }
    let l_22 = l_22_sq.sqrt();
    let l_32 = (a.m32 - l_31 * l_21) / l_22;
    let l_42 = (a.m42 - l_41 * l_21) / l_22;

    let l_33_sq = a.m33 - l_31 * l_31 - l_32 * l_32;
    if l_33_sq < EPSILON {
        return None;
    }
    let l_33 = l_33_sq.sqrt();
    let l_43 = (a.m43 - l_41 * l_31 - l_42 * l_32) / l_33;

    let l_44_sq = a.m44 - l_41 * l_41 - l_42 * l_42 - l_43 * l_43;
    if l_44_sq < EPSILON {
        return None;
    }
    let l_44 = l_44_sq.sqrt();

    // L * y = b
    let y1 = b[0] / l_11;
    let y2 = (b[1] - l_21 * y1) / l_22;
    let y3 = (b[2] - (l_31 * y1 + l_32 * y2)) / l_33;
    let y4 = (b[3] - (l_41 * y1 + l_42 * y2 + l_43 * y3)) / l_44;

    // L^T * x = y
    let x4 = y4 / l_44;
    let x3 = (y3 - l_43 * x4) / l_33;
    let x2 = (y2 - (l_32 * x3 + l_42 * x4)) / l_22;
    let x1 = (y1 - (l_21 * x2 + l_31 * x3 + l_41 * x4)) / l_11;
    Some(Vector4::new(x1, x2, x3, x4))
}

/// Refines the EPnP betas with Gauss-Newton on the control point distance constraints.
///
/// Column `k` of `null4` (12x4) holds the `k`-th null-space vector; rows `3i..3i+3`
/// belong to control point `i`. `rho` holds the squared world-frame distances for [`PAIRS`].
pub(crate) fn gauss_newton(beta_init: [f64; 4], null4: &DMatrix<f64>, rho: &[f64; 6]) -> [f64; 4] {
    const DAMPING: f64 = 1e-12;
    const STOP_EPS: f64 = 1e-12;

    let mut bet = Vector4::from(beta_init);
    let rho_vec = SVector::<f64, NUM_PAIRS>::from_row_slice(rho);

    for _ in 0..MAX_ITERATIONS {
        let mut vs = [Vector3::zeros(); NUM_CONTROL_POINTS];
        for (i, v) in vs.iter_mut().enumerate() {
            let m: Matrix3x4<f64> = null4.fixed_view::<3, 4>(i * 3, 0).into();
            *v = m * bet;
        }

        let mut f = SVector::<f64, NUM_PAIRS>::zeros();
        let mut j = SMatrix::<f64, NUM_PAIRS, NUM_CONTROL_POINTS>::zeros();

        for (r, &(a, b)) in PAIRS.iter().enumerate() {
            let diff = vs[a] - vs[b];
            f[r] = diff.norm_squared();

            let rows_a = null4.fixed_rows::<3>(a * 3);
            let rows_b = null4.fixed_rows::<3>(b * 3);
            for k in 0..NUM_CONTROL_POINTS {
                let d_col = rows_a.column(k) - rows_b.column(k);
                j[(r, k)] = 2.0 * diff.dot(&d_col);
            }
        }

        f -= rho_vec;

        let mut a: Matrix4<f64> = j.transpose() * j;
        a += Matrix4::identity() * DAMPING;
        let b: Vector4<f64> = j.transpose() * f;

        let Some(delta) = solve_4x4_cholesky(&a, &b) else {
            break;
        };
        bet -= delta;
        if delta.norm() < STOP_EPS {
            break;
        }
    }

    bet.into()
}
