//! Rigid alignment utilities (Kabsch / Umeyama)

use crate::types::PnPError;
use glam::{DMat3, DVec3};
use nalgebra::Matrix3;

/// Umeyama/Kabsch algorithm without scale.
///
/// Returns `(R, t)` minimizing `sum |dst_i - (R * src_i + t)|^2`, with `R` a
/// proper rotation.
pub fn umeyama(src: &[DVec3], dst: &[DVec3]) -> Result<(DMat3, DVec3), PnPError> {
    if src.len() != dst.len() {
        return Err(PnPError::MismatchedArrayLengths {
            left_name: "source points",
            left_len: src.len(),
            right_name: "destination points",
            right_len: dst.len(),
        });
    }
    if src.is_empty() {
        return Err(PnPError::InsufficientCorrespondences {
            required: 1,
            actual: 0,
        });
    }
    let n = src.len() as f64;

    let mu_s = src.iter().fold(DVec3::ZERO, |acc, &p| acc + p) / n;
    let mu_d = dst.iter().fold(DVec3::ZERO, |acc, &p| acc + p) / n;

    // H[row][col] += dst[row] * src[col]
    let mut h = Matrix3::<f64>::zeros();
    for (s, d) in src.iter().zip(dst.iter()) {
        let sc = *s - mu_s;
        let dc = *d - mu_d;
        for (r, dc_r) in dc.to_array().into_iter().enumerate() {
            for (c, sc_c) in sc.to_array().into_iter().enumerate() {
                h[(r, c)] += dc_r * sc_c;
            }
        }
    }
    h /= n;

    let svd = h.svd(true, true);
    let (Some(u), Some(v_t)) = (svd.u, svd.v_t) else {
        return Err(PnPError::SvdFailed(
            "Failed to decompose the cross-covariance".to_string(),
        ));
    };

    let mut correction = Matrix3::<f64>::identity();
    if (u * v_t).determinant() < 0.0 {
        correction[(2, 2)] = -1.0;
    }
    let r = u * correction * v_t;

    let r = DMat3::from_cols_slice(r.as_slice());
    let t = mu_d - r * mu_s;
    Ok((r, t))
}
