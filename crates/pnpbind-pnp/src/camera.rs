//! Camera models and distortion handling for PnP solvers.
use glam::DVec3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error types for camera operations.
#[derive(Debug, Error)]
pub enum CameraError {
    /// Invalid camera intrinsics matrix
    #[error("Invalid camera intrinsics matrix: {0}")]
    InvalidIntrinsics(String),

    /// Invalid distortion parameters
    #[error("Invalid distortion parameters: {0}")]
    InvalidDistortion(String),

    /// Failed to undistort point
    #[error("Failed to undistort point: {0}")]
    UndistortFailed(String),
}

/// Result type for camera operations.
pub type CameraResult<T> = Result<T, CameraError>;

/// Represents the intrinsic parameters of a pinhole camera.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraIntrinsics {
    /// Focal length in x direction
    pub fx: f64,
    /// Focal length in y direction
    pub fy: f64,
    /// Principal point x coordinate
    pub cx: f64,
    /// Principal point y coordinate
    pub cy: f64,
}

impl CameraIntrinsics {
    /// Create camera intrinsics from focal lengths and principal point.
    pub fn new(fx: f64, fy: f64, cx: f64, cy: f64) -> Self {
        Self { fx, fy, cx, cy }
    }

    /// Create camera intrinsics from a row-major 3x3 intrinsics matrix.
    ///
    /// The matrix must have the form `[[fx, 0, cx], [0, fy, cy], [0, 0, 1]]`
    /// with finite entries and positive focal lengths.
    pub fn from_matrix(k: &[[f64; 3]; 3]) -> CameraResult<Self> {
        if k.iter().flatten().any(|v| !v.is_finite()) {
            return Err(CameraError::InvalidIntrinsics(
                "Intrinsics matrix contains non-finite values".to_string(),
            ));
        }
        if k[0][1] != 0.0 || k[1][0] != 0.0 || k[2] != [0.0, 0.0, 1.0] {
            return Err(CameraError::InvalidIntrinsics(
                "Intrinsics matrix must have form [[fx, 0, cx], [0, fy, cy], [0, 0, 1]]".to_string(),
            ));
        }
        if !(k[0][0] > 0.0 && k[1][1] > 0.0) {
            return Err(CameraError::InvalidIntrinsics(format!(
                "focal lengths must be positive, got fx={} fy={}",
                k[0][0], k[1][1]
            )));
        }

        Ok(Self {
            fx: k[0][0],
            fy: k[1][1],
            cx: k[0][2],
            cy: k[1][2],
        })
    }

    /// Convert to a row-major 3x3 intrinsics matrix.
    pub fn to_matrix(&self) -> [[f64; 3]; 3] {
        [
            [self.fx, 0.0, self.cx],
            [0.0, self.fy, self.cy],
            [0.0, 0.0, 1.0],
        ]
    }
}

/// Polynomial (Brown-Conrady) distortion with the rational radial extension.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct PolynomialDistortion {
    /// Radial distortion coefficients
    pub k1: f64,
    pub k2: f64,
    pub k3: f64,
    pub k4: f64,
    pub k5: f64,
    pub k6: f64,
    /// Tangential distortion coefficients
    pub p1: f64,
    pub p2: f64,
}

impl PolynomialDistortion {
    /// Create distortion parameters with all coefficients set to zero (no distortion).
    pub fn none() -> Self {
        Self::default()
    }

    /// Create distortion parameters with only first two radial coefficients.
    pub fn radial(k1: f64, k2: f64) -> Self {
        Self {
            k1,
            k2,
            ..Self::default()
        }
    }

    /// Create distortion parameters with radial and tangential coefficients.
    pub fn radial_tangential(k1: f64, k2: f64, p1: f64, p2: f64) -> Self {
        Self {
            k1,
            k2,
            p1,
            p2,
            ..Self::default()
        }
    }

    /// Build the model from a coefficient vector laid out as
    /// `(k1, k2, p1, p2[, k3[, k4, k5, k6]])`.
    ///
    /// An empty slice means no distortion.
    pub fn from_coeffs(coeffs: &[f64]) -> CameraResult<Self> {
        if coeffs.iter().any(|c| !c.is_finite()) {
            return Err(CameraError::InvalidDistortion(
                "distortion coefficients must be finite".to_string(),
            ));
        }
        match *coeffs {
            [] => Ok(Self::none()),
            [k1, k2, p1, p2] => Ok(Self::radial_tangential(k1, k2, p1, p2)),
            [k1, k2, p1, p2, k3] => Ok(Self {
                k3,
                ..Self::radial_tangential(k1, k2, p1, p2)
            }),
            [k1, k2, p1, p2, k3, k4, k5, k6] => Ok(Self {
                k1,
                k2,
                k3,
                k4,
                k5,
                k6,
                p1,
                p2,
            }),
            _ => Err(CameraError::InvalidDistortion(format!(
                "expected 0, 4, 5 or 8 coefficients, got {}",
                coeffs.len()
            ))),
        }
    }

    /// Check if there is any distortion.
    pub fn has_distortion(&self) -> bool {
        [
            self.k1, self.k2, self.k3, self.k4, self.k5, self.k6, self.p1, self.p2,
        ]
        .iter()
        .any(|&c| c != 0.0)
    }

    /// Apply the distortion to normalized image coordinates.
    pub fn distort_normalized(&self, x: f64, y: f64) -> (f64, f64) {
        let r2 = x * x + y * y;
        let r4 = r2 * r2;
        let r6 = r4 * r2;

        let kr = (1.0 + self.k1 * r2 + self.k2 * r4 + self.k3 * r6)
            / (1.0 + self.k4 * r2 + self.k5 * r4 + self.k6 * r6);

        let xd = x * kr + 2.0 * self.p1 * x * y + self.p2 * (r2 + 2.0 * x * x);
        let yd = y * kr + self.p1 * (r2 + 2.0 * y * y) + 2.0 * self.p2 * x * y;
        (xd, yd)
    }

    /// Invert the distortion on normalized image coordinates by fixed-point iteration.
    pub fn undistort_normalized(&self, xd: f64, yd: f64) -> CameraResult<(f64, f64)> {
        const MAX_ITERATIONS: usize = 20;
        const EPSILON: f64 = 1e-12;

        let (mut x, mut y) = (xd, yd);
        for _ in 0..MAX_ITERATIONS {
            let r2 = x * x + y * y;
            let r4 = r2 * r2;
            let r6 = r4 * r2;

            let icdist = (1.0 + self.k4 * r2 + self.k5 * r4 + self.k6 * r6)
                / (1.0 + self.k1 * r2 + self.k2 * r4 + self.k3 * r6);
            if !icdist.is_finite() || icdist < 0.0 {
                return Err(CameraError::UndistortFailed(format!(
                    "radial model is not invertible at ({xd}, {yd})"
                )));
            }

            let dx = 2.0 * self.p1 * x * y + self.p2 * (r2 + 2.0 * x * x);
            let dy = self.p1 * (r2 + 2.0 * y * y) + 2.0 * self.p2 * x * y;
            let x_new = (xd - dx) * icdist;
            let y_new = (yd - dy) * icdist;

            let step = (x_new - x).abs().max((y_new - y).abs());
            x = x_new;
            y = y_new;
            if step < EPSILON {
                break;
            }
        }

        Ok((x, y))
    }
}

/// A complete camera model with intrinsics and optional distortion.
#[derive(Debug, Clone)]
pub struct CameraModel {
    /// Camera intrinsics
    pub intrinsics: CameraIntrinsics,
    /// Distortion parameters (None for no distortion)
    pub distortion: Option<PolynomialDistortion>,
}

impl CameraModel {
    /// Create a camera model without distortion.
    pub fn pinhole(intrinsics: CameraIntrinsics) -> Self {
        Self {
            intrinsics,
            distortion: None,
        }
    }

    /// Create a camera model with distortion.
    pub fn with_distortion(intrinsics: CameraIntrinsics, distortion: PolynomialDistortion) -> Self {
        Self {
            intrinsics,
            distortion: Some(distortion),
        }
    }

    /// Build a camera from an intrinsics matrix and a distortion coefficient vector.
    pub fn from_matrix_and_coeffs(k: &[[f64; 3]; 3], coeffs: &[f64]) -> CameraResult<Self> {
        let intrinsics = CameraIntrinsics::from_matrix(k)?;
        let distortion = PolynomialDistortion::from_coeffs(coeffs)?;
        Ok(if distortion.has_distortion() {
            Self::with_distortion(intrinsics, distortion)
        } else {
            Self::pinhole(intrinsics)
        })
    }

    /// Check if the camera has distortion.
    pub fn has_distortion(&self) -> bool {
        self.distortion.as_ref().is_some_and(|d| d.has_distortion())
    }

    /// Get the intrinsics matrix for use with pinhole PnP solvers.
    pub fn intrinsics_matrix(&self) -> [[f64; 3]; 3] {
        self.intrinsics.to_matrix()
    }

    /// Project a camera-frame point to (distorted) pixel coordinates.
    pub fn project(&self, pc: DVec3) -> [f64; 2] {
        let inv_z = 1.0 / pc.z;
        let (x, y) = (pc.x * inv_z, pc.y * inv_z);
        let (xd, yd) = match &self.distortion {
            Some(d) => d.distort_normalized(x, y),
            None => (x, y),
        };
        self.to_pixel(xd, yd)
    }

    /// Apply distortion to an ideal pixel.
    pub fn distort_point(&self, u: f64, v: f64) -> [f64; 2] {
        let (x, y) = self.to_normalized(u, v);
        let (xd, yd) = match &self.distortion {
            Some(d) => d.distort_normalized(x, y),
            None => (x, y),
        };
        self.to_pixel(xd, yd)
    }

    /// Remove distortion from an observed pixel.
    pub fn undistort_point(&self, u: f64, v: f64) -> CameraResult<[f64; 2]> {
        let Some(distortion) = &self.distortion else {
            return Ok([u, v]);
        };
        let (xd, yd) = self.to_normalized(u, v);
        let (x, y) = distortion.undistort_normalized(xd, yd)?;
        Ok(self.to_pixel(x, y))
    }

    /// Undistort multiple points.
    pub fn undistort_points(&self, points: &[[f64; 2]]) -> CameraResult<Vec<[f64; 2]>> {
        points
            .iter()
            .map(|&[u, v]| self.undistort_point(u, v))
            .collect()
    }

    fn to_normalized(&self, u: f64, v: f64) -> (f64, f64) {
        let k = &self.intrinsics;
        ((u - k.cx) / k.fx, (v - k.cy) / k.fy)
    }

    fn to_pixel(&self, x: f64, y: f64) -> [f64; 2] {
        let k = &self.intrinsics;
        [k.fx * x + k.cx, k.fy * y + k.cy]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_camera_intrinsics_from_matrix() -> CameraResult<()> {
        let k = [[1000.0, 0.0, 640.0], [0.0, 1000.0, 480.0], [0.0, 0.0, 1.0]];
        let intrinsics = CameraIntrinsics::from_matrix(&k)?;
        assert_eq!(intrinsics, CameraIntrinsics::new(1000.0, 1000.0, 640.0, 480.0));
        assert_eq!(intrinsics.to_matrix(), k);
        Ok(())
    }

    #[test]
    fn test_camera_intrinsics_rejects_bad_matrix() {
        let skewed = [[1000.0, 2.0, 640.0], [0.0, 1000.0, 480.0], [0.0, 0.0, 1.0]];
        assert!(CameraIntrinsics::from_matrix(&skewed).is_err());
        let projective = [[1000.0, 0.0, 640.0], [0.0, 1000.0, 480.0], [0.0, 0.0, 2.0]];
        assert!(CameraIntrinsics::from_matrix(&projective).is_err());
        let zero_focal = [[0.0, 0.0, 640.0], [0.0, 1000.0, 480.0], [0.0, 0.0, 1.0]];
        assert!(CameraIntrinsics::from_matrix(&zero_focal).is_err());
        let nan_center = [[1000.0, 0.0, f64::NAN], [0.0, 1000.0, 480.0], [0.0, 0.0, 1.0]];
        assert!(CameraIntrinsics::from_matrix(&nan_center).is_err());
        let inf_focal = [[f64::INFINITY, 0.0, 640.0], [0.0, 1000.0, 480.0], [0.0, 0.0, 1.0]];
        assert!(CameraIntrinsics::from_matrix(&inf_focal).is_err());
    }

    #[test]
    fn test_distortion_from_coeffs() -> CameraResult<()> {
        assert!(!PolynomialDistortion::from_coeffs(&[])?.has_distortion());

        let d = PolynomialDistortion::from_coeffs(&[0.1, 0.01, 0.001, 0.002, 0.3])?;
        assert_eq!(d.k1, 0.1);
        assert_eq!(d.k2, 0.01);
        assert_eq!(d.p1, 0.001);
        assert_eq!(d.p2, 0.002);
        assert_eq!(d.k3, 0.3);

        let d = PolynomialDistortion::from_coeffs(&[0.1, 0.0, 0.0, 0.0, 0.0, 0.4, 0.5, 0.6])?;
        assert_eq!((d.k4, d.k5, d.k6), (0.4, 0.5, 0.6));

        assert!(PolynomialDistortion::from_coeffs(&[0.1, 0.2]).is_err());
        assert!(PolynomialDistortion::from_coeffs(&[0.1, f64::NAN, 0.0, 0.0]).is_err());
        Ok(())
    }

    #[test]
    fn test_camera_model_with_distortion() -> CameraResult<()> {
        let k = [[800.0, 0.0, 320.0], [0.0, 800.0, 240.0], [0.0, 0.0, 1.0]];
        assert!(!CameraModel::from_matrix_and_coeffs(&k, &[0.0; 4])?.has_distortion());
        assert!(CameraModel::from_matrix_and_coeffs(&k, &[0.1, 0.0, 0.0, 0.0])?.has_distortion());
        Ok(())
    }

    #[test]
    fn test_distort_undistort_roundtrip() -> CameraResult<()> {
        let intrinsics = CameraIntrinsics::new(1000.0, 1000.0, 640.0, 480.0);
        let distortion = PolynomialDistortion::radial_tangential(0.1, 0.01, 0.001, -0.0005);
        let camera = CameraModel::with_distortion(intrinsics, distortion);

        let original = [100.0, 200.0];
        let distorted = camera.distort_point(original[0], original[1]);
        let undistorted = camera.undistort_point(distorted[0], distorted[1])?;

        assert_relative_eq!(undistorted[0], original[0], epsilon = 1e-6);
        assert_relative_eq!(undistorted[1], original[1], epsilon = 1e-6);
        Ok(())
    }

    #[test]
    fn test_project_matches_distort_point() {
        let intrinsics = CameraIntrinsics::new(800.0, 820.0, 320.0, 240.0);
        let camera =
            CameraModel::with_distortion(intrinsics.clone(), PolynomialDistortion::radial(-0.2, 0.05));
        let pc = DVec3::new(0.3, -0.2, 2.0);

        let ideal = CameraModel::pinhole(intrinsics).project(pc);
        let expected = camera.distort_point(ideal[0], ideal[1]);
        let projected = camera.project(pc);

        assert_relative_eq!(projected[0], expected[0], epsilon = 1e-9);
        assert_relative_eq!(projected[1], expected[1], epsilon = 1e-9);
    }
}
