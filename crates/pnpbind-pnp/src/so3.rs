//! Rotation group helpers: Rodrigues vectors and rotation matrices.

use glam::{DMat3, DVec3};

/// A 3D rotation stored as an orthonormal matrix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SO3 {
    mat: DMat3,
}

impl SO3 {
    /// The identity rotation.
    pub const IDENTITY: Self = Self {
        mat: DMat3::IDENTITY,
    };

    /// Wrap a rotation matrix. The matrix is assumed orthonormal.
    pub fn from_matrix(mat: &DMat3) -> Self {
        Self { mat: *mat }
    }

    /// Wrap a row-major rotation matrix.
    pub fn from_rows(rows: &[[f64; 3]; 3]) -> Self {
        Self {
            mat: mat3_from_rows(rows),
        }
    }

    /// The rotation matrix.
    pub fn matrix(&self) -> DMat3 {
        self.mat
    }

    /// The rotation matrix in row-major form.
    pub fn to_rows(&self) -> [[f64; 3]; 3] {
        mat3_to_rows(&self.mat)
    }

    /// Rodrigues vector -> rotation.
    pub fn exp(v: DVec3) -> Self {
        let theta = v.length();
        if theta < 1e-12 {
            return Self {
                mat: Self::IDENTITY.mat + Self::hat(v),
            };
        }

        let axis = v / theta;
        let (s, c) = theta.sin_cos();
        let outer = DMat3::from_cols(axis * axis.x, axis * axis.y, axis * axis.z);
        Self {
            mat: DMat3::IDENTITY * c + Self::hat(axis) * s + outer * (1.0 - c),
        }
    }

    /// Rotation -> Rodrigues vector with angle in `[0, pi]`.
    pub fn log(&self) -> DVec3 {
        let r = self.mat;
        // sin(theta) * axis
        let w = Self::vee((r - r.transpose()) * 0.5);
        let s = w.length();
        let c = ((r.x_axis.x + r.y_axis.y + r.z_axis.z - 1.0) * 0.5).clamp(-1.0, 1.0);
        let theta = s.atan2(c);

        if s > 1e-6 {
            return w * (theta / s);
        }
        if c > 0.0 {
            return w * (1.0 + theta * theta / 6.0);
        }

        // theta close to pi: recover the axis from the symmetric part
        let sym = (r + r.transpose()) * 0.5;
        let aat = (sym - DMat3::IDENTITY * c) * (1.0 / (1.0 - c));
        let diag = [aat.x_axis.x, aat.y_axis.y, aat.z_axis.z];
        let j = (0..3)
            .max_by(|&a, &b| diag[a].total_cmp(&diag[b]))
            .unwrap_or(0);
        let mut axis = aat.col(j) / diag[j].max(f64::MIN_POSITIVE).sqrt();
        axis = axis.normalize_or_zero();
        if axis.dot(w) < 0.0 {
            axis = -axis;
        }
        axis * theta
    }

    /// Vector space -> Lie algebra
    pub fn hat(v: DVec3) -> DMat3 {
        DMat3::from_cols(
            DVec3::new(0.0, v.z, -v.y),
            DVec3::new(-v.z, 0.0, v.x),
            DVec3::new(v.y, -v.x, 0.0),
        )
    }

    /// Lie algebra -> vector space
    pub fn vee(omega: DMat3) -> DVec3 {
        DVec3::new(omega.col(1).z, omega.col(2).x, omega.col(0).y)
    }
}

/// Rotation matrix (row-major) of a Rodrigues vector.
pub fn rodrigues(rvec: &[f64; 3]) -> [[f64; 3]; 3] {
    SO3::exp(DVec3::from_array(*rvec)).to_rows()
}

/// Rodrigues vector of a row-major rotation matrix.
pub fn rotation_to_rvec(r: &[[f64; 3]; 3]) -> [f64; 3] {
    SO3::from_rows(r).log().to_array()
}

/// Build a glam matrix from row-major rows.
pub fn mat3_from_rows(rows: &[[f64; 3]; 3]) -> DMat3 {
    DMat3::from_cols_array_2d(rows).transpose()
}

/// Convert a glam matrix to row-major rows.
pub fn mat3_to_rows(m: &DMat3) -> [[f64; 3]; 3] {
    m.transpose().to_cols_array_2d()
}
