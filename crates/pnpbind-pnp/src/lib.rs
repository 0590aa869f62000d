#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]
//!
//! # PnP (Perspective-n-Point)
//!
//! Camera pose estimation from 2D-3D point correspondences.
//!
//! ## Key Features
//!
//! - **EPnP Algorithm**: closed-form initialization from four or more correspondences
//! - **Iterative refinement**: Levenberg–Marquardt on the pixel reprojection error
//! - **Distortion Handling**: polynomial radial/tangential lens models
//! - **Extrinsic guess**: refinement from a caller-supplied pose
//!
//! ## Example
//!
//! ```rust
//! use pnpbind_pnp::{solve_pnp, PnPMethod};
//!
//! let world_points = vec![
//!     [0.0, 0.0, 0.0],
//!     [1.0, 0.0, 0.0],
//!     [0.0, 1.0, 0.0],
//!     [0.0, 0.0, 1.0],
//!     [1.0, 1.0, 0.5],
//! ];
//!
//! // Camera 5 units in front of the points, looking down +z.
//! let k = [[800.0, 0.0, 320.0], [0.0, 800.0, 240.0], [0.0, 0.0, 1.0]];
//! let image_points: Vec<[f64; 2]> = world_points
//!     .iter()
//!     .map(|p: &[f64; 3]| {
//!         let z = p[2] + 5.0;
//!         [800.0 * p[0] / z + 320.0, 800.0 * p[1] / z + 240.0]
//!     })
//!     .collect();
//!
//! let result = solve_pnp(&world_points, &image_points, &k, None, PnPMethod::EPnPDefault)?;
//! assert!((result.translation[2] - 5.0).abs() < 1e-6);
//! # Ok::<(), pnpbind_pnp::PnPError>(())
//! ```

/// Camera intrinsics and lens distortion.
pub mod camera;

/// Efficient Perspective-n-Point (EPnP) solver implementation.
pub mod epnp;

/// Solver seam used by bindings: problem description, capabilities and the default estimator.
pub mod estimator;

/// EPnP initialization followed by nonlinear refinement.
pub mod iterative;

/// Levenberg–Marquardt pose refinement.
pub mod refine;

/// Rigid alignment of point sets.
pub mod rigid;

/// Rodrigues vectors and rotation matrices.
pub mod so3;

/// Common data types and traits for PnP solvers.
pub mod types;

mod ops;

pub use camera::{CameraError, CameraIntrinsics, CameraModel, PolynomialDistortion};
pub use epnp::{EPnP, EPnPParams};
pub use estimator::{IterativePnP, PnPProblem, PoseEstimator, SolverCapabilities};
pub use iterative::{solve_pnp_iterative, ExtrinsicGuess, IterativeParams};
pub use refine::{refine_pose_lm, LMParams};
pub use types::{NumericTol, PnPError, PnPResult, PnPSolver, PnPSolverWithCamera};

/// Enumeration of the Perspective-n-Point algorithms available in this crate.
#[derive(Debug, Clone)]
pub enum PnPMethod {
    /// Efficient PnP solver with a user-supplied parameter object.
    EPnP(EPnPParams),
    /// Efficient PnP solver with the crate's default parameters.
    EPnPDefault,
    /// EPnP followed by Levenberg–Marquardt refinement.
    Iterative(IterativeParams),
}

/// Dispatch function that routes to the chosen PnP solver.
///
/// `image` holds the observed pixels; when `distortion` is given they are
/// treated as distorted by it.
pub fn solve_pnp(
    world: &[[f64; 3]],
    image: &[[f64; 2]],
    k: &[[f64; 3]; 3],
    distortion: Option<&PolynomialDistortion>,
    method: PnPMethod,
) -> Result<PnPResult, PnPError> {
    let intrinsics = CameraIntrinsics::from_matrix(k)?;
    let camera = match distortion {
        Some(d) => CameraModel::with_distortion(intrinsics, d.clone()),
        None => CameraModel::pinhole(intrinsics),
    };

    match method {
        PnPMethod::EPnP(params) => EPnP::solve_with_camera(world, image, &camera, &params),
        PnPMethod::EPnPDefault => {
            EPnP::solve_with_camera(world, image, &camera, &EPnPParams::default())
        }
        PnPMethod::Iterative(params) => solve_pnp_iterative(world, image, &camera, None, &params),
    }
}
