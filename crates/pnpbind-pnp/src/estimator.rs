use crate::camera::CameraModel;
use crate::iterative::{solve_pnp_iterative, ExtrinsicGuess, IterativeParams};
use crate::types::{PnPError, PnPResult};

/// Input forms a pose estimator accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SolverCapabilities {
    /// Whether correspondences may arrive as lists of individual points
    /// rather than as numeric matrices.
    pub point_lists: bool,
}

impl Default for SolverCapabilities {
    fn default() -> Self {
        Self {
            point_lists: cfg!(feature = "point-lists"),
        }
    }
}

/// One pose estimation request in native types.
#[derive(Debug, Clone)]
pub struct PnPProblem<'a> {
    /// 3-D points in the world frame.
    pub world: &'a [[f64; 3]],
    /// Observed pixel coordinates.
    pub image: &'a [[f64; 2]],
    /// Row-major intrinsics matrix.
    pub camera_matrix: [[f64; 3]; 3],
    /// Distortion coefficients `(k1, k2, p1, p2[, k3[, k4, k5, k6]])`, possibly empty.
    pub dist_coeffs: &'a [f64],
    /// Starting pose to refine from, if any.
    pub guess: Option<ExtrinsicGuess>,
}

/// A pose solver behind a binding.
pub trait PoseEstimator {
    /// Input forms this estimator accepts.
    fn capabilities(&self) -> SolverCapabilities;

    /// Estimate the world to camera pose.
    fn estimate(&self, problem: &PnPProblem<'_>) -> Result<PnPResult, PnPError>;
}

/// EPnP initialization refined by Levenberg–Marquardt.
#[derive(Debug, Clone, Default)]
pub struct IterativePnP {
    /// Solver parameters.
    pub params: IterativeParams,
    capabilities: SolverCapabilities,
}

impl IterativePnP {
    /// Create an estimator with the given parameters and the default capabilities.
    pub fn new(params: IterativeParams) -> Self {
        Self {
            params,
            capabilities: SolverCapabilities::default(),
        }
    }

    /// Override the advertised capabilities.
    pub fn with_capabilities(mut self, capabilities: SolverCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }
}

impl PoseEstimator for IterativePnP {
    fn capabilities(&self) -> SolverCapabilities {
        self.capabilities
    }

    fn estimate(&self, problem: &PnPProblem<'_>) -> Result<PnPResult, PnPError> {
        let camera = CameraModel::from_matrix_and_coeffs(&problem.camera_matrix, problem.dist_coeffs)?;
        solve_pnp_iterative(
            problem.world,
            problem.image,
            &camera,
            problem.guess.as_ref(),
            &self.params,
        )
    }
}
