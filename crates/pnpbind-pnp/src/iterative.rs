//! Iterative PnP: EPnP initialization followed by Levenberg–Marquardt refinement.

use crate::camera::CameraModel;
use crate::epnp::{solve_epnp, EPnPParams};
use crate::refine::{refine_pose_lm, LMParams};
use crate::so3::rodrigues;
use crate::types::{PnPError, PnPResult};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

/// A caller-supplied starting pose.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExtrinsicGuess {
    /// Rodrigues rotation vector.
    pub rvec: [f64; 3],
    /// Translation vector.
    pub tvec: [f64; 3],
}

/// Parameters for [`solve_pnp_iterative`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IterativeParams {
    /// Parameters of the EPnP initialization.
    pub epnp: EPnPParams,
    /// Parameters of the refinement.
    pub lm: LMParams,
}

impl IterativeParams {
    /// Replace the refinement parameters.
    pub fn with_lm(mut self, lm: LMParams) -> Self {
        self.lm = lm;
        self
    }

    /// Replace the EPnP initialization parameters.
    pub fn with_epnp(mut self, epnp: EPnPParams) -> Self {
        self.epnp = epnp;
        self
    }
}

/// Estimate the pose minimizing the reprojection error of the raw observations.
///
/// Without a guess the pose is initialized by EPnP on undistorted points and
/// needs at least 4 correspondences. With a guess the refinement starts from it
/// directly and 3 correspondences suffice.
pub fn solve_pnp_iterative(
    world: &[[f64; 3]],
    image: &[[f64; 2]],
    camera: &CameraModel,
    guess: Option<&ExtrinsicGuess>,
    params: &IterativeParams,
) -> Result<PnPResult, PnPError> {
    PnPError::check_lengths(world.len(), image.len())?;
    PnPError::check_finite(world, image)?;

    let (mut rvec, mut tvec) = match guess {
        Some(g) => {
            debug!("Refining from extrinsic guess rvec={:?} tvec={:?}", g.rvec, g.tvec);
            (g.rvec, g.tvec)
        }
        None => {
            let undistorted = if camera.has_distortion() {
                camera.undistort_points(image)?
            } else {
                image.to_vec()
            };
            let init = solve_epnp(world, &undistorted, &camera.intrinsics_matrix(), &params.epnp)?;
            debug!(
                "EPnP initialization rvec={:?} tvec={:?} rmse={:?}",
                init.rvec, init.translation, init.reproj_rmse
            );
            (init.rvec, init.translation)
        }
    };

    let (rmse, iters, converged) =
        refine_pose_lm(world, image, camera, &mut rvec, &mut tvec, &params.lm)?;
    if !converged {
        warn!("Pose refinement stopped after {iters} iterations without converging (rmse {rmse})");
    }

    if rvec.iter().chain(tvec.iter()).any(|v| !v.is_finite()) {
        return Err(PnPError::DegenerateConfiguration(
            "refinement produced a non-finite pose".to_string(),
        ));
    }

    Ok(PnPResult {
        rotation: rodrigues(&rvec),
        translation: tvec,
        rvec,
        reproj_rmse: Some(rmse),
        num_iterations: Some(iters),
        converged: Some(converged),
    })
}
