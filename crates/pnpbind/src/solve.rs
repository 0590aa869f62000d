use log::debug;
use pnpbind_array::{Array, Value};
use pnpbind_pnp::{
    CameraIntrinsics, IterativePnP, PnPProblem, PolynomialDistortion, PoseEstimator,
};

use crate::args::{check_call_shape, parse_options, OPTIONS_START};
use crate::error::BindError;
use crate::points::{ensure_finite, PointInput};

/// Estimate the camera pose from a host call with the default iterative solver.
///
/// `args` is `(objectPoints, imagePoints, cameraMatrix[, distCoeffs, name, value, ...])`
/// and `nlhs` the number of requested outputs. Returns `rvec` and, when two
/// outputs are requested, `tvec`, both as `3x1` columns.
pub fn solve_pnp(nlhs: usize, args: &[Value]) -> Result<Vec<Value>, BindError> {
    solve_pnp_with(&IterativePnP::default(), nlhs, args)
}

/// Same as [`solve_pnp`] with a caller-chosen pose estimator.
pub fn solve_pnp_with<E: PoseEstimator + ?Sized>(
    estimator: &E,
    nlhs: usize,
    args: &[Value],
) -> Result<Vec<Value>, BindError> {
    check_call_shape(args.len(), nlhs)?;
    let [object, image, camera_matrix, rest @ ..] = args else {
        return Err(BindError::InvalidArgumentCount {
            nrhs: args.len(),
            nlhs,
        });
    };

    let camera_matrix = camera_matrix
        .to_mat3()
        .map_err(|e| BindError::invalid_type("cameraMatrix", e))?;
    ensure_finite("cameraMatrix", camera_matrix.iter().flatten())?;
    CameraIntrinsics::from_matrix(&camera_matrix)
        .map_err(|e| BindError::invalid_type("cameraMatrix", e))?;

    let dist_coeffs = match rest.first() {
        Some(d) => d
            .to_vec_f64()
            .map_err(|e| BindError::invalid_type("distCoeffs", e))?,
        None => Vec::new(),
    };
    ensure_finite("distCoeffs", &dist_coeffs)?;
    PolynomialDistortion::from_coeffs(&dist_coeffs)
        .map_err(|e| BindError::invalid_type("distCoeffs", e))?;

    let options = parse_options(args.get(OPTIONS_START..).unwrap_or_default())?;
    let guess = options.extrinsic_guess()?;

    let points = PointInput::classify(object, image, estimator.capabilities())?;
    let (world, image) = points.correspondences();
    debug!(
        "solvePnP: {} correspondences, {} distortion coefficients, extrinsic guess: {}",
        points.len(),
        dist_coeffs.len(),
        guess.is_some()
    );

    let result = estimator.estimate(&PnPProblem {
        world,
        image,
        camera_matrix,
        dist_coeffs: &dist_coeffs,
        guess,
    })?;
    debug!(
        "solvePnP: rvec={:?} tvec={:?} rmse={:?}",
        result.rvec, result.translation, result.reproj_rmse
    );

    let mut outputs = vec![Value::from(Array::column(result.rvec.to_vec()))];
    if nlhs > 1 {
        outputs.push(Value::from(Array::column(result.translation.to_vec())));
    }
    Ok(outputs)
}
