#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]
//!
//! # pnpbind
//!
//! Exposes Perspective-n-Point pose estimation to a host numerical
//! environment. A call arrives as a list of host [`Value`]s,
//!
//! ```text
//! [rvec, tvec] = solvePnP(objectPoints, imagePoints, cameraMatrix, [distCoeffs],
//!                         'UseExtrinsicGuess', flag, 'Rvec', rvec0, 'Tvec', tvec0)
//! ```
//!
//! and is answered with host values. Malformed calls fail with a
//! [`BindError`] carrying a categorical identifier.
//!
//! ```rust
//! use pnpbind::{solve_pnp, Value};
//!
//! let object = [[-0.5, -0.5, 0.0], [0.5, -0.5, 0.1], [0.5, 0.5, -0.1], [-0.5, 0.5, 0.0], [0.0, 0.0, 0.4]];
//! // Camera 4 units in front of the points.
//! let image: Vec<[f64; 2]> = object
//!     .iter()
//!     .map(|p: &[f64; 3]| [800.0 * p[0] / (p[2] + 4.0) + 320.0, 800.0 * p[1] / (p[2] + 4.0) + 240.0])
//!     .collect();
//! let k = [[800.0, 0.0, 320.0], [0.0, 800.0, 240.0], [0.0, 0.0, 1.0]];
//!
//! let out = solve_pnp(2, &[Value::matrix(&object), Value::matrix(&image), Value::matrix(&k)])?;
//! let tvec = out[1].to_vec3()?;
//! assert!((tvec[2] - 4.0).abs() < 1e-6);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

/// Call shape validation and option parsing.
pub mod args;

/// Binding errors and their identifiers.
pub mod error;

/// Tagged point-input dispatch.
pub mod points;

/// The binding entry points.
pub mod solve;

pub use args::{check_call_shape, PnPOptions};
pub use error::BindError;
pub use points::PointInput;
pub use pnpbind_array::{Array, ConversionError, Value};
pub use solve::{solve_pnp, solve_pnp_with};
