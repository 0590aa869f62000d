use std::fmt::Display;

use pnpbind_pnp::PnPError;
use thiserror::Error;

/// An error type for binding calls.
///
/// Every variant maps to a categorical identifier reported to the host
/// alongside the message, see [`BindError::identifier`].
#[derive(Debug, Error)]
pub enum BindError {
    /// Wrong number of input arguments or requested outputs.
    #[error("Wrong number of arguments: {nrhs} inputs, {nlhs} outputs requested")]
    InvalidArgumentCount {
        /// Number of input arguments.
        nrhs: usize,
        /// Number of requested outputs.
        nlhs: usize,
    },

    /// An option name that the binding does not know.
    #[error("Unrecognized option {0}")]
    UnrecognizedOption(String),

    /// An argument with the wrong class or shape.
    #[error("Invalid argument {argument}: {reason}")]
    InvalidArgumentType {
        /// Name of the offending argument.
        argument: String,
        /// What was wrong with it.
        reason: String,
    },

    /// `UseExtrinsicGuess` was requested without a complete starting pose.
    #[error("UseExtrinsicGuess requires both Rvec and Tvec")]
    MissingExtrinsicGuess,

    /// The pose solver failed.
    #[error(transparent)]
    Solver(#[from] PnPError),
}

impl BindError {
    /// Categorical identifier of the error, `pnpbind:<Category>`.
    pub fn identifier(&self) -> &'static str {
        match self {
            BindError::InvalidArgumentCount { .. } => "pnpbind:InvalidArgumentCount",
            BindError::UnrecognizedOption(_) => "pnpbind:UnrecognizedOption",
            BindError::InvalidArgumentType { .. } => "pnpbind:InvalidArgumentType",
            BindError::MissingExtrinsicGuess => "pnpbind:MissingExtrinsicGuess",
            BindError::Solver(_) => "pnpbind:SolverError",
        }
    }

    pub(crate) fn invalid_type(argument: impl Into<String>, reason: impl Display) -> Self {
        BindError::InvalidArgumentType {
            argument: argument.into(),
            reason: reason.to_string(),
        }
    }
}
