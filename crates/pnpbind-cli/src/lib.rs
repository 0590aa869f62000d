//! Reading and running binding calls described in JSON.

use std::path::Path;

use pnpbind::{solve_pnp_with, BindError, Value};
use pnpbind_pnp::{IterativeParams, IterativePnP};
use serde::Deserialize;
use thiserror::Error;

/// Errors raised by the command line harness.
#[derive(Debug, Error)]
pub enum CliError {
    /// The call file could not be read.
    #[error("Failed to read the call file: {0}")]
    Io(#[from] std::io::Error),

    /// The call file is not a valid call description.
    #[error("Invalid call description: {0}")]
    Json(#[from] serde_json::Error),

    /// The binding rejected the call.
    #[error(transparent)]
    Bind(#[from] BindError),
}

impl CliError {
    /// Categorical identifier printed next to the message.
    pub fn identifier(&self) -> &'static str {
        match self {
            CliError::Io(_) => "pnpbind:Io",
            CliError::Json(_) => "pnpbind:InvalidCall",
            CliError::Bind(e) => e.identifier(),
        }
    }
}

/// A binding call: the host arguments and optional solver parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct Call {
    /// Positional arguments followed by name/value option pairs.
    pub args: Vec<Value>,
    /// Parameters of the iterative solver.
    #[serde(default)]
    pub solver: IterativeParams,
}

impl Call {
    /// Load a call description from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, CliError> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Run the call, requesting `nargout` outputs.
    pub fn run(&self, nargout: usize) -> Result<Vec<Value>, CliError> {
        let estimator = IterativePnP::new(self.solver.clone());
        Ok(solve_pnp_with(&estimator, nargout, &self.args)?)
    }
}
