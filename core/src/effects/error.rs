//! Error types for effect handlers

use thiserror::Error;

use crate::variables::VariableError;

/// Failure of a single effect. Recorded in the run result; only stops the
/// list when the effect type is abort-on-error.
#[derive(Debug, Error)]
pub enum EffectError {
    #[error("missing argument '{0}'")]
    MissingArgument(String),

    #[error("invalid argument '{name}': {reason}")]
    InvalidArgument { name: String, reason: String },

    #[error("{0}")]
    Failed(String),

    #[error("effect was cancelled before completing")]
    Cancelled,

    #[error("argument resolution failed")]
    Variable(#[from] VariableError),
}

impl EffectError {
    pub fn invalid(name: &str, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}
