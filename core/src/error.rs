//! Engine-level error taxonomy
//!
//! Validation and not-found errors are recovered at the dispatcher/router
//! boundary and turned into structured responses. Per-effect failures are
//! recorded in `RunResult` and only surface here when an abort-on-error
//! effect stops its list.

use thiserror::Error;

use crate::cooldowns::CooldownScope;
use crate::variables::VariableError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("{0}")]
    Validation(String),

    #[error("{kind} '{id}' not found")]
    NotFound { kind: &'static str, id: String },

    #[error("command '{command_id}' is on {scope} cooldown for another {remaining_secs}s")]
    CooldownActive {
        command_id: String,
        scope: CooldownScope,
        remaining_secs: u64,
    },

    #[error(transparent)]
    VariableResolution(#[from] VariableError),

    #[error("effect '{effect_id}' failed: {message}")]
    EffectExecution { effect_id: String, message: String },

    #[error("engine fault: {0}")]
    EngineFault(String),
}

impl EngineError {
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// HTTP-equivalent status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            EngineError::Validation(_) | EngineError::VariableResolution(_) => 400,
            EngineError::NotFound { .. } => 404,
            EngineError::CooldownActive { .. } => 429,
            EngineError::EffectExecution { .. } | EngineError::EngineFault(_) => 500,
        }
    }
}
