//! Error types for variable resolution

use thiserror::Error;

/// Errors while expanding `$name[...]` / `&name[...]` handles.
///
/// Unknown handles are not an error - they resolve to an empty string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VariableError {
    #[error("variable nesting exceeded {depth} levels")]
    DepthExceeded { depth: usize },

    #[error("unbalanced brackets in handle starting at byte {position}")]
    UnbalancedBrackets { position: usize },

    #[error("'{handle}' is metadata-only and cannot be evaluated")]
    SpoofedVariable { handle: String },

    #[error("'{handle}' has side effects and is not allowed in preview")]
    SideEffectInPreview { handle: String },

    #[error("invalid argument for {handle}: {reason}")]
    InvalidArgument { handle: String, reason: String },
}
