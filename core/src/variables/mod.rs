//! Replace-variable resolution
//!
//! Templates in effect arguments carry handles such as `$user`,
//! `$arg[1]` or `&winner[name]`. The resolver expands them against a
//! `TriggerContext` and the custom variable store.

mod builtin;
mod definition;
mod error;
mod parser;
mod resolver;

#[cfg(test)]
mod resolver_tests;

pub use definition::{
    EvalScope, ReplaceVariable, ResolveMode, VariableCatalogEntry, VariableDefinition,
    VariableExample, VariableRegistry,
};
pub use error::VariableError;
pub use parser::contains_handle;
pub use resolver::{DEFAULT_MAX_DEPTH, VariableResolver};
