//! Variable definitions and registry
//!
//! Every built-in variable registers a `ReplaceVariable` keyed by its handle
//! (`$user`, `$arg`, ...). Metadata-only entries such as the `&name` alias are
//! registered as spoofed: they show up in the catalogue but are never
//! evaluated.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use super::VariableError;
use crate::custom_variables::CustomVariableStore;
use crate::trigger::TriggerContext;

/// Whether resolution may touch state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResolveMode {
    #[default]
    Execute,
    /// Read-only preview; side-effecting variables are rejected
    Preview,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariableExample {
    pub usage: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableDefinition {
    pub handle: String,
    pub usage: String,
    pub description: String,
    pub examples: Vec<VariableExample>,
    pub categories: Vec<String>,
    pub possible_data_output: Vec<String>,
    pub spoof: bool,
    pub side_effects: bool,
}

impl VariableDefinition {
    pub fn new(handle: &str, usage: &str, description: &str) -> Self {
        Self {
            handle: handle.to_string(),
            usage: usage.to_string(),
            description: description.to_string(),
            examples: Vec::new(),
            categories: vec!["common".to_string()],
            possible_data_output: vec!["text".to_string()],
            spoof: false,
            side_effects: false,
        }
    }

    pub fn example(mut self, usage: &str, description: &str) -> Self {
        self.examples.push(VariableExample {
            usage: usage.to_string(),
            description: description.to_string(),
        });
        self
    }

    pub fn categories(mut self, categories: &[&str]) -> Self {
        self.categories = categories.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn outputs(mut self, outputs: &[&str]) -> Self {
        self.possible_data_output = outputs.iter().map(|o| o.to_string()).collect();
        self
    }

    pub fn spoofed(mut self) -> Self {
        self.spoof = true;
        self
    }

    pub fn with_side_effects(mut self) -> Self {
        self.side_effects = true;
        self
    }
}

/// What an evaluator can see
pub struct EvalScope<'a> {
    pub trigger: &'a TriggerContext,
    pub store: &'a CustomVariableStore,
    pub mode: ResolveMode,
}

pub trait ReplaceVariable: Send + Sync {
    fn definition(&self) -> &VariableDefinition;

    /// Evaluate with already-resolved arguments
    fn evaluate(&self, scope: &EvalScope<'_>, args: &[String]) -> Result<Value, VariableError>;

    /// Whether text produced by this variable is expanded again.
    /// Only user-authored stored values (effect outputs, custom variables)
    /// opt in; viewer-supplied text such as command args never does.
    fn expands_result(&self) -> bool {
        false
    }
}

/// Catalogue entry for `GET /variables`
#[derive(Debug, Clone, Serialize)]
pub struct VariableCatalogEntry {
    pub definition: VariableDefinition,
    pub handle: String,
}

struct Spoofed(VariableDefinition);

impl ReplaceVariable for Spoofed {
    fn definition(&self) -> &VariableDefinition {
        &self.0
    }

    fn evaluate(&self, _scope: &EvalScope<'_>, _args: &[String]) -> Result<Value, VariableError> {
        Err(VariableError::SpoofedVariable {
            handle: self.0.handle.clone(),
        })
    }
}

#[derive(Default, Clone)]
pub struct VariableRegistry {
    variables: HashMap<String, Arc<dyn ReplaceVariable>>,
}

impl VariableRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in variable
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        super::builtin::register_all(&mut registry);
        registry
    }

    /// Register (or replace) a variable under its handle
    pub fn register(&mut self, variable: Arc<dyn ReplaceVariable>) {
        let handle = variable.definition().handle.clone();
        self.variables.insert(handle, variable);
    }

    /// Register a metadata-only entry
    pub fn register_spoof(&mut self, definition: VariableDefinition) {
        self.register(Arc::new(Spoofed(definition.spoofed())));
    }

    /// Look up by full handle, e.g. `$user`
    pub fn get(&self, handle: &str) -> Option<&Arc<dyn ReplaceVariable>> {
        self.variables.get(handle)
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    /// Catalogue sorted by handle
    pub fn catalog(&self) -> Vec<VariableCatalogEntry> {
        let mut entries: Vec<_> = self
            .variables
            .values()
            .map(|v| VariableCatalogEntry {
                definition: v.definition().clone(),
                handle: v.definition().handle.clone(),
            })
            .collect();
        entries.sort_by(|a, b| a.handle.cmp(&b.handle));
        entries
    }
}
