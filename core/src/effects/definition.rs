//! Effect type contract
//!
//! Each effect type registers a handler keyed by its type id. The executor
//! only talks to this trait and never branches on type names.

use async_trait::async_trait;
use cuebot_types::EffectInstance;
use serde::Serialize;
use serde_json::{Map, Value};
use tokio::sync::oneshot;

use super::EffectError;
use crate::trigger::TriggerContext;

// ═══════════════════════════════════════════════════════════════════════════
// Definitions
// ═══════════════════════════════════════════════════════════════════════════

/// Catalogue entry for an effect type (`GET /effects`)
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EffectDefinition {
    pub id: String,
    pub name: String,
    pub description: String,
    pub icon: String,
    pub categories: Vec<String>,
    pub dependencies: Vec<String>,

    /// The executor waits for the completion handle before the next effect
    pub wait_for_completion: bool,

    /// A failure stops the rest of the list
    pub abort_list_on_error: bool,
}

impl EffectDefinition {
    pub fn new(id: &str, name: &str, description: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            icon: "fad fa-magic".to_string(),
            categories: vec!["common".to_string()],
            dependencies: Vec::new(),
            wait_for_completion: false,
            abort_list_on_error: false,
        }
    }

    pub fn icon(mut self, icon: &str) -> Self {
        self.icon = icon.to_string();
        self
    }

    pub fn categories(mut self, categories: &[&str]) -> Self {
        self.categories = categories.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn dependencies(mut self, dependencies: &[&str]) -> Self {
        self.dependencies = dependencies.iter().map(|d| d.to_string()).collect();
        self
    }

    pub fn waits_for_completion(mut self) -> Self {
        self.wait_for_completion = true;
        self
    }

    pub fn aborts_list_on_error(mut self) -> Self {
        self.abort_list_on_error = true;
        self
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Invocation
// ═══════════════════════════════════════════════════════════════════════════

/// What a handler receives: the instance with resolved arguments and the
/// run's trigger context
#[derive(Debug, Clone)]
pub struct EffectEvent {
    pub effect: EffectInstance,
    pub context: TriggerContext,
}

impl EffectEvent {
    pub fn arg(&self, name: &str) -> Option<&Value> {
        self.effect.args.get(name).filter(|v| !v.is_null())
    }

    pub fn args(&self) -> &Map<String, Value> {
        &self.effect.args
    }

    /// Required string argument (numbers and booleans are stringified)
    pub fn str_arg(&self, name: &str) -> Result<String, EffectError> {
        self.opt_str_arg(name)
            .ok_or_else(|| EffectError::MissingArgument(name.to_string()))
    }

    pub fn opt_str_arg(&self, name: &str) -> Option<String> {
        match self.arg(name)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// Numeric argument; numeric strings are accepted since templates
    /// always resolve to text
    pub fn f64_arg(&self, name: &str) -> Result<Option<f64>, EffectError> {
        match self.arg(name) {
            None => Ok(None),
            Some(Value::Number(n)) => Ok(n.as_f64()),
            Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
            Some(Value::String(s)) => s
                .trim()
                .parse()
                .map(Some)
                .map_err(|_| EffectError::invalid(name, format!("'{s}' is not a number"))),
            Some(other) => Err(EffectError::invalid(name, format!("expected a number, got {other}"))),
        }
    }

    pub fn bool_arg(&self, name: &str) -> Option<bool> {
        match self.arg(name)? {
            Value::Bool(b) => Some(*b),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

/// Signal from a handler to the executor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ListControl {
    #[default]
    Continue,
    /// Skip every remaining effect in the list
    StopList,
}

/// Completion signal for effects that finish after `trigger` returns.
/// A dropped sender counts as cancelled.
pub type Completion = oneshot::Receiver<()>;

#[derive(Debug, Default)]
pub struct EffectOutcome {
    /// Written to the run's effect outputs after the handler returns
    pub outputs: Vec<(String, Value)>,
    pub completion: Option<Completion>,
    pub control: ListControl,
}

impl EffectOutcome {
    pub fn done() -> Self {
        Self::default()
    }

    pub fn with_output(mut self, name: impl Into<String>, value: Value) -> Self {
        self.outputs.push((name.into(), value));
        self
    }

    pub fn with_completion(mut self, completion: Completion) -> Self {
        self.completion = Some(completion);
        self
    }

    pub fn stop_list() -> Self {
        Self {
            control: ListControl::StopList,
            ..Self::default()
        }
    }
}

#[async_trait]
pub trait EffectType: Send + Sync {
    fn definition(&self) -> &EffectDefinition;

    async fn trigger(&self, event: EffectEvent) -> Result<EffectOutcome, EffectError>;
}
