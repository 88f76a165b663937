//! Trigger context - the per-invocation bundle every effect and variable sees
//!
//! The context itself is immutable once a run starts. The only mutable part is
//! `EffectOutputs`, a shared handle that effects in the same list run write
//! to and read from. The executor creates a fresh handle for each run.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// What kind of event started the run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerKind {
    Command,
    Event,
    Manual,
    Preset,
    Timer,
    Api,
}

impl TriggerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerKind::Command => "command",
            TriggerKind::Event => "event",
            TriggerKind::Manual => "manual",
            TriggerKind::Preset => "preset",
            TriggerKind::Timer => "timer",
            TriggerKind::Api => "api",
        }
    }
}

/// Event payload and invocation details
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerMetadata {
    /// Command arguments (whitespace-split chat message after the trigger)
    #[serde(default)]
    pub args: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command_trigger: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub control_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,

    /// Raw platform event payload
    #[serde(default)]
    pub event_data: Value,

    /// Arguments passed to a preset list invocation
    #[serde(default)]
    pub preset_args: Map<String, Value>,
}

/// Name → last written value, shared by every effect in one list run
#[derive(Debug, Clone, Default)]
pub struct EffectOutputs(Arc<Mutex<HashMap<String, Value>>>);

impl EffectOutputs {
    pub fn get(&self, name: &str) -> Option<Value> {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    pub fn set(&self, name: impl Into<String>, value: Value) {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.into(), value);
    }

    pub fn snapshot(&self) -> HashMap<String, Value> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn detached(&self) -> Self {
        Self(Arc::new(Mutex::new(self.snapshot())))
    }
}

#[derive(Debug, Clone)]
pub struct TriggerContext {
    pub username: String,
    pub kind: TriggerKind,
    pub metadata: TriggerMetadata,
    outputs: EffectOutputs,
}

impl TriggerContext {
    pub fn new(kind: TriggerKind, username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            kind,
            metadata: TriggerMetadata::default(),
            outputs: EffectOutputs::default(),
        }
    }

    pub fn with_metadata(mut self, metadata: TriggerMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.metadata.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_event_data(mut self, event_data: Value) -> Self {
        self.metadata.event_data = event_data;
        self
    }

    pub fn with_preset_args(mut self, args: Map<String, Value>) -> Self {
        self.metadata.preset_args = args;
        self
    }

    pub fn with_command(mut self, command_id: &str, trigger: &str) -> Self {
        self.metadata.command_id = Some(command_id.to_string());
        self.metadata.command_trigger = Some(trigger.to_string());
        self
    }

    /// Seed an effect output before the run starts
    pub fn with_output(self, name: &str, value: Value) -> Self {
        self.outputs.set(name, value);
        self
    }

    pub fn outputs(&self) -> &EffectOutputs {
        &self.outputs
    }

    /// Copy of this context with its own outputs, seeded from the current ones.
    /// Called by the executor at the start of every list run.
    pub fn begin_run(&self) -> Self {
        Self {
            username: self.username.clone(),
            kind: self.kind,
            metadata: self.metadata.clone(),
            outputs: self.outputs.detached(),
        }
    }
}
