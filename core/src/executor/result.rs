use std::collections::HashMap;

use serde::Serialize;
use serde_json::Value;

use crate::error::EngineError;

/// Why an effect did not run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    Inactive,
    /// `percentWeight` roll failed
    WeightRoll,
    /// An earlier effect stopped the list
    ListStopped,
    /// An earlier abort-on-error effect failed
    ListAborted,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EffectStatus {
    Success,
    Skipped { reason: SkipReason },
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EffectRecord {
    pub effect_id: String,
    pub effect_type: String,
    #[serde(flatten)]
    pub status: EffectStatus,
}

/// Per-effect outcome of one list run, in declaration order
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunResult {
    pub effects: Vec<EffectRecord>,
    /// A stop-effect-execution effect ended the run
    pub stopped: bool,
    /// An abort-on-error effect failed and ended the run
    pub aborted: bool,
    /// Effect outputs at the end of the run
    pub outputs: HashMap<String, Value>,
}

impl RunResult {
    pub(crate) fn record(&mut self, effect_id: &str, effect_type: &str, status: EffectStatus) {
        self.effects.push(EffectRecord {
            effect_id: effect_id.to_string(),
            effect_type: effect_type.to_string(),
            status,
        });
    }

    pub fn succeeded(&self) -> usize {
        self.count(|s| matches!(s, EffectStatus::Success))
    }

    pub fn skipped(&self) -> usize {
        self.count(|s| matches!(s, EffectStatus::Skipped { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|s| matches!(s, EffectStatus::Failed { .. }))
    }

    pub fn has_failures(&self) -> bool {
        self.failed() > 0
    }

    fn count(&self, pred: impl Fn(&EffectStatus) -> bool) -> usize {
        self.effects.iter().filter(|r| pred(&r.status)).count()
    }

    /// Ids of effects that ran successfully, in order
    pub fn executed_ids(&self) -> Vec<&str> {
        self.effects
            .iter()
            .filter(|r| r.status == EffectStatus::Success)
            .map(|r| r.effect_id.as_str())
            .collect()
    }

    /// The failure that aborted the run, if any
    pub fn abort_error(&self) -> Option<EngineError> {
        if !self.aborted {
            return None;
        }
        self.effects.iter().rev().find_map(|r| match &r.status {
            EffectStatus::Failed { error } => Some(EngineError::EffectExecution {
                effect_id: r.effect_id.clone(),
                message: error.clone(),
            }),
            _ => None,
        })
    }
}
