use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::custom_variables::CustomVariableStore;
use crate::effects::{EffectDefinition, EffectError, EffectEvent, EffectOutcome, EffectType};

/// Writes `name` = `value` to the custom variable store. `value` strings
/// holding JSON are stored parsed; `ttl` is in seconds, 0 for permanent.
pub struct CustomVariableEffect {
    definition: EffectDefinition,
    store: Arc<CustomVariableStore>,
}

impl CustomVariableEffect {
    pub const ID: &'static str = "cuebot:custom-variable";

    pub fn new(store: Arc<CustomVariableStore>) -> Self {
        Self {
            definition: EffectDefinition::new(
                Self::ID,
                "Custom Variable",
                "Save data to a custom variable that you can then use elsewhere.",
            )
            .icon("fad fa-value-absolute")
            .categories(&["scripting"]),
            store,
        }
    }
}

#[async_trait]
impl EffectType for CustomVariableEffect {
    fn definition(&self) -> &EffectDefinition {
        &self.definition
    }

    async fn trigger(&self, event: EffectEvent) -> Result<EffectOutcome, EffectError> {
        let name = event.str_arg("name")?;
        if name.trim().is_empty() {
            return Err(EffectError::invalid("name", "variable name is empty"));
        }

        let value = match event.arg("value") {
            Some(Value::String(raw)) => {
                serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.clone()))
            }
            Some(other) => other.clone(),
            None => Value::Null,
        };

        let ttl = match event.f64_arg("ttl")? {
            Some(ttl) if ttl < 0.0 || !ttl.is_finite() => {
                return Err(EffectError::invalid("ttl", "ttl must be zero or positive"));
            }
            Some(ttl) => Some(ttl as u64),
            None => None,
        };

        self.store.set(&name, value.clone(), ttl);
        Ok(EffectOutcome::done().with_output(name, value))
    }
}
