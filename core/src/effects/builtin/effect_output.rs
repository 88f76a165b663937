use async_trait::async_trait;
use serde_json::Value;

use crate::effects::{EffectDefinition, EffectError, EffectEvent, EffectOutcome, EffectType};

/// Publishes `name` = `value` for later effects in the same run
pub struct EffectOutputEffect {
    definition: EffectDefinition,
}

impl EffectOutputEffect {
    pub const ID: &'static str = "cuebot:effect-output";

    pub fn new() -> Self {
        Self {
            definition: EffectDefinition::new(
                Self::ID,
                "Set Effect Output",
                "Store a value that later effects in this list can read with &name.",
            )
            .icon("fad fa-share")
            .categories(&["scripting", "advanced"]),
        }
    }
}

impl Default for EffectOutputEffect {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EffectType for EffectOutputEffect {
    fn definition(&self) -> &EffectDefinition {
        &self.definition
    }

    async fn trigger(&self, event: EffectEvent) -> Result<EffectOutcome, EffectError> {
        let name = event.str_arg("name")?;
        let value = event.arg("value").cloned().unwrap_or(Value::Null);
        Ok(EffectOutcome::done().with_output(name, value))
    }
}
