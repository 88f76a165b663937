use async_trait::async_trait;

use crate::effects::{EffectDefinition, EffectError, EffectEvent, EffectOutcome, EffectType};

pub struct StopEffectExecution {
    definition: EffectDefinition,
}

impl StopEffectExecution {
    pub const ID: &'static str = "cuebot:stop-effect-execution";

    pub fn new() -> Self {
        Self {
            definition: EffectDefinition::new(
                Self::ID,
                "Stop Effect Execution",
                "Stop the rest of this effect list from running.",
            )
            .icon("fad fa-stop-circle")
            .categories(&["scripting"]),
        }
    }
}

impl Default for StopEffectExecution {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EffectType for StopEffectExecution {
    fn definition(&self) -> &EffectDefinition {
        &self.definition
    }

    async fn trigger(&self, _event: EffectEvent) -> Result<EffectOutcome, EffectError> {
        Ok(EffectOutcome::stop_list())
    }
}
