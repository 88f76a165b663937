use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::oneshot;

use crate::effects::{EffectDefinition, EffectError, EffectEvent, EffectOutcome, EffectType};

pub struct DelayEffect {
    definition: EffectDefinition,
}

impl DelayEffect {
    pub const ID: &'static str = "cuebot:delay";

    pub fn new() -> Self {
        Self {
            definition: EffectDefinition::new(
                Self::ID,
                "Delay",
                "Pause between effects.",
            )
            .icon("fad fa-stopwatch")
            .categories(&["scripting"])
            .waits_for_completion(),
        }
    }
}

impl Default for DelayEffect {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EffectType for DelayEffect {
    fn definition(&self) -> &EffectDefinition {
        &self.definition
    }

    async fn trigger(&self, event: EffectEvent) -> Result<EffectOutcome, EffectError> {
        let secs = event
            .f64_arg("delay")?
            .ok_or_else(|| EffectError::MissingArgument("delay".to_string()))?;
        if !secs.is_finite() || secs < 0.0 {
            return Err(EffectError::invalid("delay", format!("{secs} is not a valid delay")));
        }

        let (done, completion) = oneshot::channel();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs_f64(secs)).await;
            let _ = done.send(());
        });

        Ok(EffectOutcome::done().with_completion(completion))
    }
}
