use std::sync::Arc;

use async_trait::async_trait;
use cuebot_types::{EffectInstance, EffectList};
use rand::Rng;

use super::result::{EffectStatus, RunResult, SkipReason};
use crate::effects::{EffectError, EffectEvent, EffectRegistry, ListControl};
use crate::queue::QueueRunner;
use crate::trigger::TriggerContext;
use crate::variables::VariableResolver;

/// How a list run ended early, if it did
enum Halt {
    Stopped,
    Aborted,
}

/// Walks an effect list in declaration order
pub struct EffectRunner {
    effects: Arc<EffectRegistry>,
    resolver: VariableResolver,
}

impl EffectRunner {
    pub fn new(effects: Arc<EffectRegistry>, resolver: VariableResolver) -> Self {
        Self { effects, resolver }
    }

    pub fn effects(&self) -> &EffectRegistry {
        &self.effects
    }

    pub fn resolver(&self) -> &VariableResolver {
        &self.resolver
    }

    /// Run every active effect in order. Individual failures are recorded
    /// and the list continues unless the failing type aborts on error.
    pub async fn run(&self, list: &EffectList, context: &TriggerContext) -> RunResult {
        let context = context.begin_run();
        let mut result = RunResult::default();
        let mut halt = None;

        for instance in &list.list {
            if let Some(halt) = &halt {
                let reason = match halt {
                    Halt::Stopped => SkipReason::ListStopped,
                    Halt::Aborted => SkipReason::ListAborted,
                };
                result.record(&instance.id, &instance.effect_type, EffectStatus::Skipped { reason });
                continue;
            }

            if !instance.active {
                result.record(
                    &instance.id,
                    &instance.effect_type,
                    EffectStatus::Skipped { reason: SkipReason::Inactive },
                );
                continue;
            }

            if let Some(weight) = instance.percent_weight
                && !weight_roll_passes(weight)
            {
                tracing::debug!(effect_id = %instance.id, weight, "Skipped by weight roll");
                result.record(
                    &instance.id,
                    &instance.effect_type,
                    EffectStatus::Skipped { reason: SkipReason::WeightRoll },
                );
                continue;
            }

            match self.run_one(instance, &context).await {
                Ok(ListControl::Continue) => {
                    result.record(&instance.id, &instance.effect_type, EffectStatus::Success);
                }
                Ok(ListControl::StopList) => {
                    result.record(&instance.id, &instance.effect_type, EffectStatus::Success);
                    tracing::debug!(effect_id = %instance.id, "Effect list stopped");
                    halt = Some(Halt::Stopped);
                }
                Err(err) => {
                    tracing::warn!(
                        effect_id = %instance.id,
                        effect_type = %instance.effect_type,
                        error = %err,
                        "Effect failed"
                    );
                    result.record(
                        &instance.id,
                        &instance.effect_type,
                        EffectStatus::Failed { error: err.to_string() },
                    );
                    if self
                        .effects
                        .definition(&instance.effect_type)
                        .is_some_and(|d| d.abort_list_on_error)
                    {
                        halt = Some(Halt::Aborted);
                    }
                }
            }
        }

        result.stopped = matches!(halt, Some(Halt::Stopped));
        result.aborted = matches!(halt, Some(Halt::Aborted));
        result.outputs = context.outputs().snapshot();
        result
    }

    async fn run_one(
        &self,
        instance: &EffectInstance,
        context: &TriggerContext,
    ) -> Result<ListControl, EffectError> {
        let handler = self.effects.get(&instance.effect_type).ok_or_else(|| {
            EffectError::Failed(format!("unknown effect type '{}'", instance.effect_type))
        })?;

        let mut effect = instance.clone();
        effect.args = self.resolver.resolve_args(&instance.args, context)?;

        let event = EffectEvent {
            effect,
            context: context.clone(),
        };
        let wait = event
            .bool_arg("wait")
            .unwrap_or(handler.definition().wait_for_completion);

        let outcome = handler.trigger(event).await?;
        for (name, value) in outcome.outputs {
            context.outputs().set(name, value);
        }

        // Without wait the completion handle is dropped and the effect
        // keeps running alongside the rest of the list
        if wait && let Some(completion) = outcome.completion {
            completion.await.map_err(|_| EffectError::Cancelled)?;
        }

        Ok(outcome.control)
    }
}

/// Uniform roll in [0, 100); the effect runs when the roll is below weight
fn weight_roll_passes(weight: f64) -> bool {
    rand::thread_rng().gen_range(0.0..100.0) < weight
}

#[async_trait]
impl QueueRunner for EffectRunner {
    async fn run_queued(&self, list: EffectList, context: TriggerContext) -> RunResult {
        self.run(&list, &context).await
    }
}
