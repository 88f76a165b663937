//! Trigger dispatch
//!
//! Turns external events (chat commands, preset invocations, timer ticks,
//! ad hoc API runs) into executor requests:
//!
//! | Trigger | Mode | Queue |
//! |---------|------|-------|
//! | command | queued | command id |
//! | preset (sync) | direct | - |
//! | preset (async) | queued | preset id |
//! | timer | queued | timer id |
//! | ad hoc | direct | - |

#[cfg(test)]
mod dispatcher_tests;

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use cuebot_types::{CommandDefinition, CommandKind, EffectList, PresetList, TimerDefinition};
use serde_json::{Map, Value};

use crate::clock::Clock;
use crate::cooldowns::{CooldownOutcome, CooldownScope, CooldownTracker};
use crate::error::EngineError;
use crate::executor::{EffectExecutor, Execution, ExecutionMode, RunResult};
use crate::queue::QueueTicket;
use crate::trigger::{TriggerContext, TriggerKind};

/// Outcome of a command dispatch. A cooldown is a normal outcome, not an
/// error.
#[derive(Debug)]
pub enum CommandDispatch {
    Started(QueueTicket),
    OnCooldown {
        scope: CooldownScope,
        remaining_secs: u64,
    },
}

impl CommandDispatch {
    pub fn into_result(self, command_id: &str) -> Result<QueueTicket, EngineError> {
        match self {
            CommandDispatch::Started(ticket) => Ok(ticket),
            CommandDispatch::OnCooldown {
                scope,
                remaining_secs,
            } => Err(EngineError::CooldownActive {
                command_id: command_id.to_string(),
                scope,
                remaining_secs,
            }),
        }
    }
}

/// Outcome of a preset dispatch
#[derive(Debug)]
pub enum PresetDispatch {
    /// Sync run finished; partial successes included
    Completed(RunResult),
    /// Async run accepted onto the preset's queue
    Acknowledged(QueueTicket),
}

pub struct TriggerDispatcher {
    commands: RwLock<HashMap<String, CommandDefinition>>,
    presets: RwLock<HashMap<String, PresetList>>,
    cooldowns: Arc<CooldownTracker>,
    executor: Arc<EffectExecutor>,
    clock: Arc<dyn Clock>,
    bot_name: String,
}

impl TriggerDispatcher {
    pub fn new(
        executor: Arc<EffectExecutor>,
        cooldowns: Arc<CooldownTracker>,
        clock: Arc<dyn Clock>,
        bot_name: impl Into<String>,
    ) -> Self {
        Self {
            commands: RwLock::default(),
            presets: RwLock::default(),
            cooldowns,
            executor,
            clock,
            bot_name: bot_name.into(),
        }
    }

    pub fn executor(&self) -> &Arc<EffectExecutor> {
        &self.executor
    }

    pub fn cooldowns(&self) -> &Arc<CooldownTracker> {
        &self.cooldowns
    }

    pub fn bot_name(&self) -> &str {
        &self.bot_name
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Catalogue
    // ─────────────────────────────────────────────────────────────────────────

    pub fn set_commands(&self, commands: impl IntoIterator<Item = CommandDefinition>) {
        let map = commands.into_iter().map(|c| (c.id.clone(), c)).collect();
        *self.commands.write().unwrap_or_else(PoisonError::into_inner) = map;
    }

    pub fn set_presets(&self, presets: impl IntoIterator<Item = PresetList>) {
        let map = presets.into_iter().map(|p| (p.id.clone(), p)).collect();
        *self.presets.write().unwrap_or_else(PoisonError::into_inner) = map;
    }

    pub fn upsert_command(&self, command: CommandDefinition) {
        self.commands
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(command.id.clone(), command);
    }

    pub fn upsert_preset(&self, preset: PresetList) {
        self.presets
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(preset.id.clone(), preset);
    }

    pub fn command(&self, id: &str) -> Option<CommandDefinition> {
        self.commands
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    /// Commands of one kind (or all), sorted by trigger
    pub fn commands(&self, kind: Option<CommandKind>) -> Vec<CommandDefinition> {
        let mut commands: Vec<_> = self
            .commands
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|c| kind.is_none_or(|k| c.kind == k))
            .cloned()
            .collect();
        commands.sort_by(|a, b| a.trigger.cmp(&b.trigger));
        commands
    }

    pub fn preset(&self, id: &str) -> Option<PresetList> {
        self.presets
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    pub fn presets(&self) -> Vec<PresetList> {
        let mut presets: Vec<_> = self
            .presets
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        presets.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        presets
    }

    fn command_by_trigger(&self, trigger: &str) -> Option<CommandDefinition> {
        self.commands
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .find(|c| c.trigger.eq_ignore_ascii_case(trigger))
            .cloned()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Dispatch
    // ─────────────────────────────────────────────────────────────────────────

    /// Run a command for `context.username`, gated by its cooldowns and
    /// restrictions. Runs on the queue named by the command id.
    pub async fn dispatch_command(
        &self,
        command_id: &str,
        context: TriggerContext,
    ) -> Result<CommandDispatch, EngineError> {
        let command = self
            .command(command_id)
            .ok_or_else(|| EngineError::not_found("command", command_id))?;
        if !command.active {
            return Err(EngineError::validation(format!(
                "command '{}' is disabled",
                command.trigger
            )));
        }

        let reservation = match self.cooldowns.check_and_reserve(
            &command.id,
            &context.username,
            self.clock.now(),
            &command.cooldown,
        ) {
            CooldownOutcome::Allowed(reservation) => reservation,
            blocked => {
                let (scope, remaining_secs) = blocked.blocked().unwrap_or((CooldownScope::Global, 0));
                tracing::debug!(
                    command = %command.trigger,
                    user = %context.username,
                    %scope,
                    remaining_secs,
                    "Command on cooldown"
                );
                return Ok(CommandDispatch::OnCooldown {
                    scope,
                    remaining_secs,
                });
            }
        };

        // Precondition failures drop the reservation untouched
        if !command.restrictions.permits(&context.username) {
            return Err(EngineError::validation(format!(
                "{} is not allowed to use '{}'",
                context.username, command.trigger
            )));
        }

        let mut context = context.with_command(&command.id, &command.trigger);
        context.kind = TriggerKind::Command;

        let execution = self
            .executor
            .run(command.effects, context, ExecutionMode::Queued(command.id.clone()))
            .await?;
        reservation.commit(self.clock.now());

        tracing::info!(command = %command.trigger, id = %command.id, "Command dispatched");
        match execution {
            Execution::Queued(ticket) => Ok(CommandDispatch::Started(ticket)),
            Execution::Completed(_) => Err(EngineError::EngineFault(
                "queued command completed inline".to_string(),
            )),
        }
    }

    /// Match a chat message against command triggers (`!so @bob`).
    /// Returns `None` when no command matches.
    pub async fn dispatch_chat(
        &self,
        username: &str,
        message: &str,
    ) -> Option<Result<CommandDispatch, EngineError>> {
        let mut words = message.split_whitespace();
        let trigger = words.next()?;
        let command = self.command_by_trigger(trigger)?;

        let context = TriggerContext::new(TriggerKind::Command, username).with_args(words);
        Some(self.dispatch_command(&command.id, context).await)
    }

    /// Run a preset list. `sync` runs it directly and returns the result;
    /// otherwise it is queued on the preset's id and acknowledged.
    pub async fn dispatch_preset(
        &self,
        preset_id: &str,
        args: Map<String, Value>,
        username: Option<&str>,
        sync: bool,
    ) -> Result<PresetDispatch, EngineError> {
        let preset = self
            .preset(preset_id)
            .ok_or_else(|| EngineError::not_found("preset effect list", preset_id))?;

        let context = TriggerContext::new(TriggerKind::Preset, username.unwrap_or(&self.bot_name))
            .with_preset_args(args);
        let mode = if sync {
            ExecutionMode::Direct
        } else {
            ExecutionMode::Queued(preset.id.clone())
        };

        tracing::debug!(preset = %preset.id, sync, "Preset dispatched");
        match self.executor.run(preset.effects, context, mode).await? {
            Execution::Completed(result) => Ok(PresetDispatch::Completed(result)),
            Execution::Queued(ticket) => Ok(PresetDispatch::Acknowledged(ticket)),
        }
    }

    /// Queue a timer's list on the timer's id
    pub async fn dispatch_timer(&self, timer: &TimerDefinition) -> Result<QueueTicket, EngineError> {
        let context = TriggerContext::new(TriggerKind::Timer, self.bot_name.clone());
        let execution = self
            .executor
            .run(timer.effects.clone(), context, ExecutionMode::Queued(timer.id.clone()))
            .await?;
        execution
            .into_ticket()
            .ok_or_else(|| EngineError::EngineFault("queued timer completed inline".to_string()))
    }

    /// Run an ad hoc list directly
    pub async fn run_ad_hoc(
        &self,
        list: EffectList,
        context: TriggerContext,
    ) -> Result<RunResult, EngineError> {
        if list.is_empty() {
            return Err(EngineError::validation("No effects provided"));
        }
        self.executor
            .run(list, context, ExecutionMode::Direct)
            .await?
            .into_result()
            .ok_or_else(|| EngineError::EngineFault("direct run was queued".to_string()))
    }
}
