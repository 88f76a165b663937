use std::collections::HashMap;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use cuebot_types::TimerDefinition;
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::dispatcher::TriggerDispatcher;
use crate::error::EngineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerAction {
    Enable,
    Disable,
    Toggle,
    /// Restart the countdown
    Clear,
}

impl FromStr for TimerAction {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "enable" => Ok(TimerAction::Enable),
            "disable" => Ok(TimerAction::Disable),
            "toggle" => Ok(TimerAction::Toggle),
            "clear" => Ok(TimerAction::Clear),
            other => Err(EngineError::validation(format!(
                "invalid timer action '{other}', expected enable, disable, toggle or clear"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerStatus {
    pub id: String,
    pub name: String,
    pub interval_secs: u64,
    pub active: bool,
    /// A tick task is running
    pub running: bool,
}

struct TimerSlot {
    definition: TimerDefinition,
    task: Option<JoinHandle<()>>,
}

impl TimerSlot {
    fn status(&self) -> TimerStatus {
        TimerStatus {
            id: self.definition.id.clone(),
            name: self.definition.name.clone(),
            interval_secs: self.definition.interval_secs,
            active: self.definition.active,
            running: self.task.as_ref().is_some_and(|t| !t.is_finished()),
        }
    }

    fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

pub struct TimerService {
    dispatcher: Arc<TriggerDispatcher>,
    timers: Mutex<HashMap<String, TimerSlot>>,
    /// Length of one `interval_secs` unit
    tick_unit: Duration,
}

impl TimerService {
    pub fn new(dispatcher: Arc<TriggerDispatcher>) -> Self {
        Self {
            dispatcher,
            timers: Mutex::new(HashMap::new()),
            tick_unit: Duration::from_secs(1),
        }
    }

    /// Scale intervals, e.g. milliseconds instead of seconds for simulations
    pub fn with_tick_unit(mut self, unit: Duration) -> Self {
        self.tick_unit = unit;
        self
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, TimerSlot>> {
        self.timers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace all timer definitions. Running tasks are stopped; call
    /// `start` to begin ticking.
    pub fn set_definitions(&self, definitions: impl IntoIterator<Item = TimerDefinition>) {
        let mut timers = self.lock();
        for slot in timers.values_mut() {
            slot.stop();
        }
        *timers = definitions
            .into_iter()
            .map(|definition| {
                (
                    definition.id.clone(),
                    TimerSlot {
                        definition,
                        task: None,
                    },
                )
            })
            .collect();
    }

    /// Start a tick task for every active timer that isn't running
    pub fn start(&self) {
        let mut timers = self.lock();
        let mut started = 0;
        for slot in timers.values_mut() {
            if slot.definition.active && slot.task.is_none() {
                slot.task = Some(self.spawn_ticker(slot.definition.clone()));
                started += 1;
            }
        }
        tracing::info!(started, total = timers.len(), "Timers started");
    }

    pub fn stop_all(&self) {
        for slot in self.lock().values_mut() {
            slot.stop();
        }
    }

    pub fn apply(&self, timer_id: &str, action: TimerAction) -> Result<TimerStatus, EngineError> {
        let mut timers = self.lock();
        let slot = timers
            .get_mut(timer_id)
            .ok_or_else(|| EngineError::not_found("timer", timer_id))?;

        let enable = match action {
            TimerAction::Enable => true,
            TimerAction::Disable => false,
            TimerAction::Toggle => !slot.definition.active,
            TimerAction::Clear => slot.definition.active,
        };

        slot.stop();
        slot.definition.active = enable;
        if enable {
            slot.task = Some(self.spawn_ticker(slot.definition.clone()));
        }

        tracing::debug!(timer = %timer_id, ?action, active = enable, "Timer updated");
        Ok(slot.status())
    }

    pub fn timer(&self, timer_id: &str) -> Option<TimerStatus> {
        self.lock().get(timer_id).map(TimerSlot::status)
    }

    pub fn timers(&self) -> Vec<TimerStatus> {
        let mut statuses: Vec<_> = self.lock().values().map(TimerSlot::status).collect();
        statuses.sort_by(|a, b| a.id.cmp(&b.id));
        statuses
    }

    fn spawn_ticker(&self, timer: TimerDefinition) -> JoinHandle<()> {
        let dispatcher = Arc::clone(&self.dispatcher);
        let period = self.tick_unit * u32::try_from(timer.interval_secs.max(1)).unwrap_or(u32::MAX);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                match dispatcher.dispatch_timer(&timer).await {
                    Ok(ticket) => {
                        tracing::debug!(timer = %timer.id, entry_id = ticket.entry_id, "Timer fired");
                    }
                    Err(err) => {
                        tracing::warn!(timer = %timer.id, error = %err, "Timer dispatch failed");
                    }
                }
            }
        })
    }
}

impl Drop for TimerService {
    fn drop(&mut self) {
        self.stop_all();
    }
}
