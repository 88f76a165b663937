//! Engine facade
//!
//! Wires the shared state together and owns the background tasks. Each
//! `Engine` is independent; tests build a fresh one per case.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use cuebot_types::{Definitions, EngineConfig};
use tokio::task::JoinHandle;

use crate::clock::{Clock, SystemClock};
use crate::context::BackgroundTasks;
use crate::cooldowns::CooldownTracker;
use crate::custom_variables::CustomVariableStore;
use crate::definitions;
use crate::dispatcher::TriggerDispatcher;
use crate::effects::{EffectRegistry, EffectType, Outbound, outbound_channels, register_builtins};
use crate::error::EngineError;
use crate::executor::{EffectExecutor, EffectRunner};
use crate::queue::EffectQueues;
use crate::timers::TimerService;
use crate::trigger::TriggerContext;
use crate::variables::{ReplaceVariable, ResolveMode, VariableRegistry, VariableResolver};

// ─────────────────────────────────────────────────────────────────────────────
// Builder
// ─────────────────────────────────────────────────────────────────────────────

pub struct EngineBuilder {
    config: EngineConfig,
    definitions: Definitions,
    clock: Arc<dyn Clock>,
    effects: Vec<Arc<dyn EffectType>>,
    variables: Vec<Arc<dyn ReplaceVariable>>,
    timer_tick_unit: Duration,
}

impl EngineBuilder {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            definitions: Definitions::default(),
            clock: Arc::new(SystemClock),
            effects: Vec::new(),
            variables: Vec::new(),
            timer_tick_unit: Duration::from_secs(1),
        }
    }

    pub fn with_definitions(mut self, definitions: Definitions) -> Self {
        self.definitions = definitions;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Register an extra effect type. Replaces a built-in with the same id.
    pub fn with_effect(mut self, effect: Arc<dyn EffectType>) -> Self {
        self.effects.push(effect);
        self
    }

    pub fn with_variable(mut self, variable: Arc<dyn ReplaceVariable>) -> Self {
        self.variables.push(variable);
        self
    }

    /// Length of one timer `interval_secs` unit
    pub fn with_timer_tick_unit(mut self, unit: Duration) -> Self {
        self.timer_tick_unit = unit;
        self
    }

    /// Build the engine. The returned `Outbound` receives chat and speech
    /// requests from the built-in effects.
    pub fn build(self) -> Result<(Engine, Outbound), EngineError> {
        let config = self.config;
        let clock = self.clock;

        let store = Arc::new(CustomVariableStore::new(Arc::clone(&clock)));
        let (sinks, outbound) = outbound_channels();

        let mut effects = EffectRegistry::new();
        register_builtins(&mut effects, &sinks, &store);
        for effect in self.effects {
            effects.register(effect);
        }

        let mut variables = VariableRegistry::with_builtins();
        for variable in self.variables {
            variables.register(variable);
        }

        let resolver = VariableResolver::new(Arc::new(variables), Arc::clone(&store))
            .with_max_depth(config.max_variable_depth);
        let runner = Arc::new(EffectRunner::new(Arc::new(effects), resolver));
        let queues = Arc::new(EffectQueues::with_default_interval(
            runner.clone(),
            Duration::from_millis(config.default_queue_interval_ms),
        ));
        let executor = Arc::new(EffectExecutor::new(runner, Arc::clone(&queues)));

        let cooldowns = Arc::new(CooldownTracker::new());
        let dispatcher = Arc::new(TriggerDispatcher::new(
            executor,
            Arc::clone(&cooldowns),
            Arc::clone(&clock),
            config.bot_name.clone(),
        ));
        let timers = TimerService::new(Arc::clone(&dispatcher)).with_tick_unit(self.timer_tick_unit);

        let engine = Engine {
            config,
            clock,
            store,
            cooldowns,
            queues,
            dispatcher,
            timers,
            tasks: Mutex::new(BackgroundTasks::default()),
        };
        engine.apply_definitions(self.definitions)?;

        tracing::info!(
            effects = engine.effects().len(),
            variables = engine.variables().len(),
            "Engine built"
        );
        Ok((engine, outbound))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Engine
// ─────────────────────────────────────────────────────────────────────────────

pub struct Engine {
    config: EngineConfig,
    clock: Arc<dyn Clock>,
    store: Arc<CustomVariableStore>,
    cooldowns: Arc<CooldownTracker>,
    queues: Arc<EffectQueues>,
    dispatcher: Arc<TriggerDispatcher>,
    timers: TimerService,
    tasks: Mutex<BackgroundTasks>,
}

impl Engine {
    pub fn builder(config: EngineConfig) -> EngineBuilder {
        EngineBuilder::new(config)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn store(&self) -> &Arc<CustomVariableStore> {
        &self.store
    }

    pub fn cooldowns(&self) -> &Arc<CooldownTracker> {
        &self.cooldowns
    }

    pub fn queues(&self) -> &Arc<EffectQueues> {
        &self.queues
    }

    pub fn executor(&self) -> &Arc<EffectExecutor> {
        self.dispatcher.executor()
    }

    pub fn dispatcher(&self) -> &Arc<TriggerDispatcher> {
        &self.dispatcher
    }

    pub fn timers(&self) -> &TimerService {
        &self.timers
    }

    pub fn effects(&self) -> &EffectRegistry {
        self.executor().runner().effects()
    }

    pub fn variables(&self) -> &VariableRegistry {
        self.executor().runner().resolver().registry()
    }

    /// Resolve a template read-only, e.g. for an editor preview.
    /// Side-effecting variables are rejected.
    pub fn preview(&self, template: &str, trigger: &TriggerContext) -> Result<String, EngineError> {
        let resolved = self.executor().runner().resolver().resolve_with_mode(
            template,
            trigger,
            ResolveMode::Preview,
        )?;
        Ok(resolved)
    }

    /// Validate and install a set of definitions, replacing the current
    /// commands, presets and timers. Running timers are restarted.
    pub fn apply_definitions(&self, definitions: Definitions) -> Result<(), EngineError> {
        definitions::validate(&definitions).map_err(|err| EngineError::validation(err.to_string()))?;

        for queue in &definitions.queues {
            self.queues.declare(queue);
        }
        self.dispatcher.set_commands(definitions.commands);
        self.dispatcher.set_presets(definitions.presets);
        self.timers.set_definitions(definitions.timers);

        if self.is_running() {
            self.timers.start();
        }
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Lifecycle
    // ─────────────────────────────────────────────────────────────────────────

    fn tasks(&self) -> MutexGuard<'_, BackgroundTasks> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_running(&self) -> bool {
        self.tasks().is_running()
    }

    /// Start the variable and cooldown sweepers and every active timer. Must be called
    /// from within a tokio runtime.
    pub fn start(&self) {
        let mut tasks = self.tasks();
        if tasks.is_running() {
            return;
        }
        let interval = Duration::from_secs(self.config.variable_sweep_interval_secs.max(1));
        tasks.variable_sweeper = Some(self.store.spawn_sweeper(interval));
        tasks.cooldown_sweeper = Some(
            self.cooldowns
                .spawn_sweeper(Arc::clone(&self.clock), interval),
        );
        drop(tasks);

        self.timers.start();
        tracing::info!("Engine started");
    }

    /// Hand a host task to the engine so `shutdown` aborts it
    pub fn attach(&self, handle: JoinHandle<()>) {
        self.tasks().attached.push(handle);
    }

    /// Stop timers and background tasks and discard every pending queue
    /// entry. In-flight entries run to completion.
    pub fn shutdown(&self) {
        self.timers.stop_all();
        self.tasks().abort_all();
        let discarded = self.queues.clear_all();
        tracing::info!(discarded, "Engine shut down");
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.tasks().abort_all();
    }
}
