pub mod api;
pub mod clock;
pub mod context;
pub mod cooldowns;
pub mod custom_variables;
pub mod definitions;
pub mod dispatcher;
pub mod effects;
pub mod engine;
pub mod error;
pub mod executor;
pub mod queue;
pub mod timers;
pub mod trigger;
pub mod variables;

// Re-exports for convenience
pub use api::{ApiRequest, ApiResponse, Method, Router};
pub use clock::{Clock, ManualClock, SystemClock};
pub use context::{BackgroundTasks, ConfigError, EngineConfig, EngineConfigExt};
pub use cooldowns::{CooldownOutcome, CooldownScope, CooldownTracker};
pub use custom_variables::{CustomVariable, CustomVariableStore};
pub use definitions::{DefinitionError, load_definitions_from_dir, load_definitions_from_file};
pub use dispatcher::{CommandDispatch, PresetDispatch, TriggerDispatcher};
pub use effects::{
    ChatMessage, EffectDefinition, EffectError, EffectEvent, EffectOutcome, EffectRegistry,
    EffectType, Outbound, SpeechRequest,
};
pub use engine::{Engine, EngineBuilder};
pub use error::EngineError;
pub use executor::{EffectExecutor, EffectRunner, EffectStatus, Execution, ExecutionMode, RunResult};
pub use queue::{EffectQueues, QueueState, QueueTicket};
pub use timers::{TimerAction, TimerService, TimerStatus};
pub use trigger::{TriggerContext, TriggerKind, TriggerMetadata};
pub use variables::{ResolveMode, VariableError, VariableRegistry, VariableResolver};

pub use cuebot_types::{
    CommandDefinition, CommandKind, CooldownSettings, Definitions, EffectInstance, EffectList,
    PresetList, QueueDefinition, TimerDefinition,
};
