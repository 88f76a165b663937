//! Shared definition and configuration types for cuebot
//!
//! This crate contains serializable types that are shared between the engine
//! (cuebot-core), the CLI and the definition files on disk.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ─────────────────────────────────────────────────────────────────────────────
// Effects
// ─────────────────────────────────────────────────────────────────────────────

/// A single configured effect inside an effect list.
///
/// `args` is opaque to the engine: only string leaves are run through the
/// variable resolver before the effect's handler sees them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EffectInstance {
    pub id: String,

    /// Effect type id, e.g. `cuebot:chat`
    #[serde(rename = "type")]
    pub effect_type: String,

    /// Inactive instances stay in the list but are skipped
    #[serde(default = "default_true")]
    pub active: bool,

    /// Chance (0-100) that this effect runs. None = always.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percent_weight: Option<f64>,

    #[serde(default)]
    pub args: Map<String, Value>,
}

impl EffectInstance {
    pub fn new(id: impl Into<String>, effect_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            effect_type: effect_type.into(),
            active: true,
            percent_weight: None,
            args: Map::new(),
        }
    }

    /// Builder-style helper for setting a single argument
    pub fn with_arg(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.args.insert(key.to_string(), value.into());
        self
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.percent_weight = Some(weight);
        self
    }

    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }
}

/// Ordered sequence of effects executed as one logical unit.
/// Execution order is insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EffectList {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default)]
    pub list: Vec<EffectInstance>,
}

impl EffectList {
    pub fn new(list: Vec<EffectInstance>) -> Self {
        Self { id: None, list }
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    /// Iterate the instances that will be considered for execution
    pub fn active(&self) -> impl Iterator<Item = &EffectInstance> {
        self.list.iter().filter(|e| e.active)
    }
}

/// Named, reusable effect list invocable by id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresetList {
    pub id: String,
    pub name: String,

    /// Declared argument names, readable with `$presetListArg[name]`
    #[serde(default)]
    pub args: Vec<String>,

    #[serde(default)]
    pub effects: EffectList,
}

// ─────────────────────────────────────────────────────────────────────────────
// Commands
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandKind {
    System,
    #[default]
    Custom,
}

impl CommandKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandKind::System => "system",
            CommandKind::Custom => "custom",
        }
    }
}

/// Cooldown durations for a command. Zero means "no cooldown".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CooldownSettings {
    #[serde(default)]
    pub user_secs: u64,
    #[serde(default)]
    pub global_secs: u64,
}

impl CooldownSettings {
    pub fn new(user_secs: u64, global_secs: u64) -> Self {
        Self {
            user_secs,
            global_secs,
        }
    }

    /// True when neither scope has a cooldown
    pub fn is_disabled(&self) -> bool {
        self.user_secs == 0 && self.global_secs == 0
    }
}

/// Who may trigger a command. Empty `allowed_users` means everyone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommandRestrictions {
    #[serde(default)]
    pub allowed_users: Vec<String>,
}

impl CommandRestrictions {
    pub fn permits(&self, username: &str) -> bool {
        self.allowed_users.is_empty()
            || self
                .allowed_users
                .iter()
                .any(|u| u.eq_ignore_ascii_case(username))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandDefinition {
    pub id: String,

    /// Chat trigger, e.g. `!so`
    pub trigger: String,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub kind: CommandKind,

    #[serde(default = "default_true")]
    pub active: bool,

    #[serde(default)]
    pub cooldown: CooldownSettings,

    #[serde(default)]
    pub restrictions: CommandRestrictions,

    #[serde(default)]
    pub effects: EffectList,
}

// ─────────────────────────────────────────────────────────────────────────────
// Timers & Queues
// ─────────────────────────────────────────────────────────────────────────────

/// Effect list fired on a fixed interval
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimerDefinition {
    pub id: String,

    #[serde(default)]
    pub name: String,

    pub interval_secs: u64,

    #[serde(default = "default_true")]
    pub active: bool,

    #[serde(default)]
    pub effects: EffectList,
}

/// Explicitly declared queue (queues are otherwise created on first use)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueDefinition {
    pub id: String,

    /// Pause between consecutive entries
    #[serde(default)]
    pub interval_ms: u64,
}

/// Everything loaded from a definitions file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Definitions {
    #[serde(default, rename = "command")]
    pub commands: Vec<CommandDefinition>,

    #[serde(default, rename = "preset")]
    pub presets: Vec<PresetList>,

    #[serde(default, rename = "timer")]
    pub timers: Vec<TimerDefinition>,

    #[serde(default, rename = "queue")]
    pub queues: Vec<QueueDefinition>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Engine Config
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Nesting bound for variable expansion
    #[serde(default = "default_max_variable_depth")]
    pub max_variable_depth: usize,

    /// How often expired custom variables are swept
    #[serde(default = "default_sweep_interval")]
    pub variable_sweep_interval_secs: u64,

    /// Gap between queue entries for queues without their own interval
    #[serde(default)]
    pub default_queue_interval_ms: u64,

    /// TOML file with commands, presets, timers and queues
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub definitions_path: Option<String>,

    /// Triggering username for manual and API runs that don't name one
    #[serde(default = "default_bot_name")]
    pub bot_name: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_variable_depth: default_max_variable_depth(),
            variable_sweep_interval_secs: default_sweep_interval(),
            default_queue_interval_ms: 0,
            definitions_path: None,
            bot_name: default_bot_name(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Serde Helpers
// ═══════════════════════════════════════════════════════════════════════════

fn default_true() -> bool {
    true
}

fn default_max_variable_depth() -> usize {
    10
}

fn default_sweep_interval() -> u64 {
    60
}

fn default_bot_name() -> String {
    "cuebot".to_string()
}
