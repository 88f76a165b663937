//! Definition files
//!
//! Commands, preset lists, timers and queues are authored in TOML:
//!
//! ```toml
//! [[command]]
//! id = "so"
//! trigger = "!so"
//! cooldown = { user_secs = 30 }
//!
//! [[command.effects.list]]
//! id = "msg"
//! type = "cuebot:chat"
//! args = { message = "Go follow $target!" }
//! ```

mod error;
mod loader;

pub use error::DefinitionError;
pub use loader::{load_definitions_from_dir, load_definitions_from_file, parse_definitions, validate};
