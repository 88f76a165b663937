//! Engine configuration and process-level plumbing

mod background_tasks;
mod config;
mod error;

pub use background_tasks::BackgroundTasks;
pub use config::{EngineConfig, EngineConfigExt, APP_NAME};
pub use error::ConfigError;
