use std::path::{Path, PathBuf};
use std::sync::Arc;

use cuebot_core::context::{APP_NAME, EngineConfigExt};
use cuebot_core::definitions::{DefinitionError, load_definitions_from_dir, load_definitions_from_file};
use cuebot_core::{Definitions, Engine, EngineConfig, Outbound, Router};

/// Holds all shared state for the CLI.
/// The engine does the work; this only wires it to the terminal.
pub struct CliContext {
    pub config: EngineConfig,
    pub engine: Arc<Engine>,
    pub router: Router,
    /// File or directory the definitions were loaded from
    pub definitions_path: PathBuf,
}

impl CliContext {
    /// Load config and definitions, build the engine and start it.
    /// Must be called from within the tokio runtime.
    pub fn new(definitions_override: Option<PathBuf>) -> Result<Self, String> {
        let config = EngineConfig::load();
        let definitions_path = definitions_override
            .or_else(|| config.definitions_path.as_ref().map(PathBuf::from))
            .unwrap_or_else(default_definitions_dir);

        let definitions = load_definitions(&definitions_path).map_err(|e| e.to_string())?;
        let (engine, outbound) = Engine::builder(config.clone())
            .with_definitions(definitions)
            .build()
            .map_err(|e| e.to_string())?;
        let engine = Arc::new(engine);

        attach_outbound(&engine, outbound);
        engine.start();

        Ok(Self {
            config,
            router: Router::new(Arc::clone(&engine)),
            engine,
            definitions_path,
        })
    }

    /// Re-read the definitions and swap them into the running engine
    pub fn reload(&self) -> Result<Definitions, String> {
        let definitions = load_definitions(&self.definitions_path).map_err(|e| e.to_string())?;
        self.engine
            .apply_definitions(definitions.clone())
            .map_err(|e| e.to_string())?;
        tracing::info!(path = %self.definitions_path.display(), "Definitions reloaded");
        Ok(definitions)
    }
}

fn default_definitions_dir() -> PathBuf {
    dirs::config_dir()
        .map(|dir| dir.join(APP_NAME).join("definitions"))
        .unwrap_or_else(|| PathBuf::from("definitions"))
}

pub fn load_definitions(path: &Path) -> Result<Definitions, DefinitionError> {
    if path.is_file() {
        load_definitions_from_file(path)
    } else {
        load_definitions_from_dir(path)
    }
}

/// Print chat messages and speech requests as the platform layer would
/// deliver them. Speech completes as soon as it is printed.
fn attach_outbound(engine: &Engine, outbound: Outbound) {
    let Outbound {
        mut chat,
        mut speech,
    } = outbound;

    engine.attach(tokio::spawn(async move {
        while let Some(message) = chat.recv().await {
            match &message.whisper_to {
                Some(user) => println!("[whisper to {user}] {}", message.text),
                None => println!("[chat] {}", message.text),
            }
        }
    }));

    engine.attach(tokio::spawn(async move {
        while let Some(request) = speech.recv().await {
            let voice = request.voice_id.as_deref().unwrap_or("default");
            println!("[tts:{voice}] {}", request.text);
            let _ = request.done.send(());
        }
    }));
}
