use cuebot_types::{CommandDefinition, CommandKind};
use serde_json::Value;

use super::effects::acknowledged;
use super::{ApiRequest, ApiResponse, ApiResult};
use crate::engine::Engine;
use crate::error::EngineError;
use crate::trigger::{TriggerContext, TriggerKind};

fn kind_name(kind: CommandKind) -> &'static str {
    match kind {
        CommandKind::System => "system command",
        CommandKind::Custom => "custom command",
    }
}

fn find(engine: &Engine, kind: CommandKind, id: &str) -> Result<CommandDefinition, EngineError> {
    engine
        .dispatcher()
        .command(id)
        .filter(|c| c.kind == kind)
        .ok_or_else(|| EngineError::not_found(kind_name(kind), id))
}

pub(super) fn list(engine: &Engine, kind: CommandKind) -> ApiResult {
    ApiResponse::json(engine.dispatcher().commands(Some(kind)))
}

pub(super) fn get(engine: &Engine, kind: CommandKind, id: &str) -> ApiResult {
    ApiResponse::json(find(engine, kind, id)?)
}

/// Cooldown-gated run. `args` is a JSON array or a whitespace-separated
/// string; `username` defaults to the bot.
pub(super) async fn run(
    engine: &Engine,
    kind: CommandKind,
    id: &str,
    request: &ApiRequest,
) -> ApiResult {
    let command = find(engine, kind, id)?;

    let args: Vec<String> = match request.body.get("args") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        _ => request
            .param("args")
            .map(|raw| raw.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default(),
    };
    let username = request
        .param("username")
        .unwrap_or_else(|| engine.config().bot_name.clone());

    let context = TriggerContext::new(TriggerKind::Command, username).with_args(args);
    let ticket = engine
        .dispatcher()
        .dispatch_command(&command.id, context)
        .await?
        .into_result(&command.id)?;
    Ok(acknowledged(&ticket))
}
