use super::{ApiResponse, ApiResult};
use crate::engine::Engine;
use crate::error::EngineError;

pub(super) fn list(engine: &Engine) -> ApiResult {
    ApiResponse::json(engine.queues().list())
}

pub(super) fn get(engine: &Engine, id: &str) -> ApiResult {
    let state = engine
        .queues()
        .get(id)
        .ok_or_else(|| EngineError::not_found("queue", id))?;
    ApiResponse::json(state)
}

/// Pause, resume, toggle or clear a queue that already exists
pub(super) fn apply(engine: &Engine, id: &str, action: &str) -> ApiResult {
    let queues = engine.queues();
    if !queues.contains(id) {
        return Err(EngineError::not_found("queue", id));
    }

    let state = match action {
        "pause" => queues.pause(id),
        "resume" => queues.resume(id),
        "toggle" => queues.toggle(id),
        "clear" => {
            queues.clear(id);
            queues.state(id)
        }
        other => return Err(EngineError::validation(format!("unknown queue action '{other}'"))),
    };
    ApiResponse::json(state)
}
