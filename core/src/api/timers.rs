use super::{ApiResponse, ApiResult};
use crate::engine::Engine;
use crate::error::EngineError;
use crate::timers::TimerAction;

pub(super) fn list(engine: &Engine) -> ApiResult {
    ApiResponse::json(engine.timers().timers())
}

pub(super) fn get(engine: &Engine, id: &str) -> ApiResult {
    let status = engine
        .timers()
        .timer(id)
        .ok_or_else(|| EngineError::not_found("timer", id))?;
    ApiResponse::json(status)
}

pub(super) fn apply(engine: &Engine, id: &str, action: &str) -> ApiResult {
    let action: TimerAction = action.parse()?;
    ApiResponse::json(engine.timers().apply(id, action)?)
}
