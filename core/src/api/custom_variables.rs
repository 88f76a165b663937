use serde_json::{Map, Value, json};

use super::{ApiRequest, ApiResponse, ApiResult};
use crate::engine::Engine;
use crate::error::EngineError;

/// `{name: {value, expiresAt}}` for every live variable
pub(super) fn list(engine: &Engine) -> ApiResult {
    let mut variables = Map::new();
    for (name, variable) in engine.store().entries() {
        let variable = serde_json::to_value(variable).map_err(|err| {
            EngineError::EngineFault(format!("response serialization failed: {err}"))
        })?;
        variables.insert(name, variable);
    }
    Ok(ApiResponse::ok(Value::Object(variables)))
}

pub(super) fn get(engine: &Engine, name: &str) -> ApiResult {
    let value = engine
        .store()
        .get(name)
        .ok_or_else(|| EngineError::not_found("custom variable", name))?;
    Ok(ApiResponse::ok(value))
}

/// Body `{data, ttl?}`. String data holding JSON is stored parsed; `ttl` is
/// in seconds, 0 or absent for permanent.
pub(super) fn set(engine: &Engine, name: &str, request: &ApiRequest) -> ApiResult {
    let value = match request.body.get("data") {
        Some(Value::String(raw)) => {
            serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.clone()))
        }
        Some(other) => other.clone(),
        None => match request.query.get("data") {
            Some(raw) => Value::String(raw.clone()),
            None => return Err(EngineError::validation("No data provided")),
        },
    };

    let ttl = match request.param("ttl") {
        None => None,
        Some(raw) if raw.trim().is_empty() => None,
        Some(raw) => Some(raw.trim().parse::<u64>().map_err(|_| {
            EngineError::validation(format!("ttl must be a whole number of seconds, got '{raw}'"))
        })?),
    };

    engine.store().set(name, value, ttl);
    Ok(ApiResponse::created(json!({ "status": "success" })))
}
