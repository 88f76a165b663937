//! Effect and preset list routes

use cuebot_types::{EffectInstance, EffectList};
use serde_json::{Map, Value, json};

use super::{ApiRequest, ApiResponse, ApiResult};
use crate::dispatcher::PresetDispatch;
use crate::engine::Engine;
use crate::error::EngineError;
use crate::executor::RunResult;
use crate::queue::QueueTicket;
use crate::trigger::{TriggerContext, TriggerKind};

pub(super) fn list(engine: &Engine) -> ApiResult {
    ApiResponse::json(engine.effects().definitions())
}

pub(super) fn get(engine: &Engine, id: &str) -> ApiResult {
    let definition = engine
        .effects()
        .definition(id)
        .ok_or_else(|| EngineError::not_found("effect", id))?;
    ApiResponse::json(definition)
}

pub(super) fn presets(engine: &Engine) -> ApiResult {
    let presets: Vec<_> = engine
        .dispatcher()
        .presets()
        .into_iter()
        .map(|p| json!({ "id": p.id, "name": p.name, "args": p.args }))
        .collect();
    Ok(ApiResponse::ok(Value::Array(presets)))
}

/// `POST /effects` with `{effects, username?, triggerData?}`
pub(super) async fn run(engine: &Engine, request: &ApiRequest) -> ApiResult {
    let list = effect_list(request.body.get("effects"))?;

    let metadata = request.body.pointer("/triggerData/metadata");
    let username = request
        .param("username")
        .or_else(|| {
            metadata
                .and_then(|m| m.get("username"))
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| engine.config().bot_name.clone());

    let mut context = TriggerContext::new(TriggerKind::Api, username);
    if let Some(event_data) = metadata.and_then(|m| m.get("eventData")) {
        context = context.with_event_data(event_data.clone());
    }
    if let Some(Value::Array(args)) = request.body.pointer("/triggerData/args") {
        context = context.with_args(args.iter().filter_map(Value::as_str));
    }

    let result = engine.dispatcher().run_ad_hoc(list, context).await?;
    completed(result)
}

/// Sync (`/effects/preset/{id}`) or async (`.../run`) preset run. Arguments
/// come from the body's `args` object, or the query string on GET.
pub(super) async fn run_preset(
    engine: &Engine,
    id: &str,
    request: &ApiRequest,
    sync: bool,
) -> ApiResult {
    let args = match request.body.get("args") {
        Some(Value::Object(args)) => args.clone(),
        _ => request
            .query
            .iter()
            .filter(|(key, _)| key.as_str() != "username")
            .map(|(key, value)| (key.clone(), Value::String(value.clone())))
            .collect::<Map<_, _>>(),
    };
    let username = request.param("username");

    match engine
        .dispatcher()
        .dispatch_preset(id, args, username.as_deref(), sync)
        .await?
    {
        PresetDispatch::Completed(result) => completed(result),
        PresetDispatch::Acknowledged(ticket) => Ok(acknowledged(&ticket)),
    }
}

/// Accepts either `{"list": [...]}` or a bare array of instances
fn effect_list(value: Option<&Value>) -> Result<EffectList, EngineError> {
    let list = match value {
        None | Some(Value::Null) => EffectList::default(),
        Some(Value::Array(items)) => EffectList::new(
            serde_json::from_value::<Vec<EffectInstance>>(Value::Array(items.clone()))
                .map_err(|err| EngineError::validation(format!("invalid effects: {err}")))?,
        ),
        Some(other) => serde_json::from_value(other.clone())
            .map_err(|err| EngineError::validation(format!("invalid effects: {err}")))?,
    };
    if list.is_empty() {
        return Err(EngineError::validation("No effects provided"));
    }
    Ok(list)
}

/// 200 with the run result. When an abort-on-error effect stopped the list
/// the abort error is answered instead, still carrying the partial result.
fn completed(result: RunResult) -> ApiResult {
    let abort = result.abort_error();
    let result = serde_json::to_value(&result)
        .map_err(|err| EngineError::EngineFault(format!("response serialization failed: {err}")))?;

    let Some(err) = abort else {
        return Ok(ApiResponse::success(json!({ "result": result })));
    };
    let mut response = ApiResponse::from_error(&err);
    if let Some(body) = response.body.as_object_mut() {
        body.insert("result".to_string(), result);
    }
    tracing::warn!(error = %err, "Synchronous run aborted");
    Ok(response)
}

pub(super) fn acknowledged(ticket: &QueueTicket) -> ApiResponse {
    ApiResponse::success(json!({
        "queue": ticket.queue,
        "entryId": ticket.entry_id,
        "position": ticket.position,
    }))
}
