//! Transport-free request router
//!
//! Maps `(method, path, body)` onto engine operations and answers with a
//! status code and a JSON body, so an HTTP layer only has to translate.
//! Error bodies look like `{"status": "error", "message": "..."}`.
//!
//! ```text
//! GET  /effects                      GET  /commands/{system|custom}
//! POST /effects                      GET  /commands/{kind}/{id}
//! GET  /effects/{id}                 *    /commands/{kind}/{id}/run
//! GET  /effects/preset               GET  /custom-variables[/{name}]
//! *    /effects/preset/{id}          POST /custom-variables/{name}
//! *    /effects/preset/{id}/run      GET  /queues
//! GET  /variables                    any  /queues/{id}
//! GET  /timers[/{id}]                any  /queues/{id}/{pause|resume|toggle|clear}
//!                                    GET  /timers/{id}/{action}
//! ```
//!
//! `*` accepts GET and POST.

mod commands;
mod custom_variables;
mod effects;
mod queues;
mod request;
mod timers;

#[cfg(test)]
mod router_tests;

use std::sync::Arc;

use cuebot_types::CommandKind;

use crate::engine::Engine;
use crate::error::EngineError;

pub use request::{ApiRequest, ApiResponse, Method};

type ApiResult = Result<ApiResponse, EngineError>;

/// Path shape of a request, before the method is checked
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Route<'a> {
    Effects,
    Effect(&'a str),
    Presets,
    RunPreset { id: &'a str, sync: bool },
    Commands(CommandKind),
    Command(CommandKind, &'a str),
    RunCommand(CommandKind, &'a str),
    CustomVariables,
    CustomVariable(&'a str),
    Queues,
    Queue(&'a str),
    QueueAction(&'a str, &'a str),
    Timers,
    Timer(&'a str),
    TimerAction(&'a str, &'a str),
    Variables,
}

impl<'a> Route<'a> {
    fn parse(segments: &[&'a str]) -> Option<Self> {
        let route = match *segments {
            ["effects"] => Route::Effects,
            ["effects", "preset"] => Route::Presets,
            ["effects", "preset", id] => Route::RunPreset { id, sync: true },
            ["effects", "preset", id, "run"] => Route::RunPreset { id, sync: false },
            ["effects", id] => Route::Effect(id),
            ["commands", kind] => Route::Commands(command_kind(kind)?),
            ["commands", kind, id] => Route::Command(command_kind(kind)?, id),
            ["commands", kind, id, "run"] => Route::RunCommand(command_kind(kind)?, id),
            ["custom-variables"] => Route::CustomVariables,
            ["custom-variables", name] => Route::CustomVariable(name),
            ["queues"] => Route::Queues,
            ["queues", id] => Route::Queue(id),
            ["queues", id, action @ ("pause" | "resume" | "toggle" | "clear")] => {
                Route::QueueAction(id, action)
            }
            ["timers"] => Route::Timers,
            ["timers", id] => Route::Timer(id),
            ["timers", id, action] => Route::TimerAction(id, action),
            ["variables"] => Route::Variables,
            _ => return None,
        };
        Some(route)
    }

    fn allows(&self, method: Method) -> bool {
        match self {
            Route::Effects => matches!(method, Method::Get | Method::Post),
            Route::CustomVariable(_) => matches!(method, Method::Get | Method::Post),
            Route::RunPreset { .. } | Route::RunCommand(..) => {
                matches!(method, Method::Get | Method::Post)
            }
            Route::Queue(_) | Route::QueueAction(..) => true,
            _ => method == Method::Get,
        }
    }
}

fn command_kind(segment: &str) -> Option<CommandKind> {
    match segment {
        "system" => Some(CommandKind::System),
        "custom" => Some(CommandKind::Custom),
        _ => None,
    }
}

/// Reject an empty path parameter, e.g. `/queues//pause`
fn require<'a>(value: &'a str, name: &str) -> Result<&'a str, EngineError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(EngineError::validation(format!("No {name} provided")));
    }
    Ok(value)
}

// ─────────────────────────────────────────────────────────────────────────────
// Router
// ─────────────────────────────────────────────────────────────────────────────

pub struct Router {
    engine: Arc<Engine>,
}

impl Router {
    pub fn new(engine: Arc<Engine>) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &Arc<Engine> {
        &self.engine
    }

    pub async fn handle(&self, request: ApiRequest) -> ApiResponse {
        let path = request.path.trim_matches('/').to_string();
        let segments: Vec<&str> = path.split('/').collect();

        let Some(route) = Route::parse(&segments) else {
            tracing::debug!(method = %request.method, path = %request.path, "No such route");
            return ApiResponse::error(404, format!("Route {} not found", request.path));
        };
        if !route.allows(request.method) {
            return ApiResponse::error(
                405,
                format!("{} not allowed on {}", request.method, request.path),
            );
        }

        match self.dispatch(route, &request).await {
            Ok(response) => {
                tracing::debug!(
                    method = %request.method,
                    path = %request.path,
                    status = response.status,
                    "Request handled"
                );
                response
            }
            Err(err) => {
                let response = ApiResponse::from_error(&err);
                if response.status >= 500 {
                    tracing::error!(path = %request.path, error = %err, "Request failed");
                } else {
                    tracing::debug!(path = %request.path, error = %err, "Request rejected");
                }
                response
            }
        }
    }

    async fn dispatch(&self, route: Route<'_>, request: &ApiRequest) -> ApiResult {
        let engine = &self.engine;
        match route {
            Route::Effects if request.method == Method::Post => effects::run(engine, request).await,
            Route::Effects => effects::list(engine),
            Route::Effect(id) => effects::get(engine, require(id, "effectId")?),
            Route::Presets => effects::presets(engine),
            Route::RunPreset { id, sync } => {
                effects::run_preset(engine, require(id, "presetListId")?, request, sync).await
            }
            Route::Commands(kind) => commands::list(engine, kind),
            Route::Command(kind, id) => commands::get(engine, kind, require(id, "commandId")?),
            Route::RunCommand(kind, id) => {
                commands::run(engine, kind, require(id, "commandId")?, request).await
            }
            Route::CustomVariables => custom_variables::list(engine),
            Route::CustomVariable(name) if request.method == Method::Post => {
                custom_variables::set(engine, require(name, "variableName")?, request)
            }
            Route::CustomVariable(name) => {
                custom_variables::get(engine, require(name, "variableName")?)
            }
            Route::Queues => queues::list(engine),
            Route::Queue(id) => queues::get(engine, require(id, "queueId")?),
            Route::QueueAction(id, action) => {
                queues::apply(engine, require(id, "queueId")?, action)
            }
            Route::Timers => timers::list(engine),
            Route::Timer(id) => timers::get(engine, require(id, "timerId")?),
            Route::TimerAction(id, action) => {
                timers::apply(engine, require(id, "timerId")?, action)
            }
            Route::Variables => ApiResponse::json(engine.variables().catalog()),
        }
    }
}
