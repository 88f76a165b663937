//! Tests for the request router, driven through a full engine

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use cuebot_types::EngineConfig;
use serde_json::json;
use tokio::sync::mpsc;

use super::{ApiRequest, Method, Router};
use crate::clock::ManualClock;
use crate::definitions::parse_definitions;
use crate::effects::{ChatMessage, EffectDefinition, EffectError, EffectEvent, EffectOutcome, EffectType};
use crate::engine::Engine;

const DEFINITIONS: &str = r#"
[[command]]
id = "so"
trigger = "!so"
name = "Shoutout"
kind = "custom"
cooldown = { user_secs = 30 }

[[command.effects.list]]
id = "msg"
type = "cuebot:chat"
args = { message = "Go follow $target!" }

[[command]]
id = "uptime"
trigger = "!uptime"
kind = "system"

[[preset]]
id = "greet"
name = "Greeting"
args = ["who"]

[[preset.effects.list]]
id = "out"
type = "cuebot:effect-output"
args = { name = "greeting", value = "hello $presetListArg[who]" }

[[preset.effects.list]]
id = "say"
type = "cuebot:chat"
args = { message = "&greeting" }

[[timer]]
id = "hydrate"
name = "Hydrate"
interval_secs = 600

[[queue]]
id = "alerts"
interval_ms = 500
"#;

struct Harness {
    router: Router,
    clock: Arc<ManualClock>,
    chat: mpsc::Receiver<ChatMessage>,
}

fn harness() -> Harness {
    let clock = Arc::new(ManualClock::starting_now());
    let definitions = parse_definitions(DEFINITIONS, Path::new("router.toml")).unwrap();
    let (engine, outbound) = Engine::builder(EngineConfig::default())
        .with_definitions(definitions)
        .with_clock(clock.clone())
        .build()
        .unwrap();

    Harness {
        router: Router::new(Arc::new(engine)),
        clock,
        chat: outbound.chat,
    }
}

struct Explode(EffectDefinition);

#[async_trait]
impl EffectType for Explode {
    fn definition(&self) -> &EffectDefinition {
        &self.0
    }

    async fn trigger(&self, _event: EffectEvent) -> Result<EffectOutcome, EffectError> {
        Err(EffectError::Failed("boom".to_string()))
    }
}

async fn next_chat(chat: &mut mpsc::Receiver<ChatMessage>) -> String {
    tokio::time::timeout(Duration::from_secs(2), chat.recv())
        .await
        .unwrap()
        .unwrap()
        .text
}

#[tokio::test]
async fn effect_catalogue() {
    let h = harness();

    let all = h.router.handle(ApiRequest::get("/effects")).await;
    assert_eq!(all.status, 200);
    let ids: Vec<_> = all.body.as_array().unwrap().iter().map(|d| d["id"].clone()).collect();
    assert!(ids.contains(&json!("cuebot:chat")));

    let one = h.router.handle(ApiRequest::get("/effects/cuebot:delay")).await;
    assert_eq!(one.status, 200);
    assert_eq!(one.body["name"], "Delay");

    let missing = h.router.handle(ApiRequest::get("/effects/nope")).await;
    assert_eq!(missing.status, 404);
    assert_eq!(missing.body["status"], "error");
}

#[tokio::test]
async fn ad_hoc_effects() {
    let mut h = harness();

    let empty = h.router.handle(ApiRequest::post("/effects", json!({}))).await;
    assert_eq!(empty.status, 400);
    assert_eq!(empty.body["message"], "No effects provided");

    let body = json!({
        "username": "alice",
        "effects": { "list": [
            { "id": "m", "type": "cuebot:chat", "args": { "message": "hi $user ($arg[1])" } }
        ]},
        "triggerData": { "args": ["first"] }
    });
    let response = h.router.handle(ApiRequest::post("/effects", body)).await;
    assert_eq!(response.status, 200);
    assert_eq!(response.body["status"], "success");
    assert_eq!(next_chat(&mut h.chat).await, "hi alice (first)");
}

#[tokio::test]
async fn aborted_sync_run_keeps_partial_result() {
    let (engine, _outbound) = Engine::builder(EngineConfig::default())
        .with_effect(Arc::new(Explode(
            EffectDefinition::new("test:explode", "Explode", "").aborts_list_on_error(),
        )))
        .build()
        .unwrap();
    let router = Router::new(Arc::new(engine));

    let body = json!({ "effects": [
        { "id": "a", "type": "cuebot:chat", "args": { "message": "first" } },
        { "id": "b", "type": "test:explode" },
        { "id": "c", "type": "cuebot:chat", "args": { "message": "third" } }
    ]});
    let response = router.handle(ApiRequest::post("/effects", body)).await;

    assert_eq!(response.status, 500);
    assert_eq!(response.body["status"], "error");
    assert_eq!(response.body["message"], "effect 'b' failed: boom");
    let effects = &response.body["result"]["effects"];
    assert_eq!(effects[0]["effectId"], "a");
    assert_eq!(effects[0]["status"], "success");
    assert_eq!(effects[1]["status"], "failed");
    assert_eq!(effects[2]["status"], "skipped");
    assert_eq!(response.body["result"]["aborted"], true);
}

#[tokio::test]
async fn presets_run_sync_and_async() {
    let mut h = harness();

    let listed = h.router.handle(ApiRequest::get("/effects/preset")).await;
    assert_eq!(listed.body, json!([{ "id": "greet", "name": "Greeting", "args": ["who"] }]));

    let sync = h.router.handle(ApiRequest::get("/effects/preset/greet?who=chat")).await;
    assert_eq!(sync.status, 200);
    assert_eq!(sync.body["result"]["outputs"]["greeting"], "hello chat");
    assert_eq!(next_chat(&mut h.chat).await, "hello chat");

    let queued = h
        .router
        .handle(ApiRequest::post("/effects/preset/greet/run", json!({ "args": { "who": "all" } })))
        .await;
    assert_eq!(queued.status, 200);
    assert_eq!(queued.body["queue"], "greet");
    assert_eq!(next_chat(&mut h.chat).await, "hello all");

    let unknown = h.router.handle(ApiRequest::get("/effects/preset/nope/run")).await;
    assert_eq!(unknown.status, 404);
}

#[tokio::test]
async fn command_runs_are_cooldown_gated() {
    let mut h = harness();
    let run = || ApiRequest::post("/commands/custom/so/run", json!({ "username": "alice", "args": ["@bob"] }));

    assert_eq!(h.router.handle(run()).await.status, 200);
    assert_eq!(next_chat(&mut h.chat).await, "Go follow bob!");

    h.clock.advance(Duration::from_secs(10));
    let blocked = h.router.handle(run()).await;
    assert_eq!(blocked.status, 429);
    assert_eq!(blocked.body["remainingSecs"], 20);

    h.clock.advance(Duration::from_secs(20));
    assert_eq!(h.router.handle(run()).await.status, 200);
}

#[tokio::test]
async fn command_listings_respect_kind() {
    let h = harness();

    let custom = h.router.handle(ApiRequest::get("/commands/custom")).await;
    assert_eq!(custom.body.as_array().unwrap().len(), 1);

    let system = h.router.handle(ApiRequest::get("/commands/system/uptime")).await;
    assert_eq!(system.status, 200);
    assert_eq!(system.body["trigger"], "!uptime");

    let wrong_kind = h.router.handle(ApiRequest::get("/commands/system/so")).await;
    assert_eq!(wrong_kind.status, 404);

    let bad_kind = h.router.handle(ApiRequest::get("/commands/other")).await;
    assert_eq!(bad_kind.status, 404);
}

#[tokio::test]
async fn custom_variables_round_trip() {
    let h = harness();

    let set = h
        .router
        .handle(ApiRequest::post("/custom-variables/score", json!({ "data": "42", "ttl": 0 })))
        .await;
    assert_eq!(set.status, 201);

    let get = h.router.handle(ApiRequest::get("/custom-variables/score")).await;
    assert_eq!(get.body, json!(42));

    let all = h.router.handle(ApiRequest::get("/custom-variables")).await;
    assert_eq!(all.body["score"]["value"], 42);

    let missing = h.router.handle(ApiRequest::get("/custom-variables/none")).await;
    assert_eq!(missing.status, 404);

    let no_data = h.router.handle(ApiRequest::post("/custom-variables/x", json!({}))).await;
    assert_eq!(no_data.status, 400);
}

#[tokio::test]
async fn queue_control_surface() {
    let h = harness();

    let state = h.router.handle(ApiRequest::get("/queues/alerts")).await;
    assert_eq!(state.status, 200);
    assert_eq!(state.body["intervalMs"], 500);

    let paused = h.router.handle(ApiRequest::post("/queues/alerts/pause", json!(null))).await;
    assert_eq!(paused.body["paused"], true);
    let toggled = h.router.handle(ApiRequest::get("/queues/alerts/toggle")).await;
    assert_eq!(toggled.body["paused"], false);
    let cleared = h.router.handle(ApiRequest::get("/queues/alerts/clear")).await;
    assert_eq!(cleared.body["pendingCount"], 0);
    let resumed = h.router.handle(ApiRequest::new(Method::Put, "/queues/alerts/resume")).await;
    assert_eq!(resumed.body["paused"], false);
    let removed = h.router.handle(ApiRequest::new(Method::Delete, "/queues/alerts")).await;
    assert_eq!(removed.status, 200);

    assert_eq!(h.router.handle(ApiRequest::get("/queues/ghost")).await.status, 404);
    assert_eq!(h.router.handle(ApiRequest::get("/queues/ghost/pause")).await.status, 404);
    assert_eq!(h.router.handle(ApiRequest::get("/queues//pause")).await.status, 400);

    // Inspecting an unknown queue does not create it
    let listed = h.router.handle(ApiRequest::get("/queues")).await;
    let ids: Vec<_> = listed.body.as_array().unwrap().iter().map(|q| q["id"].clone()).collect();
    assert_eq!(ids, vec![json!("alerts")]);
}

#[tokio::test]
async fn timer_routes() {
    let h = harness();

    let listed = h.router.handle(ApiRequest::get("/timers")).await;
    assert_eq!(listed.body[0]["id"], "hydrate");

    let disabled = h.router.handle(ApiRequest::get("/timers/hydrate/disable")).await;
    assert_eq!(disabled.status, 200);
    assert_eq!(disabled.body["active"], false);

    assert_eq!(h.router.handle(ApiRequest::get("/timers/hydrate/bogus")).await.status, 400);
    assert_eq!(h.router.handle(ApiRequest::get("/timers/nope/enable")).await.status, 404);
    assert_eq!(h.router.handle(ApiRequest::get("/timers/nope")).await.status, 404);
}

#[tokio::test]
async fn variable_catalogue_lists_spoofed_alias() {
    let h = harness();
    let response = h.router.handle(ApiRequest::get("/variables")).await;
    let alias = response
        .body
        .as_array()
        .unwrap()
        .iter()
        .find(|entry| entry["handle"] == "&name")
        .cloned()
        .unwrap();
    assert_eq!(alias["definition"]["spoof"], true);
}

#[tokio::test]
async fn unknown_routes_and_methods() {
    let h = harness();
    assert_eq!(h.router.handle(ApiRequest::get("/viewers")).await.status, 404);
    assert_eq!(h.router.handle(ApiRequest::get("/")).await.status, 404);

    let wrong = h.router.handle(ApiRequest::new(Method::Delete, "/effects")).await;
    assert_eq!(wrong.status, 405);
}
