//! Tests for TriggerDispatcher
//!
//! Built on the real runner and queues with the built-in chat effect, so
//! every test observes what reached chat.

use std::sync::Arc;
use std::time::Duration;

use cuebot_types::{
    CommandDefinition, CommandKind, CommandRestrictions, CooldownSettings, EffectInstance,
    EffectList, PresetList, TimerDefinition,
};
use serde_json::{Map, json};
use tokio::sync::mpsc;

use super::{CommandDispatch, PresetDispatch, TriggerDispatcher};
use crate::clock::ManualClock;
use crate::cooldowns::{CooldownScope, CooldownTracker};
use crate::custom_variables::CustomVariableStore;
use crate::effects::{ChatMessage, EffectRegistry, outbound_channels, register_builtins};
use crate::executor::{EffectExecutor, EffectRunner};
use crate::queue::EffectQueues;
use crate::trigger::{TriggerContext, TriggerKind};
use crate::variables::{VariableRegistry, VariableResolver};

struct Harness {
    dispatcher: TriggerDispatcher,
    clock: Arc<ManualClock>,
    chat: mpsc::Receiver<ChatMessage>,
}

fn harness() -> Harness {
    let clock = Arc::new(ManualClock::starting_now());
    let store = Arc::new(CustomVariableStore::new(clock.clone()));
    let (sinks, outbound) = outbound_channels();

    let mut effects = EffectRegistry::new();
    register_builtins(&mut effects, &sinks, &store);

    let resolver = VariableResolver::new(Arc::new(VariableRegistry::with_builtins()), store);
    let runner = Arc::new(EffectRunner::new(Arc::new(effects), resolver));
    let queues = Arc::new(EffectQueues::new(runner.clone()));
    let executor = Arc::new(EffectExecutor::new(runner, queues));

    let dispatcher = TriggerDispatcher::new(
        executor,
        Arc::new(CooldownTracker::new()),
        clock.clone(),
        "cuebot",
    );
    dispatcher.set_commands([shoutout(), mod_only()]);
    dispatcher.set_presets([greeting()]);

    Harness {
        dispatcher,
        clock,
        chat: outbound.chat,
    }
}

fn say(id: &str, message: &str) -> EffectInstance {
    EffectInstance::new(id, "cuebot:chat").with_arg("message", message)
}

fn shoutout() -> CommandDefinition {
    CommandDefinition {
        id: "so".to_string(),
        trigger: "!so".to_string(),
        name: "Shoutout".to_string(),
        kind: CommandKind::Custom,
        active: true,
        cooldown: CooldownSettings::new(30, 0),
        restrictions: CommandRestrictions::default(),
        effects: EffectList::new(vec![say("msg", "Go follow $target! (from $user)")]),
    }
}

fn mod_only() -> CommandDefinition {
    CommandDefinition {
        id: "reset".to_string(),
        trigger: "!reset".to_string(),
        name: "Reset".to_string(),
        kind: CommandKind::System,
        active: true,
        cooldown: CooldownSettings::new(0, 60),
        restrictions: CommandRestrictions {
            allowed_users: vec!["moddy".to_string()],
        },
        effects: EffectList::new(vec![say("msg", "reset by $user")]),
    }
}

fn greeting() -> PresetList {
    PresetList {
        id: "greet".to_string(),
        name: "Greeting".to_string(),
        args: vec!["who".to_string()],
        effects: EffectList::new(vec![
            EffectInstance::new("out", "cuebot:effect-output")
                .with_arg("name", "greeting")
                .with_arg("value", "hello $presetListArg[who]"),
            say("msg", "&greeting"),
        ]),
    }
}

fn user(name: &str, args: &[&str]) -> TriggerContext {
    TriggerContext::new(TriggerKind::Command, name).with_args(args.iter().copied())
}

async fn started(dispatch: CommandDispatch) {
    match dispatch {
        CommandDispatch::Started(ticket) => {
            ticket.outcome().await.unwrap();
        }
        other => panic!("expected Started, got {other:?}"),
    }
}

#[tokio::test]
async fn shoutout_cooldown_is_per_user() {
    let mut h = harness();

    started(h.dispatcher.dispatch_command("so", user("alice", &["@carol"])).await.unwrap()).await;
    h.clock.advance(Duration::from_secs(2));
    started(h.dispatcher.dispatch_command("so", user("bob", &["dave"])).await.unwrap()).await;
    h.clock.advance(Duration::from_secs(3));

    match h.dispatcher.dispatch_command("so", user("alice", &["eve"])).await.unwrap() {
        CommandDispatch::OnCooldown {
            scope,
            remaining_secs,
        } => {
            assert_eq!(scope, CooldownScope::User);
            assert_eq!(remaining_secs, 25);
        }
        other => panic!("expected cooldown, got {other:?}"),
    }

    assert_eq!(h.chat.recv().await.unwrap().text, "Go follow carol! (from alice)");
    assert_eq!(h.chat.recv().await.unwrap().text, "Go follow dave! (from bob)");
    assert!(h.chat.try_recv().is_err());
}

#[tokio::test]
async fn cooldown_converts_to_error() {
    let h = harness();
    started(h.dispatcher.dispatch_command("so", user("alice", &[])).await.unwrap()).await;

    let err = h
        .dispatcher
        .dispatch_command("so", user("alice", &[]))
        .await
        .unwrap()
        .into_result("so")
        .unwrap_err();
    assert_eq!(err.status_code(), 429);
}

#[tokio::test]
async fn denied_user_does_not_consume_cooldown() {
    let mut h = harness();

    let err = h
        .dispatcher
        .dispatch_command("reset", user("viewer", &[]))
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), 400);

    // The 60s global window was not started by the denied attempt
    started(h.dispatcher.dispatch_command("reset", user("Moddy", &[])).await.unwrap()).await;
    assert_eq!(h.chat.recv().await.unwrap().text, "reset by Moddy");
}

#[tokio::test]
async fn unknown_and_disabled_commands() {
    let h = harness();
    let err = h.dispatcher.dispatch_command("nope", user("a", &[])).await.unwrap_err();
    assert_eq!(err.status_code(), 404);

    let mut disabled = shoutout();
    disabled.active = false;
    h.dispatcher.upsert_command(disabled);
    let err = h.dispatcher.dispatch_command("so", user("a", &[])).await.unwrap_err();
    assert_eq!(err.status_code(), 400);
}

#[tokio::test]
async fn same_command_serializes_on_its_queue() {
    let mut h = harness();
    let mut no_cooldown = shoutout();
    no_cooldown.cooldown = CooldownSettings::default();
    no_cooldown.effects = EffectList::new(vec![
        say("first", "$user one"),
        EffectInstance::new("pause", "cuebot:delay")
            .with_arg("delay", 0.02),
        say("second", "$user two"),
    ]);
    h.dispatcher.upsert_command(no_cooldown);

    let a = h.dispatcher.dispatch_command("so", user("a", &[])).await.unwrap();
    let b = h.dispatcher.dispatch_command("so", user("b", &[])).await.unwrap();
    started(a).await;
    started(b).await;

    let mut texts = Vec::new();
    while let Ok(msg) = h.chat.try_recv() {
        texts.push(msg.text);
    }
    assert_eq!(texts, vec!["a one", "a two", "b one", "b two"]);
}

#[tokio::test]
async fn chat_message_matches_trigger() {
    let mut h = harness();

    let dispatch = h.dispatcher.dispatch_chat("alice", "!SO @bob").await.unwrap().unwrap();
    started(dispatch).await;
    assert_eq!(h.chat.recv().await.unwrap().text, "Go follow bob! (from alice)");

    assert!(h.dispatcher.dispatch_chat("alice", "just chatting").await.is_none());
    assert!(h.dispatcher.dispatch_chat("alice", "   ").await.is_none());
}

#[tokio::test]
async fn sync_preset_returns_result() {
    let mut h = harness();
    let mut args = Map::new();
    args.insert("who".to_string(), json!("chat"));

    let dispatch = h
        .dispatcher
        .dispatch_preset("greet", args, None, true)
        .await
        .unwrap();
    let PresetDispatch::Completed(result) = dispatch else {
        panic!("sync preset should complete inline");
    };
    assert_eq!(result.succeeded(), 2);
    assert_eq!(result.outputs.get("greeting"), Some(&json!("hello chat")));
    assert_eq!(h.chat.recv().await.unwrap().text, "hello chat");
}

#[tokio::test]
async fn async_preset_is_acknowledged() {
    let h = harness();
    let dispatch = h
        .dispatcher
        .dispatch_preset("greet", Map::new(), Some("alice"), false)
        .await
        .unwrap();
    let PresetDispatch::Acknowledged(ticket) = dispatch else {
        panic!("async preset should be queued");
    };
    assert_eq!(ticket.queue, "greet");
    assert!(ticket.outcome().await.is_some());

    let err = h
        .dispatcher
        .dispatch_preset("missing", Map::new(), None, false)
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), 404);
}

#[tokio::test]
async fn timer_runs_on_its_queue() {
    let mut h = harness();
    let timer = TimerDefinition {
        id: "hydrate".to_string(),
        name: "Hydrate".to_string(),
        interval_secs: 600,
        active: true,
        effects: EffectList::new(vec![say("msg", "drink water ($triggerType)")]),
    };

    let ticket = h.dispatcher.dispatch_timer(&timer).await.unwrap();
    assert_eq!(ticket.queue, "hydrate");
    ticket.outcome().await.unwrap();
    assert_eq!(h.chat.recv().await.unwrap().text, "drink water (timer)");
}

#[tokio::test]
async fn ad_hoc_requires_effects() {
    let h = harness();
    let ctx = TriggerContext::new(TriggerKind::Api, "cuebot");

    let err = h
        .dispatcher
        .run_ad_hoc(EffectList::default(), ctx.clone())
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), 400);

    let result = h
        .dispatcher
        .run_ad_hoc(EffectList::new(vec![say("m", "hi")]), ctx)
        .await
        .unwrap();
    assert_eq!(result.succeeded(), 1);
}

#[test]
fn listings_are_sorted_and_filtered() {
    let h = harness();
    let all: Vec<_> = h.dispatcher.commands(None).into_iter().map(|c| c.trigger).collect();
    assert_eq!(all, vec!["!reset", "!so"]);

    let system = h.dispatcher.commands(Some(CommandKind::System));
    assert_eq!(system.len(), 1);
    assert_eq!(system[0].id, "reset");

    assert_eq!(h.dispatcher.presets().len(), 1);
    assert!(h.dispatcher.preset("greet").is_some());
}
