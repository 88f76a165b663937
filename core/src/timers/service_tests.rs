//! Tests for TimerService
//!
//! Intervals are scaled to milliseconds so timers fire within the test.

use std::sync::Arc;
use std::time::Duration;

use cuebot_types::{EffectInstance, EffectList, TimerDefinition};
use tokio::sync::mpsc;

use super::{TimerAction, TimerService};
use crate::clock::ManualClock;
use crate::cooldowns::CooldownTracker;
use crate::custom_variables::CustomVariableStore;
use crate::dispatcher::TriggerDispatcher;
use crate::effects::{ChatMessage, EffectRegistry, outbound_channels, register_builtins};
use crate::executor::{EffectExecutor, EffectRunner};
use crate::queue::EffectQueues;
use crate::variables::{VariableRegistry, VariableResolver};

fn service() -> (TimerService, mpsc::Receiver<ChatMessage>) {
    let clock = Arc::new(ManualClock::starting_now());
    let store = Arc::new(CustomVariableStore::new(clock.clone()));
    let (sinks, outbound) = outbound_channels();

    let mut effects = EffectRegistry::new();
    register_builtins(&mut effects, &sinks, &store);

    let resolver = VariableResolver::new(Arc::new(VariableRegistry::with_builtins()), store);
    let runner = Arc::new(EffectRunner::new(Arc::new(effects), resolver));
    let queues = Arc::new(EffectQueues::new(runner.clone()));
    let executor = Arc::new(EffectExecutor::new(runner, queues));
    let dispatcher = Arc::new(TriggerDispatcher::new(
        executor,
        Arc::new(CooldownTracker::new()),
        clock,
        "cuebot",
    ));

    let service = TimerService::new(dispatcher).with_tick_unit(Duration::from_millis(1));
    (service, outbound.chat)
}

fn timer(id: &str, interval: u64, active: bool) -> TimerDefinition {
    TimerDefinition {
        id: id.to_string(),
        name: id.to_string(),
        interval_secs: interval,
        active,
        effects: EffectList::new(vec![
            EffectInstance::new("msg", "cuebot:chat").with_arg("message", format!("{id} by $user")),
        ]),
    }
}

async fn next_message(chat: &mut mpsc::Receiver<ChatMessage>) -> String {
    tokio::time::timeout(Duration::from_secs(2), chat.recv())
        .await
        .expect("timer did not fire")
        .expect("chat channel closed")
        .text
}

#[tokio::test]
async fn active_timer_fires_repeatedly() {
    let (service, mut chat) = service();
    service.set_definitions([timer("hydrate", 20, true)]);
    service.start();

    assert_eq!(next_message(&mut chat).await, "hydrate by cuebot");
    assert_eq!(next_message(&mut chat).await, "hydrate by cuebot");
    assert!(service.timer("hydrate").unwrap().running);
}

#[tokio::test]
async fn inactive_timer_is_not_started() {
    let (service, mut chat) = service();
    service.set_definitions([timer("idle", 10, false)]);
    service.start();

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(chat.try_recv().is_err());
    let status = service.timer("idle").unwrap();
    assert!(!status.active);
    assert!(!status.running);
}

#[tokio::test]
async fn disable_then_enable() {
    let (service, mut chat) = service();
    service.set_definitions([timer("t", 10, true)]);
    service.start();

    let status = service.apply("t", TimerAction::Disable).unwrap();
    assert!(!status.active);
    assert!(!status.running);

    tokio::time::sleep(Duration::from_millis(40)).await;
    while chat.try_recv().is_ok() {}
    tokio::time::sleep(Duration::from_millis(40)).await;
    assert!(chat.try_recv().is_err());

    let status = service.apply("t", TimerAction::Enable).unwrap();
    assert!(status.active);
    assert_eq!(next_message(&mut chat).await, "t by cuebot");
}

#[tokio::test]
async fn toggle_and_clear() {
    let (service, _chat) = service();
    service.set_definitions([timer("t", 1000, false)]);

    assert!(service.apply("t", TimerAction::Toggle).unwrap().active);
    assert!(!service.apply("t", TimerAction::Toggle).unwrap().active);

    // Clear keeps the enabled state and restarts an enabled countdown
    assert!(!service.apply("t", TimerAction::Clear).unwrap().running);
    service.apply("t", TimerAction::Enable).unwrap();
    let cleared = service.apply("t", TimerAction::Clear).unwrap();
    assert!(cleared.active);
    assert!(cleared.running);
}

#[tokio::test]
async fn unknown_timer_is_not_found() {
    let (service, _chat) = service();
    let err = service.apply("missing", TimerAction::Enable).unwrap_err();
    assert_eq!(err.status_code(), 404);
}

#[tokio::test]
async fn stop_all_halts_every_timer() {
    let (service, _chat) = service();
    service.set_definitions([timer("b", 1000, true), timer("a", 1000, true)]);
    service.start();
    assert!(service.timers().iter().all(|t| t.running));

    service.stop_all();
    tokio::task::yield_now().await;
    let ids: Vec<_> = service.timers().into_iter().map(|t| t.id).collect();
    assert_eq!(ids, vec!["a", "b"]);
    assert!(service.timers().iter().all(|t| !t.running));
}

#[test]
fn action_parsing() {
    assert_eq!("enable".parse::<TimerAction>().unwrap(), TimerAction::Enable);
    assert_eq!("Toggle".parse::<TimerAction>().unwrap(), TimerAction::Toggle);
    assert_eq!("CLEAR".parse::<TimerAction>().unwrap(), TimerAction::Clear);
    let err = "pause".parse::<TimerAction>().unwrap_err();
    assert_eq!(err.status_code(), 400);
}
