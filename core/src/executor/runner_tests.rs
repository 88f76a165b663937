//! Tests for EffectRunner and EffectExecutor

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use cuebot_types::{EffectInstance, EffectList};
use serde_json::{Value, json};
use tokio::sync::oneshot;

use super::{EffectExecutor, EffectRunner, EffectStatus, Execution, ExecutionMode, SkipReason};
use crate::clock::ManualClock;
use crate::custom_variables::CustomVariableStore;
use crate::effects::builtin::{EffectOutputEffect, StopEffectExecution};
use crate::effects::{
    EffectDefinition, EffectError, EffectEvent, EffectOutcome, EffectRegistry, EffectType,
};
use crate::queue::EffectQueues;
use crate::trigger::{TriggerContext, TriggerKind};
use crate::variables::{VariableRegistry, VariableResolver};

type Log = Arc<Mutex<Vec<(String, Value)>>>;

/// Logs `(instance id, resolved "value" arg)`
struct Record {
    definition: EffectDefinition,
    log: Log,
}

#[async_trait]
impl EffectType for Record {
    fn definition(&self) -> &EffectDefinition {
        &self.definition
    }

    async fn trigger(&self, event: EffectEvent) -> Result<EffectOutcome, EffectError> {
        let value = event.arg("value").cloned().unwrap_or(Value::Null);
        self.log.lock().unwrap().push((event.effect.id.clone(), value));
        Ok(EffectOutcome::done())
    }
}

struct Fail(EffectDefinition);

#[async_trait]
impl EffectType for Fail {
    fn definition(&self) -> &EffectDefinition {
        &self.0
    }

    async fn trigger(&self, _event: EffectEvent) -> Result<EffectOutcome, EffectError> {
        Err(EffectError::Failed("boom".to_string()))
    }
}

/// Completes after a short sleep and sets `finished`
struct Slow {
    definition: EffectDefinition,
    finished: Arc<AtomicBool>,
}

#[async_trait]
impl EffectType for Slow {
    fn definition(&self) -> &EffectDefinition {
        &self.definition
    }

    async fn trigger(&self, _event: EffectEvent) -> Result<EffectOutcome, EffectError> {
        let (done, completion) = oneshot::channel();
        let finished = Arc::clone(&self.finished);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(40)).await;
            finished.store(true, Ordering::SeqCst);
            let _ = done.send(());
        });
        Ok(EffectOutcome::done().with_completion(completion))
    }
}

/// Logs whether `Slow` had finished when this effect ran
struct Probe {
    definition: EffectDefinition,
    finished: Arc<AtomicBool>,
    seen: Arc<Mutex<Vec<bool>>>,
}

#[async_trait]
impl EffectType for Probe {
    fn definition(&self) -> &EffectDefinition {
        &self.definition
    }

    async fn trigger(&self, _event: EffectEvent) -> Result<EffectOutcome, EffectError> {
        self.seen.lock().unwrap().push(self.finished.load(Ordering::SeqCst));
        Ok(EffectOutcome::done())
    }
}

struct Harness {
    runner: EffectRunner,
    log: Log,
    seen: Arc<Mutex<Vec<bool>>>,
}

fn harness() -> Harness {
    let log: Log = Arc::default();
    let seen = Arc::default();
    let finished = Arc::new(AtomicBool::new(false));

    let mut effects = EffectRegistry::new();
    effects.register(Arc::new(Record {
        definition: EffectDefinition::new("test:record", "Record", ""),
        log: Arc::clone(&log),
    }));
    effects.register(Arc::new(Fail(EffectDefinition::new("test:fail", "Fail", ""))));
    effects.register(Arc::new(Fail(
        EffectDefinition::new("test:fail-abort", "Fail and abort", "").aborts_list_on_error(),
    )));
    effects.register(Arc::new(Slow {
        definition: EffectDefinition::new("test:slow", "Slow", ""),
        finished: Arc::clone(&finished),
    }));
    effects.register(Arc::new(Probe {
        definition: EffectDefinition::new("test:probe", "Probe", ""),
        finished,
        seen: Arc::clone(&seen),
    }));
    effects.register(Arc::new(EffectOutputEffect::new()));
    effects.register(Arc::new(StopEffectExecution::new()));

    let store = Arc::new(CustomVariableStore::new(Arc::new(ManualClock::starting_now())));
    let resolver = VariableResolver::new(Arc::new(VariableRegistry::with_builtins()), store);

    Harness {
        runner: EffectRunner::new(Arc::new(effects), resolver),
        log,
        seen,
    }
}

fn record(id: &str) -> EffectInstance {
    EffectInstance::new(id, "test:record")
}

fn ids(log: &Log) -> Vec<String> {
    log.lock().unwrap().iter().map(|(id, _)| id.clone()).collect()
}

fn ctx() -> TriggerContext {
    TriggerContext::new(TriggerKind::Manual, "streamer")
}

#[tokio::test]
async fn effects_run_in_declaration_order_skipping_inactive() {
    let h = harness();
    let list = EffectList::new(vec![record("a"), record("b").inactive(), record("c"), record("d")]);

    let result = h.runner.run(&list, &ctx()).await;

    assert_eq!(ids(&h.log), vec!["a", "c", "d"]);
    assert_eq!(result.executed_ids(), vec!["a", "c", "d"]);
    assert_eq!(
        result.effects[1].status,
        EffectStatus::Skipped {
            reason: SkipReason::Inactive
        }
    );
}

#[tokio::test]
async fn weight_bounds_always_and_never_run() {
    let h = harness();
    let list = EffectList::new(vec![
        record("always").with_weight(100.0),
        record("never").with_weight(0.0),
    ]);

    for _ in 0..200 {
        h.runner.run(&list, &ctx()).await;
    }

    let ran = ids(&h.log);
    assert_eq!(ran.len(), 200);
    assert!(ran.iter().all(|id| id == "always"));
}

#[tokio::test]
async fn weight_frequency_tracks_percentage() {
    let h = harness();
    let list = EffectList::new(vec![record("half").with_weight(50.0)]);

    let mut ran = 0;
    for _ in 0..1000 {
        ran += h.runner.run(&list, &ctx()).await.succeeded();
    }

    assert!((400..=600).contains(&ran), "ran {ran} of 1000");
}

#[tokio::test]
async fn arguments_see_earlier_outputs() {
    let h = harness();
    let list = EffectList::new(vec![
        EffectInstance::new("set", EffectOutputEffect::ID)
            .with_arg("name", "winner")
            .with_arg("value", "$user"),
        record("read").with_arg("value", "congrats &winner"),
    ]);

    let result = h.runner.run(&list, &ctx()).await;

    assert_eq!(h.log.lock().unwrap()[0].1, json!("congrats streamer"));
    assert_eq!(result.outputs.get("winner"), Some(&json!("streamer")));
}

#[tokio::test]
async fn outputs_do_not_leak_between_runs() {
    let h = harness();
    let context = ctx();
    let set = EffectList::new(vec![EffectInstance::new("set", EffectOutputEffect::ID)
        .with_arg("name", "x")
        .with_arg("value", "1")]);
    h.runner.run(&set, &context).await;

    let read = EffectList::new(vec![record("read").with_arg("value", "[&x][&x[]]")]);
    h.runner.run(&read, &context).await;
    assert_eq!(h.log.lock().unwrap()[0].1, json!("[&x][]"));
}

#[tokio::test]
async fn failure_is_recorded_and_list_continues() {
    let h = harness();
    let list = EffectList::new(vec![
        record("a"),
        EffectInstance::new("bad", "test:fail"),
        EffectInstance::new("unknown", "test:missing"),
        record("b"),
    ]);

    let result = h.runner.run(&list, &ctx()).await;

    assert_eq!(ids(&h.log), vec!["a", "b"]);
    assert_eq!(result.failed(), 2);
    assert!(!result.aborted);
    assert!(result.abort_error().is_none());
}

#[tokio::test]
async fn abort_on_error_stops_the_list() {
    let h = harness();
    let list = EffectList::new(vec![
        record("a"),
        EffectInstance::new("fatal", "test:fail-abort"),
        record("b"),
    ]);

    let result = h.runner.run(&list, &ctx()).await;

    assert_eq!(ids(&h.log), vec!["a"]);
    assert!(result.aborted);
    assert_eq!(
        result.effects[2].status,
        EffectStatus::Skipped {
            reason: SkipReason::ListAborted
        }
    );
    assert_eq!(result.abort_error().unwrap().status_code(), 500);
}

#[tokio::test]
async fn stop_effect_skips_the_rest() {
    let h = harness();
    let list = EffectList::new(vec![
        record("a"),
        EffectInstance::new("stop", StopEffectExecution::ID),
        record("b"),
    ]);

    let result = h.runner.run(&list, &ctx()).await;
    assert!(result.stopped);
    assert_eq!(ids(&h.log), vec!["a"]);
}

#[tokio::test]
async fn wait_blocks_until_completion() {
    let h = harness();
    let list = EffectList::new(vec![
        EffectInstance::new("slow", "test:slow").with_arg("wait", true),
        EffectInstance::new("probe", "test:probe"),
    ]);

    h.runner.run(&list, &ctx()).await;
    assert_eq!(*h.seen.lock().unwrap(), vec![true]);
}

#[tokio::test]
async fn without_wait_the_list_moves_on() {
    let h = harness();
    let list = EffectList::new(vec![
        EffectInstance::new("slow", "test:slow"),
        EffectInstance::new("probe", "test:probe"),
    ]);

    h.runner.run(&list, &ctx()).await;
    assert_eq!(*h.seen.lock().unwrap(), vec![false]);
}

#[tokio::test]
async fn bad_template_fails_only_that_effect() {
    let h = harness();
    let list = EffectList::new(vec![record("bad").with_arg("value", "$arg[1"), record("ok")]);

    let result = h.runner.run(&list, &ctx()).await;
    assert!(matches!(result.effects[0].status, EffectStatus::Failed { .. }));
    assert_eq!(ids(&h.log), vec!["ok"]);
}

#[tokio::test]
async fn executor_queued_mode_returns_ticket() {
    let h = harness();
    let runner = Arc::new(h.runner);
    let queues = Arc::new(EffectQueues::new(runner.clone()));
    let executor = EffectExecutor::new(runner, queues);

    let list = EffectList::new(vec![record("a"), record("b")]);
    let ticket = executor
        .run(list.clone(), ctx(), ExecutionMode::Queued("q".into()))
        .await
        .unwrap()
        .into_ticket()
        .unwrap();
    let queued = ticket.outcome().await.unwrap();
    assert_eq!(queued.executed_ids(), vec!["a", "b"]);

    let direct = executor.run(list, ctx(), ExecutionMode::Direct).await.unwrap();
    assert!(matches!(direct, Execution::Completed(ref r) if r.succeeded() == 2));

    assert!(
        executor
            .run(EffectList::default(), ctx(), ExecutionMode::Queued(" ".into()))
            .await
            .is_err()
    );
}
