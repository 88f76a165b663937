use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use cuebot_types::{EffectList, QueueDefinition};
use serde::Serialize;
use tokio::sync::oneshot;

use crate::error::EngineError;
use crate::executor::RunResult;
use crate::trigger::TriggerContext;

/// Runs one queued list. Implemented by the effect runner; kept as a trait
/// so queues don't hold the executor that holds them.
#[async_trait]
pub trait QueueRunner: Send + Sync + 'static {
    async fn run_queued(&self, list: EffectList, context: TriggerContext) -> RunResult;
}

/// Snapshot of one queue (`GET /queues/{id}`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueState {
    pub id: String,
    pub paused: bool,
    pub pending_count: usize,
    pub currently_running: bool,
    pub interval_ms: u64,
    /// Entries that finished with every effect succeeding or skipped
    pub completed: u64,
    /// Entries that panicked, aborted or had a failed effect. Disjoint from
    /// `completed`.
    pub failed: u64,
}

/// Receipt for an enqueued list
#[derive(Debug)]
pub struct QueueTicket {
    pub queue: String,
    pub entry_id: u64,
    /// Entries ahead of this one when it was enqueued
    pub position: usize,
    pub done: oneshot::Receiver<RunResult>,
}

impl QueueTicket {
    /// Wait for the entry to run. `None` if it was cleared before starting.
    pub async fn outcome(self) -> Option<RunResult> {
        self.done.await.ok()
    }
}

struct QueuedExecution {
    id: u64,
    list: EffectList,
    context: TriggerContext,
    done: oneshot::Sender<RunResult>,
}

struct QueueInner {
    pending: VecDeque<QueuedExecution>,
    paused: bool,
    /// Entry currently executing; at most one per queue
    running: Option<u64>,
    /// A drain task exists for this queue
    worker_active: bool,
    interval: Duration,
    completed: u64,
    failed: u64,
}

impl QueueInner {
    fn new(interval: Duration) -> Self {
        Self {
            pending: VecDeque::new(),
            paused: false,
            running: None,
            worker_active: false,
            interval,
            completed: 0,
            failed: 0,
        }
    }

    /// Mark a worker as started if one is needed
    fn claim_worker(&mut self) -> bool {
        if self.worker_active || self.paused || self.pending.is_empty() {
            return false;
        }
        self.worker_active = true;
        true
    }
}

struct QueueHandle {
    id: String,
    inner: Mutex<QueueInner>,
}

impl QueueHandle {
    fn lock(&self) -> MutexGuard<'_, QueueInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn state(&self) -> QueueState {
        let inner = self.lock();
        QueueState {
            id: self.id.clone(),
            paused: inner.paused,
            pending_count: inner.pending.len(),
            currently_running: inner.running.is_some(),
            interval_ms: u64::try_from(inner.interval.as_millis()).unwrap_or(u64::MAX),
            completed: inner.completed,
            failed: inner.failed,
        }
    }
}

/// Named effect queues.
///
/// Each queue runs at most one entry at a time, in FIFO order. Distinct
/// queues drain independently on their own tokio tasks. A queue is created
/// the first time any operation names it.
pub struct EffectQueues {
    queues: Mutex<HashMap<String, Arc<QueueHandle>>>,
    runner: Arc<dyn QueueRunner>,
    default_interval: Duration,
    next_entry_id: AtomicU64,
}

impl EffectQueues {
    pub fn new(runner: Arc<dyn QueueRunner>) -> Self {
        Self::with_default_interval(runner, Duration::ZERO)
    }

    pub fn with_default_interval(runner: Arc<dyn QueueRunner>, default_interval: Duration) -> Self {
        Self {
            queues: Mutex::new(HashMap::new()),
            runner,
            default_interval,
            next_entry_id: AtomicU64::new(1),
        }
    }

    fn handle(&self, queue_id: &str) -> Arc<QueueHandle> {
        let mut queues = self.queues.lock().unwrap_or_else(PoisonError::into_inner);
        let handle = queues.entry(queue_id.to_string()).or_insert_with(|| {
            tracing::debug!(queue = %queue_id, "Queue created");
            Arc::new(QueueHandle {
                id: queue_id.to_string(),
                inner: Mutex::new(QueueInner::new(self.default_interval)),
            })
        });
        Arc::clone(handle)
    }

    fn existing(&self, queue_id: &str) -> Option<Arc<QueueHandle>> {
        self.queues
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(queue_id)
            .cloned()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Control
    // ─────────────────────────────────────────────────────────────────────────

    /// Append a list run to a queue. Accepted while paused.
    pub fn enqueue(&self, queue_id: &str, list: EffectList, context: TriggerContext) -> QueueTicket {
        let handle = self.handle(queue_id);
        let entry_id = self.next_entry_id.fetch_add(1, Ordering::Relaxed);
        let (done, rx) = oneshot::channel();

        let (position, spawn) = {
            let mut inner = handle.lock();
            let position = inner.pending.len();
            inner.pending.push_back(QueuedExecution {
                id: entry_id,
                list,
                context,
                done,
            });
            (position, inner.claim_worker())
        };

        tracing::debug!(queue = %queue_id, entry_id, position, "Entry enqueued");
        if spawn {
            self.spawn_worker(handle);
        }

        QueueTicket {
            queue: queue_id.to_string(),
            entry_id,
            position,
            done: rx,
        }
    }

    /// Stop dequeuing. A running entry finishes.
    pub fn pause(&self, queue_id: &str) -> QueueState {
        let handle = self.handle(queue_id);
        handle.lock().paused = true;
        tracing::debug!(queue = %queue_id, "Queue paused");
        handle.state()
    }

    /// Resume dequeuing from the front
    pub fn resume(&self, queue_id: &str) -> QueueState {
        let handle = self.handle(queue_id);
        let spawn = {
            let mut inner = handle.lock();
            inner.paused = false;
            inner.claim_worker()
        };
        tracing::debug!(queue = %queue_id, "Queue resumed");
        if spawn {
            self.spawn_worker(Arc::clone(&handle));
        }
        handle.state()
    }

    pub fn toggle(&self, queue_id: &str) -> QueueState {
        let paused = self.handle(queue_id).lock().paused;
        if paused {
            self.resume(queue_id)
        } else {
            self.pause(queue_id)
        }
    }

    /// Discard pending entries; a running entry is not interrupted.
    /// Returns how many entries were discarded.
    pub fn clear(&self, queue_id: &str) -> usize {
        let discarded: Vec<_> = self.handle(queue_id).lock().pending.drain(..).collect();
        let count = discarded.len();
        // Dropping the senders resolves their tickets as cancelled
        drop(discarded);
        tracing::debug!(queue = %queue_id, count, "Queue cleared");
        count
    }

    pub fn set_interval(&self, queue_id: &str, interval: Duration) -> QueueState {
        let handle = self.handle(queue_id);
        handle.lock().interval = interval;
        handle.state()
    }

    /// Create a queue from its definition, or apply the definition's interval
    pub fn declare(&self, definition: &QueueDefinition) -> QueueState {
        self.set_interval(&definition.id, Duration::from_millis(definition.interval_ms))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Inspection
    // ─────────────────────────────────────────────────────────────────────────

    /// State of a queue, creating it if needed
    pub fn state(&self, queue_id: &str) -> QueueState {
        self.handle(queue_id).state()
    }

    /// State of a queue that already exists
    pub fn get(&self, queue_id: &str) -> Option<QueueState> {
        self.existing(queue_id).map(|h| h.state())
    }

    pub fn contains(&self, queue_id: &str) -> bool {
        self.existing(queue_id).is_some()
    }

    /// Every known queue, sorted by id
    pub fn list(&self) -> Vec<QueueState> {
        let handles: Vec<_> = self
            .queues
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        let mut states: Vec<_> = handles.iter().map(|h| h.state()).collect();
        states.sort_by(|a, b| a.id.cmp(&b.id));
        states
    }

    /// Clear every queue's backlog
    pub fn clear_all(&self) -> usize {
        let ids: Vec<_> = self
            .queues
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        ids.iter().map(|id| self.clear(id)).sum()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Worker
    // ─────────────────────────────────────────────────────────────────────────

    fn spawn_worker(&self, handle: Arc<QueueHandle>) {
        let runner = Arc::clone(&self.runner);
        tokio::spawn(async move {
            if let Err(fault) = drain(&handle, runner).await {
                tracing::error!(queue = %handle.id, error = %fault, "Queue worker stopped");
            }
        });
    }
}

/// Run entries until the queue is empty or paused
async fn drain(queue: &QueueHandle, runner: Arc<dyn QueueRunner>) -> Result<(), EngineError> {
    loop {
        let (entry, interval) = {
            let mut inner = queue.lock();
            if let Some(running) = inner.running {
                inner.worker_active = false;
                return Err(EngineError::EngineFault(format!(
                    "entry {running} still marked running when dequeuing"
                )));
            }
            if inner.paused {
                inner.worker_active = false;
                return Ok(());
            }
            let Some(entry) = inner.pending.pop_front() else {
                inner.worker_active = false;
                return Ok(());
            };
            inner.running = Some(entry.id);
            (entry, inner.interval)
        };

        let QueuedExecution {
            id,
            list,
            context,
            done,
        } = entry;
        tracing::debug!(queue = %queue.id, entry_id = id, "Entry started");

        // Run on its own task so a panicking handler surfaces as a JoinError
        // instead of taking the worker down
        let task_runner = Arc::clone(&runner);
        let outcome = tokio::spawn(async move { task_runner.run_queued(list, context).await }).await;

        let result = match outcome {
            Ok(result) => Some(result),
            Err(err) => {
                tracing::warn!(queue = %queue.id, entry_id = id, error = %err, "Queued entry panicked");
                None
            }
        };
        let failed = result
            .as_ref()
            .is_none_or(|r| r.aborted || r.has_failures());

        {
            let mut inner = queue.lock();
            if inner.running != Some(id) {
                inner.worker_active = false;
                return Err(EngineError::EngineFault(format!(
                    "entry {id} finished but queue recorded {:?} as running",
                    inner.running
                )));
            }
            inner.running = None;
            if failed {
                inner.failed += 1;
            } else {
                inner.completed += 1;
            }
        }

        if failed {
            tracing::warn!(queue = %queue.id, entry_id = id, "Queued entry finished with failures");
        } else {
            tracing::debug!(queue = %queue.id, entry_id = id, "Entry finished");
        }
        if let Some(result) = result {
            let _ = done.send(result);
        }

        if !interval.is_zero() {
            tokio::time::sleep(interval).await;
        }
    }
}
