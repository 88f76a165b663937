//! Effect list execution
//!
//! `EffectRunner` walks one list; `EffectExecutor` decides whether a list
//! runs right away (`Direct`) or as a single entry on a named queue
//! (`Queued`).

mod result;
mod runner;

#[cfg(test)]
mod runner_tests;

use std::sync::Arc;

use cuebot_types::EffectList;

use crate::error::EngineError;
use crate::queue::{EffectQueues, QueueTicket};
use crate::trigger::TriggerContext;

pub use result::{EffectRecord, EffectStatus, RunResult, SkipReason};
pub use runner::EffectRunner;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionMode {
    /// Run in the caller's flow
    Direct,
    /// Run as one entry on the named queue
    Queued(String),
}

#[derive(Debug)]
pub enum Execution {
    Completed(RunResult),
    Queued(QueueTicket),
}

impl Execution {
    /// The run result for a direct run
    pub fn into_result(self) -> Option<RunResult> {
        match self {
            Execution::Completed(result) => Some(result),
            Execution::Queued(_) => None,
        }
    }

    pub fn into_ticket(self) -> Option<QueueTicket> {
        match self {
            Execution::Completed(_) => None,
            Execution::Queued(ticket) => Some(ticket),
        }
    }
}

pub struct EffectExecutor {
    runner: Arc<EffectRunner>,
    queues: Arc<EffectQueues>,
}

impl EffectExecutor {
    pub fn new(runner: Arc<EffectRunner>, queues: Arc<EffectQueues>) -> Self {
        Self { runner, queues }
    }

    pub fn runner(&self) -> &Arc<EffectRunner> {
        &self.runner
    }

    pub fn queues(&self) -> &Arc<EffectQueues> {
        &self.queues
    }

    pub async fn run(
        &self,
        list: EffectList,
        context: TriggerContext,
        mode: ExecutionMode,
    ) -> Result<Execution, EngineError> {
        match mode {
            ExecutionMode::Direct => Ok(Execution::Completed(self.runner.run(&list, &context).await)),
            ExecutionMode::Queued(queue) => {
                if queue.trim().is_empty() {
                    return Err(EngineError::validation("queue name is empty"));
                }
                Ok(Execution::Queued(self.queues.enqueue(&queue, list, context)))
            }
        }
    }
}
