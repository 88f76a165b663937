//! Named effect queues
//!
//! ```text
//!   enqueue ──► pending (FIFO) ──► worker ──► QueueRunner::run_queued
//!                  ▲                  │
//!      pause/resume/toggle/clear      └── one entry at a time per queue
//! ```
//!
//! State machine per queue: `Idle → Running → Idle`, gated independently by
//! the paused flag. Entries enqueued while paused accumulate; `clear` drops
//! the backlog without touching a running entry.

mod queues;


pub use queues::{EffectQueues, QueueRunner, QueueState, QueueTicket};
