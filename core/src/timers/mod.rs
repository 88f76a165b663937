//! Interval timers
//!
//! Each active timer owns one tokio task that queues the timer's effect list
//! on the timer's own queue every interval. Enable, disable, toggle and clear
//! (restart the countdown) act on that task.

mod service;

#[cfg(test)]
mod service_tests;

pub use service::{TimerAction, TimerService, TimerStatus};
