//! Command cooldowns
//!
//! Two-phase protocol: `check_and_reserve` atomically checks both scopes and
//! holds the slot, the caller commits once the command body starts. A
//! reservation dropped without commit (failed precondition) releases the slot
//! without consuming cooldown.

mod tracker;


pub use tracker::{CooldownOutcome, CooldownReservation, CooldownScope, CooldownTracker};
