use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use cuebot_types::CooldownSettings;
use hashbrown::HashMap;
use serde::Serialize;
use tokio::task::JoinHandle;

use crate::clock::{self, Clock};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CooldownScope {
    User,
    Global,
}

impl fmt::Display for CooldownScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CooldownScope::User => f.write_str("user"),
            CooldownScope::Global => f.write_str("global"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SlotState {
    /// Held by an uncommitted reservation
    Reserved(u64),
    Committed,
}

#[derive(Debug, Clone, Copy)]
struct Slot {
    expires_at: DateTime<Utc>,
    state: SlotState,
}

impl Slot {
    fn blocks(&self, now: DateTime<Utc>) -> bool {
        match self.state {
            SlotState::Reserved(_) => true,
            SlotState::Committed => self.expires_at > now,
        }
    }
}

#[derive(Debug, Default)]
struct CommandCooldowns {
    global: Option<Slot>,
    users: HashMap<String, Slot>,
    /// Earliest time the next inline prune may run
    next_prune: Option<DateTime<Utc>>,
}

impl CommandCooldowns {
    /// Drop committed slots whose window has passed. Reserved slots stay.
    fn prune(&mut self, now: DateTime<Utc>) -> usize {
        let expired = |slot: &Slot| slot.state == SlotState::Committed && !slot.blocks(now);
        let mut removed = 0;
        if self.global.as_ref().is_some_and(expired) {
            self.global = None;
            removed += 1;
        }
        let before = self.users.len();
        self.users.retain(|_, slot| !expired(slot));
        removed + before - self.users.len()
    }

    fn is_empty(&self) -> bool {
        self.global.is_none() && self.users.is_empty()
    }

    fn release(&mut self, token: u64) {
        let held = |slot: &Slot| slot.state == SlotState::Reserved(token);
        if self.global.as_ref().is_some_and(held) {
            self.global = None;
        }
        self.users.retain(|_, slot| !held(slot));
    }
}

type Entry = Arc<Mutex<CommandCooldowns>>;

/// Result of `CooldownTracker::check_and_reserve`
#[derive(Debug)]
pub enum CooldownOutcome {
    Allowed(CooldownReservation),
    OnUserCooldown(Duration),
    OnGlobalCooldown(Duration),
}

impl CooldownOutcome {
    pub fn is_allowed(&self) -> bool {
        matches!(self, CooldownOutcome::Allowed(_))
    }

    /// Blocking scope and whole seconds remaining (rounded up)
    pub fn blocked(&self) -> Option<(CooldownScope, u64)> {
        let (scope, remaining) = match self {
            CooldownOutcome::Allowed(_) => return None,
            CooldownOutcome::OnUserCooldown(d) => (CooldownScope::User, d),
            CooldownOutcome::OnGlobalCooldown(d) => (CooldownScope::Global, d),
        };
        let secs = remaining.as_secs() + u64::from(remaining.subsec_nanos() > 0);
        Some((scope, secs))
    }
}

/// A held cooldown slot. Commit to start the cooldown window; drop to
/// release it untouched.
#[derive(Debug)]
#[must_use = "dropping a reservation releases the cooldown slot"]
pub struct CooldownReservation {
    /// `None` when the command has no cooldown
    entry: Option<Entry>,
    command_id: String,
    user_key: String,
    token: u64,
    settings: CooldownSettings,
}

impl CooldownReservation {
    fn noop(command_id: &str, settings: CooldownSettings) -> Self {
        Self {
            entry: None,
            command_id: command_id.to_string(),
            user_key: String::new(),
            token: 0,
            settings,
        }
    }

    /// Start both cooldown windows at `now`
    pub fn commit(mut self, now: DateTime<Utc>) {
        let Some(entry) = self.entry.take() else {
            return;
        };
        let mut cooldowns = entry.lock().unwrap_or_else(PoisonError::into_inner);
        let held = SlotState::Reserved(self.token);

        if let Some(slot) = cooldowns.global.as_mut().filter(|s| s.state == held) {
            slot.expires_at = clock::add(now, Duration::from_secs(self.settings.global_secs));
            slot.state = SlotState::Committed;
        }
        if let Some(slot) = cooldowns
            .users
            .get_mut(&self.user_key)
            .filter(|s| s.state == held)
        {
            slot.expires_at = clock::add(now, Duration::from_secs(self.settings.user_secs));
            slot.state = SlotState::Committed;
        }

        tracing::debug!(
            command = %self.command_id,
            user = %self.user_key,
            user_secs = self.settings.user_secs,
            global_secs = self.settings.global_secs,
            "Cooldown committed"
        );
    }
}

impl Drop for CooldownReservation {
    fn drop(&mut self) {
        if let Some(entry) = self.entry.take() {
            entry
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .release(self.token);
            tracing::debug!(command = %self.command_id, "Cooldown reservation released");
        }
    }
}

/// Per-command cooldown state.
///
/// The outer map lock is only held to find or create a command's entry; the
/// check-and-reserve itself runs under that command's own lock, so different
/// commands never contend.
#[derive(Debug, Default)]
pub struct CooldownTracker {
    commands: Mutex<HashMap<String, Entry>>,
    next_token: AtomicU64,
}

impl CooldownTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&self, command_id: &str) -> Entry {
        let mut commands = self.commands.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(
            commands
                .entry(command_id.to_string())
                .or_insert_with(Entry::default),
        )
    }

    /// Atomically check both scopes and, if clear, reserve them.
    /// Global is checked first.
    pub fn check_and_reserve(
        &self,
        command_id: &str,
        user_id: &str,
        now: DateTime<Utc>,
        settings: &CooldownSettings,
    ) -> CooldownOutcome {
        if settings.is_disabled() {
            return CooldownOutcome::Allowed(CooldownReservation::noop(command_id, *settings));
        }

        let user_key = user_id.to_lowercase();
        let entry = self.entry(command_id);
        let mut cooldowns = entry.lock().unwrap_or_else(PoisonError::into_inner);

        // At most once per user window, so the cost stays amortized
        if cooldowns.next_prune.is_none_or(|at| at <= now) {
            cooldowns.prune(now);
            cooldowns.next_prune = Some(clock::add(now, Duration::from_secs(settings.user_secs.max(1))));
        }

        if settings.global_secs > 0
            && let Some(slot) = cooldowns.global.filter(|s| s.blocks(now))
        {
            return CooldownOutcome::OnGlobalCooldown(clock::remaining(slot.expires_at, now));
        }
        if settings.user_secs > 0
            && let Some(slot) = cooldowns.users.get(&user_key).filter(|s| s.blocks(now))
        {
            return CooldownOutcome::OnUserCooldown(clock::remaining(slot.expires_at, now));
        }

        let token = self.next_token.fetch_add(1, Ordering::Relaxed) + 1;
        let reserve = |secs: u64| Slot {
            expires_at: clock::add(now, Duration::from_secs(secs)),
            state: SlotState::Reserved(token),
        };
        if settings.global_secs > 0 {
            cooldowns.global = Some(reserve(settings.global_secs));
        }
        if settings.user_secs > 0 {
            cooldowns.users.insert(user_key.clone(), reserve(settings.user_secs));
        }
        drop(cooldowns);

        CooldownOutcome::Allowed(CooldownReservation {
            entry: Some(entry),
            command_id: command_id.to_string(),
            user_key,
            token,
            settings: *settings,
        })
    }

    /// Drop every expired cooldown, and the bookkeeping of commands left
    /// with none. Returns how many slots were removed.
    pub fn sweep(&self, now: DateTime<Utc>) -> usize {
        let mut commands = self.commands.lock().unwrap_or_else(PoisonError::into_inner);
        let mut removed = 0;
        commands.retain(|_, entry| {
            let mut cooldowns = entry.lock().unwrap_or_else(PoisonError::into_inner);
            removed += cooldowns.prune(now);
            // An outstanding reservation still points at this entry
            !(cooldowns.is_empty() && Arc::strong_count(entry) == 1)
        });

        if removed > 0 {
            tracing::debug!(removed, "Swept expired cooldowns");
        }
        removed
    }

    /// Run `sweep` every `interval` until the handle is aborted
    pub fn spawn_sweeper(self: &Arc<Self>, clock: Arc<dyn Clock>, interval: Duration) -> JoinHandle<()> {
        let tracker = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // First tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                tracker.sweep(clock.now());
            }
        })
    }

    /// Committed or reserved user slots currently held for a command
    pub fn tracked_users(&self, command_id: &str) -> usize {
        self.commands
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(command_id)
            .map_or(0, |entry| entry.lock().unwrap_or_else(PoisonError::into_inner).users.len())
    }

    /// Remaining time on each scope, without reserving
    pub fn remaining(
        &self,
        command_id: &str,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> (Duration, Duration) {
        let Some(entry) = self
            .commands
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(command_id)
            .cloned()
        else {
            return (Duration::ZERO, Duration::ZERO);
        };
        let cooldowns = entry.lock().unwrap_or_else(PoisonError::into_inner);
        let left = |slot: Option<&Slot>| {
            slot.filter(|s| s.blocks(now))
                .map(|s| clock::remaining(s.expires_at, now))
                .unwrap_or_default()
        };
        (
            left(cooldowns.users.get(&user_id.to_lowercase())),
            left(cooldowns.global.as_ref()),
        )
    }

    /// Clear every committed cooldown of a command
    pub fn reset(&self, command_id: &str) {
        let entry = self
            .commands
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(command_id)
            .cloned();
        if let Some(entry) = entry {
            let mut cooldowns = entry.lock().unwrap_or_else(PoisonError::into_inner);
            let committed = |slot: &Slot| slot.state == SlotState::Committed;
            if cooldowns.global.as_ref().is_some_and(committed) {
                cooldowns.global = None;
            }
            cooldowns.users.retain(|_, slot| !committed(slot));
        }
    }

    /// Clear one user's committed cooldown on a command
    pub fn reset_user(&self, command_id: &str, user_id: &str) {
        let entry = self
            .commands
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(command_id)
            .cloned();
        if let Some(entry) = entry {
            let mut cooldowns = entry.lock().unwrap_or_else(PoisonError::into_inner);
            let key = user_id.to_lowercase();
            if cooldowns
                .users
                .get(&key)
                .is_some_and(|s| s.state == SlotState::Committed)
            {
                cooldowns.users.remove(&key);
            }
        }
    }
}
