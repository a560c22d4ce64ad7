use std::{
    collections::HashMap,
    sync::Mutex,
    time::{Duration, Instant},
};

use crate::db::OwnerId;

pub const DEFAULT_WINDOW: Duration = Duration::from_secs(5);

/// Fixed-window limiter for intake actions, one timestamp per owner.
pub struct RateGuard {
    window: Duration,
    last_accepted: Mutex<HashMap<OwnerId, Instant>>,
}

impl RateGuard {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_accepted: Mutex::new(HashMap::new()),
        }
    }

    pub fn should_throttle(&self, owner_id: OwnerId) -> bool {
        self.should_throttle_at(owner_id, Instant::now())
    }

    /// A throttled call does not move the window.
    pub fn should_throttle_at(&self, owner_id: OwnerId, now: Instant) -> bool {
        let mut guard = match self.last_accepted.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        match guard.get(&owner_id) {
            Some(last) if now.saturating_duration_since(*last) < self.window => true,
            _ => {
                guard.insert(owner_id, now);
                false
            }
        }
    }
}

impl Default for RateGuard {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}
