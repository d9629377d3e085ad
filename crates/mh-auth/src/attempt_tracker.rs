use crate::Identity;

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Consecutive client-observed PIN failures per identity.
///
/// Lives for one application session; nothing here is persisted.
#[derive(Debug)]
pub struct AttemptTracker {
    max_attempts: u32,
    failures: Mutex<HashMap<Identity, u32>>,
}

impl AttemptTracker {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            failures: Mutex::new(HashMap::new()),
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn failures(&self, identity: Identity) -> u32 {
        self.guard().get(&identity).copied().unwrap_or(0)
    }

    pub fn remaining(&self, identity: Identity) -> u32 {
        self.max_attempts.saturating_sub(self.failures(identity))
    }

    pub fn is_locked(&self, identity: Identity) -> bool {
        self.failures(identity) >= self.max_attempts
    }

    /// Returns the failure count including this one.
    pub fn record_failure(&self, identity: Identity) -> u32 {
        let mut failures = self.guard();
        let count = failures.entry(identity).or_insert(0);
        *count = count.saturating_add(1);
        *count
    }

    /// Mark the budget as exhausted, e.g. after a backend-reported lockout.
    pub fn lock(&self, identity: Identity) {
        self.guard().insert(identity, self.max_attempts);
    }

    pub fn reset(&self, identity: Identity) {
        self.guard().remove(&identity);
    }

    pub fn reset_all(&self) {
        self.guard().clear();
    }

    fn guard(&self) -> MutexGuard<'_, HashMap<Identity, u32>> {
        self.failures.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
