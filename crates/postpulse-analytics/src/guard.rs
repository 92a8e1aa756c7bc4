//! Per-user run exclusion.
//!
//! A user's snapshot collection is replaced wholesale by every run, so two
//! overlapping runs for the same user could interleave their delete and write
//! batches. The guard admits at most one run per user key within a process;
//! runs for different users never contend.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

#[derive(Debug, Clone, Default)]
pub struct UserRunGuard {
    active: Arc<Mutex<HashSet<String>>>,
}

/// Held for the duration of one run; releases the user key on drop.
#[derive(Debug)]
pub struct RunPermit {
    user_id: String,
    active: Arc<Mutex<HashSet<String>>>,
}

impl UserRunGuard {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the user key, or `None` if a run for this user is in flight.
    #[must_use]
    pub fn try_acquire(&self, user_id: &str) -> Option<RunPermit> {
        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        if !active.insert(user_id.to_string()) {
            return None;
        }
        Some(RunPermit {
            user_id: user_id.to_string(),
            active: Arc::clone(&self.active),
        })
    }

    #[must_use]
    pub fn is_running(&self, user_id: &str) -> bool {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(user_id)
    }
}

impl RunPermit {
    #[must_use]
    pub fn user_id(&self) -> &str {
        &self.user_id
    }
}

impl Drop for RunPermit {
    fn drop(&mut self) {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.user_id);
    }
}
