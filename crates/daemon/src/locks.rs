// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-datastore advisory locks keyed by client session.

use std::collections::HashMap;
use std::time::Instant;

use helm_core::{Clock, SessionId, SystemClock};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("lock-denied: held by session {holder}")]
pub struct LockDenied {
    pub holder: SessionId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum UnlockError {
    #[error("not locked")]
    NotLocked,

    #[error("lock held by session {holder}")]
    NotOwner { holder: SessionId },
}

/// Result of a successful lock call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockOutcome {
    Acquired,
    /// The session already held the lock; re-entrant success.
    AlreadyHeld,
}

#[derive(Debug, Clone, Copy)]
struct LockEntry {
    owner: SessionId,
    acquired_at: Instant,
}

pub struct LockManager<C: Clock = SystemClock> {
    clock: C,
    locks: HashMap<String, LockEntry>,
}

impl LockManager<SystemClock> {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl Default for LockManager<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> LockManager<C> {
    pub fn with_clock(clock: C) -> Self {
        Self { clock, locks: HashMap::new() }
    }

    /// Acquire the lock on `db`. Re-entrant for the holding session;
    /// denied with the holder's id otherwise.
    pub fn lock(&mut self, db: &str, sid: SessionId) -> Result<LockOutcome, LockDenied> {
        match self.locks.get(db) {
            Some(entry) if entry.owner == sid => Ok(LockOutcome::AlreadyHeld),
            Some(entry) => Err(LockDenied { holder: entry.owner }),
            None => {
                debug!(db, session = sid, "lock acquired");
                self.locks.insert(
                    db.to_string(),
                    LockEntry { owner: sid, acquired_at: self.clock.now() },
                );
                Ok(LockOutcome::Acquired)
            }
        }
    }

    /// Release the lock on `db`; only the holder may release.
    pub fn unlock(&mut self, db: &str, sid: SessionId) -> Result<(), UnlockError> {
        match self.locks.get(db) {
            None => Err(UnlockError::NotLocked),
            Some(entry) if entry.owner != sid => Err(UnlockError::NotOwner { holder: entry.owner }),
            Some(_) => {
                self.locks.remove(db);
                debug!(db, session = sid, "lock released");
                Ok(())
            }
        }
    }

    pub fn holder(&self, db: &str) -> Option<SessionId> {
        self.locks.get(db).map(|e| e.owner)
    }

    pub fn acquired_at(&self, db: &str) -> Option<Instant> {
        self.locks.get(db).map(|e| e.acquired_at)
    }

    /// The session (other than `sid`) currently blocking writes to `db`.
    pub fn held_by_other(&self, db: &str, sid: SessionId) -> Option<SessionId> {
        self.holder(db).filter(|&owner| owner != sid)
    }

    /// Drop every lock held by a session. Called on session destruction,
    /// before any other session can observe the release.
    pub fn release_session(&mut self, sid: SessionId) -> Vec<String> {
        let released: Vec<String> = self
            .locks
            .iter()
            .filter(|(_, e)| e.owner == sid)
            .map(|(db, _)| db.clone())
            .collect();
        for db in &released {
            self.locks.remove(db);
        }
        if !released.is_empty() {
            debug!(session = sid, dbs = ?released, "released locks on session destruction");
        }
        released
    }
}

#[cfg(test)]
#[path = "locks_tests.rs"]
mod tests;
