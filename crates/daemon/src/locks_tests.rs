// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::time::Duration;

use helm_core::FakeClock;

use super::*;

#[test]
fn lock_is_exclusive_per_datastore() {
    let mut locks = LockManager::new();
    assert_eq!(locks.lock("candidate", 1), Ok(LockOutcome::Acquired));
    assert_eq!(locks.lock("candidate", 2), Err(LockDenied { holder: 1 }));
    // A different datastore is unaffected.
    assert_eq!(locks.lock("running", 2), Ok(LockOutcome::Acquired));
}

#[test]
fn lock_is_reentrant_for_the_holder() {
    let mut locks = LockManager::new();
    assert_eq!(locks.lock("candidate", 1), Ok(LockOutcome::Acquired));
    assert_eq!(locks.lock("candidate", 1), Ok(LockOutcome::AlreadyHeld));
    assert_eq!(locks.holder("candidate"), Some(1));
}

#[test]
fn only_the_holder_may_unlock() {
    let mut locks = LockManager::new();
    assert_eq!(locks.unlock("candidate", 1), Err(UnlockError::NotLocked));
    locks.lock("candidate", 1).unwrap();
    assert_eq!(locks.unlock("candidate", 2), Err(UnlockError::NotOwner { holder: 1 }));
    assert_eq!(locks.unlock("candidate", 1), Ok(()));
    assert_eq!(locks.holder("candidate"), None);
}

#[test]
fn release_session_drops_every_lock_it_held() {
    let mut locks = LockManager::new();
    locks.lock("candidate", 1).unwrap();
    locks.lock("running", 1).unwrap();
    locks.lock("startup", 2).unwrap();

    let mut released = locks.release_session(1);
    released.sort();
    assert_eq!(released, vec!["candidate".to_string(), "running".to_string()]);
    assert_eq!(locks.holder("startup"), Some(2));
    // The released locks are immediately available to others.
    assert_eq!(locks.lock("candidate", 2), Ok(LockOutcome::Acquired));
}

#[test]
fn held_by_other_ignores_own_lock() {
    let mut locks = LockManager::new();
    locks.lock("candidate", 1).unwrap();
    assert_eq!(locks.held_by_other("candidate", 1), None);
    assert_eq!(locks.held_by_other("candidate", 2), Some(1));
    assert_eq!(locks.held_by_other("running", 2), None);
}

#[test]
fn acquisition_time_comes_from_the_clock() {
    let clock = FakeClock::new();
    let mut locks = LockManager::with_clock(clock.clone());
    locks.lock("candidate", 1).unwrap();
    let first = locks.acquired_at("candidate").unwrap();
    clock.advance(Duration::from_secs(30));
    // Re-entrant lock does not refresh the timestamp.
    locks.lock("candidate", 1).unwrap();
    assert_eq!(locks.acquired_at("candidate"), Some(first));
    locks.unlock("candidate", 1).unwrap();
    locks.lock("candidate", 1).unwrap();
    assert_eq!(locks.acquired_at("candidate"), Some(first + Duration::from_secs(30)));
}
