// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The commit engine.
//!
//! Drives a candidate datastore into a target through the plugin
//! transaction protocol. On any failure before the apply step the target
//! is byte-for-byte unchanged; after the apply step the engine only moves
//! forward.

use helm_core::{Clock, ErrorType, RpcError, SessionId, Severity};
use thiserror::Error;
use tracing::{debug, warn};

use crate::datastore::Datastores;
use crate::diff::diff;
use crate::locks::{LockManager, LockOutcome};
use crate::plugin::{PluginRegistry, TxData};

/// Commit progress. Abort back to `Idle` is permitted up to and including
/// `Completed`; from `Applied` on, only forward transitions are valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum CommitState {
    Idle,
    Locked,
    Begun,
    Validated,
    Completed,
    Applied,
    Committed,
}

impl CommitState {
    pub fn abort_allowed(self) -> bool {
        matches!(
            self,
            CommitState::Locked
                | CommitState::Begun
                | CommitState::Validated
                | CommitState::Completed
        )
    }
}

#[derive(Debug, Error)]
pub enum CommitError {
    #[error("{db}: lock-denied: held by session {holder}")]
    LockDenied { db: String, holder: SessionId },

    /// A plugin rejected the transaction; `running` was rolled back.
    #[error("plugin {plugin}: {err}")]
    Rejected { plugin: String, err: RpcError },

    /// The candidate does not conform to the schema.
    #[error("{err}")]
    Invalid { err: RpcError },

    #[error(transparent)]
    Backend(#[from] helm_core::BackendError),
}

/// Full commit: `src` (typically candidate) into `dst` (typically
/// running).
pub fn candidate_commit<C: Clock>(
    ds: &mut Datastores,
    plugins: &PluginRegistry,
    locks: &mut LockManager<C>,
    sid: SessionId,
    src: &str,
    dst: &str,
) -> Result<(), CommitError> {
    run(ds, plugins, locks, sid, src, dst, true)
}

/// Validation-only: the lock/diff/begin/validate/complete phases, then
/// release. The target is never touched.
pub fn validate_db<C: Clock>(
    ds: &mut Datastores,
    plugins: &PluginRegistry,
    locks: &mut LockManager<C>,
    sid: SessionId,
    src: &str,
    dst: &str,
) -> Result<(), CommitError> {
    run(ds, plugins, locks, sid, src, dst, false)
}

fn run<C: Clock>(
    ds: &mut Datastores,
    plugins: &PluginRegistry,
    locks: &mut LockManager<C>,
    sid: SessionId,
    src: &str,
    dst: &str,
    apply: bool,
) -> Result<(), CommitError> {
    // 1. Exclusive locks on source and target; fail fast, releasing only
    // what this commit acquired.
    let mut acquired: Vec<&str> = Vec::new();
    for db in [src, dst] {
        match locks.lock(db, sid) {
            Ok(LockOutcome::Acquired) => acquired.push(db),
            Ok(LockOutcome::AlreadyHeld) => {}
            Err(denied) => {
                release(locks, sid, &acquired);
                return Err(CommitError::LockDenied { db: db.to_string(), holder: denied.holder });
            }
        }
    }
    let mut state = CommitState::Locked;
    let result = run_locked(ds, plugins, sid, src, dst, apply, &mut state);
    release(locks, sid, &acquired);
    if result.is_ok() {
        state = CommitState::Idle;
    }
    debug!(?state, src, dst, apply, "transaction finished");
    result
}

fn run_locked(
    ds: &mut Datastores,
    plugins: &PluginRegistry,
    sid: SessionId,
    src: &str,
    dst: &str,
    apply: bool,
    state: &mut CommitState,
) -> Result<(), CommitError> {
    // 2. Snapshot both trees and compute the ordered change set.
    let old = ds.get_tree(dst)?;
    let mut new = ds.get_tree(src)?;
    let changes = diff(ds.yspec(), &old, &new);
    debug!(session = sid, src, dst, changes = changes.len(), "transaction diff");
    let td = TxData { src: src.to_string(), dst: dst.to_string(), changes };

    // 3+4. Begin/validate, per plugin in registration order. A plugin
    // whose predecessor rejected is never begun. Schema validation runs
    // before any plugin sees the transaction.
    let yspec = ds.yspec().clone();
    if let Err(err) = yspec.validate(&mut new) {
        return Err(CommitError::Invalid { err });
    }
    let mut begun = 0usize;
    for plugin in plugins.plugins() {
        if let Err(e) = plugin.begin(&td) {
            abort_from(plugins, &td, begun, state);
            return Err(CommitError::Rejected {
                plugin: plugin.name().to_string(),
                err: RpcError::new("operation-failed", ErrorType::Application, Severity::Error, e.reason),
            });
        }
        begun += 1;
        if let Err(err) = plugin.validate(&td) {
            abort_from(plugins, &td, begun, state);
            return Err(CommitError::Rejected { plugin: plugin.name().to_string(), err });
        }
    }
    *state = CommitState::Begun;
    *state = CommitState::Validated;

    // 5. Complete: final chance to reject.
    for plugin in plugins.plugins() {
        if let Err(err) = plugin.complete(&td) {
            abort_from(plugins, &td, begun, state);
            return Err(CommitError::Rejected { plugin: plugin.name().to_string(), err });
        }
    }
    *state = CommitState::Completed;

    if apply {
        // 6. Atomically replace the target with the source content.
        if let Err(e) = ds.copy(src, dst) {
            abort_from(plugins, &td, begun, state);
            return Err(e.into());
        }
        *state = CommitState::Applied;

        // 7. Commit hooks must not fail; the configuration is already
        // live, so a failure is logged and skipped.
        for plugin in plugins.plugins() {
            if let Err(e) = plugin.commit(&td) {
                warn!(plugin = plugin.name(), error = %e, "commit hook failed after apply");
            }
        }
        *state = CommitState::Committed;
    }

    // 8. Cleanup.
    for plugin in plugins.plugins() {
        plugin.end(&td);
    }
    Ok(())
}

/// Roll back the plugins that have begun, in reverse registration order.
fn abort_from(plugins: &PluginRegistry, td: &TxData, begun: usize, state: &mut CommitState) {
    debug_assert!(state.abort_allowed());
    for plugin in plugins.plugins()[..begun].iter().rev() {
        plugin.abort(td);
    }
    *state = CommitState::Idle;
}

fn release<C: Clock>(locks: &mut LockManager<C>, sid: SessionId, acquired: &[&str]) {
    for db in acquired {
        if let Err(e) = locks.unlock(db, sid) {
            warn!(db, session = sid, error = %e, "releasing transaction lock");
        }
    }
}

#[cfg(test)]
#[path = "commit_tests.rs"]
mod tests;
