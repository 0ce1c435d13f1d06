// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Client sessions.
//!
//! A session is an accepted control-socket connection: its id, the peer's
//! kernel-reported credentials, and the outbound frame queue drained by
//! the connection's writer task. Locks and subscriptions are tracked in
//! their own managers, keyed by session id.

use std::collections::HashMap;

use helm_core::SessionId;
use helm_wire::Msg;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Peer credentials from `SO_PEERCRED`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeerCreds {
    pub uid: u32,
    pub gid: u32,
    pub pid: Option<i32>,
}

pub struct SessionHandle {
    id: SessionId,
    creds: PeerCreds,
    tx: mpsc::UnboundedSender<Msg>,
    cancel: CancellationToken,
}

impl SessionHandle {
    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn creds(&self) -> PeerCreds {
        self.creds
    }

    /// Queue a frame for the writer task. False when the connection is
    /// already gone.
    pub fn send(&self, msg: Msg) -> bool {
        self.tx.send(msg).is_ok()
    }

    /// Ask the connection task to shut the session down at the next
    /// frame boundary.
    pub fn kill(&self) {
        self.cancel.cancel();
    }
}

/// All live sessions, keyed by their monotonically increasing 32-bit id.
#[derive(Default)]
pub struct SessionTable {
    next_id: SessionId,
    sessions: HashMap<SessionId, SessionHandle>,
}

impl SessionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an accepted connection; returns its session id and the
    /// cancellation token its tasks watch.
    pub fn register(
        &mut self,
        creds: PeerCreds,
        tx: mpsc::UnboundedSender<Msg>,
    ) -> (SessionId, CancellationToken) {
        loop {
            self.next_id = self.next_id.wrapping_add(1);
            if self.next_id != 0 && !self.sessions.contains_key(&self.next_id) {
                break;
            }
        }
        let id = self.next_id;
        let cancel = CancellationToken::new();
        debug!(session = id, uid = creds.uid, pid = ?creds.pid, "session registered");
        self.sessions
            .insert(id, SessionHandle { id, creds, tx, cancel: cancel.clone() });
        (id, cancel)
    }

    pub fn get(&self, id: SessionId) -> Option<&SessionHandle> {
        self.sessions.get(&id)
    }

    /// Remove a session, cancelling its tasks. Idempotent.
    pub fn remove(&mut self, id: SessionId) -> bool {
        match self.sessions.remove(&id) {
            Some(handle) => {
                handle.kill();
                true
            }
            None => false,
        }
    }

    /// Queue a frame to one session.
    pub fn send(&self, id: SessionId, msg: Msg) -> bool {
        self.get(id).map(|s| s.send(msg)).unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn ids(&self) -> Vec<SessionId> {
        self.sessions.keys().copied().collect()
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
