// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The backend context: every piece of daemon state the RPC handlers
//! touch, behind one mutex owned by the listener tasks.

use helm_core::{SessionId, STREAM_LOG};
use helm_wire::Msg;
use tracing::{debug, info};

use crate::datastore::Datastores;
use crate::locks::LockManager;
use crate::notify::{escape_percent, NotifyBus};
use crate::plugin::PluginRegistry;
use crate::session::{PeerCreds, SessionTable};

type DebugHook = Box<dyn Fn(u32) + Send>;

pub struct Backend {
    pub datastores: Datastores,
    pub plugins: PluginRegistry,
    pub locks: LockManager,
    pub sessions: SessionTable,
    pub streams: NotifyBus,
    /// Gid of the configured socket group; members may KILL sessions.
    sock_gid: Option<u32>,
    /// Uid the daemon runs as; the owner is always privileged.
    own_uid: u32,
    debug_hook: Option<DebugHook>,
}

impl Backend {
    pub fn new(datastores: Datastores, plugins: PluginRegistry, sock_gid: Option<u32>) -> Self {
        Self {
            datastores,
            plugins,
            locks: LockManager::new(),
            sessions: SessionTable::new(),
            streams: NotifyBus::new(),
            sock_gid,
            own_uid: nix::unistd::getuid().as_raw(),
            debug_hook: None,
        }
    }

    /// Install the runtime verbosity setter (the DEBUG RPC target).
    pub fn set_debug_hook(&mut self, hook: DebugHook) {
        self.debug_hook = Some(hook);
    }

    pub(crate) fn set_debug_level(&self, level: u32) {
        if let Some(ref hook) = self.debug_hook {
            hook(level);
        }
    }

    /// Root, the daemon owner, and members of the socket group may use
    /// privileged RPCs.
    pub(crate) fn is_privileged(&self, creds: PeerCreds) -> bool {
        creds.uid == 0 || creds.uid == self.own_uid || Some(creds.gid) == self.sock_gid
    }

    /// Tear a session down: every lock and subscription it owns is
    /// released before the handle disappears from the table.
    pub fn destroy_session(&mut self, sid: SessionId) -> bool {
        self.locks.release_session(sid);
        self.streams.unsubscribe_session(sid);
        let existed = self.sessions.remove(sid);
        if existed {
            info!(session = sid, "session destroyed");
        }
        existed
    }

    /// Fan a notification out to a stream's subscribers. A subscriber
    /// whose queue is gone is destroyed; publish continues.
    pub fn publish(&mut self, stream: &str, level: u32, payload: &str) {
        let subscribers: Vec<SessionId> = self.streams.subscribers(stream).to_vec();
        if subscribers.is_empty() {
            return;
        }
        let msg = Msg::Notify { level, payload: escape_percent(payload) };
        let mut dead = Vec::new();
        for sid in subscribers {
            if !self.sessions.send(sid, msg.clone()) {
                dead.push(sid);
            }
        }
        for sid in dead {
            debug!(session = sid, stream, "dropping subscriber with closed queue");
            self.destroy_session(sid);
        }
    }

    /// Publish a log line to the built-in stream.
    pub fn publish_log(&mut self, level: u32, line: &str) {
        self.publish(STREAM_LOG, level, line);
    }

    /// Cancel every live session (shutdown path).
    pub fn destroy_all_sessions(&mut self) {
        for sid in self.sessions.ids() {
            self.destroy_session(sid);
        }
    }
}

#[cfg(test)]
#[path = "backend_tests.rs"]
mod tests;
