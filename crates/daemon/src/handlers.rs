// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! RPC dispatch: one framed request in, one reply out.
//!
//! Handlers convert every failure into an `ERR` frame and keep the
//! daemon serving. Write operations check the advisory lock first.

use helm_core::{BackendError, ErrClass, Path, PutOp, SessionId, DB_CANDIDATE};
use helm_wire::Msg;
use tracing::{debug, info};

use crate::backend::Backend;
use crate::commit::{candidate_commit, validate_db, CommitError};
use crate::locks::{LockOutcome, UnlockError};

impl Backend {
    /// Route one decoded request. Called from the session's read loop
    /// with the backend locked; must not block.
    pub fn dispatch(&mut self, sid: SessionId, msg: Msg) -> Msg {
        debug!(session = sid, op = msg.op_type(), "dispatch");
        match msg {
            Msg::Commit { db } => self.handle_commit(sid, &db),
            Msg::Validate { db } => self.handle_validate(sid, &db),
            Msg::Change { db, op, path, value } => self.handle_change(sid, &db, op, &path, &value),
            Msg::Save { db, path } => self.handle_save(&db, &path),
            Msg::Load { db, path } => self.handle_load(sid, &db, &path),
            Msg::Copy { src, dst } => self.handle_copy(sid, &src, &dst),
            Msg::Rm { db } => self.handle_rm(sid, &db),
            Msg::InitDb { db } => self.handle_initdb(sid, &db),
            Msg::Lock { db } => self.handle_lock(sid, &db),
            Msg::Unlock { db } => self.handle_unlock(sid, &db),
            Msg::Kill { session } => self.handle_kill(sid, session),
            Msg::Debug { level } => self.handle_debug(level),
            Msg::Call { namespace, name, args } => self.handle_call(&namespace, &name, &args),
            Msg::Subscription { stream, format } => self.handle_subscription(sid, &stream, &format),
            // Reply and notification frames never originate from clients.
            Msg::Ok { .. } | Msg::Notify { .. } | Msg::Err { .. } => err_frame(
                &BackendError::msg(ErrClass::Protocol, "unexpected reply frame from client"),
            ),
        }
    }

    fn handle_commit(&mut self, sid: SessionId, db: &str) -> Msg {
        match candidate_commit(
            &mut self.datastores,
            &self.plugins,
            &mut self.locks,
            sid,
            DB_CANDIDATE,
            db,
        ) {
            Ok(()) => {
                info!(session = sid, target = db, "commit complete");
                Msg::ok()
            }
            Err(e) => commit_err_frame(e),
        }
    }

    fn handle_validate(&mut self, sid: SessionId, db: &str) -> Msg {
        match validate_db(
            &mut self.datastores,
            &self.plugins,
            &mut self.locks,
            sid,
            db,
            helm_core::DB_RUNNING,
        ) {
            Ok(()) => Msg::ok(),
            Err(e) => commit_err_frame(e),
        }
    }

    fn handle_change(&mut self, sid: SessionId, db: &str, op: PutOp, path: &str, value: &str) -> Msg {
        if let Some(denied) = self.write_denied(db, sid) {
            return denied;
        }
        let path: Path = match path.parse() {
            Ok(p) => p,
            Err(e) => return err_frame(&BackendError::msg(ErrClass::Protocol, e.to_string())),
        };
        let value = (!value.is_empty()).then_some(value);
        match self.datastores.change(db, op, &path, value) {
            Ok(()) => Msg::ok(),
            Err(e) => err_frame(&e),
        }
    }

    fn handle_save(&self, db: &str, path: &str) -> Msg {
        match self.datastores.save_file(db, std::path::Path::new(path)) {
            Ok(()) => Msg::ok(),
            Err(e) => err_frame(&e),
        }
    }

    fn handle_load(&mut self, sid: SessionId, db: &str, path: &str) -> Msg {
        if let Some(denied) = self.write_denied(db, sid) {
            return denied;
        }
        match self.datastores.load_file(db, std::path::Path::new(path)) {
            Ok(()) => Msg::ok(),
            Err(e) => err_frame(&e),
        }
    }

    fn handle_copy(&mut self, sid: SessionId, src: &str, dst: &str) -> Msg {
        // Reading src concurrently is fine; only the destination needs
        // write protection.
        if let Some(denied) = self.write_denied(dst, sid) {
            return denied;
        }
        match self.datastores.copy(src, dst) {
            Ok(()) => Msg::ok(),
            Err(e) => err_frame(&e),
        }
    }

    fn handle_rm(&mut self, sid: SessionId, db: &str) -> Msg {
        if let Some(denied) = self.write_denied(db, sid) {
            return denied;
        }
        match self.datastores.delete(db) {
            Ok(()) => Msg::ok(),
            Err(e) => err_frame(&e),
        }
    }

    fn handle_initdb(&mut self, sid: SessionId, db: &str) -> Msg {
        if let Some(denied) = self.write_denied(db, sid) {
            return denied;
        }
        match self.datastores.reset(db) {
            Ok(()) => Msg::ok(),
            Err(e) => err_frame(&e),
        }
    }

    fn handle_lock(&mut self, sid: SessionId, db: &str) -> Msg {
        match self.locks.lock(db, sid) {
            Ok(LockOutcome::Acquired | LockOutcome::AlreadyHeld) => Msg::ok(),
            Err(denied) => lock_denied_frame(db, denied.holder),
        }
    }

    fn handle_unlock(&mut self, sid: SessionId, db: &str) -> Msg {
        match self.locks.unlock(db, sid) {
            Ok(()) => Msg::ok(),
            Err(UnlockError::NotLocked) => err_frame(&BackendError::msg(
                ErrClass::Protocol,
                format!("{db}: not locked"),
            )),
            Err(UnlockError::NotOwner { holder }) => lock_denied_frame(db, holder),
        }
    }

    fn handle_kill(&mut self, sid: SessionId, target: SessionId) -> Msg {
        let privileged = self
            .sessions
            .get(sid)
            .map(|s| self.is_privileged(s.creds()))
            .unwrap_or(false);
        if !privileged {
            return err_frame(&BackendError::msg(
                ErrClass::Demon,
                "kill-session requires the socket group",
            ));
        }
        if self.sessions.get(target).is_none() {
            return err_frame(&BackendError::msg(
                ErrClass::Demon,
                format!("no session {target}"),
            ));
        }
        info!(session = sid, target, "killing session");
        self.destroy_session(target);
        Msg::ok()
    }

    fn handle_debug(&mut self, level: u32) -> Msg {
        info!(level, "debug level changed");
        self.set_debug_level(level);
        Msg::ok()
    }

    fn handle_call(&mut self, namespace: &str, name: &str, args: &[u8]) -> Msg {
        match self.plugins.call(namespace, name, args) {
            Ok(data) => Msg::Ok { data },
            Err(e) => err_frame(&e),
        }
    }

    fn handle_subscription(&mut self, sid: SessionId, stream: &str, format: &str) -> Msg {
        self.streams.subscribe(stream, sid);
        debug!(session = sid, stream, format, "subscribed");
        Msg::ok()
    }

    /// `Some(reply)` when another session's lock forbids writing to `db`.
    fn write_denied(&self, db: &str, sid: SessionId) -> Option<Msg> {
        self.locks.held_by_other(db, sid).map(|holder| lock_denied_frame(db, holder))
    }
}

fn err_frame(e: &BackendError) -> Msg {
    Msg::Err { class: e.class, sub: e.sub, reason: e.reason.clone() }
}

fn lock_denied_frame(db: &str, holder: SessionId) -> Msg {
    Msg::Err {
        class: ErrClass::Protocol,
        sub: holder,
        reason: format!("{db}: lock-denied: held by session {holder}"),
    }
}

fn commit_err_frame(e: CommitError) -> Msg {
    match e {
        CommitError::LockDenied { db, holder } => lock_denied_frame(&db, holder),
        CommitError::Rejected { plugin, err } => Msg::Err {
            class: ErrClass::Plugin,
            sub: 0,
            reason: format!("{plugin}: {}", err.to_xml()),
        },
        CommitError::Invalid { err } => {
            Msg::Err { class: ErrClass::Schema, sub: 0, reason: err.to_xml() }
        }
        CommitError::Backend(e) => err_frame(&e),
    }
}

#[cfg(test)]
#[path = "handlers_tests.rs"]
mod tests;
