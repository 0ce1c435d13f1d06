// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Listener task: accepts control-socket clients and runs their session
//! loops.
//!
//! Each connection gets a read loop (frame in, dispatch, reply queued)
//! and a writer task draining the session's outbound queue, so replies
//! and notifications never interleave mid-frame. Dispatch runs
//! synchronously under the backend mutex; a client disconnect observed
//! afterwards cannot undo an operation already in flight.

use std::sync::Arc;

use helm_core::{ErrClass, SessionId};
use helm_wire::{read_msg, write_msg, Msg, ProtocolError};
use parking_lot::Mutex;
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::backend::Backend;
use crate::session::PeerCreds;

pub struct Listener {
    listener: UnixListener,
    backend: Arc<Mutex<Backend>>,
}

impl Listener {
    pub fn new(listener: UnixListener, backend: Arc<Mutex<Backend>>) -> Self {
        Self { listener, backend }
    }

    /// Accept clients until the task is dropped at shutdown.
    pub async fn run(self) {
        loop {
            match self.listener.accept().await {
                Ok((stream, _)) => {
                    let backend = Arc::clone(&self.backend);
                    tokio::spawn(async move {
                        handle_session(stream, backend).await;
                    });
                }
                Err(e) => error!("accept error: {}", e),
            }
        }
    }
}

async fn handle_session(stream: UnixStream, backend: Arc<Mutex<Backend>>) {
    let creds = match stream.peer_cred() {
        Ok(cred) => PeerCreds { uid: cred.uid(), gid: cred.gid(), pid: cred.pid() },
        Err(e) => {
            warn!("rejecting client without credentials: {}", e);
            return;
        }
    };
    let (read_half, write_half) = stream.into_split();
    let (tx, rx) = mpsc::unbounded_channel();
    let (sid, cancel) = backend.lock().sessions.register(creds, tx);
    info!(session = sid, uid = creds.uid, pid = ?creds.pid, "client connected");

    let writer = tokio::spawn(writer_task(write_half, rx, cancel.clone()));
    read_loop(read_half, sid, &backend, &cancel).await;

    backend.lock().destroy_session(sid);
    // The session's sender is gone; the writer drains and exits.
    let _ = writer.await;
    debug!(session = sid, "connection closed");
}

async fn read_loop(
    mut reader: OwnedReadHalf,
    sid: SessionId,
    backend: &Arc<Mutex<Backend>>,
    cancel: &CancellationToken,
) {
    loop {
        let msg = tokio::select! {
            // KILL lands here: the session ends at the next frame boundary.
            _ = cancel.cancelled() => return,
            res = read_msg(&mut reader) => match res {
                Ok(msg) => msg,
                Err(ProtocolError::ConnectionClosed) => return,
                Err(e) => {
                    warn!(session = sid, error = %e, "protocol error, dropping client");
                    let reply = Msg::Err {
                        class: ErrClass::Protocol,
                        sub: 0,
                        reason: e.to_string(),
                    };
                    backend.lock().sessions.send(sid, reply);
                    return;
                }
            },
        };
        // One in-flight request per session: dispatch synchronously,
        // queue the reply behind any pending notifications.
        let sent = {
            let mut backend = backend.lock();
            let reply = backend.dispatch(sid, msg);
            backend.sessions.send(sid, reply)
        };
        if !sent {
            // Session was destroyed during dispatch (e.g. killed itself).
            return;
        }
    }
}

async fn writer_task(
    mut writer: OwnedWriteHalf,
    mut rx: mpsc::UnboundedReceiver<Msg>,
    cancel: CancellationToken,
) {
    while let Some(msg) = rx.recv().await {
        if let Err(e) = write_msg(&mut writer, &msg).await {
            debug!(error = %e, "write failed, closing session");
            cancel.cancel();
            return;
        }
    }
}

#[cfg(test)]
#[path = "listener_tests.rs"]
mod tests;
