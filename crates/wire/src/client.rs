// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Client side of the control socket.
//!
//! One connection, one in-flight request at a time. Frontends keep the
//! connection open across requests so their session (locks,
//! subscriptions) survives between RPCs.

use std::io;
use std::os::unix::fs::FileTypeExt;
use std::path::Path;

use helm_core::BackendError;
use thiserror::Error;
use tokio::net::UnixStream;

use crate::frame::{read_msg, write_msg, ProtocolError};
use crate::msg::Msg;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("{0}: backend not running?")]
    NotRunning(String),

    #[error("{path}: not a unix socket")]
    NotASocket { path: String },

    /// Connect refused with EACCES; the operator hint mirrors the group
    /// requirement on the socket.
    #[error("connecting {path}: permission denied (client must be a member of the socket group)")]
    PermissionDenied { path: String },

    #[error("connecting {path}: {err}")]
    Connect { path: String, err: io::Error },

    /// The backend answered with an `ERR` frame.
    #[error("backend error: {0}")]
    Backend(BackendError),

    /// The backend closed the socket mid-exchange.
    #[error("backend closed the connection")]
    Closed,

    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

/// A connected control-socket client.
#[derive(Debug)]
pub struct BackendClient {
    stream: UnixStream,
}

impl BackendClient {
    /// Connect to the backend socket, with understandable errors for the
    /// common operator mistakes (daemon down, wrong group).
    pub async fn connect(path: &Path) -> Result<Self, ClientError> {
        let display = path.display().to_string();
        let meta = match std::fs::metadata(path) {
            Ok(meta) => meta,
            Err(_) => return Err(ClientError::NotRunning(display)),
        };
        if !meta.file_type().is_socket() {
            return Err(ClientError::NotASocket { path: display });
        }
        let stream = UnixStream::connect(path).await.map_err(|err| {
            if err.kind() == io::ErrorKind::PermissionDenied {
                ClientError::PermissionDenied { path: display.clone() }
            } else {
                ClientError::Connect { path: display.clone(), err }
            }
        })?;
        Ok(Self { stream })
    }

    /// Send one request and wait for its reply. Asynchronous NOTIFY
    /// frames arriving in between are skipped; use [`Self::read_notify`]
    /// to consume them on a subscribed session.
    pub async fn rpc(&mut self, msg: &Msg) -> Result<Vec<u8>, ClientError> {
        write_msg(&mut self.stream, msg).await?;
        loop {
            match self.read_reply().await? {
                Msg::Ok { data } => return Ok(data),
                Msg::Err { class, sub, reason } => {
                    return Err(ClientError::Backend(BackendError::new(class, sub, reason)));
                }
                Msg::Notify { .. } => continue,
                other => {
                    return Err(ProtocolError::BadOp(other.op_type()).into());
                }
            }
        }
    }

    /// Wait for the next notification on this session.
    pub async fn read_notify(&mut self) -> Result<(u32, String), ClientError> {
        loop {
            if let Msg::Notify { level, payload } = self.read_reply().await? {
                return Ok((level, payload));
            }
        }
    }

    async fn read_reply(&mut self) -> Result<Msg, ClientError> {
        match read_msg(&mut self.stream).await {
            Ok(msg) => Ok(msg),
            Err(ProtocolError::ConnectionClosed) => Err(ClientError::Closed),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
