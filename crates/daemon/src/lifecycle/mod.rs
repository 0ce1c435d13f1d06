// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle management: startup, shutdown, zap.

mod startup;
pub use startup::startup;

use std::fs::File;
use std::sync::Arc;

use helm_core::BackendError;
use helm_core::schema::SchemaError;
use parking_lot::Mutex;
use thiserror::Error;
use tokio::net::UnixListener;
use tokio::sync::Notify;
use tracing::{info, warn};

use crate::backend::Backend;
use crate::commit::CommitError;
use crate::config::Config;

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("pid file {path}: {err}")]
    PidFile { path: String, err: std::io::Error },

    /// Another daemon holds the pid-file lock.
    #[error("daemon already running (pid file {0} is locked)")]
    LockFailed(String),

    #[error(
        "group {0} does not exist; create it (groupadd {0}) or configure a valid socket group"
    )]
    NoSuchGroup(String),

    #[error("socket {path}: {err}")]
    Socket { path: String, err: std::io::Error },

    #[error("startup commit: {0}")]
    Commit(#[from] CommitError),

    #[error("unknown storage plugin {0:?}")]
    UnknownStore(String),
}

/// Live daemon state handed to `main` by [`startup`].
pub struct StartupResult {
    pub backend: Arc<Mutex<Backend>>,
    pub listener: UnixListener,
    pub shutdown: Arc<Notify>,
    // NOTE(lifetime): held to keep the exclusive pid-file lock; released on drop
    lock_file: File,
}

impl std::fmt::Debug for StartupResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StartupResult").finish_non_exhaustive()
    }
}

impl StartupResult {
    pub(crate) fn new(
        backend: Arc<Mutex<Backend>>,
        listener: UnixListener,
        lock_file: File,
    ) -> Self {
        Self { backend, listener, shutdown: Arc::new(Notify::new()), lock_file }
    }

    /// Split into the pieces a caller runs with. The returned `File` is
    /// the held pid-file lock; keep it alive for the daemon's lifetime.
    pub fn into_parts(self) -> (Arc<Mutex<Backend>>, UnixListener, Arc<Notify>, File) {
        (self.backend, self.listener, self.shutdown, self.lock_file)
    }
}

/// Clean shutdown: destroy sessions, run plugin exit hooks, disconnect
/// the store, unlink pid and socket files.
pub fn terminate(backend: &Arc<Mutex<Backend>>, config: &Config) {
    info!("terminating");
    {
        let mut backend = backend.lock();
        backend.destroy_all_sessions();
        backend.plugins.exit_all();
        backend.plugins.clear_all_rpc();
        backend.datastores.disconnect();
    }
    remove_runtime_files(config);
    info!("terminated");
}

/// Kill a previously started daemon and remove its runtime files (`-z`).
pub fn zap(config: &Config) -> Result<(), LifecycleError> {
    if let Some(pid) = read_pidfile(config)? {
        info!(pid, "killing old daemon");
        let target = nix::unistd::Pid::from_raw(pid);
        if let Err(e) = nix::sys::signal::kill(target, nix::sys::signal::Signal::SIGTERM) {
            // ESRCH means it is already gone; everything else matters.
            if e != nix::errno::Errno::ESRCH {
                return Err(LifecycleError::Backend(BackendError::new(
                    helm_core::ErrClass::Demon,
                    e as u32,
                    format!("kill {pid}: {e}"),
                )));
            }
        }
    }
    remove_runtime_files(config);
    Ok(())
}

fn read_pidfile(config: &Config) -> Result<Option<i32>, LifecycleError> {
    match std::fs::read_to_string(&config.pidfile) {
        Ok(content) => Ok(content.trim().parse::<i32>().ok()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(err) => {
            Err(LifecycleError::PidFile { path: config.pidfile.display().to_string(), err })
        }
    }
}

pub(crate) fn remove_runtime_files(config: &Config) {
    for path in [&config.socket, &config.pidfile] {
        if path.exists() {
            if let Err(e) = std::fs::remove_file(path) {
                warn!(path = %path.display(), error = %e, "failed to remove runtime file");
            }
        }
    }
}

#[cfg(test)]
#[path = "../lifecycle_tests.rs"]
mod tests;
