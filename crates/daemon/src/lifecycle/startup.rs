// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon startup: pid-file lock, datastore reset policy, plugin hooks,
//! server socket.

use std::io::Write;
use std::os::unix::fs::PermissionsExt;
use std::sync::Arc;

use fs2::FileExt;
use helm_core::{load_yspec, DB_CANDIDATE, DB_RUNNING, DB_STARTUP};
use parking_lot::Mutex;
use tokio::net::UnixListener;
use tracing::{info, warn};

use super::{remove_runtime_files, LifecycleError, StartupResult};
use crate::backend::Backend;
use crate::commit::candidate_commit;
use crate::config::Config;
use crate::datastore::Datastores;
use crate::plugin::PluginRegistry;
use crate::store::{MemStore, StorePlugin, XmlFileStore};

/// Session id used for the daemon's own startup transactions.
const STARTUP_SID: u32 = 0;

/// Bring the backend up. On failure the runtime files are removed again,
/// unless the failure was another daemon holding the pid-file lock.
pub async fn startup(
    config: &Config,
    plugins: PluginRegistry,
    argv: &[String],
) -> Result<StartupResult, LifecycleError> {
    match startup_inner(config, plugins, argv).await {
        Ok(result) => Ok(result),
        Err(e) => {
            // The lock failure means those files belong to the running
            // daemon; leave them alone.
            if !matches!(e, LifecycleError::LockFailed(_)) {
                remove_runtime_files(config);
            }
            Err(e)
        }
    }
}

async fn startup_inner(
    config: &Config,
    plugins: PluginRegistry,
    argv: &[String],
) -> Result<StartupResult, LifecycleError> {
    // 1. The socket group must exist before anything touches the fs.
    let sock_gid = match config.group {
        Some(ref name) => Some(lookup_group(name)?),
        None => None,
    };

    for path in [&config.socket, &config.pidfile] {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|err| LifecycleError::PidFile {
                path: parent.display().to_string(),
                err,
            })?;
        }
    }

    // 2. Acquire the pid-file lock first to prevent startup races. The
    // file is not truncated until the lock is held, so a losing racer
    // cannot wipe the winner's pid.
    let pid_path = config.pidfile.display().to_string();
    let lock_file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(&config.pidfile)
        .map_err(|err| LifecycleError::PidFile { path: pid_path.clone(), err })?;
    lock_file
        .try_lock_exclusive()
        .map_err(|_| LifecycleError::LockFailed(pid_path.clone()))?;
    let mut lock_file = lock_file;
    lock_file
        .set_len(0)
        .and_then(|()| writeln!(lock_file, "{}", std::process::id()))
        .map_err(|err| LifecycleError::PidFile { path: pid_path, err })?;
    let lock_file = lock_file;

    // 3. Schema and storage.
    let yspec = Arc::new(load_yspec(&config.schema_module, &config.schema_dir)?);
    info!(module = %yspec.module(), "schema loaded");
    let store = make_store(config)?;
    let datastores = Datastores::new(store, yspec)?;

    if let Some(ref dir) = config.plugin_dir {
        info!(dir = %dir.display(), plugins = plugins.plugins().len(), "plugin directory");
    }
    let mut backend = Backend::new(datastores, plugins, sock_gid);

    // 4. Datastore reset policy and plugin startup hooks.
    init_datastores(&mut backend, config, argv)?;

    // 5. Server socket, group-restricted.
    let listener = bind_socket(config, sock_gid)?;

    info!(pid = std::process::id(), socket = %config.socket.display(), "started");
    Ok(StartupResult::new(Arc::new(Mutex::new(backend)), listener, lock_file))
}

pub(crate) fn make_store(config: &Config) -> Result<Box<dyn StorePlugin>, LifecycleError> {
    match config.store_plugin.as_str() {
        "xmlfile" => Ok(Box::new(XmlFileStore::new(&config.db_dir))),
        "mem" => Ok(Box::new(MemStore::new())),
        other => Err(LifecycleError::UnknownStore(other.to_string())),
    }
}

fn lookup_group(name: &str) -> Result<u32, LifecycleError> {
    match nix::unistd::Group::from_name(name) {
        Ok(Some(group)) => Ok(group.gid.as_raw()),
        _ => Err(LifecycleError::NoSuchGroup(name.to_string())),
    }
}

/// The startup datastore sequence: startup-config, reload, init, shared
/// candidate, plugin reset/start hooks, initial commits.
fn init_datastores(
    backend: &mut Backend,
    config: &Config,
    argv: &[String],
) -> Result<(), LifecycleError> {
    if config.use_startup {
        if backend.datastores.exists(DB_STARTUP)? {
            backend.datastores.copy(DB_STARTUP, DB_RUNNING)?;
        } else {
            backend.datastores.reset(DB_RUNNING)?;
        }
    }

    let mut reload = config.reload_running;
    if reload && !backend.datastores.exists(DB_RUNNING)? {
        warn!("-r (reload running) given but no running datastore found, proceeding without");
        reload = false;
    }
    if reload {
        backend.datastores.copy(DB_RUNNING, DB_CANDIDATE)?;
    }

    if config.init_running || !backend.datastores.exists(DB_RUNNING)? {
        backend.datastores.reset(DB_RUNNING)?;
    }

    if !backend.datastores.exists(DB_CANDIDATE)? {
        backend.datastores.create(DB_CANDIDATE)?;
        backend.datastores.copy(DB_RUNNING, DB_CANDIDATE)?;
    }

    if config.reset_candidate {
        // Plugins rebuild system state in a scratch datastore which is
        // then committed into running.
        backend.datastores.reset("tmp")?;
        backend.datastores.copy(DB_RUNNING, "tmp")?;
        backend.plugins.reset_all("tmp")?;
        candidate_commit(
            &mut backend.datastores,
            &backend.plugins,
            &mut backend.locks,
            STARTUP_SID,
            "tmp",
            DB_RUNNING,
        )?;
        backend.datastores.delete("tmp")?;
    } else if config.reset_running {
        backend.plugins.reset_all(DB_RUNNING)?;
    }

    backend.plugins.start_all(argv)?;

    if reload {
        // A failed validation must not stop the daemon from starting.
        if let Err(e) = candidate_commit(
            &mut backend.datastores,
            &backend.plugins,
            &mut backend.locks,
            STARTUP_SID,
            DB_CANDIDATE,
            DB_RUNNING,
        ) {
            warn!(error = %e, "reload-running commit failed, starting with previous running");
        }
    }

    if let Some(ref file) = config.app_config {
        load_app_config(backend, file)?;
    }

    // Initialize the shared candidate from the now-final running.
    backend.datastores.copy(DB_RUNNING, DB_CANDIDATE)?;
    Ok(())
}

/// Merge an application configuration file into running through a
/// transient datastore (`-c`).
fn load_app_config(
    backend: &mut Backend,
    file: &std::path::Path,
) -> Result<(), LifecycleError> {
    backend.datastores.reset("tmp")?;
    backend.datastores.copy(DB_RUNNING, "tmp")?;
    backend.datastores.load_merge("tmp", file)?;
    candidate_commit(
        &mut backend.datastores,
        &backend.plugins,
        &mut backend.locks,
        STARTUP_SID,
        "tmp",
        DB_RUNNING,
    )?;
    backend.datastores.delete("tmp")?;
    Ok(())
}

fn bind_socket(config: &Config, sock_gid: Option<u32>) -> Result<UnixListener, LifecycleError> {
    let path = &config.socket;
    let display = path.display().to_string();
    if path.exists() {
        std::fs::remove_file(path)
            .map_err(|err| LifecycleError::Socket { path: display.clone(), err })?;
    }
    let listener = UnixListener::bind(path)
        .map_err(|err| LifecycleError::Socket { path: display.clone(), err })?;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o660))
        .map_err(|err| LifecycleError::Socket { path: display.clone(), err })?;
    if let Some(gid) = sock_gid {
        nix::unistd::chown(path, None, Some(nix::unistd::Gid::from_raw(gid))).map_err(|e| {
            LifecycleError::Socket {
                path: display,
                err: std::io::Error::from_raw_os_error(e as i32),
            }
        })?;
    }
    Ok(listener)
}
