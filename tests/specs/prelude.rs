// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for the integration specs: an in-process backend on a
//! real unix socket in a scratch directory.

use std::fs::File;
use std::sync::Arc;

use helm_daemon::config::Config;
use helm_daemon::lifecycle;
use helm_daemon::plugin::PluginRegistry;
use helm_daemon::{Backend, Listener};
use helm_wire::BackendClient;
use parking_lot::Mutex;

pub use helm_wire::Msg;

pub const SCHEMA: &str = "<module name=\"cfg\">\
    <container name=\"cfg\">\
      <list name=\"host\"><key>name</key><leaf name=\"name\"/><leaf name=\"addr\"/></list>\
      <leaf name=\"domain\"/>\
    </container>\
  </module>";

pub struct TestDaemon {
    pub config: Config,
    pub backend: Arc<Mutex<Backend>>,
    _pid_lock: File,
    _dir: tempfile::TempDir,
}

impl TestDaemon {
    /// Cold start in a scratch directory: `-I` semantics, xmlfile store,
    /// no socket group.
    pub async fn start() -> Self {
        Self::start_with(|_| {}, PluginRegistry::new()).await
    }

    pub async fn start_with(
        mutate: impl FnOnce(&mut Config),
        plugins: PluginRegistry,
    ) -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::create_dir_all(dir.path().join("schemas")).expect("schema dir");
        std::fs::write(dir.path().join("schemas/cfg.xml"), SCHEMA).expect("schema file");

        let mut config = Config {
            socket: dir.path().join("helm.sock"),
            pidfile: dir.path().join("helmd.pid"),
            group: None,
            db_dir: dir.path().join("db"),
            plugin_dir: None,
            schema_dir: dir.path().join("schemas"),
            schema_module: "cfg".to_string(),
            store_plugin: "xmlfile".to_string(),
            use_startup: false,
            init_running: true,
            reset_running: false,
            reset_candidate: false,
            reload_running: false,
            app_config: None,
        };
        mutate(&mut config);

        let argv = vec!["helmd".to_string()];
        let result = lifecycle::startup(&config, plugins, &argv)
            .await
            .expect("startup");
        let (backend, listener, _shutdown, pid_lock) = result.into_parts();
        tokio::spawn(Listener::new(listener, Arc::clone(&backend)).run());
        Self { config, backend, _pid_lock: pid_lock, _dir: dir }
    }

    pub async fn client(&self) -> BackendClient {
        BackendClient::connect(&self.config.socket).await.expect("connect")
    }

    /// Raw bytes of a datastore file, for byte-for-byte comparisons.
    pub fn db_bytes(&self, db: &str) -> Vec<u8> {
        std::fs::read(self.config.db_dir.join(format!("{db}.xml"))).expect("db file")
    }

    /// Wait until the backend has exactly `n` live sessions.
    pub async fn wait_for_sessions(&self, n: usize) {
        for _ in 0..400 {
            if self.backend.lock().sessions.len() == n {
                return;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        panic!("never reached {n} sessions");
    }
}

pub fn change(db: &str, path: &str, value: &str) -> Msg {
    Msg::Change {
        db: db.to_string(),
        op: helm_core::PutOp::Merge,
        path: path.to_string(),
        value: value.to_string(),
    }
}

/// A plugin that records its hook invocations and optionally vetoes the
/// validate phase.
pub struct ProbePlugin {
    name: String,
    log: Arc<Mutex<Vec<String>>>,
    veto: bool,
}

impl ProbePlugin {
    pub fn new(name: &str, log: Arc<Mutex<Vec<String>>>) -> Self {
        Self { name: name.to_string(), log, veto: false }
    }

    pub fn vetoing(name: &str, log: Arc<Mutex<Vec<String>>>) -> Self {
        Self { name: name.to_string(), log, veto: true }
    }

    fn record(&self, hook: &str) {
        self.log.lock().push(format!("{}:{hook}", self.name));
    }
}

impl helm_daemon::Plugin for ProbePlugin {
    fn name(&self) -> &str {
        &self.name
    }

    fn begin(&self, _td: &helm_daemon::TxData) -> Result<(), helm_core::BackendError> {
        self.record("begin");
        Ok(())
    }

    fn validate(&self, _td: &helm_daemon::TxData) -> Result<(), helm_core::RpcError> {
        self.record("validate");
        if self.veto {
            return Err(helm_core::RpcError::application(
                "invalid-value",
                Some("/cfg"),
                "vetoed by policy",
            ));
        }
        Ok(())
    }

    fn commit(&self, _td: &helm_daemon::TxData) -> Result<(), helm_core::BackendError> {
        self.record("commit");
        Ok(())
    }

    fn abort(&self, _td: &helm_daemon::TxData) {
        self.record("abort");
    }
}
