// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cold start: no datastores exist, the daemon comes up initialized.

use std::os::unix::fs::FileTypeExt;
use std::os::unix::fs::PermissionsExt;

use crate::prelude::*;

#[tokio::test]
async fn cold_start_initializes_everything() {
    let daemon = TestDaemon::start().await;

    {
        let backend = daemon.backend.lock();
        let running = backend.datastores.get_tree("running").expect("running exists");
        assert_eq!(running, helm_core::Xml::root(), "running is empty");
        let candidate = backend.datastores.get_tree("candidate").expect("candidate exists");
        assert_eq!(candidate, running, "candidate equals running");
    }

    let meta = std::fs::metadata(&daemon.config.socket).expect("socket file present");
    assert!(meta.file_type().is_socket());
    assert_eq!(meta.permissions().mode() & 0o777, 0o660, "socket mode 0660");

    let pid = std::fs::read_to_string(&daemon.config.pidfile).expect("pid file present");
    assert_eq!(pid.trim().parse::<u32>().expect("numeric pid"), std::process::id());
}

#[tokio::test]
async fn startup_datastore_seeds_running_when_enabled() {
    let daemon = TestDaemon::start_with(
        |config| {
            config.use_startup = true;
            config.init_running = false;
            std::fs::create_dir_all(&config.db_dir).expect("db dir");
            std::fs::write(
                config.db_dir.join("startup.xml"),
                "<config><cfg><domain>boot.se</domain></cfg></config>",
            )
            .expect("startup db");
        },
        helm_daemon::PluginRegistry::new(),
    )
    .await;

    let backend = daemon.backend.lock();
    let domain = backend
        .datastores
        .get("running", &"/cfg/domain".parse().expect("path"))
        .expect("domain");
    assert_eq!(domain.text(), Some("boot.se"));
}
