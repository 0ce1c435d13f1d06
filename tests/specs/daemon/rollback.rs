// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A plugin vetoes the commit; running must be byte-for-byte unchanged.

use std::sync::Arc;

use helm_daemon::PluginRegistry;
use helm_wire::ClientError;
use parking_lot::Mutex;

use crate::prelude::*;

#[tokio::test]
async fn vetoed_commit_leaves_running_untouched() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut plugins = PluginRegistry::new();
    plugins
        .register(Box::new(ProbePlugin::vetoing("p1", Arc::clone(&log))))
        .expect("register p1");
    plugins
        .register(Box::new(ProbePlugin::new("p2", Arc::clone(&log))))
        .expect("register p2");

    let daemon = TestDaemon::start_with(|_| {}, plugins).await;
    let before = daemon.db_bytes("running");
    let mut client = daemon.client().await;

    client
        .rpc(&change("candidate", "/cfg/host[name=h1]/addr", "10.0.0.1"))
        .await
        .expect("edit");
    let err = client
        .rpc(&Msg::Commit { db: "running".into() })
        .await
        .expect_err("commit must be rejected");

    match err {
        ClientError::Backend(e) => {
            assert_eq!(e.class, helm_core::ErrClass::Plugin);
            assert!(e.reason.contains("vetoed by policy"));
        }
        other => panic!("unexpected error: {other}"),
    }

    assert_eq!(daemon.db_bytes("running"), before, "running unchanged byte-for-byte");

    // P1 saw begin then abort; p2, registered after and never validated,
    // saw neither.
    assert_eq!(*log.lock(), vec!["p1:begin", "p1:validate", "p1:abort"]);
}

#[tokio::test]
async fn clean_commit_runs_commit_hooks_in_order() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut plugins = PluginRegistry::new();
    plugins
        .register(Box::new(ProbePlugin::new("p1", Arc::clone(&log))))
        .expect("register p1");
    plugins
        .register(Box::new(ProbePlugin::new("p2", Arc::clone(&log))))
        .expect("register p2");

    let daemon = TestDaemon::start_with(|_| {}, plugins).await;
    let mut client = daemon.client().await;
    client
        .rpc(&change("candidate", "/cfg/domain", "x.se"))
        .await
        .expect("edit");
    client.rpc(&Msg::Commit { db: "running".into() }).await.expect("commit");

    let log = log.lock();
    let commits: Vec<&String> = log.iter().filter(|l| l.ends_with(":commit")).collect();
    assert_eq!(commits, vec!["p1:commit", "p2:commit"]);
}
