// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lock, edit the candidate, commit, observe running.

use crate::prelude::*;

#[tokio::test]
async fn edit_and_commit_lands_in_running() {
    let daemon = TestDaemon::start().await;
    let before = daemon.db_bytes("running");
    let mut client = daemon.client().await;

    client.rpc(&Msg::Lock { db: "candidate".into() }).await.expect("lock");
    client
        .rpc(&change("candidate", "/cfg/host[name=h1]", "h1"))
        .await
        .expect("change");
    client.rpc(&Msg::Commit { db: "running".into() }).await.expect("commit");

    let running = daemon.backend.lock().datastores.get_tree("running").expect("running");
    let host = running
        .get_at(&"/cfg/host[name=h1]".parse().expect("path"))
        .expect("host committed");
    assert_eq!(host.child_text("name"), Some("h1"));

    let after = daemon.db_bytes("running");
    assert_ne!(before, after, "running file was rewritten by the commit");
}

#[tokio::test]
async fn merge_is_idempotent_across_the_wire() {
    let daemon = TestDaemon::start().await;
    let mut client = daemon.client().await;
    let edit = change("candidate", "/cfg/host[name=h1]/addr", "10.0.0.1");
    client.rpc(&edit).await.expect("first merge");
    let once = daemon.db_bytes("candidate");
    client.rpc(&edit).await.expect("second merge");
    assert_eq!(daemon.db_bytes("candidate"), once, "merge twice equals merge once");
}

#[tokio::test]
async fn copy_config_is_a_snapshot() {
    let daemon = TestDaemon::start().await;
    let mut client = daemon.client().await;
    client
        .rpc(&change("candidate", "/cfg/domain", "x.se"))
        .await
        .expect("seed");
    client
        .rpc(&Msg::Copy { src: "candidate".into(), dst: "backup".into() })
        .await
        .expect("copy");
    client
        .rpc(&change("candidate", "/cfg/domain", "y.se"))
        .await
        .expect("edit after copy");

    let backend = daemon.backend.lock();
    let snap = backend
        .datastores
        .get("backup", &"/cfg/domain".parse().expect("path"))
        .expect("snapshot");
    assert_eq!(snap.text(), Some("x.se"), "snapshot kept the value at copy time");
}
