// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Client connect and round-trip behavior against a scripted peer.

use super::*;
use crate::frame::{read_msg, write_msg};
use crate::msg::Msg;
use helm_core::ErrClass;
use std::path::PathBuf;
use tokio::net::{UnixListener, UnixStream};

#[tokio::test]
async fn connect_reports_backend_not_running() {
    let err = BackendClient::connect(&PathBuf::from("/nonexistent/helm.sock"))
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::NotRunning(_)));
}

#[tokio::test]
async fn connect_rejects_non_socket_path() {
    let file = tempfile::NamedTempFile::new().unwrap();
    let err = BackendClient::connect(file.path()).await.unwrap_err();
    assert!(matches!(err, ClientError::NotASocket { .. }));
}

async fn connected_pair() -> (BackendClient, UnixStream) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("helm.sock");
    let listener = UnixListener::bind(&path).unwrap();
    let (client, accepted) = tokio::join!(BackendClient::connect(&path), listener.accept());
    (client.unwrap(), accepted.unwrap().0)
}

#[tokio::test]
async fn rpc_returns_ok_payload() {
    let (mut client, mut server) = connected_pair().await;
    let server_task = tokio::spawn(async move {
        let req = read_msg(&mut server).await.unwrap();
        assert_eq!(req, Msg::Rm { db: "tmp".to_string() });
        write_msg(&mut server, &Msg::Ok { data: b"done".to_vec() }).await.unwrap();
    });
    let data = client.rpc(&Msg::Rm { db: "tmp".to_string() }).await.unwrap();
    assert_eq!(data, b"done");
    server_task.await.unwrap();
}

#[tokio::test]
async fn rpc_surfaces_err_frames_as_backend_errors() {
    let (mut client, mut server) = connected_pair().await;
    let server_task = tokio::spawn(async move {
        let _ = read_msg(&mut server).await.unwrap();
        let reply = Msg::Err {
            class: ErrClass::Database,
            sub: 2,
            reason: "candidate: no such datastore".to_string(),
        };
        write_msg(&mut server, &reply).await.unwrap();
    });
    let err = client.rpc(&Msg::Lock { db: "candidate".to_string() }).await.unwrap_err();
    match err {
        ClientError::Backend(e) => {
            assert_eq!(e.class, ErrClass::Database);
            assert_eq!(e.sub, 2);
        }
        other => panic!("unexpected error: {other}"),
    }
    server_task.await.unwrap();
}

#[tokio::test]
async fn rpc_skips_interleaved_notifications() {
    let (mut client, mut server) = connected_pair().await;
    let server_task = tokio::spawn(async move {
        let _ = read_msg(&mut server).await.unwrap();
        let notify = Msg::Notify { level: 6, payload: "unrelated".to_string() };
        write_msg(&mut server, &notify).await.unwrap();
        write_msg(&mut server, &Msg::ok()).await.unwrap();
    });
    let data = client.rpc(&Msg::Validate { db: "candidate".to_string() }).await.unwrap();
    assert!(data.is_empty());
    server_task.await.unwrap();
}

#[tokio::test]
async fn closed_socket_mid_rpc_is_reported() {
    let (mut client, server) = connected_pair().await;
    drop(server);
    let err = client.rpc(&Msg::Debug { level: 1 }).await.unwrap_err();
    assert!(matches!(err, ClientError::Closed | ClientError::Protocol(_)));
}

#[tokio::test]
async fn read_notify_returns_level_and_payload() {
    let (mut client, mut server) = connected_pair().await;
    let notify = Msg::Notify { level: 4, payload: "backend: 1 Started".to_string() };
    write_msg(&mut server, &notify).await.unwrap();
    let (level, payload) = client.read_notify().await.unwrap();
    assert_eq!(level, 4);
    assert_eq!(payload, "backend: 1 Started");
}
