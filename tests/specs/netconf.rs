// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The NETCONF frontend against a live backend: hello, edit-config,
//! commit, get-config.

use helm_netconf::{Frontend, Outcome};
use helm_wire::SentinelDecoder;

use crate::prelude::*;

async fn frontend_for(daemon: &TestDaemon) -> Frontend<helm_wire::BackendClient> {
    let client = daemon.client().await;
    Frontend::new(client, std::process::id())
}

#[tokio::test]
async fn hello_then_edit_config_then_commit() {
    let daemon = TestDaemon::start().await;
    let mut frontend = frontend_for(&daemon).await;

    // The frontend advertises its hello first.
    let hello = frontend.hello();
    assert!(hello.contains("urn:ietf:params:netconf:base:1.0"));

    // Peer hello draws no reply.
    let peer_hello = "<?xml version=\"1.0\" encoding=\"UTF-8\"?><hello><capabilities>\
        <capability>urn:ietf:params:netconf:base:1.0</capability></capabilities></hello>";
    assert_eq!(frontend.process(peer_hello).await, Outcome::NoReply);

    let edit = "<rpc message-id=\"1\"><edit-config><target><candidate/></target>\
        <config><cfg><host><name>h1</name><addr>10.0.0.1</addr></host></cfg></config>\
        </edit-config></rpc>";
    match frontend.process(edit).await {
        Outcome::Reply(reply) => {
            assert_eq!(reply, "<rpc-reply message-id=\"1\"><ok/></rpc-reply>");
        }
        other => panic!("unexpected outcome: {other:?}"),
    }

    match frontend.process("<rpc message-id=\"2\"><commit/></rpc>").await {
        Outcome::Reply(reply) => {
            assert_eq!(reply, "<rpc-reply message-id=\"2\"><ok/></rpc-reply>");
        }
        other => panic!("unexpected outcome: {other:?}"),
    }

    let running = daemon.backend.lock().datastores.get_tree("running").expect("running");
    let addr = running
        .get_at(&"/cfg/host[name=h1]/addr".parse().expect("path"))
        .expect("committed");
    assert_eq!(addr.text(), Some("10.0.0.1"));
}

#[tokio::test]
async fn get_config_returns_the_committed_data() {
    let daemon = TestDaemon::start().await;
    let mut seed = daemon.client().await;
    seed.rpc(&change("candidate", "/cfg/domain", "x.se")).await.expect("seed");
    seed.rpc(&Msg::Commit { db: "running".into() }).await.expect("commit");

    let mut frontend = frontend_for(&daemon).await;
    let reply = match frontend
        .process("<rpc message-id=\"5\"><get-config><source><running/></source></get-config></rpc>")
        .await
    {
        Outcome::Reply(reply) => reply,
        other => panic!("unexpected outcome: {other:?}"),
    };
    assert_eq!(
        reply,
        "<rpc-reply message-id=\"5\"><data><cfg><domain>x.se</domain></cfg></data></rpc-reply>"
    );
}

#[tokio::test]
async fn discard_changes_resets_candidate_to_running() {
    let daemon = TestDaemon::start().await;
    let mut frontend = frontend_for(&daemon).await;
    let edit = "<rpc message-id=\"1\"><edit-config><target><candidate/></target>\
        <config><cfg><domain>scratch.se</domain></cfg></config></edit-config></rpc>";
    frontend.process(edit).await;
    frontend.process("<rpc message-id=\"2\"><discard-changes/></rpc>").await;

    let backend = daemon.backend.lock();
    assert_eq!(
        backend.datastores.get_tree("candidate").expect("candidate"),
        backend.datastores.get_tree("running").expect("running"),
    );
}

#[tokio::test]
async fn sentinel_framing_survives_arbitrary_chunking() {
    // A full inbound session: hello then two rpcs, split at every third
    // byte as if dribbling in over a slow transport.
    let stream = b"<hello/>]]>]]><rpc message-id=\"1\"><lock><target><candidate/></target></lock></rpc>]]>]]><rpc message-id=\"2\"><unlock><target><candidate/></target></unlock></rpc>]]>]]>";
    let mut decoder = SentinelDecoder::new();
    let mut docs = Vec::new();
    for chunk in stream.chunks(3) {
        docs.extend(decoder.push(chunk));
    }
    assert_eq!(docs.len(), 3);

    let daemon = TestDaemon::start().await;
    let mut frontend = frontend_for(&daemon).await;
    assert_eq!(frontend.process(&docs[0]).await, Outcome::NoReply);
    for doc in &docs[1..] {
        match frontend.process(doc).await {
            Outcome::Reply(reply) => assert!(reply.contains("<ok/>"), "{reply}"),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }
}
