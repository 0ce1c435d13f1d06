// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lock denial reports the holder; disconnect releases.

use helm_wire::ClientError;

use crate::prelude::*;

#[tokio::test]
async fn lock_denied_names_the_holder_then_clears_on_disconnect() {
    let daemon = TestDaemon::start().await;

    let mut a = daemon.client().await;
    a.rpc(&Msg::Lock { db: "candidate".into() }).await.expect("a locks");
    let holder = daemon.backend.lock().locks.holder("candidate").expect("holder");

    let mut b = daemon.client().await;
    let err = b
        .rpc(&Msg::Lock { db: "candidate".into() })
        .await
        .expect_err("b must be denied");
    match err {
        ClientError::Backend(e) => {
            assert!(e.reason.contains("lock-denied"));
            assert_eq!(e.sub, holder, "sub-error carries the holder session id");
        }
        other => panic!("unexpected error: {other}"),
    }

    // A disconnects; after the backend reaps the session, B succeeds.
    drop(a);
    daemon.wait_for_sessions(1).await;
    b.rpc(&Msg::Lock { db: "candidate".into() }).await.expect("b retries");
}

#[tokio::test]
async fn writes_to_a_locked_datastore_are_denied() {
    let daemon = TestDaemon::start().await;
    let mut a = daemon.client().await;
    a.rpc(&Msg::Lock { db: "candidate".into() }).await.expect("a locks");

    let mut b = daemon.client().await;
    let err = b
        .rpc(&change("candidate", "/cfg/domain", "x.se"))
        .await
        .expect_err("write denied");
    assert!(matches!(err, ClientError::Backend(_)));

    // The holder itself may write.
    a.rpc(&change("candidate", "/cfg/domain", "x.se")).await.expect("holder writes");
}
