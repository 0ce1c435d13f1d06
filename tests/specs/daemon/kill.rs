// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! KILL destroys a session at the next frame boundary and frees its
//! locks.

use helm_wire::ClientError;

use crate::prelude::*;

#[tokio::test]
async fn killed_session_loses_socket_and_locks() {
    let daemon = TestDaemon::start().await;

    let mut victim = daemon.client().await;
    victim.rpc(&Msg::Lock { db: "candidate".into() }).await.expect("victim locks");
    let victim_sid = daemon.backend.lock().locks.holder("candidate").expect("holder");

    let mut operator = daemon.client().await;
    daemon.wait_for_sessions(2).await;
    operator.rpc(&Msg::Kill { session: victim_sid }).await.expect("kill");

    daemon.wait_for_sessions(1).await;
    assert_eq!(daemon.backend.lock().locks.holder("candidate"), None, "lock released");

    let err = victim
        .rpc(&Msg::Lock { db: "running".into() })
        .await
        .expect_err("victim socket closed");
    assert!(matches!(err, ClientError::Closed | ClientError::Protocol(_)));

    // Another session can now take the lock.
    operator.rpc(&Msg::Lock { db: "candidate".into() }).await.expect("relock");
}
