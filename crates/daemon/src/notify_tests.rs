// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use tracing_subscriber::layer::SubscriberExt;

use super::*;

#[test]
fn subscription_order_is_preserved() {
    let mut bus = NotifyBus::new();
    bus.subscribe("CLICON", 3);
    bus.subscribe("CLICON", 1);
    bus.subscribe("CLICON", 2);
    assert_eq!(bus.subscribers("CLICON"), &[3, 1, 2]);
}

#[test]
fn resubscription_is_a_noop() {
    let mut bus = NotifyBus::new();
    bus.subscribe("CLICON", 1);
    bus.subscribe("CLICON", 1);
    assert_eq!(bus.subscribers("CLICON"), &[1]);
}

#[test]
fn unsubscribe_session_clears_all_streams() {
    let mut bus = NotifyBus::new();
    bus.subscribe("CLICON", 1);
    bus.subscribe("alarms", 1);
    bus.subscribe("alarms", 2);
    bus.unsubscribe_session(1);
    assert!(bus.subscribers("CLICON").is_empty());
    assert_eq!(bus.subscribers("alarms"), &[2]);
}

#[test]
fn unknown_stream_has_no_subscribers() {
    let bus = NotifyBus::new();
    assert!(bus.subscribers("nope").is_empty());
}

#[test]
fn percent_is_doubled() {
    assert_eq!(escape_percent("load 80%"), "load 80%%");
    assert_eq!(escape_percent("no escapes"), "no escapes");
    assert_eq!(escape_percent("%%"), "%%%%");
}

#[test]
fn layer_forwards_info_and_above_only() {
    let (layer, mut rx) = NotifyLayer::new();
    let subscriber = tracing_subscriber::registry().with(layer);
    tracing::subscriber::with_default(subscriber, || {
        tracing::info!("backend started");
        tracing::debug!("noisy detail");
        tracing::warn!("watch out");
    });

    let (level, line) = rx.try_recv().unwrap();
    assert_eq!(level, 6);
    assert!(line.contains("backend started"));

    let (level, line) = rx.try_recv().unwrap();
    assert_eq!(level, 4);
    assert!(line.contains("watch out"));

    assert!(rx.try_recv().is_err(), "debug events must not be forwarded");
}
