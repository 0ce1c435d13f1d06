// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use helm_core::Xml;

use super::*;

#[test]
fn hello_advertises_base_capability_and_session_id() {
    let hello = create_hello(4711);
    let doc = Xml::parse(&hello).unwrap();
    assert_eq!(doc.tag(), "hello");
    assert_eq!(doc.child_text("session-id"), Some("4711"));
    let caps = peer_capabilities(&doc);
    assert_eq!(caps, vec![BASE_CAPABILITY.to_string()]);
}

#[test]
fn peer_capabilities_of_capless_hello_are_empty() {
    let doc = Xml::parse("<hello/>").unwrap();
    assert!(peer_capabilities(&doc).is_empty());
}
