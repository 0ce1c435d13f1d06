// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The NETCONF hello exchange.

use helm_core::Xml;

/// The only base capability this frontend speaks.
pub const BASE_CAPABILITY: &str = "urn:ietf:params:netconf:base:1.0";

/// The outbound `<hello>`: base capability plus our session id (the
/// frontend's pid).
pub fn create_hello(session_id: u32) -> String {
    format!(
        "<hello xmlns=\"urn:ietf:params:xml:ns:netconf:base:1.0\">\
           <capabilities>\
             <capability>{BASE_CAPABILITY}</capability>\
           </capabilities>\
           <session-id>{session_id}</session-id>\
         </hello>"
    )
}

/// Capability URIs advertised by the peer's `<hello>`.
pub fn peer_capabilities(doc: &Xml) -> Vec<String> {
    let Some(caps) = doc.child("capabilities") else {
        return Vec::new();
    };
    caps.children()
        .iter()
        .filter(|c| c.tag() == "capability")
        .filter_map(|c| c.text().map(str::to_string))
        .collect()
}

#[cfg(test)]
#[path = "hello_tests.rs"]
mod tests;
