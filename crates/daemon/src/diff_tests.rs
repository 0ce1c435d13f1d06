// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use helm_core::{Xml, Yspec};

use super::*;

fn yspec() -> Yspec {
    let doc = Xml::parse(
        "<module name=\"cfg\">\
           <container name=\"cfg\">\
             <list name=\"host\"><key>name</key>\
               <leaf name=\"name\"/><leaf name=\"addr\"/>\
             </list>\
             <leaf name=\"domain\"/>\
           </container>\
         </module>",
    )
    .unwrap();
    Yspec::from_xml(&doc).unwrap()
}

fn tree(s: &str) -> Xml {
    Xml::parse(s).unwrap()
}

#[test]
fn equal_trees_yield_empty_set() {
    let spec = yspec();
    let a = tree("<config><cfg><host><name>h1</name><addr>a</addr></host></cfg></config>");
    assert!(diff(&spec, &a, &a.clone()).is_empty());
}

#[test]
fn added_subtree_is_one_change() {
    let spec = yspec();
    let old = tree("<config/>");
    let new = tree("<config><cfg><host><name>h1</name><addr>a</addr></host></cfg></config>");
    let changes = diff(&spec, &old, &new);
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0].op, ChangeOp::Add);
    assert_eq!(changes[0].path.to_string(), "/cfg");
    assert!(changes[0].old.is_none());
}

#[test]
fn modified_leaf_reports_old_and_new() {
    let spec = yspec();
    let old = tree("<config><cfg><host><name>h1</name><addr>a</addr></host></cfg></config>");
    let new = tree("<config><cfg><host><name>h1</name><addr>b</addr></host></cfg></config>");
    let changes = diff(&spec, &old, &new);
    assert_eq!(changes.len(), 1);
    let change = &changes[0];
    assert_eq!(change.op, ChangeOp::Modify);
    assert_eq!(change.path.to_string(), "/cfg/host[name=h1]/addr");
    assert_eq!(change.old.as_ref().unwrap().text(), Some("a"));
    assert_eq!(change.new.as_ref().unwrap().text(), Some("b"));
}

#[test]
fn list_entries_are_matched_by_key_not_position() {
    let spec = yspec();
    let old = tree(
        "<config><cfg>\
           <host><name>h1</name><addr>a</addr></host>\
           <host><name>h2</name><addr>b</addr></host>\
         </cfg></config>",
    );
    let new = tree(
        "<config><cfg>\
           <host><name>h2</name><addr>b</addr></host>\
           <host><name>h1</name><addr>a</addr></host>\
         </cfg></config>",
    );
    // Same entries, different order: no content changes.
    assert!(diff(&spec, &old, &new).is_empty());
}

#[test]
fn deletes_precede_adds_at_each_level() {
    let spec = yspec();
    let old = tree("<config><cfg><host><name>h1</name></host></cfg></config>");
    let new = tree("<config><cfg><host><name>h2</name></host></cfg></config>");
    let changes = diff(&spec, &old, &new);
    assert_eq!(changes.len(), 2);
    assert_eq!(changes[0].op, ChangeOp::Delete);
    assert_eq!(changes[0].path.to_string(), "/cfg/host[name=h1]");
    assert_eq!(changes[1].op, ChangeOp::Add);
    assert_eq!(changes[1].path.to_string(), "/cfg/host[name=h2]");
}

#[test]
fn unkeyed_leaf_change_uses_plain_step() {
    let spec = yspec();
    let old = tree("<config><cfg><domain>x.se</domain></cfg></config>");
    let new = tree("<config><cfg><domain>y.se</domain></cfg></config>");
    let changes = diff(&spec, &old, &new);
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0].path.to_string(), "/cfg/domain");
}
