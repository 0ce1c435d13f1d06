// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Schema-directed tree diff.
//!
//! Produces the ordered change set the commit engine hands to plugins.
//! The diff is stable: syntactically equal trees yield the empty set.

use helm_core::{Path, Step, Xml, Yspec};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeOp {
    Add,
    Delete,
    Modify,
}

/// One entry of a change set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
    pub path: Path,
    pub op: ChangeOp,
    pub old: Option<Xml>,
    pub new: Option<Xml>,
}

/// Compare two datastore trees. Per level, deletions come first in old
/// order, then additions and modifications in new order; recursion is
/// depth-first. An added or deleted subtree is reported as one change.
pub fn diff(yspec: &Yspec, old: &Xml, new: &Xml) -> Vec<Change> {
    let mut out = Vec::new();
    diff_children(yspec, None, &Path::root(), old, new, &mut out);
    out
}

fn diff_children(
    yspec: &Yspec,
    sidx: Option<usize>,
    base: &Path,
    old: &Xml,
    new: &Xml,
    out: &mut Vec<Change>,
) {
    for oc in old.children() {
        let keys = entry_keys(yspec, sidx, oc.tag());
        if !new.children().iter().any(|nc| same_entry(oc, nc, keys)) {
            out.push(Change {
                path: base.join(entry_step(oc, keys)),
                op: ChangeOp::Delete,
                old: Some(oc.clone()),
                new: None,
            });
        }
    }
    for nc in new.children() {
        let keys = entry_keys(yspec, sidx, nc.tag());
        let step = entry_step(nc, keys);
        let path = base.join(step);
        match old.children().iter().find(|oc| same_entry(oc, nc, keys)) {
            None => {
                out.push(Change { path, op: ChangeOp::Add, old: None, new: Some(nc.clone()) });
            }
            Some(oc) => {
                if oc.text() != nc.text() {
                    out.push(Change {
                        path: path.clone(),
                        op: ChangeOp::Modify,
                        old: Some(oc.clone()),
                        new: Some(nc.clone()),
                    });
                }
                let child_sidx = yspec.find_child(sidx, nc.tag());
                diff_children(yspec, child_sidx, &path, oc, nc, out);
            }
        }
    }
}

fn entry_keys<'a>(yspec: &'a Yspec, sidx: Option<usize>, tag: &str) -> Option<&'a [String]> {
    yspec.find_child(sidx, tag).and_then(|i| yspec.list_keys(i))
}

fn same_entry(a: &Xml, b: &Xml, keys: Option<&[String]>) -> bool {
    if a.tag() != b.tag() {
        return false;
    }
    match keys {
        Some(ks) if !ks.is_empty() => ks.iter().all(|k| a.child_text(k) == b.child_text(k)),
        _ => true,
    }
}

fn entry_step(node: &Xml, keys: Option<&[String]>) -> Step {
    match keys.and_then(|ks| ks.first()) {
        Some(key) => match node.child_text(key) {
            Some(value) => Step::keyed(node.tag(), key.clone(), value),
            None => Step::new(node.tag()),
        },
        None => Step::new(node.tag()),
    }
}

#[cfg(test)]
#[path = "diff_tests.rs"]
mod tests;
