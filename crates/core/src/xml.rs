// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Configuration tree nodes.
//!
//! An [`Xml`] node owns its subtree outright; subtrees handed out of a
//! datastore are deep copies. Equality ignores attribute order but
//! respects child order.

use quick_xml::events::Event;
use quick_xml::Reader;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::path::{Path, Step};
use crate::schema::Yspec;

/// Tag of the synthetic root element every datastore tree hangs off.
pub const ROOT_TAG: &str = "config";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum XmlError {
    #[error("xml parse error: {0}")]
    Parse(String),

    #[error("document has no root element")]
    NoRoot,

    #[error("document has more than one root element")]
    MultipleRoots,
}

/// Operation selector for datastore writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PutOp {
    Merge,
    Replace,
    Remove,
}

impl PutOp {
    pub fn as_str(self) -> &'static str {
        match self {
            PutOp::Merge => "merge",
            PutOp::Replace => "replace",
            PutOp::Remove => "remove",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "merge" => Some(PutOp::Merge),
            "replace" => Some(PutOp::Replace),
            "remove" => Some(PutOp::Remove),
            _ => None,
        }
    }
}

/// A configuration tree node: tag, ordered attributes, ordered children,
/// optional text body, and an optional schema pointer attached by the
/// validator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Xml {
    tag: String,
    attrs: Vec<(String, String)>,
    children: Vec<Xml>,
    text: Option<String>,
    #[serde(skip)]
    schema: Option<usize>,
}

impl PartialEq for Xml {
    fn eq(&self, other: &Self) -> bool {
        if self.tag != other.tag || self.text != other.text || self.children != other.children {
            return false;
        }
        // Attribute order is insignificant.
        let mut a = self.attrs.clone();
        let mut b = other.attrs.clone();
        a.sort();
        b.sort();
        a == b
    }
}

impl Eq for Xml {}

impl Xml {
    pub fn new(tag: impl Into<String>) -> Self {
        Self { tag: tag.into(), ..Default::default() }
    }

    pub fn with_text(tag: impl Into<String>, text: impl Into<String>) -> Self {
        let mut node = Self::new(tag);
        node.text = Some(text.into());
        node
    }

    /// An empty datastore tree.
    pub fn root() -> Self {
        Self::new(ROOT_TAG)
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = Some(text.into());
    }

    pub fn attrs(&self) -> &[(String, String)] {
        &self.attrs
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str())
    }

    /// Set an attribute, replacing any existing value under the same name.
    pub fn set_attr(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.attrs.iter_mut().find(|(k, _)| *k == name) {
            Some(slot) => slot.1 = value,
            None => self.attrs.push((name, value)),
        }
    }

    pub fn children(&self) -> &[Xml] {
        &self.children
    }

    pub fn children_mut(&mut self) -> &mut Vec<Xml> {
        &mut self.children
    }

    pub fn push(&mut self, child: Xml) {
        self.children.push(child);
    }

    /// First child with the given tag.
    pub fn child(&self, tag: &str) -> Option<&Xml> {
        self.children.iter().find(|c| c.tag == tag)
    }

    /// Text body of the first child with the given tag.
    pub fn child_text(&self, tag: &str) -> Option<&str> {
        self.child(tag).and_then(Xml::text)
    }

    pub fn schema(&self) -> Option<usize> {
        self.schema
    }

    pub fn set_schema(&mut self, idx: usize) {
        self.schema = Some(idx);
    }

    /// Resolve a path to a node, relative to this node as the tree root.
    pub fn get_at(&self, path: &Path) -> Option<&Xml> {
        let mut cur = self;
        for step in &path.steps {
            cur = cur.children.iter().find(|c| matches_step(c, step))?;
        }
        Some(cur)
    }

    fn get_at_mut(&mut self, path: &Path) -> Option<&mut Xml> {
        let mut cur = self;
        for step in &path.steps {
            cur = cur.children.iter_mut().find(|c| matches_step(c, step))?;
        }
        Some(cur)
    }

    /// Resolve a path, creating missing nodes along the way. A keyed step
    /// created here also gets its key leaf.
    pub fn ensure_path(&mut self, path: &Path) -> &mut Xml {
        let mut cur = self;
        for step in &path.steps {
            let idx = match cur.children.iter().position(|c| matches_step(c, step)) {
                Some(i) => i,
                None => {
                    let mut node = Xml::new(&step.tag);
                    if let Some((ref k, ref v)) = step.key {
                        node.push(Xml::with_text(k.clone(), v.clone()));
                    }
                    cur.children.push(node);
                    cur.children.len() - 1
                }
            };
            cur = &mut cur.children[idx];
        }
        cur
    }

    /// Delete the node addressed by the path. Returns whether a node was
    /// removed; a miss anywhere along the path is a no-op.
    pub fn remove_at(&mut self, path: &Path) -> bool {
        let Some(last) = path.last() else {
            // Removing the root clears the tree content.
            let had_content = !self.children.is_empty() || self.text.is_some();
            self.children.clear();
            self.text = None;
            return had_content;
        };
        let parent_path = match path.parent() {
            Some(p) => p,
            None => return false,
        };
        let Some(parent) = self.get_at_mut(&parent_path) else {
            return false;
        };
        match parent.children.iter().position(|c| matches_step(c, last)) {
            Some(i) => {
                parent.children.remove(i);
                true
            }
            None => false,
        }
    }

    /// Apply a single path-addressed edit (the CHANGE RPC).
    pub fn change(&mut self, op: PutOp, path: &Path, value: Option<&str>) {
        match op {
            PutOp::Merge => {
                let node = self.ensure_path(path);
                if let Some(v) = value {
                    node.set_text(v);
                }
            }
            PutOp::Replace => {
                self.remove_at(path);
                let node = self.ensure_path(path);
                if let Some(v) = value {
                    node.set_text(v);
                }
            }
            PutOp::Remove => {
                self.remove_at(path);
            }
        }
    }

    /// Apply a whole overlay tree (the storage `put` operation). Both
    /// trees are rooted at [`ROOT_TAG`]; list entries are matched by
    /// their schema-declared key leaves when a schema is given.
    pub fn apply(&mut self, op: PutOp, overlay: &Xml, yspec: Option<&Yspec>) {
        match op {
            PutOp::Merge => merge_node(self, overlay, yspec, None),
            PutOp::Replace => {
                for oc in &overlay.children {
                    let keys = list_keys(yspec, None, oc.tag());
                    self.children.retain(|bc| !same_entry(bc, oc, keys));
                    self.children.push(oc.clone());
                }
            }
            PutOp::Remove => remove_node(self, overlay, yspec, None),
        }
    }

    /// Serialize this subtree as a compact XML string.
    pub fn to_xml_string(&self) -> String {
        let mut out = String::new();
        write_node(self, &mut out);
        out
    }

    /// Parse a document into a tree. Exactly one root element is expected;
    /// declarations, comments and processing instructions are skipped.
    pub fn parse(input: &str) -> Result<Xml, XmlError> {
        let mut reader = Reader::from_str(input);
        reader.trim_text(true);
        let mut stack: Vec<Xml> = Vec::new();
        let mut root: Option<Xml> = None;
        loop {
            let event = reader.read_event().map_err(|e| XmlError::Parse(e.to_string()))?;
            match event {
                Event::Start(e) => {
                    stack.push(node_from_start(&e)?);
                }
                Event::Empty(e) => {
                    let node = node_from_start(&e)?;
                    attach(&mut stack, &mut root, node)?;
                }
                Event::End(_) => {
                    let node = stack.pop().ok_or_else(|| {
                        XmlError::Parse("unbalanced end tag".to_string())
                    })?;
                    attach(&mut stack, &mut root, node)?;
                }
                Event::Text(t) => {
                    let text = t.unescape().map_err(|e| XmlError::Parse(e.to_string()))?;
                    if let Some(top) = stack.last_mut() {
                        append_text(top, &text);
                    }
                }
                Event::CData(t) => {
                    let bytes = t.into_inner();
                    let text = std::str::from_utf8(&bytes)
                        .map_err(|e| XmlError::Parse(e.to_string()))?;
                    if let Some(top) = stack.last_mut() {
                        append_text(top, text);
                    }
                }
                Event::Eof => break,
                // Decl / Comment / PI / DocType carry no configuration data.
                _ => {}
            }
        }
        if !stack.is_empty() {
            return Err(XmlError::Parse("unclosed element".to_string()));
        }
        root.ok_or(XmlError::NoRoot)
    }
}

fn matches_step(node: &Xml, step: &Step) -> bool {
    node.tag == step.tag
        && match step.key {
            None => true,
            Some((ref k, ref v)) => node.child_text(k) == Some(v.as_str()),
        }
}

fn list_keys<'a>(yspec: Option<&'a Yspec>, sidx: Option<usize>, tag: &str) -> Option<&'a [String]> {
    let yspec = yspec?;
    let child = yspec.find_child(sidx, tag)?;
    yspec.list_keys(child)
}

/// Whether `a` and `b` denote the same tree entry: same tag, and for keyed
/// lists, the same key leaf values.
fn same_entry(a: &Xml, b: &Xml, keys: Option<&[String]>) -> bool {
    if a.tag != b.tag {
        return false;
    }
    match keys {
        Some(ks) if !ks.is_empty() => ks.iter().all(|k| a.child_text(k) == b.child_text(k)),
        _ => true,
    }
}

fn merge_node(base: &mut Xml, overlay: &Xml, yspec: Option<&Yspec>, sidx: Option<usize>) {
    for (k, v) in &overlay.attrs {
        base.set_attr(k.clone(), v.clone());
    }
    if overlay.text.is_some() {
        base.text = overlay.text.clone();
    }
    for oc in &overlay.children {
        let child_sidx = yspec.and_then(|y| y.find_child(sidx, oc.tag()));
        let keys = child_sidx.and_then(|i| yspec.and_then(|y| y.list_keys(i)));
        match base.children.iter().position(|bc| same_entry(bc, oc, keys)) {
            Some(i) => merge_node(&mut base.children[i], oc, yspec, child_sidx),
            None => base.children.push(oc.clone()),
        }
    }
}

fn remove_node(base: &mut Xml, overlay: &Xml, yspec: Option<&Yspec>, sidx: Option<usize>) {
    // Key leaves of this list entry are selectors, never removal targets.
    let own_keys = sidx.and_then(|i| yspec.and_then(|y| y.list_keys(i)));
    for oc in &overlay.children {
        if let Some(ks) = own_keys {
            if oc.children.is_empty() && ks.contains(&oc.tag) {
                continue;
            }
        }
        let child_sidx = yspec.and_then(|y| y.find_child(sidx, oc.tag()));
        let keys = child_sidx.and_then(|i| yspec.and_then(|y| y.list_keys(i)));
        if oc.children.is_empty() || is_key_skeleton(oc, keys) {
            base.children.retain(|bc| !same_entry(bc, oc, keys));
        } else if let Some(i) = base.children.iter().position(|bc| same_entry(bc, oc, keys)) {
            remove_node(&mut base.children[i], oc, yspec, child_sidx);
        }
    }
}

/// A list entry whose only content is its key leaves addresses the entry
/// itself, not a child of it.
fn is_key_skeleton(node: &Xml, keys: Option<&[String]>) -> bool {
    match keys {
        Some(ks) if !ks.is_empty() => node.children.iter().all(|c| ks.contains(&c.tag)),
        _ => false,
    }
}

fn node_from_start(e: &quick_xml::events::BytesStart<'_>) -> Result<Xml, XmlError> {
    let tag = std::str::from_utf8(e.name().as_ref())
        .map_err(|e| XmlError::Parse(e.to_string()))?
        .to_string();
    let mut node = Xml::new(tag);
    for attr in e.attributes() {
        let attr = attr.map_err(|e| XmlError::Parse(e.to_string()))?;
        let key = std::str::from_utf8(attr.key.as_ref())
            .map_err(|e| XmlError::Parse(e.to_string()))?
            .to_string();
        let value = attr.unescape_value().map_err(|e| XmlError::Parse(e.to_string()))?;
        node.attrs.push((key, value.into_owned()));
    }
    Ok(node)
}

fn attach(stack: &mut Vec<Xml>, root: &mut Option<Xml>, node: Xml) -> Result<(), XmlError> {
    match stack.last_mut() {
        Some(parent) => {
            parent.children.push(node);
            Ok(())
        }
        None => {
            if root.is_some() {
                return Err(XmlError::MultipleRoots);
            }
            *root = Some(node);
            Ok(())
        }
    }
}

fn append_text(node: &mut Xml, text: &str) {
    match node.text {
        Some(ref mut body) => body.push_str(text),
        None => node.text = Some(text.to_string()),
    }
}

fn write_node(node: &Xml, out: &mut String) {
    out.push('<');
    out.push_str(&node.tag);
    for (k, v) in &node.attrs {
        out.push(' ');
        out.push_str(k);
        out.push_str("=\"");
        out.push_str(&escape(v));
        out.push('"');
    }
    if node.children.is_empty() && node.text.is_none() {
        out.push_str("/>");
        return;
    }
    out.push('>');
    if let Some(ref text) = node.text {
        out.push_str(&escape(text));
    }
    for child in &node.children {
        write_node(child, out);
    }
    out.push_str("</");
    out.push_str(&node.tag);
    out.push('>');
}

/// Escape markup-significant characters for element and attribute content.
pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
#[path = "xml_tests.rs"]
mod tests;
