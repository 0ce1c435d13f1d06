// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The schema handle (`yspec`).
//!
//! Produced once at startup by the loader and treated as immutable for the
//! daemon's lifetime. The bundled loader reads a compact XML module
//! description; a full YANG compiler is out of scope and plugs in behind
//! [`load_yspec`].

use std::path::Path as FsPath;

use thiserror::Error;

use crate::error::RpcError;
use crate::xml::{Xml, XmlError};

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("schema module {0}: {1}")]
    Io(String, std::io::Error),

    #[error("schema parse: {0}")]
    Xml(#[from] XmlError),

    #[error("schema: {0}")]
    Invalid(String),
}

/// What a schema node models.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaKind {
    /// Single-instance interior node.
    Container,
    /// Multi-instance node, entries distinguished by key leaves.
    List { keys: Vec<String> },
    /// Terminal node carrying a text value.
    Leaf,
}

#[derive(Debug, Clone)]
struct SchemaNode {
    name: String,
    kind: SchemaKind,
    children: Vec<usize>,
}

/// Immutable schema for one module. Nodes live in an arena; the indices
/// double as the schema pointers attached to configuration tree nodes.
#[derive(Debug, Clone)]
pub struct Yspec {
    module: String,
    nodes: Vec<SchemaNode>,
    roots: Vec<usize>,
}

impl Yspec {
    pub fn module(&self) -> &str {
        &self.module
    }

    /// Child schema node of `parent` (or a root node when `parent` is
    /// `None`) with the given name.
    pub fn find_child(&self, parent: Option<usize>, name: &str) -> Option<usize> {
        let candidates = match parent {
            Some(idx) => &self.nodes[idx].children,
            None => &self.roots,
        };
        candidates.iter().copied().find(|&i| self.nodes[i].name == name)
    }

    pub fn kind(&self, idx: usize) -> &SchemaKind {
        &self.nodes[idx].kind
    }

    pub fn name(&self, idx: usize) -> &str {
        &self.nodes[idx].name
    }

    /// Key leaf names when `idx` is a list node.
    pub fn list_keys(&self, idx: usize) -> Option<&[String]> {
        match self.nodes[idx].kind {
            SchemaKind::List { ref keys } => Some(keys),
            _ => None,
        }
    }

    /// Check a datastore tree against the schema, attaching schema
    /// pointers to every validated node.
    pub fn validate(&self, root: &mut Xml) -> Result<(), RpcError> {
        self.validate_children(root, None, "")
    }

    fn validate_children(
        &self,
        node: &mut Xml,
        sidx: Option<usize>,
        path: &str,
    ) -> Result<(), RpcError> {
        for child in node.children_mut() {
            let tag = child.tag().to_string();
            let child_path = format!("{path}/{tag}");
            let Some(cidx) = self.find_child(sidx, &tag) else {
                return Err(RpcError::application(
                    "unknown-element",
                    Some(&child_path),
                    format!("element {tag} not found in module {}", self.module),
                ));
            };
            child.set_schema(cidx);
            match self.nodes[cidx].kind {
                SchemaKind::Leaf => {
                    if !child.children().is_empty() {
                        return Err(RpcError::application(
                            "bad-element",
                            Some(&child_path),
                            format!("leaf {tag} must not have child elements"),
                        ));
                    }
                }
                SchemaKind::List { ref keys } => {
                    for key in keys {
                        if child.child_text(key).is_none() {
                            return Err(RpcError::application(
                                "missing-element",
                                Some(&child_path),
                                format!("list {tag} entry is missing key leaf {key}"),
                            ));
                        }
                    }
                    self.validate_children(child, Some(cidx), &child_path)?;
                }
                SchemaKind::Container => {
                    self.validate_children(child, Some(cidx), &child_path)?;
                }
            }
        }
        Ok(())
    }

    /// Build from a parsed module description:
    ///
    /// ```xml
    /// <module name="cfg">
    ///   <container name="cfg">
    ///     <list name="host"><key>name</key><leaf name="name"/></list>
    ///   </container>
    /// </module>
    /// ```
    pub fn from_xml(doc: &Xml) -> Result<Self, SchemaError> {
        if doc.tag() != "module" {
            return Err(SchemaError::Invalid(format!(
                "expected <module>, found <{}>",
                doc.tag()
            )));
        }
        let module = doc
            .attr("name")
            .ok_or_else(|| SchemaError::Invalid("<module> requires a name attribute".to_string()))?
            .to_string();
        let mut spec = Yspec { module, nodes: Vec::new(), roots: Vec::new() };
        for child in doc.children() {
            let idx = spec.build_node(child)?;
            spec.roots.push(idx);
        }
        Ok(spec)
    }

    fn build_node(&mut self, node: &Xml) -> Result<usize, SchemaError> {
        let name = node
            .attr("name")
            .ok_or_else(|| {
                SchemaError::Invalid(format!("<{}> requires a name attribute", node.tag()))
            })?
            .to_string();
        let kind = match node.tag() {
            "container" => SchemaKind::Container,
            "leaf" => SchemaKind::Leaf,
            "list" => {
                let keys: Vec<String> = node
                    .children()
                    .iter()
                    .filter(|c| c.tag() == "key")
                    .filter_map(|c| c.text().map(str::to_string))
                    .collect();
                if keys.is_empty() {
                    return Err(SchemaError::Invalid(format!("list {name} has no <key>")));
                }
                SchemaKind::List { keys }
            }
            other => {
                return Err(SchemaError::Invalid(format!("unknown schema element <{other}>")));
            }
        };
        let slot = self.nodes.len();
        self.nodes.push(SchemaNode { name, kind, children: Vec::new() });
        for child in node.children() {
            if child.tag() == "key" {
                continue;
            }
            let cidx = self.build_node(child)?;
            self.nodes[slot].children.push(cidx);
        }
        Ok(slot)
    }

    /// Human-readable dump of the schema tree (the `-p` flag).
    pub fn describe(&self) -> String {
        let mut out = format!("module {}\n", self.module);
        for &root in &self.roots {
            self.describe_node(root, 1, &mut out);
        }
        out
    }

    fn describe_node(&self, idx: usize, depth: usize, out: &mut String) {
        let node = &self.nodes[idx];
        out.push_str(&"  ".repeat(depth));
        match node.kind {
            SchemaKind::Container => out.push_str(&format!("container {}\n", node.name)),
            SchemaKind::Leaf => out.push_str(&format!("leaf {}\n", node.name)),
            SchemaKind::List { ref keys } => {
                out.push_str(&format!("list {} key {}\n", node.name, keys.join(" ")))
            }
        }
        for &child in &node.children {
            self.describe_node(child, depth + 1, out);
        }
    }
}

/// Load a module's schema from `<dir>/<module>.xml`.
pub fn load_yspec(module: &str, dir: &FsPath) -> Result<Yspec, SchemaError> {
    let path = dir.join(format!("{module}.xml"));
    let content = std::fs::read_to_string(&path)
        .map_err(|e| SchemaError::Io(path.display().to_string(), e))?;
    let doc = Xml::parse(&content)?;
    Yspec::from_xml(&doc)
}

#[cfg(test)]
#[path = "schema_tests.rs"]
mod tests;
