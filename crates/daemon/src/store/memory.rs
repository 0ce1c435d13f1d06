// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory storage. Same semantics as the file store, no durability.

use std::collections::HashMap;
use std::sync::Arc;

use helm_core::{Path, PutOp, Xml, Yspec};

use super::{check_db_name, StoreError, StorePlugin};

#[derive(Default)]
pub struct MemStore {
    trees: HashMap<String, Xml>,
    yspec: Option<Arc<Yspec>>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StorePlugin for MemStore {
    fn name(&self) -> &'static str {
        "mem"
    }

    fn connect(&mut self, yspec: Arc<Yspec>) -> Result<(), StoreError> {
        self.yspec = Some(yspec);
        Ok(())
    }

    fn disconnect(&mut self) {
        self.trees.clear();
        self.yspec = None;
    }

    fn setopt(&mut self, name: &str, _value: &str) -> Result<(), StoreError> {
        Err(StoreError::BadOption(name.to_string()))
    }

    fn exists(&self, db: &str) -> Result<bool, StoreError> {
        check_db_name(db)?;
        Ok(self.trees.contains_key(db))
    }

    fn create(&mut self, db: &str) -> Result<(), StoreError> {
        check_db_name(db)?;
        self.trees.insert(db.to_string(), Xml::root());
        Ok(())
    }

    fn delete(&mut self, db: &str) -> Result<(), StoreError> {
        check_db_name(db)?;
        match self.trees.remove(db) {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound(db.to_string())),
        }
    }

    fn copy(&mut self, src: &str, dst: &str) -> Result<(), StoreError> {
        check_db_name(dst)?;
        let tree = self
            .trees
            .get(src)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(src.to_string()))?;
        self.trees.insert(dst.to_string(), tree);
        Ok(())
    }

    fn get(&self, db: &str, path: &Path) -> Result<Xml, StoreError> {
        let tree = self.trees.get(db).ok_or_else(|| StoreError::NotFound(db.to_string()))?;
        match tree.get_at(path) {
            Some(node) => Ok(node.clone()),
            None => Err(StoreError::NotFound(format!("{db}{path}"))),
        }
    }

    fn put(&mut self, db: &str, op: PutOp, overlay: &Xml) -> Result<(), StoreError> {
        let yspec = self.yspec.clone();
        let tree = self.trees.get_mut(db).ok_or_else(|| StoreError::NotFound(db.to_string()))?;
        tree.apply(op, overlay, yspec.as_deref());
        Ok(())
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
