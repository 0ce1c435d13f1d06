// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Datastore manager: named configuration trees over a storage plugin.
//!
//! All operations are synchronous; atomicity and durability belong to the
//! plugin. Write serialization against other sessions is the caller's job
//! (the lock manager), not this module's.

use std::sync::Arc;

use helm_core::{BackendError, ErrClass, Path, PutOp, Xml, Yspec};
use tracing::debug;

use crate::store::{StoreError, StorePlugin};

pub struct Datastores {
    store: Box<dyn StorePlugin>,
    yspec: Arc<Yspec>,
}

impl Datastores {
    /// Connect the storage plugin and hand it the schema.
    pub fn new(mut store: Box<dyn StorePlugin>, yspec: Arc<Yspec>) -> Result<Self, BackendError> {
        store.connect(Arc::clone(&yspec)).map_err(db_err)?;
        Ok(Self { store, yspec })
    }

    pub fn yspec(&self) -> &Arc<Yspec> {
        &self.yspec
    }

    pub fn store_name(&self) -> &'static str {
        self.store.name()
    }

    pub fn disconnect(&mut self) {
        self.store.disconnect();
    }

    pub fn exists(&self, db: &str) -> Result<bool, BackendError> {
        self.store.exists(db).map_err(db_err)
    }

    /// Create a datastore. Creating one that already exists is an error.
    pub fn create(&mut self, db: &str) -> Result<(), BackendError> {
        if self.store.exists(db).map_err(db_err)? {
            return Err(BackendError::msg(
                ErrClass::Database,
                format!("{db}: datastore already exists"),
            ));
        }
        self.store.create(db).map_err(db_err)
    }

    /// Delete a datastore. Deleting a missing one succeeds; every other
    /// storage failure propagates.
    pub fn delete(&mut self, db: &str) -> Result<(), BackendError> {
        match self.store.delete(db) {
            Ok(()) => Ok(()),
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) => Err(db_err(e)),
        }
    }

    /// Delete-if-present then create empty.
    pub fn reset(&mut self, db: &str) -> Result<(), BackendError> {
        debug!(db, "reset datastore");
        self.delete(db)?;
        self.store.create(db).map_err(db_err)
    }

    pub fn copy(&mut self, src: &str, dst: &str) -> Result<(), BackendError> {
        self.store.copy(src, dst).map_err(db_err)
    }

    /// Owned copy of the subtree at `path`.
    pub fn get(&self, db: &str, path: &Path) -> Result<Xml, BackendError> {
        self.store.get(db, path).map_err(db_err)
    }

    /// The whole tree of a datastore.
    pub fn get_tree(&self, db: &str) -> Result<Xml, BackendError> {
        self.get(db, &Path::root())
    }

    pub fn put(&mut self, db: &str, op: PutOp, tree: &Xml) -> Result<(), BackendError> {
        self.store.put(db, op, tree).map_err(db_err)
    }

    /// Apply a single path-addressed edit (the CHANGE RPC). A replace is
    /// expressed as remove-then-merge so it works at any depth.
    pub fn change(
        &mut self,
        db: &str,
        op: PutOp,
        path: &Path,
        value: Option<&str>,
    ) -> Result<(), BackendError> {
        match op {
            PutOp::Merge => {
                let overlay = skeleton(path, value);
                self.put(db, PutOp::Merge, &overlay)
            }
            PutOp::Remove => {
                let overlay = skeleton(path, None);
                self.put(db, PutOp::Remove, &overlay)
            }
            PutOp::Replace => {
                self.put(db, PutOp::Remove, &skeleton(path, None))?;
                self.put(db, PutOp::Merge, &skeleton(path, value))
            }
        }
    }

    /// Dump a datastore to a file as one XML document.
    pub fn save_file(&self, db: &str, file: &std::path::Path) -> Result<(), BackendError> {
        let tree = self.get_tree(db)?;
        std::fs::write(file, tree.to_xml_string())
            .map_err(|e| BackendError::io(ErrClass::Unix, &file.display().to_string(), &e))
    }

    /// Replace a datastore's content from an XML document on disk.
    pub fn load_file(&mut self, db: &str, file: &std::path::Path) -> Result<(), BackendError> {
        let tree = read_doc(file)?;
        self.reset(db)?;
        self.put(db, PutOp::Merge, &tree)
    }

    /// Merge an XML document on disk into a datastore's existing content.
    pub fn load_merge(&mut self, db: &str, file: &std::path::Path) -> Result<(), BackendError> {
        let tree = read_doc(file)?;
        self.put(db, PutOp::Merge, &tree)
    }
}

/// Build the minimal overlay tree that addresses `path`, optionally with
/// a text value on the final node.
fn skeleton(path: &Path, value: Option<&str>) -> Xml {
    let mut root = Xml::root();
    let node = root.ensure_path(path);
    if let Some(v) = value {
        node.set_text(v);
    }
    root
}

fn read_doc(file: &std::path::Path) -> Result<Xml, BackendError> {
    let content = std::fs::read_to_string(file)
        .map_err(|e| BackendError::io(ErrClass::Unix, &file.display().to_string(), &e))?;
    Xml::parse(&content).map_err(|e| BackendError::msg(ErrClass::Xml, e.to_string()))
}

fn db_err(e: StoreError) -> BackendError {
    BackendError::new(ErrClass::Database, e.errno(), e.to_string())
}

#[cfg(test)]
#[path = "datastore_tests.rs"]
mod tests;
