// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! File-backed storage: one XML document per datastore.
//!
//! Writes go through a temp file followed by a rename so a datastore file
//! is always a complete document, and `copy` observes `src` at a single
//! point in time.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use helm_core::{Path, PutOp, Xml, Yspec};

use super::{check_db_name, StoreError, StorePlugin};

pub struct XmlFileStore {
    dir: PathBuf,
    yspec: Option<Arc<Yspec>>,
}

impl XmlFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into(), yspec: None }
    }

    fn file(&self, db: &str) -> Result<PathBuf, StoreError> {
        check_db_name(db)?;
        Ok(self.dir.join(format!("{db}.xml")))
    }

    fn read_tree(&self, db: &str) -> Result<Xml, StoreError> {
        let path = self.file(db)?;
        let content = std::fs::read_to_string(&path).map_err(|err| {
            if err.kind() == std::io::ErrorKind::NotFound {
                StoreError::NotFound(db.to_string())
            } else {
                StoreError::io(path.display().to_string(), err)
            }
        })?;
        Ok(Xml::parse(&content)?)
    }

    fn write_tree(&self, db: &str, tree: &Xml) -> Result<(), StoreError> {
        let path = self.file(db)?;
        let tmp = self.dir.join(format!(".{db}.xml.tmp"));
        let context = tmp.display().to_string();
        let mut file =
            std::fs::File::create(&tmp).map_err(|e| StoreError::io(context.clone(), e))?;
        file.write_all(tree.to_xml_string().as_bytes())
            .map_err(|e| StoreError::io(context.clone(), e))?;
        file.sync_all().map_err(|e| StoreError::io(context.clone(), e))?;
        std::fs::rename(&tmp, &path)
            .map_err(|e| StoreError::io(path.display().to_string(), e))?;
        Ok(())
    }
}

impl StorePlugin for XmlFileStore {
    fn name(&self) -> &'static str {
        "xmlfile"
    }

    fn connect(&mut self, yspec: Arc<Yspec>) -> Result<(), StoreError> {
        std::fs::create_dir_all(&self.dir)
            .map_err(|e| StoreError::io(self.dir.display().to_string(), e))?;
        self.yspec = Some(yspec);
        Ok(())
    }

    fn disconnect(&mut self) {
        self.yspec = None;
    }

    fn setopt(&mut self, name: &str, value: &str) -> Result<(), StoreError> {
        match name {
            "dbdir" => {
                self.dir = PathBuf::from(value);
                Ok(())
            }
            other => Err(StoreError::BadOption(other.to_string())),
        }
    }

    fn exists(&self, db: &str) -> Result<bool, StoreError> {
        Ok(self.file(db)?.exists())
    }

    fn create(&mut self, db: &str) -> Result<(), StoreError> {
        self.write_tree(db, &Xml::root())
    }

    fn delete(&mut self, db: &str) -> Result<(), StoreError> {
        let path = self.file(db)?;
        std::fs::remove_file(&path).map_err(|err| {
            if err.kind() == std::io::ErrorKind::NotFound {
                StoreError::NotFound(db.to_string())
            } else {
                StoreError::io(path.display().to_string(), err)
            }
        })
    }

    fn copy(&mut self, src: &str, dst: &str) -> Result<(), StoreError> {
        let tree = self.read_tree(src)?;
        self.write_tree(dst, &tree)
    }

    fn get(&self, db: &str, path: &Path) -> Result<Xml, StoreError> {
        let tree = self.read_tree(db)?;
        match tree.get_at(path) {
            Some(node) => Ok(node.clone()),
            None => Err(StoreError::NotFound(format!("{db}{path}"))),
        }
    }

    fn put(&mut self, db: &str, op: PutOp, overlay: &Xml) -> Result<(), StoreError> {
        let mut tree = self.read_tree(db)?;
        tree.apply(op, overlay, self.yspec.as_deref());
        self.write_tree(db, &tree)
    }
}

#[cfg(test)]
#[path = "xmlfile_tests.rs"]
mod tests;
