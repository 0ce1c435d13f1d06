// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Storage plugins: the pluggable on-disk representation of datastores.
//!
//! The backend never touches datastore bytes itself; everything goes
//! through a [`StorePlugin`]. Two implementations ship with the daemon:
//! [`XmlFileStore`] (one XML file per datastore) and [`MemStore`]
//! (in-memory, for tests and `run-once` experiments).

mod memory;
mod xmlfile;

use std::sync::Arc;

use helm_core::{Path, PutOp, Xml, XmlError, Yspec};
use thiserror::Error;

pub use memory::MemStore;
pub use xmlfile::XmlFileStore;

#[derive(Debug, Error)]
pub enum StoreError {
    /// The named datastore (or addressed node) does not exist.
    #[error("{0}: not found")]
    NotFound(String),

    #[error("datastore name {0:?} is not allowed")]
    BadName(String),

    #[error("{context}: {err}")]
    Io { context: String, err: std::io::Error },

    #[error("stored tree is malformed: {0}")]
    Xml(#[from] XmlError),

    #[error("storage option {0} not supported")]
    BadOption(String),
}

impl StoreError {
    pub fn io(context: impl Into<String>, err: std::io::Error) -> Self {
        StoreError::Io { context: context.into(), err }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }

    /// The errno to surface as the wire sub-error.
    pub fn errno(&self) -> u32 {
        match self {
            StoreError::NotFound(_) => 2, // ENOENT
            StoreError::Io { err, .. } => err.raw_os_error().unwrap_or(0) as u32,
            _ => 0,
        }
    }
}

/// Contract between the backend and a storage backend.
///
/// `connect` hands over the schema and must be called before any other
/// operation; `disconnect` is called exactly once at shutdown.
pub trait StorePlugin: Send {
    fn name(&self) -> &'static str;

    fn connect(&mut self, yspec: Arc<Yspec>) -> Result<(), StoreError>;

    fn disconnect(&mut self);

    /// Backend-specific string options (e.g. `dbdir`).
    fn setopt(&mut self, name: &str, value: &str) -> Result<(), StoreError>;

    fn exists(&self, db: &str) -> Result<bool, StoreError>;

    /// Create `db` empty, replacing any previous content.
    fn create(&mut self, db: &str) -> Result<(), StoreError>;

    fn delete(&mut self, db: &str) -> Result<(), StoreError>;

    /// Atomic snapshot of `src` into `dst` (created if missing).
    fn copy(&mut self, src: &str, dst: &str) -> Result<(), StoreError>;

    /// Deep copy of the subtree addressed by `path`.
    fn get(&self, db: &str, path: &Path) -> Result<Xml, StoreError>;

    /// Apply an overlay tree to `db`.
    fn put(&mut self, db: &str, op: PutOp, tree: &Xml) -> Result<(), StoreError>;
}

/// Datastore names become file names; keep them to one sane path segment.
pub(crate) fn check_db_name(db: &str) -> Result<(), StoreError> {
    let ok = !db.is_empty()
        && db.len() <= 64
        && db.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if ok {
        Ok(())
    } else {
        Err(StoreError::BadName(db.to_string()))
    }
}
