// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Configuration paths: `/cfg/host[name=h1]/addr`.
//!
//! A path addresses one node in a configuration tree. Steps name child
//! elements; a `[key=value]` predicate selects one entry of a keyed list.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("path must start with '/': {0}")]
    MissingSlash(String),

    #[error("empty path step in {0}")]
    EmptyStep(String),

    #[error("malformed key predicate in step {0:?}")]
    BadPredicate(String),
}

/// One step of a [`Path`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    pub tag: String,
    /// `[name=value]` list-entry selector.
    pub key: Option<(String, String)>,
}

impl Step {
    pub fn new(tag: impl Into<String>) -> Self {
        Self { tag: tag.into(), key: None }
    }

    pub fn keyed(tag: impl Into<String>, key: impl Into<String>, value: impl Into<String>) -> Self {
        Self { tag: tag.into(), key: Some((key.into(), value.into())) }
    }
}

/// A parsed configuration path. The root path `/` has no steps.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Path {
    pub steps: Vec<Step>,
}

impl Path {
    pub fn root() -> Self {
        Self { steps: Vec::new() }
    }

    pub fn is_root(&self) -> bool {
        self.steps.is_empty()
    }

    /// Append a step, returning the extended path.
    pub fn join(&self, step: Step) -> Self {
        let mut steps = self.steps.clone();
        steps.push(step);
        Self { steps }
    }

    /// The path without its last step; `None` for the root.
    pub fn parent(&self) -> Option<Self> {
        if self.steps.is_empty() {
            return None;
        }
        Some(Self { steps: self.steps[..self.steps.len() - 1].to_vec() })
    }

    pub fn last(&self) -> Option<&Step> {
        self.steps.last()
    }
}

impl FromStr for Path {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let rest = s.strip_prefix('/').ok_or_else(|| PathError::MissingSlash(s.to_string()))?;
        if rest.is_empty() {
            return Ok(Path::root());
        }
        let mut steps = Vec::new();
        for raw in rest.split('/') {
            if raw.is_empty() {
                return Err(PathError::EmptyStep(s.to_string()));
            }
            steps.push(parse_step(raw)?);
        }
        Ok(Path { steps })
    }
}

fn parse_step(raw: &str) -> Result<Step, PathError> {
    match raw.find('[') {
        None => {
            if raw.contains(']') {
                return Err(PathError::BadPredicate(raw.to_string()));
            }
            Ok(Step::new(raw))
        }
        Some(open) => {
            let tag = &raw[..open];
            let pred = &raw[open + 1..];
            let inner = pred.strip_suffix(']').ok_or_else(|| PathError::BadPredicate(raw.to_string()))?;
            let (key, value) =
                inner.split_once('=').ok_or_else(|| PathError::BadPredicate(raw.to_string()))?;
            if tag.is_empty() || key.is_empty() {
                return Err(PathError::BadPredicate(raw.to_string()));
            }
            Ok(Step::keyed(tag, key, value))
        }
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.steps.is_empty() {
            return f.write_str("/");
        }
        for step in &self.steps {
            write!(f, "/{}", step.tag)?;
            if let Some((ref k, ref v)) = step.key {
                write!(f, "[{k}={v}]")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "path_tests.rs"]
mod tests;
