// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error taxonomy shared across the daemon and its clients.
//!
//! Deep code paths produce a `(class, sub, reason)` tuple without partial
//! side effects; RPC handlers turn it into a wire `ERR` frame, the commit
//! engine into a NETCONF-shaped [`RpcError`].

use std::fmt;
use std::io;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Top-level error class. Wire values are stable across releases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrClass {
    Fatal,
    Unix,
    Syslog,
    Xml,
    Schema,
    Database,
    Config,
    Protocol,
    Plugin,
    Demon,
}

impl ErrClass {
    pub fn as_u32(self) -> u32 {
        match self {
            ErrClass::Fatal => 1,
            ErrClass::Unix => 2,
            ErrClass::Syslog => 3,
            ErrClass::Xml => 4,
            ErrClass::Schema => 5,
            ErrClass::Database => 6,
            ErrClass::Config => 7,
            ErrClass::Protocol => 8,
            ErrClass::Plugin => 9,
            ErrClass::Demon => 10,
        }
    }

    pub fn from_u32(v: u32) -> Option<Self> {
        Some(match v {
            1 => ErrClass::Fatal,
            2 => ErrClass::Unix,
            3 => ErrClass::Syslog,
            4 => ErrClass::Xml,
            5 => ErrClass::Schema,
            6 => ErrClass::Database,
            7 => ErrClass::Config,
            8 => ErrClass::Protocol,
            9 => ErrClass::Plugin,
            10 => ErrClass::Demon,
            _ => return None,
        })
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ErrClass::Fatal => "fatal",
            ErrClass::Unix => "unix",
            ErrClass::Syslog => "syslog",
            ErrClass::Xml => "xml",
            ErrClass::Schema => "schema",
            ErrClass::Database => "database",
            ErrClass::Config => "config",
            ErrClass::Protocol => "protocol",
            ErrClass::Plugin => "plugin",
            ErrClass::Demon => "demon",
        }
    }
}

impl fmt::Display for ErrClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An error with its taxonomy class, a sub-error (usually errno when the
/// ultimate cause was a system call) and a free-form reason.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{class}: {reason} (sub={sub})")]
pub struct BackendError {
    pub class: ErrClass,
    pub sub: u32,
    pub reason: String,
}

impl BackendError {
    pub fn new(class: ErrClass, sub: u32, reason: impl Into<String>) -> Self {
        Self { class, sub, reason: reason.into() }
    }

    /// Shorthand for an error with no meaningful sub-error.
    pub fn msg(class: ErrClass, reason: impl Into<String>) -> Self {
        Self::new(class, 0, reason)
    }

    /// Wrap an I/O error, preserving the OS errno as the sub-error.
    pub fn io(class: ErrClass, context: &str, err: &io::Error) -> Self {
        let sub = err.raw_os_error().unwrap_or(0) as u32;
        Self::new(class, sub, format!("{context}: {err}"))
    }
}

impl From<io::Error> for BackendError {
    fn from(err: io::Error) -> Self {
        BackendError::io(ErrClass::Unix, "io", &err)
    }
}

/// NETCONF error type field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorType {
    Transport,
    Rpc,
    Protocol,
    Application,
}

impl ErrorType {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorType::Transport => "transport",
            ErrorType::Rpc => "rpc",
            ErrorType::Protocol => "protocol",
            ErrorType::Application => "application",
        }
    }
}

/// NETCONF error severity field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Error,
    Warning,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
        }
    }
}

/// A NETCONF-shaped error as produced by validation and the commit engine.
///
/// Serializes to an `<rpc-error>` element on the NETCONF side; on the
/// control socket it travels inside an `ERR` frame reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcError {
    pub tag: String,
    pub error_type: ErrorType,
    pub severity: Severity,
    pub app_tag: Option<String>,
    pub path: Option<String>,
    pub message: String,
}

impl RpcError {
    pub fn new(
        tag: impl Into<String>,
        error_type: ErrorType,
        severity: Severity,
        message: impl Into<String>,
    ) -> Self {
        Self {
            tag: tag.into(),
            error_type,
            severity,
            app_tag: None,
            path: None,
            message: message.into(),
        }
    }

    /// An application-level validation failure at a config path.
    pub fn application(tag: &str, path: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            tag: tag.to_string(),
            error_type: ErrorType::Application,
            severity: Severity::Error,
            app_tag: None,
            path: path.map(str::to_string),
            message: message.into(),
        }
    }

    /// The catch-all protocol failure used for malformed requests.
    pub fn operation_failed(error_type: ErrorType, message: impl Into<String>) -> Self {
        Self::new("operation-failed", error_type, Severity::Error, message)
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Rebuild from a parsed `<rpc-error>` element (the inverse of
    /// [`Self::to_xml`]). `None` when the element is not an rpc-error.
    pub fn from_xml(node: &crate::xml::Xml) -> Option<Self> {
        if node.tag() != "rpc-error" {
            return None;
        }
        let error_type = match node.child_text("error-type") {
            Some("transport") => ErrorType::Transport,
            Some("rpc") => ErrorType::Rpc,
            Some("protocol") => ErrorType::Protocol,
            _ => ErrorType::Application,
        };
        let severity = match node.child_text("error-severity") {
            Some("warning") => Severity::Warning,
            _ => Severity::Error,
        };
        Some(Self {
            tag: node.child_text("error-tag").unwrap_or("operation-failed").to_string(),
            error_type,
            severity,
            app_tag: node.child_text("error-app-tag").map(str::to_string),
            path: node.child_text("error-path").map(str::to_string),
            message: node.child_text("error-message").unwrap_or_default().to_string(),
        })
    }

    /// Render as an `<rpc-error>` element body.
    pub fn to_xml(&self) -> String {
        let mut out = String::new();
        out.push_str("<rpc-error>");
        out.push_str(&format!("<error-type>{}</error-type>", self.error_type.as_str()));
        out.push_str(&format!("<error-tag>{}</error-tag>", crate::xml::escape(&self.tag)));
        out.push_str(&format!("<error-severity>{}</error-severity>", self.severity.as_str()));
        if let Some(ref app_tag) = self.app_tag {
            out.push_str(&format!("<error-app-tag>{}</error-app-tag>", crate::xml::escape(app_tag)));
        }
        if let Some(ref path) = self.path {
            out.push_str(&format!("<error-path>{}</error-path>", crate::xml::escape(path)));
        }
        if !self.message.is_empty() {
            out.push_str(&format!(
                "<error-message>{}</error-message>",
                crate::xml::escape(&self.message)
            ));
        }
        out.push_str("</rpc-error>");
        out
    }
}

impl fmt::Display for RpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.path {
            Some(ref path) => write!(f, "{}: {} at {}", self.tag, self.message, path),
            None => write!(f, "{}: {}", self.tag, self.message),
        }
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
