// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! helm-core: data model for the helm configuration daemon.
//!
//! Configuration trees, paths, the schema handle, the error taxonomy,
//! and the clock abstraction shared by the backend and the frontends.

pub mod clock;
pub mod error;
pub mod path;
pub mod schema;
pub mod xml;

pub use clock::{Clock, FakeClock, SystemClock};
pub use error::{BackendError, ErrClass, ErrorType, RpcError, Severity};
pub use path::{Path, Step};
pub use schema::{load_yspec, SchemaKind, Yspec};
pub use xml::{PutOp, Xml, XmlError};

/// Session identifier on the control socket. Monotonically increasing,
/// assigned by the backend at accept time.
pub type SessionId = u32;

/// Canonical datastore names.
pub const DB_RUNNING: &str = "running";
pub const DB_CANDIDATE: &str = "candidate";
pub const DB_STARTUP: &str = "startup";

/// Built-in notification stream fed by the logging facility.
pub const STREAM_LOG: &str = "CLICON";
