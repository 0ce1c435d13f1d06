// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! helm-netconf: the NETCONF frontend.
//!
//! A separate process speaking NETCONF 1.0 on stdin/stdout, delimited by
//! the `]]>]]>` sentinel, re-dialing the backend as a regular control
//! socket client.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod hello;
pub mod rpc;

pub use hello::{create_hello, BASE_CAPABILITY};
pub use rpc::{BackendOps, Frontend, Outcome};
