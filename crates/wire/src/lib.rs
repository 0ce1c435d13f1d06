// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! IPC protocol for backend communication.
//!
//! Wire format: `{op_type: u16, op_len: u16}` big-endian header, `op_len`
//! counting the whole frame, then a body of NUL-terminated strings and
//! big-endian scalars. Plus the NETCONF `]]>]]>` sub-codec and a small
//! client for dialing the backend.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod client;
mod frame;
mod msg;
mod sentinel;

pub use client::{BackendClient, ClientError};
pub use frame::{read_msg, write_msg, ProtocolError, HEADER_LEN, MAX_FRAME};
pub use msg::Msg;
pub use sentinel::{SentinelDecoder, SENTINEL};
