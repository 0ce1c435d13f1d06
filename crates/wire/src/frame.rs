// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Async frame transport over the control socket.

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::msg::Msg;

/// Fixed header: big-endian `u16 op_type` + big-endian `u16 op_len`.
pub const HEADER_LEN: usize = 4;

/// `op_len` is a u16 counting the header, so frames top out here.
pub const MAX_FRAME: usize = u16::MAX as usize;

/// Errors from frame encode/decode and transport.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// EOF on a frame boundary; the peer closed cleanly.
    #[error("connection closed")]
    ConnectionClosed,

    #[error("short header ({0} of {HEADER_LEN} bytes)")]
    ShortHeader(usize),

    #[error("frame body shorter than header length")]
    ShortBody,

    #[error("frame length {0} below header size")]
    BadLength(usize),

    #[error("unknown op type {0}")]
    BadOp(u16),

    #[error("malformed body: {0}")]
    BadBody(&'static str),

    #[error("message too long ({0} bytes)")]
    TooLong(usize),

    #[error("i/o: {0}")]
    Io(#[from] std::io::Error),
}

/// Read one message. EOF before the first header byte is a clean close;
/// EOF anywhere else is a protocol error. The caller only invokes this on
/// a readable stream, so a full frame is expected to follow the header.
pub async fn read_msg<R>(reader: &mut R) -> Result<Msg, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; HEADER_LEN];
    let mut got = 0;
    while got < HEADER_LEN {
        let n = reader.read(&mut header[got..]).await?;
        if n == 0 {
            if got == 0 {
                return Err(ProtocolError::ConnectionClosed);
            }
            return Err(ProtocolError::ShortHeader(got));
        }
        got += n;
    }
    let op_type = u16::from_be_bytes([header[0], header[1]]);
    let op_len = u16::from_be_bytes([header[2], header[3]]) as usize;
    if op_len < HEADER_LEN {
        return Err(ProtocolError::BadLength(op_len));
    }
    let mut body = vec![0u8; op_len - HEADER_LEN];
    reader.read_exact(&mut body).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            ProtocolError::ShortBody
        } else {
            ProtocolError::Io(e)
        }
    })?;
    Msg::decode_frame(op_type, &body)
}

/// Write one message and flush it.
pub async fn write_msg<W>(writer: &mut W, msg: &Msg) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
{
    let frame = msg.encode()?;
    writer.write_all(&frame).await?;
    writer.flush().await?;
    Ok(())
}

#[cfg(test)]
#[path = "frame_tests.rs"]
mod tests;
