// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed control-socket messages.
//!
//! Op type values are part of the wire contract and never change across
//! releases.

use helm_core::{ErrClass, PutOp, SessionId};

use crate::frame::{ProtocolError, HEADER_LEN, MAX_FRAME};

pub(crate) const OP_COMMIT: u16 = 1;
pub(crate) const OP_VALIDATE: u16 = 2;
pub(crate) const OP_CHANGE: u16 = 3;
pub(crate) const OP_SAVE: u16 = 4;
pub(crate) const OP_LOAD: u16 = 5;
pub(crate) const OP_COPY: u16 = 6;
pub(crate) const OP_RM: u16 = 7;
pub(crate) const OP_INITDB: u16 = 8;
pub(crate) const OP_LOCK: u16 = 9;
pub(crate) const OP_UNLOCK: u16 = 10;
pub(crate) const OP_KILL: u16 = 11;
pub(crate) const OP_DEBUG: u16 = 12;
pub(crate) const OP_CALL: u16 = 13;
pub(crate) const OP_SUBSCRIPTION: u16 = 14;
pub(crate) const OP_OK: u16 = 15;
pub(crate) const OP_NOTIFY: u16 = 16;
pub(crate) const OP_ERR: u16 = 17;

/// One framed message on the control socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// Commit candidate into the named target datastore.
    Commit { db: String },
    /// Run the commit validation phases against the named datastore.
    Validate { db: String },
    /// Apply a single path-addressed edit. An empty value means none.
    Change { db: String, op: PutOp, path: String, value: String },
    /// Dump a datastore to a file through the storage plugin.
    Save { db: String, path: String },
    /// Load a file into a datastore through the storage plugin.
    Load { db: String, path: String },
    Copy { src: String, dst: String },
    Rm { db: String },
    InitDb { db: String },
    Lock { db: String },
    Unlock { db: String },
    /// Forcibly destroy another session (privileged).
    Kill { session: SessionId },
    /// Adjust runtime verbosity.
    Debug { level: u32 },
    /// Invoke a plugin-registered RPC handler.
    Call { namespace: String, name: String, args: Vec<u8> },
    /// Subscribe this session to a notification stream.
    Subscription { stream: String, format: String },
    /// Success reply, optionally carrying data.
    Ok { data: Vec<u8> },
    /// Asynchronous notification; never awaits a reply.
    Notify { level: u32, payload: String },
    /// Failure reply.
    Err { class: ErrClass, sub: u32, reason: String },
}

impl Msg {
    pub fn op_type(&self) -> u16 {
        match self {
            Msg::Commit { .. } => OP_COMMIT,
            Msg::Validate { .. } => OP_VALIDATE,
            Msg::Change { .. } => OP_CHANGE,
            Msg::Save { .. } => OP_SAVE,
            Msg::Load { .. } => OP_LOAD,
            Msg::Copy { .. } => OP_COPY,
            Msg::Rm { .. } => OP_RM,
            Msg::InitDb { .. } => OP_INITDB,
            Msg::Lock { .. } => OP_LOCK,
            Msg::Unlock { .. } => OP_UNLOCK,
            Msg::Kill { .. } => OP_KILL,
            Msg::Debug { .. } => OP_DEBUG,
            Msg::Call { .. } => OP_CALL,
            Msg::Subscription { .. } => OP_SUBSCRIPTION,
            Msg::Ok { .. } => OP_OK,
            Msg::Notify { .. } => OP_NOTIFY,
            Msg::Err { .. } => OP_ERR,
        }
    }

    /// Success with no payload.
    pub fn ok() -> Self {
        Msg::Ok { data: Vec::new() }
    }

    /// Encode to a complete frame, header included.
    pub fn encode(&self) -> Result<Vec<u8>, ProtocolError> {
        let mut body = BodyWriter::default();
        match self {
            Msg::Commit { db } | Msg::Validate { db } | Msg::Rm { db } | Msg::InitDb { db } => {
                body.str(db)?;
            }
            Msg::Lock { db } | Msg::Unlock { db } => body.str(db)?,
            Msg::Change { db, op, path, value } => {
                body.str(db)?;
                body.str(op.as_str())?;
                body.str(path)?;
                body.str(value)?;
            }
            Msg::Save { db, path } | Msg::Load { db, path } => {
                body.str(db)?;
                body.str(path)?;
            }
            Msg::Copy { src, dst } => {
                body.str(src)?;
                body.str(dst)?;
            }
            Msg::Kill { session } => body.u32(*session),
            Msg::Debug { level } => body.u32(*level),
            Msg::Call { namespace, name, args } => {
                body.str(namespace)?;
                body.str(name)?;
                body.bytes(args);
            }
            Msg::Subscription { stream, format } => {
                body.str(stream)?;
                body.str(format)?;
            }
            Msg::Ok { data } => body.bytes(data),
            Msg::Notify { level, payload } => {
                body.u32(*level);
                body.str(payload)?;
            }
            Msg::Err { class, sub, reason } => {
                body.u32(class.as_u32());
                body.u32(*sub);
                body.str(reason)?;
            }
        }
        let body = body.buf;
        let total = HEADER_LEN + body.len();
        if total > MAX_FRAME {
            return Err(ProtocolError::TooLong(total));
        }
        let mut frame = Vec::with_capacity(total);
        frame.extend_from_slice(&self.op_type().to_be_bytes());
        frame.extend_from_slice(&(total as u16).to_be_bytes());
        frame.extend_from_slice(&body);
        Ok(frame)
    }

    /// Decode a frame body given its op type.
    pub fn decode_frame(op_type: u16, body: &[u8]) -> Result<Msg, ProtocolError> {
        let mut r = BodyReader::new(body);
        let msg = match op_type {
            OP_COMMIT => Msg::Commit { db: r.str()? },
            OP_VALIDATE => Msg::Validate { db: r.str()? },
            OP_CHANGE => {
                let db = r.str()?;
                let op_name = r.str()?;
                let op = PutOp::parse(&op_name).ok_or(ProtocolError::BadBody("change op"))?;
                Msg::Change { db, op, path: r.str()?, value: r.str()? }
            }
            OP_SAVE => Msg::Save { db: r.str()?, path: r.str()? },
            OP_LOAD => Msg::Load { db: r.str()?, path: r.str()? },
            OP_COPY => Msg::Copy { src: r.str()?, dst: r.str()? },
            OP_RM => Msg::Rm { db: r.str()? },
            OP_INITDB => Msg::InitDb { db: r.str()? },
            OP_LOCK => Msg::Lock { db: r.str()? },
            OP_UNLOCK => Msg::Unlock { db: r.str()? },
            OP_KILL => Msg::Kill { session: r.u32()? },
            OP_DEBUG => Msg::Debug { level: r.u32()? },
            OP_CALL => Msg::Call { namespace: r.str()?, name: r.str()?, args: r.rest() },
            OP_SUBSCRIPTION => Msg::Subscription { stream: r.str()?, format: r.str()? },
            OP_OK => Msg::Ok { data: r.rest() },
            OP_NOTIFY => Msg::Notify { level: r.u32()?, payload: r.str()? },
            OP_ERR => {
                let class_raw = r.u32()?;
                let class = ErrClass::from_u32(class_raw)
                    .ok_or(ProtocolError::BadBody("error class"))?;
                Msg::Err { class, sub: r.u32()?, reason: r.str()? }
            }
            other => return Err(ProtocolError::BadOp(other)),
        };
        r.finish()?;
        Ok(msg)
    }
}

#[derive(Default)]
struct BodyWriter {
    buf: Vec<u8>,
}

impl BodyWriter {
    fn str(&mut self, s: &str) -> Result<(), ProtocolError> {
        if s.as_bytes().contains(&0) {
            return Err(ProtocolError::BadBody("embedded NUL in string field"));
        }
        self.buf.extend_from_slice(s.as_bytes());
        self.buf.push(0);
        Ok(())
    }

    fn u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    /// Opaque trailing data; must be the last field of a body.
    fn bytes(&mut self, b: &[u8]) {
        self.buf.extend_from_slice(b);
    }
}

struct BodyReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> BodyReader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn str(&mut self) -> Result<String, ProtocolError> {
        let rest = &self.buf[self.pos..];
        let nul = rest
            .iter()
            .position(|&b| b == 0)
            .ok_or(ProtocolError::BadBody("unterminated string field"))?;
        let s = std::str::from_utf8(&rest[..nul])
            .map_err(|_| ProtocolError::BadBody("string field not UTF-8"))?
            .to_string();
        self.pos += nul + 1;
        Ok(s)
    }

    fn u32(&mut self) -> Result<u32, ProtocolError> {
        let rest = &self.buf[self.pos..];
        if rest.len() < 4 {
            return Err(ProtocolError::BadBody("truncated scalar field"));
        }
        let v = u32::from_be_bytes([rest[0], rest[1], rest[2], rest[3]]);
        self.pos += 4;
        Ok(v)
    }

    fn rest(&mut self) -> Vec<u8> {
        let out = self.buf[self.pos..].to_vec();
        self.pos = self.buf.len();
        out
    }

    fn finish(self) -> Result<(), ProtocolError> {
        if self.pos != self.buf.len() {
            return Err(ProtocolError::BadBody("trailing bytes after body"));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "msg_tests.rs"]
mod tests;
