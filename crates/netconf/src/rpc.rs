// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! NETCONF rpc dispatch.
//!
//! Each inbound document maps onto backend control-socket RPCs; replies
//! are wrapped as `<rpc-reply>` and failures as `<rpc-error>` carrying
//! the backend's own error fields where available.

use std::path::PathBuf;

use helm_core::xml::escape;
use helm_core::{
    ErrorType, PutOp, RpcError, Severity, Xml, DB_CANDIDATE, DB_RUNNING,
};
use helm_wire::{BackendClient, ClientError, Msg};
use tracing::{debug, warn};

use crate::hello::peer_capabilities;

/// The backend seam; the production implementation is
/// [`helm_wire::BackendClient`].
#[allow(async_fn_in_trait)]
pub trait BackendOps {
    async fn rpc(&mut self, msg: &Msg) -> Result<Vec<u8>, ClientError>;
}

impl BackendOps for BackendClient {
    async fn rpc(&mut self, msg: &Msg) -> Result<Vec<u8>, ClientError> {
        BackendClient::rpc(self, msg).await
    }
}

/// What to do with one inbound document.
#[derive(Debug, PartialEq, Eq)]
pub enum Outcome {
    Reply(String),
    /// Hello or unrecognized document; nothing to send.
    NoReply,
    /// Send the reply, then close the session.
    Close(String),
}

pub struct Frontend<B> {
    backend: B,
    session_id: u32,
    peer_caps: Vec<String>,
    tmp_dir: PathBuf,
    tmp_seq: u32,
}

impl<B: BackendOps> Frontend<B> {
    pub fn new(backend: B, session_id: u32) -> Self {
        Self {
            backend,
            session_id,
            peer_caps: Vec::new(),
            tmp_dir: std::env::temp_dir(),
            tmp_seq: 0,
        }
    }

    /// Redirect the scratch files used by get-config (tests).
    pub fn with_tmp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.tmp_dir = dir.into();
        self
    }

    /// The outbound hello document for this session.
    pub fn hello(&self) -> String {
        crate::hello::create_hello(self.session_id)
    }

    pub fn peer_caps(&self) -> &[String] {
        &self.peer_caps
    }

    /// Handle one sentinel-delimited document.
    pub async fn process(&mut self, doc: &str) -> Outcome {
        let tree = match Xml::parse(doc) {
            Ok(tree) => tree,
            Err(e) => {
                debug!(error = %e, "dropping malformed document");
                let err = RpcError::new(
                    "operation-failed",
                    ErrorType::Protocol,
                    Severity::Error,
                    "malformed xml",
                );
                return Outcome::Reply(error_reply(None, &err));
            }
        };
        if tree.tag() == "hello" {
            self.peer_caps = peer_capabilities(&tree);
            debug!(capabilities = self.peer_caps.len(), "peer hello");
            return Outcome::NoReply;
        }
        let Some(rpc) = find_rpc(&tree) else {
            warn!("invalid netconf message: neither rpc nor hello, dropped");
            return Outcome::NoReply;
        };
        let message_id = rpc.attr("message-id").map(str::to_string);
        let mid = message_id.as_deref();
        let Some(op) = rpc.children().first() else {
            let err = RpcError::new(
                "missing-element",
                ErrorType::Rpc,
                Severity::Error,
                "empty rpc",
            );
            return Outcome::Reply(error_reply(mid, &err));
        };
        match self.dispatch(op).await {
            Ok((inner, close)) => {
                let reply = wrap_reply(mid, &inner);
                if close {
                    Outcome::Close(reply)
                } else {
                    Outcome::Reply(reply)
                }
            }
            Err(err) => Outcome::Reply(error_reply(mid, &err)),
        }
    }

    async fn dispatch(&mut self, op: &Xml) -> Result<(String, bool), RpcError> {
        let reply = match op.tag() {
            "get-config" => (self.get_config(op).await?, false),
            "edit-config" => (self.edit_config(op).await?, false),
            "copy-config" => {
                let src = db_from(op, "source", None)?;
                let dst = db_from(op, "target", None)?;
                self.call(&Msg::Copy { src, dst }).await?;
                (ok(), false)
            }
            "delete-config" => {
                let db = db_from(op, "target", None)?;
                self.call(&Msg::Rm { db }).await?;
                (ok(), false)
            }
            "lock" => {
                let db = db_from(op, "target", None)?;
                self.call(&Msg::Lock { db }).await?;
                (ok(), false)
            }
            "unlock" => {
                let db = db_from(op, "target", None)?;
                self.call(&Msg::Unlock { db }).await?;
                (ok(), false)
            }
            "close-session" => (ok(), true),
            "kill-session" => {
                let session = op
                    .child_text("session-id")
                    .and_then(|s| s.parse::<u32>().ok())
                    .ok_or_else(|| {
                        RpcError::new(
                            "missing-element",
                            ErrorType::Rpc,
                            Severity::Error,
                            "kill-session requires a numeric <session-id>",
                        )
                    })?;
                self.call(&Msg::Kill { session }).await?;
                (ok(), false)
            }
            "commit" => {
                self.call(&Msg::Commit { db: DB_RUNNING.to_string() }).await?;
                (ok(), false)
            }
            "validate" => {
                let db = db_from(op, "source", Some(DB_CANDIDATE))?;
                self.call(&Msg::Validate { db }).await?;
                (ok(), false)
            }
            "discard-changes" => {
                self.call(&Msg::Copy {
                    src: DB_RUNNING.to_string(),
                    dst: DB_CANDIDATE.to_string(),
                })
                .await?;
                (ok(), false)
            }
            // Anything else goes to a plugin-registered extension.
            name => {
                let namespace = op.attr("xmlns").unwrap_or("").to_string();
                let args: String = op.children().iter().map(Xml::to_xml_string).collect();
                let data = self
                    .call(&Msg::Call {
                        namespace,
                        name: name.to_string(),
                        args: args.into_bytes(),
                    })
                    .await?;
                if data.is_empty() {
                    (ok(), false)
                } else {
                    (String::from_utf8_lossy(&data).into_owned(), false)
                }
            }
        };
        Ok(reply)
    }

    /// get-config: the backend dumps the datastore to a scratch file,
    /// which becomes the `<data>` body (the control protocol has no
    /// subtree read op).
    async fn get_config(&mut self, op: &Xml) -> Result<String, RpcError> {
        let db = db_from(op, "source", Some(DB_RUNNING))?;
        let file = self
            .tmp_dir
            .join(format!("helm-netconf-{}-{}.xml", self.session_id, self.tmp_seq));
        self.tmp_seq = self.tmp_seq.wrapping_add(1);
        self.call(&Msg::Save { db, path: file.display().to_string() }).await?;
        let content = std::fs::read_to_string(&file).map_err(|e| {
            RpcError::application("operation-failed", None, format!("reading dump: {e}"))
        })?;
        let _ = std::fs::remove_file(&file);
        let tree = Xml::parse(&content).map_err(|e| {
            RpcError::application("operation-failed", None, format!("malformed dump: {e}"))
        })?;
        let inner: String = tree.children().iter().map(Xml::to_xml_string).collect();
        Ok(format!("<data>{inner}</data>"))
    }

    /// edit-config: flatten the config tree into CHANGE operations.
    async fn edit_config(&mut self, op: &Xml) -> Result<String, RpcError> {
        let db = db_from(op, "target", None)?;
        let default_op = match op.child_text("default-operation") {
            None | Some("merge") | Some("none") => PutOp::Merge,
            Some("replace") => PutOp::Replace,
            Some(other) => {
                return Err(RpcError::new(
                    "invalid-value",
                    ErrorType::Protocol,
                    Severity::Error,
                    format!("default-operation {other:?} not supported"),
                ));
            }
        };
        let config = op.child("config").ok_or_else(|| {
            RpcError::new("missing-element", ErrorType::Rpc, Severity::Error, "<config> required")
        })?;
        for (path, change_op, value) in flatten(config, default_op) {
            self.call(&Msg::Change { db: db.clone(), op: change_op, path, value }).await?;
        }
        Ok(ok())
    }

    async fn call(&mut self, msg: &Msg) -> Result<Vec<u8>, RpcError> {
        self.backend.rpc(msg).await.map_err(client_to_rpc)
    }
}

fn ok() -> String {
    "<ok/>".to_string()
}

fn find_rpc(tree: &Xml) -> Option<&Xml> {
    if tree.tag() == "rpc" {
        return Some(tree);
    }
    tree.children().iter().find_map(find_rpc)
}

/// Datastore name from `<source>`/`<target>` wrapper elements.
fn db_from(op: &Xml, container: &str, default: Option<&str>) -> Result<String, RpcError> {
    match op.child(container).and_then(|c| c.children().first()) {
        Some(node) => Ok(node.tag().to_string()),
        None => default.map(str::to_string).ok_or_else(|| {
            RpcError::new(
                "missing-element",
                ErrorType::Rpc,
                Severity::Error,
                format!("<{container}> with a datastore name required"),
            )
        }),
    }
}

/// Flatten an edit-config tree into path-addressed CHANGE operations.
///
/// List entries follow the keys-first convention: an element's first
/// text-bearing leaf child keys its path step. An `operation` attribute
/// of `delete`/`remove`/`replace`/`merge` overrides the default for that
/// subtree.
fn flatten(config: &Xml, default_op: PutOp) -> Vec<(String, PutOp, String)> {
    let mut out = Vec::new();
    flatten_into(config, "", default_op, &mut out);
    out
}

fn flatten_into(node: &Xml, base: &str, op: PutOp, out: &mut Vec<(String, PutOp, String)>) {
    for child in node.children() {
        let child_op = match child.attr("operation") {
            Some("delete") | Some("remove") => PutOp::Remove,
            Some("replace") => PutOp::Replace,
            Some("merge") => PutOp::Merge,
            _ => op,
        };
        let mut step = child.tag().to_string();
        if !child.children().is_empty() {
            let key = child
                .children()
                .iter()
                .find(|c| c.children().is_empty() && c.text().is_some());
            if let Some(key) = key {
                step = format!("{}[{}={}]", child.tag(), key.tag(), key.text().unwrap_or_default());
            }
        }
        let path = format!("{base}/{step}");
        if child_op == PutOp::Remove {
            out.push((path, PutOp::Remove, String::new()));
            continue;
        }
        if child.children().is_empty() {
            out.push((path, child_op, child.text().unwrap_or_default().to_string()));
        } else {
            if child_op == PutOp::Replace {
                // Clear the subtree once, then merge its new content.
                out.push((path.clone(), PutOp::Replace, String::new()));
            }
            flatten_into(child, &path, PutOp::Merge, out);
        }
    }
}

fn client_to_rpc(e: ClientError) -> RpcError {
    if let ClientError::Backend(ref be) = e {
        // Commit and validation failures carry a rendered <rpc-error>;
        // reconstruct its fields rather than wrapping text in text.
        if let Some(idx) = be.reason.find("<rpc-error>") {
            if let Ok(doc) = Xml::parse(&be.reason[idx..]) {
                if let Some(err) = RpcError::from_xml(&doc) {
                    return err;
                }
            }
        }
        return RpcError::application("operation-failed", None, be.reason.clone());
    }
    RpcError::new("operation-failed", ErrorType::Rpc, Severity::Error, e.to_string())
}

fn mid_attr(message_id: Option<&str>) -> String {
    match message_id {
        Some(mid) => format!(" message-id=\"{}\"", escape(mid)),
        None => String::new(),
    }
}

fn wrap_reply(message_id: Option<&str>, inner: &str) -> String {
    format!("<rpc-reply{}>{inner}</rpc-reply>", mid_attr(message_id))
}

fn error_reply(message_id: Option<&str>, err: &RpcError) -> String {
    wrap_reply(message_id, &err.to_xml())
}

#[cfg(test)]
#[path = "rpc_tests.rs"]
mod tests;
