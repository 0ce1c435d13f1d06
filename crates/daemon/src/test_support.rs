// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for daemon unit tests.

use std::sync::Arc;

use helm_core::{BackendError, ErrClass, RpcError, Xml, Yspec};
use parking_lot::Mutex;

use crate::plugin::{Plugin, TxData};

/// The host/domain schema used across daemon tests.
pub fn yspec() -> Arc<Yspec> {
    let doc = Xml::parse(
        "<module name=\"cfg\">\
           <container name=\"cfg\">\
             <list name=\"host\"><key>name</key>\
               <leaf name=\"name\"/><leaf name=\"addr\"/>\
             </list>\
             <leaf name=\"domain\"/>\
           </container>\
         </module>",
    )
    .unwrap();
    Arc::new(Yspec::from_xml(&doc).unwrap())
}

/// Which hook, if any, a [`RecordingPlugin`] fails in.
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum FailIn {
    Nothing,
    Init,
    Start,
    Begin,
    Validate,
    Complete,
    Commit,
}

/// Records every hook invocation as `"<name>:<hook>"` into a shared log.
pub struct RecordingPlugin {
    name: String,
    log: Arc<Mutex<Vec<String>>>,
    fail_in: FailIn,
}

impl RecordingPlugin {
    pub fn new(name: &str, log: Arc<Mutex<Vec<String>>>) -> Self {
        Self { name: name.to_string(), log, fail_in: FailIn::Nothing }
    }

    pub fn failing(name: &str, log: Arc<Mutex<Vec<String>>>, fail_in: FailIn) -> Self {
        Self { name: name.to_string(), log, fail_in }
    }

    fn record(&self, hook: &str) {
        self.log.lock().push(format!("{}:{hook}", self.name));
    }
}

impl Plugin for RecordingPlugin {
    fn name(&self) -> &str {
        &self.name
    }

    fn init(&self) -> Result<(), BackendError> {
        self.record("init");
        if self.fail_in == FailIn::Init {
            return Err(BackendError::msg(ErrClass::Plugin, "init refused"));
        }
        Ok(())
    }

    fn start(&self, _argv: &[String]) -> Result<(), BackendError> {
        self.record("start");
        if self.fail_in == FailIn::Start {
            return Err(BackendError::msg(ErrClass::Plugin, "start refused"));
        }
        Ok(())
    }

    fn reset(&self, db: &str) -> Result<(), BackendError> {
        self.log.lock().push(format!("{}:reset:{db}", self.name));
        Ok(())
    }

    fn begin(&self, _td: &TxData) -> Result<(), BackendError> {
        self.record("begin");
        if self.fail_in == FailIn::Begin {
            return Err(BackendError::msg(ErrClass::Plugin, "begin refused"));
        }
        Ok(())
    }

    fn validate(&self, _td: &TxData) -> Result<(), RpcError> {
        self.record("validate");
        if self.fail_in == FailIn::Validate {
            return Err(RpcError::application("invalid-value", Some("/cfg"), "validate refused"));
        }
        Ok(())
    }

    fn complete(&self, _td: &TxData) -> Result<(), RpcError> {
        self.record("complete");
        if self.fail_in == FailIn::Complete {
            return Err(RpcError::application("operation-failed", None, "complete refused"));
        }
        Ok(())
    }

    fn commit(&self, _td: &TxData) -> Result<(), BackendError> {
        self.record("commit");
        if self.fail_in == FailIn::Commit {
            return Err(BackendError::msg(ErrClass::Plugin, "commit hiccup"));
        }
        Ok(())
    }

    fn end(&self, _td: &TxData) {
        self.record("end");
    }

    fn abort(&self, _td: &TxData) {
        self.record("abort");
    }

    fn exit(&self) {
        self.record("exit");
    }
}
