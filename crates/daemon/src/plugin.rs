// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Extension modules and their registry.
//!
//! Plugins publish commit hooks and RPC handlers through the [`Plugin`]
//! capability trait; every hook has a no-op default. The registry keeps
//! registration order for forward iteration and reverses it for rollback.

use std::collections::HashMap;

use helm_core::{BackendError, RpcError};
use tracing::info;

use crate::diff::Change;

/// Transaction data exposed to commit hooks.
#[derive(Debug, Clone)]
pub struct TxData {
    /// Source datastore (usually `candidate`).
    pub src: String,
    /// Target datastore (usually `running`).
    pub dst: String,
    /// Ordered change set from the diff.
    pub changes: Vec<Change>,
}

/// An extension module. Hooks are invoked from the event loop and must
/// run to completion promptly; long work belongs on the plugin's own
/// schedule.
pub trait Plugin: Send {
    fn name(&self) -> &str;

    /// Called once at registration time. A failure aborts daemon startup.
    fn init(&self) -> Result<(), BackendError> {
        Ok(())
    }

    /// Called once after all plugins are initialized, with the daemon's
    /// argv. A failure aborts daemon startup.
    fn start(&self, _argv: &[String]) -> Result<(), BackendError> {
        Ok(())
    }

    /// Reset system state into the named datastore (`-R`/`-C`).
    fn reset(&self, _db: &str) -> Result<(), BackendError> {
        Ok(())
    }

    /// Transaction opens for this plugin; invoked immediately before its
    /// `validate`.
    fn begin(&self, _td: &TxData) -> Result<(), BackendError> {
        Ok(())
    }

    fn validate(&self, _td: &TxData) -> Result<(), RpcError> {
        Ok(())
    }

    /// Final chance to reject before the target datastore is replaced.
    fn complete(&self, _td: &TxData) -> Result<(), RpcError> {
        Ok(())
    }

    /// The configuration is live; a failure here is logged, never rolled
    /// back.
    fn commit(&self, _td: &TxData) -> Result<(), BackendError> {
        Ok(())
    }

    fn end(&self, _td: &TxData) {}

    fn abort(&self, _td: &TxData) {}

    fn exit(&self) {}
}

/// A plugin-registered RPC handler, keyed by `(namespace, name)`.
pub trait RpcHandler: Send {
    fn call(&self, args: &[u8]) -> Result<Vec<u8>, BackendError>;
}

impl<F> RpcHandler for F
where
    F: Fn(&[u8]) -> Result<Vec<u8>, BackendError> + Send,
{
    fn call(&self, args: &[u8]) -> Result<Vec<u8>, BackendError> {
        self(args)
    }
}

#[derive(Default)]
pub struct PluginRegistry {
    plugins: Vec<Box<dyn Plugin>>,
    rpc: HashMap<(String, String), Box<dyn RpcHandler>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a plugin and run its `init` hook. Registration order is
    /// invocation order for every forward hook.
    pub fn register(&mut self, plugin: Box<dyn Plugin>) -> Result<(), BackendError> {
        plugin.init()?;
        info!(plugin = plugin.name(), "registered plugin");
        self.plugins.push(plugin);
        Ok(())
    }

    pub fn plugins(&self) -> &[Box<dyn Plugin>] {
        &self.plugins
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Run `start` across all plugins in order.
    pub fn start_all(&self, argv: &[String]) -> Result<(), BackendError> {
        for plugin in &self.plugins {
            plugin.start(argv)?;
        }
        Ok(())
    }

    /// Run `reset` across all plugins in order.
    pub fn reset_all(&self, db: &str) -> Result<(), BackendError> {
        for plugin in &self.plugins {
            plugin.reset(db)?;
        }
        Ok(())
    }

    /// Run `exit` across all plugins, in reverse registration order.
    pub fn exit_all(&self) {
        for plugin in self.plugins.iter().rev() {
            plugin.exit();
        }
    }

    /// Register an RPC handler. Re-registration under the same key
    /// replaces the prior handler.
    pub fn register_rpc(
        &mut self,
        namespace: impl Into<String>,
        name: impl Into<String>,
        handler: Box<dyn RpcHandler>,
    ) {
        self.rpc.insert((namespace.into(), name.into()), handler);
    }

    pub fn clear_all_rpc(&mut self) {
        self.rpc.clear();
    }

    /// Invoke a registered handler.
    pub fn call(&self, namespace: &str, name: &str, args: &[u8]) -> Result<Vec<u8>, BackendError> {
        match self.rpc.get(&(namespace.to_string(), name.to_string())) {
            Some(handler) => handler.call(args),
            None => Err(BackendError::msg(
                helm_core::ErrClass::Plugin,
                format!("no rpc handler for {namespace}:{name}"),
            )),
        }
    }
}

#[cfg(test)]
#[path = "plugin_tests.rs"]
mod tests;
