// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Backend configuration: POSIX single-letter flags plus a mandatory TOML
//! configuration file. Flags override file values.

use std::path::PathBuf;

use clap::Parser;
use helm_core::{BackendError, ErrClass};
use serde::Deserialize;

/// helmd - configuration backend daemon
#[derive(Debug, Parser)]
#[command(name = "helmd")]
pub struct Args {
    /// Configuration file (mandatory)
    #[arg(short = 'f', value_name = "FILE")]
    pub config_file: PathBuf,

    /// Debug level
    #[arg(short = 'D', value_name = "LEVEL", default_value_t = 0)]
    pub debug: u32,

    /// Plugin directory
    #[arg(short = 'd', value_name = "DIR")]
    pub plugin_dir: Option<PathBuf>,

    /// Datastore directory
    #[arg(short = 'b', value_name = "DIR")]
    pub db_dir: Option<PathBuf>,

    /// Kill other backend daemon and exit
    #[arg(short = 'z')]
    pub zap: bool,

    /// Run in foreground
    #[arg(short = 'F')]
    pub foreground: bool,

    /// Run once: initialize datastores, then exit without serving
    #[arg(short = '1')]
    pub once: bool,

    /// Control socket path
    #[arg(short = 'u', value_name = "PATH")]
    pub socket: Option<PathBuf>,

    /// Pid file
    #[arg(short = 'P', value_name = "FILE")]
    pub pidfile: Option<PathBuf>,

    /// Initialize the running datastore
    #[arg(short = 'I')]
    pub init_running: bool,

    /// Run plugin reset hooks against running (use with -I)
    #[arg(short = 'R')]
    pub reset_running: bool,

    /// Run plugin reset hooks against candidate and commit it
    #[arg(short = 'C')]
    pub reset_candidate: bool,

    /// Load an application configuration file into running
    #[arg(short = 'c', value_name = "FILE")]
    pub app_config: Option<PathBuf>,

    /// Reload the running datastore through candidate
    #[arg(short = 'r')]
    pub reload_running: bool,

    /// Print the loaded schema
    #[arg(short = 'p')]
    pub print_schema: bool,

    /// Socket group
    #[arg(short = 'g', value_name = "GROUP")]
    pub group: Option<String>,

    /// Override the schema module
    #[arg(short = 'y', value_name = "MODULE")]
    pub schema_module: Option<String>,

    /// Storage plugin
    #[arg(short = 'x', value_name = "PLUGIN")]
    pub store_plugin: Option<String>,
}

/// The TOML configuration file.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConfigFile {
    socket: Option<PathBuf>,
    pidfile: Option<PathBuf>,
    group: Option<String>,
    db_dir: Option<PathBuf>,
    plugin_dir: Option<PathBuf>,
    schema_dir: Option<PathBuf>,
    schema_module: Option<String>,
    store_plugin: Option<String>,
    use_startup: Option<bool>,
}

/// Resolved configuration the daemon runs with.
#[derive(Debug, Clone)]
pub struct Config {
    pub socket: PathBuf,
    pub pidfile: PathBuf,
    /// Socket group; `None` skips the chgrp and the group sanity check.
    pub group: Option<String>,
    pub db_dir: PathBuf,
    pub plugin_dir: Option<PathBuf>,
    pub schema_dir: PathBuf,
    pub schema_module: String,
    pub store_plugin: String,
    pub use_startup: bool,
    // Startup behavior from the command line.
    pub init_running: bool,
    pub reset_running: bool,
    pub reset_candidate: bool,
    pub reload_running: bool,
    pub app_config: Option<PathBuf>,
}

impl Config {
    /// Read the configuration file and fold in the flag overrides.
    pub fn load(args: &Args) -> Result<Self, BackendError> {
        let content = std::fs::read_to_string(&args.config_file).map_err(|e| {
            BackendError::io(ErrClass::Config, &args.config_file.display().to_string(), &e)
        })?;
        let file: ConfigFile = toml::from_str(&content)
            .map_err(|e| BackendError::msg(ErrClass::Config, e.to_string()))?;
        Self::resolve(args, file)
    }

    fn resolve(args: &Args, file: ConfigFile) -> Result<Self, BackendError> {
        let required = |value: Option<PathBuf>, name: &str| {
            value.ok_or_else(|| {
                BackendError::msg(ErrClass::Config, format!("{name} not set in config or flags"))
            })
        };
        let schema_module = args
            .schema_module
            .clone()
            .or(file.schema_module)
            .ok_or_else(|| BackendError::msg(ErrClass::Config, "schema_module not set"))?;
        Ok(Config {
            socket: required(args.socket.clone().or(file.socket), "socket")?,
            pidfile: required(args.pidfile.clone().or(file.pidfile), "pidfile")?,
            group: args.group.clone().or(file.group),
            db_dir: required(args.db_dir.clone().or(file.db_dir), "db_dir")?,
            plugin_dir: args.plugin_dir.clone().or(file.plugin_dir),
            schema_dir: required(file.schema_dir, "schema_dir")?,
            schema_module,
            store_plugin: args
                .store_plugin
                .clone()
                .or(file.store_plugin)
                .unwrap_or_else(|| "xmlfile".to_string()),
            use_startup: file.use_startup.unwrap_or(false),
            init_running: args.init_running,
            reset_running: args.reset_running,
            reset_candidate: args.reset_candidate,
            reload_running: args.reload_running,
            app_config: args.app_config.clone(),
        })
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
