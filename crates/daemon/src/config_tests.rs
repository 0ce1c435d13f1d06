// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use clap::Parser;

use super::*;

fn write_config(content: &str) -> tempfile::NamedTempFile {
    let file = tempfile::NamedTempFile::new().unwrap();
    std::fs::write(file.path(), content).unwrap();
    file
}

const FULL: &str = r#"
socket = "/run/helm.sock"
pidfile = "/run/helmd.pid"
group = "helm"
db_dir = "/var/lib/helm/db"
schema_dir = "/usr/share/helm/schemas"
schema_module = "cfg"
use_startup = true
"#;

fn parse_args(argv: &[&str]) -> Args {
    Args::try_parse_from(argv).unwrap()
}

#[test]
fn file_values_are_loaded() {
    let file = write_config(FULL);
    let args = parse_args(&["helmd", "-f", file.path().to_str().unwrap()]);
    let config = Config::load(&args).unwrap();
    assert_eq!(config.socket.to_str(), Some("/run/helm.sock"));
    assert_eq!(config.group.as_deref(), Some("helm"));
    assert_eq!(config.schema_module, "cfg");
    assert_eq!(config.store_plugin, "xmlfile", "default storage plugin");
    assert!(config.use_startup);
}

#[test]
fn flags_override_the_file() {
    let file = write_config(FULL);
    let args = parse_args(&[
        "helmd",
        "-f",
        file.path().to_str().unwrap(),
        "-u",
        "/tmp/other.sock",
        "-g",
        "wheel",
        "-y",
        "other",
        "-x",
        "mem",
        "-I",
        "-r",
    ]);
    let config = Config::load(&args).unwrap();
    assert_eq!(config.socket.to_str(), Some("/tmp/other.sock"));
    assert_eq!(config.group.as_deref(), Some("wheel"));
    assert_eq!(config.schema_module, "other");
    assert_eq!(config.store_plugin, "mem");
    assert!(config.init_running);
    assert!(config.reload_running);
    assert!(!config.reset_running);
}

#[test]
fn missing_required_value_is_a_config_error() {
    let file = write_config("socket = \"/run/helm.sock\"\n");
    let args = parse_args(&["helmd", "-f", file.path().to_str().unwrap()]);
    let err = Config::load(&args).unwrap_err();
    assert_eq!(err.class, helm_core::ErrClass::Config);
}

#[test]
fn unknown_keys_are_rejected() {
    let file = write_config("bogus_key = 1\n");
    let args = parse_args(&["helmd", "-f", file.path().to_str().unwrap()]);
    assert!(Config::load(&args).is_err());
}

#[test]
fn missing_config_file_is_reported() {
    let args = parse_args(&["helmd", "-f", "/nonexistent/helm.toml"]);
    let err = Config::load(&args).unwrap_err();
    assert_eq!(err.class, helm_core::ErrClass::Config);
    assert_eq!(err.sub, 2); // ENOENT
}

#[test]
fn config_file_flag_is_mandatory() {
    assert!(Args::try_parse_from(["helmd"]).is_err());
}
