// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! helm-netconf: NETCONF on stdin/stdout, backend over the control
//! socket.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use helm_netconf::{Frontend, Outcome};
use helm_wire::{BackendClient, SentinelDecoder, SENTINEL};
use serde::Deserialize;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::info;

/// helm-netconf - NETCONF frontend for the helm backend
#[derive(Debug, Parser)]
#[command(name = "helm-netconf")]
struct Args {
    /// Configuration file (mandatory)
    #[arg(short = 'f', value_name = "FILE")]
    config_file: PathBuf,

    /// Debug level
    #[arg(short = 'D', value_name = "LEVEL", default_value_t = 0)]
    debug: u32,

    /// Quiet: don't send the hello prompt
    #[arg(short = 'q')]
    quiet: bool,

    /// Netconf plugin directory
    #[arg(short = 'd', value_name = "DIR")]
    plugin_dir: Option<PathBuf>,

    /// Log to stderr in syslog style
    #[arg(short = 'S')]
    syslog: bool,
}

/// The slice of the shared configuration file this process needs.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FrontendConfig {
    socket: Option<PathBuf>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let filter = match args.debug {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    if args.syslog {
        // Syslog collection is the service manager's job; stderr stays
        // the sink either way.
        info!("-S given; logs remain on stderr for the collector");
    }

    let content = std::fs::read_to_string(&args.config_file)
        .with_context(|| format!("reading {}", args.config_file.display()))?;
    let config: FrontendConfig = toml::from_str(&content).context("parsing configuration")?;
    let socket = config.socket.context("socket not set in configuration")?;
    if let Some(ref dir) = args.plugin_dir {
        info!(dir = %dir.display(), "netconf plugin directory");
    }

    let client = BackendClient::connect(&socket).await?;
    let mut frontend = Frontend::new(client, std::process::id());

    let mut stdin = tokio::io::stdin();
    let mut stdout = tokio::io::stdout();

    if !args.quiet {
        write_doc(&mut stdout, &frontend.hello()).await?;
    }

    let mut decoder = SentinelDecoder::new();
    let mut buf = [0u8; 4096];
    loop {
        let n = stdin.read(&mut buf).await.context("reading stdin")?;
        if n == 0 {
            break;
        }
        for doc in decoder.push(&buf[..n]) {
            match frontend.process(&doc).await {
                Outcome::NoReply => {}
                Outcome::Reply(reply) => write_doc(&mut stdout, &reply).await?,
                Outcome::Close(reply) => {
                    write_doc(&mut stdout, &reply).await?;
                    return Ok(());
                }
            }
        }
    }
    Ok(())
}

async fn write_doc(
    stdout: &mut tokio::io::Stdout,
    doc: &str,
) -> anyhow::Result<()> {
    stdout.write_all(doc.as_bytes()).await?;
    stdout.write_all(SENTINEL).await?;
    stdout.flush().await?;
    Ok(())
}
