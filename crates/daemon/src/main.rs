// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! helmd: the configuration backend daemon.

use anyhow::Context;
use clap::Parser;
use helm_core::load_yspec;
use helm_daemon::config::{Args, Config};
use helm_daemon::lifecycle;
use helm_daemon::plugin::PluginRegistry;
use helm_daemon::{Listener, NotifyLayer};
use tokio::signal::unix::{signal, SignalKind};
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

fn debug_filter(level: u32) -> &'static str {
    match level {
        0 => "info",
        1 => "debug",
        _ => "trace",
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let (filter_layer, filter_handle) =
        tracing_subscriber::reload::Layer::new(EnvFilter::new(debug_filter(args.debug)));
    let (notify_layer, mut log_rx) = NotifyLayer::new();
    tracing_subscriber::registry()
        .with(filter_layer)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(notify_layer)
        .init();

    let config = Config::load(&args).context("loading configuration")?;

    if args.zap {
        lifecycle::zap(&config)?;
        return Ok(());
    }

    if args.print_schema {
        let yspec = load_yspec(&config.schema_module, &config.schema_dir)?;
        print!("{}", yspec.describe());
    }

    if !args.foreground && !args.once {
        // Daemonization is the service manager's job; helmd stays in the
        // foreground either way.
        info!("running in foreground (no -F given; use a service manager to daemonize)");
    }

    // Compiled-in extension modules register here.
    let plugins = PluginRegistry::new();

    let argv: Vec<String> = std::env::args().collect();
    let result = lifecycle::startup(&config, plugins, &argv).await?;
    let (backend, listener, shutdown, _pid_lock) = result.into_parts();

    backend.lock().set_debug_hook(Box::new(move |level| {
        let _ = filter_handle.reload(EnvFilter::new(debug_filter(level)));
    }));

    if args.once {
        drop(listener);
        lifecycle::terminate(&backend, &config);
        return Ok(());
    }

    tokio::spawn(Listener::new(listener, backend.clone()).run());

    // Bridge log events at INFO and above onto the notification stream.
    let log_backend = backend.clone();
    tokio::spawn(async move {
        while let Some((level, line)) = log_rx.recv().await {
            log_backend.lock().publish_log(level, &line);
        }
    });

    let mut sigterm = signal(SignalKind::terminate()).context("installing SIGTERM handler")?;
    let mut sigint = signal(SignalKind::interrupt()).context("installing SIGINT handler")?;
    tokio::select! {
        _ = sigterm.recv() => info!("received SIGTERM"),
        _ = sigint.recv() => info!("received SIGINT"),
        _ = shutdown.notified() => info!("internal shutdown"),
    }

    lifecycle::terminate(&backend, &config);
    Ok(())
}
