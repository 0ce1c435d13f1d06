// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Notification streams and the log-event bridge.
//!
//! Clients subscribe to named streams; producers publish and every
//! subscriber gets a NOTIFY frame, best effort. The built-in `CLICON`
//! stream carries the daemon's own log lines at INFO and above, fed by a
//! tracing layer.

use std::collections::HashMap;
use std::fmt;

use helm_core::SessionId;
use tokio::sync::mpsc;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::Layer;

/// Named streams with ordered subscriber lists.
#[derive(Default)]
pub struct NotifyBus {
    streams: HashMap<String, Vec<SessionId>>,
}

impl NotifyBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a session to a stream; re-subscription is a no-op. Streams
    /// come into being on first subscription.
    pub fn subscribe(&mut self, stream: &str, sid: SessionId) {
        let subs = self.streams.entry(stream.to_string()).or_default();
        if !subs.contains(&sid) {
            subs.push(sid);
        }
    }

    pub fn subscribers(&self, stream: &str) -> &[SessionId] {
        self.streams.get(stream).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Drop every subscription a session holds.
    pub fn unsubscribe_session(&mut self, sid: SessionId) {
        for subs in self.streams.values_mut() {
            subs.retain(|&s| s != sid);
        }
    }
}

/// Escape `%` as `%%` so payloads survive later formatters.
pub fn escape_percent(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        out.push(c);
        if c == '%' {
            out.push('%');
        }
    }
    out
}

/// Syslog-style severity for a tracing level.
fn syslog_level(level: &Level) -> u32 {
    match *level {
        Level::ERROR => 3,
        Level::WARN => 4,
        _ => 6,
    }
}

/// A tracing layer forwarding formatted events at INFO and above into a
/// channel; the daemon drains it and publishes to the `CLICON` stream.
pub struct NotifyLayer {
    tx: mpsc::UnboundedSender<(u32, String)>,
}

impl NotifyLayer {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<(u32, String)>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl<S: Subscriber> Layer<S> for NotifyLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let meta = event.metadata();
        if *meta.level() > Level::INFO {
            return;
        }
        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);
        let line = format!("{}: {}", meta.target(), visitor.message);
        // Best effort: if the drain task is gone the daemon is shutting
        // down and the event only goes to the ordinary subscriber.
        let _ = self.tx.send((syslog_level(meta.level()), line));
    }
}

#[derive(Default)]
struct MessageVisitor {
    message: String,
}

impl Visit for MessageVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message.push_str(value);
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            use fmt::Write;
            let _ = write!(self.message, "{value:?}");
        }
    }
}

#[cfg(test)]
#[path = "notify_tests.rs"]
mod tests;
