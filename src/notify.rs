//! Notification sink.
//!
//! The tracker only needs fire-and-forget `notify(text, severity, ttl)`. Anything that
//! can show or forward a message (toast, log line, channel to a UI task) plugs in here.

use crate::model::{Notification, Severity};
use tokio::sync::mpsc;
use tracing::Level;

pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Writes notifications to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl TracingNotifier {
    pub fn level(severity: Severity) -> Level {
        match severity {
            Severity::Info | Severity::Success => Level::INFO,
            Severity::Warning => Level::WARN,
            Severity::Error => Level::ERROR,
        }
    }
}

impl Notifier for TracingNotifier {
    fn notify(&self, n: Notification) {
        let level = Self::level(n.severity);
        let sticky = n.is_sticky();
        if level == Level::ERROR {
            tracing::error!(sticky, "{}", n.text);
        } else if level == Level::WARN {
            tracing::warn!(sticky, "{}", n.text);
        } else {
            tracing::info!(sticky, "{}", n.text);
        }
    }
}

/// Forwards notifications to a receiver owned by a presentation layer.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    tx: mpsc::UnboundedSender<Notification>,
}

impl ChannelNotifier {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Notifier for ChannelNotifier {
    fn notify(&self, notification: Notification) {
        // A closed receiver just means nobody is watching any more.
        let _ = self.tx.send(notification);
    }
}
