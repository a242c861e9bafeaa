//! Progress sinks shared with a user-interface thread.
//!
//! A build runs on one thread while the interface polls the last reported
//! progress. [`ProgressMonitor`] keeps that state behind a single mutex;
//! [`ChannelProgressAction`] pushes every update through a channel instead.

use mdmesh_factories::ProgressAction;
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex, PoisonError};

/// Last reported progress.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressState {
    /// Fraction completed, 0.0 to 1.0.
    pub fraction: f64,
    /// User-facing status message.
    pub text: String,
}

impl Default for ProgressState {
    fn default() -> Self {
        Self {
            fraction: 0.0,
            text: "Ready".to_string(),
        }
    }
}

/// Thread-safe holder of the last reported progress.
#[derive(Debug, Clone, Default)]
pub struct ProgressMonitor {
    state: Arc<Mutex<ProgressState>>,
}

impl ProgressMonitor {
    /// Creates a monitor in the ready state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A [`ProgressAction`] that records updates labelled `text`.
    #[must_use]
    pub fn action(&self, text: impl Into<String>) -> MonitorAction {
        MonitorAction {
            state: Arc::clone(&self.state),
            text: text.into(),
        }
    }

    /// Snapshot of the last update.
    #[must_use]
    pub fn snapshot(&self) -> ProgressState {
        // A panicking writer leaves a complete value behind.
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// [`ProgressAction`] writing into a [`ProgressMonitor`].
#[derive(Debug, Clone)]
pub struct MonitorAction {
    state: Arc<Mutex<ProgressState>>,
    text: String,
}

impl ProgressAction for MonitorAction {
    fn event_raised(&mut self, fraction: f64) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.fraction = fraction;
        if state.text != self.text {
            state.text.clone_from(&self.text);
        }
    }
}

/// Message sent by [`ChannelProgressAction`].
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressUpdate {
    /// Fraction completed, 0.0 to 1.0.
    pub fraction: f64,
    /// User-facing status message.
    pub text: String,
}

/// [`ProgressAction`] sending every update over a channel.
///
/// A dropped receiver is not an error; updates are discarded.
#[derive(Debug, Clone)]
pub struct ChannelProgressAction {
    tx: Sender<ProgressUpdate>,
    text: String,
}

impl ChannelProgressAction {
    /// Sends updates labelled `text` through `tx`.
    pub fn new(tx: Sender<ProgressUpdate>, text: impl Into<String>) -> Self {
        Self {
            tx,
            text: text.into(),
        }
    }
}

impl ProgressAction for ChannelProgressAction {
    fn event_raised(&mut self, fraction: f64) {
        let _ = self.tx.send(ProgressUpdate {
            fraction,
            text: self.text.clone(),
        });
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::float_cmp)]
    use super::*;
    use std::sync::mpsc::channel;
    use std::thread;

    #[test]
    fn test_monitor_shared_across_threads() {
        let monitor = ProgressMonitor::new();
        assert_eq!(monitor.snapshot().text, "Ready");
        let mut action = monitor.action("Drawing");
        let handle = thread::spawn(move || {
            for i in 0..=10 {
                action.event_raised(f64::from(i) / 10.0);
            }
        });
        handle.join().unwrap();
        let state = monitor.snapshot();
        assert_eq!(state.fraction, 1.0);
        assert_eq!(state.text, "Drawing");
    }

    #[test]
    fn test_channel_delivers_in_order() {
        let (tx, rx) = channel();
        let mut action = ChannelProgressAction::new(tx, "Loading");
        action.event_raised(0.5);
        action.event_raised(1.0);
        drop(action);
        let updates: Vec<ProgressUpdate> = rx.iter().collect();
        assert_eq!(updates.len(), 2);
        assert_eq!(updates[1].fraction, 1.0);
        assert_eq!(updates[0].text, "Loading");
    }

    #[test]
    fn test_channel_ignores_dropped_receiver() {
        let (tx, rx) = channel();
        drop(rx);
        let mut action = ChannelProgressAction::new(tx, "Loading");
        action.event_raised(0.5);
    }
}
