//! Progress side channel.
//!
//! Stages report each named step through a [`ProgressSink`]. Notification is
//! fire-and-forget: `notify` is synchronous, never blocks and never fails, so
//! it cannot influence pipeline control flow or ordering.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tracing::info;

/// Receiver of human-readable progress messages.
pub trait ProgressSink: Send + Sync {
    fn notify(&self, message: &str);
}

impl<T: ProgressSink + ?Sized> ProgressSink for Arc<T> {
    fn notify(&self, message: &str) {
        (**self).notify(message)
    }
}

/// Discards every message.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullProgress;

impl ProgressSink for NullProgress {
    fn notify(&self, _message: &str) {}
}

/// Mirrors progress into the `tracing` log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingProgress;

impl ProgressSink for TracingProgress {
    fn notify(&self, message: &str) {
        info!(target: "forge::progress", "{}", message);
    }
}

/// Forwards progress over an unbounded channel to a consumer task.
///
/// Sending never waits; once the receiver is gone messages are dropped.
#[derive(Debug, Clone)]
pub struct ChannelProgress {
    sender: UnboundedSender<String>,
}

impl ChannelProgress {
    /// Create a sink together with the receiving end.
    pub fn new() -> (Self, UnboundedReceiver<String>) {
        let (sender, receiver) = unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl ProgressSink for ChannelProgress {
    fn notify(&self, message: &str) {
        let _ = self.sender.send(message.to_string());
    }
}

/// Keeps every message in memory, for tests and run summaries.
#[derive(Debug, Default, Clone)]
pub struct RecordingProgress {
    messages: Arc<Mutex<Vec<String>>>,
}

impl RecordingProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().clone()
    }

    /// True if any recorded message contains `needle`.
    pub fn contains(&self, needle: &str) -> bool {
        self.messages.lock().iter().any(|m| m.contains(needle))
    }
}

impl ProgressSink for RecordingProgress {
    fn notify(&self, message: &str) {
        self.messages.lock().push(message.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_progress() {
        let progress = RecordingProgress::new();
        progress.notify("[Design] drafting");
        progress.notify("[Test] attempt 1/3");

        assert_eq!(progress.messages().len(), 2);
        assert!(progress.contains("attempt 1/3"));
        assert!(!progress.contains("Review"));
    }

    #[tokio::test]
    async fn test_channel_progress_delivers_in_order() {
        let (progress, mut receiver) = ChannelProgress::new();
        progress.notify("first");
        progress.notify("second");

        assert_eq!(receiver.recv().await.as_deref(), Some("first"));
        assert_eq!(receiver.recv().await.as_deref(), Some("second"));
    }

    #[test]
    fn test_channel_progress_survives_dropped_receiver() {
        let (progress, receiver) = ChannelProgress::new();
        drop(receiver);
        progress.notify("nobody is listening");
    }

    #[test]
    fn test_arc_sink_delegates() {
        let recording = Arc::new(RecordingProgress::new());
        let sink: Arc<dyn ProgressSink> = recording.clone();
        sink.notify("hello");
        assert!(recording.contains("hello"));
    }
}
