//! Generation progress reporting.
//!
//! The orchestrator reports through a [`ProgressSender`]; exactly one
//! receiver consumes the events, so the orchestrator never knows who
//! displays them.

use tokio::sync::mpsc;

/// Capacity of the progress channel.
pub const PROGRESS_BUFFER: usize = 32;

/// Progress event emitted during a generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    /// Request is being submitted
    Submitted { message: String },

    /// Operation still running after `attempt` checks
    Polling { attempt: u32, message: String },

    /// Result is being downloaded
    Downloading { message: String },

    /// Result registered for playback
    Complete,
}

impl ProgressEvent {
    /// Status-line text, if the event has any.
    pub fn message(&self) -> Option<&str> {
        match self {
            ProgressEvent::Submitted { message }
            | ProgressEvent::Polling { message, .. }
            | ProgressEvent::Downloading { message } => Some(message),
            ProgressEvent::Complete => None,
        }
    }
}

/// Create a progress channel.
pub fn channel() -> (ProgressSender, mpsc::Receiver<ProgressEvent>) {
    let (tx, rx) = mpsc::channel(PROGRESS_BUFFER);
    (ProgressSender::new(tx), rx)
}

/// Progress sender for async contexts.
///
/// Uses a bounded channel so a slow consumer never stalls the orchestrator.
#[derive(Clone)]
pub struct ProgressSender {
    tx: mpsc::Sender<ProgressEvent>,
}

impl ProgressSender {
    pub fn new(tx: mpsc::Sender<ProgressEvent>) -> Self {
        Self { tx }
    }

    /// A sender whose events go nowhere.
    pub fn disconnected() -> Self {
        let (tx, _) = mpsc::channel(1);
        Self { tx }
    }

    /// Send a progress event (non-blocking).
    pub fn send(&self, event: ProgressEvent) {
        // Drop events if the channel is full or the receiver is gone
        let _ = self.tx.try_send(event);
    }

    pub fn submitted(&self, message: impl Into<String>) {
        self.send(ProgressEvent::Submitted {
            message: message.into(),
        });
    }

    pub fn polling(&self, attempt: u32, message: impl Into<String>) {
        self.send(ProgressEvent::Polling {
            attempt,
            message: message.into(),
        });
    }

    pub fn downloading(&self, message: impl Into<String>) {
        self.send(ProgressEvent::Downloading {
            message: message.into(),
        });
    }

    pub fn complete(&self) {
        self.send(ProgressEvent::Complete);
    }
}
