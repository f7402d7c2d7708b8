// ─── Panel Events ───
// Asynchronous notifications from the background units (child process,
// downloads) back to the single registered listener.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::mpsc;

use crate::core::downloader::DownloadOutcome;
use crate::core::process::ServerStatus;

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PanelEvent {
    /// One line for the console area: process output, echoed commands or
    /// status messages, in arrival order.
    Console { line: String, at: DateTime<Utc> },
    ServerStatus { status: ServerStatus },
    ServerExited { version: String, code: Option<i32> },
    DownloadProgress {
        task_id: String,
        version: String,
        percent: u8,
    },
    DownloadFinished {
        task_id: String,
        version: String,
        outcome: DownloadOutcome,
    },
}

impl PanelEvent {
    pub fn console(line: impl Into<String>) -> Self {
        PanelEvent::Console {
            line: line.into(),
            at: Utc::now(),
        }
    }
}

pub type EventSender = mpsc::UnboundedSender<PanelEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<PanelEvent>;

pub fn channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}

/// Events sent after the listener is gone are dropped.
pub(crate) fn emit(sender: &EventSender, event: PanelEvent) {
    let _ = sender.send(event);
}
