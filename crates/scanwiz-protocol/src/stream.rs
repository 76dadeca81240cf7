use crate::ProtocolError;
use scanwiz_core::ScanStatus;
use serde::{Deserialize, Serialize};

/// Status values the backend pushes on the terminal stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoteStatus {
    Running,
    Completed,
    Failed,
}

impl From<RemoteStatus> for ScanStatus {
    fn from(status: RemoteStatus) -> Self {
        match status {
            RemoteStatus::Running => ScanStatus::Running,
            RemoteStatus::Completed => ScanStatus::Completed,
            RemoteStatus::Failed => ScanStatus::Failed,
        }
    }
}

impl RemoteStatus {
    /// Parse the status string stored on a session record.
    ///
    /// `pending` and anything else the stream never sends yields `None`.
    #[must_use]
    pub fn from_record(status: &str) -> Option<Self> {
        match status {
            "running" => Some(RemoteStatus::Running),
            "completed" => Some(RemoteStatus::Completed),
            "failed" => Some(RemoteStatus::Failed),
            _ => None,
        }
    }
}

/// One JSON text frame from `/ws/terminal/{session_id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamMessage {
    Output { line: String },
    Status { status: RemoteStatus },
    Command { command: String },
    /// Progress-bar line the backend already sent as `output`.
    Progress { line: String },
    Error { error: String },
}

impl StreamMessage {
    /// Decode a text frame.
    ///
    /// # Errors
    /// Returns `ProtocolError::Malformed` for invalid JSON, an unknown `type`,
    /// or a payload missing its fields.
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(text)?)
    }
}
