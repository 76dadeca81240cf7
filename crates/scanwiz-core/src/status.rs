use serde::{Deserialize, Serialize};

/// Lifecycle of a single scan session as seen by the client.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanStatus {
    #[default]
    Idle,
    Starting,
    Running,
    Completed,
    Failed,
    /// The event stream ended before the backend reported a terminal status.
    UnknownDisconnect,
}

impl ScanStatus {
    /// A session that is waiting on, or receiving from, the backend.
    #[must_use]
    pub fn is_live(self) -> bool {
        matches!(self, ScanStatus::Starting | ScanStatus::Running)
    }

    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, ScanStatus::Completed | ScanStatus::Failed)
    }

    /// Nothing further will arrive on its own: terminal, or the stream was lost.
    #[must_use]
    pub fn is_settled(self) -> bool {
        self.is_terminal() || self == ScanStatus::UnknownDisconnect
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            ScanStatus::Idle => "Idle",
            ScanStatus::Starting => "Starting",
            ScanStatus::Running => "Running",
            ScanStatus::Completed => "Completed",
            ScanStatus::Failed => "Failed",
            ScanStatus::UnknownDisconnect => "Disconnected",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_live_and_terminal_are_disjoint() {
        let all = [
            ScanStatus::Idle,
            ScanStatus::Starting,
            ScanStatus::Running,
            ScanStatus::Completed,
            ScanStatus::Failed,
            ScanStatus::UnknownDisconnect,
        ];
        for status in all {
            assert!(!(status.is_live() && status.is_terminal()), "{status:?}");
        }
        assert!(ScanStatus::UnknownDisconnect.is_settled());
        assert!(!ScanStatus::UnknownDisconnect.is_terminal());
        assert!(!ScanStatus::Idle.is_settled());
    }

    #[test]
    fn test_status_serializes_snake_case() {
        let json = serde_json::to_string(&ScanStatus::UnknownDisconnect).unwrap();
        assert_eq!(json, "\"unknown_disconnect\"");
    }
}
