use scanwiz_core::{CompleteSelection, EnvironmentInfo, ModelInfo, ScanTool};
use serde::{Deserialize, Serialize};

pub const MODELS_PATH: &str = "/api/models";
pub const ENVIRONMENTS_PATH: &str = "/api/environments";
pub const PROBES_PATH: &str = "/api/garak/probes";
pub const START_SCAN_PATH: &str = "/api/scan/start";

#[must_use]
pub fn session_record_path(session_id: &str) -> String {
    format!("/api/scan/{session_id}")
}

#[must_use]
pub fn terminal_stream_path(session_id: &str) -> String {
    format!("/ws/terminal/{session_id}")
}

/// Catalog listings may report an `error` next to an empty list.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelsResponse {
    #[serde(default)]
    pub models: Vec<ModelInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnvironmentsResponse {
    #[serde(default)]
    pub environments: Vec<EnvironmentInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProbesResponse {
    #[serde(default)]
    pub probes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartScanRequest {
    pub model_name: String,
    pub environment: String,
    pub tool: ScanTool,
    pub probe: String,
}

impl From<CompleteSelection> for StartScanRequest {
    fn from(selection: CompleteSelection) -> Self {
        Self {
            model_name: selection.model,
            environment: selection.environment,
            tool: selection.tool,
            probe: selection.probe,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartScanResponse {
    pub session_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// Stored session as returned by `GET /api/scan/{session_id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: String,
    pub model_name: String,
    pub environment: String,
    pub tool: String,
    pub probe: String,
    pub status: String,
    #[serde(default)]
    pub output: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
}
