use scanwiz_core::SelectionError;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid backend URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("Unsupported backend URL scheme '{0}' (expected http or https)")]
    UnsupportedScheme(String),

    #[error("Directory error: {0}")]
    Directory(String),

    #[error("Cannot write log file {path}: {source}")]
    LogFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Backend returned {status} for {url}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("Backend reported: {0}")]
    Reported(String),

    #[error("Request task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[derive(Error, Debug)]
pub enum StreamError {
    #[error("Failed to connect event stream: {0}")]
    Connect(String),

    #[error("Event stream connect timed out after {0:?}")]
    Timeout(Duration),

    #[error("Event stream transport error: {0}")]
    Transport(String),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StartScanError {
    #[error("Invalid selection: {0}")]
    InvalidSelection(#[from] SelectionError),

    #[error("A scan session is already active")]
    SessionAlreadyActive,
}
