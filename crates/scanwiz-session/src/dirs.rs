use crate::ConfigError;
use std::fs::{self, OpenOptions};
use std::path::PathBuf;

pub const LOG_FILE_NAME: &str = "scanwiz.log";

pub struct ScanwizDirs {
    pub state: PathBuf,
    pub config: PathBuf,
}

impl ScanwizDirs {
    /// Locate platform-specific state/config directories for scanwiz.
    ///
    /// # Errors
    /// Returns `ConfigError::Directory` if standard OS directories cannot be determined.
    pub fn new() -> Result<Self, ConfigError> {
        let state = dirs::state_dir()
            .or_else(dirs::data_local_dir)
            .ok_or_else(|| ConfigError::Directory("state directory not found".into()))?
            .join("scanwiz");

        let config = dirs::config_dir()
            .ok_or_else(|| ConfigError::Directory("config directory not found".into()))?
            .join("scanwiz");

        Ok(Self { state, config })
    }

    #[must_use]
    pub fn logs_dir(&self) -> PathBuf {
        self.state.join("logs")
    }

    #[must_use]
    pub fn log_file(&self) -> PathBuf {
        self.logs_dir().join(LOG_FILE_NAME)
    }

    /// Create the log directory and check the log file accepts appends.
    ///
    /// Returns the log directory.
    ///
    /// # Errors
    /// Returns `ConfigError::LogFile` if the directory or the file cannot be written.
    pub fn prepare_logs(&self) -> Result<PathBuf, ConfigError> {
        let dir = self.logs_dir();
        let path = self.log_file();
        fs::create_dir_all(&dir)
            .and_then(|()| OpenOptions::new().create(true).append(true).open(&path))
            .map_err(|source| ConfigError::LogFile { path, source })?;
        Ok(dir)
    }

    #[must_use]
    pub fn config_file(&self) -> PathBuf {
        self.config.join("config.toml")
    }
}
