use crate::{ConfigError, ScanwizDirs};
use scanwiz_protocol::terminal_stream_path;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8001";
pub const BACKEND_URL_ENV: &str = "SCANWIZ_BACKEND_URL";

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// On-disk `config.toml`.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    backend_url: Option<String>,
    request_timeout_secs: Option<u64>,
    connect_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    backend_url: Url,
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
}

impl ClientConfig {
    /// Build a config for `backend_url` with default timeouts.
    ///
    /// # Errors
    /// Returns `ConfigError` if the URL does not parse or is not http(s).
    pub fn new(backend_url: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            backend_url: parse_backend_url(backend_url)?,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        })
    }

    /// Resolve defaults, then the config file, then `backend_override`.
    ///
    /// An explicit `path` must exist; the default location is optional.
    ///
    /// # Errors
    /// Returns `ConfigError` if the file cannot be read or parsed, or a URL is invalid.
    pub fn load(path: Option<&Path>, backend_override: Option<&str>) -> Result<Self, ConfigError> {
        let file = match path {
            Some(path) => Some(read_config_file(path)?),
            None => match ScanwizDirs::new() {
                Ok(dirs) if dirs.config_file().exists() => {
                    Some(read_config_file(&dirs.config_file())?)
                }
                _ => None,
            },
        };

        let mut config = Self::new(DEFAULT_BACKEND_URL)?;
        if let Some(file) = file {
            config.apply_file(file)?;
        }
        if let Some(url) = backend_override {
            config.backend_url = parse_backend_url(url)?;
        }

        info!(backend = %config.backend_url, "Resolved client configuration");
        Ok(config)
    }

    fn apply_file(&mut self, file: ConfigFile) -> Result<(), ConfigError> {
        if let Some(url) = file.backend_url {
            self.backend_url = parse_backend_url(&url)?;
        }
        if let Some(secs) = file.request_timeout_secs {
            self.request_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = file.connect_timeout_secs {
            self.connect_timeout = Duration::from_secs(secs);
        }
        Ok(())
    }

    #[must_use]
    pub fn backend_url(&self) -> &Url {
        &self.backend_url
    }

    /// Absolute URL for an API path, keeping any path prefix of the backend URL.
    ///
    /// # Errors
    /// Returns `ConfigError::InvalidUrl` if the joined URL does not parse.
    pub fn endpoint(&self, path: &str) -> Result<Url, ConfigError> {
        let joined = format!(
            "{}/{}",
            self.backend_url.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        Url::parse(&joined).map_err(|source| ConfigError::InvalidUrl {
            url: joined,
            source,
        })
    }

    /// Event stream URL for a session, with the scheme mirrored to ws/wss.
    ///
    /// # Errors
    /// Returns `ConfigError` if the URL cannot be built.
    pub fn stream_url(&self, session_id: &str) -> Result<Url, ConfigError> {
        let mut url = self.endpoint(&terminal_stream_path(session_id))?;
        let scheme = match url.scheme() {
            "https" => "wss",
            "http" => "ws",
            other => return Err(ConfigError::UnsupportedScheme(other.to_string())),
        };
        url.set_scheme(scheme)
            .map_err(|()| ConfigError::UnsupportedScheme(scheme.to_string()))?;
        Ok(url)
    }
}

fn parse_backend_url(raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw.trim()).map_err(|source| ConfigError::InvalidUrl {
        url: raw.to_string(),
        source,
    })?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ConfigError::UnsupportedScheme(other.to_string())),
    }
}

fn read_config_file(path: &Path) -> Result<ConfigFile, ConfigError> {
    debug!("Reading config from {}", path.display());
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: PathBuf::from(path),
        source,
    })?;
    toml::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: PathBuf::from(path),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_stream_url_mirrors_scheme() {
        let config = ClientConfig::new("http://localhost:8001").unwrap();
        assert_eq!(
            config.stream_url("s1").unwrap().as_str(),
            "ws://localhost:8001/ws/terminal/s1"
        );

        let config = ClientConfig::new("https://scan.example.com").unwrap();
        assert_eq!(
            config.stream_url("abc").unwrap().as_str(),
            "wss://scan.example.com/ws/terminal/abc"
        );
    }

    #[test]
    fn test_endpoint_keeps_path_prefix() {
        let config = ClientConfig::new("https://example.com/scanner/").unwrap();
        assert_eq!(
            config.endpoint("/api/models").unwrap().as_str(),
            "https://example.com/scanner/api/models"
        );
    }

    #[test]
    fn test_rejects_non_http_backend() {
        assert!(matches!(
            ClientConfig::new("ftp://example.com"),
            Err(ConfigError::UnsupportedScheme(s)) if s == "ftp"
        ));
        assert!(matches!(
            ClientConfig::new("not a url"),
            Err(ConfigError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn test_load_file_then_override() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "backend_url = \"http://10.0.0.5:9000\"\nrequest_timeout_secs = 5"
        )
        .unwrap();

        let config = ClientConfig::load(Some(file.path()), None).unwrap();
        assert_eq!(config.backend_url().as_str(), "http://10.0.0.5:9000/");
        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert_eq!(config.connect_timeout, DEFAULT_CONNECT_TIMEOUT);

        let config =
            ClientConfig::load(Some(file.path()), Some("https://override.local")).unwrap();
        assert_eq!(config.backend_url().host_str(), Some("override.local"));
        assert_eq!(config.request_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_load_rejects_unknown_keys() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "backend = \"http://x\"").unwrap();
        assert!(matches!(
            ClientConfig::load(Some(file.path()), None),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_load_missing_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(matches!(
            ClientConfig::load(Some(&missing), None),
            Err(ConfigError::Read { .. })
        ));
    }
}
