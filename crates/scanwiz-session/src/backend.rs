use crate::{ClientConfig, ClientError};
use async_trait::async_trait;
use scanwiz_protocol::{
    ENVIRONMENTS_PATH, EnvironmentsResponse, MODELS_PATH, ModelsResponse, PROBES_PATH,
    ProbesResponse, START_SCAN_PATH, SessionRecord, StartScanRequest, StartScanResponse,
    session_record_path,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::debug;

/// Session creation and lookup on the scan-execution backend.
#[async_trait]
pub trait ScanBackend: Send + Sync {
    async fn start_scan(&self, request: &StartScanRequest)
    -> Result<StartScanResponse, ClientError>;

    async fn session_record(&self, session_id: &str) -> Result<SessionRecord, ClientError>;
}

/// Read-only resource listings.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    async fn models(&self) -> Result<ModelsResponse, ClientError>;

    async fn environments(&self) -> Result<EnvironmentsResponse, ClientError>;

    async fn probes(&self) -> Result<ProbesResponse, ClientError>;
}

pub struct BackendClient {
    http: reqwest::Client,
    config: Arc<ClientConfig>,
}

impl BackendClient {
    /// # Errors
    /// Returns `ClientError::Http` if the HTTP client cannot be built.
    pub fn new(config: Arc<ClientConfig>) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self { http, config })
    }

    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let url = self.config.endpoint(path)?;
        debug!("GET {url}");
        let response = self.http.get(url.clone()).send().await?;
        Self::decode(url.as_str(), response).await
    }

    async fn post_json<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        let url = self.config.endpoint(path)?;
        debug!("POST {url}");
        let response = self.http.post(url.clone()).json(body).send().await?;
        Self::decode(url.as_str(), response).await
    }

    async fn decode<T: DeserializeOwned>(
        url: &str,
        response: reqwest::Response,
    ) -> Result<T, ClientError> {
        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Status {
                url: url.to_string(),
                status,
            });
        }
        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl ScanBackend for BackendClient {
    async fn start_scan(
        &self,
        request: &StartScanRequest,
    ) -> Result<StartScanResponse, ClientError> {
        self.post_json(START_SCAN_PATH, request).await
    }

    async fn session_record(&self, session_id: &str) -> Result<SessionRecord, ClientError> {
        self.get_json(&session_record_path(session_id)).await
    }
}

#[async_trait]
impl CatalogSource for BackendClient {
    async fn models(&self) -> Result<ModelsResponse, ClientError> {
        self.get_json(MODELS_PATH).await
    }

    async fn environments(&self) -> Result<EnvironmentsResponse, ClientError> {
        self.get_json(ENVIRONMENTS_PATH).await
    }

    async fn probes(&self) -> Result<ProbesResponse, ClientError> {
        self.get_json(PROBES_PATH).await
    }
}
