//! Scripted stand-ins for the backend and the event stream.

use crate::{
    CatalogSource, ClientError, FrameStream, ScanBackend, ScanSession, StreamConnector,
    StreamError,
};
use async_trait::async_trait;
use futures_util::StreamExt;
use futures_util::stream;
use scanwiz_protocol::{
    EnvironmentsResponse, ModelsResponse, ProbesResponse, SessionRecord, StartScanRequest,
    StartScanResponse,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{Notify, mpsc};

pub fn frame(text: &str) -> Result<String, StreamError> {
    Ok(text.to_string())
}

pub fn bound_session(id: &str) -> ScanSession {
    let mut session = ScanSession::default();
    session.bind(id);
    session
}

pub fn server_error() -> ClientError {
    ClientError::Status {
        url: "http://backend/api/scan/start".into(),
        status: reqwest::StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub fn record(id: &str, status: &str) -> SessionRecord {
    SessionRecord {
        id: id.into(),
        model_name: "m1".into(),
        environment: "e1".into(),
        tool: "garak".into(),
        probe: "p1".into(),
        status: status.into(),
        output: String::new(),
        created_at: None,
        completed_at: None,
    }
}

#[derive(Default)]
pub struct FakeBackend {
    responses: Mutex<VecDeque<Result<StartScanResponse, ClientError>>>,
    records: Mutex<VecDeque<Result<SessionRecord, ClientError>>>,
    requests: Mutex<Vec<StartScanRequest>>,
    gate: Option<Arc<Notify>>,
    record_gate: Option<Arc<Notify>>,
}

impl FakeBackend {
    pub fn answering(session_ids: &[&str]) -> Self {
        let responses = session_ids
            .iter()
            .map(|id| {
                Ok(StartScanResponse {
                    session_id: (*id).to_string(),
                    status: Some("started".into()),
                })
            })
            .collect();
        Self {
            responses: Mutex::new(responses),
            ..Self::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            responses: Mutex::new(VecDeque::from([Err(server_error())])),
            ..Self::default()
        }
    }

    /// Hold every start request until the returned gate is notified.
    pub fn gated(mut self) -> (Self, Arc<Notify>) {
        let gate = Arc::new(Notify::new());
        self.gate = Some(gate.clone());
        (self, gate)
    }

    /// Hold every record fetch until the returned gate is notified.
    pub fn gated_records(mut self) -> (Self, Arc<Notify>) {
        let gate = Arc::new(Notify::new());
        self.record_gate = Some(gate.clone());
        (self, gate)
    }

    pub fn with_record(self, record: SessionRecord) -> Self {
        self.records.lock().unwrap().push_back(Ok(record));
        self
    }

    pub fn requests(&self) -> Vec<StartScanRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ScanBackend for FakeBackend {
    async fn start_scan(
        &self,
        request: &StartScanRequest,
    ) -> Result<StartScanResponse, ClientError> {
        self.requests.lock().unwrap().push(request.clone());
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(server_error()))
    }

    async fn session_record(&self, _session_id: &str) -> Result<SessionRecord, ClientError> {
        if let Some(gate) = &self.record_gate {
            gate.notified().await;
        }
        self.records
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ClientError::Reported("no record".into())))
    }
}

pub struct FakeCatalog {
    pub models: Option<ModelsResponse>,
    pub environments: Option<EnvironmentsResponse>,
    pub probes: Option<ProbesResponse>,
}

#[async_trait]
impl CatalogSource for FakeCatalog {
    async fn models(&self) -> Result<ModelsResponse, ClientError> {
        self.models.clone().ok_or_else(server_error)
    }

    async fn environments(&self) -> Result<EnvironmentsResponse, ClientError> {
        self.environments.clone().ok_or_else(server_error)
    }

    async fn probes(&self) -> Result<ProbesResponse, ClientError> {
        self.probes.clone().ok_or_else(server_error)
    }
}

pub enum Script {
    /// Deliver the frames, then end the connection.
    Finite(Vec<Result<String, StreamError>>),
    /// Deliver the frames, then stay open.
    Hanging(Vec<Result<String, StreamError>>),
    /// Forward whatever the test sends; ends when the sender is dropped.
    Live(mpsc::UnboundedReceiver<Result<String, StreamError>>),
    Refuse,
}

struct DropCounter(Arc<AtomicUsize>);

impl Drop for DropCounter {
    fn drop(&mut self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

/// Serves one script per connect, in order, and records which sessions asked.
#[derive(Default)]
pub struct ScriptedConnector {
    scripts: Mutex<VecDeque<Script>>,
    connects: Mutex<Vec<String>>,
    drops: Arc<AtomicUsize>,
}

impl ScriptedConnector {
    pub fn new(scripts: Vec<Script>) -> Arc<Self> {
        Arc::new(Self {
            scripts: Mutex::new(scripts.into()),
            ..Self::default()
        })
    }

    pub fn finite(frames: Vec<Result<String, StreamError>>) -> Arc<Self> {
        Self::new(vec![Script::Finite(frames)])
    }

    pub fn hanging(frames: Vec<Result<String, StreamError>>) -> Arc<Self> {
        Self::new(vec![Script::Hanging(frames)])
    }

    pub fn refusing() -> Arc<Self> {
        Self::new(vec![Script::Refuse])
    }

    pub fn live() -> (Arc<Self>, mpsc::UnboundedSender<Result<String, StreamError>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(vec![Script::Live(rx)]), tx)
    }

    pub fn connects(&self) -> Vec<String> {
        self.connects.lock().unwrap().clone()
    }

    pub fn drops(&self) -> usize {
        self.drops.load(Ordering::SeqCst)
    }

    /// Wait until `n` served streams have been dropped.
    pub async fn wait_for_drops(&self, n: usize) {
        tokio::time::timeout(Duration::from_secs(2), async {
            while self.drops() < n {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("stream was not released");
    }
}

#[async_trait]
impl StreamConnector for ScriptedConnector {
    async fn connect(&self, session_id: &str) -> Result<FrameStream, StreamError> {
        self.connects.lock().unwrap().push(session_id.to_string());
        let script = self
            .scripts
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Script::Refuse);

        let frames: FrameStream = match script {
            Script::Finite(frames) => stream::iter(frames).boxed(),
            Script::Hanging(frames) => stream::iter(frames).chain(stream::pending()).boxed(),
            Script::Live(mut rx) => stream::poll_fn(move |cx| rx.poll_recv(cx)).boxed(),
            Script::Refuse => {
                return Err(StreamError::Connect("connection refused".into()));
            }
        };

        let guard = DropCounter(self.drops.clone());
        Ok(frames
            .map(move |item| {
                let _held = &guard;
                item
            })
            .boxed())
    }
}
