use crate::{ClientConfig, ScanSession, StreamError};
use async_trait::async_trait;
use futures_util::StreamExt;
use futures_util::stream::BoxStream;
use scanwiz_core::{ScanStatus, ScanTool};
use scanwiz_protocol::StreamMessage;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

const EVENT_BUFFER: usize = 256;

/// Text frames in transport order; ends when the connection does.
pub type FrameStream = BoxStream<'static, Result<String, StreamError>>;

/// Opens the receive-only event stream for a session.
#[async_trait]
pub trait StreamConnector: Send + Sync {
    async fn connect(&self, session_id: &str) -> Result<FrameStream, StreamError>;
}

pub struct WebSocketConnector {
    config: Arc<ClientConfig>,
}

impl WebSocketConnector {
    #[must_use]
    pub fn new(config: Arc<ClientConfig>) -> Self {
        Self { config }
    }
}

#[async_trait]
impl StreamConnector for WebSocketConnector {
    async fn connect(&self, session_id: &str) -> Result<FrameStream, StreamError> {
        let url = self.config.stream_url(session_id)?;
        let limit = self.config.connect_timeout;

        let (socket, _response) = tokio::time::timeout(limit, connect_async(url.as_str()))
            .await
            .map_err(|_| StreamError::Timeout(limit))?
            .map_err(|e| StreamError::Connect(e.to_string()))?;

        info!(%url, "Event stream connected");

        let frames = socket.filter_map(|message| async move {
            match message {
                Ok(Message::Text(text)) => Some(Ok(text.as_str().to_owned())),
                Ok(Message::Close(frame)) => {
                    debug!(?frame, "Event stream close frame");
                    None
                }
                Ok(_) => None,
                Err(e) => Some(Err(StreamError::Transport(e.to_string()))),
            }
        });

        Ok(frames.boxed())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Connecting,
    Open,
    Closed,
}

/// Outcome of handling one text frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    Applied,
    /// Well-formed but not applicable, e.g. a status after a terminal one.
    Ignored,
    /// Malformed or of an unknown type.
    Discarded,
}

#[derive(Debug)]
enum TransportEvent {
    Opened,
    Frame(String),
    Ended(Option<String>),
}

/// Owns the event stream of one session and turns its frames into session updates.
///
/// A background task reads the transport and queues events; the owner applies
/// them in arrival order via [`drain`](Self::drain) or [`next`](Self::next).
pub struct EventStreamConsumer {
    session_id: String,
    tool: ScanTool,
    state: StreamState,
    saw_terminal: bool,
    events: mpsc::Receiver<TransportEvent>,
    reader: Option<JoinHandle<()>>,
}

impl EventStreamConsumer {
    /// Start connecting to the stream of `session_id`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn open(
        connector: Arc<dyn StreamConnector>,
        session_id: impl Into<String>,
        tool: ScanTool,
    ) -> Self {
        let session_id = session_id.into();
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let reader = tokio::spawn(read_transport(connector, session_id.clone(), tx));

        Self {
            session_id,
            tool,
            state: StreamState::Connecting,
            saw_terminal: false,
            events: rx,
            reader: Some(reader),
        }
    }

    #[must_use]
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    #[must_use]
    pub fn state(&self) -> StreamState {
        self.state
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.state == StreamState::Closed
    }

    /// Apply every event already queued. Returns how many were handled.
    pub fn drain(&mut self, session: &mut ScanSession) -> usize {
        let mut handled = 0;
        while !self.is_closed() {
            match self.events.try_recv() {
                Ok(event) => {
                    self.handle(event, session);
                    handled += 1;
                }
                Err(mpsc::error::TryRecvError::Empty) => break,
                Err(mpsc::error::TryRecvError::Disconnected) => {
                    self.handle(reader_gone(), session);
                    handled += 1;
                }
            }
        }
        handled
    }

    /// Wait for the next event and apply it.
    ///
    /// Returns `false` without waiting once the stream is closed.
    pub async fn next(&mut self, session: &mut ScanSession) -> bool {
        if self.is_closed() {
            return false;
        }
        let event = self.events.recv().await.unwrap_or_else(reader_gone);
        self.handle(event, session);
        true
    }

    fn handle(&mut self, event: TransportEvent, session: &mut ScanSession) {
        match event {
            TransportEvent::Opened => {
                if self.state == StreamState::Connecting {
                    self.state = StreamState::Open;
                }
            }
            TransportEvent::Frame(text) => {
                self.dispatch(&text, session);
            }
            TransportEvent::Ended(reason) => {
                self.state = StreamState::Closed;
                self.reader = None;
                if !self.saw_terminal && session.status().is_live() {
                    warn!(
                        session_id = %self.session_id,
                        reason = reason.as_deref().unwrap_or("connection closed"),
                        "Event stream ended before a terminal status"
                    );
                    session.set_status(ScanStatus::UnknownDisconnect);
                } else {
                    info!(session_id = %self.session_id, "Event stream closed");
                }
            }
        }
    }

    /// Apply a single text frame to `session`.
    pub fn dispatch(&mut self, text: &str, session: &mut ScanSession) -> Dispatch {
        if self.is_closed() {
            return Dispatch::Ignored;
        }

        let message = match StreamMessage::parse(text) {
            Ok(message) => message,
            Err(e) => {
                debug!(session_id = %self.session_id, "Discarding stream message: {e}");
                return Dispatch::Discarded;
            }
        };

        match message {
            StreamMessage::Output { line } => session.push_line(line),
            StreamMessage::Status { status } => {
                if self.saw_terminal {
                    debug!(?status, "Ignoring status after terminal status");
                    return Dispatch::Ignored;
                }
                let status = ScanStatus::from(status);
                self.saw_terminal = status.is_terminal();
                info!(session_id = %self.session_id, status = status.label(), "Scan status");
                session.set_status(status);
            }
            StreamMessage::Command { command } => session.push_line(format!(
                "Starting {} scan... Command: {command}",
                self.tool.display_name()
            )),
            StreamMessage::Progress { line } => session.set_progress(line),
            StreamMessage::Error { error } => {
                warn!(session_id = %self.session_id, "Backend reported scan error: {error}");
                session.push_line(format!("Error: {error}"));
                session.record_error(error);
                // The backend stores the session as failed and sends nothing further.
                if !self.saw_terminal {
                    self.saw_terminal = true;
                    session.set_status(ScanStatus::Failed);
                }
            }
        }
        Dispatch::Applied
    }

    /// Release the transport. Returns `true` only on the call that closed it.
    pub fn close(&mut self) -> bool {
        if self.is_closed() {
            return false;
        }
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
        self.state = StreamState::Closed;
        self.events.close();
        info!(session_id = %self.session_id, "Closed event stream");
        true
    }
}

impl Drop for EventStreamConsumer {
    fn drop(&mut self) {
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
    }
}

fn reader_gone() -> TransportEvent {
    TransportEvent::Ended(Some("event reader stopped".into()))
}

async fn read_transport(
    connector: Arc<dyn StreamConnector>,
    session_id: String,
    tx: mpsc::Sender<TransportEvent>,
) {
    let mut frames = match connector.connect(&session_id).await {
        Ok(frames) => frames,
        Err(e) => {
            warn!(%session_id, "{e}");
            let _ = tx.send(TransportEvent::Ended(Some(e.to_string()))).await;
            return;
        }
    };

    if tx.send(TransportEvent::Opened).await.is_err() {
        return;
    }

    let reason = loop {
        match frames.next().await {
            Some(Ok(text)) => {
                if tx.send(TransportEvent::Frame(text)).await.is_err() {
                    return;
                }
            }
            Some(Err(e)) => break Some(e.to_string()),
            None => break None,
        }
    };

    let _ = tx.send(TransportEvent::Ended(reason)).await;
}
