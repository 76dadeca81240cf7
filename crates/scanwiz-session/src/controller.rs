use crate::{
    ClientError, EventStreamConsumer, ScanBackend, ScanSession, StartScanError, StreamConnector,
    StreamState,
};
use scanwiz_core::{ScanStatus, ScanTool, WizardSelection};
use scanwiz_protocol::{RemoteStatus, SessionRecord, StartScanRequest, StartScanResponse};
use std::sync::Arc;
use tokio::task::{JoinError, JoinHandle};
use tracing::{info, warn};

type Submission = JoinHandle<Result<StartScanResponse, ClientError>>;
type RecordFetch = JoinHandle<Result<SessionRecord, ClientError>>;

/// Creates scan sessions on the backend and binds an event stream to each.
///
/// Holds at most one session. While a start request is outstanding the
/// controller is `submitting` and the session stays `Idle`; once the backend
/// answers, status changes come only from the stream consumer.
pub struct ScanSessionController {
    backend: Arc<dyn ScanBackend>,
    connector: Arc<dyn StreamConnector>,
    session: ScanSession,
    tool: ScanTool,
    submission: Option<Submission>,
    recheck: Option<RecordFetch>,
    consumer: Option<EventStreamConsumer>,
    last_error: Option<String>,
}

impl ScanSessionController {
    #[must_use]
    pub fn new(backend: Arc<dyn ScanBackend>, connector: Arc<dyn StreamConnector>) -> Self {
        Self {
            backend,
            connector,
            session: ScanSession::default(),
            tool: ScanTool::default(),
            submission: None,
            recheck: None,
            consumer: None,
            last_error: None,
        }
    }

    #[must_use]
    pub fn session(&self) -> &ScanSession {
        &self.session
    }

    #[must_use]
    pub fn is_submitting(&self) -> bool {
        self.submission.is_some()
    }

    /// A record fetch for a lost session is outstanding.
    #[must_use]
    pub fn is_rechecking(&self) -> bool {
        self.recheck.is_some()
    }

    /// Why the last request to the backend failed, if it did.
    #[must_use]
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    #[must_use]
    pub fn stream_state(&self) -> Option<StreamState> {
        self.consumer.as_ref().map(EventStreamConsumer::state)
    }

    #[must_use]
    pub fn stream_session_id(&self) -> Option<&str> {
        self.consumer.as_ref().map(EventStreamConsumer::session_id)
    }

    /// Send the session-creation request without waiting for the answer.
    ///
    /// Must be called from within a tokio runtime. The response is applied by
    /// [`poll`](Self::poll) or [`next_event`](Self::next_event).
    ///
    /// # Errors
    /// `SessionAlreadyActive` while submitting or when the session is not idle;
    /// `InvalidSelection` if model, environment, or probe is unset. Nothing is
    /// sent in either case.
    pub fn submit(&mut self, selection: &WizardSelection) -> Result<(), StartScanError> {
        if self.is_submitting() || self.session.status() != ScanStatus::Idle {
            return Err(StartScanError::SessionAlreadyActive);
        }
        let selection = selection.validate()?;

        self.tool = selection.tool;
        self.last_error = None;

        let request = StartScanRequest::from(selection);
        info!(
            model = %request.model_name,
            environment = %request.environment,
            tool = %request.tool,
            probe = %request.probe,
            "Requesting scan session"
        );

        let backend = Arc::clone(&self.backend);
        self.submission = Some(tokio::spawn(
            async move { backend.start_scan(&request).await },
        ));
        Ok(())
    }

    /// Submit and wait for the backend to answer.
    ///
    /// A failed request is not an error here: it leaves the session `Failed`.
    ///
    /// # Errors
    /// Same as [`submit`](Self::submit).
    pub async fn start_scan(&mut self, selection: &WizardSelection) -> Result<(), StartScanError> {
        self.submit(selection)?;
        if let Some(handle) = self.submission.take() {
            let outcome = handle.await;
            self.finish_submission(outcome);
        }
        Ok(())
    }

    /// Apply a finished submission or recheck and any queued stream events.
    ///
    /// Returns `true` if anything changed.
    pub async fn poll(&mut self) -> bool {
        let mut changed = false;

        if self
            .submission
            .as_ref()
            .is_some_and(JoinHandle::is_finished)
            && let Some(handle) = self.submission.take()
        {
            let outcome = handle.await;
            self.finish_submission(outcome);
            changed = true;
        }

        if self.recheck.as_ref().is_some_and(JoinHandle::is_finished)
            && let Some(handle) = self.recheck.take()
        {
            let outcome = handle.await;
            self.apply_recheck(outcome);
            changed = true;
        }

        if let Some(consumer) = self.consumer.as_mut() {
            changed |= consumer.drain(&mut self.session) > 0;
        }

        changed
    }

    /// Wait for the next submission result or stream event and apply it.
    ///
    /// Returns `false` once nothing further can arrive.
    pub async fn next_event(&mut self) -> bool {
        if let Some(handle) = self.submission.take() {
            let outcome = handle.await;
            self.finish_submission(outcome);
            return true;
        }
        if let Some(handle) = self.recheck.take() {
            let outcome = handle.await;
            self.apply_recheck(outcome);
            return true;
        }

        match self.consumer.as_mut() {
            Some(consumer) => consumer.next(&mut self.session).await,
            None => false,
        }
    }

    fn finish_submission(
        &mut self,
        outcome: Result<Result<StartScanResponse, ClientError>, JoinError>,
    ) {
        let error = match outcome {
            Ok(Ok(response)) => {
                info!(session_id = %response.session_id, "Scan session created");
                self.session.bind(response.session_id.clone());
                self.open_stream(response.session_id);
                return;
            }
            Ok(Err(e)) => e.to_string(),
            Err(e) => format!("Scan request task failed: {e}"),
        };

        warn!("Failed to create scan session: {error}");
        self.last_error = Some(error);
        self.session.set_status(ScanStatus::Failed);
    }

    fn open_stream(&mut self, session_id: String) {
        if let Some(mut previous) = self.consumer.take() {
            previous.close();
        }
        self.consumer = Some(EventStreamConsumer::open(
            Arc::clone(&self.connector),
            session_id,
            self.tool,
        ));
    }

    /// Discard the current session and start over from an idle one.
    ///
    /// Closes the open stream and abandons an outstanding request. The backend
    /// keeps running whatever it already started.
    pub fn new_scan(&mut self) {
        self.release();
        self.session = ScanSession::default();
        self.last_error = None;
    }

    /// Close the stream and abandon an outstanding request, keeping the session as is.
    pub fn shutdown(&mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(handle) = self.submission.take() {
            handle.abort();
            info!("Abandoned outstanding scan request");
        }
        if let Some(handle) = self.recheck.take() {
            handle.abort();
        }
        if let Some(mut consumer) = self.consumer.take() {
            consumer.close();
        }
    }

    /// Start asking the backend what happened to a session whose stream was lost.
    ///
    /// Must be called from within a tokio runtime. The answer is applied by
    /// [`poll`](Self::poll) or [`next_event`](Self::next_event). Returns `false`
    /// if the session is not `UnknownDisconnect` or a recheck is already out.
    pub fn begin_reconcile(&mut self) -> bool {
        if self.is_rechecking() || self.session.status() != ScanStatus::UnknownDisconnect {
            return false;
        }
        let Some(session_id) = self.session.id().map(str::to_owned) else {
            return false;
        };

        info!(%session_id, "Fetching session record");
        self.last_error = None;
        let backend = Arc::clone(&self.backend);
        self.recheck = Some(tokio::spawn(async move {
            backend.session_record(&session_id).await
        }));
        true
    }

    /// Recheck a lost session and wait for the answer.
    ///
    /// Adopts a terminal status from the stored record; if the scan is still
    /// going, reopens the stream. Other statuses are left alone.
    ///
    /// # Errors
    /// Returns `ClientError` if the record cannot be fetched.
    pub async fn reconcile(&mut self) -> Result<ScanStatus, ClientError> {
        self.begin_reconcile();
        match self.recheck.take() {
            Some(handle) => {
                let outcome = handle.await;
                self.finish_reconcile(outcome)
            }
            None => Ok(self.session.status()),
        }
    }

    fn apply_recheck(&mut self, outcome: Result<Result<SessionRecord, ClientError>, JoinError>) {
        if let Err(e) = self.finish_reconcile(outcome) {
            warn!("Failed to recheck session: {e}");
            self.last_error = Some(format!("Recheck failed: {e}"));
        }
    }

    fn finish_reconcile(
        &mut self,
        outcome: Result<Result<SessionRecord, ClientError>, JoinError>,
    ) -> Result<ScanStatus, ClientError> {
        let record = outcome??;
        let Some(session_id) = self.session.id().map(str::to_owned) else {
            return Ok(self.session.status());
        };
        if self.session.status() != ScanStatus::UnknownDisconnect {
            return Ok(self.session.status());
        }
        info!(%session_id, status = %record.status, "Fetched session record");

        match RemoteStatus::from_record(&record.status) {
            Some(remote @ (RemoteStatus::Completed | RemoteStatus::Failed)) => {
                self.session.set_status(remote.into());
            }
            Some(RemoteStatus::Running) => {
                self.session.set_status(ScanStatus::Running);
                self.open_stream(session_id);
            }
            None => {
                self.session.set_status(ScanStatus::Starting);
                self.open_stream(session_id);
            }
        }

        Ok(self.session.status())
    }
}

impl Drop for ScanSessionController {
    fn drop(&mut self) {
        self.release();
    }
}
