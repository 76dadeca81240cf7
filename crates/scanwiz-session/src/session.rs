use scanwiz_core::ScanStatus;

/// One scan attempt as the client sees it.
///
/// Read-only outside this crate; the controller and the stream consumer are
/// the only writers. `output` is append-only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanSession {
    id: Option<String>,
    status: ScanStatus,
    output: Vec<String>,
    progress: Option<String>,
    error: Option<String>,
}

impl ScanSession {
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    #[must_use]
    pub fn status(&self) -> ScanStatus {
        self.status
    }

    #[must_use]
    pub fn output(&self) -> &[String] {
        &self.output
    }

    /// Latest progress-bar line, if the backend sent any.
    #[must_use]
    pub fn progress(&self) -> Option<&str> {
        self.progress.as_deref()
    }

    /// Last error the backend pushed on the stream.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub(crate) fn bind(&mut self, id: impl Into<String>) {
        self.id = Some(id.into());
        self.status = ScanStatus::Starting;
    }

    pub(crate) fn set_status(&mut self, status: ScanStatus) {
        self.status = status;
    }

    pub(crate) fn push_line(&mut self, line: impl Into<String>) {
        self.output.push(line.into());
    }

    pub(crate) fn set_progress(&mut self, line: impl Into<String>) {
        self.progress = Some(line.into());
    }

    pub(crate) fn record_error(&mut self, error: impl Into<String>) {
        self.error = Some(error.into());
    }
}
