use crate::{ScanSession, ScanSessionController, StartScanError};
use scanwiz_core::{ScanStatus, ScanTool, WizardStateMachine, WizardStep};

/// The wizard and its scan session, composed so that navigation and
/// session lifetime stay consistent.
pub struct ScanWorkflow {
    wizard: WizardStateMachine,
    controller: ScanSessionController,
}

impl ScanWorkflow {
    #[must_use]
    pub fn new(controller: ScanSessionController) -> Self {
        Self {
            wizard: WizardStateMachine::new(),
            controller,
        }
    }

    #[must_use]
    pub fn wizard(&self) -> &WizardStateMachine {
        &self.wizard
    }

    #[must_use]
    pub fn controller(&self) -> &ScanSessionController {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut ScanSessionController {
        &mut self.controller
    }

    #[must_use]
    pub fn session(&self) -> &ScanSession {
        self.controller.session()
    }

    #[must_use]
    pub fn step(&self) -> WizardStep {
        self.wizard.step()
    }

    pub fn select_model(&mut self, name: impl Into<String>) {
        self.wizard.select_model(name);
    }

    pub fn select_environment(&mut self, name: impl Into<String>) {
        self.wizard.select_environment(name);
    }

    pub fn select_tool(&mut self, tool: ScanTool) {
        self.wizard.select_tool(tool);
    }

    pub fn select_probe(&mut self, name: impl Into<String>) {
        self.wizard.select_probe(name);
    }

    #[must_use]
    pub fn can_advance(&self) -> bool {
        self.wizard.can_advance()
    }

    pub fn advance(&mut self) -> bool {
        self.wizard.advance()
    }

    #[must_use]
    pub fn can_retreat(&self) -> bool {
        !self.controller.is_submitting() && self.wizard.can_retreat(self.session().status())
    }

    pub fn retreat(&mut self) -> bool {
        if self.controller.is_submitting() {
            return false;
        }
        let status = self.session().status();
        self.wizard.retreat(status)
    }

    /// `Start Scan` is offered on the launch step before any session exists.
    #[must_use]
    pub fn can_start(&self) -> bool {
        self.wizard.step() == WizardStep::Launch
            && self.session().status() == ScanStatus::Idle
            && !self.controller.is_submitting()
            && self.wizard.selection().validate().is_ok()
    }

    /// `New Scan` is offered once the session has settled.
    #[must_use]
    pub fn can_new_scan(&self) -> bool {
        self.session().status().is_settled()
    }

    /// # Errors
    /// See [`ScanSessionController::submit`].
    pub fn submit(&mut self) -> Result<(), StartScanError> {
        self.controller.submit(self.wizard.selection())
    }

    /// # Errors
    /// See [`ScanSessionController::start_scan`].
    pub async fn start_scan(&mut self) -> Result<(), StartScanError> {
        self.controller.start_scan(self.wizard.selection()).await
    }

    pub async fn poll(&mut self) -> bool {
        self.controller.poll().await
    }

    /// Drop the session (closing its stream) and return to step 1 with nothing selected.
    pub fn new_scan(&mut self) {
        self.controller.new_scan();
        self.wizard.reset();
    }
}
