use crate::{CoreError, ScanStatus, ScanTool, SelectionField, WizardSelection};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum WizardStep {
    #[default]
    Model,
    Environment,
    Probe,
    Launch,
}

impl WizardStep {
    pub const ALL: [WizardStep; 4] = [
        WizardStep::Model,
        WizardStep::Environment,
        WizardStep::Probe,
        WizardStep::Launch,
    ];

    /// 1-based position shown in the step indicator.
    #[must_use]
    pub fn number(self) -> u8 {
        match self {
            WizardStep::Model => 1,
            WizardStep::Environment => 2,
            WizardStep::Probe => 3,
            WizardStep::Launch => 4,
        }
    }

    /// # Errors
    /// Returns `CoreError::InvalidStep` outside 1..=4.
    pub fn from_number(n: u8) -> Result<Self, CoreError> {
        match n {
            1 => Ok(WizardStep::Model),
            2 => Ok(WizardStep::Environment),
            3 => Ok(WizardStep::Probe),
            4 => Ok(WizardStep::Launch),
            other => Err(CoreError::InvalidStep(other)),
        }
    }

    #[must_use]
    pub fn title(self) -> &'static str {
        match self {
            WizardStep::Model => "Select Model",
            WizardStep::Environment => "Select Environment",
            WizardStep::Probe => "Select Tool & Probe",
            WizardStep::Launch => "Launch Scan",
        }
    }

    /// Field that must be chosen before leaving this step.
    #[must_use]
    pub fn required_field(self) -> Option<SelectionField> {
        match self {
            WizardStep::Model => Some(SelectionField::Model),
            WizardStep::Environment => Some(SelectionField::Environment),
            WizardStep::Probe => Some(SelectionField::Probe),
            WizardStep::Launch => None,
        }
    }

    fn next(self) -> Self {
        match self {
            WizardStep::Model => WizardStep::Environment,
            WizardStep::Environment => WizardStep::Probe,
            WizardStep::Probe | WizardStep::Launch => WizardStep::Launch,
        }
    }

    fn prev(self) -> Self {
        match self {
            WizardStep::Model | WizardStep::Environment => WizardStep::Model,
            WizardStep::Probe => WizardStep::Environment,
            WizardStep::Launch => WizardStep::Probe,
        }
    }
}

/// Current step plus the selections gathered so far.
#[derive(Debug, Clone, Default)]
pub struct WizardStateMachine {
    step: WizardStep,
    selection: WizardSelection,
}

impl WizardStateMachine {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn step(&self) -> WizardStep {
        self.step
    }

    #[must_use]
    pub fn selection(&self) -> &WizardSelection {
        &self.selection
    }

    pub fn select_model(&mut self, name: impl Into<String>) {
        self.selection.model = Some(name.into());
    }

    pub fn select_environment(&mut self, name: impl Into<String>) {
        self.selection.environment = Some(name.into());
    }

    pub fn select_tool(&mut self, tool: ScanTool) {
        self.selection.tool = tool;
    }

    pub fn select_probe(&mut self, name: impl Into<String>) {
        self.selection.probe = Some(name.into());
    }

    #[must_use]
    pub fn can_advance(&self) -> bool {
        match self.step.required_field() {
            Some(field) => self.selection.is_set(field),
            None => false,
        }
    }

    /// Move to the next step if the current one is satisfied.
    ///
    /// Returns `true` when the step changed.
    pub fn advance(&mut self) -> bool {
        if !self.can_advance() {
            return false;
        }
        self.step = self.step.next();
        true
    }

    #[must_use]
    pub fn can_retreat(&self, status: ScanStatus) -> bool {
        self.step != WizardStep::Model && !status.is_live()
    }

    /// Move back one step unless a scan is in flight.
    ///
    /// Returns `true` when the step changed.
    pub fn retreat(&mut self, status: ScanStatus) -> bool {
        if !self.can_retreat(status) {
            return false;
        }
        self.step = self.step.prev();
        true
    }

    /// Back to step 1 with nothing selected.
    ///
    /// The caller is responsible for discarding the scan session alongside.
    pub fn reset(&mut self) {
        self.step = WizardStep::Model;
        self.selection = WizardSelection::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at_launch() -> WizardStateMachine {
        let mut wizard = WizardStateMachine::new();
        wizard.select_model("m1");
        assert!(wizard.advance());
        wizard.select_environment("e1");
        assert!(wizard.advance());
        wizard.select_probe("p1");
        assert!(wizard.advance());
        wizard
    }

    #[test]
    fn test_advance_requires_field_for_current_step() {
        let mut wizard = WizardStateMachine::new();
        assert!(!wizard.advance());
        assert_eq!(wizard.step(), WizardStep::Model);

        // A later field does not unlock an earlier step.
        wizard.select_probe("p1");
        assert!(!wizard.advance());
        assert_eq!(wizard.step(), WizardStep::Model);

        wizard.select_model("m1");
        assert!(wizard.advance());
        assert_eq!(wizard.step(), WizardStep::Environment);

        assert!(!wizard.advance());
        wizard.select_environment("e1");
        assert!(wizard.advance());
        assert_eq!(wizard.step(), WizardStep::Probe);
    }

    #[test]
    fn test_advance_is_noop_at_launch() {
        let mut wizard = at_launch();
        assert_eq!(wizard.step(), WizardStep::Launch);
        assert!(!wizard.advance());
        assert_eq!(wizard.step(), WizardStep::Launch);
    }

    #[test]
    fn test_retreat_clamps_at_first_step() {
        let mut wizard = WizardStateMachine::new();
        assert!(!wizard.retreat(ScanStatus::Idle));
        assert_eq!(wizard.step(), WizardStep::Model);
    }

    #[test]
    fn test_retreat_blocked_while_scan_live() {
        let mut wizard = at_launch();
        assert!(!wizard.retreat(ScanStatus::Running));
        assert!(!wizard.retreat(ScanStatus::Starting));
        assert_eq!(wizard.step(), WizardStep::Launch);

        assert!(wizard.retreat(ScanStatus::Completed));
        assert_eq!(wizard.step(), WizardStep::Probe);
    }

    #[test]
    fn test_retreat_keeps_selection() {
        let mut wizard = at_launch();
        assert!(wizard.retreat(ScanStatus::Idle));
        assert!(wizard.retreat(ScanStatus::Idle));
        assert_eq!(wizard.selection().model.as_deref(), Some("m1"));
        assert_eq!(wizard.selection().probe.as_deref(), Some("p1"));
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut wizard = at_launch();
        wizard.reset();
        assert_eq!(wizard.step(), WizardStep::Model);
        assert_eq!(wizard.selection(), &WizardSelection::default());
    }

    #[test]
    fn test_step_numbers_round_trip() {
        for step in WizardStep::ALL {
            assert_eq!(WizardStep::from_number(step.number()).unwrap(), step);
        }
        assert_eq!(WizardStep::from_number(5), Err(CoreError::InvalidStep(5)));
        assert_eq!(WizardStep::from_number(0), Err(CoreError::InvalidStep(0)));
    }
}
