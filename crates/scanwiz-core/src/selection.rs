use crate::{CoreError, SelectionError, SelectionField};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Scan tools the backend knows how to launch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanTool {
    #[default]
    Garak,
}

impl ScanTool {
    pub const ALL: [ScanTool; 1] = [ScanTool::Garak];

    /// Name used on the wire.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ScanTool::Garak => "garak",
        }
    }

    #[must_use]
    pub fn display_name(self) -> &'static str {
        match self {
            ScanTool::Garak => "Garak",
        }
    }

    #[must_use]
    pub fn description(self) -> &'static str {
        match self {
            ScanTool::Garak => "LLM vulnerability scanner",
        }
    }
}

impl fmt::Display for ScanTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScanTool {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ScanTool::ALL
            .into_iter()
            .find(|tool| tool.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| CoreError::UnknownTool(s.to_string()))
    }
}

/// The operator's in-progress choices.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WizardSelection {
    pub model: Option<String>,
    pub environment: Option<String>,
    pub tool: ScanTool,
    pub probe: Option<String>,
}

/// A selection with every required field present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompleteSelection {
    pub model: String,
    pub environment: String,
    pub tool: ScanTool,
    pub probe: String,
}

impl WizardSelection {
    #[must_use]
    pub fn is_set(&self, field: SelectionField) -> bool {
        match field {
            SelectionField::Model => self.model.is_some(),
            SelectionField::Environment => self.environment.is_some(),
            SelectionField::Probe => self.probe.is_some(),
        }
    }

    /// Check that every field a scan needs is present.
    ///
    /// # Errors
    /// Returns `SelectionError::Missing` naming the first unset field in step order.
    pub fn validate(&self) -> Result<CompleteSelection, SelectionError> {
        let model = self
            .model
            .clone()
            .ok_or(SelectionError::Missing(SelectionField::Model))?;
        let environment = self
            .environment
            .clone()
            .ok_or(SelectionError::Missing(SelectionField::Environment))?;
        let probe = self
            .probe
            .clone()
            .ok_or(SelectionError::Missing(SelectionField::Probe))?;

        Ok(CompleteSelection {
            model,
            environment,
            tool: self.tool,
            probe,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_parses_wire_name() {
        assert_eq!("garak".parse::<ScanTool>().unwrap(), ScanTool::Garak);
        assert_eq!(" Garak ".parse::<ScanTool>().unwrap(), ScanTool::Garak);
        assert_eq!(
            "nmap".parse::<ScanTool>(),
            Err(CoreError::UnknownTool("nmap".into()))
        );
    }

    #[test]
    fn test_validate_reports_first_missing_field() {
        let mut selection = WizardSelection::default();
        assert_eq!(
            selection.validate(),
            Err(SelectionError::Missing(SelectionField::Model))
        );

        selection.model = Some("m1".into());
        selection.probe = Some("p1".into());
        assert_eq!(
            selection.validate(),
            Err(SelectionError::Missing(SelectionField::Environment))
        );

        selection.environment = Some("e1".into());
        let complete = selection.validate().unwrap();
        assert_eq!(complete.model, "m1");
        assert_eq!(complete.environment, "e1");
        assert_eq!(complete.tool, ScanTool::Garak);
        assert_eq!(complete.probe, "p1");
    }

    #[test]
    fn test_default_selection_uses_garak() {
        let selection = WizardSelection::default();
        assert_eq!(selection.tool, ScanTool::Garak);
        assert!(!selection.is_set(SelectionField::Model));
    }
}
