use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("Unknown scan tool '{0}'")]
    UnknownTool(String),

    #[error("Invalid wizard step {0} (expected 1-4)")]
    InvalidStep(u8),
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionError {
    #[error("No {0} selected")]
    Missing(SelectionField),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionField {
    Model,
    Environment,
    Probe,
}

impl std::fmt::Display for SelectionField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SelectionField::Model => "model",
            SelectionField::Environment => "environment",
            SelectionField::Probe => "probe",
        };
        f.write_str(name)
    }
}
