use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProbeError {
    #[error("Select edge or corner to probe")]
    NoFeature,

    #[error("XY clearance {clearance} exceeds offset {offset}, run declined")]
    ClearanceDeclined { clearance: f64, offset: f64 },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Probe program could not be initialised")]
    InitFailed,

    #[error("A job is already running")]
    Busy,
}

// The `Display` text is the status message reported at the end of the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RunFailure {
    #[error("Probing failed")]
    Failed,

    #[error("Probing failed")]
    Cancelled,

    #[error("Probing failed, machine position not known")]
    PositionLost,
}

pub const COMPLETED_MESSAGE: &str = "Probing completed";
