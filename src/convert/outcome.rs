//! Result of converting one file, as seen by notification sinks.

use std::fmt;

use super::{ConvertError, FailureKind};

/// Why a conversion failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureReason {
    pub kind: FailureKind,
    pub message: String,
}

impl From<&ConvertError> for FailureReason {
    fn from(error: &ConvertError) -> Self {
        Self {
            kind: error.kind(),
            message: error.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutcomeStatus {
    Success,
    SuccessWithWarning(String),
    Failure(FailureReason),
}

/// Severity used when an outcome is logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum OutcomeLevel {
    Info,
    Warning,
    Error,
}

impl fmt::Display for OutcomeLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OutcomeLevel::Info => "INFO",
            OutcomeLevel::Warning => "WARNING",
            OutcomeLevel::Error => "ERROR",
        })
    }
}

/// One conversion result. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionOutcome {
    pub source_name: String,
    pub destination_name: String,
    pub status: OutcomeStatus,
}

impl ConversionOutcome {
    pub fn is_success(&self) -> bool {
        !matches!(self.status, OutcomeStatus::Failure(_))
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        match &self.status {
            OutcomeStatus::Failure(reason) => Some(reason.kind),
            _ => None,
        }
    }

    pub fn level(&self) -> OutcomeLevel {
        match self.status {
            OutcomeStatus::Success => OutcomeLevel::Info,
            OutcomeStatus::SuccessWithWarning(_) => OutcomeLevel::Warning,
            OutcomeStatus::Failure(_) => OutcomeLevel::Error,
        }
    }
}

impl fmt::Display for ConversionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.status {
            OutcomeStatus::Success => {
                write!(f, "Converted {} -> {}", self.source_name, self.destination_name)
            }
            OutcomeStatus::SuccessWithWarning(warning) => write!(
                f,
                "Converted {} -> {} ({warning})",
                self.source_name, self.destination_name
            ),
            OutcomeStatus::Failure(reason) => write!(
                f,
                "Failed to convert {}: [{}] {}",
                self.source_name, reason.kind, reason.message
            ),
        }
    }
}
