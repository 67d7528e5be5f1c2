use thiserror::Error;

use crate::{food::FoodId, records::SourceKind, stats::RunPhase};

/// Why a single line or record was dropped. Never fatal.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    #[error("malformed json on line {line}: {message}")]
    MalformedJson { line: usize, message: String },

    #[error("line {line} is not a json object")]
    NotAnObject { line: usize },

    #[error("line {line} is missing required field `{field}`")]
    MissingField { line: usize, field: &'static str },

    #[error("line {line} has an invalid `{field}`: {value}")]
    InvalidField {
        line: usize,
        field: &'static str,
        value: String,
    },

    #[error("no base food with id {0}")]
    UnknownFood(FoodId),
}

/// Errors that abort a pipeline run.
///
/// Each variant names the phase it happened in, so a failed run can be diagnosed from the error
/// alone.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("No loader configured for source {0}")]
    MissingSource(SourceKind),

    #[error("Failed to connect to catalog store {0:#}")]
    Connect(anyhow::Error),

    #[error("Failed to clear existing catalog {0:#}")]
    Clear(anyhow::Error),

    #[error("Failed to read source {kind}: {error:#}")]
    Source {
        kind: SourceKind,
        error: anyhow::Error,
    },

    #[error("Failed to insert batch {batch}: {error:#}")]
    Load { batch: usize, error: anyhow::Error },

    #[error("Failed to disconnect from catalog store {0:#}")]
    Disconnect(anyhow::Error),

    #[error("Run cancelled while {phase}")]
    Cancelled { phase: RunPhase },
}

impl PipelineError {
    /// The phase the run was in when it failed
    pub fn phase(&self) -> RunPhase {
        match self {
            PipelineError::MissingSource(_) | PipelineError::Connect(_) => {
                RunPhase::Disconnected
            }
            PipelineError::Clear(_) => RunPhase::Connected,
            PipelineError::Source { kind, .. } => RunPhase::Merging(*kind),
            PipelineError::Load { batch, .. } => RunPhase::Loading { batch: *batch },
            PipelineError::Disconnect(_) => RunPhase::Done,
            PipelineError::Cancelled { phase } => *phase,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_error_names_batch() {
        let err = PipelineError::Load {
            batch: 3,
            error: anyhow::anyhow!("connection reset"),
        };

        assert_eq!(err.to_string(), "Failed to insert batch 3: connection reset");
        assert_eq!(err.phase(), RunPhase::Loading { batch: 3 });
    }

    #[test]
    fn test_skip_reason_display() {
        let reason = SkipReason::MissingField {
            line: 4,
            field: "fdcId",
        };
        assert_eq!(reason.to_string(), "line 4 is missing required field `fdcId`");
    }
}
