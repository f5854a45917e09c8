use std::fmt;

use thiserror::Error;

use crate::llm_client::LlmError;
use crate::outreach::models::SequencePosition;

/// Which of the six per-contact model calls was running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationStep {
    Email(SequencePosition),
    Networking,
    CallScript,
}

impl fmt::Display for GenerationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenerationStep::Email(position) => write!(f, "{position}"),
            GenerationStep::Networking => f.write_str("LinkedIn message"),
            GenerationStep::CallScript => f.write_str("call script"),
        }
    }
}

#[derive(Debug, Error)]
pub enum OutreachError {
    #[error("Invalid sequence position {0}: expected 1-4")]
    InvalidSequencePosition(u8),

    /// Raised before any model call is made; the batch never starts.
    #[error("Invalid input: {0}")]
    InputValidation(String),

    /// One of the six calls for a contact failed. The contact is skipped.
    #[error("Failed to generate {step}: {source}")]
    ContactGeneration {
        step: GenerationStep,
        #[source]
        source: LlmError,
    },

    #[error("Export failed: {0}")]
    Export(String),
}
