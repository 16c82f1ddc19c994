//! Error types for campaign generation.
//!
//! A candidate selector finding nothing is *not* an error; it is reported as
//! [`StepOutcome::Unsatisfied`](crate::step::StepOutcome) and handled by the
//! backtracking engine. The variants here are the conditions that stop a run.

use thiserror::Error;

use crate::graph::AnchorKey;
use crate::step::GenerationStep;

/// Result type alias using [`CampaignError`].
pub type Result<T> = std::result::Result<T, CampaignError>;

/// Top-level error type for campaign generation.
#[derive(Debug, Error)]
pub enum CampaignError {
    /// Rule configuration is inconsistent. Raised before any mutation.
    #[error("Invalid generation config: {0}")]
    InvalidConfig(String),

    /// A step entry point was invoked before its prerequisite completed.
    #[error("Step {requested} cannot run while generation is at {current}")]
    StepOutOfOrder {
        /// Step that was requested.
        requested: GenerationStep,
        /// Step the state machine currently holds.
        current: GenerationStep,
    },

    /// The attempt budget ran out while retrying a step.
    #[error(
        "Generation failed at {step}: retry budget exhausted \
         ({step_attempts} step attempts, {total_attempts} total attempts)"
    )]
    RetryBudgetExhausted {
        /// Step that could not be satisfied.
        step: GenerationStep,
        /// Attempt counter of that step when the budget ran out.
        step_attempts: u32,
        /// Total failed attempts across the run.
        total_attempts: u32,
    },

    /// An anchor key referenced by configuration is not part of the graph.
    #[error("Anchor not found: {0}")]
    UnknownAnchor(AnchorKey),

    /// Failed to read a config file.
    #[error("Failed to read config file: {0}")]
    ConfigIo(#[from] std::io::Error),

    /// Failed to parse a RON config file.
    #[error("Failed to parse config: {0}")]
    ConfigParse(#[from] ron::error::SpannedError),
}
