//! # Campaign Development Tools
//!
//! Command-line tooling around the generator:
//! - Campaign input files (anchors plus config)
//! - Step-by-step generation runs
//! - Config validation
//! - Report and placement output

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod campaign_file;
pub mod output;
pub mod validate;

use campaign_core::error::CampaignError;
use thiserror::Error;

/// Tool errors.
#[derive(Debug, Error)]
pub enum ToolError {
    /// Generator error.
    #[error(transparent)]
    Campaign(#[from] CampaignError),

    /// Failed to read or write a file.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse a campaign file.
    #[error("Failed to parse campaign file: {0}")]
    Parse(#[from] ron::error::SpannedError),

    /// Failed to serialize output.
    #[error("Failed to serialize output: {0}")]
    Serialize(String),
}

/// Result type for tool operations.
pub type Result<T> = std::result::Result<T, ToolError>;
