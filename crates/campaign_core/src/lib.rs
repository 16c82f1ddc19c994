//! # Campaign Core
//!
//! Deterministic world-campaign generator.
//!
//! Given a set of anchor points, this crate builds a planar connection
//! graph and then populates it, step by step, with headquarters, an enemy
//! wall, enemy installations, neutral sites and missions. Every step is
//! committed as a transaction so a failing step can back off, relax its
//! rules or backtrack into earlier steps.
//!
//! This crate contains **only** deterministic logic:
//! - No system randomness (every choice derives from the configured seed)
//! - No floating-point math (uses fixed-point)
//! - No IO beyond loading a RON config
//!
//! The same anchors, config and seed always produce the same campaign.
//!
//! ## Crate Structure
//!
//! - [`graph`] - Anchors, connections and adjacency
//! - [`layout`] - Jittered-grid anchor generation
//! - [`connections`] - Planar connection building
//! - [`rules`] - Declarative placement rules and run config
//! - [`placement`] - Candidate selection per category
//! - [`generator`] - Step machine, transactions and backtracking
//! - [`collaborator`] - The world the generator spawns into
//! - [`math`] - Fixed-point math utilities

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod collaborator;
pub mod connections;
pub mod error;
pub mod failure;
pub mod generator;
pub mod geometry;
pub mod graph;
pub mod hops;
pub mod items;
pub mod layout;
pub mod math;
pub mod placement;
pub mod report;
pub mod rng;
pub mod rules;
pub mod selector;
pub mod state;
pub mod step;
pub mod transaction;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::collaborator::{ActorHandle, RecordingWorld, WorldCollaborator};
    pub use crate::error::{CampaignError, Result};
    pub use crate::generator::{CampaignGenerator, GenerationContext};
    pub use crate::graph::{AnchorGraph, AnchorKey, AnchorPoint, ConnectionId};
    pub use crate::items::{EnemyItemType, MissionType, NeutralItemType, PlacedItem};
    pub use crate::layout::AnchorLayout;
    pub use crate::math::{DistanceSquared, Fixed, Vec2Fixed};
    pub use crate::report::GenerationReport;
    pub use crate::rules::{FailurePolicy, GenerationConfig};
    pub use crate::step::{GenerationStep, StepOutcome};
}
