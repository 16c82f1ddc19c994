//! Generation steps and their strict ordering.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Macro step of the generation pipeline.
///
/// The variants are declared in pipeline order, so the derived `Ord` is the
/// pipeline order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub enum GenerationStep {
    /// Nothing generated yet.
    #[default]
    NotStarted,
    /// Connection graph built.
    ConnectionsCreated,
    /// Player HQ anchor chosen.
    PlayerHqPlaced,
    /// Enemy HQ anchor chosen.
    EnemyHqPlaced,
    /// Enemy wall anchor chosen.
    EnemyWallPlaced,
    /// All enemy items placed.
    EnemyObjectsPlaced,
    /// All neutral items placed.
    NeutralObjectsPlaced,
    /// All missions placed.
    MissionsPlaced,
    /// Pipeline complete.
    Finished,
}

impl GenerationStep {
    /// Steps that do work, in the order `execute_all_steps` runs them.
    pub const PIPELINE: [Self; 7] = [
        Self::ConnectionsCreated,
        Self::PlayerHqPlaced,
        Self::EnemyHqPlaced,
        Self::EnemyWallPlaced,
        Self::EnemyObjectsPlaced,
        Self::NeutralObjectsPlaced,
        Self::MissionsPlaced,
    ];

    /// The step that must hold before this one can run.
    #[must_use]
    pub const fn prerequisite(self) -> Self {
        match self {
            Self::NotStarted | Self::ConnectionsCreated => Self::NotStarted,
            Self::PlayerHqPlaced => Self::ConnectionsCreated,
            Self::EnemyHqPlaced => Self::PlayerHqPlaced,
            Self::EnemyWallPlaced => Self::EnemyHqPlaced,
            Self::EnemyObjectsPlaced => Self::EnemyWallPlaced,
            Self::NeutralObjectsPlaced => Self::EnemyObjectsPlaced,
            Self::MissionsPlaced => Self::NeutralObjectsPlaced,
            Self::Finished => Self::MissionsPlaced,
        }
    }

    /// The step following this one. `Finished` is terminal.
    #[must_use]
    pub const fn next(self) -> Self {
        match self {
            Self::NotStarted => Self::ConnectionsCreated,
            Self::ConnectionsCreated => Self::PlayerHqPlaced,
            Self::PlayerHqPlaced => Self::EnemyHqPlaced,
            Self::EnemyHqPlaced => Self::EnemyWallPlaced,
            Self::EnemyWallPlaced => Self::EnemyObjectsPlaced,
            Self::EnemyObjectsPlaced => Self::NeutralObjectsPlaced,
            Self::NeutralObjectsPlaced => Self::MissionsPlaced,
            Self::MissionsPlaced | Self::Finished => Self::Finished,
        }
    }

    /// Whether this step records one micro-transaction per placed item.
    #[must_use]
    pub const fn uses_micro_transactions(self) -> bool {
        matches!(self, Self::EnemyObjectsPlaced | Self::MissionsPlaced)
    }

    /// Number of working steps that precede this one in the pipeline.
    #[must_use]
    pub fn earlier_step_count(self) -> usize {
        Self::PIPELINE.iter().filter(|step| **step < self).count()
    }

    /// Position in [`Self::PIPELINE`], if this is a working step.
    #[must_use]
    pub fn pipeline_index(self) -> Option<usize> {
        Self::PIPELINE.iter().position(|step| *step == self)
    }
}

impl fmt::Display for GenerationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NotStarted => "NotStarted",
            Self::ConnectionsCreated => "ConnectionsCreated",
            Self::PlayerHqPlaced => "PlayerHQPlaced",
            Self::EnemyHqPlaced => "EnemyHQPlaced",
            Self::EnemyWallPlaced => "EnemyWallPlaced",
            Self::EnemyObjectsPlaced => "EnemyObjectsPlaced",
            Self::NeutralObjectsPlaced => "NeutralObjectsPlaced",
            Self::MissionsPlaced => "MissionsPlaced",
            Self::Finished => "Finished",
        };
        f.write_str(name)
    }
}

/// Result of running one step entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepOutcome {
    /// The step committed and the state machine advanced.
    Completed,
    /// No eligible placement was found. Nothing was committed for the
    /// failing item; the caller decides whether to backtrack.
    Unsatisfied,
}

impl StepOutcome {
    /// Whether the step committed.
    #[must_use]
    pub const fn is_completed(self) -> bool {
        matches!(self, Self::Completed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prerequisite_and_next_are_inverse() {
        for step in GenerationStep::PIPELINE {
            assert_eq!(step.prerequisite().next(), step);
            assert_eq!(step.next().prerequisite(), step);
        }
    }

    #[test]
    fn test_pipeline_is_sorted() {
        assert!(GenerationStep::PIPELINE.windows(2).all(|w| w[0] < w[1]));
        assert!(GenerationStep::NotStarted < GenerationStep::ConnectionsCreated);
        assert!(GenerationStep::MissionsPlaced < GenerationStep::Finished);
    }

    #[test]
    fn test_earlier_step_count() {
        assert_eq!(GenerationStep::ConnectionsCreated.earlier_step_count(), 0);
        assert_eq!(GenerationStep::EnemyObjectsPlaced.earlier_step_count(), 4);
        assert_eq!(GenerationStep::MissionsPlaced.earlier_step_count(), 6);
    }

    #[test]
    fn test_micro_steps() {
        let micro: Vec<_> = GenerationStep::PIPELINE
            .into_iter()
            .filter(|s| s.uses_micro_transactions())
            .collect();
        assert_eq!(
            micro,
            vec![
                GenerationStep::EnemyObjectsPlaced,
                GenerationStep::MissionsPlaced
            ]
        );
    }
}
