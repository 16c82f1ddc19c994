//! Failure policy and retry budget configuration.

use serde::{Deserialize, Serialize};

use crate::step::GenerationStep;

/// How the generator reacts when a step cannot be satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FailurePolicy {
    /// Inherit the global policy.
    #[default]
    NotSet,
    /// Undo earlier work immediately and retry.
    InstantBackTrack,
    /// Retry the step in place with progressively relaxed rules first, then
    /// backtrack.
    BreakDistanceRulesThenBackTrack,
}

/// Global and per-step failure policies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailurePolicyConfig {
    /// Failed micro retries at one undo depth before undoing one more
    /// micro-transaction.
    #[serde(default = "default_escalation_attempts")]
    pub escalation_attempts: u32,

    /// Policy for steps that leave theirs unset.
    #[serde(default = "default_global_policy")]
    pub global: FailurePolicy,

    /// Connection step.
    #[serde(default)]
    pub connections: FailurePolicy,
    /// Player HQ step.
    #[serde(default)]
    pub player_hq: FailurePolicy,
    /// Enemy HQ step.
    #[serde(default)]
    pub enemy_hq: FailurePolicy,
    /// Enemy wall step.
    #[serde(default)]
    pub enemy_wall: FailurePolicy,
    /// Enemy item step.
    #[serde(default)]
    pub enemy_objects: FailurePolicy,
    /// Neutral item step.
    #[serde(default)]
    pub neutral_objects: FailurePolicy,
    /// Mission step.
    #[serde(default)]
    pub missions: FailurePolicy,
}

const fn default_escalation_attempts() -> u32 {
    32
}

const fn default_global_policy() -> FailurePolicy {
    FailurePolicy::InstantBackTrack
}

impl Default for FailurePolicyConfig {
    fn default() -> Self {
        Self {
            escalation_attempts: default_escalation_attempts(),
            global: default_global_policy(),
            connections: FailurePolicy::NotSet,
            player_hq: FailurePolicy::NotSet,
            enemy_hq: FailurePolicy::NotSet,
            enemy_wall: FailurePolicy::NotSet,
            enemy_objects: FailurePolicy::NotSet,
            neutral_objects: FailurePolicy::NotSet,
            missions: FailurePolicy::NotSet,
        }
    }
}

impl FailurePolicyConfig {
    /// Same policy for every step.
    #[must_use]
    pub fn uniform(policy: FailurePolicy) -> Self {
        Self {
            global: policy,
            ..Self::default()
        }
    }

    /// Policy configured for a step, before inheriting the global one.
    #[must_use]
    pub const fn step_policy(&self, step: GenerationStep) -> FailurePolicy {
        match step {
            GenerationStep::ConnectionsCreated => self.connections,
            GenerationStep::PlayerHqPlaced => self.player_hq,
            GenerationStep::EnemyHqPlaced => self.enemy_hq,
            GenerationStep::EnemyWallPlaced => self.enemy_wall,
            GenerationStep::EnemyObjectsPlaced => self.enemy_objects,
            GenerationStep::NeutralObjectsPlaced => self.neutral_objects,
            GenerationStep::MissionsPlaced => self.missions,
            GenerationStep::NotStarted | GenerationStep::Finished => FailurePolicy::NotSet,
        }
    }

    /// Effective policy for a step. `NotSet` only if the global policy is
    /// also unset.
    #[must_use]
    pub const fn resolve(&self, step: GenerationStep) -> FailurePolicy {
        match self.step_policy(step) {
            FailurePolicy::NotSet => self.global,
            policy => policy,
        }
    }

    /// Consistency problems with these policies.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if !(1..=1024).contains(&self.escalation_attempts) {
            errors.push(format!(
                "failure_policy: escalation_attempts ({}) must be within 1..=1024",
                self.escalation_attempts
            ));
        }
        for step in GenerationStep::PIPELINE {
            if self.resolve(step) == FailurePolicy::NotSet {
                errors.push(format!("failure_policy: no policy resolves for {step}"));
            }
        }
        errors
    }
}

/// Attempt limits for one `execute_all_steps` run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryBudget {
    /// Failed attempts allowed for any single step.
    #[serde(default = "default_max_step_attempts")]
    pub max_step_attempts: u32,

    /// Failed attempts allowed across the run.
    #[serde(default = "default_max_total_attempts")]
    pub max_total_attempts: u32,
}

const fn default_max_step_attempts() -> u32 {
    7000
}

const fn default_max_total_attempts() -> u32 {
    8000
}

impl Default for RetryBudget {
    fn default() -> Self {
        Self {
            max_step_attempts: default_max_step_attempts(),
            max_total_attempts: default_max_total_attempts(),
        }
    }
}
