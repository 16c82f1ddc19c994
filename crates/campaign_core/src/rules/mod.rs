//! Declarative placement rules.
//!
//! Every rule struct deserializes from RON with field-level defaults, so a
//! config file only needs the values it changes. [`GenerationConfig`] bundles
//! the whole run configuration; it is read-only once a run starts.
//!
//! **Note:** Loading is the only IO in this crate.

mod connection;
mod enemy;
mod hq;
mod mission;
mod neutral;
mod policy;
mod preference;
mod tuning;

use std::collections::BTreeSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

pub use connection::ConnectionRules;
pub use enemy::{
    EnemyHqSpacing, EnemyItemRules, EnemyItemRuleset, EnemyItemSpacing, EnemyItemVariant,
    EnemyPlacementRules, VariantMode,
};
pub use hq::{EnemyHqRules, EnemyWallRules, PlayerHqRules};
pub use mission::{
    AdjacencyPolicy, AdjacencyRequirement, AdjacencyTarget, MissionPlacementRules,
    MissionTierRules, PerMissionRules,
};
pub use neutral::NeutralItemRules;
pub use policy::{FailurePolicy, FailurePolicyConfig, RetryBudget};
pub use preference::{EnemyPreference, EnemyScoreInput, TopologyPreference};
pub use tuning::{CountTuning, DifficultyItemOverrides, DifficultyLevel, DifficultyOverridesTable};

use crate::error::{CampaignError, Result};
use crate::graph::{AnchorGraph, AnchorKey};

/// Multiplier applied to a step's attempt index when reseeding its stream.
pub const ATTEMPT_SEED_MULTIPLIER: u64 = 13;

/// Attempts retried in place with relaxed rules before backtracking.
pub const MAX_RELAXATION_ATTEMPTS: u32 = 3;

/// Upper bound on sampled pairs for HQ-less chokepoint scores.
pub const MAX_CHOKEPOINT_PAIR_SAMPLES: usize = 48;

/// Seed offset of the HQ-less chokepoint shuffle.
pub const CHOKEPOINT_SEED_OFFSET: u64 = 7919;

/// Seed offset of the forced player HQ pick.
pub const PLAYER_HQ_FORCE_SEED_OFFSET: u64 = 4021;

/// Seed offset of the forced enemy HQ pick.
pub const ENEMY_HQ_FORCE_SEED_OFFSET: u64 = 4027;

/// Complete configuration of one generation run.
///
/// # Example RON
///
/// ```ron
/// GenerationConfig(
///     connections: (min_connections: 1, max_connections: 3),
///     player_hq: (min_anchor_degree: 2),
///     counts: (seed: 42, base_enemy_items: { Outpost: 2 }),
/// )
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Connection generator rules.
    #[serde(default)]
    pub connections: ConnectionRules,

    /// Player HQ rules.
    #[serde(default)]
    pub player_hq: PlayerHqRules,

    /// Enemy HQ rules.
    #[serde(default)]
    pub enemy_hq: EnemyHqRules,

    /// Enemy wall rules.
    #[serde(default)]
    pub enemy_wall: EnemyWallRules,

    /// Enemy item rules.
    #[serde(default)]
    pub enemy_items: EnemyPlacementRules,

    /// Neutral item rules.
    #[serde(default)]
    pub neutral_items: NeutralItemRules,

    /// Mission rules.
    #[serde(default)]
    pub missions: MissionPlacementRules,

    /// Seed and item counts.
    #[serde(default)]
    pub counts: CountTuning,

    /// Failure policies.
    #[serde(default)]
    pub failure_policy: FailurePolicyConfig,

    /// Attempt limits.
    #[serde(default)]
    pub budget: RetryBudget,
}

impl GenerationConfig {
    /// Load a configuration from a RON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Self::from_ron_str(&contents)
    }

    /// Parse a configuration from a RON string.
    pub fn from_ron_str(ron: &str) -> Result<Self> {
        let config: Self = ron::from_str(ron)?;
        Ok(config)
    }

    /// Serialize to pretty RON.
    pub fn to_ron_string(&self) -> Result<String> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| CampaignError::InvalidConfig(e.to_string()))
    }

    /// Base seed of the run.
    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.counts.seed
    }

    /// Every consistency problem in the configuration.
    #[must_use]
    pub fn validation_errors(&self) -> Vec<String> {
        let mut errors = self.connections.validate();
        errors.extend(self.missions.validate());
        errors.extend(self.failure_policy.validate());
        if self.budget.max_step_attempts == 0 || self.budget.max_total_attempts == 0 {
            errors.push("budget: attempt limits must be positive".to_string());
        }
        errors
    }

    /// Allow-listed anchors that `graph` does not contain, deduplicated.
    /// Selection skips them, but they usually point at a stale config.
    #[must_use]
    pub fn unknown_anchors(&self, graph: &AnchorGraph) -> Vec<AnchorKey> {
        let listed = self
            .player_hq
            .anchor_candidates
            .iter()
            .chain(&self.enemy_hq.anchor_candidates)
            .chain(&self.enemy_wall.anchor_candidates)
            .chain(
                self.missions
                    .rules_by_mission
                    .values()
                    .flat_map(|rules| &rules.override_candidates),
            );
        let unknown: BTreeSet<AnchorKey> = listed.copied().filter(|key| !graph.contains(*key)).collect();
        unknown.into_iter().collect()
    }

    /// Check the config against the graph it will run on.
    ///
    /// # Errors
    ///
    /// Returns [`CampaignError::InvalidConfig`] for rule problems, then
    /// [`CampaignError::UnknownAnchor`] for the first allow-listed key
    /// missing from `graph`.
    pub fn validate_for(&self, graph: &AnchorGraph) -> Result<()> {
        self.validate()?;
        match self.unknown_anchors(graph).first() {
            Some(key) => Err(CampaignError::UnknownAnchor(*key)),
            None => Ok(()),
        }
    }

    /// Fail fast on an inconsistent configuration.
    ///
    /// # Errors
    ///
    /// Returns [`CampaignError::InvalidConfig`] listing every problem found.
    pub fn validate(&self) -> Result<()> {
        let errors = self.validation_errors();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(CampaignError::InvalidConfig(errors.join("; ")))
        }
    }
}
