//! Mission placement rules.
//!
//! Each mission type resolves to one [`MissionTierRules`]: either the rules
//! of its tier or its own override. A mission may instead be restricted to
//! an explicit anchor list with its own degree and hop bands.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::preference::TopologyPreference;
use crate::graph::AnchorKey;
use crate::items::{EnemyItemType, ItemCategory, MissionTier, MissionType, NeutralItemType};

/// What an adjacency requirement looks for near a mission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdjacencyTarget {
    /// The player HQ.
    PlayerHq,
    /// An enemy item, optionally of one type. The enemy HQ counts as
    /// `EnemyHq`.
    Enemy(Option<EnemyItemType>),
    /// A neutral item, optionally of one type.
    Neutral(Option<NeutralItemType>),
    /// Another mission, optionally of one type.
    Mission(Option<MissionType>),
}

impl Default for AdjacencyTarget {
    fn default() -> Self {
        Self::Neutral(None)
    }
}

impl AdjacencyTarget {
    /// Category of the target.
    #[must_use]
    pub const fn category(self) -> ItemCategory {
        match self {
            Self::PlayerHq => ItemCategory::Player,
            Self::Enemy(_) => ItemCategory::Enemy,
            Self::Neutral(_) => ItemCategory::Neutral,
            Self::Mission(_) => ItemCategory::Mission,
        }
    }
}

/// What to do when an adjacency requirement is not met.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AdjacencyPolicy {
    /// Reject the candidate.
    #[default]
    RejectIfMissing,
    /// Place the missing neutral item next to the mission in the same
    /// micro-transaction.
    TryAutoPlaceCompanion,
}

/// Requires matching items within a hop radius of a mission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjacencyRequirement {
    /// Whether the requirement applies.
    #[serde(default)]
    pub enabled: bool,

    /// Items that count as matches.
    #[serde(default)]
    pub target: AdjacencyTarget,

    /// Hop radius around the mission.
    #[serde(default = "default_adjacency_hops")]
    pub max_hops: u32,

    /// Matches needed inside the radius.
    #[serde(default = "default_matching_count")]
    pub min_matching_count: u32,

    /// Fallback when not enough matches exist.
    #[serde(default)]
    pub policy: AdjacencyPolicy,
}

const fn default_adjacency_hops() -> u32 {
    1
}

const fn default_matching_count() -> u32 {
    1
}

impl Default for AdjacencyRequirement {
    fn default() -> Self {
        Self {
            enabled: false,
            target: AdjacencyTarget::default(),
            max_hops: default_adjacency_hops(),
            min_matching_count: default_matching_count(),
            policy: AdjacencyPolicy::RejectIfMissing,
        }
    }
}

/// Placement rules for a mission tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissionTierRules {
    /// Apply the hop band from the player HQ.
    #[serde(default = "default_true")]
    pub use_hops_from_hq: bool,
    /// Minimum hops from the player HQ.
    #[serde(default = "default_min_hops_from_hq")]
    pub min_hops_from_hq: u32,
    /// Maximum hops from the player HQ.
    #[serde(default = "default_unbounded")]
    pub max_hops_from_hq: u32,
    /// Ordering by hop distance from the player HQ.
    #[serde(default)]
    pub hops_preference: TopologyPreference,

    /// Apply the world-distance band from the player HQ.
    #[serde(default)]
    pub use_xy_from_hq: bool,
    /// Minimum world distance from the player HQ.
    #[serde(default)]
    pub min_xy_from_hq: u32,
    /// Maximum world distance from the player HQ.
    #[serde(default = "default_unbounded")]
    pub max_xy_from_hq: u32,
    /// Ordering by world distance from the player HQ.
    #[serde(default)]
    pub xy_preference: TopologyPreference,

    /// Apply the hop band to every placed mission.
    #[serde(default)]
    pub use_spacing_hops: bool,
    /// Minimum hops to every placed mission.
    #[serde(default)]
    pub min_spacing_hops: u32,
    /// Maximum hops to every placed mission.
    #[serde(default = "default_unbounded")]
    pub max_spacing_hops: u32,
    /// Ordering by hops to the nearest placed mission.
    #[serde(default)]
    pub spacing_hops_preference: TopologyPreference,

    /// Apply the world-distance band to every placed mission.
    #[serde(default)]
    pub use_spacing_xy: bool,
    /// Minimum world distance to every placed mission.
    #[serde(default)]
    pub min_spacing_xy: u32,
    /// Maximum world distance to every placed mission.
    #[serde(default = "default_unbounded")]
    pub max_spacing_xy: u32,
    /// Ordering by world distance to the nearest placed mission.
    #[serde(default)]
    pub spacing_xy_preference: TopologyPreference,

    /// Minimum connection degree.
    #[serde(default)]
    pub min_connections: u32,
    /// Maximum connection degree.
    #[serde(default = "default_unbounded")]
    pub max_connections: u32,
    /// Ordering by connection degree.
    #[serde(default)]
    pub connection_preference: TopologyPreference,

    /// The mission must sit on a neutral item of `required_neutral_type`.
    #[serde(default)]
    pub neutral_item_required: bool,
    /// Neutral type required when `neutral_item_required` is set.
    #[serde(default)]
    pub required_neutral_type: Option<NeutralItemType>,

    /// Items that must be nearby.
    #[serde(default)]
    pub adjacency: AdjacencyRequirement,
}

const fn default_true() -> bool {
    true
}

const fn default_min_hops_from_hq() -> u32 {
    1
}

const fn default_unbounded() -> u32 {
    u32::MAX
}

impl Default for MissionTierRules {
    fn default() -> Self {
        Self {
            use_hops_from_hq: true,
            min_hops_from_hq: default_min_hops_from_hq(),
            max_hops_from_hq: default_unbounded(),
            hops_preference: TopologyPreference::NotSet,
            use_xy_from_hq: false,
            min_xy_from_hq: 0,
            max_xy_from_hq: default_unbounded(),
            xy_preference: TopologyPreference::NotSet,
            use_spacing_hops: false,
            min_spacing_hops: 0,
            max_spacing_hops: default_unbounded(),
            spacing_hops_preference: TopologyPreference::NotSet,
            use_spacing_xy: false,
            min_spacing_xy: 0,
            max_spacing_xy: default_unbounded(),
            spacing_xy_preference: TopologyPreference::NotSet,
            min_connections: 0,
            max_connections: default_unbounded(),
            connection_preference: TopologyPreference::NotSet,
            neutral_item_required: false,
            required_neutral_type: None,
            adjacency: AdjacencyRequirement::default(),
        }
    }
}

/// Per-mission configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerMissionRules {
    /// Tier whose rules apply unless overridden.
    #[serde(default = "default_tier")]
    pub tier: MissionTier,

    /// Use `override_rules` instead of the tier rules.
    #[serde(default)]
    pub override_tier_rules: bool,

    /// Replacement rules.
    #[serde(default)]
    pub override_rules: MissionTierRules,

    /// Restrict candidates to `override_candidates` with the override bands.
    #[serde(default)]
    pub override_placement_with_array: bool,

    /// Explicit candidate anchors.
    #[serde(default)]
    pub override_candidates: Vec<AnchorKey>,

    /// Degree band bound used with the candidate list.
    #[serde(default)]
    pub override_min_connections: u32,
    /// Degree band bound used with the candidate list.
    #[serde(default = "default_unbounded")]
    pub override_max_connections: u32,
    /// Degree ordering used with the candidate list.
    #[serde(default)]
    pub override_connection_preference: TopologyPreference,

    /// Hop band bound used with the candidate list.
    #[serde(default)]
    pub override_min_hops_from_hq: u32,
    /// Hop band bound used with the candidate list.
    #[serde(default = "default_unbounded")]
    pub override_max_hops_from_hq: u32,
    /// Hop ordering used with the candidate list.
    #[serde(default)]
    pub override_hops_preference: TopologyPreference,
}

const fn default_tier() -> MissionTier {
    MissionTier::Tier1
}

impl Default for PerMissionRules {
    fn default() -> Self {
        Self {
            tier: default_tier(),
            override_tier_rules: false,
            override_rules: MissionTierRules::default(),
            override_placement_with_array: false,
            override_candidates: Vec::new(),
            override_min_connections: 0,
            override_max_connections: default_unbounded(),
            override_connection_preference: TopologyPreference::NotSet,
            override_min_hops_from_hq: 0,
            override_max_hops_from_hq: default_unbounded(),
            override_hops_preference: TopologyPreference::NotSet,
        }
    }
}

impl PerMissionRules {
    /// Override degree band, normalized so `min <= max`.
    #[must_use]
    pub fn override_degree_band(&self) -> (u32, u32) {
        let (a, b) = (self.override_min_connections, self.override_max_connections);
        (a.min(b), a.max(b))
    }

    /// Override hop band, normalized so `min <= max`.
    #[must_use]
    pub fn override_hop_band(&self) -> (u32, u32) {
        let (a, b) = (self.override_min_hops_from_hq, self.override_max_hops_from_hq);
        (a.min(b), a.max(b))
    }
}

/// Root mission configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissionPlacementRules {
    /// Default rules per tier.
    #[serde(default)]
    pub rules_by_tier: BTreeMap<MissionTier, MissionTierRules>,

    /// One entry per mission to place.
    #[serde(default)]
    pub rules_by_mission: BTreeMap<MissionType, PerMissionRules>,

    /// Missions skipped by the plan.
    #[serde(default)]
    pub excluded_missions: BTreeSet<MissionType>,

    /// Strength of the hop-weighted pick. Zero picks by attempt index.
    #[serde(default)]
    pub hops_preference_strength: u32,
}

impl MissionPlacementRules {
    /// Missions to place, in type order.
    #[must_use]
    pub fn plan(&self) -> Vec<MissionType> {
        self.rules_by_mission
            .keys()
            .copied()
            .filter(|mission| !self.excluded_missions.contains(mission))
            .collect()
    }

    /// Tier or override rules for a mission, `None` if the mission has no
    /// entry or its tier has no rules.
    #[must_use]
    pub fn effective_rules(&self, mission: MissionType) -> Option<MissionTierRules> {
        let per_mission = self.rules_by_mission.get(&mission)?;
        if per_mission.override_tier_rules {
            Some(per_mission.override_rules)
        } else {
            self.rules_by_tier.get(&per_mission.tier).copied()
        }
    }

    /// Consistency problems with these rules.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        for (mission, per_mission) in &self.rules_by_mission {
            let Some(rules) = self.effective_rules(*mission) else {
                errors.push(format!(
                    "missions: {mission:?} uses {:?} which has no tier rules",
                    per_mission.tier
                ));
                continue;
            };
            if rules.neutral_item_required && rules.required_neutral_type.is_none() {
                errors.push(format!(
                    "missions: {mission:?} requires a neutral item but names no type"
                ));
            }
            if rules.adjacency.enabled
                && rules.adjacency.policy == AdjacencyPolicy::TryAutoPlaceCompanion
                && !matches!(rules.adjacency.target, AdjacencyTarget::Neutral(Some(_)))
            {
                errors.push(format!(
                    "missions: {mission:?} auto-places a companion but its target is not a specific neutral type"
                ));
            }
        }
        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_is_sorted_and_skips_exclusions() {
        let mut rules = MissionPlacementRules::default();
        rules.rules_by_tier.insert(MissionTier::Tier1, MissionTierRules::default());
        for mission in [MissionType::ScoutRuins, MissionType::ClearRoad, MissionType::BuildBase] {
            rules.rules_by_mission.insert(mission, PerMissionRules::default());
        }
        rules.excluded_missions.insert(MissionType::BuildBase);

        assert_eq!(rules.plan(), vec![MissionType::ClearRoad, MissionType::ScoutRuins]);
        assert!(rules.validate().is_empty());
    }

    #[test]
    fn test_missing_tier_is_reported() {
        let mut rules = MissionPlacementRules::default();
        rules.rules_by_mission.insert(
            MissionType::DestroyBridge,
            PerMissionRules {
                tier: MissionTier::Tier3,
                ..PerMissionRules::default()
            },
        );
        assert_eq!(rules.effective_rules(MissionType::DestroyBridge), None);
        assert_eq!(rules.validate().len(), 1);
    }

    #[test]
    fn test_companion_needs_specific_neutral_type() {
        let mut rules = MissionPlacementRules::default();
        let mut tier = MissionTierRules::default();
        tier.adjacency = AdjacencyRequirement {
            enabled: true,
            target: AdjacencyTarget::Enemy(None),
            policy: AdjacencyPolicy::TryAutoPlaceCompanion,
            ..AdjacencyRequirement::default()
        };
        rules.rules_by_tier.insert(MissionTier::Tier1, tier);
        rules
            .rules_by_mission
            .insert(MissionType::RescueConvoy, PerMissionRules::default());
        assert_eq!(rules.validate().len(), 1);
    }

    #[test]
    fn test_override_bands_are_normalized() {
        let rules = PerMissionRules {
            override_min_hops_from_hq: 5,
            override_max_hops_from_hq: 2,
            ..PerMissionRules::default()
        };
        assert_eq!(rules.override_hop_band(), (2, 5));
    }
}
