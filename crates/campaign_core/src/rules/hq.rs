//! Rules for the single-shot placements: player HQ, enemy HQ and enemy wall.

use serde::{Deserialize, Serialize};

use super::preference::{EnemyPreference, TopologyPreference};
use crate::graph::AnchorKey;

/// Player HQ placement rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerHqRules {
    /// Restrict candidates to these anchors. Empty means every anchor.
    #[serde(default)]
    pub anchor_candidates: Vec<AnchorKey>,

    /// Minimum connection degree of the HQ anchor.
    #[serde(default = "default_min_anchor_degree")]
    pub min_anchor_degree: u32,

    /// Minimum number of anchors within `min_anchors_within_hops_range`.
    #[serde(default)]
    pub min_anchors_within_hops: u32,

    /// Hop radius used by `min_anchors_within_hops`.
    #[serde(default = "default_neighborhood_range")]
    pub min_anchors_within_hops_range: u32,

    /// Keeps the HQ away from enemy anchors, and enemy items away from the
    /// HQ, by this many hops. Zero disables it.
    #[serde(default)]
    pub safe_zone_max_hops: u32,

    /// Pick a seeded random anchor when no candidate passes the filters.
    #[serde(default)]
    pub force_placement_fallback: bool,
}

const fn default_min_anchor_degree() -> u32 {
    1
}

const fn default_neighborhood_range() -> u32 {
    2
}

impl Default for PlayerHqRules {
    fn default() -> Self {
        Self {
            anchor_candidates: Vec::new(),
            min_anchor_degree: default_min_anchor_degree(),
            min_anchors_within_hops: 0,
            min_anchors_within_hops_range: default_neighborhood_range(),
            safe_zone_max_hops: 0,
            force_placement_fallback: false,
        }
    }
}

/// Enemy HQ placement rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnemyHqRules {
    /// Restrict candidates to these anchors. Empty means every anchor.
    #[serde(default)]
    pub anchor_candidates: Vec<AnchorKey>,

    /// Minimum connection degree.
    #[serde(default = "default_min_anchor_degree")]
    pub min_anchor_degree: u32,

    /// Maximum connection degree. Values below the minimum collapse to it.
    #[serde(default = "default_max_anchor_degree")]
    pub max_anchor_degree: u32,

    /// Order candidates by degree before the attempt index picks one.
    #[serde(default)]
    pub anchor_degree_preference: TopologyPreference,

    /// Pick a seeded random anchor when no candidate passes the filters.
    #[serde(default)]
    pub force_placement_fallback: bool,
}

const fn default_max_anchor_degree() -> u32 {
    u32::MAX
}

impl Default for EnemyHqRules {
    fn default() -> Self {
        Self {
            anchor_candidates: Vec::new(),
            min_anchor_degree: default_min_anchor_degree(),
            max_anchor_degree: default_max_anchor_degree(),
            anchor_degree_preference: TopologyPreference::NotSet,
            force_placement_fallback: false,
        }
    }
}

impl EnemyHqRules {
    /// Inclusive degree band after collapsing an inverted maximum.
    #[must_use]
    pub fn degree_band(&self) -> (u32, u32) {
        (
            self.min_anchor_degree,
            self.min_anchor_degree.max(self.max_anchor_degree),
        )
    }
}

/// Enemy wall placement rules. The wall only ever goes on an author-picked
/// anchor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnemyWallRules {
    /// Anchors the wall may be placed on.
    #[serde(default)]
    pub anchor_candidates: Vec<AnchorKey>,

    /// Candidate ordering.
    #[serde(default)]
    pub preference: EnemyPreference,
}
