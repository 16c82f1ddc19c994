//! Neutral item placement rules.

use serde::{Deserialize, Serialize};

use super::preference::TopologyPreference;

/// One rule set shared by every neutral item type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NeutralItemRules {
    /// Minimum hops from the player HQ.
    #[serde(default = "default_min_hops_from_hq")]
    pub min_hops_from_hq: u32,

    /// Maximum hops from the player HQ.
    #[serde(default = "default_unbounded")]
    pub max_hops_from_hq: u32,

    /// Minimum hops to every other neutral item.
    #[serde(default)]
    pub min_hops_from_other_neutral_items: u32,

    /// Maximum hops to every other neutral item.
    #[serde(default = "default_unbounded")]
    pub max_hops_from_other_neutral_items: u32,

    /// Ordering by hop distance from the player HQ.
    #[serde(default)]
    pub preference: TopologyPreference,
}

const fn default_min_hops_from_hq() -> u32 {
    1
}

const fn default_unbounded() -> u32 {
    u32::MAX
}

impl Default for NeutralItemRules {
    fn default() -> Self {
        Self {
            min_hops_from_hq: default_min_hops_from_hq(),
            max_hops_from_hq: default_unbounded(),
            min_hops_from_other_neutral_items: 0,
            max_hops_from_other_neutral_items: default_unbounded(),
            preference: TopologyPreference::NotSet,
        }
    }
}

impl NeutralItemRules {
    /// Inclusive hop band from the player HQ.
    #[must_use]
    pub fn hq_band(&self) -> (u32, u32) {
        (
            self.min_hops_from_hq,
            self.min_hops_from_hq.max(self.max_hops_from_hq),
        )
    }

    /// Inclusive hop band to other neutral items.
    #[must_use]
    pub fn spacing_band(&self) -> (u32, u32) {
        (
            self.min_hops_from_other_neutral_items,
            self.min_hops_from_other_neutral_items
                .max(self.max_hops_from_other_neutral_items),
        )
    }
}
