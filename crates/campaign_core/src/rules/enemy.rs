//! Enemy item placement rules.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::preference::EnemyPreference;
use crate::items::EnemyItemType;

/// Spacing between enemy items.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnemyItemSpacing {
    /// Minimum hops to an enemy item of another type.
    #[serde(default)]
    pub min_separation_hops_other_type: u32,

    /// Minimum hops to an enemy item of the same type.
    #[serde(default)]
    pub min_separation_hops_same_type: u32,
}

/// Hop window around the enemy HQ.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnemyHqSpacing {
    /// Minimum hops from the enemy HQ.
    #[serde(default)]
    pub min_hops_from_enemy_hq: u32,

    /// Maximum hops from the enemy HQ. Values below the minimum collapse to it.
    #[serde(default = "default_max_hops_from_enemy_hq")]
    pub max_hops_from_enemy_hq: u32,

    /// Candidate ordering inside the window.
    #[serde(default)]
    pub preference: EnemyPreference,
}

const fn default_max_hops_from_enemy_hq() -> u32 {
    u32::MAX
}

impl Default for EnemyHqSpacing {
    fn default() -> Self {
        Self {
            min_hops_from_enemy_hq: 0,
            max_hops_from_enemy_hq: default_max_hops_from_enemy_hq(),
            preference: EnemyPreference::None,
        }
    }
}

/// Hard filters and ordering for one placement of an enemy item.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnemyItemRules {
    /// Spacing to other enemy items.
    #[serde(default)]
    pub item_spacing: EnemyItemSpacing,

    /// Window around the enemy HQ.
    #[serde(default)]
    pub enemy_hq_spacing: EnemyHqSpacing,
}

/// How variants are chosen for repeated placements of one type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum VariantMode {
    /// Always use the base rules.
    #[default]
    None,
    /// Placement `n` uses enabled variant `n % enabled_count`.
    CycleByPlacementIndex,
}

/// Optional per-placement override of the base rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnemyItemVariant {
    /// Disabled variants are skipped entirely.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Whether `override_rules` replace the base rules.
    #[serde(default)]
    pub override_rules: bool,

    /// Replacement rules.
    #[serde(default)]
    pub rules: EnemyItemRules,
}

const fn default_enabled() -> bool {
    true
}

impl Default for EnemyItemVariant {
    fn default() -> Self {
        Self {
            enabled: true,
            override_rules: false,
            rules: EnemyItemRules::default(),
        }
    }
}

/// Rules for one enemy item type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnemyItemRuleset {
    /// Rules used when no variant overrides them.
    #[serde(default)]
    pub base_rules: EnemyItemRules,

    /// Variant selection mode.
    #[serde(default)]
    pub variant_mode: VariantMode,

    /// Variants consulted when `variant_mode` is not `None`.
    #[serde(default)]
    pub variants: Vec<EnemyItemVariant>,
}

impl EnemyItemRuleset {
    /// Rules in effect for the placement with ordinal `placed_count`.
    #[must_use]
    pub fn rules_for_placement(&self, placed_count: u32) -> EnemyItemRules {
        if self.variant_mode == VariantMode::None {
            return self.base_rules;
        }
        let enabled: Vec<&EnemyItemVariant> = self.variants.iter().filter(|v| v.enabled).collect();
        if enabled.is_empty() {
            return self.base_rules;
        }
        let variant = enabled[placed_count as usize % enabled.len()];
        if variant.override_rules {
            variant.rules
        } else {
            self.base_rules
        }
    }
}

/// Rulesets by enemy item type. Types without an entry use default rules.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnemyPlacementRules {
    /// Per-type rulesets.
    #[serde(default)]
    pub rules_by_item: BTreeMap<EnemyItemType, EnemyItemRuleset>,
}

impl EnemyPlacementRules {
    /// Rules in effect for the next placement of `item`.
    #[must_use]
    pub fn rules_for(&self, item: EnemyItemType, placed_count: u32) -> EnemyItemRules {
        self.rules_by_item
            .get(&item)
            .map(|ruleset| ruleset.rules_for_placement(placed_count))
            .unwrap_or_default()
    }
}
