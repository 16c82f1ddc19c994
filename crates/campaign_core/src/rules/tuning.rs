//! Seed, item counts and difficulty scaling.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::items::{EnemyItemType, NeutralItemType};

/// Difficulty tiers with their own extra item counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub enum DifficultyLevel {
    /// Gentlest setting.
    NewToRts,
    /// Standard setting.
    #[default]
    Normal,
    /// Harder.
    Hard,
    /// Much harder.
    Brutal,
    /// Hardest.
    Ironman,
}

/// Extra items added on top of the base counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DifficultyItemOverrides {
    /// Extra enemy items by type. Negative values remove items.
    #[serde(default)]
    pub extra_enemy_items: BTreeMap<EnemyItemType, i32>,

    /// Extra neutral items by type. Negative values remove items.
    #[serde(default)]
    pub extra_neutral_items: BTreeMap<NeutralItemType, i32>,
}

/// Overrides for every difficulty level.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DifficultyOverridesTable {
    /// Overrides for `NewToRts`.
    #[serde(default)]
    pub new_to_rts: DifficultyItemOverrides,
    /// Overrides for `Normal`.
    #[serde(default)]
    pub normal: DifficultyItemOverrides,
    /// Overrides for `Hard`.
    #[serde(default)]
    pub hard: DifficultyItemOverrides,
    /// Overrides for `Brutal`.
    #[serde(default)]
    pub brutal: DifficultyItemOverrides,
    /// Overrides for `Ironman`.
    #[serde(default)]
    pub ironman: DifficultyItemOverrides,
}

impl DifficultyOverridesTable {
    /// Overrides for one level.
    #[must_use]
    pub const fn for_level(&self, level: DifficultyLevel) -> &DifficultyItemOverrides {
        match level {
            DifficultyLevel::NewToRts => &self.new_to_rts,
            DifficultyLevel::Normal => &self.normal,
            DifficultyLevel::Hard => &self.hard,
            DifficultyLevel::Brutal => &self.brutal,
            DifficultyLevel::Ironman => &self.ironman,
        }
    }
}

/// Seed and item counts for a run.
///
/// # Example RON
///
/// ```ron
/// CountTuning(
///     seed: 42,
///     base_enemy_items: { Outpost: 2, Factory: 1 },
///     base_neutral_items: { Village: 2 },
///     difficulty: Hard,
///     difficulty_overrides: (hard: (extra_enemy_items: { Outpost: 1 })),
/// )
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountTuning {
    /// Base seed of every deterministic stream in the run.
    #[serde(default)]
    pub seed: u64,

    /// Enemy items before difficulty scaling.
    #[serde(default)]
    pub base_enemy_items: BTreeMap<EnemyItemType, i32>,

    /// Neutral items before difficulty scaling.
    #[serde(default)]
    pub base_neutral_items: BTreeMap<NeutralItemType, i32>,

    /// Active difficulty.
    #[serde(default)]
    pub difficulty: DifficultyLevel,

    /// Extra counts per difficulty.
    #[serde(default)]
    pub difficulty_overrides: DifficultyOverridesTable,
}

impl CountTuning {
    /// Required enemy items by type, excluding the HQ and wall and any type
    /// whose count is not positive.
    #[must_use]
    pub fn required_enemy_items(&self) -> BTreeMap<EnemyItemType, u32> {
        let extras = &self.difficulty_overrides.for_level(self.difficulty).extra_enemy_items;
        merge_counts(&self.base_enemy_items, extras)
            .into_iter()
            .filter(|(item, _)| !item.has_dedicated_step())
            .collect()
    }

    /// Required neutral items by type, skipping types whose count is not
    /// positive.
    #[must_use]
    pub fn required_neutral_items(&self) -> BTreeMap<NeutralItemType, u32> {
        let extras = &self.difficulty_overrides.for_level(self.difficulty).extra_neutral_items;
        merge_counts(&self.base_neutral_items, extras)
    }

    /// Enemy items in placement order: types sorted, each repeated by its
    /// count.
    #[must_use]
    pub fn enemy_plan(&self) -> Vec<EnemyItemType> {
        self.required_enemy_items()
            .into_iter()
            .flat_map(|(item, count)| std::iter::repeat(item).take(count as usize))
            .collect()
    }
}

fn merge_counts<K: Ord + Copy>(base: &BTreeMap<K, i32>, extra: &BTreeMap<K, i32>) -> BTreeMap<K, u32> {
    let mut totals: BTreeMap<K, i32> = base.clone();
    for (key, add) in extra {
        let entry = totals.entry(*key).or_insert(0);
        *entry = entry.saturating_add(*add);
    }
    totals
        .into_iter()
        .filter(|(_, count)| *count > 0)
        .map(|(key, count)| (key, count as u32))
        .collect()
}
