//! Placement state and the data derived from it.
//!
//! Both structs are plain values. A step works on clones and commits by
//! assignment, and transactions keep clones as their undo snapshots, so no
//! step ever needs hand-written rollback code for them.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::graph::{AnchorGraph, AnchorKey};
use crate::hops::{chokepoint_scores, degree_map, hops_from_anchor, HopMap};
use crate::items::{EnemyItemType, MissionType, NeutralItemType, PlacedItem};
use crate::rules::{MissionPlacementRules, CHOKEPOINT_SEED_OFFSET, MAX_CHOKEPOINT_PAIR_SAMPLES};

/// What has been placed where.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlacementState {
    /// Base seed the run was started with.
    pub seed: u64,
    /// Player HQ anchor.
    pub player_hq: Option<AnchorKey>,
    /// Enemy HQ anchor.
    pub enemy_hq: Option<AnchorKey>,
    /// Enemy items, including the wall.
    pub enemy_items: BTreeMap<AnchorKey, EnemyItemType>,
    /// Neutral items.
    pub neutral_items: BTreeMap<AnchorKey, NeutralItemType>,
    /// Missions.
    pub missions: BTreeMap<AnchorKey, MissionType>,
}

impl PlacementState {
    /// Empty state for a run seeded with `seed`.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            ..Self::default()
        }
    }

    /// Whether the anchor holds an HQ.
    #[must_use]
    pub fn is_hq(&self, key: AnchorKey) -> bool {
        self.player_hq == Some(key) || self.enemy_hq == Some(key)
    }

    /// Whether the anchor holds anything at all.
    #[must_use]
    pub fn is_occupied(&self, key: AnchorKey) -> bool {
        self.is_hq(key)
            || self.enemy_items.contains_key(&key)
            || self.neutral_items.contains_key(&key)
            || self.missions.contains_key(&key)
    }

    /// Occupancy as seen by a mission. A neutral item only blocks when
    /// stacking on it is not allowed.
    #[must_use]
    pub fn is_occupied_for_mission(&self, key: AnchorKey, allow_neutral_stacking: bool) -> bool {
        self.is_hq(key)
            || self.enemy_items.contains_key(&key)
            || self.missions.contains_key(&key)
            || (!allow_neutral_stacking && self.neutral_items.contains_key(&key))
    }

    /// Every item on an anchor, HQs first.
    #[must_use]
    pub fn items_at(&self, key: AnchorKey) -> Vec<PlacedItem> {
        let mut items = Vec::new();
        if self.player_hq == Some(key) {
            items.push(PlacedItem::PlayerHq);
        }
        if self.enemy_hq == Some(key) {
            items.push(PlacedItem::Enemy(EnemyItemType::EnemyHq));
        }
        if let Some(item) = self.enemy_items.get(&key) {
            items.push(PlacedItem::Enemy(*item));
        }
        if let Some(item) = self.neutral_items.get(&key) {
            items.push(PlacedItem::Neutral(*item));
        }
        if let Some(mission) = self.missions.get(&key) {
            items.push(PlacedItem::Mission(*mission));
        }
        items
    }

    /// Record a placed item. HQ items set the HQ slots.
    pub fn record(&mut self, key: AnchorKey, item: PlacedItem) {
        match item {
            PlacedItem::PlayerHq => self.player_hq = Some(key),
            PlacedItem::Enemy(EnemyItemType::EnemyHq) => self.enemy_hq = Some(key),
            PlacedItem::Enemy(enemy) => {
                self.enemy_items.insert(key, enemy);
            }
            PlacedItem::Neutral(neutral) => {
                self.neutral_items.insert(key, neutral);
            }
            PlacedItem::Mission(mission) => {
                self.missions.insert(key, mission);
            }
        }
    }

    /// Anchors holding more than one item. The one allowed stack is a
    /// mission on a neutral item whose rules require that neutral item.
    #[must_use]
    pub fn occupancy_conflicts(&self, missions: &MissionPlacementRules) -> Vec<AnchorKey> {
        let occupied: BTreeSet<AnchorKey> = self
            .player_hq
            .iter()
            .chain(self.enemy_hq.iter())
            .chain(self.enemy_items.keys())
            .chain(self.neutral_items.keys())
            .chain(self.missions.keys())
            .copied()
            .collect();

        occupied
            .into_iter()
            .filter(|key| match self.items_at(*key).as_slice() {
                [_] => false,
                [PlacedItem::Neutral(neutral), PlacedItem::Mission(mission)] => {
                    !missions.effective_rules(*mission).is_some_and(|rules| {
                        rules.neutral_item_required
                            && rules.required_neutral_type.map_or(true, |required| required == *neutral)
                    })
                }
                _ => true,
            })
            .collect()
    }

    /// Total items placed, HQs included.
    #[must_use]
    pub fn item_count(&self) -> usize {
        usize::from(self.player_hq.is_some())
            + usize::from(self.enemy_hq.is_some())
            + self.enemy_items.len()
            + self.neutral_items.len()
            + self.missions.len()
    }
}

/// Caches computed from the graph and the placement state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DerivedData {
    /// Hops from the player HQ.
    pub player_hq_hops: HopMap,
    /// Hops from the enemy HQ.
    pub enemy_hq_hops: HopMap,
    /// Connection degree per anchor.
    pub degrees: BTreeMap<AnchorKey, u32>,
    /// Chokepoint score per anchor.
    pub chokepoints: BTreeMap<AnchorKey, i64>,
    /// Enemy items placed per type, wall included.
    pub enemy_counts: BTreeMap<EnemyItemType, u32>,
    /// Neutral items placed per type.
    pub neutral_counts: BTreeMap<NeutralItemType, u32>,
    /// Missions placed per type.
    pub mission_counts: BTreeMap<MissionType, u32>,
}

impl DerivedData {
    /// Degree and HQ-less chokepoint caches for a freshly connected graph.
    #[must_use]
    pub fn for_graph(graph: &AnchorGraph, seed: u64) -> Self {
        Self {
            degrees: degree_map(graph),
            chokepoints: chokepoint_scores(
                graph,
                None,
                seed.wrapping_add(CHOKEPOINT_SEED_OFFSET),
                MAX_CHOKEPOINT_PAIR_SAMPLES,
            ),
            ..Self::default()
        }
    }

    /// Cache hop distances from the new player HQ and rebuild chokepoints
    /// around it.
    pub fn set_player_hq(&mut self, graph: &AnchorGraph, hq: AnchorKey, seed: u64) {
        self.player_hq_hops = hops_from_anchor(graph, hq);
        self.chokepoints = chokepoint_scores(
            graph,
            Some(hq),
            seed.wrapping_add(CHOKEPOINT_SEED_OFFSET),
            MAX_CHOKEPOINT_PAIR_SAMPLES,
        );
    }

    /// Cache hop distances from the new enemy HQ.
    pub fn set_enemy_hq(&mut self, graph: &AnchorGraph, hq: AnchorKey) {
        self.enemy_hq_hops = hops_from_anchor(graph, hq);
    }

    /// Count one more placed item.
    pub fn count(&mut self, item: PlacedItem) {
        match item {
            PlacedItem::PlayerHq => {}
            PlacedItem::Enemy(enemy) => *self.enemy_counts.entry(enemy).or_insert(0) += 1,
            PlacedItem::Neutral(neutral) => *self.neutral_counts.entry(neutral).or_insert(0) += 1,
            PlacedItem::Mission(mission) => *self.mission_counts.entry(mission).or_insert(0) += 1,
        }
    }

    /// Placed count of an enemy type.
    #[must_use]
    pub fn enemy_count(&self, item: EnemyItemType) -> u32 {
        self.enemy_counts.get(&item).copied().unwrap_or(0)
    }

    /// Placed count of a neutral type.
    #[must_use]
    pub fn neutral_count(&self, item: NeutralItemType) -> u32 {
        self.neutral_counts.get(&item).copied().unwrap_or(0)
    }

    /// Degree of an anchor, zero if unknown.
    #[must_use]
    pub fn degree(&self, key: AnchorKey) -> u32 {
        self.degrees.get(&key).copied().unwrap_or(0)
    }

    /// Chokepoint score of an anchor, zero if unknown.
    #[must_use]
    pub fn chokepoint(&self, key: AnchorKey) -> i64 {
        self.chokepoints.get(&key).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::items::MissionTier;
    use crate::rules::{MissionTierRules, PerMissionRules};

    fn key(n: u128) -> AnchorKey {
        AnchorKey::from_u128(n)
    }

    #[test]
    fn test_mission_may_stack_on_neutral_only_when_allowed() {
        let mut state = PlacementState::new(1);
        state.record(key(4), PlacedItem::Neutral(NeutralItemType::Ruins));
        assert!(state.is_occupied(key(4)));
        assert!(state.is_occupied_for_mission(key(4), false));
        assert!(!state.is_occupied_for_mission(key(4), true));
    }

    #[test]
    fn test_record_sets_hq_slots() {
        let mut state = PlacementState::default();
        state.record(key(1), PlacedItem::PlayerHq);
        state.record(key(2), PlacedItem::Enemy(EnemyItemType::EnemyHq));
        state.record(key(3), PlacedItem::Enemy(EnemyItemType::EnemyWall));
        assert_eq!(state.player_hq, Some(key(1)));
        assert_eq!(state.enemy_hq, Some(key(2)));
        assert_eq!(state.enemy_items.len(), 1);
        assert_eq!(state.item_count(), 3);
        assert_eq!(
            state.items_at(key(2)),
            vec![PlacedItem::Enemy(EnemyItemType::EnemyHq)]
        );
    }

    fn village_missions(required: bool) -> MissionPlacementRules {
        let mut rules = MissionPlacementRules::default();
        rules.rules_by_tier.insert(
            MissionTier::Tier1,
            MissionTierRules {
                neutral_item_required: required,
                required_neutral_type: required.then_some(NeutralItemType::Village),
                ..MissionTierRules::default()
            },
        );
        rules
            .rules_by_mission
            .insert(MissionType::DefendVillage, PerMissionRules::default());
        rules
    }

    #[test]
    fn test_occupancy_conflicts() {
        let mut state = PlacementState::default();
        state.record(key(5), PlacedItem::Enemy(EnemyItemType::Outpost));
        state.record(key(6), PlacedItem::Neutral(NeutralItemType::Village));
        state.record(key(6), PlacedItem::Mission(MissionType::DefendVillage));
        assert!(state.occupancy_conflicts(&village_missions(true)).is_empty());

        state.record(key(5), PlacedItem::Mission(MissionType::ClearRoad));
        assert_eq!(state.occupancy_conflicts(&village_missions(true)), vec![key(5)]);
    }

    #[test]
    fn test_unsanctioned_mission_stack_conflicts() {
        let mut state = PlacementState::default();
        state.record(key(6), PlacedItem::Neutral(NeutralItemType::Village));
        state.record(key(6), PlacedItem::Mission(MissionType::DefendVillage));
        assert_eq!(state.occupancy_conflicts(&village_missions(false)), vec![key(6)]);
        assert_eq!(state.occupancy_conflicts(&MissionPlacementRules::default()), vec![key(6)]);

        let mut ruins = PlacementState::default();
        ruins.record(key(6), PlacedItem::Neutral(NeutralItemType::Ruins));
        ruins.record(key(6), PlacedItem::Mission(MissionType::DefendVillage));
        assert_eq!(ruins.occupancy_conflicts(&village_missions(true)), vec![key(6)]);
    }

    #[test]
    fn test_hq_stacks_conflict() {
        let rules = village_missions(true);
        let mut state = PlacementState::default();
        state.record(key(1), PlacedItem::PlayerHq);
        state.record(key(2), PlacedItem::Enemy(EnemyItemType::EnemyHq));
        assert!(state.occupancy_conflicts(&rules).is_empty());

        state.record(key(1), PlacedItem::Neutral(NeutralItemType::Village));
        state.record(key(2), PlacedItem::Mission(MissionType::DefendVillage));
        assert_eq!(state.occupancy_conflicts(&rules), vec![key(1), key(2)]);

        let mut shared = PlacementState::default();
        shared.record(key(3), PlacedItem::PlayerHq);
        shared.record(key(3), PlacedItem::Enemy(EnemyItemType::EnemyHq));
        assert_eq!(shared.occupancy_conflicts(&rules), vec![key(3)]);
    }

    #[test]
    fn test_counts() {
        let mut derived = DerivedData::default();
        derived.count(PlacedItem::Enemy(EnemyItemType::Factory));
        derived.count(PlacedItem::Enemy(EnemyItemType::Factory));
        derived.count(PlacedItem::PlayerHq);
        assert_eq!(derived.enemy_count(EnemyItemType::Factory), 2);
        assert_eq!(derived.neutral_count(NeutralItemType::Village), 0);
    }
}
