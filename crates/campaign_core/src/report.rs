//! Serializable run summary.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::generator::GenerationContext;
use crate::graph::AnchorKey;
use crate::items::{EnemyItemType, MissionType, NeutralItemType};
use crate::step::GenerationStep;

/// What a run produced and what it cost.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationReport {
    /// Last completed step.
    pub step: GenerationStep,
    /// Anchors in the graph.
    pub anchors: usize,
    /// Connections in the graph.
    pub connections: usize,
    /// Player HQ anchor.
    pub player_hq: Option<AnchorKey>,
    /// Enemy HQ anchor.
    pub enemy_hq: Option<AnchorKey>,
    /// Enemy items by type, wall included.
    pub enemy_items: BTreeMap<EnemyItemType, u32>,
    /// Neutral items by type, companions included.
    pub neutral_items: BTreeMap<NeutralItemType, u32>,
    /// Missions by type.
    pub missions: BTreeMap<MissionType, u32>,
    /// Committed transactions.
    pub transactions: usize,
    /// Outstanding failed attempts per step.
    pub step_attempts: BTreeMap<GenerationStep, u32>,
    /// Failed attempts across the run.
    pub total_attempts: u32,
    /// Hash of the generator state.
    pub state_hash: u64,
}

impl GenerationReport {
    /// Summarize a context.
    #[must_use]
    pub fn new(context: &GenerationContext, state_hash: u64) -> Self {
        let state = &context.state;
        Self {
            step: context.step,
            anchors: context.graph.anchor_count(),
            connections: context.graph.connection_count(),
            player_hq: state.player_hq,
            enemy_hq: state.enemy_hq,
            enemy_items: tally(state.enemy_items.values().copied()),
            neutral_items: tally(state.neutral_items.values().copied()),
            missions: tally(state.missions.values().copied()),
            transactions: context.transactions.len(),
            step_attempts: context.step_attempts.clone(),
            total_attempts: context.total_attempts,
            state_hash,
        }
    }

    /// Items placed, HQs included.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        let hqs = u32::from(self.player_hq.is_some()) + u32::from(self.enemy_hq.is_some());
        hqs + self.enemy_items.values().sum::<u32>()
            + self.neutral_items.values().sum::<u32>()
            + self.missions.values().sum::<u32>()
    }
}

fn tally<K: Ord>(items: impl Iterator<Item = K>) -> BTreeMap<K, u32> {
    let mut counts = BTreeMap::new();
    for item in items {
        *counts.entry(item).or_insert(0) += 1;
    }
    counts
}
