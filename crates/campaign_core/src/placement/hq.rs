//! Player and enemy headquarters.

use tracing::{debug, warn};

use super::{allow_list_or_all, within_band, PlacementContext};
use crate::graph::AnchorKey;
use crate::hops::hops_from_anchor;
use crate::math::Fixed;
use crate::rng::CampaignRng;
use crate::rules::{
    EnemyHqRules, PlayerHqRules, ATTEMPT_SEED_MULTIPLIER, ENEMY_HQ_FORCE_SEED_OFFSET,
    PLAYER_HQ_FORCE_SEED_OFFSET,
};
use crate::selector::{pick_cyclic, rank_candidates, Candidate, CandidateRules, Rejection};

/// Hard filters of the player HQ.
#[derive(Debug, Clone, Copy)]
pub struct PlayerHqFilter<'a> {
    ctx: PlacementContext<'a>,
    rules: &'a PlayerHqRules,
}

impl<'a> PlayerHqFilter<'a> {
    /// Filter for the given rules.
    #[must_use]
    pub const fn new(ctx: PlacementContext<'a>, rules: &'a PlayerHqRules) -> Self {
        Self { ctx, rules }
    }
}

impl CandidateRules for PlayerHqFilter<'_> {
    fn label(&self) -> String {
        "player-hq".to_string()
    }

    fn evaluate(&self, key: AnchorKey) -> Result<Candidate, Rejection> {
        let PlacementContext { graph, state, .. } = self.ctx;
        if !graph.contains(key) {
            return Err("not cached");
        }
        if state.is_occupied(key) {
            return Err("occupied");
        }
        if graph.degree(key) < self.rules.min_anchor_degree {
            return Err("degree below minimum");
        }

        let needs_hops = self.rules.min_anchors_within_hops > 0 || self.rules.safe_zone_max_hops > 0;
        if needs_hops {
            let hops = hops_from_anchor(graph, key);
            let range = self.rules.min_anchors_within_hops_range;
            let nearby = hops.values().filter(|hop| **hop > 0 && **hop <= range).count();
            if nearby < self.rules.min_anchors_within_hops as usize {
                return Err("too few anchors nearby");
            }

            let safe_zone = self.rules.safe_zone_max_hops;
            if safe_zone > 0 {
                let enemies = state.enemy_hq.iter().chain(state.enemy_items.keys());
                for enemy in enemies {
                    if hops.get(enemy).is_some_and(|hop| *hop <= safe_zone) {
                        return Err("enemy inside safe zone");
                    }
                }
            }
        }

        Ok(Candidate::new(key, Fixed::ZERO))
    }
}

/// Pick the player HQ anchor.
///
/// Survivors are taken in key order, cycling with the attempt index. With
/// the force fallback enabled an empty candidate list falls back to a seeded
/// pick among every free source anchor.
#[must_use]
pub fn select_player_hq(ctx: PlacementContext<'_>, rules: &PlayerHqRules) -> Option<AnchorKey> {
    let source = allow_list_or_all(ctx.graph, &rules.anchor_candidates);
    let ranked = rank_candidates(&PlayerHqFilter::new(ctx, rules), source.iter().copied());
    debug!(candidates = ranked.len(), attempt = ctx.attempt, "player HQ candidates");

    if let Some(chosen) = pick_cyclic(&ranked, u64::from(ctx.attempt)) {
        return Some(chosen.key);
    }
    if !rules.force_placement_fallback {
        return None;
    }
    warn!(attempt = ctx.attempt, "no valid player HQ anchor, forcing placement");
    forced_pick(ctx, &source, PLAYER_HQ_FORCE_SEED_OFFSET)
}

/// Hard filters and degree preference of the enemy HQ.
#[derive(Debug, Clone, Copy)]
pub struct EnemyHqFilter<'a> {
    ctx: PlacementContext<'a>,
    rules: &'a EnemyHqRules,
}

impl<'a> EnemyHqFilter<'a> {
    /// Filter for the given rules.
    #[must_use]
    pub const fn new(ctx: PlacementContext<'a>, rules: &'a EnemyHqRules) -> Self {
        Self { ctx, rules }
    }
}

impl CandidateRules for EnemyHqFilter<'_> {
    fn label(&self) -> String {
        "enemy-hq".to_string()
    }

    fn evaluate(&self, key: AnchorKey) -> Result<Candidate, Rejection> {
        let PlacementContext { graph, state, .. } = self.ctx;
        if !graph.contains(key) {
            return Err("not cached");
        }
        if state.is_occupied(key) {
            return Err("occupied");
        }
        let degree = graph.degree(key);
        let (min, max) = self.rules.degree_band();
        if !within_band(degree, min, max) {
            return Err("degree outside band");
        }
        let score = self
            .rules
            .anchor_degree_preference
            .score(Fixed::saturating_from_num(degree));
        Ok(Candidate::new(key, score))
    }
}

/// Pick the enemy HQ anchor. Never the player HQ's anchor.
#[must_use]
pub fn select_enemy_hq(ctx: PlacementContext<'_>, rules: &EnemyHqRules) -> Option<AnchorKey> {
    let source = allow_list_or_all(ctx.graph, &rules.anchor_candidates);
    let ranked = rank_candidates(&EnemyHqFilter::new(ctx, rules), source.iter().copied());
    debug!(candidates = ranked.len(), attempt = ctx.attempt, "enemy HQ candidates");

    if let Some(chosen) = pick_cyclic(&ranked, u64::from(ctx.attempt)) {
        return Some(chosen.key);
    }
    if !rules.force_placement_fallback {
        return None;
    }
    warn!(attempt = ctx.attempt, "no valid enemy HQ anchor, forcing placement");
    forced_pick(ctx, &source, ENEMY_HQ_FORCE_SEED_OFFSET)
}

fn forced_pick(ctx: PlacementContext<'_>, source: &[AnchorKey], offset: u64) -> Option<AnchorKey> {
    let free: Vec<AnchorKey> = source
        .iter()
        .copied()
        .filter(|key| !ctx.state.is_occupied(*key))
        .collect();
    if free.is_empty() {
        return None;
    }
    let seed = ctx
        .seed()
        .wrapping_add(offset)
        .wrapping_add(u64::from(ctx.attempt).wrapping_mul(ATTEMPT_SEED_MULTIPLIER));
    let mut rng = CampaignRng::new(seed);
    Some(free[rng.index(free.len())])
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{key, path_graph, star_graph};
    use super::*;
    use crate::failure::RelaxationState;
    use crate::items::{EnemyItemType, PlacedItem};
    use crate::rules::TopologyPreference;
    use crate::state::{DerivedData, PlacementState};

    #[test]
    fn test_player_hq_cycles_through_key_order() {
        let graph = path_graph(5);
        let state = PlacementState::new(3);
        let derived = DerivedData::for_graph(&graph, 3);
        let rules = PlayerHqRules {
            min_anchor_degree: 2,
            ..PlayerHqRules::default()
        };

        let pick = |attempt| {
            select_player_hq(
                PlacementContext::new(&graph, &state, &derived, attempt, RelaxationState::default()),
                &rules,
            )
        };
        // Only the interior anchors 2, 3 and 4 have two neighbors.
        assert_eq!(pick(0), Some(key(2)));
        assert_eq!(pick(1), Some(key(3)));
        assert_eq!(pick(3), Some(key(2)));
    }

    #[test]
    fn test_player_hq_neighborhood_and_safe_zone() {
        let graph = path_graph(7);
        let mut state = PlacementState::new(3);
        state.record(key(7), PlacedItem::Enemy(EnemyItemType::EnemyHq));
        let derived = DerivedData::for_graph(&graph, 3);
        let rules = PlayerHqRules {
            min_anchors_within_hops: 4,
            min_anchors_within_hops_range: 2,
            safe_zone_max_hops: 3,
            ..PlayerHqRules::default()
        };
        let ctx = PlacementContext::new(&graph, &state, &derived, 0, RelaxationState::default());
        let filter = PlayerHqFilter::new(ctx, &rules);

        assert_eq!(filter.evaluate(key(2)), Err("too few anchors nearby"));
        assert_eq!(filter.evaluate(key(5)), Err("enemy inside safe zone"));
        assert!(filter.evaluate(key(3)).is_ok());
        assert_eq!(select_player_hq(ctx, &rules), Some(key(3)));
    }

    #[test]
    fn test_forced_player_hq_only_when_enabled() {
        let graph = path_graph(4);
        let state = PlacementState::new(11);
        let derived = DerivedData::for_graph(&graph, 11);
        let mut rules = PlayerHqRules {
            min_anchor_degree: 5,
            ..PlayerHqRules::default()
        };
        let ctx = PlacementContext::new(&graph, &state, &derived, 2, RelaxationState::default());
        assert_eq!(select_player_hq(ctx, &rules), None);

        rules.force_placement_fallback = true;
        let forced = select_player_hq(ctx, &rules);
        assert!(forced.is_some());
        assert_eq!(forced, select_player_hq(ctx, &rules));
    }

    #[test]
    fn test_enemy_hq_prefers_degree_and_skips_player_hq() {
        let graph = star_graph(6);
        let mut state = PlacementState::new(5);
        let derived = DerivedData::for_graph(&graph, 5);
        let rules = EnemyHqRules {
            anchor_degree_preference: TopologyPreference::PreferMax,
            ..EnemyHqRules::default()
        };

        let ctx = PlacementContext::new(&graph, &state, &derived, 0, RelaxationState::default());
        assert_eq!(select_enemy_hq(ctx, &rules), Some(key(1)));

        state.record(key(1), PlacedItem::PlayerHq);
        let ctx = PlacementContext::new(&graph, &state, &derived, 0, RelaxationState::default());
        assert_eq!(select_enemy_hq(ctx, &rules), Some(key(2)));
    }
}
