//! Enemy wall.

use tracing::{debug, warn};

use super::{known_anchors, PlacementContext};
use crate::graph::AnchorKey;
use crate::rules::EnemyWallRules;
use crate::selector::{pick_cyclic, rank_candidates, Candidate, CandidateRules, Rejection};

/// Occupancy filter and wall preference.
#[derive(Debug, Clone, Copy)]
pub struct WallFilter<'a> {
    ctx: PlacementContext<'a>,
    rules: &'a EnemyWallRules,
}

impl<'a> WallFilter<'a> {
    /// Filter for the given rules.
    #[must_use]
    pub const fn new(ctx: PlacementContext<'a>, rules: &'a EnemyWallRules) -> Self {
        Self { ctx, rules }
    }
}

impl CandidateRules for WallFilter<'_> {
    fn label(&self) -> String {
        "enemy-wall".to_string()
    }

    fn evaluate(&self, key: AnchorKey) -> Result<Candidate, Rejection> {
        let PlacementContext {
            graph,
            state,
            derived,
            ..
        } = self.ctx;
        if !graph.contains(key) {
            return Err("not cached");
        }
        if state.is_occupied(key) {
            return Err("occupied");
        }
        let score = self
            .rules
            .preference
            .wall_score(graph.degree(key), derived.chokepoint(key));
        Ok(Candidate::new(key, score))
    }
}

/// Pick the wall anchor from the configured allow-list.
///
/// An empty allow-list yields `None` so the step fails and goes through the
/// usual recovery.
#[must_use]
pub fn select_enemy_wall(ctx: PlacementContext<'_>, rules: &EnemyWallRules) -> Option<AnchorKey> {
    if rules.anchor_candidates.is_empty() {
        warn!("enemy wall has no candidate anchors configured");
        return None;
    }
    let source = known_anchors(ctx.graph, &rules.anchor_candidates);
    let ranked = rank_candidates(&WallFilter::new(ctx, rules), source);
    debug!(candidates = ranked.len(), attempt = ctx.attempt, "enemy wall candidates");
    pick_cyclic(&ranked, u64::from(ctx.attempt)).map(|chosen| chosen.key)
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{key, star_graph};
    use super::*;
    use crate::failure::RelaxationState;
    use crate::items::PlacedItem;
    use crate::rules::EnemyPreference;
    use crate::state::{DerivedData, PlacementState};

    #[test]
    fn test_empty_allow_list_fails() {
        let graph = star_graph(4);
        let state = PlacementState::new(1);
        let derived = DerivedData::for_graph(&graph, 1);
        let ctx = PlacementContext::new(&graph, &state, &derived, 0, RelaxationState::default());
        assert_eq!(select_enemy_wall(ctx, &EnemyWallRules::default()), None);
    }

    #[test]
    fn test_wall_prefers_high_degree_and_skips_occupied() {
        let graph = star_graph(5);
        let mut state = PlacementState::new(1);
        let derived = DerivedData::for_graph(&graph, 1);
        let rules = EnemyWallRules {
            anchor_candidates: vec![key(4), key(1), key(3)],
            preference: EnemyPreference::PreferHighDegree,
        };

        let ctx = PlacementContext::new(&graph, &state, &derived, 0, RelaxationState::default());
        assert_eq!(select_enemy_wall(ctx, &rules), Some(key(1)));
        let ctx = PlacementContext::new(&graph, &state, &derived, 1, RelaxationState::default());
        assert_eq!(select_enemy_wall(ctx, &rules), Some(key(3)));

        state.record(key(1), PlacedItem::PlayerHq);
        let ctx = PlacementContext::new(&graph, &state, &derived, 0, RelaxationState::default());
        assert_eq!(select_enemy_wall(ctx, &rules), Some(key(3)));
    }
}
