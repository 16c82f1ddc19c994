//! Enemy items other than the HQ and the wall.

use tracing::debug;

use super::{within_band, PlacementContext};
use crate::failure::RelaxationState;
use crate::graph::AnchorKey;
use crate::hops::hops_from_anchor;
use crate::items::EnemyItemType;
use crate::rules::{EnemyItemRules, EnemyPlacementRules, EnemyPreference, EnemyScoreInput};
use crate::selector::{pick_cyclic, rank_candidates, Candidate, CandidateRules, Rejection};

/// Hard filters and preference for one enemy item placement.
#[derive(Debug, Clone, Copy)]
pub struct EnemyItemFilter<'a> {
    ctx: PlacementContext<'a>,
    item: EnemyItemType,
    rules: EnemyItemRules,
    safe_zone_hops: u32,
}

impl<'a> EnemyItemFilter<'a> {
    /// Filter for `item` with already relaxed rules. A zero safe zone
    /// disables the player HQ exclusion.
    #[must_use]
    pub const fn new(
        ctx: PlacementContext<'a>,
        item: EnemyItemType,
        rules: EnemyItemRules,
        safe_zone_hops: u32,
    ) -> Self {
        Self {
            ctx,
            item,
            rules,
            safe_zone_hops,
        }
    }
}

impl CandidateRules for EnemyItemFilter<'_> {
    fn label(&self) -> String {
        format!("enemy-{:?}", self.item)
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

        let band = self.rules.enemy_hq_spacing;
        let Some(&hop) = derived.enemy_hq_hops.get(&key) else {
            return Err("unreachable from enemy HQ");
        };
        if !within_band(hop, band.min_hops_from_enemy_hq, band.max_hops_from_enemy_hq) {
            return Err("outside enemy HQ band");
        }

        if self.safe_zone_hops > 0
            && derived
                .player_hq_hops
                .get(&key)
                .is_some_and(|player_hop| *player_hop <= self.safe_zone_hops)
        {
            return Err("inside player safe zone");
        }

        if !state.enemy_items.is_empty() {
            let hops = hops_from_anchor(graph, key);
            let spacing = self.rules.item_spacing;
            for (other, other_type) in &state.enemy_items {
                let Some(&separation) = hops.get(other) else {
                    return Err("unreachable enemy item");
                };
                let min = if *other_type == self.item {
                    spacing.min_separation_hops_same_type
                } else {
                    spacing.min_separation_hops_other_type
                };
                if separation < min {
                    return Err("too close to enemy item");
                }
            }
        }

        let score = band.preference.item_score(EnemyScoreInput {
            degree: graph.degree(key),
            chokepoint: derived.chokepoint(key),
            hop,
            min_hops: band.min_hops_from_enemy_hq,
            max_hops: band.max_hops_from_enemy_hq,
        });
        Ok(Candidate::new(key, score).with_hop(hop))
    }
}

/// Apply the relaxation of the current attempt to enemy item rules.
#[must_use]
pub fn relaxed_enemy_rules(mut rules: EnemyItemRules, relaxation: RelaxationState) -> EnemyItemRules {
    if relaxation.relax_distance {
        rules.enemy_hq_spacing.min_hops_from_enemy_hq = 0;
        rules.enemy_hq_spacing.max_hops_from_enemy_hq = u32::MAX;
    }
    if relaxation.relax_spacing {
        rules.item_spacing.min_separation_hops_same_type = 0;
        rules.item_spacing.min_separation_hops_other_type = 0;
    }
    if relaxation.relax_preference {
        rules.enemy_hq_spacing.preference = EnemyPreference::None;
    }
    rules
}

/// Pick the anchor for the next `item`.
///
/// Rules come from the item's variant for its placement index. The pick
/// cycles with the attempt index plus the number of this type already
/// placed, so repeated types spread over the ranking.
#[must_use]
pub fn select_enemy_item(
    ctx: PlacementContext<'_>,
    rules: &EnemyPlacementRules,
    item: EnemyItemType,
    player_safe_zone_hops: u32,
) -> Option<AnchorKey> {
    let existing = ctx.derived.enemy_count(item);
    let item_rules = relaxed_enemy_rules(rules.rules_for(item, existing), ctx.relaxation);
    let safe_zone = if ctx.relaxation.relax_distance {
        0
    } else {
        player_safe_zone_hops
    };

    let filter = EnemyItemFilter::new(ctx, item, item_rules, safe_zone);
    let ranked = rank_candidates(&filter, ctx.graph.keys());
    debug!(?item, candidates = ranked.len(), attempt = ctx.attempt, "enemy item candidates");
    pick_cyclic(&ranked, u64::from(ctx.attempt) + u64::from(existing)).map(|chosen| chosen.key)
}
