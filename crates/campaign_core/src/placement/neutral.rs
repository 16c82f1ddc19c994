//! Neutral items. The same filter places mission companions.

use tracing::debug;

use super::{within_band, PlacementContext};
use crate::failure::RelaxationState;
use crate::graph::AnchorKey;
use crate::hops::hops_from_anchor;
use crate::items::NeutralItemType;
use crate::math::Fixed;
use crate::rules::{NeutralItemRules, TopologyPreference};
use crate::selector::{pick_cyclic, rank_candidates, Candidate, CandidateRules, Rejection};

/// Player HQ band, spacing between neutral items and hop preference.
#[derive(Debug, Clone, Copy)]
pub struct NeutralFilter<'a> {
    ctx: PlacementContext<'a>,
    rules: NeutralItemRules,
}

impl<'a> NeutralFilter<'a> {
    /// Filter with already relaxed rules.
    #[must_use]
    pub const fn new(ctx: PlacementContext<'a>, rules: NeutralItemRules) -> Self {
        Self { ctx, rules }
    }
}

impl CandidateRules for NeutralFilter<'_> {
    fn label(&self) -> String {
        "neutral".to_string()
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
        let Some(&hop) = derived.player_hq_hops.get(&key) else {
            return Err("unreachable from player HQ");
        };
        let (min, max) = self.rules.hq_band();
        if !within_band(hop, min, max) {
            return Err("outside player HQ band");
        }

        if !state.neutral_items.is_empty() {
            let hops = hops_from_anchor(graph, key);
            let (min, max) = self.rules.spacing_band();
            for other in state.neutral_items.keys() {
                match hops.get(other) {
                    Some(separation) if within_band(*separation, min, max) => {}
                    Some(_) => return Err("neutral spacing violated"),
                    None => return Err("unreachable neutral item"),
                }
            }
        }

        let score = self.rules.preference.score(Fixed::saturating_from_num(hop));
        Ok(Candidate::new(key, score).with_hop(hop))
    }
}

/// Apply the relaxation of the current attempt to neutral rules.
#[must_use]
pub fn relaxed_neutral_rules(mut rules: NeutralItemRules, relaxation: RelaxationState) -> NeutralItemRules {
    if relaxation.relax_distance {
        rules.min_hops_from_hq = 0;
        rules.max_hops_from_hq = u32::MAX;
    }
    if relaxation.relax_spacing {
        rules.min_hops_from_other_neutral_items = 0;
        rules.max_hops_from_other_neutral_items = u32::MAX;
    }
    if relaxation.relax_preference {
        rules.preference = TopologyPreference::NotSet;
    }
    rules
}

/// Pick the anchor for the next `item`, cycling with the attempt index plus
/// the number of this type already placed.
#[must_use]
pub fn select_neutral_item(
    ctx: PlacementContext<'_>,
    rules: &NeutralItemRules,
    item: NeutralItemType,
) -> Option<AnchorKey> {
    let existing = ctx.derived.neutral_count(item);
    let filter = NeutralFilter::new(ctx, relaxed_neutral_rules(*rules, ctx.relaxation));
    let ranked = rank_candidates(&filter, ctx.graph.keys());
    debug!(?item, candidates = ranked.len(), attempt = ctx.attempt, "neutral candidates");
    pick_cyclic(&ranked, u64::from(ctx.attempt) + u64::from(existing)).map(|chosen| chosen.key)
}
