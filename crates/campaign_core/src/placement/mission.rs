//! Missions, with optional adjacency requirements and auto-placed
//! companion neutral items.
//!
//! A mission resolves to one [`MissionTierRules`] (its tier's or its own
//! override). It is either placed anywhere those rules allow, or restricted
//! to an explicit anchor list with its own degree and hop bands. Both paths
//! share occupancy, neutral requirement, spacing and adjacency checks.

use tracing::{debug, warn};

use super::neutral::{relaxed_neutral_rules, NeutralFilter};
use super::{known_anchors, within_band, PlacementContext};
use crate::failure::RelaxationState;
use crate::graph::AnchorKey;
use crate::hops::{hops_from_anchor, HopMap};
use crate::items::{EnemyItemType, MissionType, NeutralItemType};
use crate::math::Fixed;
use crate::rules::{
    AdjacencyPolicy, AdjacencyRequirement, AdjacencyTarget, MissionPlacementRules,
    MissionTierRules, NeutralItemRules, PerMissionRules, TopologyPreference,
};
use crate::selector::{
    pick_cyclic, pick_hop_weighted, rank_candidates, Candidate, CandidateRules, HopWeighting,
    Rejection,
};

/// Where a mission goes, plus the companion neutral item to place with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MissionSelection {
    /// Mission anchor.
    pub anchor: AnchorKey,
    /// Companion anchor and its neutral type.
    pub companion: Option<(AnchorKey, NeutralItemType)>,
}

/// Bands of a mission restricted to an explicit anchor list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct OverrideBands {
    degree: (u32, u32),
    hops: (u32, u32),
    connection_preference: TopologyPreference,
    hops_preference: TopologyPreference,
}

impl OverrideBands {
    fn from_rules(rules: &PerMissionRules) -> Self {
        Self {
            degree: rules.override_degree_band(),
            hops: rules.override_hop_band(),
            connection_preference: rules.override_connection_preference,
            hops_preference: rules.override_hops_preference,
        }
    }
}

/// Hard filters, score and adjacency handling for one mission.
#[derive(Debug, Clone, Copy)]
pub struct MissionFilter<'a> {
    ctx: PlacementContext<'a>,
    rules: MissionTierRules,
    neutral_rules: NeutralItemRules,
    overrides: Option<OverrideBands>,
}

impl<'a> MissionFilter<'a> {
    /// Filter over already relaxed tier rules and neutral rules.
    #[must_use]
    pub const fn new(
        ctx: PlacementContext<'a>,
        rules: MissionTierRules,
        neutral_rules: NeutralItemRules,
    ) -> Self {
        Self {
            ctx,
            rules,
            neutral_rules,
            overrides: None,
        }
    }

    /// Restrict to the override bands of `per_mission`.
    #[must_use]
    pub fn with_override_bands(mut self, per_mission: &PerMissionRules) -> Self {
        self.overrides = Some(OverrideBands::from_rules(per_mission));
        self
    }

    fn check_neutral_requirement(&self, key: AnchorKey) -> Result<(), Rejection> {
        if !self.rules.neutral_item_required {
            return Ok(());
        }
        match (self.ctx.state.neutral_items.get(&key), self.rules.required_neutral_type) {
            (Some(present), Some(required)) if *present == required => Ok(()),
            (Some(_), None) => Ok(()),
            _ => Err("required neutral item missing"),
        }
    }

    fn hop_from_hq(&self, key: AnchorKey) -> Result<Option<u32>, Rejection> {
        let cached = self.ctx.derived.player_hq_hops.get(&key).copied();
        if let Some(bands) = self.overrides {
            let hop = cached.ok_or("unreachable from player HQ")?;
            let (min, max) = bands.hops;
            return if (min..=max).contains(&hop) {
                Ok(Some(hop))
            } else {
                Err("outside override hop band")
            };
        }
        if !self.rules.use_hops_from_hq {
            return Ok(None);
        }
        let hop = cached.ok_or("unreachable from player HQ")?;
        if within_band(hop, self.rules.min_hops_from_hq, self.rules.max_hops_from_hq) {
            Ok(Some(hop))
        } else {
            Err("outside hop band")
        }
    }

    fn xy_from_hq(&self, key: AnchorKey) -> Result<Option<Fixed>, Rejection> {
        if !self.rules.use_xy_from_hq {
            return Ok(None);
        }
        let hq = self.ctx.state.player_hq.ok_or("no player HQ")?;
        let distance = self.ctx.graph.xy_distance(key, hq).ok_or("not cached")?;
        let min = Fixed::saturating_from_num(self.rules.min_xy_from_hq);
        let max = Fixed::saturating_from_num(self.rules.max_xy_from_hq);
        if distance < min || distance > max {
            return Err("outside distance band");
        }
        Ok(Some(distance))
    }

    fn check_degree(&self, degree: u32) -> Result<(), Rejection> {
        let passes = match self.overrides {
            Some(bands) => (bands.degree.0..=bands.degree.1).contains(&degree),
            None => degree >= self.rules.min_connections && degree <= self.rules.max_connections,
        };
        if passes {
            Ok(())
        } else {
            Err("degree outside band")
        }
    }

    /// Nearest hop and world distance to an already placed mission. Both
    /// are zero while no mission is placed.
    fn mission_spacing(&self, key: AnchorKey) -> Result<(u32, Fixed), Rejection> {
        let PlacementContext { graph, state, .. } = self.ctx;
        let rules = &self.rules;
        if state.missions.is_empty() || !(rules.use_spacing_hops || rules.use_spacing_xy) {
            return Ok((0, Fixed::ZERO));
        }

        let hops = rules.use_spacing_hops.then(|| hops_from_anchor(graph, key));
        let xy_min = Fixed::saturating_from_num(rules.min_spacing_xy);
        let xy_max = Fixed::saturating_from_num(rules.min_spacing_xy.max(rules.max_spacing_xy));
        let mut nearest_hop = u32::MAX;
        let mut nearest_xy = Fixed::MAX;

        for other in state.missions.keys() {
            if let Some(hops) = &hops {
                let separation = *hops.get(other).ok_or("unreachable mission")?;
                if !within_band(separation, rules.min_spacing_hops, rules.max_spacing_hops) {
                    return Err("mission hop spacing violated");
                }
                nearest_hop = nearest_hop.min(separation);
            }
            if rules.use_spacing_xy {
                let distance = graph.xy_distance(key, *other).ok_or("unknown mission anchor")?;
                if distance < xy_min || distance > xy_max {
                    return Err("mission distance spacing violated");
                }
                nearest_xy = nearest_xy.min(distance);
            }
        }
        Ok((nearest_hop, nearest_xy))
    }

    fn score(&self, hop: Option<u32>, xy: Option<Fixed>, spacing: (u32, Fixed), degree: u32) -> Fixed {
        let degree = Fixed::saturating_from_num(degree);
        let hop = Fixed::saturating_from_num(hop.unwrap_or(0));
        if let Some(bands) = self.overrides {
            return bands
                .connection_preference
                .score(degree)
                .saturating_add(bands.hops_preference.score(hop));
        }

        let rules = &self.rules;
        let has_missions = !self.ctx.state.missions.is_empty();
        let mut score = Fixed::ZERO;
        if rules.use_hops_from_hq {
            score = score.saturating_add(rules.hops_preference.score(hop));
        }
        if let Some(xy) = xy {
            score = score.saturating_add(rules.xy_preference.score(xy));
        }
        if rules.use_spacing_hops && has_missions {
            let nearest = Fixed::saturating_from_num(spacing.0);
            score = score.saturating_add(rules.spacing_hops_preference.score(nearest));
        }
        if rules.use_spacing_xy && has_missions {
            score = score.saturating_add(rules.spacing_xy_preference.score(spacing.1));
        }
        score.saturating_add(rules.connection_preference.score(degree))
    }

    fn apply_adjacency(&self, candidate: &mut Candidate) -> Result<(), Rejection> {
        let requirement = self.rules.adjacency;
        if !requirement.enabled {
            return Ok(());
        }
        let hops = hops_from_anchor(self.ctx.graph, candidate.key);
        if self.adjacent_matches(&hops, requirement) >= requirement.min_matching_count as usize {
            return Ok(());
        }
        match requirement.policy {
            AdjacencyPolicy::RejectIfMissing => Err("adjacency requirement missing"),
            AdjacencyPolicy::TryAutoPlaceCompanion => {
                if !matches!(requirement.target, AdjacencyTarget::Neutral(Some(_))) {
                    return Err("companion target is not a neutral type");
                }
                let companion = self
                    .companion_anchor(candidate.key, &hops, requirement.max_hops)
                    .ok_or("no companion anchor")?;
                candidate.companion = Some(companion);
                Ok(())
            }
        }
    }

    /// Placed items of the target type within `max_hops` of the candidate.
    fn adjacent_matches(&self, hops: &HopMap, requirement: AdjacencyRequirement) -> usize {
        let state = self.ctx.state;
        let near = |anchor: &AnchorKey| hops.get(anchor).is_some_and(|hop| *hop <= requirement.max_hops);
        match requirement.target {
            AdjacencyTarget::PlayerHq => state.player_hq.iter().filter(|key| near(*key)).count(),
            AdjacencyTarget::Enemy(subtype) => {
                let counts_hq = matches!(subtype, None | Some(EnemyItemType::EnemyHq));
                let hq = state.enemy_hq.filter(|key| counts_hq && near(key));
                let items = state
                    .enemy_items
                    .iter()
                    .filter(|(key, item)| subtype.map_or(true, |wanted| wanted == **item) && near(*key))
                    .count();
                usize::from(hq.is_some()) + items
            }
            AdjacencyTarget::Neutral(subtype) => state
                .neutral_items
                .iter()
                .filter(|(key, item)| subtype.map_or(true, |wanted| wanted == **item) && near(*key))
                .count(),
            AdjacencyTarget::Mission(subtype) => state
                .missions
                .iter()
                .filter(|(key, mission)| {
                    subtype.map_or(true, |wanted| wanted == **mission) && near(*key)
                })
                .count(),
        }
    }

    /// Best free anchor near the candidate that also satisfies the neutral
    /// rules.
    fn companion_anchor(&self, mission: AnchorKey, hops: &HopMap, max_hops: u32) -> Option<AnchorKey> {
        let filter = NeutralFilter::new(self.ctx, self.neutral_rules);
        let source = hops
            .iter()
            .filter(|(key, hop)| **key != mission && **hop <= max_hops)
            .map(|(key, _)| *key);
        rank_candidates(&filter, source).first().map(|companion| companion.key)
    }
}

impl CandidateRules for MissionFilter<'_> {
    fn label(&self) -> String {
        if self.overrides.is_some() {
            "mission-override".to_string()
        } else {
            "mission".to_string()
        }
    }

    fn evaluate(&self, key: AnchorKey) -> Result<Candidate, Rejection> {
        let PlacementContext { graph, state, .. } = self.ctx;
        if !graph.contains(key) {
            return Err("not cached");
        }
        if state.is_occupied_for_mission(key, self.rules.neutral_item_required) {
            return Err("occupied");
        }
        self.check_neutral_requirement(key)?;

        let hop = self.hop_from_hq(key)?;
        let xy = self.xy_from_hq(key)?;
        let degree = graph.degree(key);
        self.check_degree(degree)?;
        let spacing = self.mission_spacing(key)?;

        let mut candidate = Candidate {
            key,
            score: self.score(hop, xy, spacing, degree),
            hop,
            companion: None,
        };
        self.apply_adjacency(&mut candidate)?;
        Ok(candidate)
    }
}

/// Apply the relaxation of the current attempt to mission rules.
///
/// Only bands that are in use are opened; relaxing preferences clears the
/// connection preference alone.
#[must_use]
pub fn relaxed_mission_rules(mut rules: MissionTierRules, relaxation: RelaxationState) -> MissionTierRules {
    if relaxation.relax_distance {
        if rules.use_hops_from_hq {
            rules.min_hops_from_hq = 0;
            rules.max_hops_from_hq = u32::MAX;
            rules.hops_preference = TopologyPreference::NotSet;
        }
        if rules.use_xy_from_hq {
            rules.min_xy_from_hq = 0;
            rules.max_xy_from_hq = u32::MAX;
            rules.xy_preference = TopologyPreference::NotSet;
        }
    }
    if relaxation.relax_spacing {
        if rules.use_spacing_hops {
            rules.min_spacing_hops = 0;
            rules.max_spacing_hops = u32::MAX;
            rules.spacing_hops_preference = TopologyPreference::NotSet;
        }
        if rules.use_spacing_xy {
            rules.min_spacing_xy = 0;
            rules.max_spacing_xy = u32::MAX;
            rules.spacing_xy_preference = TopologyPreference::NotSet;
        }
    }
    if relaxation.relax_preference {
        rules.connection_preference = TopologyPreference::NotSet;
    }
    rules
}

/// Pick the anchor for `mission`, the `mission_index`-th entry of the
/// mission plan.
///
/// With a hop preference and a non-zero preference strength the pick is
/// hop-weighted within the best score band; otherwise it cycles with the
/// attempt index plus the mission index.
#[must_use]
pub fn select_mission(
    ctx: PlacementContext<'_>,
    rules: &MissionPlacementRules,
    neutral_rules: &NeutralItemRules,
    mission: MissionType,
    mission_index: u32,
) -> Option<MissionSelection> {
    let per_mission = rules.rules_by_mission.get(&mission)?;
    let Some(tier_rules) = rules.effective_rules(mission) else {
        warn!(?mission, "mission has no effective rules");
        return None;
    };
    let tier_rules = relaxed_mission_rules(tier_rules, ctx.relaxation);
    let neutral_rules = relaxed_neutral_rules(*neutral_rules, ctx.relaxation);
    let filter = MissionFilter::new(ctx, tier_rules, neutral_rules);

    let (ranked, hops_preference) = if per_mission.override_placement_with_array {
        if per_mission.override_candidates.is_empty() {
            warn!(?mission, "override anchor list is empty");
            return None;
        }
        let filter = filter.with_override_bands(per_mission);
        let source = known_anchors(ctx.graph, &per_mission.override_candidates);
        (rank_candidates(&filter, source), per_mission.override_hops_preference)
    } else {
        (rank_candidates(&filter, ctx.graph.keys()), tier_rules.hops_preference)
    };
    debug!(?mission, candidates = ranked.len(), attempt = ctx.attempt, "mission candidates");

    let weighting = HopWeighting::for_mission(
        hops_preference,
        rules.hops_preference_strength,
        ctx.seed(),
        mission as u64,
        u64::from(mission_index),
        u64::from(ctx.attempt),
        ranked.len() as u64,
    );
    let chosen = if tier_rules.use_hops_from_hq && weighting.is_active() {
        pick_hop_weighted(&ranked, weighting)
    } else {
        pick_cyclic(&ranked, u64::from(ctx.attempt) + u64::from(mission_index))
    }?;

    let companion = match (chosen.companion, tier_rules.adjacency.target) {
        (Some(anchor), AdjacencyTarget::Neutral(Some(item))) => Some((anchor, item)),
        _ => None,
    };
    Some(MissionSelection {
        anchor: chosen.key,
        companion,
    })
}
