//! Generic filter, rank and pick over anchor candidates.
//!
//! Each placement category implements [`CandidateRules`] once: it rejects an
//! anchor with a reason or turns it into a scored [`Candidate`]. Ranking and
//! picking are shared.

use std::cmp::Ordering;

use tracing::trace;

use crate::graph::AnchorKey;
use crate::math::Fixed;
use crate::rng::hash_combine64;
use crate::rules::TopologyPreference;

/// Candidates scoring within this distance of the best score form the band
/// of the hop-weighted pick.
pub const SCORE_BAND_TOLERANCE: Fixed = Fixed::from_bits(0x0041_8937);

/// Smallest band the hop-weighted pick considers before falling back to all
/// candidates.
pub const MIN_SCORE_BAND: usize = 3;

const HOP_WEIGHT_BASE: i64 = 32;
const HOP_WEIGHT_PER_STRENGTH: i64 = 16;
const HOP_FALLOFF_BASE: i64 = 8;

/// An anchor that passed every hard filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// The anchor.
    pub key: AnchorKey,
    /// Soft preference; higher ranks first.
    pub score: Fixed,
    /// Hop distance to the reference anchor, when the category has one.
    pub hop: Option<u32>,
    /// Neutral anchor to auto-place alongside a mission.
    pub companion: Option<AnchorKey>,
}

impl Candidate {
    /// A scored candidate without hop or companion.
    #[must_use]
    pub const fn new(key: AnchorKey, score: Fixed) -> Self {
        Self {
            key,
            score,
            hop: None,
            companion: None,
        }
    }

    /// Attach the reference hop.
    #[must_use]
    pub const fn with_hop(mut self, hop: u32) -> Self {
        self.hop = Some(hop);
        self
    }
}

/// Why an anchor was not a candidate.
pub type Rejection = &'static str;

/// Hard filters and soft score of one placement category.
pub trait CandidateRules {
    /// Label used in trace output.
    fn label(&self) -> String;

    /// Evaluate one anchor. Must not mutate anything.
    fn evaluate(&self, key: AnchorKey) -> Result<Candidate, Rejection>;
}

/// Evaluate every source anchor, keep the survivors and rank them by score
/// descending, then key ascending.
pub fn rank_candidates<R, I>(rules: &R, source: I) -> Vec<Candidate>
where
    R: CandidateRules + ?Sized,
    I: IntoIterator<Item = AnchorKey>,
{
    let mut candidates = Vec::new();
    for key in source {
        match rules.evaluate(key) {
            Ok(candidate) => candidates.push(candidate),
            Err(reason) => trace!(rules = %rules.label(), anchor = %key, reason, "rejected"),
        }
    }
    sort_ranked(&mut candidates);
    candidates
}

/// Score descending, then key ascending.
pub fn sort_ranked(candidates: &mut [Candidate]) {
    candidates.sort_by(|a, b| match b.score.cmp(&a.score) {
        Ordering::Equal => a.key.cmp(&b.key),
        order => order,
    });
}

/// The candidate at `index mod len`.
#[must_use]
pub fn pick_cyclic(candidates: &[Candidate], index: u64) -> Option<&Candidate> {
    if candidates.is_empty() {
        return None;
    }
    let position = (index % candidates.len() as u64) as usize;
    candidates.get(position)
}

/// Inputs of the hop-weighted pick.
#[derive(Debug, Clone, Copy)]
pub struct HopWeighting {
    /// Which end of the hop range is favored.
    pub preference: TopologyPreference,
    /// How sharply weights fall off away from the target hop.
    pub strength: u32,
    /// Hash over the stable inputs of this pick.
    pub hash: u64,
}

impl HopWeighting {
    /// Whether the weighted pick applies at all.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.preference.is_set() && self.strength > 0
    }

    /// Build the weighting for one mission pick.
    #[must_use]
    pub fn for_mission(
        preference: TopologyPreference,
        strength: u32,
        seed: u64,
        mission_ordinal: u64,
        micro_index: u64,
        attempt: u64,
        candidate_count: u64,
    ) -> Self {
        Self {
            preference,
            strength,
            hash: hash_combine64(seed, mission_ordinal, micro_index, attempt, candidate_count),
        }
    }
}

/// Weighted pick among the best-scoring band, favoring hops close to the
/// preferred end of the band. Returns `None` for an empty list.
#[must_use]
pub fn pick_hop_weighted(candidates: &[Candidate], weighting: HopWeighting) -> Option<&Candidate> {
    let best = candidates.first()?.score;
    let mut band: Vec<&Candidate> = candidates
        .iter()
        .filter(|c| (best - c.score).abs() <= SCORE_BAND_TOLERANCE)
        .collect();
    if band.len() < MIN_SCORE_BAND {
        band = candidates.iter().collect();
    }

    let hops = band.iter().filter_map(|c| c.hop);
    let target = match weighting.preference {
        TopologyPreference::PreferMin => hops.min(),
        TopologyPreference::PreferMax => hops.max(),
        TopologyPreference::NotSet => None,
    };
    let Some(target) = target else {
        return band.first().copied();
    };

    let strength = i64::from(weighting.strength);
    let max_weight = HOP_WEIGHT_BASE + HOP_WEIGHT_PER_STRENGTH * strength;
    let falloff = (HOP_FALLOFF_BASE - strength).max(1);
    let weights: Vec<u64> = band
        .iter()
        .map(|c| {
            let distance = c.hop.map_or(i64::MAX / 2, |hop| {
                (i64::from(hop) - i64::from(target)).abs()
            });
            max_weight.saturating_sub(distance.saturating_mul(falloff)).max(1) as u64
        })
        .collect();

    let total: u64 = weights.iter().sum();
    let mut roll = weighting.hash % total;
    for (candidate, weight) in band.iter().zip(&weights) {
        if roll < *weight {
            return Some(*candidate);
        }
        roll -= weight;
    }
    band.last().copied()
}
