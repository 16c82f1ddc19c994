//! Soft ordering preferences shared by several rule sets.

use serde::{Deserialize, Serialize};

use crate::math::Fixed;

/// Bias toward the low or high end of a measured value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TopologyPreference {
    /// No bias.
    #[default]
    NotSet,
    /// Smaller values score higher.
    PreferMin,
    /// Larger values score higher.
    PreferMax,
}

impl TopologyPreference {
    /// Score contribution of `value`.
    #[must_use]
    pub fn score(self, value: Fixed) -> Fixed {
        match self {
            Self::NotSet => Fixed::ZERO,
            Self::PreferMin => value.saturating_neg(),
            Self::PreferMax => value,
        }
    }

    /// Whether this preference biases toward an edge.
    #[must_use]
    pub const fn is_set(self) -> bool {
        !matches!(self, Self::NotSet)
    }
}

/// Ordering strategy for enemy items and the enemy wall.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum EnemyPreference {
    /// No bias.
    #[default]
    None,
    /// Fewer connections first.
    PreferLowDegree,
    /// More connections first.
    PreferHighDegree,
    /// Higher chokepoint score first.
    PreferChokepoints,
    /// Degree-one anchors first.
    PreferDeadEnds,
    /// Hop distance closest to the minimum bound first.
    PreferNearMinBound,
    /// Hop distance closest to the maximum bound first.
    PreferNearMaxBound,
}

/// Inputs an [`EnemyPreference`] can score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnemyScoreInput {
    /// Connection degree of the candidate.
    pub degree: u32,
    /// Chokepoint score of the candidate.
    pub chokepoint: i64,
    /// Hop distance from the enemy HQ.
    pub hop: u32,
    /// Lower hop bound in effect.
    pub min_hops: u32,
    /// Upper hop bound in effect.
    pub max_hops: u32,
}

impl EnemyPreference {
    /// Score used for enemy items.
    #[must_use]
    pub fn item_score(self, input: EnemyScoreInput) -> Fixed {
        match self {
            Self::PreferNearMinBound => bound_distance(input.hop, input.min_hops).saturating_neg(),
            Self::PreferNearMaxBound => bound_distance(input.hop, input.max_hops).saturating_neg(),
            _ => self.wall_score(input.degree, input.chokepoint),
        }
    }

    /// Score used for the enemy wall. Bound preferences have no meaning
    /// there and score zero.
    #[must_use]
    pub fn wall_score(self, degree: u32, chokepoint: i64) -> Fixed {
        match self {
            Self::PreferLowDegree => Fixed::saturating_from_num(degree).saturating_neg(),
            Self::PreferHighDegree => Fixed::saturating_from_num(degree),
            Self::PreferChokepoints => Fixed::saturating_from_num(chokepoint),
            Self::PreferDeadEnds if degree == 1 => Fixed::ONE,
            Self::PreferDeadEnds
            | Self::None
            | Self::PreferNearMinBound
            | Self::PreferNearMaxBound => Fixed::ZERO,
        }
    }
}

fn bound_distance(hop: u32, bound: u32) -> Fixed {
    Fixed::saturating_from_num(hop.abs_diff(bound))
}
