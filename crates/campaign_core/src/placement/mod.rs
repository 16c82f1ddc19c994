//! Candidate selection for every placement category.
//!
//! Selection is read-only: each `select_*` function looks at the graph,
//! the placement state and the derived caches and returns the chosen anchor
//! (or `None`). Committing the choice and spawning its world object is the
//! generator's job.

mod enemy;
mod hq;
mod mission;
mod neutral;
mod wall;

use std::collections::BTreeSet;

use crate::failure::RelaxationState;
use crate::graph::{AnchorGraph, AnchorKey};
use crate::state::{DerivedData, PlacementState};

pub use enemy::{relaxed_enemy_rules, select_enemy_item, EnemyItemFilter};
pub use hq::{select_enemy_hq, select_player_hq, EnemyHqFilter, PlayerHqFilter};
pub use mission::{relaxed_mission_rules, select_mission, MissionFilter, MissionSelection};
pub use neutral::{relaxed_neutral_rules, select_neutral_item, NeutralFilter};
pub use wall::{select_enemy_wall, WallFilter};

/// Read-only view shared by every selector.
#[derive(Debug, Clone, Copy)]
pub struct PlacementContext<'a> {
    /// Connected anchor graph.
    pub graph: &'a AnchorGraph,
    /// Placement state of the working copy.
    pub state: &'a PlacementState,
    /// Derived caches of the working copy.
    pub derived: &'a DerivedData,
    /// Failed attempts of the current step so far.
    pub attempt: u32,
    /// Rule groups loosened for this attempt.
    pub relaxation: RelaxationState,
}

impl<'a> PlacementContext<'a> {
    /// Bundle the inputs of one selection.
    #[must_use]
    pub const fn new(
        graph: &'a AnchorGraph,
        state: &'a PlacementState,
        derived: &'a DerivedData,
        attempt: u32,
        relaxation: RelaxationState,
    ) -> Self {
        Self {
            graph,
            state,
            derived,
            attempt,
            relaxation,
        }
    }

    /// Seed of the run.
    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.state.seed
    }
}

/// Anchors named in `allow_list` that exist in the graph, deduplicated and
/// in key order. Unknown keys are dropped.
#[must_use]
pub fn known_anchors(graph: &AnchorGraph, allow_list: &[AnchorKey]) -> Vec<AnchorKey> {
    allow_list
        .iter()
        .copied()
        .filter(|key| graph.contains(*key))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// The allow-list if it names anything, otherwise every anchor.
#[must_use]
pub fn allow_list_or_all(graph: &AnchorGraph, allow_list: &[AnchorKey]) -> Vec<AnchorKey> {
    if allow_list.is_empty() {
        graph.keys().collect()
    } else {
        known_anchors(graph, allow_list)
    }
}

/// Whether `value` lies in `[min, max(min, max)]`.
#[must_use]
pub(crate) fn within_band(value: u32, min: u32, max: u32) -> bool {
    value >= min && value <= min.max(max)
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::graph::{AnchorGraph, AnchorKey, AnchorPoint};
    use crate::math::Vec2Fixed;

    pub fn key(n: u128) -> AnchorKey {
        AnchorKey::from_u128(n)
    }

    /// Anchors 1..=n on a horizontal line, each linked to the next.
    pub fn path_graph(n: u128) -> AnchorGraph {
        let points = (1..=n).map(|i| AnchorPoint::new(key(i), Vec2Fixed::from_units(i as i32 * 100, 0)));
        let mut graph = AnchorGraph::from_points(points).expect("unique keys");
        for i in 1..n {
            graph.connect(key(i), key(i + 1)).expect("known anchors");
        }
        graph.sort_neighbors();
        graph
    }

    /// Anchor 1 in the centre linked to 2..=n.
    pub fn star_graph(n: u128) -> AnchorGraph {
        let points = (1..=n).map(|i| AnchorPoint::new(key(i), Vec2Fixed::from_units(i as i32 * 50, (i % 3) as i32 * 70)));
        let mut graph = AnchorGraph::from_points(points).expect("unique keys");
        for i in 2..=n {
            graph.connect(key(1), key(i)).expect("known anchors");
        }
        graph.sort_neighbors();
        graph
    }
}
