//! Test fixtures and helpers.
//!
//! Small anchor graphs and configs with known shapes, for tests that need
//! to reason about exact hop counts and placements.

use campaign_core::collaborator::RecordingWorld;
use campaign_core::generator::CampaignGenerator;
use campaign_core::graph::{AnchorGraph, AnchorKey, AnchorPoint};
use campaign_core::layout::AnchorLayout;
use campaign_core::math::{Fixed, Vec2Fixed};
use campaign_core::rules::{ConnectionRules, GenerationConfig};

/// Spacing between fixture anchors, in world units.
pub const FIXTURE_SPACING: i32 = 100;

/// Create a fixed-point number from an integer.
#[must_use]
pub fn fixed(n: i32) -> Fixed {
    Fixed::from_num(n)
}

/// Key of the `n`-th fixture anchor. Fixture keys start at 1.
#[must_use]
pub const fn key(n: u128) -> AnchorKey {
    AnchorKey::from_u128(n)
}

/// `count` anchors on the X axis, `FIXTURE_SPACING` apart, keyed `1..=count`.
///
/// # Panics
///
/// Never: fixture keys are unique.
#[must_use]
pub fn line_graph(count: u32) -> AnchorGraph {
    AnchorGraph::from_points((1..=count).map(|n| {
        AnchorPoint::new(
            key(u128::from(n)),
            Vec2Fixed::from_units(n as i32 * FIXTURE_SPACING, 0),
        )
    }))
    .expect("fixture keys are unique")
}

/// `columns` by `rows` anchors on an exact grid, keyed row by row from 1.
///
/// # Panics
///
/// Never: fixture keys are unique.
#[must_use]
pub fn grid_graph(columns: u32, rows: u32) -> AnchorGraph {
    AnchorGraph::from_points((0..rows).flat_map(move |row| {
        (0..columns).map(move |column| {
            AnchorPoint::new(
                key(u128::from(row * columns + column + 1)),
                Vec2Fixed::from_units(
                    column as i32 * FIXTURE_SPACING,
                    row as i32 * FIXTURE_SPACING,
                ),
            )
        })
    }))
    .expect("fixture keys are unique")
}

/// A seeded jittered layout of `columns` by `rows` cells.
///
/// # Panics
///
/// Panics if the layout is empty or oversized.
#[must_use]
pub fn jittered_graph(columns: u32, rows: u32, seed: u64) -> AnchorGraph {
    AnchorLayout::new(columns, rows, 400)
        .with_seed(seed)
        .with_min_spacing(80)
        .build()
        .expect("fixture layout is valid")
}

/// Config for a [`line_graph`]: degree 1..=2 so the line connects as a
/// path, every anchor allowed for the wall, no items.
#[must_use]
pub fn line_config(graph: &AnchorGraph, seed: u64) -> GenerationConfig {
    let mut config = GenerationConfig {
        connections: ConnectionRules::new(1, 2, u32::MAX),
        ..GenerationConfig::default()
    };
    config.counts.seed = seed;
    config.enemy_wall.anchor_candidates = graph.keys().collect();
    config
}

/// Config for any graph: default rules, every anchor allowed for the wall.
#[must_use]
pub fn open_config(graph: &AnchorGraph, seed: u64) -> GenerationConfig {
    let mut config = GenerationConfig::default();
    config.counts.seed = seed;
    config.enemy_wall.anchor_candidates = graph.keys().collect();
    config
}

/// Generator over `graph` with a fresh [`RecordingWorld`].
///
/// # Panics
///
/// Panics if `config` is invalid.
#[must_use]
pub fn recording_generator(
    graph: AnchorGraph,
    config: GenerationConfig,
) -> CampaignGenerator<RecordingWorld> {
    CampaignGenerator::new(graph, config, RecordingWorld::new()).expect("fixture config is valid")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_keys_are_row_major() {
        let graph = grid_graph(3, 2);
        assert_eq!(graph.anchor_count(), 6);
        assert_eq!(graph.position(key(4)), Some(Vec2Fixed::new(fixed(0), fixed(100))));
    }

    #[test]
    fn test_line_config_allows_every_wall_anchor() {
        let graph = line_graph(5);
        let config = line_config(&graph, 1);
        assert_eq!(config.enemy_wall.anchor_candidates.len(), 5);
        assert!(config.validate().is_ok());
    }
}
