//! Determinism testing utilities.
//!
//! Provides a harness for verifying that generation produces identical
//! campaigns given identical anchors, config and seed.
//!
//! # Testing Strategy
//!
//! Sources of non-determinism include:
//!
//! - **Floating-point math**: positions and distances use
//!   [`campaign_core::math::Fixed`] throughout.
//!
//! - **HashMap iteration order**: every map in the generator is a
//!   `BTreeMap`, so iteration is in key order.
//!
//! - **System randomness**: every random choice comes from a seeded stream
//!   keyed by the base seed and the attempt index.
//!
//! # Test Levels
//!
//! 1. **Unit tests**: one step at a time
//! 2. **Property tests**: random layouts must still generate reproducibly
//! 3. **Parallel tests**: N generators on N threads all match

use std::thread;

use campaign_core::collaborator::RecordingWorld;
use campaign_core::generator::CampaignGenerator;
use campaign_core::graph::AnchorGraph;
use campaign_core::rules::GenerationConfig;
use campaign_core::step::GenerationStep;

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
}

impl DeterminismResult {
    fn from_hashes(hashes: Vec<u64>) -> Self {
        let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);
        Self {
            is_deterministic,
            hashes,
        }
    }

    /// Get all unique hashes (should be 1 for a deterministic run).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that every run matched, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the runs produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Generation is non-deterministic!\n\
                 Runs: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run `setup`, then `run`, `runs` times and compare the hashes.
///
/// # Example
///
/// ```
/// use campaign_test_utils::determinism::verify_determinism;
///
/// let result = verify_determinism(3, || 0u64, |n| *n += 5, |n| *n);
/// result.assert_deterministic();
/// ```
pub fn verify_determinism<S, Setup, Run, HashFn>(
    runs: usize,
    setup: Setup,
    run: Run,
    hash: HashFn,
) -> DeterminismResult
where
    Setup: Fn() -> S,
    Run: Fn(&mut S),
    HashFn: Fn(&S) -> u64,
{
    let hashes = (0..runs)
        .map(|_| {
            let mut state = setup();
            run(&mut state);
            hash(&state)
        })
        .collect();
    DeterminismResult::from_hashes(hashes)
}

/// Run the full pipeline `runs` times over the same inputs.
///
/// A run that fails contributes the hash of its failed state, so two runs
/// that fail identically still count as deterministic.
///
/// # Panics
///
/// Panics if `config` is invalid.
pub fn verify_generation_determinism(
    graph: &AnchorGraph,
    config: &GenerationConfig,
    runs: usize,
) -> DeterminismResult {
    verify_determinism(
        runs,
        || new_generator(graph, config),
        |generator| {
            let _ = generator.execute_all_steps();
        },
        CampaignGenerator::state_hash,
    )
}

/// Run N generators on scoped threads and collect their final hashes.
///
/// # Panics
///
/// Panics if `config` is invalid or a worker thread panics.
pub fn run_parallel_generations(
    graph: &AnchorGraph,
    config: &GenerationConfig,
    runs: usize,
) -> DeterminismResult {
    let hashes = thread::scope(|s| {
        let handles: Vec<_> = (0..runs)
            .map(|_| {
                s.spawn(|| {
                    let mut generator = new_generator(graph, config);
                    let _ = generator.execute_all_steps();
                    generator.state_hash()
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|h| h.join().expect("generation thread panicked"))
            .collect()
    });
    DeterminismResult::from_hashes(hashes)
}

/// Step two generators through the pipeline side by side and return the
/// first step after which their hashes differ.
///
/// Stops early, returning `None`, as soon as a step fails to complete in
/// both (recovery is not exercised here).
///
/// # Panics
///
/// Panics if `config` is invalid.
pub fn find_first_divergence(
    graph: &AnchorGraph,
    config: &GenerationConfig,
) -> Option<GenerationStep> {
    let mut first = new_generator(graph, config);
    let mut second = new_generator(graph, config);

    if first.state_hash() != second.state_hash() {
        return Some(GenerationStep::NotStarted);
    }

    for step in GenerationStep::PIPELINE {
        let a = first.run_step(step).map(|o| o.is_completed());
        let b = second.run_step(step).map(|o| o.is_completed());
        if first.state_hash() != second.state_hash() || a.is_ok() != b.is_ok() {
            return Some(step);
        }
        if !matches!((a, b), (Ok(true), Ok(true))) {
            return None;
        }
    }

    None
}

fn new_generator(graph: &AnchorGraph, config: &GenerationConfig) -> CampaignGenerator<RecordingWorld> {
    CampaignGenerator::new(graph.clone(), config.clone(), RecordingWorld::new())
        .expect("determinism harness needs a valid config")
}

/// Proptest strategies for generation testing.
///
/// These strategies generate random but reproducible layouts and seeds.
pub mod strategies {
    use campaign_core::graph::{AnchorGraph, AnchorKey, AnchorPoint};
    use campaign_core::layout::AnchorLayout;
    use campaign_core::math::Vec2Fixed;
    use proptest::prelude::*;

    /// Generate a run seed.
    pub fn arb_seed() -> impl Strategy<Value = u64> {
        any::<u64>()
    }

    /// Generate a jittered grid layout of 4 to 36 cells.
    pub fn arb_layout() -> impl Strategy<Value = AnchorLayout> {
        (2u32..7, 2u32..7, 200u32..800, arb_seed()).prop_map(|(columns, rows, cell, seed)| {
            AnchorLayout::new(columns, rows, cell)
                .with_seed(seed)
                .with_min_spacing(cell / 5)
        })
    }

    /// Generate an unconnected graph from a layout.
    pub fn arb_layout_graph() -> impl Strategy<Value = AnchorGraph> {
        arb_layout().prop_map(|layout| layout.build().expect("strategy layouts are valid"))
    }

    /// Generate scattered anchors with distinct keys and positions.
    pub fn arb_scattered_graph(max_anchors: usize) -> impl Strategy<Value = AnchorGraph> {
        proptest::collection::btree_set((-50i32..50, -50i32..50), 2..max_anchors).prop_map(
            |cells| {
                AnchorGraph::from_points(cells.into_iter().enumerate().map(|(i, (x, y))| {
                    AnchorPoint::new(
                        AnchorKey::from_u128(i as u128 + 1),
                        Vec2Fixed::from_units(x * 97, y * 89),
                    )
                }))
                .expect("enumerated keys are unique")
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{line_config, line_graph, open_config};
    use campaign_core::items::EnemyItemType;
    use proptest::prelude::*;

    #[test]
    fn test_verify_determinism_simple() {
        let result = verify_determinism(3, || 0u64, |n| *n += 100, |n| *n);

        assert!(result.is_deterministic);
        assert_eq!(result.hashes, vec![100, 100, 100]);
    }

    #[test]
    fn test_detects_divergent_runs() {
        let counter = std::cell::Cell::new(0u64);
        let result = verify_determinism(
            2,
            || {
                counter.set(counter.get() + 1);
                counter.get()
            },
            |_| {},
            |n| *n,
        );
        assert!(!result.is_deterministic);
        assert_eq!(result.unique_hashes().len(), 2);
    }

    #[test]
    fn test_line_generation_is_deterministic() {
        let graph = line_graph(10);
        let mut config = line_config(&graph, 42);
        config.counts.base_enemy_items.insert(EnemyItemType::Outpost, 2);
        verify_generation_determinism(&graph, &config, 3).assert_deterministic();
    }

    #[test]
    fn test_parallel_generations_match() {
        let graph = crate::fixtures::grid_graph(4, 4);
        let config = open_config(&graph, 7);
        let result = run_parallel_generations(&graph, &config, 4);
        result.assert_deterministic();
        assert_eq!(result.hashes.len(), 4);
    }

    #[test]
    fn test_no_divergence_on_a_line() {
        let graph = line_graph(8);
        assert_eq!(find_first_divergence(&graph, &line_config(&graph, 3)), None);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn prop_layouts_generate_deterministically(
            graph in strategies::arb_layout_graph(),
            seed in strategies::arb_seed(),
        ) {
            let config = open_config(&graph, seed);
            let result = verify_generation_determinism(&graph, &config, 2);
            prop_assert!(result.is_deterministic, "hashes: {:?}", result.hashes);
        }
    }
}
