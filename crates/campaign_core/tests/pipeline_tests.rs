//! End-to-end pipeline scenarios.
//!
//! These drive a [`CampaignGenerator`] over small fixture graphs with known
//! shapes and check the outcome of whole runs, partial runs and rollbacks.

use campaign_core::collaborator::RecordingWorld;
use campaign_core::connections::{connection_problems, crossing_connections};
use campaign_core::error::CampaignError;
use campaign_core::generator::CampaignGenerator;
use campaign_core::hops::hop_distance;
use campaign_core::items::{EnemyItemType, NeutralItemType};
use campaign_core::rules::{EnemyHqSpacing, EnemyItemRules, EnemyItemRuleset, FailurePolicy, FailurePolicyConfig};
use campaign_core::step::GenerationStep;
use campaign_test_utils::fixtures::{grid_graph, key, line_config, line_graph, open_config, recording_generator};

// =============================================================================
// Full runs
// =============================================================================

#[test]
fn test_line_of_ten_becomes_a_path() {
    let graph = line_graph(10);
    let config = line_config(&graph, 42);
    let mut generator = recording_generator(graph, config);

    let report = generator.execute_all_steps().expect("satisfiable");

    assert_eq!(report.step, GenerationStep::Finished);
    assert_eq!(report.connections, 9);
    assert!(connection_problems(generator.graph(), &generator.config().connections).is_empty());
    for n in 2..10 {
        assert_eq!(generator.graph().neighbors(key(n)), &[key(n - 1), key(n + 1)]);
    }
    assert_eq!(generator.graph().degree(key(1)), 1);
    assert_eq!(generator.graph().degree(key(10)), 1);
}

#[test]
fn test_grid_run_places_everything_once() {
    let graph = grid_graph(5, 5);
    let mut config = open_config(&graph, 11);
    config.counts.base_enemy_items.insert(EnemyItemType::Outpost, 2);
    config.counts.base_enemy_items.insert(EnemyItemType::Checkpoint, 1);
    config.counts.base_neutral_items.insert(NeutralItemType::Village, 2);
    let mut generator = recording_generator(graph, config);

    let report = generator.execute_all_steps().expect("satisfiable");
    let state = generator.state();

    assert_ne!(state.player_hq, state.enemy_hq);
    assert_eq!(report.enemy_items.get(&EnemyItemType::Outpost), Some(&2));
    assert_eq!(report.enemy_items.get(&EnemyItemType::Checkpoint), Some(&1));
    assert_eq!(report.enemy_items.get(&EnemyItemType::EnemyWall), Some(&1));
    assert_eq!(report.neutral_items.get(&NeutralItemType::Village), Some(&2));
    assert!(state.occupancy_conflicts(&generator.config().missions).is_empty());
    assert!(crossing_connections(generator.graph()).is_empty());
    assert_eq!(report.item_count() as usize, state.item_count());
}

#[test]
fn test_allow_listed_hqs_are_honoured() {
    let graph = line_graph(10);
    let mut config = line_config(&graph, 3);
    config.player_hq.anchor_candidates = vec![key(1)];
    config.enemy_hq.anchor_candidates = vec![key(10)];
    let mut generator = recording_generator(graph, config);

    generator.execute_through(GenerationStep::EnemyHqPlaced).expect("satisfiable");

    assert_eq!(generator.step(), GenerationStep::EnemyHqPlaced);
    assert_eq!(generator.state().player_hq, Some(key(1)));
    assert_eq!(generator.state().enemy_hq, Some(key(10)));
    assert_eq!(hop_distance(generator.graph(), key(1), key(10)), Some(9));
    assert_eq!(generator.derived().player_hq_hops.get(&key(10)), Some(&9));
    assert_eq!(generator.derived().enemy_hq_hops.get(&key(1)), Some(&9));
}

#[test]
fn test_execute_through_stops_at_the_target() {
    let graph = line_graph(6);
    let config = line_config(&graph, 8);
    let mut generator = recording_generator(graph, config);

    let report = generator
        .execute_through(GenerationStep::PlayerHqPlaced)
        .expect("satisfiable");
    assert_eq!(report.step, GenerationStep::PlayerHqPlaced);
    assert!(generator.state().enemy_hq.is_none());

    let behind = generator
        .execute_through(GenerationStep::ConnectionsCreated)
        .expect("nothing to do");
    assert_eq!(behind.step, GenerationStep::PlayerHqPlaced);
}

// =============================================================================
// Rollback
// =============================================================================

#[test]
fn test_undo_restores_the_exact_hash() {
    let graph = line_graph(10);
    let config = line_config(&graph, 5);
    let mut generator = recording_generator(graph, config);
    generator.execute_through(GenerationStep::EnemyHqPlaced).expect("satisfiable");

    let before = generator.state_hash();
    let live_before = generator.world().live_count();

    assert!(generator.place_enemy_wall().expect("in order").is_completed());
    assert_ne!(generator.state_hash(), before);
    assert_eq!(generator.world().live_count(), live_before + 1);

    assert_eq!(generator.undo_last_transaction(), Some(GenerationStep::EnemyWallPlaced));
    assert_eq!(generator.state_hash(), before);
    assert_eq!(generator.world().live_count(), live_before);
}

#[test]
fn test_undoing_everything_returns_to_not_started() {
    let graph = line_graph(8);
    let config = line_config(&graph, 9);
    let mut generator = recording_generator(graph, config);
    generator.execute_all_steps().expect("satisfiable");

    while generator.undo_last_transaction().is_some() {}

    assert_eq!(generator.step(), GenerationStep::NotStarted);
    assert_eq!(generator.graph().connection_count(), 0);
    assert_eq!(generator.state().item_count(), 0);
    assert_eq!(generator.world().live_count(), 0);
}

#[test]
fn test_erase_all_generation_is_idempotent() {
    let graph = grid_graph(4, 4);
    let config = open_config(&graph, 21);
    let mut generator = recording_generator(graph, config);
    generator.execute_all_steps().expect("satisfiable");

    generator.erase_all_generation();
    let erased = generator.state_hash();
    let destroyed = generator.world().destroyed_total();

    assert_eq!(generator.step(), GenerationStep::NotStarted);
    assert_eq!(generator.world().live_count(), 0);
    assert_eq!(generator.graph().anchor_count(), 16);
    assert_eq!(generator.graph().connection_count(), 0);

    generator.erase_all_generation();
    assert_eq!(generator.state_hash(), erased);
    assert_eq!(generator.world().destroyed_total(), destroyed);
}

#[test]
fn test_erase_then_rerun_matches_a_fresh_run() {
    let graph = grid_graph(4, 4);
    let config = open_config(&graph, 4);

    let mut fresh = recording_generator(graph.clone(), config.clone());
    fresh.execute_all_steps().expect("satisfiable");

    let mut reused = recording_generator(graph, config);
    reused.execute_all_steps().expect("satisfiable");
    reused.erase_all_generation();
    reused.execute_all_steps().expect("satisfiable");

    assert_eq!(reused.state_hash(), fresh.state_hash());
}

// =============================================================================
// Failure paths
// =============================================================================

#[test]
fn test_unreachable_enemy_items_exhaust_the_budget() {
    let graph = line_graph(10);
    let mut config = line_config(&graph, 42);
    config.counts.base_enemy_items.insert(EnemyItemType::Factory, 1);
    config.enemy_items.rules_by_item.insert(
        EnemyItemType::Factory,
        EnemyItemRuleset {
            base_rules: EnemyItemRules {
                enemy_hq_spacing: EnemyHqSpacing {
                    min_hops_from_enemy_hq: 50,
                    ..EnemyHqSpacing::default()
                },
                ..EnemyItemRules::default()
            },
            ..EnemyItemRuleset::default()
        },
    );
    config.budget.max_total_attempts = 40;
    let mut generator = recording_generator(graph, config);

    let error = generator.execute_all_steps().expect_err("never satisfiable");

    let CampaignError::RetryBudgetExhausted { total_attempts, .. } = error else {
        panic!("unexpected error: {error}");
    };
    assert_eq!(total_attempts, 41);
    assert!(generator.state().enemy_items.values().all(|item| *item == EnemyItemType::EnemyWall));
    assert!(generator.state().occupancy_conflicts(&generator.config().missions).is_empty());
}

#[test]
fn test_refused_connections_fail_without_leaks() {
    let graph = line_graph(5);
    let mut config = line_config(&graph, 1);
    config.failure_policy = FailurePolicyConfig::uniform(FailurePolicy::InstantBackTrack);
    config.budget.max_step_attempts = 4;
    let mut generator =
        CampaignGenerator::new(graph, config, RecordingWorld::new().refusing_connections()).expect("valid config");

    let error = generator.execute_all_steps().expect_err("world refuses every connection");

    assert!(matches!(
        error,
        CampaignError::RetryBudgetExhausted {
            step: GenerationStep::ConnectionsCreated,
            step_attempts: 5,
            ..
        }
    ));
    assert_eq!(generator.step(), GenerationStep::NotStarted);
    assert_eq!(generator.graph().connection_count(), 0);
    assert_eq!(generator.world().live_count(), 0);
}

#[test]
fn test_out_of_order_calls_change_nothing() {
    let graph = line_graph(4);
    let config = line_config(&graph, 2);
    let mut generator = recording_generator(graph, config);
    let before = generator.state_hash();

    assert!(matches!(
        generator.place_missions(),
        Err(CampaignError::StepOutOfOrder {
            requested: GenerationStep::MissionsPlaced,
            current: GenerationStep::NotStarted,
        })
    ));
    assert_eq!(generator.state_hash(), before);
}
