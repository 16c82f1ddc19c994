//! Property tests over random layouts.
//!
//! Every generated graph must be planar, degree-bounded and reproducible,
//! and every placement state must keep its occupancy rules, whether or not
//! the run succeeds.

use campaign_core::collaborator::RecordingWorld;
use campaign_core::connections::{build_connections, crossing_connections};
use campaign_core::hops::{hop_distance, hops_from_anchor};
use campaign_core::items::{EnemyItemType, MissionTier, MissionType, NeutralItemType};
use campaign_core::rules::{ConnectionRules, GenerationConfig, MissionTierRules, PerMissionRules};
use campaign_test_utils::determinism::strategies::{arb_layout_graph, arb_scattered_graph, arb_seed};
use campaign_test_utils::determinism::verify_generation_determinism;
use campaign_test_utils::fixtures::{open_config, recording_generator};
use proptest::prelude::*;

/// Two missions, one of which may be required to sit on a village.
fn add_missions(config: &mut GenerationConfig, village_required: bool) {
    let missions = &mut config.missions;
    missions.rules_by_tier.insert(MissionTier::Tier1, MissionTierRules::default());
    missions.rules_by_tier.insert(
        MissionTier::Tier2,
        MissionTierRules {
            neutral_item_required: true,
            required_neutral_type: Some(NeutralItemType::Village),
            ..MissionTierRules::default()
        },
    );
    missions
        .rules_by_mission
        .insert(MissionType::ClearRoad, PerMissionRules::default());
    let tier = if village_required { MissionTier::Tier2 } else { MissionTier::Tier1 };
    missions.rules_by_mission.insert(
        MissionType::DefendVillage,
        PerMissionRules {
            tier,
            ..PerMissionRules::default()
        },
    );
    config.counts.base_neutral_items.insert(NeutralItemType::Village, 2);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn prop_connections_never_cross(graph in arb_scattered_graph(24), seed in arb_seed()) {
        let mut graph = graph;
        let rules = ConnectionRules::default();
        build_connections(&mut graph, &mut RecordingWorld::new(), &rules, seed).expect("anchors exist");
        prop_assert!(crossing_connections(&graph).is_empty());
    }

    #[test]
    fn prop_degrees_stay_within_the_maximum(
        graph in arb_layout_graph(),
        max in 1u32..5,
        seed in arb_seed(),
    ) {
        let mut graph = graph;
        let rules = ConnectionRules::new(1, max, 2000);
        build_connections(&mut graph, &mut RecordingWorld::new(), &rules, seed).expect("anchors exist");
        for anchor in graph.anchors() {
            prop_assert!(anchor.degree() <= max, "anchor {} has degree {}", anchor.key(), anchor.degree());
        }
    }

    #[test]
    fn prop_neighbor_lists_are_symmetric_and_sorted(graph in arb_layout_graph(), seed in arb_seed()) {
        let mut graph = graph;
        build_connections(&mut graph, &mut RecordingWorld::new(), &ConnectionRules::default(), seed)
            .expect("anchors exist");
        for anchor in graph.anchors() {
            let neighbors = anchor.neighbors();
            prop_assert!(neighbors.windows(2).all(|w| w[0] < w[1]));
            for neighbor in neighbors {
                prop_assert!(graph.are_neighbors(*neighbor, anchor.key()));
            }
        }
    }

    #[test]
    fn prop_hop_maps_are_breadth_first(graph in arb_layout_graph(), seed in arb_seed()) {
        let mut graph = graph;
        build_connections(&mut graph, &mut RecordingWorld::new(), &ConnectionRules::default(), seed)
            .expect("anchors exist");
        let start = graph.keys().next().expect("layouts are never empty");
        let hops = hops_from_anchor(&graph, start);

        prop_assert_eq!(hops.get(&start), Some(&0));
        for (key, distance) in &hops {
            for neighbor in graph.neighbors(*key) {
                let other = hops.get(neighbor).copied();
                prop_assert!(other.is_some(), "neighbor of a reached anchor is unreached");
                prop_assert!(other.unwrap_or(0).abs_diff(*distance) <= 1);
            }
            if *distance > 0 {
                prop_assert!(graph.neighbors(*key).iter().any(|n| hops.get(n) == Some(&(distance - 1))));
            }
            prop_assert_eq!(hop_distance(&graph, start, *key), Some(*distance));
        }
    }

    #[test]
    fn prop_generation_is_deterministic(graph in arb_layout_graph(), seed in arb_seed()) {
        let mut config = open_config(&graph, seed);
        config.counts.base_enemy_items.insert(EnemyItemType::Outpost, 1);
        config.counts.base_neutral_items.insert(NeutralItemType::Ruins, 1);
        config.budget.max_total_attempts = 200;
        let result = verify_generation_determinism(&graph, &config, 2);
        prop_assert!(result.is_deterministic, "hashes: {:?}", result.hashes);
    }

    #[test]
    fn prop_placements_never_share_anchors(graph in arb_layout_graph(), seed in arb_seed()) {
        let mut config = open_config(&graph, seed);
        config.counts.base_enemy_items.insert(EnemyItemType::Outpost, 2);
        config.counts.base_neutral_items.insert(NeutralItemType::Village, 1);
        config.budget.max_total_attempts = 200;
        let mut generator = recording_generator(graph, config);
        let _ = generator.execute_all_steps();

        let state = generator.state();
        prop_assert!(state.occupancy_conflicts(&generator.config().missions).is_empty());
        if let (Some(player), Some(enemy)) = (state.player_hq, state.enemy_hq) {
            prop_assert_ne!(player, enemy);
            prop_assert!(!state.enemy_items.contains_key(&player));
            prop_assert!(!state.neutral_items.contains_key(&enemy));
        }
        for key in state.enemy_items.keys().chain(state.neutral_items.keys()) {
            prop_assert!(generator.graph().contains(*key));
        }
    }

    #[test]
    fn prop_missions_only_stack_where_allowed(
        graph in arb_layout_graph(),
        seed in arb_seed(),
        village_required in any::<bool>(),
    ) {
        let mut config = open_config(&graph, seed);
        add_missions(&mut config, village_required);
        config.budget.max_total_attempts = 200;
        let mut generator = recording_generator(graph, config);
        let _ = generator.execute_all_steps();

        let state = generator.state();
        prop_assert!(state.occupancy_conflicts(&generator.config().missions).is_empty());
        for (anchor, mission) in &state.missions {
            let stacked = state.neutral_items.get(anchor);
            if village_required && *mission == MissionType::DefendVillage {
                prop_assert_eq!(stacked, Some(&NeutralItemType::Village));
            } else {
                prop_assert_eq!(stacked, None);
            }
        }
    }
}
