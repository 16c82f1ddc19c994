//! Hop-distance and degree caches.
//!
//! All functions here are pure reads of an [`AnchorGraph`]. Traversal visits
//! neighbors in stored order, which is key order once connection generation
//! has sorted the neighbor lists, so paths and tie-breaks are reproducible.

use std::collections::{BTreeMap, VecDeque};

use crate::graph::{AnchorGraph, AnchorKey};
use crate::rng::CampaignRng;

/// Hop counts from one source anchor. Unreachable anchors are absent.
pub type HopMap = BTreeMap<AnchorKey, u32>;

/// Unweighted BFS hop counts from `source` to every reachable anchor.
///
/// Returns an empty map when `source` is not in the graph.
#[must_use]
pub fn hops_from_anchor(graph: &AnchorGraph, source: AnchorKey) -> HopMap {
    let mut hops = HopMap::new();
    if !graph.contains(source) {
        return hops;
    }

    let mut queue = VecDeque::new();
    hops.insert(source, 0);
    queue.push_back(source);

    while let Some(current) = queue.pop_front() {
        let next_hop = hops[&current] + 1;
        for &neighbor in graph.neighbors(current) {
            if !hops.contains_key(&neighbor) {
                hops.insert(neighbor, next_hop);
                queue.push_back(neighbor);
            }
        }
    }

    hops
}

/// Hop count between two anchors, `None` if either is unknown or they are
/// not connected.
#[must_use]
pub fn hop_distance(graph: &AnchorGraph, from: AnchorKey, to: AnchorKey) -> Option<u32> {
    if !graph.contains(to) {
        return None;
    }
    shortest_path(graph, from, to).map(|path| (path.len() - 1) as u32)
}

/// Shortest path from `from` to `to`, both ends included.
#[must_use]
pub fn shortest_path(graph: &AnchorGraph, from: AnchorKey, to: AnchorKey) -> Option<Vec<AnchorKey>> {
    if !graph.contains(from) || !graph.contains(to) {
        return None;
    }
    if from == to {
        return Some(vec![from]);
    }

    let mut parents: BTreeMap<AnchorKey, AnchorKey> = BTreeMap::new();
    let mut queue = VecDeque::from([from]);
    parents.insert(from, from);

    while let Some(current) = queue.pop_front() {
        for &neighbor in graph.neighbors(current) {
            if parents.contains_key(&neighbor) {
                continue;
            }
            parents.insert(neighbor, current);
            if neighbor == to {
                let mut path = vec![to];
                let mut cursor = to;
                while cursor != from {
                    cursor = parents[&cursor];
                    path.push(cursor);
                }
                path.reverse();
                return Some(path);
            }
            queue.push_back(neighbor);
        }
    }

    None
}

/// Connection degree of every anchor.
#[must_use]
pub fn degree_map(graph: &AnchorGraph) -> BTreeMap<AnchorKey, u32> {
    graph.anchors().map(|a| (a.key(), a.degree())).collect()
}

/// Number of connected components. An empty graph has none.
#[must_use]
pub fn component_count(graph: &AnchorGraph) -> usize {
    let mut seen = HopMap::new();
    let mut components = 0;
    for key in graph.keys() {
        if seen.contains_key(&key) {
            continue;
        }
        components += 1;
        seen.extend(hops_from_anchor(graph, key));
    }
    components
}

/// Chokepoint score of every anchor.
///
/// With an HQ, every shortest path from the HQ to each other anchor adds one
/// to each interior anchor on it. Without one, anchors start from
/// `max(0, degree - 1)` and up to `max_samples` pairs drawn from a seeded
/// shuffle contribute their interior anchors the same way.
#[must_use]
pub fn chokepoint_scores(
    graph: &AnchorGraph,
    hq: Option<AnchorKey>,
    seed: u64,
    max_samples: usize,
) -> BTreeMap<AnchorKey, i64> {
    let mut scores: BTreeMap<AnchorKey, i64> = graph.keys().map(|k| (k, 0)).collect();
    if scores.is_empty() {
        return scores;
    }

    match hq.filter(|key| graph.contains(*key)) {
        Some(hq) => {
            for target in graph.keys().filter(|k| *k != hq) {
                if let Some(path) = shortest_path(graph, hq, target) {
                    add_path_contribution(&path, &mut scores);
                }
            }
        }
        None => {
            for anchor in graph.anchors() {
                scores.insert(anchor.key(), i64::from(anchor.degree().saturating_sub(1)));
            }

            let mut shuffled: Vec<AnchorKey> = graph.keys().collect();
            if shuffled.len() < 2 {
                return scores;
            }
            CampaignRng::new(seed).shuffle(&mut shuffled);

            let mut samples = 0;
            'outer: for (start_index, &start) in shuffled.iter().enumerate() {
                for &target in &shuffled[start_index + 1..] {
                    if samples >= max_samples {
                        break 'outer;
                    }
                    if let Some(path) = shortest_path(graph, start, target) {
                        add_path_contribution(&path, &mut scores);
                        samples += 1;
                    }
                }
            }
        }
    }

    scores
}

fn add_path_contribution(path: &[AnchorKey], scores: &mut BTreeMap<AnchorKey, i64>) {
    if path.len() < 3 {
        return;
    }
    for key in &path[1..path.len() - 1] {
        *scores.entry(*key).or_insert(0) += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::AnchorPoint;
    use crate::math::Vec2Fixed;

    fn key(n: u128) -> AnchorKey {
        AnchorKey::from_u128(n)
    }

    /// Path 1-2-3-4 plus an isolated anchor 5.
    fn path_graph() -> AnchorGraph {
        let mut graph = AnchorGraph::from_points(
            (1..=5).map(|n| AnchorPoint::new(key(n), Vec2Fixed::from_units(n as i32 * 10, 0))),
        )
        .expect("unique keys");
        graph.connect(key(1), key(2)).expect("known");
        graph.connect(key(2), key(3)).expect("known");
        graph.connect(key(3), key(4)).expect("known");
        graph.sort_neighbors();
        graph
    }

    #[test]
    fn test_hops_from_anchor() {
        let graph = path_graph();
        let hops = hops_from_anchor(&graph, key(1));
        assert_eq!(hops.get(&key(1)), Some(&0));
        assert_eq!(hops.get(&key(4)), Some(&3));
        assert!(!hops.contains_key(&key(5)), "unreachable anchors are absent");
        assert!(hops_from_anchor(&graph, key(99)).is_empty());
    }

    #[test]
    fn test_hop_distance_and_path() {
        let graph = path_graph();
        assert_eq!(hop_distance(&graph, key(4), key(2)), Some(2));
        assert_eq!(hop_distance(&graph, key(3), key(3)), Some(0));
        assert_eq!(hop_distance(&graph, key(1), key(5)), None);
        assert_eq!(
            shortest_path(&graph, key(1), key(4)),
            Some(vec![key(1), key(2), key(3), key(4)])
        );
    }

    #[test]
    fn test_component_count() {
        assert_eq!(component_count(&path_graph()), 2);
        assert_eq!(component_count(&AnchorGraph::default()), 0);
    }

    #[test]
    fn test_chokepoints_from_hq() {
        let graph = path_graph();
        let scores = chokepoint_scores(&graph, Some(key(1)), 0, 48);
        // Paths 1-2-3 and 1-2-3-4 pass through 2; 1-2-3-4 passes through 3.
        assert_eq!(scores[&key(2)], 2);
        assert_eq!(scores[&key(3)], 1);
        assert_eq!(scores[&key(4)], 0);
        assert_eq!(scores[&key(5)], 0);
    }

    #[test]
    fn test_chokepoints_without_hq_are_deterministic() {
        let graph = path_graph();
        let first = chokepoint_scores(&graph, None, 7919, 48);
        let second = chokepoint_scores(&graph, None, 7919, 48);
        assert_eq!(first, second);
        // Interior anchors start at degree - 1 and only gain from samples.
        assert!(first[&key(2)] >= 1);
        assert!(first[&key(3)] >= 1);
        assert_eq!(first[&key(5)], 0);
    }
}
