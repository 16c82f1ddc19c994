//! Connection generation.
//!
//! Builds a planar road network over the anchors in four phases:
//! - Preferred: each anchor links to its nearest free anchors within the
//!   preferred distance, up to a seeded per-anchor target degree.
//! - Extended: anchors still below the minimum degree ignore the distance cap.
//! - Three-way: anchors still below the minimum attach to the closest
//!   existing road as its third endpoint.
//! - Bridge: separate components are joined by their closest valid pair.
//!
//! No two roads cross unless they share an anchor, and no road passes
//! through an anchor it does not end at.

use std::collections::BTreeMap;

use tracing::{debug, trace};

use crate::collaborator::{ActorHandle, DebugColor, WorldCollaborator};
use crate::error::Result;
use crate::geometry::{passes_through, project_onto_segment, segments_intersect, Segment};
use crate::graph::{AnchorGraph, AnchorKey, ConnectionId};
use crate::hops::{component_count, hops_from_anchor};
use crate::math::{squared_units, DistanceSquared, Vec2Fixed};
use crate::rng::CampaignRng;
use crate::rules::ConnectionRules;

/// One drawn segment of a connection. Junction segments end at the
/// junction point rather than at an anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RoadSegment {
    segment: Segment,
    start: AnchorKey,
    end: Option<AnchorKey>,
    owner: ConnectionId,
}

impl RoadSegment {
    fn touches(&self, key: AnchorKey) -> bool {
        self.start == key || self.end == Some(key)
    }
}

/// Where a road is created, for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Preferred,
    Extended,
    Bridge,
}

impl Phase {
    const fn color(self) -> DebugColor {
        match self {
            Self::Preferred => DebugColor::Cyan,
            Self::Extended | Self::Bridge => DebugColor::Yellow,
        }
    }

    const fn label(self) -> &'static str {
        match self {
            Self::Preferred => "preferred",
            Self::Extended => "extended",
            Self::Bridge => "bridge",
        }
    }
}

struct ConnectionBuilder<'a, W: WorldCollaborator> {
    graph: &'a mut AnchorGraph,
    world: &'a mut W,
    rules: &'a ConnectionRules,
    segments: Vec<RoadSegment>,
    spawned: Vec<ActorHandle>,
}

impl<'a, W: WorldCollaborator> ConnectionBuilder<'a, W> {
    fn new(graph: &'a mut AnchorGraph, world: &'a mut W, rules: &'a ConnectionRules) -> Self {
        Self {
            graph,
            world,
            rules,
            segments: Vec::new(),
            spawned: Vec::new(),
        }
    }

    fn position(&self, key: AnchorKey) -> Vec2Fixed {
        self.graph.position(key).unwrap_or(Vec2Fixed::ZERO)
    }

    /// Free anchors sorted by squared distance, then key.
    fn sorted_candidates(&self, anchor: AnchorKey, ignore_distance: bool) -> Vec<AnchorKey> {
        let origin = self.position(anchor);
        let max_distance_squared = squared_units(self.rules.max_preferred_distance);
        let mut candidates: Vec<(DistanceSquared, AnchorKey)> = self
            .graph
            .anchors()
            .filter(|other| other.key() != anchor)
            .filter(|other| !self.graph.are_neighbors(anchor, other.key()))
            .filter(|other| other.degree() < self.rules.max_connections)
            .map(|other| (origin.distance_squared(other.position()), other.key()))
            .filter(|(distance, _)| ignore_distance || *distance <= max_distance_squared)
            .collect();
        candidates.sort_unstable();
        candidates.into_iter().map(|(_, key)| key).collect()
    }

    fn crosses_existing(
        &self,
        segment: Segment,
        endpoints: (AnchorKey, Option<AnchorKey>),
        ignore: Option<ConnectionId>,
    ) -> bool {
        let (start, end) = endpoints;
        self.segments.iter().any(|existing| {
            if Some(existing.owner) == ignore {
                return false;
            }
            if existing.touches(start) || end.is_some_and(|end| existing.touches(end)) {
                return false;
            }
            segments_intersect(segment, existing.segment)
        })
    }

    fn passes_through_anchor(&self, segment: Segment, endpoints: (AnchorKey, Option<AnchorKey>)) -> bool {
        self.graph
            .anchors()
            .filter(|anchor| anchor.key() != endpoints.0 && Some(anchor.key()) != endpoints.1)
            .any(|anchor| passes_through(segment, anchor.position()))
    }

    fn is_allowed(&self, a: AnchorKey, b: AnchorKey) -> bool {
        let max = self.rules.max_connections;
        if self.graph.degree(a) >= max || self.graph.degree(b) >= max {
            return false;
        }
        let segment = Segment::new(self.position(a), self.position(b));
        !self.crosses_existing(segment, (a, Some(b)), None)
            && !self.passes_through_anchor(segment, (a, Some(b)))
    }

    fn try_connect(&mut self, a: AnchorKey, b: AnchorKey, phase: Phase) -> Result<bool> {
        if !self.is_allowed(a, b) {
            return Ok(false);
        }
        let id = self.graph.connect(a, b)?;
        let Some(handle) = self.world.spawn_connection(a, b) else {
            debug!(%a, %b, "connection spawn refused");
            self.graph.remove_connection(id);
            return Ok(false);
        };
        self.graph.set_connection_handle(id, handle);
        self.spawned.push(handle);
        self.segments.push(RoadSegment {
            segment: Segment::new(self.position(a), self.position(b)),
            start: a,
            end: Some(b),
            owner: id,
        });
        trace!(%a, %b, phase = phase.label(), "connected");
        self.draw(id, phase.label(), phase.color());
        Ok(true)
    }

    fn preferred_phase(&mut self, anchor: AnchorKey, target: u32) -> Result<()> {
        if self.graph.degree(anchor) >= target {
            return Ok(());
        }
        for candidate in self.sorted_candidates(anchor, false) {
            let degree = self.graph.degree(anchor);
            if degree >= target || degree >= self.rules.max_connections {
                break;
            }
            self.try_connect(anchor, candidate, Phase::Preferred)?;
        }
        Ok(())
    }

    fn extended_phase(&mut self, anchor: AnchorKey) -> Result<()> {
        if self.graph.degree(anchor) >= self.rules.min_connections {
            return Ok(());
        }
        for candidate in self.sorted_candidates(anchor, true) {
            let degree = self.graph.degree(anchor);
            if degree >= self.rules.min_connections || degree >= self.rules.max_connections {
                break;
            }
            self.try_connect(anchor, candidate, Phase::Extended)?;
        }
        Ok(())
    }

    fn three_way_phase(&mut self, anchor: AnchorKey) -> Result<()> {
        while self.graph.degree(anchor) < self.rules.min_connections {
            if !self.try_three_way(anchor)? {
                break;
            }
        }
        Ok(())
    }

    /// Closest two-endpoint connection not touching `anchor`, with the
    /// projected junction point.
    fn closest_connection(&self, anchor: AnchorKey) -> Option<(ConnectionId, Vec2Fixed)> {
        let origin = self.position(anchor);
        let mut best: Option<(DistanceSquared, ConnectionId, Vec2Fixed)> = None;
        for connection in self.graph.connections() {
            if connection.is_three_way() || connection.contains(anchor) {
                continue;
            }
            let (first, second) = connection.base_pair();
            let base = Segment::new(self.position(first), self.position(second));
            let Some(junction) = project_onto_segment(base, origin) else {
                continue;
            };
            let distance = origin.distance_squared(junction);
            if best.map_or(true, |(closest, _, _)| distance < closest) {
                best = Some((distance, connection.id, junction));
            }
        }
        best.map(|(_, id, junction)| (id, junction))
    }

    fn try_three_way(&mut self, anchor: AnchorKey) -> Result<bool> {
        let Some((id, junction)) = self.closest_connection(anchor) else {
            return Ok(false);
        };
        let segment = Segment::new(self.position(anchor), junction);
        if self.crosses_existing(segment, (anchor, None), Some(id))
            || self.passes_through_anchor(segment, (anchor, None))
        {
            return Ok(false);
        }
        if !self.graph.attach_third(id, anchor, junction)? {
            return Ok(false);
        }
        self.segments.push(RoadSegment {
            segment,
            start: anchor,
            end: None,
            owner: id,
        });
        trace!(%anchor, connection = %id, "attached as third endpoint");
        self.draw(id, "three-way", DebugColor::Orange);
        Ok(true)
    }

    /// Component index of every anchor, numbered in key order.
    fn component_labels(&self) -> BTreeMap<AnchorKey, usize> {
        let mut labels = BTreeMap::new();
        let mut next = 0;
        for key in self.graph.keys() {
            if labels.contains_key(&key) {
                continue;
            }
            for reached in hops_from_anchor(&*self.graph, key).into_keys() {
                labels.insert(reached, next);
            }
            next += 1;
        }
        labels
    }

    fn bridge_phase(&mut self) -> Result<()> {
        loop {
            let labels = self.component_labels();
            if labels.values().max().map_or(true, |max| *max == 0) {
                return Ok(());
            }

            let max = self.rules.max_connections;
            let open: Vec<AnchorKey> = self
                .graph
                .keys()
                .filter(|key| self.graph.degree(*key) < max)
                .collect();
            let mut pairs: Vec<(DistanceSquared, AnchorKey, AnchorKey)> = Vec::new();
            for (index, a) in open.iter().enumerate() {
                for b in &open[index + 1..] {
                    if labels.get(a) != labels.get(b) {
                        let distance = self.position(*a).distance_squared(self.position(*b));
                        pairs.push((distance, *a, *b));
                    }
                }
            }
            pairs.sort_unstable();

            let mut bridged = false;
            for (_, a, b) in pairs {
                if self.try_connect(a, b, Phase::Bridge)? {
                    debug!(%a, %b, "bridged components");
                    bridged = true;
                    break;
                }
            }
            if !bridged {
                return Ok(());
            }
        }
    }

    #[cfg(debug_assertions)]
    fn draw(&mut self, id: ConnectionId, label: &str, color: DebugColor) {
        use crate::collaborator::DebugTarget;

        if let Some(connection) = self.graph.connection(id) {
            self.world.debug_draw(DebugTarget::Connection(connection), label, color);
        }
    }

    #[cfg(not(debug_assertions))]
    fn draw(&mut self, _id: ConnectionId, _label: &str, _color: DebugColor) {}
}

/// Build connections over every anchor of an unconnected graph.
///
/// Targets are drawn in key order from a stream seeded with `seed`, then the
/// anchors are processed in a seeded shuffle of that order. Neighbor lists
/// are sorted by key afterwards. Returns the handles of every spawned
/// connection actor; check the result with [`connection_problems`].
///
/// # Errors
///
/// Returns [`crate::error::CampaignError::UnknownAnchor`] only if the graph
/// is internally inconsistent.
pub fn build_connections<W: WorldCollaborator>(
    graph: &mut AnchorGraph,
    world: &mut W,
    rules: &ConnectionRules,
    seed: u64,
) -> Result<Vec<ActorHandle>> {
    let mut rng = CampaignRng::new(seed);
    let mut order: Vec<AnchorKey> = graph.keys().collect();
    let targets: BTreeMap<AnchorKey, u32> = order
        .iter()
        .map(|key| (*key, rng.range_inclusive(rules.min_connections, rules.max_connections)))
        .collect();
    rng.shuffle(&mut order);

    let mut builder = ConnectionBuilder::new(graph, world, rules);
    for anchor in &order {
        let target = targets.get(anchor).copied().unwrap_or(rules.min_connections);
        builder.preferred_phase(*anchor, target)?;
        builder.extended_phase(*anchor)?;
        builder.three_way_phase(*anchor)?;
    }
    builder.bridge_phase()?;

    let spawned = builder.spawned;
    graph.sort_neighbors();
    debug!(
        connections = graph.connection_count(),
        spawned = spawned.len(),
        "connections built"
    );
    Ok(spawned)
}

/// Reasons the generated graph is unusable. Empty means the graph is
/// connected and every degree lies within the rules.
#[must_use]
pub fn connection_problems(graph: &AnchorGraph, rules: &ConnectionRules) -> Vec<String> {
    let mut problems = Vec::new();
    if graph.anchor_count() < 2 {
        problems.push(format!("only {} anchor(s)", graph.anchor_count()));
        return problems;
    }
    for anchor in graph.anchors() {
        let degree = anchor.degree();
        if degree < rules.min_connections || degree > rules.max_connections {
            problems.push(format!("anchor {} has degree {degree}", anchor.key()));
        }
    }
    let components = component_count(graph);
    if components > 1 {
        problems.push(format!("graph has {components} components"));
    }
    problems
}

/// Drawn segments of every connection: the base pair, plus the junction
/// segment of a three-way connection.
#[must_use]
pub fn connection_segments(graph: &AnchorGraph) -> Vec<(ConnectionId, Segment)> {
    let mut segments = Vec::new();
    for connection in graph.connections() {
        let (first, second) = connection.base_pair();
        if let (Some(a), Some(b)) = (graph.position(first), graph.position(second)) {
            segments.push((connection.id, Segment::new(a, b)));
        }
        if let Some(third) = connection.third().and_then(|key| graph.position(key)) {
            segments.push((connection.id, Segment::new(third, connection.junction)));
        }
    }
    segments
}

/// Pairs of connections without a shared anchor whose segments intersect.
#[must_use]
pub fn crossing_connections(graph: &AnchorGraph) -> Vec<(ConnectionId, ConnectionId)> {
    let segments = connection_segments(graph);
    let mut crossings = Vec::new();
    for (index, (first_id, first)) in segments.iter().enumerate() {
        for (second_id, second) in &segments[index + 1..] {
            if first_id == second_id {
                continue;
            }
            let (Some(a), Some(b)) = (graph.connection(*first_id), graph.connection(*second_id)) else {
                continue;
            };
            if a.endpoints.iter().any(|key| b.contains(*key)) {
                continue;
            }
            if segments_intersect(*first, *second) {
                crossings.push((*first_id, *second_id));
            }
        }
    }
    crossings.sort_unstable();
    crossings.dedup();
    crossings
}
