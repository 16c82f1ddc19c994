//! Anchor and connection graph.
//!
//! Anchors are the placement slots of a campaign map. Connections are the
//! roads between them: two endpoints, or three once a connection has been
//! promoted to a junction. The graph keeps every anchor's neighbor list and
//! incident-connection list consistent with the connection table.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::collaborator::ActorHandle;
use crate::error::{CampaignError, Result};
use crate::math::{in_bounds, DistanceSquared, Fixed, Vec2Fixed, MAX_COORDINATE};

/// Stable identity of an anchor.
///
/// Ordering follows the 128-bit value, which is the tie-break used by every
/// sort in the generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnchorKey(Uuid);

impl AnchorKey {
    /// Build a key from a raw 128-bit value.
    #[must_use]
    pub const fn from_u128(value: u128) -> Self {
        Self(Uuid::from_u128(value))
    }

    /// Build a key from two 64-bit halves.
    #[must_use]
    pub const fn from_halves(high: u64, low: u64) -> Self {
        Self(Uuid::from_u64_pair(high, low))
    }

    /// The wrapped UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Raw 128-bit value.
    #[must_use]
    pub const fn as_u128(&self) -> u128 {
        self.0.as_u128()
    }
}

impl From<Uuid> for AnchorKey {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl fmt::Display for AnchorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

/// Identifier of a connection within one graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ConnectionId(pub u32);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn#{}", self.0)
    }
}

/// Input description of an anchor: identity and location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnchorPoint {
    /// Stable key.
    pub key: AnchorKey,
    /// Planar position used for all distance and segment math.
    pub position: Vec2Fixed,
    /// Height above the map plane. Carried along, never used for distances.
    #[serde(default, with = "crate::math::fixed_serde")]
    pub elevation: Fixed,
}

impl AnchorPoint {
    /// Create an anchor at a planar position.
    #[must_use]
    pub const fn new(key: AnchorKey, position: Vec2Fixed) -> Self {
        Self {
            key,
            position,
            elevation: Fixed::ZERO,
        }
    }
}

/// An anchor together with its edges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Anchor {
    point: AnchorPoint,
    neighbors: Vec<AnchorKey>,
    connections: Vec<ConnectionId>,
}

impl Anchor {
    fn new(point: AnchorPoint) -> Self {
        Self {
            point,
            neighbors: Vec::new(),
            connections: Vec::new(),
        }
    }

    /// Anchor key.
    #[must_use]
    pub const fn key(&self) -> AnchorKey {
        self.point.key
    }

    /// Planar position.
    #[must_use]
    pub const fn position(&self) -> Vec2Fixed {
        self.point.position
    }

    /// Input description this anchor was built from.
    #[must_use]
    pub const fn point(&self) -> &AnchorPoint {
        &self.point
    }

    /// Neighbor keys. Sorted by key once connection generation finishes.
    #[must_use]
    pub fn neighbors(&self) -> &[AnchorKey] {
        &self.neighbors
    }

    /// Incident connections.
    #[must_use]
    pub fn connections(&self) -> &[ConnectionId] {
        &self.connections
    }

    /// Number of unique incident connections.
    #[must_use]
    pub fn degree(&self) -> u32 {
        self.connections.len() as u32
    }

    fn link(&mut self, connection: ConnectionId, neighbor: AnchorKey) {
        if !self.connections.contains(&connection) {
            self.connections.push(connection);
        }
        if !self.neighbors.contains(&neighbor) {
            self.neighbors.push(neighbor);
        }
    }

    fn clear_edges(&mut self) {
        self.neighbors.clear();
        self.connections.clear();
    }
}

/// A road between two anchors, optionally extended to a third.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    /// Identifier within the graph.
    pub id: ConnectionId,
    /// Two endpoints, or three for a junction. The third is the attached one.
    pub endpoints: Vec<AnchorKey>,
    /// Midpoint of the base pair, or the projected point once a third anchor
    /// is attached.
    pub junction: Vec2Fixed,
    /// Handle of the world actor representing this connection, if spawned.
    pub handle: Option<ActorHandle>,
}

impl Connection {
    /// Whether a third endpoint has been attached.
    #[must_use]
    pub fn is_three_way(&self) -> bool {
        self.endpoints.len() == 3
    }

    /// Whether `key` is one of the endpoints.
    #[must_use]
    pub fn contains(&self, key: AnchorKey) -> bool {
        self.endpoints.contains(&key)
    }

    /// The two base endpoints.
    #[must_use]
    pub fn base_pair(&self) -> (AnchorKey, AnchorKey) {
        (self.endpoints[0], self.endpoints[1])
    }

    /// The attached third endpoint, if any.
    #[must_use]
    pub fn third(&self) -> Option<AnchorKey> {
        self.endpoints.get(2).copied()
    }
}

/// Anchors plus the connections between them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnchorGraph {
    anchors: BTreeMap<AnchorKey, Anchor>,
    connections: BTreeMap<ConnectionId, Connection>,
    next_connection_id: u32,
}

impl AnchorGraph {
    /// Build a graph with no connections.
    ///
    /// # Errors
    ///
    /// Returns [`CampaignError::InvalidConfig`] if two points share a key or
    /// a point lies outside [`MAX_COORDINATE`].
    pub fn from_points(points: impl IntoIterator<Item = AnchorPoint>) -> Result<Self> {
        let mut graph = Self::default();
        for point in points {
            if !in_bounds(point.position) {
                return Err(CampaignError::InvalidConfig(format!(
                    "anchor {} at ({}, {}) is outside +/-{MAX_COORDINATE}",
                    point.key, point.position.x, point.position.y
                )));
            }
            if graph.anchors.contains_key(&point.key) {
                return Err(CampaignError::InvalidConfig(format!(
                    "duplicate anchor key {}",
                    point.key
                )));
            }
            graph.anchors.insert(point.key, Anchor::new(point));
        }
        Ok(graph)
    }

    /// Number of anchors.
    #[must_use]
    pub fn anchor_count(&self) -> usize {
        self.anchors.len()
    }

    /// Number of connections.
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Whether the anchor is part of this graph.
    #[must_use]
    pub fn contains(&self, key: AnchorKey) -> bool {
        self.anchors.contains_key(&key)
    }

    /// Look up an anchor.
    #[must_use]
    pub fn anchor(&self, key: AnchorKey) -> Option<&Anchor> {
        self.anchors.get(&key)
    }

    /// All anchors in key order.
    pub fn anchors(&self) -> impl Iterator<Item = &Anchor> {
        self.anchors.values()
    }

    /// All anchor keys in ascending order.
    pub fn keys(&self) -> impl Iterator<Item = AnchorKey> + '_ {
        self.anchors.keys().copied()
    }

    /// All connections in creation order.
    pub fn connections(&self) -> impl Iterator<Item = &Connection> {
        self.connections.values()
    }

    /// Look up a connection.
    #[must_use]
    pub fn connection(&self, id: ConnectionId) -> Option<&Connection> {
        self.connections.get(&id)
    }

    /// Planar position of an anchor.
    #[must_use]
    pub fn position(&self, key: AnchorKey) -> Option<Vec2Fixed> {
        self.anchors.get(&key).map(Anchor::position)
    }

    /// Connection degree of an anchor, zero if unknown.
    #[must_use]
    pub fn degree(&self, key: AnchorKey) -> u32 {
        self.anchors.get(&key).map_or(0, Anchor::degree)
    }

    /// Neighbor keys of an anchor, empty if unknown.
    #[must_use]
    pub fn neighbors(&self, key: AnchorKey) -> &[AnchorKey] {
        self.anchors.get(&key).map_or(&[][..], Anchor::neighbors)
    }

    /// Whether two anchors are already neighbors.
    #[must_use]
    pub fn are_neighbors(&self, a: AnchorKey, b: AnchorKey) -> bool {
        self.neighbors(a).contains(&b)
    }

    /// Planar distance between two anchors.
    #[must_use]
    pub fn xy_distance(&self, a: AnchorKey, b: AnchorKey) -> Option<Fixed> {
        Some(self.position(a)?.distance(self.position(b)?))
    }

    /// Squared planar distance between two anchors.
    #[must_use]
    pub fn xy_distance_squared(&self, a: AnchorKey, b: AnchorKey) -> Option<DistanceSquared> {
        Some(self.position(a)?.distance_squared(self.position(b)?))
    }

    /// Connect two anchors with a new two-endpoint connection.
    ///
    /// # Errors
    ///
    /// Returns [`CampaignError::UnknownAnchor`] if either key is missing.
    pub fn connect(&mut self, a: AnchorKey, b: AnchorKey) -> Result<ConnectionId> {
        let pos_a = self.position(a).ok_or(CampaignError::UnknownAnchor(a))?;
        let pos_b = self.position(b).ok_or(CampaignError::UnknownAnchor(b))?;

        let id = ConnectionId(self.next_connection_id);
        self.next_connection_id += 1;
        self.connections.insert(
            id,
            Connection {
                id,
                endpoints: vec![a, b],
                junction: pos_a.midpoint(pos_b),
                handle: None,
            },
        );
        self.link(a, id, b);
        self.link(b, id, a);
        Ok(id)
    }

    /// Attach `third` to an existing two-endpoint connection at `junction`.
    ///
    /// The third anchor becomes a neighbor of both base endpoints. Returns
    /// `false` without changes if the connection is already a junction or
    /// already contains the anchor.
    ///
    /// # Errors
    ///
    /// Returns [`CampaignError::UnknownAnchor`] if `third` is missing.
    pub fn attach_third(
        &mut self,
        id: ConnectionId,
        third: AnchorKey,
        junction: Vec2Fixed,
    ) -> Result<bool> {
        if !self.contains(third) {
            return Err(CampaignError::UnknownAnchor(third));
        }
        let Some(connection) = self.connections.get_mut(&id) else {
            return Ok(false);
        };
        if connection.is_three_way() || connection.contains(third) {
            return Ok(false);
        }
        let (first, second) = connection.base_pair();
        connection.endpoints.push(third);
        connection.junction = junction;

        self.link(third, id, first);
        self.link(third, id, second);
        self.link(first, id, third);
        self.link(second, id, third);
        Ok(true)
    }

    /// Record the actor handle spawned for a connection.
    pub fn set_connection_handle(&mut self, id: ConnectionId, handle: ActorHandle) {
        if let Some(connection) = self.connections.get_mut(&id) {
            connection.handle = Some(handle);
        }
    }

    /// Remove a connection that was just created and has no third anchor.
    ///
    /// Used when the world refuses to materialize it.
    pub fn remove_connection(&mut self, id: ConnectionId) {
        let Some(connection) = self.connections.remove(&id) else {
            return;
        };
        for key in &connection.endpoints {
            if let Some(anchor) = self.anchors.get_mut(key) {
                anchor.connections.retain(|c| *c != id);
            }
        }
        for key in &connection.endpoints {
            self.rebuild_neighbors(*key);
        }
    }

    /// Remove every connection and return them so their handles can be
    /// destroyed. Anchors themselves are kept.
    pub fn clear_connections(&mut self) -> Vec<Connection> {
        for anchor in self.anchors.values_mut() {
            anchor.clear_edges();
        }
        self.next_connection_id = 0;
        std::mem::take(&mut self.connections).into_values().collect()
    }

    /// Sort every neighbor list by key for stable traversal order.
    pub fn sort_neighbors(&mut self) {
        for anchor in self.anchors.values_mut() {
            anchor.neighbors.sort_unstable();
        }
    }

    fn link(&mut self, key: AnchorKey, connection: ConnectionId, neighbor: AnchorKey) {
        if let Some(anchor) = self.anchors.get_mut(&key) {
            anchor.link(connection, neighbor);
        }
    }

    fn rebuild_neighbors(&mut self, key: AnchorKey) {
        let Some(anchor) = self.anchors.get(&key) else {
            return;
        };
        let mut neighbors = Vec::new();
        for id in &anchor.connections {
            if let Some(connection) = self.connections.get(id) {
                for other in &connection.endpoints {
                    if *other != key && !neighbors.contains(other) {
                        neighbors.push(*other);
                    }
                }
            }
        }
        if let Some(anchor) = self.anchors.get_mut(&key) {
            anchor.neighbors = neighbors;
        }
    }
}
