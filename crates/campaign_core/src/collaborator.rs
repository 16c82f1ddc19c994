//! The boundary between the generator and the world it populates.
//!
//! The generator never creates world objects itself. It asks a
//! [`WorldCollaborator`] to materialize connections and promoted anchors and
//! keeps the returned handles in its transactions so a rollback can destroy
//! exactly what was created.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::graph::{AnchorKey, Connection};
use crate::items::PlacedItem;

/// Opaque handle to a spawned world object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ActorHandle(pub u64);

/// Colour hint for diagnostic drawing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebugColor {
    /// Accepted placement.
    Green,
    /// Rejected candidate.
    Red,
    /// Connection created in the preferred phase.
    Cyan,
    /// Connection created in the extended or bridge phase.
    Yellow,
    /// Junction connection.
    Orange,
}

/// What a debug draw call refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebugTarget<'a> {
    /// An anchor.
    Anchor(AnchorKey),
    /// A connection.
    Connection(&'a Connection),
}

/// World-side operations the generator depends on.
pub trait WorldCollaborator {
    /// Spawn the actor for a new connection. `None` means the world refused.
    fn spawn_connection(&mut self, a: AnchorKey, b: AnchorKey) -> Option<ActorHandle>;

    /// Spawn the object for a promoted anchor. `None` means the world refused.
    fn spawn_object(&mut self, item: PlacedItem, anchor: AnchorKey) -> Option<ActorHandle>;

    /// Destroy a spawned object. Destroying an unknown or already destroyed
    /// handle does nothing.
    fn destroy(&mut self, handle: ActorHandle);

    /// Fire-and-forget notification that an anchor was promoted.
    fn notify_promoted(&mut self, _anchor: AnchorKey, _item: PlacedItem) {}

    /// Diagnostic drawing hook. Only called from debug builds.
    fn debug_draw(&mut self, _target: DebugTarget<'_>, _label: &str, _color: DebugColor) {}
}

/// In-memory collaborator that records every spawn and destroy.
///
/// Used by the CLI and by tests. It can be told to refuse spawns to exercise
/// the environment-failure path.
#[derive(Debug, Clone, Default)]
pub struct RecordingWorld {
    next_handle: u64,
    live: BTreeSet<ActorHandle>,
    spawned_total: u64,
    destroyed_total: u64,
    notifications: Vec<(AnchorKey, PlacedItem)>,
    refuse_objects_after: Option<u64>,
    refuse_connections: bool,
    objects_spawned: u64,
}

impl RecordingWorld {
    /// Create an empty world.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse every object spawn once `count` objects have been spawned.
    #[must_use]
    pub const fn refusing_objects_after(mut self, count: u64) -> Self {
        self.refuse_objects_after = Some(count);
        self
    }

    /// Refuse every connection spawn.
    #[must_use]
    pub const fn refusing_connections(mut self) -> Self {
        self.refuse_connections = true;
        self
    }

    /// Stop refusing spawns.
    pub fn accept_all(&mut self) {
        self.refuse_objects_after = None;
        self.refuse_connections = false;
    }

    /// Handles currently alive, in ascending order.
    #[must_use]
    pub fn live_handles(&self) -> Vec<ActorHandle> {
        self.live.iter().copied().collect()
    }

    /// Number of live handles.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    /// Total spawns ever accepted.
    #[must_use]
    pub const fn spawned_total(&self) -> u64 {
        self.spawned_total
    }

    /// Total destroys of live handles.
    #[must_use]
    pub const fn destroyed_total(&self) -> u64 {
        self.destroyed_total
    }

    /// Every promotion notification received, in order.
    #[must_use]
    pub fn notifications(&self) -> &[(AnchorKey, PlacedItem)] {
        &self.notifications
    }

    fn allocate(&mut self) -> ActorHandle {
        let handle = ActorHandle(self.next_handle);
        self.next_handle += 1;
        self.live.insert(handle);
        self.spawned_total += 1;
        handle
    }
}

impl WorldCollaborator for RecordingWorld {
    fn spawn_connection(&mut self, a: AnchorKey, b: AnchorKey) -> Option<ActorHandle> {
        if self.refuse_connections {
            trace!(%a, %b, "connection spawn refused");
            return None;
        }
        Some(self.allocate())
    }

    fn spawn_object(&mut self, item: PlacedItem, anchor: AnchorKey) -> Option<ActorHandle> {
        if self
            .refuse_objects_after
            .is_some_and(|limit| self.objects_spawned >= limit)
        {
            trace!(%anchor, ?item, "object spawn refused");
            return None;
        }
        self.objects_spawned += 1;
        Some(self.allocate())
    }

    fn destroy(&mut self, handle: ActorHandle) {
        if self.live.remove(&handle) {
            self.destroyed_total += 1;
        }
    }

    fn notify_promoted(&mut self, anchor: AnchorKey, item: PlacedItem) {
        self.notifications.push((anchor, item));
    }
}
