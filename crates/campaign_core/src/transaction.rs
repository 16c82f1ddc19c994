//! Undo records for completed steps and micro-placements.

use crate::collaborator::ActorHandle;
use crate::graph::AnchorKey;
use crate::items::{NeutralItemType, PlacedItem};
use crate::state::{DerivedData, PlacementState};
use crate::step::GenerationStep;

/// One item placed by a multi-item step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MicroRecord {
    /// Position of the item in its step's plan.
    pub index: usize,
    /// Item placed.
    pub item: PlacedItem,
    /// Anchor it was placed on.
    pub anchor: AnchorKey,
    /// Neutral items placed alongside it.
    pub companions: Vec<(AnchorKey, NeutralItemType)>,
}

/// Everything needed to reverse one committed step or micro-placement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepTransaction {
    /// Step the transaction belongs to.
    pub step: GenerationStep,
    /// Placement state before the commit.
    pub state_before: PlacementState,
    /// Derived data before the commit.
    pub derived_before: DerivedData,
    /// Object actors spawned by the commit.
    pub spawned_objects: Vec<ActorHandle>,
    /// Connection actors spawned by the commit.
    pub spawned_connections: Vec<ActorHandle>,
    /// Set for micro-transactions.
    pub micro: Option<MicroRecord>,
}

impl StepTransaction {
    /// Macro transaction snapshotting the given state.
    #[must_use]
    pub fn new(step: GenerationStep, state_before: PlacementState, derived_before: DerivedData) -> Self {
        Self {
            step,
            state_before,
            derived_before,
            spawned_objects: Vec::new(),
            spawned_connections: Vec::new(),
            micro: None,
        }
    }

    /// Mark as the micro-transaction of one item.
    #[must_use]
    pub fn with_micro(mut self, micro: MicroRecord) -> Self {
        self.micro = Some(micro);
        self
    }

    /// Whether this records a single item of a multi-item step.
    #[must_use]
    pub const fn is_micro(&self) -> bool {
        self.micro.is_some()
    }

    /// Every handle spawned by the commit.
    pub fn handles(&self) -> impl Iterator<Item = ActorHandle> + '_ {
        self.spawned_objects
            .iter()
            .chain(self.spawned_connections.iter())
            .copied()
    }
}

/// Stack of committed transactions, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionLog {
    entries: Vec<StepTransaction>,
}

impl TransactionLog {
    /// Empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of transactions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Push a committed transaction.
    pub fn push(&mut self, transaction: StepTransaction) {
        self.entries.push(transaction);
    }

    /// Pop the newest transaction.
    pub fn pop(&mut self) -> Option<StepTransaction> {
        self.entries.pop()
    }

    /// Newest transaction.
    #[must_use]
    pub fn last(&self) -> Option<&StepTransaction> {
        self.entries.last()
    }

    /// Transactions, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &StepTransaction> {
        self.entries.iter()
    }

    /// Micro-transactions of `step` at the top of the stack. This is also
    /// how many plan items of a partially placed step are already done.
    #[must_use]
    pub fn trailing_micro(&self, step: GenerationStep) -> usize {
        self.entries
            .iter()
            .rev()
            .take_while(|entry| entry.step == step && entry.is_micro())
            .count()
    }

    /// Remove every transaction and return them, oldest first.
    pub fn drain(&mut self) -> Vec<StepTransaction> {
        std::mem::take(&mut self.entries)
    }
}
