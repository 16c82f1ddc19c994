//! The generation pipeline driver.
//!
//! [`CampaignGenerator`] owns the graph, the placement state and the
//! transaction log, and exposes one entry point per step plus
//! [`CampaignGenerator::execute_all_steps`], which runs the whole pipeline
//! with backtracking.
//!
//! # Determinism
//!
//! - Selection reads only the graph, the committed state and the attempt
//!   counters.
//! - Every map is a `BTreeMap`, so iteration order is key order.
//! - Retries reseed from the base seed and the attempt index, never from
//!   anything external.
//!
//! # Example
//!
//! ```
//! use campaign_core::prelude::*;
//!
//! let graph = AnchorLayout::new(5, 4, 400).with_seed(3).build().expect("layout");
//! let mut config = GenerationConfig::default();
//! config.enemy_wall.anchor_candidates = graph.keys().collect();
//!
//! let mut generator = CampaignGenerator::new(graph, config, RecordingWorld::new())
//!     .expect("default config is valid");
//!
//! generator.execute_all_steps().expect("unconstrained run succeeds");
//! assert_eq!(generator.step(), GenerationStep::Finished);
//! assert!(generator.state().player_hq.is_some());
//! ```

use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

use tracing::{debug, info, instrument, warn};

use crate::collaborator::{ActorHandle, WorldCollaborator};
use crate::connections::{build_connections, connection_problems};
use crate::error::{CampaignError, Result};
use crate::failure::{plan_recovery, Recovery, RelaxationState};
use crate::graph::{AnchorGraph, AnchorKey};
use crate::items::{EnemyItemType, NeutralItemType, PlacedItem};
use crate::placement::{
    select_enemy_hq, select_enemy_item, select_enemy_wall, select_mission, select_neutral_item,
    select_player_hq, PlacementContext,
};
use crate::report::GenerationReport;
use crate::rules::{FailurePolicy, GenerationConfig, ATTEMPT_SEED_MULTIPLIER};
use crate::state::{DerivedData, PlacementState};
use crate::step::{GenerationStep, StepOutcome};
use crate::transaction::{MicroRecord, StepTransaction, TransactionLog};

/// Everything a run mutates.
#[derive(Debug, Clone, Default)]
pub struct GenerationContext {
    /// Anchors and the connections built over them.
    pub graph: AnchorGraph,
    /// Committed placements.
    pub state: PlacementState,
    /// Caches derived from `graph` and `state`.
    pub derived: DerivedData,
    /// Last completed step.
    pub step: GenerationStep,
    /// Undo stack.
    pub transactions: TransactionLog,
    /// Failed attempts per step since the step's prerequisite last completed.
    pub step_attempts: BTreeMap<GenerationStep, u32>,
    /// Failed attempts across the run.
    pub total_attempts: u32,
}

/// One item to place as a micro-transaction.
struct MicroPlacement {
    index: usize,
    item: PlacedItem,
    anchor: AnchorKey,
    companion: Option<(AnchorKey, NeutralItemType)>,
}

/// Deterministic campaign generator over a fixed anchor set.
#[derive(Debug)]
pub struct CampaignGenerator<W: WorldCollaborator> {
    config: GenerationConfig,
    context: GenerationContext,
    world: W,
}

impl<W: WorldCollaborator> CampaignGenerator<W> {
    /// Create a generator. Existing connections on `graph` are kept until
    /// the connection step rebuilds them.
    ///
    /// # Errors
    ///
    /// Returns [`CampaignError::InvalidConfig`] if the configuration fails
    /// validation. Nothing is mutated in that case.
    pub fn new(graph: AnchorGraph, config: GenerationConfig, world: W) -> Result<Self> {
        config.validate()?;
        let seed = config.seed();
        Ok(Self {
            config,
            context: GenerationContext {
                graph,
                state: PlacementState::new(seed),
                ..GenerationContext::default()
            },
            world,
        })
    }

    /// Run configuration.
    #[must_use]
    pub const fn config(&self) -> &GenerationConfig {
        &self.config
    }

    /// The anchor graph.
    #[must_use]
    pub const fn graph(&self) -> &AnchorGraph {
        &self.context.graph
    }

    /// Committed placements.
    #[must_use]
    pub const fn state(&self) -> &PlacementState {
        &self.context.state
    }

    /// Derived caches.
    #[must_use]
    pub const fn derived(&self) -> &DerivedData {
        &self.context.derived
    }

    /// Last completed step.
    #[must_use]
    pub const fn step(&self) -> GenerationStep {
        self.context.step
    }

    /// Undo stack.
    #[must_use]
    pub const fn transactions(&self) -> &TransactionLog {
        &self.context.transactions
    }

    /// Failed attempts of `step` since its prerequisite last completed.
    #[must_use]
    pub fn attempt(&self, step: GenerationStep) -> u32 {
        self.context.step_attempts.get(&step).copied().unwrap_or(0)
    }

    /// Failed attempts across the run.
    #[must_use]
    pub const fn total_attempts(&self) -> u32 {
        self.context.total_attempts
    }

    /// The world collaborator.
    #[must_use]
    pub const fn world(&self) -> &W {
        &self.world
    }

    /// Mutable access to the world collaborator.
    pub fn world_mut(&mut self) -> &mut W {
        &mut self.world
    }

    /// The full run context.
    #[must_use]
    pub const fn context(&self) -> &GenerationContext {
        &self.context
    }

    /// Consume the generator, returning its context and world.
    #[must_use]
    pub fn into_parts(self) -> (GenerationContext, W) {
        (self.context, self.world)
    }

    fn require(&self, requested: GenerationStep) -> Result<()> {
        if self.context.step == requested.prerequisite() {
            Ok(())
        } else {
            Err(CampaignError::StepOutOfOrder {
                requested,
                current: self.context.step,
            })
        }
    }

    fn relaxation(&self, step: GenerationStep) -> RelaxationState {
        RelaxationState::for_attempt(self.config.failure_policy.resolve(step), self.attempt(step))
    }

    fn complete(&mut self, step: GenerationStep) {
        self.context.step = step;
        self.context.step_attempts.retain(|other, _| *other <= step);
        #[cfg(feature = "debug-validation")]
        {
            let conflicts = self.context.state.occupancy_conflicts(&self.config.missions);
            assert!(conflicts.is_empty(), "occupancy conflicts after {step}: {conflicts:?}");
        }
        info!(%step, transactions = self.context.transactions.len(), "step completed");
    }

    // ------------------------------------------------------------------
    // Step entry points
    // ------------------------------------------------------------------

    /// Build the connection graph over every anchor.
    ///
    /// Any existing connections are destroyed first. The attempt's seed is
    /// the base seed plus thirteen per failed attempt.
    ///
    /// # Errors
    ///
    /// Returns [`CampaignError::StepOutOfOrder`] unless nothing has been
    /// generated yet.
    #[instrument(skip(self), fields(attempt = self.attempt(GenerationStep::ConnectionsCreated)))]
    pub fn generate_connections(&mut self) -> Result<StepOutcome> {
        let step = GenerationStep::ConnectionsCreated;
        self.require(step)?;
        self.clear_edges();

        let attempt = self.attempt(step);
        let seed = self
            .config
            .seed()
            .wrapping_add(u64::from(attempt).wrapping_mul(ATTEMPT_SEED_MULTIPLIER));
        let spawned = build_connections(
            &mut self.context.graph,
            &mut self.world,
            &self.config.connections,
            seed,
        )?;

        let problems = connection_problems(&self.context.graph, &self.config.connections);
        if !problems.is_empty() {
            debug!(attempt, ?problems, "connection attempt rejected");
            for handle in spawned {
                self.world.destroy(handle);
            }
            self.context.graph.clear_connections();
            return Ok(StepOutcome::Unsatisfied);
        }

        let mut transaction = StepTransaction::new(
            step,
            self.context.state.clone(),
            self.context.derived.clone(),
        );
        transaction.spawned_connections = spawned;
        self.context.derived = DerivedData::for_graph(&self.context.graph, self.config.seed());
        self.context.transactions.push(transaction);
        self.complete(step);
        Ok(StepOutcome::Completed)
    }

    /// Choose and spawn the player HQ.
    ///
    /// # Errors
    ///
    /// Returns [`CampaignError::StepOutOfOrder`] unless connections exist.
    #[instrument(skip(self), fields(attempt = self.attempt(GenerationStep::PlayerHqPlaced)))]
    pub fn place_player_hq(&mut self) -> Result<StepOutcome> {
        let step = GenerationStep::PlayerHqPlaced;
        self.require(step)?;
        let chosen = select_player_hq(self.placement_context(step), &self.config.player_hq);
        Ok(self.commit_single(step, chosen, PlacedItem::PlayerHq))
    }

    /// Choose and spawn the enemy HQ.
    ///
    /// # Errors
    ///
    /// Returns [`CampaignError::StepOutOfOrder`] unless the player HQ is placed.
    #[instrument(skip(self), fields(attempt = self.attempt(GenerationStep::EnemyHqPlaced)))]
    pub fn place_enemy_hq(&mut self) -> Result<StepOutcome> {
        let step = GenerationStep::EnemyHqPlaced;
        self.require(step)?;
        let chosen = select_enemy_hq(self.placement_context(step), &self.config.enemy_hq);
        Ok(self.commit_single(step, chosen, PlacedItem::Enemy(EnemyItemType::EnemyHq)))
    }

    /// Choose and spawn the enemy wall from the configured anchor list.
    ///
    /// # Errors
    ///
    /// Returns [`CampaignError::StepOutOfOrder`] unless the enemy HQ is placed.
    #[instrument(skip(self), fields(attempt = self.attempt(GenerationStep::EnemyWallPlaced)))]
    pub fn place_enemy_wall(&mut self) -> Result<StepOutcome> {
        let step = GenerationStep::EnemyWallPlaced;
        self.require(step)?;
        let chosen = select_enemy_wall(self.placement_context(step), &self.config.enemy_wall);
        Ok(self.commit_single(step, chosen, PlacedItem::Enemy(EnemyItemType::EnemyWall)))
    }

    /// Place every planned enemy item, one micro-transaction each.
    ///
    /// Items already placed by an earlier partial run of this step are
    /// kept; placement resumes at the first missing one.
    ///
    /// # Errors
    ///
    /// Returns [`CampaignError::StepOutOfOrder`] unless the wall is placed.
    #[instrument(skip(self), fields(attempt = self.attempt(GenerationStep::EnemyObjectsPlaced)))]
    pub fn place_enemy_objects(&mut self) -> Result<StepOutcome> {
        let step = GenerationStep::EnemyObjectsPlaced;
        self.require(step)?;
        let plan = self.config.counts.enemy_plan();
        let safe_zone = self.config.player_hq.safe_zone_max_hops;

        let done = self.context.transactions.trailing_micro(step);
        for (index, item) in plan.into_iter().enumerate().skip(done) {
            let chosen = select_enemy_item(
                self.placement_context(step),
                &self.config.enemy_items,
                item,
                safe_zone,
            );
            let Some(anchor) = chosen else {
                debug!(?item, index, "no anchor for enemy item");
                return Ok(StepOutcome::Unsatisfied);
            };
            let placement = MicroPlacement {
                index,
                item: PlacedItem::Enemy(item),
                anchor,
                companion: None,
            };
            if !self.commit_micro(step, placement) {
                return Ok(StepOutcome::Unsatisfied);
            }
        }

        self.complete(step);
        Ok(StepOutcome::Completed)
    }

    /// Place every required neutral item as one transaction.
    ///
    /// Items are placed on a working copy of the state; nothing is committed
    /// unless all of them succeed.
    ///
    /// # Errors
    ///
    /// Returns [`CampaignError::StepOutOfOrder`] unless enemy items are placed.
    #[instrument(skip(self), fields(attempt = self.attempt(GenerationStep::NeutralObjectsPlaced)))]
    pub fn place_neutral_objects(&mut self) -> Result<StepOutcome> {
        let step = GenerationStep::NeutralObjectsPlaced;
        self.require(step)?;
        let attempt = self.attempt(step);
        let relaxation = self.relaxation(step);

        let mut state = self.context.state.clone();
        let mut derived = self.context.derived.clone();
        let mut spawned: Vec<ActorHandle> = Vec::new();
        let mut promoted: Vec<(AnchorKey, PlacedItem)> = Vec::new();

        for (item, count) in self.config.counts.required_neutral_items() {
            for _ in 0..count {
                let ctx = PlacementContext::new(&self.context.graph, &state, &derived, attempt, relaxation);
                let chosen = select_neutral_item(ctx, &self.config.neutral_items, item);
                let placed = PlacedItem::Neutral(item);
                let handle = chosen.and_then(|anchor| self.world.spawn_object(placed, anchor));
                let (Some(anchor), Some(handle)) = (chosen, handle) else {
                    debug!(?item, spawned = chosen.is_some(), "neutral item not placed");
                    for handle in spawned {
                        self.world.destroy(handle);
                    }
                    return Ok(StepOutcome::Unsatisfied);
                };
                spawned.push(handle);
                promoted.push((anchor, placed));
                state.record(anchor, placed);
                derived.count(placed);
            }
        }

        let mut transaction = StepTransaction::new(
            step,
            std::mem::replace(&mut self.context.state, state),
            std::mem::replace(&mut self.context.derived, derived),
        );
        transaction.spawned_objects = spawned;
        self.context.transactions.push(transaction);
        for (anchor, item) in promoted {
            self.world.notify_promoted(anchor, item);
        }
        self.complete(step);
        Ok(StepOutcome::Completed)
    }

    /// Place every planned mission, one micro-transaction each. A companion
    /// neutral item required by a mission is placed in the same
    /// micro-transaction.
    ///
    /// # Errors
    ///
    /// Returns [`CampaignError::StepOutOfOrder`] unless neutral items are placed.
    #[instrument(skip(self), fields(attempt = self.attempt(GenerationStep::MissionsPlaced)))]
    pub fn place_missions(&mut self) -> Result<StepOutcome> {
        let step = GenerationStep::MissionsPlaced;
        self.require(step)?;
        let plan = self.config.missions.plan();

        let done = self.context.transactions.trailing_micro(step);
        for (index, mission) in plan.into_iter().enumerate().skip(done) {
            let mission_index = u32::try_from(index).unwrap_or(u32::MAX);
            let chosen = select_mission(
                self.placement_context(step),
                &self.config.missions,
                &self.config.neutral_items,
                mission,
                mission_index,
            );
            let Some(selection) = chosen else {
                debug!(?mission, index, "no anchor for mission");
                return Ok(StepOutcome::Unsatisfied);
            };
            let placement = MicroPlacement {
                index,
                item: PlacedItem::Mission(mission),
                anchor: selection.anchor,
                companion: selection.companion,
            };
            if !self.commit_micro(step, placement) {
                return Ok(StepOutcome::Unsatisfied);
            }
        }

        self.complete(step);
        Ok(StepOutcome::Completed)
    }

    fn placement_context(&self, step: GenerationStep) -> PlacementContext<'_> {
        PlacementContext::new(
            &self.context.graph,
            &self.context.state,
            &self.context.derived,
            self.attempt(step),
            self.relaxation(step),
        )
    }

    /// Spawn and commit the single item of an HQ or wall step.
    fn commit_single(
        &mut self,
        step: GenerationStep,
        chosen: Option<AnchorKey>,
        item: PlacedItem,
    ) -> StepOutcome {
        let Some(anchor) = chosen else {
            debug!(%step, "no eligible anchor");
            return StepOutcome::Unsatisfied;
        };
        let Some(handle) = self.world.spawn_object(item, anchor) else {
            debug!(%step, %anchor, "object spawn refused");
            return StepOutcome::Unsatisfied;
        };

        let mut transaction = StepTransaction::new(
            step,
            self.context.state.clone(),
            self.context.derived.clone(),
        );
        transaction.spawned_objects.push(handle);

        let context = &mut self.context;
        context.state.record(anchor, item);
        context.derived.count(item);
        match item {
            PlacedItem::PlayerHq => {
                context
                    .derived
                    .set_player_hq(&context.graph, anchor, context.state.seed);
            }
            PlacedItem::Enemy(EnemyItemType::EnemyHq) => {
                context.derived.set_enemy_hq(&context.graph, anchor);
            }
            _ => {}
        }
        context.transactions.push(transaction);
        self.world.notify_promoted(anchor, item);
        info!(%step, %anchor, ?item, "placed");
        self.complete(step);
        StepOutcome::Completed
    }

    /// Spawn and commit one item of a multi-item step. Returns `false`
    /// without changes if the world refuses any spawn.
    fn commit_micro(&mut self, step: GenerationStep, placement: MicroPlacement) -> bool {
        let MicroPlacement {
            index,
            item,
            anchor,
            companion,
        } = placement;

        let Some(handle) = self.world.spawn_object(item, anchor) else {
            debug!(%step, %anchor, ?item, "object spawn refused");
            return false;
        };
        let mut spawned = vec![handle];
        if let Some((companion_anchor, neutral)) = companion {
            let Some(companion_handle) = self
                .world
                .spawn_object(PlacedItem::Neutral(neutral), companion_anchor)
            else {
                debug!(%step, anchor = %companion_anchor, ?neutral, "companion spawn refused");
                self.world.destroy(handle);
                return false;
            };
            spawned.push(companion_handle);
        }

        let mut transaction = StepTransaction::new(
            step,
            self.context.state.clone(),
            self.context.derived.clone(),
        )
        .with_micro(MicroRecord {
            index,
            item,
            anchor,
            companions: companion.into_iter().collect(),
        });
        transaction.spawned_objects = spawned;

        self.context.state.record(anchor, item);
        self.context.derived.count(item);
        self.world.notify_promoted(anchor, item);
        if let Some((companion_anchor, neutral)) = companion {
            let companion_item = PlacedItem::Neutral(neutral);
            self.context.state.record(companion_anchor, companion_item);
            self.context.derived.count(companion_item);
            self.world.notify_promoted(companion_anchor, companion_item);
        }
        self.context.transactions.push(transaction);
        debug!(%step, index, %anchor, ?item, "micro placement committed");
        true
    }

    // ------------------------------------------------------------------
    // Pipeline
    // ------------------------------------------------------------------

    /// Run one step's entry point without any recovery.
    ///
    /// # Errors
    ///
    /// Returns [`CampaignError::StepOutOfOrder`] unless `step` directly
    /// follows the current step.
    pub fn run_step(&mut self, step: GenerationStep) -> Result<StepOutcome> {
        match step {
            GenerationStep::ConnectionsCreated => self.generate_connections(),
            GenerationStep::PlayerHqPlaced => self.place_player_hq(),
            GenerationStep::EnemyHqPlaced => self.place_enemy_hq(),
            GenerationStep::EnemyWallPlaced => self.place_enemy_wall(),
            GenerationStep::EnemyObjectsPlaced => self.place_enemy_objects(),
            GenerationStep::NeutralObjectsPlaced => self.place_neutral_objects(),
            GenerationStep::MissionsPlaced => self.place_missions(),
            GenerationStep::NotStarted | GenerationStep::Finished => Ok(StepOutcome::Completed),
        }
    }

    /// Run every remaining step, backtracking on failure, until the pipeline
    /// finishes or the retry budget runs out.
    ///
    /// # Errors
    ///
    /// - [`CampaignError::RetryBudgetExhausted`] when a step or the run as
    ///   a whole exceeds its attempt limit. The state is left as it was at
    ///   that point for inspection.
    /// - [`CampaignError::InvalidConfig`] if a failing step has no policy.
    pub fn execute_all_steps(&mut self) -> Result<GenerationReport> {
        let report = self.execute_through(GenerationStep::Finished)?;
        info!(
            total_attempts = report.total_attempts,
            transactions = report.transactions,
            items = self.context.state.item_count(),
            "generation finished"
        );
        Ok(report)
    }

    /// Run steps with recovery until `target` is complete. Targets at or
    /// behind the current step return immediately.
    ///
    /// # Errors
    ///
    /// Same as [`Self::execute_all_steps`].
    pub fn execute_through(&mut self, target: GenerationStep) -> Result<GenerationReport> {
        let last = target.min(GenerationStep::MissionsPlaced);
        while self.context.step < last {
            let step = self.context.step.next();
            if !self.run_step(step)?.is_completed() {
                self.recover(step)?;
            }
        }
        if target == GenerationStep::Finished && self.context.step == GenerationStep::MissionsPlaced {
            self.context.step = GenerationStep::Finished;
        }
        Ok(self.report())
    }

    fn recover(&mut self, step: GenerationStep) -> Result<()> {
        let attempt = {
            let counter = self.context.step_attempts.entry(step).or_insert(0);
            *counter += 1;
            *counter
        };
        self.context.total_attempts += 1;

        let budget = self.config.budget;
        if attempt > budget.max_step_attempts || self.context.total_attempts > budget.max_total_attempts {
            let partial = self.context.transactions.trailing_micro(step);
            warn!(
                %step,
                attempt,
                total = self.context.total_attempts,
                partial,
                "retry budget exhausted"
            );
            for _ in 0..partial {
                self.undo_last_transaction();
            }
            return Err(CampaignError::RetryBudgetExhausted {
                step,
                step_attempts: attempt,
                total_attempts: self.context.total_attempts,
            });
        }

        let policy = self.config.failure_policy.resolve(step);
        if policy == FailurePolicy::NotSet {
            return Err(CampaignError::InvalidConfig(format!(
                "no failure policy resolves for {step}"
            )));
        }

        let trailing = self.context.transactions.trailing_micro(step);
        let window = self.config.failure_policy.escalation_attempts;
        match plan_recovery(step, policy, attempt, trailing, window) {
            Recovery::UndoMicro(depth) => {
                debug!(%step, attempt, depth, "undoing micro placements");
                for _ in 0..depth {
                    self.undo_last_transaction();
                }
            }
            Recovery::RetryRelaxed => {
                debug!(%step, attempt, relaxation = ?self.relaxation(step), "retrying with relaxed rules");
            }
            Recovery::Backtrack(depth) => {
                debug!(%step, attempt, depth, "backtracking");
                for _ in 0..depth {
                    let Some(undone) = self.undo_last_transaction() else {
                        break;
                    };
                    if undone != step {
                        *self.context.step_attempts.entry(undone).or_insert(0) += 1;
                    }
                }
            }
        }
        Ok(())
    }

    /// Pop and reverse the newest transaction: destroy what it spawned,
    /// restore its snapshots, and step back to its prerequisite. Undoing the
    /// connection step also clears every anchor's edges.
    ///
    /// Returns the step the transaction belonged to, or `None` (leaving the
    /// generator at `NotStarted`) if the log is empty.
    pub fn undo_last_transaction(&mut self) -> Option<GenerationStep> {
        let Some(transaction) = self.context.transactions.pop() else {
            self.context.step = GenerationStep::NotStarted;
            return None;
        };
        for handle in transaction.handles() {
            self.world.destroy(handle);
        }
        if transaction.step == GenerationStep::ConnectionsCreated {
            self.clear_edges();
        }
        self.context.state = transaction.state_before;
        self.context.derived = transaction.derived_before;
        self.context.step = transaction.step.prerequisite();
        debug!(
            step = %transaction.step,
            micro = transaction.micro.is_some(),
            remaining = self.context.transactions.len(),
            "transaction undone"
        );
        Some(transaction.step)
    }

    fn clear_edges(&mut self) {
        for connection in self.context.graph.clear_connections() {
            if let Some(handle) = connection.handle {
                self.world.destroy(handle);
            }
        }
    }

    /// Destroy everything generated and return to `NotStarted`. Anchors are
    /// kept. Calling it again is a no-op.
    pub fn erase_all_generation(&mut self) {
        if self.context.step == GenerationStep::NotStarted
            && self.context.transactions.is_empty()
            && self.context.graph.connection_count() == 0
        {
            return;
        }
        for transaction in self.context.transactions.drain() {
            for handle in transaction.handles() {
                self.world.destroy(handle);
            }
        }
        self.clear_edges();
        self.context.state = PlacementState::new(self.config.seed());
        self.context.derived = DerivedData::default();
        self.context.step_attempts.clear();
        self.context.total_attempts = 0;
        self.context.step = GenerationStep::NotStarted;
        info!("generation erased");
    }

    /// Hash of the graph edges, the placement state, the derived caches and
    /// the step machine. Equal runs give equal hashes.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        let context = &self.context;

        context.step.hash(&mut hasher);
        context.graph.connection_count().hash(&mut hasher);
        for connection in context.graph.connections() {
            connection.id.hash(&mut hasher);
            connection.endpoints.hash(&mut hasher);
            connection.junction.hash(&mut hasher);
        }
        for anchor in context.graph.anchors() {
            anchor.key().hash(&mut hasher);
            anchor.neighbors().hash(&mut hasher);
        }
        context.state.hash(&mut hasher);
        context.derived.hash(&mut hasher);
        context.transactions.len().hash(&mut hasher);
        context.step_attempts.hash(&mut hasher);
        context.total_attempts.hash(&mut hasher);

        hasher.finish()
    }

    /// Summary of the run so far.
    #[must_use]
    pub fn report(&self) -> GenerationReport {
        GenerationReport::new(&self.context, self.state_hash())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborator::RecordingWorld;
    use crate::graph::AnchorPoint;
    use crate::items::MissionType;
    use crate::math::Vec2Fixed;
    use crate::rules::{
        ConnectionRules, EnemyItemRules, EnemyItemRuleset, FailurePolicyConfig, MissionTierRules,
        PerMissionRules,
    };

    fn key(n: u128) -> AnchorKey {
        AnchorKey::from_u128(n)
    }

    fn line(count: u128) -> AnchorGraph {
        AnchorGraph::from_points(
            (1..=count).map(|n| AnchorPoint::new(key(n), Vec2Fixed::from_units(n as i32 * 100, 0))),
        )
        .expect("unique keys")
    }

    fn line_config() -> GenerationConfig {
        let mut config = GenerationConfig {
            connections: ConnectionRules::new(1, 2, u32::MAX),
            ..GenerationConfig::default()
        };
        config.counts.seed = 42;
        config.enemy_wall.anchor_candidates = (1..=10).map(key).collect();
        config
    }

    fn generator(config: GenerationConfig) -> CampaignGenerator<RecordingWorld> {
        CampaignGenerator::new(line(10), config, RecordingWorld::new()).expect("valid config")
    }

    #[test]
    fn test_steps_must_run_in_order() {
        let mut generator = generator(line_config());
        let result = generator.place_player_hq();
        assert!(matches!(
            result,
            Err(CampaignError::StepOutOfOrder {
                requested: GenerationStep::PlayerHqPlaced,
                current: GenerationStep::NotStarted,
            })
        ));
        assert_eq!(
            generator.generate_connections().expect("in order"),
            StepOutcome::Completed
        );
        assert!(generator.generate_connections().is_err());
    }

    #[test]
    fn test_invalid_config_is_rejected_before_anything_runs() {
        let mut config = line_config();
        config.connections = ConnectionRules::new(3, 1, 100);
        let result = CampaignGenerator::new(line(4), config, RecordingWorld::new());
        assert!(matches!(result, Err(CampaignError::InvalidConfig(_))));
    }

    #[test]
    fn test_full_run_on_a_line() {
        let mut config = line_config();
        config.counts.base_enemy_items.insert(EnemyItemType::Outpost, 1);
        config.counts.base_neutral_items.insert(NeutralItemType::Village, 1);

        let mut generator = generator(config);
        let report = generator.execute_all_steps().expect("satisfiable");

        assert_eq!(generator.step(), GenerationStep::Finished);
        assert_eq!(generator.graph().connection_count(), 9);
        assert!(generator.state().player_hq.is_some());
        assert!(generator.state().enemy_hq.is_some());
        assert_eq!(generator.state().enemy_items.len(), 2);
        assert_eq!(generator.state().neutral_items.len(), 1);
        assert!(generator.state().occupancy_conflicts(&generator.config().missions).is_empty());
        assert_eq!(report.state_hash, generator.state_hash());
        // Connections plus one transaction per HQ, wall, item and neutral step.
        assert_eq!(generator.world().live_count(), 9 + 5);
    }

    #[test]
    fn test_undo_restores_previous_step() {
        let mut generator = generator(line_config());
        generator.generate_connections().expect("in order");
        generator.place_player_hq().expect("in order");
        let live_before = generator.world().live_count();

        assert_eq!(
            generator.undo_last_transaction(),
            Some(GenerationStep::PlayerHqPlaced)
        );
        assert_eq!(generator.step(), GenerationStep::ConnectionsCreated);
        assert!(generator.state().player_hq.is_none());
        assert!(generator.derived().player_hq_hops.is_empty());
        assert_eq!(generator.world().live_count(), live_before - 1);

        assert_eq!(
            generator.undo_last_transaction(),
            Some(GenerationStep::ConnectionsCreated)
        );
        assert_eq!(generator.graph().connection_count(), 0);
        assert_eq!(generator.world().live_count(), 0);
        assert_eq!(generator.undo_last_transaction(), None);
        assert_eq!(generator.step(), GenerationStep::NotStarted);
    }

    #[test]
    fn test_refused_hq_spawn_is_unsatisfied() {
        let mut generator = CampaignGenerator::new(
            line(10),
            line_config(),
            RecordingWorld::new().refusing_objects_after(0),
        )
        .expect("valid config");
        generator.generate_connections().expect("in order");
        assert_eq!(
            generator.place_player_hq().expect("in order"),
            StepOutcome::Unsatisfied
        );
        assert_eq!(generator.step(), GenerationStep::ConnectionsCreated);
        assert!(generator.state().player_hq.is_none());
    }

    #[test]
    fn test_mission_companion_shares_the_micro_transaction() {
        let mut config = line_config();
        let tier_rules = MissionTierRules {
            adjacency: crate::rules::AdjacencyRequirement {
                enabled: true,
                target: crate::rules::AdjacencyTarget::Neutral(Some(NeutralItemType::Ruins)),
                max_hops: 1,
                min_matching_count: 1,
                policy: crate::rules::AdjacencyPolicy::TryAutoPlaceCompanion,
            },
            ..MissionTierRules::default()
        };
        config.missions.rules_by_mission.insert(
            MissionType::ScoutRuins,
            PerMissionRules {
                override_tier_rules: true,
                override_rules: tier_rules,
                ..PerMissionRules::default()
            },
        );

        let mut generator = generator(config);
        generator.execute_all_steps().expect("satisfiable");

        let last = generator.transactions().last().expect("mission transaction");
        let micro = last.micro.as_ref().expect("micro record");
        assert_eq!(micro.item, PlacedItem::Mission(MissionType::ScoutRuins));
        assert_eq!(micro.companions.len(), 1);
        assert_eq!(last.spawned_objects.len(), 2);
        assert_eq!(generator.state().neutral_items.len(), 1);

        generator.undo_last_transaction();
        assert!(generator.state().missions.is_empty());
        assert!(generator.state().neutral_items.is_empty());
    }

    #[test]
    fn test_unsatisfiable_enemy_item_exhausts_the_budget() {
        let mut config = line_config();
        config.counts.base_enemy_items.insert(EnemyItemType::Factory, 1);
        config.enemy_items.rules_by_item.insert(
            EnemyItemType::Factory,
            EnemyItemRuleset {
                base_rules: EnemyItemRules {
                    enemy_hq_spacing: crate::rules::EnemyHqSpacing {
                        min_hops_from_enemy_hq: 50,
                        ..crate::rules::EnemyHqSpacing::default()
                    },
                    ..EnemyItemRules::default()
                },
                ..EnemyItemRuleset::default()
            },
        );
        config.failure_policy = FailurePolicyConfig::uniform(FailurePolicy::InstantBackTrack);
        config.budget.max_total_attempts = 12;

        let mut generator = generator(config);
        let error = generator.execute_all_steps().expect_err("never satisfiable");
        assert!(matches!(
            error,
            CampaignError::RetryBudgetExhausted {
                step: GenerationStep::EnemyObjectsPlaced,
                total_attempts: 13,
                ..
            }
        ));
        assert_eq!(generator.step(), GenerationStep::EnemyWallPlaced);
        assert!(generator.state().enemy_items.values().all(|item| *item == EnemyItemType::EnemyWall));
    }

    #[test]
    fn test_exhaustion_discards_a_partially_placed_step() {
        let mut config = line_config();
        config.counts.base_enemy_items.insert(EnemyItemType::Outpost, 1);
        config.counts.base_enemy_items.insert(EnemyItemType::Factory, 1);
        config.enemy_items.rules_by_item.insert(
            EnemyItemType::Factory,
            EnemyItemRuleset {
                base_rules: EnemyItemRules {
                    enemy_hq_spacing: crate::rules::EnemyHqSpacing {
                        min_hops_from_enemy_hq: 50,
                        ..crate::rules::EnemyHqSpacing::default()
                    },
                    ..EnemyItemRules::default()
                },
                ..EnemyItemRuleset::default()
            },
        );
        config.failure_policy = FailurePolicyConfig::uniform(FailurePolicy::InstantBackTrack);
        config.budget.max_total_attempts = 12;

        let mut generator = generator(config);
        let error = generator.execute_all_steps().expect_err("factory is never placeable");

        assert!(matches!(
            error,
            CampaignError::RetryBudgetExhausted {
                step: GenerationStep::EnemyObjectsPlaced,
                ..
            }
        ));
        assert_eq!(generator.step(), GenerationStep::EnemyWallPlaced);
        assert_eq!(generator.transactions().trailing_micro(GenerationStep::EnemyObjectsPlaced), 0);
        assert!(generator.state().enemy_items.values().all(|item| *item == EnemyItemType::EnemyWall));
        assert_eq!(
            generator.world().live_count(),
            generator.graph().connection_count() + generator.state().item_count()
        );
    }

    #[test]
    fn test_erase_is_idempotent() {
        let mut generator = generator(line_config());
        let pristine = generator.state_hash();
        generator.erase_all_generation();
        assert_eq!(generator.state_hash(), pristine);

        generator.execute_all_steps().expect("satisfiable");
        generator.erase_all_generation();
        assert_eq!(generator.step(), GenerationStep::NotStarted);
        assert_eq!(generator.world().live_count(), 0);
        assert!(generator.transactions().is_empty());
        assert_eq!(generator.state_hash(), pristine);

        generator.erase_all_generation();
        assert_eq!(generator.state_hash(), pristine);
    }
}
