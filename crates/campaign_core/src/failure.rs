//! Rule relaxation and backtrack escalation.
//!
//! These are pure functions of the failure policy and attempt counters; the
//! generator applies the decisions.

use crate::rules::{FailurePolicy, MAX_RELAXATION_ATTEMPTS};
use crate::step::GenerationStep;

/// Which rule groups are loosened for the current attempt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelaxationState {
    /// Hop and world-distance bands from HQs are opened up.
    pub relax_distance: bool,
    /// Spacing bands between items are opened up.
    pub relax_spacing: bool,
    /// Soft preferences are ignored.
    pub relax_preference: bool,
}

impl RelaxationState {
    /// Relaxation for `attempt` under `policy`.
    ///
    /// Only `BreakDistanceRulesThenBackTrack` relaxes anything: attempt 1
    /// loosens distance, attempt 2 spacing, later attempts both.
    #[must_use]
    pub const fn for_attempt(policy: FailurePolicy, attempt: u32) -> Self {
        if !matches!(policy, FailurePolicy::BreakDistanceRulesThenBackTrack) {
            return Self {
                relax_distance: false,
                relax_spacing: false,
                relax_preference: false,
            };
        }
        let (relax_distance, relax_spacing) = match attempt {
            0 => (false, false),
            1 => (true, false),
            2 => (false, true),
            _ => (true, true),
        };
        Self {
            relax_distance,
            relax_spacing,
            relax_preference: relax_distance || relax_spacing,
        }
    }

    /// Whether anything is relaxed.
    #[must_use]
    pub const fn is_relaxed(self) -> bool {
        self.relax_distance || self.relax_spacing
    }
}

/// What the generator does after a failed step attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recovery {
    /// Undo this many trailing micro-transactions of the failed step and
    /// retry it.
    UndoMicro(usize),
    /// Retry the failed step in place with relaxed rules.
    RetryRelaxed,
    /// Pop this many transactions and resume after the restored step.
    Backtrack(usize),
}

/// Decide how to recover from a failure of `step` on its `attempt`-th
/// failed attempt (counted from one).
#[must_use]
pub fn plan_recovery(
    step: GenerationStep,
    policy: FailurePolicy,
    attempt: u32,
    trailing_micro: usize,
    escalation_window: u32,
) -> Recovery {
    if step.uses_micro_transactions() && trailing_micro > 0 {
        return Recovery::UndoMicro(micro_undo_depth(attempt, trailing_micro, escalation_window));
    }

    let relaxing = policy == FailurePolicy::BreakDistanceRulesThenBackTrack;
    if relaxing && attempt <= MAX_RELAXATION_ATTEMPTS {
        return Recovery::RetryRelaxed;
    }

    let adjusted = if relaxing {
        attempt.saturating_sub(MAX_RELAXATION_ATTEMPTS)
    } else {
        attempt
    };
    let earlier = step.earlier_step_count();
    let extra = (adjusted.saturating_sub(1) as usize).min(earlier);
    Recovery::Backtrack(extra + 1)
}

/// Micro-transactions to undo: one more for every full escalation window of
/// failed attempts, never more than exist.
#[must_use]
pub fn micro_undo_depth(attempt: u32, trailing_micro: usize, escalation_window: u32) -> usize {
    let window = escalation_window.max(1);
    let depth = 1 + (attempt / window) as usize;
    depth.clamp(1, trailing_micro.max(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relaxation_schedule() {
        let policy = FailurePolicy::BreakDistanceRulesThenBackTrack;
        assert!(!RelaxationState::for_attempt(policy, 0).is_relaxed());

        let first = RelaxationState::for_attempt(policy, 1);
        assert!(first.relax_distance && !first.relax_spacing && first.relax_preference);

        let second = RelaxationState::for_attempt(policy, 2);
        assert!(!second.relax_distance && second.relax_spacing);

        let later = RelaxationState::for_attempt(policy, 9);
        assert!(later.relax_distance && later.relax_spacing);

        assert_eq!(
            RelaxationState::for_attempt(FailurePolicy::InstantBackTrack, 5),
            RelaxationState::default()
        );
    }

    #[test]
    fn test_micro_failures_undo_micro_first() {
        let recovery = plan_recovery(
            GenerationStep::MissionsPlaced,
            FailurePolicy::InstantBackTrack,
            1,
            3,
            32,
        );
        assert_eq!(recovery, Recovery::UndoMicro(1));
        assert_eq!(micro_undo_depth(64, 3, 32), 3);
        assert_eq!(micro_undo_depth(64, 2, 32), 2);
        assert_eq!(micro_undo_depth(31, 5, 32), 1);
    }

    #[test]
    fn test_backtrack_depth_grows_with_attempts() {
        let step = GenerationStep::EnemyWallPlaced;
        let policy = FailurePolicy::InstantBackTrack;
        assert_eq!(plan_recovery(step, policy, 1, 0, 32), Recovery::Backtrack(1));
        assert_eq!(plan_recovery(step, policy, 3, 0, 32), Recovery::Backtrack(3));
        // Three earlier steps cap the extra depth.
        assert_eq!(plan_recovery(step, policy, 50, 0, 32), Recovery::Backtrack(4));
    }

    #[test]
    fn test_relaxing_policy_retries_in_place_first() {
        let step = GenerationStep::NeutralObjectsPlaced;
        let policy = FailurePolicy::BreakDistanceRulesThenBackTrack;
        assert_eq!(plan_recovery(step, policy, 3, 0, 32), Recovery::RetryRelaxed);
        assert_eq!(plan_recovery(step, policy, 4, 0, 32), Recovery::Backtrack(1));
        assert_eq!(plan_recovery(step, policy, 6, 0, 32), Recovery::Backtrack(3));
    }
}
