#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure win/loss evaluation over the world state.

use sokobots_core::{CellCoord, SimulationOutcome};
use sokobots_world::{query, World};

/// Counts ticks taken against an optional step budget.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StepLedger {
    steps_taken: u64,
    budget: Option<u64>,
}

impl StepLedger {
    /// Creates a ledger with no steps taken.
    #[must_use]
    pub const fn new(budget: Option<u64>) -> Self {
        Self {
            steps_taken: 0,
            budget,
        }
    }

    /// Creates a ledger for a freshly loaded world.
    ///
    /// The level's own budget takes precedence over `default_budget`.
    #[must_use]
    pub fn for_world(world: &World, default_budget: Option<u64>) -> Self {
        Self::new(query::step_budget(world).or(default_budget))
    }

    /// Records one committed tick.
    pub fn record_step(&mut self) {
        self.steps_taken = self.steps_taken.saturating_add(1);
    }

    /// Number of ticks committed so far.
    #[must_use]
    pub const fn steps_taken(&self) -> u64 {
        self.steps_taken
    }

    /// Step budget in force, if any.
    #[must_use]
    pub const fn budget(&self) -> Option<u64> {
        self.budget
    }

    /// Reports whether every budgeted step has been used.
    #[must_use]
    pub fn exhausted(&self) -> bool {
        self.budget
            .is_some_and(|budget| self.steps_taken >= budget)
    }
}

/// Classifies the world as ongoing, won or lost.
///
/// A win takes precedence over an exhausted budget.
#[must_use]
pub fn evaluate(world: &World, ledger: &StepLedger) -> SimulationOutcome {
    if targets_covered(world) {
        SimulationOutcome::Won
    } else if ledger.exhausted() {
        SimulationOutcome::Lost
    } else {
        SimulationOutcome::Ongoing
    }
}

fn targets_covered(world: &World) -> bool {
    let boxes: Vec<CellCoord> = query::boxes(world)
        .into_iter()
        .map(|state| state.cell)
        .collect();
    query::targets(world)
        .iter()
        .all(|target| boxes.contains(target))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ledger_without_budget_never_exhausts() {
        let mut ledger = StepLedger::new(None);
        for _ in 0..100 {
            ledger.record_step();
        }
        assert_eq!(ledger.steps_taken(), 100);
        assert!(!ledger.exhausted());
    }

    #[test]
    fn ledger_exhausts_at_budget() {
        let mut ledger = StepLedger::new(Some(2));
        ledger.record_step();
        assert!(!ledger.exhausted());
        ledger.record_step();
        assert!(ledger.exhausted());
    }

    #[test]
    fn empty_world_without_targets_is_won() {
        let world = World::new();
        assert_eq!(
            evaluate(&world, &StepLedger::default()),
            SimulationOutcome::Won
        );
    }
}
