#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Per-kind robot behaviour rules.
//!
//! Behaviour is advisory: each robot proposes a [`MoveIntent`] from its own
//! snapshot and the tick scheduler decides how much of it is legal.

use sokobots_core::{ControllerCommand, MoveIntent, RobotId, RobotKind, RobotSnapshot};

/// Intent proposed by a single robot for the current tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Proposal {
    /// Robot that made the proposal.
    pub robot: RobotId,
    /// Requested action.
    pub intent: MoveIntent,
}

/// Returns the action the robot asks for this tick.
#[must_use]
pub fn propose_move(robot: &RobotSnapshot) -> MoveIntent {
    match robot.kind {
        RobotKind::Worker => MoveIntent::StepForward,
        RobotKind::Controller { command } => match command {
            ControllerCommand::RotateCw => MoveIntent::Rotate(robot.facing.clockwise()),
            ControllerCommand::RotateCcw => MoveIntent::Rotate(robot.facing.counter_clockwise()),
            ControllerCommand::Boost => MoveIntent::DoubleStepForward,
        },
    }
}

/// Collects proposals for every robot, preserving the iteration order.
pub fn collect_proposals<'a, I>(robots: I, out: &mut Vec<Proposal>)
where
    I: IntoIterator<Item = &'a RobotSnapshot>,
{
    out.clear();
    out.extend(robots.into_iter().map(|robot| Proposal {
        robot: robot.id,
        intent: propose_move(robot),
    }));
}
