#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deterministic tick scheduler that resolves robot proposals into moves.
//!
//! Proposals are resolved one robot at a time in spawn order against a
//! scratch copy of the occupancy grid, so an earlier robot's move is already
//! visible to every later robot in the same tick. The resolved moves are then
//! submitted to the world as a single [`Command::CommitTick`].

use sokobots_core::{
    BoxSnapshot, BoxUpdate, CellCoord, Command, Direction, Event, MoveIntent, Occupant,
    RobotSnapshot, RobotUpdate, TickPlan, TickRejection,
};
use sokobots_system_behavior::{collect_proposals, Proposal};
use sokobots_world::{self as world, query, World};
use tracing::{debug, warn};

/// Summary of a single committed tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Robots whose cell changed.
    pub robots_moved: usize,
    /// Robots whose facing changed.
    pub robots_turned: usize,
    /// Boxes pushed into a new cell.
    pub boxes_pushed: usize,
    /// Set when the world refused the resolved plan.
    pub rejected: Option<TickRejection>,
}

impl TickReport {
    /// Reports whether nothing changed during the tick.
    #[must_use]
    pub fn is_stalled(&self) -> bool {
        self.robots_moved == 0 && self.robots_turned == 0 && self.boxes_pushed == 0
    }
}

/// Resolves and commits ticks, reusing its scratch buffers between calls.
#[derive(Debug, Default)]
pub struct Scheduler {
    proposals: Vec<Proposal>,
    robots: Vec<RobotSnapshot>,
    boxes: Vec<BoxSnapshot>,
    grid: ScratchGrid,
}

impl Scheduler {
    /// Resolves every robot proposal against the current world without mutating it.
    pub fn plan(&mut self, world: &World) -> TickPlan {
        let initial_robots = query::robot_view(world).into_vec();
        let initial_boxes = query::boxes(world);

        self.robots.clear();
        self.robots.extend_from_slice(&initial_robots);
        self.boxes.clear();
        self.boxes.extend_from_slice(&initial_boxes);
        self.grid.load(query::occupancy_view(world));
        collect_proposals(&initial_robots, &mut self.proposals);

        for (index, proposal) in self.proposals.iter().enumerate() {
            let Some(robot) = self.robots.get_mut(index) else {
                continue;
            };
            match proposal.intent {
                MoveIntent::Stay => {}
                MoveIntent::Rotate(facing) => robot.facing = facing,
                MoveIntent::StepForward => {
                    let _ = self.grid.advance(robot, &mut self.boxes);
                }
                MoveIntent::DoubleStepForward => {
                    if self.grid.advance(robot, &mut self.boxes) {
                        let _ = self.grid.advance(robot, &mut self.boxes);
                    }
                }
            }
        }

        let robots = initial_robots
            .iter()
            .zip(&self.robots)
            .filter(|(before, after)| before.cell != after.cell || before.facing != after.facing)
            .map(|(_, after)| RobotUpdate {
                robot: after.id,
                cell: after.cell,
                facing: after.facing,
            })
            .collect();
        let boxes = initial_boxes
            .iter()
            .zip(&self.boxes)
            .filter(|(before, after)| before.cell != after.cell)
            .map(|(_, after)| BoxUpdate {
                id: after.id,
                cell: after.cell,
            })
            .collect();

        TickPlan { robots, boxes }
    }

    /// Advances the world by exactly one tick.
    ///
    /// World events produced by the commit are appended to `out_events`.
    pub fn step(&mut self, world: &mut World, out_events: &mut Vec<Event>) -> TickReport {
        let plan = self.plan(world);
        let first_event = out_events.len();
        world::apply(world, Command::CommitTick { plan }, out_events);

        let mut report = TickReport::default();
        for event in &out_events[first_event..] {
            match event {
                Event::RobotMoved { .. } => report.robots_moved += 1,
                Event::RobotTurned { .. } => report.robots_turned += 1,
                Event::BoxPushed { .. } => report.boxes_pushed += 1,
                Event::TickRejected { reason } => report.rejected = Some(*reason),
                _ => {}
            }
        }

        if let Some(reason) = report.rejected {
            warn!(%reason, "world refused resolved tick");
        } else if report.is_stalled() {
            debug!("tick stalled, no robot moved or turned");
        } else {
            debug!(
                robots_moved = report.robots_moved,
                robots_turned = report.robots_turned,
                boxes_pushed = report.boxes_pushed,
                "tick committed"
            );
        }

        report
    }
}

#[derive(Debug, Default)]
struct ScratchGrid {
    width: u32,
    height: u32,
    cells: Vec<Occupant>,
}

impl ScratchGrid {
    fn load(&mut self, view: query::OccupancyView<'_>) {
        let (width, height) = view.dimensions();
        self.width = width;
        self.height = height;
        self.cells.clear();
        self.cells.extend(view.iter());
    }

    /// Moves the robot one cell along its facing, pushing a single box.
    ///
    /// Returns `false` and leaves everything untouched when the unit step is blocked.
    fn advance(&mut self, robot: &mut RobotSnapshot, boxes: &mut [BoxSnapshot]) -> bool {
        let Some(destination) = self.neighbour(robot.cell, robot.facing) else {
            return false;
        };

        match self.at(destination) {
            Some(Occupant::Empty) => {}
            Some(Occupant::Box(id)) => {
                let Some(beyond) = self.neighbour(destination, robot.facing) else {
                    return false;
                };
                if self.at(beyond) != Some(Occupant::Empty) {
                    return false;
                }
                let Some(pushed) = boxes.iter_mut().find(|state| state.id == id) else {
                    return false;
                };
                pushed.cell = beyond;
                self.set(beyond, Occupant::Box(id));
                self.set(destination, Occupant::Empty);
            }
            Some(Occupant::Wall | Occupant::Robot(_)) | None => return false,
        }

        self.set(robot.cell, Occupant::Empty);
        self.set(destination, Occupant::Robot(robot.id));
        robot.cell = destination;
        true
    }

    fn neighbour(&self, cell: CellCoord, facing: Direction) -> Option<CellCoord> {
        cell.step(facing, self.width, self.height)
    }

    fn at(&self, cell: CellCoord) -> Option<Occupant> {
        self.index(cell)
            .and_then(|index| self.cells.get(index).copied())
    }

    fn set(&mut self, cell: CellCoord, occupant: Occupant) {
        if let Some(slot) = self.index(cell).and_then(|index| self.cells.get_mut(index)) {
            *slot = occupant;
        }
    }

    fn index(&self, cell: CellCoord) -> Option<usize> {
        if cell.x() < self.width && cell.y() < self.height {
            let row = usize::try_from(cell.y()).ok()?;
            let column = usize::try_from(cell.x()).ok()?;
            let width = usize::try_from(self.width).ok()?;
            Some(row * width + column)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sokobots_core::{BoxId, RobotId};
    use sokobots_world::LevelDescription;

    fn world_from(json: &str) -> World {
        let level = LevelDescription::from_json(json).expect("level decodes");
        World::load(&level).expect("level loads")
    }

    #[test]
    fn plan_does_not_mutate_world() {
        let world = world_from(
            r#"{"width": 3, "height": 1, "boxes": [[1, 0]],
                "robots": [{"type": "worker", "x": 0, "y": 0, "dir": "right"}]}"#,
        );
        let before = query::snapshot(&world);

        let plan = Scheduler::default().plan(&world);

        assert_eq!(query::snapshot(&world), before);
        assert_eq!(
            plan.robots,
            vec![RobotUpdate {
                robot: RobotId::new(1),
                cell: CellCoord::new(1, 0),
                facing: Direction::Right,
            }]
        );
        assert_eq!(
            plan.boxes,
            vec![BoxUpdate {
                id: BoxId::new(1),
                cell: CellCoord::new(2, 0),
            }]
        );
    }

    #[test]
    fn blocked_robots_are_left_out_of_plan() {
        let world = world_from(
            r#"{"width": 2, "height": 1,
                "robots": [{"type": "worker", "x": 1, "y": 0, "dir": "right"}]}"#,
        );
        assert!(Scheduler::default().plan(&world).is_empty());
    }

    #[test]
    fn stalled_tick_reports_no_changes() {
        let mut world = world_from(
            r#"{"width": 1, "height": 1,
                "robots": [{"type": "worker", "x": 0, "y": 0}]}"#,
        );
        let mut events = Vec::new();
        let report = Scheduler::default().step(&mut world, &mut events);

        assert!(report.is_stalled());
        assert_eq!(report.rejected, None);
        assert_eq!(
            events,
            vec![Event::TickCommitted {
                robots_moved: 0,
                boxes_moved: 0,
            }]
        );
    }
}
