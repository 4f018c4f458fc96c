#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state management for Sokobots.
//!
//! The [`World`] owns grid occupancy. It is created from a
//! [`LevelDescription`], mutated only through [`apply`], and read through the
//! [`query`] module. Every mutation is validated here; systems never touch
//! occupancy directly.

mod level;

use std::collections::HashSet;

use sokobots_core::{
    BoxId, CellCoord, Command, Direction, Entity, Event, LoadError, Occupant, RobotId, RobotKind,
    RobotSpawn, SpawnError, TickPlan, TickRejection,
};
use tracing::debug;

pub use level::{LevelDescription, LevelEntities, RobotPlacement};

const DEFAULT_GRID_WIDTH: u32 = 10;
const DEFAULT_GRID_HEIGHT: u32 = 10;

/// Largest number of cells a loaded level may declare.
pub const MAX_GRID_CELLS: u64 = 1 << 20;

/// Represents the authoritative Sokobots world state.
#[derive(Clone, Debug)]
pub struct World {
    name: Option<String>,
    width: u32,
    height: u32,
    walls: Vec<CellCoord>,
    targets: Vec<CellCoord>,
    boxes: Vec<BoxState>,
    robots: Vec<Robot>,
    step_budget: Option<u64>,
    occupancy: OccupancyGrid,
    next_robot_id: u32,
}

impl World {
    /// Creates an empty 10x10 world, used until a level is loaded.
    #[must_use]
    pub fn new() -> Self {
        Self::blank(None, DEFAULT_GRID_WIDTH, DEFAULT_GRID_HEIGHT, None)
    }

    /// Builds a world from a level description, validating every placement.
    pub fn load(level: &LevelDescription) -> Result<Self, LoadError> {
        if level.width == 0 || level.height == 0 {
            return Err(LoadError::Malformed(format!(
                "grid dimensions must be positive, got {}x{}",
                level.width, level.height
            )));
        }
        let cells = u64::from(level.width) * u64::from(level.height);
        if cells > MAX_GRID_CELLS {
            return Err(LoadError::Malformed(format!(
                "grid of {}x{} has {cells} cells, limit is {MAX_GRID_CELLS}",
                level.width, level.height
            )));
        }

        let mut world = Self::blank(
            level.name.clone(),
            level.width,
            level.height,
            level.max_steps,
        );

        for position in &level.entities.walls {
            let cell = world.admit(*position, Entity::Wall)?;
            world.occupancy.occupy(cell, Occupant::Wall);
            world.walls.push(cell);
        }

        for position in &level.entities.boxes {
            let cell = world.admit(*position, Entity::Box)?;
            let id = BoxId::new(next_id(world.boxes.len()));
            world.occupancy.occupy(cell, Occupant::Box(id));
            world.boxes.push(BoxState { id, cell });
        }

        for position in &level.entities.targets {
            let cell = world
                .cell_for(*position)
                .ok_or(LoadError::OutOfBounds {
                    entity: Entity::Target,
                    position: *position,
                })?;
            if world.occupancy.at(cell) == Some(Occupant::Wall) {
                return Err(LoadError::Overlap {
                    cell,
                    existing: Entity::Wall,
                    incoming: Entity::Target,
                });
            }
            if world.targets.contains(&cell) {
                return Err(LoadError::Overlap {
                    cell,
                    existing: Entity::Target,
                    incoming: Entity::Target,
                });
            }
            world.targets.push(cell);
        }

        for placement in &level.entities.robots {
            let kind = RobotKind::from_parts(placement.class, placement.command).ok_or_else(|| {
                LoadError::Malformed(format!(
                    "{} robot at {} has an invalid command {:?}",
                    placement.class,
                    placement.position(),
                    placement.command
                ))
            })?;
            let cell = world.admit(placement.position(), Entity::Robot)?;
            let _ = world.insert_robot(kind, cell, placement.dir);
        }

        Ok(world)
    }

    fn blank(name: Option<String>, width: u32, height: u32, step_budget: Option<u64>) -> Self {
        Self {
            name,
            width,
            height,
            walls: Vec::new(),
            targets: Vec::new(),
            boxes: Vec::new(),
            robots: Vec::new(),
            step_budget,
            occupancy: OccupancyGrid::new(width, height),
            next_robot_id: 1,
        }
    }

    fn cell_for(&self, position: sokobots_core::Position) -> Option<CellCoord> {
        CellCoord::from_position(position, self.width, self.height)
    }

    /// Validates a load-time placement of a blocking entity.
    fn admit(
        &self,
        position: sokobots_core::Position,
        entity: Entity,
    ) -> Result<CellCoord, LoadError> {
        let cell = self
            .cell_for(position)
            .ok_or(LoadError::OutOfBounds { entity, position })?;
        match self.occupancy.at(cell).and_then(entity_of) {
            None => Ok(cell),
            Some(existing) => Err(LoadError::Overlap {
                cell,
                existing,
                incoming: entity,
            }),
        }
    }

    fn insert_robot(&mut self, kind: RobotKind, cell: CellCoord, facing: Direction) -> RobotId {
        let id = RobotId::new(self.next_robot_id);
        self.next_robot_id = self.next_robot_id.saturating_add(1);
        self.occupancy.occupy(cell, Occupant::Robot(id));
        self.robots.push(Robot {
            id,
            kind,
            cell,
            facing,
        });
        id
    }

    fn robot_index(&self, robot: RobotId) -> Option<usize> {
        self.robots.iter().position(|candidate| candidate.id == robot)
    }

    fn box_index(&self, id: BoxId) -> Option<usize> {
        self.boxes.iter().position(|candidate| candidate.id == id)
    }

    fn validate_plan(&self, plan: &TickPlan) -> Result<(), TickRejection> {
        let mut robot_cells: Vec<CellCoord> = self.robots.iter().map(|robot| robot.cell).collect();
        let mut box_cells: Vec<CellCoord> = self.boxes.iter().map(|state| state.cell).collect();

        for update in &plan.robots {
            let index = self
                .robot_index(update.robot)
                .ok_or(TickRejection::UnknownRobot(update.robot))?;
            if let Some(slot) = robot_cells.get_mut(index) {
                *slot = update.cell;
            }
        }

        for update in &plan.boxes {
            let index = self
                .box_index(update.id)
                .ok_or(TickRejection::UnknownBox(update.id))?;
            if let Some(slot) = box_cells.get_mut(index) {
                *slot = update.cell;
            }
        }

        let mut claimed: HashSet<CellCoord> = HashSet::with_capacity(robot_cells.len() + box_cells.len());
        for cell in robot_cells.iter().chain(box_cells.iter()) {
            match self.occupancy.at(*cell) {
                None => return Err(TickRejection::OutOfBounds(*cell)),
                Some(Occupant::Wall) => return Err(TickRejection::EntersWall(*cell)),
                Some(_) => {}
            }
            if !claimed.insert(*cell) {
                return Err(TickRejection::Collision(*cell));
            }
        }

        Ok(())
    }

    fn commit(&mut self, plan: TickPlan, out_events: &mut Vec<Event>) {
        if let Err(reason) = self.validate_plan(&plan) {
            debug!(%reason, "tick plan rejected");
            out_events.push(Event::TickRejected { reason });
            return;
        }

        let mut robots_moved = 0;
        for update in plan.robots {
            let Some(index) = self.robot_index(update.robot) else {
                continue;
            };
            let robot = &mut self.robots[index];
            if robot.cell != update.cell {
                out_events.push(Event::RobotMoved {
                    robot: robot.id,
                    from: robot.cell,
                    to: update.cell,
                });
                robot.cell = update.cell;
                robots_moved += 1;
            }
            if robot.facing != update.facing {
                robot.facing = update.facing;
                out_events.push(Event::RobotTurned {
                    robot: robot.id,
                    facing: update.facing,
                });
            }
        }

        let mut boxes_moved = 0;
        for update in plan.boxes {
            let Some(index) = self.box_index(update.id) else {
                continue;
            };
            let state = &mut self.boxes[index];
            if state.cell != update.cell {
                out_events.push(Event::BoxPushed {
                    id: state.id,
                    from: state.cell,
                    to: update.cell,
                });
                state.cell = update.cell;
                boxes_moved += 1;
            }
        }

        self.occupancy.fill_with(&self.walls, &self.boxes, &self.robots);
        out_events.push(Event::TickCommitted {
            robots_moved,
            boxes_moved,
        });
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

/// Places a new robot, leaving the world untouched when the request is invalid.
pub fn spawn(world: &mut World, spawn: RobotSpawn) -> Result<RobotId, SpawnError> {
    let kind = RobotKind::from_parts(spawn.class, spawn.command).ok_or(
        SpawnError::InvalidCommand {
            class: spawn.class,
            command: spawn.command,
        },
    )?;
    let cell = world
        .cell_for(spawn.position)
        .ok_or(SpawnError::OutOfBounds(spawn.position))?;
    match world.occupancy.at(cell) {
        Some(Occupant::Empty) => {}
        Some(occupant) => return Err(SpawnError::Occupied { cell, occupant }),
        None => return Err(SpawnError::OutOfBounds(spawn.position)),
    }

    let robot = world.insert_robot(kind, cell, spawn.facing);
    debug!(robot = robot.get(), %cell, class = %spawn.class, "robot spawned");
    Ok(robot)
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::SpawnRobot { spawn: request } => match spawn(world, request) {
            Ok(robot) => {
                let cell = world
                    .robot_index(robot)
                    .map(|index| world.robots[index].cell);
                if let Some(cell) = cell {
                    out_events.push(Event::RobotSpawned { robot, cell });
                }
            }
            Err(reason) => out_events.push(Event::SpawnRejected { reason }),
        },
        Command::CommitTick { plan } => world.commit(plan, out_events),
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use super::{OccupancyGrid, World};
    use sokobots_core::{
        BoxSnapshot, CellCoord, Occupant, RobotId, RobotSnapshot, WorldSnapshot,
    };

    /// Grid dimensions as `(width, height)`.
    #[must_use]
    pub fn dimensions(world: &World) -> (u32, u32) {
        (world.width, world.height)
    }

    /// Display name of the loaded level, if it has one.
    #[must_use]
    pub fn level_name(world: &World) -> Option<&str> {
        world.name.as_deref()
    }

    /// Step budget declared by the loaded level.
    #[must_use]
    pub fn step_budget(world: &World) -> Option<u64> {
        world.step_budget
    }

    /// Reports what occupies `cell`, or `None` when it lies outside the grid.
    #[must_use]
    pub fn occupant_at(world: &World, cell: CellCoord) -> Option<Occupant> {
        world.occupancy.at(cell)
    }

    /// Wall cells in level order.
    #[must_use]
    pub fn walls(world: &World) -> &[CellCoord] {
        &world.walls
    }

    /// Target cells in level order.
    #[must_use]
    pub fn targets(world: &World) -> &[CellCoord] {
        &world.targets
    }

    /// Boxes in identifier order.
    #[must_use]
    pub fn boxes(world: &World) -> Vec<BoxSnapshot> {
        world
            .boxes
            .iter()
            .map(|state| BoxSnapshot {
                id: state.id,
                cell: state.cell,
            })
            .collect()
    }

    /// Captures a read-only view of the robots in spawn order.
    #[must_use]
    pub fn robot_view(world: &World) -> RobotView {
        RobotView {
            snapshots: world
                .robots
                .iter()
                .map(|robot| RobotSnapshot {
                    id: robot.id,
                    kind: robot.kind,
                    cell: robot.cell,
                    facing: robot.facing,
                })
                .collect(),
        }
    }

    /// Looks up a single robot by identifier.
    #[must_use]
    pub fn robot(world: &World, id: RobotId) -> Option<RobotSnapshot> {
        robot_view(world).iter().find(|robot| robot.id == id).copied()
    }

    /// Captures the complete world state for clients.
    #[must_use]
    pub fn snapshot(world: &World) -> WorldSnapshot {
        WorldSnapshot {
            width: world.width,
            height: world.height,
            walls: world.walls.clone(),
            boxes: boxes(world),
            targets: world.targets.clone(),
            robots: robot_view(world).into_vec(),
        }
    }

    /// Exposes a read-only view of the dense occupancy grid.
    #[must_use]
    pub fn occupancy_view(world: &World) -> OccupancyView<'_> {
        OccupancyView {
            grid: &world.occupancy,
        }
    }

    /// Read-only snapshot describing all robots in spawn order.
    #[derive(Clone, Debug, Default)]
    pub struct RobotView {
        snapshots: Vec<RobotSnapshot>,
    }

    impl RobotView {
        /// Iterator over the captured robot snapshots in spawn order.
        pub fn iter(&self) -> impl Iterator<Item = &RobotSnapshot> {
            self.snapshots.iter()
        }

        /// Number of robots captured by the view.
        #[must_use]
        pub fn len(&self) -> usize {
            self.snapshots.len()
        }

        /// Reports whether the view holds no robots.
        #[must_use]
        pub fn is_empty(&self) -> bool {
            self.snapshots.is_empty()
        }

        /// Consumes the view, yielding the underlying snapshots.
        #[must_use]
        pub fn into_vec(self) -> Vec<RobotSnapshot> {
            self.snapshots
        }
    }

    /// Read-only view into the dense occupancy grid.
    #[derive(Clone, Copy, Debug)]
    pub struct OccupancyView<'a> {
        grid: &'a OccupancyGrid,
    }

    impl<'a> OccupancyView<'a> {
        /// Reports whether the cell exists and holds nothing.
        #[must_use]
        pub fn is_free(&self, cell: CellCoord) -> bool {
            self.grid.at(cell) == Some(Occupant::Empty)
        }

        /// Returns an iterator over all cells in row-major order.
        pub fn iter(&self) -> impl Iterator<Item = Occupant> + 'a {
            self.grid.cells.iter().copied()
        }

        /// Provides the dimensions of the underlying occupancy grid.
        #[must_use]
        pub fn dimensions(&self) -> (u32, u32) {
            (self.grid.width, self.grid.height)
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct BoxState {
    id: BoxId,
    cell: CellCoord,
}

#[derive(Clone, Copy, Debug)]
struct Robot {
    id: RobotId,
    kind: RobotKind,
    cell: CellCoord,
    facing: Direction,
}

#[derive(Clone, Debug)]
struct OccupancyGrid {
    width: u32,
    height: u32,
    cells: Vec<Occupant>,
}

impl OccupancyGrid {
    fn new(width: u32, height: u32) -> Self {
        let capacity_u64 = u64::from(width) * u64::from(height);
        let capacity = usize::try_from(capacity_u64).unwrap_or(0);
        Self {
            width,
            height,
            cells: vec![Occupant::Empty; capacity],
        }
    }

    fn fill_with(&mut self, walls: &[CellCoord], boxes: &[BoxState], robots: &[Robot]) {
        self.cells.fill(Occupant::Empty);
        for wall in walls {
            self.occupy(*wall, Occupant::Wall);
        }
        for state in boxes {
            self.occupy(state.cell, Occupant::Box(state.id));
        }
        for robot in robots {
            self.occupy(robot.cell, Occupant::Robot(robot.id));
        }
    }

    fn at(&self, cell: CellCoord) -> Option<Occupant> {
        self.index(cell)
            .and_then(|index| self.cells.get(index).copied())
    }

    fn occupy(&mut self, cell: CellCoord, occupant: Occupant) {
        if let Some(index) = self.index(cell) {
            if let Some(slot) = self.cells.get_mut(index) {
                *slot = occupant;
            }
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

fn entity_of(occupant: Occupant) -> Option<Entity> {
    match occupant {
        Occupant::Empty => None,
        Occupant::Wall => Some(Entity::Wall),
        Occupant::Box(_) => Some(Entity::Box),
        Occupant::Robot(_) => Some(Entity::Robot),
    }
}

fn next_id(len: usize) -> u32 {
    u32::try_from(len).map_or(u32::MAX, |value| value.saturating_add(1))
}
