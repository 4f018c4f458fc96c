#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Sokobots engine.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative world, and pure systems. Systems read immutable snapshots and
//! answer with [`Command`] values describing desired mutations, the world
//! executes those commands via its `apply` entry point, and then reports the
//! outcome through [`Event`] values. Wire-facing snapshot types live here as
//! well so every adapter encodes the same payload shape.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Commands that express all permissible world mutations after a level is loaded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Requests that a new robot be placed into the world.
    SpawnRobot {
        /// Description of the robot to create.
        spawn: RobotSpawn,
    },
    /// Requests that a fully resolved tick be committed atomically.
    CommitTick {
        /// Robot and box updates computed by the tick scheduler.
        plan: TickPlan,
    },
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    /// Confirms that a robot was created.
    RobotSpawned {
        /// Identifier assigned to the new robot.
        robot: RobotId,
        /// Cell the robot occupies after spawning.
        cell: CellCoord,
    },
    /// Reports that a spawn request was rejected and the world left unchanged.
    SpawnRejected {
        /// Specific reason the spawn failed.
        reason: SpawnError,
    },
    /// Confirms that a robot moved between two cells during a tick.
    RobotMoved {
        /// Identifier of the robot that moved.
        robot: RobotId,
        /// Cell the robot occupied before the tick.
        from: CellCoord,
        /// Cell the robot occupies after the tick.
        to: CellCoord,
    },
    /// Confirms that a robot changed its facing during a tick.
    RobotTurned {
        /// Identifier of the robot that turned.
        robot: RobotId,
        /// Facing after the tick.
        facing: Direction,
    },
    /// Confirms that a box was pushed during a tick.
    BoxPushed {
        /// Identifier of the pushed box.
        id: BoxId,
        /// Cell the box occupied before the tick.
        from: CellCoord,
        /// Cell the box occupies after the tick.
        to: CellCoord,
    },
    /// Announces that a tick was committed.
    TickCommitted {
        /// Number of robots whose cell changed.
        robots_moved: usize,
        /// Number of boxes whose cell changed.
        boxes_moved: usize,
    },
    /// Reports that a tick plan violated a world invariant and was discarded.
    TickRejected {
        /// Specific reason the plan was refused.
        reason: TickRejection,
    },
}

/// Cardinal directions a robot may face.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Toward decreasing `y`.
    #[default]
    Up,
    /// Toward increasing `y`.
    Down,
    /// Toward decreasing `x`.
    Left,
    /// Toward increasing `x`.
    Right,
}

impl Direction {
    /// Every direction in clockwise order starting from [`Direction::Up`].
    pub const CLOCKWISE: [Direction; 4] = [Self::Up, Self::Right, Self::Down, Self::Left];

    /// Cyclic neighbour when turning clockwise (up, right, down, left, up).
    #[must_use]
    pub const fn clockwise(self) -> Self {
        match self {
            Self::Up => Self::Right,
            Self::Right => Self::Down,
            Self::Down => Self::Left,
            Self::Left => Self::Up,
        }
    }

    /// Cyclic neighbour when turning counter-clockwise.
    #[must_use]
    pub const fn counter_clockwise(self) -> Self {
        match self {
            Self::Up => Self::Left,
            Self::Left => Self::Down,
            Self::Down => Self::Right,
            Self::Right => Self::Up,
        }
    }

    /// Lowercase wire name of the direction.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
            Self::Left => "left",
            Self::Right => "right",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unique identifier assigned to a robot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RobotId(u32);

impl RobotId {
    /// Creates a new robot identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for RobotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "robot #{}", self.0)
    }
}

/// Identifier assigned to a box, stable for the lifetime of the level.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BoxId(u32);

impl BoxId {
    /// Creates a new box identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for BoxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "box #{}", self.0)
    }
}

/// Location of a single grid cell that is known to lie inside the grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellCoord {
    x: u32,
    y: u32,
}

impl CellCoord {
    /// Creates a new grid cell coordinate.
    #[must_use]
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    /// Zero-based column index of the cell.
    #[must_use]
    pub const fn x(&self) -> u32 {
        self.x
    }

    /// Zero-based row index of the cell.
    #[must_use]
    pub const fn y(&self) -> u32 {
        self.y
    }

    /// Validates an unchecked position against the grid dimensions.
    #[must_use]
    pub fn from_position(position: Position, width: u32, height: u32) -> Option<Self> {
        let x = u32::try_from(position.x).ok()?;
        let y = u32::try_from(position.y).ok()?;
        (x < width && y < height).then_some(Self { x, y })
    }

    /// Returns the neighbouring cell in `direction`, or `None` when it would
    /// leave a grid of `width` by `height` cells.
    #[must_use]
    pub fn step(self, direction: Direction, width: u32, height: u32) -> Option<Self> {
        let (x, y) = match direction {
            Direction::Up => (self.x, self.y.checked_sub(1)?),
            Direction::Down => (self.x, self.y.checked_add(1)?),
            Direction::Left => (self.x.checked_sub(1)?, self.y),
            Direction::Right => (self.x.checked_add(1)?, self.y),
        };
        (x < width && y < height).then_some(Self { x, y })
    }
}

impl fmt::Display for CellCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

impl From<CellCoord> for Position {
    fn from(cell: CellCoord) -> Self {
        Position::new(i64::from(cell.x), i64::from(cell.y))
    }
}

/// Unchecked coordinate as supplied by level files and clients.
///
/// Deserializes from either an `[x, y]` pair or an `{"x": .., "y": ..}` object
/// and always serializes as an object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "PositionRepr")]
pub struct Position {
    /// Column offset, possibly negative or beyond the grid.
    pub x: i64,
    /// Row offset, possibly negative or beyond the grid.
    pub y: i64,
}

impl Position {
    /// Creates a new unchecked position.
    #[must_use]
    pub const fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PositionRepr {
    Pair(i64, i64),
    Object { x: i64, y: i64 },
}

impl From<PositionRepr> for Position {
    fn from(repr: PositionRepr) -> Self {
        match repr {
            PositionRepr::Pair(x, y) | PositionRepr::Object { x, y } => Self { x, y },
        }
    }
}

/// Robot families understood by the engine, without their per-kind data.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RobotClass {
    /// Robot that walks forward and pushes boxes.
    Worker,
    /// Robot that repeats a standing command every tick.
    Controller,
}

impl fmt::Display for RobotClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Worker => f.write_str("worker"),
            Self::Controller => f.write_str("controller"),
        }
    }
}

/// Standing command carried by a controller robot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControllerCommand {
    /// Turn clockwise every tick.
    RotateCw,
    /// Turn counter-clockwise every tick.
    RotateCcw,
    /// Advance up to two cells every tick.
    Boost,
}

impl fmt::Display for ControllerCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RotateCw => f.write_str("rotate_cw"),
            Self::RotateCcw => f.write_str("rotate_ccw"),
            Self::Boost => f.write_str("boost"),
        }
    }
}

/// Closed set of robot kinds together with their per-kind data.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RobotKind {
    /// Walks forward every tick.
    Worker,
    /// Applies `command` every tick.
    Controller {
        /// Command fixed at spawn time.
        command: ControllerCommand,
    },
}

impl RobotKind {
    /// Combines a robot class with an optional command.
    ///
    /// Returns `None` when a worker is given a command or a controller is not.
    #[must_use]
    pub const fn from_parts(class: RobotClass, command: Option<ControllerCommand>) -> Option<Self> {
        match (class, command) {
            (RobotClass::Worker, None) => Some(Self::Worker),
            (RobotClass::Controller, Some(command)) => Some(Self::Controller { command }),
            _ => None,
        }
    }

    /// Class of the robot kind.
    #[must_use]
    pub const fn class(&self) -> RobotClass {
        match self {
            Self::Worker => RobotClass::Worker,
            Self::Controller { .. } => RobotClass::Controller,
        }
    }

    /// Standing command, present only for controllers.
    #[must_use]
    pub const fn command(&self) -> Option<ControllerCommand> {
        match self {
            Self::Worker => None,
            Self::Controller { command } => Some(*command),
        }
    }
}

/// Action a robot asks for during a tick, before legality is resolved.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MoveIntent {
    /// Remain in place.
    Stay,
    /// Advance one cell along the current facing.
    StepForward,
    /// Turn to face the provided direction.
    Rotate(Direction),
    /// Advance up to two cells along the current facing.
    DoubleStepForward,
}

/// Contents of a single grid cell as seen by collision checks.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Occupant {
    /// Nothing blocks the cell. Targets count as empty terrain.
    #[default]
    Empty,
    /// Impassable wall.
    Wall,
    /// A pushable box.
    Box(BoxId),
    /// A robot.
    Robot(RobotId),
}

impl fmt::Display for Occupant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => f.write_str("nothing"),
            Self::Wall => f.write_str("a wall"),
            Self::Box(id) => write!(f, "{id}"),
            Self::Robot(id) => write!(f, "{id}"),
        }
    }
}

/// Terminal state classification of a running level.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SimulationOutcome {
    /// Play continues.
    #[default]
    Ongoing,
    /// Every target holds a box.
    Won,
    /// The level can no longer be won.
    Lost,
}

impl SimulationOutcome {
    /// Reports whether the level reached a terminal state.
    #[must_use]
    pub const fn is_finished(self) -> bool {
        !matches!(self, Self::Ongoing)
    }

    /// Reports whether the level was won.
    #[must_use]
    pub const fn is_win(self) -> bool {
        matches!(self, Self::Won)
    }
}

/// Parameters describing a robot to place into the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RobotSpawn {
    /// Family of the requested robot.
    pub class: RobotClass,
    /// Requested cell, not yet validated against the grid.
    pub position: Position,
    /// Initial facing.
    pub facing: Direction,
    /// Standing command, required for controllers and forbidden for workers.
    pub command: Option<ControllerCommand>,
}

/// Immutable representation of a single robot used for queries and payloads.
///
/// Encoded as `{"id", "type", "x", "y", "dir", "command"}` on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "RobotRecord", try_from = "RobotRecord")]
pub struct RobotSnapshot {
    /// Unique identifier assigned to the robot.
    pub id: RobotId,
    /// Kind of the robot including its standing command.
    pub kind: RobotKind,
    /// Grid cell currently occupied by the robot.
    pub cell: CellCoord,
    /// Direction the robot currently faces.
    pub facing: Direction,
}

#[derive(Clone, Copy, Serialize, Deserialize)]
struct RobotRecord {
    id: RobotId,
    #[serde(rename = "type")]
    class: RobotClass,
    x: u32,
    y: u32,
    dir: Direction,
    #[serde(default)]
    command: Option<ControllerCommand>,
}

impl From<RobotSnapshot> for RobotRecord {
    fn from(snapshot: RobotSnapshot) -> Self {
        Self {
            id: snapshot.id,
            class: snapshot.kind.class(),
            x: snapshot.cell.x(),
            y: snapshot.cell.y(),
            dir: snapshot.facing,
            command: snapshot.kind.command(),
        }
    }
}

impl TryFrom<RobotRecord> for RobotSnapshot {
    type Error = String;

    fn try_from(record: RobotRecord) -> Result<Self, Self::Error> {
        let kind = RobotKind::from_parts(record.class, record.command).ok_or_else(|| {
            format!(
                "{} robot cannot carry command {:?}",
                record.class, record.command
            )
        })?;
        Ok(Self {
            id: record.id,
            kind,
            cell: CellCoord::new(record.x, record.y),
            facing: record.dir,
        })
    }
}

/// Immutable representation of a single box.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoxSnapshot {
    /// Identifier of the box.
    pub id: BoxId,
    /// Cell currently holding the box.
    #[serde(flatten)]
    pub cell: CellCoord,
}

/// Full read-only description of the world, as returned to clients.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    /// Number of columns.
    pub width: u32,
    /// Number of rows.
    pub height: u32,
    /// Wall cells in level order.
    pub walls: Vec<CellCoord>,
    /// Boxes in level order.
    pub boxes: Vec<BoxSnapshot>,
    /// Target cells in level order.
    pub targets: Vec<CellCoord>,
    /// Robots in spawn order.
    pub robots: Vec<RobotSnapshot>,
}

/// Final state of a robot after a resolved tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RobotUpdate {
    /// Robot being updated.
    pub robot: RobotId,
    /// Cell the robot ends the tick on.
    pub cell: CellCoord,
    /// Facing the robot ends the tick with.
    pub facing: Direction,
}

/// Final cell of a box after a resolved tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BoxUpdate {
    /// Box being moved.
    pub id: BoxId,
    /// Cell the box ends the tick on.
    pub cell: CellCoord,
}

/// Complete set of changes produced by resolving one tick.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TickPlan {
    /// Robots whose cell or facing changed, in spawn order.
    pub robots: Vec<RobotUpdate>,
    /// Boxes whose cell changed, in box order.
    pub boxes: Vec<BoxUpdate>,
}

impl TickPlan {
    /// Reports whether the plan changes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.robots.is_empty() && self.boxes.is_empty()
    }
}

/// Reasons the world may refuse a tick plan.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum TickRejection {
    /// The plan references a robot the world does not contain.
    #[error("{0} does not exist")]
    UnknownRobot(RobotId),
    /// The plan references a box the world does not contain.
    #[error("{0} does not exist")]
    UnknownBox(BoxId),
    /// The plan moves an entity outside the grid.
    #[error("cell {0} lies outside the grid")]
    OutOfBounds(CellCoord),
    /// The plan moves an entity onto a wall.
    #[error("cell {0} is a wall")]
    EntersWall(CellCoord),
    /// The plan leaves two entities on the same cell.
    #[error("cell {0} would hold two entities")]
    Collision(CellCoord),
}

/// Entity families that appear in level descriptions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Entity {
    /// Wall cell.
    Wall,
    /// Box.
    Box,
    /// Target cell.
    Target,
    /// Robot.
    Robot,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Wall => f.write_str("wall"),
            Self::Box => f.write_str("box"),
            Self::Target => f.write_str("target"),
            Self::Robot => f.write_str("robot"),
        }
    }
}

/// Reasons a level description may be rejected.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum LoadError {
    /// Required fields are missing or have the wrong shape.
    #[error("malformed level: {0}")]
    Malformed(String),
    /// An entity lies outside the grid.
    #[error("{entity} at {position} lies outside the grid")]
    OutOfBounds {
        /// Family of the misplaced entity.
        entity: Entity,
        /// Position supplied by the level.
        position: Position,
    },
    /// Two entities that may not share a cell were placed together.
    #[error("{incoming} at {cell} overlaps an existing {existing}")]
    Overlap {
        /// Contested cell.
        cell: CellCoord,
        /// Entity that was placed first.
        existing: Entity,
        /// Entity that collided with it.
        incoming: Entity,
    },
}

impl LoadError {
    /// Stable machine-readable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Malformed(_) => "malformed_level",
            Self::OutOfBounds { .. } => "out_of_bounds",
            Self::Overlap { .. } => "overlap",
        }
    }
}

/// Reasons a spawn request may be rejected by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SpawnError {
    /// The requested cell lies outside the grid.
    #[error("spawn position {0} lies outside the grid")]
    OutOfBounds(Position),
    /// The requested cell already holds a wall, box or robot.
    #[error("cell {cell} is occupied by {occupant}")]
    Occupied {
        /// Requested cell.
        cell: CellCoord,
        /// Entity found in the cell.
        occupant: Occupant,
    },
    /// The command does not fit the robot class.
    #[error("{class} robot cannot be spawned with command {command:?}")]
    InvalidCommand {
        /// Requested robot class.
        class: RobotClass,
        /// Supplied command, if any.
        command: Option<ControllerCommand>,
    },
}

impl SpawnError {
    /// Stable machine-readable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::OutOfBounds(_) => "spawn_out_of_bounds",
            Self::Occupied { .. } => "occupied",
            Self::InvalidCommand { .. } => "invalid_command",
        }
    }
}
