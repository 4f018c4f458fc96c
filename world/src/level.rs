//! Persisted level descriptions.
//!
//! Levels are JSON documents. Entity lists may sit at the top level or be
//! nested under a `"world"` object; both layouts decode to the same
//! [`LevelDescription`]. A document may not mix the two.

use serde::{Deserialize, Serialize};

use sokobots_core::{ControllerCommand, Direction, LoadError, Position, RobotClass};

/// Declarative description of a level as stored on disk or sent inline.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "LevelFile")]
pub struct LevelDescription {
    /// Optional display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Number of columns. Must be positive.
    pub width: u32,
    /// Number of rows. Must be positive.
    pub height: u32,
    /// Number of ticks allowed before the level is lost.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_steps: Option<u64>,
    /// Walls, boxes, targets and robots placed on the grid.
    #[serde(flatten)]
    pub entities: LevelEntities,
}

impl LevelDescription {
    /// Creates an empty level of the provided size.
    #[must_use]
    pub fn empty(width: u32, height: u32) -> Self {
        Self {
            name: None,
            width,
            height,
            max_steps: None,
            entities: LevelEntities::default(),
        }
    }

    /// Parses a level from its JSON text.
    pub fn from_json(text: &str) -> Result<Self, LoadError> {
        serde_json::from_str(text).map_err(|error| LoadError::Malformed(error.to_string()))
    }

    /// Parses a level from an already decoded JSON value.
    pub fn from_value(value: serde_json::Value) -> Result<Self, LoadError> {
        serde_json::from_value(value).map_err(|error| LoadError::Malformed(error.to_string()))
    }
}

/// Entities placed by a level.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelEntities {
    /// Wall cells.
    pub walls: Vec<Position>,
    /// Box cells, in box identifier order.
    pub boxes: Vec<Position>,
    /// Target cells.
    pub targets: Vec<Position>,
    /// Robots, in spawn order.
    pub robots: Vec<RobotPlacement>,
}

/// Robot entry inside a level description.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RobotPlacement {
    /// Robot family.
    #[serde(rename = "type", alias = "kind")]
    pub class: RobotClass,
    /// Column of the robot.
    pub x: i64,
    /// Row of the robot.
    pub y: i64,
    /// Initial facing, `up` when omitted.
    #[serde(default, alias = "facing")]
    pub dir: Direction,
    /// Standing command for controllers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<ControllerCommand>,
}

impl RobotPlacement {
    /// Position of the robot as an unchecked coordinate.
    #[must_use]
    pub const fn position(&self) -> Position {
        Position::new(self.x, self.y)
    }
}

#[derive(Deserialize)]
struct LevelFile {
    #[serde(default)]
    name: Option<String>,
    width: u32,
    height: u32,
    #[serde(default)]
    max_steps: Option<u64>,
    #[serde(default)]
    world: Option<LevelEntities>,
    #[serde(flatten)]
    entities: LevelEntities,
}

impl TryFrom<LevelFile> for LevelDescription {
    type Error = String;

    fn try_from(file: LevelFile) -> Result<Self, Self::Error> {
        let entities = match file.world {
            Some(_) if file.entities != LevelEntities::default() => {
                return Err(
                    "entities must be listed either under `world` or at the top level, not both"
                        .to_owned(),
                )
            }
            Some(nested) => nested,
            None => file.entities,
        };
        Ok(Self {
            name: file.name,
            width: file.width,
            height: file.height,
            max_steps: file.max_steps,
            entities,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_layout_decodes() {
        let level = LevelDescription::from_json(
            r#"{
                "width": 3, "height": 1,
                "boxes": [[1, 0]],
                "targets": [{"x": 2, "y": 0}],
                "robots": [{"type": "worker", "x": 0, "y": 0, "dir": "right"}]
            }"#,
        )
        .expect("level decodes");

        assert_eq!(level.width, 3);
        assert_eq!(level.entities.boxes, vec![Position::new(1, 0)]);
        assert_eq!(level.entities.targets, vec![Position::new(2, 0)]);
        assert_eq!(level.entities.robots[0].dir, Direction::Right);
        assert!(level.entities.walls.is_empty());
    }

    #[test]
    fn nested_world_layout_decodes() {
        let level = LevelDescription::from_json(
            r#"{
                "name": "nested",
                "width": 4, "height": 4, "max_steps": 12,
                "world": {
                    "walls": [[0, 0]],
                    "robots": [{"type": "controller", "x": 1, "y": 1, "command": "boost"}]
                }
            }"#,
        )
        .expect("level decodes");

        assert_eq!(level.name.as_deref(), Some("nested"));
        assert_eq!(level.max_steps, Some(12));
        assert_eq!(level.entities.walls, vec![Position::new(0, 0)]);
        let robot = level.entities.robots[0];
        assert_eq!(robot.dir, Direction::Up, "facing defaults to up");
        assert_eq!(robot.command, Some(ControllerCommand::Boost));
    }

    #[test]
    fn mixed_layouts_are_malformed() {
        let error = LevelDescription::from_json(
            r#"{
                "width": 3, "height": 3,
                "boxes": [[1, 1]],
                "world": {"walls": [[0, 0]]}
            }"#,
        )
        .expect_err("both layouts at once");
        assert!(matches!(error, LoadError::Malformed(_)), "{error:?}");
    }

    #[test]
    fn missing_dimensions_are_malformed() {
        let error = LevelDescription::from_json(r#"{"height": 2}"#).expect_err("width missing");
        assert!(matches!(error, LoadError::Malformed(_)), "{error:?}");
    }

    #[test]
    fn unknown_robot_type_is_malformed() {
        let error = LevelDescription::from_json(
            r#"{"width": 2, "height": 2, "robots": [{"type": "forklift", "x": 0, "y": 0}]}"#,
        )
        .expect_err("unknown type");
        assert!(matches!(error, LoadError::Malformed(_)), "{error:?}");
    }
}
