//! Decoding of client requests.

use std::path::PathBuf;

use serde::Deserialize;
use serde_json::Value;
use sokobots_core::{Direction, RobotClass};

use crate::DispatchError;

const ACTIONS: [&str; 5] = ["status", "load_level", "spawn_robot", "step", "run_step"];

/// Action requested by a client.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Request {
    /// Report the current snapshot and outcome.
    Status,
    /// Replace the live world with a new level.
    LoadLevel {
        /// Level file on disk, relative paths resolve against the level directory.
        #[serde(default)]
        path: Option<PathBuf>,
        /// Inline level description.
        #[serde(default)]
        level: Option<Value>,
    },
    /// Place a new robot.
    SpawnRobot {
        /// Robot family.
        #[serde(rename = "type", alias = "kind")]
        class: RobotClass,
        /// Requested column.
        x: i64,
        /// Requested row.
        y: i64,
        /// Initial facing.
        dir: Direction,
        /// Controller command by wire name; `null` or absent for workers.
        #[serde(default)]
        command: Option<String>,
    },
    /// Advance one tick.
    Step,
    /// Advance one tick; alias used by the live view client.
    RunStep,
}

impl Request {
    /// Parses a request payload.
    ///
    /// Unknown action names are reported separately from malformed bodies so
    /// clients can tell a typo from a protocol mismatch.
    pub fn parse(payload: &str) -> Result<Self, DispatchError> {
        let value: Value = serde_json::from_str(payload)
            .map_err(|error| DispatchError::MalformedRequest(error.to_string()))?;

        let action = value
            .get("action")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                DispatchError::MalformedRequest("expected an object with a string `action`".into())
            })?;
        if !ACTIONS.contains(&action) {
            return Err(DispatchError::UnknownAction(action.to_owned()));
        }

        serde_json::from_value(value)
            .map_err(|error| DispatchError::MalformedRequest(error.to_string()))
    }

    /// Wire name of the action.
    #[must_use]
    pub fn action(&self) -> &'static str {
        match self {
            Self::Status => "status",
            Self::LoadLevel { .. } => "load_level",
            Self::SpawnRobot { .. } => "spawn_robot",
            Self::Step => "step",
            Self::RunStep => "run_step",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_spawn_request() {
        let request = Request::parse(
            r#"{"action": "spawn_robot", "type": "controller", "x": 2, "y": -1, "dir": "left", "command": "boost"}"#,
        )
        .expect("request parses");

        assert_eq!(
            request,
            Request::SpawnRobot {
                class: RobotClass::Controller,
                x: 2,
                y: -1,
                dir: Direction::Left,
                command: Some("boost".into()),
            }
        );
    }

    #[test]
    fn null_command_is_absent() {
        let request = Request::parse(
            r#"{"action": "spawn_robot", "type": "worker", "x": 0, "y": 0, "dir": "up", "command": null}"#,
        )
        .expect("request parses");
        assert!(matches!(request, Request::SpawnRobot { command: None, .. }));
    }

    #[test]
    fn unknown_action_is_distinguished() {
        let error = Request::parse(r#"{"action": "teleport"}"#).expect_err("unknown");
        assert_eq!(error.code(), "unknown_action");
    }

    #[test]
    fn missing_fields_are_malformed() {
        for payload in [
            "not json",
            "[1, 2]",
            r#"{"action": 5}"#,
            r#"{"action": "spawn_robot", "type": "worker", "x": 0}"#,
        ] {
            let error = Request::parse(payload).expect_err(payload);
            assert_eq!(error.code(), "malformed_request", "{payload}");
        }
    }

    #[test]
    fn run_step_is_accepted() {
        assert_eq!(
            Request::parse(r#"{"action": "run_step"}"#).expect("parses"),
            Request::RunStep
        );
    }
}
