//! Encoding of engine responses.

use serde::{Deserialize, Serialize};
use sokobots_core::{RobotId, SimulationOutcome, WorldSnapshot};

use crate::DispatchError;

/// Response payload sent for every request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Response {
    /// The request succeeded.
    Ok(StatePayload),
    /// The request failed and the world is unchanged.
    Error {
        /// Stable error code.
        error: String,
        /// Human-readable description.
        message: String,
    },
}

/// Successful response body.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatePayload {
    /// Full world snapshot after the request.
    pub state: WorldSnapshot,
    /// Outcome after the request.
    pub outcome: SimulationOutcome,
    /// Set on step responses: whether play has ended.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished: Option<bool>,
    /// Set on step responses: whether the level was won.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub win: Option<bool>,
    /// Set on step responses: ticks committed since the level was loaded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub steps: Option<u64>,
    /// Set on spawn responses: identifier of the new robot.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub robot_id: Option<RobotId>,
}

impl Response {
    /// Builds a plain state response.
    #[must_use]
    pub fn state(state: WorldSnapshot, outcome: SimulationOutcome) -> Self {
        Self::Ok(StatePayload::bare(state, outcome))
    }

    /// Builds the response to a `step` request.
    #[must_use]
    pub fn stepped(state: WorldSnapshot, outcome: SimulationOutcome, steps: u64) -> Self {
        Self::Ok(StatePayload {
            finished: Some(outcome.is_finished()),
            win: Some(outcome.is_win()),
            steps: Some(steps),
            ..StatePayload::bare(state, outcome)
        })
    }

    /// Builds the response to a successful spawn.
    #[must_use]
    pub fn spawned(state: WorldSnapshot, outcome: SimulationOutcome, robot: RobotId) -> Self {
        Self::Ok(StatePayload {
            robot_id: Some(robot),
            ..StatePayload::bare(state, outcome)
        })
    }

    /// Encodes the response as a single line of compact JSON.
    #[must_use]
    pub fn encode(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|error| {
            format!(
                r#"{{"status":"error","error":"internal","message":"cannot encode response: {}"}}"#,
                error.to_string().replace('"', "'")
            )
        })
    }
}

impl StatePayload {
    fn bare(state: WorldSnapshot, outcome: SimulationOutcome) -> Self {
        Self {
            state,
            outcome,
            finished: None,
            win: None,
            steps: None,
            robot_id: None,
        }
    }
}

impl From<&DispatchError> for Response {
    fn from(error: &DispatchError) -> Self {
        Self::Error {
            error: error.code().to_owned(),
            message: error.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn empty_state() -> WorldSnapshot {
        WorldSnapshot {
            width: 2,
            height: 1,
            walls: Vec::new(),
            boxes: Vec::new(),
            targets: Vec::new(),
            robots: Vec::new(),
        }
    }

    #[test]
    fn status_response_omits_step_fields() {
        let value: serde_json::Value =
            serde_json::from_str(&Response::state(empty_state(), SimulationOutcome::Ongoing).encode())
                .expect("valid json");
        assert_eq!(
            value,
            json!({
                "status": "ok",
                "state": {"width": 2, "height": 1, "walls": [], "boxes": [], "targets": [], "robots": []},
                "outcome": "ongoing",
            })
        );
    }

    #[test]
    fn step_response_carries_flags() {
        let value: serde_json::Value = serde_json::from_str(
            &Response::stepped(empty_state(), SimulationOutcome::Lost, 7).encode(),
        )
        .expect("valid json");
        assert_eq!(value["finished"], json!(true));
        assert_eq!(value["win"], json!(false));
        assert_eq!(value["steps"], json!(7));
        assert_eq!(value["outcome"], json!("lost"));
    }

    #[test]
    fn error_response_carries_code_and_message() {
        let response = Response::from(&DispatchError::UnknownAction("fly".into()));
        let value: serde_json::Value = serde_json::from_str(&response.encode()).expect("json");
        assert_eq!(value["status"], json!("error"));
        assert_eq!(value["error"], json!("unknown_action"));
        assert_eq!(value["message"], json!("unknown action: \"fly\""));
    }
}
