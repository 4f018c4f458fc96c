//! Routes decoded requests to the world, scheduler and outcome evaluator.

use std::{
    fs,
    path::{Path, PathBuf},
    sync::{Arc, Mutex, PoisonError},
};

use serde_json::Value;
use sokobots_core::{
    ControllerCommand, Direction, Event, Position, RobotClass, RobotSpawn, SimulationOutcome,
    WorldSnapshot,
};
use sokobots_system_outcome::{evaluate, StepLedger};
use sokobots_system_scheduler::Scheduler;
use sokobots_world::{self as world, query, LevelDescription, World};
use tracing::{debug, info, warn};

use crate::{DispatchError, Request, Response};

/// Engine-wide settings the dispatcher consults while serving requests.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DispatcherSettings {
    /// Directory that relative level paths are resolved against.
    pub levels_dir: Option<PathBuf>,
    /// Step budget applied to levels that do not declare `max_steps`.
    pub default_step_budget: Option<u64>,
}

/// Owns the live world and answers requests against it one at a time.
#[derive(Debug)]
pub struct Dispatcher {
    settings: DispatcherSettings,
    world: World,
    ledger: StepLedger,
    scheduler: Scheduler,
    events: Vec<Event>,
}

impl Dispatcher {
    /// Creates a dispatcher holding an empty default world.
    #[must_use]
    pub fn new(settings: DispatcherSettings) -> Self {
        let world = World::new();
        let ledger = StepLedger::for_world(&world, settings.default_step_budget);
        Self {
            settings,
            world,
            ledger,
            scheduler: Scheduler::default(),
            events: Vec::new(),
        }
    }

    /// Read-only access to the live world.
    #[must_use]
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Current outcome of the live world.
    #[must_use]
    pub fn outcome(&self) -> SimulationOutcome {
        evaluate(&self.world, &self.ledger)
    }

    /// Decodes a request payload, serves it and encodes the response.
    pub fn handle_payload(&mut self, payload: &str) -> String {
        let response = match Request::parse(payload) {
            Ok(request) => self.handle(request),
            Err(error) => {
                warn!(code = error.code(), %error, "request rejected");
                Response::from(&error)
            }
        };
        response.encode()
    }

    /// Serves a decoded request.
    pub fn handle(&mut self, request: Request) -> Response {
        let action = request.action();
        debug!(action, "serving request");

        let result = match request {
            Request::Status => Ok(self.state_response()),
            Request::LoadLevel { path, level } => self.load_level(path, level),
            Request::SpawnRobot {
                class,
                x,
                y,
                dir,
                command,
            } => self.spawn_robot(class, Position::new(x, y), dir, command),
            Request::Step | Request::RunStep => Ok(self.step()),
        };

        result.unwrap_or_else(|error| {
            warn!(action, code = error.code(), %error, "request failed");
            Response::from(&error)
        })
    }

    /// Loads a level file, replacing the live world on success.
    pub fn load_level_file(&mut self, path: &Path) -> Result<WorldSnapshot, DispatchError> {
        let resolved = self.resolve(path);
        let text = fs::read_to_string(&resolved).map_err(|source| {
            DispatchError::LevelUnreadable {
                path: resolved.clone(),
                source,
            }
        })?;
        let level = LevelDescription::from_json(&text)?;
        self.replace_world(&level, &resolved.display().to_string())
    }

    fn load_level(
        &mut self,
        path: Option<PathBuf>,
        level: Option<Value>,
    ) -> Result<Response, DispatchError> {
        match (path, level) {
            (Some(path), None) => {
                let _ = self.load_level_file(&path)?;
            }
            (None, Some(value)) => {
                let level = LevelDescription::from_value(value)?;
                let _ = self.replace_world(&level, "inline")?;
            }
            _ => {
                return Err(DispatchError::MalformedRequest(
                    "load_level expects exactly one of `path` or `level`".into(),
                ))
            }
        }
        Ok(self.state_response())
    }

    fn replace_world(
        &mut self,
        level: &LevelDescription,
        source: &str,
    ) -> Result<WorldSnapshot, DispatchError> {
        let world = World::load(level)?;
        self.ledger = StepLedger::for_world(&world, self.settings.default_step_budget);
        self.world = world;

        let snapshot = query::snapshot(&self.world);
        info!(
            source,
            name = query::level_name(&self.world).unwrap_or("unnamed"),
            width = snapshot.width,
            height = snapshot.height,
            robots = snapshot.robots.len(),
            boxes = snapshot.boxes.len(),
            budget = ?self.ledger.budget(),
            "level loaded"
        );
        Ok(snapshot)
    }

    fn spawn_robot(
        &mut self,
        class: RobotClass,
        position: Position,
        facing: Direction,
        command: Option<String>,
    ) -> Result<Response, DispatchError> {
        let command = command.map(parse_command).transpose()?;
        let robot = world::spawn(
            &mut self.world,
            RobotSpawn {
                class,
                position,
                facing,
                command,
            },
        )?;
        info!(robot = robot.get(), %class, %position, "robot spawned");

        Ok(Response::spawned(
            query::snapshot(&self.world),
            self.outcome(),
            robot,
        ))
    }

    fn step(&mut self) -> Response {
        let mut outcome = self.outcome();
        if outcome.is_finished() {
            debug!(?outcome, "level already finished, world not advanced");
        } else {
            self.events.clear();
            let report = self.scheduler.step(&mut self.world, &mut self.events);
            self.ledger.record_step();
            outcome = self.outcome();
            debug!(
                steps = self.ledger.steps_taken(),
                stalled = report.is_stalled(),
                ?outcome,
                "step served"
            );
            if outcome.is_finished() {
                info!(steps = self.ledger.steps_taken(), ?outcome, "level finished");
            }
        }

        Response::stepped(
            query::snapshot(&self.world),
            outcome,
            self.ledger.steps_taken(),
        )
    }

    fn state_response(&self) -> Response {
        Response::state(query::snapshot(&self.world), self.outcome())
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        match &self.settings.levels_dir {
            Some(dir) if path.is_relative() => dir.join(path),
            _ => path.to_path_buf(),
        }
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new(DispatcherSettings::default())
    }
}

fn parse_command(name: String) -> Result<ControllerCommand, DispatchError> {
    serde_json::from_value(Value::String(name.clone()))
        .map_err(|_| DispatchError::UnsupportedCommand(name))
}

/// Dispatcher shared between connection threads.
///
/// Each request holds the lock for its full duration so ticks, spawns and
/// loads never interleave.
#[derive(Clone, Debug)]
pub struct SharedDispatcher {
    inner: Arc<Mutex<Dispatcher>>,
}

impl SharedDispatcher {
    /// Wraps a dispatcher for shared use.
    #[must_use]
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            inner: Arc::new(Mutex::new(dispatcher)),
        }
    }

    /// Serves one request payload under the lock.
    pub fn handle_payload(&self, payload: &str) -> String {
        // Worlds are only replaced or committed whole; a poisoned lock still guards a valid world.
        let mut dispatcher = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        dispatcher.handle_payload(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn send(dispatcher: &mut Dispatcher, request: serde_json::Value) -> serde_json::Value {
        let reply = dispatcher.handle_payload(&request.to_string());
        serde_json::from_str(&reply).expect("response is json")
    }

    fn push_level() -> serde_json::Value {
        json!({
            "width": 3, "height": 1,
            "boxes": [[1, 0]], "targets": [[2, 0]],
            "robots": [{"type": "worker", "x": 0, "y": 0, "dir": "right"}]
        })
    }

    #[test]
    fn status_reports_default_world() {
        let mut dispatcher = Dispatcher::default();
        let reply = send(&mut dispatcher, json!({"action": "status"}));

        assert_eq!(reply["status"], json!("ok"));
        assert_eq!(reply["state"]["width"], json!(10));
        assert_eq!(reply["state"]["height"], json!(10));
        assert!(reply.get("finished").is_none());
    }

    #[test]
    fn inline_level_then_step_wins() {
        let mut dispatcher = Dispatcher::default();
        let loaded = send(
            &mut dispatcher,
            json!({"action": "load_level", "level": push_level()}),
        );
        assert_eq!(loaded["outcome"], json!("ongoing"));

        let stepped = send(&mut dispatcher, json!({"action": "step"}));
        assert_eq!(stepped["finished"], json!(true));
        assert_eq!(stepped["win"], json!(true));
        assert_eq!(stepped["steps"], json!(1));
        assert_eq!(
            stepped["state"]["robots"][0],
            json!({"id": 1, "type": "worker", "x": 1, "y": 0, "dir": "right", "command": null})
        );
        assert_eq!(
            stepped["state"]["boxes"][0],
            json!({"id": 1, "x": 2, "y": 0})
        );
    }

    #[test]
    fn finished_level_is_not_advanced_again() {
        let mut dispatcher = Dispatcher::default();
        let _ = send(
            &mut dispatcher,
            json!({"action": "load_level", "level": push_level()}),
        );
        let first = send(&mut dispatcher, json!({"action": "run_step"}));
        let second = send(&mut dispatcher, json!({"action": "run_step"}));

        assert_eq!(first, second);
        assert_eq!(second["steps"], json!(1));
    }

    #[test]
    fn failed_load_keeps_previous_world() {
        let mut dispatcher = Dispatcher::default();
        let _ = send(
            &mut dispatcher,
            json!({"action": "load_level", "level": push_level()}),
        );
        let before = query::snapshot(dispatcher.world());

        let reply = send(
            &mut dispatcher,
            json!({"action": "load_level", "level": {"width": 2, "height": 2, "walls": [[5, 5]]}}),
        );
        assert_eq!(reply["status"], json!("error"));
        assert_eq!(reply["error"], json!("out_of_bounds"));
        assert_eq!(query::snapshot(dispatcher.world()), before);
    }

    #[test]
    fn oversized_level_is_refused_without_replacing_world() {
        let mut dispatcher = Dispatcher::default();
        let reply = send(
            &mut dispatcher,
            json!({"action": "load_level", "level": {"width": 4_294_967_295_u32, "height": 4_294_967_295_u32}}),
        );
        assert_eq!(reply["status"], json!("error"));
        assert_eq!(reply["error"], json!("malformed_level"));

        let status = send(&mut dispatcher, json!({"action": "status"}));
        assert_eq!(status["state"]["width"], json!(10));
    }

    #[test]
    fn missing_level_file_is_unreadable() {
        let mut dispatcher = Dispatcher::new(DispatcherSettings {
            levels_dir: Some(PathBuf::from("/nonexistent-sokobots-levels")),
            default_step_budget: None,
        });
        let reply = send(
            &mut dispatcher,
            json!({"action": "load_level", "path": "missing.json"}),
        );
        assert_eq!(reply["error"], json!("level_unreadable"));
        let message = reply["message"].as_str().expect("message");
        assert!(message.contains("/nonexistent-sokobots-levels/missing.json"), "{message}");
    }

    #[test]
    fn load_level_requires_a_source() {
        let mut dispatcher = Dispatcher::default();
        let reply = send(&mut dispatcher, json!({"action": "load_level"}));
        assert_eq!(reply["error"], json!("malformed_request"));
    }

    #[test]
    fn spawn_reports_new_robot_id() {
        let mut dispatcher = Dispatcher::default();
        let _ = send(
            &mut dispatcher,
            json!({"action": "load_level", "level": push_level()}),
        );
        let reply = send(
            &mut dispatcher,
            json!({"action": "spawn_robot", "type": "controller", "x": 2, "y": 0, "dir": "up", "command": "rotate_ccw"}),
        );

        assert_eq!(reply["status"], json!("ok"));
        assert_eq!(reply["robot_id"], json!(2));
        assert_eq!(reply["state"]["robots"][1]["command"], json!("rotate_ccw"));
    }

    #[test]
    fn spawn_errors_leave_robot_list_unchanged() {
        let mut dispatcher = Dispatcher::default();
        let _ = send(
            &mut dispatcher,
            json!({"action": "load_level", "level": {"width": 3, "height": 3, "walls": [[1, 1]]}}),
        );

        let cases = [
            (json!({"action": "spawn_robot", "type": "worker", "x": 1, "y": 1, "dir": "up"}), "occupied"),
            (json!({"action": "spawn_robot", "type": "worker", "x": 3, "y": 0, "dir": "up"}), "spawn_out_of_bounds"),
            (json!({"action": "spawn_robot", "type": "worker", "x": 0, "y": 0, "dir": "up", "command": "boost"}), "invalid_command"),
            (json!({"action": "spawn_robot", "type": "controller", "x": 0, "y": 0, "dir": "up"}), "invalid_command"),
            (json!({"action": "spawn_robot", "type": "controller", "x": 0, "y": 0, "dir": "up", "command": "jump"}), "invalid_command"),
        ];
        for (request, code) in cases {
            let reply = send(&mut dispatcher, request.clone());
            assert_eq!(reply["status"], json!("error"), "{request}");
            assert_eq!(reply["error"], json!(code), "{request}");
        }
        assert!(query::robot_view(dispatcher.world()).is_empty());
    }

    #[test]
    fn configured_budget_applies_without_level_budget() {
        let mut dispatcher = Dispatcher::new(DispatcherSettings {
            levels_dir: None,
            default_step_budget: Some(1),
        });
        let _ = send(
            &mut dispatcher,
            json!({"action": "load_level", "level": {
                "width": 2, "height": 1, "targets": [[1, 0]],
                "robots": [{"type": "worker", "x": 0, "y": 0, "dir": "left"}]
            }}),
        );
        let reply = send(&mut dispatcher, json!({"action": "step"}));
        assert_eq!(reply["outcome"], json!("lost"));
        assert_eq!(reply["finished"], json!(true));
        assert_eq!(reply["win"], json!(false));
    }

    #[test]
    fn shared_dispatcher_serves_through_lock() {
        let shared = SharedDispatcher::new(Dispatcher::default());
        let clone = shared.clone();
        let reply = clone.handle_payload(r#"{"action": "teleport"}"#);
        let value: serde_json::Value = serde_json::from_str(&reply).expect("json");
        assert_eq!(value["error"], json!("unknown_action"));
        let reply = shared.handle_payload(r#"{"action": "status"}"#);
        assert!(reply.starts_with(r#"{"status":"ok""#), "{reply}");
    }
}
