use sokobots_core::{
    CellCoord, Command, Direction, Event, Position, RobotClass, RobotSpawn, WorldSnapshot,
};
use sokobots_system_scheduler::Scheduler;
use sokobots_world::{self as world, query, LevelDescription, World};

const LEVEL: &str = r#"{
    "width": 6, "height": 3,
    "walls": [[5, 1]],
    "boxes": [[2, 0]],
    "robots": [
        {"type": "worker", "x": 0, "y": 0, "dir": "right"},
        {"type": "controller", "x": 0, "y": 2, "dir": "right", "command": "boost"},
        {"type": "controller", "x": 3, "y": 1, "dir": "up", "command": "rotate_cw"}
    ]
}"#;

#[test]
fn deterministic_replay_produces_expected_snapshot() {
    let first = replay();
    let second = replay();

    assert_eq!(first, second, "replay diverged between runs");

    let robots: Vec<(u32, CellCoord, Direction)> = first
        .snapshot
        .robots
        .iter()
        .map(|robot| (robot.id.get(), robot.cell, robot.facing))
        .collect();
    assert_eq!(
        robots,
        vec![
            (1, CellCoord::new(4, 0), Direction::Right),
            (2, CellCoord::new(5, 2), Direction::Right),
            (3, CellCoord::new(3, 1), Direction::Right),
            (4, CellCoord::new(2, 1), Direction::Right),
        ]
    );
    assert_eq!(first.snapshot.boxes[0].cell, CellCoord::new(5, 0));

    let pushes = first
        .events
        .iter()
        .filter(|event| matches!(event, Event::BoxPushed { .. }))
        .count();
    assert_eq!(pushes, 3);
}

#[derive(Debug, PartialEq, Eq)]
struct ReplayOutcome {
    snapshot: WorldSnapshot,
    events: Vec<Event>,
}

fn replay() -> ReplayOutcome {
    let level = LevelDescription::from_json(LEVEL).expect("level decodes");
    let mut world = World::load(&level).expect("level loads");
    let mut scheduler = Scheduler::default();
    let mut events = Vec::new();

    for tick in 0..5 {
        if tick == 2 {
            world::apply(
                &mut world,
                Command::SpawnRobot {
                    spawn: RobotSpawn {
                        class: RobotClass::Worker,
                        position: Position::new(0, 1),
                        facing: Direction::Right,
                        command: None,
                    },
                },
                &mut events,
            );
        }
        let report = scheduler.step(&mut world, &mut events);
        assert_eq!(report.rejected, None);
    }

    ReplayOutcome {
        snapshot: query::snapshot(&world),
        events,
    }
}
