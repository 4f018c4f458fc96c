use sokobots_core::{Direction, Position, RobotClass, RobotSpawn, SimulationOutcome};
use sokobots_system_outcome::{evaluate, StepLedger};
use sokobots_system_scheduler::Scheduler;
use sokobots_world::{self as world, LevelDescription, World};

fn world_from(json: &str) -> World {
    let level = LevelDescription::from_json(json).expect("level decodes");
    World::load(&level).expect("level loads")
}

fn advance(
    world: &mut World,
    scheduler: &mut Scheduler,
    ledger: &mut StepLedger,
) -> SimulationOutcome {
    let mut events = Vec::new();
    let _ = scheduler.step(world, &mut events);
    ledger.record_step();
    evaluate(world, ledger)
}

#[test]
fn single_push_onto_target_wins() {
    let mut world = world_from(
        r#"{"width": 3, "height": 1, "boxes": [[1, 0]], "targets": [[2, 0]],
            "robots": [{"type": "worker", "x": 0, "y": 0, "dir": "right"}]}"#,
    );
    let mut ledger = StepLedger::for_world(&world, Some(1000));
    assert_eq!(evaluate(&world, &ledger), SimulationOutcome::Ongoing);

    let outcome = advance(&mut world, &mut Scheduler::default(), &mut ledger);

    assert_eq!(outcome, SimulationOutcome::Won);
    assert!(outcome.is_finished());
    assert!(outcome.is_win());
}

#[test]
fn blocked_push_stays_ongoing() {
    let mut world = world_from(
        r#"{"width": 3, "height": 1, "walls": [[2, 0]], "boxes": [[1, 0]], "targets": [[0, 0]],
            "robots": [{"type": "worker", "x": 0, "y": 0, "dir": "right"}]}"#,
    );
    let mut ledger = StepLedger::for_world(&world, Some(1000));

    let outcome = advance(&mut world, &mut Scheduler::default(), &mut ledger);

    assert_eq!(outcome, SimulationOutcome::Ongoing);
}

#[test]
fn won_only_when_every_target_holds_a_box() {
    let world = world_from(
        r#"{"width": 4, "height": 1, "boxes": [[0, 0], [1, 0]], "targets": [[0, 0], [2, 0]]}"#,
    );
    assert_eq!(
        evaluate(&world, &StepLedger::default()),
        SimulationOutcome::Ongoing
    );
}

#[test]
fn extra_boxes_and_robots_never_undo_a_win() {
    let mut world = world_from(
        r#"{"width": 4, "height": 2, "boxes": [[0, 0], [3, 1]], "targets": [[0, 0]]}"#,
    );
    let ledger = StepLedger::default();
    assert_eq!(evaluate(&world, &ledger), SimulationOutcome::Won);

    let _ = world::spawn(
        &mut world,
        RobotSpawn {
            class: RobotClass::Worker,
            position: Position::new(2, 0),
            facing: Direction::Down,
            command: None,
        },
    )
    .expect("spawn succeeds");

    assert_eq!(evaluate(&world, &ledger), SimulationOutcome::Won);
}

#[test]
fn exhausting_level_budget_loses() {
    let mut world = world_from(
        r#"{"width": 3, "height": 1, "max_steps": 2, "walls": [[2, 0]], "boxes": [[1, 0]],
            "targets": [[0, 0]],
            "robots": [{"type": "worker", "x": 0, "y": 0, "dir": "right"}]}"#,
    );
    let mut scheduler = Scheduler::default();
    let mut ledger = StepLedger::for_world(&world, Some(1000));
    assert_eq!(ledger.budget(), Some(2), "level budget overrides default");

    assert_eq!(
        advance(&mut world, &mut scheduler, &mut ledger),
        SimulationOutcome::Ongoing
    );
    assert_eq!(
        advance(&mut world, &mut scheduler, &mut ledger),
        SimulationOutcome::Lost
    );
}

#[test]
fn win_on_final_budgeted_step_counts_as_win() {
    let mut world = world_from(
        r#"{"width": 3, "height": 1, "max_steps": 1, "boxes": [[1, 0]], "targets": [[2, 0]],
            "robots": [{"type": "worker", "x": 0, "y": 0, "dir": "right"}]}"#,
    );
    let mut ledger = StepLedger::for_world(&world, None);

    assert_eq!(
        advance(&mut world, &mut Scheduler::default(), &mut ledger),
        SimulationOutcome::Won
    );
}
