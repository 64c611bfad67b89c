//! Command groups and decorators under the scheduler.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use cobalt_command::{
    Clock, Command, CommandError, CommandKind, CommandScheduler, CommandState,
    InterruptionBehavior, Subsystem,
};

use super::{log, probe, stubborn, take};

fn run(scheduler: &CommandScheduler, ticks: usize) {
    for _ in 0..ticks {
        scheduler.run();
    }
}

#[test]
fn sequence_runs_children_in_turn() {
    let scheduler = CommandScheduler::default();
    let log = log();
    let group = Command::sequence(
        "seq",
        [probe("A", &log, Some(1), &[]), probe("B", &log, Some(2), &[])],
    )
    .unwrap();
    assert_eq!(group.kind(), CommandKind::Sequential);

    scheduler.schedule(&group).unwrap();
    assert_eq!(take(&log), ["A.init"]);
    scheduler.run();
    assert_eq!(take(&log), ["A.exec", "A.end(false)", "B.init"]);
    scheduler.run();
    assert_eq!(take(&log), ["B.exec"]);
    scheduler.run();
    assert_eq!(take(&log), ["B.exec", "B.end(false)"]);
    assert!(!scheduler.is_scheduled(&group));
    assert!(group.children().iter().all(|c| c.state() == CommandState::Disjoint));
}

#[test]
fn interrupted_sequence_ends_only_the_current_child() {
    let scheduler = CommandScheduler::default();
    let log = log();
    let group = Command::sequence(
        "seq",
        [probe("A", &log, None, &[]), probe("B", &log, None, &[])],
    )
    .unwrap();

    scheduler.schedule(&group).unwrap();
    scheduler.run();
    scheduler.cancel(&group);
    assert_eq!(take(&log), ["A.init", "A.exec", "A.end(true)"]);
}

#[test]
fn parallel_waits_for_every_child() {
    let scheduler = CommandScheduler::default();
    let log = log();
    let group = Command::parallel(
        "par",
        [probe("A", &log, Some(1), &[]), probe("B", &log, Some(2), &[])],
    )
    .unwrap();

    scheduler.schedule(&group).unwrap();
    scheduler.run();
    assert_eq!(take(&log), ["A.init", "B.init", "A.exec", "A.end(false)", "B.exec"]);
    assert!(scheduler.is_scheduled(&group));
    scheduler.run();
    assert_eq!(take(&log), ["B.exec", "B.end(false)"]);
    assert!(!scheduler.is_scheduled(&group));
}

#[test]
fn race_interrupts_the_losers() {
    let scheduler = CommandScheduler::default();
    let log = log();
    let group = Command::race(
        "race",
        [probe("A", &log, Some(1), &[]), probe("B", &log, None, &[])],
    )
    .unwrap();

    scheduler.schedule(&group).unwrap();
    scheduler.run();
    assert_eq!(
        take(&log),
        ["A.init", "B.init", "A.exec", "B.exec", "A.end(false)", "B.end(true)"]
    );
    assert!(!scheduler.is_scheduled(&group));
}

#[test]
fn empty_race_finishes_on_first_tick() {
    let scheduler = CommandScheduler::default();
    let group = Command::race("empty", []).unwrap();
    scheduler.schedule(&group).unwrap();
    scheduler.run();
    assert!(scheduler.scheduled().is_empty());
}

#[test]
fn deadline_interrupts_the_others_when_it_finishes() {
    let scheduler = CommandScheduler::default();
    let log = log();
    let group = Command::deadline(
        "deadline",
        probe("D", &log, Some(2), &[]),
        [probe("O", &log, None, &[]), probe("Q", &log, Some(1), &[])],
    )
    .unwrap();

    scheduler.schedule(&group).unwrap();
    scheduler.run();
    assert_eq!(
        take(&log),
        ["D.init", "O.init", "Q.init", "D.exec", "O.exec", "Q.exec", "Q.end(false)"]
    );
    scheduler.run();
    assert_eq!(take(&log), ["D.exec", "D.end(false)", "O.exec", "O.end(true)"]);
    assert!(!scheduler.is_scheduled(&group));
}

#[test]
fn group_requires_the_union_and_is_displaced_as_a_whole() {
    let scheduler = CommandScheduler::default();
    let left = Subsystem::new("left");
    let right = Subsystem::new("right");
    let log = log();
    let group = Command::parallel(
        "pair",
        [
            probe("A", &log, None, &[&left]),
            probe("B", &log, None, &[&right]),
        ],
    )
    .unwrap();
    assert!(group.requires(&left) && group.requires(&right));

    scheduler.schedule(&group).unwrap();
    take(&log);
    let intruder = probe("X", &log, None, &[&right]);
    scheduler.schedule(&intruder).unwrap();
    assert_eq!(take(&log), ["A.end(true)", "B.end(true)", "X.init"]);
    assert!(scheduler.requiring(&left).is_none());
}

#[test]
fn concurrent_children_may_not_share_requirements() {
    let arm = Subsystem::new("arm");
    let log = log();
    let err = Command::parallel(
        "clash",
        [probe("A", &log, None, &[&arm]), probe("B", &log, None, &[&arm])],
    )
    .unwrap_err();
    assert!(matches!(err, CommandError::RequirementOverlap { ref subsystem, .. } if subsystem == "arm"));

    // Sequential children take turns, so sharing is fine.
    let a = probe("A", &log, None, &[&arm]);
    let b = probe("B", &log, None, &[&arm]);
    let seq = Command::sequence("turns", [a, b]).unwrap();
    assert_eq!(seq.requirements().len(), 1);
}

#[test]
fn failed_composition_leaves_children_untouched() {
    let scheduler = CommandScheduler::default();
    let log = log();
    let free = probe("free", &log, None, &[]);
    let busy = probe("busy", &log, None, &[]);
    scheduler.schedule(&busy).unwrap();

    let err = Command::sequence("bad", [free.clone(), busy.clone()]).unwrap_err();
    assert!(matches!(err, CommandError::ChildScheduled { .. }));
    assert!(!free.is_composed());
    assert!(!busy.is_composed());

    let _group = Command::sequence("good", [free.clone()]).unwrap();
    assert!(matches!(
        Command::sequence("again", [free]),
        Err(CommandError::AlreadyComposed { .. })
    ));
}

#[test]
fn group_policy_derives_from_children() {
    let log = log();
    let stubborn_group = Command::sequence(
        "guarded",
        [probe("A", &log, None, &[]), stubborn("B", &log, &[])],
    )
    .unwrap();
    assert_eq!(
        stubborn_group.interruption(),
        InterruptionBehavior::CancelIncoming
    );
    assert!(!stubborn_group.runs_when_disabled());

    let always = |name: &str| {
        Command::builder(name)
            .runs_when_disabled(true)
            .build(super::Probe::new(name, &log, None))
    };
    let group = Command::parallel("always", [always("A"), always("B")]).unwrap();
    assert!(group.runs_when_disabled());
    assert_eq!(group.interruption(), InterruptionBehavior::CancelSelf);
}

#[test]
fn timeout_interrupts_on_the_manual_clock() {
    let scheduler = CommandScheduler::default();
    let clock = Clock::manual();
    let log = log();
    let timed = probe("A", &log, None, &[])
        .with_timeout(Duration::from_millis(100), &clock)
        .unwrap();

    scheduler.schedule(&timed).unwrap();
    scheduler.run();
    clock.advance(Duration::from_millis(60));
    scheduler.run();
    assert!(scheduler.is_scheduled(&timed));

    clock.advance(Duration::from_millis(40));
    scheduler.run();
    assert_eq!(
        take(&log),
        ["A.init", "A.exec", "A.exec", "A.exec", "A.end(true)"]
    );
    assert!(!scheduler.is_scheduled(&timed));
}

#[test]
fn until_and_and_then_chain() {
    let scheduler = CommandScheduler::default();
    let log = log();
    let stop = Rc::new(Cell::new(false));
    let s = Rc::clone(&stop);
    let chained = probe("A", &log, None, &[])
        .until(move || s.get())
        .unwrap()
        .and_then(probe("B", &log, Some(1), &[]))
        .unwrap();
    assert_eq!(chained.name(), "A (until) -> B");

    scheduler.schedule(&chained).unwrap();
    run(&scheduler, 2);
    assert_eq!(take(&log), ["A.init", "A.exec", "A.exec"]);

    stop.set(true);
    scheduler.run();
    assert_eq!(take(&log), ["A.exec", "A.end(true)", "B.init"]);
    scheduler.run();
    assert_eq!(take(&log), ["B.exec", "B.end(false)"]);
    assert!(scheduler.scheduled().is_empty());
}

#[test]
fn nested_groups_drive_grandchildren() {
    let scheduler = CommandScheduler::default();
    let log = log();
    let inner = Command::parallel(
        "inner",
        [probe("A", &log, Some(1), &[]), probe("B", &log, Some(1), &[])],
    )
    .unwrap();
    let outer = Command::sequence("outer", [inner, probe("C", &log, Some(1), &[])]).unwrap();

    scheduler.schedule(&outer).unwrap();
    run(&scheduler, 2);
    assert_eq!(
        take(&log),
        [
            "A.init",
            "B.init",
            "A.exec",
            "A.end(false)",
            "B.exec",
            "B.end(false)",
            "C.init",
            "C.exec",
            "C.end(false)",
        ]
    );
    assert!(scheduler.scheduled().is_empty());
}
