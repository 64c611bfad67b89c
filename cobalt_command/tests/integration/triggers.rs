//! Trigger bindings polled by the scheduler.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use cobalt_command::{Clock, CommandScheduler, DebounceKind, Subsystem, Trigger};

use super::{log, probe, stubborn, switch, take};

fn trigger_on(value: &Rc<Cell<bool>>) -> Trigger {
    let v = Rc::clone(value);
    Trigger::new(move || v.get())
}

#[test]
fn command_bound_to_rising_edge_executes_in_the_same_tick() {
    let scheduler = CommandScheduler::default();
    let log = log();
    let button = switch();
    scheduler.bind(trigger_on(&button), probe("A", &log, None, &[]), None);

    scheduler.run();
    assert!(take(&log).is_empty());

    button.set(true);
    scheduler.run();
    assert_eq!(take(&log), ["A.init", "A.exec"]);

    scheduler.run();
    assert_eq!(take(&log), ["A.exec"]);

    // Falling edge with no `on_false` leaves the command running.
    button.set(false);
    scheduler.run();
    assert_eq!(take(&log), ["A.exec"]);
}

#[test]
fn on_false_command_starts_on_the_falling_edge() {
    let scheduler = CommandScheduler::default();
    let log = log();
    let button = switch();
    scheduler.bind(
        trigger_on(&button),
        probe("on", &log, Some(1), &[]),
        Some(probe("off", &log, Some(1), &[])),
    );

    button.set(true);
    scheduler.run();
    button.set(false);
    scheduler.run();
    assert_eq!(
        take(&log),
        ["on.init", "on.exec", "on.end(false)", "off.init", "off.exec", "off.end(false)"]
    );
}

#[test]
fn trigger_already_true_fires_on_first_poll() {
    let scheduler = CommandScheduler::default();
    let log = log();
    let button = switch();
    button.set(true);
    scheduler.bind(trigger_on(&button), probe("A", &log, Some(1), &[]), None);

    scheduler.run();
    assert_eq!(take(&log), ["A.init", "A.exec", "A.end(false)"]);
    scheduler.run();
    assert!(take(&log).is_empty());
}

#[test]
fn while_true_cancels_on_release() {
    let scheduler = CommandScheduler::default();
    let log = log();
    let button = switch();
    let held = probe("held", &log, None, &[]);
    scheduler.bind_while_true(trigger_on(&button), held.clone());

    button.set(true);
    scheduler.run();
    scheduler.run();
    button.set(false);
    scheduler.run();
    assert_eq!(
        take(&log),
        ["held.init", "held.exec", "held.exec", "held.end(true)"]
    );
    assert!(!scheduler.is_scheduled(&held));
}

#[test]
fn toggle_flips_on_each_press() {
    let scheduler = CommandScheduler::default();
    let log = log();
    let button = switch();
    let toggled = probe("T", &log, None, &[]);
    scheduler.bind_toggle_on_true(trigger_on(&button), toggled.clone());

    for pressed in [true, false, true, false] {
        button.set(pressed);
        scheduler.run();
    }
    assert_eq!(take(&log), ["T.init", "T.exec", "T.exec", "T.end(true)"]);
    assert!(!scheduler.is_scheduled(&toggled));

    button.set(true);
    scheduler.run();
    assert!(scheduler.is_scheduled(&toggled));
}

#[test]
fn action_runs_every_tick_the_trigger_is_true() {
    let scheduler = CommandScheduler::default();
    let button = switch();
    let count = Rc::new(Cell::new(0));
    let c = Rc::clone(&count);
    scheduler.bind_action(trigger_on(&button), move || c.set(c.get() + 1));

    scheduler.run();
    button.set(true);
    scheduler.run();
    scheduler.run();
    scheduler.run();
    button.set(false);
    scheduler.run();
    assert_eq!(count.get(), 3);
}

#[test]
fn each_binding_polls_its_trigger_once_per_tick() {
    let scheduler = CommandScheduler::default();
    let polls = Rc::new(Cell::new(0));
    let p = Rc::clone(&polls);
    let counted = Trigger::new(move || {
        p.set(p.get() + 1);
        false
    });
    scheduler.bind_action(counted.clone(), || {});
    scheduler.bind_action(counted.negate(), || {});

    scheduler.run();
    scheduler.run();
    assert_eq!(polls.get(), 4);

    scheduler.clear_bindings();
    scheduler.run();
    assert_eq!(polls.get(), 4);
}

#[test]
fn rejected_binding_schedule_leaves_owner_running() {
    let scheduler = CommandScheduler::default();
    let arm = Subsystem::new("arm");
    let log = log();
    let button = switch();
    let guard = stubborn("guard", &log, &[&arm]);
    scheduler.schedule(&guard).unwrap();
    scheduler.bind(trigger_on(&button), probe("A", &log, None, &[&arm]), None);
    take(&log);

    button.set(true);
    scheduler.run();
    assert_eq!(take(&log), ["guard.exec"]);
    assert_eq!(scheduler.requiring(&arm), Some(guard));
}

#[test]
fn debounced_binding_waits_for_a_stable_input() {
    let scheduler = CommandScheduler::default();
    let clock = Clock::manual();
    let log = log();
    let sensor = switch();
    let debounced = trigger_on(&sensor).debounce(
        Duration::from_millis(50),
        DebounceKind::Rising,
        &clock,
    );
    scheduler.bind(debounced, probe("A", &log, Some(1), &[]), None);

    sensor.set(true);
    scheduler.run();
    clock.advance(Duration::from_millis(20));
    scheduler.run();
    assert!(take(&log).is_empty());

    // A bounce restarts the wait.
    sensor.set(false);
    scheduler.run();
    sensor.set(true);
    clock.advance(Duration::from_millis(40));
    scheduler.run();
    assert!(take(&log).is_empty());

    clock.advance(Duration::from_millis(50));
    scheduler.run();
    assert_eq!(take(&log), ["A.init", "A.exec", "A.end(false)"]);
}
