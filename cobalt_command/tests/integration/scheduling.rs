//! Scheduling, conflicts, default commands and tick ordering.

use std::cell::RefCell;
use std::rc::Rc;

use cobalt_command::{
    Command, CommandEvent, CommandScheduler, CommandState, FunctionalCommand, RunCommand,
    ScheduleError, Subsystem, Trigger,
};
use cobalt_common::scheduler::SchedulerConfig;

use super::{log, probe, stubborn, take};

#[test]
fn initialize_on_schedule_then_one_execute_per_tick() {
    let scheduler = CommandScheduler::default();
    let log = log();
    let a = probe("A", &log, Some(2), &[]);

    scheduler.schedule(&a).unwrap();
    assert_eq!(take(&log), ["A.init"]);
    assert_eq!(a.state(), CommandState::Running);

    scheduler.run();
    assert_eq!(take(&log), ["A.exec"]);
    assert!(scheduler.is_scheduled(&a));

    scheduler.run();
    assert_eq!(take(&log), ["A.exec", "A.end(false)"]);
    assert!(!scheduler.is_scheduled(&a));
    assert_eq!(a.state(), CommandState::Disjoint);

    scheduler.run();
    assert!(take(&log).is_empty());
}

#[test]
fn commands_execute_in_scheduling_order() {
    let scheduler = CommandScheduler::default();
    let log = log();
    let a = probe("A", &log, None, &[]);
    let b = probe("B", &log, None, &[]);
    scheduler.schedule(&b).unwrap();
    scheduler.schedule(&a).unwrap();
    take(&log);

    scheduler.run();
    assert_eq!(take(&log), ["B.exec", "A.exec"]);
    assert_eq!(scheduler.scheduled(), [b, a]);
}

#[test]
fn scheduling_twice_is_rejected() {
    let scheduler = CommandScheduler::default();
    let log = log();
    let a = probe("A", &log, None, &[]);
    scheduler.schedule(&a).unwrap();
    assert!(matches!(
        scheduler.schedule(&a),
        Err(ScheduleError::AlreadyScheduled { .. })
    ));
    assert_eq!(take(&log), ["A.init"]);
}

#[test]
fn incoming_command_interrupts_owner() {
    let scheduler = CommandScheduler::default();
    let arm = Subsystem::new("arm");
    let log = log();
    let a = probe("A", &log, None, &[&arm]);
    let b = probe("B", &log, None, &[&arm]);

    scheduler.schedule(&a).unwrap();
    scheduler.schedule(&b).unwrap();
    assert_eq!(take(&log), ["A.init", "A.end(true)", "B.init"]);
    assert_eq!(scheduler.requiring(&arm), Some(b));
    assert!(!scheduler.is_scheduled(&a));
}

#[test]
fn conflict_is_all_or_nothing() {
    let scheduler = CommandScheduler::default();
    let left = Subsystem::new("left");
    let right = Subsystem::new("right");
    let log = log();
    let y = probe("Y", &log, None, &[&left]);
    let x = stubborn("X", &log, &[&right]);
    let z = probe("Z", &log, None, &[&left, &right]);

    scheduler.schedule(&y).unwrap();
    scheduler.schedule(&x).unwrap();
    take(&log);

    let err = scheduler.schedule(&z).unwrap_err();
    assert_eq!(
        err,
        ScheduleError::Conflict {
            command: "Z".into(),
            subsystem: "right".into(),
            owner: "X".into(),
        }
    );
    // Nothing was displaced, not even the interruptible owner.
    assert!(take(&log).is_empty());
    assert_eq!(scheduler.requiring(&left), Some(y.clone()));
    assert_eq!(scheduler.requiring(&right), Some(x.clone()));
    assert_eq!(z.state(), CommandState::Disjoint);

    scheduler.cancel(&x);
    scheduler.schedule(&z).unwrap();
    assert_eq!(take(&log), ["X.end(true)", "Y.end(true)", "Z.init"]);
    assert_eq!(scheduler.scheduled(), [z]);
}

#[test]
fn owner_holding_two_requirements_is_ended_once() {
    let scheduler = CommandScheduler::default();
    let left = Subsystem::new("left");
    let right = Subsystem::new("right");
    let log = log();
    let wide = probe("wide", &log, None, &[&left, &right]);
    let narrow = probe("narrow", &log, None, &[&left, &right]);

    scheduler.schedule(&wide).unwrap();
    scheduler.schedule(&narrow).unwrap();
    assert_eq!(take(&log), ["wide.init", "wide.end(true)", "narrow.init"]);
}

#[test]
fn cancel_ends_exactly_once() {
    let scheduler = CommandScheduler::default();
    let log = log();
    let a = probe("A", &log, None, &[]);
    let idle = probe("idle", &log, None, &[]);

    scheduler.cancel(&idle);
    scheduler.schedule(&a).unwrap();
    scheduler.cancel(&a);
    scheduler.cancel(&a);
    scheduler.run();
    assert_eq!(take(&log), ["A.init", "A.end(true)"]);
}

#[test]
fn cancel_all_interrupts_everything() {
    let scheduler = CommandScheduler::default();
    let log = log();
    let a = probe("A", &log, None, &[]);
    let b = probe("B", &log, None, &[]);
    scheduler.schedule(&a).unwrap();
    scheduler.schedule(&b).unwrap();
    take(&log);

    scheduler.cancel_all();
    assert_eq!(take(&log), ["A.end(true)", "B.end(true)"]);
    assert!(scheduler.scheduled().is_empty());
}

#[test]
fn composed_command_cannot_be_scheduled() {
    let scheduler = CommandScheduler::default();
    let log = log();
    let a = probe("A", &log, None, &[]);
    let _group = Command::sequence("group", [a.clone()]).unwrap();

    assert!(matches!(
        scheduler.schedule(&a),
        Err(ScheduleError::Composed { .. })
    ));
    assert!(take(&log).is_empty());
}

#[test]
fn default_command_yields_and_returns_in_the_same_tick() {
    let scheduler = CommandScheduler::default();
    let drive = Subsystem::new("drive");
    let log = log();
    let default = probe("D", &log, None, &[&drive]);
    let burst = probe("C", &log, Some(1), &[&drive]);
    scheduler
        .set_default_command(&drive, default.clone())
        .unwrap();

    scheduler.run();
    assert_eq!(take(&log), ["D.init"]);
    scheduler.run();
    assert_eq!(take(&log), ["D.exec"]);

    scheduler.schedule(&burst).unwrap();
    assert_eq!(take(&log), ["D.end(true)", "C.init"]);

    scheduler.run();
    assert_eq!(take(&log), ["C.exec", "C.end(false)", "D.init"]);
    assert_eq!(scheduler.requiring(&drive), Some(default));
}

#[test]
fn default_command_must_require_its_subsystem() {
    let scheduler = CommandScheduler::default();
    let drive = Subsystem::new("drive");
    let log = log();
    let stray = probe("stray", &log, None, &[]);
    assert!(matches!(
        scheduler.set_default_command(&drive, stray),
        Err(ScheduleError::MissingRequirement { .. })
    ));
    assert!(scheduler.default_command(&drive).is_none());
}

#[test]
fn removed_or_unregistered_defaults_stop_running() {
    let scheduler = CommandScheduler::default();
    let drive = Subsystem::new("drive");
    let arm = Subsystem::new("arm");
    let log = log();
    let d = probe("D", &log, Some(1), &[&drive]);
    let a = probe("A", &log, Some(1), &[&arm]);
    scheduler.set_default_command(&drive, d.clone()).unwrap();
    scheduler.set_default_command(&arm, a).unwrap();

    assert_eq!(scheduler.remove_default_command(&drive), Some(d));
    scheduler.unregister_subsystem(&arm);
    scheduler.run();
    scheduler.run();
    assert!(take(&log).is_empty());
}

#[test]
fn duplicate_subsystem_names_are_rejected() {
    let scheduler = CommandScheduler::default();
    let first = Subsystem::new("intake");
    let second = Subsystem::new("intake");
    scheduler.register_subsystem(&first).unwrap();
    scheduler.register_subsystem(&first).unwrap();
    assert_eq!(
        scheduler.register_subsystem(&second),
        Err(ScheduleError::DuplicateSubsystem {
            name: "intake".into()
        })
    );
}

#[test]
fn subsystem_periodic_runs_every_tick_before_commands() {
    let scheduler = CommandScheduler::default();
    let log = log();
    let l = Rc::clone(&log);
    let drive = Subsystem::with_periodic("drive", move || l.borrow_mut().push("periodic".into()));
    scheduler.register_subsystem(&drive).unwrap();
    let a = probe("A", &log, None, &[]);
    scheduler.schedule(&a).unwrap();
    take(&log);

    scheduler.run();
    scheduler.run();
    assert_eq!(take(&log), ["periodic", "A.exec", "periodic", "A.exec"]);
}

#[test]
fn schedule_from_execute_is_deferred_to_after_the_pass() {
    let scheduler = Rc::new(CommandScheduler::default());
    let log = log();
    let b = probe("B", &log, None, &[]);

    let (s, l, target) = (Rc::clone(&scheduler), Rc::clone(&log), b.clone());
    let a = Command::builder("A").build(RunCommand::new(move || {
        l.borrow_mut().push("A.exec".into());
        let outcome = match s.schedule(&target) {
            Ok(()) => "A.scheduled",
            Err(ScheduleError::AlreadyScheduled { .. }) => "A.rejected",
            Err(_) => "A.error",
        };
        l.borrow_mut().push(outcome.into());
    }));
    scheduler.schedule(&a).unwrap();

    scheduler.run();
    // Queued while iterating, so B initializes after A's execute returns
    // and does not execute this tick.
    assert_eq!(take(&log), ["A.exec", "A.scheduled", "B.init"]);

    // B is running now; the misuse is reported to the caller, not queued.
    scheduler.run();
    assert_eq!(take(&log), ["A.exec", "A.rejected", "B.exec"]);
}

#[test]
fn schedule_from_execute_reports_disabled_and_duplicate_requests() {
    let scheduler = Rc::new(CommandScheduler::default());
    let log = log();
    let b = probe("B", &log, None, &[]);
    let results: Rc<RefCell<Vec<Result<(), ScheduleError>>>> = Rc::default();

    let (s, r, target) = (Rc::clone(&scheduler), Rc::clone(&results), b.clone());
    let a = Command::builder("A")
        .runs_when_disabled(true)
        .build(RunCommand::new(move || {
            r.borrow_mut().push(s.schedule(&target));
            r.borrow_mut().push(s.schedule(&target));
        }));
    scheduler.schedule(&a).unwrap();

    scheduler.set_enabled(false);
    scheduler.run();
    assert!(matches!(
        results.borrow()[..],
        [Err(ScheduleError::Disabled { .. }), Err(ScheduleError::Disabled { .. })]
    ));
    assert!(!scheduler.is_scheduled(&b));

    results.borrow_mut().clear();
    scheduler.set_enabled(true);
    scheduler.run();
    assert!(matches!(
        results.borrow()[..],
        [Ok(()), Err(ScheduleError::AlreadyScheduled { .. })]
    ));
    assert!(scheduler.is_scheduled(&b));
    assert_eq!(take(&log), ["B.init"]);
}

#[test]
fn cancel_from_execute_ends_target_before_returning() {
    let scheduler = Rc::new(CommandScheduler::default());
    let log = log();
    let b = probe("B", &log, None, &[]);

    let (s, l, target) = (Rc::clone(&scheduler), Rc::clone(&log), b.clone());
    let a = Command::builder("A").build(RunCommand::new(move || {
        s.cancel(&target);
        let still = s.is_scheduled(&target);
        l.borrow_mut().push(format!("A.cancel returned, scheduled={still}"));
    }));
    scheduler.schedule(&a).unwrap();
    scheduler.schedule(&b).unwrap();
    take(&log);

    scheduler.run();
    // B was ended inside the call and skipped for the rest of the pass.
    assert_eq!(
        take(&log),
        ["B.end(true)", "A.cancel returned, scheduled=false"]
    );
    assert_eq!(scheduler.scheduled(), [a]);
}

#[test]
fn self_cancel_from_execute_applies_once_the_callback_returns() {
    let scheduler = Rc::new(CommandScheduler::default());
    let log = log();
    let me: Rc<RefCell<Option<Command>>> = Rc::default();

    let (s, l, slot) = (Rc::clone(&scheduler), Rc::clone(&log), Rc::clone(&me));
    let l_end = Rc::clone(&log);
    let a = Command::builder("A").build(FunctionalCommand::new(
        || {},
        move || {
            if let Some(this) = slot.borrow().as_ref() {
                s.cancel(this);
                let still = s.is_scheduled(this);
                l.borrow_mut().push(format!("A.cancel returned, scheduled={still}"));
            }
        },
        move |interrupted| l_end.borrow_mut().push(format!("A.end({interrupted})")),
        || false,
    ));
    *me.borrow_mut() = Some(a.clone());
    scheduler.schedule(&a).unwrap();

    scheduler.run();
    assert_eq!(
        take(&log),
        ["A.cancel returned, scheduled=true", "A.end(true)"]
    );
    assert!(!scheduler.is_scheduled(&a));
    me.borrow_mut().take();
}

#[test]
fn disabled_scheduler_interrupts_and_rejects() {
    let scheduler = CommandScheduler::default();
    let log = log();
    let normal = probe("N", &log, None, &[]);
    let always = Command::builder("W")
        .runs_when_disabled(true)
        .build(super::Probe::new("W", &log, None));

    scheduler.schedule(&normal).unwrap();
    scheduler.schedule(&always).unwrap();
    take(&log);

    scheduler.set_enabled(false);
    assert!(!scheduler.is_enabled());
    scheduler.run();
    assert_eq!(take(&log), ["N.end(true)", "W.exec"]);

    assert!(matches!(
        scheduler.schedule(&normal),
        Err(ScheduleError::Disabled { .. })
    ));

    scheduler.set_enabled(true);
    scheduler.schedule(&normal).unwrap();
    assert_eq!(take(&log), ["N.init"]);
}

#[test]
fn listeners_see_only_masked_events() {
    let scheduler = CommandScheduler::default();
    let log = log();
    let events: Rc<RefCell<Vec<(String, CommandEvent)>>> = Rc::default();
    let e = Rc::clone(&events);
    scheduler.on_command_event(
        CommandEvent::INITIALIZE | CommandEvent::FINISH | CommandEvent::INTERRUPT,
        move |command, event| e.borrow_mut().push((command.name().to_string(), event)),
    );

    let once = probe("once", &log, Some(1), &[]);
    let forever = probe("forever", &log, None, &[]);
    scheduler.schedule(&once).unwrap();
    scheduler.schedule(&forever).unwrap();
    scheduler.run();
    scheduler.cancel(&forever);

    let seen = events.borrow().clone();
    let expected = [
        ("once", CommandEvent::INITIALIZE),
        ("forever", CommandEvent::INITIALIZE),
        ("once", CommandEvent::FINISH),
        ("forever", CommandEvent::INTERRUPT),
    ]
    .map(|(n, e)| (n.to_string(), e));
    assert_eq!(seen, expected);
}

#[test]
fn stats_count_ticks() {
    let scheduler = CommandScheduler::new(&SchedulerConfig { period_ms: 1000 });
    assert_eq!(scheduler.period().as_millis(), 1000);
    for _ in 0..5 {
        scheduler.run();
    }
    let stats = scheduler.stats();
    assert_eq!(stats.ticks, 5);
    assert_eq!(stats.overruns, 0);
    assert!(stats.max >= stats.last);
    assert!(stats.average() <= stats.max);
}

#[test]
#[should_panic(expected = "concurrent modification")]
fn nested_run_panics() {
    let scheduler = Rc::new(CommandScheduler::default());
    let s = Rc::clone(&scheduler);
    let a = Command::builder("A").build(RunCommand::new(move || s.run()));
    scheduler.schedule(&a).unwrap();
    scheduler.run();
}

#[test]
#[should_panic(expected = "concurrent modification")]
fn binding_during_a_tick_panics() {
    let scheduler = Rc::new(CommandScheduler::default());
    let s = Rc::clone(&scheduler);
    let a = Command::builder("A").build(RunCommand::new(move || {
        s.bind_action(Trigger::never(), || {});
    }));
    scheduler.schedule(&a).unwrap();
    scheduler.run();
}

#[test]
#[should_panic(expected = "concurrent modification")]
fn registering_a_subsystem_during_a_tick_panics() {
    let scheduler = Rc::new(CommandScheduler::default());
    let s = Rc::clone(&scheduler);
    let drive = Subsystem::with_periodic("drive", move || {
        let _ = s.register_subsystem(&Subsystem::new("late"));
    });
    scheduler.register_subsystem(&drive).unwrap();
    scheduler.run();
}
