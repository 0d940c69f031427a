use crate::sim::{Event, SimError, SimTime, Simulator, World};
use std::any::Any;
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct DummyWorld {
    ticks: usize,
    fatal: Vec<String>,
}

impl World for DummyWorld {
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn on_tick(&mut self, _sim: &mut Simulator) {
        self.ticks = self.ticks.saturating_add(1);
    }

    fn on_fatal(&mut self, _now: SimTime, err: &SimError) {
        self.fatal.push(err.to_string());
    }
}

struct Push {
    id: u32,
    log: Arc<Mutex<Vec<(u32, SimTime)>>>,
}

impl Event for Push {
    fn execute(self: Box<Self>, sim: &mut Simulator, _world: &mut dyn World) -> Result<(), SimError> {
        let Push { id, log } = *self;
        log.lock().expect("log lock").push((id, sim.now()));
        Ok(())
    }
}

struct PushThenScheduleNow {
    id: u32,
    next_id: u32,
    log: Arc<Mutex<Vec<(u32, SimTime)>>>,
}

impl Event for PushThenScheduleNow {
    fn execute(self: Box<Self>, sim: &mut Simulator, _world: &mut dyn World) -> Result<(), SimError> {
        let PushThenScheduleNow { id, next_id, log } = *self;
        log.lock().expect("log lock").push((id, sim.now()));
        sim.schedule(sim.now(), Push { id: next_id, log })
    }
}

/// 尝试调度到过去
struct ScheduleInPast;

impl Event for ScheduleInPast {
    fn execute(self: Box<Self>, sim: &mut Simulator, _world: &mut dyn World) -> Result<(), SimError> {
        sim.schedule(SimTime(1), ScheduleInPast)
    }
}

fn ids(log: &Arc<Mutex<Vec<(u32, SimTime)>>>) -> Vec<u32> {
    log.lock().expect("log lock").iter().map(|(id, _)| *id).collect()
}

#[test]
fn scheduled_events_order_by_time_then_seq() {
    let log = Arc::new(Mutex::new(Vec::new()));

    let mut sim = Simulator::default();
    for (id, at) in [(1, 10), (2, 5), (3, 10)] {
        sim.schedule(
            SimTime(at),
            Push {
                id,
                log: Arc::clone(&log),
            },
        )
        .expect("schedule");
    }
    assert_eq!(sim.len(), 3);
    assert_eq!(sim.peek_time(), Some(SimTime(5)));

    let mut world = DummyWorld::default();
    let executed = sim.run(&mut world).expect("run");

    assert_eq!(executed, 3);
    assert_eq!(ids(&log), vec![2, 1, 3]);
    assert_eq!(world.ticks, 3);
    assert_eq!(sim.now(), SimTime(10));
    assert!(sim.is_empty());
}

#[test]
fn handlers_observe_non_decreasing_time() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut sim = Simulator::default();
    for (id, at) in [(1u32, 30u64), (2, 10), (3, 20), (4, 10), (5, 0)] {
        sim.schedule(
            SimTime(at),
            Push {
                id,
                log: Arc::clone(&log),
            },
        )
        .expect("schedule");
    }
    sim.run(&mut DummyWorld::default()).expect("run");

    let times: Vec<SimTime> = log.lock().expect("log lock").iter().map(|(_, t)| *t).collect();
    assert!(times.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(ids(&log), vec![5, 2, 4, 3, 1]);
}

#[test]
fn event_scheduled_at_same_time_inside_event_runs_after_current_event() {
    let log = Arc::new(Mutex::new(Vec::new()));

    let mut sim = Simulator::default();
    sim.schedule(
        SimTime::ZERO,
        PushThenScheduleNow {
            id: 1,
            next_id: 2,
            log: Arc::clone(&log),
        },
    )
    .expect("schedule");

    let mut world = DummyWorld::default();
    sim.run(&mut world).expect("run");

    assert_eq!(ids(&log), vec![1, 2]);
    assert_eq!(world.ticks, 2);
    assert_eq!(sim.now(), SimTime::ZERO);
}

#[test]
fn run_until_skips_events_after_until_and_advances_time() {
    let log = Arc::new(Mutex::new(Vec::new()));

    let mut sim = Simulator::default();
    for (id, at) in [(1, 0), (2, 10)] {
        sim.schedule(
            SimTime(at),
            Push {
                id,
                log: Arc::clone(&log),
            },
        )
        .expect("schedule");
    }

    let mut world = DummyWorld::default();
    assert_eq!(sim.run_until(SimTime(5), &mut world).expect("run_until"), 1);
    assert_eq!(ids(&log), vec![1]);
    assert_eq!(sim.now(), SimTime(5));

    sim.run(&mut world).expect("run");
    assert_eq!(ids(&log), vec![1, 2]);
    assert_eq!(sim.now(), SimTime(10));
}

#[test]
fn run_until_executes_events_scheduled_exactly_at_until() {
    let log = Arc::new(Mutex::new(Vec::new()));

    let mut sim = Simulator::default();
    sim.schedule(
        SimTime(5),
        Push {
            id: 1,
            log: Arc::clone(&log),
        },
    )
    .expect("schedule");

    let mut world = DummyWorld::default();
    sim.run_until(SimTime(5), &mut world).expect("run_until");

    assert_eq!(ids(&log), vec![1]);
    assert_eq!(sim.now(), SimTime(5));
}

#[test]
fn schedule_in_the_past_is_rejected() {
    let mut sim = Simulator::default();
    sim.run_until(SimTime(10), &mut DummyWorld::default())
        .expect("run_until");

    let err = sim.schedule(SimTime(3), ScheduleInPast).expect_err("past");
    assert!(matches!(
        err,
        SimError::ScheduleInPast {
            at: SimTime(3),
            now: SimTime(10)
        }
    ));
    assert!(sim.is_empty());
}

#[test]
fn failing_event_halts_run_and_reports_fatal() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut sim = Simulator::default();
    sim.schedule(SimTime(5), ScheduleInPast).expect("schedule");
    sim.schedule(
        SimTime(6),
        Push {
            id: 9,
            log: Arc::clone(&log),
        },
    )
    .expect("schedule");

    let mut world = DummyWorld::default();
    let err = sim.run(&mut world).expect_err("fatal");

    assert!(matches!(err, SimError::ScheduleInPast { .. }));
    assert_eq!(world.fatal.len(), 1);
    assert!(ids(&log).is_empty(), "run must stop at the failing event");
    assert_eq!(sim.len(), 1);
}

#[test]
fn scheduled_events_expose_kind_and_target() {
    use crate::net::{FlowId, FlowPathSetup, NodeId};
    use crate::sim::EventKind;

    let log = Arc::new(Mutex::new(Vec::new()));
    let mut sim = Simulator::default();
    sim.schedule(SimTime(5), Push { id: 1, log }).expect("schedule push");
    sim.schedule(
        SimTime(3),
        FlowPathSetup {
            switch: NodeId(4),
            flow: FlowId(1),
            next_hop: NodeId(5),
        },
    )
    .expect("schedule setup");

    let first = sim.pop_next().expect("setup event");
    assert_eq!(first.kind(), EventKind::FlowPathSetup);
    assert_eq!(first.target(), Some(NodeId(4)));
    let second = sim.pop_next().expect("push event");
    assert_eq!(second.kind(), EventKind::Custom);
    assert_eq!(second.target(), None);
}
