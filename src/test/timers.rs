use crate::proto::{TimerKind, TimerTable};
use crate::sim::SimTime;

#[test]
fn rearming_invalidates_the_previous_version() {
    let mut t = TimerTable::default();
    let first = t.arm(TimerKind::Interval, SimTime(10));
    let second = t.arm(TimerKind::Interval, SimTime(20));

    assert_ne!(first, second);
    assert!(!t.is_active(first));
    assert!(t.is_active(second));
    assert!(!t.fire(first), "stale timeout must be a no-op");
    assert!(t.fire(second));
    assert!(!t.fire(second), "a timer fires at most once");
}

#[test]
fn cancel_disarms_without_touching_other_kinds() {
    let mut t = TimerTable::default();
    let cycle = t.arm(TimerKind::TimeToCycle, SimTime(5));
    let gap = t.arm(TimerKind::InterSegmentDelay, SimTime(7));

    t.cancel(TimerKind::TimeToCycle);
    assert!(!t.fire(cycle));
    assert!(t.is_armed(TimerKind::InterSegmentDelay));

    t.cancel_all();
    assert!(!t.fire(gap));
    assert!(t.next_due().is_none());
}

#[test]
fn next_due_returns_the_earliest_armed_timer() {
    let mut t = TimerTable::default();
    t.arm(TimerKind::Interval, SimTime(30));
    let gap = t.arm(TimerKind::InterSegmentDelay, SimTime(12));
    t.arm(TimerKind::InitialDelay, SimTime(20));

    assert_eq!(t.next_due(), Some((SimTime(12), gap)));
    t.fire(gap);
    assert_eq!(t.next_due().map(|(at, id)| (at, id.kind)), Some((SimTime(20), TimerKind::InitialDelay)));
}
