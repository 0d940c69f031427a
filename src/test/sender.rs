use crate::net::{CongestionFields, FlowId, NodeId, Segment, SegmentKind};
use crate::proto::{FlowSpec, Sender, SenderState, TimerKind, TransportAgent};
use crate::sim::{DiagnosticLog, SimConfig, SimError, SimTime, Simulator, Severity};

const SRC: NodeId = NodeId(1);
const DST: NodeId = NodeId(2);

fn us(v: u64) -> SimTime {
    SimTime::from_micros(v)
}

fn ctrl(window: u64, gap: SimTime, interval: SimTime, initial: SimTime, after: SimTime) -> Segment {
    Segment::new(FlowId::CONTROL, SegmentKind::Ctrl, 0, 64, NodeId(0), SRC).with_cc(
        CongestionFields {
            big_rtt: interval,
            window,
            inter_segment_delay: gap,
            time_to_next_cycle: after,
            interval,
            initial_delay: initial,
        },
    )
}

fn reply(kind: SegmentKind, seq: u64) -> Segment {
    Segment::new(FlowId(1).ack_stream(), kind, seq, 64, DST, SRC)
}

struct Harness {
    s: Sender,
    sim: Simulator,
    diag: DiagnosticLog,
}

impl Harness {
    fn new(size_segments: u64) -> Self {
        let spec = FlowSpec {
            id: FlowId(1),
            src: SRC,
            dst: DST,
            size_segments,
            start: SimTime::ZERO,
        };
        let mut h = Self {
            s: Sender::new(&spec, &SimConfig::default()),
            sim: Simulator::default(),
            diag: DiagnosticLog::default(),
        };
        h.s.start(&mut h.sim).expect("start");
        h
    }

    fn recv(&mut self, seg: Segment) {
        self.s
            .recv_segment(seg, &mut self.sim, &mut self.diag)
            .expect("recv_segment");
    }

    /// 推进时钟到最早的有效定时器并触发它
    fn fire_next(&mut self) -> TimerKind {
        let (at, id) = self.s.timers().next_due().expect("an armed timer");
        while self.sim.peek_time().is_some_and(|t| t <= at) {
            self.sim.pop_next();
        }
        assert_eq!(self.sim.now(), at);
        self.s
            .timeout(id, &mut self.sim, &mut self.diag)
            .expect("timeout");
        id.kind
    }

    fn sent(&mut self) -> Vec<(SegmentKind, u64)> {
        self.s
            .take_outbox()
            .into_iter()
            .map(|seg| (seg.kind, seg.seq))
            .collect()
    }

    fn sent_data(&mut self) -> Vec<u64> {
        self.sent()
            .into_iter()
            .filter(|(k, _)| *k == SegmentKind::Data)
            .map(|(_, seq)| seq)
            .collect()
    }

    /// SYN/SYNACK 握手完成并开始第一个周期
    fn handshake_and_cycle(&mut self, cc: Segment) {
        assert_eq!(self.sent(), vec![(SegmentKind::Syn, 0)]);
        self.recv(reply(SegmentKind::SynAck, 0));
        assert_eq!(self.s.state(), SenderState::CycleWait);
        self.recv(cc);
        assert_eq!(self.fire_next(), TimerKind::TimeToCycle);
    }
}

#[test]
fn five_segment_flow_sends_in_order_and_fins_after_last_ack() {
    let mut h = Harness::new(5);
    h.handshake_and_cycle(ctrl(5, us(1), us(100), SimTime::ZERO, us(10)));

    assert_eq!(h.s.state(), SenderState::SendingInterval);
    assert_eq!(h.s.record().data_start_time, Some(us(10)));
    let mut data = h.sent_data();
    for _ in 0..4 {
        assert_eq!(h.fire_next(), TimerKind::InterSegmentDelay);
        data.extend(h.sent_data());
    }
    assert_eq!(data, vec![1, 2, 3, 4, 5]);
    assert_eq!(h.s.remaining(), 0);
    assert_eq!(h.s.sent_in_interval(), 5);

    for seq in 1..=4 {
        h.recv(reply(SegmentKind::Ack, seq));
        assert!(h.sent().is_empty(), "no FIN before the last ACK");
    }
    h.recv(reply(SegmentKind::Ack, 5));
    assert_eq!(h.sent(), vec![(SegmentKind::UncontrolledFin, 6)]);
    assert_eq!(h.s.state(), SenderState::Done);
    assert!(h.s.record().is_completed());
    assert!(h.s.timers().next_due().is_none());

    // 重复的 ACK 不会再发 FIN
    h.recv(reply(SegmentKind::Ack, 5));
    assert!(h.sent().is_empty());

    h.recv(reply(SegmentKind::FinAck, 6));
    assert!(h.s.record().fin_ack_time.is_some());
}

#[test]
fn nacked_segment_is_retransmitted_before_new_data() {
    let mut h = Harness::new(10);
    h.handshake_and_cycle(ctrl(5, us(1), us(100), SimTime::ZERO, us(10)));
    let mut first = h.sent_data();
    for _ in 0..4 {
        h.fire_next();
        first.extend(h.sent_data());
    }
    assert_eq!(first, vec![1, 2, 3, 4, 5]);

    h.recv(reply(SegmentKind::Nack, 3));
    assert_eq!(h.s.pending_retransmissions(), 1);

    assert_eq!(h.fire_next(), TimerKind::Interval);
    let mut second = h.sent_data();
    while h.s.timers().is_armed(TimerKind::InterSegmentDelay) {
        h.fire_next();
        second.extend(h.sent_data());
    }
    assert_eq!(second, vec![3, 6, 7, 8, 9]);
    assert!(h.s.sent_in_interval() <= 5);
    assert_eq!(h.s.record().retransmissions, 1);
    assert_eq!(h.s.remaining(), 1);
}

#[test]
fn unsent_new_data_is_renumbered_in_the_next_interval() {
    // 间隔 100us 内只来得及发 4 个（段间隔 30us）
    let mut h = Harness::new(20);
    h.handshake_and_cycle(ctrl(5, us(30), us(100), SimTime::ZERO, us(10)));
    let mut first = h.sent_data();
    for _ in 0..3 {
        assert_eq!(h.fire_next(), TimerKind::InterSegmentDelay);
        first.extend(h.sent_data());
    }
    assert_eq!(first, vec![1, 2, 3, 4]);

    assert_eq!(h.fire_next(), TimerKind::Interval);
    assert_eq!(h.sim.now(), us(110));
    assert_eq!(h.sent_data(), vec![5]);
    assert_eq!(h.s.remaining(), 15);
    assert_eq!(h.s.sent_in_interval(), 1);
}

#[test]
fn initial_delay_postpones_the_first_interval() {
    let mut h = Harness::new(3);
    h.handshake_and_cycle(ctrl(3, us(1), us(50), us(7), us(10)));
    assert_eq!(h.s.state(), SenderState::InitialDelay);
    assert!(h.sent_data().is_empty());

    assert_eq!(h.fire_next(), TimerKind::InitialDelay);
    assert_eq!(h.sim.now(), us(17));
    assert_eq!(h.sent_data(), vec![1]);
}

#[test]
fn newer_ctrl_replaces_the_pending_cycle() {
    let mut h = Harness::new(4);
    assert_eq!(h.sent(), vec![(SegmentKind::Syn, 0)]);
    h.recv(reply(SegmentKind::SynAck, 0));
    h.recv(ctrl(1, us(1), us(100), SimTime::ZERO, us(10)));
    h.recv(ctrl(4, us(1), us(80), SimTime::ZERO, us(20)));

    assert_eq!(h.fire_next(), TimerKind::TimeToCycle);
    assert_eq!(h.sim.now(), us(20));
    assert_eq!(h.s.params().window, 4);
    assert_eq!(h.s.params().interval, us(80));
}

#[test]
fn cycle_before_syn_ack_is_skipped_with_a_warning() {
    let mut h = Harness::new(5);
    assert_eq!(h.sent(), vec![(SegmentKind::Syn, 0)]);
    h.recv(ctrl(5, us(1), us(100), SimTime::ZERO, us(10)));

    assert_eq!(h.fire_next(), TimerKind::TimeToCycle);
    assert!(h.sent().is_empty());
    assert_eq!(h.s.state(), SenderState::AwaitingSynAck);
    assert_eq!(h.diag.count(Severity::Warning), 1);
}

#[test]
fn zero_interval_is_an_invalid_cycle() {
    let mut h = Harness::new(5);
    assert_eq!(h.sent(), vec![(SegmentKind::Syn, 0)]);
    h.recv(reply(SegmentKind::SynAck, 0));
    h.recv(ctrl(5, us(1), SimTime::ZERO, SimTime::ZERO, us(10)));

    let (_, id) = h.s.timers().next_due().expect("cycle timer");
    while h.sim.pop_next().is_some() {}
    let err = h
        .s
        .timeout(id, &mut h.sim, &mut h.diag)
        .expect_err("invalid cycle");
    assert!(matches!(err, SimError::InvalidCycle { .. }));
}

#[test]
fn unexpected_segment_kind_is_fatal() {
    let mut h = Harness::new(5);
    let err = h
        .s
        .recv_segment(reply(SegmentKind::Syn, 0), &mut h.sim, &mut h.diag)
        .expect_err("sender never receives SYN");
    assert!(matches!(
        err,
        SimError::UnexpectedSegment {
            component: "Sender",
            kind: SegmentKind::Syn,
            ..
        }
    ));
}

#[test]
fn data_departures_are_recorded_in_the_flow_record() {
    let mut h = Harness::new(2);
    h.s.on_data_departure(1, us(3));
    h.s.on_data_departure(1, us(9));
    let record = h.s.flow_record().expect("sender keeps a record");
    assert_eq!(record.data_send_times.get(&1), Some(&us(9)));
}
