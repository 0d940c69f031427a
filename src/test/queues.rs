use crate::net::{FlowId, Link, LinkId, NodeId, Packet, Segment, SegmentKind, tx_time};
use crate::queue::{Buffer, BufferToken};
use crate::sim::SimTime;

const HOST: NodeId = NodeId(1);

fn seg(kind: SegmentKind, src: NodeId, bytes: u32) -> Packet {
    Packet::Segment(Segment::new(FlowId(1), kind, 1, bytes, src, NodeId(9)))
}

fn us(v: u64) -> SimTime {
    SimTime::from_micros(v)
}

#[test]
fn tx_time_rounds_up_to_whole_nanoseconds() {
    // 1500B @ 10Gbps = 1.2us
    assert_eq!(tx_time(1500, 10_000_000_000), SimTime(1_200));
    // 64B @ 3Gbps = 170.66..ns -> 171ns
    assert_eq!(tx_time(64, 3_000_000_000), SimTime(171));
}

#[test]
fn buffer_capacity_one_drops_second_back_to_back_enqueue() {
    let mut link = Link::new(LinkId(0), NodeId(0), NodeId(1), us(1), 10_000_000_000, 1);
    let pkt = seg(SegmentKind::Data, HOST, 1500);

    let wait = link.enqueue(SimTime::ZERO, &pkt).expect("first fits");
    assert_eq!(wait, SimTime::ZERO);
    let dropped = link.enqueue(SimTime::ZERO, &pkt).expect_err("second drops");
    assert_eq!(dropped.capacity, 1);
    assert_eq!(link.buffer.occupancy(), 1);
    assert_eq!(link.buffer.drops(), 1);

    assert!(link.buffer.dequeue());
    assert_eq!(link.buffer.occupancy(), 0);
    assert!(!link.buffer.dequeue(), "dequeue from empty buffer must fail");
}

#[test]
fn back_to_back_packets_serialize_behind_each_other() {
    let mut link = Link::new(LinkId(0), NodeId(0), NodeId(1), us(2), 10_000_000_000, 10);
    let pkt = seg(SegmentKind::Data, HOST, 1500);

    let w1 = link.enqueue(SimTime::ZERO, &pkt).expect("fits");
    let w2 = link.enqueue(SimTime::ZERO, &pkt).expect("fits");
    assert_eq!(w1, SimTime::ZERO);
    assert_eq!(w2, SimTime(1_200));
    assert_eq!(link.total_delay(1500, w2), SimTime(1_200 + 1_200 + 2_000));
    assert_eq!(link.buffer.busy_until(), SimTime(2_400));
}

#[test]
fn token_gate_admits_previous_window_then_waits_for_next_cycle() {
    let mut buf = Buffer::new(100);
    let token = BufferToken::activate(us(10), 2, us(100), 3);
    buf.update_token_list(SimTime::ZERO, HOST, Some(token));
    assert_eq!(buf.token_of(HOST), Some(&token));

    let data = seg(SegmentKind::Data, HOST, 1500);
    let tx = us(1);
    assert_eq!(buf.enqueue(SimTime::ZERO, &data, tx), Ok(us(10)));
    assert_eq!(buf.enqueue(SimTime::ZERO, &data, tx), Ok(us(11)));
    // cycle 0 的 2 个名额用完，等到 cycle 1（10 + 100）
    assert_eq!(buf.enqueue(SimTime::ZERO, &data, tx), Ok(us(110)));
    assert_eq!(buf.enqueue(SimTime::ZERO, &data, tx), Ok(us(111)));
    assert_eq!(buf.enqueue(SimTime::ZERO, &data, tx), Ok(us(112)));
    // cycle 1 的窗口是 3
    assert_eq!(buf.enqueue(SimTime::ZERO, &data, tx), Ok(us(210)));
}

#[test]
fn token_gate_only_applies_to_data_from_the_gated_host() {
    let mut buf = Buffer::new(100);
    buf.update_token_list(
        SimTime::ZERO,
        HOST,
        Some(BufferToken::activate(us(50), 1, us(100), 1)),
    );
    let tx = us(1);

    assert_eq!(buf.enqueue(SimTime::ZERO, &seg(SegmentKind::Syn, HOST, 64), tx), Ok(SimTime::ZERO));
    assert_eq!(
        buf.enqueue(SimTime::ZERO, &seg(SegmentKind::Data, NodeId(2), 1500), tx),
        Ok(us(1))
    );
    assert_eq!(buf.enqueue(SimTime::ZERO, &seg(SegmentKind::Data, HOST, 1500), tx), Ok(us(50)));
}

#[test]
fn inactive_or_empty_tokens_remove_the_gate() {
    let mut buf = Buffer::new(100);
    buf.update_token_list(
        SimTime::ZERO,
        HOST,
        Some(BufferToken::activate(us(50), 1, us(100), 1)),
    );
    buf.update_token_list(SimTime::ZERO, HOST, Some(BufferToken::activate(us(50), 1, us(100), 0)));
    assert!(buf.token_of(HOST).is_none());

    buf.update_token_list(
        SimTime::ZERO,
        HOST,
        Some(BufferToken::activate(us(50), 1, us(100), 1)),
    );
    buf.update_token_list(SimTime::ZERO, HOST, None);
    assert!(buf.token_of(HOST).is_none());

    let data = seg(SegmentKind::Data, HOST, 1500);
    assert_eq!(buf.enqueue(SimTime::ZERO, &data, us(1)), Ok(SimTime::ZERO));
}

#[test]
fn zero_steady_delay_opens_every_cycle_at_once() {
    let mut buf = Buffer::new(100);
    buf.update_token_list(
        SimTime::ZERO,
        HOST,
        Some(BufferToken::activate(SimTime::ZERO, 1, SimTime::ZERO, 1)),
    );
    let data = seg(SegmentKind::Data, HOST, 1500);
    for i in 0..4 {
        assert_eq!(buf.enqueue(SimTime::ZERO, &data, us(1)), Ok(us(i)));
    }
}
