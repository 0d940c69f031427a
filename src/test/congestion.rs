use crate::ctrl::{
    CongestionInputs, CongestionState, ControlDatabase, FlowPath, prepare_tokens, recompute,
};
use crate::net::{FlowId, NodeId};
use crate::queue::BufferToken;
use crate::sim::{InterFlowSpacing, SimError, SimTime};

const TEN_GBPS: u64 = 10_000_000_000;

fn us(v: u64) -> SimTime {
    SimTime::from_micros(v)
}

#[test]
fn single_flow_takes_its_own_rtt_and_bottleneck() {
    let inputs = CongestionInputs {
        flows: 1,
        max_rtt: SimTime(20_300),
        bottleneck_bps: Some(TEN_GBPS),
    };
    let s = recompute(&CongestionState::default(), &inputs, 1.0, 1500);

    assert_eq!(s.flows, 1);
    assert_eq!(s.big_rtt, us(21), "bigRTT is rounded up to whole microseconds");
    assert_eq!(s.previous_big_rtt, SimTime::ZERO);
    assert_eq!(s.inter_segment_delay, SimTime(1_200));
    // 1.0 * 21us * 10Gbps / 12000 bit = 17.5
    assert_eq!(s.s_wnd, 17);
    assert_eq!(s.previous_s_wnd, 17);
    assert_eq!(s.inter_flow_delay_constant, SimTime::ZERO);
}

#[test]
fn second_flow_halves_the_window_and_keeps_history() {
    let first = recompute(
        &CongestionState::default(),
        &CongestionInputs {
            flows: 1,
            max_rtt: us(21),
            bottleneck_bps: Some(TEN_GBPS),
        },
        1.0,
        1500,
    );
    let second = recompute(
        &first,
        &CongestionInputs {
            flows: 2,
            max_rtt: us(21),
            bottleneck_bps: Some(TEN_GBPS),
        },
        1.0,
        1500,
    );

    assert_eq!(second.previous_big_rtt, us(21));
    assert_eq!(second.s_wnd, 8);
    assert_eq!(second.previous_s_wnd, 17);
    assert_eq!(second.inter_flow_delay_constant, SimTime(10_500));
}

#[test]
fn recompute_is_deterministic_and_idle_switch_keeps_window() {
    let inputs = CongestionInputs {
        flows: 3,
        max_rtt: us(40),
        bottleneck_bps: Some(TEN_GBPS),
    };
    let prev = CongestionState {
        big_rtt: us(30),
        s_wnd: 9,
        ..CongestionState::default()
    };
    assert_eq!(
        recompute(&prev, &inputs, 0.5, 1500),
        recompute(&prev, &inputs, 0.5, 1500)
    );

    let idle = recompute(&prev, &CongestionInputs::default(), 1.0, 1500);
    assert_eq!(idle.flows, 0);
    assert_eq!(idle.big_rtt, SimTime::ZERO);
    assert_eq!(idle.inter_segment_delay, SimTime::ZERO);
    assert_eq!(idle.s_wnd, 9);
}

#[test]
fn window_never_drops_below_one_segment() {
    let s = recompute(
        &CongestionState::default(),
        &CongestionInputs {
            flows: 50,
            max_rtt: us(2),
            bottleneck_bps: Some(1_000_000_000),
        },
        1.0,
        1500,
    );
    assert_eq!(s.s_wnd, 1);
}

fn two_host_db(switch: NodeId) -> ControlDatabase {
    let mut db = ControlDatabase::default();
    db.register_switch(switch, us(1));
    for (host, flow, rtt) in [(1, 1, us(10)), (2, 2, us(21))] {
        db.add_flow(switch, NodeId(host), FlowId(flow));
        db.record_path(
            FlowId(flow),
            FlowPath {
                rtt,
                bottleneck_bps: TEN_GBPS,
                switches: vec![switch],
            },
        );
    }
    db
}

#[test]
fn tokens_follow_host_order_and_rtt_slack() {
    let switch = NodeId(10);
    let db = two_host_db(switch);
    let state = CongestionState {
        flows: 2,
        big_rtt: us(21),
        previous_big_rtt: us(5),
        s_wnd: 8,
        previous_s_wnd: 17,
        ..CongestionState::default()
    };

    let tokens = prepare_tokens(
        &db,
        switch,
        &state,
        InterFlowSpacing::PerIndex { delay: us(1) },
    )
    .expect("tokens");

    assert_eq!(tokens.len(), 2);
    assert_eq!(tokens[&NodeId(1)], BufferToken::activate(us(5), 17, us(11), 8));
    assert_eq!(tokens[&NodeId(2)], BufferToken::activate(us(6), 17, SimTime::ZERO, 8));
}

#[test]
fn big_rtt_below_a_flow_rtt_is_a_negative_delay() {
    let switch = NodeId(10);
    let db = two_host_db(switch);
    let state = CongestionState {
        flows: 2,
        big_rtt: us(15),
        s_wnd: 4,
        previous_s_wnd: 4,
        ..CongestionState::default()
    };

    let err = prepare_tokens(&db, switch, &state, InterFlowSpacing::Disabled)
        .expect_err("host 2 has rtt 21us");
    assert!(matches!(
        err,
        SimError::NegativeDelay {
            flow: FlowId(2),
            ..
        }
    ));
}

#[test]
fn removed_flows_leave_no_token() {
    let switch = NodeId(10);
    let mut db = two_host_db(switch);
    assert!(!db.remove_flow(switch, NodeId(1), FlowId(2)));
    assert!(db.remove_flow(switch, NodeId(1), FlowId(1)));
    assert!(!db.is_active(FlowId(1)));
    assert!(db.path(FlowId(1)).is_some());

    let state = CongestionState {
        flows: 1,
        big_rtt: us(21),
        s_wnd: 17,
        previous_s_wnd: 17,
        ..CongestionState::default()
    };
    let tokens = prepare_tokens(&db, switch, &state, InterFlowSpacing::Disabled).expect("tokens");
    assert_eq!(tokens.keys().copied().collect::<Vec<_>>(), vec![NodeId(2)]);
    assert_eq!(db.max_rtt(switch), Some(us(21)));
}
