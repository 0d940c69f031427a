//! 拥塞参数计算
//!
//! 给定一台接入交换机下的流集合，计算 bigRTT、发送窗口 sWnd 与段间隔，
//! 并为每个主机生成缓冲区令牌。两个函数都只依赖传入的数据库视图。

use std::collections::BTreeMap;

use serde::Serialize;

use super::database::ControlDatabase;
use crate::net::{NodeId, tx_time};
use crate::queue::BufferToken;
use crate::sim::{InterFlowSpacing, SimError, SimTime};

/// 每台接入交换机的拥塞状态
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CongestionState {
    pub flows: usize,
    pub big_rtt: SimTime,
    pub previous_big_rtt: SimTime,
    pub s_wnd: u64,
    pub previous_s_wnd: u64,
    pub inter_segment_delay: SimTime,
    /// bigRTT / n，仅用于报告
    pub inter_flow_delay_constant: SimTime,
}

/// 重新计算所需的数据库视图
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CongestionInputs {
    pub flows: usize,
    pub max_rtt: SimTime,
    /// 触发重算的那条流的瓶颈带宽
    pub bottleneck_bps: Option<u64>,
}

pub fn recompute(
    prev: &CongestionState,
    inputs: &CongestionInputs,
    alpha: f64,
    data_segment_bytes: u32,
) -> CongestionState {
    let n = inputs.flows;
    let previous_big_rtt = if n <= 1 { SimTime::ZERO } else { prev.big_rtt };
    let big_rtt = if n > 0 {
        inputs.max_rtt.ceil_to_micros()
    } else {
        SimTime::ZERO
    };
    let bottleneck = inputs.bottleneck_bps.filter(|_| n > 0);
    let inter_segment_delay =
        bottleneck.map_or(SimTime::ZERO, |bps| tx_time(data_segment_bytes, bps));
    let inter_flow_delay_constant = if n > 1 {
        SimTime(big_rtt.0 / n as u64)
    } else {
        SimTime::ZERO
    };

    let mut previous_s_wnd = prev.s_wnd;
    let s_wnd = match bottleneck {
        Some(bps) => {
            let data_bits = f64::from(data_segment_bytes) * 8.0;
            let w = alpha * big_rtt.as_secs_f64() * bps as f64 / (n as f64 * data_bits);
            (w.floor() as u64).max(1)
        }
        None => prev.s_wnd,
    };
    if previous_s_wnd == 0 {
        previous_s_wnd = s_wnd;
    }

    CongestionState {
        flows: n,
        big_rtt,
        previous_big_rtt,
        s_wnd,
        previous_s_wnd,
        inter_segment_delay,
        inter_flow_delay_constant,
    }
}

/// 为交换机下的每个主机生成令牌（按主机 id 升序编号）
pub fn prepare_tokens(
    db: &ControlDatabase,
    switch: NodeId,
    state: &CongestionState,
    spacing: InterFlowSpacing,
) -> Result<BTreeMap<NodeId, BufferToken>, SimError> {
    let mut tokens = BTreeMap::new();
    for (i, (host, flow)) in db.flows_at(switch).enumerate() {
        let rtt = db.path(flow).ok_or(SimError::UnknownFlow(flow))?.rtt;
        let steady = state
            .big_rtt
            .checked_sub(rtt)
            .ok_or(SimError::NegativeDelay {
                what: "steady cycle delay",
                flow,
            })?;
        let initial = state.previous_big_rtt.after(spacing.offset(i));
        tokens.insert(
            host,
            BufferToken::activate(initial, state.previous_s_wnd, steady, state.s_wnd),
        );
    }
    Ok(tokens)
}
