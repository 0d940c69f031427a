//! 链路类型
//!
//! 定义单向网络链路：传播时延、带宽、准入缓冲区以及利用率计数器。

use std::collections::BTreeMap;

use serde::Serialize;

use super::id::{FlowId, LinkId, NodeId};
use super::packet::Packet;
use crate::queue::{Buffer, Dropped};
use crate::sim::SimTime;

/// 链路利用率计数器（仅在开启监控时更新，不影响时序）
#[derive(Debug, Clone, Default, Serialize)]
pub struct LinkUtilization {
    pub segments: u64,
    pub busy_time: SimTime,
    pub queueing_delay: SimTime,
    pub busy_time_per_flow: BTreeMap<FlowId, SimTime>,
}

/// 网络链路
#[derive(Debug)]
pub struct Link {
    pub id: LinkId,
    pub from: NodeId,
    pub to: NodeId,
    pub latency: SimTime,
    pub bandwidth_bps: u64,
    pub buffer: Buffer,
    pub monitored: bool,
    pub utilization: LinkUtilization,
}

impl Link {
    /// 创建新链路
    pub fn new(
        id: LinkId,
        from: NodeId,
        to: NodeId,
        latency: SimTime,
        bandwidth_bps: u64,
        buffer_segments: usize,
    ) -> Self {
        Self {
            id,
            from,
            to,
            latency,
            bandwidth_bps,
            buffer: Buffer::new(buffer_segments),
            monitored: false,
            utilization: LinkUtilization::default(),
        }
    }

    /// 计算传输指定字节数所需的时间
    pub fn tx_time(&self, bytes: u32) -> SimTime {
        tx_time(bytes, self.bandwidth_bps)
    }

    /// 入队：返回开始发送前的等待时间，缓冲区满时返回 `Err(Dropped)`
    pub fn enqueue(&mut self, now: SimTime, pkt: &Packet) -> Result<SimTime, Dropped> {
        let tx = self.tx_time(pkt.size_bytes());
        self.buffer.enqueue(now, pkt, tx)
    }

    /// 等待 + 串行化 + 传播
    pub fn total_delay(&self, bytes: u32, wait: SimTime) -> SimTime {
        wait.after(self.tx_time(bytes)).after(self.latency)
    }

    /// 出队时更新利用率计数器
    pub(crate) fn record_departure(&mut self, pkt: &Packet, queueing_delay: SimTime) {
        if !self.monitored {
            return;
        }
        let tx = self.tx_time(pkt.size_bytes());
        let u = &mut self.utilization;
        u.segments = u.segments.saturating_add(1);
        u.busy_time = u.busy_time.after(tx);
        u.queueing_delay = u.queueing_delay.after(queueing_delay);
        if let Some(flow) = pkt.flow_id() {
            let per_flow = u.busy_time_per_flow.entry(flow).or_default();
            *per_flow = per_flow.after(tx);
        }
    }
}

/// ceil(bytes*8 / bps) 秒 -> 纳秒
pub fn tx_time(bytes: u32, bandwidth_bps: u64) -> SimTime {
    if bandwidth_bps == 0 {
        return SimTime(u64::MAX / 4);
    }
    let bits = (bytes as u128).saturating_mul(8);
    let nanos =
        (bits.saturating_mul(1_000_000_000u128) + (bandwidth_bps as u128 - 1)) / bandwidth_bps as u128;
    SimTime(nanos.min(u64::MAX as u128) as u64)
}
