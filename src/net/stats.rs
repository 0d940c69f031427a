//! 统计信息
//!
//! 运行计数器，以及仿真结束后导出的统计快照。

use std::collections::BTreeMap;

use serde::Serialize;

use super::id::{FlowId, LinkId, NodeId};
use super::link::LinkUtilization;
use super::network::Network;
use crate::ctrl::{CongestionState, ControlDatabase};
use crate::proto::FlowRecord;
use crate::sim::{Diagnostic, SimTime};

/// 网络运行计数器
#[derive(Debug, Default, Clone, Serialize)]
pub struct Stats {
    /// 到达目的主机的段（含 CTRL 广播副本）
    pub delivered_segments: u64,
    /// 因缓冲区满被丢弃的数据包
    pub dropped_segments: u64,
    /// 交换机消费的控制消息
    pub control_messages: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct LinkReport {
    pub id: LinkId,
    pub from: String,
    pub to: String,
    pub latency: SimTime,
    pub bandwidth_bps: u64,
    pub drops: u64,
    pub utilization: LinkUtilization,
}

/// 仿真结束后的统计快照
#[derive(Debug, Clone, Serialize)]
pub struct Statistics {
    pub end_time: SimTime,
    pub counters: Stats,
    pub flows: BTreeMap<FlowId, FlowRecord>,
    pub links: Vec<LinkReport>,
    pub control_database: Option<ControlDatabase>,
    pub congestion: BTreeMap<NodeId, CongestionState>,
    pub diagnostics: Vec<Diagnostic>,
}

impl Statistics {
    pub fn completed_flows(&self) -> usize {
        self.flows.values().filter(|f| f.is_completed()).count()
    }
}

impl Network {
    /// 生成统计快照
    pub fn statistics(&self, now: SimTime) -> Statistics {
        let flows = self
            .hosts()
            .filter_map(|h| h.agent()?.flow_record())
            .map(|r| (r.id, r.clone()))
            .collect();
        let links = self
            .links()
            .iter()
            .map(|l| LinkReport {
                id: l.id,
                from: self.node_name(l.from).to_string(),
                to: self.node_name(l.to).to_string(),
                latency: l.latency,
                bandwidth_bps: l.bandwidth_bps,
                drops: l.buffer.drops(),
                utilization: l.utilization.clone(),
            })
            .collect();
        let controller = self.controller();
        Statistics {
            end_time: now,
            counters: self.stats.clone(),
            flows,
            links,
            control_database: controller.map(|c| c.database().clone()),
            congestion: controller
                .map(|c| c.congestion_states().clone())
                .unwrap_or_default(),
            diagnostics: self.diagnostics.entries().to_vec(),
        }
    }
}
