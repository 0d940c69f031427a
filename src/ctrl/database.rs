//! 控制器数据库
//!
//! 记录每台接入交换机下的活跃流、每条流的路径度量以及每台交换机的控制链路时延。

use std::collections::BTreeMap;

use serde::Serialize;

use crate::net::{FlowId, NodeId};
use crate::sim::{SimError, SimTime};

/// 流的路径度量（在 SYN 时计算，流注销后仍保留）
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlowPath {
    pub rtt: SimTime,
    pub bottleneck_bps: u64,
    /// 途经的交换机（含两端的接入交换机）
    pub switches: Vec<NodeId>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ControlDatabase {
    /// 接入交换机 -> (主机 -> 流)
    access: BTreeMap<NodeId, BTreeMap<NodeId, FlowId>>,
    paths: BTreeMap<FlowId, FlowPath>,
    control_delays: BTreeMap<NodeId, SimTime>,
}

impl ControlDatabase {
    pub fn register_switch(&mut self, switch: NodeId, control_delay: SimTime) {
        self.control_delays.insert(switch, control_delay);
    }

    /// 控制器到交换机的流表下发时延
    pub fn control_delay(&self, switch: NodeId) -> Result<SimTime, SimError> {
        self.control_delays
            .get(&switch)
            .copied()
            .ok_or(SimError::UnknownNode(switch))
    }

    pub fn add_flow(&mut self, switch: NodeId, host: NodeId, flow: FlowId) {
        self.access.entry(switch).or_default().insert(host, flow);
    }

    /// 注销主机上的流；主机当前登记的不是这条流时不做任何事
    pub fn remove_flow(&mut self, switch: NodeId, host: NodeId, flow: FlowId) -> bool {
        let Some(hosts) = self.access.get_mut(&switch) else {
            return false;
        };
        if hosts.get(&host) != Some(&flow) {
            return false;
        }
        hosts.remove(&host);
        true
    }

    pub fn record_path(&mut self, flow: FlowId, path: FlowPath) {
        self.paths.insert(flow, path);
    }

    pub fn path(&self, flow: FlowId) -> Option<&FlowPath> {
        self.paths.get(&flow)
    }

    /// 某台接入交换机下的 (主机, 流)，按主机 id 升序
    pub fn flows_at(&self, switch: NodeId) -> impl Iterator<Item = (NodeId, FlowId)> + '_ {
        self.access
            .get(&switch)
            .into_iter()
            .flat_map(|hosts| hosts.iter().map(|(h, f)| (*h, *f)))
    }

    pub fn flow_count(&self, switch: NodeId) -> usize {
        self.access.get(&switch).map_or(0, BTreeMap::len)
    }

    /// 交换机下所有活跃流中最大的 RTT
    pub fn max_rtt(&self, switch: NodeId) -> Option<SimTime> {
        self.flows_at(switch)
            .filter_map(|(_, flow)| self.paths.get(&flow).map(|p| p.rtt))
            .max()
    }

    pub fn is_active(&self, flow: FlowId) -> bool {
        self.access.values().any(|hosts| hosts.values().any(|f| *f == flow))
    }
}
