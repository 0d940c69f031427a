//! 流描述与流记录

use std::collections::BTreeMap;

use serde::Serialize;

use crate::net::{FlowId, NodeId};
use crate::sim::SimTime;

/// 一条待仿真的流（由场景层提供）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowSpec {
    pub id: FlowId,
    pub src: NodeId,
    pub dst: NodeId,
    pub size_segments: u64,
    pub start: SimTime,
}

/// 发送端维护的流记录，仿真结束后由统计快照读取
#[derive(Debug, Clone, Serialize)]
pub struct FlowRecord {
    pub id: FlowId,
    pub src: NodeId,
    pub dst: NodeId,
    pub size_segments: u64,
    pub start_time: Option<SimTime>,
    pub syn_ack_time: Option<SimTime>,
    pub data_start_time: Option<SimTime>,
    pub completion_time: Option<SimTime>,
    pub fin_sent_time: Option<SimTime>,
    pub fin_ack_time: Option<SimTime>,
    pub retransmissions: u64,
    /// seq -> 最近一次离开主机的时刻
    pub data_send_times: BTreeMap<u64, SimTime>,
    /// seq -> 最近一次 ACK 到达时刻（seq 0 为 SYNACK）
    pub ack_arrival_times: BTreeMap<u64, SimTime>,
}

impl FlowRecord {
    pub fn new(spec: &FlowSpec) -> Self {
        Self {
            id: spec.id,
            src: spec.src,
            dst: spec.dst,
            size_segments: spec.size_segments,
            start_time: None,
            syn_ack_time: None,
            data_start_time: None,
            completion_time: None,
            fin_sent_time: None,
            fin_ack_time: None,
            retransmissions: 0,
            data_send_times: BTreeMap::new(),
            ack_arrival_times: BTreeMap::new(),
        }
    }

    pub fn is_completed(&self) -> bool {
        self.completion_time.is_some()
    }

    /// 流完成时间（FCT）：从流启动到完成
    pub fn completion_duration(&self) -> Option<SimTime> {
        let start = self.start_time?;
        self.completion_time?.checked_sub(start)
    }
}
