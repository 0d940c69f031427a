//! 传输层段（segment）
//!
//! 只建模元数据：类型、序号、大小、端点以及控制器下发的拥塞字段。

use serde::{Deserialize, Serialize};

use super::id::{FlowId, NodeId};
use crate::sim::SimTime;

/// 段类型（封闭集合）
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum SegmentKind {
    Syn,
    SynAck,
    Data,
    Ack,
    Nack,
    /// 发送端发出的 FIN，必须经过控制器（注销流）后才变成 `Fin`
    UncontrolledFin,
    Fin,
    FinAck,
    /// 控制器广播给主机的拥塞参数
    Ctrl,
}

/// 控制器/交换机写入 CTRL 段的拥塞字段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CongestionFields {
    pub big_rtt: SimTime,
    /// 每个发送间隔允许发送的段数（sWnd）
    pub window: u64,
    pub inter_segment_delay: SimTime,
    /// 距离新配置生效的时间（由接入交换机按主机填写）
    pub time_to_next_cycle: SimTime,
    /// 发送间隔长度（由接入交换机填写）
    pub interval: SimTime,
    /// 周期开始后的初始等待（由接入交换机填写）
    pub initial_delay: SimTime,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub flow_id: FlowId,
    pub kind: SegmentKind,
    pub seq: u64,
    pub size_bytes: u32,
    pub src: NodeId,
    pub dst: NodeId,
    pub cc: Option<CongestionFields>,
}

impl Segment {
    pub fn new(
        flow_id: FlowId,
        kind: SegmentKind,
        seq: u64,
        size_bytes: u32,
        src: NodeId,
        dst: NodeId,
    ) -> Self {
        Self {
            flow_id,
            kind,
            seq,
            size_bytes,
            src,
            dst,
            cc: None,
        }
    }

    pub fn with_cc(mut self, cc: CongestionFields) -> Self {
        self.cc = Some(cc);
        self
    }

    pub fn is_broadcast(&self) -> bool {
        self.dst.is_broadcast()
    }
}
