//! 数据包类型
//!
//! 一个数据包恰好承载一个传输层段或一条 SDN 控制消息。

use std::collections::BTreeMap;

use super::id::{FlowId, NodeId};
use super::segment::Segment;
use crate::queue::BufferToken;

/// 控制器发给交换机的控制消息类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlMessageKind {
    /// 更新接入链路缓冲区的令牌调度
    BufferTokenUpdate,
}

/// 控制器 -> 交换机的控制消息（在交换机内被消费，不再转发）
#[derive(Debug, Clone, PartialEq)]
pub struct ControlMessage {
    pub kind: ControlMessageKind,
    /// 主机 -> 该主机上行缓冲区的令牌
    pub tokens: BTreeMap<NodeId, BufferToken>,
    pub size_bytes: u32,
}

/// 网络数据包
#[derive(Debug, Clone, PartialEq)]
pub enum Packet {
    Segment(Segment),
    Control(ControlMessage),
}

impl Packet {
    /// 用于链路时延计算的大小
    pub fn size_bytes(&self) -> u32 {
        match self {
            Packet::Segment(seg) => seg.size_bytes,
            Packet::Control(msg) => msg.size_bytes,
        }
    }

    pub fn segment(&self) -> Option<&Segment> {
        match self {
            Packet::Segment(seg) => Some(seg),
            Packet::Control(_) => None,
        }
    }

    pub fn flow_id(&self) -> Option<FlowId> {
        self.segment().map(|s| s.flow_id)
    }
}
