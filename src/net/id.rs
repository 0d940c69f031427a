//! 标识符类型
//!
//! 定义节点、链路和流的唯一标识符。

use serde::{Deserialize, Serialize};

/// 节点标识符
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct NodeId(pub usize);

impl NodeId {
    /// 广播目的地：交换机把此类段复制到所有直连主机。
    pub const BROADCAST: NodeId = NodeId(usize::MAX);

    pub fn is_broadcast(self) -> bool {
        self == Self::BROADCAST
    }
}

/// 链路标识符
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct LinkId(pub usize);

/// 流标识符。每条数据流有一条派生的确认流（ACK stream）。
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct FlowId(pub u64);

impl FlowId {
    const ACK_STREAM_BIT: u64 = 1 << 62;

    /// 控制器广播 CTRL 段使用的流
    pub const CONTROL: FlowId = FlowId(u64::MAX);

    /// 反方向（SYNACK/ACK/NACK/FINACK）使用的流
    pub fn ack_stream(self) -> FlowId {
        FlowId(self.0 | Self::ACK_STREAM_BIT)
    }

    /// 确认流对应的数据流
    pub fn data_stream(self) -> FlowId {
        FlowId(self.0 & !Self::ACK_STREAM_BIT)
    }

    /// 可以作为数据流使用的 id（不含确认流标志位）
    pub fn is_valid_data_flow(self) -> bool {
        self.0 < Self::ACK_STREAM_BIT
    }
}
