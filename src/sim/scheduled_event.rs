//! 调度事件
//!
//! 定义调度事件结构及其优先级比较。

use super::event::{Event, EventKind};
use super::time::SimTime;
use crate::net::NodeId;
use std::cmp::Ordering;

/// 调度事件，包含执行时间、序列号和事件对象。
pub struct ScheduledEvent {
    pub(crate) at: SimTime,
    pub(crate) seq: u64,
    pub(crate) ev: Box<dyn Event>,
}

impl ScheduledEvent {
    pub fn at(&self) -> SimTime {
        self.at
    }

    /// 插入序号（同一时刻内的 FIFO 顺序）
    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn kind(&self) -> EventKind {
        self.ev.kind()
    }

    /// 事件作用的节点（若有）
    pub fn target(&self) -> Option<NodeId> {
        self.ev.target()
    }
}

// BinaryHeap 是 max-heap；我们需要最小时间优先，因此反向比较。
impl Ord for ScheduledEvent {
    fn cmp(&self, other: &Self) -> Ordering {
        self.at
            .cmp(&other.at)
            .then_with(|| self.seq.cmp(&other.seq))
            .reverse()
    }
}

impl PartialOrd for ScheduledEvent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for ScheduledEvent {
    fn eq(&self, other: &Self) -> bool {
        self.at == other.at && self.seq == other.seq
    }
}

impl Eq for ScheduledEvent {}
