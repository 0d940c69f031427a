//! 仿真错误类型
//!
//! 所有 `SimError` 都是致命的：事件返回 `Err` 时仿真立即停止。
//! 丢包与协议时序异常不是错误，它们记录在 [`DiagnosticLog`](super::DiagnosticLog) 中。

use thiserror::Error;

use super::time::SimTime;
use crate::net::{FlowId, LinkId, NodeId, SegmentKind};

#[derive(Debug, Error)]
pub enum SimError {
    #[error("event scheduled in the past: at={at:?}, now={now:?}")]
    ScheduleInPast { at: SimTime, now: SimTime },

    #[error("flow {flow:?}: no remaining segments but a new DATA segment was requested")]
    SegmentBudgetExhausted { flow: FlowId },

    #[error("flow {flow:?}: invalid sending cycle ({reason})")]
    InvalidCycle { flow: FlowId, reason: &'static str },

    #[error("{what} would be negative (flow {flow:?})")]
    NegativeDelay { what: &'static str, flow: FlowId },

    #[error("{component}: unexpected {kind:?} segment of flow {flow:?} at node {node:?}")]
    UnexpectedSegment {
        component: &'static str,
        node: NodeId,
        flow: FlowId,
        kind: SegmentKind,
    },

    #[error("{component}: unexpected control message at node {node:?}")]
    UnexpectedControlMessage { component: &'static str, node: NodeId },

    #[error("switch {switch:?} has no flow entry for flow {flow:?}")]
    MissingFlowEntry { switch: NodeId, flow: FlowId },

    #[error("switch {switch:?} already has a flow entry for flow {flow:?}")]
    DuplicateFlowEntry { switch: NodeId, flow: FlowId },

    #[error("unknown node {0:?}")]
    UnknownNode(NodeId),

    #[error("no link from {from:?} to {to:?}")]
    UnknownLink { from: NodeId, to: NodeId },

    #[error("unknown flow {0:?}")]
    UnknownFlow(FlowId),

    #[error("node {node:?} is not a {expected}")]
    NodeKindMismatch { node: NodeId, expected: &'static str },

    #[error("no route from switch {from:?} to switch {to:?}")]
    NoRoute { from: NodeId, to: NodeId },

    #[error("dequeue from empty buffer on link {0:?}")]
    BufferUnderflow(LinkId),

    #[error("world must be NetWorld")]
    WorldMismatch,

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
