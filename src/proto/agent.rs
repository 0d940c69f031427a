//! 传输代理接口及其事件

use std::fmt;

use super::flow::FlowRecord;
use super::timer::TimerId;
use crate::net::{FlowId, NetWorld, NodeId, Segment};
use crate::sim::{DiagnosticLog, Event, EventKind, SimError, SimTime, Simulator, World};

/// 主机上的传输代理（发送端或接收端）。
///
/// 代理只产生段并放入发件箱，由所在主机负责把它们送上接入链路。
pub trait TransportAgent: Send + fmt::Debug {
    fn flow_id(&self) -> FlowId;

    /// 流启动（仅发送端有动作）
    fn start(&mut self, sim: &mut Simulator) -> Result<(), SimError>;

    fn recv_segment(
        &mut self,
        seg: Segment,
        sim: &mut Simulator,
        diag: &mut DiagnosticLog,
    ) -> Result<(), SimError>;

    fn timeout(
        &mut self,
        timer: TimerId,
        sim: &mut Simulator,
        diag: &mut DiagnosticLog,
    ) -> Result<(), SimError>;

    /// 取走待发送的段
    fn take_outbox(&mut self) -> Vec<Segment>;

    fn flow_record(&self) -> Option<&FlowRecord> {
        None
    }

    /// DATA 段离开主机时调用（用于统计）
    fn on_data_departure(&mut self, _seq: u64, _at: SimTime) {}
}

/// 事件：在流的起始时刻启动发送端
#[derive(Debug)]
pub struct FlowStart {
    pub host: NodeId,
}

impl Event for FlowStart {
    fn execute(
        self: Box<Self>,
        sim: &mut Simulator,
        world: &mut dyn World,
    ) -> Result<(), SimError> {
        let FlowStart { host } = *self;
        let net = NetWorld::network(world)?;
        net.with_host(host, |h, net| h.start_flow(sim, net))
    }

    fn kind(&self) -> EventKind {
        EventKind::FlowStart
    }

    fn target(&self) -> Option<NodeId> {
        Some(self.host)
    }
}

/// 事件：某个主机上的代理定时器超时
#[derive(Debug)]
pub struct Timeout {
    pub host: NodeId,
    pub timer: TimerId,
}

impl Event for Timeout {
    fn execute(
        self: Box<Self>,
        sim: &mut Simulator,
        world: &mut dyn World,
    ) -> Result<(), SimError> {
        let Timeout { host, timer } = *self;
        let net = NetWorld::network(world)?;
        net.with_host(host, |h, net| h.timeout(timer, sim, net))
    }

    fn kind(&self) -> EventKind {
        EventKind::Timeout
    }

    fn target(&self) -> Option<NodeId> {
        Some(self.host)
    }
}
