//! 主机节点
//!
//! 主机只有一条上行接入链路，承载至多一个传输代理（发送端或接收端）。

use tracing::{debug, trace};

use super::departure::DepartureFromHost;
use super::id::{LinkId, NodeId};
use super::network::Network;
use super::node::{Node, NodeKind};
use super::packet::Packet;
use super::segment::{Segment, SegmentKind};
use crate::proto::{TimerId, TransportAgent};
use crate::sim::{SimError, SimTime, Simulator};

#[derive(Debug)]
pub struct Host {
    id: NodeId,
    name: String,
    access_switch: Option<NodeId>,
    uplink: Option<LinkId>,
    agent: Option<Box<dyn TransportAgent>>,
}

impl Host {
    /// 创建新主机
    pub fn new(id: NodeId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            access_switch: None,
            uplink: None,
            agent: None,
        }
    }

    pub fn access_switch(&self) -> Option<NodeId> {
        self.access_switch
    }

    pub fn uplink(&self) -> Option<LinkId> {
        self.uplink
    }

    pub fn agent(&self) -> Option<&dyn TransportAgent> {
        self.agent.as_deref()
    }

    pub(crate) fn attach(&mut self, switch: NodeId, uplink: LinkId) {
        self.access_switch = Some(switch);
        self.uplink = Some(uplink);
    }

    pub(crate) fn set_agent(&mut self, agent: Box<dyn TransportAgent>) -> Result<(), SimError> {
        if let Some(existing) = &self.agent {
            return Err(SimError::Config(format!(
                "host {} already runs an agent for flow {:?}",
                self.name,
                existing.flow_id()
            )));
        }
        self.agent = Some(agent);
        Ok(())
    }

    pub(crate) fn start_flow(
        &mut self,
        sim: &mut Simulator,
        net: &mut Network,
    ) -> Result<(), SimError> {
        let agent = self
            .agent
            .as_mut()
            .ok_or_else(|| SimError::Config(format!("host {} has no agent to start", self.name)))?;
        debug!(host = %self.name, flow = ?agent.flow_id(), "🚀 流启动");
        agent.start(sim)?;
        self.send_segments(sim, net)
    }

    #[tracing::instrument(skip(self, sim, net), fields(node_name = %self.name, node_id = ?self.id))]
    pub(crate) fn recv_packet(
        &mut self,
        pkt: Packet,
        sim: &mut Simulator,
        net: &mut Network,
    ) -> Result<(), SimError> {
        let seg = match pkt {
            Packet::Segment(seg) => seg,
            Packet::Control(_) => {
                return Err(SimError::UnexpectedControlMessage {
                    component: "Host",
                    node: self.id,
                });
            }
        };
        trace!(kind = ?seg.kind, seq = seg.seq, flow = ?seg.flow_id, "🖥️  Host 收到段");
        if seg.dst != self.id {
            return Err(self.unexpected(&seg));
        }
        net.stats.delivered_segments = net.stats.delivered_segments.saturating_add(1);

        let Some(agent) = self.agent.as_mut() else {
            if seg.kind == SegmentKind::Ctrl {
                trace!("无代理，忽略 CTRL");
                return Ok(());
            }
            return Err(self.unexpected(&seg));
        };
        if seg.kind != SegmentKind::Ctrl && seg.flow_id.data_stream() != agent.flow_id() {
            return Err(self.unexpected(&seg));
        }
        agent.recv_segment(seg, sim, &mut net.diagnostics)?;
        self.send_segments(sim, net)
    }

    pub(crate) fn timeout(
        &mut self,
        timer: TimerId,
        sim: &mut Simulator,
        net: &mut Network,
    ) -> Result<(), SimError> {
        let agent = self.agent.as_mut().ok_or(SimError::NodeKindMismatch {
            node: self.id,
            expected: "host with a transport agent",
        })?;
        agent.timeout(timer, sim, &mut net.diagnostics)?;
        self.send_segments(sim, net)
    }

    /// DATA 段离开主机：转交代理记录发送时刻
    pub(crate) fn record_departure(&mut self, pkt: &Packet, at: SimTime) {
        if let (Some(agent), Some(seg)) = (self.agent.as_mut(), pkt.segment()) {
            if seg.kind == SegmentKind::Data {
                agent.on_data_departure(seg.seq, at);
            }
        }
    }

    /// 把代理发件箱中的段送上接入链路
    fn send_segments(&mut self, sim: &mut Simulator, net: &mut Network) -> Result<(), SimError> {
        let Some(agent) = self.agent.as_mut() else {
            return Ok(());
        };
        let outbox = agent.take_outbox();
        if outbox.is_empty() {
            return Ok(());
        }
        let uplink = self
            .uplink
            .ok_or_else(|| SimError::Config(format!("host {} is not attached", self.name)))?;
        let now = sim.now();
        for seg in outbox {
            trace!(kind = ?seg.kind, seq = seg.seq, "📤 Host 发送段");
            let pkt = Packet::Segment(seg);
            if let Some(depart) = net.enqueue_on(uplink, &pkt, now, "Host", "send_segments")? {
                sim.schedule(
                    depart.after(net.cfg.host_process_delay),
                    DepartureFromHost {
                        host: self.id,
                        link: uplink,
                        pkt,
                        enqueued_at: now,
                    },
                )?;
            }
        }
        Ok(())
    }

    fn unexpected(&self, seg: &Segment) -> SimError {
        SimError::UnexpectedSegment {
            component: "Host",
            node: self.id,
            flow: seg.flow_id,
            kind: seg.kind,
        }
    }
}

impl Node for Host {
    fn id(&self) -> NodeId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Host
    }
}
