//! SDN 交换机
//!
//! 交换机只按流表转发：流表项由控制器通过 `FlowPathSetup` 事件安装。
//! 未知流、`UncontrolledFin` 送往控制器；控制器的控制消息由可替换的
//! [`ControlHandler`] 消费。

use std::collections::BTreeMap;
use std::fmt;

use tracing::{debug, info, trace};

use super::departure::DepartureFromSwitch;
use super::id::{FlowId, LinkId, NodeId};
use super::network::Network;
use super::node::{Node, NodeKind};
use super::packet::{ControlMessage, Packet};
use super::segment::{CongestionFields, Segment, SegmentKind};
use crate::queue::BufferToken;
use crate::sim::{SimError, SimTime, Simulator};

/// 流表：流 -> 下一跳
#[derive(Debug, Default, Clone)]
pub struct FlowTable {
    entries: BTreeMap<FlowId, NodeId>,
}

impl FlowTable {
    pub fn next_hop(&self, flow: FlowId) -> Option<NodeId> {
        self.entries.get(&flow).copied()
    }

    pub fn contains(&self, flow: FlowId) -> bool {
        self.entries.contains_key(&flow)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (FlowId, NodeId)> + '_ {
        self.entries.iter().map(|(f, n)| (*f, *n))
    }

    fn install(&mut self, switch: NodeId, flow: FlowId, next_hop: NodeId) -> Result<(), SimError> {
        if self.entries.contains_key(&flow) {
            return Err(SimError::DuplicateFlowEntry { switch, flow });
        }
        self.entries.insert(flow, next_hop);
        Ok(())
    }
}

/// 接入端口：去往主机的下行链路与主机的上行链路
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessPort {
    pub down: LinkId,
    pub up: LinkId,
}

/// 交换机对控制器消息的处理策略
pub trait ControlHandler: Send + fmt::Debug {
    /// 消费一条控制消息
    fn on_control_message(
        &mut self,
        switch: NodeId,
        ports: &BTreeMap<NodeId, AccessPort>,
        msg: ControlMessage,
        now: SimTime,
        net: &mut Network,
    ) -> Result<(), SimError>;

    /// 广播 CTRL 复制给某个主机之前，按主机填写节奏字段
    fn annotate_broadcast(&self, host: NodeId, seg: &mut Segment);
}

/// 默认策略：把令牌装到主机上行缓冲区，并按令牌填写 CTRL 字段
#[derive(Debug, Default, Clone)]
pub struct TokenBroadcast {
    tokens: BTreeMap<NodeId, BufferToken>,
}

impl ControlHandler for TokenBroadcast {
    fn on_control_message(
        &mut self,
        switch: NodeId,
        ports: &BTreeMap<NodeId, AccessPort>,
        msg: ControlMessage,
        now: SimTime,
        net: &mut Network,
    ) -> Result<(), SimError> {
        debug!(?switch, tokens = msg.tokens.len(), "🎟️  更新令牌调度");
        for (&host, port) in ports {
            let token = msg.tokens.get(&host).copied();
            net.link_mut(port.up)?
                .buffer
                .update_token_list(now, host, token);
        }
        self.tokens = msg.tokens;
        Ok(())
    }

    fn annotate_broadcast(&self, host: NodeId, seg: &mut Segment) {
        let cc = seg.cc.get_or_insert_with(CongestionFields::default);
        match self.tokens.get(&host) {
            Some(token) if token.active => {
                cc.time_to_next_cycle = token.initial_cycle_delay.after(cc.big_rtt);
                cc.interval = cc.big_rtt;
                cc.initial_delay = token.steady_cycle_delay;
            }
            _ => {
                cc.time_to_next_cycle = cc.big_rtt;
                cc.interval = cc.big_rtt;
                cc.initial_delay = SimTime::ZERO;
            }
        }
    }
}

/// 转发节点接口
pub trait ForwardingNode: Node + fmt::Debug {
    fn recv_packet(
        &mut self,
        pkt: Packet,
        sim: &mut Simulator,
        net: &mut Network,
    ) -> Result<(), SimError>;

    fn install_flow_entry(&mut self, flow: FlowId, next_hop: NodeId) -> Result<(), SimError>;

    fn flow_table(&self) -> &FlowTable;

    fn attach_host(&mut self, host: NodeId, port: AccessPort);

    fn attach_switch(&mut self, neighbor: NodeId, link: LinkId);

    fn attach_controller(&mut self, controller: NodeId, link: LinkId);
}

#[derive(Debug)]
pub struct SdnSwitch {
    id: NodeId,
    name: String,
    access: BTreeMap<NodeId, AccessPort>,
    network: BTreeMap<NodeId, LinkId>,
    control: Option<(NodeId, LinkId)>,
    flow_table: FlowTable,
    handler: Box<dyn ControlHandler>,
}

impl SdnSwitch {
    pub fn new(id: NodeId, name: impl Into<String>, handler: Box<dyn ControlHandler>) -> Self {
        Self {
            id,
            name: name.into(),
            access: BTreeMap::new(),
            network: BTreeMap::new(),
            control: None,
            flow_table: FlowTable::default(),
            handler,
        }
    }

    /// 入队到出链路并调度离开事件；缓冲区满则记录丢包
    fn forward(
        &self,
        link: LinkId,
        pkt: Packet,
        sim: &mut Simulator,
        net: &mut Network,
        operation: &'static str,
    ) -> Result<(), SimError> {
        let now = sim.now();
        if let Some(depart) = net.enqueue_on(link, &pkt, now, "SdnSwitch", operation)? {
            sim.schedule(
                depart,
                DepartureFromSwitch {
                    switch: self.id,
                    link,
                    pkt,
                    enqueued_at: now,
                },
            )?;
        }
        Ok(())
    }

    fn to_controller(
        &self,
        pkt: Packet,
        sim: &mut Simulator,
        net: &mut Network,
    ) -> Result<(), SimError> {
        let (_, link) = self.control.ok_or_else(|| {
            SimError::Config(format!("switch {} has no control link", self.name))
        })?;
        trace!("⬆️  送往控制器");
        self.forward(link, pkt, sim, net, "to_controller")
    }

    fn broadcast(
        &self,
        seg: Segment,
        sim: &mut Simulator,
        net: &mut Network,
    ) -> Result<(), SimError> {
        trace!(hosts = self.access.len(), "📣 广播 CTRL");
        for (&host, port) in &self.access {
            let mut copy = seg.clone();
            copy.dst = host;
            self.handler.annotate_broadcast(host, &mut copy);
            self.forward(port.down, Packet::Segment(copy), sim, net, "broadcast")?;
        }
        Ok(())
    }
}

impl Node for SdnSwitch {
    fn id(&self) -> NodeId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Switch
    }
}

impl ForwardingNode for SdnSwitch {
    #[tracing::instrument(skip(self, pkt, sim, net), fields(node_name = %self.name, node_id = ?self.id))]
    fn recv_packet(
        &mut self,
        pkt: Packet,
        sim: &mut Simulator,
        net: &mut Network,
    ) -> Result<(), SimError> {
        let seg = match pkt {
            Packet::Control(msg) => {
                info!("📨 收到控制消息");
                net.stats.control_messages = net.stats.control_messages.saturating_add(1);
                return self
                    .handler
                    .on_control_message(self.id, &self.access, msg, sim.now(), net);
            }
            Packet::Segment(seg) => seg,
        };
        trace!(kind = ?seg.kind, seq = seg.seq, flow = ?seg.flow_id, dst = ?seg.dst, "🔀 Switch 收到段");

        if seg.is_broadcast() {
            return self.broadcast(seg, sim, net);
        }
        if let Some(port) = self.access.get(&seg.dst) {
            let down = port.down;
            return self.forward(down, Packet::Segment(seg), sim, net, "to_host");
        }
        if seg.kind == SegmentKind::UncontrolledFin {
            return self.to_controller(Packet::Segment(seg), sim, net);
        }
        match self.flow_table.next_hop(seg.flow_id) {
            Some(next) => {
                let link = *self.network.get(&next).ok_or(SimError::UnknownLink {
                    from: self.id,
                    to: next,
                })?;
                self.forward(link, Packet::Segment(seg), sim, net, "to_switch")
            }
            None => self.to_controller(Packet::Segment(seg), sim, net),
        }
    }

    fn install_flow_entry(&mut self, flow: FlowId, next_hop: NodeId) -> Result<(), SimError> {
        debug!(switch = %self.name, ?flow, ?next_hop, "📋 安装流表项");
        self.flow_table.install(self.id, flow, next_hop)
    }

    fn flow_table(&self) -> &FlowTable {
        &self.flow_table
    }

    fn attach_host(&mut self, host: NodeId, port: AccessPort) {
        self.access.insert(host, port);
    }

    fn attach_switch(&mut self, neighbor: NodeId, link: LinkId) {
        self.network.insert(neighbor, link);
    }

    fn attach_controller(&mut self, controller: NodeId, link: LinkId) {
        self.control = Some((controller, link));
    }
}
