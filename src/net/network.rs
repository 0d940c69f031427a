//! 网络拓扑管理
//!
//! 定义网络拓扑结构：节点 arena、单向链路、交换机间路由、运行计数器与诊断日志。

use std::collections::{BTreeSet, HashMap};

use super::arrival::{ArrivalToController, ArrivalToHost, ArrivalToSwitch};
use super::host::Host;
use super::id::{FlowId, LinkId, NodeId};
use super::link::Link;
use super::node::NodeKind;
use super::packet::Packet;
use super::routing::RoutingTable;
use super::stats::Stats;
use super::switch::{AccessPort, ControlHandler, ForwardingNode, SdnSwitch, TokenBroadcast};
use crate::ctrl::{ControlPlane, Controller};
use crate::proto::{FlowStart, FlowSpec, Receiver, Sender};
use crate::queue::CONTROL_BUFFER_SEGMENTS;
use crate::sim::{DiagnosticLog, SimConfig, SimError, SimTime, Simulator};
use tracing::{debug, info, trace};

pub(crate) enum NodeEntry {
    Host(Host),
    Switch(Box<dyn ForwardingNode>),
    Controller(Box<dyn ControlPlane>),
}

impl NodeEntry {
    fn kind(&self) -> NodeKind {
        match self {
            NodeEntry::Host(_) => NodeKind::Host,
            NodeEntry::Switch(_) => NodeKind::Switch,
            NodeEntry::Controller(_) => NodeKind::Controller,
        }
    }
}

/// 网络拓扑
#[derive(Default)]
pub struct Network {
    nodes: Vec<Option<NodeEntry>>,
    kinds: Vec<NodeKind>,
    names: Vec<String>,
    links: Vec<Link>,
    edges: HashMap<(NodeId, NodeId), LinkId>,
    routing: RoutingTable,
    controller: Option<NodeId>,
    flows: BTreeSet<FlowId>,
    pub cfg: SimConfig,
    pub stats: Stats,
    pub diagnostics: DiagnosticLog,
}

impl Network {
    pub fn new(cfg: SimConfig) -> Self {
        Self {
            cfg,
            ..Self::default()
        }
    }

    fn push_node(&mut self, name: String, entry: NodeEntry) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.kinds.push(entry.kind());
        self.names.push(name);
        self.nodes.push(Some(entry));
        id
    }

    /// 添加主机节点
    pub fn add_host(&mut self, name: impl Into<String>) -> NodeId {
        let name = name.into();
        let id = NodeId(self.nodes.len());
        self.push_node(name.clone(), NodeEntry::Host(Host::new(id, name)))
    }

    /// 添加 SDN 交换机（令牌广播策略）
    pub fn add_switch(&mut self, name: impl Into<String>) -> NodeId {
        self.add_switch_with(name, Box::new(TokenBroadcast::default()))
    }

    /// 添加使用自定义控制消息策略的交换机
    pub fn add_switch_with(
        &mut self,
        name: impl Into<String>,
        handler: Box<dyn ControlHandler>,
    ) -> NodeId {
        let name = name.into();
        let id = NodeId(self.nodes.len());
        let sw = SdnSwitch::new(id, name.clone(), handler);
        self.routing.mark_dirty();
        self.push_node(name, NodeEntry::Switch(Box::new(sw)))
    }

    /// 添加控制器（每个网络只有一个）
    pub fn add_controller(&mut self, name: impl Into<String>) -> Result<NodeId, SimError> {
        if let Some(existing) = self.controller {
            return Err(SimError::Config(format!(
                "network already has a controller ({})",
                self.node_name(existing)
            )));
        }
        let name = name.into();
        let id = NodeId(self.nodes.len());
        let ctrl = Controller::new(id, name.clone(), &self.cfg);
        self.controller = Some(id);
        Ok(self.push_node(name, NodeEntry::Controller(Box::new(ctrl))))
    }

    /// 连接两个节点（创建单向链路）
    pub fn connect(
        &mut self,
        from: NodeId,
        to: NodeId,
        latency: SimTime,
        bandwidth_bps: u64,
        buffer_segments: usize,
    ) -> LinkId {
        let id = LinkId(self.links.len());
        let mut link = Link::new(id, from, to, latency, bandwidth_bps, buffer_segments);
        link.monitored = self.cfg.monitor_links;
        self.links.push(link);
        self.edges.insert((from, to), id);
        id
    }

    /// 双向连接：返回 (a->b, b->a)
    pub fn connect_duplex(
        &mut self,
        a: NodeId,
        b: NodeId,
        latency: SimTime,
        bandwidth_bps: u64,
        buffer_segments: usize,
    ) -> (LinkId, LinkId) {
        let ab = self.connect(a, b, latency, bandwidth_bps, buffer_segments);
        let ba = self.connect(b, a, latency, bandwidth_bps, buffer_segments);
        (ab, ba)
    }

    /// 把主机接到接入交换机，返回 (上行, 下行)
    pub fn connect_access(
        &mut self,
        host: NodeId,
        switch: NodeId,
        latency: SimTime,
        bandwidth_bps: u64,
        buffer_segments: usize,
    ) -> Result<(LinkId, LinkId), SimError> {
        self.expect_kind(host, NodeKind::Host)?;
        self.expect_kind(switch, NodeKind::Switch)?;
        let (up, down) = self.connect_duplex(host, switch, latency, bandwidth_bps, buffer_segments);
        match self.nodes.get_mut(host.0) {
            Some(Some(NodeEntry::Host(h))) => h.attach(switch, up),
            _ => return Err(SimError::UnknownNode(host)),
        }
        self.switch_mut(switch)?
            .attach_host(host, AccessPort { down, up });
        Ok((up, down))
    }

    /// 连接两台交换机，返回 (a->b, b->a)
    pub fn connect_switches(
        &mut self,
        a: NodeId,
        b: NodeId,
        latency: SimTime,
        bandwidth_bps: u64,
        buffer_segments: usize,
    ) -> Result<(LinkId, LinkId), SimError> {
        self.expect_kind(a, NodeKind::Switch)?;
        self.expect_kind(b, NodeKind::Switch)?;
        let (ab, ba) = self.connect_duplex(a, b, latency, bandwidth_bps, buffer_segments);
        self.switch_mut(a)?.attach_switch(b, ab);
        self.switch_mut(b)?.attach_switch(a, ba);
        self.routing.mark_dirty();
        Ok((ab, ba))
    }

    /// 交换机 <-> 控制器的控制链路；其传播时延即流表下发时延
    pub fn connect_control(
        &mut self,
        switch: NodeId,
        latency: SimTime,
        bandwidth_bps: u64,
    ) -> Result<(LinkId, LinkId), SimError> {
        let controller = self
            .controller
            .ok_or_else(|| SimError::Config("add a controller before control links".into()))?;
        self.expect_kind(switch, NodeKind::Switch)?;
        let (up, down) = self.connect_duplex(
            switch,
            controller,
            latency,
            bandwidth_bps,
            CONTROL_BUFFER_SEGMENTS,
        );
        self.switch_mut(switch)?.attach_controller(controller, up);
        match self.nodes.get_mut(controller.0) {
            Some(Some(NodeEntry::Controller(c))) => c.register_switch(switch, down, latency),
            _ => return Err(SimError::UnknownNode(controller)),
        }
        Ok((up, down))
    }

    /// 注册一条流：校验后在源/目的主机上安装发送端/接收端，并调度 `FlowStart`
    pub fn add_flow(&mut self, spec: &FlowSpec, sim: &mut Simulator) -> Result<(), SimError> {
        if !spec.id.is_valid_data_flow() {
            return Err(SimError::Config(format!(
                "flow id {} collides with the acknowledgement stream space",
                spec.id.0
            )));
        }
        if spec.size_segments == 0 {
            return Err(SimError::Config(format!("flow {} has no segments", spec.id.0)));
        }
        if self.flows.contains(&spec.id) {
            return Err(SimError::Config(format!("duplicate flow id {}", spec.id.0)));
        }
        self.expect_kind(spec.src, NodeKind::Host)?;
        self.expect_kind(spec.dst, NodeKind::Host)?;
        let src_switch = self.access_switch_of(spec.src).ok_or_else(|| {
            SimError::Config(format!("host {} is not attached", self.node_name(spec.src)))
        })?;
        let dst_switch = self.access_switch_of(spec.dst).ok_or_else(|| {
            SimError::Config(format!("host {} is not attached", self.node_name(spec.dst)))
        })?;
        if src_switch == dst_switch {
            return Err(SimError::Config(format!(
                "flow {}: source and destination share access switch {}",
                spec.id.0,
                self.node_name(src_switch)
            )));
        }

        for host in [spec.src, spec.dst] {
            if self.host(host).and_then(Host::agent).is_some() {
                return Err(SimError::Config(format!(
                    "host {} already runs a transport agent",
                    self.node_name(host)
                )));
            }
        }

        let sender = Sender::new(spec, &self.cfg);
        let receiver = Receiver::new(spec, &self.cfg);
        self.host_mut(spec.src)?.set_agent(Box::new(sender))?;
        self.host_mut(spec.dst)?.set_agent(Box::new(receiver))?;
        self.flows.insert(spec.id);
        info!(flow = spec.id.0, src = ?spec.src, dst = ?spec.dst, size = spec.size_segments, start = ?spec.start, "➕ 注册流");
        sim.schedule(spec.start, FlowStart { host: spec.src })
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn node_kind(&self, id: NodeId) -> Result<NodeKind, SimError> {
        self.kinds.get(id.0).copied().ok_or(SimError::UnknownNode(id))
    }

    pub fn node_name(&self, id: NodeId) -> &str {
        self.names.get(id.0).map(String::as_str).unwrap_or("?")
    }

    pub fn node_by_name(&self, name: &str) -> Option<NodeId> {
        self.names.iter().position(|n| n == name).map(NodeId)
    }

    pub fn controller_id(&self) -> Option<NodeId> {
        self.controller
    }

    pub fn hosts(&self) -> impl Iterator<Item = &Host> + '_ {
        self.nodes.iter().filter_map(|n| match n {
            Some(NodeEntry::Host(h)) => Some(h),
            _ => None,
        })
    }

    pub fn host(&self, id: NodeId) -> Option<&Host> {
        match self.nodes.get(id.0) {
            Some(Some(NodeEntry::Host(h))) => Some(h),
            _ => None,
        }
    }

    pub fn switch(&self, id: NodeId) -> Option<&dyn ForwardingNode> {
        match self.nodes.get(id.0) {
            Some(Some(NodeEntry::Switch(s))) => Some(s.as_ref()),
            _ => None,
        }
    }

    pub fn controller(&self) -> Option<&dyn ControlPlane> {
        match self.nodes.get(self.controller?.0) {
            Some(Some(NodeEntry::Controller(c))) => Some(c.as_ref()),
            _ => None,
        }
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn link(&self, id: LinkId) -> Result<&Link, SimError> {
        self.links.get(id.0).ok_or_else(|| unknown_link(id))
    }

    pub fn link_mut(&mut self, id: LinkId) -> Result<&mut Link, SimError> {
        self.links.get_mut(id.0).ok_or_else(|| unknown_link(id))
    }

    pub fn link_between(&self, from: NodeId, to: NodeId) -> Result<&Link, SimError> {
        let id = self
            .edges
            .get(&(from, to))
            .copied()
            .ok_or(SimError::UnknownLink { from, to })?;
        self.link(id)
    }

    pub fn access_switch_of(&self, host: NodeId) -> Option<NodeId> {
        self.host(host)?.access_switch()
    }

    /// 交换机间最短路径（含两端），ECMP 以 `key` 做稳定哈希
    pub fn switch_path(
        &mut self,
        from: NodeId,
        to: NodeId,
        key: u64,
    ) -> Result<Vec<NodeId>, SimError> {
        self.ensure_routing();
        self.routing
            .path(from, to, key)
            .ok_or(SimError::NoRoute { from, to })
    }

    fn ensure_routing(&mut self) {
        if !self.routing.is_dirty() {
            return;
        }
        let n = self.nodes.len();
        let mut adj: Vec<Vec<NodeId>> = vec![Vec::new(); n];
        for link in &self.links {
            let both_switches = self.kinds.get(link.from.0) == Some(&NodeKind::Switch)
                && self.kinds.get(link.to.0) == Some(&NodeKind::Switch);
            if both_switches {
                adj[link.from.0].push(link.to);
            }
        }
        self.routing.ensure_built(&adj);
        debug!("🗺️  交换机路由表已重建");
    }

    fn expect_kind(&self, id: NodeId, kind: NodeKind) -> Result<(), SimError> {
        if self.node_kind(id)? != kind {
            return Err(SimError::NodeKindMismatch {
                node: id,
                expected: kind.as_str(),
            });
        }
        Ok(())
    }

    fn host_mut(&mut self, id: NodeId) -> Result<&mut Host, SimError> {
        match self.nodes.get_mut(id.0) {
            Some(Some(NodeEntry::Host(h))) => Ok(h),
            _ => Err(SimError::NodeKindMismatch {
                node: id,
                expected: "host",
            }),
        }
    }

    fn switch_mut(&mut self, id: NodeId) -> Result<&mut dyn ForwardingNode, SimError> {
        match self.nodes.get_mut(id.0) {
            Some(Some(NodeEntry::Switch(s))) => Ok(s.as_mut()),
            _ => Err(SimError::NodeKindMismatch {
                node: id,
                expected: "switch",
            }),
        }
    }

    // 暂时把节点取出来，避免 &mut self 与 &mut node 的重叠借用。
    fn take_node(&mut self, id: NodeId) -> Result<NodeEntry, SimError> {
        self.nodes
            .get_mut(id.0)
            .and_then(Option::take)
            .ok_or(SimError::UnknownNode(id))
    }

    fn put_node(&mut self, id: NodeId, entry: NodeEntry) {
        if let Some(slot) = self.nodes.get_mut(id.0) {
            *slot = Some(entry);
        }
    }

    pub(crate) fn with_host<R>(
        &mut self,
        id: NodeId,
        f: impl FnOnce(&mut Host, &mut Network) -> Result<R, SimError>,
    ) -> Result<R, SimError> {
        let mut entry = self.take_node(id)?;
        trace!(node = %self.node_name(id), "取出节点");
        let res = match &mut entry {
            NodeEntry::Host(h) => f(h, self),
            _ => Err(SimError::NodeKindMismatch {
                node: id,
                expected: "host",
            }),
        };
        self.put_node(id, entry);
        res
    }

    pub(crate) fn with_switch<R>(
        &mut self,
        id: NodeId,
        f: impl FnOnce(&mut dyn ForwardingNode, &mut Network) -> Result<R, SimError>,
    ) -> Result<R, SimError> {
        let mut entry = self.take_node(id)?;
        let res = match &mut entry {
            NodeEntry::Switch(s) => f(s.as_mut(), self),
            _ => Err(SimError::NodeKindMismatch {
                node: id,
                expected: "switch",
            }),
        };
        self.put_node(id, entry);
        res
    }

    pub(crate) fn with_controller<R>(
        &mut self,
        id: NodeId,
        f: impl FnOnce(&mut dyn ControlPlane, &mut Network) -> Result<R, SimError>,
    ) -> Result<R, SimError> {
        let mut entry = self.take_node(id)?;
        let res = match &mut entry {
            NodeEntry::Controller(c) => f(c.as_mut(), self),
            _ => Err(SimError::NodeKindMismatch {
                node: id,
                expected: "controller",
            }),
        };
        self.put_node(id, entry);
        res
    }

    /// 入队到链路：返回开始发送的时刻；缓冲区满时记录丢包并返回 `None`
    pub(crate) fn enqueue_on(
        &mut self,
        link: LinkId,
        pkt: &Packet,
        now: SimTime,
        component: &'static str,
        operation: &'static str,
    ) -> Result<Option<SimTime>, SimError> {
        let l = self.link_mut(link)?;
        match l.enqueue(now, pkt) {
            Ok(wait) => {
                trace!(link = link.0, ?wait, occupancy = l.buffer.occupancy(), "入队");
                Ok(Some(now.after(wait)))
            }
            Err(dropped) => {
                let (from, to) = (l.from, l.to);
                self.stats.dropped_segments = self.stats.dropped_segments.saturating_add(1);
                self.diagnostics.drop_packet(
                    now,
                    component,
                    operation,
                    format!(
                        "buffer full on link {}->{} ({}/{}), dropped {:?}",
                        self.node_name(from),
                        self.node_name(to),
                        dropped.occupancy,
                        dropped.capacity,
                        pkt.segment().map(|s| (s.kind, s.seq)),
                    ),
                );
                Ok(None)
            }
        }
    }

    /// 数据包开始串行化：出队并在链路对端调度到达事件
    #[tracing::instrument(skip(self, pkt, sim), fields(link = link.0))]
    pub(crate) fn depart(
        &mut self,
        link: LinkId,
        pkt: Packet,
        enqueued_at: SimTime,
        sim: &mut Simulator,
    ) -> Result<(), SimError> {
        let now = sim.now();
        let l = self.link_mut(link)?;
        if !l.buffer.dequeue() {
            return Err(SimError::BufferUnderflow(link));
        }
        l.record_departure(&pkt, now.saturating_sub(enqueued_at));
        let arrive = now.after(l.tx_time(pkt.size_bytes())).after(l.latency);
        let (from, to) = (l.from, l.to);
        trace!(?from, ?to, ?arrive, "🚚 链路传输");
        match self.node_kind(to)? {
            NodeKind::Host => sim.schedule(arrive, ArrivalToHost { host: to, pkt }),
            NodeKind::Switch => sim.schedule(arrive, ArrivalToSwitch { switch: to, pkt }),
            NodeKind::Controller => sim.schedule(
                arrive,
                ArrivalToController {
                    controller: to,
                    from_switch: from,
                    pkt,
                },
            ),
        }
    }

    pub(crate) fn record_host_departure(&mut self, host: NodeId, pkt: &Packet, at: SimTime) {
        if let Some(Some(NodeEntry::Host(h))) = self.nodes.get_mut(host.0) {
            h.record_departure(pkt, at);
        }
    }

    pub(crate) fn install_flow_entry(
        &mut self,
        switch: NodeId,
        flow: FlowId,
        next_hop: NodeId,
    ) -> Result<(), SimError> {
        self.switch_mut(switch)?.install_flow_entry(flow, next_hop)
    }
}

fn unknown_link(id: LinkId) -> SimError {
    SimError::Config(format!("unknown link {}", id.0))
}
