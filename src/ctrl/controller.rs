//! SDN 控制器
//!
//! 收到 SYN 时登记流、计算路径并下发流表；收到 UncontrolledFin 时注销流。
//! 每收到一个段都重新计算该接入交换机的拥塞状态，依次下发令牌消息、
//! CTRL 广播，最后把（可能改写过的）段送回交换机。

use std::collections::BTreeMap;
use std::fmt;

use tracing::{debug, info};

use super::congestion::{self, CongestionInputs, CongestionState};
use super::database::{ControlDatabase, FlowPath};
use crate::net::{
    CongestionFields, ControlMessage, ControlMessageKind, DepartureFromController, FlowId,
    FlowPathSetup, LinkId, Network, Node, NodeId, NodeKind, Packet, Segment, SegmentKind,
};
use crate::sim::{InterFlowSpacing, SimConfig, SimError, SimTime, Simulator};

/// 控制平面接口
pub trait ControlPlane: Node + fmt::Debug {
    fn recv_packet(
        &mut self,
        from_switch: NodeId,
        pkt: Packet,
        sim: &mut Simulator,
        net: &mut Network,
    ) -> Result<(), SimError>;

    /// 登记一台交换机：控制器 -> 交换机的链路及其传播时延
    fn register_switch(&mut self, switch: NodeId, downlink: LinkId, control_delay: SimTime);

    fn database(&self) -> &ControlDatabase;

    fn congestion_states(&self) -> &BTreeMap<NodeId, CongestionState>;
}

#[derive(Debug)]
pub struct Controller {
    id: NodeId,
    name: String,
    alpha: f64,
    spacing: InterFlowSpacing,
    data_bytes: u32,
    ack_bytes: u32,
    ctrl_segment_bytes: u32,
    ctrl_message_bytes: u32,
    db: ControlDatabase,
    states: BTreeMap<NodeId, CongestionState>,
    downlinks: BTreeMap<NodeId, LinkId>,
}

impl Controller {
    pub fn new(id: NodeId, name: impl Into<String>, cfg: &SimConfig) -> Self {
        Self {
            id,
            name: name.into(),
            alpha: cfg.alpha,
            spacing: cfg.inter_flow_spacing,
            data_bytes: cfg.data_segment_bytes,
            ack_bytes: cfg.ack_segment_bytes,
            ctrl_segment_bytes: cfg.ctrl_segment_bytes,
            ctrl_message_bytes: cfg.ctrl_message_bytes,
            db: ControlDatabase::default(),
            states: BTreeMap::new(),
            downlinks: BTreeMap::new(),
        }
    }

    fn send_to_switch(
        &self,
        switch: NodeId,
        pkt: Packet,
        sim: &mut Simulator,
        net: &mut Network,
    ) -> Result<(), SimError> {
        let link = *self.downlinks.get(&switch).ok_or(SimError::UnknownLink {
            from: self.id,
            to: switch,
        })?;
        let now = sim.now();
        if let Some(depart) = net.enqueue_on(link, &pkt, now, "Controller", "send_to_switch")? {
            sim.schedule(
                depart,
                DepartureFromController {
                    controller: self.id,
                    link,
                    pkt,
                    enqueued_at: now,
                },
            )?;
        }
        Ok(())
    }

    /// SYN：登记流、计算路径度量并逐跳下发流表项
    fn register_flow(
        &mut self,
        switch: NodeId,
        seg: &Segment,
        sim: &mut Simulator,
        net: &mut Network,
    ) -> Result<(), SimError> {
        let flow = seg.flow_id;
        let dst_switch = net
            .access_switch_of(seg.dst)
            .ok_or(SimError::UnknownNode(seg.dst))?;
        let switches = net.switch_path(switch, dst_switch, flow.0)?;
        let path = path_metrics(net, seg.src, &switches, seg.dst, self.data_bytes, self.ack_bytes)?;
        info!(
            flow = flow.0,
            rtt = ?path.rtt,
            bottleneck_bps = path.bottleneck_bps,
            hops = switches.len(),
            "🧭 登记流"
        );
        self.db.add_flow(switch, seg.src, flow);
        self.db.record_path(flow, path);

        for pair in switches.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            sim.schedule_in(
                self.db.control_delay(a)?,
                FlowPathSetup {
                    switch: a,
                    flow,
                    next_hop: b,
                },
            )?;
            sim.schedule_in(
                self.db.control_delay(b)?,
                FlowPathSetup {
                    switch: b,
                    flow: flow.ack_stream(),
                    next_hop: a,
                },
            )?;
        }
        Ok(())
    }

    /// 重新计算交换机 `switch` 的拥塞状态并下发
    fn handle_congestion_control(
        &mut self,
        switch: NodeId,
        flow: FlowId,
        sim: &mut Simulator,
        net: &mut Network,
    ) -> Result<(), SimError> {
        let flows = self.db.flow_count(switch);
        let bottleneck_bps = if flows > 0 {
            Some(
                self.db
                    .path(flow)
                    .ok_or(SimError::UnknownFlow(flow))?
                    .bottleneck_bps,
            )
        } else {
            None
        };
        let inputs = CongestionInputs {
            flows,
            max_rtt: self.db.max_rtt(switch).unwrap_or_default(),
            bottleneck_bps,
        };
        let prev = self.states.get(&switch).copied().unwrap_or_default();
        let state = congestion::recompute(&prev, &inputs, self.alpha, self.data_bytes);
        let tokens = congestion::prepare_tokens(&self.db, switch, &state, self.spacing)?;
        self.states.insert(switch, state);
        debug!(?switch, ?state, "📐 拥塞状态已更新");

        // 令牌先于 CTRL 到达交换机，广播时才能按新令牌填写各主机的节奏字段
        let msg = ControlMessage {
            kind: ControlMessageKind::BufferTokenUpdate,
            tokens,
            size_bytes: self.ctrl_message_bytes,
        };
        self.send_to_switch(switch, Packet::Control(msg), sim, net)?;

        let ctrl = Segment::new(
            FlowId::CONTROL,
            SegmentKind::Ctrl,
            0,
            self.ctrl_segment_bytes,
            self.id,
            NodeId::BROADCAST,
        )
        .with_cc(CongestionFields {
            big_rtt: state.big_rtt,
            window: state.s_wnd,
            inter_segment_delay: state.inter_segment_delay,
            ..CongestionFields::default()
        });
        self.send_to_switch(switch, Packet::Segment(ctrl), sim, net)
    }
}

impl Node for Controller {
    fn id(&self) -> NodeId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Controller
    }
}

impl ControlPlane for Controller {
    #[tracing::instrument(skip(self, pkt, sim, net), fields(node_name = %self.name, from_switch = ?from_switch))]
    fn recv_packet(
        &mut self,
        from_switch: NodeId,
        pkt: Packet,
        sim: &mut Simulator,
        net: &mut Network,
    ) -> Result<(), SimError> {
        let mut seg = match pkt {
            Packet::Segment(seg) => seg,
            Packet::Control(_) => {
                return Err(SimError::UnexpectedControlMessage {
                    component: "Controller",
                    node: self.id,
                });
            }
        };
        debug!(kind = ?seg.kind, flow = ?seg.flow_id, "🧠 Controller 收到段");
        match seg.kind {
            SegmentKind::Syn => self.register_flow(from_switch, &seg, sim, net)?,
            SegmentKind::UncontrolledFin => {
                if self.db.remove_flow(from_switch, seg.src, seg.flow_id) {
                    info!(flow = seg.flow_id.0, "👋 注销流");
                }
                seg.kind = SegmentKind::Fin;
            }
            _ => {}
        }
        self.handle_congestion_control(from_switch, seg.flow_id.data_stream(), sim, net)?;
        self.send_to_switch(from_switch, Packet::Segment(seg), sim, net)
    }

    fn register_switch(&mut self, switch: NodeId, downlink: LinkId, control_delay: SimTime) {
        self.downlinks.insert(switch, downlink);
        self.db.register_switch(switch, control_delay);
    }

    fn database(&self) -> &ControlDatabase {
        &self.db
    }

    fn congestion_states(&self) -> &BTreeMap<NodeId, CongestionState> {
        &self.states
    }
}

/// 路径度量：前向 (时延 + DATA 串行化) 与反向 (时延 + ACK 串行化) 之和，
/// 瓶颈为前向链路的最小带宽
pub fn path_metrics(
    net: &Network,
    src: NodeId,
    switches: &[NodeId],
    dst: NodeId,
    data_bytes: u32,
    ack_bytes: u32,
) -> Result<FlowPath, SimError> {
    let hops: Vec<NodeId> = std::iter::once(src)
        .chain(switches.iter().copied())
        .chain(std::iter::once(dst))
        .collect();
    let mut rtt = SimTime::ZERO;
    let mut bottleneck_bps = u64::MAX;
    for pair in hops.windows(2) {
        let fwd = net.link_between(pair[0], pair[1])?;
        rtt = rtt.after(fwd.latency).after(fwd.tx_time(data_bytes));
        bottleneck_bps = bottleneck_bps.min(fwd.bandwidth_bps);
        let rev = net.link_between(pair[1], pair[0])?;
        rtt = rtt.after(rev.latency).after(rev.tx_time(ack_bytes));
    }
    Ok(FlowPath {
        rtt,
        bottleneck_bps,
        switches: switches.to_vec(),
    })
}
