//! 到达事件
//!
//! 数据包在链路对端到达主机、交换机或控制器。

use super::id::NodeId;
use super::net_world::NetWorld;
use super::packet::Packet;
use crate::sim::{Event, EventKind, SimError, Simulator, World};

#[derive(Debug)]
pub struct ArrivalToHost {
    pub host: NodeId,
    pub pkt: Packet,
}

impl Event for ArrivalToHost {
    fn execute(
        self: Box<Self>,
        sim: &mut Simulator,
        world: &mut dyn World,
    ) -> Result<(), SimError> {
        let ArrivalToHost { host, pkt } = *self;
        let net = NetWorld::network(world)?;
        net.with_host(host, |h, net| h.recv_packet(pkt, sim, net))
    }

    fn kind(&self) -> EventKind {
        EventKind::ArrivalToHost
    }

    fn target(&self) -> Option<NodeId> {
        Some(self.host)
    }
}

#[derive(Debug)]
pub struct ArrivalToSwitch {
    pub switch: NodeId,
    pub pkt: Packet,
}

impl Event for ArrivalToSwitch {
    fn execute(
        self: Box<Self>,
        sim: &mut Simulator,
        world: &mut dyn World,
    ) -> Result<(), SimError> {
        let ArrivalToSwitch { switch, pkt } = *self;
        let net = NetWorld::network(world)?;
        net.with_switch(switch, |s, net| s.recv_packet(pkt, sim, net))
    }

    fn kind(&self) -> EventKind {
        EventKind::ArrivalToSwitch
    }

    fn target(&self) -> Option<NodeId> {
        Some(self.switch)
    }
}

#[derive(Debug)]
pub struct ArrivalToController {
    pub controller: NodeId,
    /// 数据包来自哪台交换机
    pub from_switch: NodeId,
    pub pkt: Packet,
}

impl Event for ArrivalToController {
    fn execute(
        self: Box<Self>,
        sim: &mut Simulator,
        world: &mut dyn World,
    ) -> Result<(), SimError> {
        let ArrivalToController {
            controller,
            from_switch,
            pkt,
        } = *self;
        let net = NetWorld::network(world)?;
        net.with_controller(controller, |c, net| {
            c.recv_packet(from_switch, pkt, sim, net)
        })
    }

    fn kind(&self) -> EventKind {
        EventKind::ArrivalToController
    }

    fn target(&self) -> Option<NodeId> {
        Some(self.controller)
    }
}
