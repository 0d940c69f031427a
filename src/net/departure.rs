//! 离开事件
//!
//! 数据包在出链路上开始串行化：出队、更新利用率，并调度对端的到达事件。

use super::id::{LinkId, NodeId};
use super::net_world::NetWorld;
use super::packet::Packet;
use crate::sim::{Event, EventKind, SimError, SimTime, Simulator, World};

#[derive(Debug)]
pub struct DepartureFromHost {
    pub host: NodeId,
    pub link: LinkId,
    pub pkt: Packet,
    pub enqueued_at: SimTime,
}

impl Event for DepartureFromHost {
    fn execute(
        self: Box<Self>,
        sim: &mut Simulator,
        world: &mut dyn World,
    ) -> Result<(), SimError> {
        let DepartureFromHost {
            host,
            link,
            pkt,
            enqueued_at,
        } = *self;
        let net = NetWorld::network(world)?;
        net.record_host_departure(host, &pkt, sim.now());
        net.depart(link, pkt, enqueued_at, sim)
    }

    fn kind(&self) -> EventKind {
        EventKind::DepartureFromHost
    }

    fn target(&self) -> Option<NodeId> {
        Some(self.host)
    }
}

#[derive(Debug)]
pub struct DepartureFromSwitch {
    pub switch: NodeId,
    pub link: LinkId,
    pub pkt: Packet,
    pub enqueued_at: SimTime,
}

impl Event for DepartureFromSwitch {
    fn execute(
        self: Box<Self>,
        sim: &mut Simulator,
        world: &mut dyn World,
    ) -> Result<(), SimError> {
        let DepartureFromSwitch {
            link,
            pkt,
            enqueued_at,
            ..
        } = *self;
        NetWorld::network(world)?.depart(link, pkt, enqueued_at, sim)
    }

    fn kind(&self) -> EventKind {
        EventKind::DepartureFromSwitch
    }

    fn target(&self) -> Option<NodeId> {
        Some(self.switch)
    }
}

#[derive(Debug)]
pub struct DepartureFromController {
    pub controller: NodeId,
    pub link: LinkId,
    pub pkt: Packet,
    pub enqueued_at: SimTime,
}

impl Event for DepartureFromController {
    fn execute(
        self: Box<Self>,
        sim: &mut Simulator,
        world: &mut dyn World,
    ) -> Result<(), SimError> {
        let DepartureFromController {
            link,
            pkt,
            enqueued_at,
            ..
        } = *self;
        NetWorld::network(world)?.depart(link, pkt, enqueued_at, sim)
    }

    fn kind(&self) -> EventKind {
        EventKind::DepartureFromController
    }

    fn target(&self) -> Option<NodeId> {
        Some(self.controller)
    }
}
