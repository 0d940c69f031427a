//! 流表下发事件

use super::id::{FlowId, NodeId};
use super::net_world::NetWorld;
use crate::sim::{Event, EventKind, SimError, Simulator, World};

/// 控制器在 `now + control_delay(switch)` 时刻把一条流表项装到交换机上
#[derive(Debug, Clone, Copy)]
pub struct FlowPathSetup {
    pub switch: NodeId,
    pub flow: FlowId,
    pub next_hop: NodeId,
}

impl Event for FlowPathSetup {
    fn execute(
        self: Box<Self>,
        _sim: &mut Simulator,
        world: &mut dyn World,
    ) -> Result<(), SimError> {
        NetWorld::network(world)?.install_flow_entry(self.switch, self.flow, self.next_hop)
    }

    fn kind(&self) -> EventKind {
        EventKind::FlowPathSetup
    }

    fn target(&self) -> Option<NodeId> {
        Some(self.switch)
    }
}
