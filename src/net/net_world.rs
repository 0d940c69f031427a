//! 网络世界实现
//!
//! 定义网络仿真的世界（World）实现，持有网络拓扑。

use super::network::Network;
use crate::sim::{SimError, SimTime, World};
use std::any::Any;

/// 一个默认的网络世界实现：持有 Network。
#[derive(Default)]
pub struct NetWorld {
    pub net: Network,
}

impl NetWorld {
    pub fn new(net: Network) -> Self {
        Self { net }
    }

    /// 从 `dyn World` 取出网络；世界类型不对属于致命错误
    pub fn network(world: &mut dyn World) -> Result<&mut Network, SimError> {
        world
            .as_any_mut()
            .downcast_mut::<NetWorld>()
            .map(|w| &mut w.net)
            .ok_or(SimError::WorldMismatch)
    }
}

impl World for NetWorld {
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn on_fatal(&mut self, now: SimTime, err: &SimError) {
        self.net
            .diagnostics
            .fatal(now, "Simulator", "run", err.to_string());
    }
}
