//! 事件 trait
//!
//! 定义仿真事件接口。

use serde::Serialize;

use super::error::SimError;
use super::simulator::Simulator;
use super::world::World;
use crate::net::NodeId;

/// 事件类别（封闭集合），用于日志与测试断言。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    FlowStart,
    ArrivalToHost,
    DepartureFromHost,
    ArrivalToSwitch,
    DepartureFromSwitch,
    ArrivalToController,
    DepartureFromController,
    Timeout,
    FlowPathSetup,
    /// 非网络事件（测试或外部驱动）
    Custom,
}

/// 事件：可被调度执行。使用 `self: Box<Self>` 以支持 move/所有权转移。
///
/// 返回 `Err` 表示违反了模型不变量，仿真随即停止。
pub trait Event: Send + 'static {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World)
    -> Result<(), SimError>;

    fn kind(&self) -> EventKind {
        EventKind::Custom
    }

    /// 事件作用的节点（若有）
    fn target(&self) -> Option<NodeId> {
        None
    }
}
