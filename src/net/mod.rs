//! 网络模拟模块
//!
//! 此模块包含网络模拟的核心组件：标识符、段与数据包、链路、主机、SDN 交换机、
//! 拓扑 arena 以及驱动它们的到达/离开事件。

// 子模块声明
mod arrival;
mod departure;
mod flow_path_setup;
mod host;
mod id;
mod link;
mod net_world;
mod network;
mod node;
mod packet;
mod routing;
mod segment;
mod stats;
mod switch;

// 重新导出公共接口
pub use arrival::{ArrivalToController, ArrivalToHost, ArrivalToSwitch};
pub use departure::{DepartureFromController, DepartureFromHost, DepartureFromSwitch};
pub use flow_path_setup::FlowPathSetup;
pub use host::Host;
pub use id::{FlowId, LinkId, NodeId};
pub use link::{Link, LinkUtilization, tx_time};
pub use net_world::NetWorld;
pub use network::Network;
pub use node::{Node, NodeKind};
pub use packet::{ControlMessage, ControlMessageKind, Packet};
pub use routing::RoutingTable;
pub use segment::{CongestionFields, Segment, SegmentKind};
pub use stats::{LinkReport, Statistics, Stats};
pub use switch::{AccessPort, ControlHandler, FlowTable, ForwardingNode, SdnSwitch, TokenBroadcast};
