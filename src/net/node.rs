//! 节点类型
//!
//! 定义网络节点的公共接口。主机、SDN 交换机和控制器各自实现。

use serde::Serialize;

use super::id::NodeId;

/// 节点类别（封闭集合）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Host,
    Switch,
    Controller,
}

impl NodeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            NodeKind::Host => "host",
            NodeKind::Switch => "switch",
            NodeKind::Controller => "controller",
        }
    }
}

/// 节点接口
pub trait Node: Send {
    /// 获取节点标识符
    fn id(&self) -> NodeId;

    /// 获取节点名称
    fn name(&self) -> &str;

    fn kind(&self) -> NodeKind;
}
