//! 仿真配置
//!
//! 段大小、拥塞控制增益等全局参数。可以从场景 JSON 的 `config` 字段读取，
//! 缺省字段使用默认值。

use serde::{Deserialize, Serialize};

use super::time::SimTime;

/// 同一接入交换机下多条流之间的初始错开量（扩展点，默认关闭）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InterFlowSpacing {
    #[default]
    Disabled,
    /// 第 i 个主机额外延后 `i * delay`
    PerIndex { delay: SimTime },
}

impl InterFlowSpacing {
    pub fn offset(&self, index: usize) -> SimTime {
        match *self {
            InterFlowSpacing::Disabled => SimTime::ZERO,
            InterFlowSpacing::PerIndex { delay } => {
                SimTime(delay.0.saturating_mul(index as u64))
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// DATA 段大小（字节）
    pub data_segment_bytes: u32,
    /// SYN/SYNACK/ACK/NACK/FIN/FINACK 段大小（字节）
    pub ack_segment_bytes: u32,
    /// 控制器广播的 CTRL 段大小（字节）
    pub ctrl_segment_bytes: u32,
    /// 控制器 -> 交换机的控制消息大小（字节）
    pub ctrl_message_bytes: u32,
    /// 窗口计算中的增益 alpha
    pub alpha: f64,
    /// 主机处理时延
    pub host_process_delay: SimTime,
    /// 是否统计链路利用率
    pub monitor_links: bool,
    pub inter_flow_spacing: InterFlowSpacing,
    /// 运行时间上限；None 时场景使用缺省上限
    pub until: Option<SimTime>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            data_segment_bytes: 1500,
            ack_segment_bytes: 64,
            ctrl_segment_bytes: 64,
            ctrl_message_bytes: 64,
            alpha: 1.0,
            host_process_delay: SimTime::ZERO,
            monitor_links: true,
            inter_flow_spacing: InterFlowSpacing::Disabled,
            until: None,
        }
    }
}
