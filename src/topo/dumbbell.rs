//! Dumbbell 拓扑构建

use serde::{Deserialize, Serialize};

use crate::net::{NetWorld, NodeId};
use crate::queue::DEFAULT_BUFFER_SEGMENTS;
use crate::sim::{SimError, SimTime};

/// Dumbbell 拓扑配置选项
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DumbbellOpts {
    /// 每侧主机数
    pub hosts_per_side: usize,
    pub host_link_gbps: u64,
    pub bottleneck_gbps: u64,
    pub control_link_gbps: u64,
    pub link_latency: SimTime,
    pub control_latency: SimTime,
    pub host_buffer_segments: usize,
    pub switch_buffer_segments: usize,
}

impl Default for DumbbellOpts {
    fn default() -> Self {
        Self {
            hosts_per_side: 1,
            host_link_gbps: 100,
            bottleneck_gbps: 10,
            control_link_gbps: 100,
            link_latency: SimTime::from_micros(2),
            control_latency: SimTime::from_micros(1),
            host_buffer_segments: DEFAULT_BUFFER_SEGMENTS,
            switch_buffer_segments: DEFAULT_BUFFER_SEGMENTS,
        }
    }
}

/// 构建结果
#[derive(Debug, Clone)]
pub struct Dumbbell {
    pub left: Vec<NodeId>,
    pub right: Vec<NodeId>,
    pub switches: [NodeId; 2],
    pub controller: NodeId,
}

fn gbps_to_bps(g: u64) -> u64 {
    g.saturating_mul(1_000_000_000)
}

/// 构建 dumbbell 拓扑
///
/// 拓扑结构：l* <-> s0 <-> s1 <-> r*，控制器 c0 与 s0、s1 各有一条控制链路。
/// 主机命名为 `l0..`、`r0..`。
pub fn build_dumbbell(world: &mut NetWorld, opts: &DumbbellOpts) -> Result<Dumbbell, SimError> {
    if opts.hosts_per_side == 0 {
        return Err(SimError::Config("dumbbell needs at least one host per side".into()));
    }
    let net = &mut world.net;
    let s0 = net.add_switch("s0");
    let s1 = net.add_switch("s1");
    let controller = net.add_controller("c0")?;

    let host_bps = gbps_to_bps(opts.host_link_gbps);
    let bottleneck_bps = gbps_to_bps(opts.bottleneck_gbps);

    net.connect_control(s0, opts.control_latency, gbps_to_bps(opts.control_link_gbps))?;
    net.connect_control(s1, opts.control_latency, gbps_to_bps(opts.control_link_gbps))?;
    // s0 <-> s1 (bottleneck)
    net.connect_switches(
        s0,
        s1,
        opts.link_latency,
        bottleneck_bps,
        opts.switch_buffer_segments,
    )?;

    let mut left = Vec::with_capacity(opts.hosts_per_side);
    let mut right = Vec::with_capacity(opts.hosts_per_side);
    for i in 0..opts.hosts_per_side {
        let l = net.add_host(format!("l{i}"));
        net.connect_access(l, s0, opts.link_latency, host_bps, opts.host_buffer_segments)?;
        left.push(l);
        let r = net.add_host(format!("r{i}"));
        net.connect_access(r, s1, opts.link_latency, host_bps, opts.host_buffer_segments)?;
        right.push(r);
    }

    Ok(Dumbbell {
        left,
        right,
        switches: [s0, s1],
        controller,
    })
}
