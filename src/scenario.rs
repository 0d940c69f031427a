//! 场景文件
//!
//! JSON 描述的测试床（目前为 dumbbell）与流列表，以及运行一个场景的入口。

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::net::{FlowId, NetWorld, Network, NodeId, NodeKind, Statistics};
use crate::proto::FlowSpec;
use crate::sim::{SimConfig, SimError, SimTime, Simulator};
use crate::topo::{DumbbellOpts, build_dumbbell};

pub const SCENARIO_SCHEMA_VERSION: u32 = 1;

/// 未配置 `config.until` 时的运行上限。
///
/// 尾段丢失且没有 NACK 的流会一直按 Interval 空转，事件队列永远不会排空。
pub const DEFAULT_RUN_HORIZON: SimTime = SimTime(100_000_000);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioSpec {
    pub schema_version: u32,
    #[serde(default)]
    pub config: SimConfig,
    pub topology: TopologySpec,
    #[serde(default)]
    pub flows: Vec<FlowEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TopologySpec {
    Dumbbell {
        #[serde(default)]
        hosts_per_side: Option<usize>,
        #[serde(default)]
        host_link_gbps: Option<u64>,
        #[serde(default)]
        bottleneck_gbps: Option<u64>,
        #[serde(default)]
        control_link_gbps: Option<u64>,
        #[serde(default)]
        link_latency_us: Option<u64>,
        #[serde(default)]
        control_latency_us: Option<u64>,
        #[serde(default)]
        host_buffer_segments: Option<usize>,
        #[serde(default)]
        switch_buffer_segments: Option<usize>,
    },
}

/// 场景中的一条流；端点用主机名引用（dumbbell 中为 `l0..`、`r0..`）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowEntry {
    pub id: u64,
    pub src: String,
    pub dst: String,
    pub size_segments: u64,
    #[serde(default)]
    pub start_us: u64,
}

/// 一次场景运行的结果
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioRun {
    pub events: u64,
    pub stats: Statistics,
}

impl TopologySpec {
    pub fn dumbbell_opts(&self) -> DumbbellOpts {
        let TopologySpec::Dumbbell {
            hosts_per_side,
            host_link_gbps,
            bottleneck_gbps,
            control_link_gbps,
            link_latency_us,
            control_latency_us,
            host_buffer_segments,
            switch_buffer_segments,
        } = self;
        let d = DumbbellOpts::default();
        DumbbellOpts {
            hosts_per_side: hosts_per_side.unwrap_or(d.hosts_per_side),
            host_link_gbps: host_link_gbps.unwrap_or(d.host_link_gbps),
            bottleneck_gbps: bottleneck_gbps.unwrap_or(d.bottleneck_gbps),
            control_link_gbps: control_link_gbps.unwrap_or(d.control_link_gbps),
            link_latency: link_latency_us.map_or(d.link_latency, SimTime::from_micros),
            control_latency: control_latency_us.map_or(d.control_latency, SimTime::from_micros),
            host_buffer_segments: host_buffer_segments.unwrap_or(d.host_buffer_segments),
            switch_buffer_segments: switch_buffer_segments.unwrap_or(d.switch_buffer_segments),
        }
    }
}

impl ScenarioSpec {
    pub fn from_json_str(raw: &str) -> Result<Self, SimError> {
        let spec: ScenarioSpec = serde_json::from_str(raw)?;
        if spec.schema_version != SCENARIO_SCHEMA_VERSION {
            return Err(SimError::Config(format!(
                "unsupported scenario schema_version {} (expected {})",
                spec.schema_version, SCENARIO_SCHEMA_VERSION
            )));
        }
        Ok(spec)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, SimError> {
        let raw = fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    /// 构建拓扑并注册所有流，返回尚未运行的仿真器与世界
    pub fn build(&self) -> Result<(Simulator, NetWorld), SimError> {
        let mut sim = Simulator::default();
        let mut world = NetWorld::new(Network::new(self.config.clone()));
        match &self.topology {
            TopologySpec::Dumbbell { .. } => {
                build_dumbbell(&mut world, &self.topology.dumbbell_opts())?;
            }
        }
        for entry in &self.flows {
            let spec = FlowSpec {
                id: FlowId(entry.id),
                src: resolve_host(&world.net, &entry.src)?,
                dst: resolve_host(&world.net, &entry.dst)?,
                size_segments: entry.size_segments,
                start: SimTime::from_micros(entry.start_us),
            };
            world.net.add_flow(&spec, &mut sim)?;
        }
        Ok((sim, world))
    }
}

fn resolve_host(net: &Network, name: &str) -> Result<NodeId, SimError> {
    let id = net
        .node_by_name(name)
        .ok_or_else(|| SimError::Config(format!("unknown host {name:?}")))?;
    if net.node_kind(id)? != NodeKind::Host {
        return Err(SimError::Config(format!("{name:?} is not a host")));
    }
    Ok(id)
}

/// 运行一个场景到 `config.until`（缺省为 [`DEFAULT_RUN_HORIZON`]）或事件队列为空
pub fn run_scenario(spec: &ScenarioSpec) -> Result<ScenarioRun, SimError> {
    let (mut sim, mut world) = spec.build()?;
    let until = spec.config.until.unwrap_or(DEFAULT_RUN_HORIZON);
    info!(flows = spec.flows.len(), ?until, "▶️  运行场景");
    let events = sim.run_until(until, &mut world)?;
    if !sim.is_empty() {
        world.net.diagnostics.warning(
            sim.now(),
            "Scenario",
            "run_scenario",
            format!("horizon reached with {} pending events", sim.len()),
        );
    }
    Ok(ScenarioRun {
        events,
        stats: world.net.statistics(sim.now()),
    })
}
