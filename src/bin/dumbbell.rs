//! Dumbbell 拓扑仿真
//!
//! 运行一个场景文件，或按命令行参数生成 N 条 l_i -> r_i 的流。

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use sdnsim_rs::scenario::{
    FlowEntry, SCENARIO_SCHEMA_VERSION, ScenarioSpec, TopologySpec, run_scenario,
};
use sdnsim_rs::sim::{SimConfig, SimError, SimTime};

#[derive(Debug, Parser)]
#[command(name = "dumbbell", about = "Dumbbell 拓扑仿真：SDN 令牌调度传输")]
struct Args {
    /// 场景 JSON；指定后忽略下面的拓扑/流参数
    #[arg(long)]
    scenario: Option<PathBuf>,
    /// 流数（每条流 l_i -> r_i）
    #[arg(long, default_value_t = 1)]
    flows: usize,
    /// 每条流的 DATA 段数
    #[arg(long, default_value_t = 100)]
    segments: u64,
    /// 相邻两条流的启动间隔（微秒）
    #[arg(long, default_value_t = 0)]
    stagger_us: u64,
    #[arg(long, default_value_t = 100)]
    host_link_gbps: u64,
    #[arg(long, default_value_t = 10)]
    bottleneck_gbps: u64,
    /// 单向链路传播时延（微秒）
    #[arg(long, default_value_t = 2)]
    link_latency_us: u64,
    /// 控制链路传播时延（微秒）
    #[arg(long, default_value_t = 1)]
    control_latency_us: u64,
    /// 链路缓冲区容量（段）
    #[arg(long, default_value_t = 100)]
    buffer_segments: usize,
    /// 仿真运行到多少毫秒；缺省时沿用场景的 `config.until`，
    /// 两者都未给出则运行 100ms
    #[arg(long)]
    until_ms: Option<u64>,
    /// 统计快照输出路径
    #[arg(long)]
    json_out: Option<PathBuf>,
}

fn scenario_from_args(args: &Args) -> Result<ScenarioSpec, SimError> {
    if let Some(path) = &args.scenario {
        let mut spec = ScenarioSpec::load(path)?;
        if let Some(ms) = args.until_ms {
            spec.config.until = Some(SimTime::from_millis(ms));
        }
        return Ok(spec);
    }
    let config = SimConfig {
        until: args.until_ms.map(SimTime::from_millis),
        ..SimConfig::default()
    };
    let flows = (0..args.flows)
        .map(|i| FlowEntry {
            id: i as u64 + 1,
            src: format!("l{i}"),
            dst: format!("r{i}"),
            size_segments: args.segments,
            start_us: args.stagger_us.saturating_mul(i as u64),
        })
        .collect();
    Ok(ScenarioSpec {
        schema_version: SCENARIO_SCHEMA_VERSION,
        config,
        topology: TopologySpec::Dumbbell {
            hosts_per_side: Some(args.flows.max(1)),
            host_link_gbps: Some(args.host_link_gbps),
            bottleneck_gbps: Some(args.bottleneck_gbps),
            control_link_gbps: None,
            link_latency_us: Some(args.link_latency_us),
            control_latency_us: Some(args.control_latency_us),
            host_buffer_segments: Some(args.buffer_segments),
            switch_buffer_segments: Some(args.buffer_segments),
        },
        flows,
    })
}

fn run(args: &Args) -> Result<(), SimError> {
    let spec = scenario_from_args(args)?;
    let result = run_scenario(&spec)?;
    let stats = &result.stats;

    for record in stats.flows.values() {
        let fct_us = record
            .completion_duration()
            .map(|d| format!("{:.3}", d.as_micros_f64()))
            .unwrap_or_else(|| "none".to_string());
        println!(
            "flow_fct id={} size_segments={} fct_us={} retransmissions={} completed={}",
            record.id.0,
            record.size_segments,
            fct_us,
            record.retransmissions,
            record.is_completed()
        );
    }
    println!(
        "done @ {:?}, events={}, completed_flows={}/{}, delivered_segments={}, dropped_segments={}",
        stats.end_time,
        result.events,
        stats.completed_flows(),
        stats.flows.len(),
        stats.counters.delivered_segments,
        stats.counters.dropped_segments
    );

    if let Some(path) = &args.json_out {
        let raw = serde_json::to_string_pretty(stats)?;
        fs::write(path, raw)?;
    }
    Ok(())
}

fn main() -> ExitCode {
    // 初始化 tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_file(true)
        .with_line_number(true)
        .with_target(true)
        .init();

    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("dumbbell: {err}");
            ExitCode::FAILURE
        }
    }
}
