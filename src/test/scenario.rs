use crate::net::FlowId;
use crate::scenario::{DEFAULT_RUN_HORIZON, SCENARIO_SCHEMA_VERSION, ScenarioSpec, run_scenario};
use crate::sim::{Severity, SimError, SimTime};

const TWO_FLOWS: &str = r#"{
  "schema_version": 1,
  "config": { "alpha": 0.8 },
  "topology": { "kind": "dumbbell", "hosts_per_side": 2, "bottleneck_gbps": 25 },
  "flows": [
    { "id": 1, "src": "l0", "dst": "r0", "size_segments": 12 },
    { "id": 2, "src": "l1", "dst": "r1", "size_segments": 8, "start_us": 3 }
  ]
}"#;

#[test]
fn scenario_json_parses_with_defaults() {
    let spec = ScenarioSpec::from_json_str(TWO_FLOWS).expect("parse");
    assert_eq!(spec.schema_version, SCENARIO_SCHEMA_VERSION);
    assert_eq!(spec.config.alpha, 0.8);
    assert_eq!(spec.config.data_segment_bytes, 1500);
    assert_eq!(spec.flows.len(), 2);
    assert_eq!(spec.flows[0].start_us, 0);

    let opts = spec.topology.dumbbell_opts();
    assert_eq!(opts.hosts_per_side, 2);
    assert_eq!(opts.bottleneck_gbps, 25);
    assert_eq!(opts.host_link_gbps, 100);
    assert_eq!(opts.link_latency, SimTime::from_micros(2));
}

#[test]
fn scenario_runs_to_completion() {
    let spec = ScenarioSpec::from_json_str(TWO_FLOWS).expect("parse");
    let run = run_scenario(&spec).expect("run");

    assert!(run.events > 0);
    assert_eq!(run.stats.completed_flows(), 2);
    assert_eq!(run.stats.end_time, DEFAULT_RUN_HORIZON);
    assert!(run.stats.diagnostics.iter().all(|d| d.severity != Severity::Warning));
    let second = &run.stats.flows[&FlowId(2)];
    assert_eq!(second.start_time, Some(SimTime::from_micros(3)));
    assert_eq!(second.data_send_times.len(), 8);

    let json = serde_json::to_value(&run.stats).expect("stats json");
    assert!(json["flows"].is_object());
    assert!(json["links"].as_array().is_some_and(|l| !l.is_empty()));
}

#[test]
fn until_stops_the_run_early() {
    let mut spec = ScenarioSpec::from_json_str(TWO_FLOWS).expect("parse");
    spec.config.until = Some(SimTime::from_micros(5));
    let run = run_scenario(&spec).expect("run");
    assert_eq!(run.stats.end_time, SimTime::from_micros(5));
    assert_eq!(run.stats.completed_flows(), 0);
}

#[test]
fn unsupported_schema_version_is_rejected() {
    let raw = TWO_FLOWS.replacen("\"schema_version\": 1", "\"schema_version\": 7", 1);
    let err = ScenarioSpec::from_json_str(&raw).expect_err("version 7");
    assert!(matches!(err, SimError::Config(msg) if msg.contains("schema_version")));
}

#[test]
fn unknown_host_names_fail_the_build() {
    let raw = TWO_FLOWS.replacen("\"dst\": \"r1\"", "\"dst\": \"r9\"", 1);
    let spec = ScenarioSpec::from_json_str(&raw).expect("parse");
    let err = spec.build().err().expect("r9 does not exist");
    assert!(matches!(err, SimError::Config(msg) if msg.contains("r9")));

    let raw = TWO_FLOWS.replacen("\"dst\": \"r1\"", "\"dst\": \"s1\"", 1);
    let spec = ScenarioSpec::from_json_str(&raw).expect("parse");
    assert!(spec.build().is_err());
}

#[test]
fn malformed_json_is_a_json_error() {
    let err = ScenarioSpec::from_json_str("{ not json").expect_err("garbage");
    assert!(matches!(err, SimError::Json(_)));
}

const LOSSY: &str = r#"{
  "schema_version": 1,
  "topology": { "kind": "dumbbell", "hosts_per_side": 3, "switch_buffer_segments": 2 },
  "flows": [
    { "id": 1, "src": "l0", "dst": "r0", "size_segments": 60 },
    { "id": 2, "src": "l1", "dst": "r1", "size_segments": 60 },
    { "id": 3, "src": "l2", "dst": "r2", "size_segments": 60 }
  ]
}"#;

#[test]
fn lossy_scenario_without_until_stops_at_the_default_horizon() {
    let spec = ScenarioSpec::from_json_str(LOSSY).expect("parse");
    assert_eq!(spec.config.until, None);
    let run = run_scenario(&spec).expect("bounded run");

    let stats = &run.stats;
    assert_eq!(stats.end_time, DEFAULT_RUN_HORIZON);
    assert!(stats.counters.dropped_segments > 0);
    assert!(stats.diagnostics.iter().all(|d| d.severity != Severity::Fatal));
    assert!(stats.completed_flows() >= 1);
    // 未完成的流仍在按 Interval 空转，运行停在上限并留下告警
    if stats.completed_flows() < stats.flows.len() {
        assert!(stats.diagnostics.iter().any(|d| {
            d.severity == Severity::Warning && d.operation == "run_scenario"
        }));
    }
}
