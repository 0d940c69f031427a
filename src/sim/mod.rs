//! 仿真核心模块
//!
//! 此模块包含事件驱动仿真的核心组件，如仿真时间、事件、世界和仿真器，
//! 以及错误类型、诊断日志和全局配置。

// 子模块声明
mod config;
mod diagnostics;
mod error;
mod event;
mod scheduled_event;
mod simulator;
mod time;
mod world;

// 重新导出公共接口
pub use config::{InterFlowSpacing, SimConfig};
pub use diagnostics::{Diagnostic, DiagnosticLog, Severity};
pub use error::SimError;
pub use event::{Event, EventKind};
pub use scheduled_event::ScheduledEvent;
pub use simulator::Simulator;
pub use time::SimTime;
pub use world::World;
