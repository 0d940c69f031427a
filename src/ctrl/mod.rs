//! SDN 控制平面
//!
//! 集中式控制器、它的数据库以及拥塞参数计算。

mod congestion;
mod controller;
mod database;

pub use congestion::{CongestionInputs, CongestionState, prepare_tokens, recompute};
pub use controller::{ControlPlane, Controller, path_metrics};
pub use database::{ControlDatabase, FlowPath};
