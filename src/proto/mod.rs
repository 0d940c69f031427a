//! 传输层/协议模块
//!
//! 主机上的传输代理：按控制器节奏发送的发送端、回 ACK/NACK 的接收端，
//! 以及它们使用的软取消定时器和流记录。

pub mod agent;
pub mod flow;
pub mod receiver;
pub mod sender;
pub mod timer;

pub use agent::{FlowStart, Timeout, TransportAgent};
pub use flow::{FlowRecord, FlowSpec};
pub use receiver::Receiver;
pub use sender::{CycleParams, Sender, SenderState};
pub use timer::{TimerId, TimerKind, TimerTable};
