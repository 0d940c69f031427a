//! 队列与准入控制
//!
//! 链路缓冲区（按段计数、满则丢弃）以及控制器下发的令牌调度。

mod buffer;
mod token;

pub use buffer::{Buffer, Dropped};
pub use token::{BufferToken, TokenGate};

/// 默认缓冲区容量（段）
pub const DEFAULT_BUFFER_SEGMENTS: usize = 100;

/// 控制链路使用的缓冲区容量（段），实际上不会溢出
pub const CONTROL_BUFFER_SEGMENTS: usize = usize::MAX;
