//! 拓扑构建
//!
//! 提供常用测试床拓扑的构建函数。

pub mod dumbbell;

pub use dumbbell::{Dumbbell, DumbbellOpts, build_dumbbell};
