//! 诊断日志
//!
//! 结构化的诊断记录：致命错误、丢包、协议时序告警。每条记录同时通过
//! `tracing` 输出，测试则可以直接对记录做断言。

use serde::Serialize;
use tracing::{debug, error, warn};

use super::time::SimTime;

/// 诊断级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// 违反不变量，仿真停止
    Fatal,
    /// 缓冲区满导致的丢包，仿真继续
    Drop,
    /// 协议时序异常，触发动作被跳过
    Warning,
}

#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    pub at: SimTime,
    pub severity: Severity,
    pub component: &'static str,
    pub operation: &'static str,
    pub message: String,
}

#[derive(Debug, Default)]
pub struct DiagnosticLog {
    entries: Vec<Diagnostic>,
}

impl DiagnosticLog {
    pub fn record(
        &mut self,
        at: SimTime,
        severity: Severity,
        component: &'static str,
        operation: &'static str,
        message: impl Into<String>,
    ) {
        let message = message.into();
        match severity {
            Severity::Fatal => error!(?at, component, operation, "{message}"),
            Severity::Warning => warn!(?at, component, operation, "{message}"),
            Severity::Drop => debug!(?at, component, operation, "🗑️  {message}"),
        }
        self.entries.push(Diagnostic {
            at,
            severity,
            component,
            operation,
            message,
        });
    }

    pub fn fatal(
        &mut self,
        at: SimTime,
        component: &'static str,
        operation: &'static str,
        message: impl Into<String>,
    ) {
        self.record(at, Severity::Fatal, component, operation, message);
    }

    pub fn drop_packet(
        &mut self,
        at: SimTime,
        component: &'static str,
        operation: &'static str,
        message: impl Into<String>,
    ) {
        self.record(at, Severity::Drop, component, operation, message);
    }

    pub fn warning(
        &mut self,
        at: SimTime,
        component: &'static str,
        operation: &'static str,
        message: impl Into<String>,
    ) {
        self.record(at, Severity::Warning, component, operation, message);
    }

    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.entries
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
