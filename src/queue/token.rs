//! 缓冲区令牌（BufferToken）
//!
//! 令牌描述一个周期性的准入调度：在 `initial_cycle_delay` 之后先放行
//! `previous_window` 个 DATA 段，此后每隔 `steady_cycle_delay` 放行至多
//! `window` 个。

use serde::Serialize;

use crate::sim::SimTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct BufferToken {
    pub active: bool,
    pub initial_cycle_delay: SimTime,
    pub previous_window: u64,
    pub steady_cycle_delay: SimTime,
    pub window: u64,
}

impl BufferToken {
    pub fn activate(
        initial_cycle_delay: SimTime,
        previous_window: u64,
        steady_cycle_delay: SimTime,
        window: u64,
    ) -> Self {
        Self {
            active: true,
            initial_cycle_delay,
            previous_window,
            steady_cycle_delay,
            window,
        }
    }

    /// 非激活或窗口为 0 的令牌不做任何限制
    pub fn gates(&self) -> bool {
        self.active && self.window > 0
    }
}

/// 安装在某个缓冲区上的令牌状态
#[derive(Debug, Clone)]
pub struct TokenGate {
    token: BufferToken,
    first_open: SimTime,
    cycle: u64,
    admitted: u64,
}

impl TokenGate {
    pub fn new(installed_at: SimTime, token: BufferToken) -> Self {
        Self {
            token,
            first_open: installed_at.after(token.initial_cycle_delay),
            cycle: 0,
            admitted: 0,
        }
    }

    pub fn token(&self) -> &BufferToken {
        &self.token
    }

    fn quota(&self, cycle: u64) -> u64 {
        if cycle == 0 {
            self.token.previous_window
        } else {
            self.token.window
        }
    }

    fn cycle_open(&self, cycle: u64) -> SimTime {
        self.first_open
            .after(SimTime(self.token.steady_cycle_delay.0.saturating_mul(cycle)))
    }

    /// 返回候选发送时刻 `start` 之后、令牌允许的最早发送时刻，并占用一个名额。
    ///
    /// 同一缓冲区上的候选时刻单调不减（由 `busy_until` 保证）。
    pub fn admit(&mut self, start: SimTime) -> SimTime {
        if !self.token.gates() {
            return start;
        }
        let steady = self.token.steady_cycle_delay;
        let mut t = start.max(self.first_open);
        loop {
            if !steady.is_zero() {
                // 跳到 t 所在的周期
                let idx = (t.0 - self.first_open.0) / steady.0;
                if idx > self.cycle {
                    self.cycle = idx;
                    self.admitted = 0;
                }
            }
            let open = self.cycle_open(self.cycle);
            if t < open {
                t = open;
            }
            if self.admitted < self.quota(self.cycle) {
                self.admitted += 1;
                return t;
            }
            // 本周期名额用完，等下一个周期
            self.cycle += 1;
            self.admitted = 0;
            t = t.max(self.cycle_open(self.cycle));
        }
    }
}
