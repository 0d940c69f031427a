//! 发送端定时器
//!
//! 每种定时器一个槽位，槽位带版本号。定时器被"软取消"：超时事件仍留在
//! 事件队列中，触发时若版本不匹配或槽位已解除，则什么也不做。

use serde::Serialize;

use crate::sim::SimTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerKind {
    /// 新的拥塞参数生效时刻
    TimeToCycle,
    /// 周期开始后的初始等待
    InitialDelay,
    /// 下一个发送间隔
    Interval,
    /// 间隔内相邻两个段之间的节拍
    InterSegmentDelay,
}

impl TimerKind {
    pub const ALL: [TimerKind; 4] = [
        TimerKind::TimeToCycle,
        TimerKind::InitialDelay,
        TimerKind::Interval,
        TimerKind::InterSegmentDelay,
    ];

    fn slot(self) -> usize {
        match self {
            TimerKind::TimeToCycle => 0,
            TimerKind::InitialDelay => 1,
            TimerKind::Interval => 2,
            TimerKind::InterSegmentDelay => 3,
        }
    }
}

/// 超时事件携带的定时器标识
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId {
    pub kind: TimerKind,
    pub version: u64,
}

#[derive(Debug, Default, Clone, Copy)]
struct TimerSlot {
    version: u64,
    armed: bool,
    deadline: SimTime,
}

#[derive(Debug, Default)]
pub struct TimerTable {
    slots: [TimerSlot; 4],
}

impl TimerTable {
    /// 启动一个在 `deadline` 到期的定时器；同类的旧定时器随之失效
    pub fn arm(&mut self, kind: TimerKind, deadline: SimTime) -> TimerId {
        let slot = &mut self.slots[kind.slot()];
        slot.version = slot.version.wrapping_add(1);
        slot.armed = true;
        slot.deadline = deadline;
        TimerId {
            kind,
            version: slot.version,
        }
    }

    pub fn cancel(&mut self, kind: TimerKind) {
        self.slots[kind.slot()].armed = false;
    }

    pub fn cancel_all(&mut self) {
        for slot in &mut self.slots {
            slot.armed = false;
        }
    }

    pub fn is_active(&self, id: TimerId) -> bool {
        let slot = &self.slots[id.kind.slot()];
        slot.armed && slot.version == id.version
    }

    /// 超时事件到达：仍有效则解除槽位并返回 true
    pub fn fire(&mut self, id: TimerId) -> bool {
        if !self.is_active(id) {
            return false;
        }
        self.slots[id.kind.slot()].armed = false;
        true
    }

    pub fn is_armed(&self, kind: TimerKind) -> bool {
        self.slots[kind.slot()].armed
    }

    /// 当前有效的定时器中最早到期的一个
    pub fn next_due(&self) -> Option<(SimTime, TimerId)> {
        TimerKind::ALL
            .iter()
            .filter_map(|&kind| {
                let slot = &self.slots[kind.slot()];
                slot.armed.then_some((
                    slot.deadline,
                    TimerId {
                        kind,
                        version: slot.version,
                    },
                ))
            })
            .min_by_key(|(deadline, _)| *deadline)
    }
}
