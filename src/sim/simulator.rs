//! 仿真器
//!
//! 定义事件驱动仿真器，维护当前时间与事件队列。

use super::error::SimError;
use super::event::Event;
use super::scheduled_event::ScheduledEvent;
use super::time::SimTime;
use super::world::World;
use std::collections::BinaryHeap;
use tracing::{debug, error, info, trace};

/// 事件驱动仿真器：维护当前时间与事件队列。
///
/// 时间只在弹出事件时前进；同一时刻的事件按提交顺序执行。
#[derive(Default)]
pub struct Simulator {
    now: SimTime,
    next_seq: u64,
    q: BinaryHeap<ScheduledEvent>,
}

impl Simulator {
    /// 获取当前仿真时间
    pub fn now(&self) -> SimTime {
        self.now
    }

    pub fn is_empty(&self) -> bool {
        self.q.is_empty()
    }

    pub fn len(&self) -> usize {
        self.q.len()
    }

    /// 队首事件的执行时间
    pub fn peek_time(&self) -> Option<SimTime> {
        self.q.peek().map(|e| e.at)
    }

    /// 调度事件在指定时间执行。`at` 早于当前时间属于模型缺陷。
    #[tracing::instrument(skip(self, ev), fields(event_kind = ?ev.kind(), schedule_at = ?at))]
    pub fn schedule<E: Event>(&mut self, at: SimTime, ev: E) -> Result<(), SimError> {
        if at < self.now {
            return Err(SimError::ScheduleInPast { at, now: self.now });
        }
        let seq = self.next_seq;
        trace!(now = ?self.now, seq, "调度事件");

        self.next_seq = self.next_seq.wrapping_add(1);
        self.q.push(ScheduledEvent {
            at,
            seq,
            ev: Box::new(ev),
        });

        debug!(queue_size = self.q.len(), "事件已加入队列");
        Ok(())
    }

    /// 在 `now + delay` 调度事件
    pub fn schedule_in<E: Event>(&mut self, delay: SimTime, ev: E) -> Result<(), SimError> {
        self.schedule(self.now.after(delay), ev)
    }

    /// 弹出最早的事件并把时钟推进到它的时间。
    pub fn pop_next(&mut self) -> Option<ScheduledEvent> {
        let item = self.q.pop()?;
        self.now = self.now.max(item.at);
        Some(item)
    }

    fn step(&mut self, world: &mut dyn World) -> Option<Result<(), SimError>> {
        let item = self.pop_next()?;
        let kind = item.kind();
        trace!(now = ?self.now, seq = item.seq, ?kind, target = ?item.target(), "执行事件");
        if let Err(err) = item.ev.execute(self, world) {
            error!(now = ?self.now, ?kind, %err, "❌ 致命错误，仿真停止");
            world.on_fatal(self.now, &err);
            return Some(Err(err));
        }
        world.on_tick(self);
        Some(Ok(()))
    }

    /// 运行直到事件队列为空或到达 `until`，返回执行的事件数。
    pub fn run_until(&mut self, until: SimTime, world: &mut dyn World) -> Result<u64, SimError> {
        let mut event_count = 0u64;
        while let Some(at) = self.peek_time() {
            if at > until {
                break;
            }
            match self.step(world) {
                Some(res) => res?,
                None => break,
            }
            event_count += 1;
        }
        self.now = self.now.max(until);
        Ok(event_count)
    }

    /// 运行所有事件直到队列为空，返回执行的事件数。
    #[tracing::instrument(skip(self, world))]
    pub fn run(&mut self, world: &mut dyn World) -> Result<u64, SimError> {
        info!("▶️  开始运行仿真");
        debug!(now = ?self.now, queue_size = self.q.len(), "初始状态");

        let mut event_count = 0u64;
        while let Some(res) = self.step(world) {
            res?;
            event_count += 1;
        }

        info!(
            total_events = event_count,
            final_time = ?self.now,
            "✅ 仿真完成"
        );
        Ok(event_count)
    }
}
