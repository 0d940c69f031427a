//! 准入缓冲区
//!
//! 按段计数的缓冲区：容量满时新到达的段被丢弃（DropTail 语义），
//! 否则返回该段在开始串行化之前需要等待的时间。

use std::collections::BTreeMap;

use super::token::{BufferToken, TokenGate};
use crate::net::{NodeId, Packet, SegmentKind};
use crate::sim::SimTime;

/// 入队失败：缓冲区已满
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dropped {
    pub occupancy: usize,
    pub capacity: usize,
}

#[derive(Debug)]
pub struct Buffer {
    capacity: usize,
    occupancy: usize,
    busy_until: SimTime,
    /// 主机 -> 令牌（只约束该主机发出的 DATA 段）
    gates: BTreeMap<NodeId, TokenGate>,
    drops: u64,
}

impl Buffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            occupancy: 0,
            busy_until: SimTime::ZERO,
            gates: BTreeMap::new(),
            drops: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn occupancy(&self) -> usize {
        self.occupancy
    }

    pub fn is_full(&self) -> bool {
        self.occupancy >= self.capacity
    }

    pub fn drops(&self) -> u64 {
        self.drops
    }

    /// 链路空闲的最早时刻
    pub fn busy_until(&self) -> SimTime {
        self.busy_until
    }

    /// 入队：成功返回等待时间（相对 `now`）；缓冲区满返回 `Err(Dropped)`。
    pub fn enqueue(
        &mut self,
        now: SimTime,
        pkt: &Packet,
        tx_delay: SimTime,
    ) -> Result<SimTime, Dropped> {
        if self.is_full() {
            self.drops = self.drops.saturating_add(1);
            return Err(Dropped {
                occupancy: self.occupancy,
                capacity: self.capacity,
            });
        }
        let mut start = now.max(self.busy_until);
        if let Packet::Segment(seg) = pkt {
            if seg.kind == SegmentKind::Data {
                if let Some(gate) = self.gates.get_mut(&seg.src) {
                    start = gate.admit(start);
                }
            }
        }
        self.busy_until = start.after(tx_delay);
        self.occupancy += 1;
        Ok(start.saturating_sub(now))
    }

    /// 出队：缓冲区为空时返回 false
    pub fn dequeue(&mut self) -> bool {
        if self.occupancy == 0 {
            return false;
        }
        self.occupancy -= 1;
        true
    }

    /// 安装/替换/移除某个主机的令牌调度
    pub fn update_token_list(&mut self, now: SimTime, host: NodeId, token: Option<BufferToken>) {
        match token {
            Some(token) if token.gates() => {
                self.gates.insert(host, TokenGate::new(now, token));
            }
            _ => {
                self.gates.remove(&host);
            }
        }
    }

    pub fn token_of(&self, host: NodeId) -> Option<&BufferToken> {
        self.gates.get(&host).map(TokenGate::token)
    }
}
