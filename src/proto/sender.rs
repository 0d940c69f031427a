//! 发送端
//!
//! 按控制器下发的节奏发送：每个周期开始后（可选的初始等待之后）进入一系列
//! 发送间隔，每个间隔至多发送 `window` 个 DATA 段，段与段之间相隔
//! `inter_segment_delay`。NACK 的序号在下一个间隔优先重传。

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use tracing::{debug, info, trace};

use super::agent::{Timeout, TransportAgent};
use super::flow::{FlowRecord, FlowSpec};
use super::timer::{TimerId, TimerKind, TimerTable};
use crate::net::{CongestionFields, FlowId, NodeId, Segment, SegmentKind};
use crate::sim::{DiagnosticLog, SimConfig, SimError, SimTime, Simulator};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SenderState {
    Init,
    AwaitingSynAck,
    CycleWait,
    InitialDelay,
    SendingInterval,
    Done,
}

/// 一个周期的发送参数（来自 CTRL 段）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CycleParams {
    pub window: u64,
    pub inter_segment_delay: SimTime,
    pub interval: SimTime,
    pub initial_delay: SimTime,
}

impl From<CongestionFields> for CycleParams {
    fn from(cc: CongestionFields) -> Self {
        Self {
            window: cc.window,
            inter_segment_delay: cc.inter_segment_delay,
            interval: cc.interval,
            initial_delay: cc.initial_delay,
        }
    }
}

#[derive(Debug)]
pub struct Sender {
    host: NodeId,
    peer: NodeId,
    data_bytes: u32,
    ctl_bytes: u32,
    record: FlowRecord,
    state: SenderState,
    timers: TimerTable,
    /// 最近一个 CTRL 的参数，在对应的 TimeToCycle 触发时生效
    pending_cycle: Option<(TimerId, CycleParams)>,
    params: CycleParams,
    has_recvd_syn_ack: bool,
    has_sent_fin: bool,
    /// 尚未发送过的新段数
    remaining: u64,
    highest_new_sent: u64,
    last_sent_seq: u64,
    nacks: BTreeSet<u64>,
    /// 本间隔待发送的序号 -> 是否为重传
    to_send: BTreeMap<u64, bool>,
    sent_in_interval: u64,
    outbox: Vec<Segment>,
}

impl Sender {
    pub fn new(spec: &FlowSpec, cfg: &SimConfig) -> Self {
        Self {
            host: spec.src,
            peer: spec.dst,
            data_bytes: cfg.data_segment_bytes,
            ctl_bytes: cfg.ack_segment_bytes,
            record: FlowRecord::new(spec),
            state: SenderState::Init,
            timers: TimerTable::default(),
            pending_cycle: None,
            params: CycleParams::default(),
            has_recvd_syn_ack: false,
            has_sent_fin: false,
            remaining: spec.size_segments,
            highest_new_sent: 0,
            last_sent_seq: 0,
            nacks: BTreeSet::new(),
            to_send: BTreeMap::new(),
            sent_in_interval: 0,
            outbox: Vec::new(),
        }
    }

    pub fn state(&self) -> SenderState {
        self.state
    }

    pub fn record(&self) -> &FlowRecord {
        &self.record
    }

    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    pub fn params(&self) -> CycleParams {
        self.params
    }

    pub fn pending_retransmissions(&self) -> usize {
        self.nacks.len()
    }

    /// 当前间隔已发送的段数（不超过 window）
    pub fn sent_in_interval(&self) -> u64 {
        self.sent_in_interval
    }

    pub fn timers(&self) -> &TimerTable {
        &self.timers
    }

    fn flow(&self) -> FlowId {
        self.record.id
    }

    fn segment(&self, kind: SegmentKind, seq: u64, size_bytes: u32) -> Segment {
        Segment::new(self.flow(), kind, seq, size_bytes, self.host, self.peer)
    }

    fn arm(
        &mut self,
        kind: TimerKind,
        delay: SimTime,
        sim: &mut Simulator,
    ) -> Result<TimerId, SimError> {
        let id = self.timers.arm(kind, sim.now().after(delay));
        sim.schedule_in(
            delay,
            Timeout {
                host: self.host,
                timer: id,
            },
        )?;
        Ok(id)
    }

    /// 把排队未发的序号放回：重传回到 NACK 集合，新段直接丢弃（下次重新编号）
    fn requeue_unsent(&mut self) {
        for (seq, retransmit) in std::mem::take(&mut self.to_send) {
            if retransmit {
                self.nacks.insert(seq);
            }
        }
    }

    fn gen_data(&mut self, seq: u64, retransmit: bool) -> Result<Segment, SimError> {
        if retransmit {
            self.record.retransmissions = self.record.retransmissions.saturating_add(1);
        } else {
            if self.remaining == 0 {
                return Err(SimError::SegmentBudgetExhausted { flow: self.flow() });
            }
            self.remaining -= 1;
            self.highest_new_sent = seq;
        }
        self.last_sent_seq = seq;
        Ok(self.segment(SegmentKind::Data, seq, self.data_bytes))
    }

    fn start_sending_cycle(&mut self, sim: &mut Simulator) -> Result<(), SimError> {
        if self.params.interval.is_zero() {
            return Err(SimError::InvalidCycle {
                flow: self.flow(),
                reason: "interval must be positive",
            });
        }
        debug!(flow = self.flow().0, params = ?self.params, "🔁 新周期");
        if self.params.initial_delay.is_zero() {
            self.start_sending_interval(sim)
        } else {
            self.state = SenderState::InitialDelay;
            self.arm(TimerKind::InitialDelay, self.params.initial_delay, sim)?;
            Ok(())
        }
    }

    fn start_sending_interval(&mut self, sim: &mut Simulator) -> Result<(), SimError> {
        if self.has_sent_fin {
            return Ok(());
        }
        if self.record.data_start_time.is_none() {
            self.record.data_start_time = Some(sim.now());
        }
        self.requeue_unsent();
        self.timers.cancel(TimerKind::InterSegmentDelay);
        self.state = SenderState::SendingInterval;
        self.sent_in_interval = 0;

        let mut slots = self.params.window;
        while slots > 0 {
            let Some(seq) = self.nacks.pop_first() else {
                break;
            };
            self.to_send.insert(seq, true);
            slots -= 1;
        }
        let fresh = slots.min(self.remaining);
        for i in 1..=fresh {
            self.to_send.insert(self.highest_new_sent + i, false);
        }
        trace!(flow = self.flow().0, queued = self.to_send.len(), "发送间隔开始");

        self.send_single_segment(sim)?;
        self.arm(TimerKind::Interval, self.params.interval, sim)?;
        Ok(())
    }

    fn send_single_segment(&mut self, sim: &mut Simulator) -> Result<(), SimError> {
        let Some((seq, retransmit)) = self.to_send.pop_first() else {
            return Ok(());
        };
        let seg = self.gen_data(seq, retransmit)?;
        trace!(flow = self.flow().0, seq, retransmit, "📦 DATA");
        self.outbox.push(seg);
        self.sent_in_interval += 1;
        if !self.to_send.is_empty() {
            self.arm(
                TimerKind::InterSegmentDelay,
                self.params.inter_segment_delay,
                sim,
            )?;
        }
        Ok(())
    }

    fn on_ctrl(&mut self, seg: &Segment, sim: &mut Simulator) -> Result<(), SimError> {
        self.timers.cancel(TimerKind::TimeToCycle);
        self.pending_cycle = None;
        if self.has_sent_fin {
            return Ok(());
        }
        let cc = seg.cc.ok_or(SimError::UnexpectedSegment {
            component: "Sender",
            node: self.host,
            flow: seg.flow_id,
            kind: seg.kind,
        })?;
        let id = self.arm(TimerKind::TimeToCycle, cc.time_to_next_cycle, sim)?;
        self.pending_cycle = Some((id, CycleParams::from(cc)));
        trace!(flow = self.flow().0, ?cc, "CTRL 已暂存");
        Ok(())
    }

    fn on_ack(&mut self, seq: u64, sim: &mut Simulator) -> Result<(), SimError> {
        let now = sim.now();
        self.record.ack_arrival_times.insert(seq, now);
        let finished = self.remaining == 0
            && self.nacks.is_empty()
            && self.to_send.is_empty()
            && seq == self.last_sent_seq;
        if !finished || self.has_sent_fin {
            return Ok(());
        }
        let fin_seq = self.record.size_segments + 1;
        self.last_sent_seq = fin_seq;
        self.outbox
            .push(self.segment(SegmentKind::UncontrolledFin, fin_seq, self.ctl_bytes));
        self.has_sent_fin = true;
        self.timers.cancel_all();
        self.pending_cycle = None;
        self.state = SenderState::Done;
        self.record.completion_time = Some(now);
        self.record.fin_sent_time = Some(now);
        info!(
            flow = self.flow().0,
            fct = ?self.record.completion_duration(),
            retransmissions = self.record.retransmissions,
            "🏁 流完成"
        );
        Ok(())
    }
}

impl TransportAgent for Sender {
    fn flow_id(&self) -> FlowId {
        self.flow()
    }

    fn start(&mut self, sim: &mut Simulator) -> Result<(), SimError> {
        if self.state != SenderState::Init {
            return Ok(());
        }
        self.record.start_time = Some(sim.now());
        self.state = SenderState::AwaitingSynAck;
        self.outbox
            .push(self.segment(SegmentKind::Syn, 0, self.ctl_bytes));
        Ok(())
    }

    fn recv_segment(
        &mut self,
        seg: Segment,
        sim: &mut Simulator,
        _diag: &mut DiagnosticLog,
    ) -> Result<(), SimError> {
        let now = sim.now();
        match seg.kind {
            SegmentKind::SynAck => {
                self.record.ack_arrival_times.insert(0, now);
                if self.record.syn_ack_time.is_none() {
                    self.record.syn_ack_time = Some(now);
                }
                self.has_recvd_syn_ack = true;
                if self.state == SenderState::AwaitingSynAck {
                    self.state = SenderState::CycleWait;
                }
                Ok(())
            }
            SegmentKind::Ctrl => self.on_ctrl(&seg, sim),
            SegmentKind::Ack => self.on_ack(seg.seq, sim),
            SegmentKind::Nack => {
                trace!(flow = self.flow().0, seq = seg.seq, "NACK");
                if self.has_sent_fin {
                    return Ok(());
                }
                self.nacks.insert(seg.seq);
                Ok(())
            }
            SegmentKind::FinAck => {
                self.record.fin_ack_time = Some(now);
                Ok(())
            }
            kind => Err(SimError::UnexpectedSegment {
                component: "Sender",
                node: self.host,
                flow: seg.flow_id,
                kind,
            }),
        }
    }

    fn timeout(
        &mut self,
        timer: TimerId,
        sim: &mut Simulator,
        diag: &mut DiagnosticLog,
    ) -> Result<(), SimError> {
        if !self.timers.fire(timer) {
            trace!(?timer, "定时器已取消");
            return Ok(());
        }
        match timer.kind {
            TimerKind::TimeToCycle => {
                self.requeue_unsent();
                self.timers.cancel_all();
                let params = match self.pending_cycle.take() {
                    Some((id, params)) if id == timer => params,
                    _ => {
                        return Err(SimError::InvalidCycle {
                            flow: self.flow(),
                            reason: "cycle timer fired without stashed parameters",
                        });
                    }
                };
                self.params = params;
                if !self.has_recvd_syn_ack {
                    diag.warning(
                        sim.now(),
                        "Sender",
                        "time_to_cycle",
                        format!(
                            "flow {}: cycle starts before SYNACK arrival, skipped",
                            self.flow().0
                        ),
                    );
                    return Ok(());
                }
                self.start_sending_cycle(sim)
            }
            TimerKind::InitialDelay | TimerKind::Interval => self.start_sending_interval(sim),
            TimerKind::InterSegmentDelay => self.send_single_segment(sim),
        }
    }

    fn take_outbox(&mut self) -> Vec<Segment> {
        std::mem::take(&mut self.outbox)
    }

    fn flow_record(&self) -> Option<&FlowRecord> {
        Some(&self.record)
    }

    fn on_data_departure(&mut self, seq: u64, at: SimTime) {
        self.record.data_send_times.insert(seq, at);
    }
}
