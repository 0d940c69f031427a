//! 接收端
//!
//! 对每个 DATA 回 ACK；发现序号空洞时先为每个尚未 NACK 过的缺失序号回 NACK。

use std::collections::BTreeSet;

use tracing::{debug, trace};

use super::agent::TransportAgent;
use super::flow::FlowSpec;
use super::timer::TimerId;
use crate::net::{FlowId, NodeId, Segment, SegmentKind};
use crate::sim::{DiagnosticLog, SimConfig, SimError, Simulator};

#[derive(Debug)]
pub struct Receiver {
    host: NodeId,
    peer: NodeId,
    flow: FlowId,
    ack_bytes: u32,
    /// 下一个按序期望的 DATA 序号
    expected: u64,
    /// 已收到、但高于 `expected` 的序号
    out_of_order: BTreeSet<u64>,
    nacked: BTreeSet<u64>,
    outbox: Vec<Segment>,
}

impl Receiver {
    pub fn new(spec: &FlowSpec, cfg: &SimConfig) -> Self {
        Self {
            host: spec.dst,
            peer: spec.src,
            flow: spec.id,
            ack_bytes: cfg.ack_segment_bytes,
            expected: 1,
            out_of_order: BTreeSet::new(),
            nacked: BTreeSet::new(),
            outbox: Vec::new(),
        }
    }

    /// 按序收到的最大序号
    pub fn cumulative_ack(&self) -> u64 {
        self.expected - 1
    }

    pub fn has_received(&self, seq: u64) -> bool {
        seq < self.expected || self.out_of_order.contains(&seq)
    }

    fn reply(&mut self, kind: SegmentKind, seq: u64) {
        self.outbox.push(Segment::new(
            self.flow.ack_stream(),
            kind,
            seq,
            self.ack_bytes,
            self.host,
            self.peer,
        ));
    }

    fn on_data(&mut self, seq: u64) {
        if seq > self.expected {
            for missing in self.expected..seq {
                if !self.out_of_order.contains(&missing) && self.nacked.insert(missing) {
                    debug!(flow = self.flow.0, seq = missing, "❗ NACK");
                    self.reply(SegmentKind::Nack, missing);
                }
            }
        }
        if seq >= self.expected {
            self.out_of_order.insert(seq);
            while self.out_of_order.remove(&self.expected) {
                self.nacked.remove(&self.expected);
                self.expected += 1;
            }
        } else {
            trace!(flow = self.flow.0, seq, "重复的 DATA");
        }
        self.nacked.remove(&seq);
        self.reply(SegmentKind::Ack, seq);
    }
}

impl TransportAgent for Receiver {
    fn flow_id(&self) -> FlowId {
        self.flow
    }

    fn start(&mut self, _sim: &mut Simulator) -> Result<(), SimError> {
        Ok(())
    }

    fn recv_segment(
        &mut self,
        seg: Segment,
        _sim: &mut Simulator,
        _diag: &mut DiagnosticLog,
    ) -> Result<(), SimError> {
        match seg.kind {
            SegmentKind::Syn => self.reply(SegmentKind::SynAck, 0),
            SegmentKind::Data => self.on_data(seg.seq),
            SegmentKind::Fin => self.reply(SegmentKind::FinAck, seg.seq),
            SegmentKind::Ctrl => trace!("接收端忽略 CTRL"),
            kind => {
                return Err(SimError::UnexpectedSegment {
                    component: "Receiver",
                    node: self.host,
                    flow: seg.flow_id,
                    kind,
                });
            }
        }
        Ok(())
    }

    fn timeout(
        &mut self,
        timer: TimerId,
        _sim: &mut Simulator,
        _diag: &mut DiagnosticLog,
    ) -> Result<(), SimError> {
        trace!(?timer, "接收端没有定时器");
        Ok(())
    }

    fn take_outbox(&mut self) -> Vec<Segment> {
        std::mem::take(&mut self.outbox)
    }
}
