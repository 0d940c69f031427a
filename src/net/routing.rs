//! 交换机间路由
//!
//! 控制器在收到 SYN 时为流选一条最短交换机路径，再把路径拆成逐跳流表项下发。
//! 路由表对每个目的交换机在反向图上做一次 BFS，记下每个 (from, dst) 的全部
//! 等价下一跳；选路时以流 id 做稳定哈希，同一条流总是走同一条路径。

use std::collections::{HashMap, VecDeque};

use super::id::NodeId;

#[derive(Debug, Default, Clone)]
pub struct RoutingTable {
    dirty: bool,
    /// (from, dst) -> 等价最短路径上的下一跳
    next_hops: HashMap<(NodeId, NodeId), Vec<NodeId>>,
    salt: u64,
}

impl RoutingTable {
    pub fn new(salt: u64) -> Self {
        Self {
            dirty: true,
            next_hops: HashMap::new(),
            salt,
        }
    }

    /// 拓扑变化后调用，下次查询前重建
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// 按邻接表重建；`adj[v]` 为交换机 v 的出边邻居。未标脏时什么也不做。
    pub fn ensure_built(&mut self, adj: &[Vec<NodeId>]) {
        if !self.dirty {
            return;
        }
        let n = adj.len();
        let mut preds: Vec<Vec<NodeId>> = vec![Vec::new(); n];
        for (from, nbrs) in adj.iter().enumerate() {
            for &to in nbrs {
                if let Some(p) = preds.get_mut(to.0) {
                    p.push(NodeId(from));
                }
            }
        }

        self.next_hops.clear();
        let mut hops: Vec<Option<usize>> = vec![None; n];
        let mut frontier = VecDeque::new();
        for dst in (0..n).map(NodeId) {
            hops.fill(None);
            hops[dst.0] = Some(0);
            frontier.clear();
            frontier.push_back(dst);
            while let Some(v) = frontier.pop_front() {
                let next = hops[v.0].map_or(0, |h| h + 1);
                for &p in &preds[v.0] {
                    if hops[p.0].is_none() {
                        hops[p.0] = Some(next);
                        frontier.push_back(p);
                    }
                }
            }

            for (from, nbrs) in adj.iter().enumerate() {
                if from == dst.0 {
                    continue;
                }
                let Some(h) = hops[from] else {
                    continue;
                };
                let cands: Vec<NodeId> = nbrs
                    .iter()
                    .copied()
                    .filter(|nb| hops.get(nb.0).copied().flatten() == Some(h - 1))
                    .collect();
                if !cands.is_empty() {
                    self.next_hops.insert((NodeId(from), dst), cands);
                }
            }
        }
        self.dirty = false;
    }

    pub fn next_hops(&self, from: NodeId, dst: NodeId) -> Option<&[NodeId]> {
        self.next_hops.get(&(from, dst)).map(Vec::as_slice)
    }

    /// 从 `from` 到 `dst` 的交换机路径（含两端）；不可达返回 None
    pub fn path(&self, from: NodeId, dst: NodeId, key: u64) -> Option<Vec<NodeId>> {
        let mut path = vec![from];
        let mut cur = from;
        while cur != dst {
            cur = self.pick_ecmp(cur, dst, key, self.next_hops(cur, dst)?);
            path.push(cur);
        }
        Some(path)
    }

    /// 在等价下一跳中按 `key`（流 id）稳定选择一个
    pub fn pick_ecmp(&self, from: NodeId, dst: NodeId, key: u64, cands: &[NodeId]) -> NodeId {
        debug_assert!(!cands.is_empty());
        let h = mix64(
            key ^ (from.0 as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15)
                ^ (dst.0 as u64).rotate_left(32)
                ^ self.salt,
        );
        cands[(h % cands.len() as u64) as usize]
    }
}

// splitmix64
fn mix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
    x = (x ^ (x >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    x = (x ^ (x >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    x ^ (x >> 31)
}
