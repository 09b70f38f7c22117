//! Map edit events and per-block change tracking.
#![forbid(unsafe_code)]

use crossbeam_channel::{Receiver, Sender, unbounded};
use hashbrown::HashMap;
use strata_blocks::Node;
use strata_geom::V3;
use strata_world::{BLOCK_SIZE, BlockPos, BlockSet, node_offset_in_block, node_to_block};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MapEditKind {
    AddNode,
    RemoveNode,
    MetadataChanged,
    Other,
}

/// A completed edit: the node written at `p` and every block whose contents
/// changed as a consequence, lighting ripple included.
#[derive(Clone, Debug, PartialEq)]
pub struct MapEditEvent {
    pub kind: MapEditKind,
    pub p: V3,
    pub n: Node,
    pub modified_blocks: BlockSet,
}

impl MapEditEvent {
    pub fn new(kind: MapEditKind, p: V3, n: Node) -> Self {
        Self {
            kind,
            p,
            n,
            modified_blocks: BlockSet::new(),
        }
    }
}

#[derive(Default, Debug, Clone, Copy)]
pub struct EditHubStats {
    pub subscribers: usize,
    pub dispatched: u64,
    pub rev_entries: usize,
    pub built_entries: usize,
}

/// Fans edit events out to subscribers and keeps a revision stamp per block
/// so consumers holding derived data (meshes, replicas) can tell when they
/// are stale.
#[derive(Default)]
pub struct EditHub {
    subscribers: Vec<Sender<MapEditEvent>>,
    // latest edit stamp touching the block
    rev: HashMap<BlockPos, u64>,
    // last stamp a consumer reported as built
    built: HashMap<BlockPos, u64>,
    counter: u64,
    dispatched: u64,
}

impl EditHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self) -> Receiver<MapEditEvent> {
        let (tx, rx) = unbounded();
        self.subscribers.push(tx);
        rx
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Stamp every block the event touches and deliver it. Subscribers whose
    /// receiver was dropped are forgotten. Returns the stamp.
    pub fn dispatch(&mut self, event: MapEditEvent) -> u64 {
        self.counter = self.counter.wrapping_add(1).max(1);
        let stamp = self.counter;
        for bp in affected_blocks(event.p)
            .into_iter()
            .chain(event.modified_blocks.iter().copied())
        {
            self.rev.insert(bp, stamp);
        }
        self.dispatched += 1;

        let before = self.subscribers.len();
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
        let gone = before - self.subscribers.len();
        if gone > 0 {
            log::debug!(target: "events", "dropped {gone} closed subscribers");
        }
        log::trace!(
            target: "events",
            "{:?} at {:?} stamp {stamp}, {} blocks",
            event.kind,
            event.p,
            event.modified_blocks.len()
        );
        stamp
    }

    pub fn rev(&self, bp: BlockPos) -> u64 {
        self.rev.get(&bp).copied().unwrap_or(0)
    }

    pub fn built_rev(&self, bp: BlockPos) -> u64 {
        self.built.get(&bp).copied().unwrap_or(0)
    }

    pub fn mark_built(&mut self, bp: BlockPos, rev: u64) {
        let e = self.built.entry(bp).or_insert(0);
        if rev > *e {
            *e = rev;
        }
    }

    pub fn needs_rebuild(&self, bp: BlockPos) -> bool {
        self.rev(bp) > self.built_rev(bp)
    }

    /// Drop tracking for a block that left memory.
    pub fn forget(&mut self, bp: BlockPos) {
        self.rev.remove(&bp);
        self.built.remove(&bp);
    }

    pub fn stats(&self) -> EditHubStats {
        EditHubStats {
            subscribers: self.subscribers.len(),
            dispatched: self.dispatched,
            rev_entries: self.rev.len(),
            built_entries: self.built.len(),
        }
    }
}

/// The block holding `p` plus the neighbours sharing the face, edge or
/// corner `p` lies on.
pub fn affected_blocks(p: V3) -> Vec<BlockPos> {
    let bp = node_to_block(p);
    let rel = node_offset_in_block(p);
    let offsets = |l: i32| -> Vec<i32> {
        let mut v = vec![0];
        if l == 0 {
            v.push(-1);
        }
        if l == BLOCK_SIZE - 1 {
            v.push(1);
        }
        v
    };
    let (ox, oy, oz) = (offsets(rel.x), offsets(rel.y), offsets(rel.z));
    let mut out = Vec::with_capacity(ox.len() * oy.len() * oz.len());
    out.push(bp);
    for &dx in &ox {
        for &dy in &oy {
            for &dz in &oz {
                if dx == 0 && dy == 0 && dz == 0 {
                    continue;
                }
                out.push(bp.offset(dx, dy, dz));
            }
        }
    }
    out
}
