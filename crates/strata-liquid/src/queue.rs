use hashbrown::{HashMap, HashSet};
use std::collections::VecDeque;
use strata_geom::V3;

/// FIFO of positions waiting for a liquid update. A position is held at
/// most once; pushing it again while queued is a no-op.
#[derive(Default, Debug)]
pub struct LiquidQueue {
    order: VecDeque<V3>,
    queued: HashSet<V3>,
    // consecutive partial steps per position
    reflows: HashMap<V3, u32>,
}

impl LiquidQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, p: V3) -> bool {
        if !self.queued.insert(p) {
            return false;
        }
        self.order.push_back(p);
        true
    }

    pub fn pop(&mut self) -> Option<V3> {
        let p = self.order.pop_front()?;
        self.queued.remove(&p);
        Some(p)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains(&self, p: V3) -> bool {
        self.queued.contains(&p)
    }

    pub fn clear(&mut self) {
        self.order.clear();
        self.queued.clear();
        self.reflows.clear();
    }

    /// Count another partial step at `p`; returns the new total.
    pub(crate) fn note_reflow(&mut self, p: V3) -> u32 {
        let n = self.reflows.entry(p).or_insert(0);
        *n += 1;
        *n
    }

    pub(crate) fn settled(&mut self, p: V3) {
        self.reflows.remove(&p);
    }

    pub fn reflow_count(&self, p: V3) -> u32 {
        self.reflows.get(&p).copied().unwrap_or(0)
    }
}
