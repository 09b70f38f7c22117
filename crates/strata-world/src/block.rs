use strata_blocks::{CONTENT_AIR, ContentRegistry, LightBank, Node};
use strata_geom::V3;

use crate::coords::{BLOCK_SIZE, BLOCK_VOLUME, BlockPos, local_index};
use crate::meta::{NodeMeta, NodeMetaList};

/// Persistence state of a block; ordered so that raising never lowers it.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum ModState {
    #[default]
    Clean,
    NeedsSave,
    NeedsSaveUrgent,
}

/// A 16³ cube of nodes plus its metadata table. A block without node data
/// is a dummy: it marks a position that was referenced before any data
/// existed for it.
#[derive(Clone, Debug)]
pub struct MapBlock {
    pos: BlockPos,
    nodes: Option<Box<[Node]>>,
    pub meta: NodeMetaList,
    mod_state: ModState,
    usage_timer: f32,
    lighting_expired: bool,
    is_underground: bool,
    generated: bool,
    day_night_differs: bool,
    timestamp: u32,
}

impl MapBlock {
    pub fn new_dummy(pos: BlockPos) -> Self {
        Self {
            pos,
            nodes: None,
            meta: NodeMetaList::new(),
            mod_state: ModState::Clean,
            usage_timer: 0.0,
            lighting_expired: true,
            is_underground: false,
            generated: false,
            day_night_differs: false,
            timestamp: 0,
        }
    }

    /// Allocated block with every node set to `fill`.
    pub fn new_filled(pos: BlockPos, fill: Node) -> Self {
        let mut b = Self::new_dummy(pos);
        b.nodes = Some(vec![fill; BLOCK_VOLUME].into_boxed_slice());
        b
    }

    /// Allocated block from a full node array; `None` if the length is wrong.
    pub fn from_nodes(pos: BlockPos, nodes: Vec<Node>) -> Option<Self> {
        if nodes.len() != BLOCK_VOLUME {
            return None;
        }
        let mut b = Self::new_dummy(pos);
        b.nodes = Some(nodes.into_boxed_slice());
        Some(b)
    }

    #[inline]
    pub fn pos(&self) -> BlockPos {
        self.pos
    }

    #[inline]
    pub fn is_dummy(&self) -> bool {
        self.nodes.is_none()
    }

    /// Turn a dummy into a real block filled with ignore.
    pub fn allocate(&mut self) {
        if self.nodes.is_none() {
            self.nodes = Some(vec![Node::IGNORE; BLOCK_VOLUME].into_boxed_slice());
        }
    }

    pub fn unallocate(&mut self) {
        self.nodes = None;
        self.meta.clear();
    }

    #[inline]
    pub fn nodes(&self) -> Option<&[Node]> {
        self.nodes.as_deref()
    }

    #[inline]
    fn in_range(rel: V3) -> bool {
        (0..BLOCK_SIZE).contains(&rel.x)
            && (0..BLOCK_SIZE).contains(&rel.y)
            && (0..BLOCK_SIZE).contains(&rel.z)
    }

    /// Node at an in-block offset; `None` for dummies or offsets outside the block.
    #[inline]
    pub fn node(&self, rel: V3) -> Option<Node> {
        if !Self::in_range(rel) {
            return None;
        }
        self.nodes.as_ref().map(|n| n[local_index(rel)])
    }

    /// Write a node and mark the block for saving. Fails on dummies and
    /// offsets outside the block.
    pub fn set_node(&mut self, rel: V3, n: Node) -> bool {
        if !Self::in_range(rel) {
            return false;
        }
        let Some(nodes) = self.nodes.as_mut() else {
            return false;
        };
        nodes[local_index(rel)] = n;
        self.raise_modified(ModState::NeedsSave);
        true
    }

    /// Bulk write of a whole-block node array. Used by bulk commits that
    /// track modification themselves.
    pub fn copy_nodes_from(&mut self, src: &[Node]) -> bool {
        let Some(nodes) = self.nodes.as_mut() else {
            return false;
        };
        if src.len() != nodes.len() {
            return false;
        }
        nodes.copy_from_slice(src);
        self.raise_modified(ModState::NeedsSave);
        true
    }

    pub fn fill(&mut self, n: Node) {
        if let Some(nodes) = self.nodes.as_mut() {
            nodes.fill(n);
            self.raise_modified(ModState::NeedsSave);
        }
    }

    pub fn node_meta(&self, rel: V3) -> Option<&NodeMeta> {
        Self::in_range(rel).then(|| self.meta.get(local_index(rel) as u16))?
    }

    pub fn node_meta_mut(&mut self, rel: V3) -> Option<&mut NodeMeta> {
        if !Self::in_range(rel) {
            return None;
        }
        self.meta.get_mut(local_index(rel) as u16)
    }

    pub fn set_node_meta(&mut self, rel: V3, meta: NodeMeta) -> bool {
        if !Self::in_range(rel) || self.is_dummy() {
            return false;
        }
        self.meta.set(local_index(rel) as u16, meta);
        self.raise_modified(ModState::NeedsSave);
        true
    }

    pub fn remove_node_meta(&mut self, rel: V3) -> Option<NodeMeta> {
        if !Self::in_range(rel) {
            return None;
        }
        let old = self.meta.remove(local_index(rel) as u16);
        if old.is_some() {
            self.raise_modified(ModState::NeedsSave);
        }
        old
    }

    #[inline]
    pub fn mod_state(&self) -> ModState {
        self.mod_state
    }

    #[inline]
    pub fn is_modified(&self) -> bool {
        self.mod_state != ModState::Clean
    }

    pub fn raise_modified(&mut self, state: ModState) {
        if state > self.mod_state {
            self.mod_state = state;
        }
    }

    /// Only called once the block is known to be persisted.
    pub fn reset_modified(&mut self) {
        self.mod_state = ModState::Clean;
    }

    #[inline]
    pub fn usage_timer(&self) -> f32 {
        self.usage_timer
    }

    pub fn increment_usage_timer(&mut self, dtime: f32) {
        self.usage_timer += dtime;
    }

    pub fn reset_usage_timer(&mut self) {
        self.usage_timer = 0.0;
    }

    pub fn lighting_expired(&self) -> bool {
        self.lighting_expired
    }

    pub fn set_lighting_expired(&mut self, expired: bool) {
        if self.lighting_expired != expired {
            self.lighting_expired = expired;
            self.raise_modified(ModState::NeedsSave);
        }
    }

    pub fn is_underground(&self) -> bool {
        self.is_underground
    }

    pub fn set_underground(&mut self, underground: bool) {
        if self.is_underground != underground {
            self.is_underground = underground;
            self.raise_modified(ModState::NeedsSave);
        }
    }

    pub fn is_generated(&self) -> bool {
        self.generated
    }

    pub fn set_generated(&mut self, generated: bool) {
        if self.generated != generated {
            self.generated = generated;
            self.raise_modified(ModState::NeedsSave);
        }
    }

    pub fn timestamp(&self) -> u32 {
        self.timestamp
    }

    pub fn set_timestamp(&mut self, ts: u32) {
        self.timestamp = ts;
    }

    #[inline]
    pub fn day_night_differs(&self) -> bool {
        self.day_night_differs
    }

    /// Restore flags read back from storage without marking the block.
    pub fn restore_flags(
        &mut self,
        is_underground: bool,
        day_night_differs: bool,
        lighting_expired: bool,
        generated: bool,
    ) {
        self.is_underground = is_underground;
        self.day_night_differs = day_night_differs;
        self.lighting_expired = lighting_expired;
        self.generated = generated;
    }

    /// Recompute whether day and night light differ anywhere. All-air
    /// blocks never differ.
    pub fn update_day_night_diff(&mut self, reg: &ContentRegistry) {
        let Some(nodes) = self.nodes.as_ref() else {
            self.day_night_differs = false;
            return;
        };
        let differs = nodes
            .iter()
            .any(|n| n.light(LightBank::Day, reg) != n.light(LightBank::Night, reg));
        self.day_night_differs = differs && nodes.iter().any(|n| n.content != CONTENT_AIR);
    }

    pub fn is_all_air(&self) -> bool {
        self.nodes
            .as_ref()
            .is_some_and(|n| n.iter().all(|n| n.content == CONTENT_AIR))
    }

    /// One-line human readable state summary.
    pub fn analyze(&self) -> String {
        let mut s = format!("block {}", self.pos);
        if self.is_dummy() {
            s.push_str(" dummy");
            return s;
        }
        s.push_str(match self.mod_state {
            ModState::Clean => " clean",
            ModState::NeedsSave => " needs-save",
            ModState::NeedsSaveUrgent => " needs-save-urgent",
        });
        if self.is_underground {
            s.push_str(" underground");
        }
        if self.day_night_differs {
            s.push_str(" day-night-differs");
        }
        if self.lighting_expired {
            s.push_str(" lighting-expired");
        }
        if !self.generated {
            s.push_str(" not-generated");
        }
        if self.is_all_air() {
            s.push_str(" all-air");
        }
        s.push_str(&format!(
            " meta={} usage={:.1}s ts={}",
            self.meta.len(),
            self.usage_timer,
            self.timestamp
        ));
        s
    }
}

impl PartialEq for MapBlock {
    /// Content equality: position, nodes, metadata and persisted flags.
    fn eq(&self, other: &Self) -> bool {
        self.pos == other.pos
            && self.nodes == other.nodes
            && self.meta == other.meta
            && self.is_underground == other.is_underground
            && self.day_night_differs == other.day_night_differs
            && self.lighting_expired == other.lighting_expired
            && self.generated == other.generated
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_blocks::LIGHT_SUN;

    #[test]
    fn dummy_blocks_reject_writes() {
        let mut b = MapBlock::new_dummy(BlockPos::new(0, 0, 0));
        assert!(b.is_dummy());
        assert_eq!(b.node(V3::ZERO), None);
        assert!(!b.set_node(V3::ZERO, Node::AIR));
        assert!(!b.is_modified());
        b.allocate();
        assert_eq!(b.node(V3::ZERO), Some(Node::IGNORE));
    }

    #[test]
    fn every_write_marks_the_block() {
        let mut b = MapBlock::new_filled(BlockPos::new(1, 2, 3), Node::AIR);
        assert!(!b.is_modified());
        assert!(b.set_node(V3::new(15, 15, 15), Node::new(0)));
        assert_eq!(b.mod_state(), ModState::NeedsSave);
        b.raise_modified(ModState::NeedsSaveUrgent);
        b.raise_modified(ModState::NeedsSave);
        assert_eq!(b.mod_state(), ModState::NeedsSaveUrgent);
        b.reset_modified();
        assert!(!b.set_node(V3::new(16, 0, 0), Node::AIR));
        assert!(!b.is_modified());
    }

    #[test]
    fn day_night_diff_ignores_pure_air() {
        let reg = ContentRegistry::builtin();
        let mut air = Node::AIR;
        air.set_light(LightBank::Day, LIGHT_SUN, &reg);
        let mut b = MapBlock::new_filled(BlockPos::default(), air);
        b.update_day_night_diff(&reg);
        assert!(!b.day_night_differs());
        b.set_node(V3::ZERO, Node::new(0));
        b.update_day_night_diff(&reg);
        assert!(b.day_night_differs());
    }
}
