use std::collections::HashMap;

use strata_blocks::Node;
use strata_edit::{MapEditEvent, MapEditKind};
use strata_geom::V3;
use strata_world::{BlockSet, ModState, NodeMeta, WorldError, node_to_block};

use crate::server::ServerMap;

impl ServerMap {
    fn metadata_changed(&mut self, p: V3) {
        let mut event = MapEditEvent::new(MapEditKind::MetadataChanged, p, self.map.node(p));
        event.modified_blocks.insert(node_to_block(p));
        self.events.dispatch(event);
    }

    pub fn node_metadata(&self, p: V3) -> Option<&NodeMeta> {
        self.map.node_meta(p)
    }

    pub fn set_node_metadata(&mut self, p: V3, meta: NodeMeta) -> Result<(), WorldError> {
        self.map.set_node_meta(p, meta)?;
        self.metadata_changed(p);
        Ok(())
    }

    pub fn remove_node_metadata(&mut self, p: V3) -> Option<NodeMeta> {
        let old = self.map.remove_node_meta(p)?;
        self.metadata_changed(p);
        Some(old)
    }

    /// Hand externally submitted fields to the record at `p`. Returns
    /// whether the record changed; a node without metadata ignores them.
    pub fn receive_fields(
        &mut self,
        p: V3,
        fields: &HashMap<String, String>,
    ) -> Result<bool, WorldError> {
        self.map.try_node(p)?;
        let Some(meta) = self.map.node_meta_mut(p) else {
            return Ok(false);
        };
        if !meta.receive_fields(fields) {
            return Ok(false);
        }
        if let Some(block) = self.map.block_mut(node_to_block(p)) {
            block.raise_modified(ModState::NeedsSave);
        }
        self.metadata_changed(p);
        Ok(true)
    }

    /// Feed `level` from the node at `source` into the circuit record at
    /// `p`. Returns whether its energy changed.
    pub fn energise(&mut self, p: V3, level: u8, source: V3) -> Result<bool, WorldError> {
        self.map.try_node(p)?;
        let Some(circuit) = self.map.node_meta_mut(p).and_then(NodeMeta::as_circuit_mut) else {
            return Ok(false);
        };
        if !circuit.energise(level, source - p) {
            return Ok(false);
        }
        if let Some(block) = self.map.block_mut(node_to_block(p)) {
            block.raise_modified(ModState::NeedsSave);
        }
        self.metadata_changed(p);
        Ok(true)
    }

    /// Advance every metadata record in memory by `dtime`. Blocks with a
    /// changed record are marked for saving, announced, and returned.
    pub fn node_metadata_step(&mut self, dtime: f32) -> BlockSet {
        let mut changed = BlockSet::new();
        for block in self.map.blocks_mut() {
            if block.meta.is_empty() {
                continue;
            }
            if block.meta.step(dtime) {
                block.raise_modified(ModState::NeedsSave);
                changed.insert(block.pos());
            }
        }
        for &bp in &changed {
            let mut event = MapEditEvent::new(MapEditKind::MetadataChanged, bp.origin(), Node::IGNORE);
            event.modified_blocks.insert(bp);
            self.events.dispatch(event);
        }
        changed
    }
}
