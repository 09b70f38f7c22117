use strata_blocks::{CONTENT_AIR, LIGHT_SUN, LightBank, Node};
use strata_edit::{MapEditEvent, MapEditKind};
use strata_geom::{FACE_DIRS, V3};
use strata_lighting::{
    LightSources, brightest_neighbour, light_neighbors, propagate_sunlight, spread_light,
    unlight_neighbors, update_day_night_diff,
};
use strata_world::{BlockSet, NodeContainer, NodeMeta, WorldError, node_to_block};

use crate::server::ServerMap;

impl ServerMap {
    /// True unless the node above is loaded and not in full sunlight.
    fn under_sunlight(&self, p: V3) -> bool {
        let reg = self.map.registry();
        match self.map.node_at(p + V3::UP) {
            Some(top) => top.light(LightBank::Day, reg) == LIGHT_SUN,
            None => true,
        }
    }

    fn queue_if_flowable(&mut self, p: V3) {
        let Some(n) = self.map.node_at(p) else {
            return;
        };
        if n.content == CONTENT_AIR || self.map.registry().get(n.content).is_liquid() {
            self.liquids.push(p);
        }
    }

    /// Place `n` at `p` and repair lighting around it. Light the old node
    /// gave off is withdrawn from both banks, sunlight below an opaque node
    /// is cleared, and light is spread back in from every source that
    /// bordered the darkened region. Returns the blocks that changed.
    pub fn add_node_and_update(
        &mut self,
        p: V3,
        mut n: Node,
        owner: &str,
    ) -> Result<BlockSet, WorldError> {
        self.map.try_node(p)?;
        let reg = self.map.registry().clone();
        let features = reg.get(n.content);
        let mut modified = BlockSet::new();
        let mut light_sources = LightSources::new();
        let under_sun = self.under_sunlight(p);
        let old_blocked_sun = !reg.get(self.map.node(p).content).sunlight_propagates;

        for bank in LightBank::BOTH {
            let lightwas = self.map.node(p).light(bank, &reg);
            unlight_neighbors(
                &mut self.map,
                &reg,
                bank,
                p,
                lightwas,
                &mut light_sources,
                &mut modified,
            );
            n.set_light(bank, 0, &reg);
        }
        modified.insert(node_to_block(p));

        if under_sun && features.sunlight_propagates {
            n.set_light(LightBank::Day, LIGHT_SUN, &reg);
        }
        self.map.set_node(p, n)?;
        if features.light_source > 0 {
            light_sources.insert(p);
        }

        match features.initial_metadata {
            Some(kind) => self.map.set_node_meta(p, NodeMeta::create(kind, owner))?,
            None => {
                self.map.remove_node_meta(p);
            }
        }

        // an opaque node cuts the sunlight column below it
        if under_sun && !features.sunlight_propagates {
            let mut y = p.y - 1;
            loop {
                let n2pos = p.with_y(y);
                let Some(mut n2) = self.map.node_at(n2pos) else {
                    break;
                };
                if n2.light(LightBank::Day, &reg) != LIGHT_SUN {
                    break;
                }
                unlight_neighbors(
                    &mut self.map,
                    &reg,
                    LightBank::Day,
                    n2pos,
                    LIGHT_SUN,
                    &mut light_sources,
                    &mut modified,
                );
                n2.set_light(LightBank::Day, 0, &reg);
                if self.map.put_node(n2pos, n2) {
                    modified.insert(node_to_block(n2pos));
                }
                y -= 1;
            }
        }

        for bank in LightBank::BOTH {
            spread_light(&mut self.map, &reg, bank, light_sources.clone(), &mut modified);
        }

        // the column below was shaded by the old node
        if under_sun && features.sunlight_propagates && old_blocked_sun {
            let ybottom = propagate_sunlight(&mut self.map, &reg, p, &mut modified);
            for y in (ybottom..=p.y).rev() {
                light_neighbors(&mut self.map, &reg, LightBank::Day, p.with_y(y), &mut modified);
            }
        }

        update_day_night_diff(&mut self.map, &modified);

        self.queue_if_flowable(p);
        for d in FACE_DIRS {
            self.queue_if_flowable(p + d);
        }

        log::trace!(
            target: "map",
            "added {} at {p:?}, {} blocks modified",
            features.name,
            modified.len()
        );
        Ok(modified)
    }

    /// Replace the node at `p` with air and repair lighting: withdraw what
    /// it emitted, let sunlight fall through if it is exposed, and pull in
    /// light from the brightest neighbour.
    pub fn remove_node_and_update(&mut self, p: V3) -> Result<BlockSet, WorldError> {
        self.map.try_node(p)?;
        let reg = self.map.registry().clone();
        let mut modified = BlockSet::new();
        let mut light_sources = LightSources::new();
        let under_sun = self.under_sunlight(p);

        for bank in LightBank::BOTH {
            let lightwas = self.map.node(p).light(bank, &reg);
            unlight_neighbors(
                &mut self.map,
                &reg,
                bank,
                p,
                lightwas,
                &mut light_sources,
                &mut modified,
            );
        }

        self.map.remove_node_meta(p);
        self.map.set_node(p, Node::AIR)?;

        for bank in LightBank::BOTH {
            spread_light(&mut self.map, &reg, bank, light_sources.clone(), &mut modified);
        }
        modified.insert(node_to_block(p));

        if under_sun {
            let ybottom = propagate_sunlight(&mut self.map, &reg, p, &mut modified);
            for y in (ybottom..=p.y).rev() {
                light_neighbors(&mut self.map, &reg, LightBank::Day, p.with_y(y), &mut modified);
            }
        } else {
            let mut n = self.map.node(p);
            n.set_light(LightBank::Day, 0, &reg);
            self.map.put_node(p, n);
        }

        for bank in LightBank::BOTH {
            if let Some(from) = brightest_neighbour(&self.map, &reg, bank, p) {
                light_neighbors(&mut self.map, &reg, bank, from, &mut modified);
            }
        }

        update_day_night_diff(&mut self.map, &modified);

        for d in FACE_DIRS {
            self.queue_if_flowable(p + d);
        }
        self.queue_if_flowable(p);

        log::trace!(target: "map", "removed node at {p:?}, {} blocks modified", modified.len());
        Ok(modified)
    }

    /// [`ServerMap::add_node_and_update`] followed by an `AddNode` event.
    /// The event goes out even when the edit fails, with no modified blocks.
    pub fn add_node_with_event(&mut self, p: V3, n: Node, owner: &str) -> bool {
        let mut event = MapEditEvent::new(MapEditKind::AddNode, p, n);
        let succeeded = match self.add_node_and_update(p, n, owner) {
            Ok(modified) => {
                event.modified_blocks = modified;
                true
            }
            Err(e) => {
                log::debug!(target: "map", "add node at {p:?} failed: {e}");
                false
            }
        };
        self.events.dispatch(event);
        succeeded
    }

    pub fn remove_node_with_event(&mut self, p: V3) -> bool {
        let mut event = MapEditEvent::new(MapEditKind::RemoveNode, p, Node::AIR);
        let succeeded = match self.remove_node_and_update(p) {
            Ok(modified) => {
                event.modified_blocks = modified;
                true
            }
            Err(e) => {
                log::debug!(target: "map", "remove node at {p:?} failed: {e}");
                false
            }
        };
        self.events.dispatch(event);
        succeeded
    }
}
