use std::sync::Arc;

use crossbeam_channel::Receiver;
use strata_blocks::{ContentRegistry, Node};
use strata_chunk::{BlockMakeData, Generator, VoxelManip};
use strata_edit::{EditHub, MapEditEvent, MapEditKind};
use strata_geom::V3;
use strata_io::{BlockStore, FORMAT_VERSION, LoadOutcome, StoreError};
use strata_liquid::{LiquidQueue, LiquidTick};
use strata_world::{
    BlockPos, BlockSet, MapBlock, ModState, WorldConfig, WorldError, WorldMap, block_over_limit,
    local_from_index,
};

/// Owner of one world: the block index plus everything that keeps it
/// consistent (lighting after edits, the liquid queue, edit events) and the
/// optional on-disk store behind it.
pub struct ServerMap {
    pub(crate) map: WorldMap,
    pub(crate) config: WorldConfig,
    pub(crate) store: Option<BlockStore>,
    pub(crate) generator: Box<dyn Generator>,
    pub(crate) liquids: LiquidQueue,
    pub(crate) events: EditHub,
    seed: u64,
}

impl ServerMap {
    /// A world that lives only in memory.
    pub fn new(
        reg: Arc<ContentRegistry>,
        config: WorldConfig,
        generator: Box<dyn Generator>,
    ) -> Self {
        let map = WorldMap::new(reg, config.generation_limit);
        Self {
            map,
            config,
            store: None,
            generator,
            liquids: LiquidQueue::new(),
            events: EditHub::new(),
            seed: 0,
        }
    }

    /// A world persisted under `config.save_dir`. When the store cannot be
    /// opened the world still runs, in memory only.
    pub fn open(
        reg: Arc<ContentRegistry>,
        config: WorldConfig,
        generator: Box<dyn Generator>,
    ) -> Self {
        let mut sm = Self::new(reg, config, generator);
        match BlockStore::open(&sm.config.save_dir, sm.config.map_size_mb) {
            Ok(store) => sm.store = Some(store),
            Err(e) => log::error!(
                target: "store",
                "cannot open store at {}: {e}; persistence disabled",
                sm.config.save_dir.display()
            ),
        }
        sm
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    #[inline]
    pub fn map(&self) -> &WorldMap {
        &self.map
    }

    #[inline]
    pub fn map_mut(&mut self) -> &mut WorldMap {
        &mut self.map
    }

    #[inline]
    pub fn registry(&self) -> &Arc<ContentRegistry> {
        self.map.registry()
    }

    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    pub fn store(&self) -> Option<&BlockStore> {
        self.store.as_ref()
    }

    pub fn persistence_enabled(&self) -> bool {
        self.store.is_some()
    }

    pub(crate) fn disable_store(&mut self, err: &StoreError) {
        if self.store.take().is_some() {
            log::error!(target: "store", "store failure: {err}; persistence disabled");
        }
    }

    /// New receiver for every edit event dispatched from now on.
    pub fn subscribe(&mut self) -> Receiver<MapEditEvent> {
        self.events.subscribe()
    }

    pub fn events(&self) -> &EditHub {
        &self.events
    }

    pub fn events_mut(&mut self) -> &mut EditHub {
        &mut self.events
    }

    pub(crate) fn dispatch_other(&mut self, p: V3, modified: BlockSet) {
        let mut event = MapEditEvent::new(MapEditKind::Other, p, Node::IGNORE);
        event.modified_blocks = modified;
        self.events.dispatch(event);
    }

    #[inline]
    pub fn node(&self, p: V3) -> Node {
        self.map.node(p)
    }

    pub fn try_node(&self, p: V3) -> Result<Node, WorldError> {
        self.map.try_node(p)
    }

    fn has_block(&self, bp: BlockPos) -> bool {
        self.map.block(bp).is_some_and(|b| !b.is_dummy())
    }

    /// Make the block at `bp` available: already in memory, then from the
    /// store, then (when allowed) freshly generated. Blocks that exist but
    /// were never generated are generated when `allow_generate` is set.
    pub fn emerge_block(
        &mut self,
        bp: BlockPos,
        allow_generate: bool,
    ) -> Result<Option<&MapBlock>, WorldError> {
        if block_over_limit(bp, self.map.generation_limit()) {
            return Err(WorldError::OutOfBounds(bp.origin()));
        }
        let present = self.has_block(bp) || self.load_block(bp);
        let generated = present && self.map.block(bp).is_some_and(|b| b.is_generated());
        if allow_generate && !generated {
            let mut modified = BlockSet::new();
            self.generate_block(bp, &mut modified)?;
            self.dispatch_other(bp.origin(), modified);
        }
        if let Some(block) = self.map.block_mut(bp) {
            block.reset_usage_timer();
        }
        Ok(self.map.block(bp).filter(|b| !b.is_dummy()))
    }

    /// Read `bp` from the store into memory. Returns whether a block was
    /// loaded. Blocks in an older format are written back in the current
    /// one straight away; blobs that do not decode are quarantined.
    pub fn load_block(&mut self, bp: BlockPos) -> bool {
        let result = match self.store.as_ref() {
            Some(store) => store.load_block(bp),
            None => return false,
        };
        let outcome = match result {
            Ok(outcome) => outcome,
            Err(e) => {
                self.disable_store(&e);
                return false;
            }
        };
        match outcome {
            LoadOutcome::Missing => false,
            LoadOutcome::Loaded { mut block, version } => {
                if version < FORMAT_VERSION {
                    match self.store.as_ref().map(|s| s.save_block(&block)) {
                        Some(Ok(())) => {
                            log::debug!(
                                target: "store",
                                "re-saved block {bp} from format v{version} as v{FORMAT_VERSION}"
                            );
                            block.reset_modified();
                        }
                        Some(Err(e)) => self.disable_store(&e),
                        None => {}
                    }
                } else {
                    block.reset_modified();
                }
                match self.map.insert_block(block) {
                    Ok(_) => true,
                    Err(e) => {
                        log::warn!(target: "map", "dropping loaded block {bp}: {e}");
                        false
                    }
                }
            }
            LoadOutcome::Corrupt { error, blob } => {
                log::error!(
                    target: "store",
                    "block {bp} is corrupt ({} bytes): {error}",
                    blob.len()
                );
                if let Some(Err(e)) = self.store.as_ref().map(|s| s.quarantine(bp)) {
                    self.disable_store(&e);
                }
                false
            }
        }
    }

    /// Run the generator for `bp`. The surrounding 3x3x3 blocks are loaded
    /// or created blank first so the generator and the relight can reach
    /// across the faces.
    pub fn generate_block(
        &mut self,
        bp: BlockPos,
        modified: &mut BlockSet,
    ) -> Result<(), WorldError> {
        let limit = self.map.generation_limit();
        if block_over_limit(bp, limit) {
            return Err(WorldError::OutOfBounds(bp.origin()));
        }
        let reg = self.map.registry().clone();

        let mut neighbourhood = Vec::with_capacity(27);
        for dz in -1..=1 {
            for dy in -1..=1 {
                for dx in -1..=1 {
                    let p = bp.offset(dx, dy, dz);
                    if block_over_limit(p, limit) {
                        continue;
                    }
                    if !self.has_block(p) && !self.load_block(p) {
                        let underground = self.generator.is_underground(p);
                        let block = self.map.create_block(p)?;
                        block.allocate();
                        block.set_underground(underground);
                    }
                    if let Some(block) = self.map.block_mut(p) {
                        block.set_lighting_expired(true);
                    }
                    neighbourhood.push(p);
                }
            }
        }

        let mut vm = VoxelManip::new();
        vm.initial_emerge(&self.map, bp.offset(-1, -1, -1), bp.offset(1, 1, 1));
        {
            let mut data = BlockMakeData {
                blockpos: bp,
                vmanip: &mut vm,
                reg: &reg,
                seed: self.seed,
            };
            self.generator.make_block(&mut data);
        }
        vm.blit_back_all_with_meta(&mut self.map, modified);

        let center = BlockSet::from([bp]);
        strata_lighting::update_lighting(&mut self.map, &center, modified);
        // the neighbours were only borrowed as context
        for p in neighbourhood {
            if let Some(block) = self.map.block_mut(p) {
                block.set_lighting_expired(false);
            }
        }
        for &p in modified.iter() {
            if let Some(block) = self.map.block_mut(p) {
                block.update_day_night_diff(&reg);
                block.raise_modified(ModState::NeedsSave);
            }
        }
        if let Some(block) = self.map.block_mut(bp) {
            block.set_generated(true);
        }
        let queued = self.queue_liquids_in_block(bp);
        log::debug!(
            target: "map",
            "generated block {bp}: {} blocks touched, {queued} liquid nodes queued",
            modified.len()
        );
        Ok(())
    }

    /// Queue every liquid node of a loaded block for the liquid engine.
    pub fn queue_liquids_in_block(&mut self, bp: BlockPos) -> usize {
        let reg = self.map.registry();
        let Some(nodes) = self.map.block(bp).and_then(|b| b.nodes()) else {
            return 0;
        };
        let origin = bp.origin();
        let mut queued = 0;
        for (i, n) in nodes.iter().enumerate() {
            if reg.get(n.content).is_liquid() && self.liquids.push(origin + local_from_index(i)) {
                queued += 1;
            }
        }
        queued
    }

    pub fn queue_liquid(&mut self, p: V3) -> bool {
        self.liquids.push(p)
    }

    pub fn liquid_queue_len(&self) -> usize {
        self.liquids.len()
    }

    /// One liquid step. Blocks it changed are announced as one event.
    pub fn transform_liquids(&mut self) -> LiquidTick {
        let tick = strata_liquid::transform_liquids(
            &mut self.map,
            &mut self.liquids,
            self.config.liquid_max_reflow,
        );
        if !tick.modified.is_empty() {
            self.dispatch_other(V3::ZERO, tick.modified.clone());
        }
        tick
    }

    /// Full relight of `blocks`; returns every block whose light changed.
    pub fn update_lighting(&mut self, blocks: &BlockSet) -> BlockSet {
        let mut modified = BlockSet::new();
        strata_lighting::update_lighting(&mut self.map, blocks, &mut modified);
        modified
    }

    /// Relight a single loaded block and announce the result.
    pub fn relight_block(&mut self, bp: BlockPos) -> Result<BlockSet, WorldError> {
        if !self.has_block(bp) {
            return Err(WorldError::NotLoaded(bp));
        }
        let modified = self.update_lighting(&BlockSet::from([bp]));
        self.dispatch_other(bp.origin(), modified.clone());
        Ok(modified)
    }

    pub fn day_night_diffed(&self, bp: BlockPos) -> bool {
        strata_lighting::day_night_diffed(&self.map, bp)
    }

    pub fn analyze_block(&self, bp: BlockPos) -> Option<String> {
        self.map.block(bp).map(MapBlock::analyze)
    }

    pub fn find_ground_level(&self, x: i32, z: i32) -> Option<i32> {
        self.map.find_ground_level(x, z)
    }
}
