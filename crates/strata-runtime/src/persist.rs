use rayon::prelude::*;
use strata_io::{FORMAT_VERSION, LoadOutcome, StoreError, serialize_block};
use strata_world::{BlockPos, BlockSet, MapBlock, ModState};

use crate::server::ServerMap;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct SaveReport {
    pub written: usize,
    pub in_memory: usize,
}

/// Outcome of rewriting the whole store in the current format.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct MigrateReport {
    pub scanned: usize,
    pub migrated: usize,
    pub quarantined: usize,
}

fn serialize_all(blocks: &[&MapBlock]) -> Vec<(BlockPos, Vec<u8>)> {
    blocks
        .par_iter()
        .filter_map(|b| match serialize_block(b) {
            Ok(blob) => Some((b.pos(), blob)),
            Err(e) => {
                log::error!(target: "store", "cannot serialize block {}: {e}", b.pos());
                None
            }
        })
        .collect()
}

impl ServerMap {
    /// Serialize the blocks at `positions` and write them in one batch;
    /// written blocks are marked clean. Dummies are skipped. Returns the
    /// positions that reached the store.
    fn write_blocks(&mut self, positions: &[BlockPos]) -> Vec<BlockPos> {
        let Some(store) = self.store.as_ref() else {
            return Vec::new();
        };
        let blocks: Vec<&MapBlock> = positions
            .iter()
            .filter_map(|bp| self.map.block(*bp))
            .filter(|b| !b.is_dummy())
            .collect();
        let items = serialize_all(&blocks);
        match store.save_batch(&items) {
            Ok(_) => {
                let written: Vec<BlockPos> = items.into_iter().map(|(bp, _)| bp).collect();
                for bp in &written {
                    if let Some(block) = self.map.block_mut(*bp) {
                        block.reset_modified();
                    }
                }
                written
            }
            Err(e) => {
                self.disable_store(&e);
                Vec::new()
            }
        }
    }

    /// Write dirty blocks, or every block when `only_changed` is false.
    /// Nothing touches the store when there is nothing to write.
    pub fn save(&mut self, only_changed: bool) -> SaveReport {
        let in_memory = self.map.block_count();
        if self.store.is_none() {
            log::warn!(target: "store", "not saving, persistence is disabled");
            return SaveReport {
                written: 0,
                in_memory,
            };
        }
        if !only_changed {
            log::info!(target: "store", "saving the whole map, this can take a while");
        }
        let positions: Vec<BlockPos> = self
            .map
            .blocks()
            .filter(|b| !b.is_dummy())
            .filter(|b| !only_changed || b.mod_state() >= ModState::NeedsSave)
            .map(MapBlock::pos)
            .collect();
        let written = self.write_blocks(&positions).len();
        if !only_changed || written != 0 {
            log::info!(
                target: "store",
                "written {written} blocks, {in_memory} blocks in memory"
            );
        }
        SaveReport { written, in_memory }
    }

    /// Write one block now. Returns whether it reached the store.
    pub fn save_block(&mut self, bp: BlockPos) -> bool {
        self.write_blocks(&[bp]).len() == 1
    }

    /// Age every block by `dtime` seconds and drop those idle for longer
    /// than `unload_timeout`, writing dirty ones first. A dirty block that
    /// could not be written stays in memory. Returns the positions that
    /// were dropped so caches built from them can be freed.
    pub fn timer_update(&mut self, dtime: f32, unload_timeout: f32) -> Vec<BlockPos> {
        let mut expired = Vec::new();
        for block in self.map.blocks_mut() {
            block.increment_usage_timer(dtime);
            if block.usage_timer() > unload_timeout {
                expired.push(block.pos());
            }
        }
        if expired.is_empty() {
            return expired;
        }

        let dirty: Vec<BlockPos> = expired
            .iter()
            .copied()
            .filter(|bp| {
                self.map
                    .block(*bp)
                    .is_some_and(|b| b.is_modified() && !b.is_dummy())
            })
            .collect();
        let saved: BlockSet = self.write_blocks(&dirty).into_iter().collect();
        let kept: BlockSet = dirty.into_iter().filter(|bp| !saved.contains(bp)).collect();
        expired.retain(|bp| !kept.contains(bp));

        for &bp in &expired {
            self.map.remove_block(bp);
            self.events.forget(bp);
        }
        if !expired.is_empty() {
            log::info!(
                target: "map",
                "unloaded {} blocks from memory, of which {} were written",
                expired.len(),
                saved.len()
            );
        }
        if !kept.is_empty() {
            log::warn!(
                target: "map",
                "keeping {} idle blocks in memory, they have unsaved changes",
                kept.len()
            );
        }
        expired
    }

    /// Every block position held by the store, without loading bodies.
    pub fn list_all_loadable_blocks(&self) -> Result<Vec<BlockPos>, StoreError> {
        match self.store.as_ref() {
            Some(store) => store.list_all_keys(),
            None => Ok(Vec::new()),
        }
    }

    /// Rewrite every stored block that is in an older format and move
    /// undecodable ones to quarantine. Blocks are not kept in memory.
    pub fn migrate_store(&mut self) -> Result<MigrateReport, StoreError> {
        let Some(store) = self.store.as_ref() else {
            return Ok(MigrateReport::default());
        };
        let mut report = MigrateReport::default();
        let mut items = Vec::new();
        for bp in store.list_all_keys()? {
            report.scanned += 1;
            match store.load_block(bp)? {
                LoadOutcome::Missing => {}
                LoadOutcome::Loaded { block, version } if version < FORMAT_VERSION => {
                    items.push((bp, serialize_block(&block)?));
                }
                LoadOutcome::Loaded { .. } => {}
                LoadOutcome::Corrupt { error, .. } => {
                    log::error!(target: "store", "block {bp} is corrupt: {error}");
                    if store.quarantine(bp)? {
                        report.quarantined += 1;
                    }
                }
            }
        }
        report.migrated = store.save_batch(&items)?;
        log::info!(
            target: "store",
            "migrated {} of {} blocks, {} quarantined",
            report.migrated,
            report.scanned,
            report.quarantined
        );
        Ok(report)
    }
}
