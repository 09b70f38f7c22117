use std::path::{Path, PathBuf};

use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions};
use strata_world::{BlockPos, MapBlock};

use crate::error::{SerializeError, StoreError};
use crate::format::{deserialize_block, serialize_block};
use crate::key::{block_key, key_to_block};

/// Result of looking a block up in the store.
#[derive(Debug)]
pub enum LoadOutcome {
    Missing,
    Loaded { block: MapBlock, version: u8 },
    /// The blob exists but does not decode; it is handed back untouched.
    Corrupt { error: SerializeError, blob: Vec<u8> },
}

/// Blocks keyed by packed position in an LMDB environment. Blobs that fail
/// to decode can be moved aside into a separate quarantine table.
pub struct BlockStore {
    env: Env,
    blocks: Database<Bytes, Bytes>,
    quarantine: Database<Bytes, Bytes>,
    path: PathBuf,
}

fn key_bytes(bp: BlockPos) -> [u8; 8] {
    block_key(bp).to_be_bytes()
}

fn decode_keys<'a>(
    iter: impl Iterator<Item = heed::Result<(&'a [u8], &'a [u8])>>,
) -> Result<Vec<BlockPos>, StoreError> {
    let mut out = Vec::new();
    for entry in iter {
        let (k, _) = entry?;
        match <[u8; 8]>::try_from(k) {
            Ok(raw) => out.push(key_to_block(i64::from_be_bytes(raw))),
            Err(_) => log::warn!(target: "store", "skipping key of {} bytes", k.len()),
        }
    }
    Ok(out)
}

impl BlockStore {
    /// Open or create the store under `path`.
    #[allow(unsafe_code)]
    pub fn open(path: impl AsRef<Path>, map_size_mb: usize) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        std::fs::create_dir_all(&path)?;

        // SAFETY: the environment is opened once per world directory and
        // kept for the lifetime of the store.
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(map_size_mb.max(1) * 1024 * 1024)
                .max_dbs(2)
                .open(&path)?
        };

        let mut wtxn = env.write_txn()?;
        let blocks = env.create_database(&mut wtxn, Some("blocks"))?;
        let quarantine = env.create_database(&mut wtxn, Some("quarantine"))?;
        wtxn.commit()?;

        log::info!(target: "store", "opened block store at {}", path.display());
        Ok(Self {
            env,
            blocks,
            quarantine,
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load_raw(&self, bp: BlockPos) -> Result<Option<Vec<u8>>, StoreError> {
        let rtxn = self.env.read_txn()?;
        Ok(self.blocks.get(&rtxn, &key_bytes(bp))?.map(<[u8]>::to_vec))
    }

    pub fn save_raw(&self, bp: BlockPos, blob: &[u8]) -> Result<(), StoreError> {
        let mut wtxn = self.env.write_txn()?;
        self.blocks.put(&mut wtxn, &key_bytes(bp), blob)?;
        wtxn.commit()?;
        Ok(())
    }

    pub fn save_block(&self, block: &MapBlock) -> Result<(), StoreError> {
        let blob = serialize_block(block)?;
        self.save_raw(block.pos(), &blob)?;
        log::trace!(target: "store", "saved block {}", block.pos());
        Ok(())
    }

    /// Write every blob inside one transaction. Nothing is opened for an
    /// empty batch.
    pub fn save_batch(&self, items: &[(BlockPos, Vec<u8>)]) -> Result<usize, StoreError> {
        if items.is_empty() {
            return Ok(0);
        }
        let mut wtxn = self.env.write_txn()?;
        for (bp, blob) in items {
            self.blocks.put(&mut wtxn, &key_bytes(*bp), blob)?;
        }
        wtxn.commit()?;
        Ok(items.len())
    }

    pub fn load_block(&self, bp: BlockPos) -> Result<LoadOutcome, StoreError> {
        let Some(blob) = self.load_raw(bp)? else {
            return Ok(LoadOutcome::Missing);
        };
        Ok(match deserialize_block(bp, &blob) {
            Ok((block, version)) => LoadOutcome::Loaded { block, version },
            Err(error) => LoadOutcome::Corrupt { error, blob },
        })
    }

    pub fn delete(&self, bp: BlockPos) -> Result<bool, StoreError> {
        let mut wtxn = self.env.write_txn()?;
        let deleted = self.blocks.delete(&mut wtxn, &key_bytes(bp))?;
        wtxn.commit()?;
        Ok(deleted)
    }

    /// Move the stored blob for `bp` into the quarantine table. Returns
    /// false when there was nothing stored.
    pub fn quarantine(&self, bp: BlockPos) -> Result<bool, StoreError> {
        let key = key_bytes(bp);
        let mut wtxn = self.env.write_txn()?;
        let Some(blob) = self.blocks.get(&wtxn, &key)?.map(<[u8]>::to_vec) else {
            return Ok(false);
        };
        self.quarantine.put(&mut wtxn, &key, &blob)?;
        self.blocks.delete(&mut wtxn, &key)?;
        wtxn.commit()?;
        log::error!(
            target: "store",
            "quarantined block {bp} ({} bytes)",
            blob.len()
        );
        Ok(true)
    }

    pub fn quarantined(&self) -> Result<Vec<BlockPos>, StoreError> {
        let rtxn = self.env.read_txn()?;
        let keys = decode_keys(self.quarantine.iter(&rtxn)?);
        keys
    }

    /// Every stored block position, without decoding any blob.
    pub fn list_all_keys(&self) -> Result<Vec<BlockPos>, StoreError> {
        let rtxn = self.env.read_txn()?;
        let keys = decode_keys(self.blocks.iter(&rtxn)?);
        keys
    }

    pub fn len(&self) -> Result<u64, StoreError> {
        let rtxn = self.env.read_txn()?;
        Ok(self.blocks.len(&rtxn)?)
    }

    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }
}
