//! Per-node metadata records owned by a block.

use std::collections::{BTreeMap, HashMap};

use strata_blocks::MetaKind;
use strata_geom::V3;

/// Seconds between furnace simulation steps.
pub const FURNACE_STEP_INTERVAL: f32 = 2.0;
pub const CIRCUIT_ENERGY_MAX: u8 = 16;
/// Longest sign text kept, in bytes.
pub const SIGN_TEXT_MAX: usize = 512;

/// `text` cut to at most `max` bytes on a char boundary.
fn clamp_text(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SignMeta {
    pub text: String,
    pub owner: String,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct FurnaceMeta {
    pub fuel_time: f32,
    pub fuel_total: f32,
    pub src_time: f32,
    pub src_total: f32,
    pub step_accumulator: f32,
    pub owner: String,
}

/// Energy level plus the upstream nodes (as offsets from this node) that
/// currently energise it.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CircuitMeta {
    pub energy: u8,
    pub sources: BTreeMap<V3, u8>,
    pub owner: String,
}

#[derive(Clone, Debug, PartialEq)]
pub enum NodeMeta {
    Sign(SignMeta),
    Furnace(FurnaceMeta),
    Circuit(CircuitMeta),
}

impl NodeMeta {
    pub const TYPE_SIGN: u16 = 14;
    pub const TYPE_FURNACE: u16 = 16;
    pub const TYPE_CIRCUIT: u16 = 32;

    /// Fresh record for a newly placed node.
    pub fn create(kind: MetaKind, owner: &str) -> Self {
        let owner = owner.to_string();
        match kind {
            MetaKind::Sign => NodeMeta::Sign(SignMeta {
                text: String::new(),
                owner,
            }),
            MetaKind::Furnace => NodeMeta::Furnace(FurnaceMeta {
                owner,
                ..FurnaceMeta::default()
            }),
            MetaKind::Circuit => NodeMeta::Circuit(CircuitMeta {
                owner,
                ..CircuitMeta::default()
            }),
        }
    }

    pub fn kind(&self) -> MetaKind {
        match self {
            NodeMeta::Sign(_) => MetaKind::Sign,
            NodeMeta::Furnace(_) => MetaKind::Furnace,
            NodeMeta::Circuit(_) => MetaKind::Circuit,
        }
    }

    /// Wire tag used by the block format.
    pub fn type_id(&self) -> u16 {
        match self {
            NodeMeta::Sign(_) => Self::TYPE_SIGN,
            NodeMeta::Furnace(_) => Self::TYPE_FURNACE,
            NodeMeta::Circuit(_) => Self::TYPE_CIRCUIT,
        }
    }

    pub fn owner(&self) -> &str {
        match self {
            NodeMeta::Sign(m) => &m.owner,
            NodeMeta::Furnace(m) => &m.owner,
            NodeMeta::Circuit(m) => &m.owner,
        }
    }

    pub fn set_owner(&mut self, owner: &str) {
        let slot = match self {
            NodeMeta::Sign(m) => &mut m.owner,
            NodeMeta::Furnace(m) => &mut m.owner,
            NodeMeta::Circuit(m) => &mut m.owner,
        };
        *slot = owner.to_string();
    }

    pub fn info_text(&self) -> String {
        match self {
            NodeMeta::Sign(m) => m.text.clone(),
            NodeMeta::Furnace(m) => {
                if m.fuel_time < m.fuel_total {
                    "Furnace is active".to_string()
                } else {
                    "Furnace is inactive".to_string()
                }
            }
            NodeMeta::Circuit(m) => format!("Energy: {}", m.energy),
        }
    }

    /// Advance by `dtime` seconds; returns whether anything changed.
    pub fn step(&mut self, dtime: f32) -> bool {
        match self {
            NodeMeta::Furnace(m) => m.step(dtime),
            NodeMeta::Sign(_) | NodeMeta::Circuit(_) => false,
        }
    }

    /// Apply fields submitted from outside (a form, a script). Returns
    /// whether the record changed.
    pub fn receive_fields(&mut self, fields: &HashMap<String, String>) -> bool {
        match self {
            NodeMeta::Sign(m) => match fields.get("text") {
                Some(text) => {
                    let text = clamp_text(text, SIGN_TEXT_MAX);
                    if text == m.text {
                        return false;
                    }
                    m.text = text.to_string();
                    true
                }
                None => false,
            },
            NodeMeta::Furnace(m) => {
                let mut changed = false;
                if let Some(fuel) = fields.get("fuel").and_then(|v| v.parse::<f32>().ok()) {
                    m.fuel_total = fuel.max(0.0);
                    m.fuel_time = 0.0;
                    changed = true;
                }
                if let Some(cook) = fields.get("cook").and_then(|v| v.parse::<f32>().ok()) {
                    m.src_total = cook.max(0.0);
                    m.src_time = 0.0;
                    changed = true;
                }
                changed
            }
            NodeMeta::Circuit(_) => false,
        }
    }

    pub fn as_circuit_mut(&mut self) -> Option<&mut CircuitMeta> {
        match self {
            NodeMeta::Circuit(m) => Some(m),
            _ => None,
        }
    }
}

impl FurnaceMeta {
    pub fn is_burning(&self) -> bool {
        self.fuel_time < self.fuel_total
    }

    fn step(&mut self, dtime: f32) -> bool {
        self.step_accumulator += dtime;
        let mut changed = false;
        while self.step_accumulator >= FURNACE_STEP_INTERVAL {
            self.step_accumulator -= FURNACE_STEP_INTERVAL;
            if !self.is_burning() {
                if self.fuel_total > 0.0 {
                    self.fuel_time = 0.0;
                    self.fuel_total = 0.0;
                    changed = true;
                }
                break;
            }
            self.fuel_time += FURNACE_STEP_INTERVAL;
            changed = true;
            if self.src_total > 0.0 {
                self.src_time += FURNACE_STEP_INTERVAL;
                if self.src_time >= self.src_total {
                    self.src_time = 0.0;
                    self.src_total = 0.0;
                }
            }
        }
        changed
    }
}

impl CircuitMeta {
    /// Record `level` arriving from `source`; energy follows the strongest source.
    pub fn energise(&mut self, level: u8, source: V3) -> bool {
        let level = level.min(CIRCUIT_ENERGY_MAX);
        let prev = self.energy;
        if level == 0 {
            self.sources.remove(&source);
        } else {
            self.sources.insert(source, level);
        }
        self.energy = self.sources.values().copied().max().unwrap_or(0);
        prev != self.energy
    }

    pub fn unenergise(&mut self, source: V3) -> bool {
        self.energise(0, source)
    }
}

/// Metadata table of one block, keyed by in-block index.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NodeMetaList {
    entries: BTreeMap<u16, NodeMeta>,
}

impl NodeMetaList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, idx: u16) -> Option<&NodeMeta> {
        self.entries.get(&idx)
    }

    pub fn get_mut(&mut self, idx: u16) -> Option<&mut NodeMeta> {
        self.entries.get_mut(&idx)
    }

    pub fn set(&mut self, idx: u16, meta: NodeMeta) -> Option<NodeMeta> {
        self.entries.insert(idx, meta)
    }

    pub fn remove(&mut self, idx: u16) -> Option<NodeMeta> {
        self.entries.remove(&idx)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (u16, &NodeMeta)> {
        self.entries.iter().map(|(k, v)| (*k, v))
    }

    /// Step every record; true when any changed.
    pub fn step(&mut self, dtime: f32) -> bool {
        let mut changed = false;
        for meta in self.entries.values_mut() {
            changed |= meta.step(dtime);
        }
        changed
    }
}
