//! Versioned binary block format.
//!
//! ```text
//! u8   version
//! u8   flags
//! u32  length, zlib(node planes)
//! u32  length, zlib(metadata table)
//! u32  timestamp                      (version 2 and later)
//! ```
//!
//! Node planes hold every node's content, then every param1, then every
//! param2, in block-local index order. Contents are one byte wide in
//! version 1 and two bytes from version 2 on. All integers are big endian.

use std::collections::BTreeMap;
use std::io::{Cursor, Read, Write};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use flate2::Compression;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use strata_blocks::Node;
use strata_geom::V3;
use strata_world::meta::{CircuitMeta, FurnaceMeta, SignMeta};
use strata_world::{BLOCK_VOLUME, BlockPos, MapBlock, ModState, NodeMeta};

use crate::error::SerializeError;

pub const FORMAT_VERSION: u8 = 2;
pub const OLDEST_READABLE_VERSION: u8 = 1;

const FLAG_UNDERGROUND: u8 = 0x01;
const FLAG_DAY_NIGHT_DIFFERS: u8 = 0x02;
const FLAG_LIGHTING_EXPIRED: u8 = 0x04;
const FLAG_NOT_GENERATED: u8 = 0x08;

pub fn serialize_block(block: &MapBlock) -> Result<Vec<u8>, SerializeError> {
    serialize_block_version(block, FORMAT_VERSION)
}

/// Encode in a specific version. Older versions exist so upgrade paths can
/// be exercised; writers should use [`serialize_block`].
pub fn serialize_block_version(block: &MapBlock, version: u8) -> Result<Vec<u8>, SerializeError> {
    if !(OLDEST_READABLE_VERSION..=FORMAT_VERSION).contains(&version) {
        return Err(SerializeError::UnsupportedVersion(version));
    }
    let nodes = block.nodes().ok_or(SerializeError::Dummy)?;

    let mut flags = 0;
    if block.is_underground() {
        flags |= FLAG_UNDERGROUND;
    }
    if block.day_night_differs() {
        flags |= FLAG_DAY_NIGHT_DIFFERS;
    }
    if block.lighting_expired() {
        flags |= FLAG_LIGHTING_EXPIRED;
    }
    if !block.is_generated() {
        flags |= FLAG_NOT_GENERATED;
    }

    let mut out = Vec::with_capacity(4096);
    out.write_u8(version)?;
    out.write_u8(flags)?;
    write_section(&mut out, &compress(&encode_nodes(nodes, version)?)?)?;
    write_section(&mut out, &compress(&encode_meta(block)?)?)?;
    if version >= 2 {
        out.write_u32::<BigEndian>(block.timestamp())?;
    }
    Ok(out)
}

/// Decode a block stored at `pos`. Returns the block and the version it was
/// stored in; blocks from older versions come back marked for saving.
pub fn deserialize_block(pos: BlockPos, data: &[u8]) -> Result<(MapBlock, u8), SerializeError> {
    let mut r = Cursor::new(data);
    let version = r.read_u8()?;
    if !(OLDEST_READABLE_VERSION..=FORMAT_VERSION).contains(&version) {
        return Err(SerializeError::UnsupportedVersion(version));
    }
    let flags = r.read_u8()?;

    let raw_nodes = decompress(&read_section(&mut r)?)?;
    let nodes = decode_nodes(&raw_nodes, version)?;
    let mut block = MapBlock::from_nodes(pos, nodes).ok_or(SerializeError::BadSize {
        expected: BLOCK_VOLUME,
        got: raw_nodes.len(),
    })?;

    let raw_meta = decompress(&read_section(&mut r)?)?;
    decode_meta(&mut block, &raw_meta)?;

    if version >= 2 {
        block.set_timestamp(r.read_u32::<BigEndian>()?);
    }
    block.restore_flags(
        flags & FLAG_UNDERGROUND != 0,
        flags & FLAG_DAY_NIGHT_DIFFERS != 0,
        flags & FLAG_LIGHTING_EXPIRED != 0,
        flags & FLAG_NOT_GENERATED == 0,
    );
    if version < FORMAT_VERSION {
        block.raise_modified(ModState::NeedsSave);
    }
    Ok((block, version))
}

fn write_section(out: &mut Vec<u8>, bytes: &[u8]) -> Result<(), SerializeError> {
    let len = u32::try_from(bytes.len()).map_err(|_| SerializeError::BadSize {
        expected: u32::MAX as usize,
        got: bytes.len(),
    })?;
    out.write_u32::<BigEndian>(len)?;
    out.write_all(bytes)?;
    Ok(())
}

fn read_section(r: &mut Cursor<&[u8]>) -> Result<Vec<u8>, SerializeError> {
    let len = r.read_u32::<BigEndian>()? as usize;
    let remaining = r.get_ref().len() - r.position() as usize;
    if len > remaining {
        return Err(SerializeError::Truncated);
    }
    let mut buf = vec![0; len];
    r.read_exact(&mut buf)?;
    Ok(buf)
}

fn compress(bytes: &[u8]) -> Result<Vec<u8>, SerializeError> {
    let mut enc = ZlibEncoder::new(Vec::new(), Compression::default());
    enc.write_all(bytes)?;
    Ok(enc.finish()?)
}

fn decompress(bytes: &[u8]) -> Result<Vec<u8>, SerializeError> {
    let mut out = Vec::new();
    ZlibDecoder::new(bytes)
        .read_to_end(&mut out)
        .map_err(|e| SerializeError::Decompress(e.to_string()))?;
    Ok(out)
}

fn content_width(version: u8) -> usize {
    if version >= 2 { 2 } else { 1 }
}

fn encode_nodes(nodes: &[Node], version: u8) -> Result<Vec<u8>, SerializeError> {
    let width = content_width(version);
    let mut out = Vec::with_capacity(nodes.len() * (width + 2));
    for n in nodes {
        if width == 1 {
            let c = u8::try_from(n.content)
                .map_err(|_| SerializeError::ContentOutOfRange(n.content, version))?;
            out.write_u8(c)?;
        } else {
            out.write_u16::<BigEndian>(n.content)?;
        }
    }
    out.extend(nodes.iter().map(|n| n.param1));
    out.extend(nodes.iter().map(|n| n.param2));
    Ok(out)
}

fn decode_nodes(raw: &[u8], version: u8) -> Result<Vec<Node>, SerializeError> {
    let width = content_width(version);
    let expected = BLOCK_VOLUME * (width + 2);
    if raw.len() != expected {
        return Err(SerializeError::BadSize {
            expected,
            got: raw.len(),
        });
    }
    let (contents, params) = raw.split_at(BLOCK_VOLUME * width);
    let (param1, param2) = params.split_at(BLOCK_VOLUME);
    let nodes = (0..BLOCK_VOLUME)
        .map(|i| {
            let content = if width == 1 {
                u16::from(contents[i])
            } else {
                u16::from_be_bytes([contents[2 * i], contents[2 * i + 1]])
            };
            Node::with_params(content, param1[i], param2[i])
        })
        .collect();
    Ok(nodes)
}

fn write_string(out: &mut Vec<u8>, s: &str) -> Result<(), SerializeError> {
    let len = u16::try_from(s.len())
        .map_err(|_| SerializeError::BadMetadata(format!("string of {} bytes", s.len())))?;
    out.write_u16::<BigEndian>(len)?;
    out.write_all(s.as_bytes())?;
    Ok(())
}

fn read_string(r: &mut Cursor<&[u8]>) -> Result<String, SerializeError> {
    let len = r.read_u16::<BigEndian>()? as usize;
    let mut buf = vec![0; len];
    r.read_exact(&mut buf)?;
    String::from_utf8(buf).map_err(|e| SerializeError::BadMetadata(e.to_string()))
}

fn encode_meta_body(meta: &NodeMeta) -> Result<Vec<u8>, SerializeError> {
    let mut body = Vec::new();
    match meta {
        NodeMeta::Sign(m) => {
            write_string(&mut body, &m.text)?;
        }
        NodeMeta::Furnace(m) => {
            for v in [
                m.fuel_time,
                m.fuel_total,
                m.src_time,
                m.src_total,
                m.step_accumulator,
            ] {
                body.write_f32::<BigEndian>(v)?;
            }
        }
        NodeMeta::Circuit(m) => {
            body.write_u8(m.energy)?;
            let count = u16::try_from(m.sources.len())
                .map_err(|_| SerializeError::BadMetadata("too many circuit sources".into()))?;
            body.write_u16::<BigEndian>(count)?;
            for (src, level) in &m.sources {
                body.write_i32::<BigEndian>(src.x)?;
                body.write_i32::<BigEndian>(src.y)?;
                body.write_i32::<BigEndian>(src.z)?;
                body.write_u8(*level)?;
            }
        }
    }
    write_string(&mut body, meta.owner())?;
    Ok(body)
}

fn decode_meta_body(type_id: u16, body: &[u8]) -> Result<NodeMeta, SerializeError> {
    let mut r = Cursor::new(body);
    let meta = match type_id {
        NodeMeta::TYPE_SIGN => {
            let text = read_string(&mut r)?;
            let owner = read_string(&mut r)?;
            NodeMeta::Sign(SignMeta { text, owner })
        }
        NodeMeta::TYPE_FURNACE => {
            let mut v = [0f32; 5];
            for slot in &mut v {
                *slot = r.read_f32::<BigEndian>()?;
            }
            let owner = read_string(&mut r)?;
            NodeMeta::Furnace(FurnaceMeta {
                fuel_time: v[0],
                fuel_total: v[1],
                src_time: v[2],
                src_total: v[3],
                step_accumulator: v[4],
                owner,
            })
        }
        NodeMeta::TYPE_CIRCUIT => {
            let energy = r.read_u8()?;
            let count = r.read_u16::<BigEndian>()?;
            let mut sources = BTreeMap::new();
            for _ in 0..count {
                let x = r.read_i32::<BigEndian>()?;
                let y = r.read_i32::<BigEndian>()?;
                let z = r.read_i32::<BigEndian>()?;
                sources.insert(V3::new(x, y, z), r.read_u8()?);
            }
            let owner = read_string(&mut r)?;
            NodeMeta::Circuit(CircuitMeta {
                energy,
                sources,
                owner,
            })
        }
        other => {
            return Err(SerializeError::BadMetadata(format!("unknown type {other}")));
        }
    };
    Ok(meta)
}

fn encode_meta(block: &MapBlock) -> Result<Vec<u8>, SerializeError> {
    let mut out = Vec::new();
    let count = u16::try_from(block.meta.len())
        .map_err(|_| SerializeError::BadMetadata("too many entries".into()))?;
    out.write_u16::<BigEndian>(count)?;
    for (idx, meta) in block.meta.iter() {
        let body = encode_meta_body(meta)?;
        out.write_u16::<BigEndian>(idx)?;
        out.write_u16::<BigEndian>(meta.type_id())?;
        out.write_u32::<BigEndian>(body.len() as u32)?;
        out.write_all(&body)?;
    }
    Ok(out)
}

fn decode_meta(block: &mut MapBlock, raw: &[u8]) -> Result<(), SerializeError> {
    let mut r = Cursor::new(raw);
    let count = r.read_u16::<BigEndian>()?;
    for _ in 0..count {
        let idx = r.read_u16::<BigEndian>()?;
        if idx as usize >= BLOCK_VOLUME {
            return Err(SerializeError::BadMetadata(format!("index {idx} outside block")));
        }
        let type_id = r.read_u16::<BigEndian>()?;
        let len = r.read_u32::<BigEndian>()? as usize;
        let mut body = vec![0; len.min(raw.len())];
        r.read_exact(&mut body)?;
        if body.len() != len {
            return Err(SerializeError::Truncated);
        }
        block.meta.set(idx, decode_meta_body(type_id, &body)?);
    }
    Ok(())
}
