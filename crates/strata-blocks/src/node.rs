use crate::light::{LightBank, blend_light};
use crate::registry::ContentRegistry;

pub type ContentId = u16;

/// Placeholder read back for anything that is not loaded.
pub const CONTENT_IGNORE: ContentId = 127;
pub const CONTENT_AIR: ContentId = 126;

// param2 layout for flowing liquids
pub const LIQUID_LEVEL_MASK: u8 = 0x07;
pub const LIQUID_FLOW_DOWN_MASK: u8 = 0x08;
pub const LIQUID_LEVEL_MAX: u8 = 7;
pub const LIQUID_LEVEL_SOURCE: u8 = 8;
pub const WATER_DROP_BOOST: u8 = 4;

/// A single cell. `param1` packs day light in the low nibble and night light
/// in the high nibble for contents that store light.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Node {
    pub content: ContentId,
    pub param1: u8,
    pub param2: u8,
}

impl Default for Node {
    fn default() -> Self {
        Node::AIR
    }
}

impl Node {
    pub const IGNORE: Node = Node::new(CONTENT_IGNORE);
    pub const AIR: Node = Node::new(CONTENT_AIR);

    #[inline]
    pub const fn new(content: ContentId) -> Self {
        Self {
            content,
            param1: 0,
            param2: 0,
        }
    }

    #[inline]
    pub const fn with_params(content: ContentId, param1: u8, param2: u8) -> Self {
        Self {
            content,
            param1,
            param2,
        }
    }

    #[inline]
    pub fn is_ignore(self) -> bool {
        self.content == CONTENT_IGNORE
    }

    #[inline]
    pub fn is_air(self) -> bool {
        self.content == CONTENT_AIR
    }

    /// Light held in `param1`, zero for contents that never store light.
    #[inline]
    pub fn stored_light(self, bank: LightBank, reg: &ContentRegistry) -> u8 {
        if !reg.get(self.content).stores_light() {
            return 0;
        }
        (self.param1 >> bank.shift()) & 0x0f
    }

    /// Effective light: the stored value or the content's own emission.
    #[inline]
    pub fn light(self, bank: LightBank, reg: &ContentRegistry) -> u8 {
        self.stored_light(bank, reg)
            .max(reg.get(self.content).light_source)
    }

    /// Writes are dropped for contents that do not store light.
    #[inline]
    pub fn set_light(&mut self, bank: LightBank, level: u8, reg: &ContentRegistry) {
        if !reg.get(self.content).stores_light() {
            return;
        }
        let shift = bank.shift();
        self.param1 = (self.param1 & !(0x0f << shift)) | ((level & 0x0f) << shift);
    }

    pub fn light_blend(self, daylight_factor: u32, reg: &ContentRegistry) -> u8 {
        blend_light(
            self.light(LightBank::Day, reg),
            self.light(LightBank::Night, reg),
            daylight_factor,
        )
    }

    #[inline]
    pub fn liquid_level(self) -> u8 {
        self.param2 & LIQUID_LEVEL_MASK
    }

    #[inline]
    pub fn is_flowing_down(self) -> bool {
        self.param2 & LIQUID_FLOW_DOWN_MASK != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::light::{LIGHT_MAX, LIGHT_SUN};

    #[test]
    fn banks_are_independent_nibbles() {
        let reg = ContentRegistry::builtin();
        let mut n = Node::AIR;
        n.set_light(LightBank::Day, LIGHT_SUN, &reg);
        n.set_light(LightBank::Night, 3, &reg);
        assert_eq!(n.light(LightBank::Day, &reg), LIGHT_SUN);
        assert_eq!(n.light(LightBank::Night, &reg), 3);
        assert_eq!(n.param1, 0x3f);
        n.set_light(LightBank::Day, 0, &reg);
        assert_eq!(n.light(LightBank::Night, &reg), 3);
        assert_eq!(n.param1, 0x30);
    }

    #[test]
    fn opaque_content_ignores_light_writes() {
        let reg = ContentRegistry::builtin();
        let stone = reg.id_by_name("stone").unwrap();
        let mut n = Node::new(stone);
        n.set_light(LightBank::Day, 9, &reg);
        assert_eq!(n.param1, 0);
        assert_eq!(n.light(LightBank::Day, &reg), 0);
    }

    #[test]
    fn emitters_report_at_least_their_source_level() {
        let reg = ContentRegistry::builtin();
        let torch = reg.id_by_name("torch").unwrap();
        let mut n = Node::new(torch);
        assert_eq!(n.light(LightBank::Night, &reg), LIGHT_MAX - 1);
        n.set_light(LightBank::Day, LIGHT_SUN, &reg);
        assert_eq!(n.light(LightBank::Day, &reg), LIGHT_SUN);
        assert_eq!(n.stored_light(LightBank::Night, &reg), 0);
    }
}
