/// Brightest level a non-sun source can produce.
pub const LIGHT_MAX: u8 = 14;
/// Reserved level for direct sunlight; only the day bank holds it.
pub const LIGHT_SUN: u8 = 15;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum LightBank {
    Day,
    Night,
}

impl LightBank {
    pub const BOTH: [LightBank; 2] = [LightBank::Day, LightBank::Night];

    #[inline]
    pub(crate) fn shift(self) -> u8 {
        match self {
            LightBank::Day => 0,
            LightBank::Night => 4,
        }
    }
}

/// One step darker. Sunlight drops below `LIGHT_MAX` on its first step.
#[inline]
pub fn diminish_light(light: u8) -> u8 {
    if light == 0 {
        0
    } else if light >= LIGHT_MAX {
        LIGHT_MAX - 1
    } else {
        light - 1
    }
}

/// The brightest light a neighbour could have spread onto a node holding `light`.
#[inline]
pub fn undiminish_light(light: u8) -> u8 {
    if light == LIGHT_SUN {
        LIGHT_SUN
    } else if light >= LIGHT_MAX {
        LIGHT_MAX
    } else {
        light + 1
    }
}

/// Mix day and night levels; `daylight_factor` is in 0..=1000.
#[inline]
pub fn blend_light(day: u8, night: u8, daylight_factor: u32) -> u8 {
    let f = daylight_factor.min(1000);
    ((f * u32::from(day) + (1000 - f) * u32::from(night)) / 1000) as u8
}
