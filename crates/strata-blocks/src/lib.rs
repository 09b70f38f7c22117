//! Node values and the content feature table.
#![forbid(unsafe_code)]

pub mod config;
pub mod light;
pub mod node;
pub mod registry;

pub use light::{LIGHT_MAX, LIGHT_SUN, LightBank, diminish_light, undiminish_light};
pub use node::{
    CONTENT_AIR, CONTENT_IGNORE, ContentId, LIQUID_FLOW_DOWN_MASK, LIQUID_LEVEL_MASK,
    LIQUID_LEVEL_MAX, LIQUID_LEVEL_SOURCE, Node, WATER_DROP_BOOST,
};
pub use registry::{ContentFeatures, ContentRegistry, LiquidType, MetaKind};
