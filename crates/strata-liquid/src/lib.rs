//! Cellular liquid flow over the loaded world.
#![forbid(unsafe_code)]

mod queue;
mod transform;

pub use queue::LiquidQueue;
pub use transform::{LiquidTick, transform_liquids};
