//! The server-side world: edits with light and liquid follow-up, block
//! emerge/load/generate, metadata, eviction and saving.
#![forbid(unsafe_code)]

mod edit;
mod metadata;
mod persist;
mod server;

pub use persist::{MigrateReport, SaveReport};
pub use server::ServerMap;

pub use strata_edit::{MapEditEvent, MapEditKind};
pub use strata_liquid::LiquidTick;
