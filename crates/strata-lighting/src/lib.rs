//! Day and night light propagation across block boundaries.
#![forbid(unsafe_code)]

mod relight;
mod spread;
mod sunlight;


pub use relight::{day_night_diffed, update_day_night_diff, update_lighting, update_lighting_bank};
pub use spread::{
    LightSources, UnlightSeeds, brightest_neighbour, light_neighbors, spread_light,
    unlight_neighbors, unspread_light,
};
pub use sunlight::{block_propagate_sunlight, propagate_sunlight};
