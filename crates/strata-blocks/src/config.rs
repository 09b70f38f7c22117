use serde::Deserialize;

// Top-level content table file
#[derive(Deserialize, Debug, Default)]
pub struct ContentConfig {
    #[serde(default)]
    pub content: Vec<ContentDef>,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct ContentDef {
    pub name: String,
    pub id: u16,
    #[serde(default)]
    pub solid: Option<bool>,
    #[serde(default)]
    pub light_propagates: Option<bool>,
    #[serde(default)]
    pub sunlight_propagates: Option<bool>,
    #[serde(default)]
    pub light_source: Option<u8>,
    #[serde(default)]
    pub liquid: Option<LiquidCfg>,
    // Names of the paired liquid contents; required for liquids
    #[serde(default)]
    pub liquid_alternative_source: Option<String>,
    #[serde(default)]
    pub liquid_alternative_flowing: Option<String>,
    #[serde(default)]
    pub liquid_viscosity: Option<u8>,
    #[serde(default)]
    pub initial_metadata: Option<MetaCfg>,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LiquidCfg {
    None,
    Source,
    Flowing,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MetaCfg {
    Sign,
    Furnace,
    Circuit,
}
