use std::collections::HashMap;
use std::error::Error;
use std::fs;
use std::path::Path;

use super::config::{ContentConfig, ContentDef, LiquidCfg, MetaCfg};
use super::light::LIGHT_MAX;
use super::node::{CONTENT_AIR, CONTENT_IGNORE, ContentId};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LiquidType {
    None,
    Source,
    Flowing,
}

/// Which metadata record a freshly placed node starts with.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MetaKind {
    Sign,
    Furnace,
    Circuit,
}

#[derive(Clone, Debug)]
pub struct ContentFeatures {
    pub name: String,
    pub solid: bool,
    pub light_propagates: bool,
    pub sunlight_propagates: bool,
    pub light_source: u8,
    pub liquid_type: LiquidType,
    pub liquid_alternative_flowing: ContentId,
    pub liquid_alternative_source: ContentId,
    pub liquid_viscosity: u8,
    pub initial_metadata: Option<MetaKind>,
}

impl ContentFeatures {
    /// Features of unknown content: opaque, inert, no light.
    pub fn unknown(name: &str) -> Self {
        Self {
            name: name.to_string(),
            solid: true,
            light_propagates: false,
            sunlight_propagates: false,
            light_source: 0,
            liquid_type: LiquidType::None,
            liquid_alternative_flowing: CONTENT_IGNORE,
            liquid_alternative_source: CONTENT_IGNORE,
            liquid_viscosity: 0,
            initial_metadata: None,
        }
    }

    /// Whether `param1` carries light for this content.
    #[inline]
    pub fn stores_light(&self) -> bool {
        self.light_propagates || self.sunlight_propagates || self.light_source > 0
    }

    #[inline]
    pub fn is_liquid(&self) -> bool {
        self.liquid_type != LiquidType::None
    }
}

/// Read-only content table handed to the store at construction.
#[derive(Clone, Debug)]
pub struct ContentRegistry {
    features: Vec<ContentFeatures>,
    by_name: HashMap<String, ContentId>,
    fallback: ContentFeatures,
}

impl ContentRegistry {
    fn empty() -> Self {
        let mut reg = ContentRegistry {
            features: Vec::new(),
            by_name: HashMap::new(),
            fallback: ContentFeatures::unknown("unknown"),
        };
        reg.insert(CONTENT_IGNORE, ContentFeatures::unknown("ignore"));
        reg.insert(
            CONTENT_AIR,
            ContentFeatures {
                solid: false,
                light_propagates: true,
                sunlight_propagates: true,
                ..ContentFeatures::unknown("air")
            },
        );
        reg
    }

    fn insert(&mut self, id: ContentId, f: ContentFeatures) {
        let idx = id as usize;
        if self.features.len() <= idx {
            self.features
                .resize_with(idx + 1, || ContentFeatures::unknown("unknown"));
        }
        self.by_name.insert(f.name.clone(), id);
        self.features[idx] = f;
    }

    /// Features for `id`; unknown ids read as opaque solid content.
    #[inline]
    pub fn get(&self, id: ContentId) -> &ContentFeatures {
        self.features.get(id as usize).unwrap_or(&self.fallback)
    }

    pub fn id_by_name(&self, name: &str) -> Option<ContentId> {
        self.by_name.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, Box<dyn Error>> {
        let text = fs::read_to_string(path)?;
        let cfg: ContentConfig = toml::from_str(&text)?;
        Self::from_config(cfg)
    }

    pub fn from_config(cfg: ContentConfig) -> Result<Self, Box<dyn Error>> {
        let mut reg = Self::empty();
        for def in &cfg.content {
            if def.id == CONTENT_IGNORE || def.id == CONTENT_AIR {
                return Err(format!("content '{}' uses reserved id {}", def.name, def.id).into());
            }
            if reg.by_name.contains_key(&def.name) {
                return Err(format!("duplicate content name '{}'", def.name).into());
            }
            if reg.features.get(def.id as usize).is_some_and(|f| f.name != "unknown") {
                return Err(format!("duplicate content id {}", def.id).into());
            }
            reg.insert(def.id, compile_def(def));
        }
        // Second pass: liquid pairs may reference content declared later.
        for def in &cfg.content {
            let Some(kind) = def.liquid else { continue };
            if kind == LiquidCfg::None {
                continue;
            }
            let resolve = |name: &Option<String>, what: &str| -> Result<ContentId, Box<dyn Error>> {
                let name = name
                    .as_deref()
                    .ok_or_else(|| format!("liquid '{}' is missing {what}", def.name))?;
                reg.id_by_name(name)
                    .ok_or_else(|| format!("liquid '{}' references unknown '{name}'", def.name).into())
            };
            let source = resolve(&def.liquid_alternative_source, "liquid_alternative_source")?;
            let flowing = resolve(&def.liquid_alternative_flowing, "liquid_alternative_flowing")?;
            if reg.get(source).liquid_type != LiquidType::Source {
                return Err(format!("'{}' alternative source is not a source", def.name).into());
            }
            if reg.get(flowing).liquid_type != LiquidType::Flowing {
                return Err(format!("'{}' alternative flowing is not flowing", def.name).into());
            }
            let f = &mut reg.features[def.id as usize];
            f.liquid_alternative_source = source;
            f.liquid_alternative_flowing = flowing;
        }
        log::debug!(target: "content", "content table: {} entries", reg.len());
        Ok(reg)
    }

    /// Table used when no content file is given.
    pub fn builtin() -> Self {
        let mut reg = Self::empty();
        let solid = |name: &str| ContentFeatures {
            solid: true,
            ..ContentFeatures::unknown(name)
        };
        let clear = |name: &str| ContentFeatures {
            solid: true,
            light_propagates: true,
            sunlight_propagates: true,
            ..ContentFeatures::unknown(name)
        };
        reg.insert(0, solid("stone"));
        reg.insert(1, solid("grass"));
        reg.insert(2, solid("dirt"));
        reg.insert(3, clear("glass"));
        reg.insert(
            4,
            ContentFeatures {
                solid: false,
                light_source: LIGHT_MAX - 1,
                ..clear("torch")
            },
        );
        let liquid = |name: &str, ty: LiquidType, visc: u8, glow: u8| ContentFeatures {
            solid: false,
            light_propagates: true,
            sunlight_propagates: false,
            light_source: glow,
            liquid_type: ty,
            liquid_viscosity: visc,
            ..ContentFeatures::unknown(name)
        };
        reg.insert(5, liquid("water_flowing", LiquidType::Flowing, 1, 0));
        reg.insert(6, liquid("water_source", LiquidType::Source, 1, 0));
        reg.insert(7, liquid("lava_flowing", LiquidType::Flowing, 7, LIGHT_MAX - 1));
        reg.insert(8, liquid("lava_source", LiquidType::Source, 7, LIGHT_MAX - 1));
        for (a, b) in [(5, 6), (7, 8)] {
            for id in [a, b] {
                reg.features[id].liquid_alternative_flowing = a as ContentId;
                reg.features[id].liquid_alternative_source = b as ContentId;
            }
        }
        reg.insert(
            9,
            ContentFeatures {
                solid: false,
                initial_metadata: Some(MetaKind::Sign),
                ..clear("sign")
            },
        );
        reg.insert(
            10,
            ContentFeatures {
                initial_metadata: Some(MetaKind::Furnace),
                ..solid("furnace")
            },
        );
        reg.insert(
            11,
            ContentFeatures {
                solid: false,
                initial_metadata: Some(MetaKind::Circuit),
                ..clear("wire")
            },
        );
        reg
    }
}

fn compile_def(def: &ContentDef) -> ContentFeatures {
    let liquid_type = match def.liquid.unwrap_or(LiquidCfg::None) {
        LiquidCfg::None => LiquidType::None,
        LiquidCfg::Source => LiquidType::Source,
        LiquidCfg::Flowing => LiquidType::Flowing,
    };
    let is_liquid = liquid_type != LiquidType::None;
    ContentFeatures {
        name: def.name.clone(),
        solid: def.solid.unwrap_or(!is_liquid),
        light_propagates: def.light_propagates.unwrap_or(is_liquid),
        sunlight_propagates: def.sunlight_propagates.unwrap_or(false),
        light_source: def.light_source.unwrap_or(0).min(LIGHT_MAX),
        liquid_type,
        liquid_alternative_flowing: CONTENT_IGNORE,
        liquid_alternative_source: CONTENT_IGNORE,
        liquid_viscosity: def.liquid_viscosity.unwrap_or(u8::from(is_liquid)),
        initial_metadata: def.initial_metadata.map(|m| match m {
            MetaCfg::Sign => MetaKind::Sign,
            MetaCfg::Furnace => MetaKind::Furnace,
            MetaCfg::Circuit => MetaKind::Circuit,
        }),
    }
}
