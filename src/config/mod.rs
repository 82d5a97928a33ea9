use anyhow::{Context, bail};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use fescodec::{BuiltinCrsRegistry, CodecOptions, Crs, CrsDefinition, NestedIdPolicy, Version};

/// Codec settings from an optional YAML file and `FESCODEC_*` variables.
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct CodecConfig {
    pub default_version: String,
    pub nested_ids: NestedIdPolicy,
    pub id_property: String,
    /// Preferred prefix → namespace URI bindings.
    pub namespaces: BTreeMap<String, String>,
    /// Extra CRS definitions on top of the built-in registry.
    pub crs: Vec<CrsConfig>,
}

impl Default for CodecConfig {
    fn default() -> Self {
        CodecConfig {
            default_version: Version::V2_0_0.to_string(),
            nested_ids: NestedIdPolicy::Rewrite,
            id_property: fescodec::codec::DEFAULT_ID_PROPERTY.to_string(),
            namespaces: BTreeMap::new(),
            crs: Vec::new(),
        }
    }
}

impl CodecConfig {
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut builder = ::config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(::config::File::from(path));
        }
        let settings = builder
            .add_source(::config::Environment::with_prefix("FESCODEC"))
            .build()?;
        Ok(settings.try_deserialize()?)
    }

    pub fn default_version(&self) -> anyhow::Result<Version> {
        self.default_version
            .parse()
            .with_context(|| format!("Config: invalid default_version '{}'", self.default_version))
    }

    pub fn options(&self) -> CodecOptions {
        CodecOptions {
            nested_ids: self.nested_ids,
            id_property: self.id_property.clone(),
            namespaces: self.namespaces.clone(),
        }
    }

    pub fn registry(&self) -> anyhow::Result<BuiltinCrsRegistry> {
        let mut registry = BuiltinCrsRegistry::new();
        for entry in &self.crs {
            registry.register(entry.definition()?);
        }
        Ok(registry)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CrsConfig {
    pub identifier: String,
    #[serde(default = "default_dimension")]
    pub dimension: usize,
    /// Horizontal component of a 3D or compound CRS.
    #[serde(default)]
    pub horizontal: Option<String>,
    /// Index of the first horizontal axis.
    #[serde(default)]
    pub axis_offset: usize,
    #[serde(default)]
    pub urn: Option<String>,
}

fn default_dimension() -> usize {
    2
}

impl CrsConfig {
    pub fn definition(&self) -> anyhow::Result<CrsDefinition> {
        let crs = Crs::parse(&self.identifier);
        let mut definition = match &self.horizontal {
            Some(horizontal) => {
                if self.axis_offset + 1 >= self.dimension {
                    bail!(
                        "Config: axis_offset {} leaves no room for two horizontal axes in {}",
                        self.axis_offset,
                        self.identifier
                    );
                }
                CrsDefinition::with_horizontal(crs, self.dimension, Crs::parse(horizontal), self.axis_offset)
            }
            None if self.dimension == 2 => CrsDefinition::horizontal(crs),
            None => CrsDefinition::without_horizontal(crs, self.dimension),
        };
        if let Some(urn) = &self.urn {
            definition.urn = Some(urn.clone());
        }
        Ok(definition)
    }
}
