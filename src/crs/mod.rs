//! Coordinate reference system identifiers and lookups.
//!
//! The codec never reasons about CRS semantics itself. It asks a
//! [`CrsRegistry`] for wire names (`lookup_urn`, `lookup_identifier`) and for
//! the horizontal axes of multi-dimensional envelopes
//! (`horizontal_component`, `axis_index_of`).

mod parse;

pub use parse::parse_srs_name;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// A CRS identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Crs {
    /// Authority code, e.g. `EPSG:4326`.
    Code { authority: String, code: String },
    /// A name that is not an authority code.
    Named(String),
}

impl Crs {
    pub fn code(authority: impl Into<String>, code: impl Into<String>) -> Self {
        Crs::Code {
            authority: authority.into(),
            code: code.into(),
        }
    }

    pub fn epsg(code: u32) -> Self {
        Crs::code("EPSG", code.to_string())
    }

    /// Parse any supported SRS name form; never fails.
    pub fn parse(value: &str) -> Self {
        parse_srs_name(value)
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Crs::Code { authority, code } => write!(f, "{}:{}", authority, code),
            Crs::Named(name) => f.write_str(name),
        }
    }
}

impl From<String> for Crs {
    fn from(value: String) -> Self {
        Crs::parse(&value)
    }
}

impl From<&str> for Crs {
    fn from(value: &str) -> Self {
        Crs::parse(value)
    }
}

impl From<Crs> for String {
    fn from(value: Crs) -> Self {
        value.to_string()
    }
}

/// CRS lookups the codec depends on. Implementations must be side-effect free.
pub trait CrsRegistry: Send + Sync {
    /// OGC URN for `crs`, if known.
    fn lookup_urn(&self, crs: &Crs) -> Option<String>;

    /// Short identifier (`AUTH:code`) for `crs`, if any.
    fn lookup_identifier(&self, crs: &Crs) -> Option<String>;

    /// The 2D horizontal CRS embedded in `crs`.
    fn horizontal_component(&self, crs: &Crs) -> Option<Crs>;

    /// Index of the first axis of `horizontal` within `crs`.
    fn axis_index_of(&self, crs: &Crs, horizontal: &Crs) -> Option<usize>;
}

/// Shape of a registered CRS.
#[derive(Debug, Clone, PartialEq)]
pub struct CrsDefinition {
    pub crs: Crs,
    pub dimension: usize,
    /// Horizontal component and the index of its first axis. `None` for
    /// vertical or geocentric systems.
    pub horizontal: Option<(Crs, usize)>,
    pub urn: Option<String>,
}

impl CrsDefinition {
    /// A 2D horizontal CRS with the standard OGC URN.
    pub fn horizontal(crs: Crs) -> Self {
        let urn = default_urn(&crs);
        CrsDefinition {
            horizontal: Some((crs.clone(), 0)),
            crs,
            dimension: 2,
            urn,
        }
    }

    /// A CRS whose horizontal component starts at `axis`.
    pub fn with_horizontal(crs: Crs, dimension: usize, horizontal: Crs, axis: usize) -> Self {
        let urn = default_urn(&crs);
        CrsDefinition {
            crs,
            dimension,
            horizontal: Some((horizontal, axis)),
            urn,
        }
    }

    /// A CRS without horizontal axes.
    pub fn without_horizontal(crs: Crs, dimension: usize) -> Self {
        let urn = default_urn(&crs);
        CrsDefinition {
            crs,
            dimension,
            horizontal: None,
            urn,
        }
    }
}

fn default_urn(crs: &Crs) -> Option<String> {
    match crs {
        Crs::Code { authority, code } if authority == "OGC" => {
            Some(format!("urn:ogc:def:crs:OGC:1.3:{}", code))
        }
        Crs::Code { authority, code } => Some(format!("urn:ogc:def:crs:{}::{}", authority, code)),
        Crs::Named(_) => None,
    }
}

/// In-memory registry seeded with common EPSG/OGC definitions.
#[derive(Debug, Clone)]
pub struct BuiltinCrsRegistry {
    definitions: HashMap<Crs, CrsDefinition>,
}

impl Default for BuiltinCrsRegistry {
    fn default() -> Self {
        let mut registry = BuiltinCrsRegistry {
            definitions: HashMap::new(),
        };
        for code in [4326, 4258, 4269, 3857, 3395, 2154, 25832, 27700, 28992, 32631] {
            registry.register(CrsDefinition::horizontal(Crs::epsg(code)));
        }
        registry.register(CrsDefinition::horizontal(Crs::code("OGC", "CRS84")));
        // Geographic 3D
        registry.register(CrsDefinition::with_horizontal(Crs::epsg(4979), 3, Crs::epsg(4326), 0));
        registry.register(CrsDefinition::with_horizontal(Crs::epsg(4937), 3, Crs::epsg(4258), 0));
        registry.register(CrsDefinition::with_horizontal(
            Crs::code("OGC", "CRS84h"),
            3,
            Crs::code("OGC", "CRS84"),
            0,
        ));
        // Compound: Amersfoort / RD New + NAP height
        registry.register(CrsDefinition::with_horizontal(Crs::epsg(7415), 3, Crs::epsg(28992), 0));
        // Vertical and geocentric
        registry.register(CrsDefinition::without_horizontal(Crs::epsg(5709), 1));
        registry.register(CrsDefinition::without_horizontal(Crs::epsg(4978), 3));
        registry
    }
}

impl BuiltinCrsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a definition.
    pub fn register(&mut self, definition: CrsDefinition) {
        self.definitions.insert(definition.crs.clone(), definition);
    }

    pub fn definition(&self, crs: &Crs) -> Option<&CrsDefinition> {
        self.definitions.get(crs)
    }
}

impl CrsRegistry for BuiltinCrsRegistry {
    fn lookup_urn(&self, crs: &Crs) -> Option<String> {
        self.definitions.get(crs).and_then(|def| def.urn.clone())
    }

    fn lookup_identifier(&self, crs: &Crs) -> Option<String> {
        match crs {
            Crs::Code { .. } => Some(crs.to_string()),
            Crs::Named(name) if !name.trim().is_empty() => Some(name.clone()),
            Crs::Named(_) => None,
        }
    }

    fn horizontal_component(&self, crs: &Crs) -> Option<Crs> {
        let def = self.definitions.get(crs)?;
        def.horizontal.as_ref().map(|(horizontal, _)| horizontal.clone())
    }

    fn axis_index_of(&self, crs: &Crs, horizontal: &Crs) -> Option<usize> {
        if crs == horizontal {
            return Some(0);
        }
        let def = self.definitions.get(crs)?;
        match &def.horizontal {
            Some((h, axis)) if h == horizontal => Some(*axis),
            _ => None,
        }
    }
}
