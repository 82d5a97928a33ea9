//! Version dispatch.
//!
//! [`FilterCodecs`] owns the three capability tables and is the only place
//! that maps a version to a table. Everything it hands out is parameterized
//! by the table it was given.

use std::sync::Arc;

use super::{CodecOptions, Decoder, Encoder};
use crate::capabilities::{Capabilities, Version};
use crate::crs::{BuiltinCrsRegistry, Crs, CrsRegistry};
use crate::error::Result;
use crate::model::{Expression, Filter, IdSet, Literal};
use crate::tree::{Element, NamespaceMap};

pub struct FilterCodecs {
    filter_1_0: Capabilities,
    filter_1_1: Capabilities,
    filter_2_0: Capabilities,
    options: CodecOptions,
    registry: Arc<dyn CrsRegistry>,
}

impl Default for FilterCodecs {
    fn default() -> Self {
        FilterCodecs::new(CodecOptions::default(), Arc::new(BuiltinCrsRegistry::new()))
    }
}

impl FilterCodecs {
    pub fn new(options: CodecOptions, registry: Arc<dyn CrsRegistry>) -> Self {
        FilterCodecs {
            filter_1_0: Capabilities::filter_1_0(),
            filter_1_1: Capabilities::filter_1_1(),
            filter_2_0: Capabilities::filter_2_0(),
            options,
            registry,
        }
    }

    pub fn options(&self) -> &CodecOptions {
        &self.options
    }

    pub fn capabilities_for(&self, version: Version) -> &Capabilities {
        match version {
            Version::V1_0_0 => &self.filter_1_0,
            Version::V1_1_0 => &self.filter_1_1,
            Version::V2_0_0 => &self.filter_2_0,
        }
    }

    /// Codec for a version token such as `"1.1.0"`.
    pub fn for_version(&self, token: &str) -> Result<VersionCodec<'_>> {
        let version: Version = token.parse()?;
        Ok(self.codec(version))
    }

    pub fn codec(&self, version: Version) -> VersionCodec<'_> {
        VersionCodec {
            caps: self.capabilities_for(version),
            options: &self.options,
            registry: self.registry.as_ref(),
        }
    }

    pub fn encode(&self, token: &str, filter: &Filter) -> Result<Element> {
        self.for_version(token)?.encoder().encode(filter)
    }

    pub fn decode(&self, token: &str, root: &Element, namespaces: Option<&NamespaceMap>) -> Result<Filter> {
        self.for_version(token)?.decoder().decode(root, namespaces)
    }
}

/// Encoder, decoder and element builders for one revision.
#[derive(Clone, Copy)]
pub struct VersionCodec<'a> {
    caps: &'a Capabilities,
    options: &'a CodecOptions,
    registry: &'a dyn CrsRegistry,
}

impl<'a> VersionCodec<'a> {
    pub fn version(&self) -> Version {
        self.caps.version
    }

    pub fn capabilities(&self) -> &'a Capabilities {
        self.caps
    }

    pub fn encoder(&self) -> Encoder<'a> {
        Encoder::new(self.caps, self.options, self.registry)
    }

    pub fn decoder(&self) -> Decoder<'a> {
        Decoder::new(self.caps)
    }

    /// A root `Filter` with no predicate.
    pub fn empty_filter(&self) -> Element {
        Element::new(self.caps.namespace, "Filter")
    }

    pub fn literal(&self, literal: &Literal) -> Result<Element> {
        self.encoder()
            .encode_expression(&Expression::Literal(literal.clone()))
    }

    pub fn and(&self, operands: Vec<Element>) -> Element {
        Element::new(self.caps.namespace, "And").with_children(operands)
    }

    pub fn or(&self, operands: Vec<Element>) -> Element {
        Element::new(self.caps.namespace, "Or").with_children(operands)
    }

    pub fn bbox(
        &self,
        property: &str,
        min_x: f64,
        min_y: f64,
        max_x: f64,
        max_y: f64,
        crs: Option<Crs>,
    ) -> Result<Element> {
        self.encoder()
            .encode_predicate(&Filter::bbox(property, min_x, min_y, max_x, max_y, crs))
    }

    /// A root `Filter` listing `ids` in the revision's identifier style.
    pub fn id_predicate(&self, ids: &IdSet) -> Result<Element> {
        self.encoder().encode(&Filter::Id(ids.clone()))
    }
}
