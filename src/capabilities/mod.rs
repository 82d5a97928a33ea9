//! Per-revision capability tables.
//!
//! A [`Capabilities`] value describes everything that differs between the
//! three wire revisions: the operator vocabulary, the embedded GML dialect,
//! identifier style and the handful of element and attribute names that were
//! renamed between revisions. The encoder and decoder are written once and
//! read every revision-specific decision from the table they are built with.

mod document;

use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::error::FilterError;
use crate::gml::GmlDialect;
use crate::model::{ArithmeticOp, ComparisonOp, SpatialOp, TemporalOp};

pub const OGC_NS: &str = "http://www.opengis.net/ogc";
pub const FES_NS: &str = "http://www.opengis.net/fes/2.0";

/// A supported wire revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Version {
    #[serde(rename = "1.0.0")]
    V1_0_0,
    #[serde(rename = "1.1.0")]
    V1_1_0,
    #[serde(rename = "2.0.0")]
    V2_0_0,
}

impl Version {
    pub const ALL: [Version; 3] = [Version::V1_0_0, Version::V1_1_0, Version::V2_0_0];

    pub fn token(self) -> &'static str {
        match self {
            Version::V1_0_0 => "1.0.0",
            Version::V1_1_0 => "1.1.0",
            Version::V2_0_0 => "2.0.0",
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl FromStr for Version {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Version::ALL
            .into_iter()
            .find(|v| v.token() == s.trim())
            .ok_or_else(|| FilterError::UnsupportedVersion(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OperatorKind {
    Logical,
    Comparison,
    Spatial,
    Distance,
    Temporal,
    Arithmetic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Arity {
    Exactly(usize),
    AtLeast(usize),
    Between(usize, usize),
}

impl Arity {
    pub fn accepts(self, count: usize) -> bool {
        match self {
            Arity::Exactly(n) => count == n,
            Arity::AtLeast(n) => count >= n,
            Arity::Between(min, max) => (min..=max).contains(&count),
        }
    }
}

/// One entry of a revision's operator table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OperatorDescriptor {
    pub name: &'static str,
    pub kind: OperatorKind,
    pub arity: Arity,
    pub constraints: Vec<&'static str>,
}

impl OperatorDescriptor {
    fn new(name: &'static str, kind: OperatorKind, arity: Arity) -> Self {
        OperatorDescriptor {
            name,
            kind,
            arity,
            constraints: Vec::new(),
        }
    }

    fn with(mut self, constraint: &'static str) -> Self {
        self.constraints.push(constraint);
        self
    }
}

/// Element and attribute carrying an identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IdStyle {
    pub element: &'static str,
    pub attribute: &'static str,
    /// Also accept `GmlObjectId gml:id="..."` on decode.
    pub gml_object_id: bool,
}

/// Attribute names of `PropertyIsLike`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LikeAttributes {
    pub wildcard: &'static str,
    pub single_char: &'static str,
    pub escape: &'static str,
}

/// How arithmetic expressions are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArithmeticStyle {
    /// Dedicated `Add`/`Sub`/`Mul`/`Div` elements.
    Elements,
    /// `Function name="Add"` and friends.
    Functions,
}

/// Shape of the `Filter_Capabilities` document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentLayout {
    /// Empty marker elements per operator (`<Spatial_Operators><BBOX/>`).
    Markers,
    /// Named operator lists with geometry operands.
    NamedOperators,
    /// Conformance constraints plus named operator lists.
    Conformance,
}

/// Read-only description of one wire revision.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Capabilities {
    pub version: Version,
    pub namespace: &'static str,
    pub gml: GmlDialect,
    operators: Vec<OperatorDescriptor>,
    pub id_style: IdStyle,
    /// Identifier predicates may appear as boolean leaves.
    pub id_tree: bool,
    pub property_element: &'static str,
    pub distance_units_attribute: &'static str,
    pub like: LikeAttributes,
    pub match_case: bool,
    pub match_action: bool,
    pub arithmetic: ArithmeticStyle,
    /// Literal text that parses as a decimal decodes to a number.
    pub sniff_numbers: bool,
    /// Property paths resolve `prefix:name` through a namespace mapping.
    pub resolve_prefixes: bool,
    pub sort_by: bool,
    /// `BBOX` may omit its property operand.
    pub optional_bbox_property: bool,
    /// Temporal literals are written as GML time objects.
    pub time_objects: bool,
    pub layout: DocumentLayout,
}

fn scalar_operators(include_nil: bool) -> Vec<OperatorDescriptor> {
    use OperatorKind::*;

    let mut ops = vec![
        OperatorDescriptor::new("And", Logical, Arity::AtLeast(1)),
        OperatorDescriptor::new("Or", Logical, Arity::AtLeast(1)),
        OperatorDescriptor::new("Not", Logical, Arity::Exactly(1)),
    ];
    ops.extend(
        ComparisonOp::ALL
            .into_iter()
            .map(|op| OperatorDescriptor::new(op.element_name(), Comparison, Arity::Exactly(2))),
    );
    ops.push(OperatorDescriptor::new("PropertyIsBetween", Comparison, Arity::Exactly(3)));
    ops.push(
        OperatorDescriptor::new("PropertyIsLike", Comparison, Arity::Exactly(2))
            .with("first operand is a property reference")
            .with("second operand is a literal pattern"),
    );
    ops.push(OperatorDescriptor::new("PropertyIsNull", Comparison, Arity::Exactly(1)));
    if include_nil {
        ops.push(OperatorDescriptor::new("PropertyIsNil", Comparison, Arity::Exactly(1)));
    }
    ops.extend(
        ArithmeticOp::ALL
            .into_iter()
            .map(|op| OperatorDescriptor::new(op.name(), Arithmetic, Arity::Exactly(2))),
    );
    ops
}

fn spatial_operators(optional_bbox_property: bool) -> Vec<OperatorDescriptor> {
    use OperatorKind::*;

    let bbox_arity = if optional_bbox_property {
        Arity::Between(1, 2)
    } else {
        Arity::Exactly(2)
    };
    let mut ops = vec![
        OperatorDescriptor::new("BBOX", Spatial, bbox_arity)
            .with("one operand is a property reference")
            .with("envelope operand is two dimensional"),
    ];
    ops.extend(SpatialOp::ALL.into_iter().map(|op| {
        OperatorDescriptor::new(op.element_name(), Spatial, Arity::Exactly(2))
            .with("exactly one operand is a property reference")
    }));
    for name in ["DWithin", "Beyond"] {
        ops.push(
            OperatorDescriptor::new(name, Distance, Arity::Exactly(2))
                .with("exactly one operand is a property reference")
                .with("carries a distance with units"),
        );
    }
    ops
}

fn temporal_operators() -> Vec<OperatorDescriptor> {
    TemporalOp::ALL
        .into_iter()
        .map(|op| {
            OperatorDescriptor::new(op.element_name(), OperatorKind::Temporal, Arity::Exactly(2))
                .with("exactly one operand is a property reference")
        })
        .collect()
}

impl Capabilities {
    /// Filter Encoding 1.0.0 with GML 2.
    pub fn filter_1_0() -> Self {
        let mut operators = scalar_operators(false);
        operators.extend(spatial_operators(false));
        Capabilities {
            version: Version::V1_0_0,
            namespace: OGC_NS,
            gml: GmlDialect::Gml2,
            operators,
            id_style: IdStyle {
                element: "FeatureId",
                attribute: "fid",
                gml_object_id: false,
            },
            id_tree: true,
            property_element: "PropertyName",
            distance_units_attribute: "units",
            like: LikeAttributes {
                wildcard: "wildCard",
                single_char: "singleChar",
                escape: "escape",
            },
            match_case: false,
            match_action: false,
            arithmetic: ArithmeticStyle::Elements,
            sniff_numbers: false,
            resolve_prefixes: false,
            sort_by: false,
            optional_bbox_property: false,
            time_objects: false,
            layout: DocumentLayout::Markers,
        }
    }

    /// Filter Encoding 1.1.0 with GML 3.1.
    pub fn filter_1_1() -> Self {
        let mut operators = scalar_operators(false);
        operators.extend(spatial_operators(false));
        Capabilities {
            version: Version::V1_1_0,
            namespace: OGC_NS,
            gml: GmlDialect::Gml31,
            operators,
            id_style: IdStyle {
                element: "FeatureId",
                attribute: "fid",
                gml_object_id: true,
            },
            id_tree: false,
            property_element: "PropertyName",
            distance_units_attribute: "units",
            like: LikeAttributes {
                wildcard: "wildCard",
                single_char: "singleChar",
                escape: "escapeChar",
            },
            match_case: true,
            match_action: false,
            arithmetic: ArithmeticStyle::Elements,
            sniff_numbers: false,
            resolve_prefixes: false,
            sort_by: true,
            optional_bbox_property: false,
            time_objects: false,
            layout: DocumentLayout::NamedOperators,
        }
    }

    /// Filter Encoding 2.0.0 with GML 3.2.
    pub fn filter_2_0() -> Self {
        let mut operators: Vec<_> = scalar_operators(true)
            .into_iter()
            .filter(|op| op.kind != OperatorKind::Arithmetic)
            .collect();
        operators.extend(spatial_operators(true));
        operators.extend(temporal_operators());
        Capabilities {
            version: Version::V2_0_0,
            namespace: FES_NS,
            gml: GmlDialect::Gml32,
            operators,
            id_style: IdStyle {
                element: "ResourceId",
                attribute: "rid",
                gml_object_id: false,
            },
            id_tree: false,
            property_element: "ValueReference",
            distance_units_attribute: "uom",
            like: LikeAttributes {
                wildcard: "wildCard",
                single_char: "singleChar",
                escape: "escapeChar",
            },
            match_case: true,
            match_action: true,
            arithmetic: ArithmeticStyle::Functions,
            sniff_numbers: true,
            resolve_prefixes: true,
            sort_by: true,
            optional_bbox_property: true,
            time_objects: true,
            layout: DocumentLayout::Conformance,
        }
    }

    pub fn operators(&self) -> &[OperatorDescriptor] {
        &self.operators
    }

    pub fn operator(&self, name: &str) -> Option<&OperatorDescriptor> {
        self.operators.iter().find(|op| op.name == name)
    }

    pub fn supports(&self, name: &str) -> bool {
        self.operator(name).is_some()
    }

    fn names_of(&self, kinds: &[OperatorKind]) -> Vec<&'static str> {
        self.operators
            .iter()
            .filter(|op| kinds.contains(&op.kind))
            .map(|op| op.name)
            .collect()
    }

    /// Spatial operator names, `BBOX` and the distance operators included.
    pub fn spatial_operators(&self) -> Vec<&'static str> {
        self.names_of(&[OperatorKind::Spatial, OperatorKind::Distance])
    }

    pub fn comparison_operators(&self) -> Vec<&'static str> {
        self.names_of(&[OperatorKind::Comparison])
    }

    pub fn temporal_operators(&self) -> Vec<&'static str> {
        self.names_of(&[OperatorKind::Temporal])
    }

    /// Geometry operand kinds of the embedded GML dialect.
    pub fn geometry_operands(&self) -> Vec<String> {
        self.gml.geometry_operands()
    }

    pub fn supports_id_tree(&self) -> bool {
        self.id_tree
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_tokens() {
        assert_eq!("1.1.0".parse::<Version>().unwrap(), Version::V1_1_0);
        assert_eq!(Version::V2_0_0.to_string(), "2.0.0");
        assert!(matches!(
            "3.0.0".parse::<Version>(),
            Err(FilterError::UnsupportedVersion(v)) if v == "3.0.0"
        ));
    }

    #[test]
    fn only_the_first_revision_has_id_trees() {
        assert!(Capabilities::filter_1_0().supports_id_tree());
        assert!(!Capabilities::filter_1_1().supports_id_tree());
        assert!(!Capabilities::filter_2_0().supports_id_tree());
    }

    #[test]
    fn temporal_operators_only_in_2_0() {
        assert!(Capabilities::filter_1_0().temporal_operators().is_empty());
        assert!(Capabilities::filter_1_1().temporal_operators().is_empty());
        let caps = Capabilities::filter_2_0();
        assert_eq!(caps.temporal_operators().len(), 14);
        assert!(caps.supports("During"));
        assert!(!caps.supports("Add"));
    }

    #[test]
    fn spatial_tables() {
        let caps = Capabilities::filter_1_0();
        let spatial = caps.spatial_operators();
        assert_eq!(spatial.len(), 11);
        assert!(spatial.contains(&"BBOX"));
        assert!(spatial.contains(&"DWithin"));
        assert_eq!(caps.operator("BBOX").map(|op| op.arity), Some(Arity::Exactly(2)));

        let caps = Capabilities::filter_2_0();
        let bbox = caps.operator("BBOX").unwrap();
        assert!(bbox.arity.accepts(1));
        assert!(caps.geometry_operands().contains(&"gml:Envelope".to_string()));
        assert!(Capabilities::filter_1_0()
            .geometry_operands()
            .contains(&"gml:Box".to_string()));
    }
}
