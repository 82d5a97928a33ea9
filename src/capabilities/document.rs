//! `Filter_Capabilities` rendering.

use super::{Capabilities, DocumentLayout, OperatorKind};
use crate::tree::Element;

pub const OWS_NS: &str = "http://www.opengis.net/ows/1.1";

/// Names used by 1.1 `ComparisonOperator` text content.
fn short_comparison_name(name: &str) -> Option<&'static str> {
    Some(match name {
        "PropertyIsEqualTo" => "EqualTo",
        "PropertyIsNotEqualTo" => "NotEqualTo",
        "PropertyIsLessThan" => "LessThan",
        "PropertyIsGreaterThan" => "GreaterThan",
        "PropertyIsLessThanOrEqualTo" => "LessThanEqualTo",
        "PropertyIsGreaterThanOrEqualTo" => "GreaterThanEqualTo",
        "PropertyIsLike" => "Like",
        "PropertyIsBetween" => "Between",
        "PropertyIsNull" => "NullCheck",
        _ => return None,
    })
}

impl Capabilities {
    /// Render this revision's `Filter_Capabilities` element.
    pub fn to_element(&self) -> Element {
        match self.layout {
            DocumentLayout::Markers => self.markers_document(),
            DocumentLayout::NamedOperators => self.named_document(),
            DocumentLayout::Conformance => self.conformance_document(),
        }
    }

    fn el(&self, name: &str) -> Element {
        Element::new(self.namespace, name)
    }

    fn markers_document(&self) -> Element {
        let spatial = self.el("Spatial_Capabilities").with_child(
            self.el("Spatial_Operators")
                .with_children(self.spatial_operators().into_iter().map(|name| self.el(name))),
        );

        let comparisons = self.comparison_operators();
        let mut comparison = self.el("Comparison_Operators").with_child(self.el("Simple_Comparisons"));
        for (operator, marker) in [
            ("PropertyIsLike", "Like"),
            ("PropertyIsBetween", "Between"),
            ("PropertyIsNull", "NullCheck"),
        ] {
            if comparisons.contains(&operator) {
                comparison = comparison.with_child(self.el(marker));
            }
        }

        let scalar = self
            .el("Scalar_Capabilities")
            .with_child(self.el("Logical_Operators"))
            .with_child(comparison)
            .with_child(
                self.el("Arithmetic_Operators")
                    .with_child(self.el("Simple_Arithmetic")),
            );

        self.el("Filter_Capabilities")
            .with_child(spatial)
            .with_child(scalar)
    }

    fn named_document(&self) -> Element {
        let operands = self.el("GeometryOperands").with_children(
            self.geometry_operands()
                .into_iter()
                .map(|operand| self.el("GeometryOperand").with_text(operand)),
        );
        let operators = self.el("SpatialOperators").with_children(
            self.spatial_operators()
                .into_iter()
                .map(|name| self.el("SpatialOperator").with_attr("name", name)),
        );
        let spatial = self
            .el("Spatial_Capabilities")
            .with_child(operands)
            .with_child(operators);

        let comparison = self.el("ComparisonOperators").with_children(
            self.comparison_operators()
                .into_iter()
                .filter_map(short_comparison_name)
                .map(|name| self.el("ComparisonOperator").with_text(name)),
        );
        let scalar = self
            .el("Scalar_Capabilities")
            .with_child(self.el("LogicalOperators"))
            .with_child(comparison)
            .with_child(self.el("ArithmeticOperators").with_child(self.el("SimpleArithmetic")));

        let ids = self
            .el("Id_Capabilities")
            .with_child(self.el("EID"))
            .with_child(self.el("FID"));

        self.el("Filter_Capabilities")
            .with_child(spatial)
            .with_child(scalar)
            .with_child(ids)
    }

    fn conformance_document(&self) -> Element {
        let has = |kind: OperatorKind| self.operators.iter().any(|op| op.kind == kind);
        let constraints = [
            ("ImplementsQuery", true),
            ("ImplementsAdHocQuery", true),
            ("ImplementsFunctions", true),
            ("ImplementsResourceId", true),
            ("ImplementsMinStandardFilter", true),
            ("ImplementsStandardFilter", true),
            ("ImplementsMinSpatialFilter", has(OperatorKind::Spatial)),
            ("ImplementsSpatialFilter", has(OperatorKind::Spatial)),
            ("ImplementsMinTemporalFilter", has(OperatorKind::Temporal)),
            ("ImplementsTemporalFilter", has(OperatorKind::Temporal)),
            ("ImplementsVersionNav", false),
            ("ImplementsSorting", self.sort_by),
            ("ImplementsExtendedOperators", false),
            ("ImplementsMinimumXPath", true),
            ("ImplementsSchemaElementFunc", false),
        ];
        let conformance = self.el("Conformance").with_children(constraints.into_iter().map(|(name, value)| {
            self.el("Constraint")
                .with_attr("name", name)
                .with_child(Element::new(OWS_NS, "NoValues"))
                .with_child(Element::new(OWS_NS, "DefaultValue").with_text(if value { "TRUE" } else { "FALSE" }))
        }));

        let ids = self.el("Id_Capabilities").with_child(
            self.el("ResourceIdentifier")
                .with_attr("name", format!("fes:{}", self.id_style.element)),
        );

        let scalar = self
            .el("Scalar_Capabilities")
            .with_child(self.el("LogicalOperators"))
            .with_child(
                self.el("ComparisonOperators").with_children(
                    self.comparison_operators()
                        .into_iter()
                        .map(|name| self.el("ComparisonOperator").with_attr("name", name)),
                ),
            );

        let spatial = self
            .el("Spatial_Capabilities")
            .with_child(
                self.el("GeometryOperands").with_children(
                    self.geometry_operands()
                        .into_iter()
                        .map(|operand| self.el("GeometryOperand").with_attr("name", operand)),
                ),
            )
            .with_child(
                self.el("SpatialOperators").with_children(
                    self.spatial_operators()
                        .into_iter()
                        .map(|name| self.el("SpatialOperator").with_attr("name", name)),
                ),
            );

        let temporal = self
            .el("Temporal_Capabilities")
            .with_child(
                self.el("TemporalOperands")
                    .with_child(self.el("TemporalOperand").with_attr("name", "gml:TimeInstant"))
                    .with_child(self.el("TemporalOperand").with_attr("name", "gml:TimePeriod")),
            )
            .with_child(
                self.el("TemporalOperators").with_children(
                    self.temporal_operators()
                        .into_iter()
                        .map(|name| self.el("TemporalOperator").with_attr("name", name)),
                ),
            );

        let functions = self.el("Functions").with_children(
            crate::model::ArithmeticOp::ALL.into_iter().map(|op| {
                let arguments = self.el("Arguments").with_children(["left", "right"].into_iter().map(|arg| {
                    self.el("Argument")
                        .with_attr("name", arg)
                        .with_child(self.el("Type").with_text("xs:double"))
                }));
                self.el("Function")
                    .with_attr("name", op.name())
                    .with_child(self.el("Returns").with_text("xs:double"))
                    .with_child(arguments)
            }),
        );

        self.el("Filter_Capabilities")
            .with_child(conformance)
            .with_child(ids)
            .with_child(scalar)
            .with_child(spatial)
            .with_child(temporal)
            .with_child(functions)
    }
}
