//! Element tree → filter model.

use tracing::debug;

use crate::capabilities::{ArithmeticStyle, Capabilities};
use crate::error::{FilterError, Result};
use crate::gml;
use crate::model::{
    ArithmeticOp, BBox, Between, Comparison, ComparisonOp, DistanceOp, Expression, Filter, IdSet,
    IsNil, Like, Literal, MatchAction, PropertyName, SortBy, SortProperty, SpatialBinary,
    SpatialDistance, SpatialOp, Temporal, TemporalOp,
};
use crate::tree::{Element, NamespaceMap};
use crate::utils::{parse_decimal, split_qname};

/// Decodes element trees of one revision.
#[derive(Debug, Clone, Copy)]
pub struct Decoder<'a> {
    caps: &'a Capabilities,
}

impl<'a> Decoder<'a> {
    pub fn new(caps: &'a Capabilities) -> Self {
        Decoder { caps }
    }

    pub fn capabilities(&self) -> &'a Capabilities {
        self.caps
    }

    /// Decode a root `Filter` element. Prefixes in property paths resolve
    /// through `namespaces` first, then through declarations on `root`.
    pub fn decode(&self, root: &Element, namespaces: Option<&NamespaceMap>) -> Result<Filter> {
        let scope = Scope::new(self.caps, root, namespaces);
        scope.root(root)
    }

    /// Decode a single predicate element such as `PropertyIsEqualTo`.
    pub fn decode_predicate(&self, element: &Element, namespaces: Option<&NamespaceMap>) -> Result<Filter> {
        let scope = Scope::new(self.caps, element, namespaces);
        scope.predicate(element)
    }

    pub fn decode_expression(&self, element: &Element, namespaces: Option<&NamespaceMap>) -> Result<Expression> {
        let scope = Scope::new(self.caps, element, namespaces);
        scope.expression(element)
    }

    pub fn decode_sort_by(&self, element: &Element, namespaces: Option<&NamespaceMap>) -> Result<SortBy> {
        let scope = Scope::new(self.caps, element, namespaces);
        scope.sort_by(element)
    }
}

/// One decode call: the table plus the prefix mapping in effect.
struct Scope<'a> {
    caps: &'a Capabilities,
    namespaces: NamespaceMap,
}

impl<'a> Scope<'a> {
    fn new(caps: &'a Capabilities, root: &Element, supplied: Option<&NamespaceMap>) -> Self {
        let mut namespaces: NamespaceMap = root.declarations.iter().cloned().collect();
        if let Some(supplied) = supplied {
            namespaces.extend(supplied.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        Scope { caps, namespaces }
    }

    fn ns(&self) -> &'static str {
        self.caps.namespace
    }

    fn is_ours(&self, element: &Element) -> bool {
        element.in_namespace(self.ns())
    }

    fn root(&self, root: &Element) -> Result<Filter> {
        if !root.is(self.ns(), "Filter") {
            return Err(FilterError::malformed(format!(
                "expected {{{}}}Filter, found '{}'",
                self.ns(),
                root.name
            )));
        }
        if root.children.is_empty() {
            return Ok(Filter::Include);
        }
        if root.children.iter().all(|c| self.is_id(c)) {
            let ids = root
                .children
                .iter()
                .map(|c| self.id_value(c))
                .collect::<Result<Vec<_>>>()?;
            return Ok(Filter::Id(IdSet::new(ids)?));
        }
        match root.children.as_slice() {
            [only] => self.predicate(only),
            children => Err(FilterError::malformed(format!(
                "Filter has {} operator children",
                children.len()
            ))),
        }
    }

    fn is_id(&self, element: &Element) -> bool {
        let style = self.caps.id_style;
        element.is(self.ns(), style.element) || (style.gml_object_id && element.is(self.ns(), "GmlObjectId"))
    }

    fn id_value(&self, element: &Element) -> Result<String> {
        let style = self.caps.id_style;
        let value = if element.name == "GmlObjectId" {
            element.ns_attr(self.caps.gml.namespace(), "id")
        } else {
            element.attr(style.attribute)
        };
        value
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .ok_or_else(|| FilterError::malformed(format!("{} without an identifier", element.name)))
    }

    /// Operand predicates of a combinator. Runs of identifier leaves become
    /// one `Id` predicate where the revision allows identifier trees.
    fn operands(&self, element: &Element) -> Result<Vec<Filter>> {
        let mut filters = Vec::new();
        let mut run: Vec<String> = Vec::new();
        for child in &element.children {
            if self.is_id(child) {
                if !self.caps.supports_id_tree() {
                    return Err(FilterError::malformed(format!(
                        "{} is only allowed at the filter root in {}",
                        child.name, self.caps.version
                    )));
                }
                run.push(self.id_value(child)?);
                continue;
            }
            if !run.is_empty() {
                debug!("Regrouping {} identifier leaves in {}", run.len(), element.name);
                filters.push(Filter::Id(IdSet::new(std::mem::take(&mut run))?));
            }
            filters.push(self.predicate(child)?);
        }
        if !run.is_empty() {
            filters.push(Filter::Id(IdSet::new(run)?));
        }
        Ok(filters)
    }

    fn check_arity(&self, element: &Element, count: usize) -> Result<()> {
        match self.caps.operator(&element.name) {
            Some(descriptor) if descriptor.arity.accepts(count) => Ok(()),
            Some(_) => Err(FilterError::malformed(format!(
                "{} has {} operands",
                element.name, count
            ))),
            None => Err(FilterError::malformed(format!(
                "{} is not an operator of {}",
                element.name, self.caps.version
            ))),
        }
    }

    fn predicate(&self, element: &Element) -> Result<Filter> {
        if !self.is_ours(element) {
            return Err(FilterError::malformed(format!(
                "unexpected element '{}' in {:?}",
                element.name, element.namespace
            )));
        }
        let name = element.name.as_str();
        if !self.caps.supports(name) || ArithmeticOp::from_name(name).is_some() {
            return Err(FilterError::malformed(format!(
                "unknown filter element '{}' for {}",
                name, self.caps.version
            )));
        }

        if let Some(op) = ComparisonOp::from_element_name(name) {
            return self.comparison(op, element);
        }
        if let Some(op) = SpatialOp::from_element_name(name) {
            let (left, right) = self.binary_operands(element)?;
            return Ok(Filter::Spatial(SpatialBinary { op, left, right }));
        }
        if let Some(op) = DistanceOp::from_element_name(name) {
            return self.distance(op, element);
        }
        if let Some(op) = TemporalOp::from_element_name(name) {
            let (left, right) = self.binary_operands(element)?;
            return Ok(Filter::Temporal(Temporal { op, left, right }));
        }

        match name {
            "And" | "Or" => {
                let mut operands = self.operands(element)?;
                self.check_arity(element, operands.len())?;
                if operands.len() == 1 {
                    return Ok(operands.remove(0));
                }
                Ok(if name == "And" {
                    Filter::And(operands)
                } else {
                    Filter::Or(operands)
                })
            }
            "Not" => {
                let mut operands = self.operands(element)?;
                self.check_arity(element, operands.len())?;
                Ok(Filter::not(operands.remove(0)))
            }
            "PropertyIsBetween" => self.between(element),
            "PropertyIsLike" => self.like(element),
            "PropertyIsNull" => {
                self.check_arity(element, element.children.len())?;
                Ok(Filter::IsNull(self.expression(&element.children[0])?))
            }
            "PropertyIsNil" => {
                self.check_arity(element, element.children.len())?;
                Ok(Filter::IsNil(IsNil {
                    expression: self.expression(&element.children[0])?,
                    nil_reason: element.attr("nilReason").map(str::to_string),
                }))
            }
            "BBOX" => self.bbox(element),
            other => Err(FilterError::malformed(format!("unknown filter element '{}'", other))),
        }
    }

    fn comparison(&self, op: ComparisonOp, element: &Element) -> Result<Filter> {
        self.check_arity(element, element.children.len())?;
        let match_case = parse_bool(element, "matchCase")?.unwrap_or(true);
        let match_action = match element.attr("matchAction") {
            Some(value) if self.caps.match_action => MatchAction::parse(value)
                .ok_or_else(|| FilterError::malformed(format!("invalid matchAction '{}'", value)))?,
            _ => MatchAction::Any,
        };
        Ok(Filter::Comparison(Comparison {
            op,
            left: self.expression(&element.children[0])?,
            right: self.expression(&element.children[1])?,
            match_case: match_case || !self.caps.match_case,
            match_action,
        }))
    }

    fn between(&self, element: &Element) -> Result<Filter> {
        self.check_arity(element, element.children.len())?;
        let boundary = |name: &str| -> Result<Expression> {
            let wrapper = element
                .child(self.ns(), name)
                .ok_or_else(|| FilterError::malformed(format!("PropertyIsBetween without {}", name)))?;
            match wrapper.children.as_slice() {
                [expression] => self.expression(expression),
                _ => Err(FilterError::malformed(format!("{} needs one expression", name))),
            }
        };
        let expression = element
            .children
            .iter()
            .find(|c| !(c.is(self.ns(), "LowerBoundary") || c.is(self.ns(), "UpperBoundary")))
            .ok_or_else(|| FilterError::malformed("PropertyIsBetween without an expression"))?;
        Ok(Filter::Between(Between {
            expression: self.expression(expression)?,
            lower: boundary("LowerBoundary")?,
            upper: boundary("UpperBoundary")?,
        }))
    }

    fn like(&self, element: &Element) -> Result<Filter> {
        self.check_arity(element, element.children.len())?;
        let names = self.caps.like;
        let required = |attribute: &str| -> Result<String> {
            element
                .attr(attribute)
                .map(str::to_string)
                .ok_or_else(|| FilterError::malformed(format!("PropertyIsLike without {}", attribute)))
        };
        let expression = self.expression(&element.children[0])?;
        if !expression.is_property() {
            return Err(FilterError::malformed("PropertyIsLike must start with a property reference"));
        }
        let pattern = &element.children[1];
        if !pattern.is(self.ns(), "Literal") {
            return Err(FilterError::malformed("PropertyIsLike pattern must be a Literal"));
        }
        let match_case = parse_bool(element, "matchCase")?.unwrap_or(true);
        Ok(Filter::Like(Like {
            expression,
            pattern: pattern.text().to_string(),
            wildcard: required(names.wildcard)?,
            single_char: required(names.single_char)?,
            escape: required(names.escape)?,
            match_case: match_case || !self.caps.match_case,
        }))
    }

    fn distance(&self, op: DistanceOp, element: &Element) -> Result<Filter> {
        let distance = element
            .child(self.ns(), "Distance")
            .ok_or_else(|| FilterError::malformed(format!("{} without Distance", element.name)))?;
        let units = distance
            .attr(self.caps.distance_units_attribute)
            .ok_or_else(|| {
                FilterError::malformed(format!(
                    "Distance without {}",
                    self.caps.distance_units_attribute
                ))
            })?
            .to_string();
        let value = parse_decimal(distance.text())
            .ok_or_else(|| FilterError::malformed(format!("invalid distance '{}'", distance.text())))?;

        let operands: Vec<&Element> = element
            .children
            .iter()
            .filter(|c| !c.is(self.ns(), "Distance"))
            .collect();
        let (left, right) = self.ordered_pair(element, &operands)?;
        Ok(Filter::Distance(SpatialDistance {
            op,
            left,
            right,
            distance: value,
            units,
        }))
    }

    fn bbox(&self, element: &Element) -> Result<Filter> {
        self.check_arity(element, element.children.len())?;
        let (left, right) = match element.children.as_slice() {
            [only] => (None, self.operand(only)?),
            [first, second] => {
                let (left, right) = self.ordered(element, self.operand(first)?, self.operand(second)?)?;
                (Some(left), right)
            }
            _ => return Err(FilterError::malformed("BBOX needs an envelope operand")),
        };
        if !matches!(
            right,
            Expression::Literal(Literal::Envelope(_) | Literal::Geometry(_))
        ) {
            return Err(FilterError::malformed("BBOX needs an envelope or geometry operand"));
        }
        Ok(Filter::BBox(BBox { left, right }))
    }

    fn binary_operands(&self, element: &Element) -> Result<(Expression, Expression)> {
        let operands: Vec<&Element> = element.children.iter().collect();
        self.ordered_pair(element, &operands)
    }

    fn ordered_pair(&self, element: &Element, operands: &[&Element]) -> Result<(Expression, Expression)> {
        self.check_arity(element, operands.len())?;
        match operands {
            [first, second] => self.ordered(element, self.operand(first)?, self.operand(second)?),
            _ => Err(FilterError::malformed(format!(
                "{} needs two operands",
                element.name
            ))),
        }
    }

    /// Put the property reference first. Exactly one operand must be one.
    fn ordered(&self, element: &Element, first: Expression, second: Expression) -> Result<(Expression, Expression)> {
        match (first.is_property(), second.is_property()) {
            (true, false) => Ok((first, second)),
            (false, true) => Ok((second, first)),
            (true, true) => Err(FilterError::malformed(format!(
                "{} has two property references",
                element.name
            ))),
            (false, false) => Err(FilterError::malformed(format!(
                "{} has no property reference",
                element.name
            ))),
        }
    }

    /// A spatial or temporal operand: GML objects directly, else an expression.
    fn operand(&self, element: &Element) -> Result<Expression> {
        let dialect = self.caps.gml;
        if gml::is_envelope(dialect, element) {
            return Ok(Expression::literal(gml::read_envelope(dialect, element)?));
        }
        if gml::is_time(dialect, element) {
            return Ok(Expression::Literal(gml::read_time(dialect, element)?));
        }
        if gml::is_geometry(dialect, element) {
            return Ok(Expression::literal(gml::read_geometry(dialect, element)?));
        }
        self.expression(element)
    }

    fn expression(&self, element: &Element) -> Result<Expression> {
        if !self.is_ours(element) {
            return Err(FilterError::malformed(format!(
                "expected an expression, found '{}'",
                element.name
            )));
        }
        let name = element.name.as_str();
        if name == self.caps.property_element {
            return Ok(Expression::Property(self.property(element.text().trim())?));
        }
        match name {
            "Literal" => Ok(Expression::Literal(self.literal(element)?)),
            "Function" => {
                let function = element
                    .attr("name")
                    .ok_or_else(|| FilterError::malformed("Function without a name"))?;
                let mut args = element
                    .children
                    .iter()
                    .map(|c| self.expression(c))
                    .collect::<Result<Vec<_>>>()?;
                if self.caps.arithmetic == ArithmeticStyle::Functions && args.len() == 2 {
                    if let Some(op) = ArithmeticOp::from_name(function) {
                        let right = args.remove(1);
                        let left = args.remove(0);
                        return Ok(Expression::arithmetic(op, left, right));
                    }
                }
                Ok(Expression::function(function, args))
            }
            _ => match ArithmeticOp::from_name(name) {
                Some(op) if self.caps.arithmetic == ArithmeticStyle::Elements => match element.children.as_slice() {
                    [left, right] => Ok(Expression::arithmetic(
                        op,
                        self.expression(left)?,
                        self.expression(right)?,
                    )),
                    _ => Err(FilterError::malformed(format!("{} needs two operands", name))),
                },
                _ => Err(FilterError::malformed(format!("unknown expression element '{}'", name))),
            },
        }
    }

    fn literal(&self, element: &Element) -> Result<Literal> {
        let dialect = self.caps.gml;
        if let Some(child) = element.children.first() {
            if gml::is_envelope(dialect, child) {
                return Ok(Literal::Envelope(gml::read_envelope(dialect, child)?));
            }
            if gml::is_time(dialect, child) {
                return gml::read_time(dialect, child);
            }
            if gml::is_geometry(dialect, child) {
                return Ok(Literal::Geometry(gml::read_geometry(dialect, child)?));
            }
            return Err(FilterError::malformed(format!(
                "unsupported literal content '{}'",
                child.name
            )));
        }
        let text = element.text();
        if self.caps.sniff_numbers {
            if let Some(value) = parse_decimal(text) {
                return Ok(Literal::Number(value));
            }
        }
        Ok(Literal::String(text.to_string()))
    }

    /// Resolve `prefix:name` segments to `{uri}name` where the revision does.
    fn property(&self, path: &str) -> Result<PropertyName> {
        if !self.caps.resolve_prefixes {
            return Ok(PropertyName::new(path));
        }
        let mut resolved = Vec::new();
        for segment in path.split('/') {
            let (attribute, body) = match segment.strip_prefix('@') {
                Some(body) => ("@", body),
                None => ("", segment),
            };
            let head_end = body.find('[').unwrap_or(body.len());
            let (head, predicate) = body.split_at(head_end);
            let resolved_head = match split_qname(head) {
                (Some(prefix), local) => {
                    let uri = self.namespaces.get(prefix).ok_or_else(|| {
                        FilterError::UnresolvedNamespacePrefix {
                            prefix: prefix.to_string(),
                            path: path.to_string(),
                        }
                    })?;
                    format!("{{{}}}{}", uri, local)
                }
                (None, local) => local.to_string(),
            };
            resolved.push(format!("{}{}{}", attribute, resolved_head, predicate));
        }
        Ok(PropertyName::new(resolved.join("/")))
    }

    fn sort_by(&self, element: &Element) -> Result<SortBy> {
        if !self.caps.sort_by {
            return Err(FilterError::unsupported(self.caps.version, "SortBy"));
        }
        if !element.is(self.ns(), "SortBy") {
            return Err(FilterError::malformed(format!("expected SortBy, found '{}'", element.name)));
        }
        let mut keys = Vec::new();
        for key in element.children_named(self.ns(), "SortProperty") {
            let property = key
                .child(self.ns(), self.caps.property_element)
                .ok_or_else(|| FilterError::malformed("SortProperty without a property"))?;
            let ascending = match key.child(self.ns(), "SortOrder").map(|o| o.text().trim()) {
                None | Some("ASC") | Some("A") => true,
                Some("DESC") | Some("D") => false,
                Some(other) => {
                    return Err(FilterError::malformed(format!("invalid SortOrder '{}'", other)));
                }
            };
            keys.push(SortProperty {
                property: self.property(property.text().trim())?,
                ascending,
            });
        }
        if keys.is_empty() {
            return Err(FilterError::malformed("SortBy without SortProperty"));
        }
        Ok(SortBy(keys))
    }
}

fn parse_bool(element: &Element, attribute: &str) -> Result<Option<bool>> {
    match element.attr(attribute).map(str::trim) {
        None => Ok(None),
        Some("true") | Some("1") => Ok(Some(true)),
        Some("false") | Some("0") => Ok(Some(false)),
        Some(other) => Err(FilterError::malformed(format!(
            "invalid {} value '{}'",
            attribute, other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::{FES_NS, OGC_NS};
    use crate::crs::Crs;
    use crate::gml::{GML_NS, GML32_NS};
    use crate::model::Envelope;

    fn literal(ns: &str, text: &str) -> Element {
        Element::new(ns, "Literal").with_text(text)
    }

    fn filter(ns: &str, children: Vec<Element>) -> Element {
        Element::new(ns, "Filter").with_children(children)
    }

    fn equal(ns: &str, property_element: &str, property: &str, value: &str) -> Element {
        Element::new(ns, "PropertyIsEqualTo")
            .with_child(Element::new(ns, property_element).with_text(property))
            .with_child(literal(ns, value))
    }

    #[test]
    fn empty_root_is_include() {
        let caps = Capabilities::filter_1_0();
        let decoded = Decoder::new(&caps).decode(&filter(OGC_NS, vec![]), None).unwrap();
        assert_eq!(decoded, Filter::Include);
    }

    #[test]
    fn numbers_are_sniffed_only_in_2_0() {
        let caps = Capabilities::filter_2_0();
        let decoder = Decoder::new(&caps);
        let number = decoder.decode_expression(&literal(FES_NS, "3.14"), None).unwrap();
        assert_eq!(number, Expression::literal(3.14));
        let text = decoder.decode_expression(&literal(FES_NS, "abc"), None).unwrap();
        assert_eq!(text, Expression::literal("abc"));

        for caps in [Capabilities::filter_1_0(), Capabilities::filter_1_1()] {
            let decoded = Decoder::new(&caps)
                .decode_expression(&literal(OGC_NS, "3.14"), None)
                .unwrap();
            assert_eq!(decoded, Expression::literal("3.14"));
        }
    }

    #[test]
    fn single_child_combinators_collapse() {
        let caps = Capabilities::filter_1_1();
        let root = filter(
            OGC_NS,
            vec![Element::new(OGC_NS, "And").with_child(equal(OGC_NS, "PropertyName", "a", "1"))],
        );
        let decoded = Decoder::new(&caps).decode(&root, None).unwrap();
        assert_eq!(decoded, Filter::equal("a", "1"));
    }

    #[test]
    fn identifier_runs_regroup_in_1_0() {
        let caps = Capabilities::filter_1_0();
        let fid = |id: &str| Element::new(OGC_NS, "FeatureId").with_attr("fid", id);
        let root = filter(
            OGC_NS,
            vec![
                Element::new(OGC_NS, "Or")
                    .with_child(fid("a"))
                    .with_child(fid("b"))
                    .with_child(equal(OGC_NS, "PropertyName", "x", "1"))
                    .with_child(fid("c")),
            ],
        );
        let decoded = Decoder::new(&caps).decode(&root, None).unwrap();
        assert_eq!(
            decoded,
            Filter::Or(vec![
                Filter::ids(["a", "b"]).unwrap(),
                Filter::equal("x", "1"),
                Filter::ids(["c"]).unwrap(),
            ])
        );

        let caps = Capabilities::filter_1_1();
        assert!(Decoder::new(&caps).decode(&root, None).is_err());
    }

    #[test]
    fn root_identifiers() {
        let caps = Capabilities::filter_2_0();
        let rid = |id: &str| Element::new(FES_NS, "ResourceId").with_attr("rid", id);
        let root = filter(FES_NS, vec![rid("r1"), rid("r2")]);
        let decoded = Decoder::new(&caps).decode(&root, None).unwrap();
        assert_eq!(decoded, Filter::ids(["r1", "r2"]).unwrap());

        let missing = filter(FES_NS, vec![Element::new(FES_NS, "ResourceId")]);
        assert!(matches!(
            Decoder::new(&caps).decode(&missing, None),
            Err(FilterError::MalformedFilterDocument(_))
        ));

        let caps = Capabilities::filter_1_1();
        let gml_object = filter(
            OGC_NS,
            vec![Element::new(OGC_NS, "GmlObjectId").with_ns_attr(GML_NS, "id", "g1")],
        );
        assert_eq!(
            Decoder::new(&caps).decode(&gml_object, None).unwrap(),
            Filter::ids(["g1"]).unwrap()
        );
    }

    #[test]
    fn spatial_operands_in_second_position_are_swapped() {
        let caps = Capabilities::filter_1_1();
        let envelope = Element::new(GML_NS, "Envelope")
            .with_child(Element::new(GML_NS, "lowerCorner").with_text("0 0"))
            .with_child(Element::new(GML_NS, "upperCorner").with_text("1 1"));
        let root = filter(
            OGC_NS,
            vec![
                Element::new(OGC_NS, "Intersects")
                    .with_child(envelope)
                    .with_child(Element::new(OGC_NS, "PropertyName").with_text("geom")),
            ],
        );
        let decoded = Decoder::new(&caps).decode(&root, None).unwrap();
        assert_eq!(
            decoded,
            Filter::spatial(
                SpatialOp::Intersects,
                Expression::property("geom"),
                Expression::literal(Envelope::from_extent(0.0, 0.0, 1.0, 1.0, None)),
            )
        );
    }

    #[test]
    fn prefixes_resolve_in_2_0() {
        let caps = Capabilities::filter_2_0();
        let root = filter(FES_NS, vec![equal(FES_NS, "ValueReference", "app:road/@app:id", "7")]);
        let mut namespaces = NamespaceMap::new();
        namespaces.insert("app".into(), "http://example.com/app".into());
        let decoded = Decoder::new(&caps).decode(&root, Some(&namespaces)).unwrap();
        assert_eq!(
            decoded,
            Filter::compare(
                ComparisonOp::Equal,
                Expression::property("{http://example.com/app}road/@{http://example.com/app}id"),
                Expression::literal(7.0),
            )
        );

        let err = Decoder::new(&caps).decode(&root, None).unwrap_err();
        assert!(matches!(
            err,
            FilterError::UnresolvedNamespacePrefix { ref prefix, .. } if prefix == "app"
        ));

        let caps = Capabilities::filter_1_1();
        let root = filter(OGC_NS, vec![equal(OGC_NS, "PropertyName", "app:road", "7")]);
        assert_eq!(
            Decoder::new(&caps).decode(&root, None).unwrap(),
            Filter::equal("app:road", "7")
        );
    }

    #[test]
    fn arithmetic_functions_in_2_0() {
        let caps = Capabilities::filter_2_0();
        let element = Element::new(FES_NS, "Function")
            .with_attr("name", "Add")
            .with_child(Element::new(FES_NS, "ValueReference").with_text("a"))
            .with_child(literal(FES_NS, "1"));
        let decoded = Decoder::new(&caps).decode_expression(&element, None).unwrap();
        assert_eq!(
            decoded,
            Expression::arithmetic(ArithmeticOp::Add, Expression::property("a"), Expression::literal(1.0))
        );

        let unary = Element::new(FES_NS, "Function")
            .with_attr("name", "Add")
            .with_child(literal(FES_NS, "1"));
        assert_eq!(
            Decoder::new(&caps).decode_expression(&unary, None).unwrap(),
            Expression::function("Add", vec![Expression::literal(1.0)])
        );
    }

    #[test]
    fn unknown_elements_are_malformed() {
        let caps = Capabilities::filter_1_1();
        let root = filter(OGC_NS, vec![Element::new(OGC_NS, "PropertyIsFuzzy")]);
        assert!(matches!(
            Decoder::new(&caps).decode(&root, None),
            Err(FilterError::MalformedFilterDocument(_))
        ));
        let temporal = filter(OGC_NS, vec![Element::new(OGC_NS, "During")]);
        assert!(Decoder::new(&caps).decode(&temporal, None).is_err());
    }

    #[test]
    fn spatial_operators_need_two_operands() {
        let caps = Capabilities::filter_2_0();
        let root = filter(
            FES_NS,
            vec![Element::new(FES_NS, "Within").with_child(Element::new(FES_NS, "ValueReference").with_text("geom"))],
        );
        assert!(matches!(
            Decoder::new(&caps).decode(&root, None),
            Err(FilterError::MalformedFilterDocument(_))
        ));
    }

    fn malformed(caps: &Capabilities, predicate: Element) {
        let root = filter(caps.namespace, vec![predicate]);
        let result = Decoder::new(caps).decode(&root, None);
        assert!(
            matches!(result, Err(FilterError::MalformedFilterDocument(_))),
            "{}: {:?}",
            caps.version,
            result
        );
    }

    #[test]
    fn spatial_operands_need_exactly_one_property() {
        for caps in [Capabilities::filter_1_0(), Capabilities::filter_1_1(), Capabilities::filter_2_0()] {
            let ns = caps.namespace;
            let property = |name: &str| Element::new(ns, caps.property_element).with_text(name);
            let envelope = || gml::write_envelope(caps.gml, [0.0, 0.0], [1.0, 1.0], None);

            let both = Element::new(ns, "Intersects").with_child(property("a")).with_child(property("b"));
            malformed(&caps, both);

            let neither = Element::new(ns, "Intersects").with_child(envelope()).with_child(envelope());
            malformed(&caps, neither);

            let distance = Element::new(ns, "DWithin")
                .with_child(property("a"))
                .with_child(property("b"))
                .with_child(Element::new(ns, "Distance").with_attr(caps.distance_units_attribute, "m").with_text("5"));
            malformed(&caps, distance);

            let bbox_of_properties = Element::new(ns, "BBOX").with_child(property("a")).with_child(property("b"));
            malformed(&caps, bbox_of_properties);

            let bbox_of_envelopes = Element::new(ns, "BBOX").with_child(envelope()).with_child(envelope());
            malformed(&caps, bbox_of_envelopes);

            let lone_property = Element::new(ns, "BBOX").with_child(property("geom"));
            malformed(&caps, lone_property);

            let bbox_of_literal = Element::new(ns, "BBOX")
                .with_child(property("geom"))
                .with_child(literal(ns, "0 0 1 1"));
            malformed(&caps, bbox_of_literal);
        }

        let caps = Capabilities::filter_2_0();
        let both = Element::new(FES_NS, "After")
            .with_child(Element::new(FES_NS, "ValueReference").with_text("a"))
            .with_child(Element::new(FES_NS, "ValueReference").with_text("b"));
        malformed(&caps, both);
    }

    #[test]
    fn lone_envelope_bbox_in_2_0() {
        let caps = Capabilities::filter_2_0();
        let root = filter(
            FES_NS,
            vec![Element::new(FES_NS, "BBOX").with_child(gml::write_envelope(caps.gml, [0.0, 0.0], [1.0, 1.0], None))],
        );
        assert_eq!(
            Decoder::new(&caps).decode(&root, None).unwrap(),
            Filter::BBox(BBox {
                left: None,
                right: Expression::literal(Envelope::from_extent(0.0, 0.0, 1.0, 1.0, None)),
            })
        );
    }

    #[test]
    fn between_rejects_extra_children() {
        let caps = Capabilities::filter_1_1();
        let boundary = |name: &str, value: &str| Element::new(OGC_NS, name).with_child(literal(OGC_NS, value));
        let element = Element::new(OGC_NS, "PropertyIsBetween")
            .with_child(Element::new(OGC_NS, "PropertyName").with_text("lanes"))
            .with_child(boundary("LowerBoundary", "1"))
            .with_child(boundary("UpperBoundary", "4"))
            .with_child(literal(OGC_NS, "9"));
        malformed(&caps, element);
    }

    #[test]
    fn overflowing_numbers_stay_text() {
        let caps = Capabilities::filter_2_0();
        let root = filter(FES_NS, vec![equal(FES_NS, "ValueReference", "size", "1e400")]);
        assert_eq!(
            Decoder::new(&caps).decode(&root, None).unwrap(),
            Filter::equal("size", "1e400")
        );

        let point = Element::new(GML32_NS, "Point").with_child(Element::new(GML32_NS, "pos").with_text("1 2"));
        let distance = Element::new(FES_NS, "Beyond")
            .with_child(Element::new(FES_NS, "ValueReference").with_text("geom"))
            .with_child(point)
            .with_child(Element::new(FES_NS, "Distance").with_attr("uom", "m").with_text("1e400"));
        malformed(&caps, distance);
    }

    #[test]
    fn distance_and_time_literals() {
        let caps = Capabilities::filter_2_0();
        let point = Element::new(GML32_NS, "Point")
            .with_attr("srsName", "urn:ogc:def:crs:EPSG::4326")
            .with_child(Element::new(GML32_NS, "pos").with_text("1 2"));
        let root = filter(
            FES_NS,
            vec![
                Element::new(FES_NS, "DWithin")
                    .with_child(Element::new(FES_NS, "ValueReference").with_text("geom"))
                    .with_child(point)
                    .with_child(Element::new(FES_NS, "Distance").with_attr("uom", "m").with_text("250")),
            ],
        );
        match Decoder::new(&caps).decode(&root, None).unwrap() {
            Filter::Distance(distance) => {
                assert_eq!(distance.distance, 250.0);
                assert_eq!(distance.units, "m");
                match distance.right {
                    Expression::Literal(Literal::Geometry(g)) => assert_eq!(g.crs, Some(Crs::epsg(4326))),
                    other => panic!("unexpected operand {:?}", other),
                }
            }
            other => panic!("unexpected filter {:?}", other),
        }

        let instant = Element::new(GML32_NS, "TimeInstant")
            .with_child(Element::new(GML32_NS, "timePosition").with_text("2024-05-01"));
        let root = filter(
            FES_NS,
            vec![
                Element::new(FES_NS, "Before")
                    .with_child(Element::new(FES_NS, "ValueReference").with_text("when"))
                    .with_child(instant),
            ],
        );
        assert_eq!(
            Decoder::new(&caps).decode(&root, None).unwrap(),
            Filter::temporal(
                TemporalOp::Before,
                Expression::property("when"),
                Expression::literal(Literal::Instant("2024-05-01".into())),
            )
        );
    }
}
