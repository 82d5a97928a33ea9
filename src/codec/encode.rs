//! Filter model → element tree.

use geo::BoundingRect;
use tracing::{debug, warn};

use super::{CodecOptions, NestedIdPolicy};
use crate::capabilities::{ArithmeticStyle, Capabilities};
use crate::crs::{Crs, CrsRegistry};
use crate::error::{FilterError, Result};
use crate::gml::{self, IdGenerator};
use crate::model::{
    BBox, Between, Color, Comparison, Envelope, Expression, Filter, GeometryLiteral, IdSet, IsNil,
    Like, Literal, MatchAction, PropertyName, SortBy, SpatialBinary, SpatialDistance, Temporal,
};
use crate::tree::{Element, NamespaceMap};
use crate::utils::format_number;

/// `#RRGGBB`, or `#AARRGGBB` when the color is not fully opaque.
pub fn encode_color(color: &Color) -> String {
    let mut out = String::from("#");
    if !color.is_opaque() {
        out.push_str(&format!("{:02X}", color.alpha));
    }
    out.push_str(&format!("{:02X}{:02X}{:02X}", color.red, color.green, color.blue));
    out
}

/// Per-call state: generated `gml:id`s and namespace prefixes to declare.
#[derive(Debug, Default)]
struct EncodeState {
    ids: IdGenerator,
    declarations: Vec<(String, String)>,
}

impl EncodeState {
    fn prefix_for(&mut self, uri: &str, preferred: &NamespaceMap) -> String {
        if let Some((prefix, _)) = self.declarations.iter().find(|(_, bound)| bound == uri) {
            return prefix.clone();
        }
        let taken = |declarations: &[(String, String)], prefix: &str| {
            declarations.iter().any(|(p, _)| p == prefix)
        };
        let prefix = preferred
            .iter()
            .find(|(_, bound)| *bound == uri)
            .map(|(prefix, _)| prefix.clone())
            .filter(|prefix| !taken(&self.declarations, prefix))
            .unwrap_or_else(|| {
                (0..)
                    .map(|n| format!("ns{}", n))
                    .find(|candidate| {
                        !taken(&self.declarations, candidate) && !preferred.contains_key(candidate)
                    })
                    .unwrap_or_default()
            });
        self.declarations.push((prefix.clone(), uri.to_string()));
        prefix
    }

    fn declare_on(&self, element: &mut Element) {
        for (prefix, uri) in &self.declarations {
            element.declare(prefix, uri);
        }
    }
}

/// Encodes filter model values for one revision.
#[derive(Clone, Copy)]
pub struct Encoder<'a> {
    caps: &'a Capabilities,
    options: &'a CodecOptions,
    registry: &'a dyn CrsRegistry,
}

impl<'a> Encoder<'a> {
    pub fn new(caps: &'a Capabilities, options: &'a CodecOptions, registry: &'a dyn CrsRegistry) -> Self {
        Encoder {
            caps,
            options,
            registry,
        }
    }

    pub fn capabilities(&self) -> &'a Capabilities {
        self.caps
    }

    /// Encode `filter` as a root `Filter` element. `Include` gives an empty root.
    pub fn encode(&self, filter: &Filter) -> Result<Element> {
        let mut state = EncodeState::default();
        let children = self.filter_elements(filter, false, &mut state)?;
        let mut root = self.el("Filter").with_children(children);
        state.declare_on(&mut root);
        Ok(root)
    }

    /// Encode a predicate that maps to exactly one element, without the root wrapper.
    pub fn encode_predicate(&self, filter: &Filter) -> Result<Element> {
        let mut state = EncodeState::default();
        let mut elements = self.filter_elements(filter, false, &mut state)?;
        if elements.len() != 1 {
            return Err(FilterError::InvalidFilter(format!(
                "predicate encodes to {} elements",
                elements.len()
            )));
        }
        let mut element = elements.remove(0);
        state.declare_on(&mut element);
        Ok(element)
    }

    pub fn encode_expression(&self, expression: &Expression) -> Result<Element> {
        let mut state = EncodeState::default();
        let mut element = self.expression(expression, &mut state)?;
        state.declare_on(&mut element);
        Ok(element)
    }

    pub fn encode_sort_by(&self, sort_by: &SortBy) -> Result<Element> {
        if !self.caps.sort_by {
            return Err(FilterError::unsupported(self.caps.version, "SortBy"));
        }
        if sort_by.0.is_empty() {
            return Err(FilterError::InvalidFilter("SortBy requires at least one property".into()));
        }
        let mut state = EncodeState::default();
        let mut properties = Vec::with_capacity(sort_by.0.len());
        for key in &sort_by.0 {
            let order = if key.ascending { "ASC" } else { "DESC" };
            properties.push(
                self.el("SortProperty")
                    .with_child(self.property(&key.property, &mut state))
                    .with_child(self.el("SortOrder").with_text(order)),
            );
        }
        let mut element = self.el("SortBy").with_children(properties);
        state.declare_on(&mut element);
        Ok(element)
    }

    fn el(&self, name: &str) -> Element {
        Element::new(self.caps.namespace, name)
    }

    fn require(&self, operator: &str) -> Result<()> {
        if self.caps.supports(operator) {
            Ok(())
        } else {
            Err(FilterError::unsupported(self.caps.version, operator))
        }
    }

    /// Elements a filter contributes to its parent. `nested` is true inside
    /// a combinator.
    fn filter_elements(&self, filter: &Filter, nested: bool, state: &mut EncodeState) -> Result<Vec<Element>> {
        match filter {
            Filter::Include => Ok(Vec::new()),
            Filter::And(children) => self.combinator("And", children, state),
            Filter::Or(children) => self.combinator("Or", children, state),
            Filter::Not(child) => {
                self.require("Not")?;
                let mut inner = self.filter_elements(child, true, state)?;
                let operand = match inner.len() {
                    0 => {
                        return Err(FilterError::unsupported(
                            self.caps.version,
                            "Not over a filter that encodes to nothing",
                        ));
                    }
                    1 => inner.remove(0),
                    _ => self.el("Or").with_children(inner),
                };
                Ok(vec![self.el("Not").with_child(operand)])
            }
            Filter::Comparison(comparison) => Ok(vec![self.comparison(comparison, state)?]),
            Filter::Between(between) => Ok(vec![self.between(between, state)?]),
            Filter::Like(like) => Ok(vec![self.like(like, state)?]),
            Filter::IsNull(expression) => {
                self.require("PropertyIsNull")?;
                Ok(vec![
                    self.el("PropertyIsNull")
                        .with_child(self.expression(expression, state)?),
                ])
            }
            Filter::IsNil(is_nil) => Ok(vec![self.is_nil(is_nil, state)?]),
            Filter::Spatial(spatial) => Ok(vec![self.spatial(spatial, state)?]),
            Filter::Distance(distance) => Ok(vec![self.distance(distance, state)?]),
            Filter::BBox(bbox) => Ok(vec![self.bbox(bbox, state)?]),
            Filter::Temporal(temporal) => Ok(vec![self.temporal(temporal, state)?]),
            Filter::Id(ids) => self.ids(ids, nested, state),
        }
    }

    fn combinator(&self, name: &str, children: &[Filter], state: &mut EncodeState) -> Result<Vec<Element>> {
        self.require(name)?;
        let mut elements = Vec::new();
        let mut after_ids = false;
        for child in children {
            let encoded = self.filter_elements(child, true, state)?;
            if encoded.is_empty() {
                continue;
            }
            let is_ids = matches!(child, Filter::Id(_)) && self.caps.supports_id_tree();
            // adjacent id leaves would merge into one set on decode
            if is_ids && after_ids {
                elements.push(self.el("Or").with_children(encoded));
            } else {
                elements.extend(encoded);
            }
            after_ids = is_ids;
        }
        if elements.is_empty() {
            return Ok(elements);
        }
        Ok(vec![self.el(name).with_children(elements)])
    }

    fn ids(&self, ids: &IdSet, nested: bool, state: &mut EncodeState) -> Result<Vec<Element>> {
        if !nested || self.caps.supports_id_tree() {
            let style = self.caps.id_style;
            return Ok(ids
                .iter()
                .map(|id| self.el(style.element).with_attr(style.attribute, id))
                .collect());
        }

        match self.options.nested_ids {
            NestedIdPolicy::Reject => Err(FilterError::unsupported(
                self.caps.version,
                "identifier predicate nested inside a combinator",
            )),
            NestedIdPolicy::Rewrite => {
                debug!(
                    "Rewriting {} nested identifier(s) as equality on '{}' for {}",
                    ids.len(),
                    self.options.id_property,
                    self.caps.version
                );
                let mut equalities: Vec<Filter> = ids
                    .iter()
                    .map(|id| Filter::equal(self.options.id_property.clone(), id))
                    .collect();
                let rewritten = if equalities.len() == 1 {
                    equalities.remove(0)
                } else {
                    Filter::Or(equalities)
                };
                self.filter_elements(&rewritten, true, state)
            }
        }
    }

    fn comparison(&self, comparison: &Comparison, state: &mut EncodeState) -> Result<Element> {
        let name = comparison.op.element_name();
        self.require(name)?;
        let mut element = self.el(name);
        if self.caps.match_case && !comparison.match_case {
            element = element.with_attr("matchCase", "false");
        }
        if self.caps.match_action && comparison.match_action != MatchAction::Any {
            element = element.with_attr("matchAction", comparison.match_action.as_str());
        }
        Ok(element
            .with_child(self.expression(&comparison.left, state)?)
            .with_child(self.expression(&comparison.right, state)?))
    }

    fn between(&self, between: &Between, state: &mut EncodeState) -> Result<Element> {
        self.require("PropertyIsBetween")?;
        Ok(self
            .el("PropertyIsBetween")
            .with_child(self.expression(&between.expression, state)?)
            .with_child(
                self.el("LowerBoundary")
                    .with_child(self.expression(&between.lower, state)?),
            )
            .with_child(
                self.el("UpperBoundary")
                    .with_child(self.expression(&between.upper, state)?),
            ))
    }

    fn like(&self, like: &Like, state: &mut EncodeState) -> Result<Element> {
        self.require("PropertyIsLike")?;
        let property = like.expression.as_property().ok_or_else(|| {
            FilterError::InvalidFilter("PropertyIsLike requires a property reference".into())
        })?;
        let names = self.caps.like;
        let mut element = self
            .el("PropertyIsLike")
            .with_attr(names.wildcard, like.wildcard.clone())
            .with_attr(names.single_char, like.single_char.clone())
            .with_attr(names.escape, like.escape.clone());
        if self.caps.match_case && !like.match_case {
            element = element.with_attr("matchCase", "false");
        }
        Ok(element
            .with_child(self.property(property, state))
            .with_child(self.el("Literal").with_text(like.pattern.clone())))
    }

    fn is_nil(&self, is_nil: &IsNil, state: &mut EncodeState) -> Result<Element> {
        self.require("PropertyIsNil")?;
        let mut element = self.el("PropertyIsNil");
        if let Some(reason) = &is_nil.nil_reason {
            element = element.with_attr("nilReason", reason.clone());
        }
        Ok(element.with_child(self.expression(&is_nil.expression, state)?))
    }

    fn spatial(&self, spatial: &SpatialBinary, state: &mut EncodeState) -> Result<Element> {
        let name = spatial.op.element_name();
        self.require(name)?;
        let (property, operand) = normalize(name, &spatial.left, &spatial.right)?;
        Ok(self
            .el(name)
            .with_child(self.property(property, state))
            .with_child(self.spatial_operand(operand, state)?))
    }

    fn distance(&self, distance: &SpatialDistance, state: &mut EncodeState) -> Result<Element> {
        let name = distance.op.element_name();
        self.require(name)?;
        let (property, operand) = normalize(name, &distance.left, &distance.right)?;
        if !distance.distance.is_finite() {
            return Err(FilterError::InvalidFilter(format!(
                "{} distance must be finite",
                name
            )));
        }
        Ok(self
            .el(name)
            .with_child(self.property(property, state))
            .with_child(self.spatial_operand(operand, state)?)
            .with_child(
                self.el("Distance")
                    .with_attr(self.caps.distance_units_attribute, distance.units.clone())
                    .with_text(format_number(distance.distance)),
            ))
    }

    fn bbox(&self, bbox: &BBox, state: &mut EncodeState) -> Result<Element> {
        self.require("BBOX")?;
        let (property, operand) = match &bbox.left {
            Some(left) => {
                let (property, operand) = normalize("BBOX", left, &bbox.right)?;
                (Some(property), operand)
            }
            None => {
                if !self.caps.optional_bbox_property {
                    return Err(FilterError::unsupported(
                        self.caps.version,
                        "BBOX without a property operand",
                    ));
                }
                if bbox.right.is_property() {
                    return Err(FilterError::ambiguous("BBOX", "no envelope operand"));
                }
                (None, &bbox.right)
            }
        };

        let envelope = match operand {
            Expression::Literal(Literal::Envelope(envelope)) => self.envelope(envelope)?,
            Expression::Literal(Literal::Geometry(geometry)) => {
                let rect = geometry.geometry.bounding_rect().ok_or_else(|| {
                    FilterError::InvalidFilter("BBOX geometry operand is empty".into())
                })?;
                self.envelope(&Envelope::from_extent(
                    rect.min().x,
                    rect.min().y,
                    rect.max().x,
                    rect.max().y,
                    geometry.crs.clone(),
                ))?
            }
            _ => {
                return Err(FilterError::InvalidFilter(
                    "BBOX requires an envelope or geometry operand".into(),
                ));
            }
        };

        let mut element = self.el("BBOX");
        if let Some(property) = property {
            element = element.with_child(self.property(property, state));
        }
        Ok(element.with_child(envelope))
    }

    fn temporal(&self, temporal: &Temporal, state: &mut EncodeState) -> Result<Element> {
        let name = temporal.op.element_name();
        self.require(name)?;
        let (property, operand) = normalize(name, &temporal.left, &temporal.right)?;
        let operand = match operand {
            Expression::Literal(literal @ (Literal::Instant(_) | Literal::Period { .. }))
                if self.caps.time_objects =>
            {
                gml::write_time(self.caps.gml, literal, &mut state.ids)?
            }
            other => self.expression(other, state)?,
        };
        Ok(self
            .el(name)
            .with_child(self.property(property, state))
            .with_child(operand))
    }

    fn spatial_operand(&self, operand: &Expression, state: &mut EncodeState) -> Result<Element> {
        match operand {
            Expression::Literal(Literal::Geometry(geometry)) => Ok(self.geometry(geometry, state)),
            Expression::Literal(Literal::Envelope(envelope)) => self.envelope(envelope),
            other => self.expression(other, state),
        }
    }

    fn expression(&self, expression: &Expression, state: &mut EncodeState) -> Result<Element> {
        match expression {
            Expression::Property(property) => Ok(self.property(property, state)),
            Expression::Literal(literal) => self.literal(literal, state),
            Expression::Function { name, args } => {
                let args = args
                    .iter()
                    .map(|arg| self.expression(arg, state))
                    .collect::<Result<Vec<_>>>()?;
                Ok(self
                    .el("Function")
                    .with_attr("name", name.clone())
                    .with_children(args))
            }
            Expression::Arithmetic { op, left, right } => {
                let left = self.expression(left, state)?;
                let right = self.expression(right, state)?;
                let element = match self.caps.arithmetic {
                    ArithmeticStyle::Elements => {
                        self.require(op.name())?;
                        self.el(op.name())
                    }
                    ArithmeticStyle::Functions => self.el("Function").with_attr("name", op.name()),
                };
                Ok(element.with_child(left).with_child(right))
            }
        }
    }

    fn literal(&self, literal: &Literal, state: &mut EncodeState) -> Result<Element> {
        let element = self.el("Literal");
        let element = match literal {
            Literal::String(text) => element.with_text(text.clone()),
            Literal::Number(value) => {
                if !value.is_finite() {
                    return Err(FilterError::InvalidFilter(format!(
                        "numeric literal {} is not finite",
                        value
                    )));
                }
                element.with_text(format_number(*value))
            }
            Literal::Color(color) => element.with_text(encode_color(color)),
            Literal::Geometry(geometry) => element.with_child(self.geometry(geometry, state)),
            Literal::Envelope(envelope) => element.with_child(self.envelope(envelope)?),
            Literal::Instant(_) | Literal::Period { .. } if self.caps.time_objects => {
                element.with_child(gml::write_time(self.caps.gml, literal, &mut state.ids)?)
            }
            Literal::Instant(position) => element.with_text(position.clone()),
            Literal::Period { begin, end } => element.with_text(format!("{}/{}", begin, end)),
        };
        Ok(element)
    }

    fn property(&self, property: &PropertyName, state: &mut EncodeState) -> Element {
        self.el(self.caps.property_element)
            .with_text(self.qualify_path(property.as_str(), state))
    }

    /// Replace Clark-notation segments (`{uri}local`) with `prefix:local`.
    fn qualify_path(&self, path: &str, state: &mut EncodeState) -> String {
        let mut out = String::with_capacity(path.len());
        let mut rest = path;
        while let Some(start) = rest.find('{') {
            out.push_str(&rest[..start]);
            let after = &rest[start + 1..];
            match after.find('}') {
                Some(end) => {
                    let prefix = state.prefix_for(&after[..end], &self.options.namespaces);
                    out.push_str(&prefix);
                    out.push(':');
                    rest = &after[end + 1..];
                }
                None => {
                    out.push_str(&rest[start..]);
                    rest = "";
                }
            }
        }
        out.push_str(rest);
        out
    }

    fn geometry(&self, geometry: &GeometryLiteral, state: &mut EncodeState) -> Element {
        let srs_name = self.srs_name(geometry.crs.as_ref());
        gml::write_geometry(self.caps.gml, &geometry.geometry, srs_name.as_deref(), &mut state.ids)
    }

    fn envelope(&self, envelope: &Envelope) -> Result<Element> {
        let (lower, upper, crs) = self.horizontal_extent(envelope)?;
        let srs_name = self.srs_name(crs.as_ref());
        Ok(gml::write_envelope(self.caps.gml, lower, upper, srs_name.as_deref()))
    }

    /// The 2D horizontal part of an envelope and its CRS.
    fn horizontal_extent(&self, envelope: &Envelope) -> Result<([f64; 2], [f64; 2], Option<Crs>)> {
        let dimension = envelope.dimension();
        if envelope.upper.len() != dimension || dimension < 2 {
            return Err(FilterError::InvalidFilter(format!(
                "envelope corners have {} and {} ordinates",
                envelope.lower.len(),
                envelope.upper.len()
            )));
        }
        let (lower, upper) = (&envelope.lower, &envelope.upper);
        if dimension == 2 {
            return Ok(([lower[0], lower[1]], [upper[0], upper[1]], envelope.crs.clone()));
        }

        let crs = envelope.crs.as_ref().ok_or_else(|| {
            FilterError::CrsLookupFailure(format!(
                "cannot locate horizontal axes of a {}D envelope without a CRS",
                dimension
            ))
        })?;
        let horizontal = self.registry.horizontal_component(crs).ok_or_else(|| {
            FilterError::CrsLookupFailure(format!("{} has no horizontal component", crs))
        })?;
        let axis = self
            .registry
            .axis_index_of(crs, &horizontal)
            .filter(|axis| axis + 1 < dimension)
            .ok_or_else(|| {
                FilterError::CrsLookupFailure(format!(
                    "cannot locate {} axes within {}",
                    horizontal, crs
                ))
            })?;
        debug!("Using axes {}..{} of {} as {}", axis, axis + 1, crs, horizontal);
        Ok((
            [lower[axis], lower[axis + 1]],
            [upper[axis], upper[axis + 1]],
            Some(horizontal),
        ))
    }

    /// URN first, then the short identifier; omitted when neither is known.
    fn srs_name(&self, crs: Option<&Crs>) -> Option<String> {
        let crs = crs?;
        let name = self
            .registry
            .lookup_urn(crs)
            .or_else(|| self.registry.lookup_identifier(crs));
        if name.is_none() {
            warn!("No SRS name known for CRS '{}'; omitting srsName", crs);
        }
        name
    }
}

/// Put the property reference first. Exactly one operand must be one.
fn normalize<'e>(
    operator: &str,
    left: &'e Expression,
    right: &'e Expression,
) -> Result<(&'e PropertyName, &'e Expression)> {
    match (left.as_property(), right.as_property()) {
        (Some(property), None) => Ok((property, right)),
        (None, Some(property)) => Ok((property, left)),
        (Some(_), Some(_)) => Err(FilterError::ambiguous(
            operator,
            "both operands are property references",
        )),
        (None, None) => Err(FilterError::ambiguous(
            operator,
            "neither operand is a property reference",
        )),
    }
}
