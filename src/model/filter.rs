//! Predicate types of the filter model.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::expr::{Envelope, Expression, Literal, PropertyName};
use crate::crs::Crs;
use crate::error::{FilterError, Result};

/// Root filter predicate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Filter {
    /// Matches everything; has no wire representation of its own.
    Include,

    /// Logical AND over one or more filters.
    And(Vec<Filter>),

    /// Logical OR over one or more filters.
    Or(Vec<Filter>),

    /// Logical NOT.
    Not(Box<Filter>),

    /// `PropertyIsEqualTo`, `PropertyIsLessThan`, ...
    Comparison(Comparison),

    /// `PropertyIsBetween`
    Between(Between),

    /// `PropertyIsLike`
    Like(Like),

    /// `PropertyIsNull`
    IsNull(Expression),

    /// `PropertyIsNil` (2.0 only)
    IsNil(IsNil),

    /// `Intersects`, `Within`, ...
    Spatial(SpatialBinary),

    /// `DWithin`, `Beyond`
    Distance(SpatialDistance),

    /// `BBOX`
    #[serde(rename = "bbox")]
    BBox(BBox),

    /// `After`, `During`, ... (2.0 only)
    Temporal(Temporal),

    /// Identifier predicate.
    Id(IdSet),
}

impl Filter {
    pub fn and(children: Vec<Filter>) -> Result<Self> {
        if children.is_empty() {
            return Err(FilterError::InvalidFilter("And requires at least one operand".into()));
        }
        Ok(Filter::And(children))
    }

    pub fn or(children: Vec<Filter>) -> Result<Self> {
        if children.is_empty() {
            return Err(FilterError::InvalidFilter("Or requires at least one operand".into()));
        }
        Ok(Filter::Or(children))
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(child: Filter) -> Self {
        Filter::Not(Box::new(child))
    }

    pub fn compare(op: ComparisonOp, left: Expression, right: Expression) -> Self {
        Filter::Comparison(Comparison::new(op, left, right))
    }

    /// `property = value`, the most common comparison.
    pub fn equal(property: impl Into<String>, value: impl Into<Literal>) -> Self {
        Filter::compare(
            ComparisonOp::Equal,
            Expression::property(property),
            Expression::literal(value),
        )
    }

    pub fn ids<I, S>(ids: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Ok(Filter::Id(IdSet::new(ids)?))
    }

    pub fn spatial(op: SpatialOp, left: Expression, right: Expression) -> Self {
        Filter::Spatial(SpatialBinary { op, left, right })
    }

    pub fn distance(
        op: DistanceOp,
        left: Expression,
        right: Expression,
        distance: f64,
        units: impl Into<String>,
    ) -> Self {
        Filter::Distance(SpatialDistance {
            op,
            left,
            right,
            distance,
            units: units.into(),
        })
    }

    /// `BBOX(property, extent)` over a 2D extent.
    pub fn bbox(
        property: impl Into<String>,
        min_x: f64,
        min_y: f64,
        max_x: f64,
        max_y: f64,
        crs: Option<Crs>,
    ) -> Self {
        Filter::BBox(BBox {
            left: Some(Expression::property(property)),
            right: Expression::literal(Envelope::from_extent(min_x, min_y, max_x, max_y, crs)),
        })
    }

    pub fn temporal(op: TemporalOp, left: Expression, right: Expression) -> Self {
        Filter::Temporal(Temporal { op, left, right })
    }
}

/// Binary comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonOp {
    Equal,
    NotEqual,
    Less,
    Greater,
    LessOrEqual,
    GreaterOrEqual,
}

impl ComparisonOp {
    pub const ALL: [ComparisonOp; 6] = [
        ComparisonOp::Equal,
        ComparisonOp::NotEqual,
        ComparisonOp::Less,
        ComparisonOp::Greater,
        ComparisonOp::LessOrEqual,
        ComparisonOp::GreaterOrEqual,
    ];

    pub fn element_name(self) -> &'static str {
        match self {
            ComparisonOp::Equal => "PropertyIsEqualTo",
            ComparisonOp::NotEqual => "PropertyIsNotEqualTo",
            ComparisonOp::Less => "PropertyIsLessThan",
            ComparisonOp::Greater => "PropertyIsGreaterThan",
            ComparisonOp::LessOrEqual => "PropertyIsLessThanOrEqualTo",
            ComparisonOp::GreaterOrEqual => "PropertyIsGreaterThanOrEqualTo",
        }
    }

    pub fn from_element_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.element_name() == name)
    }
}

/// How a comparison treats multi-valued properties (2.0 only).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MatchAction {
    #[default]
    Any,
    All,
    One,
}

impl MatchAction {
    pub fn as_str(self) -> &'static str {
        match self {
            MatchAction::Any => "Any",
            MatchAction::All => "All",
            MatchAction::One => "One",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Any" => Some(MatchAction::Any),
            "All" => Some(MatchAction::All),
            "One" => Some(MatchAction::One),
            _ => None,
        }
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    pub op: ComparisonOp,
    pub left: Expression,
    pub right: Expression,
    #[serde(default = "default_true")]
    pub match_case: bool,
    #[serde(default)]
    pub match_action: MatchAction,
}

impl Comparison {
    pub fn new(op: ComparisonOp, left: Expression, right: Expression) -> Self {
        Comparison {
            op,
            left,
            right,
            match_case: true,
            match_action: MatchAction::Any,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Between {
    pub expression: Expression,
    pub lower: Expression,
    pub upper: Expression,
}

/// Pattern match. `expression` must be a property reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Like {
    pub expression: Expression,
    pub pattern: String,
    #[serde(default = "default_wildcard")]
    pub wildcard: String,
    #[serde(default = "default_single_char")]
    pub single_char: String,
    #[serde(default = "default_escape")]
    pub escape: String,
    #[serde(default = "default_true")]
    pub match_case: bool,
}

fn default_wildcard() -> String {
    "*".to_string()
}

fn default_single_char() -> String {
    "?".to_string()
}

fn default_escape() -> String {
    "\\".to_string()
}

impl Like {
    pub fn new(property: impl Into<String>, pattern: impl Into<String>) -> Self {
        Like {
            expression: Expression::property(property),
            pattern: pattern.into(),
            wildcard: default_wildcard(),
            single_char: default_single_char(),
            escape: default_escape(),
            match_case: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IsNil {
    pub expression: Expression,
    #[serde(default)]
    pub nil_reason: Option<String>,
}

/// Binary spatial operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpatialOp {
    Equals,
    Disjoint,
    Touches,
    Within,
    Overlaps,
    Crosses,
    Intersects,
    Contains,
}

impl SpatialOp {
    pub const ALL: [SpatialOp; 8] = [
        SpatialOp::Equals,
        SpatialOp::Disjoint,
        SpatialOp::Touches,
        SpatialOp::Within,
        SpatialOp::Overlaps,
        SpatialOp::Crosses,
        SpatialOp::Intersects,
        SpatialOp::Contains,
    ];

    pub fn element_name(self) -> &'static str {
        match self {
            SpatialOp::Equals => "Equals",
            SpatialOp::Disjoint => "Disjoint",
            SpatialOp::Touches => "Touches",
            SpatialOp::Within => "Within",
            SpatialOp::Overlaps => "Overlaps",
            SpatialOp::Crosses => "Crosses",
            SpatialOp::Intersects => "Intersects",
            SpatialOp::Contains => "Contains",
        }
    }

    pub fn from_element_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.element_name() == name)
    }
}

/// Operands are normalized on encode so the property reference comes first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpatialBinary {
    pub op: SpatialOp,
    pub left: Expression,
    pub right: Expression,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DistanceOp {
    DWithin,
    Beyond,
}

impl DistanceOp {
    pub fn element_name(self) -> &'static str {
        match self {
            DistanceOp::DWithin => "DWithin",
            DistanceOp::Beyond => "Beyond",
        }
    }

    pub fn from_element_name(name: &str) -> Option<Self> {
        match name {
            "DWithin" => Some(DistanceOp::DWithin),
            "Beyond" => Some(DistanceOp::Beyond),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpatialDistance {
    pub op: DistanceOp,
    pub left: Expression,
    pub right: Expression,
    pub distance: f64,
    pub units: String,
}

/// Bounding box predicate. `left` may be absent only in 2.0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    #[serde(default)]
    pub left: Option<Expression>,
    pub right: Expression,
}

/// Temporal operator (2.0 only).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TemporalOp {
    After,
    Before,
    Begins,
    BegunBy,
    TContains,
    During,
    EndedBy,
    Ends,
    TEquals,
    Meets,
    MetBy,
    TOverlaps,
    OverlappedBy,
    AnyInteracts,
}

impl TemporalOp {
    pub const ALL: [TemporalOp; 14] = [
        TemporalOp::After,
        TemporalOp::Before,
        TemporalOp::Begins,
        TemporalOp::BegunBy,
        TemporalOp::TContains,
        TemporalOp::During,
        TemporalOp::EndedBy,
        TemporalOp::Ends,
        TemporalOp::TEquals,
        TemporalOp::Meets,
        TemporalOp::MetBy,
        TemporalOp::TOverlaps,
        TemporalOp::OverlappedBy,
        TemporalOp::AnyInteracts,
    ];

    pub fn element_name(self) -> &'static str {
        match self {
            TemporalOp::After => "After",
            TemporalOp::Before => "Before",
            TemporalOp::Begins => "Begins",
            TemporalOp::BegunBy => "BegunBy",
            TemporalOp::TContains => "TContains",
            TemporalOp::During => "During",
            TemporalOp::EndedBy => "EndedBy",
            TemporalOp::Ends => "Ends",
            TemporalOp::TEquals => "TEquals",
            TemporalOp::Meets => "Meets",
            TemporalOp::MetBy => "MetBy",
            TemporalOp::TOverlaps => "TOverlaps",
            TemporalOp::OverlappedBy => "OverlappedBy",
            TemporalOp::AnyInteracts => "AnyInteracts",
        }
    }

    pub fn from_element_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.element_name() == name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Temporal {
    pub op: TemporalOp,
    pub left: Expression,
    pub right: Expression,
}

/// Non-empty, ordered set of opaque identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct IdSet(BTreeSet<String>);

impl IdSet {
    pub fn new<I, S>(ids: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let set: BTreeSet<String> = ids.into_iter().map(Into::into).collect();
        if set.is_empty() {
            return Err(FilterError::InvalidFilter(
                "identifier predicate requires at least one identifier".into(),
            ));
        }
        Ok(IdSet(set))
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.0.contains(id)
    }
}

impl TryFrom<Vec<String>> for IdSet {
    type Error = FilterError;

    fn try_from(value: Vec<String>) -> Result<Self> {
        IdSet::new(value)
    }
}

impl From<IdSet> for Vec<String> {
    fn from(value: IdSet) -> Self {
        value.0.into_iter().collect()
    }
}

/// One sort key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortProperty {
    pub property: PropertyName,
    #[serde(default = "default_true")]
    pub ascending: bool,
}

impl SortProperty {
    pub fn asc(property: impl Into<String>) -> Self {
        SortProperty {
            property: PropertyName::new(property),
            ascending: true,
        }
    }

    pub fn desc(property: impl Into<String>) -> Self {
        SortProperty {
            property: PropertyName::new(property),
            ascending: false,
        }
    }
}

/// Ordered list of sort keys.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SortBy(pub Vec<SortProperty>);
