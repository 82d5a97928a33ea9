//! Expression and literal types of the filter model.

use geo_types::Geometry;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::crs::Crs;

/// A value-producing expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expression {
    /// Constant value: `<Literal>42</Literal>`
    Literal(Literal),

    /// Queryable attribute path: `<PropertyName>road/name</PropertyName>`
    Property(PropertyName),

    /// Named function call with ordered arguments.
    Function {
        name: String,
        #[serde(default)]
        args: Vec<Expression>,
    },

    /// Binary arithmetic: `<Add>`, `<Sub>`, `<Mul>`, `<Div>`
    Arithmetic {
        op: ArithmeticOp,
        left: Box<Expression>,
        right: Box<Expression>,
    },
}

impl Expression {
    pub fn property(path: impl Into<String>) -> Self {
        Expression::Property(PropertyName::new(path))
    }

    pub fn literal(value: impl Into<Literal>) -> Self {
        Expression::Literal(value.into())
    }

    pub fn function(name: impl Into<String>, args: Vec<Expression>) -> Self {
        Expression::Function {
            name: name.into(),
            args,
        }
    }

    pub fn arithmetic(op: ArithmeticOp, left: Expression, right: Expression) -> Self {
        Expression::Arithmetic {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn is_property(&self) -> bool {
        matches!(self, Expression::Property(_))
    }

    pub fn as_property(&self) -> Option<&PropertyName> {
        match self {
            Expression::Property(name) => Some(name),
            _ => None,
        }
    }
}

/// An xpath-like attribute path, possibly namespace-qualified.
///
/// Qualified segments are either `prefix:name` (as written on the wire) or
/// Clark notation `{uri}name` once a decoder has resolved the prefix.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PropertyName(String);

impl PropertyName {
    pub fn new(path: impl Into<String>) -> Self {
        PropertyName(path.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PropertyName {
    fn from(value: &str) -> Self {
        PropertyName::new(value)
    }
}

impl From<String> for PropertyName {
    fn from(value: String) -> Self {
        PropertyName(value)
    }
}

impl fmt::Display for PropertyName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Arithmetic operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArithmeticOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl ArithmeticOp {
    pub const ALL: [ArithmeticOp; 4] = [
        ArithmeticOp::Add,
        ArithmeticOp::Sub,
        ArithmeticOp::Mul,
        ArithmeticOp::Div,
    ];

    /// Element name in 1.x, function name in 2.0.
    pub fn name(self) -> &'static str {
        match self {
            ArithmeticOp::Add => "Add",
            ArithmeticOp::Sub => "Sub",
            ArithmeticOp::Mul => "Mul",
            ArithmeticOp::Div => "Div",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.name() == name)
    }
}

/// Opaque literal value. Carries no version tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Literal {
    String(String),
    Number(f64),
    Color(Color),
    Geometry(GeometryLiteral),
    Envelope(Envelope),
    /// ISO 8601 time position.
    Instant(String),
    /// ISO 8601 time period.
    Period { begin: String, end: String },
}

impl From<&str> for Literal {
    fn from(value: &str) -> Self {
        Literal::String(value.to_string())
    }
}

impl From<String> for Literal {
    fn from(value: String) -> Self {
        Literal::String(value)
    }
}

impl From<f64> for Literal {
    fn from(value: f64) -> Self {
        Literal::Number(value)
    }
}

impl From<Color> for Literal {
    fn from(value: Color) -> Self {
        Literal::Color(value)
    }
}

impl From<GeometryLiteral> for Literal {
    fn from(value: GeometryLiteral) -> Self {
        Literal::Geometry(value)
    }
}

impl From<Envelope> for Literal {
    fn from(value: Envelope) -> Self {
        Literal::Envelope(value)
    }
}

/// An RGB color with alpha; 255 is fully opaque.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
    #[serde(default = "opaque")]
    pub alpha: u8,
}

fn opaque() -> u8 {
    255
}

impl Color {
    pub fn rgb(red: u8, green: u8, blue: u8) -> Self {
        Self::rgba(red, green, blue, 255)
    }

    pub fn rgba(red: u8, green: u8, blue: u8, alpha: u8) -> Self {
        Color {
            red,
            green,
            blue,
            alpha,
        }
    }

    pub fn is_opaque(&self) -> bool {
        self.alpha == 255
    }
}

/// A geometry value with an optional CRS.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeometryLiteral {
    pub geometry: Geometry<f64>,
    #[serde(default)]
    pub crs: Option<Crs>,
}

impl GeometryLiteral {
    pub fn new(geometry: impl Into<Geometry<f64>>, crs: Option<Crs>) -> Self {
        GeometryLiteral {
            geometry: geometry.into(),
            crs,
        }
    }
}

/// An n-dimensional envelope. `lower` and `upper` have the same length.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub lower: Vec<f64>,
    pub upper: Vec<f64>,
    #[serde(default)]
    pub crs: Option<Crs>,
}

impl Envelope {
    pub fn new(lower: Vec<f64>, upper: Vec<f64>, crs: Option<Crs>) -> Self {
        Envelope { lower, upper, crs }
    }

    pub fn from_extent(min_x: f64, min_y: f64, max_x: f64, max_y: f64, crs: Option<Crs>) -> Self {
        Envelope {
            lower: vec![min_x, min_y],
            upper: vec![max_x, max_y],
            crs,
        }
    }

    pub fn dimension(&self) -> usize {
        self.lower.len()
    }
}
