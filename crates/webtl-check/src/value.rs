//! Runtime values
//!
//! This module defines the tagged value universe the evaluator produces.
//! Values are designed to be:
//! - Immutable: no value is mutated after construction; record update
//!   builds a new object
//! - Cheap to clone: arrays and objects are persistent `im` structures,
//!   strings are `Arc<str>`, closures share their captured environment
//! - Printable: every variant renders deterministically for error messages
//!
//! # Value Types
//!
//! | Surface Type | Rust Type |
//! |--------------|-----------|
//! | Bool         | `Value::Bool(bool)` |
//! | Int          | `Value::Int(i64)` |
//! | Number       | `Value::Number(f64)` |
//! | Char         | `Value::Char(char)` |
//! | String       | `Value::String(Arc<str>)` |
//! | Array        | `Value::Array(im::Vector<Value>)` |
//! | Record       | `Value::Object(im::OrdMap<Arc<str>, Value>)` |
//! | Function     | `Value::Function(Closure)` |
//! | (internal)   | `Value::Defer(DeferValue)` |
//! | (query DSL)  | `Value::ElementState(ElementState)` |

use crate::env::Env;
use crate::error::{EvalError, EvalResult};
use im::{OrdMap, Vector};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use webtl_core::ir::{Expr, QName};
use webtl_core::span::Span;

/// A runtime value
#[derive(Debug, Clone)]
pub enum Value {
    /// Boolean
    Bool(bool),
    /// Signed 64-bit integer
    Int(i64),
    /// IEEE-754 double
    Number(f64),
    /// Unicode scalar
    Char(char),
    /// Text
    String(Arc<str>),
    /// Ordered sequence
    Array(Vector<Value>),
    /// Record with unique keys; iteration is in key order
    Object(OrdMap<Arc<str>, Value>),
    /// Closure over the environment visible at its definition site
    Function(Closure),
    /// Not-yet-evaluated expression; forced on lookup
    Defer(DeferValue),
    /// Opaque selector for the DOM query layer
    ElementState(ElementState),
}

/// A function value: captured environment, parameter, body
#[derive(Debug, Clone)]
pub struct Closure {
    pub env: Env,
    pub param: String,
    pub body: Arc<Expr>,
}

/// A deferred expression paired with the environment to evaluate it in.
///
/// `Rec` members reference their binding group through a shared handle and
/// rebuild the group environment on demand; this materializes the letrec
/// fixed point without ownership cycles.
#[derive(Debug, Clone)]
pub enum DeferValue {
    Plain {
        env: Env,
        expr: Arc<Expr>,
    },
    Rec {
        group: Arc<RecGroup>,
        index: usize,
    },
}

/// A mutually recursive binding group: the environment outside the group
/// plus the group's (name, expression) slots
#[derive(Debug)]
pub struct RecGroup {
    pub env: Env,
    pub binds: Vec<(QName, Arc<Expr>)>,
}

/// An opaque token naming a queryable facet of a DOM element.
///
/// These key the per-element maps inside an observed state; the wire form
/// (used by the DOM driver) is a compact string such as `attribute:display`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ElementState {
    /// A DOM property, e.g. `value`
    Property(String),
    /// An HTML attribute, e.g. `display`
    Attribute(String),
    /// A computed CSS value, e.g. `color`
    CssValue(String),
    /// The element's text content
    Text,
    /// Whether the element is enabled
    Enabled,
}

impl ElementState {
    /// Compact wire form, e.g. `property:value`, `text`
    pub fn to_wire(&self) -> String {
        match self {
            ElementState::Property(name) => format!("property:{}", name),
            ElementState::Attribute(name) => format!("attribute:{}", name),
            ElementState::CssValue(name) => format!("css:{}", name),
            ElementState::Text => "text".to_string(),
            ElementState::Enabled => "enabled".to_string(),
        }
    }

    /// Parse the wire form produced by [`ElementState::to_wire`]
    pub fn from_wire(s: &str) -> Option<Self> {
        match s {
            "text" => return Some(ElementState::Text),
            "enabled" => return Some(ElementState::Enabled),
            _ => {}
        }
        let (kind, name) = s.split_once(':')?;
        match kind {
            "property" => Some(ElementState::Property(name.to_string())),
            "attribute" => Some(ElementState::Attribute(name.to_string())),
            "css" => Some(ElementState::CssValue(name.to_string())),
            _ => None,
        }
    }
}

impl fmt::Display for ElementState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementState::Property(name) => write!(f, "property {:?}", name),
            ElementState::Attribute(name) => write!(f, "attribute {:?}", name),
            ElementState::CssValue(name) => write!(f, "cssValue {:?}", name),
            ElementState::Text => write!(f, "text"),
            ElementState::Enabled => write!(f, "enabled"),
        }
    }
}

impl Serialize for ElementState {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_wire())
    }
}

impl<'de> Deserialize<'de> for ElementState {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        ElementState::from_wire(&s)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid element state: {:?}", s)))
    }
}

impl Value {
    /// Build a string value
    pub fn text(s: impl AsRef<str>) -> Value {
        Value::String(Arc::from(s.as_ref()))
    }

    /// Build an array value
    pub fn array(items: impl IntoIterator<Item = Value>) -> Value {
        Value::Array(items.into_iter().collect())
    }

    /// Build an object value
    pub fn object(fields: impl IntoIterator<Item = (&'static str, Value)>) -> Value {
        Value::Object(
            fields
                .into_iter()
                .map(|(k, v)| (Arc::from(k), v))
                .collect(),
        )
    }

    /// The empty object
    pub fn empty_object() -> Value {
        Value::Object(OrdMap::new())
    }

    // === Type name for error messages ===

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Bool(_) => "Bool",
            Value::Int(_) => "Int",
            Value::Number(_) => "Number",
            Value::Char(_) => "Char",
            Value::String(_) => "String",
            Value::Array(_) => "Array",
            Value::Object(_) => "Object",
            Value::Function(_) => "Function",
            Value::Defer(_) => "Defer",
            Value::ElementState(_) => "ElementState",
        }
    }

    // === Checked projections ===

    pub fn require_bool(self, span: Option<&Span>) -> EvalResult<bool> {
        match self {
            Value::Bool(b) => Ok(b),
            other => Err(EvalError::unexpected_type("Bool", &other, span)),
        }
    }

    pub fn require_string(self, span: Option<&Span>) -> EvalResult<Arc<str>> {
        match self {
            Value::String(s) => Ok(s),
            other => Err(EvalError::unexpected_type("String", &other, span)),
        }
    }

    pub fn require_object(self, span: Option<&Span>) -> EvalResult<OrdMap<Arc<str>, Value>> {
        match self {
            Value::Object(o) => Ok(o),
            other => Err(EvalError::unexpected_type("Object", &other, span)),
        }
    }

    pub fn require_function(self, span: Option<&Span>) -> EvalResult<Closure> {
        match self {
            Value::Function(c) => Ok(c),
            other => Err(EvalError::unexpected_type("Function", &other, span)),
        }
    }

    pub fn require_element_state(self, span: Option<&Span>) -> EvalResult<ElementState> {
        match self {
            Value::ElementState(es) => Ok(es),
            other => Err(EvalError::unexpected_type("ElementState", &other, span)),
        }
    }
}

/// Structural equality on data values.
///
/// Functions and deferred values have no user-visible equality; they
/// compare unequal to everything, including themselves.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Char(a), Value::Char(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a == b,
            (Value::ElementState(a), Value::ElementState(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Number(n) => write!(f, "{}", n),
            Value::Char(c) => write!(f, "{:?}", c),
            Value::String(s) => write!(f, "{:?}", s),
            Value::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Value::Object(fields) => {
                write!(f, "{{")?;
                for (i, (k, v)) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", k, v)?;
                }
                write!(f, "}}")
            }
            Value::Function(_) => write!(f, "<function>"),
            Value::Defer(_) => write!(f, "<deferred>"),
            Value::ElementState(es) => write!(f, "{}", es),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structural_equality() {
        assert_eq!(Value::Int(3), Value::Int(3));
        assert_ne!(Value::Int(3), Value::Number(3.0));
        assert_eq!(
            Value::array([Value::Int(1), Value::text("a")]),
            Value::array([Value::Int(1), Value::text("a")]),
        );
        assert_eq!(
            Value::object([("a", Value::Int(1))]),
            Value::object([("a", Value::Int(1))]),
        );
        assert_ne!(
            Value::object([("a", Value::Int(1))]),
            Value::object([("a", Value::Int(2))]),
        );
    }

    #[test]
    fn test_functions_never_equal() {
        let c = Closure {
            env: Env::new(),
            param: "x".to_string(),
            body: Arc::new(webtl_core::ir::build::local("x")),
        };
        let f = Value::Function(c);
        assert_ne!(f.clone(), f);
    }

    #[test]
    fn test_display_is_deterministic_for_objects() {
        // Objects iterate in key order regardless of insertion order
        let a = Value::object([("b", Value::Int(2)), ("a", Value::Int(1))]);
        let b = Value::object([("a", Value::Int(1)), ("b", Value::Int(2))]);
        assert_eq!(a.to_string(), "{a: 1, b: 2}");
        assert_eq!(a.to_string(), b.to_string());
    }

    #[test]
    fn test_display_scalars() {
        assert_eq!(Value::Bool(true).to_string(), "true");
        assert_eq!(Value::text("hi").to_string(), "\"hi\"");
        assert_eq!(Value::Number(1.5).to_string(), "1.5");
        assert_eq!(
            Value::ElementState(ElementState::Attribute("display".into())).to_string(),
            "attribute \"display\"",
        );
    }

    #[test]
    fn test_element_state_wire_round_trip() {
        for es in [
            ElementState::Property("value".into()),
            ElementState::Attribute("display".into()),
            ElementState::CssValue("color".into()),
            ElementState::Text,
            ElementState::Enabled,
        ] {
            assert_eq!(ElementState::from_wire(&es.to_wire()), Some(es));
        }
    }

    #[test]
    fn test_require_bool_reports_actual_type() {
        let err = Value::Int(1).require_bool(None).unwrap_err();
        match err {
            EvalError::UnexpectedType { expected, actual, .. } => {
                assert_eq!(expected, "Bool");
                assert_eq!(actual, "1");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
