//! Observed states, traces, and query resolution
//!
//! An observed state is a snapshot of a page's queryable state, indexed by
//! CSS selector. The DOM driver records, per matched element, a JSON-shaped
//! value for each element state it was asked to observe. `_queryAll` binds
//! those recordings into the value universe.

use crate::error::{EvalError, EvalResult};
use crate::value::{ElementState, Value};
use im::OrdMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use webtl_core::span::Span;

/// A CSS selector
pub type Selector = String;

/// The recorded element states of one matched element
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementStates(pub HashMap<ElementState, serde_json::Value>);

impl ElementStates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, state: ElementState, value: serde_json::Value) -> Self {
        self.0.insert(state, value);
        self
    }
}

/// A snapshot of a web page: selector to matched elements, in match order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObservedState(pub HashMap<Selector, Vec<ElementStates>>);

impl ObservedState {
    /// The state with nothing observed
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with(mut self, selector: impl Into<Selector>, elements: Vec<ElementStates>) -> Self {
        self.0.insert(selector.into(), elements);
        self
    }
}

/// One step of a trace: the observed state and its 1-based index,
/// carried for diagnostics
#[derive(Debug, Clone)]
pub struct TraceElem {
    pub index: usize,
    pub state: ObservedState,
}

/// Number a sequence of observed states into a trace, 1-indexed
pub fn number_trace(states: &[ObservedState]) -> Vec<TraceElem> {
    states
        .iter()
        .enumerate()
        .map(|(i, state)| TraceElem {
            index: i + 1,
            state: state.clone(),
        })
        .collect()
}

/// Lift a JSON-shaped recorded value into the value universe.
///
/// `null` becomes the empty object; numbers become `Int` when integral and
/// `Number` otherwise; arrays and objects lift recursively.
pub fn lift_json(json: &serde_json::Value) -> Value {
    match json {
        serde_json::Value::Null => Value::empty_object(),
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::Number(n) => lift_number(n),
        serde_json::Value::String(s) => Value::text(s),
        serde_json::Value::Array(items) => Value::Array(items.iter().map(lift_json).collect()),
        serde_json::Value::Object(fields) => Value::Object(
            fields
                .iter()
                .map(|(k, v)| (Arc::from(k.as_str()), lift_json(v)))
                .collect(),
        ),
    }
}

fn lift_number(n: &serde_json::Number) -> Value {
    if let Some(i) = n.as_i64() {
        return Value::Int(i);
    }
    let f = n.as_f64().unwrap_or(f64::NAN);
    // A JSON float that is a whole number still reads as an Int
    if f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64 {
        Value::Int(f as i64)
    } else {
        Value::Number(f)
    }
}

/// Resolve a `_queryAll` form against the current observed state.
///
/// `wanted` maps result keys to the element states to project; the result
/// is one object per matched element, in match order.
pub fn resolve_query_all(
    state: &ObservedState,
    selector: &str,
    wanted: &OrdMap<Arc<str>, Value>,
    span: Option<&Span>,
) -> EvalResult<Value> {
    let Some(elements) = state.0.get(selector) else {
        return Err(EvalError::foreign(
            format!("selector not in observed state: {:?}", selector),
            span,
        ));
    };

    let mut results = im::Vector::new();
    for element in elements {
        let mut fields = OrdMap::new();
        for (key, wanted_state) in wanted {
            let element_state = wanted_state.clone().require_element_state(span)?;
            let Some(recorded) = element.0.get(&element_state) else {
                return Err(EvalError::foreign(
                    format!(
                        "element state {:?} not observed for selector {:?}",
                        key, selector
                    ),
                    span,
                ));
            };
            fields.insert(key.clone(), lift_json(recorded));
        }
        results.push_back(Value::Object(fields));
    }
    Ok(Value::Array(results))
}
