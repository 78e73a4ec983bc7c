//! Binding environments
//!
//! An environment maps qualified names to bindings. Module-level
//! definitions are stored as unevaluated expressions; locals (lambda
//! parameters, let bindings, case binders) and installed foreign stubs are
//! stored as values. The map is persistent (`im::HashMap`), so cloning an
//! environment into a closure is O(1).

use crate::value::Value;
use im::HashMap;
use std::sync::Arc;
use webtl_core::ir::{Expr, QName};

/// What a name is bound to
#[derive(Debug, Clone)]
pub enum Binding {
    /// An unevaluated module-level definition, re-evaluated on lookup
    Expr(Arc<Expr>),
    /// An already-computed value (locals, let bindings, foreign stubs)
    Value(Value),
}

/// A name-to-binding mapping with right-biased union
#[derive(Debug, Clone, Default)]
pub struct Env {
    bindings: HashMap<QName, Binding>,
}

impl Env {
    pub fn new() -> Self {
        Env {
            bindings: HashMap::new(),
        }
    }

    /// Bind a name. Never removes; shadowing is achieved by binding order.
    pub fn bind(&mut self, name: QName, binding: Binding) {
        self.bindings.insert(name, binding);
    }

    /// Bind an unqualified name to a value
    pub fn bind_local(&mut self, name: impl Into<String>, value: Value) {
        self.bind(QName::local(name), Binding::Value(value));
    }

    /// Bind a name to an unevaluated expression
    pub fn bind_expr(&mut self, name: QName, expr: Arc<Expr>) {
        self.bind(name, Binding::Expr(expr));
    }

    /// Look a name up
    pub fn lookup(&self, name: &QName) -> Option<&Binding> {
        self.bindings.get(name)
    }

    /// Right-biased union: bindings in `other` shadow bindings in `self`
    pub fn union(&self, other: &Env) -> Env {
        Env {
            // im's union is left-biased, so the shadowing side goes first
            bindings: other.bindings.clone().union(self.bindings.clone()),
        }
    }

    /// Keep only qualified names. Used when re-entering a module-level
    /// expression, which must not capture call-site locals.
    pub fn without_locals(&self) -> Env {
        Env {
            bindings: self
                .bindings
                .iter()
                .filter(|(name, _)| !name.is_local())
                .map(|(name, binding)| (name.clone(), binding.clone()))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}
