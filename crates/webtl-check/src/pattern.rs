//! Pattern matching for case alternatives
//!
//! Given the binders of an alternative and the scrutinee values, produce
//! either the additional bindings the alternative introduces or no match.
//! The matcher is pure and total: it never raises.

use crate::env::Env;
use crate::value::Value;
use webtl_core::ir::{Binder, LitBinder, Meta};

/// Match an alternative's binders against the scrutinee values.
///
/// Returns the environment of bindings the match introduces, or `None`
/// when any binder fails. Binder and value counts must agree; a count
/// mismatch is simply no match.
pub fn match_binders(binders: &[Binder], values: &[Value]) -> Option<Env> {
    if binders.len() != values.len() {
        return None;
    }
    let mut bound = Env::new();
    for (binder, value) in binders.iter().zip(values) {
        if !match_binder(binder, value, &mut bound) {
            return None;
        }
    }
    Some(bound)
}

fn match_binder(binder: &Binder, value: &Value, bound: &mut Env) -> bool {
    match binder {
        Binder::Wildcard(_) => true,

        Binder::Var(_, name) => {
            bound.bind_local(name.clone(), value.clone());
            true
        }

        Binder::Named(_, name, inner) => {
            if match_binder(inner, value, bound) {
                bound.bind_local(name.clone(), value.clone());
                true
            } else {
                false
            }
        }

        Binder::Literal(_, lit) => match_literal(lit, value, bound),

        Binder::Ctor(ann, _, ctor_name, binders) => {
            if ann.meta == Some(Meta::Newtype) {
                // Newtype constructors are transparent: match the single
                // inner binder against the value directly.
                match binders.as_slice() {
                    [inner] => match_binder(inner, value, bound),
                    _ => false,
                }
            } else {
                match_ctor(&ctor_name.name, binders, value, bound)
            }
        }
    }
}

/// A non-newtype constructor value is the canonical object
/// `{constructor: <name>, fields: [...]}`.
fn match_ctor(ctor_name: &str, binders: &[Binder], value: &Value, bound: &mut Env) -> bool {
    let Value::Object(fields) = value else {
        return false;
    };
    let Some(Value::String(tag)) = fields.get("constructor") else {
        return false;
    };
    if tag.as_ref() != ctor_name {
        return false;
    }
    let Some(Value::Array(args)) = fields.get("fields") else {
        return false;
    };
    if binders.len() != args.len() {
        return false;
    }
    binders
        .iter()
        .zip(args.iter())
        .all(|(b, v)| match_binder(b, v, bound))
}

fn match_literal(lit: &LitBinder, value: &Value, bound: &mut Env) -> bool {
    match (lit, value) {
        (LitBinder::Bool(a), Value::Bool(b)) => a == b,
        (LitBinder::Int(a), Value::Int(b)) => a == b,
        (LitBinder::Number(a), Value::Number(b)) => a == b,
        (LitBinder::Char(a), Value::Char(b)) => a == b,
        // String literals are decoded and compared as text; an
        // undecodable literal fails the match (the matcher cannot raise)
        (LitBinder::String(a), Value::String(b)) => {
            a.decode().as_deref() == Some(b.as_ref())
        }
        // Array binders match a prefix; excess array elements are ignored
        (LitBinder::Array(binders), Value::Array(items)) => {
            binders.len() <= items.len()
                && binders
                    .iter()
                    .zip(items.iter())
                    .all(|(b, v)| match_binder(b, v, bound))
        }
        // Every named field must be present and match; missing keys fail
        (LitBinder::Object(entries), Value::Object(fields)) => {
            entries.iter().all(|(key, binder)| match fields.get(key.as_str()) {
                Some(v) => match_binder(binder, v, bound),
                None => false,
            })
        }
        _ => false,
    }
}
