//! Temporal driver
//!
//! The driver sits in front of ordinary evaluation and owns two things:
//! the empty-trace rule, and the built-in temporal forms (`always`,
//! `next`, `trace`, `_queryAll`, `_property`, `_attribute`).
//!
//! Short-trace semantics are deliberately asymmetric: `always` converts
//! `Undetermined` from the state under examination into vacuous truth, so
//! an unknown tail does not falsify the conjunction; `next` propagates it.

use crate::env::Env;
use crate::error::{EvalError, EvalResult};
use crate::eval::{eval, EvalCtx};
use crate::query::resolve_query_all;
use crate::value::{ElementState, Value};
use webtl_core::ir::{Ann, Expr};

/// The module under which the built-in forms are bound
pub const BUILTIN_MODULE: &str = "Spec";

/// A recognized built-in application
enum BuiltInForm<'a> {
    Always(&'a Expr),
    Next(&'a Expr),
    Trace { label: &'a Expr, body: &'a Expr },
    QueryAll { selector: &'a Expr, states: &'a Expr },
    Property(&'a Expr),
    Attribute(&'a Expr),
}

fn builtin_arity(name: &str) -> Option<usize> {
    match name {
        "always" | "next" | "_property" | "_attribute" => Some(1),
        "trace" | "_queryAll" => Some(2),
        _ => None,
    }
}

/// Recognize an application of a built-in form.
///
/// Returns `Ok(None)` for ordinary expressions. A built-in head applied to
/// the wrong number of arguments (including appearing bare) is malformed.
fn recognize(expr: &Expr) -> EvalResult<Option<(BuiltInForm<'_>, &Ann)>> {
    let mut head = expr;
    let mut args = Vec::new();
    while let Expr::App(_, callee, arg) = head {
        args.push(&**arg);
        head = callee;
    }
    args.reverse();

    let Expr::Var(_, qname) = head else {
        return Ok(None);
    };
    if qname.module.as_ref().map(|m| m.as_str()) != Some(BUILTIN_MODULE) {
        return Ok(None);
    }
    let Some(arity) = builtin_arity(&qname.name) else {
        return Ok(None);
    };
    if args.len() != arity {
        return Err(EvalError::InvalidBuiltInFunctionApplication {
            name: qname.to_string(),
            arg: match args.len() {
                0 => "no arguments".to_string(),
                n => format!("{} arguments", n),
            },
            span: expr.ann().span.clone(),
        });
    }

    let form = match (qname.name.as_str(), args.as_slice()) {
        ("always", &[p]) => BuiltInForm::Always(p),
        ("next", &[p]) => BuiltInForm::Next(p),
        ("trace", &[label, body]) => BuiltInForm::Trace { label, body },
        ("_queryAll", &[selector, states]) => BuiltInForm::QueryAll { selector, states },
        ("_property", &[name]) => BuiltInForm::Property(name),
        ("_attribute", &[name]) => BuiltInForm::Attribute(name),
        _ => unreachable!("arity checked above"),
    };
    Ok(Some((form, expr.ann())))
}

/// Driver entry, consulted before ordinary evaluation.
///
/// On an empty trace every expression is `Undetermined` except an `always`
/// application, which is vacuously true. On a non-empty trace the built-in
/// forms are interpreted here; everything else falls through to the core
/// evaluator (`None`).
pub(crate) fn dispatch(
    ctx: &EvalCtx<'_>,
    env: &Env,
    expr: &Expr,
) -> Option<EvalResult<Value>> {
    if ctx.trace.is_empty() {
        let vacuous = matches!(recognize(expr), Ok(Some((BuiltInForm::Always(_), _))));
        return Some(if vacuous {
            Ok(Value::Bool(true))
        } else {
            Err(EvalError::Undetermined)
        });
    }
    match recognize(expr) {
        Err(err) => Some(Err(err)),
        Ok(None) => None,
        Ok(Some((form, ann))) => Some(eval_builtin(ctx, env, expr, form, ann)),
    }
}

fn eval_builtin(
    ctx: &EvalCtx<'_>,
    env: &Env,
    whole: &Expr,
    form: BuiltInForm<'_>,
    ann: &Ann,
) -> EvalResult<Value> {
    match form {
        BuiltInForm::Always(p) => {
            // The state under examination: Undetermined reads as true so a
            // late-trace unknown cannot falsify the conjunction
            let head = match eval(ctx, env, p) {
                Err(EvalError::Undetermined) => Value::Bool(true),
                other => other?,
            };
            let head = head.require_bool(p.span())?;
            let rest = eval(&ctx.advance(), env, whole)?.require_bool(ann.span.as_ref())?;
            Ok(Value::Bool(head && rest))
        }

        BuiltInForm::Next(p) => eval(&ctx.advance(), env, p),

        BuiltInForm::Trace { label, body } => {
            let label = eval(ctx, env, label)?.require_string(label.span())?;
            let index = ctx.current().expect("trace is non-empty").index;
            match &ann.span {
                Some(span) => {
                    tracing::info!(target: "webtl::trace", state = index, location = %span, label = %label)
                }
                None => tracing::info!(target: "webtl::trace", state = index, label = %label),
            }
            eval(ctx, env, body)
        }

        BuiltInForm::Property(name) => {
            let name = eval(ctx, env, name)?.require_string(name.span())?;
            Ok(Value::ElementState(ElementState::Property(name.to_string())))
        }

        BuiltInForm::Attribute(name) => {
            let name = eval(ctx, env, name)?.require_string(name.span())?;
            Ok(Value::ElementState(ElementState::Attribute(
                name.to_string(),
            )))
        }

        BuiltInForm::QueryAll { selector, states } => {
            let sel = eval(ctx, env, selector)?.require_string(selector.span())?;
            let wanted = eval(ctx, env, states)?.require_object(states.span())?;
            let current = ctx.current().expect("trace is non-empty");
            resolve_query_all(&current.state, &sel, &wanted, ann.span.as_ref())
        }
    }
}
