//! Core expression evaluator
//!
//! A strict tree-walk over the compiled IR. Evaluation order is fixed:
//! scrutinees left-to-right, let groups in textual order, case
//! alternatives in textual order. Temporal forms are intercepted by the
//! temporal driver before ordinary evaluation (see `temporal`).

use crate::env::{Binding, Env};
use crate::error::{EvalError, EvalResult};
use crate::foreign::ForeignRegistry;
use crate::pattern::match_binders;
use crate::query::TraceElem;
use crate::temporal;
use crate::value::{Closure, DeferValue, RecGroup, Value};
use im::OrdMap;
use std::sync::Arc;
use webtl_core::ir::{
    AltResult, Ann, BindGroup, Expr, Literal, Meta, QName,
};
use webtl_core::span::Span;

/// Evaluation context: the foreign registry and the remaining trace.
///
/// The context is a pair of borrows and copies freely; the temporal driver
/// advances by re-slicing the trace.
#[derive(Clone, Copy)]
pub struct EvalCtx<'a> {
    pub foreign: &'a ForeignRegistry,
    pub trace: &'a [TraceElem],
}

impl<'a> EvalCtx<'a> {
    pub fn new(foreign: &'a ForeignRegistry, trace: &'a [TraceElem]) -> Self {
        EvalCtx { foreign, trace }
    }

    /// The state under examination
    pub fn current(&self) -> Option<&'a TraceElem> {
        self.trace.first()
    }

    /// The context for the rest of the trace
    pub fn advance(&self) -> EvalCtx<'a> {
        debug_assert!(!self.trace.is_empty());
        EvalCtx {
            foreign: self.foreign,
            trace: &self.trace[1..],
        }
    }
}

/// Evaluate an expression to a value.
///
/// The temporal driver runs first: it owns the empty-trace rule and the
/// built-in temporal forms. Everything else is ordinary evaluation.
pub fn eval(ctx: &EvalCtx<'_>, env: &Env, expr: &Expr) -> EvalResult<Value> {
    if let Some(result) = temporal::dispatch(ctx, env, expr) {
        return result;
    }
    eval_core(ctx, env, expr)
}

pub(crate) fn eval_core(ctx: &EvalCtx<'_>, env: &Env, expr: &Expr) -> EvalResult<Value> {
    match expr {
        Expr::Literal(ann, lit) => eval_literal(ctx, env, ann, lit),

        Expr::Var(ann, qname) => {
            // A pending foreign call short-circuits the ordinary lookup
            if let Some(fa) = &ann.foreign_apply {
                return crate::foreign::apply(ctx, env, fa, ann.span.as_ref());
            }
            lookup_value(ctx, env, qname, ann.span.as_ref())
        }

        Expr::Lambda(_, param, body) => Ok(Value::Function(Closure {
            env: env.clone(),
            param: param.clone(),
            body: Arc::new((**body).clone()),
        })),

        Expr::App(ann, callee, arg) => {
            let callee = eval(ctx, env, callee)?;
            let arg = eval(ctx, env, arg)?;
            let closure = callee.require_function(ann.span.as_ref())?;
            apply_closure(ctx, &closure, arg)
        }

        Expr::Case(ann, scrutinees, alternatives) => {
            let values = scrutinees
                .iter()
                .map(|s| eval(ctx, env, s))
                .collect::<EvalResult<Vec<_>>>()?;
            eval_case(ctx, env, ann, &values, alternatives)
        }

        Expr::Let(_, groups, body) => {
            let mut env = env.clone();
            for group in groups {
                extend_with_group(&mut env, group);
            }
            eval(ctx, &env, body)
        }

        Expr::Constructor(ann, _, ctor_name, fields) => {
            eval_constructor(ctx, env, ann, ctor_name, fields)
        }

        Expr::Accessor(ann, field, target) => {
            let object = eval(ctx, env, target)?.require_object(ann.span.as_ref())?;
            object.get(field.as_str()).cloned().ok_or_else(|| {
                EvalError::unexpected(
                    format!("key not present: {:?}", field),
                    ann.span.as_ref(),
                )
            })
        }

        Expr::ObjectUpdate(ann, target, updates) => {
            let mut object = eval(ctx, env, target)?.require_object(ann.span.as_ref())?;
            for (field, update) in updates {
                let value = eval(ctx, env, update)?;
                object.insert(Arc::from(field.as_str()), value);
            }
            Ok(Value::Object(object))
        }
    }
}

/// Resolve a variable to a value: forces deferred bindings and re-enters
/// module-level expressions with call-site locals stripped.
pub(crate) fn lookup_value(
    ctx: &EvalCtx<'_>,
    env: &Env,
    qname: &QName,
    span: Option<&Span>,
) -> EvalResult<Value> {
    match env.lookup(qname) {
        None => Err(EvalError::NotInScope {
            qname: qname.clone(),
            span: span.cloned(),
        }),
        Some(Binding::Expr(definition)) => {
            let definition = definition.clone();
            eval(ctx, &env.without_locals(), &definition)
        }
        Some(Binding::Value(Value::Defer(deferred))) => {
            let deferred = deferred.clone();
            force_defer(ctx, &deferred)
        }
        Some(Binding::Value(value)) => Ok(value.clone()),
    }
}

/// Apply a function value to an already-evaluated argument
pub(crate) fn apply_closure(
    ctx: &EvalCtx<'_>,
    closure: &Closure,
    arg: Value,
) -> EvalResult<Value> {
    let mut env = closure.env.clone();
    env.bind_local(closure.param.clone(), arg);
    eval(ctx, &env, &closure.body)
}

/// Evaluate a deferred expression under its captured environment
pub(crate) fn force_defer(ctx: &EvalCtx<'_>, deferred: &DeferValue) -> EvalResult<Value> {
    match deferred {
        DeferValue::Plain { env, expr } => eval(ctx, env, expr),
        DeferValue::Rec { group, index } => {
            // Rebuild the group environment: every member visible,
            // including the one being forced
            let mut env = group.env.clone();
            for (j, (name, _)) in group.binds.iter().enumerate() {
                env.bind(
                    name.clone(),
                    Binding::Value(Value::Defer(DeferValue::Rec {
                        group: group.clone(),
                        index: j,
                    })),
                );
            }
            let (_, expr) = &group.binds[*index];
            eval(ctx, &env, expr)
        }
    }
}

fn eval_literal(ctx: &EvalCtx<'_>, env: &Env, ann: &Ann, lit: &Literal) -> EvalResult<Value> {
    match lit {
        Literal::Int(i) => Ok(Value::Int(*i)),
        Literal::Number(n) => Ok(Value::Number(*n)),
        Literal::Bool(b) => Ok(Value::Bool(*b)),
        Literal::Char(c) => Ok(Value::Char(*c)),
        Literal::String(lit) => match lit.decode() {
            Some(text) => Ok(Value::text(text)),
            None => Err(EvalError::InvalidString {
                span: ann.span.clone(),
            }),
        },
        Literal::Array(items) => {
            let mut values = im::Vector::new();
            for item in items {
                values.push_back(eval(ctx, env, item)?);
            }
            Ok(Value::Array(values))
        }
        Literal::Object(fields) => {
            let mut object = OrdMap::new();
            for (key, field) in fields {
                let value = eval(ctx, env, field)?;
                object.insert(Arc::from(key.as_str()), value);
            }
            Ok(Value::Object(object))
        }
    }
}

fn eval_case(
    ctx: &EvalCtx<'_>,
    env: &Env,
    ann: &Ann,
    values: &[Value],
    alternatives: &[webtl_core::ir::CaseAlternative],
) -> EvalResult<Value> {
    for alternative in alternatives {
        let Some(bound) = match_binders(&alternative.binders, values) else {
            continue;
        };
        let env = env.union(&bound);
        match &alternative.result {
            AltResult::Unguarded(result) => return eval(ctx, &env, result),
            AltResult::Guarded(guarded) => {
                for (guard, result) in guarded {
                    let passed = eval(ctx, &env, guard)?.require_bool(guard.span())?;
                    if passed {
                        return eval(ctx, &env, result);
                    }
                }
                // No guard passed; fall through to the next alternative
            }
        }
    }
    Err(EvalError::unexpected(
        "non-exhaustive case",
        ann.span.as_ref(),
    ))
}

/// Extend an environment with one let group.
///
/// Non-recursive bindings defer against the environment built so far.
/// Recursive groups materialize a shared slot group whose members see the
/// complete group through their own deferred handles.
fn extend_with_group(env: &mut Env, group: &BindGroup) {
    match group {
        BindGroup::NonRec(bind) => {
            let deferred = DeferValue::Plain {
                env: env.clone(),
                expr: Arc::new(bind.expr.clone()),
            };
            env.bind(bind.name.clone(), Binding::Value(Value::Defer(deferred)));
        }
        BindGroup::Rec(binds) => {
            let group = Arc::new(RecGroup {
                env: env.clone(),
                binds: binds
                    .iter()
                    .map(|bind| (bind.name.clone(), Arc::new(bind.expr.clone())))
                    .collect(),
            });
            for (index, bind) in binds.iter().enumerate() {
                env.bind(
                    bind.name.clone(),
                    Binding::Value(Value::Defer(DeferValue::Rec {
                        group: group.clone(),
                        index,
                    })),
                );
            }
        }
    }
}

/// A data constructor evaluates to a curried chain of lambdas building the
/// canonical `{constructor, fields}` object; a newtype constructor is the
/// identity function.
fn eval_constructor(
    ctx: &EvalCtx<'_>,
    env: &Env,
    ann: &Ann,
    ctor_name: &str,
    field_names: &[String],
) -> EvalResult<Value> {
    if ann.meta == Some(Meta::Newtype) {
        let param = field_names
            .first()
            .cloned()
            .unwrap_or_else(|| "x".to_string());
        let body = Expr::Var(Ann::default(), QName::local(param.clone()));
        return Ok(Value::Function(Closure {
            env: env.clone(),
            param,
            body: Arc::new(body),
        }));
    }

    let tag = Expr::Literal(
        Ann::default(),
        Literal::String(webtl_core::ir::StringLit::from_text(ctor_name)),
    );
    let fields = Expr::Literal(
        Ann::default(),
        Literal::Array(
            field_names
                .iter()
                .map(|f| Expr::Var(Ann::default(), QName::local(f.clone())))
                .collect(),
        ),
    );
    let body = Expr::Literal(
        Ann::default(),
        Literal::Object(vec![
            ("constructor".to_string(), tag),
            ("fields".to_string(), fields),
        ]),
    );
    let chain = field_names.iter().rev().fold(body, |acc, field| {
        Expr::Lambda(Ann::default(), field.clone(), Box::new(acc))
    });
    eval(ctx, env, &chain)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{number_trace, ObservedState};
    use webtl_core::ir::build::*;

    /// Evaluate under a single empty observed state and the default
    /// foreign registry, with the registry's stubs installed
    fn eval_one(env_setup: impl FnOnce(&mut Env), expr: &Expr) -> EvalResult<Value> {
        let foreign = ForeignRegistry::with_defaults();
        let trace = number_trace(&[ObservedState::empty()]);
        let mut env = Env::new();
        foreign.install(&mut env);
        env_setup(&mut env);
        let ctx = EvalCtx::new(&foreign, &trace);
        eval(&ctx, &env, expr)
    }

    fn eval_expr(expr: &Expr) -> EvalResult<Value> {
        eval_one(|_| {}, expr)
    }

    #[test]
    fn test_literals() {
        assert_eq!(eval_expr(&int(3)).unwrap(), Value::Int(3));
        assert_eq!(eval_expr(&number(1.5)).unwrap(), Value::Number(1.5));
        assert_eq!(eval_expr(&bool_lit(true)).unwrap(), Value::Bool(true));
        assert_eq!(eval_expr(&string("hi")).unwrap(), Value::text("hi"));
        assert_eq!(
            eval_expr(&array(vec![int(1), int(2)])).unwrap(),
            Value::array([Value::Int(1), Value::Int(2)]),
        );
    }

    #[test]
    fn test_undecodable_string_literal_fails() {
        let expr = Expr::Literal(
            Ann::default(),
            Literal::String(webtl_core::ir::StringLit(vec![0xDC00])),
        );
        assert!(matches!(
            eval_expr(&expr),
            Err(EvalError::InvalidString { .. })
        ));
    }

    #[test]
    fn test_application_of_non_function_fails() {
        let expr = app(int(1), int(2));
        assert!(matches!(
            eval_expr(&expr),
            Err(EvalError::UnexpectedType { expected: "Function", .. })
        ));
    }

    #[test]
    fn test_closure_captures_definition_site() {
        // let y = 1; f = \x -> y in (\y -> f 99) 2  ==>  1
        let expr = let_(
            vec![
                non_rec("y", int(1)),
                non_rec("f", lambda("x", local("y"))),
            ],
            app(lambda("y", app(local("f"), int(99))), int(2)),
        );
        assert_eq!(eval_expr(&expr).unwrap(), Value::Int(1));
    }

    #[test]
    fn test_let_rec_value_group_terminates() {
        // let rec xs = [1, 2] in xs
        let expr = let_(
            vec![rec(vec![("xs", array(vec![int(1), int(2)]))])],
            local("xs"),
        );
        assert_eq!(
            eval_expr(&expr).unwrap(),
            Value::array([Value::Int(1), Value::Int(2)]),
        );
    }

    #[test]
    fn test_mutual_recursion_through_rec_group() {
        // let rec isEven = \n -> case n of 0 -> true; _ -> isOdd (sub n 1)
        //         isOdd  = \n -> case n of 0 -> false; _ -> isEven (sub n 1)
        // in isEven 10
        let sub = |a: Expr, b: Expr| {
            app2(var(QName::qualified("Spec.Foreign", "sub")), a, b)
        };
        let body = |zero: Expr, other: &str| {
            lambda(
                "n",
                case(
                    vec![local("n")],
                    vec![
                        alt(vec![b_int(0)], zero),
                        alt(
                            vec![b_wild()],
                            app(local(other), sub(local("n"), int(1))),
                        ),
                    ],
                ),
            )
        };
        let expr = let_(
            vec![rec(vec![
                ("isEven", body(bool_lit(true), "isOdd")),
                ("isOdd", body(bool_lit(false), "isEven")),
            ])],
            app(local("isEven"), int(10)),
        );
        assert_eq!(eval_expr(&expr).unwrap(), Value::Bool(true));
    }

    #[test]
    fn test_case_first_matching_alternative_wins() {
        let make = |first_result: i64, second_result: i64| {
            case(
                vec![int(7)],
                vec![
                    alt(vec![b_var("a")], int(first_result)),
                    alt(vec![b_wild()], int(second_result)),
                ],
            )
        };
        assert_eq!(eval_expr(&make(1, 2)).unwrap(), Value::Int(1));
        // Swapping the alternatives changes the observed branch
        let swapped = case(
            vec![int(7)],
            vec![
                alt(vec![b_wild()], int(2)),
                alt(vec![b_var("a")], int(1)),
            ],
        );
        assert_eq!(eval_expr(&swapped).unwrap(), Value::Int(2));
    }

    #[test]
    fn test_case_guard_failure_falls_through_to_next_alternative() {
        // case 5 of x | false -> 1; _ -> 2
        let expr = case(
            vec![int(5)],
            vec![
                guarded_alt(vec![b_var("x")], vec![(bool_lit(false), int(1))]),
                alt(vec![b_wild()], int(2)),
            ],
        );
        assert_eq!(eval_expr(&expr).unwrap(), Value::Int(2));
    }

    #[test]
    fn test_case_guard_selects_first_true() {
        let expr = case(
            vec![int(5)],
            vec![guarded_alt(
                vec![b_var("x")],
                vec![
                    (bool_lit(false), int(1)),
                    (bool_lit(true), int(2)),
                    (bool_lit(true), int(3)),
                ],
            )],
        );
        assert_eq!(eval_expr(&expr).unwrap(), Value::Int(2));
    }

    #[test]
    fn test_non_exhaustive_case_fails() {
        let expr = case(vec![bool_lit(true)], vec![alt(vec![b_bool(false)], int(0))]);
        match eval_expr(&expr) {
            Err(EvalError::UnexpectedError { message, .. }) => {
                assert!(message.contains("non-exhaustive"));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_record_update_preserves_and_adds() {
        // {a: 1, b: 2} updated with {b: 3, c: 4}
        let expr = update(
            object(vec![("a", int(1)), ("b", int(2))]),
            vec![("b", int(3)), ("c", int(4))],
        );
        assert_eq!(
            eval_expr(&expr).unwrap(),
            Value::object([
                ("a", Value::Int(1)),
                ("b", Value::Int(3)),
                ("c", Value::Int(4)),
            ]),
        );
    }

    #[test]
    fn test_accessor_on_missing_field_fails() {
        let expr = accessor("x", object(vec![]));
        match eval_expr(&expr) {
            Err(EvalError::UnexpectedError { message, .. }) => {
                assert!(message.contains("key not present"));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_constructor_builds_canonical_object() {
        // Pair 1 2 ==> {constructor: "Pair", fields: [1, 2]}
        let expr = app2(ctor("Pair", "Pair", vec!["a", "b"]), int(1), int(2));
        assert_eq!(
            eval_expr(&expr).unwrap(),
            Value::object([
                ("constructor", Value::text("Pair")),
                ("fields", Value::array([Value::Int(1), Value::Int(2)])),
            ]),
        );
    }

    #[test]
    fn test_nullary_constructor_is_the_object_itself() {
        let expr = ctor("Maybe", "Nothing", vec![]);
        assert_eq!(
            eval_expr(&expr).unwrap(),
            Value::object([
                ("constructor", Value::text("Nothing")),
                ("fields", Value::array([])),
            ]),
        );
    }

    #[test]
    fn test_newtype_constructor_is_identity() {
        let expr = app(newtype_ctor("Selector", "Selector", "s"), string("#app"));
        assert_eq!(eval_expr(&expr).unwrap(), Value::text("#app"));
    }

    #[test]
    fn test_module_definitions_do_not_capture_call_site_locals() {
        // Main.k is defined as a reference to Main.base; evaluating it
        // under an env with a local `base` shadow must not change it.
        let expr = app(
            lambda("ignored", var(QName::qualified("Main", "k"))),
            int(0),
        );
        let result = eval_one(
            |env| {
                env.bind_expr(
                    QName::qualified("Main", "base"),
                    Arc::new(int(7)),
                );
                env.bind_expr(
                    QName::qualified("Main", "k"),
                    Arc::new(var(QName::qualified("Main", "base"))),
                );
                env.bind_local("base", Value::Int(99));
            },
            &expr,
        );
        assert_eq!(result.unwrap(), Value::Int(7));
    }

    #[test]
    fn test_unbound_variable_reports_not_in_scope_with_span() {
        let span = Span::new(
            "spec.wtl",
            webtl_core::span::Position::new(3, 1),
            webtl_core::span::Position::new(3, 4),
        );
        let expr = var_at(span.clone(), QName::local("foo"));
        match eval_expr(&expr) {
            Err(EvalError::NotInScope { qname, span: err_span }) => {
                assert_eq!(qname, QName::local("foo"));
                assert_eq!(err_span, Some(span));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_later_let_groups_shadow_earlier() {
        let expr = let_(
            vec![non_rec("x", int(1)), non_rec("x", int(2))],
            local("x"),
        );
        assert_eq!(eval_expr(&expr).unwrap(), Value::Int(2));
    }

    #[test]
    fn test_non_recursive_binding_sees_earlier_groups() {
        let expr = let_(
            vec![non_rec("x", int(1)), non_rec("y", local("x"))],
            local("y"),
        );
        assert_eq!(eval_expr(&expr).unwrap(), Value::Int(1));
    }
}
