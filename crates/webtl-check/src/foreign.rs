//! Foreign function dispatch
//!
//! Foreign primitives live in a registry keyed by qualified name. Each
//! entry stores its arity explicitly next to an invocable record; stubs
//! installed into the environment are n-ary lambda chains whose innermost
//! body is a variable annotated with the pending call, so by the time that
//! variable is evaluated every parameter is bound.
//!
//! The marshalling layer converts between native Rust types and the value
//! universe in both directions; `Function` values cross to the native side
//! as [`Callback`]s that push arguments and evaluate.

use crate::env::Env;
use crate::error::{EvalError, EvalResult};
use crate::eval::{apply_closure, lookup_value, EvalCtx};
use crate::value::{Closure, Value};
use im::{OrdMap, Vector};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use webtl_core::ir::{Ann, Expr, ForeignApply, Meta, QName};
use webtl_core::span::Span;

/// The module space of the default primitive library
pub const FOREIGN_MODULE: &str = "Spec.Foreign";

type Invoke =
    Box<dyn Fn(&EvalCtx<'_>, Option<&Span>, &[Value]) -> EvalResult<Value> + Send + Sync>;

/// A foreign primitive: explicit arity plus the native implementation
pub struct ForeignFunc {
    arity: usize,
    invoke: Invoke,
}

impl ForeignFunc {
    pub fn new(
        arity: usize,
        invoke: impl Fn(&EvalCtx<'_>, Option<&Span>, &[Value]) -> EvalResult<Value>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        ForeignFunc {
            arity,
            invoke: Box::new(invoke),
        }
    }

    pub fn arity(&self) -> usize {
        self.arity
    }

    pub fn invoke(
        &self,
        ctx: &EvalCtx<'_>,
        span: Option<&Span>,
        args: &[Value],
    ) -> EvalResult<Value> {
        if args.len() != self.arity {
            return Err(EvalError::foreign(
                format!("arity mismatch: expected {}, got {}", self.arity, args.len()),
                span,
            ));
        }
        (self.invoke)(ctx, span, args)
    }
}

impl std::fmt::Debug for ForeignFunc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ForeignFunc").field("arity", &self.arity).finish()
    }
}

/// The registry of foreign primitives. Built once during environment
/// initialization and read-only thereafter.
#[derive(Debug, Default)]
pub struct ForeignRegistry {
    funcs: FxHashMap<QName, ForeignFunc>,
}

impl ForeignRegistry {
    /// An empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// The default primitive library under `Spec.Foreign`
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        install_defaults(&mut registry);
        registry
    }

    pub fn register(&mut self, qname: QName, func: ForeignFunc) {
        self.funcs.insert(qname, func);
    }

    pub fn get(&self, qname: &QName) -> Option<&ForeignFunc> {
        self.funcs.get(qname)
    }

    /// Install a stub for every registered primitive into the environment
    pub fn install(&self, env: &mut Env) {
        for (qname, func) in &self.funcs {
            env.bind_expr(qname.clone(), Arc::new(stub_expr(qname, func.arity())));
        }
    }
}

/// The stub for an n-ary primitive: lambdas over a variable carrying the
/// pending foreign call
fn stub_expr(qname: &QName, arity: usize) -> Expr {
    let params: Vec<String> = (0..arity).map(|i| format!("arg{}", i)).collect();
    let ann = Ann::default()
        .with_meta(Meta::Foreign)
        .with_foreign_apply(ForeignApply {
            qname: qname.clone(),
            params: params.clone(),
        });
    let body = Expr::Var(ann, qname.clone());
    params
        .iter()
        .rev()
        .fold(body, |acc, param| {
            Expr::Lambda(Ann::default(), param.clone(), Box::new(acc))
        })
}

/// Dispatch a pending foreign call: resolve the registry entry, collect
/// the bound parameters, and invoke
pub(crate) fn apply(
    ctx: &EvalCtx<'_>,
    env: &Env,
    fa: &ForeignApply,
    span: Option<&Span>,
) -> EvalResult<Value> {
    let Some(func) = ctx.foreign.get(&fa.qname) else {
        return Err(EvalError::ForeignFunctionNotSupported {
            qname: fa.qname.clone(),
            span: span.cloned(),
        });
    };
    let mut args = Vec::with_capacity(fa.params.len());
    for param in &fa.params {
        args.push(lookup_value(ctx, env, &QName::local(param.clone()), span)?);
    }
    func.invoke(ctx, span, &args)
}

// ============================================================================
// Marshalling
// ============================================================================

/// Native-to-value conversion
pub trait IntoValue {
    fn into_value(self) -> Value;
}

/// Value-to-native conversion; failures name the expected tag
pub trait FromValue: Sized {
    const EXPECTED: &'static str;

    fn from_value(value: Value, span: Option<&Span>) -> EvalResult<Self>;
}

impl IntoValue for Value {
    fn into_value(self) -> Value {
        self
    }
}

impl IntoValue for bool {
    fn into_value(self) -> Value {
        Value::Bool(self)
    }
}

impl IntoValue for i64 {
    fn into_value(self) -> Value {
        Value::Int(self)
    }
}

impl IntoValue for f64 {
    fn into_value(self) -> Value {
        Value::Number(self)
    }
}

impl IntoValue for char {
    fn into_value(self) -> Value {
        Value::Char(self)
    }
}

impl IntoValue for String {
    fn into_value(self) -> Value {
        Value::text(self)
    }
}

impl IntoValue for Arc<str> {
    fn into_value(self) -> Value {
        Value::String(self)
    }
}

impl<T: IntoValue> IntoValue for Vec<T> {
    fn into_value(self) -> Value {
        Value::Array(self.into_iter().map(IntoValue::into_value).collect())
    }
}

impl IntoValue for Vector<Value> {
    fn into_value(self) -> Value {
        Value::Array(self)
    }
}

impl IntoValue for OrdMap<Arc<str>, Value> {
    fn into_value(self) -> Value {
        Value::Object(self)
    }
}

impl FromValue for Value {
    const EXPECTED: &'static str = "Value";

    fn from_value(value: Value, _span: Option<&Span>) -> EvalResult<Self> {
        Ok(value)
    }
}

impl FromValue for bool {
    const EXPECTED: &'static str = "Bool";

    fn from_value(value: Value, span: Option<&Span>) -> EvalResult<Self> {
        match value {
            Value::Bool(b) => Ok(b),
            other => Err(EvalError::unexpected_type(Self::EXPECTED, &other, span)),
        }
    }
}

impl FromValue for i64 {
    const EXPECTED: &'static str = "Int";

    fn from_value(value: Value, span: Option<&Span>) -> EvalResult<Self> {
        match value {
            Value::Int(i) => Ok(i),
            other => Err(EvalError::unexpected_type(Self::EXPECTED, &other, span)),
        }
    }
}

impl FromValue for f64 {
    const EXPECTED: &'static str = "Number";

    fn from_value(value: Value, span: Option<&Span>) -> EvalResult<Self> {
        match value {
            Value::Number(n) => Ok(n),
            other => Err(EvalError::unexpected_type(Self::EXPECTED, &other, span)),
        }
    }
}

impl FromValue for char {
    const EXPECTED: &'static str = "Char";

    fn from_value(value: Value, span: Option<&Span>) -> EvalResult<Self> {
        match value {
            Value::Char(c) => Ok(c),
            other => Err(EvalError::unexpected_type(Self::EXPECTED, &other, span)),
        }
    }
}

impl FromValue for String {
    const EXPECTED: &'static str = "String";

    fn from_value(value: Value, span: Option<&Span>) -> EvalResult<Self> {
        match value {
            Value::String(s) => Ok(s.to_string()),
            other => Err(EvalError::unexpected_type(Self::EXPECTED, &other, span)),
        }
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    const EXPECTED: &'static str = "Array";

    fn from_value(value: Value, span: Option<&Span>) -> EvalResult<Self> {
        match value {
            Value::Array(items) => items
                .into_iter()
                .map(|item| T::from_value(item, span))
                .collect(),
            other => Err(EvalError::unexpected_type(Self::EXPECTED, &other, span)),
        }
    }
}

impl<T: FromValue + Clone> FromValue for OrdMap<Arc<str>, T> {
    const EXPECTED: &'static str = "Object";

    fn from_value(value: Value, span: Option<&Span>) -> EvalResult<Self> {
        match value {
            Value::Object(fields) => fields
                .into_iter()
                .map(|(k, v)| Ok((k, T::from_value(v, span)?)))
                .collect(),
            other => Err(EvalError::unexpected_type(Self::EXPECTED, &other, span)),
        }
    }
}

/// A function value held by the native side; arguments are pushed into the
/// closure's environment and the body evaluated on call
#[derive(Debug, Clone)]
pub struct Callback(Closure);

impl Callback {
    pub fn call(&self, ctx: &EvalCtx<'_>, _span: Option<&Span>, arg: Value) -> EvalResult<Value> {
        apply_closure(ctx, &self.0, arg)
    }

    /// Call a curried two-argument function
    pub fn call2(
        &self,
        ctx: &EvalCtx<'_>,
        span: Option<&Span>,
        first: Value,
        second: Value,
    ) -> EvalResult<Value> {
        let partial = self.call(ctx, span, first)?.require_function(span)?;
        apply_closure(ctx, &partial, second)
    }
}

impl FromValue for Callback {
    const EXPECTED: &'static str = "Function";

    fn from_value(value: Value, span: Option<&Span>) -> EvalResult<Self> {
        match value {
            Value::Function(c) => Ok(Callback(c)),
            other => Err(EvalError::unexpected_type(Self::EXPECTED, &other, span)),
        }
    }
}

// ============================================================================
// Actions
// ============================================================================

/// A user-interface action the harness can perform
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", content = "argument", rename_all = "camelCase")]
pub enum Action {
    /// Focus the first element matched by the selector
    Focus(String),
    /// Press a key in the focused element
    KeyPress(char),
    /// Click the first element matched by the selector
    Click(String),
    /// Navigate to the URL or path
    Navigate(String),
}

impl IntoValue for Action {
    fn into_value(self) -> Value {
        let (tag, argument) = match self {
            Action::Focus(s) => ("Focus", Value::text(s)),
            Action::KeyPress(c) => ("KeyPress", Value::Char(c)),
            Action::Click(s) => ("Click", Value::text(s)),
            Action::Navigate(s) => ("Navigate", Value::text(s)),
        };
        Value::object([
            ("constructor", Value::text(tag)),
            ("fields", Value::array([argument])),
        ])
    }
}

impl FromValue for Action {
    const EXPECTED: &'static str = "Action";

    fn from_value(value: Value, span: Option<&Span>) -> EvalResult<Self> {
        let Value::Object(fields) = &value else {
            return Err(EvalError::unexpected_type(Self::EXPECTED, &value, span));
        };
        let (Some(Value::String(tag)), Some(Value::Array(args))) =
            (fields.get("constructor"), fields.get("fields"))
        else {
            return Err(EvalError::unexpected_type(Self::EXPECTED, &value, span));
        };
        let arg = |i: usize| -> EvalResult<Value> {
            args.get(i).cloned().ok_or_else(|| {
                EvalError::foreign(
                    format!("action constructor {:?} is missing field {}", tag, i),
                    span,
                )
            })
        };
        match tag.as_ref() {
            "Focus" => Ok(Action::Focus(String::from_value(arg(0)?, span)?)),
            "KeyPress" => Ok(Action::KeyPress(char::from_value(arg(0)?, span)?)),
            "Click" => Ok(Action::Click(String::from_value(arg(0)?, span)?)),
            "Navigate" => Ok(Action::Navigate(String::from_value(arg(0)?, span)?)),
            other => Err(EvalError::foreign(
                format!("unknown action constructor: {:?}", other),
                span,
            )),
        }
    }
}

// ============================================================================
// Default primitive library
// ============================================================================

fn qname(name: &str) -> QName {
    QName::qualified(FOREIGN_MODULE, name)
}

fn foreign1<A, R>(f: impl Fn(A) -> EvalResult<R> + Send + Sync + 'static) -> ForeignFunc
where
    A: FromValue,
    R: IntoValue,
{
    ForeignFunc::new(1, move |_ctx, span, args| {
        let a = A::from_value(args[0].clone(), span)?;
        Ok(f(a)?.into_value())
    })
}

fn foreign2<A, B, R>(f: impl Fn(A, B) -> EvalResult<R> + Send + Sync + 'static) -> ForeignFunc
where
    A: FromValue,
    B: FromValue,
    R: IntoValue,
{
    ForeignFunc::new(2, move |_ctx, span, args| {
        let a = A::from_value(args[0].clone(), span)?;
        let b = B::from_value(args[1].clone(), span)?;
        Ok(f(a, b)?.into_value())
    })
}

/// Numeric binary operator: Int op Int stays Int, anything else numeric
/// promotes to Number
fn arith(
    int_op: impl Fn(i64, i64) -> Option<i64> + Send + Sync + 'static,
    num_op: impl Fn(f64, f64) -> f64 + Send + Sync + 'static,
) -> ForeignFunc {
    ForeignFunc::new(2, move |_ctx, span, args| {
        match (&args[0], &args[1]) {
            (Value::Int(a), Value::Int(b)) => int_op(*a, *b)
                .map(Value::Int)
                .ok_or_else(|| EvalError::foreign("integer overflow or division by zero", span)),
            (Value::Int(a), Value::Number(b)) => Ok(Value::Number(num_op(*a as f64, *b))),
            (Value::Number(a), Value::Int(b)) => Ok(Value::Number(num_op(*a, *b as f64))),
            (Value::Number(a), Value::Number(b)) => Ok(Value::Number(num_op(*a, *b))),
            (Value::Int(_), other) | (Value::Number(_), other) | (other, _) => {
                Err(EvalError::unexpected_type("Int or Number", other, span))
            }
        }
    })
}

/// Ordering comparison over Int, Number, String, and Char
fn compare(decide: impl Fn(std::cmp::Ordering) -> bool + Send + Sync + 'static) -> ForeignFunc {
    ForeignFunc::new(2, move |_ctx, span, args| {
        let ordering = match (&args[0], &args[1]) {
            (Value::Int(a), Value::Int(b)) => a.cmp(b),
            (Value::Int(a), Value::Number(b)) => total_cmp(*a as f64, *b),
            (Value::Number(a), Value::Int(b)) => total_cmp(*a, *b as f64),
            (Value::Number(a), Value::Number(b)) => total_cmp(*a, *b),
            (Value::String(a), Value::String(b)) => a.cmp(b),
            (Value::Char(a), Value::Char(b)) => a.cmp(b),
            (other, _) => {
                return Err(EvalError::unexpected_type(
                    "Int, Number, String or Char",
                    other,
                    span,
                ))
            }
        };
        Ok(Value::Bool(decide(ordering)))
    })
}

fn total_cmp(a: f64, b: f64) -> std::cmp::Ordering {
    a.partial_cmp(&b).unwrap_or(std::cmp::Ordering::Equal)
}

fn install_defaults(registry: &mut ForeignRegistry) {
    use std::cmp::Ordering::*;

    // Arithmetic
    registry.register(qname("add"), arith(i64::checked_add, |a, b| a + b));
    registry.register(qname("sub"), arith(i64::checked_sub, |a, b| a - b));
    registry.register(qname("mul"), arith(i64::checked_mul, |a, b| a * b));
    registry.register(qname("div"), arith(i64::checked_div, |a, b| a / b));
    registry.register(qname("mod"), arith(i64::checked_rem, |a, b| a % b));
    registry.register(
        qname("negate"),
        ForeignFunc::new(1, |_ctx, span, args| match &args[0] {
            Value::Int(i) => i
                .checked_neg()
                .map(Value::Int)
                .ok_or_else(|| EvalError::foreign("integer overflow", span)),
            Value::Number(n) => Ok(Value::Number(-n)),
            other => Err(EvalError::unexpected_type("Int or Number", other, span)),
        }),
    );

    // Equality and ordering
    registry.register(
        qname("eq"),
        ForeignFunc::new(2, |_ctx, _span, args| {
            Ok(Value::Bool(args[0] == args[1]))
        }),
    );
    registry.register(
        qname("neq"),
        ForeignFunc::new(2, |_ctx, _span, args| {
            Ok(Value::Bool(args[0] != args[1]))
        }),
    );
    registry.register(qname("less"), compare(|o| o == Less));
    registry.register(qname("lessEq"), compare(|o| o != Greater));
    registry.register(qname("greater"), compare(|o| o == Greater));
    registry.register(qname("greaterEq"), compare(|o| o != Less));

    // Booleans
    registry.register(qname("and"), foreign2(|a: bool, b: bool| Ok(a && b)));
    registry.register(qname("or"), foreign2(|a: bool, b: bool| Ok(a || b)));
    registry.register(qname("not"), foreign1(|a: bool| Ok(!a)));

    // Strings
    registry.register(
        qname("stringConcat"),
        foreign2(|a: String, b: String| Ok(a + &b)),
    );
    registry.register(
        qname("stringLength"),
        foreign1(|s: String| Ok(s.chars().count() as i64)),
    );
    registry.register(
        qname("stringSplit"),
        foreign2(|sep: String, s: String| {
            Ok(s.split(&sep).map(str::to_string).collect::<Vec<_>>())
        }),
    );
    registry.register(qname("stringTrim"), foreign1(|s: String| Ok(s.trim().to_string())));

    // Arrays
    registry.register(
        qname("arrayBind"),
        ForeignFunc::new(2, |ctx, span, args| {
            let items: Vec<Value> = FromValue::from_value(args[0].clone(), span)?;
            let f = Callback::from_value(args[1].clone(), span)?;
            let mut out = Vector::new();
            for item in items {
                let produced: Vec<Value> =
                    FromValue::from_value(f.call(ctx, span, item)?, span)?;
                out.extend(produced);
            }
            Ok(Value::Array(out))
        }),
    );
    registry.register(
        qname("arrayMap"),
        ForeignFunc::new(2, |ctx, span, args| {
            let f = Callback::from_value(args[0].clone(), span)?;
            let items: Vec<Value> = FromValue::from_value(args[1].clone(), span)?;
            let mut out = Vector::new();
            for item in items {
                out.push_back(f.call(ctx, span, item)?);
            }
            Ok(Value::Array(out))
        }),
    );
    registry.register(
        qname("arrayFilter"),
        ForeignFunc::new(2, |ctx, span, args| {
            let f = Callback::from_value(args[0].clone(), span)?;
            let items: Vec<Value> = FromValue::from_value(args[1].clone(), span)?;
            let mut out = Vector::new();
            for item in items {
                if bool::from_value(f.call(ctx, span, item.clone())?, span)? {
                    out.push_back(item);
                }
            }
            Ok(Value::Array(out))
        }),
    );
    registry.register(
        qname("arrayLength"),
        foreign1(|items: Vec<Value>| Ok(items.len() as i64)),
    );
    registry.register(
        qname("range"),
        foreign2(|a: i64, b: i64| {
            let out: Vec<i64> = if a <= b {
                (a..=b).collect()
            } else {
                (b..=a).rev().collect()
            };
            Ok(out)
        }),
    );
    registry.register(
        qname("foldl"),
        ForeignFunc::new(3, |ctx, span, args| {
            let f = Callback::from_value(args[0].clone(), span)?;
            let mut acc = args[1].clone();
            let items: Vec<Value> = FromValue::from_value(args[2].clone(), span)?;
            for item in items {
                acc = f.call2(ctx, span, acc, item)?;
            }
            Ok(acc)
        }),
    );

    // Objects
    registry.register(
        qname("objectKeys"),
        foreign1(|fields: OrdMap<Arc<str>, Value>| {
            Ok(fields.keys().cloned().collect::<Vec<Arc<str>>>())
        }),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{number_trace, ObservedState};
    use webtl_core::ir::build::*;

    fn eval_with_defaults(expr: &Expr) -> EvalResult<Value> {
        let foreign = ForeignRegistry::with_defaults();
        let trace = number_trace(&[ObservedState::empty()]);
        let mut env = Env::new();
        foreign.install(&mut env);
        let ctx = EvalCtx::new(&foreign, &trace);
        crate::eval::eval(&ctx, &env, expr)
    }

    fn prim(name: &str) -> Expr {
        var(QName::qualified(FOREIGN_MODULE, name))
    }

    #[test]
    fn test_arithmetic_int_and_promotion() {
        let e = app2(prim("add"), int(2), int(3));
        assert_eq!(eval_with_defaults(&e).unwrap(), Value::Int(5));

        let e = app2(prim("mul"), int(2), number(1.5));
        assert_eq!(eval_with_defaults(&e).unwrap(), Value::Number(3.0));
    }

    #[test]
    fn test_division_by_zero_is_a_foreign_error() {
        let e = app2(prim("div"), int(1), int(0));
        assert!(matches!(
            eval_with_defaults(&e),
            Err(EvalError::ForeignFunctionError { .. })
        ));
    }

    #[test]
    fn test_comparison_across_kinds() {
        let e = app2(prim("less"), int(1), number(1.5));
        assert_eq!(eval_with_defaults(&e).unwrap(), Value::Bool(true));

        let e = app2(prim("greaterEq"), string("b"), string("a"));
        assert_eq!(eval_with_defaults(&e).unwrap(), Value::Bool(true));
    }

    #[test]
    fn test_eq_is_structural() {
        let e = app2(
            prim("eq"),
            array(vec![object(vec![("a", int(1))])]),
            array(vec![object(vec![("a", int(1))])]),
        );
        assert_eq!(eval_with_defaults(&e).unwrap(), Value::Bool(true));
    }

    #[test]
    fn test_array_bind_flattens() {
        // arrayBind [1, 2] (\x -> [x, x])
        let e = app2(
            prim("arrayBind"),
            array(vec![int(1), int(2)]),
            lambda("x", array(vec![local("x"), local("x")])),
        );
        assert_eq!(
            eval_with_defaults(&e).unwrap(),
            Value::array([Value::Int(1), Value::Int(1), Value::Int(2), Value::Int(2)]),
        );
    }

    #[test]
    fn test_array_bind_with_non_array_argument_names_the_expected_tag() {
        let e = app2(prim("arrayBind"), int(1), lambda("x", local("x")));
        match eval_with_defaults(&e) {
            Err(EvalError::UnexpectedType { expected, .. }) => assert_eq!(expected, "Array"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_array_map_invokes_the_callback() {
        let e = app2(
            prim("arrayMap"),
            lambda("x", app2(prim("add"), local("x"), int(10))),
            array(vec![int(1), int(2)]),
        );
        assert_eq!(
            eval_with_defaults(&e).unwrap(),
            Value::array([Value::Int(11), Value::Int(12)]),
        );
    }

    #[test]
    fn test_foldl_threads_the_accumulator() {
        // foldl add 0 [1, 2, 3]
        let e = app(
            app2(prim("foldl"), prim("add"), int(0)),
            array(vec![int(1), int(2), int(3)]),
        );
        assert_eq!(eval_with_defaults(&e).unwrap(), Value::Int(6));
    }

    #[test]
    fn test_range_is_inclusive_both_directions() {
        let e = app2(prim("range"), int(1), int(3));
        assert_eq!(
            eval_with_defaults(&e).unwrap(),
            Value::array([Value::Int(1), Value::Int(2), Value::Int(3)]),
        );
        let e = app2(prim("range"), int(3), int(1));
        assert_eq!(
            eval_with_defaults(&e).unwrap(),
            Value::array([Value::Int(3), Value::Int(2), Value::Int(1)]),
        );
    }

    #[test]
    fn test_unregistered_foreign_function_is_not_supported() {
        let registry = ForeignRegistry::with_defaults();
        let trace = number_trace(&[ObservedState::empty()]);
        let mut env = Env::new();
        registry.install(&mut env);
        // A stub pointing at a name missing from the registry
        let missing = QName::qualified(FOREIGN_MODULE, "missing");
        env.bind_expr(missing.clone(), Arc::new(stub_expr(&missing, 0)));
        let ctx = EvalCtx::new(&registry, &trace);
        let result = crate::eval::eval(&ctx, &env, &var(missing));
        assert!(matches!(
            result,
            Err(EvalError::ForeignFunctionNotSupported { .. })
        ));
    }

    #[test]
    fn test_invoke_checks_arity() {
        let func = foreign1(|a: i64| Ok(a));
        let registry = ForeignRegistry::new();
        let trace = number_trace(&[ObservedState::empty()]);
        let ctx = EvalCtx::new(&registry, &trace);
        let err = func
            .invoke(&ctx, None, &[Value::Int(1), Value::Int(2)])
            .unwrap_err();
        assert!(matches!(err, EvalError::ForeignFunctionError { .. }));
    }

    #[test]
    fn test_action_marshalling_round_trip() {
        for action in [
            Action::Focus("#input".to_string()),
            Action::KeyPress('\n'),
            Action::Click(".submit".to_string()),
            Action::Navigate("/home".to_string()),
        ] {
            let value = action.clone().into_value();
            assert_eq!(Action::from_value(value, None).unwrap(), action);
        }
    }

    #[test]
    fn test_unknown_action_constructor_is_a_foreign_error() {
        let value = Value::object([
            ("constructor", Value::text("Scroll")),
            ("fields", Value::array([])),
        ]);
        assert!(matches!(
            Action::from_value(value, None),
            Err(EvalError::ForeignFunctionError { .. })
        ));
    }

    #[test]
    fn test_non_object_action_is_a_type_error() {
        assert!(matches!(
            Action::from_value(Value::Int(1), None),
            Err(EvalError::UnexpectedType { expected: "Action", .. })
        ));
    }
}
