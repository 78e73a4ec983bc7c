//! Specification façade
//!
//! A [`Program`] is a loaded module set plus the foreign registry, with the
//! user's main module distinguished. It resolves the named entry points
//! (`origin`, `readyWhen`, `actions`, `proposition`) and exposes
//! [`Program::verify`], which decides the proposition over a trace.

use crate::env::{Binding, Env};
use crate::error::{EvalError, EvalResult};
use crate::eval::{eval, EvalCtx};
use crate::foreign::{Action, ForeignRegistry, FromValue};
use crate::query::{number_trace, ObservedState, Selector, TraceElem};
use crate::value::{ElementState, Value};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use webtl_core::ir::{Module, ModuleName, QName};

/// The outcome of verifying a proposition over a trace
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// The proposition holds
    Accepted,
    /// The proposition does not hold
    Rejected,
    /// The trace ended before the proposition was decided
    Undetermined,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Accepted => write!(f, "Accepted"),
            Verdict::Rejected => write!(f, "Rejected"),
            Verdict::Undetermined => write!(f, "Undetermined"),
        }
    }
}

/// The set of (selector, element state) pairs a specification queries.
///
/// Computed by a static pre-pass over the IR that briefs the DOM driver.
/// The pre-pass currently reports nothing; the type exists so the driver
/// protocol can grow into it without an API break.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Queries(pub BTreeSet<(Selector, ElementState)>);

impl Queries {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A loaded specification program, ready to answer entry-point queries
pub struct Program {
    env: Env,
    foreign: ForeignRegistry,
    main: ModuleName,
}

impl Program {
    /// Assemble a program from compiled modules.
    ///
    /// Module bindings are installed as unevaluated expressions under
    /// their qualified names; foreign stubs are installed from the
    /// registry. Both are immutable afterwards.
    pub fn new(modules: &[Module], main: ModuleName, foreign: ForeignRegistry) -> Self {
        let mut env = Env::new();
        for module in modules {
            for group in &module.bindings {
                for bind in group.binds() {
                    env.bind_expr(bind.name.clone(), Arc::new(bind.expr.clone()));
                }
            }
        }
        foreign.install(&mut env);
        Program { env, foreign, main }
    }

    /// The environment the program evaluates under
    pub fn env(&self) -> &Env {
        &self.env
    }

    fn entry_qname(&self, name: &str) -> QName {
        QName {
            module: Some(self.main.clone()),
            name: name.to_string(),
        }
    }

    /// Resolve a named entry point against a trace.
    ///
    /// The bound expression is evaluated directly rather than through a
    /// synthesized variable reference: on an empty trace the temporal
    /// driver must see the entry's own `always` form to rule it vacuous.
    fn eval_entry(&self, name: &str, trace: &[TraceElem]) -> EvalResult<Value> {
        let qname = self.entry_qname(name);
        let Some(binding) = self.env.lookup(&qname) else {
            return Err(EvalError::EntryPointNotDefined { qname });
        };
        let binding = binding.clone();
        let ctx = EvalCtx::new(&self.foreign, trace);
        match binding {
            Binding::Expr(expr) => eval(&ctx, &self.env, &expr),
            Binding::Value(Value::Defer(deferred)) => crate::eval::force_defer(&ctx, &deferred),
            Binding::Value(value) => Ok(value),
        }
    }

    /// Non-temporal entries are pure values; a single empty observed
    /// state is enough to evaluate them
    fn eval_pure_entry(&self, name: &str) -> EvalResult<Value> {
        let pseudo = number_trace(&[ObservedState::empty()]);
        self.eval_entry(name, &pseudo)
    }

    /// The URL or path the harness should navigate to first
    pub fn origin(&self) -> EvalResult<String> {
        String::from_value(self.eval_pure_entry("origin")?, None)
    }

    /// The selector whose presence signals the page is ready
    pub fn ready_when(&self) -> EvalResult<String> {
        String::from_value(self.eval_pure_entry("readyWhen")?, None)
    }

    /// The actions the harness may generate
    pub fn actions(&self) -> EvalResult<Vec<Action>> {
        Vec::<Action>::from_value(self.eval_pure_entry("actions")?, None)
    }

    /// The selectors and element states the specification queries.
    ///
    /// The static pre-pass is a stub: it reports the empty set until the
    /// DOM driver protocol requires more.
    pub fn queries(&self) -> Queries {
        Queries::default()
    }

    /// Decide the proposition over the given trace.
    ///
    /// `Undetermined` is a verdict, not an error; every other evaluation
    /// failure surfaces to the caller.
    pub fn verify(&self, states: &[ObservedState]) -> EvalResult<Verdict> {
        let trace = number_trace(states);
        let verdict = match self.eval_entry("proposition", &trace) {
            Ok(Value::Bool(true)) => Verdict::Accepted,
            Ok(Value::Bool(false)) => Verdict::Rejected,
            Ok(other) => return Err(EvalError::unexpected_type("Bool", &other, None)),
            Err(EvalError::Undetermined) => Verdict::Undetermined,
            Err(err) => return Err(err),
        };
        tracing::debug!(target: "webtl::verify", states = states.len(), %verdict);
        Ok(verdict)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use webtl_core::ir::build::*;
    use webtl_core::ir::{Bind, BindGroup};

    fn main_module(bindings: Vec<(&str, webtl_core::ir::Expr)>) -> Module {
        Module {
            name: ModuleName::new("Main"),
            span: None,
            bindings: bindings
                .into_iter()
                .map(|(name, expr)| {
                    BindGroup::NonRec(Bind {
                        name: QName::qualified("Main", name),
                        expr,
                    })
                })
                .collect(),
        }
    }

    fn program(bindings: Vec<(&str, webtl_core::ir::Expr)>) -> Program {
        Program::new(
            &[main_module(bindings)],
            ModuleName::new("Main"),
            ForeignRegistry::with_defaults(),
        )
    }

    #[test]
    fn test_origin_and_ready_when() {
        let p = program(vec![
            ("origin", string("/todo")),
            ("readyWhen", string("#app")),
        ]);
        assert_eq!(p.origin().unwrap(), "/todo");
        assert_eq!(p.ready_when().unwrap(), "#app");
    }

    #[test]
    fn test_actions_demarshal() {
        let click = app(
            ctor("Action", "Click", vec!["selector"]),
            string(".button"),
        );
        let p = program(vec![("actions", array(vec![click]))]);
        assert_eq!(p.actions().unwrap(), vec![Action::Click(".button".to_string())]);
    }

    #[test]
    fn test_missing_entry_point() {
        let p = program(vec![]);
        match p.origin() {
            Err(EvalError::EntryPointNotDefined { qname }) => {
                assert_eq!(qname, QName::qualified("Main", "origin"));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_verify_maps_bool_to_verdict() {
        let p = program(vec![("proposition", bool_lit(true))]);
        assert_eq!(
            p.verify(&[ObservedState::empty()]).unwrap(),
            Verdict::Accepted,
        );

        let p = program(vec![("proposition", bool_lit(false))]);
        assert_eq!(
            p.verify(&[ObservedState::empty()]).unwrap(),
            Verdict::Rejected,
        );
    }

    #[test]
    fn test_verify_requires_bool() {
        let p = program(vec![("proposition", int(1))]);
        assert!(matches!(
            p.verify(&[ObservedState::empty()]),
            Err(EvalError::UnexpectedType { expected: "Bool", .. })
        ));
    }

    #[test]
    fn test_queries_prepass_reports_nothing_yet() {
        let p = program(vec![("proposition", bool_lit(true))]);
        assert!(p.queries().is_empty());
    }

    #[test]
    fn test_verify_is_deterministic() {
        let p = program(vec![("proposition", bool_lit(true))]);
        let trace = [ObservedState::empty(), ObservedState::empty()];
        assert_eq!(p.verify(&trace).unwrap(), p.verify(&trace).unwrap());
    }
}
