//! webtl-check - LTL evaluator core for web-page property specifications
//!
//! This crate provides:
//! - **Value types**: runtime representation of specification values
//!   (Bool, Int, Number, Char, String, Array, Object, Function, ...)
//! - **Expression evaluator**: a strict tree-walk over the compiled IR
//! - **Temporal driver**: `always`/`next`/`_queryAll` and friends,
//!   interpreted over a finite trace of observed page states
//! - **Foreign dispatch**: arity-checked marshalling between native
//!   primitives and the value universe
//! - **Specification façade**: entry-point resolution and `verify`
//!
//! # Quick Start
//!
//! ```rust
//! use webtl_check::{ForeignRegistry, ObservedState, Program, Verdict};
//! use webtl_core::ir::{build, Bind, BindGroup, Module, ModuleName, QName};
//!
//! // A specification whose proposition is the constant `true`
//! let module = Module {
//!     name: ModuleName::new("Main"),
//!     span: None,
//!     bindings: vec![BindGroup::NonRec(Bind {
//!         name: QName::qualified("Main", "proposition"),
//!         expr: build::bool_lit(true),
//!     })],
//! };
//!
//! let program = Program::new(
//!     &[module],
//!     ModuleName::new("Main"),
//!     ForeignRegistry::with_defaults(),
//! );
//! let verdict = program.verify(&[ObservedState::empty()]).unwrap();
//! assert_eq!(verdict, Verdict::Accepted);
//! ```

pub mod env;
pub mod error;
pub mod eval;
pub mod foreign;
pub mod pattern;
pub mod query;
pub mod spec;
pub mod temporal;
pub mod value;

// Re-exports
pub use env::{Binding, Env};
pub use error::{EvalError, EvalResult};
pub use eval::{eval, EvalCtx};
pub use foreign::{Action, Callback, ForeignFunc, ForeignRegistry, FromValue, IntoValue};
pub use query::{number_trace, ElementStates, ObservedState, Selector, TraceElem};
pub use spec::{Program, Queries, Verdict};
pub use temporal::BUILTIN_MODULE;
pub use value::{Closure, DeferValue, ElementState, RecGroup, Value};
