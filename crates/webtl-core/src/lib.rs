//! webtl-core - IR data model for the webtl property checker
//!
//! This crate provides:
//! - **Spans**: source locations carried through the compiled IR
//! - **IR**: the compiled functional intermediate representation
//!   (lambda calculus with constructors, case, let/letrec, records)
//! - **Diagnostics**: plain-text error rendering against spans
//!
//! Parsing and compilation of the surface language live outside this
//! workspace; producers assemble IR via [`ir::build`] or deserialize the
//! on-disk JSON artifact into [`ir::Module`] values.

pub mod diagnostic;
pub mod ir;
pub mod span;

pub use diagnostic::{Diagnostic, Severity};
pub use ir::{
    AltResult, Ann, Bind, BindGroup, Binder, CaseAlternative, Expr, ForeignApply, LitBinder,
    Literal, Meta, Module, ModuleName, QName, StringLit,
};
pub use span::{Position, Span};
