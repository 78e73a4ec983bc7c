//! Compiled IR for the specification language
//!
//! This module defines the intermediate representation the evaluator
//! consumes: a strict lambda calculus with data constructors, case analysis,
//! let/letrec, record literals, and per-node annotations.
//!
//! The IR is designed to be:
//! - Complete: represents every construct the surface compiler emits
//! - Span-aware: every node carries an annotation with source location info
//! - Immutable: suitable for sharing between closures and deferred thunks
//!
//! The surface compiler and the on-disk loader are external; they produce
//! this in-memory form (the serde derives define the artifact shape). The
//! [`build`] submodule is the programmatic face used by loaders and tests.

use crate::span::Span;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A module name, e.g. `Main` or `Spec`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ModuleName(pub String);

impl ModuleName {
    pub fn new(name: impl Into<String>) -> Self {
        ModuleName(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ModuleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A possibly-qualified name.
///
/// Module-level definitions are bound under qualified names; locals
/// (lambda parameters, let bindings, case binders) are unqualified.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct QName {
    pub module: Option<ModuleName>,
    pub name: String,
}

impl QName {
    /// An unqualified (local) name
    pub fn local(name: impl Into<String>) -> Self {
        QName {
            module: None,
            name: name.into(),
        }
    }

    /// A module-qualified name
    pub fn qualified(module: impl Into<String>, name: impl Into<String>) -> Self {
        QName {
            module: Some(ModuleName::new(module)),
            name: name.into(),
        }
    }

    /// Whether this name is unqualified
    pub fn is_local(&self) -> bool {
        self.module.is_none()
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.module {
            Some(m) => write!(f, "{}.{}", m, self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

/// A string literal as the surface compiler emits it: UTF-16 code units.
///
/// The surface language permits lone surrogates in literals, so decoding to
/// text can fail; the evaluator reports `InvalidString` in that case.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StringLit(pub Vec<u16>);

impl StringLit {
    /// Encode a Rust string as a literal (always decodes back)
    pub fn from_text(s: &str) -> Self {
        StringLit(s.encode_utf16().collect())
    }

    /// Decode to text; `None` when the code units are not valid UTF-16
    pub fn decode(&self) -> Option<String> {
        String::from_utf16(&self.0).ok()
    }
}

/// Compiler-attached marker on an annotation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Meta {
    /// The annotated constructor or binder belongs to a newtype
    Newtype,
    /// The annotated definition is a foreign import
    Foreign,
}

/// A pending foreign call attached to a variable node.
///
/// Foreign stubs are n-ary lambda chains whose innermost body is a variable
/// carrying this marker; by the time the variable is evaluated, every
/// parameter in `params` is bound in the environment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForeignApply {
    pub qname: QName,
    pub params: Vec<String>,
}

/// Per-node annotation: source span plus optional compiler markers
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Ann {
    pub span: Option<Span>,
    pub meta: Option<Meta>,
    pub foreign_apply: Option<ForeignApply>,
}

impl Ann {
    pub fn at(span: Span) -> Self {
        Ann {
            span: Some(span),
            ..Ann::default()
        }
    }

    pub fn with_meta(mut self, meta: Meta) -> Self {
        self.meta = Some(meta);
        self
    }

    pub fn with_foreign_apply(mut self, fa: ForeignApply) -> Self {
        self.foreign_apply = Some(fa);
        self
    }
}

/// A literal expression
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Literal {
    /// Integral numeric literal
    Int(i64),
    /// Fractional numeric literal
    Number(f64),
    /// String literal (UTF-16 code units, decoded at evaluation)
    String(StringLit),
    /// Character literal
    Char(char),
    /// Boolean literal
    Bool(bool),
    /// Array literal
    Array(Vec<Expr>),
    /// Record literal
    Object(Vec<(String, Expr)>),
}

/// IR expressions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Expr {
    /// Literal value
    Literal(Ann, Literal),
    /// Variable reference (qualified or local)
    Var(Ann, QName),
    /// Single-parameter lambda
    Lambda(Ann, String, Box<Expr>),
    /// Application of one argument
    App(Ann, Box<Expr>, Box<Expr>),
    /// Case analysis over one or more scrutinees
    Case(Ann, Vec<Expr>, Vec<CaseAlternative>),
    /// Let with a sequence of binding groups
    Let(Ann, Vec<BindGroup>, Box<Expr>),
    /// Data constructor: type name, constructor name, field names.
    /// `Ann.meta == Some(Meta::Newtype)` marks a newtype constructor.
    Constructor(Ann, String, String, Vec<String>),
    /// Record field access
    Accessor(Ann, String, Box<Expr>),
    /// Record update: base expression plus replacement fields
    ObjectUpdate(Ann, Box<Expr>, Vec<(String, Expr)>),
}

impl Expr {
    /// The annotation of this node
    pub fn ann(&self) -> &Ann {
        match self {
            Expr::Literal(a, _)
            | Expr::Var(a, _)
            | Expr::Lambda(a, _, _)
            | Expr::App(a, _, _)
            | Expr::Case(a, _, _)
            | Expr::Let(a, _, _)
            | Expr::Constructor(a, _, _, _)
            | Expr::Accessor(a, _, _)
            | Expr::ObjectUpdate(a, _, _) => a,
        }
    }

    /// The source span of this node, when the compiler recorded one
    pub fn span(&self) -> Option<&Span> {
        self.ann().span.as_ref()
    }
}

/// A case binder (pattern)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Binder {
    /// `_` - matches anything, binds nothing
    Wildcard(Ann),
    /// Literal pattern
    Literal(Ann, LitBinder),
    /// Variable pattern - matches anything, binds it
    Var(Ann, String),
    /// `name@inner` - binds the whole value on an inner match
    Named(Ann, String, Box<Binder>),
    /// Constructor pattern: type name, constructor name, field binders.
    /// `Ann.meta == Some(Meta::Newtype)` marks a newtype constructor,
    /// which matches its single binder against the value directly.
    Ctor(Ann, QName, QName, Vec<Binder>),
}

impl Binder {
    pub fn ann(&self) -> &Ann {
        match self {
            Binder::Wildcard(a)
            | Binder::Literal(a, _)
            | Binder::Var(a, _)
            | Binder::Named(a, _, _)
            | Binder::Ctor(a, _, _, _) => a,
        }
    }
}

/// A literal inside a binder position
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum LitBinder {
    Int(i64),
    Number(f64),
    String(StringLit),
    Char(char),
    Bool(bool),
    /// Array pattern - element binders match a prefix of the array
    Array(Vec<Binder>),
    /// Record pattern - every named field must be present and match
    Object(Vec<(String, Binder)>),
}

/// One alternative of a case expression
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseAlternative {
    pub binders: Vec<Binder>,
    pub result: AltResult,
}

/// The right-hand side of a case alternative
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum AltResult {
    /// Plain result expression
    Unguarded(Expr),
    /// Guarded results, tried in order; each pair is (guard, result)
    Guarded(Vec<(Expr, Expr)>),
}

/// A single binding
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bind {
    pub name: QName,
    pub expr: Expr,
}

/// A binding group: non-recursive single binding or mutually recursive set
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum BindGroup {
    NonRec(Bind),
    Rec(Vec<Bind>),
}

impl BindGroup {
    /// The bindings of this group, in textual order
    pub fn binds(&self) -> impl Iterator<Item = &Bind> {
        match self {
            BindGroup::NonRec(bind) => std::slice::from_ref(bind).iter(),
            BindGroup::Rec(binds) => binds.iter(),
        }
    }
}

/// A compiled module: a name and its top-level binding groups
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Module {
    pub name: ModuleName,
    pub span: Option<Span>,
    pub bindings: Vec<BindGroup>,
}

/// Programmatic IR constructors.
///
/// Loaders and tests assemble IR through these; all nodes carry an empty
/// annotation unless one is supplied via the `*_at` variants.
pub mod build {
    use super::*;

    pub fn int(i: i64) -> Expr {
        Expr::Literal(Ann::default(), Literal::Int(i))
    }

    pub fn number(n: f64) -> Expr {
        Expr::Literal(Ann::default(), Literal::Number(n))
    }

    pub fn string(s: &str) -> Expr {
        Expr::Literal(Ann::default(), Literal::String(StringLit::from_text(s)))
    }

    pub fn char_lit(c: char) -> Expr {
        Expr::Literal(Ann::default(), Literal::Char(c))
    }

    pub fn bool_lit(b: bool) -> Expr {
        Expr::Literal(Ann::default(), Literal::Bool(b))
    }

    pub fn array(items: Vec<Expr>) -> Expr {
        Expr::Literal(Ann::default(), Literal::Array(items))
    }

    pub fn object(fields: Vec<(&str, Expr)>) -> Expr {
        Expr::Literal(
            Ann::default(),
            Literal::Object(
                fields
                    .into_iter()
                    .map(|(k, v)| (k.to_string(), v))
                    .collect(),
            ),
        )
    }

    pub fn var(qname: QName) -> Expr {
        Expr::Var(Ann::default(), qname)
    }

    pub fn var_at(span: Span, qname: QName) -> Expr {
        Expr::Var(Ann::at(span), qname)
    }

    pub fn local(name: &str) -> Expr {
        var(QName::local(name))
    }

    pub fn lambda(param: &str, body: Expr) -> Expr {
        Expr::Lambda(Ann::default(), param.to_string(), Box::new(body))
    }

    pub fn app(f: Expr, arg: Expr) -> Expr {
        Expr::App(Ann::default(), Box::new(f), Box::new(arg))
    }

    pub fn app2(f: Expr, a: Expr, b: Expr) -> Expr {
        app(app(f, a), b)
    }

    pub fn case(scrutinees: Vec<Expr>, alternatives: Vec<CaseAlternative>) -> Expr {
        Expr::Case(Ann::default(), scrutinees, alternatives)
    }

    pub fn alt(binders: Vec<Binder>, result: Expr) -> CaseAlternative {
        CaseAlternative {
            binders,
            result: AltResult::Unguarded(result),
        }
    }

    pub fn guarded_alt(binders: Vec<Binder>, guards: Vec<(Expr, Expr)>) -> CaseAlternative {
        CaseAlternative {
            binders,
            result: AltResult::Guarded(guards),
        }
    }

    pub fn let_(groups: Vec<BindGroup>, body: Expr) -> Expr {
        Expr::Let(Ann::default(), groups, Box::new(body))
    }

    pub fn non_rec(name: &str, expr: Expr) -> BindGroup {
        BindGroup::NonRec(Bind {
            name: QName::local(name),
            expr,
        })
    }

    pub fn rec(binds: Vec<(&str, Expr)>) -> BindGroup {
        BindGroup::Rec(
            binds
                .into_iter()
                .map(|(name, expr)| Bind {
                    name: QName::local(name),
                    expr,
                })
                .collect(),
        )
    }

    pub fn ctor(type_name: &str, ctor_name: &str, fields: Vec<&str>) -> Expr {
        Expr::Constructor(
            Ann::default(),
            type_name.to_string(),
            ctor_name.to_string(),
            fields.into_iter().map(str::to_string).collect(),
        )
    }

    pub fn newtype_ctor(type_name: &str, ctor_name: &str, field: &str) -> Expr {
        Expr::Constructor(
            Ann::default().with_meta(Meta::Newtype),
            type_name.to_string(),
            ctor_name.to_string(),
            vec![field.to_string()],
        )
    }

    pub fn accessor(field: &str, expr: Expr) -> Expr {
        Expr::Accessor(Ann::default(), field.to_string(), Box::new(expr))
    }

    pub fn update(expr: Expr, fields: Vec<(&str, Expr)>) -> Expr {
        Expr::ObjectUpdate(
            Ann::default(),
            Box::new(expr),
            fields
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        )
    }

    // === Binders ===

    pub fn b_wild() -> Binder {
        Binder::Wildcard(Ann::default())
    }

    pub fn b_var(name: &str) -> Binder {
        Binder::Var(Ann::default(), name.to_string())
    }

    pub fn b_named(name: &str, inner: Binder) -> Binder {
        Binder::Named(Ann::default(), name.to_string(), Box::new(inner))
    }

    pub fn b_int(i: i64) -> Binder {
        Binder::Literal(Ann::default(), LitBinder::Int(i))
    }

    pub fn b_bool(b: bool) -> Binder {
        Binder::Literal(Ann::default(), LitBinder::Bool(b))
    }

    pub fn b_string(s: &str) -> Binder {
        Binder::Literal(Ann::default(), LitBinder::String(StringLit::from_text(s)))
    }

    pub fn b_array(items: Vec<Binder>) -> Binder {
        Binder::Literal(Ann::default(), LitBinder::Array(items))
    }

    pub fn b_object(fields: Vec<(&str, Binder)>) -> Binder {
        Binder::Literal(
            Ann::default(),
            LitBinder::Object(
                fields
                    .into_iter()
                    .map(|(k, v)| (k.to_string(), v))
                    .collect(),
            ),
        )
    }

    pub fn b_ctor(type_name: QName, ctor_name: QName, binders: Vec<Binder>) -> Binder {
        Binder::Ctor(Ann::default(), type_name, ctor_name, binders)
    }

    pub fn b_newtype_ctor(type_name: QName, ctor_name: QName, inner: Binder) -> Binder {
        Binder::Ctor(
            Ann::default().with_meta(Meta::Newtype),
            type_name,
            ctor_name,
            vec![inner],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qname_display() {
        assert_eq!(QName::qualified("Main", "proposition").to_string(), "Main.proposition");
        assert_eq!(QName::local("x").to_string(), "x");
    }

    #[test]
    fn test_string_lit_round_trip() {
        let lit = StringLit::from_text("héllo");
        assert_eq!(lit.decode().as_deref(), Some("héllo"));
    }

    #[test]
    fn test_string_lit_lone_surrogate_fails_decode() {
        // 0xD800 is a high surrogate with no partner
        let lit = StringLit(vec![0xD800]);
        assert_eq!(lit.decode(), None);
    }

    #[test]
    fn test_expr_ann_accessor() {
        let span = Span::new(
            "spec.wtl",
            crate::span::Position::new(1, 1),
            crate::span::Position::new(1, 4),
        );
        let e = build::var_at(span.clone(), QName::local("x"));
        assert_eq!(e.span(), Some(&span));
        assert!(build::int(1).span().is_none());
    }

    #[test]
    fn test_build_app2_associates_left() {
        let e = build::app2(build::local("f"), build::int(1), build::int(2));
        match e {
            Expr::App(_, f, b) => {
                assert!(matches!(*f, Expr::App(_, _, _)));
                assert!(matches!(*b, Expr::Literal(_, Literal::Int(2))));
            }
            _ => panic!("expected App"),
        }
    }
}
