//! Expression AST.
//!
//! Pure data. Sensor scopes are already resolved: every predicate carries
//! the sensor id of its innermost enclosing `[n]`. Literals are still raw
//! text; they are coerced once the field's declared type is known.

use super::lexer::Span;
use crate::model::{CombinatorKind, CompareOp, SensorId};

/// A parsed expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Combinator(CombinatorExpr),
    Predicate(PredicateExpr),
}

impl Expr {
    pub fn span(&self) -> Span {
        match self {
            Expr::Combinator(c) => c.span,
            Expr::Predicate(p) => p.span,
        }
    }

    /// Visit every predicate in the subtree, left to right.
    pub fn predicates(&self) -> Vec<&PredicateExpr> {
        let mut out = Vec::new();
        let mut stack = vec![self];
        while let Some(expr) = stack.pop() {
            match expr {
                Expr::Predicate(p) => out.push(p),
                Expr::Combinator(c) => stack.extend(c.children.iter().rev()),
            }
        }
        out
    }
}

/// `&(a, b, ...)` or `|(a, b, ...)`.
#[derive(Debug, Clone, PartialEq)]
pub struct CombinatorExpr {
    pub kind: CombinatorKind,
    pub children: Vec<Expr>,
    pub span: Span,
}

/// `op(field, literal)` resolved against `sensor`.
#[derive(Debug, Clone, PartialEq)]
pub struct PredicateExpr {
    pub sensor: SensorId,
    pub op: CompareOp,
    pub field: String,
    pub field_span: Span,
    pub literal: Literal,
    pub span: Span,
}

/// Literal as written in the expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Literal {
    pub text: String,
    pub quoted: bool,
    pub span: Span,
}
