//! Operators and identifiers used by condition expressions.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a named root condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConditionId(pub u32);

impl fmt::Display for ConditionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Comparison operator of a predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompareOp {
    /// `=`
    Eq,
    /// `!=`
    Ne,
    /// `<`
    Lt,
    /// `>`
    Gt,
    /// `<=`
    Le,
    /// `>=`
    Ge,
}

impl CompareOp {
    pub fn symbol(self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "!=",
            CompareOp::Lt => "<",
            CompareOp::Gt => ">",
            CompareOp::Le => "<=",
            CompareOp::Ge => ">=",
        }
    }

    pub fn is_ordering(self) -> bool {
        !matches!(self, CompareOp::Eq | CompareOp::Ne)
    }

    /// Whether `lhs OP rhs` holds given `lhs.cmp(rhs)`.
    pub fn holds(self, ord: Ordering) -> bool {
        match self {
            CompareOp::Eq => ord == Ordering::Equal,
            CompareOp::Ne => ord != Ordering::Equal,
            CompareOp::Lt => ord == Ordering::Less,
            CompareOp::Gt => ord == Ordering::Greater,
            CompareOp::Le => ord != Ordering::Greater,
            CompareOp::Ge => ord != Ordering::Less,
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Boolean combinator of an internal node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CombinatorKind {
    /// `&`: true when every child is true.
    And,
    /// `|`: true when at least one child is true.
    Or,
}

impl CombinatorKind {
    pub fn symbol(self) -> &'static str {
        match self {
            CombinatorKind::And => "&",
            CombinatorKind::Or => "|",
        }
    }

    /// Status implied by `true_children` out of `children` children.
    pub fn status(self, true_children: usize, children: usize) -> bool {
        match self {
            CombinatorKind::And => true_children == children,
            CombinatorKind::Or => true_children > 0,
        }
    }
}

impl fmt::Display for CombinatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_holds() {
        assert!(CompareOp::Le.holds(Ordering::Equal));
        assert!(CompareOp::Le.holds(Ordering::Less));
        assert!(!CompareOp::Gt.holds(Ordering::Equal));
        assert!(CompareOp::Ne.holds(Ordering::Greater));
    }

    #[test]
    fn test_combinator_status() {
        assert!(CombinatorKind::And.status(3, 3));
        assert!(!CombinatorKind::And.status(2, 3));
        assert!(CombinatorKind::Or.status(1, 3));
        assert!(!CombinatorKind::Or.status(0, 3));
    }
}
