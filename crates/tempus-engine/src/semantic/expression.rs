//! HAVING expression trees.
//!
//! A [`Expr`] is a small predicate language over table rows: comparisons
//! between bindings and constants, composed with boolean operators. The
//! parser builds the tree; the executor evaluates it once per row.
//!
//! Evaluation is total: a comparison whose operand is missing from the
//! row is simply false. Referring to a binding the pattern never produces
//! is caught at plan construction, not here.

use std::cmp::Ordering;

use tempus_core::table::{Cell, Row};

/// Comparison operator of a HAVING term.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOp {
    /// Equality (`=`).
    Eq,
    /// Strictly less than (`<`).
    Lt,
    /// Strictly greater than (`>`).
    Gt,
}

/// One side of a comparison.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// A binding reference, resolved against the row.
    Binding(String),
    /// A constant value.
    Constant(Cell),
}

impl Operand {
    fn resolve<'a>(&'a self, row: &'a Row) -> Option<&'a Cell> {
        match self {
            Operand::Binding(name) => row.get(name),
            Operand::Constant(cell) => Some(cell),
        }
    }
}

/// A boolean expression over one table row.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// `lhs op rhs`.
    Comparison {
        /// Comparison operator.
        op: ComparisonOp,
        /// Left operand.
        lhs: Operand,
        /// Right operand.
        rhs: Operand,
    },
    /// Logical negation.
    Not(Box<Expr>),
    /// Logical conjunction.
    And(Box<Expr>, Box<Expr>),
    /// Logical disjunction.
    Or(Box<Expr>, Box<Expr>),
}

impl Expr {
    /// Builds a comparison between two bindings.
    #[must_use]
    pub fn compare_bindings(op: ComparisonOp, lhs: impl Into<String>, rhs: impl Into<String>) -> Self {
        Expr::Comparison {
            op,
            lhs: Operand::Binding(lhs.into()),
            rhs: Operand::Binding(rhs.into()),
        }
    }

    /// Builds a comparison between a binding and a constant.
    #[must_use]
    pub fn compare_constant(op: ComparisonOp, lhs: impl Into<String>, rhs: Cell) -> Self {
        Expr::Comparison {
            op,
            lhs: Operand::Binding(lhs.into()),
            rhs: Operand::Constant(rhs),
        }
    }

    /// Negates an expression.
    #[must_use]
    pub fn not(expr: Expr) -> Self {
        Expr::Not(Box::new(expr))
    }

    /// Conjunction of two expressions.
    #[must_use]
    pub fn and(lhs: Expr, rhs: Expr) -> Self {
        Expr::And(Box::new(lhs), Box::new(rhs))
    }

    /// Disjunction of two expressions.
    #[must_use]
    pub fn or(lhs: Expr, rhs: Expr) -> Self {
        Expr::Or(Box::new(lhs), Box::new(rhs))
    }

    /// Evaluates the expression against one row.
    #[must_use]
    pub fn evaluate(&self, row: &Row) -> bool {
        match self {
            Expr::Comparison { op, lhs, rhs } => {
                let (Some(l), Some(r)) = (lhs.resolve(row), rhs.resolve(row)) else {
                    return false;
                };
                match op {
                    ComparisonOp::Eq => l == r,
                    ComparisonOp::Lt => l.total_cmp(r) == Ordering::Less,
                    ComparisonOp::Gt => l.total_cmp(r) == Ordering::Greater,
                }
            }
            Expr::Not(inner) => !inner.evaluate(row),
            Expr::And(lhs, rhs) => lhs.evaluate(row) && rhs.evaluate(row),
            Expr::Or(lhs, rhs) => lhs.evaluate(row) || rhs.evaluate(row),
        }
    }

    /// The binding names the expression references, for plan-time
    /// validation.
    #[must_use]
    pub fn bindings(&self) -> Vec<&str> {
        fn collect<'a>(expr: &'a Expr, out: &mut Vec<&'a str>) {
            match expr {
                Expr::Comparison { lhs, rhs, .. } => {
                    for operand in [lhs, rhs] {
                        if let Operand::Binding(name) = operand {
                            out.push(name);
                        }
                    }
                }
                Expr::Not(inner) => collect(inner, out),
                Expr::And(l, r) | Expr::Or(l, r) => {
                    collect(l, out);
                    collect(r, out);
                }
            }
        }
        let mut out = Vec::new();
        collect(self, &mut out);
        out
    }
}
