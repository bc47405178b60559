//! Typed cells for the binding table.

use std::cmp::Ordering;
use std::fmt;

use tempus_common::types::{format_anchor, Anchor, Literal, Node, Object, Predicate};

/// A single value in a binding table row.
///
/// Cells carry whatever a binding extracted from a matched triple: a full
/// node or predicate, a literal, a bare timestamp (anchor bindings), or
/// plain text (id and type aliases).
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    /// A node value.
    Node(Node),
    /// A predicate value, anchor included.
    Predicate(Predicate),
    /// A literal value.
    Literal(Literal),
    /// A bare timestamp, as produced by anchor and bound aliases.
    Time(Anchor),
    /// Plain text, as produced by id and type aliases.
    Text(String),
}

impl Cell {
    /// Builds a cell from a triple object position.
    #[must_use]
    pub fn from_object(object: &Object) -> Self {
        match object {
            Object::Node(n) => Cell::Node(n.clone()),
            Object::Predicate(p) => Cell::Predicate(p.clone()),
            Object::Literal(l) => Cell::Literal(l.clone()),
        }
    }

    /// Total order over cells: type rank first, then value. Used by
    /// `ORDER BY`; the relation is total so sorting is always defined.
    #[must_use]
    pub fn total_cmp(&self, other: &Self) -> Ordering {
        fn rank(cell: &Cell) -> u8 {
            match cell {
                Cell::Node(_) => 0,
                Cell::Predicate(_) => 1,
                Cell::Literal(_) => 2,
                Cell::Time(_) => 3,
                Cell::Text(_) => 4,
            }
        }
        match (self, other) {
            (Cell::Node(a), Cell::Node(b)) => a.cmp(b),
            (Cell::Predicate(a), Cell::Predicate(b)) => a.cmp(b),
            (Cell::Literal(a), Cell::Literal(b)) => a.total_cmp(b),
            (Cell::Time(a), Cell::Time(b)) => a.cmp(b),
            (Cell::Text(a), Cell::Text(b)) => a.cmp(b),
            (a, b) => rank(a).cmp(&rank(b)),
        }
    }

    /// Canonical identity key: the display form prefixed with the type,
    /// so equal-looking values of different kinds never collide in joins
    /// or grouping.
    pub(crate) fn key(&self) -> String {
        let tag = match self {
            Cell::Node(_) => 'n',
            Cell::Predicate(_) => 'p',
            Cell::Literal(_) => 'l',
            Cell::Time(_) => 't',
            Cell::Text(_) => 's',
        };
        format!("{tag}:{self}")
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Node(n) => n.fmt(f),
            Cell::Predicate(p) => p.fmt(f),
            Cell::Literal(l) => l.fmt(f),
            Cell::Time(anchor) => write!(f, "{}", format_anchor(anchor)),
            Cell::Text(text) => write!(f, "{text}"),
        }
    }
}
