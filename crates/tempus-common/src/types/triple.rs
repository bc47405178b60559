//! Triples and the object position sum type.

use std::fmt;

use crate::types::{Literal, Node, Predicate};
use crate::utils::error::{Error, Result};

/// The object position of a triple: a node, a predicate, or a literal.
#[derive(Debug, Clone, PartialEq)]
pub enum Object {
    /// A node object, `/kind<id>`.
    Node(Node),
    /// A predicate object, `"name"@[anchor]`. Temporal predicate objects
    /// are how events are attached to a subject over time.
    Predicate(Predicate),
    /// A typed literal object, `"value"^^type:kind`.
    Literal(Literal),
}

impl Object {
    /// Parses an object from its textual form, dispatching on shape:
    /// nodes start with `/`, literals carry `^^type:`, anything else
    /// quoted is a predicate.
    ///
    /// # Errors
    ///
    /// Returns a parse error if the text matches none of the three forms.
    pub fn parse(text: &str) -> Result<Self> {
        let text = text.trim();
        if text.starts_with('/') {
            return Node::parse(text).map(Object::Node);
        }
        if text.contains("\"^^type:") {
            return Literal::parse(text).map(Object::Literal);
        }
        if text.starts_with('"') {
            return Predicate::parse(text).map(Object::Predicate);
        }
        Err(Error::Parse(format!(
            "object {text:?} is not a node, predicate, or literal"
        )))
    }

    /// Returns the node if this object is one.
    #[must_use]
    pub fn as_node(&self) -> Option<&Node> {
        match self {
            Object::Node(n) => Some(n),
            _ => None,
        }
    }

    /// Returns the predicate if this object is one.
    #[must_use]
    pub fn as_predicate(&self) -> Option<&Predicate> {
        match self {
            Object::Predicate(p) => Some(p),
            _ => None,
        }
    }

    /// Returns the literal if this object is one.
    #[must_use]
    pub fn as_literal(&self) -> Option<&Literal> {
        match self {
            Object::Literal(l) => Some(l),
            _ => None,
        }
    }
}

impl fmt::Display for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Object::Node(n) => n.fmt(f),
            Object::Predicate(p) => p.fmt(f),
            Object::Literal(l) => l.fmt(f),
        }
    }
}

impl From<Node> for Object {
    fn from(n: Node) -> Self {
        Object::Node(n)
    }
}

impl From<Predicate> for Object {
    fn from(p: Predicate) -> Self {
        Object::Predicate(p)
    }
}

impl From<Literal> for Object {
    fn from(l: Literal) -> Self {
        Object::Literal(l)
    }
}

/// An RDF-style `(Subject, Predicate, Object)` triple.
#[derive(Debug, Clone, PartialEq)]
pub struct Triple {
    subject: Node,
    predicate: Predicate,
    object: Object,
}

impl Triple {
    /// Creates a triple from its three components.
    #[must_use]
    pub fn new(subject: Node, predicate: Predicate, object: Object) -> Self {
        Self {
            subject,
            predicate,
            object,
        }
    }

    /// Parses a triple from a whitespace-separated `S P O` line.
    ///
    /// Subjects end at the first `>`, predicates at their closing `]`,
    /// and the object is the remainder of the line; this keeps ids with
    /// embedded spaces (`/c<model s>`) intact.
    ///
    /// # Errors
    ///
    /// Returns a parse error if the line does not contain three
    /// well-formed components.
    pub fn parse(line: &str) -> Result<Self> {
        let line = line.trim();
        let subject_end = line
            .find('>')
            .ok_or_else(|| Error::Parse(format!("triple {line:?} has no subject")))?;
        let subject = Node::parse(&line[..=subject_end])?;

        let rest = line[subject_end + 1..].trim_start();
        if !rest.starts_with('"') {
            return Err(Error::Parse(format!("triple {line:?} has no predicate")));
        }
        let name_close = rest[1..]
            .find('"')
            .map(|i| i + 1)
            .ok_or_else(|| Error::Parse(format!("triple {line:?} has an unterminated predicate")))?;
        let anchor_close = rest[name_close..]
            .find(']')
            .map(|i| i + name_close)
            .ok_or_else(|| Error::Parse(format!("triple {line:?} has an unanchored predicate")))?;
        let predicate = Predicate::parse(&rest[..=anchor_close])?;

        let object = Object::parse(&rest[anchor_close + 1..])?;
        Ok(Self::new(subject, predicate, object))
    }

    /// Returns the subject node.
    #[must_use]
    pub fn subject(&self) -> &Node {
        &self.subject
    }

    /// Returns the predicate.
    #[must_use]
    pub fn predicate(&self) -> &Predicate {
        &self.predicate
    }

    /// Returns the object.
    #[must_use]
    pub fn object(&self) -> &Object {
        &self.object
    }

    /// Reifies the triple: returns the triple itself plus the `_subject`,
    /// `_predicate`, and `_object` statements hanging off a fresh blank
    /// node, and that blank node. The reification predicates share the
    /// source predicate's anchor when it is temporal.
    #[must_use]
    pub fn reify(&self) -> (Vec<Triple>, Node) {
        let blank = Node::blank();
        let meta = |id: &str| match self.predicate.anchor() {
            None => Predicate::immutable(id),
            Some(anchor) => Predicate::temporal(id, *anchor),
        };
        let triples = vec![
            self.clone(),
            Triple::new(
                blank.clone(),
                meta("_subject"),
                Object::Node(self.subject.clone()),
            ),
            Triple::new(
                blank.clone(),
                meta("_predicate"),
                Object::Predicate(self.predicate.clone()),
            ),
            Triple::new(blank.clone(), meta("_object"), self.object.clone()),
        ];
        (triples, blank)
    }
}

impl fmt::Display for Triple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\t{}\t{}", self.subject, self.predicate, self.object)
    }
}
