//! Typed graph nodes.

use std::fmt;

use uuid::Uuid;

use crate::utils::error::{Error, Result};

/// A typed node, written `/kind<id>`.
///
/// The kind is path-like and may contain further slashes
/// (`/item/book<000>`); the id is an opaque string and may contain spaces
/// (`/c<model s>`). Blank nodes use the reserved `/_` kind with a random
/// UUID id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Node {
    /// Path-like node kind, including the leading slash.
    kind: String,
    /// Opaque node identifier.
    id: String,
}

impl Node {
    /// Creates a node from its kind and id.
    ///
    /// # Errors
    ///
    /// Returns a parse error if the kind does not start with `/` or either
    /// part contains the reserved `<`/`>` delimiters.
    pub fn new(kind: impl Into<String>, id: impl Into<String>) -> Result<Self> {
        let kind = kind.into();
        let id = id.into();
        if !kind.starts_with('/') {
            return Err(Error::Parse(format!(
                "node kind {kind:?} must start with '/'"
            )));
        }
        if kind.contains('<') || kind.contains('>') || id.contains('<') || id.contains('>') {
            return Err(Error::Parse(format!(
                "node parts {kind:?}, {id:?} may not contain '<' or '>'"
            )));
        }
        Ok(Self { kind, id })
    }

    /// Creates a fresh blank node `/_<uuid>`.
    #[must_use]
    pub fn blank() -> Self {
        Self {
            kind: "/_".to_string(),
            id: Uuid::new_v4().to_string(),
        }
    }

    /// Parses a node from its `/kind<id>` textual form.
    ///
    /// # Errors
    ///
    /// Returns a parse error if the text is not a well-formed node.
    pub fn parse(text: &str) -> Result<Self> {
        let text = text.trim();
        if !text.starts_with('/') {
            return Err(Error::Parse(format!("node {text:?} must start with '/'")));
        }
        let open = text
            .find('<')
            .ok_or_else(|| Error::Parse(format!("node {text:?} is missing '<'")))?;
        if !text.ends_with('>') {
            return Err(Error::Parse(format!("node {text:?} is missing closing '>'")));
        }
        let kind = &text[..open];
        let id = &text[open + 1..text.len() - 1];
        Self::new(kind, id)
    }

    /// Returns the path-like kind, including the leading slash.
    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Returns the opaque id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns true for blank nodes.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.kind == "/_"
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}<{}>", self.kind, self.id)
    }
}
