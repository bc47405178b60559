//! Immutable and temporal predicates.

use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};

use crate::utils::error::{Error, Result};

/// A time anchor on a predicate or literal, normalized to UTC.
pub type Anchor = DateTime<Utc>;

/// Formats an anchor in the canonical textual form: RFC 3339 with
/// nanosecond precision and a `Z` suffix.
#[must_use]
pub fn format_anchor(anchor: &Anchor) -> String {
    anchor.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

/// Parses an RFC 3339 anchor, accepting any offset and normalizing to UTC.
///
/// # Errors
///
/// Returns a parse error if the text is not valid RFC 3339.
pub fn parse_anchor(text: &str) -> Result<Anchor> {
    DateTime::parse_from_rfc3339(text.trim())
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| Error::Parse(format!("invalid time anchor {text:?}: {e}")))
}

/// A predicate, written `"name"@[]` (immutable) or `"name"@[RFC3339]`
/// (temporal).
///
/// Immutable predicates are logically timeless; temporal predicates bear
/// an anchor timestamp. Two predicates are equal iff both the name and the
/// anchor instant agree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Predicate {
    id: String,
    anchor: Option<Anchor>,
}

impl Predicate {
    /// Creates an immutable predicate.
    #[must_use]
    pub fn immutable(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            anchor: None,
        }
    }

    /// Creates a temporal predicate anchored at `anchor`.
    #[must_use]
    pub fn temporal(id: impl Into<String>, anchor: Anchor) -> Self {
        Self {
            id: id.into(),
            anchor: Some(anchor),
        }
    }

    /// Parses a predicate from its `"name"@[anchor]` textual form.
    ///
    /// # Errors
    ///
    /// Returns a parse error if the text is not a well-formed predicate.
    pub fn parse(text: &str) -> Result<Self> {
        let text = text.trim();
        if !text.starts_with('"') {
            return Err(Error::Parse(format!(
                "predicate {text:?} must start with '\"'"
            )));
        }
        let close = text[1..]
            .find('"')
            .map(|i| i + 1)
            .ok_or_else(|| Error::Parse(format!("predicate {text:?} is missing closing '\"'")))?;
        let id = &text[1..close];
        let rest = &text[close + 1..];
        let anchor_text = rest
            .strip_prefix("@[")
            .and_then(|r| r.strip_suffix(']'))
            .ok_or_else(|| Error::Parse(format!("predicate {text:?} is missing '@[...]'")))?;
        if anchor_text.is_empty() {
            Ok(Self::immutable(id))
        } else {
            Ok(Self::temporal(id, parse_anchor(anchor_text)?))
        }
    }

    /// Returns the predicate name, without the anchor.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the anchor for temporal predicates, `None` for immutable
    /// ones.
    #[must_use]
    pub fn anchor(&self) -> Option<&Anchor> {
        self.anchor.as_ref()
    }

    /// Returns true for temporal predicates.
    #[must_use]
    pub fn is_temporal(&self) -> bool {
        self.anchor.is_some()
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.anchor {
            None => write!(f, "\"{}\"@[]", self.id),
            Some(anchor) => write!(f, "\"{}\"@[{}]", self.id, format_anchor(anchor)),
        }
    }
}
