//! Typed literals.

use std::cmp::Ordering;
use std::fmt;

use crate::utils::error::{Error, Result};

/// A typed literal, written `"value"^^type:kind`.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// Boolean literal, `"true"^^type:bool`.
    Bool(bool),
    /// 64-bit integer literal, `"42"^^type:int64`.
    Int64(i64),
    /// 64-bit float literal, `"4.2"^^type:float64`.
    Float64(f64),
    /// Text literal, `"hello"^^type:text`.
    Text(String),
    /// Opaque byte blob, `"[1 2 3]"^^type:blob`.
    Blob(Vec<u8>),
}

impl Literal {
    /// Parses a literal from its `"value"^^type:kind` textual form.
    ///
    /// # Errors
    ///
    /// Returns a parse error if the text is not a well-formed literal or
    /// the value does not match the declared kind.
    pub fn parse(text: &str) -> Result<Self> {
        let text = text.trim();
        if !text.starts_with('"') {
            return Err(Error::Parse(format!(
                "literal {text:?} must start with '\"'"
            )));
        }
        let sep = text
            .rfind("\"^^type:")
            .ok_or_else(|| Error::Parse(format!("literal {text:?} is missing '^^type:'")))?;
        let value = &text[1..sep];
        let kind = &text[sep + "\"^^type:".len()..];
        match kind {
            "bool" => value
                .parse::<bool>()
                .map(Literal::Bool)
                .map_err(|e| Error::Parse(format!("invalid bool literal {value:?}: {e}"))),
            "int64" => value
                .parse::<i64>()
                .map(Literal::Int64)
                .map_err(|e| Error::Parse(format!("invalid int64 literal {value:?}: {e}"))),
            "float64" => value
                .parse::<f64>()
                .map(Literal::Float64)
                .map_err(|e| Error::Parse(format!("invalid float64 literal {value:?}: {e}"))),
            "text" => Ok(Literal::Text(value.to_string())),
            "blob" => parse_blob(value),
            other => Err(Error::Parse(format!("unknown literal type {other:?}"))),
        }
    }

    /// Returns the literal type name (`bool`, `int64`, `float64`, `text`,
    /// `blob`).
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Literal::Bool(_) => "bool",
            Literal::Int64(_) => "int64",
            Literal::Float64(_) => "float64",
            Literal::Text(_) => "text",
            Literal::Blob(_) => "blob",
        }
    }

    /// Total order over literals: type rank first, then value. Floats use
    /// IEEE total ordering so the relation is a proper total order.
    #[must_use]
    pub fn total_cmp(&self, other: &Self) -> Ordering {
        fn rank(l: &Literal) -> u8 {
            match l {
                Literal::Bool(_) => 0,
                Literal::Int64(_) => 1,
                Literal::Float64(_) => 2,
                Literal::Text(_) => 3,
                Literal::Blob(_) => 4,
            }
        }
        match (self, other) {
            (Literal::Bool(a), Literal::Bool(b)) => a.cmp(b),
            (Literal::Int64(a), Literal::Int64(b)) => a.cmp(b),
            (Literal::Float64(a), Literal::Float64(b)) => a.total_cmp(b),
            (Literal::Text(a), Literal::Text(b)) => a.cmp(b),
            (Literal::Blob(a), Literal::Blob(b)) => a.cmp(b),
            (a, b) => rank(a).cmp(&rank(b)),
        }
    }
}

fn parse_blob(value: &str) -> Result<Literal> {
    let inner = value
        .strip_prefix('[')
        .and_then(|v| v.strip_suffix(']'))
        .ok_or_else(|| Error::Parse(format!("invalid blob literal {value:?}")))?;
    let mut bytes = Vec::new();
    for part in inner.split_whitespace() {
        let byte = part
            .parse::<u8>()
            .map_err(|e| Error::Parse(format!("invalid blob byte {part:?}: {e}")))?;
        bytes.push(byte);
    }
    Ok(Literal::Blob(bytes))
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Bool(v) => write!(f, "\"{v}\"^^type:bool"),
            Literal::Int64(v) => write!(f, "\"{v}\"^^type:int64"),
            Literal::Float64(v) => write!(f, "\"{v}\"^^type:float64"),
            Literal::Text(v) => write!(f, "\"{v}\"^^type:text"),
            Literal::Blob(v) => {
                write!(f, "\"[")?;
                for (i, byte) in v.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{byte}")?;
                }
                write!(f, "]\"^^type:blob")
            }
        }
    }
}
