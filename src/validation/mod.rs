//! Response validation and the read-only query rule.
//!
//! Turns raw model output into a [`ValidatedQuery`] or a rejection:
//!
//! 1. parse the raw text as a JSON object
//! 2. extract the `query` field (must be a string)
//! 3. normalize: trim and strip one pair of enclosing braces/quotes
//! 4. require the text to begin with the token `SELECT` (any case)
//!
//! The same rule is applied again by the execution gate before anything
//! reaches the store, so a `ValidatedQuery` carries no more trust than any
//! SELECT text a caller submits directly.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use thiserror::Error;

/// Field of the structured model output holding the query text.
pub const QUERY_FIELD: &str = "query";

static LEADING_SELECT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^select\b").unwrap());

/// Enclosing pairs a generator may wrap its answer in.
const WRAPPING_PAIRS: &[(char, char)] = &[('{', '}'), ('"', '"'), ('\'', '\''), ('`', '`')];

/// Errors produced while turning model output into a query.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The raw output is not a JSON object.
    #[error("non-structured model output")]
    NonStructured {
        /// The raw model output, for diagnostics.
        raw: String,
    },

    /// The object has no string-typed `query` field.
    #[error("missing query field")]
    MissingQueryField {
        /// The raw model output, for diagnostics.
        raw: String,
    },

    /// The extracted text is not a read-only query.
    #[error(transparent)]
    Unsafe(#[from] UnsafeQueryError),
}

impl ValidationError {
    /// Raw model output attached to the error, if any.
    pub fn raw(&self) -> Option<&str> {
        match self {
            ValidationError::NonStructured { raw } | ValidationError::MissingQueryField { raw } => {
                Some(raw)
            }
            ValidationError::Unsafe(_) => None,
        }
    }
}

/// Text that failed the SELECT-only rule.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("not a read-only query")]
pub struct UnsafeQueryError {
    /// The offending text, returned to the caller for visibility.
    pub query: String,
}

/// A query that passed the SELECT-only rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidatedQuery(String);

impl ValidatedQuery {
    /// Apply normalization and the read-only rule to caller-supplied text.
    pub fn parse(text: &str) -> Result<Self, UnsafeQueryError> {
        require_read_only(text)
    }

    /// The query text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume into the query text.
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for ValidatedQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ValidatedQuery {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Trim and strip a single pair of enclosing brace or quote characters.
///
/// Only one pair is removed: `"{'SELECT 1'}"` becomes `'SELECT 1'`.
pub fn normalize_query_text(text: &str) -> &str {
    let trimmed = text.trim();

    for &(open, close) in WRAPPING_PAIRS {
        if let Some(inner) = trimmed
            .strip_prefix(open)
            .and_then(|rest| rest.strip_suffix(close))
        {
            return inner.trim();
        }
    }

    trimmed
}

/// Normalize `text` and require it to start with `SELECT`.
pub fn require_read_only(text: &str) -> Result<ValidatedQuery, UnsafeQueryError> {
    let cleaned = normalize_query_text(text);

    if LEADING_SELECT.is_match(cleaned) {
        Ok(ValidatedQuery(cleaned.to_string()))
    } else {
        Err(UnsafeQueryError {
            query: cleaned.to_string(),
        })
    }
}

/// Validate raw model output.
///
/// Pure and synchronous; it never touches the store.
pub fn validate(raw: &str) -> Result<ValidatedQuery, ValidationError> {
    let value: serde_json::Value =
        serde_json::from_str(raw.trim()).map_err(|_| ValidationError::NonStructured {
            raw: raw.to_string(),
        })?;

    let object = value
        .as_object()
        .ok_or_else(|| ValidationError::NonStructured {
            raw: raw.to_string(),
        })?;

    let text = object
        .get(QUERY_FIELD)
        .and_then(|v| v.as_str())
        .ok_or_else(|| ValidationError::MissingQueryField {
            raw: raw.to_string(),
        })?;

    Ok(require_read_only(text)?)
}
