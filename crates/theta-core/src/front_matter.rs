/*
 * front_matter.rs
 * Copyright (c) 2026 Theta contributors
 */

//! Front matter header extraction.
//!
//! A template may open with a configuration header anchored at the very
//! first byte:
//!
//! ```text
//! <%/*** Theta
//! isSnippet: true
//! defaultSelection: word
//! ***/%>
//! ```
//!
//! The body between the markers is a YAML mapping (JSON is valid YAML, so
//! both spellings work) and may span any number of lines. A template that
//! does not start with the opening marker has no front matter; an opening
//! marker without its terminator is an authoring error, not a literal.

use serde_json::Value as JsonValue;

use crate::error::{ThetaError, ThetaResult};

/// Opening marker; must sit at byte 0 of the template.
pub const HEADER_OPEN: &str = "<%/*** Theta";

/// Closing marker.
pub const HEADER_CLOSE: &str = "***/%>";

/// A parsed header and the offset where the template body resumes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontMatter {
    /// The header mapping, as parsed. `Null` for an empty header body.
    pub overrides: JsonValue,
    /// Byte offset of the first character after the closing marker.
    pub body_start: usize,
}

/// Extract the front matter header from `text`, if it has one.
///
/// Returns `Ok(None)` when the text does not begin with [`HEADER_OPEN`].
pub fn extract(text: &str) -> ThetaResult<Option<FrontMatter>> {
    let Some(rest) = text.strip_prefix(HEADER_OPEN) else {
        return Ok(None);
    };
    let Some(close) = rest.find(HEADER_CLOSE) else {
        return Err(ThetaError::UnterminatedHeader);
    };
    let overrides: JsonValue = serde_yaml::from_str(&rest[..close])
        .map_err(|source| ThetaError::InvalidHeader { source })?;
    Ok(Some(FrontMatter {
        overrides,
        body_start: HEADER_OPEN.len() + close + HEADER_CLOSE.len(),
    }))
}
