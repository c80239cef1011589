//! Backend reply parsing and validation.
//!
//! The backend reply is untrusted free text. It is turned into evidence only
//! through [`parse_reply`], which checks every field's presence and type
//! explicitly and never fails past its own boundary: a reply it cannot use
//! comes back as [`ParsedReply::Malformed`], and a single bad element is
//! dropped without affecting its neighbours.

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;
use thiserror::Error;

use crate::types::EvidenceItem;

lazy_static! {
    /// A reply wrapped in a fenced code block, with an optional language tag.
    static ref CODE_FENCE: Regex = Regex::new(r"(?s)\A```[\w-]*\s*(.*?)\s*```\z").unwrap();
}

/// Why a whole reply was unusable.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MalformedReply {
    #[error("Reply is not valid JSON: {0}")]
    NotJson(String),

    #[error("Reply is a JSON {0}, expected an array")]
    NotArray(&'static str),
}

/// Result of parsing a backend reply.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedReply {
    /// The reply was a JSON array; holds every well-formed element, in order
    Evidence(Vec<EvidenceItem>),

    /// The reply could not be used at all
    Malformed(MalformedReply),
}

impl ParsedReply {
    /// Whether the reply was unusable.
    pub fn is_malformed(&self) -> bool {
        matches!(self, ParsedReply::Malformed(_))
    }

    /// Evidence carried by the reply; a malformed reply carries none.
    pub fn into_evidence(self) -> Vec<EvidenceItem> {
        match self {
            ParsedReply::Evidence(items) => items,
            ParsedReply::Malformed(_) => Vec::new(),
        }
    }
}

/// Parse raw backend text into evidence.
///
/// 1. Surrounding whitespace is trimmed.
/// 2. A fenced code block wrapper is removed.
/// 3. The text must be a JSON array, otherwise the reply is malformed.
/// 4. Each element must be an object with string `url` and `snippet`
///    fields (`excerpt` is accepted when `snippet` is absent), both
///    non-blank after trimming. Other elements are skipped.
pub fn parse_reply(raw: &str) -> ParsedReply {
    let text = strip_code_fence(raw.trim());

    let value: Value = match serde_json::from_str(text) {
        Ok(value) => value,
        Err(e) => return ParsedReply::Malformed(MalformedReply::NotJson(e.to_string())),
    };

    let elements = match value {
        Value::Array(elements) => elements,
        other => return ParsedReply::Malformed(MalformedReply::NotArray(json_kind(&other))),
    };

    ParsedReply::Evidence(elements.iter().filter_map(extract_item).collect())
}

/// Remove a surrounding fenced code block, if present.
///
/// Returns the input unchanged when it is not fully wrapped in a fence.
pub fn strip_code_fence(text: &str) -> &str {
    match CODE_FENCE.captures(text).and_then(|caps| caps.get(1)) {
        Some(inner) => inner.as_str(),
        None => text,
    }
}

fn extract_item(element: &Value) -> Option<EvidenceItem> {
    let fields = element.as_object()?;
    let url = fields.get("url")?.as_str()?;
    let excerpt = fields
        .get("snippet")
        .or_else(|| fields.get("excerpt"))?
        .as_str()?;
    EvidenceItem::new(url, excerpt)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
