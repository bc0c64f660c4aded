//! Resilient structured-response extraction.
//!
//! Model completions are free-form text that usually, but not always, contain
//! a JSON object. This module turns such text into a JSON value of a known
//! shape, falling back to an empty default for that shape whenever the text
//! cannot be parsed.
//!
//! - [`extract_json`]: strict parse, then first-`{`/last-`}` slice parse
//! - [`extract_or_default`]: same, but never fails
//! - [`validate`]: structural checks per record kind
//! - [`normalize`]: savings recomputation, rounding and capping

pub mod normalize;
pub mod validate;

use std::fmt;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

/// Expected top-level structure of an agent response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Shape {
    /// `{"expenses": [...], "total_amount": n}`
    Receipt,
    /// `{"alternatives": [...]}`
    Alternatives,
    /// `{"subject": "", "body": "", "to_email": ""}`
    EmailDraft,
}

impl Shape {
    /// The empty value returned when extraction fails for this shape.
    pub fn empty_default(&self) -> Value {
        match self {
            Shape::Receipt => json!({ "expenses": [], "total_amount": 0.0 }),
            Shape::Alternatives => json!({ "alternatives": [] }),
            Shape::EmailDraft => json!({ "subject": "", "body": "", "to_email": "" }),
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Shape::Receipt => write!(f, "receipt"),
            Shape::Alternatives => write!(f, "alternatives"),
            Shape::EmailDraft => write!(f, "email_draft"),
        }
    }
}

impl FromStr for Shape {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "receipt" => Ok(Shape::Receipt),
            "alternatives" => Ok(Shape::Alternatives),
            "email" | "email_draft" => Ok(Shape::EmailDraft),
            other => Err(format!("unknown shape: {}", other)),
        }
    }
}

/// Extract the JSON object embedded in `raw`.
///
/// Tries a strict parse of the trimmed text first. If that fails, retries on
/// the inclusive slice between the first `{` and the last `}`. Only objects
/// are accepted; arrays and scalars yield `None`.
pub fn extract_json(raw: &str) -> Option<Value> {
    let text = raw.trim();
    if text.is_empty() {
        return None;
    }

    if let Ok(value) = serde_json::from_str::<Value>(text) {
        if value.is_object() {
            return Some(value);
        }
    }

    let first = text.find('{')?;
    let last = text.rfind('}')?;
    if first >= last {
        return None;
    }

    serde_json::from_str::<Value>(&text[first..=last])
        .ok()
        .filter(Value::is_object)
}

/// Extract the JSON object embedded in `raw`, or the empty default for `shape`.
pub fn extract_or_default(raw: &str, shape: Shape) -> Value {
    match extract_json(raw) {
        Some(value) => value,
        None => {
            debug!(
                "No JSON object in response ({} chars), using empty {}",
                raw.len(),
                shape
            );
            shape.empty_default()
        }
    }
}

/// Extract and deserialize into `T`, falling back to the shape default.
///
/// The shape default must itself deserialize into `T`; if even that fails
/// (a caller pairing a type with the wrong shape) `None` is returned.
pub fn extract_as<T: DeserializeOwned>(raw: &str, shape: Shape) -> Option<T> {
    let value = extract_or_default(raw, shape);
    match serde_json::from_value::<T>(value) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            debug!("Extracted {} did not match target type: {}", shape, e);
            serde_json::from_value::<T>(shape.empty_default()).ok()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_extract_plain_json() {
        let value = extract_json(r#"{"alternatives": []}"#).unwrap();
        assert_eq!(value, json!({"alternatives": []}));
    }

    #[test]
    fn test_extract_json_surrounded_by_prose() {
        let value = extract_or_default(
            "Sure! {\"alternatives\": []} Let me know.",
            Shape::Alternatives,
        );
        assert_eq!(value, json!({"alternatives": []}));
    }

    #[test]
    fn test_extract_nested_object_in_prose() {
        let raw = r#"Here is the draft:
{"subject": "Pricing", "body": "Hi {team}", "to_email": "a@b.com"}
Hope this helps!"#;
        let value = extract_json(raw).unwrap();
        assert_eq!(value["subject"], "Pricing");
        assert_eq!(value["body"], "Hi {team}");
    }

    #[test]
    fn test_extract_markdown_fenced() {
        let raw = "```json\n{\"alternatives\": [{\"business_name\": \"X\"}]}\n```";
        let value = extract_json(raw).unwrap();
        assert_eq!(value["alternatives"][0]["business_name"], "X");
    }

    #[test]
    fn test_no_json_returns_default() {
        assert_eq!(
            extract_or_default("no json here", Shape::Alternatives),
            json!({"alternatives": []})
        );
        assert_eq!(
            extract_or_default("no json here", Shape::EmailDraft),
            json!({"subject": "", "body": "", "to_email": ""})
        );
    }

    #[test]
    fn test_empty_input_returns_default() {
        assert_eq!(extract_json(""), None);
        assert_eq!(extract_json("   \n\t"), None);
        assert_eq!(
            extract_or_default("", Shape::Receipt),
            json!({"expenses": [], "total_amount": 0.0})
        );
    }

    #[test]
    fn test_reversed_braces() {
        assert_eq!(extract_json("} nothing {"), None);
        assert_eq!(extract_json("only { open"), None);
        assert_eq!(extract_json("only } close"), None);
    }

    #[test]
    fn test_two_objects_fail_as_one_slice() {
        // first-{ to last-} spans both objects, which is not valid JSON
        assert_eq!(extract_json(r#"{"a": 1} and {"b": 2}"#), None);
    }

    #[test]
    fn test_non_object_rejected() {
        assert_eq!(extract_json("[1, 2, 3]"), None);
        assert_eq!(extract_json("42"), None);
        assert_eq!(extract_json("\"string\""), None);
    }

    #[test]
    fn test_malformed_slice_returns_default() {
        let value = extract_or_default("{\"alternatives\": [", Shape::Alternatives);
        assert_eq!(value, json!({"alternatives": []}));
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Draft {
        subject: String,
        body: String,
        to_email: String,
    }

    #[test]
    fn test_extract_as_typed() {
        let draft: Draft = extract_as(
            r#"ok: {"subject": "S", "body": "B", "to_email": "t@x.com"}"#,
            Shape::EmailDraft,
        )
        .unwrap();
        assert_eq!(draft.subject, "S");
        assert_eq!(draft.to_email, "t@x.com");
    }

    #[test]
    fn test_extract_as_type_mismatch_falls_back() {
        let draft: Draft = extract_as(r#"{"subject": 5}"#, Shape::EmailDraft).unwrap();
        assert_eq!(
            draft,
            Draft {
                subject: String::new(),
                body: String::new(),
                to_email: String::new(),
            }
        );
    }

    #[test]
    fn test_shape_from_str() {
        assert_eq!("receipt".parse::<Shape>().unwrap(), Shape::Receipt);
        assert_eq!("Alternatives".parse::<Shape>().unwrap(), Shape::Alternatives);
        assert_eq!("email-draft".parse::<Shape>().unwrap(), Shape::EmailDraft);
        assert_eq!("email".parse::<Shape>().unwrap(), Shape::EmailDraft);
        assert!("invoice".parse::<Shape>().is_err());
    }

    #[test]
    fn test_shape_display() {
        assert_eq!(Shape::EmailDraft.to_string(), "email_draft");
    }
}
