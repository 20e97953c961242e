//! Recovery of ingredient arrays from language-model output.
//!
//! Model answers are often fenced in markdown, cut off by the token limit,
//! or wrapped in prose. [`parse_mentions`] runs a fixed chain of
//! [`RecoveryStage`]s over the text and returns the first array any stage
//! can produce. It never fails: unrecoverable output yields an empty list.

use log::{debug, error, info, warn};
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;
use thiserror::Error;

/// Widest `[ ... ]` span, across lines
static BRACKET_SPAN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\[.*\]").expect("bracket span pattern is valid"));

/// A recovery stage could not produce an array
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{stage}: {reason}")]
pub struct RecoveryFailed {
    pub stage: &'static str,
    pub reason: String,
}

impl RecoveryFailed {
    fn new(stage: &'static str, reason: impl Into<String>) -> Self {
        Self {
            stage,
            reason: reason.into(),
        }
    }
}

/// One strategy for turning model text into a JSON array
pub trait RecoveryStage: Send + Sync {
    fn name(&self) -> &'static str;

    fn recover(&self, text: &str) -> Result<Vec<Value>, RecoveryFailed>;
}

/// Parse the whole text as a JSON array
pub struct DirectParse;

/// Close an array that was truncated before its final bracket
pub struct ForcedClosure;

/// Parse the widest `[...]` span found anywhere in the text
pub struct BracketSpan;

fn parse_array(text: &str) -> Result<Vec<Value>, String> {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Array(items)) => Ok(items),
        Ok(other) => Err(format!("expected a JSON array, got {}", json_kind(&other))),
        Err(e) => Err(e.to_string()),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

impl RecoveryStage for DirectParse {
    fn name(&self) -> &'static str {
        "direct_parse"
    }

    fn recover(&self, text: &str) -> Result<Vec<Value>, RecoveryFailed> {
        parse_array(text).map_err(|reason| RecoveryFailed::new(self.name(), reason))
    }
}

/// Output that opens an array but never closes it
fn is_partial(text: &str) -> bool {
    text.starts_with('[') && !text.ends_with(']')
}

/// Read the value of the last `"name"` key in `fragment`, accepting a
/// string cut off before its closing quote. `None` when the key has no
/// string value yet.
fn salvage_name(fragment: &str) -> Option<String> {
    let key = fragment.rfind("\"name\"")?;
    let rest = fragment[key + "\"name\"".len()..].trim_start();
    let rest = rest.strip_prefix(':')?.trim_start();
    let raw = rest.strip_prefix('"')?;

    let mut end = raw.len();
    let mut escaped = false;
    for (i, c) in raw.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '"' => {
                end = i;
                break;
            }
            _ => {}
        }
    }

    let mut raw = &raw[..end];
    if escaped {
        // truncated right after a backslash
        raw = &raw[..raw.len() - 1];
    }

    serde_json::from_str::<String>(&format!("\"{raw}\""))
        .ok()
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
}

/// Patched versions of a truncated array, most faithful first
fn closure_candidates(text: &str) -> Vec<String> {
    if text.ends_with('}') {
        return vec![format!("{text}]")];
    }

    // Everything after the last complete object belongs to the dangling one.
    // Without any `}` the dangling object starts right after the opening `[`.
    let cut = text.rfind('}').map(|i| i + 1).unwrap_or(1);
    let (head, tail) = text.split_at(cut);

    if tail.contains("\"name\"") {
        // A dangling object with complete fields only lacks its closing brace
        let name = salvage_name(tail).map(Value::String).unwrap_or(Value::Null);
        let separator = if head.ends_with('}') { ", " } else { "" };
        return vec![
            format!("{text}}}]"),
            format!(
                "{head}{separator}{{\"name\": {name}, \"amount\": null, \"unit\": \"\"}}]"
            ),
        ];
    }

    vec![
        format!("{text}}}]"),
        format!("{}]", head.trim_end().trim_end_matches(',')),
    ]
}

impl RecoveryStage for ForcedClosure {
    fn name(&self) -> &'static str {
        "forced_closure"
    }

    fn recover(&self, text: &str) -> Result<Vec<Value>, RecoveryFailed> {
        if !is_partial(text) {
            return Err(RecoveryFailed::new(self.name(), "output is not a truncated array"));
        }

        warn!(
            "Model response was cut off: length={} chars, content={}",
            text.chars().count(),
            text
        );

        let mut last_error = String::new();
        for patched in closure_candidates(text) {
            match parse_array(&patched) {
                Ok(items) => {
                    info!(
                        "Recovered truncated response by forcing closure: {} entries",
                        items.len()
                    );
                    return Ok(items);
                }
                Err(e) => {
                    debug!("Forced closure attempt failed: {} (text: {})", e, patched);
                    last_error = e;
                }
            }
        }

        Err(RecoveryFailed::new(self.name(), last_error))
    }
}

impl RecoveryStage for BracketSpan {
    fn name(&self) -> &'static str {
        "bracket_span"
    }

    fn recover(&self, text: &str) -> Result<Vec<Value>, RecoveryFailed> {
        let span = BRACKET_SPAN
            .find(text)
            .ok_or_else(|| RecoveryFailed::new(self.name(), "no bracketed span"))?;

        parse_array(span.as_str()).map_err(|reason| RecoveryFailed::new(self.name(), reason))
    }
}

/// Remove a markdown code fence around the response.
///
/// The opening fence line is always dropped; the last line only when it is
/// itself a fence, so a fenced answer that was cut off keeps its tail.
pub fn strip_code_fence(text: &str) -> String {
    let trimmed = text.trim();
    if !trimmed.starts_with("```") {
        return trimmed.to_string();
    }

    let mut lines: Vec<&str> = trimmed.lines().collect();
    if lines.len() == 1 {
        let inner = trimmed.trim_matches('`');
        let inner = inner.strip_prefix("json").unwrap_or(inner);
        return inner.trim().to_string();
    }

    lines.remove(0);
    if lines
        .last()
        .is_some_and(|line| line.trim_start().starts_with("```"))
    {
        lines.pop();
    }

    lines.join("\n").trim().to_string()
}

/// Parse model output into the raw JSON elements of the ingredient array.
///
/// Stages run in order (direct parse, forced closure of a truncated array,
/// widest bracketed span) after stripping a code fence. Elements are
/// returned as-is; shape validation happens during normalization.
pub fn parse_mentions(response: &str) -> Vec<Value> {
    let text = strip_code_fence(response);
    if text.is_empty() {
        return Vec::new();
    }

    let stages: [&dyn RecoveryStage; 3] = [&DirectParse, &ForcedClosure, &BracketSpan];
    for stage in stages {
        match stage.recover(&text) {
            Ok(items) => {
                debug!("Parsed {} entries with {}", items.len(), stage.name());
                return items;
            }
            Err(e) => debug!("Recovery stage failed: {}", e),
        }
    }

    error!(
        "Could not parse model response as a JSON array: length={} chars, content={}",
        text.chars().count(),
        text
    );
    Vec::new()
}
