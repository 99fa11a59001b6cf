//! Heuristic response code inference.
//!
//! Handler bodies are scanned as plain text; nothing here understands control flow.
//! Each heuristic contributes codes independently:
//!
//! - `response()->json($data, 201)` contributes its explicit status
//! - more `response()->json(...)` calls than explicit statuses contributes `200`
//! - `abort(403)` contributes its status
//! - an `...OrFail` lookup contributes `404`
//! - a handler with validation rules contributes `422`
//!
//! When nothing is found the operation is documented with a single `200 OK`.

use crate::openapi_builder::{MediaType, Response, Responses};
use crate::schema_compiler::{is_example_payload, ObjectSchema, SchemaNode};
use indexmap::IndexSet;
use log::debug;
use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

/// Text patterns the inferencer looks for
#[derive(Debug, Clone)]
pub struct ResponsePatterns {
    /// Opening of a structured response construction, up to and including `(`
    pub response_call: Regex,
    /// Explicit abort with the status in the first capture group
    pub abort_call: Regex,
    /// Call-chain suffix of a lookup that fails with 404
    pub or_fail_marker: String,
}

impl Default for ResponsePatterns {
    fn default() -> Self {
        static RESPONSE_RE: OnceLock<Regex> = OnceLock::new();
        static ABORT_RE: OnceLock<Regex> = OnceLock::new();

        Self {
            response_call: RESPONSE_RE
                .get_or_init(|| {
                    Regex::new(r"response\(\s*\)\s*->\s*json\s*\(").expect("Invalid regex constant")
                })
                .clone(),
            abort_call: ABORT_RE
                .get_or_init(|| Regex::new(r"\babort\(\s*(\d{3})\b").expect("Invalid regex constant"))
                .clone(),
            or_fail_marker: "OrFail".to_string(),
        }
    }
}

/// Infers documented responses from handler source text
#[derive(Debug, Clone, Default)]
pub struct ResponseCodeInferencer {
    patterns: ResponsePatterns,
}

impl ResponseCodeInferencer {
    pub fn new(patterns: ResponsePatterns) -> Self {
        Self { patterns }
    }

    /// Status codes suggested by `source`, unique, in contribution order
    pub fn status_codes(&self, source: &str, has_rules: bool) -> IndexSet<String> {
        let mut codes = IndexSet::new();

        let calls = self.response_calls(source);
        let explicit: Vec<&String> = calls.iter().flatten().collect();
        codes.extend(explicit.iter().map(|code| code.to_string()));

        if source.contains(self.patterns.or_fail_marker.as_str()) {
            codes.insert("404".to_string());
        }

        if calls.len() > explicit.len() {
            codes.insert("200".to_string());
        }

        for captures in self.patterns.abort_call.captures_iter(source) {
            codes.insert(captures[1].to_string());
        }

        if has_rules {
            codes.insert("422".to_string());
        }

        debug!("Inferred status codes: {:?}", codes);
        codes
    }

    /// Responses for an operation, falling back to `200 OK` when no code is found
    pub fn infer(&self, source: &str, has_rules: bool, example: Option<&Value>) -> Responses {
        let mut responses = Responses::default();

        for code in self.status_codes(source, has_rules) {
            let media = MediaType {
                schema: Some(SchemaNode::Object(ObjectSchema::default())),
                example: None,
            };
            responses
                .codes
                .insert(code.clone(), Response::json(format!("Response {}", code), media));
        }

        if responses.codes.is_empty() {
            responses.codes.insert("200".to_string(), Response::described("OK"));
        }

        responses.example = example
            .filter(|value| is_example_payload(value))
            .cloned()
            .map(|example| {
                Response::json(
                    "Example",
                    MediaType {
                        schema: None,
                        example: Some(example),
                    },
                )
            });

        responses
    }

    /// One entry per response construction: its explicit status, if any
    fn response_calls(&self, source: &str) -> Vec<Option<String>> {
        self.patterns
            .response_call
            .find_iter(source)
            .map(|call| {
                let arguments = top_level_arguments(&source[call.end()..]);
                arguments
                    .get(1)
                    .map(|argument| argument.trim())
                    .filter(|argument| is_status_code(argument))
                    .map(str::to_string)
            })
            .collect()
    }
}

fn is_status_code(text: &str) -> bool {
    text.len() == 3 && text.bytes().all(|b| b.is_ascii_digit())
}

/// Splits the argument list that starts right after an opening parenthesis.
///
/// Stops at the matching `)`; nested brackets and quoted strings are skipped over.
fn top_level_arguments(text: &str) -> Vec<&str> {
    let mut arguments = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut start = 0;

    for (index, ch) in text.char_indices() {
        if let Some(open) = quote {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == open {
                quote = None;
            }
            continue;
        }

        match ch {
            '\'' | '"' => quote = Some(ch),
            '(' | '[' | '{' => depth += 1,
            ')' if depth == 0 => {
                arguments.push(&text[start..index]);
                return arguments;
            }
            ')' | ']' | '}' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                arguments.push(&text[start..index]);
                start = index + 1;
            }
            _ => {}
        }
    }

    arguments.push(&text[start..]);
    arguments
}
