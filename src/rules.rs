//! Rule expression parsing.
//!
//! A rule declaration maps a field path (`title`, `tags.*.name`) to a rule expression.
//! Expressions arrive either as a single `|`-separated string (`required|string|max:255`)
//! or as a list whose elements are strings or structured rule objects. Parsing only tags
//! each token; the meaning of a token is decided by the schema compiler.

use crate::error::{Error, Result};
use indexmap::IndexMap;
use serde_json::Value;

/// Field path -> rule expression, in declaration order
pub type RuleDeclaration = IndexMap<String, RuleExpression>;

/// Ordered list of tokens for one field
pub type RuleExpression = Vec<RuleToken>;

/// A single validation rule token.
#[derive(Debug, Clone, PartialEq)]
pub enum RuleToken {
    /// Plain keyword such as `required` or `integer`
    Literal(String),
    /// `key:value` form such as `max:255` or `in:draft,published`
    Parameterized { key: String, value: String },
    /// Enumeration-backed constraint carrying the enumeration's backing values
    EnumConstraint(Vec<Value>),
    /// Structured rule object with no known meaning, kept as-is
    Opaque(Value),
}

impl RuleToken {
    /// Parses a textual token. Blank tokens yield `None`.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }

        Some(match text.split_once(':') {
            Some((key, value)) => RuleToken::Parameterized {
                key: key.trim().to_string(),
                value: value.to_string(),
            },
            None => RuleToken::Literal(text.to_string()),
        })
    }

    /// The rule name for textual tokens: the literal itself or the key of a `key:value` token
    pub fn keyword(&self) -> Option<&str> {
        match self {
            RuleToken::Literal(name) => Some(name),
            RuleToken::Parameterized { key, .. } => Some(key),
            _ => None,
        }
    }

    /// Whether this is exactly the literal `name` (case-sensitive)
    pub fn is_literal(&self, name: &str) -> bool {
        matches!(self, RuleToken::Literal(literal) if literal == name)
    }

    /// The value of a `key:value` token when the key matches
    pub fn parameter(&self, name: &str) -> Option<&str> {
        match self {
            RuleToken::Parameterized { key, value } if key == name => Some(value),
            _ => None,
        }
    }
}

/// Splits a pipe-separated rule string into tokens.
pub fn parse_pipe(rule: &str) -> RuleExpression {
    rule.split('|').filter_map(RuleToken::parse).collect()
}

/// Normalizes one raw rule expression (string or list) into tokens.
pub fn parse_expression(field: &str, raw: &Value) -> Result<RuleExpression> {
    match raw {
        Value::String(rule) => Ok(parse_pipe(rule)),
        Value::Array(items) => Ok(items.iter().filter_map(parse_list_item).collect()),
        Value::Null => Ok(Vec::new()),
        other => Err(Error::InvalidRule {
            field: field.to_string(),
            message: format!("expected a rule string or list, found {}", other),
        }),
    }
}

/// Normalizes a whole declaration object (`{field: expression}`).
pub fn parse_declaration(raw: &Value) -> Result<RuleDeclaration> {
    let fields = raw.as_object().ok_or_else(|| Error::InvalidRule {
        field: "<rules>".to_string(),
        message: "rules must be a mapping of field paths".to_string(),
    })?;

    let mut declaration = RuleDeclaration::new();
    for (field, expression) in fields {
        declaration.insert(field.clone(), parse_expression(field, expression)?);
    }

    Ok(declaration)
}

fn parse_list_item(item: &Value) -> Option<RuleToken> {
    match item {
        Value::String(text) => RuleToken::parse(text),
        Value::Object(map) => match map.get("enum") {
            Some(Value::Array(cases)) => Some(RuleToken::EnumConstraint(
                cases.iter().filter_map(enum_case_value).collect(),
            )),
            _ => Some(RuleToken::Opaque(item.clone())),
        },
        Value::Null => None,
        other => Some(RuleToken::Opaque(other.clone())),
    }
}

/// A case's explicit scalar value, falling back to its symbolic name.
fn enum_case_value(case: &Value) -> Option<Value> {
    match case {
        Value::Object(fields) => match fields.get("value") {
            Some(value) if !value.is_null() => Some(value.clone()),
            _ => fields.get("name").cloned(),
        },
        Value::Null => None,
        scalar => Some(scalar.clone()),
    }
}
