//! Compiles rule declarations into request schemas.
//!
//! Each field's tokens are reduced to a typed [`SchemaNode`]; the nodes are then placed
//! into one tree following the field paths. A `.*` segment means "each element of an
//! array": `tags.*.name` becomes an array property `tags` whose items are objects with a
//! `name` property, while a terminal wildcard such as `scores.*` makes the leaf itself
//! the array's item schema.
//!
//! Only fields without a wildcard can be required; element-level requirements are not
//! expressed in the schema.

use crate::rules::{RuleDeclaration, RuleToken};
use indexmap::IndexMap;
use log::debug;
use serde::Serialize;
use serde_json::{json, Value};

/// Marker separating an array field from the path inside its elements
const WILDCARD: &str = ".*";

/// OpenAPI schema node
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SchemaNode {
    Object(ObjectSchema),
    Array(ArraySchema),
    String(Constraints),
    Integer(Constraints),
    Number(Constraints),
    Boolean(Constraints),
    /// Uploaded file; forces a multipart request body
    File(Constraints),
}

/// Object schema with ordered properties
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ObjectSchema {
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub properties: IndexMap<String, SchemaNode>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub example: Option<Value>,
}

/// Array schema; `items` is absent when a field is only known to be an array
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ArraySchema {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<SchemaNode>>,
    #[serde(flatten)]
    pub constraints: Constraints,
}

/// Constraints attached to scalar and array nodes
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Constraints {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nullable: Option<bool>,
    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_length: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum: Option<i64>,
}

/// Value type inferred from a field's rules
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    File,
}

/// Request body encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    Json,
    Multipart,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Json => "application/json",
            ContentType::Multipart => "multipart/form-data",
        }
    }
}

/// Result of compiling one rule declaration
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledSchema {
    /// Root object schema
    pub schema: ObjectSchema,
    /// Multipart when any field is a file, JSON otherwise
    pub content_type: ContentType,
}

/// Compiler from rule declarations to request schemas
pub struct SchemaCompiler;

impl SchemaNode {
    /// Builds an empty node of the given type
    pub fn of_type(value_type: ValueType, constraints: Constraints) -> Self {
        match value_type {
            ValueType::String => SchemaNode::String(constraints),
            ValueType::Integer => SchemaNode::Integer(constraints),
            ValueType::Number => SchemaNode::Number(constraints),
            ValueType::Boolean => SchemaNode::Boolean(constraints),
            ValueType::File => SchemaNode::File(constraints),
            ValueType::Array => SchemaNode::Array(ArraySchema {
                items: None,
                constraints,
            }),
        }
    }

    /// String restricted to a single value, used for the method override field
    pub fn single_value(value: &str) -> Self {
        SchemaNode::String(Constraints {
            enum_values: Some(vec![Value::String(value.to_string())]),
            ..Default::default()
        })
    }
}

impl ObjectSchema {
    /// Adds a required property, replacing any previous definition of the same name
    pub fn insert_required(&mut self, name: &str, node: SchemaNode) {
        self.properties.insert(name.to_string(), node);
        if !self.required.iter().any(|field| field == name) {
            self.required.push(name.to_string());
        }
    }

    pub fn is_required(&self, name: &str) -> bool {
        self.required.iter().any(|field| field == name)
    }
}

impl SchemaCompiler {
    /// Compiles a rule declaration into a root object schema.
    ///
    /// `example` is attached to the root when it is an object or array payload.
    pub fn compile(declaration: &RuleDeclaration, example: Option<&Value>) -> CompiledSchema {
        let mut root = ObjectSchema::default();
        let mut has_file = false;

        for (field, tokens) in declaration {
            let value_type = guess_type(tokens);
            if value_type == ValueType::File {
                has_file = true;
            }

            let node = SchemaNode::of_type(value_type, field_constraints(tokens, value_type));
            let required = tokens.iter().any(|token| token.is_literal("required"));

            debug!("Compiled field {} as {:?} (required: {})", field, value_type, required);
            insert_field(&mut root, field, node);

            if required && !field.contains(WILDCARD) && !root.is_required(field) {
                root.required.push(field.clone());
            }
        }

        root.example = example.filter(|value| is_example_payload(value)).cloned();

        CompiledSchema {
            schema: root,
            content_type: if has_file {
                ContentType::Multipart
            } else {
                ContentType::Json
            },
        }
    }
}

/// Whether `value` is worth publishing as an example: a non-empty object or array
pub fn is_example_payload(value: &Value) -> bool {
    match value {
        Value::Object(fields) => !fields.is_empty(),
        Value::Array(items) => !items.is_empty(),
        _ => false,
    }
}

/// Infers a field's value type. Only textual tokens are considered, case-insensitively.
///
/// Priority: file (`mimes:`/`mimetypes:` rules, `file`, `image`), `integer`, `numeric`, `boolean`,
/// `array`, otherwise string.
pub fn guess_type(tokens: &[RuleToken]) -> ValueType {
    let keywords: Vec<String> = tokens
        .iter()
        .filter_map(RuleToken::keyword)
        .map(str::to_lowercase)
        .collect();

    let literals: Vec<String> = tokens
        .iter()
        .filter_map(|token| match token {
            RuleToken::Literal(name) => Some(name.to_lowercase()),
            _ => None,
        })
        .collect();
    let has = |name: &str| literals.iter().any(|literal| literal == name);

    if keywords.iter().any(|keyword| keyword.starts_with("mime")) || has("file") || has("image") {
        ValueType::File
    } else if has("integer") {
        ValueType::Integer
    } else if has("numeric") {
        ValueType::Number
    } else if has("boolean") {
        ValueType::Boolean
    } else if has("array") {
        ValueType::Array
    } else {
        ValueType::String
    }
}

fn field_constraints(tokens: &[RuleToken], value_type: ValueType) -> Constraints {
    let mut constraints = Constraints::default();

    if tokens.iter().any(|token| token.is_literal("nullable")) {
        constraints.nullable = Some(true);
    }

    constraints.enum_values = extract_enum(tokens);
    // Booleans travel as 0/1 on the wire, whatever `in:` says.
    if value_type == ValueType::Boolean {
        constraints.enum_values = Some(vec![json!(0), json!(1)]);
    }

    for token in tokens {
        if let Some(value) = token.parameter("min") {
            if let Some(min) = parse_bound(value) {
                set_bounds(&mut constraints, value_type, Some(min), None);
            }
        }

        if let Some(value) = token.parameter("max") {
            if let Some(max) = parse_bound(value) {
                set_bounds(&mut constraints, value_type, None, Some(max));
            }
        }

        if let Some(value) = token.parameter("between") {
            match parse_between(value) {
                Some((min, max)) => set_bounds(&mut constraints, value_type, Some(min), Some(max)),
                None => debug!("Ignoring malformed between rule: {}", value),
            }
        }
    }

    constraints
}

/// First enum source wins: an `in:` list or an enumeration-backed rule.
fn extract_enum(tokens: &[RuleToken]) -> Option<Vec<Value>> {
    tokens.iter().find_map(|token| match token {
        RuleToken::Parameterized { key, value } if key == "in" => Some(
            value
                .split(',')
                .map(|item| Value::String(item.to_string()))
                .collect(),
        ),
        RuleToken::EnumConstraint(values) => Some(values.clone()),
        _ => None,
    })
}

fn set_bounds(constraints: &mut Constraints, value_type: ValueType, min: Option<i64>, max: Option<i64>) {
    match value_type {
        ValueType::String => {
            constraints.min_length = min.or(constraints.min_length);
            constraints.max_length = max.or(constraints.max_length);
        }
        ValueType::Integer | ValueType::Number => {
            constraints.minimum = min.or(constraints.minimum);
            constraints.maximum = max.or(constraints.maximum);
        }
        _ => {}
    }
}

fn parse_bound(value: &str) -> Option<i64> {
    value.trim().parse().ok()
}

fn parse_between(value: &str) -> Option<(i64, i64)> {
    let (min, max) = value.split_once(',')?;
    if max.contains(',') {
        return None;
    }
    Some((parse_bound(min)?, parse_bound(max)?))
}

/// Places `node` at `path` inside `object`, creating array levels for each wildcard.
fn insert_field(object: &mut ObjectSchema, path: &str, node: SchemaNode) {
    let Some(index) = path.find(WILDCARD) else {
        let merged = match object.properties.get(path) {
            Some(existing) => merge_leaf(existing, node),
            None => node,
        };
        object.properties.insert(path.to_string(), merged);
        return;
    };

    let array_name = &path[..index];
    let remainder = path[index + WILDCARD.len()..].trim_matches('.');

    let slot = object
        .properties
        .entry(array_name.to_string())
        .or_insert_with(|| SchemaNode::Array(ArraySchema::default()));
    let current = std::mem::replace(slot, SchemaNode::Array(ArraySchema::default()));
    *slot = with_element(current, remainder, node);
}

/// Returns `array_node` with the element path `remainder` filled in.
///
/// A terminal wildcard sets the element schema, except that an object element already
/// built from nested rules (`meta.*.key` before `meta.*`) keeps its properties.
fn with_element(array_node: SchemaNode, remainder: &str, node: SchemaNode) -> SchemaNode {
    let mut array = match array_node {
        SchemaNode::Array(array) => array,
        _ => ArraySchema::default(),
    };

    let items = if remainder.is_empty() {
        match (array.items.take().map(|items| *items), node) {
            (Some(SchemaNode::Object(element)), node)
                if !element.properties.is_empty() && !matches!(node, SchemaNode::Object(_)) =>
            {
                SchemaNode::Object(element)
            }
            (_, node) => node,
        }
    } else {
        let mut element = match array.items.take().map(|items| *items) {
            Some(SchemaNode::Object(element)) => element,
            _ => ObjectSchema::default(),
        };
        insert_field(&mut element, remainder, node);
        SchemaNode::Object(element)
    };

    array.items = Some(Box::new(items));
    SchemaNode::Array(array)
}

/// A plain `array` rule declared after its element rules keeps the element schema.
fn merge_leaf(existing: &SchemaNode, node: SchemaNode) -> SchemaNode {
    match (existing, node) {
        (SchemaNode::Array(previous), SchemaNode::Array(mut array)) if array.items.is_none() => {
            array.items = previous.items.clone();
            SchemaNode::Array(array)
        }
        (_, node) => node,
    }
}
