//! Parameter schemas for tools
//!
//! A schema is an ordered set of named fields, each with a small constraint:
//! required or optional, a JSON type, and optional length bounds for
//! strings. Validation strips unknown fields.

use indexmap::IndexMap;
use serde_json::{json, Map, Value};
use std::fmt;

use crate::protocol::McpInputSchema;

/// JSON type a field must have
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    String,
    Integer,
    Number,
    Boolean,
}

impl FieldKind {
    fn as_str(&self) -> &'static str {
        match self {
            FieldKind::String => "string",
            FieldKind::Integer => "integer",
            FieldKind::Number => "number",
            FieldKind::Boolean => "boolean",
        }
    }

    fn matches(&self, value: &Value) -> bool {
        match self {
            FieldKind::String => value.is_string(),
            FieldKind::Integer => value.is_i64() || value.is_u64(),
            FieldKind::Number => value.is_number(),
            FieldKind::Boolean => value.is_boolean(),
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Constraint on a single field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldConstraint {
    pub kind: FieldKind,
    pub required: bool,
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub description: Option<String>,
}

impl FieldConstraint {
    fn of(kind: FieldKind) -> Self {
        Self {
            kind,
            required: true,
            min_length: None,
            max_length: None,
            description: None,
        }
    }

    /// Required string
    pub fn string() -> Self {
        Self::of(FieldKind::String)
    }

    pub fn integer() -> Self {
        Self::of(FieldKind::Integer)
    }

    pub fn number() -> Self {
        Self::of(FieldKind::Number)
    }

    pub fn boolean() -> Self {
        Self::of(FieldKind::Boolean)
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Bound string length, in characters
    pub fn length(mut self, min: usize, max: usize) -> Self {
        self.min_length = Some(min);
        self.max_length = Some(max);
        self
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Check a present, non-null value
    fn check(&self, name: &str, value: &Value) -> Result<(), String> {
        if !self.kind.matches(value) {
            return Err(format!("{}: expected {}", name, self.kind));
        }

        if let Value::String(s) = value {
            let len = s.chars().count();
            if let Some(min) = self.min_length {
                if len < min {
                    return Err(format!("{}: must be at least {} character(s)", name, min));
                }
            }
            if let Some(max) = self.max_length {
                if len > max {
                    return Err(format!("{}: must be at most {} character(s)", name, max));
                }
            }
        }

        Ok(())
    }

    /// JSON Schema property for this field
    fn to_property(&self) -> Value {
        let mut property = Map::new();
        property.insert("type".to_string(), json!(self.kind.as_str()));
        if let Some(description) = &self.description {
            property.insert("description".to_string(), json!(description));
        }
        if let Some(min) = self.min_length {
            property.insert("minLength".to_string(), json!(min));
        }
        if let Some(max) = self.max_length {
            property.insert("maxLength".to_string(), json!(max));
        }
        Value::Object(property)
    }
}

/// Parameter schema of a tool
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParamSchema {
    fields: IndexMap<String, FieldConstraint>,
}

impl ParamSchema {
    /// Schema without parameters
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, name: impl Into<String>, constraint: FieldConstraint) -> Self {
        self.fields.insert(name.into(), constraint);
        self
    }

    /// Validate raw arguments, returning only the declared fields
    ///
    /// Missing or null arguments count as an empty object. `null` for an
    /// optional field counts as absent.
    pub fn validate(&self, raw: Option<Value>) -> Result<ToolParams, String> {
        let mut args = match raw {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(map)) => map,
            Some(_) => return Err("arguments must be an object".to_string()),
        };

        let mut validated = Map::new();
        for (name, constraint) in &self.fields {
            match args.remove(name) {
                None | Some(Value::Null) => {
                    if constraint.required {
                        return Err(format!("{}: required", name));
                    }
                }
                Some(value) => {
                    constraint.check(name, &value)?;
                    validated.insert(name.clone(), value);
                }
            }
        }

        Ok(ToolParams(validated))
    }

    /// Render as the JSON Schema advertised by `tools/list`
    pub fn to_input_schema(&self) -> McpInputSchema {
        let properties: Map<String, Value> = self
            .fields
            .iter()
            .map(|(name, c)| (name.clone(), c.to_property()))
            .collect();
        let required: Vec<String> = self
            .fields
            .iter()
            .filter(|(_, c)| c.required)
            .map(|(name, _)| name.clone())
            .collect();

        McpInputSchema {
            schema_type: "object".to_string(),
            properties: Some(properties),
            required: if required.is_empty() { None } else { Some(required) },
        }
    }
}

/// Arguments that passed schema validation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolParams(Map<String, Value>);

impl ToolParams {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn str(&self, name: &str) -> Option<&str> {
        self.0.get(name).and_then(Value::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
