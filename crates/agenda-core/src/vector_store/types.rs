//! Vector store point types

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A point returned by a query or scroll
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredPoint {
    /// Point id (integer or UUID string)
    pub id: Value,
    /// Similarity score, absent for scroll results
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,
    #[serde(default)]
    pub payload: Option<Map<String, Value>>,
}

impl ScoredPoint {
    /// Get a payload field rendered as text
    ///
    /// Strings are returned as-is, other scalars via their JSON form.
    /// Missing and null fields yield `None`.
    pub fn payload_text(&self, key: &str) -> Option<String> {
        match self.payload.as_ref()?.get(key)? {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
}

/// A point to insert
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPoint {
    pub id: u64,
    pub vector: Vec<f32>,
    pub payload: Value,
}
