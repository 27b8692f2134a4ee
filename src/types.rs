//! Common types used throughout listwalk
//!
//! This module contains shared type definitions, type aliases,
//! and the typed accessors used to walk untyped JSON bodies.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ============================================================================
// Type Aliases
// ============================================================================

/// JSON value type (re-exported from serde_json)
pub type JsonValue = serde_json::Value;

/// JSON object type
pub type JsonObject = serde_json::Map<String, JsonValue>;

// ============================================================================
// Formats
// ============================================================================

/// Framing of the input record stream
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum InputFormat {
    /// Concatenated JSON values
    #[default]
    Json,
    /// Multi-document YAML stream
    Yaml,
    /// One raw string per line
    Raw,
}

/// Encoding of emitted results
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// One compact JSON object per line
    #[default]
    Json,
    /// YAML document stream
    Yaml,
}

// ============================================================================
// Seed
// ============================================================================

/// One request URL derived from one input record
#[derive(Debug, Clone, PartialEq)]
pub struct Seed {
    /// Monotonic number assigned at expansion time (log correlation only)
    pub sequence: u64,
    /// URL of the first page
    pub url: String,
    /// Record the seed was expanded from
    pub input: JsonValue,
}

impl Seed {
    /// Create a new seed
    pub fn new(sequence: u64, url: impl Into<String>, input: JsonValue) -> Self {
        Self {
            sequence,
            url: url.into(),
            input,
        }
    }
}

/// One output record, produced exactly once per completed seed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeedOutput {
    /// Original input record
    pub input: JsonValue,
    /// Merged collection, raw body, or error body
    pub response: JsonValue,
}

impl SeedOutput {
    /// Create a new output record
    pub fn new(input: JsonValue, response: JsonValue) -> Self {
        Self { input, response }
    }
}

// ============================================================================
// Typed accessors
// ============================================================================

/// Name of a JSON value's variant, for shape errors
pub fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Failable accessors over decoded JSON
///
/// Absent keys and explicit nulls read as `None`; any other mismatch
/// is an [`Error::UnexpectedShape`].
pub trait ValueExt {
    /// Borrow the value as an object
    fn expect_object(&self, what: &str) -> Result<&JsonObject>;

    /// Read an optional array field
    fn array_field(&self, key: &str) -> Result<Option<&Vec<Value>>>;

    /// Read an optional string field
    fn str_field(&self, key: &str) -> Result<Option<&str>>;
}

impl ValueExt for Value {
    fn expect_object(&self, what: &str) -> Result<&JsonObject> {
        self.as_object()
            .ok_or_else(|| Error::unexpected_shape(what, "object", kind_name(self)))
    }

    fn array_field(&self, key: &str) -> Result<Option<&Vec<Value>>> {
        match self.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Array(items)) => Ok(Some(items)),
            Some(other) => Err(Error::unexpected_shape(key, "array", kind_name(other))),
        }
    }

    fn str_field(&self, key: &str) -> Result<Option<&str>> {
        match self.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s)),
            Some(other) => Err(Error::unexpected_shape(key, "string", kind_name(other))),
        }
    }
}
