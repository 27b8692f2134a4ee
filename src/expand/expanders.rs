//! Expander implementations

use crate::error::{Error, Result};
use crate::template::{self, TemplateContext};
use jsonpath_rust::JsonPath;
use serde_json::Value;
use tracing::debug;
use url::Url;

/// Derives seed URLs from an input record
pub trait SeedExpander {
    /// Expand one record into its seed URLs, in order
    fn expand(&self, input: &Value) -> Result<Vec<String>>;
}

// ============================================================================
// Template Expander
// ============================================================================

/// Renders one URL per record from a `{{ field }}` template
#[derive(Debug, Clone)]
pub struct TemplateExpander {
    template: String,
    literal: bool,
}

impl TemplateExpander {
    /// Create a template expander
    pub fn new(template: impl Into<String>) -> Result<Self> {
        let template = template.into();
        if template.trim().is_empty() {
            return Err(Error::template("URL template is empty"));
        }
        let variables = template::extract_variables(&template);
        debug!(?variables, "compiled URL template");
        Ok(Self {
            literal: !template::has_templates(&template),
            template,
        })
    }
}

impl SeedExpander for TemplateExpander {
    fn expand(&self, input: &Value) -> Result<Vec<String>> {
        if self.literal {
            return Ok(vec![self.template.clone()]);
        }
        let ctx = TemplateContext::with_input(input.clone());
        Ok(vec![template::render(&self.template, &ctx)?])
    }
}

// ============================================================================
// JSONPath Expander
// ============================================================================

/// Selects seed URLs from the record with a JSONPath expression
///
/// Every match is a seed; a match that is not a string is an error.
#[derive(Debug)]
pub struct JsonPathExpander {
    path: JsonPath,
}

impl JsonPathExpander {
    /// Compile a JSONPath expression
    pub fn new(path: &str) -> Result<Self> {
        let compiled = JsonPath::try_from(path)
            .map_err(|e| Error::json_path(format!("Invalid JSONPath '{path}': {e}")))?;
        Ok(Self { path: compiled })
    }
}

impl SeedExpander for JsonPathExpander {
    fn expand(&self, input: &Value) -> Result<Vec<String>> {
        let matches = match self.path.find(input) {
            Value::Array(items) => items,
            Value::Null => vec![],
            other => vec![other],
        };

        matches
            .into_iter()
            .map(|m| match m {
                Value::String(s) => Ok(s),
                other => Err(Error::non_string_seed(&other)),
            })
            .collect()
    }
}

// ============================================================================
// Identity Expander
// ============================================================================

/// Uses the record itself as the URL
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityExpander;

impl SeedExpander for IdentityExpander {
    fn expand(&self, input: &Value) -> Result<Vec<String>> {
        match input {
            Value::String(s) => Ok(vec![s.clone()]),
            other => Err(Error::non_string_seed(other)),
        }
    }
}

// ============================================================================
// Collection inference
// ============================================================================

/// Infer the collection field from the last path segment of a seed URL
///
/// `https://h/v1/projects/p/instances` yields `instances`. A trailing
/// slash yields `None`.
pub fn infer_collection_field(url: &str) -> Result<Option<String>> {
    let parsed = Url::parse(url)?;
    let last = parsed
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .unwrap_or_default();

    if last.is_empty() {
        Ok(None)
    } else {
        Ok(Some(last.to_string()))
    }
}
