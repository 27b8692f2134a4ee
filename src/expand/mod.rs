//! Seed expansion module
//!
//! Turns one input record into zero or more seed URLs.
//!
//! # Expanders
//!
//! - `TemplateExpander` - renders a `{{ field }}` URL template against the record
//! - `JsonPathExpander` - selects string values with a JSONPath expression
//! - `IdentityExpander` - the record itself is the URL

mod expanders;

pub use expanders::{
    infer_collection_field, IdentityExpander, JsonPathExpander, SeedExpander, TemplateExpander,
};
