//! Cursor paginator
//!
//! Follows `nextPageToken` in the response body by sending it back as the
//! `pageToken` query parameter, merging the configured collection field.

use super::types::{NextPage, PageCursor, PaginationState};
use crate::error::Result;
use crate::types::{JsonObject, ValueExt};
use serde_json::Value;
use url::Url;

/// Query parameter carrying the cursor
pub const PAGE_TOKEN_PARAM: &str = "pageToken";

/// Response field carrying the next cursor
pub const NEXT_PAGE_TOKEN_FIELD: &str = "nextPageToken";

/// Cursor-based pagination over a collection field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CursorPaginator {
    /// Query parameter name for cursor
    pub cursor_param: String,
    /// Response field holding the next cursor
    pub token_field: String,
    /// Response field whose array is merged (None = no pagination)
    pub collection_field: Option<String>,
}

impl CursorPaginator {
    /// Create a paginator for a collection field
    pub fn new(collection_field: Option<String>) -> Self {
        Self {
            cursor_param: PAGE_TOKEN_PARAM.to_string(),
            token_field: NEXT_PAGE_TOKEN_FIELD.to_string(),
            collection_field,
        }
    }

    /// Check if pages are merged rather than returned raw
    pub fn is_paginating(&self) -> bool {
        self.collection_field.is_some()
    }

    /// Build the URL for the next request
    ///
    /// The first page is the seed URL exactly as given, including any
    /// cursor parameter it already carries. Later pages keep the seed's
    /// other query parameters and replace the cursor parameter.
    pub fn page_url(&self, seed_url: &str, cursor: &PageCursor) -> Result<Url> {
        let mut url = Url::parse(seed_url)?;
        let Some(token) = cursor.token() else {
            return Ok(url);
        };

        let mut pairs: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(k, _)| *k != self.cursor_param)
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        pairs.push((self.cursor_param.clone(), token.to_string()));

        url.query_pairs_mut().clear().extend_pairs(pairs);
        Ok(url)
    }

    /// Merge a 200 page into the state and decide what comes next
    pub fn process_page(&self, body: &Value, state: &mut PaginationState) -> Result<NextPage> {
        body.expect_object("response body")?;
        state.pages += 1;

        if let Some(field) = &self.collection_field {
            if let Some(items) = body.array_field(field)? {
                state.collection.extend_from_page(items);
            }
        }

        match body.str_field(&self.token_field)? {
            Some(token) if !token.is_empty() => {
                state.cursor.set(token);
                Ok(NextPage::Continue(token.to_string()))
            }
            _ => Ok(NextPage::Done),
        }
    }

    /// Build the merged response from a finished state
    ///
    /// The collection key is omitted entirely when nothing was collected.
    pub fn finish(&self, state: PaginationState) -> Value {
        let mut response = JsonObject::new();
        if let Some(field) = &self.collection_field {
            if !state.collection.is_empty() {
                response.insert(
                    field.clone(),
                    Value::Array(state.collection.into_items()),
                );
            }
        }
        Value::Object(response)
    }
}
