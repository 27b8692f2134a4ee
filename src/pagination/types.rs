//! Pagination types
//!
//! Per-worker state that never crosses task boundaries.

use serde_json::Value;

/// Result of processing one page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextPage {
    /// Fetch another page with this token
    Continue(String),
    /// No more pages
    Done,
}

impl NextPage {
    /// Check if this is a done result
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done)
    }

    /// Check if this is a continue result
    pub fn is_continue(&self) -> bool {
        matches!(self, Self::Continue(_))
    }
}

/// Continuation token for the next page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageCursor {
    token: Option<String>,
}

impl PageCursor {
    /// Cursor for the first page
    pub fn new() -> Self {
        Self::default()
    }

    /// Current token, if any
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Advance to a new token; an empty token clears the cursor
    pub fn set(&mut self, token: impl Into<String>) {
        let token = token.into();
        self.token = if token.is_empty() { None } else { Some(token) };
    }

    /// Check if no token has been set yet
    pub fn is_first_page(&self) -> bool {
        self.token.is_none()
    }
}

/// Items accumulated across pages, in page order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Collection {
    items: Vec<Value>,
}

impl Collection {
    /// Create an empty collection
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one page's items
    pub fn extend_from_page(&mut self, items: &[Value]) {
        self.items.extend_from_slice(items);
    }

    /// Number of items collected
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if nothing was collected
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Take the collected items
    pub fn into_items(self) -> Vec<Value> {
        self.items
    }
}

/// Pagination progress for one seed
#[derive(Debug, Clone, Default)]
pub struct PaginationState {
    /// Cursor for the next request
    pub cursor: PageCursor,
    /// Items merged so far
    pub collection: Collection,
    /// Pages processed
    pub pages: u32,
}

impl PaginationState {
    /// Create a new pagination state
    pub fn new() -> Self {
        Self::default()
    }
}
