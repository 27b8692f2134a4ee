//! Pagination module
//!
//! Cursor (`pageToken` / `nextPageToken`) pagination with item merging.
//!
//! # Overview
//!
//! A [`CursorPaginator`] is shared configuration; each worker owns one
//! [`PaginationState`] holding its [`PageCursor`] and accumulated
//! [`Collection`]. After every 200 page the paginator appends the page's
//! items and decides whether another page follows.

mod paginator;
mod types;

pub use paginator::{CursorPaginator, NEXT_PAGE_TOKEN_FIELD, PAGE_TOKEN_PARAM};
pub use types::{Collection, NextPage, PageCursor, PaginationState};
