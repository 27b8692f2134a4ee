//! Output module
//!
//! Serializes one result record per completed seed.
//!
//! # Overview
//!
//! The [`ResultEmitter`] is shared by every worker. Records are encoded
//! outside the lock and written whole while holding it, so concurrent
//! workers never interleave their output.

mod writer;

pub use writer::ResultEmitter;
