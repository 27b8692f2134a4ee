//! Input decoder module
//!
//! Supports: JSON stream, YAML document stream, raw lines
//!
//! # Overview
//!
//! The decode module frames the input stream into records. A decoder runs
//! on its own producer thread (see [`spawn_input_thread`]) and hands
//! records to the async side over a bounded channel.

mod decoders;
mod producer;
mod types;

pub use decoders::{JsonStreamDecoder, LineDecoder, YamlStreamDecoder};
pub use producer::spawn_input_thread;
pub use types::{decoder_for, InputDecoder};
