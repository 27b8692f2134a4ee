//! Decoder types and traits
//!
//! Defines the core decoder abstraction.

use super::decoders::{JsonStreamDecoder, LineDecoder, YamlStreamDecoder};
use crate::error::Result;
use crate::types::InputFormat;
use serde_json::Value;
use std::io::{BufReader, Read};

/// Trait for framing an input stream into records
pub trait InputDecoder {
    /// Decode the next record, `None` at end of input
    fn next_record(&mut self) -> Result<Option<Value>>;
}

/// Build the decoder for an input format over a reader
pub fn decoder_for<R>(format: InputFormat, reader: R) -> Box<dyn InputDecoder + Send>
where
    R: Read + Send + 'static,
{
    match format {
        InputFormat::Json => Box::new(JsonStreamDecoder::new(reader)),
        InputFormat::Yaml => Box::new(YamlStreamDecoder::new(BufReader::new(reader))),
        InputFormat::Raw => Box::new(LineDecoder::new(BufReader::new(reader))),
    }
}
