//! Decoder implementations
//!
//! Each decoder handles a specific input framing.

use super::types::InputDecoder;
use crate::error::{Error, Result};
use serde_json::de::IoRead;
use serde_json::{StreamDeserializer, Value};
use std::io::{BufRead, Read};

// ============================================================================
// JSON Stream Decoder
// ============================================================================

/// Decoder for concatenated or whitespace-separated JSON values
pub struct JsonStreamDecoder<R: Read> {
    stream: StreamDeserializer<'static, IoRead<R>, Value>,
}

impl<R: Read> JsonStreamDecoder<R> {
    /// Create a new JSON stream decoder
    pub fn new(reader: R) -> Self {
        Self {
            stream: serde_json::Deserializer::from_reader(reader).into_iter::<Value>(),
        }
    }
}

impl<R: Read> InputDecoder for JsonStreamDecoder<R> {
    fn next_record(&mut self) -> Result<Option<Value>> {
        match self.stream.next() {
            Some(Ok(value)) => Ok(Some(value)),
            Some(Err(e)) => Err(Error::decode(format!(
                "Failed to parse JSON input at byte {}: {e}",
                self.stream.byte_offset()
            ))),
            None => Ok(None),
        }
    }
}

// ============================================================================
// YAML Stream Decoder
// ============================================================================

/// Decoder for multi-document YAML (`---` separated)
///
/// Lines are buffered until a document marker at column 0 closes the
/// current document, which is then parsed and returned. Earlier documents
/// are available before the rest of the stream has arrived. Documents
/// holding only comments or blank lines are skipped.
pub struct YamlStreamDecoder<R: BufRead> {
    reader: R,
    pending: String,
    /// `pending` opened with a `---` marker
    marker: bool,
    /// `pending` holds something other than markers, comments and directives
    content: bool,
    index: usize,
}

impl<R: BufRead> YamlStreamDecoder<R> {
    /// Create a new YAML stream decoder
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            pending: String::new(),
            marker: false,
            content: false,
            index: 0,
        }
    }

    /// Parse and reset the buffered document, `None` if it was empty
    fn take_document(&mut self) -> Result<Option<Value>> {
        let text = std::mem::take(&mut self.pending);
        let content = std::mem::replace(&mut self.content, false);
        self.marker = false;
        if !content {
            return Ok(None);
        }

        self.index += 1;
        serde_yaml::from_str(&text).map(Some).map_err(|e| {
            Error::decode(format!("Failed to parse YAML document {}: {e}", self.index))
        })
    }
}

impl<R: BufRead> InputDecoder for YamlStreamDecoder<R> {
    fn next_record(&mut self) -> Result<Option<Value>> {
        loop {
            let mut buf = Vec::new();
            if self.reader.read_until(b'\n', &mut buf)? == 0 {
                return self.take_document();
            }
            let line = String::from_utf8(buf).map_err(|e| {
                Error::decode(format!(
                    "YAML document {} is not valid UTF-8: {e}",
                    self.index + 1
                ))
            })?;
            let trimmed = line.trim_end_matches(['\n', '\r']);

            if let Some(rest) = document_start(trimmed) {
                let finished = if self.content {
                    self.take_document()?
                } else {
                    if self.marker {
                        self.pending.clear();
                    }
                    None
                };
                self.pending.push_str(&line);
                self.marker = true;
                self.content = is_content(rest);
                if finished.is_some() {
                    return Ok(finished);
                }
                continue;
            }

            if is_document_end(trimmed) {
                if let Some(document) = self.take_document()? {
                    return Ok(Some(document));
                }
                continue;
            }

            // Directives only appear before the first marker.
            let directive = !self.marker && trimmed.starts_with('%');
            if !directive && is_content(trimmed) {
                self.content = true;
            }
            self.pending.push_str(&line);
        }
    }
}

/// Remainder of a `---` line, `None` for any other line
fn document_start(line: &str) -> Option<&str> {
    if line == "---" {
        return Some("");
    }
    line.strip_prefix("--- ")
        .or_else(|| line.strip_prefix("---\t"))
}

fn is_document_end(line: &str) -> bool {
    line == "..." || line.starts_with("... ") || line.starts_with("...\t")
}

fn is_content(line: &str) -> bool {
    let line = line.trim_start();
    !line.is_empty() && !line.starts_with('#')
}

// ============================================================================
// Line Decoder
// ============================================================================

/// Decoder yielding each input line as a string record
///
/// Bytes that are not valid UTF-8 are replaced with U+FFFD rather than
/// failing the run.
pub struct LineDecoder<R: BufRead> {
    reader: R,
    line: Vec<u8>,
}

impl<R: BufRead> LineDecoder<R> {
    /// Create a new line decoder
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: Vec::new(),
        }
    }
}

impl<R: BufRead> InputDecoder for LineDecoder<R> {
    fn next_record(&mut self) -> Result<Option<Value>> {
        self.line.clear();
        if self.reader.read_until(b'\n', &mut self.line)? == 0 {
            return Ok(None);
        }

        let mut line: &[u8] = &self.line;
        if let Some(rest) = line.strip_suffix(b"\n") {
            line = rest.strip_suffix(b"\r").unwrap_or(rest);
        }
        Ok(Some(Value::String(
            String::from_utf8_lossy(line).into_owned(),
        )))
    }
}
