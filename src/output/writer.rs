//! Result writer
//!
//! Provides the mutex-guarded JSON / YAML encoder for result records.

use crate::error::{Error, Result};
use crate::types::{OutputFormat, SeedOutput};
use std::io::Write;
use std::sync::Mutex;

struct EmitterState {
    writer: Box<dyn Write + Send>,
    written: u64,
}

/// Serializes results to the output stream under mutual exclusion
pub struct ResultEmitter {
    format: OutputFormat,
    state: Mutex<EmitterState>,
}

impl ResultEmitter {
    /// Create an emitter over any writer
    pub fn new(format: OutputFormat, writer: Box<dyn Write + Send>) -> Self {
        Self {
            format,
            state: Mutex::new(EmitterState { writer, written: 0 }),
        }
    }

    /// Encode and write one record
    ///
    /// Records appear in call order, which for concurrent workers is
    /// completion order.
    pub fn emit(&self, output: &SeedOutput) -> Result<()> {
        let encoded = self.encode(output)?;

        let mut state = self
            .state
            .lock()
            .map_err(|_| Error::output("output lock poisoned"))?;

        if self.format == OutputFormat::Yaml && state.written > 0 {
            state.writer.write_all(b"---\n")?;
        }
        state.writer.write_all(&encoded)?;
        state.writer.flush()?;
        state.written += 1;
        Ok(())
    }

    /// Number of records written so far
    pub fn written(&self) -> u64 {
        self.state.lock().map(|s| s.written).unwrap_or(0)
    }

    fn encode(&self, output: &SeedOutput) -> Result<Vec<u8>> {
        match self.format {
            OutputFormat::Json => {
                let mut buf = serde_json::to_vec(output)?;
                buf.push(b'\n');
                Ok(buf)
            }
            OutputFormat::Yaml => Ok(serde_yaml::to_string(output)?.into_bytes()),
        }
    }
}

impl std::fmt::Debug for ResultEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultEmitter")
            .field("format", &self.format)
            .field("written", &self.written())
            .finish_non_exhaustive()
    }
}
