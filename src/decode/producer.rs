//! Producer thread for input records
//!
//! Decoding reads blocking I/O (usually stdin), so it runs on a dedicated
//! OS thread and feeds records to the dispatcher over a bounded channel.

use super::types::InputDecoder;
use crate::error::Result;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, trace};

/// Start decoding on a new thread
///
/// The channel closes after end of input or after the first decode error,
/// which is delivered as the last item. Dropping the receiver stops the
/// thread at its next record.
pub fn spawn_input_thread(
    mut decoder: Box<dyn InputDecoder + Send>,
    capacity: usize,
) -> Result<mpsc::Receiver<Result<Value>>> {
    let (tx, rx) = mpsc::channel(capacity.max(1));

    std::thread::Builder::new()
        .name("listwalk-input".to_string())
        .spawn(move || {
            let mut records = 0u64;
            loop {
                let item = match decoder.next_record() {
                    Ok(Some(value)) => Ok(value),
                    Ok(None) => break,
                    Err(e) => Err(e),
                };
                let failed = item.is_err();
                if tx.blocking_send(item).is_err() {
                    trace!("input receiver dropped, stopping producer");
                    return;
                }
                if failed {
                    return;
                }
                records += 1;
            }
            debug!("input exhausted after {records} records");
        })?;

    Ok(rx)
}
