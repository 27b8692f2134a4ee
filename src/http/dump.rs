//! Raw wire dumps for `--log-http`
//!
//! Each attempt renders its request and response into one buffer which
//! is then written to the sink in a single locked write.

use super::client::RawResponse;
use crate::error::{Error, Result};
use reqwest::header::HeaderMap;
use reqwest::{Request, Version};
use std::io::Write;
use std::sync::Mutex;

/// Mutex-guarded destination for wire dumps
pub struct WireSink {
    writer: Mutex<Box<dyn Write + Send>>,
}

impl WireSink {
    /// Create a sink over any writer
    pub fn new(writer: Box<dyn Write + Send>) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    /// Sink writing to stderr
    pub fn stderr() -> Self {
        Self::new(Box::new(std::io::stderr()))
    }

    /// Write one attempt's buffer atomically with respect to other attempts
    pub fn flush_exchange(&self, buf: &[u8]) -> Result<()> {
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| Error::output("wire sink lock poisoned"))?;
        writer.write_all(buf)?;
        writer.flush()?;
        Ok(())
    }
}

impl std::fmt::Debug for WireSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WireSink").finish_non_exhaustive()
    }
}

/// Render a request in HTTP/1.1 text form
pub fn dump_request(request: &Request, buf: &mut Vec<u8>) {
    let url = request.url();
    let mut target = url.path().to_string();
    if let Some(query) = url.query() {
        target.push('?');
        target.push_str(query);
    }

    let _ = write!(buf, "{} {} HTTP/1.1\r\n", request.method(), target);
    if let Some(host) = url.host_str() {
        match url.port() {
            Some(port) => {
                let _ = write!(buf, "Host: {host}:{port}\r\n");
            }
            None => {
                let _ = write!(buf, "Host: {host}\r\n");
            }
        }
    }
    write_headers(request.headers(), buf);
    buf.extend_from_slice(b"\r\n");
}

/// Render a response in HTTP/1.1 text form, body included
pub fn dump_response(response: &RawResponse, buf: &mut Vec<u8>) {
    let _ = write!(
        buf,
        "{} {}\r\n",
        version_str(response.version),
        response.status
    );
    write_headers(&response.headers, buf);
    buf.extend_from_slice(b"\r\n");
    buf.extend_from_slice(&response.body);
    if !response.body.ends_with(b"\n") {
        buf.push(b'\n');
    }
}

fn write_headers(headers: &HeaderMap, buf: &mut Vec<u8>) {
    for (name, value) in headers {
        let shown = if value.is_sensitive() {
            "<redacted>"
        } else {
            value.to_str().unwrap_or("<binary>")
        };
        let _ = write!(buf, "{name}: {shown}\r\n");
    }
}

fn version_str(version: Version) -> &'static str {
    match version {
        Version::HTTP_09 => "HTTP/0.9",
        Version::HTTP_10 => "HTTP/1.0",
        Version::HTTP_2 => "HTTP/2.0",
        Version::HTTP_3 => "HTTP/3.0",
        _ => "HTTP/1.1",
    }
}
