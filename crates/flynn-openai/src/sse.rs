//! Server-Sent Events parsing over the response byte stream.
//!
//! Handles:
//! - Line buffering from chunked responses (frames may split mid-line)
//! - `data:` prefix extraction, comment and non-data field skipping
//! - CRLF line endings
//!
//! Two behaviors matter to the decoder downstream:
//! - the `[DONE]` sentinel is yielded like any other payload — the decoder
//!   owns the terminal transition;
//! - transport read errors are yielded, not swallowed, so the client can
//!   classify read-timeouts and retry.

use bytes::{Bytes, BytesMut};
use futures::Stream;
use tokio_stream::StreamExt;

/// Parse SSE lines from a byte stream and yield `data` payload strings.
///
/// Yields one item per `data` line; a transport error terminates the
/// stream after the error item. When the byte stream ends with a partial
/// line still buffered, that line is drained as a final frame.
pub fn parse_sse_lines<S>(byte_stream: S) -> impl Stream<Item = Result<String, reqwest::Error>> + Send
where
    S: Stream<Item = Result<Bytes, reqwest::Error>> + Send + Unpin + 'static,
{
    futures::stream::unfold(
        (byte_stream, BytesMut::with_capacity(8192), false),
        move |(mut stream, mut buffer, done)| async move {
            if done {
                return None;
            }

            loop {
                // Check buffer for a complete line (\n)
                if let Some(newline_pos) = buffer.iter().position(|&b| b == b'\n') {
                    let mut line_bytes = buffer.split_to(newline_pos + 1);
                    line_bytes.truncate(line_bytes.len() - 1);
                    if line_bytes.last() == Some(&b'\r') {
                        line_bytes.truncate(line_bytes.len() - 1);
                    }

                    let line = match std::str::from_utf8(&line_bytes) {
                        Ok(s) => s,
                        Err(_) => continue, // skip invalid UTF-8 lines
                    };

                    if let Some(data) = extract_sse_data(line) {
                        return Some((Ok(data), (stream, buffer, false)));
                    }
                    continue;
                }

                match stream.next().await {
                    Some(Ok(chunk)) => {
                        buffer.extend_from_slice(&chunk);
                    }
                    Some(Err(e)) => {
                        return Some((Err(e), (stream, buffer, true)));
                    }
                    None => {
                        // Stream ended — drain a trailing line with no newline
                        if !buffer.is_empty() {
                            let data = std::str::from_utf8(&buffer)
                                .ok()
                                .and_then(|line| extract_sse_data(line.trim()));
                            if let Some(data) = data {
                                buffer.clear();
                                return Some((Ok(data), (stream, buffer, true)));
                            }
                        }
                        return None;
                    }
                }
            }
        },
    )
}

/// Extract the data payload from one SSE line.
///
/// Returns `None` for comments, blank lines, non-data fields, and empty
/// data. The `[DONE]` sentinel is returned as-is.
fn extract_sse_data(line: &str) -> Option<String> {
    let trimmed = line.trim();

    if trimmed.is_empty() || trimmed.starts_with(':') {
        return None;
    }

    let data = trimmed.strip_prefix("data: ").or_else(|| trimmed.strip_prefix("data:"))?;
    let data = data.trim();

    if data.is_empty() {
        return None;
    }

    Some(data.to_string())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
