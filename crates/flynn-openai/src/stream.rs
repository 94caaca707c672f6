//! Streaming response decoder.
//!
//! [`CompletionEventSource`] consumes the SSE frames of one logical
//! completion request and drives the caller's
//! [`CompletionEventListener`]:
//!
//! ```text
//! STREAMING ─ fragment ──────────▶ STREAMING   (on_message)
//! STREAMING ─ "[DONE]" ──────────▶ COMPLETE    (on_complete, exactly once)
//! STREAMING ─ malformed/non-2xx ─▶ FAILED      (on_error, at most once)
//! STREAMING ─ read-timeout ──────▶ STREAMING   (client reissues, buffer kept)
//! ```
//!
//! `COMPLETE` and `FAILED` are terminal: every later event is swallowed.
//! One instance serves one logical request; automatic read-timeout retries
//! reuse the same instance so the accumulated text and the listener's view
//! stay consistent across attempts.

use serde::Deserialize;
use tracing::warn;

use flynn_core::error::{ErrorDetails, parse_error_details};
use flynn_core::listener::CompletionEventListener;
use flynn_core::request::CompletionKind;

/// Stream-termination sentinel frame body.
pub const DONE_SENTINEL: &str = "[DONE]";

// ─────────────────────────────────────────────────────────────────────────────
// Frame payloads
// ─────────────────────────────────────────────────────────────────────────────

/// One chat completion delta frame: `{"choices":[{"delta":{...}}]}`.
#[derive(Debug, Deserialize)]
struct ChatCompletionChunk {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    #[serde(default)]
    delta: Option<ChatDelta>,
}

#[derive(Debug, Deserialize)]
struct ChatDelta {
    #[serde(default)]
    content: Option<String>,
}

/// One text completion frame: `{"choices":[{"text":"..."}]}`.
#[derive(Debug, Deserialize)]
struct TextCompletionChunk {
    #[serde(default)]
    choices: Vec<TextChoice>,
}

#[derive(Debug, Deserialize)]
struct TextChoice {
    #[serde(default)]
    text: Option<String>,
}

/// Extract the incremental text fragment from one decoded frame.
///
/// `Ok(None)` means the frame carries no fragment and the message callback
/// is skipped entirely. The two kinds differ deliberately:
/// - Chat: no first choice → `None`; a present `delta` without `content`
///   (or a missing `delta`) → an empty fragment, still dispatched.
/// - Text: always a fragment — the first choice's `text`, or empty when
///   the choice or field is absent.
fn extract_fragment(kind: CompletionKind, data: &str) -> Result<Option<String>, serde_json::Error> {
    match kind {
        CompletionKind::Chat => {
            let chunk: ChatCompletionChunk = serde_json::from_str(data)?;
            Ok(chunk.choices.into_iter().next().map(|choice| {
                choice
                    .delta
                    .and_then(|delta| delta.content)
                    .unwrap_or_default()
            }))
        }
        CompletionKind::Text => {
            let chunk: TextCompletionChunk = serde_json::from_str(data)?;
            Ok(Some(
                chunk
                    .choices
                    .into_iter()
                    .next()
                    .and_then(|choice| choice.text)
                    .unwrap_or_default(),
            ))
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Decoder
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum StreamState {
    Streaming,
    Complete,
    Failed,
}

/// Decoder bound to one logical request and its listener.
pub struct CompletionEventSource<'a> {
    kind: CompletionKind,
    listener: &'a mut dyn CompletionEventListener,
    message_builder: String,
    state: StreamState,
}

impl<'a> CompletionEventSource<'a> {
    /// Bind a decoder to `listener` for one logical request of `kind`.
    pub fn new(kind: CompletionKind, listener: &'a mut dyn CompletionEventListener) -> Self {
        Self {
            kind,
            listener,
            message_builder: String::new(),
            state: StreamState::Streaming,
        }
    }

    /// Whether a terminal callback has fired.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.state != StreamState::Streaming
    }

    /// Text accumulated so far.
    #[must_use]
    pub fn accumulated(&self) -> &str {
        &self.message_builder
    }

    /// Process one SSE frame body.
    pub fn handle_data(&mut self, data: &str) {
        if self.is_terminal() {
            return;
        }

        if data == DONE_SENTINEL {
            self.state = StreamState::Complete;
            self.listener.on_complete(&self.message_builder);
            return;
        }

        match extract_fragment(self.kind, data) {
            Ok(Some(fragment)) => {
                self.message_builder.push_str(&fragment);
                self.listener.on_message(&fragment);
            }
            Ok(None) => {}
            Err(e) => {
                warn!(error = %e, frame_len = data.len(), "Undecodable stream frame");
                self.fail(parse_error_details(data));
            }
        }
    }

    /// Process a non-2xx response body received instead of a stream.
    pub fn handle_error_response(&mut self, body: &str) {
        if self.is_terminal() {
            return;
        }
        self.fail(parse_error_details(body));
    }

    /// Process a terminal transport failure.
    pub fn handle_transport_failure(&mut self, message: &str) {
        if self.is_terminal() {
            return;
        }
        let details = if message.is_empty() {
            ErrorDetails::default_error()
        } else {
            ErrorDetails::from_message(message)
        };
        self.fail(details);
    }

    fn fail(&mut self, details: ErrorDetails) {
        self.state = StreamState::Failed;
        self.listener.on_error(&details);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
