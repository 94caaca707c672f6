//! Completion request DTOs and builders.
//!
//! Requests are immutable once built and are only constructed through their
//! builders. The builders accumulate field overrides on top of the shared
//! defaults and perform no validation beyond types — the server is the
//! authority on acceptable values.
//!
//! Wire shape (both kinds): `model`, `temperature`, `stream` (always
//! `true`), `max_tokens`, `frequency_penalty`, `presence_penalty`, plus
//! `messages` (chat) or `prompt`/`stop` (text). Caller-supplied additional
//! parameters are flattened into the same object.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::models::{ChatCompletionModel, CompletionModel, TextCompletionModel};

/// Default maximum output tokens.
pub const DEFAULT_MAX_TOKENS: u32 = 1000;
/// Default sampling temperature.
pub const DEFAULT_TEMPERATURE: f64 = 0.9;
/// Default frequency penalty.
pub const DEFAULT_FREQUENCY_PENALTY: f64 = 0.0;
/// Default presence penalty.
pub const DEFAULT_PRESENCE_PENALTY: f64 = 0.6;

/// Which completion endpoint a request targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CompletionKind {
    /// `/chat/completions` — role/content messages, `delta` stream frames.
    Chat,
    /// `/completions` — prompt string, `text` stream frames.
    Text,
}

impl CompletionKind {
    /// String label for this kind.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Chat => "chat",
            Self::Text => "text",
        }
    }
}

/// A completion request body the client can stream.
///
/// The polymorphic seam between request DTOs and the client: the kind picks
/// the endpoint path and the stream-frame extractor.
pub trait CompletionRequest: Serialize + Send + Sync {
    /// The completion kind this request targets.
    fn kind(&self) -> CompletionKind;
}

/// One role/content message in a chat conversation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    /// Message role (`"system"`, `"user"`, `"assistant"`).
    pub role: String,
    /// Message content.
    pub content: String,
}

impl ChatMessage {
    /// Message with an arbitrary role.
    #[must_use]
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }

    /// `"user"` message.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self::new("user", content)
    }

    /// `"system"` message.
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self::new("system", content)
    }

    /// `"assistant"` message.
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new("assistant", content)
    }
}

/// Streaming chat completion request.
#[derive(Clone, Debug, Serialize)]
pub struct ChatCompletionRequest {
    model: String,
    temperature: f64,
    stream: bool,
    max_tokens: u32,
    frequency_penalty: f64,
    presence_penalty: f64,
    messages: Vec<ChatMessage>,
    #[serde(flatten)]
    additional_params: Map<String, Value>,
}

impl ChatCompletionRequest {
    /// Start building a request for `model` over `messages`.
    #[must_use]
    pub fn builder(model: ChatCompletionModel, messages: Vec<ChatMessage>) -> ChatCompletionRequestBuilder {
        ChatCompletionRequestBuilder {
            model,
            messages,
            tunables: Tunables::default(),
        }
    }

    /// Model wire code.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Conversation messages, in order.
    #[must_use]
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Maximum output tokens.
    #[must_use]
    pub fn max_tokens(&self) -> u32 {
        self.max_tokens
    }

    /// Sampling temperature.
    #[must_use]
    pub fn temperature(&self) -> f64 {
        self.temperature
    }
}

impl CompletionRequest for ChatCompletionRequest {
    fn kind(&self) -> CompletionKind {
        CompletionKind::Chat
    }
}

/// Builder for [`ChatCompletionRequest`].
#[derive(Clone, Debug)]
pub struct ChatCompletionRequestBuilder {
    model: ChatCompletionModel,
    messages: Vec<ChatMessage>,
    tunables: Tunables,
}

impl ChatCompletionRequestBuilder {
    /// Override maximum output tokens.
    #[must_use]
    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.tunables.max_tokens = max_tokens;
        self
    }

    /// Override sampling temperature.
    #[must_use]
    pub fn temperature(mut self, temperature: f64) -> Self {
        self.tunables.temperature = temperature;
        self
    }

    /// Override frequency penalty.
    #[must_use]
    pub fn frequency_penalty(mut self, frequency_penalty: f64) -> Self {
        self.tunables.frequency_penalty = frequency_penalty;
        self
    }

    /// Override presence penalty.
    #[must_use]
    pub fn presence_penalty(mut self, presence_penalty: f64) -> Self {
        self.tunables.presence_penalty = presence_penalty;
        self
    }

    /// Add one provider-specific parameter to the request body.
    ///
    /// Keys are unique; a later value for the same key wins.
    #[must_use]
    pub fn additional_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let _ = self.tunables.additional_params.insert(key.into(), value.into());
        self
    }

    /// Build the immutable request.
    #[must_use]
    pub fn build(self) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: self.model.code().to_string(),
            temperature: self.tunables.temperature,
            stream: true,
            max_tokens: self.tunables.max_tokens,
            frequency_penalty: self.tunables.frequency_penalty,
            presence_penalty: self.tunables.presence_penalty,
            messages: self.messages,
            additional_params: self.tunables.additional_params,
        }
    }
}

/// Streaming text completion request.
#[derive(Clone, Debug, Serialize)]
pub struct TextCompletionRequest {
    model: String,
    prompt: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    stop: Vec<String>,
    temperature: f64,
    stream: bool,
    max_tokens: u32,
    frequency_penalty: f64,
    presence_penalty: f64,
    #[serde(flatten)]
    additional_params: Map<String, Value>,
}

impl TextCompletionRequest {
    /// Start building a request for `model` over `prompt`.
    #[must_use]
    pub fn builder(model: TextCompletionModel, prompt: impl Into<String>) -> TextCompletionRequestBuilder {
        TextCompletionRequestBuilder {
            model,
            prompt: prompt.into(),
            stop: Vec::new(),
            tunables: Tunables::default(),
        }
    }

    /// Model wire code.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// The prompt.
    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// Stop sequences, in order.
    #[must_use]
    pub fn stop(&self) -> &[String] {
        &self.stop
    }
}

impl CompletionRequest for TextCompletionRequest {
    fn kind(&self) -> CompletionKind {
        CompletionKind::Text
    }
}

/// Builder for [`TextCompletionRequest`].
#[derive(Clone, Debug)]
pub struct TextCompletionRequestBuilder {
    model: TextCompletionModel,
    prompt: String,
    stop: Vec<String>,
    tunables: Tunables,
}

impl TextCompletionRequestBuilder {
    /// Set the stop sequences.
    #[must_use]
    pub fn stop(mut self, stop: Vec<String>) -> Self {
        self.stop = stop;
        self
    }

    /// Override maximum output tokens.
    #[must_use]
    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.tunables.max_tokens = max_tokens;
        self
    }

    /// Override sampling temperature.
    #[must_use]
    pub fn temperature(mut self, temperature: f64) -> Self {
        self.tunables.temperature = temperature;
        self
    }

    /// Override frequency penalty.
    #[must_use]
    pub fn frequency_penalty(mut self, frequency_penalty: f64) -> Self {
        self.tunables.frequency_penalty = frequency_penalty;
        self
    }

    /// Override presence penalty.
    #[must_use]
    pub fn presence_penalty(mut self, presence_penalty: f64) -> Self {
        self.tunables.presence_penalty = presence_penalty;
        self
    }

    /// Add one provider-specific parameter to the request body.
    #[must_use]
    pub fn additional_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let _ = self.tunables.additional_params.insert(key.into(), value.into());
        self
    }

    /// Build the immutable request.
    #[must_use]
    pub fn build(self) -> TextCompletionRequest {
        TextCompletionRequest {
            model: self.model.code().to_string(),
            prompt: self.prompt,
            stop: self.stop,
            temperature: self.tunables.temperature,
            stream: true,
            max_tokens: self.tunables.max_tokens,
            frequency_penalty: self.tunables.frequency_penalty,
            presence_penalty: self.tunables.presence_penalty,
            additional_params: self.tunables.additional_params,
        }
    }
}

/// Tunables shared by both request kinds, seeded with the defaults.
#[derive(Clone, Debug)]
struct Tunables {
    max_tokens: u32,
    temperature: f64,
    frequency_penalty: f64,
    presence_penalty: f64,
    additional_params: Map<String, Value>,
}

impl Default for Tunables {
    fn default() -> Self {
        Self {
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            frequency_penalty: DEFAULT_FREQUENCY_PENALTY,
            presence_penalty: DEFAULT_PRESENCE_PENALTY,
            additional_params: Map::new(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
