//! # flynn-openai
//!
//! Streaming completion client for the `OpenAI` and Azure `OpenAI` APIs.
//!
//! Issues chat/text completion requests with `stream: true` and turns the
//! resulting SSE stream into listener callbacks:
//!
//! - [`sse`] — line-level SSE parsing over the response byte stream
//! - [`stream`] — the decoder: per-kind delta extraction, accumulation,
//!   error classification, terminal-state discipline
//! - [`client`] — `OpenAI` / Azure façades, header and URL construction,
//!   the request loop with read-timeout retry
//!
//! Failures never escape to the caller as errors: every outcome of a
//! stream resolves to exactly one
//! [`on_complete`](flynn_core::CompletionEventListener::on_complete) or
//! [`on_error`](flynn_core::CompletionEventListener::on_error) callback.

#![deny(unsafe_code)]

pub mod client;
pub mod sse;
pub mod stream;

pub use client::{AzureClient, AzureConfig, ClientError, OpenAiClient, OpenAiConfig};
pub use stream::CompletionEventSource;
