//! # flynn-core
//!
//! Shared types for the completion client crates.
//!
//! Everything here is transport-free — no HTTP, no async:
//! - Request DTOs and builders for chat and text completions
//! - Model catalogs: `code -> { description, max_tokens }`
//! - Normalized API error details with envelope parsing and a fallback
//! - The [`CompletionEventListener`] capability callers implement
//! - Read-timeout retry policy

#![deny(unsafe_code)]

pub mod error;
pub mod listener;
pub mod models;
pub mod request;
pub mod retry;

pub use error::{DEFAULT_ERROR_MESSAGE, ErrorDetails, parse_error_details};
pub use listener::CompletionEventListener;
pub use models::{ChatCompletionModel, CompletionModel, TextCompletionModel};
pub use request::{
    ChatCompletionRequest, ChatMessage, CompletionKind, CompletionRequest, TextCompletionRequest,
};
pub use retry::RetryPolicy;
