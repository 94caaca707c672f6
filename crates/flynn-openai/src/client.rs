//! `OpenAI` and Azure `OpenAI` client façades.
//!
//! A client binds credentials and endpoint layout to the HTTP transport and
//! wires the streaming decoder into the call. [`stream_completion`] never
//! returns an error: every outcome — success, API error, malformed frame,
//! transport failure — resolves through the listener (see
//! [`CompletionEventSource`]).
//!
//! Read-timeouts are the one retryable failure. With
//! [`RetryPolicy::retry_on_read_timeout`] set, a timed-out attempt reissues
//! the same body and headers as a new stream, reusing the decoder so the
//! accumulated text carries across attempts. An optional retry hook
//! observes each reissue with the serialized request body, for
//! logging/metrics.
//!
//! [`stream_completion`]: OpenAiClient::stream_completion

use std::pin::pin;
use std::time::Duration;

use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde_json::Value;
use tokio_stream::StreamExt;
use tracing::{debug, info, warn};

use flynn_core::listener::CompletionEventListener;
use flynn_core::request::{CompletionKind, CompletionRequest};
use flynn_core::retry::RetryPolicy;

use crate::sse::parse_sse_lines;
use crate::stream::CompletionEventSource;

/// Default `OpenAI` API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";

/// Default connect timeout.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default read timeout between stream chunks.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Azure Active Directory authentication uses a Bearer token; plain Azure
/// API keys travel in this header instead.
const AZURE_API_KEY_HEADER: &str = "Api-key";

/// Hook observing each automatic retry, with the serialized request body.
pub type RetryHook = Box<dyn Fn(&str) + Send + Sync>;

/// Errors constructing a client.
///
/// Streaming itself never surfaces errors here — the listener contract is
/// the sole failure channel once a request is issued.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// HTTP client construction failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// A credential produced an invalid header value.
    #[error("invalid header value: {0}")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),
}

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Configuration for [`OpenAiClient`].
#[derive(Clone, Debug)]
pub struct OpenAiConfig {
    /// API key sent as a Bearer token.
    pub api_key: String,
    /// Optional organization ID (`OpenAI-Organization` header).
    pub organization: Option<String>,
    /// Base URL override; defaults to [`DEFAULT_BASE_URL`].
    pub base_url: Option<String>,
    /// Connect timeout.
    pub connect_timeout: Duration,
    /// Read timeout between stream chunks.
    pub read_timeout: Duration,
    /// Read-timeout retry policy.
    pub retry: RetryPolicy,
}

impl OpenAiConfig {
    /// Config with defaults for everything but the key.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            organization: None,
            base_url: None,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            read_timeout: DEFAULT_READ_TIMEOUT,
            retry: RetryPolicy::default(),
        }
    }
}

/// Configuration for [`AzureClient`].
#[derive(Clone, Debug)]
pub struct AzureConfig {
    /// API key; sent as `Api-key`, or as a Bearer token with
    /// `active_directory_auth`.
    pub api_key: String,
    /// Azure resource name (picks the default host).
    pub resource: String,
    /// Deployment ID in the request path.
    pub deployment: String,
    /// `api-version` query parameter.
    pub api_version: String,
    /// Authenticate with Active Directory Bearer tokens instead of the
    /// `Api-key` header.
    pub active_directory_auth: bool,
    /// Base URL override; defaults to `https://{resource}.openai.azure.com`.
    pub base_url: Option<String>,
    /// Connect timeout.
    pub connect_timeout: Duration,
    /// Read timeout between stream chunks.
    pub read_timeout: Duration,
    /// Read-timeout retry policy.
    pub retry: RetryPolicy,
}

impl AzureConfig {
    /// Config with defaults for everything but the resource coordinates.
    #[must_use]
    pub fn new(
        api_key: impl Into<String>,
        resource: impl Into<String>,
        deployment: impl Into<String>,
        api_version: impl Into<String>,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            resource: resource.into(),
            deployment: deployment.into(),
            api_version: api_version.into(),
            active_directory_auth: false,
            base_url: None,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            read_timeout: DEFAULT_READ_TIMEOUT,
            retry: RetryPolicy::default(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// URL / header construction
// ─────────────────────────────────────────────────────────────────────────────

/// Endpoint path segment for a completion kind.
fn endpoint_path(kind: CompletionKind) -> &'static str {
    match kind {
        CompletionKind::Chat => "chat/completions",
        CompletionKind::Text => "completions",
    }
}

/// `{base}/v1/{path}`
fn openai_url(base_url: &str, kind: CompletionKind) -> String {
    format!("{}/v1/{}", base_url.trim_end_matches('/'), endpoint_path(kind))
}

/// `{base}/openai/deployments/{deployment}/{path}?api-version={version}`
fn azure_url(base_url: &str, deployment: &str, api_version: &str, kind: CompletionKind) -> String {
    format!(
        "{}/openai/deployments/{}/{}?api-version={}",
        base_url.trim_end_matches('/'),
        deployment,
        endpoint_path(kind),
        api_version
    )
}

/// Headers shared by both façades.
fn base_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    let _ = headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    let _ = headers.insert(ACCEPT, HeaderValue::from_static("text/event-stream"));
    headers
}

fn openai_headers(config: &OpenAiConfig) -> Result<HeaderMap, ClientError> {
    let mut headers = base_headers();
    let _ = headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", config.api_key))?,
    );
    if let Some(organization) = &config.organization {
        let _ = headers.insert("OpenAI-Organization", HeaderValue::from_str(organization)?);
    }
    Ok(headers)
}

fn azure_headers(config: &AzureConfig) -> Result<HeaderMap, ClientError> {
    let mut headers = base_headers();
    if config.active_directory_auth {
        let _ = headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", config.api_key))?,
        );
    } else {
        let _ = headers.insert(AZURE_API_KEY_HEADER, HeaderValue::from_str(&config.api_key)?);
    }
    Ok(headers)
}

fn build_http_client(connect_timeout: Duration, read_timeout: Duration) -> Result<reqwest::Client, ClientError> {
    Ok(reqwest::Client::builder()
        .connect_timeout(connect_timeout)
        .read_timeout(read_timeout)
        .build()?)
}

// ─────────────────────────────────────────────────────────────────────────────
// Façades
// ─────────────────────────────────────────────────────────────────────────────

/// Client for the `OpenAI` completion endpoints.
pub struct OpenAiClient {
    http: reqwest::Client,
    headers: HeaderMap,
    base_url: String,
    retry: RetryPolicy,
    retry_hook: Option<RetryHook>,
}

impl OpenAiClient {
    /// Build a client from `config`.
    pub fn new(config: OpenAiConfig) -> Result<Self, ClientError> {
        let headers = openai_headers(&config)?;
        let http = build_http_client(config.connect_timeout, config.read_timeout)?;
        let base_url = config.base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        Ok(Self {
            http,
            headers,
            base_url,
            retry: config.retry,
            retry_hook: None,
        })
    }

    /// Observe each automatic read-timeout retry.
    #[must_use]
    pub fn on_retry(mut self, hook: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.retry_hook = Some(Box::new(hook));
        self
    }

    /// Stream `request`, driving `listener` until one terminal callback.
    pub async fn stream_completion<R, L>(&self, request: &R, listener: &mut L)
    where
        R: CompletionRequest,
        L: CompletionEventListener,
    {
        let url = openai_url(&self.base_url, request.kind());
        run_stream(
            &self.http,
            &url,
            &self.headers,
            request,
            self.retry,
            self.retry_hook.as_ref(),
            listener,
        )
        .await;
    }
}

/// Client for Azure `OpenAI` deployments.
pub struct AzureClient {
    http: reqwest::Client,
    headers: HeaderMap,
    base_url: String,
    deployment: String,
    api_version: String,
    retry: RetryPolicy,
    retry_hook: Option<RetryHook>,
}

impl AzureClient {
    /// Build a client from `config`.
    pub fn new(config: AzureConfig) -> Result<Self, ClientError> {
        let headers = azure_headers(&config)?;
        let http = build_http_client(config.connect_timeout, config.read_timeout)?;
        let base_url = config
            .base_url
            .unwrap_or_else(|| format!("https://{}.openai.azure.com", config.resource));
        Ok(Self {
            http,
            headers,
            base_url,
            deployment: config.deployment,
            api_version: config.api_version,
            retry: config.retry,
            retry_hook: None,
        })
    }

    /// Observe each automatic read-timeout retry.
    #[must_use]
    pub fn on_retry(mut self, hook: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.retry_hook = Some(Box::new(hook));
        self
    }

    /// Stream `request`, driving `listener` until one terminal callback.
    pub async fn stream_completion<R, L>(&self, request: &R, listener: &mut L)
    where
        R: CompletionRequest,
        L: CompletionEventListener,
    {
        let url = azure_url(&self.base_url, &self.deployment, &self.api_version, request.kind());
        run_stream(
            &self.http,
            &url,
            &self.headers,
            request,
            self.retry,
            self.retry_hook.as_ref(),
            listener,
        )
        .await;
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Request loop
// ─────────────────────────────────────────────────────────────────────────────

/// Outcome of one stream attempt.
enum AttemptOutcome {
    /// The decoder reached a terminal state (or the stream is unusable).
    Terminal,
    /// A read-timeout; the attempt may be reissued.
    ReadTimeout(String),
}

async fn run_stream<R>(
    http: &reqwest::Client,
    url: &str,
    headers: &HeaderMap,
    request: &R,
    retry: RetryPolicy,
    retry_hook: Option<&RetryHook>,
    listener: &mut dyn CompletionEventListener,
) where
    R: CompletionRequest,
{
    let kind = request.kind();
    let mut source = CompletionEventSource::new(kind, listener);

    let body: Value = match serde_json::to_value(request) {
        Ok(body) => body,
        Err(e) => {
            source.handle_transport_failure(&e.to_string());
            return;
        }
    };
    let body_text = body.to_string();

    let mut attempt = 0u32;
    loop {
        debug!(url, kind = kind.as_str(), attempt, "Starting completion stream");
        match attempt_stream(http, url, headers, &body, &mut source).await {
            AttemptOutcome::Terminal => return,
            AttemptOutcome::ReadTimeout(message) => {
                if retry.allows_retry(attempt) {
                    attempt += 1;
                    metrics::counter!("completion_read_timeout_retries_total").increment(1);
                    info!(attempt, "Read timeout, reissuing completion request");
                    if let Some(hook) = retry_hook {
                        hook(&body_text);
                    }
                    continue;
                }
                source.handle_transport_failure(&message);
                return;
            }
        }
    }
}

/// Issue one HTTP attempt and feed its frames into the decoder.
async fn attempt_stream(
    http: &reqwest::Client,
    url: &str,
    headers: &HeaderMap,
    body: &Value,
    source: &mut CompletionEventSource<'_>,
) -> AttemptOutcome {
    let response = match http.post(url).headers(headers.clone()).json(body).send().await {
        Ok(response) => response,
        Err(e) if e.is_timeout() => return AttemptOutcome::ReadTimeout(e.to_string()),
        Err(e) => {
            warn!(error = %e, "Completion request failed to send");
            source.handle_transport_failure(&e.to_string());
            return AttemptOutcome::Terminal;
        }
    };

    let status = response.status();
    if !status.is_success() {
        let body_text = response.text().await.unwrap_or_default();
        warn!(status = status.as_u16(), "Completion request rejected");
        source.handle_error_response(&body_text);
        return AttemptOutcome::Terminal;
    }

    let mut frames = pin!(parse_sse_lines(response.bytes_stream()));
    while let Some(frame) = frames.next().await {
        match frame {
            Ok(data) => {
                source.handle_data(&data);
                if source.is_terminal() {
                    return AttemptOutcome::Terminal;
                }
            }
            Err(e) if e.is_timeout() => return AttemptOutcome::ReadTimeout(e.to_string()),
            Err(e) => {
                warn!(error = %e, "Completion stream read failed");
                source.handle_transport_failure(&e.to_string());
                return AttemptOutcome::Terminal;
            }
        }
    }

    // Stream closed without the [DONE] sentinel.
    if !source.is_terminal() {
        warn!("Completion stream ended without terminal sentinel");
        source.handle_transport_failure("");
    }
    AttemptOutcome::Terminal
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
