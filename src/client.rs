use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Client as ReqwestClient, Response};
use tracing::{debug, warn};
use url::Url;

use crate::client_logger::ClientLogger;
use crate::error::{Error, Result};
use crate::observability::{CLIENT_REQUESTS, CLIENT_REQUEST_DURATION, CLIENT_REQUEST_ERRORS};
use crate::types::{ChatRequest, ChatResponse, ErrorResponse};

/// Path of the chat endpoint, relative to the gateway root.
pub const CHAT_ENDPOINT: &str = "api/claude";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Anything that can turn a [`ChatRequest`] into a [`ChatResponse`].
///
/// [`RemoteChatClient`] is the production implementation; the session
/// controller is generic over this trait so it can be driven without a
/// network.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Perform exactly one call.  Implementations do not retry.
    async fn send(&self, request: &ChatRequest) -> Result<ChatResponse>;
}

#[async_trait]
impl<B: ChatBackend + ?Sized> ChatBackend for Arc<B> {
    async fn send(&self, request: &ChatRequest) -> Result<ChatResponse> {
        (**self).send(request).await
    }
}

/// Client for the gateway's chat endpoint.
#[derive(Clone)]
pub struct RemoteChatClient {
    client: ReqwestClient,
    gateway: Url,
    endpoint: Url,
    timeout: Duration,
    logger: Option<Arc<dyn ClientLogger>>,
}

impl RemoteChatClient {
    /// Create a client for the gateway rooted at `gateway`.
    pub fn new(gateway: &str) -> Result<Self> {
        Self::with_options(gateway, None)
    }

    /// Create a client with a custom request timeout.
    pub fn with_options(gateway: &str, timeout: Option<Duration>) -> Result<Self> {
        let gateway = gateway_root(gateway)?;
        let endpoint = gateway.join(CHAT_ENDPOINT)?;
        let timeout = timeout.unwrap_or(DEFAULT_TIMEOUT);
        let client = build_http_client(timeout)?;
        Ok(Self {
            client,
            gateway,
            endpoint,
            timeout,
            logger: None,
        })
    }

    /// Install a logger that observes every request, response, and failure.
    pub fn with_logger(mut self, logger: Arc<dyn ClientLogger>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// The gateway root all endpoints are resolved against.
    pub fn gateway(&self) -> &Url {
        &self.gateway
    }

    /// The full URL of the chat endpoint.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// The underlying HTTP client, shared with other gateway collaborators.
    pub(crate) fn http(&self) -> &ReqwestClient {
        &self.client
    }

    async fn send_once(&self, request: &ChatRequest) -> Result<ChatResponse> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .headers(default_headers())
            .json(request)
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            return Err(process_error_response(response).await);
        }

        let body = response.text().await.map_err(transport_error)?;
        let decoded: ChatResponse = serde_json::from_str(&body).map_err(|e| {
            Error::unexpected_response(format!("Failed to parse response: {}", e))
        })?;
        decoded.reply()?;
        Ok(decoded)
    }
}

#[async_trait]
impl ChatBackend for RemoteChatClient {
    async fn send(&self, request: &ChatRequest) -> Result<ChatResponse> {
        CLIENT_REQUESTS.click();
        if let Some(logger) = &self.logger {
            logger.log_request(&request.redacted());
        }
        debug!(
            endpoint = %self.endpoint,
            model = %request.model,
            messages = request.messages.len(),
            "sending chat request"
        );

        let start = Instant::now();
        let result = self.send_once(request).await;
        CLIENT_REQUEST_DURATION.add(start.elapsed().as_secs_f64());

        match &result {
            Ok(response) => {
                debug!(
                    blocks = response.content.len(),
                    stop_reason = response.stop_reason.as_deref().unwrap_or(""),
                    "chat request succeeded"
                );
                if let Some(logger) = &self.logger {
                    logger.log_response(response);
                }
            }
            Err(err) => {
                CLIENT_REQUEST_ERRORS.click();
                warn!(status = ?err.status_code(), error = %err, "chat request failed");
                if let Some(logger) = &self.logger {
                    logger.log_error(err);
                }
            }
        }
        result
    }
}

impl std::fmt::Debug for RemoteChatClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteChatClient")
            .field("endpoint", &self.endpoint.as_str())
            .field("timeout", &self.timeout)
            .field("logger", &self.logger.is_some())
            .finish()
    }
}

/// Parse a gateway URL and make sure relative endpoints join beneath it.
pub(crate) fn gateway_root(gateway: &str) -> Result<Url> {
    let mut url = Url::parse(gateway)?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

pub(crate) fn build_http_client(timeout: Duration) -> Result<ReqwestClient> {
    ReqwestClient::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| {
            Error::http_client(
                format!("Failed to build HTTP client: {}", e),
                Some(Box::new(e)),
            )
        })
}

fn default_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
    headers
}

/// Map a failure to reach the gateway onto the transport variants.
pub(crate) fn transport_error(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::timeout(format!("Request timed out: {}", e))
    } else if e.is_connect() {
        Error::connection(format!("Connection error: {}", e), Some(Box::new(e)))
    } else {
        Error::http_client(format!("Request failed: {}", e), Some(Box::new(e)))
    }
}

/// Turn a non-success response into an [`Error`].
///
/// The body is decoded best-effort; a body that cannot be read or is not
/// the expected JSON still yields an error carrying the status code.
pub(crate) async fn process_error_response(response: Response) -> Error {
    let status_code = response.status().as_u16();

    let retry_after = response
        .headers()
        .get("retry-after")
        .and_then(|val| val.to_str().ok())
        .and_then(|val| val.parse::<u64>().ok());

    let error_body = match response.text().await {
        Ok(body) => body,
        Err(e) => {
            warn!(status = status_code, error = %e, "could not read error body");
            String::new()
        }
    };

    let parsed = ErrorResponse::parse_lenient(&error_body);
    let error_type = parsed.error_type().map(String::from);
    let error_message = parsed
        .message()
        .map(String::from)
        .unwrap_or_else(|| format!("HTTP error! status: {}", status_code));

    match status_code {
        400 => Error::bad_request(error_message),
        401 => Error::authentication(error_message),
        429 => Error::rate_limit(error_message, retry_after),
        500..=599 => Error::internal_server(status_code, error_message),
        _ => Error::api(status_code, error_type, error_message),
    }
}
