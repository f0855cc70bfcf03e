//! Outbound HTTP transport.
//!
//! Every call resolves to the parsed JSON body or an [`ApiError`] that records how far the
//! request got. Requests can be cancelled as a group through the transport's token.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{COOKIE, HeaderName, HeaderValue};
use reqwest::{Client, Method, Response, StatusCode, Url};
use serde_json::Value;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::debug;

pub const DEFAULT_CSRF_COOKIE_NAME: &str = "csrftoken";
pub const DEFAULT_CSRF_HEADER_NAME: &str = "X-CSRFToken";

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ApiError {
    /// The server answered with a non-2xx status.
    #[error("server responded with status {status}: {message}")]
    Server {
        status: u16,
        message: String,
        payload: Option<Value>,
    },
    /// The request went out but no response came back.
    #[error("no response received: {message}")]
    NoResponse { message: String },
    /// The request could not be built or sent.
    #[error("request could not be sent: {message}")]
    Request { message: String },
    /// A 2xx response carried a body of the wrong shape.
    #[error("unexpected response body: {message}")]
    Decode { message: String },
    #[error("request cancelled")]
    Cancelled,
}

impl ApiError {
    pub fn request(message: impl Into<String>) -> Self {
        Self::Request {
            message: message.into(),
        }
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Server { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Alert text shown at the point of the failed action. Cancellation has none.
    pub fn user_message(&self) -> Option<String> {
        match self {
            Self::Server { message, .. } => Some(format!("Server responded. Error: {message}")),
            Self::NoResponse { message } => Some(format!(
                "No response received from the server. Error: {message}"
            )),
            Self::Request { message } | Self::Decode { message } => {
                Some(format!("Request error: {message}"))
            }
            Self::Cancelled => None,
        }
    }

    fn from_reqwest(err: &reqwest::Error) -> Self {
        if err.is_builder() {
            Self::request(err.to_string())
        } else {
            Self::NoResponse {
                message: err.to_string(),
            }
        }
    }

    fn from_error_response(status: StatusCode, body: &[u8]) -> Self {
        let payload = serde_json::from_slice::<Value>(body).ok();
        let message = payload
            .as_ref()
            .and_then(error_message)
            .or_else(|| {
                let text = String::from_utf8_lossy(body).trim().to_string();
                (!text.is_empty() && payload.is_none()).then_some(text)
            })
            .unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("unknown error")
                    .to_string()
            });

        Self::Server {
            status: status.as_u16(),
            message,
            payload,
        }
    }
}

fn error_message(payload: &Value) -> Option<String> {
    ["error", "errors"].iter().find_map(|field| match payload.get(field)? {
        Value::String(message) => Some(message.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    })
}

/// Async request/response seam between the feed core and the network.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, ApiError>;

    /// Cancels the transport's in-flight and future requests.
    fn abort(&self) {}
}

/// Connection parameters for [`HttpTransport`].
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub base_url: String,
    /// Raw `Cookie` header value forwarded with every request.
    pub cookie: Option<String>,
    pub csrf_cookie_name: String,
    pub csrf_header_name: String,
    pub connect_timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_string(),
            cookie: None,
            csrf_cookie_name: DEFAULT_CSRF_COOKIE_NAME.to_string(),
            csrf_header_name: DEFAULT_CSRF_HEADER_NAME.to_string(),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

/// reqwest-backed transport. Clones share the client and the cancellation token; `child`
/// derives a transport that can be aborted on its own.
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: Client,
    base: Url,
    cookie: Option<HeaderValue>,
    csrf: Option<(HeaderName, HeaderValue)>,
    cancel: CancellationToken,
}

impl HttpTransport {
    pub fn new(config: &TransportConfig) -> Result<Self, ApiError> {
        let base = Url::parse(&config.base_url)
            .and_then(|url| url.join("/"))
            .map_err(|err| ApiError::request(format!("invalid base URL: {err}")))?;
        let client = Client::builder()
            .user_agent(Self::user_agent())
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|err| ApiError::from_reqwest(&err))?;

        let cookie = config
            .cookie
            .as_deref()
            .map(HeaderValue::from_str)
            .transpose()
            .map_err(|err| ApiError::request(format!("invalid cookie header: {err}")))?;

        let csrf = match config
            .cookie
            .as_deref()
            .and_then(|cookie| cookie_value(cookie, &config.csrf_cookie_name))
        {
            Some(token) => {
                let name = HeaderName::from_bytes(config.csrf_header_name.as_bytes())
                    .map_err(|err| ApiError::request(format!("invalid CSRF header name: {err}")))?;
                let value = HeaderValue::from_str(token)
                    .map_err(|err| ApiError::request(format!("invalid CSRF token: {err}")))?;
                Some((name, value))
            }
            None => {
                debug!(
                    cookie_name = %config.csrf_cookie_name,
                    "No CSRF cookie configured; requests will be sent without the token header"
                );
                None
            }
        };

        Ok(Self {
            client,
            base,
            cookie,
            csrf,
            cancel: CancellationToken::new(),
        })
    }

    pub fn user_agent() -> &'static str {
        concat!("netfeed/", env!("CARGO_PKG_VERSION"))
    }

    pub fn url(&self, path: &str) -> Result<Url, ApiError> {
        self.base
            .join(path)
            .map_err(|err| ApiError::request(format!("invalid path `{path}`: {err}")))
    }

    /// Transport sharing this one's client, cancelled when either it or this transport is.
    #[must_use]
    pub fn child(&self) -> Self {
        Self {
            cancel: self.cancel.child_token(),
            ..self.clone()
        }
    }

    pub fn is_aborted(&self) -> bool {
        self.cancel.is_cancelled()
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, ApiError> {
        let url = self.url(path)?;
        let mut req = self.client.request(method, url);
        if let Some(cookie) = &self.cookie {
            req = req.header(COOKIE, cookie.clone());
        }
        if let Some((name, value)) = &self.csrf {
            req = req.header(name.clone(), value.clone());
        }
        if let Some(body) = body {
            req = req.json(&body);
        }

        let resp = req.send().await.map_err(|err| ApiError::from_reqwest(&err))?;
        Self::handle(resp).await
    }

    async fn handle(resp: Response) -> Result<Value, ApiError> {
        let status = resp.status();
        let bytes = resp.bytes().await.map_err(|err| ApiError::from_reqwest(&err))?;
        if !status.is_success() {
            return Err(ApiError::from_error_response(status, &bytes));
        }
        if bytes.is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_slice(&bytes)
            .map_err(|err| ApiError::decode(format!("failed to parse body: {err}")))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, ApiError> {
        debug!(%method, path, "Sending API request");
        tokio::select! {
            () = self.cancel.cancelled() => {
                debug!(path, "API request cancelled");
                Err(ApiError::Cancelled)
            }
            result = self.send(method, path, body) => result,
        }
    }

    fn abort(&self) {
        self.cancel.cancel();
    }
}

/// Looks up a cookie by name in a raw `Cookie` header value.
pub fn cookie_value<'a>(cookie: &'a str, name: &str) -> Option<&'a str> {
    cookie
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim())
        .filter(|value| !value.is_empty())
}
