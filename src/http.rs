//! The HTTP capability a reliable request is built on.
//!
//! [`Connector`] hands out one [`HttpClient`] per request; the client lives
//! exactly as long as that request. The `reqwest` feature (on by default)
//! provides [`ReqwestConnector`].

use std::fmt;
use std::future::Future;
use std::time::Duration;

use bytes::Bytes;

use crate::retry::TransportError;

/// A fully read HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// The HTTP status code.
    pub status: u16,
    /// The complete response body.
    pub body: Bytes,
}

impl HttpResponse {
    /// Create a response.
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Returns true for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Why a GET produced no response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// The network failed; worth retrying.
    Transport(TransportError),
    /// The request could not even be built; retrying cannot help.
    InvalidRequest(String),
}

impl From<TransportError> for ClientError {
    fn from(err: TransportError) -> Self {
        Self::Transport(err)
    }
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(e) => write!(f, "{}", e),
            Self::InvalidRequest(msg) => write!(f, "invalid request: {}", msg),
        }
    }
}

impl std::error::Error for ClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Transport(e) => Some(e),
            Self::InvalidRequest(_) => None,
        }
    }
}

/// Failure to create an HTTP client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectError(pub String);

impl fmt::Display for ConnectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for ConnectError {}

/// Asynchronous HTTP GET.
///
/// Implementations read the whole body before resolving. They may honor
/// `timeout` themselves; the caller enforces it regardless.
pub trait HttpClient: Send + Sync {
    /// Issue a GET and read the response in full.
    fn get(
        &self,
        url: &str,
        timeout: Duration,
    ) -> impl Future<Output = Result<HttpResponse, ClientError>> + Send;
}

/// Produces the client used for the duration of one request.
pub trait Connector: Send + Sync {
    /// The client type handed out.
    type Client: HttpClient;

    /// Create a client. Dropping it releases its connections.
    fn connect(&self) -> Result<Self::Client, ConnectError>;
}

#[cfg(feature = "reqwest")]
mod reqwest_impl {
    use super::*;

    /// Connector building a fresh `reqwest::Client` for every request.
    #[derive(Debug, Clone, Default)]
    pub struct ReqwestConnector {
        user_agent: Option<String>,
    }

    impl ReqwestConnector {
        /// Create a connector with reqwest's default configuration.
        pub fn new() -> Self {
            Self::default()
        }

        /// Send a `User-Agent` header with every request.
        pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
            self.user_agent = Some(user_agent.into());
            self
        }
    }

    impl Connector for ReqwestConnector {
        type Client = ReqwestClient;

        fn connect(&self) -> Result<ReqwestClient, ConnectError> {
            let mut builder = reqwest::Client::builder();
            if let Some(user_agent) = &self.user_agent {
                builder = builder.user_agent(user_agent.clone());
            }
            let client = builder
                .build()
                .map_err(|e| ConnectError(e.to_string()))?;
            Ok(ReqwestClient { client })
        }
    }

    /// HTTP client backed by `reqwest`.
    #[derive(Debug, Clone)]
    pub struct ReqwestClient {
        client: reqwest::Client,
    }

    impl ReqwestClient {
        /// Wrap an existing `reqwest::Client`.
        pub fn from_client(client: reqwest::Client) -> Self {
            Self { client }
        }
    }

    impl HttpClient for ReqwestClient {
        async fn get(&self, url: &str, timeout: Duration) -> Result<HttpResponse, ClientError> {
            let response = self
                .client
                .get(url)
                .timeout(timeout)
                .send()
                .await
                .map_err(|e| classify(e, timeout))?;
            let status = response.status().as_u16();
            let body = response.bytes().await.map_err(|e| classify(e, timeout))?;

            Ok(HttpResponse { status, body })
        }
    }

    fn classify(err: reqwest::Error, timeout: Duration) -> ClientError {
        if err.is_builder() {
            ClientError::InvalidRequest(err.to_string())
        } else if err.is_timeout() {
            TransportError::timeout(timeout).into()
        } else if err.is_connect() {
            TransportError::Connect(err.to_string()).into()
        } else {
            TransportError::Io(err.to_string()).into()
        }
    }

}

#[cfg(feature = "reqwest")]
pub use reqwest_impl::{ReqwestClient, ReqwestConnector};
