//! Error types for individual attempts and exhausted retry budgets.

use std::fmt;
use std::time::Duration;

use bytes::Bytes;

/// A transport-level failure: the request never produced a complete response.
///
/// Every variant is retryable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The attempt did not complete within the per-attempt timeout.
    Timeout {
        /// The timeout duration that was exceeded.
        duration: Duration,
    },
    /// The connection could not be established (refused, DNS failure, TLS).
    Connect(String),
    /// The connection broke while sending the request or reading the body.
    Io(String),
}

impl TransportError {
    /// Create a timeout error.
    pub fn timeout(duration: Duration) -> Self {
        Self::Timeout { duration }
    }

    /// Returns true if this is a timeout error.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout { duration } => write!(f, "request timed out after {:?}", duration),
            Self::Connect(msg) => write!(f, "connection failed: {}", msg),
            Self::Io(msg) => write!(f, "transport error: {}", msg),
        }
    }
}

impl std::error::Error for TransportError {}

/// The failure of a single attempt that the retry loop may recover from.
///
/// # Examples
///
/// ```rust
/// use steadyget::AttemptError;
///
/// let err = AttemptError::status(503);
/// assert_eq!(err.status_code(), Some(503));
/// assert_eq!(err.to_string(), "server returned HTTP 503");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptError {
    /// The request failed below the HTTP layer.
    Transport(TransportError),
    /// The server answered with a status outside the 2xx range.
    Status {
        /// The HTTP status code.
        status: u16,
        /// The response body, kept for diagnostics.
        body: Bytes,
    },
}

impl AttemptError {
    /// Create a status error with an empty body.
    pub fn status(status: u16) -> Self {
        Self::Status {
            status,
            body: Bytes::new(),
        }
    }

    /// The HTTP status, if the server answered at all.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Transport(_) => None,
        }
    }

    /// Returns true if the attempt timed out.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Transport(t) if t.is_timeout())
    }
}

impl From<TransportError> for AttemptError {
    fn from(err: TransportError) -> Self {
        Self::Transport(err)
    }
}

impl fmt::Display for AttemptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(e) => write!(f, "{}", e),
            Self::Status { status, .. } => write!(f, "server returned HTTP {}", status),
        }
    }
}

impl std::error::Error for AttemptError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Transport(e) => Some(e),
            Self::Status { .. } => None,
        }
    }
}

/// Error returned when every allowed attempt failed with a retryable error.
///
/// Carries the final attempt's error unchanged, so the root cause stays
/// visible, along with metadata about the retry sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryExhausted<E> {
    /// The error from the final attempt.
    pub final_error: E,
    /// Total number of attempts made.
    pub attempts: u32,
    /// Total time spent, including delays.
    pub total_duration: Duration,
}

impl<E> RetryExhausted<E> {
    /// Create a new RetryExhausted error.
    pub fn new(final_error: E, attempts: u32, total_duration: Duration) -> Self {
        Self {
            final_error,
            attempts,
            total_duration,
        }
    }

    /// Extract the final error, discarding metadata.
    pub fn into_error(self) -> E {
        self.final_error
    }

    /// Get a reference to the final error.
    pub fn error(&self) -> &E {
        &self.final_error
    }
}

impl<E: fmt::Display> fmt::Display for RetryExhausted<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "retry exhausted after {} attempts ({:?}): {}",
            self.attempts, self.total_duration, self.final_error
        )
    }
}

impl<E: std::error::Error + 'static> std::error::Error for RetryExhausted<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.final_error)
    }
}
