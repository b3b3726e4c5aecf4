//! Terminal errors of a reliable request.
//!
//! Exactly one of these ends every failed invocation:
//!
//! - [`RequestError::Exhausted`] - the server never cooperated; try again later
//! - [`RequestError::Fatal`] - bad input or a broken consumer; do not retry
//! - [`RequestError::Cancelled`] - the caller gave up

use std::fmt;

use crate::observer::ObserveError;
use crate::retry::{AttemptError, RetryExhausted};

/// A failure that is never retried.
#[derive(Debug)]
pub enum FatalError {
    /// The URL was empty.
    InvalidUrl(String),
    /// The retry policy violates its invariants.
    InvalidPolicy(&'static str),
    /// No HTTP client could be created.
    Connect(String),
    /// The HTTP layer refused to build a request (malformed URL, bad scheme).
    InvalidRequest(String),
    /// The server answered with a status the policy treats as permanent.
    Status(AttemptError),
    /// The observer rejected the successfully fetched body.
    Observer(ObserveError),
}

impl fmt::Display for FatalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidUrl(url) => write!(f, "invalid url {:?}", url),
            Self::InvalidPolicy(msg) => write!(f, "invalid retry policy: {}", msg),
            Self::Connect(msg) => write!(f, "could not create http client: {}", msg),
            Self::InvalidRequest(msg) => write!(f, "invalid request: {}", msg),
            Self::Status(e) => write!(f, "non-retryable response: {}", e),
            Self::Observer(e) => write!(f, "observer failed: {}", e),
        }
    }
}

impl std::error::Error for FatalError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Status(e) => Some(e),
            Self::Observer(e) => Some(e.as_ref()),
            _ => None,
        }
    }
}

/// The error returned by a reliable request.
///
/// # Examples
///
/// ```rust
/// use steadyget::{AttemptError, RequestError, RetryExhausted};
/// use std::time::Duration;
///
/// let err = RequestError::from(RetryExhausted::new(
///     AttemptError::status(503),
///     2,
///     Duration::from_secs(1),
/// ));
/// assert!(err.is_retryable());
/// assert_eq!(err.attempts(), 2);
/// assert_eq!(err.final_attempt_error().and_then(|e| e.status_code()), Some(503));
/// ```
#[derive(Debug)]
pub enum RequestError {
    /// Every allowed attempt failed with a retryable error.
    Exhausted(RetryExhausted<AttemptError>),
    /// A non-retryable failure ended the request.
    Fatal {
        /// The underlying failure.
        error: FatalError,
        /// Network attempts made before it occurred.
        attempts: u32,
    },
    /// The caller cancelled the request.
    Cancelled {
        /// Network attempts started before cancellation.
        attempts: u32,
    },
}

impl RequestError {
    pub(crate) fn fatal(error: FatalError, attempts: u32) -> Self {
        Self::Fatal { error, attempts }
    }

    /// True when the failure was transient and the request may succeed later.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Exhausted(_))
    }

    /// Returns true if this is a cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    /// Returns true if this is a fatal error.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal { .. })
    }

    /// Network attempts made before the request ended.
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Exhausted(e) => e.attempts,
            Self::Fatal { attempts, .. } | Self::Cancelled { attempts } => *attempts,
        }
    }

    /// The last retryable failure, when the budget ran out.
    pub fn final_attempt_error(&self) -> Option<&AttemptError> {
        match self {
            Self::Exhausted(e) => Some(e.error()),
            _ => None,
        }
    }

    /// The fatal failure, if any.
    pub fn fatal_error(&self) -> Option<&FatalError> {
        match self {
            Self::Fatal { error, .. } => Some(error),
            _ => None,
        }
    }
}

impl From<RetryExhausted<AttemptError>> for RequestError {
    fn from(err: RetryExhausted<AttemptError>) -> Self {
        Self::Exhausted(err)
    }
}

impl fmt::Display for RequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exhausted(e) => write!(f, "{}", e),
            Self::Fatal { error, .. } => write!(f, "{}", error),
            Self::Cancelled { attempts } => {
                write!(f, "request cancelled after {} attempts", attempts)
            }
        }
    }
}

impl std::error::Error for RequestError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Exhausted(e) => Some(e.error()),
            Self::Fatal { error, .. } => Some(error),
            Self::Cancelled { .. } => None,
        }
    }
}
