//! # Steadyget
//!
//! > *An HTTP GET that gets there.*
//!
//! Steadyget performs an HTTP GET, rides out transient failures (network
//! errors, timeouts, non-2xx responses) within a bounded retry budget, and
//! hands the body of the first successful response to an observer exactly
//! once.
//!
//! ## Philosophy
//!
//! - **Policy is data**: [`RetryPolicy`] describes the budget, delays and
//!   per-attempt timeout; nothing in it performs I/O
//! - **Root cause preserved**: an exhausted budget surfaces the final
//!   attempt's own failure, not a synthetic "gave up" error
//! - **Capabilities at the seams**: the HTTP client ([`Connector`]) and the
//!   consumer ([`ResultObserver`]) are injected, so the state machine is
//!   testable without a network
//!
//! ## Quick Example
//!
//! ```rust,no_run
//! # #[cfg(feature = "reqwest")]
//! # mod quick_example {
//! use bytes::Bytes;
//! use steadyget::{perform_reliable_request, ObserveError, RetryPolicy};
//! use std::time::Duration;
//!
//! # async fn run() -> Result<(), steadyget::RequestError> {
//! let observer = |body: Bytes| -> Result<(), ObserveError> {
//!     println!("got {} bytes", body.len());
//!     Ok(())
//! };
//!
//! let policy = RetryPolicy::constant(Duration::from_secs(1))
//!     .with_max_attempts(5)
//!     .with_per_attempt_timeout(Duration::from_secs(10));
//!
//! match perform_reliable_request("https://example.com/data", &observer, policy).await {
//!     Ok(delivery) => println!("delivered after {} attempts", delivery.attempts),
//!     Err(e) if e.is_retryable() => eprintln!("server never cooperated: {}", e),
//!     Err(e) => eprintln!("giving up: {}", e),
//! }
//! # Ok(())
//! # }
//! # }
//! ```

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

pub mod error;
pub mod http;
pub mod observer;
pub mod requester;
pub mod retry;
pub mod testing;

// Re-exports
pub use error::{FatalError, RequestError};
#[cfg(feature = "reqwest")]
pub use http::{ReqwestClient, ReqwestConnector};
pub use http::{ClientError, ConnectError, Connector, HttpClient, HttpResponse};
pub use observer::{ObserveError, ResultObserver};
#[cfg(feature = "reqwest")]
pub use requester::perform_reliable_request;
pub use requester::{Delivery, ReliableRequester};
pub use retry::{
    AttemptError, JitterStrategy, RetryEvent, RetryExhausted, RetryPolicy, RetryStrategy,
    StatusClass, TransportError,
};
pub use tokio_util::sync::CancellationToken;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::{FatalError, RequestError};
    pub use crate::http::{Connector, HttpClient};
    pub use crate::observer::{ObserveError, ResultObserver};
    pub use crate::requester::{Delivery, ReliableRequester};
    pub use crate::retry::{AttemptError, RetryPolicy, StatusClass};
    pub use tokio_util::sync::CancellationToken;
}
