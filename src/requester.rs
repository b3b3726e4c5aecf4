//! The retry state machine around a single GET.
//!
//! ```text
//!             retryable, attempts left
//!   Attempting ----------------------> Waiting
//!     |  ^                                |
//!     |  +------------ delay elapsed -----+
//!     |
//!     +-- 2xx -----------------------------------> Succeeded (observer called once)
//!     +-- retryable on last attempt, or fatal ---> Failed
//!     +-- cancelled (while Attempting/Waiting) --> Failed
//! ```

use std::fmt;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn, Instrument};

use crate::error::{FatalError, RequestError};
use crate::http::{ClientError, Connector, HttpClient};
use crate::observer::ResultObserver;
use crate::retry::{AttemptError, RetryEvent, RetryExhausted, RetryPolicy, TransportError};

type RetryHook = Box<dyn Fn(&RetryEvent<'_, AttemptError>) + Send + Sync>;

/// Summary of a successful request. The body went to the observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delivery {
    /// Attempts used, the successful one included.
    pub attempts: u32,
    /// The 2xx status of the final response.
    pub status: u16,
    /// Time from the first attempt to delivery.
    pub elapsed: Duration,
}

/// Performs GETs that survive transient failures.
///
/// The requester itself is immutable: every call to [`perform`](Self::perform)
/// creates its own client through the [`Connector`], keeps its own attempt
/// counter, and drops the client before returning. Concurrent calls on a
/// shared requester do not interact.
///
/// # Examples
///
/// ```rust
/// use bytes::Bytes;
/// use steadyget::testing::{ScriptedConnector, Step};
/// use steadyget::{ObserveError, ReliableRequester, RetryPolicy};
/// use std::time::Duration;
///
/// # tokio_test::block_on(async {
/// let requester = ReliableRequester::new(
///     ScriptedConnector::new([Step::Timeout, Step::Timeout, Step::ok("ok")]),
///     RetryPolicy::constant(Duration::from_millis(1)).with_max_attempts(3),
/// );
///
/// let observer = |body: Bytes| -> Result<(), ObserveError> {
///     assert_eq!(&body[..], b"ok");
///     Ok(())
/// };
///
/// let delivery = requester.perform("http://example.test", &observer).await.unwrap();
/// assert_eq!(delivery.attempts, 3);
/// # });
/// ```
pub struct ReliableRequester<C> {
    connector: C,
    policy: RetryPolicy,
    on_retry: Option<RetryHook>,
}

impl<C: fmt::Debug> fmt::Debug for ReliableRequester<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReliableRequester")
            .field("connector", &self.connector)
            .field("policy", &self.policy)
            .field("on_retry", &self.on_retry.as_ref().map(|_| "<fn>"))
            .finish()
    }
}

impl<C: Connector> ReliableRequester<C> {
    /// Create a requester.
    pub fn new(connector: C, policy: RetryPolicy) -> Self {
        Self {
            connector,
            policy,
            on_retry: None,
        }
    }

    /// Call `hook` after every failed retryable attempt.
    ///
    /// The hook runs synchronously before the delay and should not block.
    /// On the final attempt `next_delay` is `None`.
    pub fn with_on_retry<H>(mut self, hook: H) -> Self
    where
        H: Fn(&RetryEvent<'_, AttemptError>) + Send + Sync + 'static,
    {
        self.on_retry = Some(Box::new(hook));
        self
    }

    /// The policy in use.
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// GET `url` until it succeeds or the policy gives up.
    ///
    /// On success the body is passed to `observer` exactly once.
    pub async fn perform<O>(&self, url: &str, observer: &O) -> Result<Delivery, RequestError>
    where
        O: ResultObserver + ?Sized,
    {
        self.perform_with_cancellation(url, observer, &CancellationToken::new())
            .await
    }

    /// Like [`perform`](Self::perform), aborting promptly once `cancel` fires.
    ///
    /// Cancellation interrupts both an in-flight GET and a pending delay and
    /// yields [`RequestError::Cancelled`]; the observer is not called.
    pub async fn perform_with_cancellation<O>(
        &self,
        url: &str,
        observer: &O,
        cancel: &CancellationToken,
    ) -> Result<Delivery, RequestError>
    where
        O: ResultObserver + ?Sized,
    {
        let span = tracing::debug_span!(
            "reliable_request",
            url = %url,
            max_attempts = self.policy.max_attempts()
        );
        self.run(url, observer, cancel).instrument(span).await
    }

    async fn run<O>(
        &self,
        url: &str,
        observer: &O,
        cancel: &CancellationToken,
    ) -> Result<Delivery, RequestError>
    where
        O: ResultObserver + ?Sized,
    {
        if url.trim().is_empty() {
            return Err(RequestError::fatal(FatalError::InvalidUrl(url.to_string()), 0));
        }
        if let Err(msg) = self.policy.validate() {
            return Err(RequestError::fatal(FatalError::InvalidPolicy(msg), 0));
        }
        if cancel.is_cancelled() {
            return Err(RequestError::Cancelled { attempts: 0 });
        }

        let client = self
            .connector
            .connect()
            .map_err(|e| RequestError::fatal(FatalError::Connect(e.0), 0))?;

        let timeout = self.policy.per_attempt_timeout();
        let start = Instant::now();
        let mut attempt = 1u32;

        loop {
            debug!(attempt, "sending request");

            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!(attempt, "cancelled during request");
                    return Err(RequestError::Cancelled { attempts: attempt });
                }
                outcome = tokio::time::timeout(timeout, client.get(url, timeout)) => outcome,
            };

            let failure = match outcome {
                Ok(Ok(response)) if response.is_success() => {
                    debug!(
                        attempt,
                        status = response.status,
                        bytes = response.body.len(),
                        "request succeeded"
                    );
                    if let Err(e) = observer.observe(response.body) {
                        error!(attempt, error = %e, "observer rejected response body");
                        return Err(RequestError::fatal(FatalError::Observer(e), attempt));
                    }
                    return Ok(Delivery {
                        attempts: attempt,
                        status: response.status,
                        elapsed: start.elapsed(),
                    });
                }
                Ok(Ok(response)) => {
                    let retryable = self.policy.status_class().is_retryable(response.status);
                    let failure = AttemptError::Status {
                        status: response.status,
                        body: response.body,
                    };
                    if !retryable {
                        error!(attempt, error = %failure, "non-retryable status");
                        return Err(RequestError::fatal(FatalError::Status(failure), attempt));
                    }
                    failure
                }
                Ok(Err(ClientError::Transport(e))) => AttemptError::Transport(e),
                Ok(Err(ClientError::InvalidRequest(msg))) => {
                    error!(attempt, error = %msg, "request cannot be built");
                    return Err(RequestError::fatal(FatalError::InvalidRequest(msg), attempt));
                }
                Err(_elapsed) => AttemptError::Transport(TransportError::timeout(timeout)),
            };

            let next_delay = self.policy.jittered_delay_after_attempt(attempt);

            if let Some(hook) = &self.on_retry {
                let event = RetryEvent {
                    attempt,
                    error: &failure,
                    next_delay,
                    elapsed: start.elapsed(),
                };
                hook(&event);
            }

            let Some(delay) = next_delay else {
                error!(attempts = attempt, error = %failure, "retry budget exhausted");
                return Err(RetryExhausted::new(failure, attempt, start.elapsed()).into());
            };

            warn!(attempt, error = %failure, ?delay, "attempt failed, retrying");

            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!(attempt, "cancelled while waiting to retry");
                    return Err(RequestError::Cancelled { attempts: attempt });
                }
                _ = tokio::time::sleep(delay) => {}
            }

            attempt += 1;
        }
    }
}

/// GET `url` with a fresh `reqwest` client, retrying per `policy`.
///
/// On success the full body is passed to `observer` exactly once. When every
/// attempt fails the error carries the final attempt's failure.
///
/// # Examples
///
/// ```rust,no_run
/// use bytes::Bytes;
/// use steadyget::{perform_reliable_request, ObserveError, RetryPolicy};
///
/// # async fn run() -> Result<(), steadyget::RequestError> {
/// let print = |body: Bytes| -> Result<(), ObserveError> {
///     println!("{}", String::from_utf8_lossy(&body));
///     Ok(())
/// };
/// perform_reliable_request("https://example.com", &print, RetryPolicy::default()).await?;
/// # Ok(())
/// # }
/// ```
#[cfg(feature = "reqwest")]
pub async fn perform_reliable_request<O>(
    url: &str,
    observer: &O,
    policy: RetryPolicy,
) -> Result<Delivery, RequestError>
where
    O: ResultObserver + ?Sized,
{
    ReliableRequester::new(crate::http::ReqwestConnector::new(), policy)
        .perform(url, observer)
        .await
}
