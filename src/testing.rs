//! Testing utilities for code built on reliable requests.
//!
//! - [`ScriptedConnector`] - an [`HttpClient`] replaying a fixed list of outcomes
//! - [`RecordingObserver`] - an observer remembering every body it received
//! - [`assert_delivered!`](crate::assert_delivered) and
//!   [`assert_exhausted!`](crate::assert_exhausted) - result assertions
//!
//! # Examples
//!
//! ```rust
//! use steadyget::testing::{RecordingObserver, ScriptedConnector, Step};
//! use steadyget::{assert_delivered, ReliableRequester, RetryPolicy};
//! use std::time::Duration;
//!
//! # tokio_test::block_on(async {
//! let connector = ScriptedConnector::new([Step::status(503), Step::ok("ok")]);
//! let observer = RecordingObserver::new();
//! let requester = ReliableRequester::new(
//!     connector.clone(),
//!     RetryPolicy::constant(Duration::from_millis(1)),
//! );
//!
//! let result = requester.perform("http://example.test", &observer).await;
//!
//! assert_delivered!(result);
//! assert_eq!(connector.attempts(), 2);
//! assert_eq!(observer.bodies(), vec![bytes::Bytes::from_static(b"ok")]);
//! # });
//! ```

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use bytes::Bytes;

use crate::http::{ClientError, ConnectError, Connector, HttpClient, HttpResponse};
use crate::observer::{ObserveError, ResultObserver};
use crate::retry::TransportError;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// One scripted outcome of a GET.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Answer with a status and body.
    Respond(HttpResponse),
    /// Fail as if the request timed out.
    Timeout,
    /// Fail as if the connection was refused.
    Refused,
    /// Fail as if the connection was reset mid-response.
    Reset,
    /// Fail as if the URL could not be turned into a request.
    Invalid,
    /// Never complete.
    Hang,
}

impl Step {
    /// A 200 response with `body`.
    pub fn ok(body: impl Into<Bytes>) -> Self {
        Step::Respond(HttpResponse::new(200, body))
    }

    /// A response with `status` and an empty body.
    pub fn status(status: u16) -> Self {
        Step::Respond(HttpResponse::new(status, Bytes::new()))
    }
}

#[derive(Debug, Default)]
struct Script {
    steps: Mutex<VecDeque<Step>>,
    repeat: Option<Step>,
    connect_error: Option<String>,
    urls: Mutex<Vec<String>>,
    attempts: AtomicU32,
    connects: AtomicU32,
    live_clients: AtomicUsize,
}

/// A [`Connector`] whose clients replay scripted outcomes in order.
///
/// Clones share the script and the counters. Once the script runs out, every
/// further GET repeats the `repeating` step, or fails as an invalid request
/// when there is none.
#[derive(Debug, Clone)]
pub struct ScriptedConnector {
    script: Arc<Script>,
}

impl ScriptedConnector {
    /// Replay `steps` in order.
    pub fn new(steps: impl IntoIterator<Item = Step>) -> Self {
        Self {
            script: Arc::new(Script {
                steps: Mutex::new(steps.into_iter().collect()),
                ..Script::default()
            }),
        }
    }

    /// Answer every GET with `step`.
    pub fn repeating(step: Step) -> Self {
        Self {
            script: Arc::new(Script {
                repeat: Some(step),
                ..Script::default()
            }),
        }
    }

    /// Refuse to create clients at all.
    pub fn failing_connect(message: impl Into<String>) -> Self {
        Self {
            script: Arc::new(Script {
                connect_error: Some(message.into()),
                ..Script::default()
            }),
        }
    }

    /// Number of GETs issued so far.
    pub fn attempts(&self) -> u32 {
        self.script.attempts.load(Ordering::SeqCst)
    }

    /// Number of clients created so far.
    pub fn connects(&self) -> u32 {
        self.script.connects.load(Ordering::SeqCst)
    }

    /// Number of clients created and not yet dropped.
    pub fn live_clients(&self) -> usize {
        self.script.live_clients.load(Ordering::SeqCst)
    }

    /// URLs requested so far, in order.
    pub fn urls(&self) -> Vec<String> {
        lock(&self.script.urls).clone()
    }
}

impl Connector for ScriptedConnector {
    type Client = ScriptedClient;

    fn connect(&self) -> Result<ScriptedClient, ConnectError> {
        if let Some(message) = &self.script.connect_error {
            return Err(ConnectError(message.clone()));
        }
        self.script.connects.fetch_add(1, Ordering::SeqCst);
        self.script.live_clients.fetch_add(1, Ordering::SeqCst);
        Ok(ScriptedClient {
            script: Arc::clone(&self.script),
        })
    }
}

/// Client handed out by [`ScriptedConnector`].
#[derive(Debug)]
pub struct ScriptedClient {
    script: Arc<Script>,
}

impl ScriptedClient {
    fn next_step(&self, url: &str) -> Option<Step> {
        self.script.attempts.fetch_add(1, Ordering::SeqCst);
        lock(&self.script.urls).push(url.to_string());
        lock(&self.script.steps)
            .pop_front()
            .or_else(|| self.script.repeat.clone())
    }
}

impl HttpClient for ScriptedClient {
    async fn get(&self, url: &str, timeout: Duration) -> Result<HttpResponse, ClientError> {
        match self.next_step(url) {
            Some(Step::Respond(response)) => Ok(response),
            Some(Step::Timeout) => Err(TransportError::timeout(timeout).into()),
            Some(Step::Refused) => Err(TransportError::Connect("connection refused".into()).into()),
            Some(Step::Reset) => Err(TransportError::Io("connection reset by peer".into()).into()),
            Some(Step::Invalid) => Err(ClientError::InvalidRequest(format!(
                "cannot build request for {:?}",
                url
            ))),
            Some(Step::Hang) => std::future::pending().await,
            None => Err(ClientError::InvalidRequest("script exhausted".into())),
        }
    }
}

impl Drop for ScriptedClient {
    fn drop(&mut self) {
        self.script.live_clients.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Observer that records every body it receives.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    bodies: Mutex<Vec<Bytes>>,
    reject_with: Option<String>,
}

impl RecordingObserver {
    /// Create an observer accepting every body.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an observer that records, then rejects, every body.
    pub fn rejecting(message: impl Into<String>) -> Self {
        Self {
            bodies: Mutex::default(),
            reject_with: Some(message.into()),
        }
    }

    /// Number of `observe` calls.
    pub fn calls(&self) -> usize {
        lock(&self.bodies).len()
    }

    /// Every body received, in order.
    pub fn bodies(&self) -> Vec<Bytes> {
        lock(&self.bodies).clone()
    }
}

impl ResultObserver for RecordingObserver {
    fn observe(&self, data: Bytes) -> Result<(), ObserveError> {
        lock(&self.bodies).push(data);
        match &self.reject_with {
            Some(message) => Err(message.clone().into()),
            None => Ok(()),
        }
    }
}

/// Assert that a reliable request delivered its body.
///
/// Evaluates to the [`Delivery`](crate::Delivery).
///
/// # Example
///
/// ```rust
/// use steadyget::{assert_delivered, Delivery};
/// use std::time::Duration;
///
/// let result: Result<Delivery, steadyget::RequestError> = Ok(Delivery {
///     attempts: 1,
///     status: 200,
///     elapsed: Duration::ZERO,
/// });
/// let delivery = assert_delivered!(result);
/// assert_eq!(delivery.status, 200);
/// ```
#[macro_export]
macro_rules! assert_delivered {
    ($result:expr) => {
        match $result {
            Ok(delivery) => delivery,
            Err(e) => panic!("Expected Delivery, got error: {:?}", e),
        }
    };
}

/// Assert that a reliable request ran out of attempts.
///
/// With a second argument, also checks the number of attempts. Evaluates to
/// the final [`AttemptError`](crate::AttemptError).
///
/// # Example
///
/// ```rust
/// use steadyget::{assert_exhausted, AttemptError, Delivery, RequestError, RetryExhausted};
/// use std::time::Duration;
///
/// let result: Result<Delivery, RequestError> = Err(
///     RetryExhausted::new(AttemptError::status(503), 2, Duration::ZERO).into(),
/// );
/// let last = assert_exhausted!(result, 2);
/// assert_eq!(last.status_code(), Some(503));
/// ```
#[macro_export]
macro_rules! assert_exhausted {
    ($result:expr) => {
        match $result {
            Err($crate::RequestError::Exhausted(exhausted)) => exhausted.final_error,
            other => panic!("Expected Exhausted, got: {:?}", other),
        }
    };
    ($result:expr, $attempts:expr) => {
        match $result {
            Err($crate::RequestError::Exhausted(exhausted)) => {
                assert_eq!(exhausted.attempts, $attempts, "unexpected attempt count");
                exhausted.final_error
            }
            other => panic!("Expected Exhausted, got: {:?}", other),
        }
    };
}
