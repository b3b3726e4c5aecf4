//! Retry policies and the retryable-failure vocabulary.
//!
//! - **Pure data**: `RetryPolicy` only describes the budget, the delays and
//!   the per-attempt timeout; [`ReliableRequester`](crate::ReliableRequester)
//!   executes it.
//! - **Root cause preserved**: when the budget runs out the final attempt's
//!   [`AttemptError`] is surfaced inside [`RetryExhausted`].
//!
//! # Retry Strategies
//!
//! - **Constant**: Fixed delay between attempts (the default, 1s)
//! - **Linear**: Delay increases linearly (100ms, 200ms, 300ms, ...)
//! - **Exponential**: Delay doubles each retry (100ms, 200ms, 400ms, ...)
//!
//! # Jitter Support
//!
//! Enable the `jitter` feature to randomize delays:
//!
//! ```toml
//! steadyget = { version = "...", features = ["jitter"] }
//! ```

mod error;
mod policy;

pub use error::{AttemptError, RetryExhausted, TransportError};
pub use policy::{
    JitterStrategy, RetryEvent, RetryPolicy, RetryStrategy, StatusClass,
    DEFAULT_DELAY_BETWEEN_RETRIES, DEFAULT_MAX_ATTEMPTS, DEFAULT_PER_ATTEMPT_TIMEOUT,
};
