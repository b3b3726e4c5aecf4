//! Retry policy types and configuration.

use std::time::Duration;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Default attempt budget.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;
/// Default pause between a failed attempt and the next one.
pub const DEFAULT_DELAY_BETWEEN_RETRIES: Duration = Duration::from_secs(1);
/// Default bound on a single attempt, body read included.
pub const DEFAULT_PER_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(10);

/// A retry policy describing how a request is retried.
///
/// Policies are pure data: they describe retry behavior but don't execute it.
/// `max_attempts` counts every network attempt, the first one included, so
/// `with_max_attempts(1)` disables retrying altogether.
///
/// # Examples
///
/// ```rust
/// use steadyget::RetryPolicy;
/// use std::time::Duration;
///
/// let policy = RetryPolicy::default();
/// assert_eq!(policy.max_attempts(), 5);
/// assert_eq!(policy.delay_between_retries(), Duration::from_secs(1));
/// assert_eq!(policy.per_attempt_timeout(), Duration::from_secs(10));
///
/// let policy = RetryPolicy::exponential(Duration::from_millis(100))
///     .with_max_attempts(4)
///     .with_max_delay(Duration::from_secs(2));
/// assert_eq!(policy.delay_after_attempt(3), Some(Duration::from_millis(400)));
/// assert_eq!(policy.delay_after_attempt(4), None);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RetryPolicy {
    strategy: RetryStrategy,
    max_attempts: u32,
    max_delay: Option<Duration>,
    jitter: JitterStrategy,
    per_attempt_timeout: Duration,
    status_class: StatusClass,
}

/// The backoff strategy for retry delays.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum RetryStrategy {
    /// Fixed delay between attempts.
    Constant(Duration),
    /// Delay increases linearly: base * retry.
    Linear {
        /// Base delay duration.
        base: Duration,
    },
    /// Delay doubles: base * 2^(retry - 1).
    Exponential {
        /// Base delay duration.
        base: Duration,
    },
}

/// Strategy for adding randomness to delays.
///
/// Only takes effect with the `jitter` feature; without it every variant
/// behaves like `None`.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum JitterStrategy {
    /// No jitter applied.
    #[default]
    None,
    /// Add ±percentage randomness to delay.
    Proportional(f64),
    /// Random delay between 0 and calculated delay.
    Full,
}

/// Which non-2xx statuses count as transient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum StatusClass {
    /// Every status outside 2xx is retried.
    #[default]
    AnyNon2xx,
    /// Only 5xx, 408 and 429 are retried; other statuses fail immediately.
    Transient,
}

impl StatusClass {
    /// Returns true if a response with `status` should be retried.
    ///
    /// 2xx statuses are successes and never reach this check.
    pub fn is_retryable(&self, status: u16) -> bool {
        match self {
            StatusClass::AnyNon2xx => true,
            StatusClass::Transient => matches!(status, 408 | 429 | 500..=599),
        }
    }
}

/// Information about a failed attempt, passed to retry hooks.
#[derive(Debug, Clone)]
pub struct RetryEvent<'a, E> {
    /// Which attempt just failed (1-indexed).
    pub attempt: u32,
    /// The error from the failed attempt.
    pub error: &'a E,
    /// Delay before next attempt, `None` when the budget is spent.
    pub next_delay: Option<Duration>,
    /// Total elapsed time since first attempt.
    pub elapsed: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::constant(DEFAULT_DELAY_BETWEEN_RETRIES)
    }
}

impl RetryPolicy {
    fn with_strategy(strategy: RetryStrategy) -> Self {
        Self {
            strategy,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            max_delay: None,
            jitter: JitterStrategy::None,
            per_attempt_timeout: DEFAULT_PER_ATTEMPT_TIMEOUT,
            status_class: StatusClass::AnyNon2xx,
        }
    }

    /// Create a policy with constant delay between attempts.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use steadyget::RetryPolicy;
    /// use std::time::Duration;
    ///
    /// let policy = RetryPolicy::constant(Duration::from_millis(500))
    ///     .with_max_attempts(3);
    ///
    /// assert_eq!(policy.delay_after_attempt(1), Some(Duration::from_millis(500)));
    /// assert_eq!(policy.delay_after_attempt(2), Some(Duration::from_millis(500)));
    /// assert_eq!(policy.delay_after_attempt(3), None); // budget spent
    /// ```
    pub fn constant(delay: Duration) -> Self {
        Self::with_strategy(RetryStrategy::Constant(delay))
    }

    /// Create a policy with linearly increasing delay.
    pub fn linear(base: Duration) -> Self {
        Self::with_strategy(RetryStrategy::Linear { base })
    }

    /// Create a policy with exponentially increasing delay.
    pub fn exponential(base: Duration) -> Self {
        Self::with_strategy(RetryStrategy::Exponential { base })
    }

    /// Set the total number of attempts, the first one included.
    pub fn with_max_attempts(mut self, n: u32) -> Self {
        self.max_attempts = n;
        self
    }

    /// Replace the strategy with a constant delay.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.strategy = RetryStrategy::Constant(delay);
        self
    }

    /// Bound each attempt, including reading the body.
    pub fn with_per_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.per_attempt_timeout = timeout;
        self
    }

    /// Cap delays, regardless of the backoff strategy.
    pub fn with_max_delay(mut self, d: Duration) -> Self {
        self.max_delay = Some(d);
        self
    }

    /// Add ±`factor` proportional jitter to delays (clamped to 0.0..=1.0).
    ///
    /// A NaN or infinite factor disables jitter.
    pub fn with_jitter(mut self, factor: f64) -> Self {
        self.jitter = JitterStrategy::Proportional(normalize_factor(factor));
        self
    }

    /// Use a random delay between zero and the calculated delay.
    pub fn with_full_jitter(mut self) -> Self {
        self.jitter = JitterStrategy::Full;
        self
    }

    /// Choose which non-2xx statuses are retried.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use steadyget::{RetryPolicy, StatusClass};
    ///
    /// let policy = RetryPolicy::default().with_status_class(StatusClass::Transient);
    /// assert!(policy.status_class().is_retryable(503));
    /// assert!(!policy.status_class().is_retryable(404));
    /// ```
    pub fn with_status_class(mut self, class: StatusClass) -> Self {
        self.status_class = class;
        self
    }

    /// Get the attempt budget.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Get the base delay of the strategy.
    pub fn delay_between_retries(&self) -> Duration {
        match &self.strategy {
            RetryStrategy::Constant(d) => *d,
            RetryStrategy::Linear { base } | RetryStrategy::Exponential { base } => *base,
        }
    }

    /// Get the per-attempt timeout.
    pub fn per_attempt_timeout(&self) -> Duration {
        self.per_attempt_timeout
    }

    /// Get the maximum delay cap.
    pub fn max_delay(&self) -> Option<Duration> {
        self.max_delay
    }

    /// Get the jitter strategy.
    pub fn jitter(&self) -> &JitterStrategy {
        &self.jitter
    }

    /// Get the retry strategy.
    pub fn strategy(&self) -> &RetryStrategy {
        &self.strategy
    }

    /// Get the status classification.
    pub fn status_class(&self) -> StatusClass {
        self.status_class
    }

    /// Delay to wait after attempt `attempt` (1-indexed) failed.
    ///
    /// Returns `None` when `attempt` was the last one allowed, so no delay
    /// ever follows the final attempt.
    pub fn delay_after_attempt(&self, attempt: u32) -> Option<Duration> {
        if attempt == 0 || attempt >= self.max_attempts {
            return None;
        }

        let base_delay = match &self.strategy {
            RetryStrategy::Constant(d) => *d,
            RetryStrategy::Linear { base } => base.saturating_mul(attempt),
            RetryStrategy::Exponential { base } => {
                base.saturating_mul(2u32.saturating_pow(attempt - 1))
            }
        };

        Some(self.cap(base_delay))
    }

    /// Like [`delay_after_attempt`](Self::delay_after_attempt) with jitter applied.
    pub fn jittered_delay_after_attempt(&self, attempt: u32) -> Option<Duration> {
        let base_delay = self.delay_after_attempt(attempt)?;
        Some(self.cap(self.jitter.apply(base_delay)))
    }

    /// Check the invariants the retry loop relies on.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.max_attempts == 0 {
            Err("RetryPolicy must allow at least one attempt")
        } else if self.per_attempt_timeout.is_zero() {
            Err("RetryPolicy per-attempt timeout must be greater than zero")
        } else {
            Ok(())
        }
    }

    fn cap(&self, delay: Duration) -> Duration {
        match self.max_delay {
            Some(max) => delay.min(max),
            None => delay,
        }
    }
}

fn normalize_factor(factor: f64) -> f64 {
    if factor.is_finite() {
        factor.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

impl JitterStrategy {
    /// Apply jitter to a base delay.
    ///
    /// Proportional factors are clamped to 0.0..=1.0 here as well, so values
    /// loaded through serde behave like those set with
    /// [`RetryPolicy::with_jitter`].
    pub fn apply(&self, base_delay: Duration) -> Duration {
        match self {
            JitterStrategy::None => base_delay,
            #[cfg(feature = "jitter")]
            JitterStrategy::Proportional(factor) => {
                use rand::Rng;
                let factor = normalize_factor(*factor);
                if factor == 0.0 {
                    return base_delay;
                }
                let base_millis = base_delay.as_millis() as f64;
                let jitter_range = base_millis * factor;
                let min = (base_millis - jitter_range).max(0.0);
                let max = base_millis + jitter_range;
                if max <= min {
                    return base_delay;
                }
                let jittered_millis = rand::rng().random_range(min..=max);
                Duration::from_millis(jittered_millis as u64)
            }
            #[cfg(feature = "jitter")]
            JitterStrategy::Full => {
                use rand::Rng;
                let max_millis = base_delay.as_millis() as u64;
                if max_millis == 0 {
                    Duration::ZERO
                } else {
                    Duration::from_millis(rand::rng().random_range(0..=max_millis))
                }
            }
            #[cfg(not(feature = "jitter"))]
            JitterStrategy::Proportional(_) | JitterStrategy::Full => base_delay,
        }
    }
}

#[cfg(test)]
mod policy_tests {
    use super::*;

    #[test]
    fn test_default_policy_matches_constants() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts(), DEFAULT_MAX_ATTEMPTS);
        assert_eq!(policy.delay_between_retries(), DEFAULT_DELAY_BETWEEN_RETRIES);
        assert_eq!(policy.per_attempt_timeout(), DEFAULT_PER_ATTEMPT_TIMEOUT);
        assert_eq!(policy.status_class(), StatusClass::AnyNon2xx);
        assert!(policy.validate().is_ok());
    }

    #[test]
    fn test_constant_delay() {
        let policy = RetryPolicy::constant(Duration::from_millis(100)).with_max_attempts(3);

        assert_eq!(
            policy.delay_after_attempt(1),
            Some(Duration::from_millis(100))
        );
        assert_eq!(
            policy.delay_after_attempt(2),
            Some(Duration::from_millis(100))
        );
        assert_eq!(policy.delay_after_attempt(3), None);
    }

    #[test]
    fn test_linear_delay() {
        let policy = RetryPolicy::linear(Duration::from_millis(100)).with_max_attempts(5);

        assert_eq!(
            policy.delay_after_attempt(1),
            Some(Duration::from_millis(100))
        );
        assert_eq!(
            policy.delay_after_attempt(2),
            Some(Duration::from_millis(200))
        );
        assert_eq!(
            policy.delay_after_attempt(4),
            Some(Duration::from_millis(400))
        );
    }

    #[test]
    fn test_exponential_delay() {
        let policy = RetryPolicy::exponential(Duration::from_millis(100)).with_max_attempts(6);

        assert_eq!(
            policy.delay_after_attempt(1),
            Some(Duration::from_millis(100))
        );
        assert_eq!(
            policy.delay_after_attempt(2),
            Some(Duration::from_millis(200))
        );
        assert_eq!(
            policy.delay_after_attempt(4),
            Some(Duration::from_millis(800))
        );
    }

    #[test]
    fn test_max_delay_cap() {
        let policy = RetryPolicy::exponential(Duration::from_millis(100))
            .with_max_attempts(10)
            .with_max_delay(Duration::from_millis(500));

        assert_eq!(
            policy.delay_after_attempt(3),
            Some(Duration::from_millis(400))
        );
        assert_eq!(
            policy.delay_after_attempt(4),
            Some(Duration::from_millis(500))
        ); // capped
        assert_eq!(
            policy.delay_after_attempt(9),
            Some(Duration::from_millis(500))
        );
    }

    #[test]
    fn test_single_attempt_never_delays() {
        let policy = RetryPolicy::default().with_max_attempts(1);
        assert_eq!(policy.delay_after_attempt(1), None);
    }

    #[test]
    fn test_huge_exponent_saturates() {
        let policy = RetryPolicy::exponential(Duration::from_secs(1)).with_max_attempts(u32::MAX);
        assert!(policy.delay_after_attempt(200).is_some());
    }

    #[test]
    fn test_zero_delay_is_allowed() {
        let policy = RetryPolicy::constant(Duration::ZERO);
        assert!(policy.validate().is_ok());
        assert_eq!(policy.delay_after_attempt(1), Some(Duration::ZERO));
    }

    #[test]
    fn test_validate_zero_attempts() {
        let policy = RetryPolicy::default().with_max_attempts(0);
        assert!(policy.validate().is_err());
    }

    #[test]
    fn test_validate_zero_timeout() {
        let policy = RetryPolicy::default().with_per_attempt_timeout(Duration::ZERO);
        assert!(policy.validate().is_err());
    }

    #[test]
    fn test_with_delay_replaces_strategy() {
        let policy =
            RetryPolicy::exponential(Duration::from_millis(10)).with_delay(Duration::from_secs(2));
        assert_eq!(policy.strategy(), &RetryStrategy::Constant(Duration::from_secs(2)));
    }

    #[test]
    fn test_status_classes() {
        assert!(StatusClass::AnyNon2xx.is_retryable(400));
        assert!(StatusClass::AnyNon2xx.is_retryable(503));
        assert!(StatusClass::Transient.is_retryable(500));
        assert!(StatusClass::Transient.is_retryable(429));
        assert!(StatusClass::Transient.is_retryable(408));
        assert!(!StatusClass::Transient.is_retryable(400));
        assert!(!StatusClass::Transient.is_retryable(404));
        assert!(!StatusClass::Transient.is_retryable(301));
    }

    #[test]
    fn test_jitter_none_returns_base_delay() {
        let base = Duration::from_millis(100);
        assert_eq!(JitterStrategy::None.apply(base), base);
    }

    #[cfg(feature = "jitter")]
    #[test]
    fn test_proportional_jitter_stays_in_range() {
        let policy = RetryPolicy::constant(Duration::from_millis(100)).with_jitter(0.25);
        for _ in 0..100 {
            let d = policy.jittered_delay_after_attempt(1).unwrap();
            assert!(d >= Duration::from_millis(75) && d <= Duration::from_millis(125));
        }
    }

    #[cfg(feature = "jitter")]
    #[test]
    fn test_non_finite_jitter_factor_is_disabled() {
        let base = Duration::from_millis(100);
        for factor in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let policy = RetryPolicy::constant(base).with_jitter(factor);
            assert_eq!(policy.jitter(), &JitterStrategy::Proportional(0.0));
            assert_eq!(policy.jittered_delay_after_attempt(1), Some(base));
        }
    }

    #[cfg(feature = "jitter")]
    #[test]
    fn test_apply_guards_unnormalized_factors() {
        let base = Duration::from_millis(100);
        assert_eq!(JitterStrategy::Proportional(f64::NAN).apply(base), base);
        assert_eq!(JitterStrategy::Proportional(-0.5).apply(base), base);
        for _ in 0..100 {
            let d = JitterStrategy::Proportional(5.0).apply(base);
            assert!(d <= Duration::from_millis(200));
        }
    }

    #[cfg(feature = "jitter")]
    #[test]
    fn test_full_jitter_respects_cap() {
        let policy = RetryPolicy::constant(Duration::from_millis(100))
            .with_full_jitter()
            .with_max_delay(Duration::from_millis(50));
        for _ in 0..100 {
            assert!(policy.jittered_delay_after_attempt(1).unwrap() <= Duration::from_millis(50));
        }
    }

    #[test]
    fn test_policy_getters() {
        let policy = RetryPolicy::exponential(Duration::from_millis(100))
            .with_max_attempts(3)
            .with_max_delay(Duration::from_secs(5))
            .with_jitter(1.5)
            .with_per_attempt_timeout(Duration::from_secs(2));

        assert_eq!(policy.max_attempts(), 3);
        assert_eq!(policy.max_delay(), Some(Duration::from_secs(5)));
        assert_eq!(policy.jitter(), &JitterStrategy::Proportional(1.0));
        assert_eq!(policy.per_attempt_timeout(), Duration::from_secs(2));
        assert!(matches!(
            policy.strategy(),
            RetryStrategy::Exponential { .. }
        ));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_policy_from_partial_json() {
        let policy: RetryPolicy =
            serde_json::from_str(r#"{"max_attempts": 3, "status_class": "Transient"}"#).unwrap();
        assert_eq!(policy.max_attempts(), 3);
        assert_eq!(policy.status_class(), StatusClass::Transient);
        assert_eq!(policy.per_attempt_timeout(), DEFAULT_PER_ATTEMPT_TIMEOUT);
    }

    #[cfg(all(feature = "serde", feature = "jitter"))]
    #[test]
    fn test_deserialized_jitter_factor_is_clamped() {
        let policy: RetryPolicy = serde_json::from_str(
            r#"{"strategy": {"Constant": {"secs": 0, "nanos": 100000000}},
                "jitter": {"Proportional": 4.0}}"#,
        )
        .unwrap();
        assert_eq!(policy.jitter(), &JitterStrategy::Proportional(4.0));
        for _ in 0..100 {
            let d = policy.jittered_delay_after_attempt(1).unwrap();
            assert!(d <= Duration::from_millis(200));
        }
    }
}
