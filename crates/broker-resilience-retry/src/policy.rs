use std::time::Duration;

/// Budgets governing how an invocation is retried.
///
/// A policy with no limits set still allows attempts; use
/// [`RetryPolicy::never`] to disable retries outright.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    max_attempts: Option<usize>,
    max_duration: Option<Duration>,
    interval: Duration,
    backoff_factor: f64,
    max_interval: Option<Duration>,
    jitter: Option<f64>,
    retry_authentication_failures: bool,
}

impl RetryPolicy {
    /// Creates a new builder.
    ///
    /// Defaults: unlimited attempts, no duration bound, zero interval, no
    /// backoff growth, no jitter, authentication failures not retried.
    pub fn builder() -> RetryPolicyBuilder {
        RetryPolicyBuilder::new()
    }

    /// A policy that never retries.
    pub fn never() -> Self {
        Self::builder().max_attempts(0).build()
    }

    /// A policy that retries indefinitely with no backoff growth.
    pub fn always() -> Self {
        Self::default()
    }

    /// Whether this policy permits any retry attempts.
    pub fn allows_attempts(&self) -> bool {
        self.max_attempts != Some(0)
    }

    /// Maximum number of attempts, `None` for unlimited.
    pub fn max_attempts(&self) -> Option<usize> {
        self.max_attempts
    }

    /// Total wall-time budget for one invocation, `None` for unbounded.
    pub fn max_duration(&self) -> Option<Duration> {
        self.max_duration
    }

    /// Initial wait between attempts.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Multiplier applied to the interval after each attempt.
    pub fn backoff_factor(&self) -> f64 {
        self.backoff_factor
    }

    /// Cap on interval growth, `None` for uncapped.
    pub fn max_interval(&self) -> Option<Duration> {
        self.max_interval
    }

    /// Randomization factor applied to each wait, `None` for deterministic
    /// waits.
    pub fn jitter(&self) -> Option<f64> {
        self.jitter
    }

    /// Whether authentication failures are on the retryable set.
    pub fn retry_authentication_failures(&self) -> bool {
        self.retry_authentication_failures
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicyBuilder::new().build()
    }
}

/// Builder for [`RetryPolicy`].
#[derive(Debug, Clone)]
pub struct RetryPolicyBuilder {
    max_attempts: Option<usize>,
    max_duration: Option<Duration>,
    interval: Duration,
    backoff_factor: f64,
    max_interval: Option<Duration>,
    jitter: Option<f64>,
    retry_authentication_failures: bool,
}

impl RetryPolicyBuilder {
    /// Creates a builder with defaults.
    pub fn new() -> Self {
        Self {
            max_attempts: None,
            max_duration: None,
            interval: Duration::ZERO,
            backoff_factor: 1.0,
            max_interval: None,
            jitter: None,
            retry_authentication_failures: false,
        }
    }

    /// Caps the number of attempts. Zero disables retries.
    pub fn max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    /// Caps the total wall time spent on one invocation, including waits.
    pub fn max_duration(mut self, max_duration: Duration) -> Self {
        self.max_duration = Some(max_duration);
        self
    }

    /// Sets the initial wait between attempts. Zero is legal and yields
    /// immediate retries.
    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Sets the multiplier applied to the interval after each attempt.
    /// Values below 1.0 are clamped to 1.0 (no growth).
    pub fn backoff_factor(mut self, factor: f64) -> Self {
        self.backoff_factor = factor.max(1.0);
        self
    }

    /// Caps interval growth.
    pub fn max_interval(mut self, max_interval: Duration) -> Self {
        self.max_interval = Some(max_interval);
        self
    }

    /// Randomizes each wait down by up to `factor` (clamped to 0.0..=1.0)
    /// of its value, spreading reconnect storms.
    pub fn jitter(mut self, factor: f64) -> Self {
        self.jitter = Some(factor.clamp(0.0, 1.0));
        self
    }

    /// Opts authentication failures into the retryable set.
    pub fn retry_authentication_failures(mut self, retry: bool) -> Self {
        self.retry_authentication_failures = retry;
        self
    }

    /// Builds the policy.
    pub fn build(self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            max_duration: self.max_duration,
            interval: self.interval,
            backoff_factor: self.backoff_factor,
            max_interval: self.max_interval,
            jitter: self.jitter,
            retry_authentication_failures: self.retry_authentication_failures,
        }
    }
}

impl Default for RetryPolicyBuilder {
    fn default() -> Self {
        Self::new()
    }
}
