use crate::policy::RetryPolicy;
use std::time::{Duration, Instant};

/// Mutable per-invocation accounting derived from a [`RetryPolicy`] and a
/// start instant: attempt count, current backoff interval, and the remaining
/// wait budget.
#[derive(Debug, Clone)]
pub struct RetryStats {
    policy: RetryPolicy,
    start: Instant,
    attempts: usize,
    current_interval: Duration,
    exceeded: bool,
}

impl RetryStats {
    /// Starts accounting against `policy` as of now.
    pub fn new(policy: RetryPolicy) -> Self {
        let current_interval = policy.interval();
        Self {
            policy,
            start: Instant::now(),
            attempts: 0,
            current_interval,
            exceeded: false,
        }
    }

    /// Number of failed attempts recorded so far.
    pub fn attempts(&self) -> usize {
        self.attempts
    }

    /// Wall time spent since the invocation started.
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Records a failed attempt. From the second attempt on the interval
    /// grows by the policy's backoff factor, clamped to its max interval.
    /// Growth is overflow-safe.
    pub fn increment_attempts(&mut self) {
        self.attempts += 1;
        if self.attempts > 1 && self.policy.backoff_factor() > 1.0 {
            let grown = Duration::try_from_secs_f64(
                self.current_interval.as_secs_f64() * self.policy.backoff_factor(),
            )
            .unwrap_or(Duration::MAX);
            self.current_interval = match self.policy.max_interval() {
                Some(max) => grown.min(max),
                None => grown,
            };
        }
    }

    /// The wait before the next attempt: the current interval, reduced by
    /// jitter when configured, clamped to the remaining duration budget.
    pub fn wait_time(&self) -> Duration {
        let mut wait = self.current_interval;
        if let Some(factor) = self.policy.jitter() {
            wait = jittered(wait, factor);
        }
        match self.max_wait_time() {
            Some(budget) => wait.min(budget),
            None => wait,
        }
    }

    /// Remaining duration budget, `None` when the policy is unbounded.
    /// Saturates at zero once the budget is spent.
    pub fn max_wait_time(&self) -> Option<Duration> {
        self.policy
            .max_duration()
            .map(|max| max.saturating_sub(self.start.elapsed()))
    }

    /// Whether the attempt or duration budget has been spent. Once true,
    /// stays true.
    pub fn is_policy_exceeded(&mut self) -> bool {
        if !self.exceeded {
            let attempts_spent = self
                .policy
                .max_attempts()
                .is_some_and(|max| self.attempts >= max);
            let duration_spent = self
                .policy
                .max_duration()
                .is_some_and(|max| self.start.elapsed() >= max);
            self.exceeded = attempts_spent || duration_spent;
        }
        self.exceeded
    }
}

fn jittered(wait: Duration, factor: f64) -> Duration {
    use rand::Rng;
    let secs = wait.as_secs_f64();
    if secs <= 0.0 {
        return Duration::ZERO;
    }
    let low = secs * (1.0 - factor);
    let randomized = rand::thread_rng().gen_range(low..=secs);
    Duration::try_from_secs_f64(randomized.max(0.0)).unwrap_or(wait)
}
