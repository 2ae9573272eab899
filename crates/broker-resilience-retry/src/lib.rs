//! Retry policies and per-invocation accounting.
//!
//! A [`RetryPolicy`] is an immutable description of retry budgets: how many
//! attempts, for how long, and how to space them. [`RetryStats`] is the
//! mutable companion a single invocation carries: attempt count, the current
//! backoff interval, and the remaining wait budget.
//!
//! # Examples
//!
//! ```
//! use broker_resilience_retry::{RetryPolicy, RetryStats};
//! use std::time::Duration;
//!
//! let policy = RetryPolicy::builder()
//!     .max_attempts(5)
//!     .interval(Duration::from_millis(100))
//!     .backoff_factor(2.0)
//!     .max_interval(Duration::from_secs(5))
//!     .build();
//!
//! let mut stats = RetryStats::new(policy);
//! stats.increment_attempts();
//! assert_eq!(stats.wait_time(), Duration::from_millis(100));
//! stats.increment_attempts();
//! assert_eq!(stats.wait_time(), Duration::from_millis(200));
//! ```

mod policy;
mod stats;

pub use policy::{RetryPolicy, RetryPolicyBuilder};
pub use stats::RetryStats;
