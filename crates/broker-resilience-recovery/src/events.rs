//! Notifications emitted by a retryable resource.

use broker_resilience_core::BrokerError;
use std::time::Duration;

/// Events a [`RetryableResource`](crate::RetryableResource) emits as it
/// retries, recovers, and closes.
#[derive(Debug, Clone)]
pub enum ResourceEvent {
    /// An invocation failed outside of transport shutdown.
    AttemptFailed {
        /// The failure the caller's operation surfaced.
        error: BrokerError,
    },
    /// A retry was scheduled after a failed attempt.
    RetryScheduled {
        /// Failed attempts so far, including the one just recorded.
        attempt: usize,
        /// How long the caller will wait before retrying.
        delay: Duration,
    },
    /// An exchange was redeclared on the recovery channel.
    ExchangeRecovered {
        /// The exchange's name.
        name: String,
    },
    /// A queue was redeclared on the recovery channel.
    QueueRecovered {
        /// The name the queue was declared under.
        name: String,
        /// The effective name after recovery; differs from `name` for
        /// server-named queues.
        new_name: String,
    },
    /// A binding was re-established.
    BindingRecovered {
        /// Source exchange.
        source: String,
        /// Destination exchange or queue.
        destination: String,
    },
    /// A topology element could not be recovered.
    RecoveryFailed {
        /// What was being recovered.
        subject: String,
        /// The failure.
        error: BrokerError,
    },
    /// The resource latched closed.
    Closed,
}
