//! The retryable-resource engine behind a resilient broker façade.
//!
//! One [`RetryableResource`] backs each wrapped connection or channel. It
//! executes caller operations with retries under a
//! [`RetryPolicy`](broker_resilience_retry::RetryPolicy), coordinates with a
//! [`RecoveryCircuit`] that gates callers while a supervisor rebuilds the
//! transport, and replays the resource's declared topology (exchanges,
//! queues, bindings) against a freshly obtained channel.
//!
//! # Features
//!
//! - **Retries with wait-budget accounting**: attempt and duration budgets,
//!   exponential backoff, jitter
//! - **Recovery circuit**: callers that observed a transport shutdown block
//!   until the supervisor finishes rebuilding, then retry
//! - **Topology replay**: captured declarations are re-invoked on a fresh
//!   channel; server-assigned queue names propagate to later bindings
//! - **Close interception**: closing a resource wakes every blocked caller
//!
//! # Examples
//!
//! ```no_run
//! use async_trait::async_trait;
//! use broker_resilience_core::BrokerError;
//! use broker_resilience_recovery::{
//!     Arguments, RecoveryChannel, RecoveryStrategy, RetryableResource,
//! };
//! use broker_resilience_retry::RetryPolicy;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! struct Stub;
//!
//! #[async_trait]
//! impl RecoveryChannel for Stub {
//!     async fn exchange_bind(
//!         &self,
//!         _destination: &str,
//!         _source: &str,
//!         _routing_key: &str,
//!         _arguments: &Arguments,
//!     ) -> Result<(), BrokerError> {
//!         Ok(())
//!     }
//!
//!     async fn queue_bind(
//!         &self,
//!         _queue: &str,
//!         _exchange: &str,
//!         _routing_key: &str,
//!         _arguments: &Arguments,
//!     ) -> Result<(), BrokerError> {
//!         Ok(())
//!     }
//! }
//!
//! #[async_trait]
//! impl RecoveryStrategy for Stub {
//!     async fn recovery_channel(&self) -> Result<Arc<dyn RecoveryChannel>, BrokerError> {
//!         Ok(Arc::new(Stub))
//!     }
//!
//!     fn throw_on_recovery_failure(&self) -> bool {
//!         false
//!     }
//! }
//!
//! # async fn example() -> Result<(), BrokerError> {
//! let resource = RetryableResource::new("connection main", Arc::new(Stub));
//! let policy = RetryPolicy::builder()
//!     .max_attempts(5)
//!     .interval(Duration::from_millis(100))
//!     .backoff_factor(2.0)
//!     .build();
//!
//! let reply = resource
//!     .call_with_retries(
//!         || async { Ok::<_, BrokerError>(42) },
//!         Some(&policy),
//!         None,
//!         true,
//!         true,
//!     )
//!     .await?;
//! assert_eq!(reply, 42);
//! # Ok(())
//! # }
//! ```

mod channel;
mod circuit;
mod events;
mod resource;
mod state;
mod topology;
mod waiter;

pub use channel::{RecoveryChannel, RecoveryStrategy};
pub use circuit::{RecoveryCircuit, WaitOutcome};
pub use events::ResourceEvent;
pub use resource::{RetryableResource, ShutdownListener};
pub use state::{ResourcePhase, ResourceState};
pub use topology::{
    Arguments, Binding, BindingList, ExchangeDeclaration, QueueDeclaration, QueueDeclareOk,
};
pub use waiter::InterruptableWaiter;
