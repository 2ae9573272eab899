//! Contracts the engine needs from the broker client and from the façade.

use crate::topology::Arguments;
use async_trait::async_trait;
use broker_resilience_core::BrokerError;
use std::sync::Arc;

/// The slice of a broker channel that topology recovery declares through.
///
/// Implemented by the façade over whatever concrete client library it wraps.
#[async_trait]
pub trait RecoveryChannel: Send + Sync {
    /// Binds the `destination` exchange to the `source` exchange.
    async fn exchange_bind(
        &self,
        destination: &str,
        source: &str,
        routing_key: &str,
        arguments: &Arguments,
    ) -> Result<(), BrokerError>;

    /// Binds `queue` to the `exchange`.
    async fn queue_bind(
        &self,
        queue: &str,
        exchange: &str,
        routing_key: &str,
        arguments: &Arguments,
    ) -> Result<(), BrokerError>;
}

/// Capabilities a wrapped connection or channel supplies to its engine.
#[async_trait]
pub trait RecoveryStrategy: Send + Sync {
    /// The channel recovery re-declares topology on: for a connection, a
    /// fresh channel opened on the connection itself; for a channel, an
    /// already-recovered sibling.
    async fn recovery_channel(&self) -> Result<Arc<dyn RecoveryChannel>, BrokerError>;

    /// Whether a failed redeclaration always escalates. Channels typically
    /// escalate so their supervisor restarts recovery; connections log and
    /// move on.
    fn throw_on_recovery_failure(&self) -> bool;

    /// Runs after the resource latches closed.
    fn after_closure(&self) {}
}
