//! Declared topology: bindings and replayable declarations.

use crate::channel::RecoveryChannel;
use broker_resilience_core::BrokerError;
use futures::future::BoxFuture;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Free-form argument table attached to declarations and bindings.
pub type Arguments = HashMap<String, serde_json::Value>;

/// A declared binding between two exchanges, or between an exchange and a
/// queue.
#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    /// Source exchange.
    pub source: String,
    /// Destination exchange or queue.
    pub destination: String,
    /// Routing key the binding matches on.
    pub routing_key: String,
    /// Broker-specific binding arguments.
    pub arguments: Arguments,
}

impl Binding {
    /// Creates a binding with empty arguments.
    pub fn new(
        source: impl Into<String>,
        destination: impl Into<String>,
        routing_key: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
            routing_key: routing_key.into(),
            arguments: Arguments::new(),
        }
    }

    /// Attaches arguments.
    pub fn with_arguments(mut self, arguments: Arguments) -> Self {
        self.arguments = arguments;
        self
    }
}

/// An insertion-ordered binding registry.
///
/// The façade mutates the list as the application declares and removes
/// bindings; recovery iterates a snapshot taken under the list's own lock,
/// so it never races a concurrent mutation.
#[derive(Default)]
pub struct BindingList {
    bindings: Mutex<Vec<Binding>>,
}

impl BindingList {
    /// Creates an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a binding.
    pub fn add(&self, binding: Binding) {
        self.bindings.lock().push(binding);
    }

    /// Removes the first binding equal to `binding`, if any.
    pub fn remove(&self, binding: &Binding) {
        let mut bindings = self.bindings.lock();
        if let Some(position) = bindings.iter().position(|b| b == binding) {
            bindings.remove(position);
        }
    }

    /// A copy of the current bindings, in insertion order.
    pub fn snapshot(&self) -> Vec<Binding> {
        self.bindings.lock().clone()
    }

    /// Number of bindings.
    pub fn len(&self) -> usize {
        self.bindings.lock().len()
    }

    /// True when no bindings are declared.
    pub fn is_empty(&self) -> bool {
        self.bindings.lock().is_empty()
    }
}

/// Reply to a queue declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueDeclareOk {
    /// The queue's effective name; server-assigned for anonymous queues.
    pub queue: String,
    /// Messages currently ready in the queue.
    pub message_count: u32,
    /// Consumers currently attached to the queue.
    pub consumer_count: u32,
}

type DeclareFn<R> =
    Arc<dyn Fn(Arc<dyn RecoveryChannel>) -> BoxFuture<'static, Result<R, BrokerError>> + Send + Sync>;

/// A captured exchange declaration, replayable against a fresh channel.
pub struct ExchangeDeclaration {
    name: String,
    declare: DeclareFn<()>,
}

impl ExchangeDeclaration {
    /// Captures a declaration for the exchange `name`.
    pub fn new<F, Fut>(name: impl Into<String>, declare: F) -> Self
    where
        F: Fn(Arc<dyn RecoveryChannel>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), BrokerError>> + Send + 'static,
    {
        Self {
            name: name.into(),
            declare: Arc::new(move |channel| Box::pin(declare(channel))),
        }
    }

    /// The declared exchange name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Replays the declaration on `channel`.
    pub async fn invoke(&self, channel: Arc<dyn RecoveryChannel>) -> Result<(), BrokerError> {
        (self.declare)(channel).await
    }
}

impl fmt::Debug for ExchangeDeclaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExchangeDeclaration")
            .field("name", &self.name)
            .finish()
    }
}

/// A captured queue declaration, replayable against a fresh channel.
///
/// The name is mutable: when the broker assigns a new name to a
/// server-named queue during recovery, the declaration is updated so
/// subsequent bindings and consumers target the new name.
pub struct QueueDeclaration {
    name: Mutex<String>,
    declare: DeclareFn<QueueDeclareOk>,
}

impl QueueDeclaration {
    /// Captures a declaration for the queue `name` (possibly empty, for
    /// server-named queues).
    pub fn new<F, Fut>(name: impl Into<String>, declare: F) -> Self
    where
        F: Fn(Arc<dyn RecoveryChannel>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<QueueDeclareOk, BrokerError>> + Send + 'static,
    {
        Self {
            name: Mutex::new(name.into()),
            declare: Arc::new(move |channel| Box::pin(declare(channel))),
        }
    }

    /// The queue's current name.
    pub fn name(&self) -> String {
        self.name.lock().clone()
    }

    /// Replaces the queue's name.
    pub fn set_name(&self, name: impl Into<String>) {
        *self.name.lock() = name.into();
    }

    /// Replays the declaration on `channel`.
    pub async fn invoke(
        &self,
        channel: Arc<dyn RecoveryChannel>,
    ) -> Result<QueueDeclareOk, BrokerError> {
        (self.declare)(channel).await
    }
}

impl fmt::Debug for QueueDeclaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueueDeclaration")
            .field("name", &self.name.lock())
            .finish()
    }
}
