//! The retryable-resource engine.

use crate::channel::RecoveryStrategy;
use crate::circuit::{RecoveryCircuit, WaitOutcome};
use crate::events::ResourceEvent;
use crate::state::{ResourcePhase, ResourceState};
use crate::topology::{BindingList, ExchangeDeclaration, QueueDeclaration};
use crate::waiter::InterruptableWaiter;
use broker_resilience_core::{BrokerError, EventListeners, ShutdownSignal};
use parking_lot::Mutex;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

#[cfg(feature = "tracing")]
use tracing::{debug, error, info};

use broker_resilience_retry::{RetryPolicy, RetryStats};

/// Callback registered for shutdown notifications on a wrapped resource.
pub type ShutdownListener = Arc<dyn Fn(&ShutdownSignal) + Send + Sync>;

/// A resource which supports invocation retries and failure recovery.
///
/// One engine backs each wrapped connection or channel. It executes caller
/// operations with retries, arbitrates with the recovery circuit while a
/// replacement transport is rebuilt, and replays the resource's declared
/// topology against a freshly obtained channel.
pub struct RetryableResource {
    label: String,
    strategy: Arc<dyn RecoveryStrategy>,
    circuit: RecoveryCircuit,
    retry_waiter: InterruptableWaiter,
    shutdown_listeners: Mutex<Vec<ShutdownListener>>,
    state: ResourceState,
    closed: AtomicBool,
    events: EventListeners<ResourceEvent>,
}

impl RetryableResource {
    /// Creates an engine for the resource identified by `label`.
    pub fn new(label: impl Into<String>, strategy: Arc<dyn RecoveryStrategy>) -> Self {
        Self {
            label: label.into(),
            strategy,
            circuit: RecoveryCircuit::new(),
            retry_waiter: InterruptableWaiter::new(),
            shutdown_listeners: Mutex::new(Vec::new()),
            state: ResourceState::new(),
            closed: AtomicBool::new(false),
            events: EventListeners::new(),
        }
    }

    /// Registers an event listener. Listeners are registered before the
    /// engine is shared with callers.
    pub fn add_event_listener<F>(&mut self, listener: F)
    where
        F: Fn(&ResourceEvent) + Send + Sync + 'static,
    {
        self.events.add(listener);
    }

    /// The label the façade chose for this resource.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// The circuit gating callers while recovery is in flight.
    pub fn circuit(&self) -> &RecoveryCircuit {
        &self.circuit
    }

    /// The resource's lifecycle phase.
    pub fn phase(&self) -> ResourcePhase {
        self.state.phase()
    }

    /// Whether the resource has latched closed.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Calls `operation` with retries, surfacing the last failure once
    /// retries are exhausted.
    ///
    /// `policy` bounds the retries; `None` disables them. `stats` carries
    /// accounting across calls when this invocation runs inside a recovery
    /// pass; a fresh invocation passes `None` and accounting starts on the
    /// first failure. `recoverable` says whether this resource's recovery
    /// absorbs its transport loss; when it does, a caller that observed a
    /// shutdown waits on the circuit for the supervisor to finish rebuilding
    /// before it retries.
    ///
    /// The caller's original failure is always the one surfaced: wait
    /// timeouts, interruptions, and closure during a wait re-raise it
    /// unchanged.
    pub async fn call_with_retries<T, F, Fut>(
        &self,
        mut operation: F,
        policy: Option<&RetryPolicy>,
        mut stats: Option<&mut RetryStats>,
        recoverable: bool,
        log_failures: bool,
    ) -> Result<T, BrokerError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, BrokerError>>,
    {
        let recovery = stats.is_some();
        let mut local_stats: Option<RetryStats> = None;

        loop {
            let error = match operation().await {
                Ok(value) => return Ok(value),
                Err(error) => error,
            };

            let signal = error.shutdown_signal().cloned();
            let allows_attempts = policy.is_some_and(RetryPolicy::allows_attempts);

            if signal.is_none() && log_failures && allows_attempts {
                #[cfg(feature = "tracing")]
                error!(resource = %self.label, error = %error, "Invocation failed");
                self.events
                    .emit(&ResourceEvent::AttemptFailed { error: error.clone() });
            }

            // A shutdown observed while already recovering, or on a resource
            // that is not recovered, belongs to the caller.
            if signal.is_some() && (recovery || !recoverable) {
                return Err(error);
            }
            if self.is_closed() {
                return Err(error);
            }

            let Some(policy) = policy else {
                return Err(error);
            };
            if !policy.allows_attempts()
                || !error.is_retryable(policy.retry_authentication_failures())
            {
                return Err(error);
            }

            let attempt_start = Instant::now();
            let stats: &mut RetryStats = match stats.as_deref_mut() {
                Some(shared) => shared,
                None => local_stats.get_or_insert_with(|| RetryStats::new(policy.clone())),
            };

            if signal.is_some() {
                let outcome = match stats.max_wait_time() {
                    None => self.circuit.await_open().await,
                    Some(budget) => self.circuit.await_open_for(budget).await,
                };
                match outcome {
                    WaitOutcome::Opened => {}
                    WaitOutcome::TimedOut => {
                        #[cfg(feature = "tracing")]
                        debug!(
                            resource = %self.label,
                            "Exceeded max wait time waiting for recovery"
                        );
                        return Err(error);
                    }
                    WaitOutcome::Interrupted => return Err(error),
                }
            }

            stats.increment_attempts();
            if stats.is_policy_exceeded() {
                return Err(error);
            }

            let remaining = stats.wait_time().saturating_sub(attempt_start.elapsed());
            self.events.emit(&ResourceEvent::RetryScheduled {
                attempt: stats.attempts(),
                delay: remaining,
            });
            if !remaining.is_zero() {
                self.retry_waiter.wait_for(remaining).await;
            }
            if self.is_closed() {
                return Err(error);
            }
        }
    }

    /// Runs the delegate's close (or abort) and, regardless of its outcome,
    /// latches the resource closed, runs the closure hook, and wakes every
    /// blocked caller so it observes the closure. Idempotent.
    pub async fn on_close<F>(&self, delegate: F) -> Result<(), BrokerError>
    where
        F: Future<Output = Result<(), BrokerError>>,
    {
        let result = delegate.await;
        if !self.closed.swap(true, Ordering::AcqRel) {
            self.state.mark_closed();
            self.strategy.after_closure();
            self.interrupt_waiters();
            self.events.emit(&ResourceEvent::Closed);
            #[cfg(feature = "tracing")]
            debug!(resource = %self.label, "Closed");
        }
        result
    }

    /// Registers a shutdown listener. Registrations live on the engine, not
    /// the delegate, so they survive transport replacement.
    pub fn add_shutdown_listener(&self, listener: ShutdownListener) {
        self.shutdown_listeners.lock().push(listener);
    }

    /// Removes a previously registered shutdown listener.
    pub fn remove_shutdown_listener(&self, listener: &ShutdownListener) {
        let mut listeners = self.shutdown_listeners.lock();
        if let Some(position) = listeners.iter().position(|l| Arc::ptr_eq(l, listener)) {
            listeners.remove(position);
        }
    }

    /// A snapshot of the registered shutdown listeners, for replay onto a
    /// recovered transport.
    pub fn shutdown_listeners(&self) -> Vec<ShutdownListener> {
        self.shutdown_listeners.lock().clone()
    }

    /// Dispatches `signal` to every registered shutdown listener.
    pub fn notify_shutdown(&self, signal: &ShutdownSignal) {
        for listener in self.shutdown_listeners() {
            listener(signal);
        }
    }

    /// Wakes every caller blocked on the circuit or the retry waiter.
    pub fn interrupt_waiters(&self) {
        self.circuit.interrupt_waiters();
        self.retry_waiter.interrupt_waiters();
    }

    /// Closes the circuit and marks the resource recovering. Callers that
    /// observe a shutdown from here on wait for
    /// [`finish_recovery`](Self::finish_recovery). No-op on a closed
    /// resource; returns whether the transition happened.
    pub fn begin_recovery(&self) -> bool {
        if self.is_closed() {
            return false;
        }
        if self.state.mark_recovering() {
            self.circuit.close();
            true
        } else {
            false
        }
    }

    /// Marks the resource operational again and opens the circuit, releasing
    /// every gated caller. Returns whether the transition happened.
    pub fn finish_recovery(&self) -> bool {
        if self.state.mark_operational() {
            self.circuit.open();
            true
        } else {
            false
        }
    }

    /// Redeclares an exchange on the recovery channel.
    ///
    /// A failure is re-raised when this resource escalates recovery failures
    /// or when the failure itself was caused by a connection-level closure
    /// (the supervisor must then restart recovery from the top); otherwise it
    /// is logged and swallowed.
    pub async fn recover_exchange(
        &self,
        name: &str,
        declaration: &ExchangeDeclaration,
    ) -> Result<(), BrokerError> {
        #[cfg(feature = "tracing")]
        info!(exchange = name, resource = %self.label, "Recovering exchange");

        let attempt = async {
            let channel = self.strategy.recovery_channel().await?;
            declaration.invoke(channel).await
        };
        match attempt.await {
            Ok(()) => {
                self.events.emit(&ResourceEvent::ExchangeRecovered {
                    name: name.to_string(),
                });
                Ok(())
            }
            Err(cause) => {
                #[cfg(feature = "tracing")]
                error!(
                    exchange = name,
                    resource = %self.label,
                    error = %cause,
                    "Failed to recover exchange"
                );
                self.recovery_failure(name, cause)
            }
        }
    }

    /// Re-establishes exchange-to-exchange bindings, in insertion order.
    /// Bindings that fail without escalation are skipped, not removed.
    pub async fn recover_exchange_bindings(
        &self,
        bindings: &BindingList,
    ) -> Result<(), BrokerError> {
        for binding in bindings.snapshot() {
            #[cfg(feature = "tracing")]
            info!(
                source = %binding.source,
                destination = %binding.destination,
                routing_key = %binding.routing_key,
                resource = %self.label,
                "Recovering exchange binding"
            );

            let attempt = async {
                let channel = self.strategy.recovery_channel().await?;
                channel
                    .exchange_bind(
                        &binding.destination,
                        &binding.source,
                        &binding.routing_key,
                        &binding.arguments,
                    )
                    .await
            };
            match attempt.await {
                Ok(()) => self.events.emit(&ResourceEvent::BindingRecovered {
                    source: binding.source.clone(),
                    destination: binding.destination.clone(),
                }),
                Err(cause) => {
                    #[cfg(feature = "tracing")]
                    error!(
                        source = %binding.source,
                        destination = %binding.destination,
                        routing_key = %binding.routing_key,
                        resource = %self.label,
                        error = %cause,
                        "Failed to recover exchange binding"
                    );
                    self.recovery_failure(&binding.destination, cause)?;
                }
            }
        }
        Ok(())
    }

    /// Redeclares a queue on the recovery channel and returns its effective
    /// name.
    ///
    /// When the broker assigns a different name (server-named queues), the
    /// declaration is updated so subsequent bindings and consumers target
    /// the new name. On a swallowed failure the original name is returned
    /// and the declaration is left unchanged.
    pub async fn recover_queue(
        &self,
        name: &str,
        declaration: &QueueDeclaration,
    ) -> Result<String, BrokerError> {
        let attempt = async {
            let channel = self.strategy.recovery_channel().await?;
            declaration.invoke(channel).await
        };
        match attempt.await {
            Ok(reply) => {
                let new_name = reply.queue;
                if new_name == name {
                    #[cfg(feature = "tracing")]
                    info!(queue = name, resource = %self.label, "Recovered queue");
                } else {
                    #[cfg(feature = "tracing")]
                    info!(
                        queue = name,
                        renamed = %new_name,
                        resource = %self.label,
                        "Recovered queue under server-assigned name"
                    );
                    declaration.set_name(new_name.clone());
                }
                self.events.emit(&ResourceEvent::QueueRecovered {
                    name: name.to_string(),
                    new_name: new_name.clone(),
                });
                Ok(new_name)
            }
            Err(cause) => {
                #[cfg(feature = "tracing")]
                error!(
                    queue = name,
                    resource = %self.label,
                    error = %cause,
                    "Failed to recover queue"
                );
                self.recovery_failure(name, cause)?;
                Ok(name.to_string())
            }
        }
    }

    /// Re-establishes queue bindings, in insertion order. Bindings that fail
    /// without escalation are skipped, not removed.
    pub async fn recover_queue_bindings(&self, bindings: &BindingList) -> Result<(), BrokerError> {
        for binding in bindings.snapshot() {
            #[cfg(feature = "tracing")]
            info!(
                source = %binding.source,
                destination = %binding.destination,
                routing_key = %binding.routing_key,
                resource = %self.label,
                "Recovering queue binding"
            );

            let attempt = async {
                let channel = self.strategy.recovery_channel().await?;
                channel
                    .queue_bind(
                        &binding.destination,
                        &binding.source,
                        &binding.routing_key,
                        &binding.arguments,
                    )
                    .await
            };
            match attempt.await {
                Ok(()) => self.events.emit(&ResourceEvent::BindingRecovered {
                    source: binding.source.clone(),
                    destination: binding.destination.clone(),
                }),
                Err(cause) => {
                    #[cfg(feature = "tracing")]
                    error!(
                        source = %binding.source,
                        destination = %binding.destination,
                        routing_key = %binding.routing_key,
                        resource = %self.label,
                        error = %cause,
                        "Failed to recover queue binding"
                    );
                    self.recovery_failure(&binding.destination, cause)?;
                }
            }
        }
        Ok(())
    }

    fn recovery_failure(&self, subject: &str, cause: BrokerError) -> Result<(), BrokerError> {
        self.events.emit(&ResourceEvent::RecoveryFailed {
            subject: subject.to_string(),
            error: cause.clone(),
        });
        if self.strategy.throw_on_recovery_failure() || cause.is_caused_by_connection_closure() {
            Err(cause)
        } else {
            Ok(())
        }
    }
}

impl std::fmt::Debug for RetryableResource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryableResource")
            .field("label", &self.label)
            .field("phase", &self.state.phase())
            .field("circuit_closed", &self.circuit.is_closed())
            .finish()
    }
}
