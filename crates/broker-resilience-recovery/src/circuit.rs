//! The gate separating normal operation from recovery in flight.

use parking_lot::Mutex;
use std::time::Duration;
use tokio::sync::watch;

/// How a wait on a [`RecoveryCircuit`] terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The gate opened (or was already open).
    Opened,
    /// The bound elapsed before the gate opened.
    TimedOut,
    /// The waiters were explicitly interrupted.
    Interrupted,
}

impl WaitOutcome {
    /// True if the gate opened within the wait.
    pub fn opened(self) -> bool {
        matches!(self, WaitOutcome::Opened)
    }
}

#[derive(Debug, Clone, Copy)]
struct Gate {
    closed: bool,
    interrupts: u64,
}

#[derive(Debug, Default)]
struct Owner {
    depth: usize,
    task: Option<tokio::task::Id>,
}

/// A latch-style gate with a reentrant-writer discipline.
///
/// The supervisor closes the circuit while it rebuilds a transport and opens
/// it when recovery completes; callers that observed a transport shutdown
/// wait on the circuit before retrying. The task that closed the gate passes
/// through without blocking, so recovery work can run through the same
/// resource it is recovering.
pub struct RecoveryCircuit {
    owner: Mutex<Owner>,
    gate: watch::Sender<Gate>,
    waiters: watch::Receiver<Gate>,
}

impl RecoveryCircuit {
    /// Creates an open circuit.
    pub fn new() -> Self {
        let (gate, waiters) = watch::channel(Gate {
            closed: false,
            interrupts: 0,
        });
        Self {
            owner: Mutex::new(Owner::default()),
            gate,
            waiters,
        }
    }

    /// Closes the gate. The first close records the calling task as the
    /// owner; further closes by the owner only deepen the nesting.
    pub fn close(&self) {
        let mut owner = self.owner.lock();
        if owner.depth == 0 {
            owner.task = tokio::task::try_id();
            self.gate.send_modify(|gate| gate.closed = true);
        }
        owner.depth += 1;
    }

    /// Unwinds one level of nesting; at depth zero the owner is cleared and
    /// every waiter is released.
    pub fn open(&self) {
        let mut owner = self.owner.lock();
        if owner.depth == 0 {
            return;
        }
        owner.depth -= 1;
        if owner.depth == 0 {
            owner.task = None;
            self.gate.send_modify(|gate| gate.closed = false);
        }
    }

    /// Whether the gate is currently closed.
    pub fn is_closed(&self) -> bool {
        self.waiters.borrow().closed
    }

    /// Suspends until the gate opens or the waiters are interrupted.
    /// Returns immediately when the gate is open or when the calling task
    /// owns the closed gate.
    pub async fn await_open(&self) -> WaitOutcome {
        if self.reenters() {
            return WaitOutcome::Opened;
        }
        let mut waiters = self.waiters.clone();
        let seen = waiters.borrow().interrupts;
        let result = waiters
            .wait_for(|gate| !gate.closed || gate.interrupts != seen)
            .await;
        match result {
            Ok(gate) if !gate.closed => WaitOutcome::Opened,
            _ => WaitOutcome::Interrupted,
        }
    }

    /// Like [`await_open`](Self::await_open), bounded by `timeout`.
    pub async fn await_open_for(&self, timeout: Duration) -> WaitOutcome {
        match tokio::time::timeout(timeout, self.await_open()).await {
            Ok(outcome) => outcome,
            Err(_) => WaitOutcome::TimedOut,
        }
    }

    /// Wakes every waiter with [`WaitOutcome::Interrupted`] without opening
    /// the gate.
    pub fn interrupt_waiters(&self) {
        self.gate.send_modify(|gate| gate.interrupts += 1);
    }

    fn reenters(&self) -> bool {
        let owner = self.owner.lock();
        owner.depth > 0 && owner.task.is_some() && owner.task == tokio::task::try_id()
    }
}

impl Default for RecoveryCircuit {
    fn default() -> Self {
        Self::new()
    }
}
