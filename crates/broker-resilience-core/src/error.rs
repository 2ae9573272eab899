//! Error taxonomy for wrapped broker operations.
//!
//! Broker client libraries surface transport loss, socket failures, and
//! credential problems through a zoo of concrete error types. At the boundary
//! with the client library those are re-tagged into [`BrokerError`], a typed
//! discriminant the retry engine can classify without any runtime-type
//! search.

use std::fmt;
use thiserror::Error;

/// Reply codes on a channel-level closure that indicate a transient
/// condition. Everything else (403 access-refused, 404 not-found, 406
/// precondition-failed, ...) reflects a usage error and is not worth
/// retrying.
const RECOVERABLE_CHANNEL_REPLY_CODES: &[u16] = &[311, 320, 405];

/// The error value a broker client raises when a connection or channel is
/// torn down underneath the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShutdownSignal {
    /// Protocol reply code carried by the close frame.
    pub reply_code: u16,
    /// True for connection-level closure, false for channel-level.
    pub hard_error: bool,
    /// Reply text carried by the close frame.
    pub message: String,
}

impl ShutdownSignal {
    /// A connection-level shutdown.
    pub fn connection(reply_code: u16, message: impl Into<String>) -> Self {
        Self {
            reply_code,
            hard_error: true,
            message: message.into(),
        }
    }

    /// A channel-level shutdown.
    pub fn channel(reply_code: u16, message: impl Into<String>) -> Self {
        Self {
            reply_code,
            hard_error: false,
            message: message.into(),
        }
    }

    /// Whether this closure is worth retrying once the transport is rebuilt.
    ///
    /// Connection-level closures always are; channel-level closures only for
    /// the transient reply codes.
    pub fn is_recoverable(&self) -> bool {
        self.hard_error || RECOVERABLE_CHANNEL_REPLY_CODES.contains(&self.reply_code)
    }
}

impl fmt::Display for ShutdownSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scope = if self.hard_error {
            "connection"
        } else {
            "channel"
        };
        write!(f, "{} shutdown ({}): {}", scope, self.reply_code, self.message)
    }
}

/// Errors surfaced by wrapped broker operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BrokerError {
    /// The transport or channel was closed underneath the operation.
    #[error("{0}")]
    Shutdown(ShutdownSignal),

    /// Socket-level read or write failure.
    #[error("i/o error: {0}")]
    Io(String),

    /// The broker rejected the client's credentials.
    #[error("authentication failure: {0}")]
    Authentication(String),

    /// A programming error in the calling application, such as a bad
    /// exchange type or malformed arguments. Never retried.
    #[error("{0}")]
    Application(String),
}

impl BrokerError {
    /// The shutdown signal, if this failure was caused by transport loss.
    pub fn shutdown_signal(&self) -> Option<&ShutdownSignal> {
        match self {
            BrokerError::Shutdown(signal) => Some(signal),
            _ => None,
        }
    }

    /// Whether this failure was caused by a connection-level closure, in
    /// which case a supervisor must restart recovery from the top.
    pub fn is_caused_by_connection_closure(&self) -> bool {
        matches!(self, BrokerError::Shutdown(signal) if signal.hard_error)
    }

    /// Whether this failure is on the retryable set: connection shutdowns,
    /// channel shutdowns with a recoverable reply code, I/O errors, and
    /// authentication failures when `retry_authentication` is set.
    pub fn is_retryable(&self, retry_authentication: bool) -> bool {
        match self {
            BrokerError::Shutdown(signal) => signal.is_recoverable(),
            BrokerError::Io(_) => true,
            BrokerError::Authentication(_) => retry_authentication,
            BrokerError::Application(_) => false,
        }
    }
}
