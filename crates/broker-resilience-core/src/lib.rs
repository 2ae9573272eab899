//! Core infrastructure for broker-resilience.
//!
//! This crate provides the pieces shared by the retry and recovery crates:
//! - The error taxonomy wrapped broker operations surface, including the
//!   distinguished shutdown signal raised on transport loss
//! - A small event-listener collection for observability

pub mod error;
pub mod events;

pub use error::{BrokerError, ShutdownSignal};
pub use events::EventListeners;
