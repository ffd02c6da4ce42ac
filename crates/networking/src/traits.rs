// Path: crates/networking/src/traits.rs
//! The high-level state and error types the overlay transport exposes,
//! independent of any one swarm implementation.

/// An error type for overlay transport operations.
#[derive(thiserror::Error, Debug)]
pub enum OverlayError {
    /// The swarm command channel is gone -- the network task has stopped.
    #[error("overlay network error: {0}")]
    Network(String),
    /// A message failed to encode or decode.
    #[error("overlay codec error: {0}")]
    Decode(String),
    /// An internal task failure (panic, join error).
    #[error("internal error: {0}")]
    Internal(String),
}

/// The high-level connectivity state of the overlay transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    /// The swarm is starting up; no peers are known yet.
    Initializing,
    /// At least one peer connection is established.
    Connected,
    /// No peer connections are currently established.
    Disconnected,
}
