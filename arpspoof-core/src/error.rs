//! Error types for arpspoof-rs

use thiserror::Error;

/// Result type alias for arpspoof operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for arpspoof-rs
#[derive(Error, Debug)]
pub enum Error {
    /// Network I/O error
    #[error("Network I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Protocol-specific error
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Invalid parameter error
    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter { name: String, reason: String },

    /// Interface not found
    #[error("Interface '{0}' not found")]
    InterfaceNotFound(String),

    /// Interface error
    #[error("Interface error: {0}")]
    Interface(String),

    /// Packet construction error
    #[error("Packet construction error: {0}")]
    PacketConstruction(String),

    /// Address lists failed validation before the attack started
    #[error("Sanity check failed: {0}")]
    Sanity(#[from] SanityFailure),

    /// The worker could not be joined or did not acknowledge a stop request
    #[error("Thread control failure: {0}")]
    ThreadControl(String),

    /// The session has already been torn down
    #[error("Session already terminated")]
    SessionClosed,
}

impl Error {
    /// Create a protocol error with a custom message
    pub fn protocol<S: Into<String>>(msg: S) -> Self {
        Error::Protocol(msg.into())
    }

    /// Create a thread control error with a custom message
    pub fn thread_control<S: Into<String>>(msg: S) -> Self {
        Error::ThreadControl(msg.into())
    }

    /// Create an invalid parameter error
    pub fn invalid_parameter<S: Into<String>>(name: S, reason: S) -> Self {
        Error::InvalidParameter {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

/// Reasons an attack cannot be set up from the resolved address lists
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SanityFailure {
    #[error("no host on the target network responded to ARP requests")]
    NoTargetsResponded,

    #[error("no host on the victim network responded to ARP requests")]
    NoVictimsResponded,
}
