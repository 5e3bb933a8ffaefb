//! arpspoof-rs core library
//!
//! Fundamental types, error handling and the link abstraction shared by
//! the packet, session and CLI crates.

pub mod error;
pub mod interface;
pub mod link;
pub mod packet;
pub mod types;

// Re-export commonly used types
pub use error::{Error, Result, SanityFailure};
pub use interface::Interface;
pub use link::{DatalinkLink, Link, ReplyMatcher};
pub use packet::Packet;
pub use types::*;
