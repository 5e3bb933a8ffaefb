//! ARP spoofing sessions for arpspoof-rs
//!
//! This crate turns two groups of hosts into a running man-in-the-middle
//! position and back:
//!
//! - [`AddressResolver`]: IP to MAC resolution over ARP, with network expansion
//! - [`sanitize`]: repairs the victim/target lists before anything is sent
//! - [`SpoofWorker`]: the background poisoning loop
//! - [`SpoofSession`]: owns the worker; `block` waits, `terminate` restores
//!
//! # Example
//!
//! ```no_run
//! use arpspoof_core::DatalinkLink;
//! use arpspoof_session::{SpoofConfig, SpoofSession};
//! use std::net::Ipv4Addr;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let link = Arc::new(DatalinkLink::open("eth0")?);
//!     let mut session = SpoofSession::launch(
//!         link,
//!         [Ipv4Addr::new(192, 168, 1, 10)],
//!         [Ipv4Addr::new(192, 168, 1, 1)],
//!         &SpoofConfig::default(),
//!     )
//!     .await?;
//!
//!     tokio::signal::ctrl_c().await?;
//!     session.terminate().await?;
//!     Ok(())
//! }
//! ```

pub mod binding;
pub mod config;
pub mod resolver;
pub mod sanity;
pub mod session;
pub mod stats;
pub mod worker;

#[cfg(test)]
mod testing;

pub use binding::{AddressBinding, AddressList};
pub use config::{SpoofConfig, SpoofMode};
pub use resolver::{expand_networks, AddressResolver};
pub use sanity::sanitize;
pub use session::{SessionState, SpoofSession, StopHandle};
pub use stats::{SessionStats, StatsSnapshot};
pub use worker::{forge, OutstandingPackets, SpoofWorker};
