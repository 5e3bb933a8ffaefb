//! Session configuration

use arpspoof_core::{Error, Result};
use arpspoof_packet::ArpOpcode;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Default pause between two poisoning rounds
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(1);

/// Default number of ARP requests sent while resolving one host
pub const DEFAULT_RESOLVE_RETRIES: u32 = 2;

/// Default wait for a reply after each resolution request
pub const DEFAULT_RESOLVE_TIMEOUT: Duration = Duration::from_secs(3);

/// Default bound on how long teardown waits for the worker to acknowledge a stop
pub const DEFAULT_STOP_TIMEOUT: Duration = Duration::from_secs(5);

/// Which ARP operation is forged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SpoofMode {
    /// Poison with ARP requests
    Request,
    /// Poison with unsolicited ARP replies
    #[default]
    Reply,
}

impl SpoofMode {
    pub fn opcode(self) -> ArpOpcode {
        match self {
            SpoofMode::Request => ArpOpcode::Request,
            SpoofMode::Reply => ArpOpcode::Reply,
        }
    }
}

impl fmt::Display for SpoofMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.opcode(), f)
    }
}

impl FromStr for SpoofMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "request" => Ok(SpoofMode::Request),
            "reply" => Ok(SpoofMode::Reply),
            _ => Err(Error::invalid_parameter(
                "mode".to_string(),
                format!("'{}' is neither 'request' nor 'reply'", s),
            )),
        }
    }
}

/// Tunables for one spoofing session
#[derive(Debug, Clone)]
pub struct SpoofConfig {
    /// ARP operation used for poisoning and for restoring tables
    pub mode: SpoofMode,
    /// Pause between poisoning rounds
    pub interval: Duration,
    /// Requests sent per host during resolution
    pub resolve_retries: u32,
    /// Reply wait after each resolution request
    pub resolve_timeout: Duration,
    /// Stop acknowledgment bound during teardown
    pub stop_timeout: Duration,
}

impl Default for SpoofConfig {
    fn default() -> Self {
        Self {
            mode: SpoofMode::default(),
            interval: DEFAULT_INTERVAL,
            resolve_retries: DEFAULT_RESOLVE_RETRIES,
            resolve_timeout: DEFAULT_RESOLVE_TIMEOUT,
            stop_timeout: DEFAULT_STOP_TIMEOUT,
        }
    }
}

impl SpoofConfig {
    pub fn with_mode(mut self, mode: SpoofMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_resolve_retries(mut self, retries: u32) -> Self {
        self.resolve_retries = retries;
        self
    }

    pub fn with_resolve_timeout(mut self, timeout: Duration) -> Self {
        self.resolve_timeout = timeout;
        self
    }

    pub fn with_stop_timeout(mut self, timeout: Duration) -> Self {
        self.stop_timeout = timeout;
        self
    }

    /// Reject settings that would make resolution or teardown meaningless
    pub fn validate(&self) -> Result<()> {
        if self.resolve_retries == 0 {
            return Err(Error::invalid_parameter(
                "resolve_retries",
                "at least one request must be sent",
            ));
        }
        if self.resolve_timeout.is_zero() {
            return Err(Error::invalid_parameter(
                "resolve_timeout",
                "must be greater than zero",
            ));
        }
        if self.stop_timeout.is_zero() {
            return Err(Error::invalid_parameter(
                "stop_timeout",
                "must be greater than zero",
            ));
        }
        Ok(())
    }
}
