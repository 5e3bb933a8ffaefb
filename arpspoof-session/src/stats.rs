//! Session statistics

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters shared between a session and its worker
#[derive(Debug, Default)]
pub struct SessionStats {
    packets_sent: AtomicU64,
    bytes_sent: AtomicU64,
    errors: AtomicU64,
    rounds: AtomicU64,
    corrective_sent: AtomicU64,
}

impl SessionStats {
    pub fn record_sent(&self, bytes: usize) {
        self.packets_sent.fetch_add(1, Ordering::Relaxed);
        self.bytes_sent.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub fn increment_errors(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_rounds(&self) {
        self.rounds.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_corrective(&self) {
        self.corrective_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            packets_sent: self.packets_sent.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            rounds: self.rounds.load(Ordering::Relaxed),
            corrective_sent: self.corrective_sent.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`SessionStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Forged frames put on the wire
    pub packets_sent: u64,
    /// Bytes of forged frames
    pub bytes_sent: u64,
    /// Failed sends, forged or corrective
    pub errors: u64,
    /// Completed poisoning rounds
    pub rounds: u64,
    /// Frames sent while restoring the real bindings
    pub corrective_sent: u64,
}

impl fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} forged packets ({} bytes) in {} rounds, {} corrective, {} errors",
            self.packets_sent, self.bytes_sent, self.rounds, self.corrective_sent, self.errors
        )
    }
}
