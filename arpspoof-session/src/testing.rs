//! In-memory [`Link`] double used by the session tests

use arpspoof_core::{Error, Link, MacAddr, Packet, ReplyMatcher, Result};
use arpspoof_packet::{find_arp, ArpOpcode, ArpPacket, FrameBuilder};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;

pub(crate) const LOCAL_IP: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 9);
pub(crate) const LOCAL_MAC: MacAddr = MacAddr([0xcc; 6]);

/// Records every frame and answers resolution requests from a script
pub(crate) struct MockLink {
    sent: Mutex<Vec<Packet>>,
    hosts: Mutex<HashMap<Ipv4Addr, Packet>>,
    attempts: AtomicU32,
    fail_sends: AtomicBool,
    send_delay: Mutex<Option<Duration>>,
}

impl MockLink {
    pub(crate) fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            hosts: Mutex::new(HashMap::new()),
            attempts: AtomicU32::new(0),
            fail_sends: AtomicBool::new(false),
            send_delay: Mutex::new(None),
        }
    }

    /// Answer requests for `ip` with a proper ARP reply from `mac`
    pub(crate) fn with_host(self, ip: Ipv4Addr, mac: MacAddr) -> Self {
        let reply = FrameBuilder::new()
            .ethernet(mac, LOCAL_MAC)
            .arp(ArpPacket::new_reply(mac, ip, LOCAL_MAC, LOCAL_IP))
            .build("mock0")
            .unwrap();
        self.with_raw_reply(ip, reply)
    }

    /// Answer requests for `ip` with an arbitrary frame
    pub(crate) fn with_raw_reply(self, ip: Ipv4Addr, reply: Packet) -> Self {
        self.hosts.lock().insert(ip, reply);
        self
    }

    pub(crate) fn failing_sends(self) -> Self {
        self.fail_sends.store(true, Ordering::SeqCst);
        self
    }

    /// Make every plain send take `delay`
    pub(crate) fn slow_sends(self, delay: Duration) -> Self {
        *self.send_delay.lock() = Some(delay);
        self
    }

    /// Number of request attempts made through `send_receive`
    pub(crate) fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }

    pub(crate) fn sent(&self) -> Vec<Packet> {
        self.sent.lock().clone()
    }

    /// Sent frames decoded as (ethernet destination, ARP layer)
    pub(crate) fn sent_arp(&self) -> Vec<(MacAddr, ArpPacket)> {
        self.sent
            .lock()
            .iter()
            .filter_map(|packet| {
                let dst = MacAddr::from_slice(&packet.data()[0..6])?;
                Some((dst, find_arp(packet)?))
            })
            .collect()
    }

    /// Frames claiming one of `LOCAL_MAC`'s false bindings
    pub(crate) fn forged(&self) -> Vec<(MacAddr, ArpPacket)> {
        self.sent_arp()
            .into_iter()
            .filter(|(_, arp)| arp.sender_hw_addr == LOCAL_MAC)
            .collect()
    }

    /// Gratuitous frames restoring a real binding
    pub(crate) fn corrective(&self) -> Vec<(MacAddr, ArpPacket)> {
        self.sent_arp()
            .into_iter()
            .filter(|(_, arp)| arp.sender_hw_addr != LOCAL_MAC && arp.is_gratuitous())
            .collect()
    }

    pub(crate) fn count_ops(&self, op: ArpOpcode) -> usize {
        self.sent_arp().iter().filter(|(_, arp)| arp.operation == op).count()
    }
}

#[async_trait]
impl Link for MockLink {
    fn name(&self) -> &str {
        "mock0"
    }

    fn local_ipv4(&self) -> Result<Ipv4Addr> {
        Ok(LOCAL_IP)
    }

    fn local_mac(&self) -> Result<MacAddr> {
        Ok(LOCAL_MAC)
    }

    async fn send(&self, packet: &Packet) -> Result<()> {
        let delay = *self.send_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(Error::Interface("mock send failure".to_string()));
        }
        self.sent.lock().push(packet.clone());
        Ok(())
    }

    async fn send_receive(
        &self,
        packet: &Packet,
        retries: u32,
        _timeout: Duration,
        matcher: ReplyMatcher,
    ) -> Result<Option<Packet>> {
        let target = find_arp(packet).map(|arp| arp.target_proto_addr);

        for _ in 0..retries {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            self.sent.lock().push(packet.clone());

            let reply = target.and_then(|ip| self.hosts.lock().get(&ip).cloned());
            if let Some(reply) = reply {
                if matcher(&reply) {
                    return Ok(Some(reply));
                }
            }
        }

        Ok(None)
    }
}
