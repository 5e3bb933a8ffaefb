//! Link-layer transport used by the resolver, the worker and teardown
//!
//! `Link` is the seam between the attack logic and the wire. The production
//! implementation, [`DatalinkLink`], drives a pnet datalink channel; tests
//! substitute an in-memory double.

use crate::interface::find_datalink;
use crate::{Error, Interface, MacAddr, Packet, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use pnet_datalink::{Channel, Config, DataLinkReceiver, DataLinkSender};
use std::io::ErrorKind;
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// Predicate deciding whether a received frame answers the frame just sent
pub type ReplyMatcher = Arc<dyn Fn(&Packet) -> bool + Send + Sync>;

/// How long a single blocking read may wait before the deadline is re-checked
const RX_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Send/receive primitive bound to one network interface
#[async_trait]
pub trait Link: Send + Sync {
    /// Interface name, used to tag constructed packets
    fn name(&self) -> &str;

    /// IPv4 address of this host on the interface
    fn local_ipv4(&self) -> Result<Ipv4Addr>;

    /// MAC address of this host on the interface
    fn local_mac(&self) -> Result<MacAddr>;

    /// Send a frame without waiting for anything back
    async fn send(&self, packet: &Packet) -> Result<()>;

    /// Send a frame and wait for a reply accepted by `matcher`
    ///
    /// The frame is sent up to `retries` times; after each send the link
    /// waits at most `timeout` for a matching frame. Returns `Ok(None)` once
    /// every attempt has expired.
    async fn send_receive(
        &self,
        packet: &Packet,
        retries: u32,
        timeout: Duration,
        matcher: ReplyMatcher,
    ) -> Result<Option<Packet>>;
}

/// [`Link`] backed by a pnet datalink channel
pub struct DatalinkLink {
    interface: Interface,
    tx: Arc<Mutex<Box<dyn DataLinkSender>>>,
    rx: Arc<Mutex<Box<dyn DataLinkReceiver>>>,
}

impl DatalinkLink {
    /// Open an Ethernet channel on the named interface
    pub fn open(name: &str) -> Result<Self> {
        let datalink = find_datalink(name)?;
        let interface = Interface::from(&datalink);

        if interface.is_loopback {
            return Err(Error::Interface(format!("Interface '{}' is a loopback device", name)));
        }

        if !interface.is_up {
            return Err(Error::Interface(format!("Interface '{}' is not up", name)));
        }

        let config = Config {
            read_timeout: Some(RX_POLL_INTERVAL),
            ..Default::default()
        };

        let (tx, rx) = match pnet_datalink::channel(&datalink, config) {
            Ok(Channel::Ethernet(tx, rx)) => (tx, rx),
            Ok(_) => return Err(Error::Interface("Unsupported channel type".to_string())),
            Err(e) => return Err(Error::Interface(format!("Failed to create channel: {}", e))),
        };

        debug!(interface = %interface, "Opened datalink channel");

        Ok(Self {
            interface,
            tx: Arc::new(Mutex::new(tx)),
            rx: Arc::new(Mutex::new(rx)),
        })
    }

    /// The interface this link is bound to
    pub fn interface(&self) -> &Interface {
        &self.interface
    }
}

fn send_frame(tx: &Mutex<Box<dyn DataLinkSender>>, data: &[u8]) -> Result<()> {
    tx.lock()
        .send_to(data, None)
        .ok_or_else(|| Error::Interface("Failed to send packet".to_string()))?
        .map_err(|e| Error::Interface(format!("Send error: {}", e)))
}

#[async_trait]
impl Link for DatalinkLink {
    fn name(&self) -> &str {
        &self.interface.name
    }

    fn local_ipv4(&self) -> Result<Ipv4Addr> {
        self.interface.get_ipv4().ok_or_else(|| {
            Error::Interface(format!("Interface {} has no IPv4 address", self.interface.name))
        })
    }

    fn local_mac(&self) -> Result<MacAddr> {
        if self.interface.mac_address == MacAddr::zero() {
            return Err(Error::Interface(format!(
                "Interface {} has no MAC address",
                self.interface.name
            )));
        }
        Ok(self.interface.mac_address)
    }

    async fn send(&self, packet: &Packet) -> Result<()> {
        send_frame(&self.tx, packet.data())?;
        trace!(interface = %self.interface.name, size = packet.len(), "Frame sent");
        Ok(())
    }

    async fn send_receive(
        &self,
        packet: &Packet,
        retries: u32,
        timeout: Duration,
        matcher: ReplyMatcher,
    ) -> Result<Option<Packet>> {
        let tx = Arc::clone(&self.tx);
        let rx = Arc::clone(&self.rx);
        let data = packet.data().to_vec();
        let name = self.interface.name.clone();

        // pnet receivers block, so the whole exchange runs off the async workers
        tokio::task::spawn_blocking(move || {
            let mut rx = rx.lock();

            for attempt in 1..=retries {
                send_frame(&tx, &data)?;
                trace!(interface = %name, attempt, "Request sent, waiting for reply");

                let deadline = Instant::now() + timeout;
                while Instant::now() < deadline {
                    match rx.next() {
                        Ok(frame) => {
                            let reply = Packet::new(name.clone(), frame.to_vec());
                            if matcher(&reply) {
                                return Ok(Some(reply));
                            }
                        }
                        Err(e) if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock) => {}
                        Err(e) => return Err(Error::Io(e)),
                    }
                }
            }

            Ok(None)
        })
        .await
        .map_err(|e| Error::thread_control(format!("Receive task failed: {}", e)))?
    }
}
