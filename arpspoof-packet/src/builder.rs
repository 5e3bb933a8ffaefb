//! Layered frame builder
//!
//! Frames are assembled by pushing an Ethernet layer and an ARP layer, then
//! building a [`Packet`] tagged with the interface it is meant for.

use crate::arp::ArpPacket;
use crate::ethernet::{EtherType, EthernetFrame};
use arpspoof_core::{Error, MacAddr, Packet, Result};

#[derive(Debug, Clone, Copy)]
struct EthernetLayer {
    src: MacAddr,
    dst: MacAddr,
}

/// Builder for Ethernet + ARP frames
///
/// # Examples
///
/// ```
/// use std::net::Ipv4Addr;
/// use arpspoof_core::MacAddr;
/// use arpspoof_packet::{ArpPacket, FrameBuilder};
///
/// let mine = MacAddr([0x00, 0x11, 0x22, 0x33, 0x44, 0x55]);
/// let packet = FrameBuilder::new()
///     .ethernet(mine, MacAddr::broadcast())
///     .arp(ArpPacket::new_request(
///         mine,
///         Ipv4Addr::new(192, 168, 1, 10),
///         Ipv4Addr::new(192, 168, 1, 1),
///     ))
///     .build("eth0")
///     .unwrap();
///
/// assert_eq!(packet.len(), 60);
/// ```
#[derive(Debug, Clone, Default)]
pub struct FrameBuilder {
    ethernet: Option<EthernetLayer>,
    arp: Option<ArpPacket>,
}

impl FrameBuilder {
    /// Create an empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Push the Ethernet layer
    pub fn ethernet(mut self, src: MacAddr, dst: MacAddr) -> Self {
        self.ethernet = Some(EthernetLayer { src, dst });
        self
    }

    /// Push the ARP layer
    pub fn arp(mut self, arp: ArpPacket) -> Self {
        self.arp = Some(arp);
        self
    }

    /// Serialize all layers into a packet for `interface`
    pub fn build(self, interface: &str) -> Result<Packet> {
        let ethernet = self
            .ethernet
            .ok_or_else(|| Error::PacketConstruction("Ethernet layer missing".to_string()))?;
        let arp = self
            .arp
            .ok_or_else(|| Error::PacketConstruction("ARP layer missing".to_string()))?;

        let frame = EthernetFrame::new(ethernet.dst, ethernet.src, EtherType::ARP, arp.serialize());

        Ok(Packet::new(interface.to_string(), frame.to_bytes()))
    }
}
