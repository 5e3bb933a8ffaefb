//! Frame construction and parsing for arpspoof-rs
//!
//! - [`ethernet`] - Ethernet II framing
//! - [`arp`] - ARP packets for Ethernet/IPv4
//! - [`builder`] - layered [`FrameBuilder`]
//!
//! [`find_arp`] locates the ARP layer inside a received frame.

pub mod arp;
pub mod builder;
pub mod ethernet;

pub use arp::{ArpOpcode, ArpPacket};
pub use builder::FrameBuilder;
pub use ethernet::{EtherType, EthernetFrame};

use arpspoof_core::Packet;

/// Return the ARP layer of `packet`, if it carries a well-formed one
pub fn find_arp(packet: &Packet) -> Option<ArpPacket> {
    let frame = EthernetFrame::from_bytes(packet.data())?;
    if frame.ethertype != EtherType::ARP {
        return None;
    }

    ArpPacket::parse(&frame.payload).ok()
}
