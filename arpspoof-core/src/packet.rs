//! Raw frames moving across a [`Link`](crate::Link)

/// One Ethernet frame, header included, tagged with the interface it belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    /// Interface the frame was read from or is meant for
    pub interface: String,
    pub data: Vec<u8>,
}

impl Packet {
    pub fn new(interface: String, data: Vec<u8>) -> Self {
        Self { interface, data }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Frame size in bytes, padding included
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
