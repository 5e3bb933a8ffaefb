//! IP/MAC bindings and the per-side address lists

use arpspoof_core::MacAddr;
use std::fmt;
use std::net::Ipv4Addr;

/// A resolved host: an IPv4 address and the MAC that owns it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AddressBinding {
    pub ip: Ipv4Addr,
    pub mac: MacAddr,
}

impl AddressBinding {
    pub fn new(ip: Ipv4Addr, mac: MacAddr) -> Self {
        Self { ip, mac }
    }
}

impl fmt::Display for AddressBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IP : {} ; MAC : {}", self.ip, self.mac)
    }
}

/// Ordered bindings for one side of the attack (victims or targets)
///
/// A MAC appears at most once. Order is resolution order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressList {
    bindings: Vec<AddressBinding>,
}

impl AddressList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a binding. Returns `false`, leaving the list untouched, when
    /// the MAC is already present.
    pub fn push(&mut self, binding: AddressBinding) -> bool {
        if self.contains_mac(&binding.mac) {
            return false;
        }
        self.bindings.push(binding);
        true
    }

    /// Remove every binding owned by `mac`, returning how many were dropped
    pub fn remove_mac(&mut self, mac: &MacAddr) -> usize {
        let before = self.bindings.len();
        self.bindings.retain(|binding| binding.mac != *mac);
        before - self.bindings.len()
    }

    pub fn contains_mac(&self, mac: &MacAddr) -> bool {
        self.bindings.iter().any(|binding| binding.mac == *mac)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, AddressBinding> {
        self.bindings.iter()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn as_slice(&self) -> &[AddressBinding] {
        &self.bindings
    }
}

impl<'a> IntoIterator for &'a AddressList {
    type Item = &'a AddressBinding;
    type IntoIter = std::slice::Iter<'a, AddressBinding>;

    fn into_iter(self) -> Self::IntoIter {
        self.bindings.iter()
    }
}

impl FromIterator<AddressBinding> for AddressList {
    /// Collects bindings, keeping the first binding seen for each MAC
    fn from_iter<I: IntoIterator<Item = AddressBinding>>(iter: I) -> Self {
        let mut list = AddressList::new();
        for binding in iter {
            list.push(binding);
        }
        list
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binding(last: u8, mac: u8) -> AddressBinding {
        AddressBinding::new(Ipv4Addr::new(10, 0, 0, last), MacAddr([0x02, 0, 0, 0, 0, mac]))
    }

    #[test]
    fn test_push_rejects_duplicate_mac() {
        let mut list = AddressList::new();
        assert!(list.push(binding(1, 1)));
        assert!(!list.push(binding(2, 1)));
        assert!(list.push(binding(3, 3)));

        let ips: Vec<_> = list.iter().map(|b| b.ip).collect();
        assert_eq!(ips, vec![Ipv4Addr::new(10, 0, 0, 1), Ipv4Addr::new(10, 0, 0, 3)]);
    }

    #[test]
    fn test_remove_mac_keeps_pairs_together() {
        let mut list: AddressList = vec![binding(1, 1), binding(2, 2), binding(3, 3)]
            .into_iter()
            .collect();

        assert_eq!(list.remove_mac(&MacAddr([0x02, 0, 0, 0, 0, 2])), 1);
        assert_eq!(list.as_slice(), &[binding(1, 1), binding(3, 3)]);
        assert_eq!(list.remove_mac(&MacAddr([0x02, 0, 0, 0, 0, 9])), 0);
    }

    #[test]
    fn test_binding_display() {
        assert_eq!(
            binding(7, 0xab).to_string(),
            "IP : 10.0.0.7 ; MAC : 02:00:00:00:00:ab"
        );
    }
}
