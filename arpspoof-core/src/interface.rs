//! Network interface types

use crate::{Error, MacAddr};
use pnet_datalink::{self, NetworkInterface};
use std::fmt;
use std::net::Ipv4Addr;

/// Network interface
#[derive(Debug, Clone)]
pub struct Interface {
    /// Interface name (e.g., "eth0", "en0")
    pub name: String,
    /// MAC address
    pub mac_address: MacAddr,
    /// Is interface up?
    pub is_up: bool,
    /// Is this the loopback interface?
    pub is_loopback: bool,
}

impl Interface {
    /// Get interface by name
    pub fn by_name(name: &str) -> Result<Self, Error> {
        let iface = find_datalink(name)?;
        Ok(Self::from(&iface))
    }

    /// List all available interfaces
    pub fn list_all() -> Result<Vec<Self>, Error> {
        let interfaces = pnet_datalink::interfaces();
        if interfaces.is_empty() {
            return Err(Error::Interface("No network interfaces found".to_string()));
        }

        Ok(interfaces.iter().map(Self::from).collect())
    }

    /// Get the first IPv4 address of this interface
    ///
    /// # Returns
    /// The first IPv4 address found on the interface, or None if no IPv4 is assigned
    pub fn get_ipv4(&self) -> Option<Ipv4Addr> {
        let interface = find_datalink(&self.name).ok()?;

        interface.ips.iter().find_map(|ip_network| match ip_network {
            ipnetwork::IpNetwork::V4(ipv4_net) => Some(ipv4_net.ip()),
            _ => None,
        })
    }
}

impl From<&NetworkInterface> for Interface {
    fn from(iface: &NetworkInterface) -> Self {
        let mac_address = iface
            .mac
            .map(|mac| MacAddr([mac.0, mac.1, mac.2, mac.3, mac.4, mac.5]))
            .unwrap_or_else(MacAddr::zero);

        Self {
            name: iface.name.clone(),
            mac_address,
            is_up: iface.is_up(),
            is_loopback: iface.is_loopback(),
        }
    }
}

impl fmt::Display for Interface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.mac_address)?;
        if self.is_loopback {
            write!(f, " [loopback]")?;
        }
        if !self.is_up {
            write!(f, " [down]")?;
        }
        Ok(())
    }
}

/// Look up the pnet view of an interface by name
pub(crate) fn find_datalink(name: &str) -> Result<NetworkInterface, Error> {
    pnet_datalink::interfaces()
        .into_iter()
        .find(|iface| iface.name == name)
        .ok_or_else(|| Error::InterfaceNotFound(name.to_string()))
}
