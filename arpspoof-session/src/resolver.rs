//! IP to MAC resolution over ARP

use crate::binding::{AddressBinding, AddressList};
use crate::config::SpoofConfig;
use arpspoof_core::{Link, MacAddr, ReplyMatcher, Result};
use arpspoof_packet::{find_arp, ArpPacket, FrameBuilder};
use ipnetwork::Ipv4Network;
use std::collections::HashSet;
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Resolves hosts by broadcasting ARP requests from this machine's identity
pub struct AddressResolver {
    link: Arc<dyn Link>,
    retries: u32,
    timeout: Duration,
}

impl AddressResolver {
    /// Resolver with the default budget: 2 requests, 3 seconds each
    pub fn new(link: Arc<dyn Link>) -> Self {
        Self::from_config(link, &SpoofConfig::default())
    }

    pub fn from_config(link: Arc<dyn Link>, config: &SpoofConfig) -> Self {
        Self {
            link,
            retries: config.resolve_retries,
            timeout: config.resolve_timeout,
        }
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Look up the MAC owning `ip`
    ///
    /// `Ok(None)` means nobody answered within the retry budget, or the
    /// answer carried no ARP layer. Errors are reserved for the link itself.
    pub async fn resolve(&self, ip: Ipv4Addr) -> Result<Option<MacAddr>> {
        let my_ip = self.link.local_ipv4()?;
        let my_mac = self.link.local_mac()?;

        let request = FrameBuilder::new()
            .ethernet(my_mac, MacAddr::broadcast())
            .arp(ArpPacket::new_request(my_mac, my_ip, ip))
            .build(self.link.name())?;

        let matcher: ReplyMatcher = Arc::new(move |packet| {
            find_arp(packet).is_some_and(|arp| arp.is_reply() && arp.sender_proto_addr == ip)
        });

        let reply = self
            .link
            .send_receive(&request, self.retries, self.timeout, matcher)
            .await?;

        let mac = reply.as_ref().and_then(find_arp).map(|arp| arp.sender_hw_addr);
        match mac {
            Some(mac) => debug!(ip = %ip, mac = %mac, "Resolved host"),
            None => debug!(ip = %ip, retries = self.retries, "No ARP reply"),
        }

        Ok(mac)
    }

    /// Longest `resolve_all` can take for `hosts` silent addresses
    ///
    /// Hosts are queried one after the other, so every address that never
    /// answers costs the full `retries x timeout` budget.
    pub fn worst_case(&self, hosts: usize) -> Duration {
        let per_host = self.timeout.saturating_mul(self.retries);
        per_host.saturating_mul(u32::try_from(hosts).unwrap_or(u32::MAX))
    }

    /// Resolve every address, skipping hosts that do not answer
    ///
    /// Addresses are queried once each, in order, see [`worst_case`](Self::worst_case)
    /// for the time this can take. A host answering with a MAC already in the
    /// list is skipped as well.
    pub async fn resolve_all<I>(&self, ips: I) -> Result<AddressList>
    where
        I: IntoIterator<Item = Ipv4Addr>,
    {
        let mut seen = HashSet::new();
        let queue: Vec<Ipv4Addr> = ips.into_iter().filter(|ip| seen.insert(*ip)).collect();
        let mut list = AddressList::new();

        info!(
            hosts = queue.len(),
            worst_case_secs = self.worst_case(queue.len()).as_secs(),
            "Resolving hosts"
        );

        for ip in &queue {
            match self.resolve(*ip).await? {
                Some(mac) => {
                    if !list.push(AddressBinding::new(*ip, mac)) {
                        debug!(ip = %ip, mac = %mac, "MAC already listed, skipping host");
                    }
                }
                None => warn!(ip = %ip, "Host did not answer ARP request, excluding it"),
            }
        }

        info!(resolved = list.len(), queried = queue.len(), "Address resolution finished");
        Ok(list)
    }
}

/// Expand networks into the host addresses worth querying
///
/// Network and broadcast addresses are skipped for prefixes shorter than /31.
pub fn expand_networks(networks: &[Ipv4Network]) -> Vec<Ipv4Addr> {
    let mut hosts = Vec::new();

    for network in networks {
        let skip_edges = network.prefix() < 31;
        hosts.extend(network.iter().filter(|ip| {
            !skip_edges || (*ip != network.network() && *ip != network.broadcast())
        }));
    }

    hosts
}
