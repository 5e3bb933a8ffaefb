//! Address list validation before an attack starts

use crate::binding::AddressList;
use arpspoof_core::{MacAddr, SanityFailure};
use tracing::{debug, warn};

/// Repair and validate the victim/target lists in place
///
/// 1. Bindings owned by the attacker are dropped from both lists.
/// 2. Any MAC present in `targets` is dropped from `victims`.
/// 3. Both lists must still have at least one host; targets are checked first.
pub fn sanitize(
    attacker_mac: MacAddr,
    victims: &mut AddressList,
    targets: &mut AddressList,
) -> Result<(), SanityFailure> {
    let own_victims = victims.remove_mac(&attacker_mac);
    let own_targets = targets.remove_mac(&attacker_mac);
    if own_victims + own_targets > 0 {
        debug!(
            mac = %attacker_mac,
            victims = own_victims,
            targets = own_targets,
            "Removed attacker address from host lists"
        );
    }

    for target in targets.iter() {
        if victims.remove_mac(&target.mac) > 0 {
            debug!(mac = %target.mac, "Host is on both networks, keeping it as a target");
        }
    }

    if targets.is_empty() {
        warn!("No host on the target network responded");
        return Err(SanityFailure::NoTargetsResponded);
    }

    if victims.is_empty() {
        warn!("No host on the victim network responded");
        return Err(SanityFailure::NoVictimsResponded);
    }

    Ok(())
}
