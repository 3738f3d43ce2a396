//! Passive host-IP and gateway-MAC learning from ordinary traffic.
//!
//! Unlike the ARP engine, the learner never emits anything — it only
//! proposes updates to shared translator state based on packets that were
//! going to be forwarded anyway.

use std::net::Ipv4Addr;

/// Learn our own IP address from the source address of an egress (TUN to
/// wire) IPv4 packet, unless one has already been set explicitly or
/// learned, and unless the candidate address is link-local
/// (`169.254.0.0/16`) — such an address is never latched as a learned
/// host IP. Learning never overwrites an existing value; use
/// `Translator::set_our_ip` to override.
pub fn learn_our_ip(current: Option<Ipv4Addr>, egress_src: Ipv4Addr) -> Option<Ipv4Addr> {
    match current {
        Some(ip) => Some(ip),
        None if is_link_local(egress_src) => None,
        None => Some(egress_src),
    }
}

/// True if `ip` falls in the `169.254.0.0/16` link-local (APIPA) range.
fn is_link_local(ip: Ipv4Addr) -> bool {
    let octets = ip.octets();
    octets[0] == 169 && octets[1] == 254
}

/// Learn the gateway's MAC address from the source hardware address of an
/// ingress (wire to TUN) Ethernet frame. Compares against the currently
/// known MAC on every call and updates whenever the observed address
/// differs, rather than only on the first observation. This is distinct
/// from — and not counted the same as — gateway-MAC learning via an ARP
/// reply in [`crate::arp`].
pub fn learn_gateway_mac<M: PartialEq + Copy>(current: Option<M>, ingress_src: M) -> Option<M> {
    if current == Some(ingress_src) {
        current
    } else {
        Some(ingress_src)
    }
}
