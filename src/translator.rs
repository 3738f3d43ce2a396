//! The translator itself: owns no I/O, performs no system calls, and
//! exposes the five collaborating components (framer, learner, ARP engine,
//! DHCP initiator, statistics) behind one small API.
//!
//! Every operation that would otherwise need the current time or a fresh
//! random transaction id takes that value as an explicit argument instead
//! of reading a clock or RNG itself, so the translator's own logic stays a
//! pure function of its inputs.

use std::net::Ipv4Addr;

use tracing::trace;

use crate::arp::ArpEngine;
use crate::dhcp::lease::Lease;
use crate::dhcp::message as dhcp_message;
use crate::dhcp::{DhcpInitiator, DhcpPhase};
use crate::enet::{self, EtherType, EthernetHeader};
use crate::error::{try_alloc_zeroed, Result, TranslatorError};
use crate::ip;
use crate::learner;
use crate::mac::MacAddr;

/// Configuration fixed for the lifetime of a [`Translator`].
#[derive(Clone, Copy, Debug)]
pub struct TranslatorConfig {
    /// The hardware address this translator presents on the wire side.
    pub our_mac: MacAddr,
    /// Enables host-IP learning from egress traffic (see [`crate::learner`]).
    pub learn_ip: bool,
    /// Enables gateway-MAC learning from ingress traffic sourced by the
    /// known gateway IP (see [`crate::learner`]).
    pub learn_gateway_mac: bool,
    /// When true, ingress ARP frames are consumed by the ARP engine rather
    /// than left for the caller. When false, ARP frames are dropped
    /// unexamined and `ethernet_to_ip` returns `Ok(None)` with no change to
    /// ARP state or statistics.
    pub handle_arp: bool,
    /// Reserved for future cache-aging logic; not read by the current
    /// implementation.
    pub arp_timeout_ms: u32,
    /// Gate extra-detailed `tracing` spans/events describing dropped or
    /// unusual packets. Off by default: the hot path logs nothing.
    pub verbose: bool,
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        TranslatorConfig {
            our_mac: MacAddr::default(),
            learn_ip: true,
            learn_gateway_mac: true,
            handle_arp: true,
            arp_timeout_ms: 0,
            verbose: false,
        }
    }
}

/// Counters describing what the translator has done since construction.
/// Monotonic for the life of the translator; never reset by any other
/// operation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Stats {
    /// IP packets turned into Ethernet frames.
    pub ip_to_ethernet_frames: u64,
    /// Ethernet frames turned into forwarded IP packets.
    pub ethernet_to_ip_packets: u64,
    /// Inputs rejected as malformed at either translation boundary.
    pub invalid_packets_dropped: u64,
    /// ARP requests answered (including deduped/queue-full cases).
    pub arp_requests_handled: u64,
    /// Gateway MAC addresses learned specifically from an ARP reply.
    pub arp_replies_learned: u64,
    /// Gateway MAC addresses learned from the source of ordinary ingress traffic.
    pub gateway_mac_learned_from_traffic: u64,
    /// DHCP leases obtained.
    pub dhcp_leases_bound: u64,
    /// DHCP NAKs received.
    pub dhcp_naks_received: u64,
}

/// Bridges an IP-only TUN interface into an Ethernet-framed transport.
///
/// All mutating operations are plain methods on `&mut self`; there is no
/// interior mutability and no background task. Callers drive the
/// translator entirely by calling it once per packet/frame they read off
/// their own transports.
#[derive(Debug)]
pub struct Translator {
    config: TranslatorConfig,
    our_ip: Option<Ipv4Addr>,
    gateway_ip: Option<Ipv4Addr>,
    gateway_mac: Option<MacAddr>,
    arp: ArpEngine,
    dhcp: DhcpInitiator,
    stats: Stats,
}

impl Translator {
    /// Construct a translator with no learned state.
    pub fn new(config: TranslatorConfig) -> Self {
        Translator {
            config,
            our_ip: None,
            gateway_ip: None,
            gateway_mac: None,
            arp: ArpEngine::new(),
            dhcp: DhcpInitiator::new(),
            stats: Stats::default(),
        }
    }

    /// Explicitly set our IP address, overriding anything learned so far.
    pub fn set_our_ip(&mut self, ip: Ipv4Addr) {
        self.our_ip = Some(ip);
    }

    /// Explicitly set the gateway's IP address, used to recognize its ARP
    /// replies.
    pub fn set_gateway_ip(&mut self, ip: Ipv4Addr) {
        self.gateway_ip = Some(ip);
    }

    /// Our learned or explicitly-set IP address, if any.
    pub fn our_ip(&self) -> Option<Ipv4Addr> {
        self.our_ip
    }

    /// The gateway's learned MAC address, if any.
    pub fn gateway_mac(&self) -> Option<MacAddr> {
        self.gateway_mac
    }

    /// Current DHCP lifecycle phase.
    pub fn dhcp_phase(&self) -> DhcpPhase {
        self.dhcp.phase()
    }

    /// The currently held DHCP lease, if `Bound`.
    pub fn dhcp_lease(&self) -> Option<&Lease> {
        self.dhcp.lease()
    }

    /// A snapshot of the translator's counters.
    pub fn stats(&self) -> Stats {
        self.stats
    }

    /// Begin (or restart) DHCP address acquisition. `now_ms` and `xid` are
    /// supplied by the caller — see the crate's top-level documentation.
    pub fn start_dhcp(&mut self, now_ms: u64, xid: u32) {
        self.dhcp.start(now_ms, xid, self.config.our_mac);
    }

    /// Abandon any in-progress or bound DHCP lease. Our own IP address, if
    /// set or learned independently of DHCP, is left untouched.
    pub fn release_dhcp(&mut self) {
        self.dhcp.release();
    }

    /// True if an ARP reply is queued and ready to be popped.
    pub fn has_pending_arp_reply(&self) -> bool {
        self.arp.has_pending_reply()
    }

    /// Pop the oldest queued outbound ARP reply, if any.
    pub fn pop_arp_reply(&mut self) -> Option<Vec<u8>> {
        self.arp.pop_reply()
    }

    /// True if an outbound DHCP frame is queued and ready to be popped.
    pub fn has_pending_dhcp(&self) -> bool {
        self.dhcp.has_pending_packet()
    }

    /// Pop the pending outbound DHCP frame, if any.
    pub fn pop_dhcp_packet(&mut self) -> Option<Vec<u8>> {
        self.dhcp.pop_packet()
    }

    /// Turn an IP packet read from the TUN device into an Ethernet frame
    /// ready for the wire transport. Learns our own IP from the packet's
    /// source address if one isn't already known. `now_ms` is currently
    /// unused on this path but accepted for symmetry with
    /// [`ethernet_to_ip`](Self::ethernet_to_ip) and to leave room for
    /// future time-aware egress bookkeeping without an API break.
    pub fn ip_to_ethernet(&mut self, packet: &[u8], now_ms: u64) -> Result<Vec<u8>> {
        let _ = now_ms;
        let version = ip::version(packet).ok_or_else(|| TranslatorError::invalid("empty ip packet"))?;
        let ethertype = match version {
            ip::VERSION_4 => {
                if packet.len() < ip::HEADER_LEN {
                    self.stats.invalid_packets_dropped += 1;
                    return Err(TranslatorError::invalid("ipv4 packet shorter than header"));
                }
                if self.config.learn_ip {
                    if let Some(src) = ip::read_src_addr(packet) {
                        self.our_ip = learner::learn_our_ip(self.our_ip, src);
                    }
                }
                EtherType::IpV4
            }
            ip::VERSION_6 => EtherType::IpV6,
            _ => {
                self.stats.invalid_packets_dropped += 1;
                return Err(TranslatorError::invalid("unrecognized ip version"));
            }
        };

        let dst_mac = self.gateway_mac.unwrap_or(MacAddr::BROADCAST);
        let mut frame = try_alloc_zeroed(enet::HEADER_LEN + packet.len())?;
        EthernetHeader {
            dst: dst_mac,
            src: self.config.our_mac,
            ethertype,
        }
        .write_into(&mut frame[0..enet::HEADER_LEN]);
        frame[enet::HEADER_LEN..].copy_from_slice(packet);

        self.stats.ip_to_ethernet_frames += 1;
        Ok(frame)
    }

    /// Turn an Ethernet frame read from the wire transport into an IP
    /// packet ready to write to the TUN device. Returns `Ok(None)` when the
    /// frame was fully consumed internally — an ARP request/reply or a DHCP
    /// message — rather than forwarded. `now_ms` is the caller's current
    /// time, used only to stamp a DHCP lease's `obtained_at_ms` if this
    /// frame happens to be the ACK that completes one.
    pub fn ethernet_to_ip(&mut self, frame: &[u8], now_ms: u64) -> Result<Option<Vec<u8>>> {
        let eth = EthernetHeader::parse(frame).ok_or_else(|| {
            self.stats.invalid_packets_dropped += 1;
            TranslatorError::invalid("frame shorter than ethernet header")
        })?;

        match eth.ethertype {
            EtherType::Arp => {
                if !self.config.handle_arp {
                    if self.config.verbose {
                        trace!("arp handling disabled, dropping ingress arp frame");
                    }
                    return Ok(None);
                }
                let result = self.arp.handle_ingress(
                    frame,
                    self.config.our_mac,
                    self.our_ip,
                    self.gateway_ip,
                    self.config.verbose,
                );
                if result.request_handled {
                    self.stats.arp_requests_handled += 1;
                }
                if let Some(mac) = result.learned_gateway_mac {
                    self.gateway_mac = Some(mac);
                    self.stats.arp_replies_learned += 1;
                }
                Ok(None)
            }
            EtherType::IpV4 if dhcp_message::unwrap_to_bootp_payload(frame).is_some() => {
                let result = self
                    .dhcp
                    .handle_ingress(frame, now_ms, self.config.our_mac, self.config.verbose);
                if let Some(lease) = result.lease_bound {
                    self.our_ip = Some(lease.assigned_ip);
                    self.gateway_ip = lease.router.or(self.gateway_ip);
                    self.stats.dhcp_leases_bound += 1;
                }
                if result.nak_received {
                    self.stats.dhcp_naks_received += 1;
                }
                Ok(None)
            }
            EtherType::IpV4 => {
                let ip_payload = &frame[enet::HEADER_LEN..];
                if self.config.learn_gateway_mac {
                    if let Some(gateway_ip) = self.gateway_ip {
                        if ip::read_src_addr(ip_payload) == Some(gateway_ip) {
                            let learned = learner::learn_gateway_mac(self.gateway_mac, eth.src);
                            if learned != self.gateway_mac {
                                self.stats.gateway_mac_learned_from_traffic += 1;
                            }
                            self.gateway_mac = learned;
                        }
                    }
                }
                if self.config.verbose {
                    trace!(src = %eth.src, "forwarding ingress frame as ip packet");
                }
                self.stats.ethernet_to_ip_packets += 1;
                Ok(Some(ip_payload.to_vec()))
            }
            EtherType::IpV6 => {
                if self.config.verbose {
                    trace!(src = %eth.src, "forwarding ingress frame as ip packet");
                }
                self.stats.ethernet_to_ip_packets += 1;
                Ok(Some(frame[enet::HEADER_LEN..].to_vec()))
            }
            EtherType::Unknown(_) => {
                if self.config.verbose {
                    trace!(ethertype = ?eth.ethertype, "dropping frame with unhandled ethertype");
                }
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> TranslatorConfig {
        TranslatorConfig {
            our_mac: MacAddr::new([0x02, 0, 0, 0, 0, 1]),
            ..TranslatorConfig::default()
        }
    }

    #[test]
    fn ip_to_ethernet_learns_our_ip_and_wraps_frame() {
        let mut t = Translator::new(config());
        let mut packet = vec![0u8; ip::HEADER_LEN];
        packet[0] = 0x45;
        packet[12..16].copy_from_slice(&[10, 0, 0, 7]);

        let frame = t.ip_to_ethernet(&packet, 0).unwrap();
        assert_eq!(frame.len(), enet::HEADER_LEN + packet.len());
        assert_eq!(t.our_ip(), Some(Ipv4Addr::new(10, 0, 0, 7)));
        assert_eq!(t.stats().ip_to_ethernet_frames, 1);
    }

    #[test]
    fn ip_to_ethernet_rejects_short_packet() {
        let mut t = Translator::new(config());
        let err = t.ip_to_ethernet(&[0x45], 0).unwrap_err();
        assert!(matches!(err, TranslatorError::InvalidPacket { .. }));
        assert_eq!(t.stats().invalid_packets_dropped, 1);
    }

    #[test]
    fn ethernet_to_ip_forwards_and_learns_gateway_mac_from_configured_gateway_ip() {
        let mut t = Translator::new(config());
        let gateway_ip = Ipv4Addr::new(10, 0, 0, 1);
        t.set_gateway_ip(gateway_ip);
        let gateway_mac = MacAddr::new([0xAA; 6]);
        let mut frame = vec![0u8; enet::HEADER_LEN + ip::HEADER_LEN];
        EthernetHeader {
            dst: config().our_mac,
            src: gateway_mac,
            ethertype: EtherType::IpV4,
        }
        .write_into(&mut frame[0..enet::HEADER_LEN]);
        frame[enet::HEADER_LEN] = 0x45;
        frame[enet::HEADER_LEN + 12..enet::HEADER_LEN + 16].copy_from_slice(&gateway_ip.octets());

        let forwarded = t.ethernet_to_ip(&frame, 0).unwrap();
        assert!(forwarded.is_some());
        assert_eq!(t.gateway_mac(), Some(gateway_mac));
        assert_eq!(t.stats().ethernet_to_ip_packets, 1);
        assert_eq!(t.stats().gateway_mac_learned_from_traffic, 1);
    }

    #[test]
    fn ethernet_to_ip_ignores_traffic_not_from_the_configured_gateway_ip() {
        let mut t = Translator::new(config());
        t.set_gateway_ip(Ipv4Addr::new(10, 0, 0, 1));
        let other_mac = MacAddr::new([0xBB; 6]);
        let mut frame = vec![0u8; enet::HEADER_LEN + ip::HEADER_LEN];
        EthernetHeader {
            dst: config().our_mac,
            src: other_mac,
            ethertype: EtherType::IpV4,
        }
        .write_into(&mut frame[0..enet::HEADER_LEN]);
        frame[enet::HEADER_LEN] = 0x45;
        frame[enet::HEADER_LEN + 12..enet::HEADER_LEN + 16]
            .copy_from_slice(&Ipv4Addr::new(10, 0, 0, 99).octets());

        let forwarded = t.ethernet_to_ip(&frame, 0).unwrap();
        assert!(forwarded.is_some());
        assert_eq!(t.gateway_mac(), None);
        assert_eq!(t.stats().gateway_mac_learned_from_traffic, 0);
    }

    #[test]
    fn handle_arp_false_drops_arp_frames_untouched() {
        let mut config = config();
        config.handle_arp = false;
        let mut t = Translator::new(config);
        t.set_our_ip(Ipv4Addr::new(10, 0, 0, 2));

        let requester_mac = MacAddr::new([0xBB; 6]);
        let requester_ip = Ipv4Addr::new(10, 0, 0, 1);
        let mut frame = vec![0u8; crate::arp::FRAME_LEN];
        EthernetHeader {
            dst: MacAddr::BROADCAST,
            src: requester_mac,
            ethertype: EtherType::Arp,
        }
        .write_into(&mut frame[0..enet::HEADER_LEN]);
        frame[enet::HEADER_LEN..enet::HEADER_LEN + 2].copy_from_slice(&1u16.to_be_bytes());
        frame[enet::HEADER_LEN + 2..enet::HEADER_LEN + 4].copy_from_slice(&0x0800u16.to_be_bytes());
        frame[enet::HEADER_LEN + 4] = 6;
        frame[enet::HEADER_LEN + 5] = 4;
        frame[enet::HEADER_LEN + 6..enet::HEADER_LEN + 8].copy_from_slice(&2u16.to_be_bytes());
        frame[enet::HEADER_LEN + 8..enet::HEADER_LEN + 14].copy_from_slice(&requester_mac.octets());
        frame[enet::HEADER_LEN + 14..enet::HEADER_LEN + 18].copy_from_slice(&requester_ip.octets());
        frame[enet::HEADER_LEN + 24..enet::HEADER_LEN + 28]
            .copy_from_slice(&Ipv4Addr::new(10, 0, 0, 2).octets());

        let result = t.ethernet_to_ip(&frame, 0).unwrap();
        assert!(result.is_none());
        assert_eq!(t.stats().arp_requests_handled, 0);
        assert!(!t.has_pending_arp_reply());
        assert!(t.pop_arp_reply().is_none());
    }

    #[test]
    fn arp_request_for_our_ip_queues_reply_and_updates_stats() {
        let mut t = Translator::new(config());
        t.set_our_ip(Ipv4Addr::new(10, 0, 0, 2));

        let requester_mac = MacAddr::new([0xBB; 6]);
        let requester_ip = Ipv4Addr::new(10, 0, 0, 1);
        let mut frame = vec![0u8; crate::arp::FRAME_LEN];
        EthernetHeader {
            dst: MacAddr::BROADCAST,
            src: requester_mac,
            ethertype: EtherType::Arp,
        }
        .write_into(&mut frame[0..enet::HEADER_LEN]);
        frame[enet::HEADER_LEN..enet::HEADER_LEN + 2].copy_from_slice(&1u16.to_be_bytes());
        frame[enet::HEADER_LEN + 2..enet::HEADER_LEN + 4].copy_from_slice(&0x0800u16.to_be_bytes());
        frame[enet::HEADER_LEN + 4] = 6;
        frame[enet::HEADER_LEN + 5] = 4;
        frame[enet::HEADER_LEN + 6..enet::HEADER_LEN + 8].copy_from_slice(&2u16.to_be_bytes()); // REQUEST
        frame[enet::HEADER_LEN + 8..enet::HEADER_LEN + 14].copy_from_slice(&requester_mac.octets());
        frame[enet::HEADER_LEN + 14..enet::HEADER_LEN + 18].copy_from_slice(&requester_ip.octets());
        frame[enet::HEADER_LEN + 24..enet::HEADER_LEN + 28]
            .copy_from_slice(&Ipv4Addr::new(10, 0, 0, 2).octets());

        let result = t.ethernet_to_ip(&frame, 0).unwrap();
        assert!(result.is_none());
        assert_eq!(t.stats().arp_requests_handled, 1);
        assert!(t.pop_arp_reply().is_some());
    }

    #[test]
    fn dhcp_lifecycle_through_translator() {
        let mut t = Translator::new(config());
        t.start_dhcp(0, 1);
        let discover = t.pop_dhcp_packet().unwrap();
        assert!(dhcp_message::unwrap_to_bootp_payload(&discover).is_some());
        assert_eq!(t.dhcp_phase(), DhcpPhase::Selecting);

        t.release_dhcp();
        assert_eq!(t.dhcp_phase(), DhcpPhase::Idle);
        assert!(t.pop_dhcp_packet().is_none());
    }

    #[test]
    fn full_dhcp_exchange_through_translator_binds_lease() {
        use crate::dhcp::message::wrap_broadcast;
        use crate::dhcp::options::{DhcpMessageKind, OptionsWriter};

        let mut t = Translator::new(config());
        t.start_dhcp(0, 77);
        let _ = t.pop_dhcp_packet().unwrap();

        let server_id = Ipv4Addr::new(10, 0, 0, 1);
        let assigned_ip = Ipv4Addr::new(10, 0, 0, 50);

        let offer_options = OptionsWriter::new()
            .message_type(DhcpMessageKind::Offer)
            .server_id(server_id)
            .finish();
        let mut offer_payload = vec![0u8; dhcp_message::FIXED_LEN + 4 + offer_options.len()];
        offer_payload[0] = 2;
        offer_payload[4..8].copy_from_slice(&77u32.to_be_bytes());
        offer_payload[16..20].copy_from_slice(&assigned_ip.octets());
        offer_payload[dhcp_message::FIXED_LEN..dhcp_message::FIXED_LEN + 4]
            .copy_from_slice(&dhcp_message::MAGIC_COOKIE.to_be_bytes());
        offer_payload[dhcp_message::FIXED_LEN + 4..].copy_from_slice(&offer_options);
        let offer_frame = wrap_broadcast(config().our_mac, &offer_payload);

        assert!(t.ethernet_to_ip(&offer_frame, 10).unwrap().is_none());
        assert_eq!(t.dhcp_phase(), DhcpPhase::Requesting);
        let _ = t.pop_dhcp_packet().unwrap();

        let ack_options = OptionsWriter::new()
            .message_type(DhcpMessageKind::Ack)
            .server_id(server_id)
            .finish();
        let mut ack_payload = vec![0u8; dhcp_message::FIXED_LEN + 4 + ack_options.len()];
        ack_payload[0] = 2;
        ack_payload[4..8].copy_from_slice(&77u32.to_be_bytes());
        ack_payload[16..20].copy_from_slice(&assigned_ip.octets());
        ack_payload[dhcp_message::FIXED_LEN..dhcp_message::FIXED_LEN + 4]
            .copy_from_slice(&dhcp_message::MAGIC_COOKIE.to_be_bytes());
        ack_payload[dhcp_message::FIXED_LEN + 4..].copy_from_slice(&ack_options);
        let ack_frame = wrap_broadcast(config().our_mac, &ack_payload);

        assert!(t.ethernet_to_ip(&ack_frame, 20).unwrap().is_none());
        assert_eq!(t.dhcp_phase(), DhcpPhase::Bound);
        assert_eq!(t.our_ip(), Some(assigned_ip));
        assert_eq!(t.stats().dhcp_leases_bound, 1);
    }
}
