//! Address Resolution Protocol: parse ingress requests/replies, compose
//! replies for our own IP, and keep a small bounded, deduplicated queue of
//! outbound replies awaiting egress.
//!
//! ARP is not a distinct network layer, but most networks require it to be
//! answered before a peer will treat the translator as reachable. On a
//! point-to-point VPN transport the only peer that matters is the gateway,
//! so the bookkeeping here is deliberately small: one queue, one dedup set.

use std::collections::{HashSet, VecDeque};
use std::net::Ipv4Addr;

use tracing::trace;

use crate::enet::{self, EtherType, EthernetHeader};
use crate::enum_with_unknown;
use crate::mac::MacAddr;

/// Size in bytes of the ARP payload (after the Ethernet header): two
/// hardware/protocol type fields, two size octets, the opcode, and four
/// address fields (6+4+6+4).
pub const PACKET_LEN: usize = 28;

/// Size in bytes of a complete ARP frame (Ethernet header + ARP payload).
pub const FRAME_LEN: usize = enet::HEADER_LEN + PACKET_LEN;

/// Bound on the number of unsent ARP replies held at once.
pub const MAX_QUEUE: usize = 10;

static_assertions::const_assert_eq!(FRAME_LEN, 42);

enum_with_unknown! {
    /// ARP opcode.
    pub enum ArpOperation(u16) {
        /// "Who has this IP?"
        Request = 1,
        /// "This IP is at this MAC."
        Reply = 2,
    }
}

/// A parsed ARP packet, Ethernet/IPv4 flavor only (the only flavor this
/// translator ever builds or accepts).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct ArpPacket {
    operation: ArpOperation,
    sender_mac: MacAddr,
    sender_ip: Ipv4Addr,
    target_mac: MacAddr,
    target_ip: Ipv4Addr,
}

impl ArpPacket {
    /// Parse the 28-byte ARP payload (the caller has already stripped the
    /// Ethernet header). Returns `None` on short input, an unexpected
    /// hardware/protocol type, or an unexpected address length — all
    /// silently-dropped conditions.
    fn parse(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < PACKET_LEN {
            return None;
        }
        let htype = u16::from_be_bytes([bytes[0], bytes[1]]);
        let ptype = u16::from_be_bytes([bytes[2], bytes[3]]);
        let hlen = bytes[4];
        let plen = bytes[5];
        if htype != 1 || ptype != u16::from(EtherType::IpV4) || hlen != 6 || plen != 4 {
            return None;
        }
        let operation = ArpOperation::from(u16::from_be_bytes([bytes[6], bytes[7]]));
        let sender_mac = MacAddr::from_slice(&bytes[8..14])?;
        let sender_ip = Ipv4Addr::new(bytes[14], bytes[15], bytes[16], bytes[17]);
        let target_mac = MacAddr::from_slice(&bytes[18..24])?;
        let target_ip = Ipv4Addr::new(bytes[24], bytes[25], bytes[26], bytes[27]);
        Some(ArpPacket {
            operation,
            sender_mac,
            sender_ip,
            target_mac,
            target_ip,
        })
    }

    /// Write the 28-byte ARP payload into `out`.
    fn write_into(&self, out: &mut [u8]) {
        debug_assert!(out.len() >= PACKET_LEN);
        out[0..2].copy_from_slice(&1u16.to_be_bytes()); // htype: ethernet
        out[2..4].copy_from_slice(&u16::from(EtherType::IpV4).to_be_bytes());
        out[4] = 6; // hlen
        out[5] = 4; // plen
        out[6..8].copy_from_slice(&u16::from(self.operation).to_be_bytes());
        out[8..14].copy_from_slice(&self.sender_mac.octets());
        out[14..18].copy_from_slice(&self.sender_ip.octets());
        out[18..24].copy_from_slice(&self.target_mac.octets());
        out[24..28].copy_from_slice(&self.target_ip.octets());
    }
}

/// Outcome of feeding one ingress frame to the ARP engine. The translator
/// applies the side effects described here to its shared counters/state;
/// the engine itself only owns the reply queue and its dedup set.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ArpIngressResult {
    /// A gateway MAC learned from an ARP REPLY whose sender IP matched the
    /// configured gateway IP. Distinct from (and counted separately from)
    /// the IP-layer gateway-MAC learning in [`crate::learner`].
    pub learned_gateway_mac: Option<MacAddr>,
    /// True if this frame was a REQUEST addressed to our IP (whether or
    /// not a reply was actually enqueued — dedup/queue-full still count as
    /// "handled" even when dedup or a full queue drops the actual reply).
    pub request_handled: bool,
}

/// Owns the bounded, deduplicated queue of outbound ARP replies.
#[derive(Debug, Default)]
pub struct ArpEngine {
    reply_queue: VecDeque<Vec<u8>>,
    pending_ips: HashSet<Ipv4Addr>,
}

impl ArpEngine {
    /// A fresh engine with an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of replies currently queued.
    pub fn queue_len(&self) -> usize {
        self.reply_queue.len()
    }

    /// True if at least one reply is queued.
    pub fn has_pending_reply(&self) -> bool {
        !self.reply_queue.is_empty()
    }

    /// The target IPs with a reply currently queued; exposed for invariant
    /// checking in tests.
    #[cfg(test)]
    pub(crate) fn pending_ips(&self) -> &HashSet<Ipv4Addr> {
        &self.pending_ips
    }

    /// Pop the oldest queued reply, removing its target IP from the dedup
    /// set so a future probe for the same address is answered again.
    pub fn pop_reply(&mut self) -> Option<Vec<u8>> {
        let frame = self.reply_queue.pop_front()?;
        if frame.len() >= FRAME_LEN {
            let target_ip = Ipv4Addr::new(
                frame[enet::HEADER_LEN + 24],
                frame[enet::HEADER_LEN + 25],
                frame[enet::HEADER_LEN + 26],
                frame[enet::HEADER_LEN + 27],
            );
            self.pending_ips.remove(&target_ip);
        }
        Some(frame)
    }

    /// Feed one ingress Ethernet frame (already known to carry EtherType
    /// ARP) to the engine.
    pub fn handle_ingress(
        &mut self,
        frame: &[u8],
        our_mac: MacAddr,
        our_ip: Option<Ipv4Addr>,
        gateway_ip: Option<Ipv4Addr>,
        verbose: bool,
    ) -> ArpIngressResult {
        let mut result = ArpIngressResult::default();

        if frame.len() < FRAME_LEN {
            if verbose {
                trace!(len = frame.len(), "dropping undersized arp frame");
            }
            return result;
        }
        let Some(arp) = ArpPacket::parse(&frame[enet::HEADER_LEN..]) else {
            if verbose {
                trace!("dropping malformed arp payload");
            }
            return result;
        };

        match arp.operation {
            ArpOperation::Reply => {
                if let Some(gateway_ip) = gateway_ip {
                    if arp.sender_ip == gateway_ip {
                        result.learned_gateway_mac = Some(arp.sender_mac);
                    }
                }
            }
            ArpOperation::Request => {
                if let Some(our_ip) = our_ip {
                    if arp.target_ip == our_ip {
                        result.request_handled = true;
                        self.try_enqueue_reply(our_mac, our_ip, arp.sender_mac, arp.sender_ip, verbose);
                    }
                }
            }
            ArpOperation::Unknown(op) => {
                if verbose {
                    trace!(opcode = op, "dropping arp frame with unknown opcode");
                }
            }
        }

        result
    }

    fn try_enqueue_reply(
        &mut self,
        our_mac: MacAddr,
        our_ip: Ipv4Addr,
        requester_mac: MacAddr,
        requester_ip: Ipv4Addr,
        verbose: bool,
    ) {
        if self.pending_ips.contains(&requester_ip) {
            if verbose {
                trace!(%requester_ip, "deduping arp reply, one already queued");
            }
            return;
        }
        if self.reply_queue.len() >= MAX_QUEUE {
            if verbose {
                trace!(%requester_ip, "arp reply queue full, dropping reply");
            }
            return;
        }

        let arp = ArpPacket {
            operation: ArpOperation::Reply,
            sender_mac: our_mac,
            sender_ip: our_ip,
            target_mac: requester_mac,
            target_ip: requester_ip,
        };
        let mut frame = vec![0u8; FRAME_LEN];
        EthernetHeader {
            dst: requester_mac,
            src: our_mac,
            ethertype: EtherType::Arp,
        }
        .write_into(&mut frame[0..enet::HEADER_LEN]);
        arp.write_into(&mut frame[enet::HEADER_LEN..]);

        self.pending_ips.insert(requester_ip);
        self.reply_queue.push_back(frame);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_request(sender_mac: MacAddr, sender_ip: Ipv4Addr, target_ip: Ipv4Addr) -> Vec<u8> {
        let arp = ArpPacket {
            operation: ArpOperation::Request,
            sender_mac,
            sender_ip,
            target_mac: MacAddr::ZERO,
            target_ip,
        };
        let mut frame = vec![0u8; FRAME_LEN];
        EthernetHeader {
            dst: MacAddr::new([0x02, 0, 0x5E, 0, 0, 1]),
            src: sender_mac,
            ethertype: EtherType::Arp,
        }
        .write_into(&mut frame[0..enet::HEADER_LEN]);
        arp.write_into(&mut frame[enet::HEADER_LEN..]);
        frame
    }

    #[test]
    fn request_for_our_ip_enqueues_reply() {
        let our_mac = MacAddr::new([0x02, 0, 0x5E, 0, 0, 1]);
        let our_ip = Ipv4Addr::new(10, 0, 0, 2);
        let requester_mac = MacAddr::new([0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF]);
        let requester_ip = Ipv4Addr::new(10, 0, 0, 1);

        let mut engine = ArpEngine::new();
        let frame = build_request(requester_mac, requester_ip, our_ip);
        let result = engine.handle_ingress(&frame, our_mac, Some(our_ip), None, false);

        assert!(result.request_handled);
        assert!(result.learned_gateway_mac.is_none());
        assert!(engine.has_pending_reply());

        let reply = engine.pop_reply().unwrap();
        assert_eq!(reply.len(), FRAME_LEN);
        let parsed = ArpPacket::parse(&reply[enet::HEADER_LEN..]).unwrap();
        assert_eq!(parsed.operation, ArpOperation::Reply);
        assert_eq!(parsed.sender_mac, our_mac);
        assert_eq!(parsed.sender_ip, our_ip);
        assert_eq!(parsed.target_mac, requester_mac);
        assert_eq!(parsed.target_ip, requester_ip);

        assert!(!engine.has_pending_reply());
        assert!(engine.pending_ips().is_empty());
    }

    #[test]
    fn duplicate_requests_enqueue_once() {
        let our_mac = MacAddr::new([0x02, 0, 0x5E, 0, 0, 1]);
        let our_ip = Ipv4Addr::new(10, 0, 0, 2);
        let requester_mac = MacAddr::new([0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF]);
        let requester_ip = Ipv4Addr::new(10, 0, 0, 1);

        let mut engine = ArpEngine::new();
        let frame = build_request(requester_mac, requester_ip, our_ip);
        let mut handled = 0;
        for _ in 0..5 {
            let result = engine.handle_ingress(&frame, our_mac, Some(our_ip), None, false);
            if result.request_handled {
                handled += 1;
            }
        }

        assert_eq!(handled, 5);
        assert_eq!(engine.queue_len(), 1);
    }

    #[test]
    fn queue_is_bounded() {
        let our_mac = MacAddr::new([0x02, 0, 0x5E, 0, 0, 1]);
        let our_ip = Ipv4Addr::new(10, 0, 0, 2);

        let mut engine = ArpEngine::new();
        for i in 0..(MAX_QUEUE + 5) {
            let requester_mac = MacAddr::new([0, 0, 0, 0, 0, i as u8]);
            let requester_ip = Ipv4Addr::new(10, 0, 1, i as u8);
            let frame = build_request(requester_mac, requester_ip, our_ip);
            engine.handle_ingress(&frame, our_mac, Some(our_ip), None, false);
        }

        assert_eq!(engine.queue_len(), MAX_QUEUE);
    }

    #[test]
    fn reply_from_gateway_is_learned() {
        let our_mac = MacAddr::new([0x02, 0, 0x5E, 0, 0, 1]);
        let gateway_ip = Ipv4Addr::new(10, 0, 0, 1);
        let gateway_mac = MacAddr::new([0x12, 0x34, 0x56, 0x78, 0x9A, 0xBC]);

        let arp = ArpPacket {
            operation: ArpOperation::Reply,
            sender_mac: gateway_mac,
            sender_ip: gateway_ip,
            target_mac: our_mac,
            target_ip: Ipv4Addr::new(10, 0, 0, 2),
        };
        let mut frame = vec![0u8; FRAME_LEN];
        EthernetHeader {
            dst: our_mac,
            src: gateway_mac,
            ethertype: EtherType::Arp,
        }
        .write_into(&mut frame[0..enet::HEADER_LEN]);
        arp.write_into(&mut frame[enet::HEADER_LEN..]);

        let mut engine = ArpEngine::new();
        let result = engine.handle_ingress(&frame, our_mac, None, Some(gateway_ip), false);
        assert_eq!(result.learned_gateway_mac, Some(gateway_mac));
        assert!(!result.request_handled);
    }

    #[test]
    fn malformed_arp_is_dropped_silently() {
        let mut engine = ArpEngine::new();
        let short_frame = vec![0u8; 20];
        let result = engine.handle_ingress(
            &short_frame,
            MacAddr::ZERO,
            Some(Ipv4Addr::new(1, 1, 1, 1)),
            None,
            false,
        );
        assert_eq!(result, ArpIngressResult::default());
    }
}
