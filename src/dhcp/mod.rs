//! The DHCP initiator: a client-side DISCOVER → OFFER → REQUEST → ACK state
//! machine that produces and consumes BOOTP-wrapped Ethernet frames.
//!
//! Like the rest of the translator, the initiator touches no clock and no
//! RNG — `now_ms` and `xid` are supplied by the caller at the two points
//! where a real client would otherwise read them itself.

pub mod lease;
pub mod message;
pub mod options;

use std::net::Ipv4Addr;

use tracing::trace;

use crate::dhcp::lease::{rebinding_or_default, renewal_or_default, Lease};
use crate::dhcp::options::DhcpMessageKind;
use crate::mac::MacAddr;

/// Initiator lifecycle phase, exposed for statistics/queries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DhcpPhase {
    /// No address requested, or the last attempt was abandoned/NAKed.
    Idle,
    /// DISCOVER sent, waiting for an OFFER.
    Selecting,
    /// REQUEST sent for an offered address, waiting for ACK/NAK.
    Requesting,
    /// A lease is held.
    Bound,
}

#[derive(Clone, Debug)]
enum State {
    Idle,
    Selecting { xid: u32 },
    Requesting { xid: u32, offered_ip: Ipv4Addr, offered_server_id: Ipv4Addr },
    Bound { lease: Lease },
}

/// Outcome of feeding one ingress frame to the initiator.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct DhcpIngressResult {
    /// Set once an ACK completes the exchange and a lease is now held.
    pub lease_bound: Option<Lease>,
    /// True if a NAK sent the initiator back to `Idle`.
    pub nak_received: bool,
}

/// Owns the DHCP client state machine and its single pending outbound frame.
#[derive(Debug)]
pub struct DhcpInitiator {
    state: State,
    outbound: Option<Vec<u8>>,
}

impl Default for DhcpInitiator {
    fn default() -> Self {
        DhcpInitiator {
            state: State::Idle,
            outbound: None,
        }
    }
}

impl DhcpInitiator {
    /// A fresh initiator, not yet started.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> DhcpPhase {
        match self.state {
            State::Idle => DhcpPhase::Idle,
            State::Selecting { .. } => DhcpPhase::Selecting,
            State::Requesting { .. } => DhcpPhase::Requesting,
            State::Bound { .. } => DhcpPhase::Bound,
        }
    }

    /// The held lease, if `Bound`.
    pub fn lease(&self) -> Option<&Lease> {
        match &self.state {
            State::Bound { lease } => Some(lease),
            _ => None,
        }
    }

    /// True if an outbound frame is ready to be popped.
    pub fn has_pending_packet(&self) -> bool {
        self.outbound.is_some()
    }

    /// Take the pending outbound frame, if any.
    pub fn pop_packet(&mut self) -> Option<Vec<u8>> {
        self.outbound.take()
    }

    /// Begin (or restart) address acquisition: builds and queues a DISCOVER,
    /// moving to `Selecting`. `now_ms` and `xid` are supplied by the caller
    /// (see module docs); `now_ms` is recorded so a lease obtained later can
    /// compute its own timers relative to it.
    pub fn start(&mut self, now_ms: u64, xid: u32, our_mac: MacAddr) {
        let secs = 0; // elapsed-seconds-since-start; the translator has no clock of its own to derive this from.
        let _ = now_ms;
        self.outbound = Some(message::build_discover(xid, secs, our_mac, None));
        self.state = State::Selecting { xid };
    }

    /// Abandon any in-progress or bound lease and return to `Idle`. The
    /// caller's own IP (if one was set or learned) is left untouched —
    /// only DHCP-owned state is cleared.
    pub fn release(&mut self) {
        self.state = State::Idle;
        self.outbound = None;
    }

    /// Feed one ingress BOOTP-bearing Ethernet frame to the state machine.
    /// Frames that aren't DHCP, don't match the in-flight transaction id,
    /// or are malformed are silently ignored.
    pub fn handle_ingress(&mut self, frame: &[u8], now_ms: u64, our_mac: MacAddr, verbose: bool) -> DhcpIngressResult {
        let mut result = DhcpIngressResult::default();

        let Some(payload) = message::unwrap_to_bootp_payload(frame) else {
            return result;
        };
        let Some(msg) = message::parse(payload) else {
            if verbose {
                trace!("dropping malformed dhcp message");
            }
            return result;
        };

        match &self.state {
            State::Selecting { xid } if msg.xid == *xid => {
                self.handle_offer_or_nak(msg, *xid, our_mac, &mut result, verbose);
            }
            State::Requesting {
                xid,
                offered_ip,
                offered_server_id,
            } if msg.xid == *xid => {
                let (offered_ip, offered_server_id) = (*offered_ip, *offered_server_id);
                self.handle_ack_or_nak(msg, now_ms, offered_ip, offered_server_id, &mut result, verbose);
            }
            _ => {
                if verbose {
                    trace!(xid = msg.xid, phase = ?self.phase(), "dropping dhcp message for unexpected transaction/phase");
                }
            }
        }

        result
    }

    fn handle_offer_or_nak(
        &mut self,
        msg: message::DhcpMessage,
        xid: u32,
        our_mac: MacAddr,
        result: &mut DhcpIngressResult,
        verbose: bool,
    ) {
        match msg.options.message_type {
            Some(DhcpMessageKind::Offer) => {
                let Some(server_id) = msg.options.server_id else {
                    if verbose {
                        trace!("dropping offer with no server identifier");
                    }
                    return;
                };
                let offered_ip = msg.your_ip;
                self.outbound = Some(message::build_request(xid, 0, our_mac, offered_ip, server_id));
                self.state = State::Requesting {
                    xid,
                    offered_ip,
                    offered_server_id: server_id,
                };
            }
            Some(DhcpMessageKind::Nak) => {
                self.state = State::Idle;
                self.outbound = None;
                result.nak_received = true;
            }
            _ => {
                if verbose {
                    trace!(kind = ?msg.options.message_type, "ignoring unexpected message while selecting");
                }
            }
        }
    }

    fn handle_ack_or_nak(
        &mut self,
        msg: message::DhcpMessage,
        now_ms: u64,
        offered_ip: Ipv4Addr,
        offered_server_id: Ipv4Addr,
        result: &mut DhcpIngressResult,
        verbose: bool,
    ) {
        match msg.options.message_type {
            Some(DhcpMessageKind::Ack) => {
                let lease_time_secs = msg.options.lease_time_secs.unwrap_or(86_400);
                let lease = Lease {
                    assigned_ip: if msg.your_ip == Ipv4Addr::UNSPECIFIED { offered_ip } else { msg.your_ip },
                    server_id: msg.options.server_id.unwrap_or(offered_server_id),
                    obtained_at_ms: now_ms,
                    lease_time_secs,
                    renewal_time_secs: renewal_or_default(lease_time_secs, msg.options.renewal_time_secs),
                    rebinding_time_secs: rebinding_or_default(lease_time_secs, msg.options.rebinding_time_secs),
                    subnet_mask: msg.options.subnet_mask,
                    router: msg.options.router,
                    dns_servers: msg.options.dns_servers,
                };
                result.lease_bound = Some(lease.clone());
                self.state = State::Bound { lease };
                self.outbound = None;
            }
            Some(DhcpMessageKind::Nak) => {
                self.state = State::Idle;
                self.outbound = None;
                result.nak_received = true;
            }
            _ => {
                if verbose {
                    trace!(kind = ?msg.options.message_type, "ignoring unexpected message while requesting");
                }
            }
        }
    }
}
