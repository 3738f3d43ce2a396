//! DHCP option TLV encoding and decoding (RFC 2132), limited to the option
//! kinds this initiator sends or reads.

use std::net::Ipv4Addr;

use crate::enum_with_unknown;

enum_with_unknown! {
    /// DHCP option codes this crate recognizes. Anything else is skipped
    /// over (by its length byte) while scanning, never rejected outright.
    pub enum DhcpOptionKind(u8) {
        /// RFC 2132 3.3 — subnet mask.
        SubnetMask = 1,
        /// RFC 2132 3.5 — default router(s).
        Router = 3,
        /// RFC 2132 3.8 — domain name server(s).
        DomainNameServer = 6,
        /// RFC 2132 9.1 — client's requested address (DISCOVER/REQUEST).
        RequestedIpAddress = 50,
        /// RFC 2132 9.2 — lease duration in seconds.
        IpAddressLeaseTime = 51,
        /// RFC 2132 9.6 — message type (DISCOVER/OFFER/REQUEST/.../ACK/NAK).
        DhcpMessageType = 53,
        /// RFC 2132 9.7 — the server this message pertains to.
        ServerIdentifier = 54,
        /// RFC 2132 9.8 — options the client would like the server to include.
        ParameterRequestList = 55,
        /// RFC 2132 9.11 — renewal (T1) time.
        RenewalTimeValue = 58,
        /// RFC 2132 9.12 — rebinding (T2) time.
        RebindingTimeValue = 59,
        /// RFC 1497 — end of options.
        End = 255,
    }
}

enum_with_unknown! {
    /// DHCP message type, option 53's value (RFC 2131 §3).
    pub enum DhcpMessageKind(u8) {
        /// Client broadcast to locate available servers.
        Discover = 1,
        /// Server to client in response to DISCOVER, with offered parameters.
        Offer = 2,
        /// Client message to servers, accepting or renewing an offer.
        Request = 3,
        /// Client to server, indicating the offered address is unacceptable.
        Decline = 4,
        /// Server to client, with committed configuration parameters.
        Ack = 5,
        /// Server to client, refusing to commit the requested address.
        Nak = 6,
        /// Client to server, relinquishing the address and cancelling the lease.
        Release = 7,
        /// Client to server, asking only for local configuration parameters.
        Inform = 8,
    }
}

/// The subset of option values this initiator reads out of an incoming
/// message, parsed from a raw TLV stream.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DhcpOptions {
    /// Option 53.
    pub message_type: Option<DhcpMessageKind>,
    /// Option 54.
    pub server_id: Option<Ipv4Addr>,
    /// Option 50.
    pub requested_ip: Option<Ipv4Addr>,
    /// Option 51.
    pub lease_time_secs: Option<u32>,
    /// Option 58.
    pub renewal_time_secs: Option<u32>,
    /// Option 59.
    pub rebinding_time_secs: Option<u32>,
    /// Option 1.
    pub subnet_mask: Option<Ipv4Addr>,
    /// Option 3, first address only.
    pub router: Option<Ipv4Addr>,
    /// Option 6, all addresses.
    pub dns_servers: Vec<Ipv4Addr>,
}

impl DhcpOptions {
    /// Scan a TLV option stream, stopping at `End` or the end of `bytes`.
    /// Unrecognized option kinds are skipped over using their own length
    /// byte; a truncated final option is silently ignored rather than
    /// failing the whole parse.
    pub fn parse(bytes: &[u8]) -> Self {
        let mut options = DhcpOptions::default();
        let mut i = 0;
        while i < bytes.len() {
            let kind = DhcpOptionKind::from(bytes[i]);
            if kind == DhcpOptionKind::End {
                break;
            }
            if bytes[i] == 0 {
                // Pad
                i += 1;
                continue;
            }
            if i + 1 >= bytes.len() {
                break;
            }
            let len = bytes[i + 1] as usize;
            let start = i + 2;
            let end = start + len;
            if end > bytes.len() {
                break;
            }
            let value = &bytes[start..end];
            match kind {
                DhcpOptionKind::SubnetMask if len == 4 => {
                    options.subnet_mask = Some(addr4(value));
                }
                DhcpOptionKind::Router if len >= 4 => {
                    options.router = Some(addr4(&value[0..4]));
                }
                DhcpOptionKind::DomainNameServer => {
                    options.dns_servers = value.chunks_exact(4).map(addr4).collect();
                }
                DhcpOptionKind::RequestedIpAddress if len == 4 => {
                    options.requested_ip = Some(addr4(value));
                }
                DhcpOptionKind::IpAddressLeaseTime if len == 4 => {
                    options.lease_time_secs = Some(u32_be(value));
                }
                DhcpOptionKind::DhcpMessageType if len == 1 => {
                    options.message_type = Some(DhcpMessageKind::from(value[0]));
                }
                DhcpOptionKind::ServerIdentifier if len == 4 => {
                    options.server_id = Some(addr4(value));
                }
                DhcpOptionKind::RenewalTimeValue if len == 4 => {
                    options.renewal_time_secs = Some(u32_be(value));
                }
                DhcpOptionKind::RebindingTimeValue if len == 4 => {
                    options.rebinding_time_secs = Some(u32_be(value));
                }
                _ => {}
            }
            i = end;
        }
        options
    }
}

fn addr4(bytes: &[u8]) -> Ipv4Addr {
    Ipv4Addr::new(bytes[0], bytes[1], bytes[2], bytes[3])
}

fn u32_be(bytes: &[u8]) -> u32 {
    u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

/// Accumulates outbound options into a byte buffer, appending `End` on
/// [`OptionsWriter::finish`].
pub struct OptionsWriter {
    buf: Vec<u8>,
}

impl OptionsWriter {
    /// An empty writer.
    pub fn new() -> Self {
        OptionsWriter { buf: Vec::new() }
    }

    /// Append a DHCP message type option (53).
    pub fn message_type(mut self, kind: DhcpMessageKind) -> Self {
        self.buf.push(u8::from(DhcpOptionKind::DhcpMessageType));
        self.buf.push(1);
        self.buf.push(u8::from(kind));
        self
    }

    /// Append a requested-IP option (50).
    pub fn requested_ip(mut self, ip: Ipv4Addr) -> Self {
        self.buf.push(u8::from(DhcpOptionKind::RequestedIpAddress));
        self.buf.push(4);
        self.buf.extend_from_slice(&ip.octets());
        self
    }

    /// Append a server-identifier option (54).
    pub fn server_id(mut self, ip: Ipv4Addr) -> Self {
        self.buf.push(u8::from(DhcpOptionKind::ServerIdentifier));
        self.buf.push(4);
        self.buf.extend_from_slice(&ip.octets());
        self
    }

    /// Append a parameter request list (55) asking for subnet mask,
    /// router, DNS servers, and lease time — the options this initiator
    /// consumes.
    pub fn parameter_request_list(mut self) -> Self {
        self.buf.push(u8::from(DhcpOptionKind::ParameterRequestList));
        self.buf.push(4);
        self.buf.push(u8::from(DhcpOptionKind::SubnetMask));
        self.buf.push(u8::from(DhcpOptionKind::Router));
        self.buf.push(u8::from(DhcpOptionKind::DomainNameServer));
        self.buf.push(u8::from(DhcpOptionKind::IpAddressLeaseTime));
        self
    }

    /// Terminate the option stream and return the accumulated bytes.
    pub fn finish(mut self) -> Vec<u8> {
        self.buf.push(u8::from(DhcpOptionKind::End));
        self.buf
    }
}

impl Default for OptionsWriter {
    fn default() -> Self {
        Self::new()
    }
}
