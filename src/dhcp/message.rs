//! BOOTP message framing (RFC 951, as extended by RFC 2131) and the
//! Ethernet/IPv4/UDP wrapping the initiator sends its messages inside.

use std::net::Ipv4Addr;

use crate::dhcp::options::{DhcpMessageKind, DhcpOptions, OptionsWriter};
use crate::enet::{self, EtherType, EthernetHeader};
use crate::ip::{self, Ipv4Header};
use crate::mac::MacAddr;
use crate::udp::{self, UdpHeader};

/// Length of the fixed BOOTP fields, up to but not including the 4-byte
/// magic cookie: op, htype, hlen, hops, xid, secs, flags, ciaddr, yiaddr,
/// siaddr, giaddr, chaddr (16), sname (64), file (128).
pub const FIXED_LEN: usize = 236;
/// RFC 1497 magic cookie marking the start of the options area.
pub const MAGIC_COOKIE: u32 = 0x6382_5363;

const BOOTREQUEST: u8 = 1;
const BOOTREPLY: u8 = 2;
const HTYPE_ETHERNET: u8 = 1;
const HLEN_ETHERNET: u8 = 6;

/// A parsed BOOTP/DHCP message (the options relevant to this initiator
/// only — see [`DhcpOptions`]).
#[derive(Clone, Debug)]
pub struct DhcpMessage {
    /// `BOOTREPLY` for anything this initiator accepts as ingress.
    pub op: u8,
    /// Transaction id, echoed from the initiator's own request.
    pub xid: u32,
    /// Address assigned by the server (`yiaddr`).
    pub your_ip: Ipv4Addr,
    /// Parsed option values.
    pub options: DhcpOptions,
}

/// Build a DHCPDISCOVER BOOTP payload (no L2/L3/UDP wrapping).
fn build_discover_payload(xid: u32, secs: u16, our_mac: MacAddr, requested_ip: Option<Ipv4Addr>) -> Vec<u8> {
    let mut writer = OptionsWriter::new().message_type(DhcpMessageKind::Discover);
    if let Some(ip) = requested_ip {
        writer = writer.requested_ip(ip);
    }
    let options = writer.parameter_request_list().finish();
    build_fixed(BOOTREQUEST, xid, secs, our_mac, Ipv4Addr::UNSPECIFIED, Ipv4Addr::UNSPECIFIED, &options)
}

/// Build a DHCPREQUEST BOOTP payload selecting `requested_ip` from `server_id`.
fn build_request_payload(
    xid: u32,
    secs: u16,
    our_mac: MacAddr,
    requested_ip: Ipv4Addr,
    server_id: Ipv4Addr,
) -> Vec<u8> {
    let options = OptionsWriter::new()
        .message_type(DhcpMessageKind::Request)
        .requested_ip(requested_ip)
        .server_id(server_id)
        .parameter_request_list()
        .finish();
    build_fixed(BOOTREQUEST, xid, secs, our_mac, Ipv4Addr::UNSPECIFIED, Ipv4Addr::UNSPECIFIED, &options)
}

fn build_fixed(
    op: u8,
    xid: u32,
    secs: u16,
    our_mac: MacAddr,
    ciaddr: Ipv4Addr,
    yiaddr: Ipv4Addr,
    options: &[u8],
) -> Vec<u8> {
    let mut buf = vec![0u8; FIXED_LEN + 4 + options.len()];
    buf[0] = op;
    buf[1] = HTYPE_ETHERNET;
    buf[2] = HLEN_ETHERNET;
    buf[3] = 0; // hops
    buf[4..8].copy_from_slice(&xid.to_be_bytes());
    buf[8..10].copy_from_slice(&secs.to_be_bytes());
    buf[10..12].copy_from_slice(&0u16.to_be_bytes()); // flags: unicast reply requested is out of scope
    buf[12..16].copy_from_slice(&ciaddr.octets());
    buf[16..20].copy_from_slice(&yiaddr.octets());
    // siaddr (20..24), giaddr (24..28) stay zero: no relay, no next-server hint.
    buf[28..34].copy_from_slice(&our_mac.octets());
    // chaddr padding (34..44), sname (44..108), file (108..236) stay zero.
    buf[FIXED_LEN..FIXED_LEN + 4].copy_from_slice(&MAGIC_COOKIE.to_be_bytes());
    buf[FIXED_LEN + 4..].copy_from_slice(options);
    buf
}

/// Parse a BOOTP message out of its UDP payload. Returns `None` on a
/// truncated fixed section, a wrong magic cookie, or an `op` other than
/// `BOOTREPLY`.
pub fn parse(payload: &[u8]) -> Option<DhcpMessage> {
    if payload.len() < FIXED_LEN + 4 {
        return None;
    }
    let op = payload[0];
    if op != BOOTREPLY {
        return None;
    }
    let xid = u32::from_be_bytes([payload[4], payload[5], payload[6], payload[7]]);
    let your_ip = Ipv4Addr::new(payload[16], payload[17], payload[18], payload[19]);
    let cookie = u32::from_be_bytes([
        payload[FIXED_LEN],
        payload[FIXED_LEN + 1],
        payload[FIXED_LEN + 2],
        payload[FIXED_LEN + 3],
    ]);
    if cookie != MAGIC_COOKIE {
        return None;
    }
    let options = DhcpOptions::parse(&payload[FIXED_LEN + 4..]);
    Some(DhcpMessage {
        op,
        xid,
        your_ip,
        options,
    })
}

/// Wrap a BOOTP payload in UDP/IPv4/Ethernet, broadcasting from
/// `0.0.0.0:68` to `255.255.255.255:67` with an all-ones destination MAC —
/// the initiator never has a server IP or MAC to unicast to.
pub fn wrap_broadcast(our_mac: MacAddr, payload: &[u8]) -> Vec<u8> {
    let udp_len = udp::HEADER_LEN + payload.len();
    let ip_len = ip::HEADER_LEN + udp_len;
    let frame_len = enet::HEADER_LEN + ip_len;

    let mut frame = vec![0u8; frame_len];
    EthernetHeader {
        dst: MacAddr::BROADCAST,
        src: our_mac,
        ethertype: EtherType::IpV4,
    }
    .write_into(&mut frame[0..enet::HEADER_LEN]);

    let ip_start = enet::HEADER_LEN;
    Ipv4Header {
        total_length: ip_len as u16,
        protocol: ip::PROTO_UDP,
        ttl: 64,
        src: Ipv4Addr::UNSPECIFIED,
        dst: Ipv4Addr::BROADCAST,
    }
    .write_into(&mut frame[ip_start..ip_start + ip::HEADER_LEN]);

    let udp_start = ip_start + ip::HEADER_LEN;
    UdpHeader {
        src_port: udp::DHCP_CLIENT_PORT,
        dst_port: udp::DHCP_SERVER_PORT,
        length: udp_len as u16,
    }
    .write_into(&mut frame[udp_start..udp_start + udp::HEADER_LEN]);

    frame[udp_start + udp::HEADER_LEN..].copy_from_slice(payload);
    frame
}

/// Build a complete DISCOVER frame ready to be handed out through the
/// translator's ingress/egress API.
pub fn build_discover(xid: u32, secs: u16, our_mac: MacAddr, requested_ip: Option<Ipv4Addr>) -> Vec<u8> {
    wrap_broadcast(our_mac, &build_discover_payload(xid, secs, our_mac, requested_ip))
}

/// Build a complete REQUEST frame ready to be handed out through the
/// translator's ingress/egress API.
pub fn build_request(
    xid: u32,
    secs: u16,
    our_mac: MacAddr,
    requested_ip: Ipv4Addr,
    server_id: Ipv4Addr,
) -> Vec<u8> {
    wrap_broadcast(our_mac, &build_request_payload(xid, secs, our_mac, requested_ip, server_id))
}

/// Strip Ethernet/IPv4/UDP framing off an ingress frame addressed to the
/// DHCP client port, returning the BOOTP payload. Returns `None` if the
/// frame isn't IPv4/UDP/68, or is too short at any layer.
pub fn unwrap_to_bootp_payload(frame: &[u8]) -> Option<&[u8]> {
    let eth = EthernetHeader::parse(frame)?;
    if eth.ethertype != EtherType::IpV4 {
        return None;
    }
    let ip_start = enet::HEADER_LEN;
    let ip_packet = frame.get(ip_start..)?;
    if ip::version(ip_packet) != Some(ip::VERSION_4) {
        return None;
    }
    if ip_packet.len() < ip::HEADER_LEN {
        return None;
    }
    let protocol = ip_packet[9];
    if protocol != ip::PROTO_UDP {
        return None;
    }
    let udp_start = ip_start + ip::HEADER_LEN;
    let udp_segment = frame.get(udp_start..)?;
    if udp_segment.len() < udp::HEADER_LEN {
        return None;
    }
    let dst_port = u16::from_be_bytes([udp_segment[2], udp_segment[3]]);
    if dst_port != udp::DHCP_CLIENT_PORT {
        return None;
    }
    Some(&udp_segment[udp::HEADER_LEN..])
}
