//! Link layer: Ethernet II framing.
//!
//! `[6 dst][6 src][2 ethertype big-endian][payload]`, no VLAN tag, no FCS —
//! those belong to whatever NIC or packet-capture layer sits below the
//! translator, never to this crate.

use crate::enum_with_unknown;
use crate::mac::MacAddr;

/// Size in bytes of an Ethernet II header (dst + src + ethertype).
pub const HEADER_LEN: usize = 14;

enum_with_unknown! {
    /// EtherType values this translator cares about. Anything else is
    /// preserved as `Unknown` and silently ignored by the ingress path.
    pub enum EtherType(u16) {
        /// IPv4
        IpV4 = 0x0800,
        /// Address Resolution Protocol
        Arp = 0x0806,
        /// IPv6 (forwarded opaquely; no neighbor discovery in scope)
        IpV6 = 0x86DD,
    }
}

/// An Ethernet II header: destination, source, ethertype.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EthernetHeader {
    /// Destination hardware address.
    pub dst: MacAddr,
    /// Source hardware address.
    pub src: MacAddr,
    /// Payload ethertype.
    pub ethertype: EtherType,
}

impl EthernetHeader {
    /// Write this header into the first [`HEADER_LEN`] bytes of `out`.
    ///
    /// Panics if `out` is shorter than `HEADER_LEN`; callers always size
    /// their buffer before calling this.
    pub fn write_into(&self, out: &mut [u8]) {
        debug_assert!(out.len() >= HEADER_LEN);
        out[0..6].copy_from_slice(&self.dst.octets());
        out[6..12].copy_from_slice(&self.src.octets());
        out[12..14].copy_from_slice(&u16::from(self.ethertype).to_be_bytes());
    }

    /// Parse a header from the front of `frame`.
    ///
    /// Returns `None` if `frame` is shorter than [`HEADER_LEN`]; the caller
    /// turns that into `TranslatorError::InvalidPacket`.
    pub fn parse(frame: &[u8]) -> Option<Self> {
        if frame.len() < HEADER_LEN {
            return None;
        }
        let dst = MacAddr::from_slice(&frame[0..6])?;
        let src = MacAddr::from_slice(&frame[6..12])?;
        let ethertype = EtherType::from(u16::from_be_bytes([frame[12], frame[13]]));
        Some(EthernetHeader { dst, src, ethertype })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_bytes() {
        let hdr = EthernetHeader {
            dst: MacAddr::BROADCAST,
            src: MacAddr::new([2, 0, 0x5E, 0, 0, 1]),
            ethertype: EtherType::IpV4,
        };
        let mut buf = [0u8; HEADER_LEN];
        hdr.write_into(&mut buf);
        assert_eq!(buf[12..14], [0x08, 0x00]);
        let parsed = EthernetHeader::parse(&buf).unwrap();
        assert_eq!(parsed, hdr);
    }

    #[test]
    fn parse_rejects_short_input() {
        assert!(EthernetHeader::parse(&[0u8; 13]).is_none());
    }

    #[test]
    fn unknown_ethertype_is_preserved() {
        let et = EtherType::from(0x1234u16);
        assert_eq!(et, EtherType::Unknown(0x1234));
        assert_eq!(u16::from(et), 0x1234);
    }
}
