//! The address lease obtained once the DHCP initiator reaches `Bound`.

use std::net::Ipv4Addr;

/// A leased address and the timers that govern renewing it.
///
/// Not part of the distilled wire-format spec, but a real DHCP client needs
/// somewhere to keep this information once it has it, so it's supplemented
/// here rather than left for the caller to reconstruct from raw ACK bytes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Lease {
    /// The address the server assigned us.
    pub assigned_ip: Ipv4Addr,
    /// The server that granted the lease, from its DHCP server identifier option.
    pub server_id: Ipv4Addr,
    /// Caller-supplied timestamp (milliseconds) at which the ACK was processed.
    pub obtained_at_ms: u64,
    /// Lease duration in seconds, from option 51.
    pub lease_time_secs: u32,
    /// Renewal (T1) time in seconds, from option 58 if present, else half the lease time.
    pub renewal_time_secs: u32,
    /// Rebinding (T2) time in seconds, from option 59 if present, else 0.875 of the lease time.
    pub rebinding_time_secs: u32,
    /// Subnet mask, from option 1, if the server sent one.
    pub subnet_mask: Option<Ipv4Addr>,
    /// Default router, from option 3, if the server sent one.
    pub router: Option<Ipv4Addr>,
    /// DNS servers, from option 6.
    pub dns_servers: Vec<Ipv4Addr>,
}

impl Lease {
    /// True once `now_ms` is at or past the end of the lease.
    pub fn is_expired(&self, now_ms: u64) -> bool {
        now_ms.saturating_sub(self.obtained_at_ms) >= u64::from(self.lease_time_secs) * 1000
    }

    /// True once `now_ms` has passed the renewal (T1) timer.
    pub fn needs_renewal(&self, now_ms: u64) -> bool {
        now_ms.saturating_sub(self.obtained_at_ms) >= u64::from(self.renewal_time_secs) * 1000
    }

    /// True once `now_ms` has passed the rebinding (T2) timer.
    pub fn needs_rebinding(&self, now_ms: u64) -> bool {
        now_ms.saturating_sub(self.obtained_at_ms) >= u64::from(self.rebinding_time_secs) * 1000
    }
}

/// Derive T1/T2 from an explicit server-provided value, or RFC 2131's
/// suggested defaults of 0.5 and 0.875 of the lease time.
pub(crate) fn renewal_or_default(lease_time_secs: u32, renewal_time_secs: Option<u32>) -> u32 {
    renewal_time_secs.unwrap_or(lease_time_secs / 2)
}

/// See [`renewal_or_default`].
pub(crate) fn rebinding_or_default(lease_time_secs: u32, rebinding_time_secs: Option<u32>) -> u32 {
    rebinding_time_secs.unwrap_or(lease_time_secs / 8 * 7)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_lease() -> Lease {
        Lease {
            assigned_ip: Ipv4Addr::new(10, 0, 0, 5),
            server_id: Ipv4Addr::new(10, 0, 0, 1),
            obtained_at_ms: 1_000,
            lease_time_secs: 100,
            renewal_time_secs: 50,
            rebinding_time_secs: 87,
            subnet_mask: Some(Ipv4Addr::new(255, 255, 255, 0)),
            router: Some(Ipv4Addr::new(10, 0, 0, 1)),
            dns_servers: vec![Ipv4Addr::new(8, 8, 8, 8)],
        }
    }

    #[test]
    fn timers_fire_in_order() {
        let lease = sample_lease();
        assert!(!lease.needs_renewal(1_000 + 49_000));
        assert!(lease.needs_renewal(1_000 + 50_000));
        assert!(!lease.needs_rebinding(1_000 + 86_000));
        assert!(lease.needs_rebinding(1_000 + 87_000));
        assert!(!lease.is_expired(1_000 + 99_000));
        assert!(lease.is_expired(1_000 + 100_000));
    }

    #[test]
    fn defaults_follow_rfc_2131_fractions() {
        assert_eq!(renewal_or_default(100, None), 50);
        assert_eq!(rebinding_or_default(100, None), 87);
        assert_eq!(renewal_or_default(100, Some(40)), 40);
    }
}
