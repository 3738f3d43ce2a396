//! Errors surfaced across the public translator API.
//!
//! Only two kinds ever cross the boundary to a caller; every other failure
//! mode (malformed ARP, a full reply queue, a truncated DHCP option) is
//! absorbed internally and is only observable, if at all, through a
//! `tracing` event.

use thiserror::Error;

/// Errors returned by [`crate::Translator`] operations.
#[derive(Debug, Error)]
pub enum TranslatorError {
    /// The input buffer was too short for its claimed contents, or its
    /// leading version nibble did not match a recognized IP version.
    #[error("invalid packet: {reason}")]
    InvalidPacket {
        /// Human-readable reason, for logs only; never matched on by callers.
        reason: &'static str,
    },

    /// A heap allocation needed to produce the caller-visible output could
    /// not be satisfied. The translator's internal state is unchanged.
    #[error("out of memory while building translator output")]
    OutOfMemory,
}

impl TranslatorError {
    pub(crate) fn invalid(reason: &'static str) -> Self {
        TranslatorError::InvalidPacket { reason }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, TranslatorError>;

/// Allocate a zero-filled `Vec<u8>` of exactly `len` bytes, surfacing
/// allocation failure as [`TranslatorError::OutOfMemory`] instead of letting
/// the global allocator abort the process.
pub(crate) fn try_alloc_zeroed(len: usize) -> Result<Vec<u8>> {
    let mut buf: Vec<u8> = Vec::new();
    buf.try_reserve_exact(len)
        .map_err(|_| TranslatorError::OutOfMemory)?;
    buf.resize(len, 0);
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn try_alloc_zeroed_produces_right_length() {
        let buf = try_alloc_zeroed(42).unwrap();
        assert_eq!(buf.len(), 42);
        assert!(buf.iter().all(|&b| b == 0));
    }

    #[test]
    fn invalid_packet_carries_reason() {
        let err = TranslatorError::invalid("too short");
        assert_eq!(err.to_string(), "invalid packet: too short");
    }
}
