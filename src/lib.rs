//! A userspace L2↔L3 protocol translator for bridging an IP-only TUN
//! interface into an Ethernet-framed VPN transport.
//!
//! [`Translator`] is the crate's single entry point. It owns no file
//! descriptors and performs no I/O or system calls of its own — callers
//! read packets off a TUN device and frames off a wire transport, hand
//! them to the translator's pure functions, and write whatever comes back.
//! Everything the translator needs that isn't in the packet itself (the
//! current time, a fresh DHCP transaction id) is passed in explicitly by
//! the caller rather than read from ambient state, so every operation
//! stays a pure function of its visible inputs.
//!
//! ```no_run
//! use taptun_bridge::{Translator, TranslatorConfig};
//!
//! let mut translator = Translator::new(TranslatorConfig::default());
//! // let ip_packet: &[u8] = ...; // read from the TUN device
//! // if let Ok(frame) = translator.ip_to_ethernet(ip_packet, now_ms()) {
//! //     // write `frame` to the wire transport
//! // }
//! # fn now_ms() -> u64 { 0 }
//! ```

#![deny(missing_docs)]

pub mod arp;
pub mod dhcp;
pub mod enet;
pub mod error;
pub mod ip;
pub mod learner;
pub mod mac;
pub mod translator;
pub mod udp;

pub use error::{Result, TranslatorError};
pub use mac::MacAddr;
pub use translator::{Stats, Translator, TranslatorConfig};

/// Derive bidirectional `From` impls for a C-like enum with an added
/// `Unknown` catch-all variant, so parsing a wire value never has to panic
/// or thread an error through for a value outside the known set.
///
/// Adapted from smoltcp's macro of the same name.
#[macro_export]
macro_rules! enum_with_unknown {
    (
        $( #[$enum_attr:meta] )*
        pub enum $name:ident($ty:ty) {
            $(
              $( #[$variant_attr:meta] )*
              $variant:ident = $value:expr
            ),+ $(,)?
        }
    ) => {
        #[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Hash)]
        $( #[$enum_attr] )*
        pub enum $name {
            $(
              $( #[$variant_attr] )*
              $variant
            ),*,
            /// Catch-all for values that do not match a known variant.
            Unknown($ty)
        }

        impl ::core::convert::From<$ty> for $name {
            fn from(value: $ty) -> Self {
                match value {
                    $( $value => $name::$variant ),*,
                    other => $name::Unknown(other)
                }
            }
        }

        impl ::core::convert::From<$name> for $ty {
            fn from(value: $name) -> Self {
                match value {
                    $( $name::$variant => $value ),*,
                    $name::Unknown(other) => other
                }
            }
        }
    }
}
