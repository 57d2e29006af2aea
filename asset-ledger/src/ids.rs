//! Identifier types for ledger entities
//!
//! Listing and trade IDs are opaque strings built from a UUIDv7, so they sort
//! by creation time. Transaction hashes are 32 random bytes rendered as
//! `0x`-prefixed lowercase hex; they are identifiers only and carry no
//! binding to the transaction payload.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap an existing identifier
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Get as string
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self::new(id)
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }
    };
}

string_id!(
    /// Account identifier (seller, buyer, or an address-like string)
    AccountId
);

string_id!(
    /// Listing identifier
    ListingId
);

string_id!(
    /// Trade identifier
    TradeId
);

string_id!(
    /// Transaction hash (`0x` + 64 hex characters)
    TxHash
);

impl AccountId {
    /// True for the empty account, which never matches any history
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl ListingId {
    /// Generate a fresh listing ID
    pub fn generate() -> Self {
        Self(format!("L_{}", Uuid::now_v7().simple()))
    }
}

impl TradeId {
    /// Generate a fresh trade ID
    pub fn generate() -> Self {
        Self(format!("T_{}", Uuid::now_v7().simple()))
    }
}

impl TxHash {
    /// Hex digits after the `0x` prefix
    pub const HEX_LEN: usize = 64;

    /// Draw a uniformly random hash
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let mut bytes = [0u8; Self::HEX_LEN / 2];
        rng.fill(&mut bytes[..]);
        Self(format!("0x{}", hex::encode(bytes)))
    }

    /// Check the `0x` + 64 lowercase hex shape
    pub fn is_well_formed(&self) -> bool {
        match self.0.strip_prefix("0x") {
            Some(digits) => {
                digits.len() == Self::HEX_LEN
                    && digits
                        .bytes()
                        .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
            }
            None => false,
        }
    }
}
