//! Primitive identifiers shared by the broker and its collaborators.
//!
//! 32-byte identifiers (addresses, key hashes, oracle handles) render as
//! base58, the same text form the ledger's account keys use. Random values
//! render as `0x`-prefixed hex and serialize as base64.

use std::fmt;
use std::str::FromStr;

use base64::Engine;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

/// Funding-asset amount in the asset's smallest unit.
pub type Amount = u64;

/// Failure to parse a base58 identifier.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseIdError {
    #[error("invalid base58 string")]
    InvalidBase58,
    #[error("expected 32 bytes, got {0}")]
    InvalidLength(usize),
}

macro_rules! base58_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(pub [u8; 32]);

        impl $name {
            /// The all-zero value, treated as "null".
            pub const ZERO: Self = Self([0u8; 32]);

            pub fn is_zero(&self) -> bool {
                self.0 == [0u8; 32]
            }

            pub fn to_bytes(&self) -> [u8; 32] {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&bs58::encode(self.0).into_string())
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self)
            }
        }

        impl FromStr for $name {
            type Err = ParseIdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let bytes = bs58::decode(s)
                    .into_vec()
                    .map_err(|_| ParseIdError::InvalidBase58)?;
                let bytes: [u8; 32] = bytes
                    .try_into()
                    .map_err(|v: Vec<u8>| ParseIdError::InvalidLength(v.len()))?;
                Ok(Self(bytes))
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                s.parse().map_err(de::Error::custom)
            }
        }
    };
}

base58_id!(
    /// An account on the hosting ledger: callers, the broker's custody
    /// account, the oracle coordinator, the funding asset.
    Address
);

base58_id!(
    /// Oracle routing key (the VRF key hash selecting the proving key and lane).
    KeyHash
);

base58_id!(
    /// Request identifier chosen by the oracle. Opaque and not sequential.
    OracleHandle
);

/// Identifier of a funding subscription held by the oracle coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubscriptionId(pub u64);

impl SubscriptionId {
    /// Data payload identifying this subscription in a `transfer_and_call`.
    pub fn to_call_data(self) -> Vec<u8> {
        self.0.to_le_bytes().to_vec()
    }

    pub fn from_call_data(data: &[u8]) -> Option<Self> {
        let bytes: [u8; 8] = data.try_into().ok()?;
        Some(Self(u64::from_le_bytes(bytes)))
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Broker-assigned request identifier. Strictly increasing, starts at 1.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct InternalRequestId(pub u64);

impl InternalRequestId {
    /// The counter value before any request has been minted.
    pub const NONE: Self = Self(0);

    pub fn next(self) -> Option<Self> {
        self.0.checked_add(1).map(Self)
    }
}

impl fmt::Display for InternalRequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A 256-bit random word, big-endian.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct RandomValue(pub [u8; 32]);

impl RandomValue {
    /// Returned for requests that have not been fulfilled.
    pub const ZERO: Self = Self([0u8; 32]);

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }
}

impl From<u64> for RandomValue {
    fn from(value: u64) -> Self {
        let mut bytes = [0u8; 32];
        bytes[24..].copy_from_slice(&value.to_be_bytes());
        Self(bytes)
    }
}

impl fmt::Display for RandomValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("0x")?;
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for RandomValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RandomValue({self})")
    }
}

impl Serialize for RandomValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&base64::engine::general_purpose::STANDARD.encode(self.0))
    }
}

impl<'de> Deserialize<'de> for RandomValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(s.as_bytes())
            .map_err(de::Error::custom)?;
        let bytes: [u8; 32] = bytes
            .try_into()
            .map_err(|v: Vec<u8>| de::Error::invalid_length(v.len(), &"32 bytes"))?;
        Ok(Self(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_base58_round_trips_through_text() {
        let addr = Address([9u8; 32]);
        let parsed: Address = addr.to_string().parse().unwrap();
        assert_eq!(parsed, addr);
    }

    #[test]
    fn address_rejects_short_input() {
        let short = bs58::encode([1u8; 4]).into_string();
        assert_eq!(short.parse::<Address>(), Err(ParseIdError::InvalidLength(4)));
        assert_eq!("0OIl".parse::<Address>(), Err(ParseIdError::InvalidBase58));
    }

    #[test]
    fn random_value_from_u64_is_big_endian() {
        let v = RandomValue::from(42u64);
        assert_eq!(v.0[31], 42);
        assert!(!v.is_zero());
        assert!(v.to_string().ends_with("2a"));
    }

    #[test]
    fn random_value_serializes_as_base64() {
        let v = RandomValue::from(42u64);
        let json = serde_json::to_string(&v).unwrap();
        assert_eq!(json, format!("\"{}\"", base64::engine::general_purpose::STANDARD.encode(v.0)));
        assert_eq!(serde_json::from_str::<RandomValue>(&json).unwrap(), v);

        let short = format!("\"{}\"", base64::engine::general_purpose::STANDARD.encode([1u8; 8]));
        assert!(serde_json::from_str::<RandomValue>(&short).is_err());
        assert!(serde_json::from_str::<RandomValue>("\"not base64!\"").is_err());
    }

    #[test]
    fn subscription_call_data() {
        let sub = SubscriptionId(77);
        assert_eq!(SubscriptionId::from_call_data(&sub.to_call_data()), Some(sub));
        assert_eq!(SubscriptionId::from_call_data(&[1, 2, 3]), None);
    }
}
