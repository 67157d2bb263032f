// SPDX-License-Identifier: MIT OR Apache-2.0

use thiserror::Error;

/// Defines a fixed-size identifier which is shown and parsed as hex and encoded as raw bytes in
/// CBOR.
macro_rules! fixed_id {
    ($(#[$meta:meta])* $name:ident, $len:expr) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name([u8; $len]);

        impl $name {
            /// Create an identifier from its raw bytes representation.
            pub const fn from_bytes(bytes: [u8; $len]) -> Self {
                Self(bytes)
            }

            /// Bytes of the identifier.
            pub fn as_bytes(&self) -> &[u8; $len] {
                &self.0
            }

            /// Convert the identifier to a hex string.
            pub fn to_hex(&self) -> String {
                hex::encode(self.0)
            }
        }

        impl TryFrom<&[u8]> for $name {
            type Error = $crate::id::IdError;

            fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
                let checked_value: [u8; $len] = value
                    .try_into()
                    .map_err(|_| $crate::id::IdError::InvalidLength(value.len(), $len))?;
                Ok(Self(checked_value))
            }
        }

        impl std::str::FromStr for $name {
            type Err = $crate::id::IdError;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                Self::try_from(hex::decode(value)?.as_slice())
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.to_hex())
            }
        }

        impl std::fmt::Debug for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.debug_tuple(stringify!($name)).field(&self.to_hex()).finish()
            }
        }

        impl serde::Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: serde::Serializer,
            {
                $crate::serde::serialize_hex(&self.0, serializer)
            }
        }

        impl<'de> serde::Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let bytes = $crate::serde::deserialize_hex(deserializer)?;
                bytes
                    .as_slice()
                    .try_into()
                    .map_err(|err: $crate::id::IdError| serde::de::Error::custom(err.to_string()))
            }
        }
    };
}

pub(crate) use fixed_id;

/// Error types for fixed-size identifiers (user, team and invite ids).
#[derive(Error, Debug)]
pub enum IdError {
    #[error("invalid id length {0} bytes, expected {1} bytes")]
    InvalidLength(usize, usize),

    #[error("invalid hex encoding in id string")]
    InvalidHexEncoding(#[from] hex::FromHexError),
}
