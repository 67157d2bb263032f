// SPDX-License-Identifier: MIT OR Apache-2.0

//! Byte fields are hex strings in JSON and plain byte strings in CBOR.
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serializer};
use serde_bytes::ByteBuf;

pub fn serialize_hex<S: Serializer>(value: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    if serializer.is_human_readable() {
        serializer.serialize_str(&hex::encode(value))
    } else {
        serializer.serialize_bytes(value)
    }
}

pub fn deserialize_hex<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
    if !deserializer.is_human_readable() {
        return ByteBuf::deserialize(deserializer).map(ByteBuf::into_vec);
    }

    let value = String::deserialize(deserializer)?;
    hex::decode(&value).map_err(|err| D::Error::custom(format!("invalid hex string: {err}")))
}
