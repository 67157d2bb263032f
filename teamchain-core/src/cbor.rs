// SPDX-License-Identifier: MIT OR Apache-2.0

//! Link headers and bodies are encoded in [CBOR] before they get hashed and signed.
//!
//! [CBOR]: https://cbor.io/
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

pub fn encode_cbor<T: Serialize>(value: &T) -> Result<Vec<u8>, EncodeError> {
    let mut bytes = Vec::new();
    ciborium::into_writer(value, &mut bytes)?;
    Ok(bytes)
}

/// Decode a value from CBOR. Trailing bytes after the value are ignored.
pub fn decode_cbor<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, DecodeError> {
    Ok(ciborium::from_reader(bytes)?)
}

#[derive(Debug, Error)]
#[error("could not encode cbor: {0}")]
pub struct EncodeError(#[from] ciborium::ser::Error<std::io::Error>);

#[derive(Debug, Error)]
#[error("could not decode cbor: {0}")]
pub struct DecodeError(#[from] ciborium::de::Error<std::io::Error>);

#[cfg(test)]
mod tests {
    use crate::{TeamRole, Uid, UserVersion};

    use super::{decode_cbor, encode_cbor};

    #[test]
    fn encode_decode() {
        let value = (UserVersion::new(Uid::from_bytes([7; 16]), 3), TeamRole::Writer);

        let bytes = encode_cbor(&value).unwrap();
        let value_again: (UserVersion, TeamRole) = decode_cbor(&bytes).unwrap();

        assert_eq!(value, value_again);
    }

    #[test]
    fn truncated_input() {
        let bytes = encode_cbor(&UserVersion::new(Uid::from_bytes([7; 16]), 3)).unwrap();
        assert!(decode_cbor::<UserVersion>(&bytes[..bytes.len() - 2]).is_err());
    }
}
