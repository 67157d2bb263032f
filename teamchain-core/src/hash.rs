// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::id::fixed_id;

/// Size of BLAKE3 hashes.
pub const HASH_LEN: usize = blake3::OUT_LEN;

fixed_id!(
    /// 32-byte BLAKE3 hash, used as link id and to address link bodies.
    Hash,
    HASH_LEN
);

impl Hash {
    /// Calculate the hash of the provided bytes.
    pub fn new(buf: impl AsRef<[u8]>) -> Self {
        Self(*blake3::hash(buf.as_ref()).as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use crate::id::IdError;

    use super::Hash;

    #[test]
    fn hashing() {
        let hash = Hash::new([1, 2, 3]);

        assert_eq!(
            hash.to_hex(),
            "b177ec1bf26dfb3b7010d473e6d44713b29b765b99c6e60ecbfae742de496543"
        );
        assert_eq!(hash, Hash::new(vec![1, 2, 3]));
        assert_ne!(hash, Hash::new([3, 2, 1]));
    }

    #[test]
    fn hex_in_json_bytes_in_cbor() {
        let hash = Hash::new(b"link");

        let json = serde_json::to_string(&hash).unwrap();
        assert_eq!(json, format!("\"{}\"", hash.to_hex()));
        assert_eq!(serde_json::from_str::<Hash>(&json).unwrap(), hash);

        // 2 bytes of CBOR byte string header, then the raw hash.
        let cbor = crate::encode_cbor(&hash).unwrap();
        assert_eq!(cbor.len(), 34);
        assert_eq!(&cbor[2..], hash.as_bytes());
    }

    #[test]
    fn parse_errors() {
        let result: Result<Hash, IdError> = [254, 100, 4, 7].as_slice().try_into();
        assert_matches!(result, Err(IdError::InvalidLength(4, 32)));

        assert_matches!(
            "notreallyahexstring".parse::<Hash>(),
            Err(IdError::InvalidHexEncoding(_))
        );
    }
}
