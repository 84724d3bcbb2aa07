//! 16-byte ASCII protocol tags.
//!
//! Specifiers identify RPCs, revision actions, and signature algorithms on
//! the wire. The tag is zero-padded ASCII; two specifiers are equal only
//! if all sixteen bytes match.

use serde::{Deserialize, Serialize};

use crate::codec::{Decoder, Encoder, WireDecode, WireEncode};
use crate::Result;

/// Length of a specifier in bytes.
pub const SPECIFIER_LEN: usize = 16;

/// A 16-byte zero-padded ASCII tag.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Specifier([u8; SPECIFIER_LEN]);

impl Specifier {
    /// Construct a specifier from an ASCII tag of at most 16 bytes.
    /// The remainder is zero-padded.
    pub const fn new(tag: &[u8]) -> Self {
        assert!(tag.len() <= SPECIFIER_LEN, "specifier tag too long");
        let mut bytes = [0u8; SPECIFIER_LEN];
        let mut i = 0;
        while i < tag.len() {
            bytes[i] = tag[i];
            i += 1;
        }
        Self(bytes)
    }

    /// Construct a specifier from its raw 16 bytes.
    pub const fn from_bytes(bytes: [u8; SPECIFIER_LEN]) -> Self {
        Self(bytes)
    }

    /// The raw 16 bytes.
    pub const fn as_bytes(&self) -> &[u8; SPECIFIER_LEN] {
        &self.0
    }
}

impl std::fmt::Display for Specifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let end = self.0.iter().position(|&b| b == 0).unwrap_or(SPECIFIER_LEN);
        f.write_str(&String::from_utf8_lossy(&self.0[..end]))
    }
}

impl std::fmt::Debug for Specifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Specifier({self})")
    }
}

impl WireEncode for Specifier {
    fn encode(&self, enc: &mut Encoder) {
        enc.write_raw(&self.0);
    }
}

impl WireDecode for Specifier {
    fn decode(dec: &mut Decoder<'_>) -> Result<Self> {
        Ok(Self(dec.read_array::<SPECIFIER_LEN>()?))
    }
}
