//! Byte-level encoder/decoder and the `WireEncode`/`WireDecode` traits.
//!
//! The codec is deliberately free of domain knowledge: domain crates
//! implement the traits for their own types. Integers are little-endian
//! and fixed-width; byte strings and sequences carry a `u64` length
//! prefix.

use crate::{Result, WireError};

/// Append-only byte encoder.
#[derive(Default)]
pub struct Encoder {
    buf: Vec<u8>,
}

impl Encoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume the encoder, returning the encoded bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    pub fn write_bool(&mut self, v: bool) {
        self.buf.push(u8::from(v));
    }

    pub fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_u128(&mut self, v: u128) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    /// Write raw bytes with no length prefix (fixed-width fields).
    pub fn write_raw(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Write a `u64` length prefix followed by the bytes.
    pub fn write_prefixed(&mut self, bytes: &[u8]) {
        self.write_u64(bytes.len() as u64);
        self.buf.extend_from_slice(bytes);
    }

    pub fn write_str(&mut self, s: &str) {
        self.write_prefixed(s.as_bytes());
    }

    /// Write a `u64` element count followed by each element's encoding.
    pub fn write_seq<T: WireEncode>(&mut self, items: &[T]) {
        self.write_u64(items.len() as u64);
        for item in items {
            item.encode(self);
        }
    }
}

/// Cursor over a byte slice being decoded.
pub struct Decoder<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Decoder<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Number of bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.remaining() < n {
            return Err(WireError::UnexpectedEof);
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn read_bool(&mut self) -> Result<bool> {
        match self.read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(WireError::InvalidBool(other)),
        }
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        let bytes: [u8; 4] = self.take(4)?.try_into().expect("sized slice");
        Ok(u32::from_le_bytes(bytes))
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        let bytes: [u8; 8] = self.take(8)?.try_into().expect("sized slice");
        Ok(u64::from_le_bytes(bytes))
    }

    pub fn read_u128(&mut self) -> Result<u128> {
        let bytes: [u8; 16] = self.take(16)?.try_into().expect("sized slice");
        Ok(u128::from_le_bytes(bytes))
    }

    /// Read a fixed-width byte array.
    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        Ok(self.take(N)?.try_into().expect("sized slice"))
    }

    /// Read exactly `n` raw bytes with no framing.
    pub fn read_exact_slice(&mut self, n: usize) -> Result<&'a [u8]> {
        self.take(n)
    }

    /// Read a `u64` length prefix and that many bytes.
    ///
    /// The prefix is validated against the bytes actually remaining, so a
    /// hostile length can never trigger a large allocation.
    pub fn read_prefixed(&mut self) -> Result<&'a [u8]> {
        let len = self.read_u64()?;
        if len > self.remaining() as u64 {
            return Err(WireError::BadLength(len));
        }
        self.take(len as usize)
    }

    pub fn read_str(&mut self) -> Result<String> {
        let bytes = self.read_prefixed()?;
        String::from_utf8(bytes.to_vec()).map_err(|_| WireError::InvalidUtf8)
    }

    /// Read a `u64` element count followed by that many decoded elements.
    pub fn read_seq<T: WireDecode>(&mut self) -> Result<Vec<T>> {
        let count = self.read_u64()?;
        // Each element consumes at least one byte; a count beyond the
        // remaining bytes is malformed regardless of element type.
        if count > self.remaining() as u64 {
            return Err(WireError::BadLength(count));
        }
        let mut items = Vec::with_capacity(count as usize);
        for _ in 0..count {
            items.push(T::decode(self)?);
        }
        Ok(items)
    }

    /// Require that every byte has been consumed.
    pub fn finish(&self) -> Result<()> {
        if self.remaining() != 0 {
            return Err(WireError::TrailingBytes);
        }
        Ok(())
    }
}

/// Types that can be written in the canonical wire encoding.
pub trait WireEncode {
    fn encode(&self, enc: &mut Encoder);
}

/// Types that can be read from the canonical wire encoding.
pub trait WireDecode: Sized {
    fn decode(dec: &mut Decoder<'_>) -> Result<Self>;
}

/// Encode an object to its canonical byte form.
pub fn to_bytes<T: WireEncode>(obj: &T) -> Vec<u8> {
    let mut enc = Encoder::new();
    obj.encode(&mut enc);
    enc.into_bytes()
}

/// Decode an object from its canonical byte form, requiring that the
/// entire input is consumed.
pub fn from_bytes<T: WireDecode>(bytes: &[u8]) -> Result<T> {
    let mut dec = Decoder::new(bytes);
    let obj = T::decode(&mut dec)?;
    dec.finish()?;
    Ok(obj)
}

impl WireEncode for u64 {
    fn encode(&self, enc: &mut Encoder) {
        enc.write_u64(*self);
    }
}

impl WireDecode for u64 {
    fn decode(dec: &mut Decoder<'_>) -> Result<Self> {
        dec.read_u64()
    }
}

impl<T: WireEncode> WireEncode for Vec<T> {
    fn encode(&self, enc: &mut Encoder) {
        enc.write_seq(self);
    }
}

impl<T: WireDecode> WireDecode for Vec<T> {
    fn decode(dec: &mut Decoder<'_>) -> Result<Self> {
        dec.read_seq()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_int_roundtrip() {
        let mut enc = Encoder::new();
        enc.write_u8(7);
        enc.write_u32(0xDEAD_BEEF);
        enc.write_u64(u64::MAX);
        enc.write_u128(1 << 100);
        let bytes = enc.into_bytes();

        let mut dec = Decoder::new(&bytes);
        assert_eq!(dec.read_u8().expect("u8"), 7);
        assert_eq!(dec.read_u32().expect("u32"), 0xDEAD_BEEF);
        assert_eq!(dec.read_u64().expect("u64"), u64::MAX);
        assert_eq!(dec.read_u128().expect("u128"), 1 << 100);
        dec.finish().expect("consumed");
    }

    #[test]
    fn test_little_endian_layout() {
        let mut enc = Encoder::new();
        enc.write_u64(1);
        assert_eq!(enc.into_bytes(), [1, 0, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_prefixed_roundtrip() {
        let mut enc = Encoder::new();
        enc.write_prefixed(b"hello");
        let bytes = enc.into_bytes();
        assert_eq!(&bytes[..8], &5u64.to_le_bytes());

        let mut dec = Decoder::new(&bytes);
        assert_eq!(dec.read_prefixed().expect("bytes"), b"hello");
    }

    #[test]
    fn test_hostile_length_prefix() {
        let mut enc = Encoder::new();
        enc.write_u64(u64::MAX);
        let bytes = enc.into_bytes();

        let mut dec = Decoder::new(&bytes);
        assert!(matches!(
            dec.read_prefixed(),
            Err(WireError::BadLength(u64::MAX))
        ));
    }

    #[test]
    fn test_string_roundtrip() {
        let mut enc = Encoder::new();
        enc.write_str("host.example:9982");
        let bytes = enc.into_bytes();
        let mut dec = Decoder::new(&bytes);
        assert_eq!(dec.read_str().expect("str"), "host.example:9982");
    }

    #[test]
    fn test_invalid_utf8() {
        let mut enc = Encoder::new();
        enc.write_prefixed(&[0xFF, 0xFE]);
        let bytes = enc.into_bytes();
        let mut dec = Decoder::new(&bytes);
        assert!(matches!(dec.read_str(), Err(WireError::InvalidUtf8)));
    }

    #[test]
    fn test_seq_roundtrip() {
        let values: Vec<u64> = vec![1, 2, 3];
        let mut enc = Encoder::new();
        enc.write_seq(&values);
        let bytes = enc.into_bytes();
        let mut dec = Decoder::new(&bytes);
        assert_eq!(dec.read_seq::<u64>().expect("seq"), values);
    }

    #[test]
    fn test_hostile_seq_count() {
        let mut enc = Encoder::new();
        enc.write_u64(u64::MAX);
        let bytes = enc.into_bytes();
        let mut dec = Decoder::new(&bytes);
        assert!(dec.read_seq::<u64>().is_err());
    }

    #[test]
    fn test_bool_validation() {
        let mut dec = Decoder::new(&[2]);
        assert!(matches!(dec.read_bool(), Err(WireError::InvalidBool(2))));
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        let bytes = [0u8; 9];
        assert!(matches!(
            from_bytes::<u64>(&bytes),
            Err(WireError::TrailingBytes)
        ));
    }

    #[test]
    fn test_eof() {
        let mut dec = Decoder::new(&[0u8; 3]);
        assert!(matches!(dec.read_u64(), Err(WireError::UnexpectedEof)));
    }
}
