//! Object framing, signed objects, and negotiation response tags.
//!
//! Framed objects travel as `[len:u64 LE][body]`. A signed object is a
//! framed body followed by a raw 64-byte Ed25519 signature over the body
//! bytes. Negotiation responses are single byte tags.

use std::io::{Read, Write};

use tessera_crypto::ed25519::{Signature, SigningKey, VerifyingKey};

use crate::codec::{from_bytes, to_bytes, WireDecode, WireEncode};
use crate::specifier::{Specifier, SPECIFIER_LEN};
use crate::{Result, WireError};

/// Byte tag: the peer accepts and the exchange continues.
pub const RESPONSE_ACCEPT: u8 = 0x01;

/// Byte tag: the current iteration is fine, but send no more.
pub const RESPONSE_STOP: u8 = 0x02;

/// A negotiation response tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Response {
    Accept,
    Stop,
}

/// Write a framed object: `[len:u64][body]`.
pub fn write_object<T: WireEncode>(w: &mut impl Write, obj: &T) -> Result<()> {
    let body = to_bytes(obj);
    w.write_all(&(body.len() as u64).to_le_bytes())?;
    w.write_all(&body)?;
    Ok(())
}

/// Read a framed object, failing with [`WireError::Oversize`] before
/// allocating if the length prefix exceeds `max_len`.
pub fn read_object<T: WireDecode>(r: &mut impl Read, max_len: u64) -> Result<T> {
    let body = read_frame(r, max_len)?;
    from_bytes(&body)
}

/// Write a framed object followed by a 64-byte signature over its body.
pub fn write_signed_object<T: WireEncode>(
    w: &mut impl Write,
    obj: &T,
    key: &SigningKey,
) -> Result<()> {
    let body = to_bytes(obj);
    let sig = key.sign(&body);
    w.write_all(&(body.len() as u64).to_le_bytes())?;
    w.write_all(&body)?;
    w.write_all(&sig.to_bytes())?;
    Ok(())
}

/// Read a framed object followed by a 64-byte signature, verifying the
/// signature over the body bytes before decoding.
pub fn read_signed_object<T: WireDecode>(
    r: &mut impl Read,
    max_len: u64,
    key: &VerifyingKey,
) -> Result<T> {
    let body = read_frame(r, max_len)?;
    let sig_bytes: [u8; 64] = read_array(r)?;
    let sig = Signature::from_bytes(&sig_bytes);
    key.verify(&body, &sig)
        .map_err(|_| WireError::SignatureInvalid)?;
    from_bytes(&body)
}

/// Write an unframed 16-byte specifier.
pub fn write_specifier(w: &mut impl Write, spec: &Specifier) -> Result<()> {
    w.write_all(spec.as_bytes())?;
    Ok(())
}

/// Read an unframed 16-byte specifier.
pub fn read_specifier(r: &mut impl Read) -> Result<Specifier> {
    let bytes: [u8; SPECIFIER_LEN] = read_array(r)?;
    Ok(Specifier::from_bytes(bytes))
}

/// Write a single-byte negotiation response.
pub fn write_response(w: &mut impl Write, response: Response) -> Result<()> {
    let tag = match response {
        Response::Accept => RESPONSE_ACCEPT,
        Response::Stop => RESPONSE_STOP,
    };
    w.write_all(&[tag])?;
    Ok(())
}

/// Read a single-byte negotiation response, failing with
/// [`WireError::BadResponse`] on an unrecognized tag.
pub fn read_response(r: &mut impl Read) -> Result<Response> {
    let mut tag = [0u8; 1];
    r.read_exact(&mut tag)?;
    match tag[0] {
        RESPONSE_ACCEPT => Ok(Response::Accept),
        RESPONSE_STOP => Ok(Response::Stop),
        other => Err(WireError::BadResponse(other)),
    }
}

/// Read a fixed-width field with no framing.
pub fn read_array<const N: usize>(r: &mut impl Read) -> Result<[u8; N]> {
    let mut buf = [0u8; N];
    r.read_exact(&mut buf)?;
    Ok(buf)
}

/// Write a length-prefixed byte string.
pub fn write_prefixed(w: &mut impl Write, bytes: &[u8]) -> Result<()> {
    w.write_all(&(bytes.len() as u64).to_le_bytes())?;
    w.write_all(bytes)?;
    Ok(())
}

/// Read a length-prefixed byte string of at most `max_len` bytes.
pub fn read_prefixed(r: &mut impl Read, max_len: u64) -> Result<Vec<u8>> {
    read_frame(r, max_len)
}

fn read_frame(r: &mut impl Read, max_len: u64) -> Result<Vec<u8>> {
    let mut len_buf = [0u8; 8];
    r.read_exact(&mut len_buf)?;
    let len = u64::from_le_bytes(len_buf);
    if len > max_len {
        return Err(WireError::Oversize { len, max: max_len });
    }
    let mut body = vec![0u8; len as usize];
    r.read_exact(&mut body)?;
    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_object_roundtrip() {
        let mut buf = Vec::new();
        write_object(&mut buf, &42u64).expect("write");
        assert_eq!(&buf[..8], &8u64.to_le_bytes());

        let mut cursor = Cursor::new(buf);
        let value: u64 = read_object(&mut cursor, 64).expect("read");
        assert_eq!(value, 42);
    }

    #[test]
    fn test_oversize_rejected_before_alloc() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&u64::MAX.to_le_bytes());

        let mut cursor = Cursor::new(buf);
        let err = read_object::<u64>(&mut cursor, 1024).expect_err("oversize");
        assert!(matches!(err, WireError::Oversize { len: u64::MAX, .. }));
    }

    #[test]
    fn test_signed_object_roundtrip() {
        let key = SigningKey::generate();
        let mut buf = Vec::new();
        write_signed_object(&mut buf, &7u64, &key).expect("write");

        let mut cursor = Cursor::new(buf);
        let value: u64 =
            read_signed_object(&mut cursor, 64, &key.verifying_key()).expect("read");
        assert_eq!(value, 7);
    }

    #[test]
    fn test_signed_object_wrong_key() {
        let key = SigningKey::generate();
        let other = SigningKey::generate();
        let mut buf = Vec::new();
        write_signed_object(&mut buf, &7u64, &key).expect("write");

        let mut cursor = Cursor::new(buf);
        let err = read_signed_object::<u64>(&mut cursor, 64, &other.verifying_key())
            .expect_err("bad signature");
        assert!(matches!(err, WireError::SignatureInvalid));
    }

    #[test]
    fn test_signed_object_tampered_body() {
        let key = SigningKey::generate();
        let mut buf = Vec::new();
        write_signed_object(&mut buf, &7u64, &key).expect("write");
        buf[8] ^= 0xFF;

        let mut cursor = Cursor::new(buf);
        assert!(read_signed_object::<u64>(&mut cursor, 64, &key.verifying_key()).is_err());
    }

    #[test]
    fn test_specifier_roundtrip() {
        let mut buf = Vec::new();
        write_specifier(&mut buf, &Specifier::new(b"Upload")).expect("write");
        assert_eq!(buf.len(), SPECIFIER_LEN);

        let mut cursor = Cursor::new(buf);
        assert_eq!(
            read_specifier(&mut cursor).expect("read"),
            Specifier::new(b"Upload")
        );
    }

    #[test]
    fn test_response_tags() {
        for response in [Response::Accept, Response::Stop] {
            let mut buf = Vec::new();
            write_response(&mut buf, response).expect("write");
            let mut cursor = Cursor::new(buf);
            assert_eq!(read_response(&mut cursor).expect("read"), response);
        }
    }

    #[test]
    fn test_unknown_response_tag() {
        let mut cursor = Cursor::new(vec![0x7F]);
        assert!(matches!(
            read_response(&mut cursor),
            Err(WireError::BadResponse(0x7F))
        ));
    }
}
