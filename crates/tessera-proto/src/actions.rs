//! Revision actions and the action set.
//!
//! Before each revision exchange the renter announces what it is paying
//! for: storing a full sector, or reading a byte range out of one. The
//! wire form is `[count:u64]` followed by, per action,
//! `[type:16][sector_index:u64][offset:u64][data_len:u64][data]`. Download
//! actions carry no data bytes; their `data_len` is the requested length.

use tessera_wire::{Decoder, Encoder, Result, WireDecode, WireEncode, WireError};

use crate::{ACTION_DOWNLOAD, ACTION_UPLOAD};
use tessera_wire::Specifier;

/// One operation announced to the host.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RevisionAction {
    pub action_type: Specifier,
    pub sector_index: u64,
    pub offset: u64,
    /// Requested length for downloads; equals `data.len()` for uploads.
    pub length: u64,
    pub data: Vec<u8>,
}

impl RevisionAction {
    /// Store `data` as the sector at `sector_index`.
    pub fn upload(sector_index: u64, data: Vec<u8>) -> Self {
        Self {
            action_type: ACTION_UPLOAD,
            sector_index,
            offset: 0,
            length: data.len() as u64,
            data,
        }
    }

    /// Read `length` bytes at `offset` within the sector at `sector_index`.
    pub fn download(sector_index: u64, offset: u64, length: u64) -> Self {
        Self {
            action_type: ACTION_DOWNLOAD,
            sector_index,
            offset,
            length,
            data: Vec::new(),
        }
    }
}

/// The list of actions for one iteration.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ActionSet(pub Vec<RevisionAction>);

/// Stream a single-upload action set directly to the wire.
///
/// Equivalent to framing `ActionSet(vec![RevisionAction::upload(..)])`
/// but without copying the sector into an intermediate buffer; the sector
/// bytes are written straight from the caller's buffer.
pub fn write_upload_action(
    w: &mut impl std::io::Write,
    sector_index: u64,
    sector: &[u8],
) -> Result<()> {
    let body_len = 8 + 16 + 8 + 8 + 8 + sector.len();

    let mut head = Encoder::new();
    head.write_u64(body_len as u64);
    head.write_u64(1);
    ACTION_UPLOAD.encode(&mut head);
    head.write_u64(sector_index);
    head.write_u64(0);
    head.write_u64(sector.len() as u64);

    w.write_all(&head.into_bytes())?;
    w.write_all(sector)?;
    Ok(())
}

impl WireEncode for ActionSet {
    fn encode(&self, enc: &mut Encoder) {
        enc.write_u64(self.0.len() as u64);
        for action in &self.0 {
            action.action_type.encode(enc);
            enc.write_u64(action.sector_index);
            enc.write_u64(action.offset);
            enc.write_u64(action.length);
            enc.write_raw(&action.data);
        }
    }
}

impl WireDecode for ActionSet {
    fn decode(dec: &mut Decoder<'_>) -> Result<Self> {
        let count = dec.read_u64()?;
        if count > dec.remaining() as u64 {
            return Err(WireError::BadLength(count));
        }
        let mut actions = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let action_type = Specifier::decode(dec)?;
            let sector_index = dec.read_u64()?;
            let offset = dec.read_u64()?;
            let length = dec.read_u64()?;
            let data = if action_type == ACTION_UPLOAD {
                if length > dec.remaining() as u64 {
                    return Err(WireError::BadLength(length));
                }
                dec.read_exact_slice(length as usize)?.to_vec()
            } else {
                Vec::new()
            };
            actions.push(RevisionAction {
                action_type,
                sector_index,
                offset,
                length,
                data,
            });
        }
        Ok(Self(actions))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_wire::{from_bytes, to_bytes};

    #[test]
    fn test_upload_action_layout() {
        let set = ActionSet(vec![RevisionAction::upload(3, vec![0xAA; 10])]);
        let bytes = to_bytes(&set);

        assert_eq!(&bytes[..8], &1u64.to_le_bytes());
        assert_eq!(&bytes[8..24], ACTION_UPLOAD.as_bytes());
        assert_eq!(&bytes[24..32], &3u64.to_le_bytes());
        assert_eq!(&bytes[32..40], &0u64.to_le_bytes());
        assert_eq!(&bytes[40..48], &10u64.to_le_bytes());
        assert_eq!(&bytes[48..], &[0xAA; 10]);
    }

    #[test]
    fn test_upload_roundtrip() {
        let set = ActionSet(vec![RevisionAction::upload(7, vec![1, 2, 3, 4])]);
        let back: ActionSet = from_bytes(&to_bytes(&set)).expect("decode");
        assert_eq!(back, set);
    }

    #[test]
    fn test_download_roundtrip() {
        let set = ActionSet(vec![RevisionAction::download(2, 128, 4096)]);
        let back: ActionSet = from_bytes(&to_bytes(&set)).expect("decode");
        assert_eq!(back, set);
        assert!(back.0[0].data.is_empty());
        assert_eq!(back.0[0].length, 4096);
    }

    #[test]
    fn test_hostile_count_rejected() {
        let mut enc = Encoder::new();
        enc.write_u64(u64::MAX);
        assert!(from_bytes::<ActionSet>(&enc.into_bytes()).is_err());
    }

    #[test]
    fn test_streamed_upload_matches_framed_encoding() {
        let sector = vec![0xCD; 512];
        let mut streamed = Vec::new();
        write_upload_action(&mut streamed, 9, &sector).expect("stream");

        let set = ActionSet(vec![RevisionAction::upload(9, sector)]);
        let mut framed = Vec::new();
        tessera_wire::frame::write_object(&mut framed, &set).expect("frame");

        assert_eq!(streamed, framed);
    }

    #[test]
    fn test_truncated_upload_data_rejected() {
        let set = ActionSet(vec![RevisionAction::upload(0, vec![0xBB; 100])]);
        let bytes = to_bytes(&set);
        assert!(from_bytes::<ActionSet>(&bytes[..bytes.len() - 1]).is_err());
    }
}
