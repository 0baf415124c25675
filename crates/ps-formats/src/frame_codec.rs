//! Little-endian frame map layout.
//!
//! ```text
//! "PSFM" version:u8 channel_count:u8
//! per channel: frame_count:u32, frame_count × 6-byte record
//! record: frequency:u16 volume:u8 release_point:u8 duration_scale-1:u16
//! ```

use std::io::Cursor;

use binrw::{binrw, BinRead, BinWrite};
use ps_ir::{FrameList, FrameMap, SeqFrame, MAX_CHANNELS};

use crate::FormatError;

pub const FORMAT_VERSION: u8 = 1;

#[binrw]
#[brw(little, magic = b"PSFM")]
#[derive(Debug)]
struct FrameFile {
    version: u8,
    #[br(temp)]
    #[bw(calc = channels.len() as u8)]
    channel_count: u8,
    #[br(count = channel_count)]
    channels: Vec<ChannelRecord>,
}

#[binrw]
#[brw(little)]
#[derive(Debug)]
struct ChannelRecord {
    #[br(temp)]
    #[bw(calc = frames.len() as u32)]
    frame_count: u32,
    #[br(count = frame_count)]
    frames: Vec<FrameRecord>,
}

#[binrw]
#[brw(little)]
#[derive(Debug, Clone, Copy)]
struct FrameRecord {
    frequency: u16,
    volume: u8,
    release_point: u8,
    duration_scale_minus_one: u16,
}

impl FrameRecord {
    fn pack(frame: &SeqFrame) -> Option<Self> {
        if !frame.is_valid() {
            return None;
        }
        Some(Self {
            frequency: frame.frequency,
            volume: frame.volume,
            release_point: frame.release_point,
            duration_scale_minus_one: u16::try_from(frame.duration_scale - 1).ok()?,
        })
    }

    fn unpack(self) -> SeqFrame {
        SeqFrame {
            frequency: self.frequency,
            volume: self.volume,
            duration_scale: self.duration_scale_minus_one as u32 + 1,
            release_point: self.release_point,
        }
    }
}

/// Serialize a frame map.
pub fn encode_frame_map(map: &FrameMap) -> Result<Vec<u8>, FormatError> {
    if map.channel_count() > MAX_CHANNELS {
        return Err(FormatError::TooLarge);
    }
    let mut channels = Vec::with_capacity(map.channel_count());
    for (channel, list) in map.channels().iter().enumerate() {
        if u32::try_from(list.len()).is_err() {
            return Err(FormatError::TooLarge);
        }
        let frames = list
            .iter()
            .enumerate()
            .map(|(index, frame)| {
                FrameRecord::pack(frame).ok_or(FormatError::InvalidFrame { channel, index })
            })
            .collect::<Result<Vec<_>, _>>()?;
        channels.push(ChannelRecord { frames });
    }

    let file = FrameFile {
        version: FORMAT_VERSION,
        channels,
    };
    let mut out = Cursor::new(Vec::new());
    file.write(&mut out)?;
    Ok(out.into_inner())
}

/// Parse a frame map, checking every frame.
pub fn decode_frame_map(data: &[u8]) -> Result<FrameMap, FormatError> {
    let file = FrameFile::read(&mut Cursor::new(data))?;
    if file.version != FORMAT_VERSION {
        return Err(FormatError::UnsupportedVersion(file.version));
    }
    if file.channels.len() > MAX_CHANNELS {
        return Err(FormatError::TooLarge);
    }

    let mut lists = Vec::with_capacity(file.channels.len());
    for (channel, record) in file.channels.into_iter().enumerate() {
        let mut list = FrameList::new();
        for (index, raw) in record.frames.into_iter().enumerate() {
            let frame = raw.unpack();
            if !frame.is_valid() {
                return Err(FormatError::InvalidFrame { channel, index });
            }
            list.push(frame)
                .map_err(|e| FormatError::Malformed(e.to_string()))?;
        }
        lists.push(list);
    }
    Ok(FrameMap::from(lists))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build a minimal file by hand.
    fn raw_file(version: u8, channels: &[&[[u8; 6]]]) -> Vec<u8> {
        let mut buf = b"PSFM".to_vec();
        buf.push(version);
        buf.push(channels.len() as u8);
        for frames in channels {
            buf.extend_from_slice(&(frames.len() as u32).to_le_bytes());
            for rec in frames.iter() {
                buf.extend_from_slice(rec);
            }
        }
        buf
    }

    #[test]
    fn compiled_song_survives_encoding() {
        let compiled = ps_mml::compile("A t150 l8 cdef&g\nB o3 ms a4 r4 n40", 22_050).unwrap();
        let bytes = encode_frame_map(&compiled.map).unwrap();
        let decoded = decode_frame_map(&bytes).unwrap();
        assert_eq!(decoded, compiled.map);
    }

    #[test]
    fn header_layout() {
        let mut map = FrameMap::new();
        map.channel_mut(1)
            .unwrap()
            .push(SeqFrame::note(0x01B8, 63, 0x0100, 27))
            .unwrap();
        let bytes = encode_frame_map(&map).unwrap();
        assert_eq!(&bytes[0..4], b"PSFM");
        assert_eq!(bytes[4], FORMAT_VERSION);
        assert_eq!(bytes[5], 2);
        // channel A: no frames
        assert_eq!(&bytes[6..10], &[0, 0, 0, 0]);
        // channel B: one frame, duration stored minus one
        assert_eq!(&bytes[10..14], &[1, 0, 0, 0]);
        assert_eq!(&bytes[14..20], &[0xB8, 0x01, 63, 27, 0xFF, 0x00]);
        assert_eq!(bytes.len(), 20);
    }

    #[test]
    fn longest_frame_fits() {
        let mut map = FrameMap::new();
        map.channel_mut(0)
            .unwrap()
            .push(SeqFrame::pause(ps_ir::MAX_DURATION_SCALE, 31))
            .unwrap();
        let decoded = decode_frame_map(&encode_frame_map(&map).unwrap()).unwrap();
        assert_eq!(
            decoded.channel(0).unwrap().as_slice()[0].duration_scale,
            ps_ir::MAX_DURATION_SCALE
        );
    }

    #[test]
    fn invalid_frame_is_not_encoded() {
        let mut map = FrameMap::new();
        map.channel_mut(0)
            .unwrap()
            .push(SeqFrame::note(440, 63, 0, 27))
            .unwrap();
        assert!(matches!(
            encode_frame_map(&map),
            Err(FormatError::InvalidFrame { channel: 0, index: 0 })
        ));
    }

    #[test]
    fn bad_magic_is_rejected() {
        let mut bytes = raw_file(FORMAT_VERSION, &[]);
        bytes[0] = b'X';
        assert!(matches!(decode_frame_map(&bytes), Err(FormatError::InvalidHeader)));
    }

    #[test]
    fn unknown_version_is_rejected() {
        let bytes = raw_file(9, &[]);
        assert!(matches!(
            decode_frame_map(&bytes),
            Err(FormatError::UnsupportedVersion(9))
        ));
    }

    #[test]
    fn truncated_file_is_rejected() {
        let bytes = raw_file(FORMAT_VERSION, &[&[[0xB8, 0x01, 63, 27, 0, 0]]]);
        let cut = &bytes[..bytes.len() - 2];
        assert!(matches!(decode_frame_map(cut), Err(FormatError::UnexpectedEof)));
    }

    #[test]
    fn release_point_out_of_range_is_rejected() {
        let bytes = raw_file(FORMAT_VERSION, &[&[], &[[0xB8, 0x01, 63, 32, 0, 0]]]);
        assert!(matches!(
            decode_frame_map(&bytes),
            Err(FormatError::InvalidFrame { channel: 1, index: 0 })
        ));
    }

    #[test]
    fn volume_out_of_range_is_rejected() {
        let bytes = raw_file(FORMAT_VERSION, &[&[[0xB8, 0x01, 129, 27, 0, 0]]]);
        assert!(matches!(
            decode_frame_map(&bytes),
            Err(FormatError::InvalidFrame { channel: 0, index: 0 })
        ));
    }
}
