//! File formats for polysynth.
//!
//! Binary persistence of compiled frame maps and 8-bit WAV export of
//! rendered audio.

mod frame_codec;
mod wav_format;

pub use frame_codec::{decode_frame_map, encode_frame_map, FORMAT_VERSION};
pub use wav_format::{samples_to_wav, write_wav};

/// Error type for format encoding and decoding.
#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    /// Invalid file header or magic bytes
    #[error("invalid header")]
    InvalidHeader,
    /// Unexpected end of file
    #[error("unexpected end of file")]
    UnexpectedEof,
    #[error("unsupported format version {0}")]
    UnsupportedVersion(u8),
    /// A decoded frame breaks the frame invariants.
    #[error("invalid frame {index} on channel {channel}")]
    InvalidFrame { channel: usize, index: usize },
    /// More channels or frames than the layout can count.
    #[error("frame map too large to encode")]
    TooLarge,
    #[error("malformed data: {0}")]
    Malformed(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<binrw::Error> for FormatError {
    fn from(err: binrw::Error) -> Self {
        if err.is_eof() {
            return FormatError::UnexpectedEof;
        }
        match err {
            binrw::Error::BadMagic { .. } => FormatError::InvalidHeader,
            binrw::Error::Backtrace(bt) => FormatError::from(*bt.error),
            binrw::Error::Io(io) => FormatError::Io(io),
            other => FormatError::Malformed(other.to_string()),
        }
    }
}
