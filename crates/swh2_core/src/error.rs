use thiserror::Error;

use crate::chunk::Tag;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SaveError {
    #[error("bad magic: expected \"SWH2\", found \"{found}\"")]
    BadMagic { found: String },

    #[error("unsupported save version {found} (maximum supported is {max})")]
    UnsupportedVersion { found: u8, max: u8 },

    #[error("checksum mismatch: header says {stored:#010x}, payload hashes to {computed:#010x}")]
    ChecksumMismatch { stored: u32, computed: u32 },

    #[error("malformed varint at offset {offset:#x}")]
    MalformedVarint { offset: usize },

    #[error(
        "string backreference at {offset:#x} (distance {distance}, length {length}) does not resolve to a recorded definition"
    )]
    DanglingStringReference {
        offset: usize,
        distance: u64,
        length: u64,
    },

    #[error("unexpected end of buffer at offset {offset:#x} (need {need} bytes, have {have})")]
    UnexpectedEndOfBuffer {
        offset: usize,
        need: usize,
        have: usize,
    },

    #[error("unsupported save state at offset {offset:#x}: found mid-mission chunk {tag}")]
    UnsupportedSaveState { offset: usize, tag: Tag },

    #[error("expected chunk {expected} at offset {offset:#x}, found {found}")]
    UnexpectedChunkTag {
        offset: usize,
        expected: Tag,
        found: Tag,
    },

    #[error("invalid field path \"{path}\": {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("field \"{path}\" holds {found}, not {expected}")]
    FieldTypeMismatch {
        path: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("value {value} does not fit field \"{path}\" (maximum {max})")]
    ValueOutOfRange { path: String, value: u64, max: u64 },

    #[error("field \"{path}\" has a fixed length of {len}")]
    FixedLength { path: String, len: usize },

    #[error("re-encoded save differs from the original at offset {offset:#x}")]
    RoundTripMismatch { offset: usize },

    #[error("internal codec error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, SaveError>;
