//! A decoded save: the structured chunks, the opaque regions, and the string
//! scopes that tie them together.

mod access;
mod decode;
mod encode;

use serde::Serialize;

use crate::blob::OpaqueBlob;
use crate::chunk::Chunk;
use crate::error::Result;
use crate::grammar::Grammar;
use crate::layout::FileLayout;
use crate::skippable::SkippableSection;
use crate::strings::{StrRef, StringStorage, StringTable};

pub use decode::DecodeOptions;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ChecksumStatus {
    Valid,
    Mismatch { stored: u32, computed: u32 },
}

impl ChecksumStatus {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }
}

#[derive(Debug, Clone)]
pub struct Document {
    version: u8,
    checksum: ChecksumStatus,
    chunks: Vec<Chunk>,
    strings: StringTable,
    skippable: Option<SkippableSection>,
    /// Number of top-level chunks written before the skippable section.
    skippable_at: usize,
    tail: OpaqueBlob,
    storage: StringStorage,
    layout: FileLayout,
    original: Vec<u8>,
}

impl Document {
    /// Decodes with the shipped SWH2 grammar and default options.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        Self::decode_with(bytes, &Grammar::swh2(), DecodeOptions::default())
    }

    pub fn decode_with(bytes: &[u8], grammar: &Grammar, options: DecodeOptions) -> Result<Self> {
        decode::decode(bytes, grammar, options)
    }

    pub fn version(&self) -> u8 {
        self.version
    }

    /// Checksum state of the bytes this document was decoded from.
    pub fn checksum(&self) -> ChecksumStatus {
        self.checksum
    }

    /// Top-level chunks in file order.
    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn strings(&self) -> &StringTable {
        &self.strings
    }

    pub fn resolve_str(&self, value: &StrRef) -> &[u8] {
        self.strings.resolve(value)
    }

    pub fn skippable(&self) -> Option<&SkippableSection> {
        self.skippable.as_ref()
    }

    /// Everything after the last structured section.
    pub fn tail(&self) -> &OpaqueBlob {
        &self.tail
    }

    pub fn storage(&self) -> StringStorage {
        self.storage
    }

    pub fn layout(&self) -> &FileLayout {
        &self.layout
    }

    pub fn to_bytes_unmodified(&self) -> Vec<u8> {
        self.original.clone()
    }
}
