use crate::chunk::Tag;
use crate::cursor::ByteWriter;
use crate::error::Result;
use crate::scanner::{self, ScanHit, ScannedString};
use crate::strings::{StringTable, StringWriter};

/// A byte range whose structure is not modeled. It is re-emitted byte for
/// byte except for the string occurrences the scanner found in it, which are
/// rewritten through the scope's [`StringWriter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpaqueBlob {
    origin: usize,
    bytes: Vec<u8>,
    strings: Vec<ScannedString>,
}

impl OpaqueBlob {
    /// Captures `bytes`, found at offset `origin` of the scope `table`
    /// tracks, and runs the scanner over them.
    pub fn scan(bytes: &[u8], origin: usize, table: &mut StringTable) -> Result<Self> {
        let strings = scanner::scan(bytes, origin, table)?;
        Ok(Self {
            origin,
            bytes: bytes.to_vec(),
            strings,
        })
    }

    pub fn origin(&self) -> usize {
        self.origin
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn strings(&self) -> &[ScannedString] {
        &self.strings
    }

    /// Absolute offsets at which any of `tags` appear in the blob.
    pub fn find_tags(&self, tags: &[Tag]) -> Vec<(usize, Tag)> {
        self.bytes
            .windows(4)
            .enumerate()
            .filter_map(|(i, window)| {
                tags.iter()
                    .find(|tag| tag.as_bytes() == window)
                    .map(|&tag| (self.origin + i, tag))
            })
            .collect()
    }

    pub(crate) fn encode(&self, out: &mut ByteWriter, writer: &mut StringWriter<'_>) {
        let mut copied = 0;
        for found in &self.strings {
            out.write_bytes(&self.bytes[copied..found.at]);
            match found.hit {
                ScanHit::Definition { origin, .. } => writer.write_verbatim_definition(
                    out,
                    found.id,
                    origin,
                    &self.bytes[found.at..found.at + found.span],
                    found.header_len,
                ),
                ScanHit::Reference { target, .. } => {
                    writer.write_scanned_reference(out, found.id, target)
                }
            }
            copied = found.at + found.span;
        }
        out.write_bytes(&self.bytes[copied..]);
    }
}
