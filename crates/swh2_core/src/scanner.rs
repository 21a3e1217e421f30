//! Single left-to-right pass over bytes the grammar does not model, looking
//! for string occurrences so they take part in backreference repair.
//!
//! Definitions are a guess: a plausible header followed by printable text.
//! A wrong guess is harmless because definitions are re-emitted verbatim.
//! References must match a known definition by exact offset and length, so
//! they are treated as reliable and re-targeted on every encode.

use serde::Serialize;
use tracing::trace;

use crate::error::Result;
use crate::strings::{Confidence, StringId, StringTable};
use crate::varint;

/// Shortest text accepted as a heuristic definition.
pub const MIN_DEFINITION_LEN: usize = 3;
/// Longest string length considered at all.
pub const MAX_SCAN_LEN: u64 = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ScanHit {
    Definition {
        /// Absolute data offset in the scope the region was scanned in.
        origin: usize,
        confidence: Confidence,
    },
    Reference {
        /// Absolute data offset of the matched definition.
        target: usize,
        confidence: Confidence,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScannedString {
    /// Start of the length varint, relative to the scanned region.
    pub at: usize,
    /// Length varint plus distance varint.
    pub header_len: usize,
    /// Bytes covered: the header, plus the text for definitions.
    pub span: usize,
    pub id: StringId,
    pub hit: ScanHit,
}

enum Probe<'a> {
    Definition {
        header_len: usize,
        data: &'a [u8],
    },
    Reference {
        header_len: usize,
        anchor: usize,
        id: StringId,
        target: usize,
    },
}

/// Scans `bytes`, which start at absolute offset `origin` of the scope that
/// `table` tracks, registering every hit with the table.
pub fn scan(bytes: &[u8], origin: usize, table: &mut StringTable) -> Result<Vec<ScannedString>> {
    let mut hits = Vec::new();
    let mut at = 0;
    while at < bytes.len() {
        let Some(probe) = probe(bytes, at, origin, table) else {
            at += 1;
            continue;
        };
        let hit = match probe {
            Probe::Definition { header_len, data } => {
                let data_start = origin + at + header_len;
                let id = table.record_definition(data_start, data, Confidence::Heuristic)?;
                ScannedString {
                    at,
                    header_len,
                    span: header_len + data.len(),
                    id,
                    hit: ScanHit::Definition {
                        origin: data_start,
                        confidence: Confidence::Heuristic,
                    },
                }
            }
            Probe::Reference {
                header_len,
                anchor,
                id,
                target,
            } => {
                table.record_reference(id, origin + anchor, target, Confidence::Verified);
                ScannedString {
                    at,
                    header_len,
                    span: header_len,
                    id,
                    hit: ScanHit::Reference {
                        target,
                        confidence: Confidence::Verified,
                    },
                }
            }
        };
        trace!(offset = origin + at, hit = ?hit.hit, "scanner hit");
        at += hit.span;
        hits.push(hit);
    }
    Ok(hits)
}

/// Whether `bytes`, read as if they sat at `origin` of the scope `table`
/// tracks, hold a verified reference to a definition the table already knows.
/// Nothing is registered.
pub fn finds_reference(bytes: &[u8], origin: usize, table: &StringTable) -> bool {
    let mut at = 0;
    while at < bytes.len() {
        match probe(bytes, at, origin, table) {
            Some(Probe::Reference { .. }) => return true,
            Some(Probe::Definition { header_len, data }) => at += header_len + data.len(),
            None => at += 1,
        }
    }
    false
}

fn probe<'a>(bytes: &'a [u8], at: usize, origin: usize, table: &StringTable) -> Option<Probe<'a>> {
    let (length, length_width) = read_varint(bytes, at, origin).ok()?;
    if length == 0 || length > MAX_SCAN_LEN {
        return None;
    }
    let anchor = at + length_width;
    let (distance, distance_width) = read_varint(bytes, anchor, origin).ok()?;
    let header_len = length_width + distance_width;

    if distance == 0 {
        let len = length as usize;
        if len < MIN_DEFINITION_LEN {
            return None;
        }
        let start = at + header_len;
        let data = bytes.get(start..start + len)?;
        return looks_like_text(data).then_some(Probe::Definition { header_len, data });
    }

    // Only canonical headers, so an untouched reference re-encodes to the
    // same bytes.
    if length_width != varint::encoded_len(length)
        || distance_width != varint::encoded_len(distance)
    {
        return None;
    }
    let (id, target) = table.resolve_backreference(origin + anchor, distance, length)?;
    Some(Probe::Reference {
        header_len,
        anchor,
        id,
        target,
    })
}

fn read_varint(bytes: &[u8], at: usize, origin: usize) -> Result<(u64, usize)> {
    varint::decode(bytes.get(at..).unwrap_or_default(), origin + at)
}

fn looks_like_text(data: &[u8]) -> bool {
    data.iter().all(|b| (0x20..=0x7E).contains(b)) && data.iter().any(u8::is_ascii_alphabetic)
}
