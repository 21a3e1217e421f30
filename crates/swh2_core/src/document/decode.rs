use tracing::{debug, warn};

use super::{ChecksumStatus, Document};
use crate::blob::OpaqueBlob;
use crate::checksum;
use crate::chunk::latin1_to_string;
use crate::cursor::ByteCursor;
use crate::error::{Result, SaveError};
use crate::grammar::Grammar;
use crate::layout::{Capture, SectionId};
use crate::skippable::SkippableSection;
use crate::strings::{Confidence, OccurrenceKind, StringTable};
use crate::swh2::{HEADER_LEN, MAGIC, MAX_VERSION};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Fail with `ChecksumMismatch` instead of logging a warning.
    pub strict_checksum: bool,
    /// Re-encode after decoding and require identical bytes.
    pub verify_round_trip: bool,
}

impl DecodeOptions {
    pub fn strict() -> Self {
        Self {
            strict_checksum: true,
            verify_round_trip: true,
        }
    }
}

pub(super) fn decode(bytes: &[u8], grammar: &Grammar, options: DecodeOptions) -> Result<Document> {
    let magic = &bytes[..bytes.len().min(MAGIC.len())];
    if magic != MAGIC {
        return Err(SaveError::BadMagic {
            found: latin1_to_string(magic),
        });
    }

    let mut cursor = ByteCursor::new(bytes);
    cursor.skip(MAGIC.len())?;
    let version = cursor.read_u8()?;
    if version > MAX_VERSION {
        return Err(SaveError::UnsupportedVersion {
            found: version,
            max: MAX_VERSION,
        });
    }

    let stored = cursor.read_u32()?;
    let computed = checksum::compute(&bytes[HEADER_LEN..]);
    let checksum = if stored == computed {
        ChecksumStatus::Valid
    } else if options.strict_checksum {
        return Err(SaveError::ChecksumMismatch { stored, computed });
    } else {
        warn!(
            stored = format_args!("{stored:#010x}"),
            computed = format_args!("{computed:#010x}"),
            "save checksum does not match its payload"
        );
        ChecksumStatus::Mismatch { stored, computed }
    };

    let mut capture = Capture::new(bytes.len());
    capture.record(SectionId::Header, 0, HEADER_LEN);

    let mut strings = StringTable::new();
    let mut chunks = Vec::with_capacity(grammar.top_level().len());
    let mut skippable = None;
    let mut skippable_at = 0;
    for &tag in grammar.top_level() {
        let start = cursor.position();
        let Some(found) = cursor.peek_tag() else {
            break;
        };
        if found != tag {
            if grammar.is_mid_mission_marker(found) {
                return Err(SaveError::UnsupportedSaveState {
                    offset: start,
                    tag: found,
                });
            }
            debug!(offset = start, expected = %tag, %found, "structured decode stops");
            break;
        }

        let chunk = grammar.decode_chunk(tag, &mut cursor, &mut strings)?;
        capture.record(SectionId::Chunk(tag), start, cursor.position());
        chunks.push(chunk);

        if grammar.skippable_after() == Some(tag) {
            let start = cursor.position();
            // A tag right here means another chunk, not a length prefix.
            let chunk_follows = cursor.peek_tag().is_some_and(|t| t.is_alphanumeric());
            if !chunk_follows {
                skippable = SkippableSection::detect(&mut cursor, &strings)?;
            }
            if skippable.is_some() {
                skippable_at = chunks.len();
                capture.record(SectionId::Skippable, start, cursor.position());
            }
        }
    }

    let tail_start = cursor.position();
    let tail = OpaqueBlob::scan(cursor.read_rest(), tail_start, &mut strings)?;
    capture.record(SectionId::Tail, tail_start, bytes.len());
    let layout = capture.finish()?;

    let storage = strings.storage_guess();
    debug!(
        version,
        chunks = chunks.len(),
        definitions = strings.count(OccurrenceKind::Definition, Confidence::Grammar),
        references = strings.count(OccurrenceKind::Reference, Confidence::Grammar),
        ?storage,
        "structured strings"
    );
    debug!(
        offset = tail_start,
        len = tail.len(),
        definitions = strings.count(OccurrenceKind::Definition, Confidence::Heuristic),
        references = strings.count(OccurrenceKind::Reference, Confidence::Verified),
        skippable = skippable.is_some(),
        "opaque tail"
    );

    let document = Document {
        version,
        checksum,
        chunks,
        strings,
        skippable,
        skippable_at,
        tail,
        storage,
        layout,
        original: bytes.to_vec(),
    };
    if options.verify_round_trip {
        document.verify_round_trip()?;
    }
    Ok(document)
}
