use tracing::debug;

use crate::blob::OpaqueBlob;
use crate::cursor::{ByteCursor, ByteWriter};
use crate::error::Result;
use crate::scanner;
use crate::strings::{StringTable, StringWriter};
use crate::varint;

/// Length-prefixed region following the anchor chunk. Its body is its own
/// string scope: positions inside it are relative to the body start, and no
/// reference crosses its boundary in either direction.
#[derive(Debug, Clone)]
pub struct SkippableSection {
    offset: usize,
    strings: StringTable,
    blob: OpaqueBlob,
}

impl SkippableSection {
    /// Tries to read a skip-length varint at the cursor. The body is consumed
    /// and scanned only when the varint is canonical, the body fits, the body
    /// ends exactly at a chunk tag or the end of the file, and nothing in it
    /// points back into `primary`. Otherwise the cursor is left where it was.
    pub fn detect(cursor: &mut ByteCursor<'_>, primary: &StringTable) -> Result<Option<Self>> {
        let offset = cursor.position();
        let Some(body) = candidate_body(cursor, primary) else {
            cursor.seek_to(offset)?;
            return Ok(None);
        };

        let mut strings = StringTable::new();
        let blob = OpaqueBlob::scan(body, 0, &mut strings)?;
        debug!(
            offset,
            len = body.len(),
            strings = blob.strings().len(),
            "skippable section"
        );
        Ok(Some(Self {
            offset,
            strings,
            blob,
        }))
    }

    /// Offset of the skip-length varint in the decoded file.
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn strings(&self) -> &StringTable {
        &self.strings
    }

    pub fn blob(&self) -> &OpaqueBlob {
        &self.blob
    }

    /// Writes the skip length and the body. The body is produced first in a
    /// buffer of its own, so the width of the length varint never feeds back
    /// into distances inside the body.
    pub fn encode(&self, out: &mut ByteWriter) {
        let mut body = ByteWriter::with_capacity(self.blob.len());
        let mut writer = StringWriter::new(&self.strings, self.strings.storage_guess());
        self.blob.encode(&mut body, &mut writer);
        let body = body.into_inner();
        out.write_varint(body.len() as u64);
        out.write_bytes(&body);
    }
}

fn candidate_body<'a>(cursor: &mut ByteCursor<'a>, primary: &StringTable) -> Option<&'a [u8]> {
    let offset = cursor.position();
    let len = cursor.read_varint().ok()?;
    if cursor.position() - offset != varint::encoded_len(len) {
        return None;
    }
    let body_start = cursor.position();
    let body = cursor.read_bytes(usize::try_from(len).ok()?).ok()?;

    let ends_cleanly =
        cursor.is_at_end() || cursor.peek_tag().is_some_and(|tag| tag.is_alphanumeric());
    if !ends_cleanly {
        debug!(offset, len, "length prefix does not end at a chunk boundary");
        return None;
    }
    if scanner::finds_reference(body, body_start, primary) {
        debug!(offset, len, "length prefix covers a reference into the primary scope");
        return None;
    }
    Some(body)
}

#[cfg(test)]
mod tests {
    use super::SkippableSection;
    use crate::cursor::{ByteCursor, ByteWriter};
    use crate::strings::{Confidence, StringTable};

    fn detect(bytes: &[u8], at: usize, primary: &StringTable) -> (Option<SkippableSection>, usize) {
        let mut cursor = ByteCursor::new(bytes);
        cursor.seek_to(at).unwrap();
        let section = SkippableSection::detect(&mut cursor, primary).unwrap();
        (section, cursor.position())
    }

    #[test]
    fn detects_and_re_emits_section() {
        let mut bytes = vec![0x0A];
        bytes.extend_from_slice(b"\x03\x00foo\x01\x02\x03\x03\x07");
        bytes.extend_from_slice(b"CrLo");

        let (section, position) = detect(&bytes, 0, &StringTable::new());
        let section = section.unwrap();
        assert_eq!(position, 11);
        assert_eq!(section.blob().strings().len(), 2);
        assert_eq!(section.strings().len(), 1);

        let mut out = ByteWriter::new();
        out.write_bytes(&[0xAA; 300]);
        section.encode(&mut out);
        assert_eq!(&out.as_slice()[300..], &bytes[..11]);
    }

    #[test]
    fn oversized_length_is_not_a_section() {
        let (section, position) = detect(&[0x09, 0x01, 0x02], 0, &StringTable::new());
        assert!(section.is_none());
        assert_eq!(position, 0);
    }

    #[test]
    fn overlong_length_is_not_a_section() {
        let (section, position) = detect(&[0x81, 0x00, 0x01], 0, &StringTable::new());
        assert!(section.is_none());
        assert_eq!(position, 0);
    }

    #[test]
    fn body_must_end_at_a_tag_or_end_of_file() {
        let bytes = [0x02, 0xAA, 0xBB, 0xCC, b'C', b'r', b'L', b'o'];
        let (section, position) = detect(&bytes, 0, &StringTable::new());
        assert!(section.is_none());
        assert_eq!(position, 0);

        let (section, position) = detect(&bytes[..3], 0, &StringTable::new());
        assert!(section.is_some());
        assert_eq!(position, 3);
    }

    #[test]
    fn body_referencing_the_primary_scope_is_not_a_section() {
        // "deck" defined at 2; the candidate body at 7 holds a reference to it.
        let bytes = [0x04, 0x00, b'd', b'e', b'c', b'k', 0x02, 0x04, 0x06];
        let mut primary = StringTable::new();
        primary
            .record_definition(2, b"deck", Confidence::Grammar)
            .unwrap();

        let (section, position) = detect(&bytes, 6, &primary);
        assert!(section.is_none());
        assert_eq!(position, 6);

        let (section, _) = detect(&bytes, 6, &StringTable::new());
        assert!(section.is_some());
    }
}
