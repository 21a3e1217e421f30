use super::Document;
use crate::checksum;
use crate::chunk::{Chunk, Count, Value};
use crate::cursor::ByteWriter;
use crate::error::{Result, SaveError};
use crate::strings::StringWriter;
use crate::swh2::{CHECKSUM_OFFSET, HEADER_LEN, MAGIC};

impl Document {
    /// Serializes the current state. String distances are recomputed from
    /// output positions and the checksum is patched in last.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut out = ByteWriter::with_capacity(self.original.len());
        out.write_bytes(&MAGIC);
        out.write_u8(self.version);
        out.write_u32(0);

        let mut strings = StringWriter::new(&self.strings, self.storage);
        let (before, after) = self
            .chunks
            .split_at(self.skippable_at.min(self.chunks.len()));
        for chunk in before {
            encode_chunk(chunk, &mut out, &mut strings)?;
        }
        if let Some(section) = &self.skippable {
            section.encode(&mut out);
        }
        for chunk in after {
            encode_chunk(chunk, &mut out, &mut strings)?;
        }
        self.tail.encode(&mut out, &mut strings);

        let crc = checksum::compute(&out.as_slice()[HEADER_LEN..]);
        out.patch_u32(CHECKSUM_OFFSET, crc)?;
        Ok(out.into_inner())
    }

    /// Re-encodes and compares against the decoded bytes. The stored
    /// checksum is left out of the comparison; `checksum()` reports it.
    pub fn verify_round_trip(&self) -> Result<()> {
        let mut encoded = self.encode()?;
        if let Some(stored) = self.original.get(CHECKSUM_OFFSET..HEADER_LEN) {
            encoded[CHECKSUM_OFFSET..HEADER_LEN].copy_from_slice(stored);
        }
        match first_difference(&self.original, &encoded) {
            Some(offset) => Err(SaveError::RoundTripMismatch { offset }),
            None => Ok(()),
        }
    }
}

fn first_difference(a: &[u8], b: &[u8]) -> Option<usize> {
    a.iter()
        .zip(b)
        .position(|(x, y)| x != y)
        .or_else(|| (a.len() != b.len()).then(|| a.len().min(b.len())))
}

fn encode_chunk(chunk: &Chunk, out: &mut ByteWriter, strings: &mut StringWriter<'_>) -> Result<()> {
    out.write_tag(chunk.tag());
    for field in chunk.fields() {
        encode_value(&field.value, out, strings)?;
    }
    Ok(())
}

fn encode_value(value: &Value, out: &mut ByteWriter, strings: &mut StringWriter<'_>) -> Result<()> {
    match value {
        Value::U8(v) => out.write_u8(*v),
        Value::U16(v) => out.write_u16(*v),
        Value::U32(v) => out.write_u32(*v),
        Value::Varint(v) => out.write_varint(*v),
        Value::Bytes(bytes) => out.write_bytes(bytes),
        Value::Str(s) => strings.write(out, s),
        Value::List { count, items, .. } => {
            write_count(*count, items.len(), out)?;
            for item in items {
                encode_value(item, out, strings)?;
            }
        }
        Value::Chunk(chunk) => encode_chunk(chunk, out, strings)?,
        Value::Array { count, items, .. } => {
            write_count(*count, items.len(), out)?;
            for item in items {
                encode_chunk(item, out, strings)?;
            }
        }
        Value::Dict { count, entries, .. } => {
            write_count(*count, entries.len(), out)?;
            for (key, chunk) in entries {
                encode_value(key, out, strings)?;
                encode_chunk(chunk, out, strings)?;
            }
        }
    }
    Ok(())
}

fn write_count(count: Count, len: usize, out: &mut ByteWriter) -> Result<()> {
    match count {
        Count::U8 => {
            let n = u8::try_from(len)
                .map_err(|_| SaveError::Internal(format!("{len} items in a u8-counted list")))?;
            out.write_u8(n);
        }
        Count::Varint => out.write_varint(len as u64),
        Count::Fixed(n) if n == len => {}
        Count::Fixed(n) => {
            return Err(SaveError::Internal(format!(
                "{len} items where exactly {n} are required"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::first_difference;

    #[test]
    fn first_difference_covers_length_changes() {
        assert_eq!(first_difference(b"abc", b"abc"), None);
        assert_eq!(first_difference(b"abc", b"abd"), Some(2));
        assert_eq!(first_difference(b"abc", b"ab"), Some(2));
        assert_eq!(first_difference(b"", b"x"), Some(0));
    }
}
