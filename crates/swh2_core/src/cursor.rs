use crate::chunk::Tag;
use crate::error::{Result, SaveError};
use crate::varint;

/// Positioned little-endian reader over a whole save buffer. Positions are
/// absolute offsets into the buffer it was created from.
#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn is_at_end(&self) -> bool {
        self.pos >= self.data.len()
    }

    pub fn seek_to(&mut self, pos: usize) -> Result<()> {
        if pos > self.data.len() {
            return Err(SaveError::UnexpectedEndOfBuffer {
                offset: pos,
                need: 0,
                have: 0,
            });
        }
        self.pos = pos;
        Ok(())
    }

    pub fn skip(&mut self, n: usize) -> Result<()> {
        self.read_bytes(n).map(|_| ())
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_array::<1>()?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(u16::from_le_bytes(self.read_array()?))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    pub fn read_varint(&mut self) -> Result<u64> {
        let (value, used) = varint::decode(&self.data[self.pos..], self.pos)?;
        self.pos += used;
        Ok(value)
    }

    pub fn read_tag(&mut self) -> Result<Tag> {
        Ok(Tag::new(self.read_array()?))
    }

    pub fn peek_tag(&self) -> Option<Tag> {
        self.peek_bytes(4)
            .and_then(|bytes| bytes.try_into().ok())
            .map(Tag::new)
    }

    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        let bytes = self.peek_bytes(n).ok_or(SaveError::UnexpectedEndOfBuffer {
            offset: self.pos,
            need: n,
            have: self.remaining(),
        })?;
        self.pos += n;
        Ok(bytes)
    }

    pub fn peek_bytes(&self, n: usize) -> Option<&'a [u8]> {
        let end = self.pos.checked_add(n)?;
        self.data.get(self.pos..end)
    }

    /// Reads `len` bytes located `distance` bytes before `anchor`, without
    /// moving the cursor.
    pub fn read_backward(&self, anchor: usize, distance: u64, len: usize) -> Option<&'a [u8]> {
        let distance = usize::try_from(distance).ok()?;
        let start = anchor.checked_sub(distance)?;
        self.data.get(start..start.checked_add(len)?)
    }

    /// Everything from the current position to the end, consuming it.
    pub fn read_rest(&mut self) -> &'a [u8] {
        let rest = &self.data[self.pos..];
        self.pos = self.data.len();
        rest
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let bytes = self.read_bytes(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }
}

/// Output side of the cursor: accumulates bytes and reports the absolute
/// offset of the next byte to be written.
#[derive(Debug, Default, Clone)]
pub struct ByteWriter {
    buf: Vec<u8>,
}

impl ByteWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    pub fn position(&self) -> usize {
        self.buf.len()
    }

    pub fn write_u8(&mut self, value: u8) {
        self.buf.push(value);
    }

    pub fn write_u16(&mut self, value: u16) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_u32(&mut self, value: u32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_varint(&mut self, value: u64) {
        varint::encode(value, &mut self.buf);
    }

    pub fn write_tag(&mut self, tag: Tag) {
        self.buf.extend_from_slice(tag.as_bytes());
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    pub fn patch_u32(&mut self, offset: usize, value: u32) -> Result<()> {
        let have = self.buf.len().saturating_sub(offset);
        let slot = self
            .buf
            .get_mut(offset..offset + 4)
            .ok_or(SaveError::UnexpectedEndOfBuffer {
                offset,
                need: 4,
                have,
            })?;
        slot.copy_from_slice(&value.to_le_bytes());
        Ok(())
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::{ByteCursor, ByteWriter};
    use crate::chunk::Tag;
    use crate::error::SaveError;

    #[test]
    fn reads_little_endian_scalars_and_tracks_position() {
        let bytes = [0x01, 0x34, 0x12, 0x78, 0x56, 0x34, 0x12, 0xAC, 0x02];
        let mut cursor = ByteCursor::new(&bytes);

        assert_eq!(cursor.read_u8().unwrap(), 1);
        assert_eq!(cursor.read_u16().unwrap(), 0x1234);
        assert_eq!(cursor.read_u32().unwrap(), 0x1234_5678);
        assert_eq!(cursor.position(), 7);
        assert_eq!(cursor.read_varint().unwrap(), 300);
        assert!(cursor.is_at_end());
    }

    #[test]
    fn short_read_reports_offset_and_shortfall() {
        let bytes = [0u8; 3];
        let mut cursor = ByteCursor::new(&bytes);
        cursor.skip(1).unwrap();

        let err = cursor.read_u32().expect_err("only two bytes remain");
        assert_eq!(
            err,
            SaveError::UnexpectedEndOfBuffer {
                offset: 1,
                need: 4,
                have: 2
            }
        );
        assert_eq!(cursor.position(), 1);
    }

    #[test]
    fn truncated_varint_reports_its_start() {
        let bytes = [0x00, 0x00, 0xFF];
        let mut cursor = ByteCursor::new(&bytes);
        cursor.seek_to(2).unwrap();
        assert_eq!(
            cursor.read_varint(),
            Err(SaveError::MalformedVarint { offset: 2 })
        );
    }

    #[test]
    fn peek_tag_does_not_advance() {
        let bytes = *b"HeadX";
        let mut cursor = ByteCursor::new(&bytes);
        assert_eq!(cursor.peek_tag(), Some(Tag::new(*b"Head")));
        assert_eq!(cursor.position(), 0);
        assert_eq!(cursor.read_tag().unwrap(), Tag::new(*b"Head"));
        assert_eq!(cursor.peek_tag(), None);
    }

    #[test]
    fn read_backward_resolves_relative_to_anchor() {
        let bytes = b"..abc..";
        let cursor = ByteCursor::new(bytes);
        assert_eq!(cursor.read_backward(5, 3, 3), Some(&b"abc"[..]));
        assert_eq!(cursor.read_backward(2, 3, 1), None);
    }

    #[test]
    fn writer_patches_in_place() {
        let mut writer = ByteWriter::new();
        writer.write_bytes(b"SWH2");
        writer.write_u32(0);
        writer.write_varint(300);
        writer.patch_u32(4, 0xAABB_CCDD).unwrap();

        assert_eq!(
            writer.as_slice(),
            &[b'S', b'W', b'H', b'2', 0xDD, 0xCC, 0xBB, 0xAA, 0xAC, 0x02]
        );
        assert!(writer.patch_u32(8, 1).is_err());
    }
}
