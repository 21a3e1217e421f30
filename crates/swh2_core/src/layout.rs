use serde::Serialize;

use crate::chunk::Tag;
use crate::error::{Result, SaveError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ByteRange {
    pub start: usize,
    pub end: usize,
}

impl ByteRange {
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SectionId {
    Header,
    Chunk(Tag),
    Skippable,
    Tail,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SectionLayout {
    pub id: SectionId,
    pub range: ByteRange,
}

/// Where each top-level section sat in the decoded file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FileLayout {
    pub file_len: usize,
    pub sections: Vec<SectionLayout>,
}

impl FileLayout {
    pub fn validate(&self) -> Result<()> {
        let Some(first) = self.sections.first() else {
            return Err(SaveError::Internal(
                "file layout must contain at least one section".to_string(),
            ));
        };

        if first.range.start != 0 {
            return Err(SaveError::Internal(
                "layout does not start at byte 0".to_string(),
            ));
        }

        let mut expected = 0usize;
        for section in &self.sections {
            if section.range.start != expected {
                return Err(SaveError::Internal(format!(
                    "layout gap/overlap around section {:?}: expected start {}, got {}",
                    section.id, expected, section.range.start
                )));
            }
            if section.range.end < section.range.start {
                return Err(SaveError::Internal(format!(
                    "invalid section range {:?}: {}..{}",
                    section.id, section.range.start, section.range.end
                )));
            }
            expected = section.range.end;
        }

        if expected != self.file_len {
            return Err(SaveError::Internal(format!(
                "layout does not cover file: ended at {}, file length {}",
                expected, self.file_len
            )));
        }

        Ok(())
    }

    pub fn section(&self, id: SectionId) -> Option<&SectionLayout> {
        self.sections.iter().find(|s| s.id == id)
    }
}

/// Records section boundaries as the decoder walks the file.
#[derive(Debug)]
pub(crate) struct Capture {
    file_len: usize,
    sections: Vec<SectionLayout>,
}

impl Capture {
    pub(crate) fn new(file_len: usize) -> Self {
        Self {
            file_len,
            sections: Vec::new(),
        }
    }

    pub(crate) fn record(&mut self, id: SectionId, start: usize, end: usize) {
        self.sections.push(SectionLayout {
            id,
            range: ByteRange { start, end },
        });
    }

    pub(crate) fn finish(self) -> Result<FileLayout> {
        let layout = FileLayout {
            file_len: self.file_len,
            sections: self.sections,
        };
        layout.validate()?;
        Ok(layout)
    }
}

#[cfg(test)]
mod tests {
    use super::{Capture, SectionId};
    use crate::chunk::Tag;

    #[test]
    fn contiguous_sections_validate() {
        let mut capture = Capture::new(20);
        capture.record(SectionId::Header, 0, 9);
        capture.record(SectionId::Chunk(Tag::new(*b"Head")), 9, 15);
        capture.record(SectionId::Tail, 15, 20);
        let layout = capture.finish().unwrap();
        assert_eq!(layout.sections.len(), 3);
        assert_eq!(layout.section(SectionId::Tail).unwrap().range.len(), 5);
    }

    #[test]
    fn gaps_are_rejected() {
        let mut capture = Capture::new(20);
        capture.record(SectionId::Header, 0, 9);
        capture.record(SectionId::Tail, 10, 20);
        assert!(capture.finish().is_err());
    }

    #[test]
    fn short_coverage_is_rejected() {
        let mut capture = Capture::new(20);
        capture.record(SectionId::Header, 0, 9);
        assert!(capture.finish().is_err());
        assert!(Capture::new(0).finish().is_err());
    }
}
