//! Data-driven chunk grammar: which fields each known tag carries, and how
//! the top level of a save is sequenced.

use std::collections::BTreeMap;

use crate::chunk::{Chunk, Count, Field, ScalarKind, Tag, Value};
use crate::cursor::ByteCursor;
use crate::error::{Result, SaveError};
use crate::strings::StringTable;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldRule {
    Scalar {
        name: &'static str,
        kind: ScalarKind,
    },
    List {
        name: &'static str,
        count: Count,
        kind: ScalarKind,
    },
    Chunk {
        name: &'static str,
        tag: Tag,
    },
    Array {
        name: &'static str,
        count: Count,
        tag: Tag,
    },
    Dict {
        name: &'static str,
        count: Count,
        key: ScalarKind,
        tag: Tag,
    },
}

impl FieldRule {
    pub const fn u8(name: &'static str) -> Self {
        Self::Scalar {
            name,
            kind: ScalarKind::U8,
        }
    }

    pub const fn u16(name: &'static str) -> Self {
        Self::Scalar {
            name,
            kind: ScalarKind::U16,
        }
    }

    pub const fn u32(name: &'static str) -> Self {
        Self::Scalar {
            name,
            kind: ScalarKind::U32,
        }
    }

    pub const fn varint(name: &'static str) -> Self {
        Self::Scalar {
            name,
            kind: ScalarKind::Varint,
        }
    }

    pub const fn bytes(name: &'static str, len: usize) -> Self {
        Self::Scalar {
            name,
            kind: ScalarKind::Bytes(len),
        }
    }

    pub const fn string(name: &'static str) -> Self {
        Self::Scalar {
            name,
            kind: ScalarKind::Str,
        }
    }

    pub const fn list(name: &'static str, count: Count, kind: ScalarKind) -> Self {
        Self::List { name, count, kind }
    }

    pub const fn chunk(name: &'static str, tag: Tag) -> Self {
        Self::Chunk { name, tag }
    }

    pub const fn array(name: &'static str, count: Count, tag: Tag) -> Self {
        Self::Array { name, count, tag }
    }

    pub const fn dict(name: &'static str, count: Count, key: ScalarKind, tag: Tag) -> Self {
        Self::Dict {
            name,
            count,
            key,
            tag,
        }
    }

    pub fn name(&self) -> &'static str {
        match *self {
            Self::Scalar { name, .. }
            | Self::List { name, .. }
            | Self::Chunk { name, .. }
            | Self::Array { name, .. }
            | Self::Dict { name, .. } => name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkRule {
    pub tag: Tag,
    pub fields: Vec<FieldRule>,
}

impl ChunkRule {
    pub fn new(tag: Tag, fields: Vec<FieldRule>) -> Self {
        Self { tag, fields }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Grammar {
    rules: BTreeMap<Tag, ChunkRule>,
    top_level: Vec<Tag>,
    skippable_after: Option<Tag>,
    mid_mission_markers: Vec<Tag>,
}

impl Grammar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rule(mut self, rule: ChunkRule) -> Self {
        self.rules.insert(rule.tag, rule);
        self
    }

    /// Chunks expected, in order, right after the file header.
    pub fn with_top_level(mut self, tags: impl IntoIterator<Item = Tag>) -> Self {
        self.top_level = tags.into_iter().collect();
        self
    }

    /// The top-level chunk a skippable section may directly follow.
    pub fn with_skippable_after(mut self, tag: Tag) -> Self {
        self.skippable_after = Some(tag);
        self
    }

    pub fn with_mid_mission_markers(mut self, tags: impl IntoIterator<Item = Tag>) -> Self {
        self.mid_mission_markers = tags.into_iter().collect();
        self
    }

    pub fn rule(&self, tag: Tag) -> Option<&ChunkRule> {
        self.rules.get(&tag)
    }

    pub fn rules(&self) -> impl Iterator<Item = &ChunkRule> {
        self.rules.values()
    }

    pub fn top_level(&self) -> &[Tag] {
        &self.top_level
    }

    pub fn skippable_after(&self) -> Option<Tag> {
        self.skippable_after
    }

    pub fn mid_mission_markers(&self) -> &[Tag] {
        &self.mid_mission_markers
    }

    pub fn is_mid_mission_marker(&self, tag: Tag) -> bool {
        self.mid_mission_markers.contains(&tag)
    }

    /// Decodes one `tag` chunk, tag included, at the cursor.
    pub(crate) fn decode_chunk(
        &self,
        tag: Tag,
        cursor: &mut ByteCursor<'_>,
        strings: &mut StringTable,
    ) -> Result<Chunk> {
        let offset = cursor.position();
        let found = cursor.read_tag()?;
        if found != tag {
            if self.is_mid_mission_marker(found) {
                return Err(SaveError::UnsupportedSaveState { offset, tag: found });
            }
            return Err(SaveError::UnexpectedChunkTag {
                offset,
                expected: tag,
                found,
            });
        }
        let rule = self
            .rule(tag)
            .ok_or_else(|| SaveError::Internal(format!("no grammar rule for chunk {tag}")))?;

        let mut fields = Vec::with_capacity(rule.fields.len());
        for field in &rule.fields {
            let value = self.decode_field(field, cursor, strings)?;
            fields.push(Field {
                name: field.name(),
                value,
            });
        }
        Ok(Chunk::new(tag, offset, fields))
    }

    fn decode_field(
        &self,
        rule: &FieldRule,
        cursor: &mut ByteCursor<'_>,
        strings: &mut StringTable,
    ) -> Result<Value> {
        match *rule {
            FieldRule::Scalar { kind, .. } => read_scalar(kind, cursor, strings),
            FieldRule::List { count, kind, .. } => {
                let n = read_count(count, cursor)?;
                let mut items = Vec::with_capacity(n.min(cursor.remaining()));
                for _ in 0..n {
                    items.push(read_scalar(kind, cursor, strings)?);
                }
                Ok(Value::List { kind, count, items })
            }
            FieldRule::Chunk { tag, .. } => Ok(Value::Chunk(Box::new(
                self.decode_chunk(tag, cursor, strings)?,
            ))),
            FieldRule::Array { count, tag, .. } => {
                let n = read_count(count, cursor)?;
                let mut items = Vec::with_capacity(n.min(cursor.remaining()));
                for _ in 0..n {
                    items.push(self.decode_chunk(tag, cursor, strings)?);
                }
                Ok(Value::Array { tag, count, items })
            }
            FieldRule::Dict {
                count, key, tag, ..
            } => {
                let n = read_count(count, cursor)?;
                let mut entries = Vec::with_capacity(n.min(cursor.remaining()));
                for _ in 0..n {
                    let k = read_scalar(key, cursor, strings)?;
                    entries.push((k, self.decode_chunk(tag, cursor, strings)?));
                }
                Ok(Value::Dict {
                    key,
                    tag,
                    count,
                    entries,
                })
            }
        }
    }
}

fn read_count(count: Count, cursor: &mut ByteCursor<'_>) -> Result<usize> {
    match count {
        Count::U8 => Ok(usize::from(cursor.read_u8()?)),
        Count::Varint => {
            let offset = cursor.position();
            let n = cursor.read_varint()?;
            usize::try_from(n).map_err(|_| SaveError::UnexpectedEndOfBuffer {
                offset,
                need: usize::MAX,
                have: cursor.remaining(),
            })
        }
        Count::Fixed(n) => Ok(n),
    }
}

fn read_scalar(
    kind: ScalarKind,
    cursor: &mut ByteCursor<'_>,
    strings: &mut StringTable,
) -> Result<Value> {
    Ok(match kind {
        ScalarKind::U8 => Value::U8(cursor.read_u8()?),
        ScalarKind::U16 => Value::U16(cursor.read_u16()?),
        ScalarKind::U32 => Value::U32(cursor.read_u32()?),
        ScalarKind::Varint => Value::Varint(cursor.read_varint()?),
        ScalarKind::Bytes(len) => Value::Bytes(cursor.read_bytes(len)?.to_vec()),
        ScalarKind::Str => Value::Str(strings.read(cursor)?),
    })
}
