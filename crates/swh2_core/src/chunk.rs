use std::fmt;

use serde::{Deserialize, Serialize, Serializer};

use crate::strings::StrRef;

/// Four-byte chunk identifier, e.g. `Head` or `ItIn`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Tag([u8; 4]);

impl Tag {
    pub const fn new(bytes: [u8; 4]) -> Self {
        Self(bytes)
    }

    pub fn parse(text: &str) -> Option<Self> {
        let bytes: [u8; 4] = text.as_bytes().try_into().ok()?;
        Some(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }

    /// True when all four bytes are ASCII letters or digits, which is how
    /// every chunk tag seen so far is spelled.
    pub fn is_alphanumeric(&self) -> bool {
        self.0.iter().all(u8::is_ascii_alphanumeric)
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.escape_ascii())
    }
}

impl fmt::Debug for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tag({self})")
    }
}

impl Serialize for Tag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Wire encoding of a scalar field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ScalarKind {
    U8,
    U16,
    U32,
    Varint,
    Bytes(usize),
    Str,
}

impl ScalarKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::U8 => "u8",
            Self::U16 => "u16",
            Self::U32 => "u32",
            Self::Varint => "varint",
            Self::Bytes(_) => "bytes",
            Self::Str => "string",
        }
    }

    /// Largest integer the encoding can carry, `None` for non-integers.
    pub fn int_max(&self) -> Option<u64> {
        match self {
            Self::U8 => Some(u64::from(u8::MAX)),
            Self::U16 => Some(u64::from(u16::MAX)),
            Self::U32 => Some(u64::from(u32::MAX)),
            Self::Varint => Some(u64::MAX),
            Self::Bytes(_) | Self::Str => None,
        }
    }
}

/// How the element count of a list, array or dict is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Count {
    U8,
    Varint,
    /// Implied by the grammar; nothing is written.
    Fixed(usize),
}

impl Count {
    pub fn max_len(&self) -> usize {
        match self {
            Self::U8 => usize::from(u8::MAX),
            Self::Varint => usize::MAX,
            Self::Fixed(n) => *n,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    U8(u8),
    U16(u16),
    U32(u32),
    Varint(u64),
    Bytes(Vec<u8>),
    Str(StrRef),
    List {
        kind: ScalarKind,
        count: Count,
        items: Vec<Value>,
    },
    Chunk(Box<Chunk>),
    Array {
        tag: Tag,
        count: Count,
        items: Vec<Chunk>,
    },
    Dict {
        key: ScalarKind,
        tag: Tag,
        count: Count,
        entries: Vec<(Value, Chunk)>,
    },
}

impl Value {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::U8(_) => "u8",
            Self::U16(_) => "u16",
            Self::U32(_) => "u32",
            Self::Varint(_) => "varint",
            Self::Bytes(_) => "bytes",
            Self::Str(_) => "string",
            Self::List { .. } => "list",
            Self::Chunk(_) => "chunk",
            Self::Array { .. } => "array",
            Self::Dict { .. } => "dict",
        }
    }

    pub fn scalar_kind(&self) -> Option<ScalarKind> {
        match self {
            Self::U8(_) => Some(ScalarKind::U8),
            Self::U16(_) => Some(ScalarKind::U16),
            Self::U32(_) => Some(ScalarKind::U32),
            Self::Varint(_) => Some(ScalarKind::Varint),
            Self::Bytes(b) => Some(ScalarKind::Bytes(b.len())),
            Self::Str(_) => Some(ScalarKind::Str),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<u64> {
        match *self {
            Self::U8(v) => Some(u64::from(v)),
            Self::U16(v) => Some(u64::from(v)),
            Self::U32(v) => Some(u64::from(v)),
            Self::Varint(v) => Some(v),
            _ => None,
        }
    }

    /// Number of elements for counted values.
    pub fn item_count(&self) -> Option<usize> {
        match self {
            Self::List { items, .. } => Some(items.len()),
            Self::Array { items, .. } => Some(items.len()),
            Self::Dict { entries, .. } => Some(entries.len()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: &'static str,
    pub value: Value,
}

/// A structured chunk: its tag followed by the fields its grammar rule names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    tag: Tag,
    offset: usize,
    fields: Vec<Field>,
}

impl Chunk {
    pub fn new(tag: Tag, offset: usize, fields: Vec<Field>) -> Self {
        Self {
            tag,
            offset,
            fields,
        }
    }

    pub fn tag(&self) -> Tag {
        self.tag
    }

    /// Offset of the tag in the file this chunk was decoded from.
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.iter().find(|f| f.name == name).map(|f| &f.value)
    }

    pub(crate) fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    pub(crate) fn fields_mut(&mut self) -> &mut [Field] {
        &mut self.fields
    }

    /// Child chunks in field order, including array and dict members.
    pub fn children(&self) -> Vec<&Chunk> {
        let mut out = Vec::new();
        for field in &self.fields {
            match &field.value {
                Value::Chunk(chunk) => out.push(chunk.as_ref()),
                Value::Array { items, .. } => out.extend(items.iter()),
                Value::Dict { entries, .. } => out.extend(entries.iter().map(|(_, c)| c)),
                _ => {}
            }
        }
        out
    }
}

/// Typed scalar handed across the document accessor API. Strings are raw
/// bytes; the format does not promise any particular text encoding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldValue {
    Int(u64),
    Bytes(Vec<u8>),
    Str(Vec<u8>),
}

impl FieldValue {
    /// Builds a string value from text, one byte per character (Latin-1).
    /// Characters outside Latin-1 become `?`.
    pub fn text(text: &str) -> Self {
        Self::Str(
            text.chars()
                .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
                .collect(),
        )
    }

    pub fn as_int(&self) -> Option<u64> {
        match *self {
            Self::Int(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_str_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Str(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// Latin-1 rendering of a string value.
    pub fn to_text(&self) -> Option<String> {
        self.as_str_bytes().map(latin1_to_string)
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Int(_) => "integer",
            Self::Bytes(_) => "bytes",
            Self::Str(_) => "string",
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Bytes(bytes) => {
                for b in bytes {
                    write!(f, "{b:02x}")?;
                }
                Ok(())
            }
            Self::Str(bytes) => f.write_str(&latin1_to_string(bytes)),
        }
    }
}

pub fn latin1_to_string(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}
