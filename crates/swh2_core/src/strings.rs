//! Define-once strings with backward byte-distance references.
//!
//! On disk a string is `varint length`, then `varint distance`. A zero
//! distance means the `length` bytes follow inline (a definition). A non-zero
//! distance means the bytes live at `(offset of the distance varint) -
//! distance`, which must be the data start of an earlier definition of the
//! same length (a reference). A zero length is the empty string and carries no
//! distance varint at all.
//!
//! Distances are always recomputed from the current output position when
//! writing, never copied from the source file, so any edit that moves bytes
//! around is repaired here.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use tracing::trace;

use crate::cursor::{ByteCursor, ByteWriter};
use crate::error::{Result, SaveError};

/// Identity of a logical string within one scope: equal bytes, equal id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct StringId(u32);

/// A string field value: which logical string it holds, and, when the value
/// is exactly what was decoded, where its bytes came from. A decoded
/// definition records its own data start; a decoded reference records the
/// data start of the definition it resolved to. Edited values carry neither.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StrRef {
    id: Option<StringId>,
    defined_at: Option<usize>,
    resolved_to: Option<usize>,
}

impl StrRef {
    pub fn empty() -> Self {
        Self::default()
    }

    pub(crate) fn new(id: Option<StringId>) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }

    pub fn id(&self) -> Option<StringId> {
        self.id
    }

    pub fn is_empty(&self) -> bool {
        self.id.is_none()
    }

    /// Data offset of the definition this value was decoded from.
    pub fn defined_at(&self) -> Option<usize> {
        self.defined_at
    }

    /// Data offset of the definition a decoded reference pointed at.
    pub fn resolved_to(&self) -> Option<usize> {
        self.resolved_to
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OccurrenceKind {
    Definition,
    Reference,
}

/// How an occurrence was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Confidence {
    /// Read by a grammar rule that declares a string field.
    Grammar,
    /// Looked like a definition while scanning unmodeled bytes.
    Heuristic,
    /// Matched an earlier definition by exact offset and length.
    Verified,
}

/// One physical string occurrence seen while decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Occurrence {
    pub id: StringId,
    pub kind: OccurrenceKind,
    pub confidence: Confidence,
    /// Data start for definitions, distance varint offset for references.
    pub offset: usize,
    pub len: usize,
    /// Data start of the definition a reference resolved to.
    pub target: Option<usize>,
}

/// Guess at how the writer of the file stored repeated strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StringStorage {
    /// Repeats are backreferences.
    Compressed,
    /// Every occurrence is a full definition.
    Expanded,
    Unknown,
}

/// One string scope. The primary file has one; the skippable section has its
/// own.
#[derive(Debug, Clone, Default)]
pub struct StringTable {
    texts: Vec<Vec<u8>>,
    by_text: HashMap<Vec<u8>, StringId>,
    definitions: HashMap<usize, StringId>,
    occurrences: Vec<Occurrence>,
    grammar_defined: HashSet<StringId>,
    grammar_references: usize,
    grammar_duplicates: usize,
}

impl StringTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.texts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.texts.is_empty()
    }

    pub fn intern(&mut self, text: &[u8]) -> Result<StringId> {
        if let Some(&id) = self.by_text.get(text) {
            return Ok(id);
        }
        let id = next_id(self.texts.len())?;
        self.texts.push(text.to_vec());
        self.by_text.insert(text.to_vec(), id);
        Ok(id)
    }

    pub fn lookup(&self, text: &[u8]) -> Option<StringId> {
        self.by_text.get(text).copied()
    }

    pub fn text(&self, id: StringId) -> &[u8] {
        &self.texts[id.0 as usize]
    }

    pub fn resolve(&self, value: &StrRef) -> &[u8] {
        match value.id {
            Some(id) => self.text(id),
            None => &[],
        }
    }

    /// The definition whose data starts exactly at `offset`.
    pub fn definition_at(&self, offset: usize) -> Option<StringId> {
        self.definitions.get(&offset).copied()
    }

    pub fn occurrences(&self) -> &[Occurrence] {
        &self.occurrences
    }

    pub fn count(&self, kind: OccurrenceKind, confidence: Confidence) -> usize {
        self.occurrences
            .iter()
            .filter(|o| o.kind == kind && o.confidence == confidence)
            .count()
    }

    pub fn storage_guess(&self) -> StringStorage {
        match (self.grammar_references, self.grammar_duplicates) {
            (r, 0) if r > 0 => StringStorage::Compressed,
            (0, d) if d > 0 => StringStorage::Expanded,
            _ => StringStorage::Unknown,
        }
    }

    pub(crate) fn record_definition(
        &mut self,
        offset: usize,
        text: &[u8],
        confidence: Confidence,
    ) -> Result<StringId> {
        let id = self.intern(text)?;
        self.definitions.insert(offset, id);
        self.occurrences.push(Occurrence {
            id,
            kind: OccurrenceKind::Definition,
            confidence,
            offset,
            len: text.len(),
            target: None,
        });
        Ok(id)
    }

    pub(crate) fn record_reference(
        &mut self,
        id: StringId,
        offset: usize,
        target: usize,
        confidence: Confidence,
    ) {
        let len = self.text(id).len();
        self.occurrences.push(Occurrence {
            id,
            kind: OccurrenceKind::Reference,
            confidence,
            offset,
            len,
            target: Some(target),
        });
    }

    /// Resolves a backreference: the distance varint at `anchor` says the
    /// bytes start `distance` before it, and the definition found there must
    /// have exactly `length` bytes.
    pub(crate) fn resolve_backreference(
        &self,
        anchor: usize,
        distance: u64,
        length: u64,
    ) -> Option<(StringId, usize)> {
        let target = anchor.checked_sub(usize::try_from(distance).ok()?)?;
        let id = self.definition_at(target)?;
        (self.text(id).len() as u64 == length).then_some((id, target))
    }

    /// Decodes one string occurrence declared by a grammar rule.
    pub fn read(&mut self, cursor: &mut ByteCursor<'_>) -> Result<StrRef> {
        let length = cursor.read_varint()?;
        if length == 0 {
            return Ok(StrRef::empty());
        }

        let anchor = cursor.position();
        let distance = cursor.read_varint()?;
        if distance == 0 {
            let data_start = cursor.position();
            let len = usize::try_from(length).map_err(|_| SaveError::UnexpectedEndOfBuffer {
                offset: data_start,
                need: usize::MAX,
                have: cursor.remaining(),
            })?;
            let bytes = cursor.read_bytes(len)?;
            let already_defined = self
                .lookup(bytes)
                .is_some_and(|id| self.grammar_defined.contains(&id));
            let id = self.record_definition(data_start, bytes, Confidence::Grammar)?;
            if already_defined {
                self.grammar_duplicates += 1;
            }
            self.grammar_defined.insert(id);
            return Ok(StrRef {
                id: Some(id),
                defined_at: Some(data_start),
                resolved_to: None,
            });
        }

        let Some((id, target)) = self.resolve_backreference(anchor, distance, length) else {
            return Err(SaveError::DanglingStringReference {
                offset: anchor,
                distance,
                length,
            });
        };
        if cursor.read_backward(anchor, distance, self.text(id).len()) != Some(self.text(id)) {
            return Err(SaveError::Internal(format!(
                "definition bytes at {target:#x} changed after being recorded"
            )));
        }
        self.grammar_references += 1;
        self.record_reference(id, anchor, target, Confidence::Grammar);
        Ok(StrRef {
            id: Some(id),
            defined_at: None,
            resolved_to: Some(target),
        })
    }
}

/// Encode-side state for one scope and one encode pass.
#[derive(Debug)]
pub struct StringWriter<'a> {
    table: &'a StringTable,
    storage: StringStorage,
    /// First definition of each logical string written in this pass.
    sites: HashMap<StringId, usize>,
    /// Original definition data offset -> where that definition went.
    moved: HashMap<usize, (StringId, usize)>,
}

impl<'a> StringWriter<'a> {
    pub fn new(table: &'a StringTable, storage: StringStorage) -> Self {
        Self {
            table,
            storage,
            sites: HashMap::new(),
            moved: HashMap::new(),
        }
    }

    /// Writes a string declared by a grammar rule. An untouched definition is
    /// written as a definition again. An untouched reference follows the
    /// definition it originally resolved to. Anything else becomes a
    /// reference when the string was already defined in this pass, unless the
    /// file stores strings expanded.
    pub fn write(&mut self, out: &mut ByteWriter, value: &StrRef) {
        let Some(id) = value.id else {
            out.write_varint(0);
            return;
        };
        let text = self.table.text(id);
        out.write_varint(text.len() as u64);

        let site = match value.resolved_to.and_then(|target| self.relocated(target, id)) {
            Some(site) => Some(site),
            None if value.defined_at.is_none() && self.storage != StringStorage::Expanded => {
                self.sites.get(&id).copied()
            }
            None => None,
        };
        match site {
            Some(site) => write_distance(out, site),
            None => self.define(out, id, value.defined_at),
        }
    }

    /// Where the definition that started at `original` went in this pass, if
    /// it was re-emitted with the same text.
    fn relocated(&self, original: usize, id: StringId) -> Option<usize> {
        self.moved
            .get(&original)
            .filter(|(moved_id, _)| *moved_id == id)
            .map(|&(_, pos)| pos)
    }

    /// Re-emits a heuristic definition found in unmodeled bytes. `raw` is the
    /// whole occurrence as it appeared in the source and is copied verbatim.
    pub(crate) fn write_verbatim_definition(
        &mut self,
        out: &mut ByteWriter,
        id: StringId,
        origin: usize,
        raw: &[u8],
        header_len: usize,
    ) {
        let data_start = out.position() + header_len;
        self.sites.entry(id).or_insert(data_start);
        self.moved.insert(origin, (id, data_start));
        out.write_bytes(raw);
    }

    /// Re-emits a verified reference found in unmodeled bytes, re-targeted at
    /// the relocated copy of the definition it originally matched, else the
    /// first definition of the same string in this pass. With neither
    /// available the reference turns into a definition.
    pub(crate) fn write_scanned_reference(
        &mut self,
        out: &mut ByteWriter,
        id: StringId,
        original_target: usize,
    ) {
        let text = self.table.text(id);
        out.write_varint(text.len() as u64);

        let site = self
            .relocated(original_target, id)
            .or_else(|| self.sites.get(&id).copied());
        match site {
            Some(site) => write_distance(out, site),
            None => {
                trace!(target = original_target, "scanned reference lost its definition");
                self.define(out, id, None);
            }
        }
    }

    fn define(&mut self, out: &mut ByteWriter, id: StringId, origin: Option<usize>) {
        out.write_varint(0);
        let data_start = out.position();
        self.sites.entry(id).or_insert(data_start);
        if let Some(origin) = origin {
            self.moved.insert(origin, (id, data_start));
        }
        out.write_bytes(self.table.text(id));
    }
}

fn next_id(count: usize) -> Result<StringId> {
    u32::try_from(count)
        .map(StringId)
        .map_err(|_| SaveError::Internal(format!("string table is full at {count} entries")))
}

fn write_distance(out: &mut ByteWriter, site: usize) {
    let anchor = out.position();
    out.write_varint((anchor - site) as u64);
}
