//! Typed field access by path. Edits only ever replace values in the tree;
//! byte positions are worked out again by the encoder.

use super::Document;
use crate::chunk::{Chunk, Count, FieldValue, ScalarKind, Tag, Value};
use crate::error::{Result, SaveError};
use crate::path::{FieldPath, Segment};
use crate::strings::{StrRef, StringTable};

/// One hop down the tree: a field of the current chunk, and for counted
/// values the element within it.
#[derive(Debug, Clone, Copy)]
struct Step {
    field: usize,
    item: Option<usize>,
}

/// Index path from a top-level chunk to a value.
#[derive(Debug)]
struct Route {
    top: usize,
    steps: Vec<Step>,
}

impl Document {
    /// Every chunk carrying `tag`, in file order, nested chunks included.
    pub fn find_chunks(&self, tag: Tag) -> Vec<&Chunk> {
        let mut out = Vec::new();
        for chunk in &self.chunks {
            collect(chunk, tag, &mut out);
        }
        out
    }

    pub fn get_field(&self, path: &str) -> Result<FieldValue> {
        let path = FieldPath::parse(path)?;
        let value = self.resolve(&path)?;
        scalar_value(value, &self.strings).ok_or_else(|| SaveError::FieldTypeMismatch {
            path: path.to_string(),
            expected: "scalar",
            found: value.kind_name(),
        })
    }

    pub fn set_field(&mut self, path: &str, value: FieldValue) -> Result<()> {
        let path = FieldPath::parse(path)?;
        let route = self.route(&path)?;
        let current = value_at(&self.chunks, &route)?;
        let kind = current.scalar_kind().ok_or_else(|| SaveError::FieldTypeMismatch {
            path: path.to_string(),
            expected: value.kind_name(),
            found: current.kind_name(),
        })?;
        let replacement = to_value(kind, value, &path, &mut self.strings)?;
        if let (Value::Str(old), Value::Str(new)) = (current, &replacement) {
            // Same text: keep the original occurrence and its on-disk form.
            if old.id() == new.id() {
                return Ok(());
            }
        }
        *value_at_mut(&mut self.chunks, &route)? = replacement;
        Ok(())
    }

    /// Element count of a list, array or dict.
    pub fn list_len(&self, path: &str) -> Result<usize> {
        let path = FieldPath::parse(path)?;
        let value = self.resolve(&path)?;
        value.item_count().ok_or_else(|| SaveError::FieldTypeMismatch {
            path: path.to_string(),
            expected: "list",
            found: value.kind_name(),
        })
    }

    pub fn push_list_item(&mut self, path: &str, value: FieldValue) -> Result<()> {
        let path = FieldPath::parse(path)?;
        let route = self.route(&path)?;
        let (kind, count, len) = match value_at(&self.chunks, &route)? {
            Value::List { kind, count, items } => (*kind, *count, items.len()),
            other => {
                return Err(SaveError::FieldTypeMismatch {
                    path: path.to_string(),
                    expected: "list",
                    found: other.kind_name(),
                });
            }
        };
        check_growth(&path, count, len)?;
        let item = to_value(kind, value, &path, &mut self.strings)?;
        if let Value::List { items, .. } = value_at_mut(&mut self.chunks, &route)? {
            items.push(item);
        }
        Ok(())
    }

    /// Removes one element of a list or array.
    pub fn remove_list_item(&mut self, path: &str, index: usize) -> Result<()> {
        let path = FieldPath::parse(path)?;
        let route = self.route(&path)?;
        let target = value_at_mut(&mut self.chunks, &route)?;
        let (count, len) = match &*target {
            Value::List { count, items, .. } => (*count, items.len()),
            Value::Array { count, items, .. } => (*count, items.len()),
            other => {
                return Err(SaveError::FieldTypeMismatch {
                    path: path.to_string(),
                    expected: "list",
                    found: other.kind_name(),
                });
            }
        };
        if let Count::Fixed(len) = count {
            return Err(SaveError::FixedLength {
                path: path.to_string(),
                len,
            });
        }
        if index >= len {
            return Err(out_of_range(&path, index, len));
        }
        match target {
            Value::List { items, .. } => {
                items.remove(index);
            }
            Value::Array { items, .. } => {
                items.remove(index);
            }
            _ => {}
        }
        Ok(())
    }

    fn resolve(&self, path: &FieldPath) -> Result<&Value> {
        let route = self.route(path)?;
        value_at(&self.chunks, &route)
    }

    /// Validates `path` against the current tree and records the indices
    /// leading to the value it names.
    fn route(&self, path: &FieldPath) -> Result<Route> {
        let invalid = |reason: String| SaveError::InvalidPath {
            path: path.to_string(),
            reason,
        };

        let mut steps = Vec::new();
        let (top, mut chunk) = self
            .chunks
            .iter()
            .enumerate()
            .find_map(|(top, chunk)| {
                locate(chunk, path.tag(), &mut steps).map(|found| (top, found))
            })
            .ok_or_else(|| invalid(format!("no {} chunk in this save", path.tag())))?;

        let segments = path.segments();
        for (n, Segment { name, selector }) in segments.iter().enumerate() {
            let last = n + 1 == segments.len();
            let field = chunk
                .field_index(name)
                .ok_or_else(|| invalid(format!("{} has no field {name}", chunk.tag())))?;
            let value = &chunk.fields()[field].value;

            let Some(selector) = selector else {
                steps.push(Step { field, item: None });
                match value {
                    _ if last => {}
                    Value::Chunk(inner) => chunk = inner.as_ref(),
                    other => {
                        return Err(SaveError::FieldTypeMismatch {
                            path: path.to_string(),
                            expected: "chunk",
                            found: other.kind_name(),
                        });
                    }
                }
                continue;
            };

            let (item, next) = match value {
                Value::List { items, .. } => (parse_index(path, selector, items.len())?, None),
                Value::Array { items, .. } => {
                    let i = parse_index(path, selector, items.len())?;
                    (i, Some(&items[i]))
                }
                Value::Dict { entries, .. } => {
                    let i = entries
                        .iter()
                        .position(|(key, _)| key_matches(key, selector, &self.strings))
                        .ok_or_else(|| invalid(format!("{name} has no key {selector}")))?;
                    (i, Some(&entries[i].1))
                }
                other => {
                    return Err(SaveError::FieldTypeMismatch {
                        path: path.to_string(),
                        expected: "list",
                        found: other.kind_name(),
                    });
                }
            };
            steps.push(Step {
                field,
                item: Some(item),
            });
            match (next, last) {
                (Some(inner), false) => chunk = inner,
                (None, true) => {}
                (Some(_), true) => {
                    return Err(SaveError::FieldTypeMismatch {
                        path: path.to_string(),
                        expected: "field",
                        found: "chunk",
                    });
                }
                (None, false) => {
                    return Err(invalid(format!("items of {name} have no fields")));
                }
            }
        }
        Ok(Route { top, steps })
    }
}

fn collect<'a>(chunk: &'a Chunk, tag: Tag, out: &mut Vec<&'a Chunk>) {
    if chunk.tag() == tag {
        out.push(chunk);
    }
    for child in chunk.children() {
        collect(child, tag, out);
    }
}

/// Depth-first search for the first `tag` chunk at or below `chunk`,
/// pushing the steps taken onto `steps`.
fn locate<'a>(chunk: &'a Chunk, tag: Tag, steps: &mut Vec<Step>) -> Option<&'a Chunk> {
    if chunk.tag() == tag {
        return Some(chunk);
    }
    for (field, f) in chunk.fields().iter().enumerate() {
        let children: Vec<(Option<usize>, &Chunk)> = match &f.value {
            Value::Chunk(inner) => vec![(None, inner.as_ref())],
            Value::Array { items, .. } => {
                items.iter().enumerate().map(|(i, c)| (Some(i), c)).collect()
            }
            Value::Dict { entries, .. } => entries
                .iter()
                .enumerate()
                .map(|(i, (_, c))| (Some(i), c))
                .collect(),
            _ => continue,
        };
        for (item, child) in children {
            steps.push(Step { field, item });
            if let Some(found) = locate(child, tag, steps) {
                return Some(found);
            }
            steps.pop();
        }
    }
    None
}

fn value_at<'a>(chunks: &'a [Chunk], route: &Route) -> Result<&'a Value> {
    let stale = || SaveError::Internal("field route no longer matches the tree".to_string());
    let (last, hops) = route.steps.split_last().ok_or_else(stale)?;
    let mut chunk = chunks.get(route.top).ok_or_else(stale)?;
    for step in hops {
        let field = &chunk.fields().get(step.field).ok_or_else(stale)?.value;
        chunk = match (field, step.item) {
            (Value::Chunk(inner), None) => inner.as_ref(),
            (Value::Array { items, .. }, Some(i)) => items.get(i).ok_or_else(stale)?,
            (Value::Dict { entries, .. }, Some(i)) => &entries.get(i).ok_or_else(stale)?.1,
            _ => return Err(stale()),
        };
    }
    let field = &chunk.fields().get(last.field).ok_or_else(stale)?.value;
    match (field, last.item) {
        (Value::List { items, .. }, Some(i)) => items.get(i).ok_or_else(stale),
        (field, None) => Ok(field),
        _ => Err(stale()),
    }
}

fn value_at_mut<'a>(chunks: &'a mut [Chunk], route: &Route) -> Result<&'a mut Value> {
    let stale = || SaveError::Internal("field route no longer matches the tree".to_string());
    let (last, hops) = route.steps.split_last().ok_or_else(stale)?;
    let mut chunk = chunks.get_mut(route.top).ok_or_else(stale)?;
    for step in hops {
        let field = &mut chunk.fields_mut().get_mut(step.field).ok_or_else(stale)?.value;
        chunk = match (field, step.item) {
            (Value::Chunk(inner), None) => inner.as_mut(),
            (Value::Array { items, .. }, Some(i)) => items.get_mut(i).ok_or_else(stale)?,
            (Value::Dict { entries, .. }, Some(i)) => {
                &mut entries.get_mut(i).ok_or_else(stale)?.1
            }
            _ => return Err(stale()),
        };
    }
    let field = &mut chunk.fields_mut().get_mut(last.field).ok_or_else(stale)?.value;
    match (field, last.item) {
        (Value::List { items, .. }, Some(i)) => items.get_mut(i).ok_or_else(stale),
        (field, None) => Ok(field),
        _ => Err(stale()),
    }
}

fn scalar_value(value: &Value, strings: &StringTable) -> Option<FieldValue> {
    match value {
        Value::Bytes(bytes) => Some(FieldValue::Bytes(bytes.clone())),
        Value::Str(s) => Some(FieldValue::Str(strings.resolve(s).to_vec())),
        other => other.as_int().map(FieldValue::Int),
    }
}

fn key_matches(key: &Value, selector: &str, strings: &StringTable) -> bool {
    match scalar_value(key, strings) {
        Some(FieldValue::Int(v)) => selector.parse::<u64>() == Ok(v),
        Some(FieldValue::Str(bytes)) => {
            FieldValue::text(selector).as_str_bytes() == Some(bytes.as_slice())
        }
        Some(bytes) => bytes.to_string().eq_ignore_ascii_case(selector),
        None => false,
    }
}

fn parse_index(path: &FieldPath, selector: &str, len: usize) -> Result<usize> {
    let index = selector.parse::<usize>().map_err(|_| SaveError::InvalidPath {
        path: path.to_string(),
        reason: format!("'{selector}' is not an index"),
    })?;
    if index >= len {
        return Err(out_of_range(path, index, len));
    }
    Ok(index)
}

fn out_of_range(path: &FieldPath, index: usize, len: usize) -> SaveError {
    SaveError::InvalidPath {
        path: path.to_string(),
        reason: format!("index {index} out of range (length {len})"),
    }
}

fn check_growth(path: &FieldPath, count: Count, len: usize) -> Result<()> {
    match count {
        Count::Fixed(len) => Err(SaveError::FixedLength {
            path: path.to_string(),
            len,
        }),
        Count::U8 if len >= usize::from(u8::MAX) => Err(SaveError::ValueOutOfRange {
            path: path.to_string(),
            value: len as u64 + 1,
            max: u64::from(u8::MAX),
        }),
        _ => Ok(()),
    }
}

fn to_value(
    kind: ScalarKind,
    value: FieldValue,
    path: &FieldPath,
    strings: &mut StringTable,
) -> Result<Value> {
    let mismatch = |found| SaveError::FieldTypeMismatch {
        path: path.to_string(),
        expected: kind.name(),
        found,
    };
    match (kind, value) {
        (ScalarKind::Bytes(len), FieldValue::Bytes(bytes)) => {
            if bytes.len() != len {
                return Err(SaveError::FixedLength {
                    path: path.to_string(),
                    len,
                });
            }
            Ok(Value::Bytes(bytes))
        }
        (ScalarKind::Str, FieldValue::Str(bytes)) => Ok(Value::Str(if bytes.is_empty() {
            StrRef::empty()
        } else {
            StrRef::new(Some(strings.intern(&bytes)?))
        })),
        (kind, FieldValue::Int(v)) => {
            let max = kind.int_max().ok_or_else(|| mismatch("integer"))?;
            if v > max {
                return Err(SaveError::ValueOutOfRange {
                    path: path.to_string(),
                    value: v,
                    max,
                });
            }
            // `v <= max` was checked above, so the narrowing casts are exact.
            Ok(match kind {
                ScalarKind::U8 => Value::U8(v as u8),
                ScalarKind::U16 => Value::U16(v as u16),
                ScalarKind::U32 => Value::U32(v as u32),
                _ => Value::Varint(v),
            })
        }
        (_, other) => Err(mismatch(other.kind_name())),
    }
}
