use std::fmt;
use std::str::FromStr;

use crate::chunk::Tag;
use crate::error::{Result, SaveError};

/// One `name` or `name[selector]` step of a field path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub name: String,
    pub selector: Option<String>,
}

/// Address of a field: a chunk tag followed by dotted field names, each
/// optionally indexed, e.g. `Head.difficulties[1].settings[0]` or
/// `Inve.items[2].name`. The tag selects the first chunk carrying it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPath {
    raw: String,
    tag: Tag,
    segments: Vec<Segment>,
}

impl FieldPath {
    pub fn parse(text: &str) -> Result<Self> {
        let invalid = |reason: &str| SaveError::InvalidPath {
            path: text.to_string(),
            reason: reason.to_string(),
        };

        let (tag_text, rest) = text
            .split_once('.')
            .ok_or_else(|| invalid("expected Tag.field"))?;
        let tag = Tag::parse(tag_text).ok_or_else(|| invalid("chunk tag must be 4 bytes"))?;

        let mut segments = Vec::new();
        let mut chars = rest.chars().peekable();
        loop {
            let mut name = String::new();
            while let Some(&c) = chars.peek() {
                if c == '.' || c == '[' {
                    break;
                }
                if !(c.is_ascii_alphanumeric() || c == '_') {
                    return Err(invalid(&format!("unexpected character '{c}'")));
                }
                name.push(c);
                chars.next();
            }
            if name.is_empty() {
                return Err(invalid("empty field name"));
            }

            let mut selector = None;
            if chars.peek() == Some(&'[') {
                chars.next();
                let mut inner = String::new();
                loop {
                    match chars.next() {
                        Some(']') => break,
                        Some(c) => inner.push(c),
                        None => return Err(invalid("unterminated '['")),
                    }
                }
                if inner.is_empty() {
                    return Err(invalid("empty selector"));
                }
                selector = Some(inner);
            }
            segments.push(Segment { name, selector });

            match chars.next() {
                None => break,
                Some('.') => continue,
                Some(c) => return Err(invalid(&format!("unexpected character '{c}'"))),
            }
        }

        Ok(Self {
            raw: text.to_string(),
            tag,
            segments,
        })
    }

    pub fn tag(&self) -> Tag {
        self.tag
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl FromStr for FieldPath {
    type Err = SaveError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

#[cfg(test)]
mod tests {
    use super::{FieldPath, Segment};
    use crate::chunk::Tag;
    use crate::error::SaveError;

    #[test]
    fn parses_nested_indexed_path() {
        let path: FieldPath = "Head.difficulties[1].settings[0]".parse().unwrap();
        assert_eq!(path.tag(), Tag::new(*b"Head"));
        assert_eq!(
            path.segments(),
            &[
                Segment {
                    name: "difficulties".to_string(),
                    selector: Some("1".to_string()),
                },
                Segment {
                    name: "settings".to_string(),
                    selector: Some("0".to_string()),
                },
            ]
        );
    }

    #[test]
    fn dict_keys_may_contain_dots() {
        let path = FieldPath::parse("Pers.by_name[hat.top].v").unwrap();
        assert_eq!(path.segments()[0].selector.as_deref(), Some("hat.top"));
        assert_eq!(path.segments()[1].name, "v");
    }

    #[test]
    fn rejects_malformed_paths() {
        for bad in ["Head", "Hea.x", "Head.", "Head.a..b", "Head.a[1", "Head.a[]", "Head.a[1]b"] {
            assert!(
                matches!(FieldPath::parse(bad), Err(SaveError::InvalidPath { .. })),
                "{bad} should be rejected"
            );
        }
    }
}
