use crate::chunk::FieldValue;
use crate::document::{DecodeOptions, Document};
use crate::error::SaveError;
use crate::grammar::Grammar;
use crate::swh2::UNMODELED_TAGS;

use super::error::{CoreError, CoreErrorCode};
use super::types::{Capabilities, CapabilityIssue, Snapshot};

#[derive(Debug, Clone)]
pub struct Engine {
    grammar: Grammar,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
pub struct Session {
    snapshot: Snapshot,
    capabilities: Capabilities,
    document: Document,
}

impl Engine {
    pub fn new() -> Self {
        Self::with_grammar(Grammar::swh2())
    }

    pub fn with_grammar(grammar: Grammar) -> Self {
        Self { grammar }
    }

    /// Decodes a save and checks that it re-encodes to the same bytes. When
    /// it does not, the session is still opened for reading unless `options`
    /// asks for the check to be fatal.
    pub fn open_bytes<B: AsRef<[u8]>>(
        &self,
        bytes: B,
        options: DecodeOptions,
    ) -> Result<Session, CoreError> {
        let decode_options = DecodeOptions {
            verify_round_trip: false,
            ..options
        };
        let document = Document::decode_with(bytes.as_ref(), &self.grammar, decode_options)?;

        let mut issues = Vec::new();
        if !document.checksum().is_valid() {
            issues.push(CapabilityIssue::ChecksumMismatch);
        }
        if document.chunks().len() < self.grammar.top_level().len() {
            issues.push(CapabilityIssue::PartialStructure);
        }
        let capabilities = match document.verify_round_trip() {
            Ok(()) => Capabilities::editable(issues),
            Err(SaveError::RoundTripMismatch { offset }) if !options.verify_round_trip => {
                tracing::warn!(offset, "save does not round-trip; opening read-only");
                issues.push(CapabilityIssue::RoundTripMismatch);
                Capabilities::read_only(issues)
            }
            Err(err) => return Err(err.into()),
        };

        Ok(Session {
            snapshot: build_snapshot(&document),
            capabilities,
            document,
        })
    }
}

impl Session {
    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn get_field(&self, path: &str) -> Result<FieldValue, CoreError> {
        Ok(self.document.get_field(path)?)
    }

    pub fn list_len(&self, path: &str) -> Result<usize, CoreError> {
        Ok(self.document.list_len(path)?)
    }

    pub fn set_field(&mut self, path: &str, value: FieldValue) -> Result<(), CoreError> {
        self.ensure_editable()?;
        self.document.set_field(path, value)?;
        self.snapshot = build_snapshot(&self.document);
        Ok(())
    }

    pub fn push_list_item(&mut self, path: &str, value: FieldValue) -> Result<(), CoreError> {
        self.ensure_editable()?;
        self.document.push_list_item(path, value)?;
        self.snapshot = build_snapshot(&self.document);
        Ok(())
    }

    pub fn remove_list_item(&mut self, path: &str, index: usize) -> Result<(), CoreError> {
        self.ensure_editable()?;
        self.document.remove_list_item(path, index)?;
        self.snapshot = build_snapshot(&self.document);
        Ok(())
    }

    pub fn set_water(&mut self, water: u32) -> Result<(), CoreError> {
        self.set_field("GaRe.water", FieldValue::Int(u64::from(water)))
            .map_err(|e| {
                CoreError::new(e.code, format!("failed to set water: {}", e.message))
            })
    }

    pub fn set_fragments(&mut self, fragments: u32) -> Result<(), CoreError> {
        self.set_field("GaRe.fragments", FieldValue::Int(u64::from(fragments)))
            .map_err(|e| {
                CoreError::new(e.code, format!("failed to set fragments: {}", e.message))
            })
    }

    pub fn to_bytes_unmodified(&self) -> Vec<u8> {
        self.document.to_bytes_unmodified()
    }

    pub fn to_bytes_modified(&self) -> Result<Vec<u8>, CoreError> {
        Ok(self.document.encode()?)
    }

    fn ensure_editable(&self) -> Result<(), CoreError> {
        if self.capabilities.can_apply_edits {
            return Ok(());
        }
        Err(CoreError::new(
            CoreErrorCode::UnsupportedOperation,
            "this save does not round-trip, so edits are disabled",
        ))
    }
}

fn build_snapshot(doc: &Document) -> Snapshot {
    Snapshot {
        version: doc.version(),
        checksum: doc.checksum(),
        location: text(doc, "Head.location"),
        region: text(doc, "Head.region"),
        quest: text(doc, "Head.quest"),
        crew: texts(doc, "Head.crew", ""),
        outset: text(doc, "imh2.outset"),
        campaign_state: text(doc, "imh2.campaign_state"),
        water: int(doc, "GaRe.water"),
        fragments: int(doc, "GaRe.fragments"),
        equipped: texts(doc, "Ship.equipped", ""),
        upgrades: texts(doc, "Ship.upgrades", ""),
        inventory: texts(doc, "Inve.items", ".name"),
        hats: texts(doc, "Inve.hats", ""),
        new_hats: texts(doc, "Inve.new_hats", ""),
        leeway_hat: text(doc, "Inve.leeway_hat"),
        string_storage: doc.storage(),
        skippable_section: doc.skippable().is_some(),
        unmodeled_chunks: doc
            .tail()
            .find_tags(&UNMODELED_TAGS)
            .into_iter()
            .map(|(_, tag)| tag.to_string())
            .collect(),
    }
}

fn text(doc: &Document, path: &str) -> String {
    doc.get_field(path)
        .ok()
        .and_then(|v| v.to_text())
        .unwrap_or_default()
}

fn int(doc: &Document, path: &str) -> Option<u32> {
    doc.get_field(path)
        .ok()
        .and_then(|v| v.as_int())
        .and_then(|v| u32::try_from(v).ok())
}

/// Text of every element of a counted field; `suffix` selects a field within
/// each element.
fn texts(doc: &Document, path: &str, suffix: &str) -> Vec<String> {
    let len = doc.list_len(path).unwrap_or(0);
    (0..len)
        .map(|i| text(doc, &format!("{path}[{i}]{suffix}")))
        .collect()
}
