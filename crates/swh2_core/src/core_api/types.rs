use serde::{Deserialize, Serialize};

use crate::document::ChecksumStatus;
use crate::strings::StringStorage;

/// The well-known values of an SWH2 save, read out of the chunk tree.
/// Values whose chunk is missing from the save are left empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    pub version: u8,
    pub checksum: ChecksumStatus,
    pub location: String,
    pub region: String,
    pub quest: String,
    pub crew: Vec<String>,
    pub outset: String,
    pub campaign_state: String,
    pub water: Option<u32>,
    pub fragments: Option<u32>,
    pub equipped: Vec<String>,
    pub upgrades: Vec<String>,
    pub inventory: Vec<String>,
    pub hats: Vec<String>,
    pub new_hats: Vec<String>,
    pub leeway_hat: String,
    pub string_storage: StringStorage,
    pub skippable_section: bool,
    /// Known but unmodeled chunk tags spotted in the opaque tail.
    pub unmodeled_chunks: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CapabilityIssue {
    ChecksumMismatch,
    /// Re-encoding the untouched save did not reproduce it.
    RoundTripMismatch,
    /// Structured decoding stopped before the last expected chunk.
    PartialStructure,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Capabilities {
    pub can_query: bool,
    pub can_apply_edits: bool,
    pub issues: Vec<CapabilityIssue>,
}

impl Capabilities {
    pub fn read_only(issues: Vec<CapabilityIssue>) -> Self {
        Self {
            can_query: true,
            can_apply_edits: false,
            issues,
        }
    }

    pub fn editable(issues: Vec<CapabilityIssue>) -> Self {
        Self {
            can_query: true,
            can_apply_edits: true,
            issues,
        }
    }
}
