//! SteamWorld Heist II save specifics: header constants, chunk tags and the
//! shipped grammar.

mod grammar;
pub mod types;

pub use types::{
    CHECKSUM_OFFSET, HEADER_LEN, MAGIC, MAX_VERSION, MID_MISSION_MARKERS, TOP_LEVEL, UNMODELED_TAGS,
};
