pub mod blob;
pub mod checksum;
pub mod chunk;
pub mod core_api;
pub mod cursor;
pub mod document;
pub mod error;
pub mod grammar;
pub mod layout;
pub mod path;
pub mod scanner;
pub mod skippable;
pub mod strings;
pub mod swh2;
pub mod varint;

pub use chunk::{Chunk, FieldValue, Tag, Value};
pub use document::{ChecksumStatus, DecodeOptions, Document};
pub use error::{Result, SaveError};
pub use grammar::{ChunkRule, FieldRule, Grammar};
