use std::error::Error;
use std::fmt;

use crate::error::SaveError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoreErrorCode {
    Io,
    Parse,
    ChecksumMismatch,
    UnsupportedSaveState,
    UnsupportedOperation,
    InvalidEdit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreError {
    pub code: CoreErrorCode,
    pub message: String,
}

impl CoreError {
    pub fn new(code: CoreErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.code, self.message)
    }
}

impl Error for CoreError {}

impl From<SaveError> for CoreError {
    fn from(err: SaveError) -> Self {
        let code = match &err {
            SaveError::ChecksumMismatch { .. } => CoreErrorCode::ChecksumMismatch,
            SaveError::UnsupportedSaveState { .. } => CoreErrorCode::UnsupportedSaveState,
            SaveError::InvalidPath { .. }
            | SaveError::FieldTypeMismatch { .. }
            | SaveError::ValueOutOfRange { .. }
            | SaveError::FixedLength { .. } => CoreErrorCode::InvalidEdit,
            SaveError::Internal(_) => CoreErrorCode::UnsupportedOperation,
            SaveError::BadMagic { .. }
            | SaveError::UnsupportedVersion { .. }
            | SaveError::MalformedVarint { .. }
            | SaveError::DanglingStringReference { .. }
            | SaveError::UnexpectedEndOfBuffer { .. }
            | SaveError::UnexpectedChunkTag { .. }
            | SaveError::RoundTripMismatch { .. } => CoreErrorCode::Parse,
        };
        Self::new(code, err.to_string())
    }
}
