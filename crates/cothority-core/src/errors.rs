//! Unified error type for the archive cothority.
//!
//! A single flat enum rather than a per-crate hierarchy, so that a failure
//! originating deep in the structured-consensus pipeline can cross a tree
//! overlay boundary without being wrapped a dozen times.

use serde::{Deserialize, Serialize};

/// Unified error type for all cothority operations.
#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
pub enum CothorityError {
    /// Invalid input, configuration, or malformed wire message.
    #[error("invalid: {message}")]
    Invalid { message: String },

    /// A requested record (transcript, block, share) was not found.
    #[error("not found: {message}")]
    NotFound { message: String },

    /// A cryptographic check failed (signature, proof, discrete-log lookup).
    #[error("crypto error: {message}")]
    Crypto { message: String },

    /// Tree overlay delivery failure.
    #[error("network error: {message}")]
    Network { message: String },

    /// Serialization or deserialization failure.
    #[error("serialization error: {message}")]
    Serialization { message: String },

    /// Persistent storage (shared secret, skipchain block) I/O failure.
    #[error("storage error: {message}")]
    Storage { message: String },

    /// A protocol phase exceeded its wall-clock budget.
    #[error("timeout: {message}")]
    Timeout { message: String },

    /// Internal invariant violation.
    #[error("internal error: {message}")]
    Internal { message: String },
}

impl CothorityError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid { message: message.into() }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound { message: message.into() }
    }

    pub fn crypto(message: impl Into<String>) -> Self {
        Self::Crypto { message: message.into() }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::Network { message: message.into() }
    }

    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization { message: message.into() }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage { message: message.into() }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::Timeout { message: message.into() }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal { message: message.into() }
    }

    /// Whether a client retrying the whole SAVE/RETRIEVE could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network { .. } | Self::Timeout { .. })
    }

    pub fn category(&self) -> &'static str {
        match self {
            Self::Invalid { .. } => "invalid",
            Self::NotFound { .. } => "not_found",
            Self::Crypto { .. } => "crypto",
            Self::Network { .. } => "network",
            Self::Serialization { .. } => "serialization",
            Self::Storage { .. } => "storage",
            Self::Timeout { .. } => "timeout",
            Self::Internal { .. } => "internal",
        }
    }
}

pub type Result<T> = std::result::Result<T, CothorityError>;

impl From<serde_json::Error> for CothorityError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization(err.to_string())
    }
}

impl From<std::io::Error> for CothorityError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::not_found(err.to_string()),
            std::io::ErrorKind::PermissionDenied => Self::storage(err.to_string()),
            _ => Self::internal(err.to_string()),
        }
    }
}

impl From<hex::FromHexError> for CothorityError {
    fn from(err: hex::FromHexError) -> Self {
        Self::serialization(format!("hex decode: {err}"))
    }
}

/// One non-fatal error recorded during a run, tagged with its source node.
///
/// Carried up the tree exactly as `spec.md` describes ("ErrorList"):
/// logged, never rethrown, never aborts the run on its own.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordedError {
    pub source: crate::identifiers::NodeIndex,
    pub error: CothorityError,
}

/// Accumulator of non-fatal errors for one protocol run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorList(pub Vec<RecordedError>);

impl ErrorList {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, source: crate::identifiers::NodeIndex, error: CothorityError) {
        self.0.push(RecordedError { source, error });
    }

    pub fn extend(&mut self, other: ErrorList) {
        self.0.extend(other.0);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}
