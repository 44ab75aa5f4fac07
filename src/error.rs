//! Error types for the geolocation importer.

use std::fmt;
use strum_macros::EnumIter;
use thiserror::Error;

/// Result type alias for importer operations
pub type Result<T> = std::result::Result<T, ImportError>;

/// Fatal errors that abort a run before or during startup.
///
/// Per-row failures never appear here; they are counted as
/// [`RejectionKind`]s and the run continues.
#[derive(Error, Debug)]
pub enum ImportError {
    /// Failed to open or read the input file
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file could not be parsed or failed validation
    #[error("invalid config file {path}: {message}")]
    Config { path: String, message: String },

    /// The store collaborator could not be opened
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Missing input file argument
    #[error("Missing input file argument. Usage: geoimport <input.csv> [config.json]")]
    MissingArgument,
}

/// Reasons a row fails to become a persisted record.
///
/// Every kind is counted in [`RunAnalytics`](crate::RunAnalytics); none of
/// them aborts the run. Kinds compare by tag (`Eq`/`Hash`), and the closed
/// set can be iterated with `strum::IntoEnumIterator` so counters and
/// reports always cover all of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter)]
pub enum RejectionKind {
    /// Row could not be read, or had fewer than the 7 expected fields.
    InvalidRow,

    /// The address field is not a valid IPv4 literal.
    IpParseFailure,

    /// The address was already seen earlier in this run.
    DuplicateAddress,

    /// Latitude failed to parse or is outside [-90, 90].
    InvalidLat,

    /// Longitude failed to parse or is outside [-180, 180].
    InvalidLng,

    /// All text fields empty and a coordinate component is exactly zero.
    InsufficientData,

    /// The store rejected the record during the save phase.
    DatabaseSave,
}

impl RejectionKind {
    /// Human-readable label used in logs and the run summary.
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectionKind::InvalidRow => "not a valid csv row",
            RejectionKind::IpParseFailure => "not a valid ip address",
            RejectionKind::DuplicateAddress => "duplicate ip address",
            RejectionKind::InvalidLat => "invalid latitude",
            RejectionKind::InvalidLng => "invalid longitude",
            RejectionKind::InsufficientData => "insufficient record data",
            RejectionKind::DatabaseSave => "database save failure",
        }
    }
}

impl fmt::Display for RejectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Opaque failure from a [`RecordStore`](crate::RecordStore) implementation.
#[derive(Error, Debug)]
#[error("store operation failed: {0}")]
pub struct StoreError(pub String);

impl StoreError {
    pub fn new(message: impl Into<String>) -> Self {
        StoreError(message.into())
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError(err.to_string())
    }
}

/// Errors returned by the lookup-by-address API.
#[derive(Error, Debug)]
pub enum LookupError {
    /// The requested address is not a valid IPv4 literal.
    #[error("ip address is invalid")]
    InvalidAddress,

    /// No record exists in the store for the address.
    #[error("no record found for address")]
    NotFound,

    /// A record exists but its stored blob could not be decoded.
    #[error("stored record data is invalid")]
    InvalidData,

    /// The store collaborator itself failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}
