//! # Geoimport
//!
//! A streaming CSV importer that validates IPv4 geolocation records,
//! deduplicates them by address, persists the survivors concurrently to a
//! byte-keyed store, and reports per-run analytics.
//!
//! ## Design Principles
//!
//! - **Single-pass ingest**: each row is decoded, validated, and settled once
//! - **First occurrence wins**: an address seen earlier rejects later copies
//! - **Workers never outnumber records**: the save pool is clamped to the batch
//! - **Balanced accounting**: `accepted + rejected == total_rows`, always
//!
//! ## Example
//!
//! ```
//! use geoimport::{run_import, MemoryStore};
//! use std::io::Cursor;
//!
//! let csv = "ip_address,country_code,country,city,latitude,longitude,mystery_value\n\
//!            200.106.141.15,SI,Nepal,DuBuquemouth,-84.87,7.20,7823011346\n";
//! let store = MemoryStore::new();
//! let analytics = run_import(Cursor::new(csv), &store, 4);
//! assert_eq!(analytics.accepted(), 1);
//! ```

pub mod analytics;
pub mod config;
pub mod dedup;
pub mod error;
pub mod pipeline;
pub mod record;
pub mod saver;
pub mod store;

pub use analytics::RunAnalytics;
pub use config::{ImportConfig, StoreSettings};
pub use dedup::AddressSet;
pub use error::{ImportError, LookupError, RejectionKind, Result, StoreError};
pub use pipeline::{run_import, IngestPipeline};
pub use record::{GeoRecord, RawRecord};
pub use saver::ParallelSaver;
pub use store::{lookup_record, MemoryStore, RecordStore, SqliteStore};
