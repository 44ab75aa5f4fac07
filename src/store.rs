//! Record persistence: the byte-keyed store trait and its backends.
//!
//! Only this module talks to SQLite. The rest of the pipeline sees
//! [`RecordStore`] and works the same against the in-memory backend.

use crate::error::{LookupError, StoreError};
use crate::record::GeoRecord;
use log::debug;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

/// Byte-keyed key-value storage for accepted records.
///
/// `Send + Sync` because save workers share one store reference across
/// threads. Implementations must tolerate concurrent calls.
pub trait RecordStore: Send + Sync {
    /// Stores `value` under `key`, overwriting any previous value.
    fn set(&self, key: &[u8], value: &[u8]) -> Result<(), StoreError>;

    /// Fetches the value stored under `key`, or `None` if absent.
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError>;
}

/// In-memory store backed by a mutex-guarded map.
///
/// Used by tests and library callers that do not need durability.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<Vec<u8>, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently held.
    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl RecordStore for MemoryStore {
    fn set(&self, key: &[u8], value: &[u8]) -> Result<(), StoreError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| StoreError::new("memory store mutex poisoned"))?;
        entries.insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| StoreError::new("memory store mutex poisoned"))?;
        Ok(entries.get(key).cloned())
    }
}

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS geo_records (
    address BLOB PRIMARY KEY,
    record  BLOB NOT NULL
);";

/// Durable store backed by a single SQLite file.
///
/// One connection is shared behind a mutex. SQLite serializes writers on
/// the file lock anyway, so a connection per worker would buy nothing here.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Opens the store at `path`, creating the file and schema if needed.
    pub fn open(path: impl AsRef<Path>, busy_timeout: Duration) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let conn = Connection::open(path)?;
        conn.busy_timeout(busy_timeout)?;
        // WAL applies only to file-backed databases; ignore the refusal.
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        conn.execute_batch(SCHEMA)?;
        debug!("Opened record store at {}", path.display());
        Ok(SqliteStore {
            conn: Mutex::new(conn),
        })
    }

    /// Opens a throwaway in-memory store.
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(SqliteStore {
            conn: Mutex::new(conn),
        })
    }
}

impl RecordStore for SqliteStore {
    fn set(&self, key: &[u8], value: &[u8]) -> Result<(), StoreError> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| StoreError::new("sqlite connection mutex poisoned"))?;
        conn.execute(
            "INSERT INTO geo_records (address, record) VALUES (?1, ?2)
             ON CONFLICT(address) DO UPDATE SET record = excluded.record",
            params![key, value],
        )?;
        Ok(())
    }

    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| StoreError::new("sqlite connection mutex poisoned"))?;
        let value = conn
            .query_row(
                "SELECT record FROM geo_records WHERE address = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }
}

/// Fetches and decodes the record stored under an IPv4 address literal.
///
/// Distinguishes a malformed address, a missing record, and a present but
/// undecodable blob; store transport failures pass through unchanged.
pub fn lookup_record<S: RecordStore + ?Sized>(
    store: &S,
    address: &str,
) -> Result<GeoRecord, LookupError> {
    let address: Ipv4Addr = address.parse().map_err(|_| LookupError::InvalidAddress)?;
    let blob = store.get(&address.octets())?.ok_or(LookupError::NotFound)?;
    GeoRecord::from_blob(&blob).map_err(|_| LookupError::InvalidData)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> GeoRecord {
        GeoRecord {
            address: Ipv4Addr::new(200, 106, 141, 15),
            country_code: "SI".to_string(),
            country: "Nepal".to_string(),
            city: "DuBuquemouth".to_string(),
            lat: -84.87503094689836,
            lng: 7.206435933364332,
            mystery_value: "7823011346".to_string(),
        }
    }

    #[test]
    fn test_memory_store_roundtrip() {
        let store = MemoryStore::new();
        store.set(b"key", b"value").unwrap();
        assert_eq!(store.get(b"key").unwrap(), Some(b"value".to_vec()));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_memory_store_missing_key_is_none() {
        let store = MemoryStore::new();
        assert_eq!(store.get(b"absent").unwrap(), None);
    }

    #[test]
    fn test_memory_store_set_overwrites() {
        let store = MemoryStore::new();
        store.set(b"key", b"first").unwrap();
        store.set(b"key", b"second").unwrap();
        assert_eq!(store.get(b"key").unwrap(), Some(b"second".to_vec()));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_sqlite_store_roundtrip() {
        let store = SqliteStore::in_memory().unwrap();
        let record = sample_record();
        store.set(&record.key(), &record.to_blob().unwrap()).unwrap();

        let blob = store.get(&record.key()).unwrap().unwrap();
        assert_eq!(GeoRecord::from_blob(&blob).unwrap(), record);
    }

    #[test]
    fn test_sqlite_store_set_overwrites() {
        let store = SqliteStore::in_memory().unwrap();
        store.set(&[1, 2, 3, 4], b"old").unwrap();
        store.set(&[1, 2, 3, 4], b"new").unwrap();
        assert_eq!(store.get(&[1, 2, 3, 4]).unwrap(), Some(b"new".to_vec()));
    }

    #[test]
    fn test_sqlite_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.db");
        let record = sample_record();

        {
            let store = SqliteStore::open(&path, Duration::from_millis(100)).unwrap();
            store.set(&record.key(), &record.to_blob().unwrap()).unwrap();
        }

        let store = SqliteStore::open(&path, Duration::from_millis(100)).unwrap();
        let found = lookup_record(&store, "200.106.141.15").unwrap();
        assert_eq!(found, record);
    }

    #[test]
    fn test_lookup_rejects_malformed_address() {
        let store = MemoryStore::new();
        let err = lookup_record(&store, "not-an-ip").unwrap_err();
        assert!(matches!(err, LookupError::InvalidAddress));

        let err = lookup_record(&store, "300.1.2.3").unwrap_err();
        assert!(matches!(err, LookupError::InvalidAddress));
    }

    #[test]
    fn test_lookup_reports_missing_record() {
        let store = MemoryStore::new();
        let err = lookup_record(&store, "10.0.0.1").unwrap_err();
        assert!(matches!(err, LookupError::NotFound));
    }

    #[test]
    fn test_lookup_reports_undecodable_blob() {
        let store = MemoryStore::new();
        store.set(&[10, 0, 0, 1], b"not json").unwrap();
        let err = lookup_record(&store, "10.0.0.1").unwrap_err();
        assert!(matches!(err, LookupError::InvalidData));
    }

    #[test]
    fn test_lookup_returns_decoded_record() {
        let store = MemoryStore::new();
        let record = sample_record();
        store.set(&record.key(), &record.to_blob().unwrap()).unwrap();

        let found = lookup_record(&store, "200.106.141.15").unwrap();
        assert_eq!(found, record);
    }
}
