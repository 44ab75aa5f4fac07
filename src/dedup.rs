//! Duplicate-address tracking for a single import run.

use std::collections::HashSet;
use std::net::Ipv4Addr;

/// Set of IPv4 addresses (as 4-byte keys) seen during the current run.
///
/// Accessed only from the single-threaded ingest pass, so it carries no
/// synchronization. One run owns exactly one `AddressSet`; it is dropped
/// with the pipeline when the run ends.
#[derive(Debug, Default)]
pub struct AddressSet {
    seen: HashSet<[u8; 4]>,
}

impl AddressSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        AddressSet::default()
    }

    /// Marks an address as seen.
    ///
    /// Returns `true` if the address was not seen before (it is now), and
    /// `false` if it was already present.
    pub fn insert(&mut self, address: Ipv4Addr) -> bool {
        self.seen.insert(address.octets())
    }

    /// Number of distinct addresses seen so far.
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    /// Returns `true` if no address has been seen yet.
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
