//! Record models for CSV decoding and the validated geolocation entity.

use crate::dedup::AddressSet;
use crate::error::RejectionKind;
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;

/// Raw geolocation row as read from CSV, before any validation.
///
/// Carries the 7 expected columns in input order. All fields are kept as
/// the exact strings from the file; nothing is trimmed or interpreted
/// until [`RawRecord::validate`] runs.
#[derive(Debug, Clone)]
pub struct RawRecord {
    /// IPv4 address literal (column 1, the persistence key once parsed)
    pub address: String,

    /// ISO country code (column 2, may be empty)
    pub country_code: String,

    /// Country name (column 3, may be empty)
    pub country: String,

    /// City name (column 4, may be empty)
    pub city: String,

    /// Latitude literal (column 5)
    pub lat: String,

    /// Longitude literal (column 6)
    pub lng: String,

    /// Opaque passthrough value (column 7, never interpreted)
    pub mystery_value: String,
}

impl RawRecord {
    /// Extracts the 7 expected fields from a decoded CSV row.
    ///
    /// Returns `None` when the row has fewer than 7 fields. Extra trailing
    /// fields are ignored.
    pub fn from_csv(record: &csv::StringRecord) -> Option<Self> {
        if record.len() < 7 {
            return None;
        }

        Some(RawRecord {
            address: record[0].to_string(),
            country_code: record[1].to_string(),
            country: record[2].to_string(),
            city: record[3].to_string(),
            lat: record[4].to_string(),
            lng: record[5].to_string(),
            mystery_value: record[6].to_string(),
        })
    }

    /// Validates the raw fields into a candidate [`GeoRecord`].
    ///
    /// Checks run in a fixed order and stop at the first failure:
    ///
    /// 1. `address` must parse as an IPv4 literal (`IpParseFailure`)
    /// 2. the normalized address must be new this run (`DuplicateAddress`);
    ///    the address is marked seen at this step, so a row that fails a
    ///    later check still claims its address
    /// 3. `lat` must parse and lie in [-90, 90] (`InvalidLat`)
    /// 4. `lng` must parse and lie in [-180, 180] (`InvalidLng`)
    ///
    /// The sufficiency rule is not applied here; see
    /// [`GeoRecord::has_sufficient_data`].
    pub fn validate(
        &self,
        seen: &mut AddressSet,
    ) -> std::result::Result<GeoRecord, RejectionKind> {
        let address: Ipv4Addr = self
            .address
            .parse()
            .map_err(|_| RejectionKind::IpParseFailure)?;

        if !seen.insert(address) {
            return Err(RejectionKind::DuplicateAddress);
        }

        let lat = parse_coordinate(&self.lat, -90.0, 90.0).ok_or(RejectionKind::InvalidLat)?;
        let lng = parse_coordinate(&self.lng, -180.0, 180.0).ok_or(RejectionKind::InvalidLng)?;

        Ok(GeoRecord {
            address,
            country_code: self.country_code.clone(),
            country: self.country.clone(),
            city: self.city.clone(),
            lat,
            lng,
            mystery_value: self.mystery_value.clone(),
        })
    }
}

/// Parses a coordinate literal and checks it against an inclusive range.
///
/// NaN never satisfies the range check and is rejected.
fn parse_coordinate(value: &str, min: f64, max: f64) -> Option<f64> {
    let parsed: f64 = value.parse().ok()?;
    if parsed >= min && parsed <= max {
        Some(parsed)
    } else {
        None
    }
}

/// One validated geolocation entry, keyed by its IPv4 address.
///
/// # Invariants
///
/// - `address` is a parsed IPv4 address; `key()` is its 4-byte big-endian
///   form and the persistence key
/// - at most one `GeoRecord` exists per distinct address within a run
/// - `lat ∈ [-90, 90]`, `lng ∈ [-180, 180]`
///
/// Records are immutable once constructed and are dropped after the save
/// phase; nothing retains them beyond the run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoRecord {
    /// IPv4 address, serialized as its dotted-quad string in the blob.
    pub address: Ipv4Addr,

    /// ISO country code; may be empty.
    pub country_code: String,

    /// Country name; may be empty.
    pub country: String,

    /// City name; may be empty.
    pub city: String,

    /// Latitude in [-90, 90].
    pub lat: f64,

    /// Longitude in [-180, 180].
    pub lng: f64,

    /// Opaque passthrough value from the last input column.
    pub mystery_value: String,
}

impl GeoRecord {
    /// The persistence key: the address in 4-byte big-endian form.
    pub fn key(&self) -> [u8; 4] {
        self.address.octets()
    }

    /// Cross-field sufficiency rule.
    ///
    /// A record is insufficient exactly when all three text fields are
    /// empty and either coordinate component is exactly zero. A coordinate
    /// of `(0.0, x)` or `(x, 0.0)` with empty text fields therefore fails
    /// even though it may be a real location; this mirrors the upstream
    /// data contract and must not be "fixed".
    pub fn has_sufficient_data(&self) -> bool {
        !(self.country_code.is_empty()
            && self.country.is_empty()
            && self.city.is_empty()
            && (self.lat == 0.0 || self.lng == 0.0))
    }

    /// Serializes the record into the store value blob.
    pub fn to_blob(&self) -> std::result::Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// Decodes a store value blob back into a record.
    pub fn from_blob(bytes: &[u8]) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(address: &str, lat: &str, lng: &str) -> RawRecord {
        RawRecord {
            address: address.to_string(),
            country_code: "US".to_string(),
            country: "United States".to_string(),
            city: "New York".to_string(),
            lat: lat.to_string(),
            lng: lng.to_string(),
            mystery_value: "346".to_string(),
        }
    }

    fn geo(country_code: &str, country: &str, city: &str, lat: f64, lng: f64) -> GeoRecord {
        GeoRecord {
            address: Ipv4Addr::new(1, 2, 3, 4),
            country_code: country_code.to_string(),
            country: country.to_string(),
            city: city.to_string(),
            lat,
            lng,
            mystery_value: String::new(),
        }
    }

    #[test]
    fn test_from_csv_takes_seven_fields() {
        let record = csv::StringRecord::from(vec![
            "1.2.3.4",
            "US",
            "United States",
            "New York",
            "40.7",
            "-74.0",
            "346",
        ]);

        let raw = RawRecord::from_csv(&record).unwrap();
        assert_eq!(raw.address, "1.2.3.4");
        assert_eq!(raw.country_code, "US");
        assert_eq!(raw.lat, "40.7");
        assert_eq!(raw.mystery_value, "346");
    }

    #[test]
    fn test_from_csv_rejects_short_row() {
        let record = csv::StringRecord::from(vec!["1.2.3.4", "US", "United States", "40.7", "x"]);
        assert!(RawRecord::from_csv(&record).is_none());
    }

    #[test]
    fn test_from_csv_ignores_extra_fields() {
        let record = csv::StringRecord::from(vec![
            "1.2.3.4",
            "US",
            "United States",
            "New York",
            "40.7",
            "-74.0",
            "346",
            "extra",
        ]);

        let raw = RawRecord::from_csv(&record).unwrap();
        assert_eq!(raw.mystery_value, "346");
    }

    #[test]
    fn test_validate_happy_path_normalizes_address() {
        let mut seen = AddressSet::new();
        let record = raw("1.2.3.4", "40.7128", "-74.0060").validate(&mut seen).unwrap();

        assert_eq!(record.address, Ipv4Addr::new(1, 2, 3, 4));
        assert_eq!(record.key(), [1, 2, 3, 4]);
        assert_eq!(record.country_code, "US");
        assert_eq!(record.lat, 40.7128);
        assert_eq!(record.lng, -74.0060);
        assert_eq!(record.mystery_value, "346");
    }

    #[test]
    fn test_validate_rejects_invalid_address() {
        let mut seen = AddressSet::new();
        let result = raw("not-an-ip", "40.7", "-74.0").validate(&mut seen);
        assert_eq!(result.unwrap_err(), RejectionKind::IpParseFailure);
        assert!(seen.is_empty());
    }

    #[test]
    fn test_validate_ip_failure_wins_over_later_failures() {
        let mut seen = AddressSet::new();
        let result = raw("not-an-ip", "900.0", "900.0").validate(&mut seen);
        assert_eq!(result.unwrap_err(), RejectionKind::IpParseFailure);
    }

    #[test]
    fn test_validate_does_not_trim_fields() {
        let mut seen = AddressSet::new();
        let result = raw(" 1.2.3.4", "40.7", "-74.0").validate(&mut seen);
        assert_eq!(result.unwrap_err(), RejectionKind::IpParseFailure);
    }

    #[test]
    fn test_validate_rejects_duplicate_regardless_of_other_fields() {
        let mut seen = AddressSet::new();
        raw("1.2.3.4", "40.7", "-74.0").validate(&mut seen).unwrap();

        let second = RawRecord {
            address: "1.2.3.4".to_string(),
            country_code: "CA".to_string(),
            country: "Canada".to_string(),
            city: "Toronto".to_string(),
            lat: "43.6".to_string(),
            lng: "-79.3".to_string(),
            mystery_value: "different".to_string(),
        };
        assert_eq!(
            second.validate(&mut seen).unwrap_err(),
            RejectionKind::DuplicateAddress
        );
    }

    #[test]
    fn test_validate_marks_address_even_when_lat_check_fails() {
        let mut seen = AddressSet::new();
        let first = raw("1.2.3.4", "not-a-number", "-74.0").validate(&mut seen);
        assert_eq!(first.unwrap_err(), RejectionKind::InvalidLat);

        // The failed row already claimed the address.
        let second = raw("1.2.3.4", "40.7", "-74.0").validate(&mut seen);
        assert_eq!(second.unwrap_err(), RejectionKind::DuplicateAddress);
    }

    #[test]
    fn test_validate_lat_boundaries() {
        let mut seen = AddressSet::new();
        assert!(raw("1.1.1.1", "90.0", "0.5").validate(&mut seen).is_ok());
        assert!(raw("1.1.1.2", "-90.0", "0.5").validate(&mut seen).is_ok());
        assert_eq!(
            raw("1.1.1.3", "90.0001", "0.5").validate(&mut seen).unwrap_err(),
            RejectionKind::InvalidLat
        );
        assert_eq!(
            raw("1.1.1.4", "-90.0001", "0.5").validate(&mut seen).unwrap_err(),
            RejectionKind::InvalidLat
        );
    }

    #[test]
    fn test_validate_lng_boundaries() {
        let mut seen = AddressSet::new();
        assert!(raw("1.1.1.1", "0.5", "180.0").validate(&mut seen).is_ok());
        assert!(raw("1.1.1.2", "0.5", "-180.0").validate(&mut seen).is_ok());
        assert_eq!(
            raw("1.1.1.3", "0.5", "180.0001").validate(&mut seen).unwrap_err(),
            RejectionKind::InvalidLng
        );
        assert_eq!(
            raw("1.1.1.4", "0.5", "-180.0001").validate(&mut seen).unwrap_err(),
            RejectionKind::InvalidLng
        );
    }

    #[test]
    fn test_validate_rejects_non_numeric_coordinates() {
        let mut seen = AddressSet::new();
        assert_eq!(
            raw("1.1.1.1", "abc", "0.5").validate(&mut seen).unwrap_err(),
            RejectionKind::InvalidLat
        );
        assert_eq!(
            raw("1.1.1.2", "0.5", "abc").validate(&mut seen).unwrap_err(),
            RejectionKind::InvalidLng
        );
    }

    #[test]
    fn test_validate_rejects_nan_coordinates() {
        let mut seen = AddressSet::new();
        assert_eq!(
            raw("1.1.1.1", "NaN", "0.5").validate(&mut seen).unwrap_err(),
            RejectionKind::InvalidLat
        );
    }

    #[test]
    fn test_sufficiency_rejects_zero_coordinate_with_empty_text() {
        assert!(!geo("", "", "", 0.0, 45.0).has_sufficient_data());
        assert!(!geo("", "", "", 45.0, 0.0).has_sufficient_data());
        assert!(!geo("", "", "", 0.0, 0.0).has_sufficient_data());
    }

    #[test]
    fn test_sufficiency_accepts_nonzero_coordinates_with_empty_text() {
        assert!(geo("", "", "", 12.0, 45.0).has_sufficient_data());
    }

    #[test]
    fn test_sufficiency_accepts_zero_coordinate_with_any_text_field() {
        assert!(geo("US", "", "", 0.0, 0.0).has_sufficient_data());
        assert!(geo("", "United States", "", 0.0, 0.0).has_sufficient_data());
        assert!(geo("", "", "New York", 0.0, 0.0).has_sufficient_data());
    }

    #[test]
    fn test_sufficiency_is_a_pure_function_of_the_fields() {
        let record = geo("", "", "", 12.0, 45.0);
        assert!(record.has_sufficient_data());
        assert!(record.has_sufficient_data());

        let mut seen = AddressSet::new();
        let first = raw("9.9.9.9", "12.0", "45.0").validate(&mut seen).unwrap();
        let mut fresh = AddressSet::new();
        let again = raw("9.9.9.9", "12.0", "45.0").validate(&mut fresh).unwrap();
        assert_eq!(first, again);
    }

    #[test]
    fn test_blob_round_trip_preserves_all_fields() {
        let record = GeoRecord {
            address: Ipv4Addr::new(200, 106, 141, 15),
            country_code: "SI".to_string(),
            country: "Nepal".to_string(),
            city: "DuBuquemouth".to_string(),
            lat: -84.87503094689836,
            lng: 7.206435933364332,
            mystery_value: "7823011346".to_string(),
        };

        let blob = record.to_blob().unwrap();
        let decoded = GeoRecord::from_blob(&blob).unwrap();
        assert_eq!(decoded, record);
    }

    #[test]
    fn test_blob_contains_address_as_string() {
        let record = geo("US", "United States", "New York", 40.7, -74.0);
        let blob = record.to_blob().unwrap();
        let text = String::from_utf8(blob).unwrap();
        assert!(text.contains("\"1.2.3.4\""));
    }
}
