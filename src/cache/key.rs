//! Snapshot keys and their file names

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Suffix of every snapshot file
const SNAPSHOT_EXTENSION: &str = ".json";

/// Which direction of traffic a snapshot holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotKind {
    Arrivals,
    Departures,
}

impl SnapshotKind {
    /// Lowercase name used in file names and API paths
    pub fn as_str(&self) -> &'static str {
        match self {
            SnapshotKind::Arrivals => "arrivals",
            SnapshotKind::Departures => "departures",
        }
    }

    fn from_str(s: &str) -> Option<Self> {
        match s {
            "arrivals" => Some(SnapshotKind::Arrivals),
            "departures" => Some(SnapshotKind::Departures),
            _ => None,
        }
    }
}

impl fmt::Display for SnapshotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error types for building a snapshot key
#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeyError {
    /// Airport code is empty or has characters outside ASCII letters and digits
    #[error("invalid airport code: '{0}'")]
    InvalidAirport(String),

    /// Date is empty or has characters outside ASCII letters, digits and '-'
    #[error("invalid date: '{0}'")]
    InvalidDate(String),
}

/// Checks that an airport code can be part of a snapshot key
pub fn check_airport(airport: &str) -> Result<(), KeyError> {
    if airport.is_empty() || !airport.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(KeyError::InvalidAirport(airport.to_string()));
    }
    Ok(())
}

/// Identifies one cacheable (kind, airport, date) unit
///
/// Equality is exact and case-sensitive on all three fields. The validation in
/// [`SnapshotKey::new`] keeps `_` and path separators out of the airport and date,
/// so every key maps to exactly one file name and back.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SnapshotKey {
    kind: SnapshotKind,
    airport: String,
    date: String,
}

impl SnapshotKey {
    /// Creates a validated key
    ///
    /// # Returns
    /// * `Ok(SnapshotKey)` if both airport and date are well formed
    /// * `Err(KeyError)` naming the first offending field
    pub fn new(
        kind: SnapshotKind,
        airport: impl Into<String>,
        date: impl Into<String>,
    ) -> Result<Self, KeyError> {
        let airport = airport.into();
        let date = date.into();

        check_airport(&airport)?;
        if date.is_empty() || !date.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(KeyError::InvalidDate(date));
        }

        Ok(Self {
            kind,
            airport,
            date,
        })
    }

    /// Shorthand for an arrivals key
    pub fn arrivals(airport: impl Into<String>, date: impl Into<String>) -> Result<Self, KeyError> {
        Self::new(SnapshotKind::Arrivals, airport, date)
    }

    /// Shorthand for a departures key
    pub fn departures(
        airport: impl Into<String>,
        date: impl Into<String>,
    ) -> Result<Self, KeyError> {
        Self::new(SnapshotKind::Departures, airport, date)
    }

    /// Same airport and date, different direction of traffic
    pub fn with_kind(&self, kind: SnapshotKind) -> Self {
        Self {
            kind,
            airport: self.airport.clone(),
            date: self.date.clone(),
        }
    }

    pub fn kind(&self) -> SnapshotKind {
        self.kind
    }

    pub fn airport(&self) -> &str {
        &self.airport
    }

    pub fn date(&self) -> &str {
        &self.date
    }

    /// Returns the snapshot file name, e.g. `arrivals_ARN_2024-05-01.json`
    pub fn file_name(&self) -> String {
        format!(
            "{}_{}_{}{}",
            self.kind, self.airport, self.date, SNAPSHOT_EXTENSION
        )
    }

    /// Parses a file name produced by [`SnapshotKey::file_name`]
    ///
    /// Returns `None` for anything else, including temp files left by an
    /// interrupted write.
    pub fn from_file_name(name: &str) -> Option<Self> {
        let stem = name.strip_suffix(SNAPSHOT_EXTENSION)?;
        let mut parts = stem.splitn(3, '_');
        let kind = SnapshotKind::from_str(parts.next()?)?;
        let airport = parts.next()?;
        let date = parts.next()?;
        Self::new(kind, airport, date).ok()
    }
}

impl fmt::Display for SnapshotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.kind, self.airport, self.date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_name_layout() {
        let key = SnapshotKey::arrivals("ARN", "2024-05-01").unwrap();
        assert_eq!(key.file_name(), "arrivals_ARN_2024-05-01.json");

        let key = SnapshotKey::departures("GOT", "2024-05-02").unwrap();
        assert_eq!(key.file_name(), "departures_GOT_2024-05-02.json");
    }

    #[test]
    fn test_file_name_parses_back() {
        let key = SnapshotKey::departures("MMX", "2024-12-24").unwrap();
        assert_eq!(SnapshotKey::from_file_name(&key.file_name()), Some(key));
    }

    #[test]
    fn test_from_file_name_rejects_foreign_files() {
        assert!(SnapshotKey::from_file_name("arrivals_ARN_2024-05-01.json.tmp").is_none());
        assert!(SnapshotKey::from_file_name("notes.txt").is_none());
        assert!(SnapshotKey::from_file_name("landings_ARN_2024-05-01.json").is_none());
        assert!(SnapshotKey::from_file_name("arrivals_ARN.json").is_none());
        assert!(SnapshotKey::from_file_name("arrivals_ARN_2024_05_01.json").is_none());
    }

    #[test]
    fn test_equality_is_case_sensitive() {
        let upper = SnapshotKey::arrivals("ARN", "2024-05-01").unwrap();
        let lower = SnapshotKey::arrivals("arn", "2024-05-01").unwrap();
        assert_ne!(upper, lower);

        let departures = SnapshotKey::departures("ARN", "2024-05-01").unwrap();
        assert_ne!(upper, departures);
        assert_eq!(upper, SnapshotKey::arrivals("ARN", "2024-05-01").unwrap());
    }

    #[test]
    fn test_invalid_airport() {
        assert_eq!(
            SnapshotKey::arrivals("", "2024-05-01"),
            Err(KeyError::InvalidAirport(String::new()))
        );
        assert!(SnapshotKey::arrivals("A_N", "2024-05-01").is_err());
        assert!(SnapshotKey::arrivals("../etc", "2024-05-01").is_err());
    }

    #[test]
    fn test_invalid_date() {
        assert_eq!(
            SnapshotKey::arrivals("ARN", ""),
            Err(KeyError::InvalidDate(String::new()))
        );
        assert!(SnapshotKey::arrivals("ARN", "2024/05/01").is_err());
        assert!(SnapshotKey::arrivals("ARN", "2024_05_01").is_err());
    }

    #[test]
    fn test_with_kind_keeps_airport_and_date() {
        let arrivals = SnapshotKey::arrivals("ARN", "2024-05-01").unwrap();
        let departures = arrivals.with_kind(SnapshotKind::Departures);
        assert_eq!(departures, SnapshotKey::departures("ARN", "2024-05-01").unwrap());
    }

    #[test]
    fn test_display() {
        let key = SnapshotKey::arrivals("ARN", "2024-05-01").unwrap();
        assert_eq!(key.to_string(), "arrivals/ARN/2024-05-01");
    }
}
