//! Core data models for sviago
//!
//! This module contains the flight records and per-airport, per-day sets returned
//! by the Swedavia flight info API, together with the client used to fetch them.
//! Field names follow the upstream JSON document so that a snapshot on disk is the
//! exact serialized form of what the API returned.

pub mod client;

pub use client::{ClientConfig, FlightSource, SourceError, SwedaviaClient};

use serde::{Deserialize, Serialize};

use crate::cache::SnapshotKind;

/// Operating airline of a flight
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Airline {
    /// IATA airline code (e.g. "SK")
    pub iata: String,
    /// ICAO airline code (e.g. "SAS")
    pub icao: String,
    /// Display name
    pub name: String,
}

/// Arrival times, all UTC in `YYYY-MM-DDTHH:MM:SSZ` form
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArrivalTime {
    pub scheduled_utc: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_utc: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_utc: Option<String>,
}

/// Departure times, all UTC in `YYYY-MM-DDTHH:MM:SSZ` form
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartureTime {
    pub scheduled_utc: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_utc: Option<String>,
}

/// Terminal, gate and status of a flight leg
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LocationAndStatus {
    pub terminal: String,
    pub gate: String,
    pub flight_leg_status: String,
    pub flight_leg_status_swedish: String,
    pub flight_leg_status_english: String,
}

/// Baggage claim information for an arrival
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Baggage {
    pub estimated_first_bag_utc: String,
    pub baggage_claim_unit: String,
    pub first_bag_utc: String,
    pub last_bag_utc: String,
}

/// Air traffic identifiers for a single flight leg
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FlightLegIdentifier {
    pub ifpl_id: String,
    pub callsign: String,
    pub aircraft_registration: String,
    pub ssr_code: String,
    pub flight_id: String,
    pub flight_departure_date_utc: String,
    pub departure_airport_iata: String,
    pub arrival_airport_iata: String,
    pub departure_airport_icao: String,
    pub arrival_airport_icao: String,
    pub di_indicator: String,
}

/// Free-text remark attached to a flight
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Remark {
    pub text: String,
    pub indicator: String,
}

/// Intermediate stop on the way to the destination
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViaDestination {
    #[serde(rename = "airportIATA")]
    pub airport_iata: String,
    #[serde(rename = "airportSwedish")]
    pub airport_swedish: String,
    #[serde(rename = "airportEnglish")]
    pub airport_english: String,
}

/// A single arriving flight
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArrivalFlight {
    pub flight_id: String,
    #[serde(default)]
    pub departure_airport_swedish: String,
    #[serde(default)]
    pub departure_airport_english: String,
    #[serde(default)]
    pub airline_operator: Airline,
    pub arrival_time: ArrivalTime,
    #[serde(default)]
    pub location_and_status: LocationAndStatus,
    #[serde(default)]
    pub baggage: Baggage,
    #[serde(default)]
    pub code_share_data: Vec<String>,
    #[serde(default)]
    pub flight_leg_identifier: FlightLegIdentifier,
    #[serde(default)]
    pub remarks_english: Vec<Remark>,
    #[serde(default)]
    pub remarks_swedish: Vec<Remark>,
    #[serde(default)]
    pub via_destinations: Vec<ViaDestination>,
}

/// A single departing flight
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartureFlight {
    pub flight_id: String,
    pub departure_time: DepartureTime,
    #[serde(default)]
    pub arrival_airport_english: String,
    #[serde(default)]
    pub airline_operator: Airline,
}

/// The airport and date an arrivals set belongs to
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ArrivalAirport {
    pub arrival_airport_iata: String,
    pub arrival_airport_icao: String,
    pub arrival_airport_swedish: String,
    pub arrival_airport_english: String,
    pub flight_arrival_date: String,
}

/// The airport and date a departures set belongs to
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DepartureAirport {
    pub departure_airport_iata: String,
    pub flight_departure_date: String,
}

/// All arrivals at one airport on one day
///
/// `number_of_flights` is the count reported by the API and is not checked
/// against `flights.len()`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArrivalsInfo {
    pub to: ArrivalAirport,
    #[serde(default)]
    pub number_of_flights: u32,
    #[serde(default)]
    pub flights: Vec<ArrivalFlight>,
}

/// All departures from one airport on one day
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeparturesInfo {
    pub from: DepartureAirport,
    #[serde(default)]
    pub number_of_flights: u32,
    #[serde(default)]
    pub flights: Vec<DepartureFlight>,
}

/// Common view over arriving and departing flights
pub trait Flight {
    /// Flight number as shown to passengers (e.g. "SK1420")
    fn flight_id(&self) -> &str;
    /// Scheduled time of the movement at this airport
    fn scheduled_utc(&self) -> &str;
    /// Actual time of the movement, `None` if it has not happened yet
    fn actual_utc(&self) -> Option<&str>;
    /// Name of the airport at the other end of the flight
    fn counterpart_airport(&self) -> &str;
    fn airline(&self) -> &Airline;
}

/// Treats an empty timestamp the same as a missing one
fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

impl Flight for ArrivalFlight {
    fn flight_id(&self) -> &str {
        &self.flight_id
    }

    fn scheduled_utc(&self) -> &str {
        &self.arrival_time.scheduled_utc
    }

    fn actual_utc(&self) -> Option<&str> {
        non_empty(&self.arrival_time.actual_utc)
    }

    fn counterpart_airport(&self) -> &str {
        &self.departure_airport_english
    }

    fn airline(&self) -> &Airline {
        &self.airline_operator
    }
}

impl Flight for DepartureFlight {
    fn flight_id(&self) -> &str {
        &self.flight_id
    }

    fn scheduled_utc(&self) -> &str {
        &self.departure_time.scheduled_utc
    }

    fn actual_utc(&self) -> Option<&str> {
        non_empty(&self.departure_time.actual_utc)
    }

    fn counterpart_airport(&self) -> &str {
        &self.arrival_airport_english
    }

    fn airline(&self) -> &Airline {
        &self.airline_operator
    }
}

/// Either kind of per-airport, per-day flight set
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AirportDaySet {
    Arrivals(ArrivalsInfo),
    Departures(DeparturesInfo),
}

impl AirportDaySet {
    /// Which kind of snapshot this set is stored as
    pub fn kind(&self) -> SnapshotKind {
        match self {
            AirportDaySet::Arrivals(_) => SnapshotKind::Arrivals,
            AirportDaySet::Departures(_) => SnapshotKind::Departures,
        }
    }

    /// Flight count as reported by the API
    pub fn declared_count(&self) -> u32 {
        match self {
            AirportDaySet::Arrivals(a) => a.number_of_flights,
            AirportDaySet::Departures(d) => d.number_of_flights,
        }
    }

    /// Number of flight records actually present
    pub fn flight_count(&self) -> usize {
        match self {
            AirportDaySet::Arrivals(a) => a.flights.len(),
            AirportDaySet::Departures(d) => d.flights.len(),
        }
    }

    /// Serializes the inner set exactly as the API shaped it
    pub fn to_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        match self {
            AirportDaySet::Arrivals(a) => serde_json::to_vec(a),
            AirportDaySet::Departures(d) => serde_json::to_vec(d),
        }
    }

    /// Parses a stored snapshot of the given kind
    pub fn from_json(kind: SnapshotKind, bytes: &[u8]) -> Result<Self, serde_json::Error> {
        match kind {
            SnapshotKind::Arrivals => serde_json::from_slice(bytes).map(AirportDaySet::Arrivals),
            SnapshotKind::Departures => {
                serde_json::from_slice(bytes).map(AirportDaySet::Departures)
            }
        }
    }
}
