//! Derived views over resolved flight sets
//!
//! Provides the hour-of-day arrival histogram and the by-airline ordering used
//! when serving a single day's flights.

use chrono::{NaiveDateTime, Timelike};
use serde::ser::{Serialize, SerializeMap, Serializer};
use thiserror::Error;

use crate::data::{AirportDaySet, ArrivalsInfo, Flight};

/// Format of every UTC timestamp in the API, e.g. `2024-05-01T06:30:00Z`
pub const UTC_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Number of buckets in an hour-of-day histogram
pub const HOURS_PER_DAY: usize = 24;

/// Errors that can occur while aggregating flight sets
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AggregateError {
    /// A scheduled time did not match `YYYY-MM-DDTHH:MM:SSZ`
    #[error("invalid scheduled time '{value}' on flight {flight_id}")]
    TimestampParse { flight_id: String, value: String },
}

/// Flight counts per UTC hour of day
///
/// All 24 buckets exist from construction on, starting at zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HourHistogram {
    counts: [u64; HOURS_PER_DAY],
}

impl HourHistogram {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count for `hour`, zero for hours outside 0..24
    pub fn get(&self, hour: u32) -> u64 {
        self.counts.get(hour as usize).copied().unwrap_or(0)
    }

    /// Sum over all buckets
    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    /// Iterates `(hour, count)` pairs from hour 0 to 23
    pub fn iter(&self) -> impl Iterator<Item = (u32, u64)> + '_ {
        self.counts
            .iter()
            .enumerate()
            .map(|(hour, count)| (hour as u32, *count))
    }

    fn increment(&mut self, hour: u32) {
        self.counts[hour as usize] += 1;
    }
}

impl Serialize for HourHistogram {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(HOURS_PER_DAY))?;
        for (hour, count) in self.iter() {
            map.serialize_entry(&hour.to_string(), &count)?;
        }
        map.end()
    }
}

/// Fixed separator positions in `YYYY-MM-DDTHH:MM:SSZ`
const TIMESTAMP_SEPARATORS: [(usize, u8); 6] = [
    (4, b'-'),
    (7, b'-'),
    (10, b'T'),
    (13, b':'),
    (16, b':'),
    (19, b'Z'),
];

/// Exact 20-byte, zero-padded layout with seconds below 60
///
/// chrono alone accepts unpadded fields, leading whitespace, a signed year and
/// leap second 60, none of which the API ever sends.
fn is_canonical_timestamp(value: &str) -> bool {
    let bytes = value.as_bytes();
    bytes.len() == 20
        && bytes.iter().enumerate().all(|(i, b)| {
            match TIMESTAMP_SEPARATORS.iter().find(|(at, _)| *at == i) {
                Some((_, separator)) => b == separator,
                None => b.is_ascii_digit(),
            }
        })
        && bytes[17] <= b'5'
}

/// Extracts the UTC hour from an API timestamp
fn parse_hour(flight: &impl Flight) -> Result<u32, AggregateError> {
    let value = flight.scheduled_utc();
    let invalid = || AggregateError::TimestampParse {
        flight_id: flight.flight_id().to_string(),
        value: value.to_string(),
    };

    if !is_canonical_timestamp(value) {
        return Err(invalid());
    }
    NaiveDateTime::parse_from_str(value, UTC_TIMESTAMP_FORMAT)
        .map(|t| t.hour())
        .map_err(|_| invalid())
}

/// Counts scheduled arrivals per UTC hour across all given sets
///
/// # Returns
/// * `Ok(HourHistogram)` with all 24 buckets, zero when `sets` is empty
/// * `Err(AggregateError::TimestampParse)` on the first unparsable scheduled
///   time; no partial histogram is returned
pub fn hourly_distribution<'a, I>(sets: I) -> Result<HourHistogram, AggregateError>
where
    I: IntoIterator<Item = &'a ArrivalsInfo>,
{
    let mut histogram = HourHistogram::new();
    for set in sets {
        for flight in &set.flights {
            histogram.increment(parse_hour(flight)?);
        }
    }
    Ok(histogram)
}

/// Stable sort by airline display name, byte-wise ascending
///
/// Flights of the same airline keep the order the API returned them in.
pub fn sort_flights_by_airline<F: Flight>(flights: &mut [F]) {
    flights.sort_by(|a, b| a.airline().name.cmp(&b.airline().name));
}

/// Reorders the flights of a set by airline, see [`sort_flights_by_airline`]
pub fn sort_by_airline(set: &mut AirportDaySet) {
    match set {
        AirportDaySet::Arrivals(arrivals) => sort_flights_by_airline(&mut arrivals.flights),
        AirportDaySet::Departures(departures) => sort_flights_by_airline(&mut departures.flights),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::fixtures::{arrival, arrivals, departure, departures};

    #[test]
    fn test_empty_input_has_all_buckets_at_zero() {
        let histogram = hourly_distribution(std::iter::empty()).unwrap();

        assert_eq!(histogram.iter().count(), 24);
        assert!(histogram.iter().all(|(_, count)| count == 0));
        assert_eq!(histogram.total(), 0);
    }

    #[test]
    fn test_same_hour_lands_in_one_bucket() {
        let set = arrivals(
            "ARN",
            "2024-05-01",
            vec![
                arrival("SK1", "SAS", "2024-05-01T06:30:00Z"),
                arrival("SK2", "SAS", "2024-05-01T06:45:00Z"),
            ],
        );

        let histogram = hourly_distribution([&set]).unwrap();

        assert_eq!(histogram.get(6), 2);
        for hour in (0..24).filter(|h| *h != 6) {
            assert_eq!(histogram.get(hour), 0, "hour {hour} should be empty");
        }
    }

    #[test]
    fn test_counts_accumulate_across_sets() {
        let day1 = arrivals(
            "ARN",
            "2024-05-01",
            vec![
                arrival("SK1", "SAS", "2024-05-01T00:05:00Z"),
                arrival("SK2", "SAS", "2024-05-01T23:59:59Z"),
            ],
        );
        let day2 = arrivals(
            "ARN",
            "2024-05-02",
            vec![arrival("KL1", "KLM", "2024-05-02T23:00:00Z")],
        );

        let histogram = hourly_distribution(vec![&day1, &day2]).unwrap();

        assert_eq!(histogram.get(0), 1);
        assert_eq!(histogram.get(23), 2);
        assert_eq!(histogram.total(), 3);
    }

    #[test]
    fn test_one_bad_timestamp_fails_whole_aggregation() {
        let set = arrivals(
            "ARN",
            "2024-05-01",
            vec![
                arrival("SK1", "SAS", "2024-05-01T06:30:00Z"),
                arrival("XX9", "Bad", "2024-05-01 06:30"),
            ],
        );

        let result = hourly_distribution([&set]);

        assert_eq!(
            result,
            Err(AggregateError::TimestampParse {
                flight_id: "XX9".to_string(),
                value: "2024-05-01 06:30".to_string(),
            })
        );
    }

    #[test]
    fn test_timestamp_without_zulu_suffix_is_rejected() {
        let set = arrivals(
            "ARN",
            "2024-05-01",
            vec![arrival("SK1", "SAS", "2024-05-01T06:30:00")],
        );
        assert!(hourly_distribution([&set]).is_err());
    }

    #[test]
    fn test_non_canonical_timestamps_are_rejected() {
        let inputs = [
            "2024-5-1T6:30:00Z",
            " 2024-05-01T06:30:00Z",
            "2024-05-01T06:30:00Z ",
            "+2024-05-01T06:30:00Z",
            "2024-05-01T06:59:60Z",
            "2024-05-01t06:30:00Z",
            "2024-05-01T06:30:00.000Z",
            "2024-02-30T06:30:00Z",
        ];

        for value in inputs {
            let set = arrivals("ARN", "2024-05-01", vec![arrival("SK1", "SAS", value)]);
            assert_eq!(
                hourly_distribution([&set]),
                Err(AggregateError::TimestampParse {
                    flight_id: "SK1".to_string(),
                    value: value.to_string(),
                }),
                "'{value}' should be rejected"
            );
        }
    }

    #[test]
    fn test_last_second_of_hour_is_accepted() {
        let set = arrivals(
            "ARN",
            "2024-05-01",
            vec![arrival("SK1", "SAS", "2024-05-01T06:59:59Z")],
        );
        assert_eq!(hourly_distribution([&set]).unwrap().get(6), 1);
    }

    #[test]
    fn test_sort_by_airline_is_stable() {
        let mut set = AirportDaySet::Arrivals(arrivals(
            "ARN",
            "2024-05-01",
            vec![
                arrival("SK1", "SAS", "2024-05-01T06:00:00Z"),
                arrival("KL1", "KLM", "2024-05-01T07:00:00Z"),
                arrival("SK2", "SAS", "2024-05-01T08:00:00Z"),
            ],
        ));

        sort_by_airline(&mut set);

        let AirportDaySet::Arrivals(sorted) = set else {
            panic!("kind should not change");
        };
        let airlines: Vec<_> = sorted.flights.iter().map(|f| f.airline().name.as_str()).collect();
        let ids: Vec<_> = sorted.flights.iter().map(|f| f.flight_id.as_str()).collect();
        assert_eq!(airlines, ["KLM", "SAS", "SAS"]);
        assert_eq!(ids, ["KL1", "SK1", "SK2"]);
    }

    #[test]
    fn test_sort_is_case_sensitive_bytewise() {
        let mut flights = vec![
            departure("1", "norwegian", "2024-05-01T06:00:00Z"),
            departure("2", "SAS", "2024-05-01T06:00:00Z"),
            departure("3", "Norwegian", "2024-05-01T06:00:00Z"),
        ];

        sort_flights_by_airline(&mut flights);

        let airlines: Vec<_> = flights.iter().map(|f| f.airline().name.as_str()).collect();
        assert_eq!(airlines, ["Norwegian", "SAS", "norwegian"]);
    }

    #[test]
    fn test_sort_departures_set() {
        let mut set = AirportDaySet::Departures(departures(
            "GOT",
            "2024-05-01",
            vec![
                departure("DY1", "Norwegian", "2024-05-01T06:00:00Z"),
                departure("AY1", "Finnair", "2024-05-01T07:00:00Z"),
            ],
        ));

        sort_by_airline(&mut set);

        let AirportDaySet::Departures(sorted) = set else {
            panic!("kind should not change");
        };
        assert_eq!(sorted.flights[0].flight_id, "AY1");
    }

    #[test]
    fn test_histogram_serializes_as_hour_map() {
        let set = arrivals(
            "ARN",
            "2024-05-01",
            vec![arrival("SK1", "SAS", "2024-05-01T06:30:00Z")],
        );
        let histogram = hourly_distribution([&set]).unwrap();

        let json = serde_json::to_value(histogram).unwrap();
        let map = json.as_object().expect("Should be an object");

        assert_eq!(map.len(), 24);
        assert_eq!(map["6"], 1);
        assert_eq!(map["0"], 0);
        assert_eq!(map["23"], 0);
    }

    #[test]
    fn test_get_out_of_range_hour_is_zero() {
        assert_eq!(HourHistogram::new().get(24), 0);
    }
}
