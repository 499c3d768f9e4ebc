//! Plain-text listings for the command line

use std::fmt::Write;

use crate::data::{ArrivalsInfo, DeparturesInfo, Flight};

/// Appends one block per flight
fn write_flights<F: Flight>(
    out: &mut String,
    flights: &[F],
    scheduled_label: &str,
    actual_label: &str,
    counterpart_label: &str,
) {
    for flight in flights {
        let _ = writeln!(out);
        let _ = writeln!(out, "Flight ID: {}", flight.flight_id());
        let _ = writeln!(out, "{}: {}", scheduled_label, flight.scheduled_utc());
        let _ = writeln!(out, "{}: {}", actual_label, flight.actual_utc().unwrap_or("-"));
        let _ = writeln!(out, "{}: {}", counterpart_label, flight.counterpart_airport());
        let _ = writeln!(out, "Airline Operator: {}", flight.airline().name);
    }
}

/// Renders an arrivals set as a listing
pub fn format_arrivals(arrivals: &ArrivalsInfo) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Arrival Airport: {}", arrivals.to.arrival_airport_iata);
    let _ = writeln!(out, "Flight Arrival Date: {}", arrivals.to.flight_arrival_date);
    let _ = writeln!(out, "Number of Flights: {}", arrivals.number_of_flights);
    write_flights(
        &mut out,
        &arrivals.flights,
        "Scheduled Arrival Time",
        "Actual Arrival Time",
        "Departure Airport",
    );
    out
}

/// Renders a departures set as a listing
pub fn format_departures(departures: &DeparturesInfo) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Departure Airport: {}", departures.from.departure_airport_iata);
    let _ = writeln!(out, "Flight Departure Date: {}", departures.from.flight_departure_date);
    let _ = writeln!(out, "Number of Flights: {}", departures.number_of_flights);
    write_flights(
        &mut out,
        &departures.flights,
        "Scheduled Departure Time",
        "Actual Departure Time",
        "Arrival Airport",
    );
    out
}
