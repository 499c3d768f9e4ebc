//! sviago library
//!
//! Fetches airport arrival and departure sets from the Swedavia flight info API,
//! keeps each (kind, airport, date) set as a JSON snapshot on disk, and serves
//! sorted flight lists and hourly arrival histograms over HTTP. The modules are
//! exposed here for the binary and for integration tests.

pub mod aggregate;
pub mod cache;
pub mod cli;
pub mod data;
pub mod report;
pub mod server;
