//! Trait-shaped contracts for the database connector family.
//!
//! The orchestrator never executes SQL itself; concrete connectors
//! (SQLite, Postgres, ...) live outside the core and implement these
//! traits. The CSV reader is the one concrete implementation shipped here
//! because bulk ingest is needed by the tests and the project manager.

pub mod connector;
pub mod csv_reader;
pub mod reader;

pub use connector::{Connector, DatabaseIterator, Datatype, TableContent};
pub use csv_reader::CsvReader;
pub use reader::Reader;
