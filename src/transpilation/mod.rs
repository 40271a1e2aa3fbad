//! SQL transpilation of fitted pipelines.
//!
//! Every fitted component can express itself as dialect-specific SQL. The
//! orchestrator only talks to the `SqlDialectGenerator` trait; the
//! human-readable generator shipped here is what `save` writes into the
//! `SQL/` directory.

pub mod human_readable;
pub mod sql_dialect;

pub use human_readable::HumanReadableSqlGenerator;
pub use sql_dialect::SqlDialectGenerator;
