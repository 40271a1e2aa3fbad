use serde::{Deserialize, Serialize};

use crate::{Float, Int, Result};

/// Column types a connector can report.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Datatype {
    DoublePrecision,
    Integer,
    String,
    Unknown,
}

/// A page of table content, as served to content requests.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TableContent {
    pub draw: i32,
    pub records_total: i32,
    pub records_filtered: i32,
    pub data: Vec<Vec<String>>,
}

/// Streaming access to a result set.
///
/// Iterators advance one field at a time, wrapping rows: after the last
/// column of a row, the next get continues with the first column of the
/// following row. Time stamps are parsed against the connector's configured
/// time-format strings and returned as days since epoch.
pub trait DatabaseIterator {
    fn end(&self) -> bool;
    fn colnames(&self) -> Vec<String>;
    fn get_double(&mut self) -> Result<Float>;
    fn get_int(&mut self) -> Result<Int>;
    fn get_string(&mut self) -> Result<String>;
    fn get_time_stamp(&mut self) -> Result<Float>;
}

/// The narrow contract the staging and read/write commands consume.
pub trait Connector: Send + Sync {
    fn dialect(&self) -> String;

    fn describe(&self) -> String;

    fn execute(&self, sql: &str) -> Result<()>;

    fn drop_table(&self, name: &str) -> Result<()>;

    fn list_tables(&self) -> Result<Vec<String>>;

    fn get_colnames_from_table(&self, name: &str) -> Result<Vec<String>>;

    fn get_coltypes_from_table(&self, name: &str, colnames: &[String]) -> Result<Vec<Datatype>>;

    fn get_colnames_from_query(&self, query: &str) -> Result<Vec<String>>;

    fn get_coltypes_from_query(&self, query: &str, colnames: &[String]) -> Result<Vec<Datatype>>;

    fn get_nrows(&self, name: &str) -> Result<i32>;

    fn get_content(&self, name: &str, draw: i32, start: i32, length: i32) -> Result<TableContent>;

    /// Bulk-ingests the lines produced by `reader` into `table`, skipping
    /// the first `skip` lines.
    fn read(&self, table: &str, skip: usize, reader: &mut dyn crate::database::Reader)
        -> Result<()>;

    fn select(
        &self,
        colnames: &[String],
        table: &str,
        where_clause: &str,
    ) -> Result<Box<dyn DatabaseIterator>>;

    fn select_sql(&self, sql: &str) -> Result<Box<dyn DatabaseIterator>>;
}
