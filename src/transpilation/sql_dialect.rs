use crate::helpers::{ColumnDescription, Schema};

/// Prints pipeline structure as SQL in one particular dialect.
///
/// A pipeline transpiles to: staging statements, preprocessor statements,
/// one CREATE TABLE per feature, and a final SELECT joining everything.
pub trait SqlDialectGenerator: Send + Sync {
    fn drop_table_if_exists(&self, name: &str) -> String;

    /// Opening quote character for identifiers.
    fn quotechar1(&self) -> char;

    /// Closing quote character for identifiers.
    fn quotechar2(&self) -> char;

    /// The name of the staging table for a staged table name.
    fn make_staging_table_name(&self, name: &str) -> String;

    /// The staging statements. Every staged table appears exactly once.
    fn make_staging_tables(
        &self,
        population_needs_targets: bool,
        peripheral_needs_targets: &[bool],
        population_schema: &Schema,
        peripheral_schemata: &[Schema],
    ) -> Vec<String>;

    /// The final statement joining the feature tables and the manual
    /// columns onto the staged population.
    fn make_sql(
        &self,
        table_name: &str,
        autofeature_names: &[String],
        components: &[String],
        targets: &[String],
        categorical_colnames: &[String],
        numerical_colnames: &[String],
    ) -> String;

    /// The statement splitting one text field into its token table.
    fn split_text_fields(&self, desc: &ColumnDescription) -> String;

    /// A staged column reference, markers resolved to their human-readable
    /// form and qualified with `alias` when the column is not carried from
    /// an inlined table.
    fn make_staging_table_column(&self, colname: &str, alias: &str) -> String;
}
