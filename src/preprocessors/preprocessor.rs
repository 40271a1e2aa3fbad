use std::path::Path;

use crate::commands::{Fingerprint, PreprocessorCommand};
use crate::containers::{DataFrame, Encoding};
use crate::dependency::Fingerprinted;
use crate::helpers::{Format, Placeholder};
use crate::logging::ProgressLogger;
use crate::preprocessors::{
    CategoryTrimmer, EMailDomain, Imputation, Seasonal, Substring, TextFieldSplitter,
};
use crate::transpilation::SqlDialectGenerator;
use crate::Result;

/// Type name of mapping-style preprocessors, which are stable-partitioned
/// to the end of the list before fitting.
pub const MAPPING: &str = "Mapping";

/// Parameters shared by fit_transform and transform.
pub struct PreprocessorParams<'a> {
    pub categories: &'a Encoding,
    pub logger: ProgressLogger,
    pub logging_begin: usize,
    pub logging_end: usize,
    pub peripheral_dfs: &'a [DataFrame],
    pub peripheral_names: &'a [String],
    pub placeholder: &'a Placeholder,
    pub population_df: &'a DataFrame,
}

/// The capability set of a preprocessor.
///
/// A preprocessor is created from its command, fitted exactly once and
/// immutable afterwards. `transform` must add exactly the columns recorded
/// during fit, in the same order.
pub trait Preprocessor: Fingerprinted + Send + Sync {
    /// Fits on the given tables and returns the transformed versions.
    fn fit_transform(
        &mut self,
        params: &PreprocessorParams<'_>,
    ) -> Result<(DataFrame, Vec<DataFrame>)>;

    /// Applies the fitted state to new tables.
    fn transform(&self, params: &PreprocessorParams<'_>)
        -> Result<(DataFrame, Vec<DataFrame>)>;

    /// A fresh, unfitted copy carrying a new dependency list.
    fn clone_with_dependencies(&self, dependencies: &[Fingerprint]) -> Box<dyn Preprocessor>;

    fn save(&self, stem: &Path, format: Format) -> Result<()>;

    fn load(&mut self, stem: &Path, format: Format) -> Result<()>;

    /// Expresses the fitted state as SQL statements.
    fn to_sql(&self, categories: &Encoding, dialect: &dyn SqlDialectGenerator) -> Vec<String>;

    fn type_name(&self) -> &'static str;
}

/// Creates a preprocessor from its command.
pub fn parse(
    command: &PreprocessorCommand,
    dependencies: &[Fingerprint],
) -> Box<dyn Preprocessor> {
    match command {
        PreprocessorCommand::CategoryTrimmer { .. } => {
            Box::new(CategoryTrimmer::new(command.clone(), dependencies.to_vec()))
        }
        PreprocessorCommand::EMailDomain {} => {
            Box::new(EMailDomain::new(command.clone(), dependencies.to_vec()))
        }
        PreprocessorCommand::Imputation { .. } => {
            Box::new(Imputation::new(command.clone(), dependencies.to_vec()))
        }
        PreprocessorCommand::Seasonal {} => {
            Box::new(Seasonal::new(command.clone(), dependencies.to_vec()))
        }
        PreprocessorCommand::Substring { .. } => {
            Box::new(Substring::new(command.clone(), dependencies.to_vec()))
        }
        PreprocessorCommand::TextFieldSplitter {} => {
            Box::new(TextFieldSplitter::new(command.clone(), dependencies.to_vec()))
        }
    }
}
