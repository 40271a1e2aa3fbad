use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::commands::{Fingerprint, FingerprintValue, PreprocessorCommand};
use crate::containers::{Column, DataFrame, Encoding, Role};
use crate::dependency::Fingerprinted;
use crate::helpers::column_description::Marker;
use crate::helpers::{marker, saver, subrole, Format, Subrole};
use crate::preprocessors::preprocessor::{Preprocessor, PreprocessorParams};
use crate::preprocessors::preprocessor_impl::{self, FittedColumn};
use crate::transpilation::SqlDialectGenerator;
use crate::{Int, Result, NULL_INT};

/// Emits `substring(begin, length)` of the configured source columns.
///
/// Applies to text and categorical columns whose unit matches the
/// configured unit. The derived column is dense-encoded and inherits the
/// unit of its source.
#[derive(Debug, Serialize, Deserialize)]
pub struct Substring {
    op: PreprocessorCommand,
    dependencies: Vec<Fingerprint>,
    cols: Vec<FittedColumn>,
}

impl Substring {
    pub fn new(op: PreprocessorCommand, dependencies: Vec<Fingerprint>) -> Self {
        Self {
            op,
            dependencies,
            cols: Vec::new(),
        }
    }

    fn begin(&self) -> usize {
        match &self.op {
            PreprocessorCommand::Substring { begin, .. } => *begin,
            _ => 0,
        }
    }

    fn length(&self) -> usize {
        match &self.op {
            PreprocessorCommand::Substring { length, .. } => *length,
            _ => 0,
        }
    }

    fn unit(&self) -> &str {
        match &self.op {
            PreprocessorCommand::Substring { unit, .. } => unit,
            _ => "",
        }
    }

    fn make_name(&self, source: &str) -> String {
        format!(
            "{}{}, {}, {}{}",
            marker::SUBSTRING_BEGIN,
            source,
            self.begin(),
            self.length(),
            marker::SUBSTRING_END
        )
    }

    fn substring_of(&self, value: &str) -> String {
        value
            .chars()
            .skip(self.begin())
            .take(self.length())
            .collect()
    }

    fn encode_strings<'a>(
        &self,
        values: impl Iterator<Item = Option<&'a str>>,
        categories: &Encoding,
        fitting: bool,
    ) -> Vec<Int> {
        values
            .map(|value| match value {
                Some(s) if !s.is_empty() => {
                    let sub = self.substring_of(s);
                    if sub.is_empty() {
                        NULL_INT
                    } else if fitting {
                        categories.insert(&sub)
                    } else {
                        categories.get(&sub)
                    }
                }
                _ => NULL_INT,
            })
            .collect()
    }

    fn applicable(&self, unit: &str, subroles: &[Subrole]) -> bool {
        const BLACKLIST: [Subrole; 2] = [Subrole::ExcludePreprocessors, Subrole::EmailOnly];
        unit == self.unit() && !subrole::contains_any(subroles, &BLACKLIST)
    }

    /// Derived columns from text sources and from categorical sources,
    /// decoded through the shared categories.
    fn derive_columns(
        &self,
        df: &DataFrame,
        categories: &Encoding,
        fitting: bool,
    ) -> Vec<(String, Column<Int>)> {
        let mut derived = Vec::new();

        for col in df.text_columns() {
            if !self.applicable(col.unit(), col.subroles()) {
                continue;
            }
            let codes =
                self.encode_strings(col.iter().map(|s| Some(s.as_str())), categories, fitting);
            derived.push((
                col.name().to_string(),
                Column::new(self.make_name(col.name()), codes).with_unit(col.unit()),
            ));
        }

        for col in df.categoricals() {
            if !self.applicable(col.unit(), col.subroles()) {
                continue;
            }
            if col.name().contains(marker::SUBSTRING_BEGIN) {
                continue;
            }
            let decoded: Vec<Option<String>> =
                col.iter().map(|&code| categories.str_at(code)).collect();
            let codes = self.encode_strings(
                decoded.iter().map(|s| s.as_deref()),
                categories,
                fitting,
            );
            derived.push((
                col.name().to_string(),
                Column::new(self.make_name(col.name()), codes).with_unit(col.unit()),
            ));
        }

        derived
    }

    fn fit_transform_df(
        &mut self,
        df: &DataFrame,
        marker_kind: Marker,
        table: usize,
        categories: &Encoding,
    ) -> Result<DataFrame> {
        let mut result = df.clone();

        for (source, col) in self.derive_columns(df, categories, true) {
            if preprocessor_impl::has_warnings_int(col.data()) {
                continue;
            }
            preprocessor_impl::add(marker_kind, table, &source, &mut self.cols);
            result.add_int_column(col, Role::Categorical)?;
        }

        Ok(result)
    }

    fn transform_df(
        &self,
        df: &DataFrame,
        marker_kind: Marker,
        table: usize,
        categories: &Encoding,
    ) -> Result<DataFrame> {
        let mut result = df.clone();

        let fitted = preprocessor_impl::retrieve_names(marker_kind, table, &self.cols);

        for (source, col) in self.derive_columns(df, categories, false) {
            if fitted.contains(&source) {
                result.add_int_column(col, Role::Categorical)?;
            }
        }

        Ok(result)
    }
}

impl Fingerprinted for Substring {
    fn fingerprint(&self) -> Fingerprint {
        Fingerprint::new(FingerprintValue::Substring {
            dependencies: self.dependencies.clone(),
            op: self.op.clone(),
        })
    }
}

impl Preprocessor for Substring {
    fn fit_transform(
        &mut self,
        params: &PreprocessorParams<'_>,
    ) -> Result<(DataFrame, Vec<DataFrame>)> {
        let population =
            self.fit_transform_df(params.population_df, Marker::Population, 0, params.categories)?;

        let mut peripherals = Vec::with_capacity(params.peripheral_dfs.len());
        for (i, df) in params.peripheral_dfs.iter().enumerate() {
            peripherals.push(self.fit_transform_df(df, Marker::Peripheral, i, params.categories)?);
        }

        Ok((population, peripherals))
    }

    fn transform(
        &self,
        params: &PreprocessorParams<'_>,
    ) -> Result<(DataFrame, Vec<DataFrame>)> {
        let population =
            self.transform_df(params.population_df, Marker::Population, 0, params.categories)?;

        let mut peripherals = Vec::with_capacity(params.peripheral_dfs.len());
        for (i, df) in params.peripheral_dfs.iter().enumerate() {
            peripherals.push(self.transform_df(df, Marker::Peripheral, i, params.categories)?);
        }

        Ok((population, peripherals))
    }

    fn clone_with_dependencies(&self, dependencies: &[Fingerprint]) -> Box<dyn Preprocessor> {
        Box::new(Self::new(self.op.clone(), dependencies.to_vec()))
    }

    fn save(&self, stem: &Path, format: Format) -> Result<()> {
        saver::save(stem, self, format)
    }

    fn load(&mut self, stem: &Path, format: Format) -> Result<()> {
        let loaded: Substring = saver::load(stem, format)?;
        self.cols = loaded.cols;
        Ok(())
    }

    fn to_sql(&self, _categories: &Encoding, dialect: &dyn SqlDialectGenerator) -> Vec<String> {
        self.cols
            .iter()
            .map(|c| {
                let source = dialect.make_staging_table_column(&c.name, "t1");
                format!(
                    "UPDATE staging SET {} = substr({}, {}, {});",
                    dialect.make_staging_table_column(
                        &format!(
                            "substring( {}, {}, {} )",
                            marker::humanize(&c.name),
                            self.begin(),
                            self.length()
                        ),
                        "t1"
                    ),
                    source,
                    self.begin() + 1,
                    self.length()
                )
            })
            .collect()
    }

    fn type_name(&self) -> &'static str {
        "Substring"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::helpers::Placeholder;
    use crate::logging::ProgressLogger;

    fn command() -> PreprocessorCommand {
        PreprocessorCommand::Substring {
            begin: 0,
            length: 2,
            unit: "zip code".to_string(),
        }
    }

    #[test]
    fn test_substring_of_text_column() {
        let mut population = DataFrame::new("pop");
        population
            .add_string_column(
                Column::new(
                    "zip",
                    vec!["10115".to_string(), "80331".to_string(), "10243".to_string()],
                )
                .with_unit("zip code"),
                Role::Text,
            )
            .unwrap();

        let categories = Encoding::new();
        let placeholder = Placeholder::default();
        let params = PreprocessorParams {
            categories: &categories,
            logger: ProgressLogger::silent(),
            logging_begin: 0,
            logging_end: 100,
            peripheral_dfs: &[],
            peripheral_names: &[],
            placeholder: &placeholder,
            population_df: &population,
        };

        let mut preprocessor = Substring::new(command(), vec![]);
        let (transformed, _) = preprocessor.fit_transform(&params).unwrap();

        assert_eq!(transformed.categoricals().len(), 1);
        let col = &transformed.categoricals()[0];
        assert_eq!(col.unit(), "zip code");
        assert_eq!(categories.str_at(col.data()[0]).unwrap(), "10");
        assert_eq!(col.data()[0], col.data()[2]);
        assert_ne!(col.data()[0], col.data()[1]);
    }

    #[test]
    fn test_unit_mismatch_is_skipped() {
        let mut population = DataFrame::new("pop");
        population
            .add_string_column(
                Column::new("zip", vec!["10115".to_string(), "80331".to_string()]),
                Role::Text,
            )
            .unwrap();

        let categories = Encoding::new();
        let placeholder = Placeholder::default();
        let params = PreprocessorParams {
            categories: &categories,
            logger: ProgressLogger::silent(),
            logging_begin: 0,
            logging_end: 100,
            peripheral_dfs: &[],
            peripheral_names: &[],
            placeholder: &placeholder,
            population_df: &population,
        };

        let mut preprocessor = Substring::new(command(), vec![]);
        let (transformed, _) = preprocessor.fit_transform(&params).unwrap();
        assert!(transformed.categoricals().is_empty());
    }
}
