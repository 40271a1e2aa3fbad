use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::commands::{Fingerprint, FingerprintValue, PreprocessorCommand};
use crate::containers::{Column, DataFrame, Encoding, Role};
use crate::dependency::Fingerprinted;
use crate::helpers::column_description::{ColumnDescription, Marker};
use crate::helpers::{marker, saver, Format, Vocabulary};
use crate::preprocessors::preprocessor::{Preprocessor, PreprocessorParams};
use crate::transpilation::SqlDialectGenerator;
use crate::{Int, Result};

/// Splits text columns into separate token tables.
///
/// Every table carrying text columns gets a synthetic rowid join key; the
/// text columns themselves are renamed with the text-field marker and
/// demoted to unused strings. For each of them a new peripheral data frame
/// `{table}{TEXT_FIELD}{column}` is created holding one row per token,
/// joined back through the rowid.
#[derive(Debug, Serialize, Deserialize)]
pub struct TextFieldSplitter {
    op: PreprocessorCommand,
    dependencies: Vec<Fingerprint>,
    cols: Vec<ColumnDescription>,
}

impl TextFieldSplitter {
    pub fn new(op: PreprocessorCommand, dependencies: Vec<Fingerprint>) -> Self {
        Self {
            op,
            dependencies,
            cols: Vec::new(),
        }
    }

    fn add_rowid(df: &DataFrame) -> Result<DataFrame> {
        if df.has_join_key(marker::ROWID) {
            return Ok(df.clone());
        }
        let rowid: Vec<Int> = (0..df.nrows() as Int).collect();
        let mut result = df.clone();
        result.add_int_column(Column::new(marker::ROWID, rowid), Role::JoinKey)?;
        Ok(result)
    }

    fn remove_text_fields(df: &DataFrame) -> Result<DataFrame> {
        let mut result = df.clone();
        let text_columns: Vec<Column<String>> = df.text_columns().to_vec();
        for col in text_columns {
            let name = col.name().to_string();
            let mut renamed = col;
            renamed.set_name(format!("{}{}", name, marker::TEXT_FIELD));
            result.add_string_column(renamed, Role::UnusedString)?;
            result.remove_column(&name);
        }
        Ok(result)
    }

    fn fit_df(df: &DataFrame, marker_kind: Marker) -> Vec<ColumnDescription> {
        df.text_columns()
            .iter()
            .map(|col| ColumnDescription::new(marker_kind, df.name(), col.name()))
            .collect()
    }

    fn split_column(col: &Column<String>) -> (Vec<Int>, Vec<String>) {
        let mut rownums = Vec::new();
        let mut words = Vec::new();
        for (i, text) in col.iter().enumerate() {
            for token in Vocabulary::split_text_field(text) {
                rownums.push(i as Int);
                words.push(token);
            }
        }
        (rownums, words)
    }

    fn make_new_df(origin: &str, col: &Column<String>) -> Result<DataFrame> {
        let (rownums, words) = Self::split_column(col);
        let mut df = DataFrame::new(format!("{}{}{}", origin, marker::TEXT_FIELD, col.name()));
        df.add_int_column(Column::new("rownum", rownums), Role::JoinKey)?;
        df.add_string_column(Column::new(col.name(), words), Role::Text)?;
        Ok(df)
    }

    /// Appends the token tables derived from `df` to the peripherals.
    fn transform_df(
        &self,
        marker_kind: Marker,
        df: &DataFrame,
        peripherals: &mut Vec<DataFrame>,
    ) -> Result<()> {
        for desc in &self.cols {
            if desc.marker != marker_kind || desc.table != df.name() {
                continue;
            }
            let col = df.text(&desc.name)?;
            peripherals.push(Self::make_new_df(df.name(), col)?);
        }
        Ok(())
    }
}

impl Fingerprinted for TextFieldSplitter {
    fn fingerprint(&self) -> Fingerprint {
        Fingerprint::new(FingerprintValue::TextFieldSplitter {
            dependencies: self.dependencies.clone(),
            op: self.op.clone(),
        })
    }
}

impl Preprocessor for TextFieldSplitter {
    fn fit_transform(
        &mut self,
        params: &PreprocessorParams<'_>,
    ) -> Result<(DataFrame, Vec<DataFrame>)> {
        self.cols = Self::fit_df(params.population_df, Marker::Population);
        for df in params.peripheral_dfs {
            self.cols.extend(Self::fit_df(df, Marker::Peripheral));
        }
        self.transform(params)
    }

    fn transform(
        &self,
        params: &PreprocessorParams<'_>,
    ) -> Result<(DataFrame, Vec<DataFrame>)> {
        let modify = |df: &DataFrame| -> Result<DataFrame> {
            if df.text_columns().is_empty() {
                Ok(df.clone())
            } else {
                Self::remove_text_fields(&Self::add_rowid(df)?)
            }
        };

        let population = modify(params.population_df)?;

        let mut peripherals = Vec::with_capacity(params.peripheral_dfs.len());
        for df in params.peripheral_dfs {
            peripherals.push(modify(df)?);
        }

        self.transform_df(Marker::Population, params.population_df, &mut peripherals)?;
        for df in params.peripheral_dfs {
            self.transform_df(Marker::Peripheral, df, &mut peripherals)?;
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
        let loaded: TextFieldSplitter = saver::load(stem, format)?;
        self.cols = loaded.cols;
        Ok(())
    }

    fn to_sql(&self, _categories: &Encoding, dialect: &dyn SqlDialectGenerator) -> Vec<String> {
        self.cols
            .iter()
            .map(|desc| dialect.split_text_fields(desc))
            .collect()
    }

    fn type_name(&self) -> &'static str {
        "TextFieldSplitter"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::helpers::Placeholder;
    use crate::logging::ProgressLogger;

    #[test]
    fn test_splits_text_into_token_table() {
        let mut peripheral = DataFrame::new("trans");
        peripheral
            .add_string_column(
                Column::new(
                    "comment",
                    vec!["hello world".to_string(), "world again".to_string()],
                ),
                Role::Text,
            )
            .unwrap();

        let population = DataFrame::new("pop");
        let categories = Encoding::new();
        let placeholder = Placeholder::default();
        let names = vec!["trans".to_string()];
        let peripherals = vec![peripheral];

        let params = PreprocessorParams {
            categories: &categories,
            logger: ProgressLogger::silent(),
            logging_begin: 0,
            logging_end: 100,
            peripheral_dfs: &peripherals,
            peripheral_names: &names,
            placeholder: &placeholder,
            population_df: &population,
        };

        let mut splitter = TextFieldSplitter::new(PreprocessorCommand::TextFieldSplitter {}, vec![]);
        let (_, transformed) = splitter.fit_transform(&params).unwrap();

        // The original peripheral plus the token table.
        assert_eq!(transformed.len(), 2);

        let modified = &transformed[0];
        assert!(modified.has_join_key(marker::ROWID));
        assert!(modified.text_columns().is_empty());
        assert_eq!(modified.unused_strings().len(), 1);

        let tokens = &transformed[1];
        assert_eq!(
            tokens.name(),
            format!("trans{}comment", marker::TEXT_FIELD)
        );
        assert_eq!(tokens.nrows(), 4);
        assert_eq!(tokens.join_key("rownum").unwrap().data(), &[0, 0, 1, 1]);
        assert_eq!(
            tokens.text("comment").unwrap().data(),
            &["hello", "world", "world", "again"]
        );
    }

    #[test]
    fn test_tables_without_text_are_untouched() {
        let mut population = DataFrame::new("pop");
        population
            .add_float_column(Column::new("x", vec![1.0]), Role::Numerical)
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

        let mut splitter = TextFieldSplitter::new(PreprocessorCommand::TextFieldSplitter {}, vec![]);
        let (transformed, peripherals) = splitter.fit_transform(&params).unwrap();
        assert!(!transformed.has_join_key(marker::ROWID));
        assert!(peripherals.is_empty());
    }
}
