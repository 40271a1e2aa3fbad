use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::commands::{Fingerprint, FingerprintValue, PreprocessorCommand};
use crate::containers::{Column, DataFrame, Encoding, Role};
use crate::dependency::Fingerprinted;
use crate::helpers::column_description::Marker;
use crate::helpers::{saver, subrole, Format, Subrole};
use crate::preprocessors::preprocessor::{Preprocessor, PreprocessorParams};
use crate::transpilation::SqlDialectGenerator;
use crate::{Int, Result};

const TRIMMED: &str = "__trimmed";

/// Caps the cardinality of categorical columns.
///
/// During fit, the most frequent categories of every categorical column
/// are recorded, up to `max_num_categories` and subject to `min_freq`.
/// Everything else maps onto a single trimmed bucket.
#[derive(Debug, Serialize, Deserialize)]
pub struct CategoryTrimmer {
    op: PreprocessorCommand,
    dependencies: Vec<Fingerprint>,
    trimmed: Vec<TrimmedColumn>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
struct TrimmedColumn {
    marker: Marker,
    table: usize,
    name: String,
    kept: Vec<Int>,
}

impl CategoryTrimmer {
    pub fn new(op: PreprocessorCommand, dependencies: Vec<Fingerprint>) -> Self {
        Self {
            op,
            dependencies,
            trimmed: Vec::new(),
        }
    }

    fn max_num_categories(&self) -> usize {
        match &self.op {
            PreprocessorCommand::CategoryTrimmer {
                max_num_categories, ..
            } => *max_num_categories,
            _ => usize::MAX,
        }
    }

    fn min_freq(&self) -> usize {
        match &self.op {
            PreprocessorCommand::CategoryTrimmer { min_freq, .. } => *min_freq,
            _ => 0,
        }
    }

    fn kept_categories(&self, column: &[Int]) -> Vec<Int> {
        let mut frequencies: HashMap<Int, usize> = HashMap::new();
        for &code in column {
            if code >= 0 {
                *frequencies.entry(code).or_insert(0) += 1;
            }
        }

        let mut counted: Vec<(Int, usize)> = frequencies
            .into_iter()
            .filter(|(_, freq)| *freq >= self.min_freq())
            .collect();
        counted.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        counted.truncate(self.max_num_categories());

        let mut kept: Vec<Int> = counted.into_iter().map(|(code, _)| code).collect();
        kept.sort_unstable();
        kept
    }

    fn trim(column: &Column<Int>, kept: &[Int], trimmed_code: Int) -> Column<Int> {
        let data: Vec<Int> = column
            .iter()
            .map(|&code| {
                if code < 0 || kept.binary_search(&code).is_ok() {
                    code
                } else {
                    trimmed_code
                }
            })
            .collect();
        Column::new(column.name(), data)
            .with_unit(column.unit())
            .with_subroles(column.subroles().to_vec())
    }

    fn is_applicable(col: &Column<Int>) -> bool {
        const BLACKLIST: [Subrole; 3] = [
            Subrole::ExcludePreprocessors,
            Subrole::EmailOnly,
            Subrole::SubstringOnly,
        ];
        !subrole::contains_any(col.subroles(), &BLACKLIST)
    }

    fn fit_transform_df(
        &mut self,
        df: &DataFrame,
        marker_kind: Marker,
        table: usize,
        categories: &Encoding,
    ) -> Result<DataFrame> {
        let trimmed_code = categories.insert(TRIMMED);
        let mut result = df.clone();

        for col in df.categoricals() {
            if !Self::is_applicable(col) {
                continue;
            }
            let kept = self.kept_categories(col.data());
            let replacement = Self::trim(col, &kept, trimmed_code);
            self.trimmed.push(TrimmedColumn {
                marker: marker_kind,
                table,
                name: col.name().to_string(),
                kept,
            });
            result.remove_column(col.name());
            result.add_int_column(replacement, Role::Categorical)?;
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
        let trimmed_code = categories.get(TRIMMED);
        let mut result = df.clone();

        for fitted in &self.trimmed {
            if fitted.marker != marker_kind || fitted.table != table {
                continue;
            }
            let col = df.categorical(&fitted.name)?;
            let replacement = Self::trim(col, &fitted.kept, trimmed_code);
            result.remove_column(&fitted.name);
            result.add_int_column(replacement, Role::Categorical)?;
        }

        Ok(result)
    }
}

impl Fingerprinted for CategoryTrimmer {
    fn fingerprint(&self) -> Fingerprint {
        Fingerprint::new(FingerprintValue::CategoryTrimmer {
            dependencies: self.dependencies.clone(),
            op: self.op.clone(),
        })
    }
}

impl Preprocessor for CategoryTrimmer {
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
        let loaded: CategoryTrimmer = saver::load(stem, format)?;
        self.trimmed = loaded.trimmed;
        Ok(())
    }

    fn to_sql(&self, categories: &Encoding, dialect: &dyn SqlDialectGenerator) -> Vec<String> {
        self.trimmed
            .iter()
            .map(|fitted| {
                let kept: Vec<String> = fitted
                    .kept
                    .iter()
                    .filter_map(|&code| categories.str_at(code))
                    .map(|s| format!("'{}'", s.replace('\'', "''")))
                    .collect();
                let column = dialect.make_staging_table_column(&fitted.name, "t1");
                format!(
                    "UPDATE staging SET {} = '{}' WHERE {} NOT IN ({});",
                    column,
                    TRIMMED,
                    column,
                    kept.join(", ")
                )
            })
            .collect()
    }

    fn type_name(&self) -> &'static str {
        "CategoryTrimmer"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::helpers::Placeholder;
    use crate::logging::ProgressLogger;

    fn run(
        population: &DataFrame,
        categories: &Encoding,
        max_num_categories: usize,
    ) -> (CategoryTrimmer, DataFrame) {
        let placeholder = Placeholder::default();
        let params = PreprocessorParams {
            categories,
            logger: ProgressLogger::silent(),
            logging_begin: 0,
            logging_end: 100,
            peripheral_dfs: &[],
            peripheral_names: &[],
            placeholder: &placeholder,
            population_df: population,
        };
        let mut trimmer = CategoryTrimmer::new(
            PreprocessorCommand::CategoryTrimmer {
                max_num_categories,
                min_freq: 1,
            },
            vec![],
        );
        let (transformed, _) = trimmer.fit_transform(&params).unwrap();
        (trimmer, transformed)
    }

    #[test]
    fn test_rare_categories_are_trimmed() {
        let categories = Encoding::new();
        let frequent = categories.insert("frequent");
        let rare = categories.insert("rare");

        let mut population = DataFrame::new("pop");
        population
            .add_int_column(
                Column::new("cat", vec![frequent, frequent, frequent, rare]),
                Role::Categorical,
            )
            .unwrap();

        let (_, transformed) = run(&population, &categories, 1);
        let col = transformed.categorical("cat").unwrap();
        let trimmed_code = categories.get(TRIMMED);
        assert_eq!(col.data(), &[frequent, frequent, frequent, trimmed_code]);
    }

    #[test]
    fn test_transform_matches_fit() {
        let categories = Encoding::new();
        let a = categories.insert("a");
        let b = categories.insert("b");

        let mut population = DataFrame::new("pop");
        population
            .add_int_column(Column::new("cat", vec![a, a, b]), Role::Categorical)
            .unwrap();

        let (trimmer, fitted) = run(&population, &categories, 1);

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
        let (transformed, _) = trimmer.transform(&params).unwrap();
        assert_eq!(
            fitted.categorical("cat").unwrap().data(),
            transformed.categorical("cat").unwrap().data()
        );
    }
}
