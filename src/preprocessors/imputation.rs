use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::commands::{Fingerprint, FingerprintValue, PreprocessorCommand};
use crate::containers::{Column, DataFrame, Encoding, Role};
use crate::dependency::Fingerprinted;
use crate::helpers::column_description::Marker;
use crate::helpers::{saver, subrole, Format, Subrole};
use crate::preprocessors::preprocessor::{Preprocessor, PreprocessorParams};
use crate::transpilation::SqlDialectGenerator;
use crate::{Float, Result};

/// Replaces missing values in numerical columns by the fit-time mean.
///
/// Only columns that actually contained missing values during fit are
/// touched. When `add_dummies` is set, a 0/1 column marking the imputed
/// rows is appended next to each imputed column.
#[derive(Debug, Serialize, Deserialize)]
pub struct Imputation {
    op: PreprocessorCommand,
    dependencies: Vec<Fingerprint>,
    imputed: Vec<ImputedColumn>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
struct ImputedColumn {
    marker: Marker,
    table: usize,
    name: String,
    mean: Float,
}

fn dummy_name(name: &str) -> String {
    format!("{}__imputation_dummy", name)
}

impl Imputation {
    pub fn new(op: PreprocessorCommand, dependencies: Vec<Fingerprint>) -> Self {
        Self {
            op,
            dependencies,
            imputed: Vec::new(),
        }
    }

    fn add_dummies(&self) -> bool {
        match &self.op {
            PreprocessorCommand::Imputation { add_dummies } => *add_dummies,
            _ => false,
        }
    }

    fn is_applicable(col: &Column<Float>) -> bool {
        const BLACKLIST: [Subrole; 1] = [Subrole::ExcludePreprocessors];
        !subrole::contains_any(col.subroles(), &BLACKLIST)
            && !col.unit().contains("comparison only")
    }

    fn impute(
        &self,
        df: &mut DataFrame,
        source: &Column<Float>,
        mean: Float,
    ) -> Result<()> {
        let mut was_missing = Vec::with_capacity(source.len());
        let data: Vec<Float> = source
            .iter()
            .map(|&v| {
                if v.is_nan() {
                    was_missing.push(1.0);
                    mean
                } else {
                    was_missing.push(0.0);
                    v
                }
            })
            .collect();

        let replacement = Column::new(source.name(), data)
            .with_unit(source.unit())
            .with_subroles(source.subroles().to_vec());

        df.remove_column(source.name());
        df.add_float_column(replacement, Role::Numerical)?;

        if self.add_dummies() {
            df.add_float_column(
                Column::new(dummy_name(source.name()), was_missing),
                Role::Numerical,
            )?;
        }

        Ok(())
    }

    fn fit_transform_df(
        &mut self,
        df: &DataFrame,
        marker_kind: Marker,
        table: usize,
    ) -> Result<DataFrame> {
        let mut result = df.clone();

        for col in df.numericals() {
            if !Self::is_applicable(col) {
                continue;
            }
            if !col.iter().any(|v| v.is_nan()) {
                continue;
            }

            let finite: Vec<Float> = col.iter().copied().filter(|v| v.is_finite()).collect();
            let mean = if finite.is_empty() {
                0.0
            } else {
                finite.iter().sum::<Float>() / finite.len() as Float
            };

            self.imputed.push(ImputedColumn {
                marker: marker_kind,
                table,
                name: col.name().to_string(),
                mean,
            });

            self.impute(&mut result, col, mean)?;
        }

        Ok(result)
    }

    fn transform_df(&self, df: &DataFrame, marker_kind: Marker, table: usize) -> Result<DataFrame> {
        let mut result = df.clone();

        for fitted in &self.imputed {
            if fitted.marker != marker_kind || fitted.table != table {
                continue;
            }
            let col = df.numerical(&fitted.name)?.clone();
            self.impute(&mut result, &col, fitted.mean)?;
        }

        Ok(result)
    }
}

impl Fingerprinted for Imputation {
    fn fingerprint(&self) -> Fingerprint {
        Fingerprint::new(FingerprintValue::Imputation {
            dependencies: self.dependencies.clone(),
            op: self.op.clone(),
        })
    }
}

impl Preprocessor for Imputation {
    fn fit_transform(
        &mut self,
        params: &PreprocessorParams<'_>,
    ) -> Result<(DataFrame, Vec<DataFrame>)> {
        let population = self.fit_transform_df(params.population_df, Marker::Population, 0)?;

        let mut peripherals = Vec::with_capacity(params.peripheral_dfs.len());
        for (i, df) in params.peripheral_dfs.iter().enumerate() {
            peripherals.push(self.fit_transform_df(df, Marker::Peripheral, i)?);
        }

        Ok((population, peripherals))
    }

    fn transform(
        &self,
        params: &PreprocessorParams<'_>,
    ) -> Result<(DataFrame, Vec<DataFrame>)> {
        let population = self.transform_df(params.population_df, Marker::Population, 0)?;

        let mut peripherals = Vec::with_capacity(params.peripheral_dfs.len());
        for (i, df) in params.peripheral_dfs.iter().enumerate() {
            peripherals.push(self.transform_df(df, Marker::Peripheral, i)?);
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
        let loaded: Imputation = saver::load(stem, format)?;
        self.imputed = loaded.imputed;
        Ok(())
    }

    fn to_sql(&self, _categories: &Encoding, dialect: &dyn SqlDialectGenerator) -> Vec<String> {
        self.imputed
            .iter()
            .map(|fitted| {
                let column = dialect.make_staging_table_column(&fitted.name, "t1");
                format!(
                    "UPDATE staging SET {} = {} WHERE {} IS NULL;",
                    column, fitted.mean, column
                )
            })
            .collect()
    }

    fn type_name(&self) -> &'static str {
        "Imputation"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::helpers::Placeholder;
    use crate::logging::ProgressLogger;

    fn run(population: &DataFrame, add_dummies: bool) -> (Imputation, DataFrame) {
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
            population_df: population,
        };
        let mut imputation =
            Imputation::new(PreprocessorCommand::Imputation { add_dummies }, vec![]);
        let (transformed, _) = imputation.fit_transform(&params).unwrap();
        (imputation, transformed)
    }

    #[test]
    fn test_nan_replaced_by_mean() {
        let mut population = DataFrame::new("pop");
        population
            .add_float_column(
                Column::new("x", vec![1.0, Float::NAN, 3.0]),
                Role::Numerical,
            )
            .unwrap();

        let (_, transformed) = run(&population, false);
        let col = transformed.numerical("x").unwrap();
        assert_eq!(col.data(), &[1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_dummy_column_marks_imputed_rows() {
        let mut population = DataFrame::new("pop");
        population
            .add_float_column(
                Column::new("x", vec![1.0, Float::NAN, 3.0]),
                Role::Numerical,
            )
            .unwrap();

        let (_, transformed) = run(&population, true);
        let dummy = transformed.numerical(&dummy_name("x")).unwrap();
        assert_eq!(dummy.data(), &[0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_complete_columns_are_untouched() {
        let mut population = DataFrame::new("pop");
        population
            .add_float_column(Column::new("x", vec![1.0, 2.0]), Role::Numerical)
            .unwrap();

        let (imputation, transformed) = run(&population, true);
        assert!(imputation.imputed.is_empty());
        assert_eq!(transformed.ncols(), 1);
    }
}
