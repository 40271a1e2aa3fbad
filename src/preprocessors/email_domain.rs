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

/// Extracts the domain from e-mail text columns.
///
/// Applies to text columns subroled `email` or `email only` and not
/// excluded otherwise. The domain is the substring from `@` to the end; a
/// value without `@`, or whose domain carries no `.`, encodes to null. The
/// derived column is dropped when it has fewer than two distinct values.
#[derive(Debug, Serialize, Deserialize)]
pub struct EMailDomain {
    op: PreprocessorCommand,
    dependencies: Vec<Fingerprint>,
    cols: Vec<FittedColumn>,
}

fn extract_domain(value: &str) -> Option<&str> {
    let at = value.find('@')?;
    let domain = &value[at..];
    domain.contains('.').then_some(domain)
}

impl EMailDomain {
    pub fn new(op: PreprocessorCommand, dependencies: Vec<Fingerprint>) -> Self {
        Self {
            op,
            dependencies,
            cols: Vec::new(),
        }
    }

    fn make_column(source: &Column<String>, categories: &Encoding, fitting: bool) -> Column<Int> {
        let codes: Vec<Int> = source
            .iter()
            .map(|value| match extract_domain(value) {
                Some(domain) if fitting => categories.insert(domain),
                Some(domain) => categories.get(domain),
                None => NULL_INT,
            })
            .collect();
        Column::new(
            format!(
                "{}{}{}",
                marker::EMAIL_DOMAIN_BEGIN,
                source.name(),
                marker::EMAIL_DOMAIN_END
            ),
            codes,
        )
        .with_unit("email domain")
    }

    fn is_applicable(col: &Column<String>) -> bool {
        const WHITELIST: [Subrole; 2] = [Subrole::Email, Subrole::EmailOnly];
        const BLACKLIST: [Subrole; 2] = [Subrole::ExcludePreprocessors, Subrole::SubstringOnly];
        subrole::contains_any(col.subroles(), &WHITELIST)
            && !subrole::contains_any(col.subroles(), &BLACKLIST)
    }

    fn fit_transform_df(
        &mut self,
        df: &DataFrame,
        marker_kind: Marker,
        table: usize,
        categories: &Encoding,
    ) -> Result<DataFrame> {
        let mut result = df.clone();

        for col in df.text_columns() {
            if !Self::is_applicable(col) {
                continue;
            }

            let domain_col = Self::make_column(col, categories, true);
            if preprocessor_impl::has_warnings_int(domain_col.data()) {
                continue;
            }

            preprocessor_impl::add(marker_kind, table, col.name(), &mut self.cols);
            result.add_int_column(domain_col, Role::Categorical)?;
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

        for name in preprocessor_impl::retrieve_names(marker_kind, table, &self.cols) {
            // A later text-field splitter may have moved the column to the
            // unused strings.
            let source = match df.text(&name) {
                Ok(col) => col,
                Err(_) => df.unused_string(&name)?,
            };
            result.add_int_column(Self::make_column(source, categories, false), Role::Categorical)?;
        }

        Ok(result)
    }
}

impl Fingerprinted for EMailDomain {
    fn fingerprint(&self) -> Fingerprint {
        Fingerprint::new(FingerprintValue::EMailDomain {
            dependencies: self.dependencies.clone(),
            op: self.op.clone(),
        })
    }
}

impl Preprocessor for EMailDomain {
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
        let loaded: EMailDomain = saver::load(stem, format)?;
        self.cols = loaded.cols;
        Ok(())
    }

    fn to_sql(&self, _categories: &Encoding, dialect: &dyn SqlDialectGenerator) -> Vec<String> {
        self.cols
            .iter()
            .map(|c| {
                let source = dialect.make_staging_table_column(&c.name, "t1");
                format!(
                    "UPDATE staging SET {} = substr({}, instr({}, '@'));",
                    dialect.make_staging_table_column(
                        &format!("email_domain( {} )", marker::humanize(&c.name)),
                        "t1"
                    ),
                    source,
                    source
                )
            })
            .collect()
    }

    fn type_name(&self) -> &'static str {
        "EMailDomain"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::helpers::Placeholder;
    use crate::logging::ProgressLogger;

    fn email_column() -> Column<String> {
        Column::new(
            "email",
            vec![
                "alice@example.com".to_string(),
                "bob@other.org".to_string(),
                "invalid".to_string(),
            ],
        )
        .with_subroles(vec![Subrole::Email])
    }

    fn run(population: &DataFrame, categories: &Encoding) -> (EMailDomain, DataFrame) {
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
        let mut preprocessor = EMailDomain::new(PreprocessorCommand::EMailDomain {}, vec![]);
        let (transformed, _) = preprocessor.fit_transform(&params).unwrap();
        (preprocessor, transformed)
    }

    #[test]
    fn test_extracts_domains() {
        let mut population = DataFrame::new("pop");
        population
            .add_string_column(email_column(), Role::Text)
            .unwrap();

        let categories = Encoding::new();
        let (_, transformed) = run(&population, &categories);

        assert_eq!(transformed.categoricals().len(), 1);
        let col = &transformed.categoricals()[0];
        assert_eq!(col.unit(), "email domain");
        assert_eq!(col.data()[2], NULL_INT);
        assert_eq!(categories.str_at(col.data()[0]).unwrap(), "@example.com");
    }

    #[test]
    fn test_unsubroled_columns_are_skipped() {
        let mut population = DataFrame::new("pop");
        population
            .add_string_column(
                Column::new("email", vec!["a@b.com".to_string(), "c@d.com".to_string()]),
                Role::Text,
            )
            .unwrap();

        let categories = Encoding::new();
        let (_, transformed) = run(&population, &categories);
        assert!(transformed.categoricals().is_empty());
    }

    #[test]
    fn test_single_domain_is_dropped() {
        let mut population = DataFrame::new("pop");
        population
            .add_string_column(
                Column::new(
                    "email",
                    vec!["a@same.com".to_string(), "b@same.com".to_string()],
                )
                .with_subroles(vec![Subrole::Email]),
                Role::Text,
            )
            .unwrap();

        let categories = Encoding::new();
        let (_, transformed) = run(&population, &categories);
        assert!(transformed.categoricals().is_empty());
    }
}
