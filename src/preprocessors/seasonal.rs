use std::path::Path;

use chrono::{DateTime, Datelike, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::commands::{Fingerprint, FingerprintValue, PreprocessorCommand};
use crate::containers::{Column, DataFrame, Encoding, Role};
use crate::dependency::Fingerprinted;
use crate::helpers::column_description::Marker;
use crate::helpers::{marker, saver, Format, Subrole};
use crate::preprocessors::preprocessor::{Preprocessor, PreprocessorParams};
use crate::preprocessors::preprocessor_impl::{self, FittedColumn};
use crate::transpilation::SqlDialectGenerator;
use crate::{Float, Int, Result, NULL_INT};

const SECONDS_PER_DAY: Float = 86400.0;

/// Derives seasonal components from the time-stamp columns.
///
/// For every time stamp that is not itself generated and not excluded via
/// subroles, up to five columns are emitted: hour, minute, month and
/// weekday as categoricals, the year as a comparison-only numerical. A
/// component is only kept if it takes at least two distinct values.
#[derive(Debug, Serialize, Deserialize)]
pub struct Seasonal {
    op: PreprocessorCommand,
    dependencies: Vec<Fingerprint>,
    hour: Vec<FittedColumn>,
    minute: Vec<FittedColumn>,
    month: Vec<FittedColumn>,
    weekday: Vec<FittedColumn>,
    year: Vec<FittedColumn>,
}

fn to_datetime(days_since_epoch: Float) -> Option<DateTime<Utc>> {
    if !days_since_epoch.is_finite() {
        return None;
    }
    let seconds = (days_since_epoch * SECONDS_PER_DAY).floor() as i64;
    DateTime::from_timestamp(seconds, 0)
}

fn pad_two(value: u32) -> String {
    format!("{:02}", value)
}

fn hour_str(ts: Float) -> Option<String> {
    to_datetime(ts).map(|dt| pad_two(dt.hour()))
}

fn minute_str(ts: Float) -> Option<String> {
    to_datetime(ts).map(|dt| pad_two(dt.minute()))
}

fn month_str(ts: Float) -> Option<String> {
    to_datetime(ts).map(|dt| pad_two(dt.month()))
}

fn weekday_str(ts: Float) -> Option<String> {
    to_datetime(ts).map(|dt| dt.weekday().num_days_from_monday().to_string())
}

fn year_value(ts: Float) -> Float {
    to_datetime(ts)
        .map(|dt| dt.year() as Float)
        .unwrap_or(Float::NAN)
}

struct Component {
    begin: &'static str,
    end: &'static str,
    unit: &'static str,
    extract: fn(Float) -> Option<String>,
}

const COMPONENTS: [Component; 4] = [
    Component {
        begin: marker::HOUR_BEGIN,
        end: marker::HOUR_END,
        unit: "hour",
        extract: hour_str,
    },
    Component {
        begin: marker::MINUTE_BEGIN,
        end: marker::MINUTE_END,
        unit: "minute",
        extract: minute_str,
    },
    Component {
        begin: marker::MONTH_BEGIN,
        end: marker::MONTH_END,
        unit: "month",
        extract: month_str,
    },
    Component {
        begin: marker::WEEKDAY_BEGIN,
        end: marker::WEEKDAY_END,
        unit: "weekday",
        extract: weekday_str,
    },
];

impl Seasonal {
    pub fn new(op: PreprocessorCommand, dependencies: Vec<Fingerprint>) -> Self {
        Self {
            op,
            dependencies,
            hour: Vec::new(),
            minute: Vec::new(),
            month: Vec::new(),
            weekday: Vec::new(),
            year: Vec::new(),
        }
    }

    fn fitted_for(&self, index: usize) -> &Vec<FittedColumn> {
        match index {
            0 => &self.hour,
            1 => &self.minute,
            2 => &self.month,
            _ => &self.weekday,
        }
    }

    fn fitted_for_mut(&mut self, index: usize) -> &mut Vec<FittedColumn> {
        match index {
            0 => &mut self.hour,
            1 => &mut self.minute,
            2 => &mut self.month,
            _ => &mut self.weekday,
        }
    }

    fn extract_categorical(
        component: &Component,
        ts: &Column<Float>,
        categories: &Encoding,
        fitting: bool,
    ) -> Column<Int> {
        let codes: Vec<Int> = ts
            .iter()
            .map(|&value| match (component.extract)(value) {
                Some(s) if fitting => categories.insert(&s),
                Some(s) => categories.get(&s),
                None => NULL_INT,
            })
            .collect();
        Column::new(
            format!("{}{}{}", component.begin, ts.name(), component.end),
            codes,
        )
        .with_unit(component.unit)
    }

    fn extract_year(ts: &Column<Float>) -> Column<Float> {
        let values: Vec<Float> = ts.iter().map(|&v| year_value(v)).collect();
        Column::new(
            format!("{}{}{}", marker::YEAR_BEGIN, ts.name(), marker::YEAR_END),
            values,
        )
        .with_unit("year, comparison only")
    }

    fn is_applicable(ts: &Column<Float>) -> bool {
        const BLACKLIST: [Subrole; 4] = [
            Subrole::ExcludePreprocessors,
            Subrole::EmailOnly,
            Subrole::SubstringOnly,
            Subrole::ExcludeSeasonal,
        ];
        !ts.name().contains(marker::GENERATED_TS)
            && !ts.name().contains(marker::ROWID)
            && !crate::helpers::subrole::contains_any(ts.subroles(), &BLACKLIST)
    }

    fn fit_transform_df(
        &mut self,
        df: &DataFrame,
        marker_kind: Marker,
        table: usize,
        categories: &Encoding,
    ) -> Result<DataFrame> {
        let mut result = df.clone();

        let time_stamps: Vec<Column<Float>> = df.time_stamps().to_vec();

        for ts in &time_stamps {
            if !Self::is_applicable(ts) {
                continue;
            }

            for (i, component) in COMPONENTS.iter().enumerate() {
                let col = Self::extract_categorical(component, ts, categories, true);
                if preprocessor_impl::has_warnings_int(col.data()) {
                    continue;
                }
                preprocessor_impl::add(marker_kind, table, ts.name(), self.fitted_for_mut(i));
                result.add_int_column(col, Role::Categorical)?;
            }

            let year = Self::extract_year(ts);
            if !preprocessor_impl::has_warnings_float(year.data()) {
                preprocessor_impl::add(marker_kind, table, ts.name(), &mut self.year);
                result.add_float_column(year, Role::Numerical)?;
            }
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

        for (i, component) in COMPONENTS.iter().enumerate() {
            for name in preprocessor_impl::retrieve_names(marker_kind, table, self.fitted_for(i)) {
                let ts = df.time_stamp(&name)?;
                let col = Self::extract_categorical(component, ts, categories, false);
                result.add_int_column(col, Role::Categorical)?;
            }
        }

        for name in preprocessor_impl::retrieve_names(marker_kind, table, &self.year) {
            let ts = df.time_stamp(&name)?;
            result.add_float_column(Self::extract_year(ts), Role::Numerical)?;
        }

        Ok(result)
    }
}

impl Fingerprinted for Seasonal {
    fn fingerprint(&self) -> Fingerprint {
        Fingerprint::new(FingerprintValue::Seasonal {
            dependencies: self.dependencies.clone(),
            op: self.op.clone(),
        })
    }
}

impl Preprocessor for Seasonal {
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
        let loaded: Seasonal = saver::load(stem, format)?;
        self.hour = loaded.hour;
        self.minute = loaded.minute;
        self.month = loaded.month;
        self.weekday = loaded.weekday;
        self.year = loaded.year;
        Ok(())
    }

    fn to_sql(&self, _categories: &Encoding, dialect: &dyn SqlDialectGenerator) -> Vec<String> {
        let emit = |cols: &[FittedColumn], func: &str, fmt: &str| -> Vec<String> {
            cols.iter()
                .map(|c| {
                    format!(
                        "UPDATE staging SET {} = strftime('{}', {});",
                        dialect.make_staging_table_column(
                            &format!("{}( {} )", func, marker::humanize(&c.name)),
                            "t1"
                        ),
                        fmt,
                        dialect.make_staging_table_column(&c.name, "t1")
                    )
                })
                .collect()
        };

        let mut statements = Vec::new();
        statements.extend(emit(&self.hour, "hour", "%H"));
        statements.extend(emit(&self.minute, "minute", "%M"));
        statements.extend(emit(&self.month, "month", "%m"));
        statements.extend(emit(&self.weekday, "weekday", "%w"));
        statements.extend(emit(&self.year, "year", "%Y"));
        statements
    }

    fn type_name(&self) -> &'static str {
        "Seasonal"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::helpers::Placeholder;
    use crate::logging::ProgressLogger;

    fn params<'a>(
        categories: &'a Encoding,
        placeholder: &'a Placeholder,
        population: &'a DataFrame,
        peripherals: &'a [DataFrame],
        names: &'a [String],
    ) -> PreprocessorParams<'a> {
        PreprocessorParams {
            categories,
            logger: ProgressLogger::silent(),
            logging_begin: 0,
            logging_end: 100,
            peripheral_dfs: peripherals,
            peripheral_names: names,
            placeholder,
            population_df: population,
        }
    }

    #[test]
    fn test_fit_transform_adds_components() {
        // Two days, eight hours apart: distinct hours, weekdays, but one year.
        let mut population = DataFrame::new("pop");
        population
            .add_float_column(
                Column::new("ts", vec![18993.0, 18994.333, 18995.666]),
                Role::TimeStamp,
            )
            .unwrap();

        let categories = Encoding::new();
        let placeholder = Placeholder::default();
        let mut seasonal = Seasonal::new(PreprocessorCommand::Seasonal {}, vec![]);

        let (transformed, _) = seasonal
            .fit_transform(&params(&categories, &placeholder, &population, &[], &[]))
            .unwrap();

        // Hour and weekday vary, minute varies, month and year do not.
        let names: Vec<&str> = transformed
            .categoricals()
            .iter()
            .map(|c| c.unit())
            .collect();
        assert!(names.contains(&"hour"));
        assert!(names.contains(&"weekday"));
        assert!(!names.contains(&"month"));
        assert!(transformed.numericals().is_empty());
    }

    #[test]
    fn test_transform_reproduces_fit_columns() {
        let mut population = DataFrame::new("pop");
        population
            .add_float_column(
                Column::new("ts", vec![18993.0, 18994.333]),
                Role::TimeStamp,
            )
            .unwrap();

        let categories = Encoding::new();
        let placeholder = Placeholder::default();
        let mut seasonal = Seasonal::new(PreprocessorCommand::Seasonal {}, vec![]);

        let (fitted, _) = seasonal
            .fit_transform(&params(&categories, &placeholder, &population, &[], &[]))
            .unwrap();
        let (transformed, _) = seasonal
            .transform(&params(&categories, &placeholder, &population, &[], &[]))
            .unwrap();

        assert_eq!(fitted.ncols(), transformed.ncols());
        for (a, b) in fitted.categoricals().iter().zip(transformed.categoricals()) {
            assert_eq!(a.name(), b.name());
            assert_eq!(a.data(), b.data());
        }
    }

    #[test]
    fn test_generated_stamps_are_skipped() {
        let mut population = DataFrame::new("pop");
        population
            .add_float_column(
                Column::new(
                    marker::generated_ts_name("ts", 7.0),
                    vec![18993.0, 18994.5],
                ),
                Role::TimeStamp,
            )
            .unwrap();

        let categories = Encoding::new();
        let placeholder = Placeholder::default();
        let mut seasonal = Seasonal::new(PreprocessorCommand::Seasonal {}, vec![]);

        let (transformed, _) = seasonal
            .fit_transform(&params(&categories, &placeholder, &population, &[], &[]))
            .unwrap();
        assert_eq!(transformed.ncols(), 1);
    }
}
