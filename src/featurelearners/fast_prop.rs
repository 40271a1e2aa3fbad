use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::commands::{Aggregation, FastPropHyperparams, Fingerprint, FingerprintValue, LossFunction};
use crate::containers::{DataFrame, Encoding, Feature, NumericalFeatures};
use crate::dependency::Fingerprinted;
use crate::featurelearners::feature_learner::{
    FeatureLearner, FeatureLearnerParams, FitParams, TransformParams,
};
use crate::helpers::column_description::{ColumnDescription, Marker};
use crate::helpers::{marker, saver, Format};
use crate::transpilation::SqlDialectGenerator;
use crate::{Float, Int, Result, RfeError};

/// The propositionalization feature learner.
///
/// Enumerates aggregation features over the to-many edges of the
/// placeholder: plain counts, aggregations of the numerical and discrete
/// peripheral columns, distinct counts of the categorical columns and
/// conditional counts on the most frequent categories. Enumeration order
/// is edge-major and column-minor with the aggregations innermost, so the
/// feature bank is byte-stable for identical inputs.
#[derive(Debug, Serialize, Deserialize)]
pub struct FastProp {
    hyperparams: FastPropHyperparams,
    params: FeatureLearnerParams,
    features: Vec<FeatureSpec>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
struct FeatureSpec {
    edge: usize,
    aggregation: Aggregation,
    column: Option<String>,
    condition: Option<Condition>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
struct Condition {
    column: String,
    category: Int,
}

fn is_numeric_aggregation(aggregation: Aggregation) -> bool {
    matches!(
        aggregation,
        Aggregation::Sum
            | Aggregation::Avg
            | Aggregation::Min
            | Aggregation::Max
            | Aggregation::First
            | Aggregation::Last
    )
}

fn needs_time_stamp(aggregation: Aggregation) -> bool {
    matches!(aggregation, Aggregation::First | Aggregation::Last)
}

impl FastProp {
    pub fn new(hyperparams: FastPropHyperparams, params: FeatureLearnerParams) -> Self {
        Self {
            hyperparams,
            params,
            features: Vec::new(),
        }
    }

    fn num_threads(&self) -> usize {
        if self.hyperparams.num_threads <= 0 {
            (num_cpus::get() / 2).max(2)
        } else {
            self.hyperparams.num_threads as usize
        }
    }

    fn peripheral_index(&self, name: &str) -> Result<usize> {
        self.params
            .peripheral
            .iter()
            .position(|n| n == name)
            .ok_or_else(|| {
                RfeError::Configuration(format!(
                    "Placeholder '{}' not among the peripheral tables.",
                    name
                ))
            })
    }

    fn find_peripheral<'a>(
        &self,
        name: &str,
        peripheral_dfs: &'a [DataFrame],
    ) -> Result<&'a DataFrame> {
        peripheral_dfs
            .iter()
            .find(|df| df.name() == name)
            .ok_or_else(|| {
                RfeError::Data(format!(
                    "Peripheral data frame '{}' was not passed.",
                    name
                ))
            })
    }

    /// The most frequent category codes of one column, most frequent first.
    fn most_frequent(column: &[Int], k: usize) -> Vec<Int> {
        let mut frequencies: HashMap<Int, usize> = HashMap::new();
        for &code in column {
            if code >= 0 {
                *frequencies.entry(code).or_insert(0) += 1;
            }
        }
        let mut counted: Vec<(Int, usize)> = frequencies.into_iter().collect();
        counted.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        counted.truncate(k);
        counted.into_iter().map(|(code, _)| code).collect()
    }

    fn enumerate_features(&self, params: &FitParams<'_>) -> Result<Vec<FeatureSpec>> {
        let mut features = Vec::new();
        let placeholder = &self.params.placeholder;

        for edge in 0..placeholder.joined_tables.len() {
            let child = &placeholder.joined_tables[edge];
            let schema_index = self.peripheral_index(&child.name)?;
            let schema = &self.params.peripheral_schema[schema_index];
            let has_ts = !placeholder.other_time_stamps_used[edge].is_empty();

            if self.hyperparams.aggregations.contains(&Aggregation::Count) {
                features.push(FeatureSpec {
                    edge,
                    aggregation: Aggregation::Count,
                    column: None,
                    condition: None,
                });
            }

            let mut numeric_columns: Vec<&String> =
                schema.numericals.iter().chain(&schema.discretes).collect();
            if placeholder.allow_lagged_targets[edge] {
                numeric_columns.extend(&schema.targets);
            }

            for column in numeric_columns {
                for &aggregation in &self.hyperparams.aggregations {
                    if !is_numeric_aggregation(aggregation) {
                        continue;
                    }
                    if needs_time_stamp(aggregation) && !has_ts {
                        continue;
                    }
                    features.push(FeatureSpec {
                        edge,
                        aggregation,
                        column: Some(column.clone()),
                        condition: None,
                    });
                }
            }

            for column in &schema.categoricals {
                for &aggregation in &self.hyperparams.aggregations {
                    if !matches!(
                        aggregation,
                        Aggregation::CountDistinct | Aggregation::CountMinusCountDistinct
                    ) {
                        continue;
                    }
                    features.push(FeatureSpec {
                        edge,
                        aggregation,
                        column: Some(column.clone()),
                        condition: None,
                    });
                }
            }

            if self.hyperparams.n_most_frequent > 0
                && self.hyperparams.aggregations.contains(&Aggregation::Count)
            {
                let df = self.find_peripheral(&child.name, params.peripheral_dfs)?;
                for column in &schema.categoricals {
                    let codes =
                        Self::most_frequent(df.categorical(column)?.data(), self.hyperparams.n_most_frequent);
                    for category in codes {
                        features.push(FeatureSpec {
                            edge,
                            aggregation: Aggregation::Count,
                            column: None,
                            condition: Some(Condition {
                                column: column.clone(),
                                category,
                            }),
                        });
                    }
                }
            }
        }

        features.truncate(self.hyperparams.num_features);
        Ok(features)
    }

    /// For each population row, the peripheral rows matched by the edge's
    /// join key and time-stamp bounds.
    fn build_matches(
        &self,
        edge: usize,
        population: &DataFrame,
        peripheral: &DataFrame,
    ) -> Result<Vec<Vec<usize>>> {
        let placeholder = &self.params.placeholder;

        let jk_name = &placeholder.join_keys_used[edge];
        let other_jk_name = &placeholder.other_join_keys_used[edge];
        let ts_name = &placeholder.time_stamps_used[edge];
        let other_ts_name = &placeholder.other_time_stamps_used[edge];
        let upper_ts_name = &placeholder.upper_time_stamps_used[edge];

        let nrows = population.nrows();

        let candidates: Vec<Vec<usize>> = if jk_name.is_empty() {
            let all: Vec<usize> = (0..peripheral.nrows()).collect();
            vec![all; nrows]
        } else {
            let pop_jk = population.join_key(jk_name)?;
            let other_jk = peripheral.join_key(other_jk_name)?;

            let mut by_key: HashMap<Int, Vec<usize>> = HashMap::new();
            for (row, &key) in other_jk.iter().enumerate() {
                if key >= 0 {
                    by_key.entry(key).or_default().push(row);
                }
            }

            pop_jk
                .iter()
                .map(|&key| {
                    if key < 0 {
                        Vec::new()
                    } else {
                        by_key.get(&key).cloned().unwrap_or_default()
                    }
                })
                .collect()
        };

        if ts_name.is_empty() {
            return Ok(candidates);
        }

        let pop_ts = population.time_stamp(ts_name)?;
        let other_ts = peripheral.time_stamp(other_ts_name)?;
        let upper_ts = if upper_ts_name.is_empty() {
            None
        } else {
            Some(peripheral.time_stamp(upper_ts_name)?)
        };

        let filtered = candidates
            .into_iter()
            .enumerate()
            .map(|(i, rows)| {
                let now = pop_ts[i];
                rows.into_iter()
                    .filter(|&r| {
                        other_ts[r] <= now
                            && upper_ts.map(|upper| upper[r] > now).unwrap_or(true)
                    })
                    .collect()
            })
            .collect();

        Ok(filtered)
    }

    fn aggregate(
        spec: &FeatureSpec,
        peripheral: &DataFrame,
        ts_name: &str,
        matches: &[Vec<usize>],
    ) -> Result<Vec<Float>> {
        let condition_col = match &spec.condition {
            Some(condition) => Some(peripheral.categorical(&condition.column)?),
            None => None,
        };

        let filtered = |rows: &[usize]| -> Vec<usize> {
            match (&spec.condition, condition_col) {
                (Some(condition), Some(col)) => rows
                    .iter()
                    .copied()
                    .filter(|&r| col[r] == condition.category)
                    .collect(),
                _ => rows.to_vec(),
            }
        };

        match spec.aggregation {
            Aggregation::Count => Ok(matches
                .iter()
                .map(|rows| filtered(rows).len() as Float)
                .collect()),

            Aggregation::CountDistinct | Aggregation::CountMinusCountDistinct => {
                let column = spec.column.as_deref().ok_or_else(|| {
                    RfeError::Configuration("COUNT DISTINCT requires a column.".to_string())
                })?;
                let col = peripheral.categorical(column)?;
                Ok(matches
                    .iter()
                    .map(|rows| {
                        let rows = filtered(rows);
                        let non_null: Vec<Int> =
                            rows.iter().map(|&r| col[r]).filter(|&c| c >= 0).collect();
                        let distinct = non_null.iter().collect::<HashSet<_>>().len() as Float;
                        match spec.aggregation {
                            Aggregation::CountDistinct => distinct,
                            _ => non_null.len() as Float - distinct,
                        }
                    })
                    .collect())
            }

            Aggregation::Sum
            | Aggregation::Avg
            | Aggregation::Min
            | Aggregation::Max
            | Aggregation::First
            | Aggregation::Last => {
                let column = spec.column.as_deref().ok_or_else(|| {
                    RfeError::Configuration(format!(
                        "{} requires a column.",
                        spec.aggregation.as_str()
                    ))
                })?;
                let col = match peripheral.numerical(column) {
                    Ok(col) => col,
                    Err(_) => peripheral.target_by_name(column)?,
                };
                let ts_col = if needs_time_stamp(spec.aggregation) {
                    Some(peripheral.time_stamp(ts_name)?)
                } else {
                    None
                };

                Ok(matches
                    .iter()
                    .map(|rows| {
                        let rows = filtered(rows);
                        let values: Vec<(usize, Float)> = rows
                            .iter()
                            .map(|&r| (r, col[r]))
                            .filter(|(_, v)| v.is_finite())
                            .collect();
                        if values.is_empty() {
                            return 0.0;
                        }
                        match spec.aggregation {
                            Aggregation::Sum => values.iter().map(|(_, v)| v).sum(),
                            Aggregation::Avg => {
                                values.iter().map(|(_, v)| v).sum::<Float>()
                                    / values.len() as Float
                            }
                            Aggregation::Min => values
                                .iter()
                                .map(|(_, v)| *v)
                                .fold(Float::INFINITY, Float::min),
                            Aggregation::Max => values
                                .iter()
                                .map(|(_, v)| *v)
                                .fold(Float::NEG_INFINITY, Float::max),
                            Aggregation::First | Aggregation::Last => {
                                let ts = ts_col.map(|c| c.data());
                                let key = |r: usize| ts.map(|t| t[r]).unwrap_or(r as Float);
                                let best = if spec.aggregation == Aggregation::First {
                                    values.iter().min_by(|a, b| {
                                        key(a.0)
                                            .partial_cmp(&key(b.0))
                                            .unwrap_or(std::cmp::Ordering::Equal)
                                    })
                                } else {
                                    values.iter().max_by(|a, b| {
                                        key(a.0)
                                            .partial_cmp(&key(b.0))
                                            .unwrap_or(std::cmp::Ordering::Equal)
                                    })
                                };
                                best.map(|(_, v)| *v).unwrap_or(0.0)
                            }
                            _ => 0.0,
                        }
                    })
                    .collect())
            }
        }
    }

    fn sql_aggregation(&self, spec: &FeatureSpec, dialect: &dyn SqlDialectGenerator) -> String {
        let column = |name: &str| dialect.make_staging_table_column(name, "t2");
        match (&spec.aggregation, &spec.column) {
            (Aggregation::Count, _) => "COUNT( * )".to_string(),
            (Aggregation::CountDistinct, Some(name)) => {
                format!("COUNT( DISTINCT {} )", column(name))
            }
            (Aggregation::CountMinusCountDistinct, Some(name)) => {
                format!("COUNT( {} ) - COUNT( DISTINCT {} )", column(name), column(name))
            }
            (Aggregation::First, Some(name)) | (Aggregation::Last, Some(name)) => {
                let ts = &self.params.placeholder.other_time_stamps_used[spec.edge];
                format!(
                    "{}( {} ORDER BY {} )",
                    spec.aggregation.as_str(),
                    column(name),
                    column(ts)
                )
            }
            (aggregation, Some(name)) => {
                format!("{}( {} )", aggregation.as_str(), column(name))
            }
            (aggregation, None) => format!("{}( * )", aggregation.as_str()),
        }
    }
}

impl Fingerprinted for FastProp {
    fn fingerprint(&self) -> Fingerprint {
        Fingerprint::new(FingerprintValue::FastProp {
            hyperparams: self.hyperparams.clone(),
            dependencies: self.params.dependencies.clone(),
            peripheral: self.params.peripheral.clone(),
            placeholder: self.params.placeholder.clone(),
            target_num: self.params.target_num,
        })
    }
}

impl FeatureLearner for FastProp {
    fn fit(&mut self, params: &FitParams<'_>) -> Result<()> {
        params.logger.log("FastProp: Building features...");
        self.features = self.enumerate_features(params)?;
        params.logger.progress(100);
        Ok(())
    }

    fn transform(&self, params: &TransformParams<'_>) -> Result<NumericalFeatures> {
        let placeholder = &self.params.placeholder;

        // One match table per edge actually used.
        let mut matches_by_edge: HashMap<usize, Vec<Vec<usize>>> = HashMap::new();
        for &ix in params.index {
            let spec = self.features.get(ix).ok_or_else(|| {
                RfeError::Configuration(format!(
                    "Feature index {} out of range; the learner has {} features.",
                    ix,
                    self.features.len()
                ))
            })?;
            if !matches_by_edge.contains_key(&spec.edge) {
                let child_name = &placeholder.joined_tables[spec.edge].name;
                let peripheral = self.find_peripheral(child_name, params.peripheral_dfs)?;
                let matches = self.build_matches(spec.edge, params.population_df, peripheral)?;
                matches_by_edge.insert(spec.edge, matches);
            }
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.num_threads())
            .build()
            .map_err(|e| RfeError::Configuration(e.to_string()))?;

        let results: Vec<Result<Feature<Float>>> = pool.install(|| {
            params
                .index
                .par_iter()
                .map(|&ix| {
                    let spec = &self.features[ix];
                    let child_name = &placeholder.joined_tables[spec.edge].name;
                    let peripheral = self.find_peripheral(child_name, params.peripheral_dfs)?;
                    let ts_name = &placeholder.other_time_stamps_used[spec.edge];
                    let values = Self::aggregate(
                        spec,
                        peripheral,
                        ts_name,
                        &matches_by_edge[&spec.edge],
                    )?;
                    Ok(Feature::new(
                        format!("feature_{}{}", params.prefix, ix + 1),
                        values,
                    ))
                })
                .collect()
        });

        params.logger.progress(100);

        results.into_iter().collect()
    }

    fn num_features(&self) -> usize {
        self.features.len()
    }

    fn silent(&self) -> bool {
        self.hyperparams.silent
    }

    fn population_needs_targets(&self) -> bool {
        false
    }

    fn supports_multiple_targets(&self) -> bool {
        true
    }

    fn is_classification(&self) -> bool {
        self.hyperparams.loss_function == LossFunction::CrossEntropyLoss
    }

    fn column_importances(
        &self,
        importance_factors: &[Float],
    ) -> BTreeMap<ColumnDescription, Float> {
        let mut importances = BTreeMap::new();
        let placeholder = &self.params.placeholder;

        for (ix, spec) in self.features.iter().enumerate() {
            let factor = importance_factors.get(ix).copied().unwrap_or(0.0);
            let table = &placeholder.joined_tables[spec.edge].name;

            let colname = if let Some(column) = &spec.column {
                column.clone()
            } else if let Some(condition) = &spec.condition {
                condition.column.clone()
            } else {
                placeholder.other_join_keys_used[spec.edge].clone()
            };

            let desc = ColumnDescription::new(Marker::Peripheral, table.clone(), colname);
            *importances.entry(desc).or_insert(0.0) += factor;
        }

        importances
    }

    fn save(&self, stem: &Path, format: Format) -> Result<()> {
        saver::save(stem, self, format)
    }

    fn load(&mut self, stem: &Path, format: Format) -> Result<()> {
        let loaded: FastProp = saver::load(stem, format)?;
        self.features = loaded.features;
        Ok(())
    }

    fn to_sql(
        &self,
        categories: &Encoding,
        _targets: bool,
        _full_pipeline: bool,
        dialect: &dyn SqlDialectGenerator,
        prefix: &str,
    ) -> Vec<String> {
        let placeholder = &self.params.placeholder;
        let population_staging =
            dialect.make_staging_table_name(&placeholder.name);

        self.features
            .iter()
            .enumerate()
            .map(|(ix, spec)| {
                let child = &placeholder.joined_tables[spec.edge];
                let peripheral_staging = dialect.make_staging_table_name(&child.name);
                let feature_table = format!("FEATURE_{}{}", prefix, ix + 1);

                let mut sql = dialect.drop_table_if_exists(&feature_table);
                sql.push_str(&format!(
                    "\nCREATE TABLE \"{}\" AS\nSELECT {} AS \"value\",\n       t1.rownum AS rownum\nFROM \"{}\" t1\nLEFT JOIN \"{}\" t2 ON {} = {}",
                    feature_table,
                    self.sql_aggregation(spec, dialect),
                    population_staging,
                    peripheral_staging,
                    dialect.make_staging_table_column(&placeholder.join_keys_used[spec.edge], "t1"),
                    dialect.make_staging_table_column(&placeholder.other_join_keys_used[spec.edge], "t2"),
                ));

                let mut conditions: Vec<String> = Vec::new();

                let ts = &placeholder.time_stamps_used[spec.edge];
                let other_ts = &placeholder.other_time_stamps_used[spec.edge];
                if !ts.is_empty() {
                    conditions.push(format!(
                        "{} <= {}",
                        dialect.make_staging_table_column(other_ts, "t2"),
                        dialect.make_staging_table_column(ts, "t1")
                    ));
                }
                let upper = &placeholder.upper_time_stamps_used[spec.edge];
                if !upper.is_empty() {
                    conditions.push(format!(
                        "{} > {}",
                        dialect.make_staging_table_column(upper, "t2"),
                        dialect.make_staging_table_column(ts, "t1")
                    ));
                }
                if let Some(condition) = &spec.condition {
                    let category = categories
                        .str_at(condition.category)
                        .unwrap_or_else(|| condition.category.to_string());
                    conditions.push(format!(
                        "{} = '{}'",
                        dialect.make_staging_table_column(&condition.column, "t2"),
                        category.replace('\'', "''")
                    ));
                }

                if !conditions.is_empty() {
                    sql.push_str(&format!("\nWHERE {}", conditions.join("\n  AND ")));
                }

                sql.push_str("\nGROUP BY t1.rownum;");
                sql
            })
            .collect()
    }

    fn type_name(&self) -> &'static str {
        "FastProp"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::containers::{Column, Role};
    use crate::helpers::{Placeholder, Schema};
    use crate::logging::ProgressLogger;

    fn hyperparams(aggregations: Vec<Aggregation>) -> FastPropHyperparams {
        FastPropHyperparams {
            aggregations,
            loss_function: LossFunction::SquareLoss,
            n_most_frequent: 0,
            num_features: 100,
            num_threads: 1,
            silent: true,
        }
    }

    fn simple_placeholder() -> Placeholder {
        Placeholder {
            name: format!("pop{}", marker::POPULATION),
            allow_lagged_targets: vec![false],
            join_keys_used: vec!["id".to_string()],
            joined_tables: vec![Placeholder {
                name: "trans".to_string(),
                ..Default::default()
            }],
            other_join_keys_used: vec!["id".to_string()],
            other_time_stamps_used: vec![String::new()],
            propositionalization: vec![false],
            time_stamps_used: vec![String::new()],
            upper_time_stamps_used: vec![String::new()],
        }
    }

    fn tables() -> (DataFrame, DataFrame) {
        let mut population = DataFrame::new(format!("pop{}", marker::POPULATION));
        population
            .add_int_column(Column::new("id", vec![0, 1, 2]), Role::JoinKey)
            .unwrap();
        population
            .add_float_column(Column::new("y", vec![0.0, 1.0, 0.0]), Role::Target)
            .unwrap();

        let mut trans = DataFrame::new("trans");
        trans
            .add_int_column(Column::new("id", vec![0, 0, 1, 1, 1]), Role::JoinKey)
            .unwrap();
        trans
            .add_float_column(
                Column::new("amount", vec![10.0, 20.0, 5.0, 5.0, 2.0]),
                Role::Numerical,
            )
            .unwrap();

        (population, trans)
    }

    fn learner(aggregations: Vec<Aggregation>) -> FastProp {
        let (_, trans) = tables();
        FastProp::new(
            hyperparams(aggregations),
            FeatureLearnerParams {
                dependencies: vec![],
                peripheral: vec!["trans".to_string()],
                peripheral_schema: vec![trans.to_schema(false)],
                placeholder: simple_placeholder(),
                population_schema: Schema::new("pop"),
                target_num: crate::featurelearners::USE_ALL_TARGETS,
            },
        )
    }

    #[test]
    fn test_fit_enumerates_deterministically() {
        let (population, trans) = tables();
        let peripherals = vec![trans];

        let fit = |_: ()| -> Vec<FeatureSpec> {
            let mut fl = learner(vec![Aggregation::Count, Aggregation::Sum, Aggregation::Avg]);
            fl.fit(&FitParams {
                logger: ProgressLogger::silent(),
                peripheral_dfs: &peripherals,
                population_df: &population,
                prefix: "1_".to_string(),
            })
            .unwrap();
            fl.features
        };

        assert_eq!(fit(()), fit(()));
        // COUNT, SUM(amount), AVG(amount).
        assert_eq!(fit(()).len(), 3);
    }

    #[test]
    fn test_transform_aggregates() {
        let (population, trans) = tables();
        let peripherals = vec![trans];

        let mut fl = learner(vec![Aggregation::Count, Aggregation::Sum]);
        fl.fit(&FitParams {
            logger: ProgressLogger::silent(),
            peripheral_dfs: &peripherals,
            population_df: &population,
            prefix: "1_".to_string(),
        })
        .unwrap();

        let index: Vec<usize> = (0..fl.num_features()).collect();
        let features = fl
            .transform(&TransformParams {
                index: &index,
                logger: ProgressLogger::silent(),
                peripheral_dfs: &peripherals,
                population_df: &population,
                prefix: "1_".to_string(),
            })
            .unwrap();

        assert_eq!(features.len(), 2);
        assert_eq!(features[0].name(), "feature_1_1");
        // COUNT per population row: id 0 has 2 rows, id 1 has 3, id 2 none.
        assert_eq!(features[0].data(), &[2.0, 3.0, 0.0]);
        // SUM(amount).
        assert_eq!(features[1].data(), &[30.0, 12.0, 0.0]);
    }

    #[test]
    fn test_column_importances_attribute_to_source() {
        let (population, trans) = tables();
        let peripherals = vec![trans];

        let mut fl = learner(vec![Aggregation::Count, Aggregation::Sum]);
        fl.fit(&FitParams {
            logger: ProgressLogger::silent(),
            peripheral_dfs: &peripherals,
            population_df: &population,
            prefix: "1_".to_string(),
        })
        .unwrap();

        let importances = fl.column_importances(&[0.25, 0.75]);
        let amount = ColumnDescription::new(Marker::Peripheral, "trans", "amount");
        let join_key = ColumnDescription::new(Marker::Peripheral, "trans", "id");
        assert_eq!(importances[&amount], 0.75);
        assert_eq!(importances[&join_key], 0.25);
    }
}
