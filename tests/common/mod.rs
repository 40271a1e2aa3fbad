//! Shared fixtures for the integration tests: a small star schema with a
//! population table, a transactions table and a target that is a pure
//! function of the aggregated transactions.

use rust_rfe::commands::{
    Aggregation, DataModel, FastPropHyperparams, FeatureLearnerCommand, Join,
    LinearRegressionHyperparams, LossFunction, PipelineCommand, PredictorCommand,
};
use rust_rfe::containers::{Column, DataFrame, Encoding, Role};
use rust_rfe::dependency::PipelineTrackers;
use rust_rfe::logging::ProgressLogger;
use rust_rfe::pipelines::fit::FitParams;
use rust_rfe::pipelines::Pipeline;
use rust_rfe::Float;

pub fn population() -> DataFrame {
    let nrows = 40;
    let mut df = DataFrame::new("population");
    df.add_int_column(
        Column::new("customer_id", (0..nrows).map(|i| i % 8).collect()),
        Role::JoinKey,
    )
    .unwrap();
    df.add_float_column(
        Column::new("ts", (0..nrows).map(|i| 100.0 + i as Float).collect()),
        Role::TimeStamp,
    )
    .unwrap();
    df.add_float_column(
        Column::new("age", (0..nrows).map(|i| 20.0 + (i % 13) as Float).collect()),
        Role::Numerical,
    )
    .unwrap();

    // The target is the number of earlier transactions of the customer,
    // so the pipeline can learn it from a COUNT feature.
    let target: Vec<Float> = (0..nrows)
        .map(|i| {
            let customer = i % 8;
            transactions_raw()
                .iter()
                .filter(|(c, ts, _)| *c == customer && *ts <= 100.0 + i as Float)
                .count() as Float
        })
        .collect();
    df.add_float_column(Column::new("spend", target), Role::Target)
        .unwrap();

    df
}

fn transactions_raw() -> Vec<(i64, Float, Float)> {
    (0..120)
        .map(|i| {
            let customer = (i * 7 + 3) % 8;
            let ts = 80.0 + (i % 60) as Float;
            let amount = 5.0 + (i % 11) as Float;
            (customer, ts, amount)
        })
        .collect()
}

pub fn transactions() -> DataFrame {
    let raw = transactions_raw();
    let mut df = DataFrame::new("transactions");
    df.add_int_column(
        Column::new("customer_id", raw.iter().map(|(c, _, _)| *c).collect()),
        Role::JoinKey,
    )
    .unwrap();
    df.add_float_column(
        Column::new("ts", raw.iter().map(|(_, ts, _)| *ts).collect()),
        Role::TimeStamp,
    )
    .unwrap();
    df.add_float_column(
        Column::new("amount", raw.iter().map(|(_, _, a)| *a).collect()),
        Role::Numerical,
    )
    .unwrap();
    df
}

pub fn data_model() -> DataModel {
    DataModel::new("population").with_join(Join {
        join_key: "customer_id".to_string(),
        time_stamp: "ts".to_string(),
        ..Join::new(DataModel::new("transactions"))
    })
}

pub fn fast_prop() -> FastPropHyperparams {
    FastPropHyperparams {
        aggregations: vec![
            Aggregation::Count,
            Aggregation::Sum,
            Aggregation::Avg,
            Aggregation::Max,
        ],
        loss_function: LossFunction::SquareLoss,
        n_most_frequent: 0,
        num_features: 20,
        num_threads: 1,
        silent: true,
    }
}

pub fn linear_regression() -> PredictorCommand {
    PredictorCommand::LinearRegression(LinearRegressionHyperparams {
        learning_rate: 0.2,
        reg_lambda: 0.0,
    })
}

pub fn pipeline_command() -> PipelineCommand {
    PipelineCommand {
        name: "test-pipeline".to_string(),
        data_model: data_model(),
        peripheral: vec!["transactions".to_string()],
        preprocessors: vec![],
        feature_learners: vec![FeatureLearnerCommand::FastProp(fast_prop())],
        feature_selectors: vec![linear_regression()],
        predictors: vec![linear_regression()],
        include_categorical: true,
        share_selected_features: 0.5,
        allow_http: false,
        tags: vec![],
    }
}

pub fn pipeline() -> Pipeline {
    Pipeline::new(pipeline_command()).unwrap()
}

pub struct TestContext {
    pub trackers: PipelineTrackers,
    pub categories: Encoding,
}

impl TestContext {
    pub fn new() -> Self {
        Self {
            trackers: PipelineTrackers::new(),
            categories: Encoding::new(),
        }
    }

    pub fn fit_params<'a>(
        &'a self,
        population_df: &'a DataFrame,
        peripheral_dfs: &'a [DataFrame],
    ) -> FitParams<'a> {
        FitParams {
            trackers: &self.trackers,
            categories: &self.categories,
            logger: ProgressLogger::silent(),
            population_df,
            peripheral_dfs,
            validation_df: None,
        }
    }
}
