//! Staging scenarios: synthetic join keys, memory-derived upper time
//! stamps and idempotence.

mod common;

use rust_rfe::commands::{DataModel, Join, PipelineCommand};
use rust_rfe::containers::{Column, DataFrame, Role};
use rust_rfe::helpers::marker;
use rust_rfe::logging::ProgressLogger;
use rust_rfe::pipelines::make_placeholder::make_ts_name;
use rust_rfe::pipelines::transform::stage_data_frames;
use rust_rfe::pipelines::Pipeline;

fn pipeline_for(data_model: DataModel, peripheral: Vec<String>) -> Pipeline {
    Pipeline::new(PipelineCommand {
        name: "staging-test".to_string(),
        data_model,
        peripheral,
        preprocessors: vec![],
        feature_learners: vec![],
        feature_selectors: vec![],
        predictors: vec![],
        include_categorical: false,
        share_selected_features: 0.0,
        allow_http: false,
        tags: vec![],
    })
    .unwrap()
}

#[test]
fn test_synthetic_join_key() {
    // Population P(a: int, t: timestamp) with 3 rows, peripheral
    // Q(v: float) with 5 rows, joined without a join key.
    let mut population = DataFrame::new("P");
    population
        .add_float_column(Column::new("a", vec![1.0, 2.0, 3.0]), Role::Numerical)
        .unwrap();
    population
        .add_float_column(Column::new("t", vec![0.0, 1.0, 2.0]), Role::TimeStamp)
        .unwrap();

    let mut peripheral = DataFrame::new("Q");
    peripheral
        .add_float_column(
            Column::new("v", vec![1.0, 2.0, 3.0, 4.0, 5.0]),
            Role::Numerical,
        )
        .unwrap();

    let data_model = DataModel::new("P").with_join(Join {
        join_key: marker::NO_JOIN_KEY.to_string(),
        ..Join::new(DataModel::new("Q"))
    });

    let pipeline = pipeline_for(data_model, vec!["Q".to_string()]);

    let (staged_population, staged_peripherals) = stage_data_frames(
        &pipeline,
        &population,
        &[peripheral],
        &ProgressLogger::silent(),
    )
    .unwrap();

    assert_eq!(
        staged_population.join_key(marker::NO_JOIN_KEY).unwrap().data(),
        &[0, 0, 0]
    );
    assert_eq!(
        staged_peripherals[0]
            .join_key(marker::NO_JOIN_KEY)
            .unwrap()
            .data(),
        &[0, 0, 0, 0, 0]
    );
}

#[test]
fn test_memory_becomes_upper_time_stamp() {
    let mut population = DataFrame::new("P");
    population
        .add_int_column(Column::new("id", vec![0, 1]), Role::JoinKey)
        .unwrap();
    population
        .add_float_column(Column::new("ts", vec![10.0, 20.0]), Role::TimeStamp)
        .unwrap();

    let mut peripheral = DataFrame::new("Q");
    peripheral
        .add_int_column(Column::new("id", vec![0, 1, 1]), Role::JoinKey)
        .unwrap();
    peripheral
        .add_float_column(Column::new("ts", vec![1.0, 2.0, 3.0]), Role::TimeStamp)
        .unwrap();

    let data_model = DataModel::new("P").with_join(Join {
        join_key: "id".to_string(),
        time_stamp: "ts".to_string(),
        memory: 7.0,
        ..Join::new(DataModel::new("Q"))
    });

    let pipeline = pipeline_for(data_model, vec!["Q".to_string()]);

    // The placeholder's upper time stamp for the edge is the generated
    // name.
    let (placeholder, _) = pipeline.make_placeholder().unwrap();
    assert_eq!(
        placeholder.upper_time_stamps_used[0],
        make_ts_name("ts", 7.0)
    );

    // And the staged peripheral carries that column, shifted by 7.
    let (_, staged_peripherals) = stage_data_frames(
        &pipeline,
        &population,
        &[peripheral],
        &ProgressLogger::silent(),
    )
    .unwrap();

    let upper = staged_peripherals[0]
        .time_stamp(&make_ts_name("ts", 7.0))
        .unwrap();
    assert_eq!(upper.data(), &[8.0, 9.0, 10.0]);
}

#[test]
fn test_staging_is_idempotent() {
    let population = common::population();
    let peripherals = vec![common::transactions()];
    let pipeline = common::pipeline();

    let (population_once, peripherals_once) = stage_data_frames(
        &pipeline,
        &population,
        &peripherals,
        &ProgressLogger::silent(),
    )
    .unwrap();

    let (population_again, peripherals_again) = stage_data_frames(
        &pipeline,
        &population,
        &peripherals,
        &ProgressLogger::silent(),
    )
    .unwrap();

    assert_eq!(population_once.name(), population_again.name());
    assert_eq!(population_once.ncols(), population_again.ncols());
    assert_eq!(peripherals_once.len(), peripherals_again.len());
    for (a, b) in peripherals_once.iter().zip(&peripherals_again) {
        assert_eq!(a.name(), b.name());
        assert_eq!(a.ncols(), b.ncols());
        assert_eq!(a.nrows(), b.nrows());
    }
}

#[test]
fn test_rowid_synthesis() {
    let mut population = DataFrame::new("P");
    population
        .add_int_column(Column::new("id", vec![0, 1]), Role::JoinKey)
        .unwrap();

    let mut peripheral = DataFrame::new("Q");
    peripheral
        .add_int_column(Column::new("id", vec![0, 1, 1]), Role::JoinKey)
        .unwrap();

    let data_model = DataModel::new("P").with_join(Join {
        join_key: "id".to_string(),
        time_stamp: marker::ROWID.to_string(),
        ..Join::new(DataModel::new("Q"))
    });

    let pipeline = pipeline_for(data_model, vec!["Q".to_string()]);

    let (staged_population, staged_peripherals) = stage_data_frames(
        &pipeline,
        &population,
        &[peripheral],
        &ProgressLogger::silent(),
    )
    .unwrap();

    assert_eq!(
        staged_population.time_stamp(marker::ROWID).unwrap().data(),
        &[0.0, 1.0]
    );
    assert_eq!(
        staged_peripherals[0].time_stamp(marker::ROWID).unwrap().data(),
        &[0.0, 1.0, 2.0]
    );
}
