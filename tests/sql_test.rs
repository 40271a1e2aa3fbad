//! SQL transpilation: every staged table appears exactly once, and the
//! full pipeline transpiles into staging, features and a final SELECT.

mod common;

use common::TestContext;
use rust_rfe::pipelines::fit;
use rust_rfe::pipelines::to_sql::{to_sql, ToSqlParams};
use rust_rfe::transpilation::{HumanReadableSqlGenerator, SqlDialectGenerator};

#[test]
fn test_staging_tables_mention_every_table_once() {
    let population = common::population();
    let peripherals = vec![common::transactions()];
    let pipeline = common::pipeline();
    let context = TestContext::new();

    let (fitted, _) = fit::fit(
        &pipeline,
        &context.fit_params(&population, &peripherals),
    )
    .unwrap();

    let dialect = HumanReadableSqlGenerator::new();

    let statements = dialect.make_staging_tables(
        true,
        &[false],
        &fitted.modified_population_schema,
        &fitted.modified_peripheral_schema,
    );

    // One statement per staged table: the population and each peripheral.
    assert_eq!(statements.len(), 1 + fitted.modified_peripheral_schema.len());

    let population_staging =
        dialect.make_staging_table_name(&fitted.modified_population_schema.name);
    assert_eq!(population_staging, "POPULATION__STAGING");
    assert_eq!(
        statements
            .iter()
            .filter(|s| s.contains(&population_staging))
            .count(),
        1
    );

    for schema in &fitted.modified_peripheral_schema {
        let staging_name = dialect.make_staging_table_name(&schema.name);
        assert_eq!(
            statements
                .iter()
                .filter(|s| s.contains(&format!("CREATE TABLE \"{}\"", staging_name)))
                .count(),
            1
        );
    }
}

#[test]
fn test_full_pipeline_transpiles() {
    let population = common::population();
    let peripherals = vec![common::transactions()];
    let pipeline = common::pipeline();
    let context = TestContext::new();

    let (fitted, _) = fit::fit(
        &pipeline,
        &context.fit_params(&population, &peripherals),
    )
    .unwrap();

    let dialect = HumanReadableSqlGenerator::new();

    let sql = to_sql(
        &pipeline,
        &fitted,
        &ToSqlParams {
            categories: &context.categories,
            targets: true,
            full_pipeline: true,
            dialect: &dialect,
            size_threshold: None,
        },
    )
    .unwrap();

    // Staging, one CREATE TABLE per selected feature, and the final
    // SELECT.
    assert!(sql.contains("POPULATION__STAGING"));
    assert!(sql.contains("TRANSACTIONS__STAGING"));

    let feature_tables = sql.matches("CREATE TABLE \"FEATURE_1_").count();
    assert_eq!(
        feature_tables,
        fitted.predictors.predictor_impl.autofeatures()[0].len()
    );

    assert!(sql.contains("\"spend\""));
    assert!(sql.trim_end().ends_with(';'));
}

#[test]
fn test_size_threshold_replaces_oversized_features() {
    let population = common::population();
    let peripherals = vec![common::transactions()];
    let pipeline = common::pipeline();
    let context = TestContext::new();

    let (fitted, _) = fit::fit(
        &pipeline,
        &context.fit_params(&population, &peripherals),
    )
    .unwrap();

    let dialect = HumanReadableSqlGenerator::new();

    let sql = to_sql(
        &pipeline,
        &fitted,
        &ToSqlParams {
            categories: &context.categories,
            targets: false,
            full_pipeline: false,
            dialect: &dialect,
            size_threshold: Some(1),
        },
    )
    .unwrap();

    assert!(sql.contains("-- Feature omitted"));
    assert!(!sql.contains("CREATE TABLE \"FEATURE_1_"));
}
