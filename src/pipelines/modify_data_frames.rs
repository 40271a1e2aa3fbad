//! Rewrites the raw data frames so they satisfy the canonical join and
//! time-stamp structure: synthetic join keys, composite join keys, rowids
//! and the generated lower/upper time stamps.

use std::collections::HashMap;

use crate::commands::DataModel;
use crate::containers::{Column, DataFrame, Encoding, Role};
use crate::helpers::marker;
use crate::pipelines::make_placeholder::make_ts_name;
use crate::{Float, Int, Result, RfeError, NULL_INT};

/// Returns the peripheral data frame referenced by a joined table.
fn find_data_frame<'a>(
    joined_table: &DataModel,
    peripheral_names: &[String],
    peripheral_dfs: &'a mut [DataFrame],
) -> Result<&'a mut DataFrame> {
    if peripheral_names.len() != peripheral_dfs.len() {
        return Err(RfeError::Configuration(format!(
            "There must be one peripheral table for every peripheral placeholder \
             ({} vs. {}).",
            peripheral_dfs.len(),
            peripheral_names.len()
        )));
    }
    let position = peripheral_names
        .iter()
        .position(|name| *name == joined_table.name)
        .ok_or_else(|| {
            RfeError::Configuration(format!(
                "Placeholder named '{}' not among the peripheral tables.",
                joined_table.name
            ))
        })?;
    Ok(&mut peripheral_dfs[position])
}

/// Adds the constant join key used when the caller passed none.
fn add_jk(df: &mut DataFrame) -> Result<()> {
    if df.has_join_key(marker::NO_JOIN_KEY) {
        return Ok(());
    }
    let column = Column::new(marker::NO_JOIN_KEY, vec![0 as Int; df.nrows()]);
    df.add_int_column(column, Role::JoinKey)
}

/// Adds a rowid time stamp holding 0, 1, 2, ...
fn add_rowid(df: &mut DataFrame) -> Result<()> {
    if df.has_time_stamp(marker::ROWID) {
        return Ok(());
    }
    let values: Vec<Float> = (0..df.nrows()).map(|i| i as Float).collect();
    let column =
        Column::new(marker::ROWID, values).with_unit(marker::ROWID_COMPARISON_ONLY);
    df.add_float_column(column, Role::TimeStamp)
}

/// Concatenates several join keys into one, replicating an
/// `ON ... AND ...` condition. Rows with any null component stay null.
fn concat_join_keys(name: &str, encoding: &Encoding, df: &mut DataFrame) -> Result<()> {
    if df.has_join_key(name) {
        return Ok(());
    }

    let component_names = marker::parse_join_key_name(name);

    let mut components = Vec::with_capacity(component_names.len());
    for component in &component_names {
        components.push(df.join_key(component)?.clone());
    }

    let mut data = Vec::with_capacity(df.nrows());
    for row in 0..df.nrows() {
        let mut key = String::new();
        let mut is_null = false;
        for component in &components {
            let value = component[row];
            if value < 0 {
                is_null = true;
                break;
            }
            key.push_str(&value.to_string());
            key.push('-');
        }
        data.push(if is_null { NULL_INT } else { encoding.insert(&key) });
    }

    df.add_int_column(Column::new(name, data), Role::JoinKey)
}

/// Walks the data model and materializes every synthetic join key.
pub fn add_join_keys(
    data_model: &DataModel,
    peripheral_names: &[String],
    population_df: &mut DataFrame,
    peripheral_dfs: &mut [DataFrame],
    encoding: &Encoding,
) -> Result<()> {
    for i in 0..data_model.joined_tables.len() {
        let join_key = &data_model.join_keys_used[i];
        let other_join_key = &data_model.other_join_keys_used[i];

        if join_key == marker::NO_JOIN_KEY {
            let peripheral =
                find_data_frame(&data_model.joined_tables[i], peripheral_names, peripheral_dfs)?;
            add_jk(peripheral)?;
            add_jk(population_df)?;
        } else if join_key.contains(marker::MULTIPLE_JOIN_KEY_SEP) {
            let peripheral =
                find_data_frame(&data_model.joined_tables[i], peripheral_names, peripheral_dfs)?;
            concat_join_keys(other_join_key, encoding, peripheral)?;
            concat_join_keys(join_key, encoding, population_df)?;
        }

        // The joined table acts as the population of its own joins.
        let mut new_population = {
            let peripheral =
                find_data_frame(&data_model.joined_tables[i], peripheral_names, peripheral_dfs)?;
            peripheral.clone()
        };
        add_join_keys(
            &data_model.joined_tables[i],
            peripheral_names,
            &mut new_population,
            peripheral_dfs,
            encoding,
        )?;
        *find_data_frame(&data_model.joined_tables[i], peripheral_names, peripheral_dfs)? =
            new_population;
    }

    Ok(())
}

/// The shifted time-stamp columns required by one edge.
fn make_time_stamps(
    ts_name: &str,
    horizon: Float,
    memory: Float,
    df: &DataFrame,
) -> Result<Vec<Column<Float>>> {
    if ts_name.is_empty() {
        return Ok(Vec::new());
    }

    if df.time_stamps().is_empty() {
        return Err(RfeError::Data(format!(
            "DataFrame '{}' has no time stamps!",
            df.name()
        )));
    }

    let ts = df.time_stamp(ts_name)?;

    let mut columns = Vec::new();

    if horizon != 0.0 {
        let shifted: Vec<Float> = ts.iter().map(|&v| v + horizon).collect();
        columns.push(Column::new(make_ts_name(ts_name, horizon), shifted).with_unit(ts.unit()));
    }

    if memory > 0.0 {
        let shifted: Vec<Float> = ts.iter().map(|&v| v + horizon + memory).collect();
        columns.push(
            Column::new(make_ts_name(ts_name, horizon + memory), shifted).with_unit(ts.unit()),
        );
    }

    Ok(columns)
}

/// Adds the generated lower and upper bounds for one edge.
#[allow(clippy::too_many_arguments)]
fn add_ts(
    joined_table: &DataModel,
    ts_used: &str,
    upper_ts_used: &str,
    horizon: Float,
    memory: Float,
    peripheral_names: &[String],
    peripheral_dfs: &mut [DataFrame],
) -> Result<()> {
    if memory > 0.0 && !upper_ts_used.is_empty() {
        return Err(RfeError::Configuration(
            "You can either set an upper time stamp or memory, but not both!".to_string(),
        ));
    }

    if ts_used.is_empty() && horizon != 0.0 {
        return Err(RfeError::Configuration(
            "If the horizon is non-zero, you must pass a time stamp to the join."
                .to_string(),
        ));
    }

    if ts_used.is_empty() && memory > 0.0 {
        return Err(RfeError::Configuration(
            "If the memory is non-zero, you must pass a time stamp to the join."
                .to_string(),
        ));
    }

    let df = find_data_frame(joined_table, peripheral_names, peripheral_dfs)?;

    let columns = make_time_stamps(ts_used, horizon, memory, df)?;

    for column in columns {
        if !df.has_time_stamp(column.name()) {
            df.add_float_column(column, Role::TimeStamp)?;
        }
    }

    Ok(())
}

/// Walks the data model and materializes every generated time stamp.
pub fn add_time_stamps(
    data_model: &DataModel,
    peripheral_names: &[String],
    population_df: &mut DataFrame,
    peripheral_dfs: &mut [DataFrame],
) -> Result<()> {
    for i in 0..data_model.joined_tables.len() {
        if data_model.time_stamps_used[i] == marker::ROWID {
            add_rowid(population_df)?;
        }

        if data_model.other_time_stamps_used[i] == marker::ROWID {
            let df =
                find_data_frame(&data_model.joined_tables[i], peripheral_names, peripheral_dfs)?;
            add_rowid(df)?;
        }

        add_ts(
            &data_model.joined_tables[i],
            &data_model.other_time_stamps_used[i],
            &data_model.upper_time_stamps_used[i],
            data_model.horizon[i],
            data_model.memory[i],
            peripheral_names,
            peripheral_dfs,
        )?;

        let mut new_population = {
            let df =
                find_data_frame(&data_model.joined_tables[i], peripheral_names, peripheral_dfs)?;
            df.clone()
        };
        add_time_stamps(
            &data_model.joined_tables[i],
            peripheral_names,
            &mut new_population,
            peripheral_dfs,
        )?;
        *find_data_frame(&data_model.joined_tables[i], peripheral_names, peripheral_dfs)? =
            new_population;
    }

    Ok(())
}

/// Builds an index from join-key values to row numbers.
pub fn index_join_key(column: &[Int]) -> HashMap<Int, Vec<usize>> {
    let mut index: HashMap<Int, Vec<usize>> = HashMap::new();
    for (row, &key) in column.iter().enumerate() {
        if key >= 0 {
            index.entry(key).or_default().push(row);
        }
    }
    index
}
