//! Turns the declarative data model into the canonical placeholder tree.
//!
//! Horizon and memory are rewritten into explicit time-stamp column names,
//! to-many joins become placeholder children, and one-to-one or
//! many-to-one joins are inlined into a composite table name with their
//! carried columns qualified by a generated alias. Alias numbering walks
//! the join tree in pre-order, so the output is byte-stable.

use std::collections::BTreeSet;

use crate::commands::DataModel;
use crate::helpers::{marker, Placeholder};
use crate::{Float, Result, RfeError};

fn make_alias(num_alias: &mut usize) -> String {
    *num_alias += 1;
    format!("t{}", num_alias)
}

/// The name of the time-stamp column produced by shifting `ts_used` by
/// `diff`.
pub fn make_ts_name(ts_used: &str, diff: Float) -> String {
    marker::generated_ts_name(ts_used, diff)
}

/// Applies the horizon shift to the peripheral time-stamp names.
fn handle_horizon(data_model: &DataModel) -> Vec<String> {
    data_model
        .other_time_stamps_used
        .iter()
        .zip(&data_model.horizon)
        .map(|(ts, &horizon)| {
            if horizon == 0.0 {
                ts.clone()
            } else {
                make_ts_name(ts, horizon)
            }
        })
        .collect()
}

/// Converts memory into upper time-stamp names. Setting both an upper
/// time stamp and a positive memory on one edge is a configuration error.
fn handle_memory(data_model: &DataModel) -> Result<Vec<String>> {
    data_model
        .upper_time_stamps_used
        .iter()
        .zip(&data_model.other_time_stamps_used)
        .zip(data_model.horizon.iter().zip(&data_model.memory))
        .map(|((upper, other_ts), (&horizon, &memory))| {
            if memory <= 0.0 {
                return Ok(upper.clone());
            }
            if !upper.is_empty() {
                return Err(RfeError::Configuration(
                    "You can either set an upper time stamp or memory, but not both!"
                        .to_string(),
                ));
            }
            Ok(make_ts_name(other_ts, horizon + memory))
        })
        .collect()
}

/// Qualifies column names carried up from an inlined table.
fn make_colnames(table: &str, alias: &str, old_colnames: &[String]) -> Vec<String> {
    old_colnames
        .iter()
        .map(|colname| {
            if colname.is_empty() {
                String::new()
            } else {
                marker::make_colname(table, alias, colname)
            }
        })
        .collect()
}

/// Builds the placeholder for one data-model node. The alias of the node
/// itself is fixed by the caller; only inlined joins consume new aliases.
pub fn make_placeholder(
    data_model: &DataModel,
    _alias: &str,
    num_alias: &mut usize,
    is_population: bool,
) -> Result<Placeholder> {
    let other_time_stamps_used = handle_horizon(data_model);
    let upper_time_stamps_used = handle_memory(data_model)?;

    let mut result = Placeholder {
        name: if is_population {
            format!("{}{}", data_model.name, marker::POPULATION)
        } else {
            data_model.name.clone()
        },
        ..Default::default()
    };

    for i in 0..data_model.joined_tables.len() {
        let joined_model = &data_model.joined_tables[i];

        if data_model.relationship[i].is_to_many() {
            let joined =
                make_placeholder(joined_model, marker::T1_OR_T2, num_alias, false)?;

            result
                .allow_lagged_targets
                .push(data_model.allow_lagged_targets[i]);
            result.join_keys_used.push(data_model.join_keys_used[i].clone());
            result.joined_tables.push(joined);
            result
                .other_join_keys_used
                .push(data_model.other_join_keys_used[i].clone());
            result
                .other_time_stamps_used
                .push(other_time_stamps_used[i].clone());
            result.propositionalization.push(
                data_model.relationship[i]
                    == crate::commands::Relationship::Propositionalization,
            );
            result
                .time_stamps_used
                .push(data_model.time_stamps_used[i].clone());
            result
                .upper_time_stamps_used
                .push(upper_time_stamps_used[i].clone());

            continue;
        }

        // One-to-one or many-to-one: inline the joined table, qualifying
        // the columns it contributes and rolling its own edges up one
        // level.
        let join_alias = make_alias(num_alias);
        let joined = make_placeholder(joined_model, &join_alias, num_alias, false)?;
        let joined_name = &joined_model.name;

        result
            .allow_lagged_targets
            .extend(joined.allow_lagged_targets.iter().copied());
        result
            .join_keys_used
            .extend(make_colnames(joined_name, &join_alias, &joined.join_keys_used));
        result
            .other_join_keys_used
            .extend(joined.other_join_keys_used.iter().cloned());
        result.joined_tables.extend(joined.joined_tables.iter().cloned());
        result
            .other_time_stamps_used
            .extend(joined.other_time_stamps_used.iter().cloned());
        result
            .propositionalization
            .extend(joined.propositionalization.iter().copied());
        result
            .time_stamps_used
            .extend(make_colnames(joined_name, &join_alias, &joined.time_stamps_used));
        result
            .upper_time_stamps_used
            .extend(joined.upper_time_stamps_used.iter().cloned());

        let one_to_one =
            data_model.relationship[i] == crate::commands::Relationship::OneToOne;

        result.name.push_str(&marker::make_table_name(
            &data_model.join_keys_used[i],
            &data_model.other_join_keys_used[i],
            &data_model.time_stamps_used[i],
            &data_model.other_time_stamps_used[i],
            &data_model.upper_time_stamps_used[i],
            &joined.name,
            &join_alias,
            one_to_one,
        ));
    }

    Ok(result)
}

/// The placeholder for the population node, aliased `t1`.
pub fn make_population_placeholder(data_model: &DataModel) -> Result<Placeholder> {
    let mut num_alias = 1;
    make_placeholder(data_model, "t1", &mut num_alias, true)
}

fn extract_joined_tables(placeholder: &Placeholder, names: &mut BTreeSet<String>) {
    for joined in &placeholder.joined_tables {
        extract_joined_tables(joined, names);
        names.insert(joined.name.clone());
    }
}

/// The names of all peripheral tables reachable from the placeholder.
pub fn make_peripheral(placeholder: &Placeholder) -> Vec<String> {
    let mut names = BTreeSet::new();
    extract_joined_tables(placeholder, &mut names);
    names.into_iter().collect()
}
