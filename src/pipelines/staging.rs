//! Executes the many-to-one merges encoded in composite table names.
//!
//! The placeholder builder inlines one-to-one and many-to-one joins into
//! the table name; this module parses those names back and materializes
//! the merged tables, qualifying every carried column with the alias the
//! join received during flattening.

use crate::containers::{Column, DataFrame, Role};
use crate::helpers::marker;
use crate::helpers::marker::JoinedTableDesc;
use crate::pipelines::modify_data_frames::index_join_key;
use crate::{Float, Result, RfeError, NULL_INT};

fn find_origin<'a>(
    name: &str,
    origin_names: &[String],
    origin_dfs: &'a [DataFrame],
) -> Result<&'a DataFrame> {
    origin_names
        .iter()
        .position(|n| n == name)
        .map(|i| &origin_dfs[i])
        .ok_or_else(|| {
            RfeError::Data(format!(
                "Table '{}' not among the peripheral tables.",
                name
            ))
        })
}

/// For each parent row, the matching child row (the latest one within the
/// time-stamp bounds, or the first match when no time stamp is involved).
fn match_rows(parent: &DataFrame, child: &DataFrame, join: &JoinedTableDesc) -> Result<Vec<Option<usize>>> {
    let parent_key = parent.join_key(&join.join_key_used)?;
    let child_key = child.join_key(&join.other_join_key_used)?;

    let index = index_join_key(child_key.data());

    let parent_ts = if join.time_stamp_used.is_empty() {
        None
    } else {
        Some(parent.time_stamp(&join.time_stamp_used)?)
    };
    let child_ts = if join.other_time_stamp_used.is_empty() {
        None
    } else {
        Some(child.time_stamp(&join.other_time_stamp_used)?)
    };
    let upper_ts = if join.upper_time_stamp_used.is_empty() {
        None
    } else {
        Some(child.time_stamp(&join.upper_time_stamp_used)?)
    };

    let matches = parent_key
        .iter()
        .enumerate()
        .map(|(row, &key)| {
            if key < 0 {
                return None;
            }
            let candidates = index.get(&key)?;
            match (parent_ts, child_ts) {
                (Some(parent_ts), Some(child_ts)) => {
                    let now = parent_ts[row];
                    candidates
                        .iter()
                        .copied()
                        .filter(|&r| {
                            child_ts[r] <= now
                                && upper_ts.map(|u| u[r] > now).unwrap_or(true)
                        })
                        .max_by(|&a, &b| {
                            child_ts[a]
                                .partial_cmp(&child_ts[b])
                                .unwrap_or(std::cmp::Ordering::Equal)
                        })
                }
                _ => candidates.first().copied(),
            }
        })
        .collect();

    Ok(matches)
}

/// Merges the child's columns onto the parent, one row per parent row.
/// Unmatched rows become nulls.
fn merge(parent: &mut DataFrame, child: &DataFrame, join: &JoinedTableDesc) -> Result<()> {
    let matches = match_rows(parent, child, join)?;

    let base = marker::base_table_name(&join.name);
    let qualify = |colname: &str| marker::make_colname(&base, &join.alias, colname);

    let gather_int = |column: &Column<i64>| -> Vec<i64> {
        matches
            .iter()
            .map(|m| m.map(|r| column[r]).unwrap_or(NULL_INT))
            .collect()
    };
    let gather_float = |column: &Column<Float>| -> Vec<Float> {
        matches
            .iter()
            .map(|m| m.map(|r| column[r]).unwrap_or(Float::NAN))
            .collect()
    };
    let gather_string = |column: &Column<String>| -> Vec<String> {
        matches
            .iter()
            .map(|m| m.map(|r| column[r].clone()).unwrap_or_default())
            .collect()
    };

    for column in child.categoricals() {
        let merged = Column::new(qualify(column.name()), gather_int(column))
            .with_unit(column.unit())
            .with_subroles(column.subroles().to_vec());
        parent.add_int_column(merged, Role::Categorical)?;
    }

    for column in child.join_keys() {
        if column.name() == join.other_join_key_used {
            continue;
        }
        let merged = Column::new(qualify(column.name()), gather_int(column))
            .with_unit(column.unit())
            .with_subroles(column.subroles().to_vec());
        parent.add_int_column(merged, Role::JoinKey)?;
    }

    for column in child.numericals() {
        let merged = Column::new(qualify(column.name()), gather_float(column))
            .with_unit(column.unit())
            .with_subroles(column.subroles().to_vec());
        parent.add_float_column(merged, Role::Numerical)?;
    }

    for column in child.time_stamps() {
        let merged = Column::new(qualify(column.name()), gather_float(column))
            .with_unit(column.unit())
            .with_subroles(column.subroles().to_vec());
        parent.add_float_column(merged, Role::TimeStamp)?;
    }

    for column in child.text_columns() {
        let merged = Column::new(qualify(column.name()), gather_string(column))
            .with_unit(column.unit())
            .with_subroles(column.subroles().to_vec());
        parent.add_string_column(merged, Role::Text)?;
    }

    Ok(())
}

/// Materializes one joined table from its composite name.
fn build_joined(
    joined_name: &str,
    origin_names: &[String],
    origin_dfs: &[DataFrame],
) -> Result<DataFrame> {
    let (prefix, joins) = marker::parse_table_name(joined_name);
    let base = marker::strip_population_suffix(&prefix);

    let mut result = find_origin(base, origin_names, origin_dfs)?.clone();

    for join in &joins {
        let child = build_joined(&join.name, origin_names, origin_dfs)?;
        merge(&mut result, &child, join)?;
    }

    result.set_name(joined_name);
    Ok(result)
}

/// Executes the many-to-one joins required by the data model.
///
/// The population keeps its (suffixed, possibly composite) placeholder
/// name; the peripheral set is rebuilt in the order of the joined
/// peripheral names.
pub fn join_tables(
    origin_peripheral_names: &[String],
    joined_population_name: &str,
    joined_peripheral_names: &[String],
    population_df: &DataFrame,
    peripheral_dfs: &[DataFrame],
) -> Result<(DataFrame, Vec<DataFrame>)> {
    let (_, population_joins) = marker::parse_table_name(joined_population_name);

    let mut new_population = population_df.clone();
    for join in &population_joins {
        let child = build_joined(&join.name, origin_peripheral_names, peripheral_dfs)?;
        merge(&mut new_population, &child, join)?;
    }
    new_population.set_name(joined_population_name);

    let mut new_peripherals = Vec::with_capacity(joined_peripheral_names.len());
    for name in joined_peripheral_names {
        new_peripherals.push(build_joined(name, origin_peripheral_names, peripheral_dfs)?);
    }

    Ok((new_population, new_peripherals))
}
