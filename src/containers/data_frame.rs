use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::commands::{Fingerprint, FingerprintValue};
use crate::containers::Column;
use crate::helpers::Schema;
use crate::{Float, Int, Result, RfeError};

/// Monotonic source for last-change markers.
static CHANGE_COUNTER: AtomicU64 = AtomicU64::new(0);

fn next_change_marker() -> String {
    format!("change-{}", CHANGE_COUNTER.fetch_add(1, Ordering::Relaxed))
}

/// The role a column plays within a data frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    Categorical,
    JoinKey,
    Numerical,
    Target,
    TimeStamp,
    Text,
    UnusedFloat,
    UnusedString,
}

/// A runtime table with role-partitioned, typed columns.
///
/// Int columns hold categoricals and join keys, Float columns hold
/// numericals, targets and time stamps, String columns hold text and unused
/// strings. All columns of a frame have the same number of rows; this is
/// enforced on insertion.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct DataFrame {
    name: String,
    last_change: String,
    categoricals: Vec<Column<Int>>,
    join_keys: Vec<Column<Int>>,
    numericals: Vec<Column<Float>>,
    targets: Vec<Column<Float>>,
    time_stamps: Vec<Column<Float>>,
    text: Vec<Column<String>>,
    unused_floats: Vec<Column<Float>>,
    unused_strings: Vec<Column<String>>,
}

impl DataFrame {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            last_change: next_change_marker(),
            ..Default::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
        self.touch();
    }

    pub fn last_change(&self) -> &str {
        &self.last_change
    }

    fn touch(&mut self) {
        self.last_change = next_change_marker();
    }

    /// Number of rows, taken from the first non-empty role partition.
    pub fn nrows(&self) -> usize {
        self.categoricals
            .first()
            .map(Column::len)
            .or_else(|| self.join_keys.first().map(Column::len))
            .or_else(|| self.numericals.first().map(Column::len))
            .or_else(|| self.targets.first().map(Column::len))
            .or_else(|| self.time_stamps.first().map(Column::len))
            .or_else(|| self.text.first().map(Column::len))
            .or_else(|| self.unused_floats.first().map(Column::len))
            .or_else(|| self.unused_strings.first().map(Column::len))
            .unwrap_or(0)
    }

    pub fn ncols(&self) -> usize {
        self.categoricals.len()
            + self.join_keys.len()
            + self.numericals.len()
            + self.targets.len()
            + self.time_stamps.len()
            + self.text.len()
            + self.unused_floats.len()
            + self.unused_strings.len()
    }

    fn check_length(&self, len: usize, name: &str) -> Result<()> {
        let nrows = self.nrows();
        if self.ncols() > 0 && len != nrows {
            return Err(RfeError::Data(format!(
                "Column '{}' has {} rows, but data frame '{}' has {}.",
                name, len, self.name, nrows
            )));
        }
        Ok(())
    }

    pub fn add_int_column(&mut self, column: Column<Int>, role: Role) -> Result<()> {
        self.check_length(column.len(), column.name())?;
        match role {
            Role::Categorical => self.categoricals.push(column),
            Role::JoinKey => self.join_keys.push(column),
            other => {
                return Err(RfeError::Data(format!(
                    "Cannot add an integer column with role {:?}.",
                    other
                )))
            }
        }
        self.touch();
        Ok(())
    }

    pub fn add_float_column(&mut self, column: Column<Float>, role: Role) -> Result<()> {
        self.check_length(column.len(), column.name())?;
        match role {
            Role::Numerical => self.numericals.push(column),
            Role::Target => self.targets.push(column),
            Role::TimeStamp => self.time_stamps.push(column),
            Role::UnusedFloat => self.unused_floats.push(column),
            other => {
                return Err(RfeError::Data(format!(
                    "Cannot add a float column with role {:?}.",
                    other
                )))
            }
        }
        self.touch();
        Ok(())
    }

    pub fn add_string_column(&mut self, column: Column<String>, role: Role) -> Result<()> {
        self.check_length(column.len(), column.name())?;
        match role {
            Role::Text => self.text.push(column),
            Role::UnusedString => self.unused_strings.push(column),
            other => {
                return Err(RfeError::Data(format!(
                    "Cannot add a string column with role {:?}.",
                    other
                )))
            }
        }
        self.touch();
        Ok(())
    }

    /// Removes the first column of any role with the given name. Returns
    /// whether a column was removed.
    pub fn remove_column(&mut self, name: &str) -> bool {
        fn remove_from<T>(cols: &mut Vec<Column<T>>, name: &str) -> bool {
            if let Some(pos) = cols.iter().position(|c| c.name() == name) {
                cols.remove(pos);
                return true;
            }
            false
        }

        let removed = remove_from(&mut self.categoricals, name)
            || remove_from(&mut self.join_keys, name)
            || remove_from(&mut self.numericals, name)
            || remove_from(&mut self.targets, name)
            || remove_from(&mut self.time_stamps, name)
            || remove_from(&mut self.text, name)
            || remove_from(&mut self.unused_floats, name)
            || remove_from(&mut self.unused_strings, name);

        if removed {
            self.touch();
        }

        removed
    }

    // ------------------------------------------------------------------
    // Typed accessors

    pub fn categoricals(&self) -> &[Column<Int>] {
        &self.categoricals
    }

    pub fn join_keys(&self) -> &[Column<Int>] {
        &self.join_keys
    }

    pub fn numericals(&self) -> &[Column<Float>] {
        &self.numericals
    }

    pub fn targets(&self) -> &[Column<Float>] {
        &self.targets
    }

    pub fn time_stamps(&self) -> &[Column<Float>] {
        &self.time_stamps
    }

    pub fn text_columns(&self) -> &[Column<String>] {
        &self.text
    }

    pub fn unused_floats(&self) -> &[Column<Float>] {
        &self.unused_floats
    }

    pub fn unused_strings(&self) -> &[Column<String>] {
        &self.unused_strings
    }

    pub fn num_targets(&self) -> usize {
        self.targets.len()
    }

    fn find<'a, T>(cols: &'a [Column<T>], name: &str, role: &str, df: &str) -> Result<&'a Column<T>> {
        cols.iter().find(|c| c.name() == name).ok_or_else(|| {
            RfeError::Data(format!(
                "Data frame '{}' has no {} column named '{}'.",
                df, role, name
            ))
        })
    }

    pub fn categorical(&self, name: &str) -> Result<&Column<Int>> {
        Self::find(&self.categoricals, name, "categorical", &self.name)
    }

    pub fn join_key(&self, name: &str) -> Result<&Column<Int>> {
        Self::find(&self.join_keys, name, "join key", &self.name)
    }

    pub fn numerical(&self, name: &str) -> Result<&Column<Float>> {
        Self::find(&self.numericals, name, "numerical", &self.name)
    }

    pub fn time_stamp(&self, name: &str) -> Result<&Column<Float>> {
        Self::find(&self.time_stamps, name, "time stamp", &self.name)
    }

    pub fn text(&self, name: &str) -> Result<&Column<String>> {
        Self::find(&self.text, name, "text", &self.name)
    }

    pub fn unused_string(&self, name: &str) -> Result<&Column<String>> {
        Self::find(&self.unused_strings, name, "unused string", &self.name)
    }

    pub fn target_by_name(&self, name: &str) -> Result<&Column<Float>> {
        Self::find(&self.targets, name, "target", &self.name)
    }

    pub fn target(&self, index: usize) -> Result<&Column<Float>> {
        self.targets.get(index).ok_or_else(|| {
            RfeError::Data(format!(
                "Data frame '{}' has no target number {}.",
                self.name, index
            ))
        })
    }

    pub fn has_join_key(&self, name: &str) -> bool {
        self.join_keys.iter().any(|c| c.name() == name)
    }

    pub fn has_time_stamp(&self, name: &str) -> bool {
        self.time_stamps.iter().any(|c| c.name() == name)
    }

    pub fn has_categorical(&self, name: &str) -> bool {
        self.categoricals.iter().any(|c| c.name() == name)
    }

    // ------------------------------------------------------------------

    /// Extracts the role-partitioned schema.
    ///
    /// When `separate_discrete` is set, numerical columns whose finite
    /// values are all whole numbers are reported as discrete instead.
    pub fn to_schema(&self, separate_discrete: bool) -> Schema {
        let names = |cols: &[Column<Int>]| cols.iter().map(|c| c.name().to_string()).collect();
        let fnames = |cols: &[Column<Float>]| -> Vec<String> {
            cols.iter().map(|c| c.name().to_string()).collect()
        };
        let snames = |cols: &[Column<String>]| cols.iter().map(|c| c.name().to_string()).collect();

        let mut numericals = Vec::new();
        let mut discretes = Vec::new();

        for col in &self.numericals {
            let is_discrete = separate_discrete
                && col
                    .iter()
                    .filter(|v| v.is_finite())
                    .all(|v| v.fract() == 0.0);
            if is_discrete {
                discretes.push(col.name().to_string());
            } else {
                numericals.push(col.name().to_string());
            }
        }

        Schema {
            name: self.name.clone(),
            categoricals: names(&self.categoricals),
            discretes,
            join_keys: names(&self.join_keys),
            numericals,
            targets: fnames(&self.targets),
            text: snames(&self.text),
            time_stamps: fnames(&self.time_stamps),
            unused_floats: fnames(&self.unused_floats),
            unused_strings: snames(&self.unused_strings),
        }
    }

    /// The identity of this frame for caching purposes.
    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint::new(FingerprintValue::OrdinaryDataFrame {
            name: self.name.clone(),
            last_change: self.last_change.clone(),
        })
    }
}
