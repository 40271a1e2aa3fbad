use serde::{Deserialize, Serialize};

/// The canonical form of a data model after staging.
///
/// Many-to-one chains have been inlined into composite table names, every
/// memory/horizon pair has been rewritten into explicit upper/lower
/// time-stamp column names, and the remaining to-many joins appear as
/// children. All per-edge vectors run parallel to `joined_tables`.
///
/// A placeholder serializes to the same bytes for the same data model,
/// which makes it safe to embed in fingerprints.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Placeholder {
    pub name: String,
    pub allow_lagged_targets: Vec<bool>,
    pub join_keys_used: Vec<String>,
    pub joined_tables: Vec<Placeholder>,
    pub other_join_keys_used: Vec<String>,
    pub other_time_stamps_used: Vec<String>,
    pub propositionalization: Vec<bool>,
    pub time_stamps_used: Vec<String>,
    pub upper_time_stamps_used: Vec<String>,
}

impl Placeholder {
    pub fn num_joins(&self) -> usize {
        self.joined_tables.len()
    }
}
