use serde::{Deserialize, Serialize};

use crate::{Float, Result, RfeError};

/// The relationship of a join edge.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Relationship {
    #[serde(rename = "many-to-many")]
    ManyToMany,
    #[serde(rename = "many-to-one")]
    ManyToOne,
    #[serde(rename = "one-to-many")]
    OneToMany,
    #[serde(rename = "one-to-one")]
    OneToOne,
    #[serde(rename = "propositionalization")]
    Propositionalization,
}

impl Relationship {
    /// Whether the joined table keeps its own rows (and therefore becomes a
    /// placeholder child) instead of being inlined into its parent.
    pub fn is_to_many(&self) -> bool {
        matches!(
            self,
            Relationship::ManyToMany | Relationship::OneToMany | Relationship::Propositionalization
        )
    }
}

/// Role assignment per column of one table.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Roles {
    pub categorical: Vec<String>,
    pub join_key: Vec<String>,
    pub numerical: Vec<String>,
    pub target: Vec<String>,
    pub text: Vec<String>,
    pub time_stamp: Vec<String>,
    pub unused_float: Vec<String>,
    pub unused_string: Vec<String>,
}

/// The data model as declared by the caller.
///
/// A recursive value: each node names a table and describes its join edges
/// through parallel vectors. Memory and horizon are not resolved yet; the
/// staging rewriter turns them into explicit time-stamp columns.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DataModel {
    pub name: String,
    pub allow_lagged_targets: Vec<bool>,
    pub horizon: Vec<Float>,
    pub join_keys_used: Vec<String>,
    pub joined_tables: Vec<DataModel>,
    pub memory: Vec<Float>,
    pub other_join_keys_used: Vec<String>,
    pub other_time_stamps_used: Vec<String>,
    pub relationship: Vec<Relationship>,
    pub roles: Roles,
    pub time_stamps_used: Vec<String>,
    pub upper_time_stamps_used: Vec<String>,
}

/// One join edge, used to build up a data model programmatically.
#[derive(Clone, Debug)]
pub struct Join {
    pub table: DataModel,
    pub relationship: Relationship,
    pub join_key: String,
    pub other_join_key: String,
    pub time_stamp: String,
    pub other_time_stamp: String,
    pub upper_time_stamp: String,
    pub horizon: Float,
    pub memory: Float,
    pub allow_lagged_targets: bool,
}

impl Join {
    pub fn new(table: DataModel) -> Self {
        Self {
            table,
            relationship: Relationship::ManyToMany,
            join_key: String::new(),
            other_join_key: String::new(),
            time_stamp: String::new(),
            other_time_stamp: String::new(),
            upper_time_stamp: String::new(),
            horizon: 0.0,
            memory: 0.0,
            allow_lagged_targets: false,
        }
    }
}

impl DataModel {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Appends a join edge, keeping all per-edge vectors in lockstep.
    ///
    /// If only one of the two join keys (or time stamps) is given, it is
    /// used for both sides, matching the convention of the client API.
    pub fn with_join(mut self, join: Join) -> Self {
        let other_join_key = if join.other_join_key.is_empty() {
            join.join_key.clone()
        } else {
            join.other_join_key
        };
        let other_time_stamp = if join.other_time_stamp.is_empty() {
            join.time_stamp.clone()
        } else {
            join.other_time_stamp
        };
        self.allow_lagged_targets.push(join.allow_lagged_targets);
        self.horizon.push(join.horizon);
        self.join_keys_used.push(join.join_key);
        self.joined_tables.push(join.table);
        self.memory.push(join.memory);
        self.other_join_keys_used.push(other_join_key);
        self.other_time_stamps_used.push(other_time_stamp);
        self.relationship.push(join.relationship);
        self.time_stamps_used.push(join.time_stamp);
        self.upper_time_stamps_used.push(join.upper_time_stamp);
        self
    }

    /// Checks that every per-edge vector matches `joined_tables` in length,
    /// recursively. This is the construction-time invariant of the data
    /// model.
    pub fn check_lengths(&self) -> Result<()> {
        let expected = self.joined_tables.len();

        let check = |name: &str, actual: usize| -> Result<()> {
            if actual != expected {
                return Err(RfeError::Configuration(format!(
                    "Length of '{}' does not match length of 'joined_tables'. \
                     Length of 'joined_tables': {}, length of '{}': {}.",
                    name, expected, name, actual
                )));
            }
            Ok(())
        };

        check("allow_lagged_targets", self.allow_lagged_targets.len())?;
        check("horizon", self.horizon.len())?;
        check("join_keys_used", self.join_keys_used.len())?;
        check("memory", self.memory.len())?;
        check("other_join_keys_used", self.other_join_keys_used.len())?;
        check("other_time_stamps_used", self.other_time_stamps_used.len())?;
        check("relationship", self.relationship.len())?;
        check("time_stamps_used", self.time_stamps_used.len())?;
        check("upper_time_stamps_used", self.upper_time_stamps_used.len())?;

        for joined in &self.joined_tables {
            joined.check_lengths()?;
        }

        Ok(())
    }

    /// Parses and validates a data model from its JSON form.
    pub fn from_json(json: &str) -> Result<Self> {
        let data_model: DataModel = serde_json::from_str(json)
            .map_err(|e| RfeError::Configuration(format!("Could not parse data model: {}", e)))?;
        data_model.check_lengths()?;
        Ok(data_model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_join_keeps_vectors_parallel() {
        let data_model = DataModel::new("population").with_join(Join {
            join_key: "id".to_string(),
            time_stamp: "ts".to_string(),
            memory: 7.0,
            ..Join::new(DataModel::new("trans"))
        });
        assert!(data_model.check_lengths().is_ok());
        assert_eq!(data_model.other_join_keys_used, vec!["id"]);
        assert_eq!(data_model.other_time_stamps_used, vec!["ts"]);
    }

    #[test]
    fn test_check_lengths_rejects_mismatch() {
        let mut data_model = DataModel::new("population").with_join(Join {
            join_key: "id".to_string(),
            ..Join::new(DataModel::new("trans"))
        });
        data_model.horizon.push(1.0);
        let err = data_model.check_lengths().unwrap_err();
        assert!(err.to_string().contains("horizon"));
    }

    #[test]
    fn test_from_json_validates() {
        let data_model = DataModel::new("population").with_join(Join {
            join_key: "id".to_string(),
            ..Join::new(DataModel::new("trans"))
        });
        let json = serde_json::to_string(&data_model).unwrap();
        let restored = DataModel::from_json(&json).unwrap();
        assert_eq!(restored, data_model);
    }

    #[test]
    fn test_is_to_many() {
        assert!(Relationship::ManyToMany.is_to_many());
        assert!(Relationship::OneToMany.is_to_many());
        assert!(Relationship::Propositionalization.is_to_many());
        assert!(!Relationship::ManyToOne.is_to_many());
        assert!(!Relationship::OneToOne.is_to_many());
    }
}
