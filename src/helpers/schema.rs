use serde::{Deserialize, Serialize};

/// Role-partitioned column names of one table.
///
/// Two variants of a schema exist during a pipeline's life: the original
/// schema as supplied by the user and the modified schema extracted after
/// preprocessing, in which discrete columns have been split off the
/// numerical ones.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    pub name: String,
    pub categoricals: Vec<String>,
    pub discretes: Vec<String>,
    pub join_keys: Vec<String>,
    pub numericals: Vec<String>,
    pub targets: Vec<String>,
    pub text: Vec<String>,
    pub time_stamps: Vec<String>,
    pub unused_floats: Vec<String>,
    pub unused_strings: Vec<String>,
}

impl Schema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// All column names in role order.
    pub fn all_colnames(&self) -> Vec<String> {
        let mut names = Vec::new();
        names.extend(self.categoricals.iter().cloned());
        names.extend(self.discretes.iter().cloned());
        names.extend(self.join_keys.iter().cloned());
        names.extend(self.numericals.iter().cloned());
        names.extend(self.targets.iter().cloned());
        names.extend(self.text.iter().cloned());
        names.extend(self.time_stamps.iter().cloned());
        names.extend(self.unused_floats.iter().cloned());
        names.extend(self.unused_strings.iter().cloned());
        names
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.all_colnames().iter().any(|c| c == name)
    }
}
