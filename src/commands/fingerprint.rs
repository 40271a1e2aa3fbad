//! Fingerprints identify every cacheable artifact.
//!
//! A fingerprint is a tagged sum over everything that contributes to an
//! artifact's behavior: the component's kind, its full hyperparameters and
//! the fingerprints of every artifact it depends on. Because dependencies
//! are themselves fingerprints, any top-level fingerprint encodes its whole
//! transitive closure.
//!
//! Identity is the canonical JSON serialization: two fingerprints are equal
//! iff their textual forms are byte-identical. The canonical form is
//! computed eagerly at construction so lookups never serialize.

use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::commands::data_model::DataModel;
use crate::commands::hyperparameters::{
    FastPropHyperparams, LinearRegressionHyperparams, LogisticRegressionHyperparams,
    XGBoostHyperparams,
};
use crate::commands::pipeline_command::PreprocessorCommand;
use crate::helpers::Placeholder;
use crate::Int;

/// The variants of the fingerprint sum type.
///
/// Leaf variants (`OrdinaryDataFrame`, `ViewOp`, `DataModel`,
/// `TargetNumber`) carry no dependency list; every derived variant embeds
/// its own `dependencies`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum FingerprintValue {
    /// A data frame that was neither created by a view nor by a pipeline.
    OrdinaryDataFrame {
        name: String,
        last_change: String,
    },
    /// An opaque view operation, carried in its already-canonical form.
    ViewOp {
        view: serde_json::Value,
    },
    /// The declarative data model itself.
    DataModel(Box<DataModel>),
    /// A data frame that is the result of an entire pipeline.
    PipelineBuildHistory {
        dependencies: Vec<Fingerprint>,
        df_fingerprints: Vec<Fingerprint>,
    },

    CategoryTrimmer {
        dependencies: Vec<Fingerprint>,
        op: PreprocessorCommand,
    },
    EMailDomain {
        dependencies: Vec<Fingerprint>,
        op: PreprocessorCommand,
    },
    Imputation {
        dependencies: Vec<Fingerprint>,
        op: PreprocessorCommand,
    },
    Seasonal {
        dependencies: Vec<Fingerprint>,
        op: PreprocessorCommand,
    },
    Substring {
        dependencies: Vec<Fingerprint>,
        op: PreprocessorCommand,
    },
    TextFieldSplitter {
        dependencies: Vec<Fingerprint>,
        op: PreprocessorCommand,
    },

    FastProp {
        hyperparams: FastPropHyperparams,
        dependencies: Vec<Fingerprint>,
        peripheral: Vec<String>,
        placeholder: Placeholder,
        target_num: Int,
    },

    LinearRegression {
        hyperparams: LinearRegressionHyperparams,
        dependencies: Vec<Fingerprint>,
        autofeatures: Vec<Vec<usize>>,
        categorical_colnames: Vec<String>,
        numerical_colnames: Vec<String>,
    },
    LogisticRegression {
        hyperparams: LogisticRegressionHyperparams,
        dependencies: Vec<Fingerprint>,
        autofeatures: Vec<Vec<usize>>,
        categorical_colnames: Vec<String>,
        numerical_colnames: Vec<String>,
    },
    XGBoost {
        hyperparams: XGBoostHyperparams,
        dependencies: Vec<Fingerprint>,
        autofeatures: Vec<Vec<usize>>,
        categorical_colnames: Vec<String>,
        numerical_colnames: Vec<String>,
    },
    /// Distinguishes otherwise identical predictors fitted on different
    /// targets; appended to their dependency list.
    TargetNumber {
        target_num: usize,
    },
}

/// A fingerprint value together with its canonical textual form.
#[derive(Clone, Debug)]
pub struct Fingerprint {
    value: FingerprintValue,
    canonical: String,
}

impl Fingerprint {
    pub fn new(value: FingerprintValue) -> Self {
        // Fingerprint values are plain JSON-safe data; serialization cannot
        // fail for them.
        let canonical = serde_json::to_string(&value)
            .expect("fingerprint values always serialize");
        Self { value, canonical }
    }

    pub fn value(&self) -> &FingerprintValue {
        &self.value
    }

    /// The canonical textual form. Byte identity of this string is the
    /// identity contract.
    pub fn as_json(&self) -> &str {
        &self.canonical
    }

    pub fn from_json(json: &str) -> crate::Result<Self> {
        let value: FingerprintValue = serde_json::from_str(json)?;
        Ok(Self::new(value))
    }
}

impl PartialEq for Fingerprint {
    fn eq(&self, other: &Self) -> bool {
        self.canonical == other.canonical
    }
}

impl Eq for Fingerprint {}

impl PartialOrd for Fingerprint {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Fingerprint {
    fn cmp(&self, other: &Self) -> Ordering {
        self.canonical.cmp(&other.canonical)
    }
}

impl Hash for Fingerprint {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.canonical.hash(state);
    }
}

impl Serialize for Fingerprint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.value.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Fingerprint {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = FingerprintValue::deserialize(deserializer)?;
        Ok(Self::new(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn df_fingerprint(name: &str, last_change: &str) -> Fingerprint {
        Fingerprint::new(FingerprintValue::OrdinaryDataFrame {
            name: name.to_string(),
            last_change: last_change.to_string(),
        })
    }

    #[test]
    fn test_determinism() {
        let a = df_fingerprint("pop", "change-1");
        let b = df_fingerprint("pop", "change-1");
        assert_eq!(a, b);
        assert_eq!(a.as_json(), b.as_json());
    }

    #[test]
    fn test_dependency_inclusion() {
        let dep_a = df_fingerprint("pop", "change-1");
        let dep_b = df_fingerprint("pop", "change-2");

        let build = |dep: Fingerprint| {
            Fingerprint::new(FingerprintValue::PipelineBuildHistory {
                dependencies: vec![dep],
                df_fingerprints: vec![],
            })
        };

        assert_ne!(build(dep_a), build(dep_b));
    }

    #[test]
    fn test_serde_round_trip() {
        let fingerprint = Fingerprint::new(FingerprintValue::TargetNumber { target_num: 3 });
        let json = serde_json::to_string(&fingerprint).unwrap();
        let restored: Fingerprint = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, fingerprint);
        assert_eq!(restored.as_json(), fingerprint.as_json());
    }

    #[test]
    fn test_ordering_is_total() {
        let mut fingerprints = vec![
            df_fingerprint("b", "1"),
            df_fingerprint("a", "1"),
            df_fingerprint("a", "0"),
        ];
        fingerprints.sort();
        assert_eq!(fingerprints[0], df_fingerprint("a", "0"));
    }
}
