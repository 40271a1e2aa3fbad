use serde::{Deserialize, Serialize};

use crate::helpers::ColumnDescription;
use crate::metrics::Metrics;
use crate::Float;

/// The persistent evaluation record of a pipeline.
///
/// Append-only within a process: every scoring run pushes onto `history`.
/// Importances are stored transposed, one row per column/feature, one
/// entry per target.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Scores {
    pub history: Vec<Metrics>,
    pub column_descriptions: Vec<ColumnDescription>,
    pub column_importances: Vec<Vec<Float>>,
    pub feature_names: Vec<String>,
    pub feature_importances: Vec<Vec<Float>>,
}

impl Scores {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a metric set to the history.
    pub fn to_history(&mut self, metrics: Metrics) {
        self.history.push(metrics);
    }

    /// The most recent metric set, if any.
    pub fn latest(&self) -> Option<&Metrics> {
        self.history.last()
    }

    pub fn set_column_importances(
        &mut self,
        descriptions: Vec<ColumnDescription>,
        importances: Vec<Vec<Float>>,
    ) {
        self.column_descriptions = descriptions;
        self.column_importances = importances;
    }

    pub fn set_feature_importances(
        &mut self,
        names: Vec<String>,
        importances: Vec<Vec<Float>>,
    ) {
        self.feature_names = names;
        self.feature_importances = importances;
    }
}

/// Transposes a per-target matrix into a per-item matrix.
pub fn transpose(rows: &[Vec<Float>]) -> Vec<Vec<Float>> {
    let Some(first) = rows.first() else {
        return Vec::new();
    };
    (0..first.len())
        .map(|i| rows.iter().map(|row| row[i]).collect())
        .collect()
}
