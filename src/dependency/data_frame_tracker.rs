use std::sync::Arc;

use crate::commands::{Fingerprint, FingerprintValue};
use crate::containers::DataFrame;
use crate::dependency::tracker::DependencyTracker;

/// Caches materialized feature data frames.
///
/// The key is a build-history fingerprint derived from the fingerprints of
/// the configuration that produced the frame (`dependencies`) and of the
/// raw input frames. Equality of that single fingerprint proves the cached
/// frame was built by an identical configuration from identical inputs.
pub struct DataFrameTracker {
    tracker: DependencyTracker<DataFrame>,
}

impl DataFrameTracker {
    pub fn new() -> Self {
        Self {
            tracker: DependencyTracker::new(),
        }
    }

    /// The build-history fingerprint for a pipeline result.
    pub fn make_build_history(
        dependencies: &[Fingerprint],
        population: &DataFrame,
        peripherals: &[DataFrame],
    ) -> Fingerprint {
        let mut df_fingerprints = vec![population.fingerprint()];
        df_fingerprints.extend(peripherals.iter().map(DataFrame::fingerprint));
        Fingerprint::new(FingerprintValue::PipelineBuildHistory {
            dependencies: dependencies.to_vec(),
            df_fingerprints,
        })
    }

    pub fn retrieve(
        &self,
        dependencies: &[Fingerprint],
        population: &DataFrame,
        peripherals: &[DataFrame],
    ) -> Option<Arc<DataFrame>> {
        let fingerprint = Self::make_build_history(dependencies, population, peripherals);
        self.tracker.retrieve(&fingerprint)
    }

    pub fn add(
        &self,
        frame: DataFrame,
        dependencies: &[Fingerprint],
        population: &DataFrame,
        peripherals: &[DataFrame],
    ) {
        let fingerprint = Self::make_build_history(dependencies, population, peripherals);
        self.tracker.add_with_fingerprint(&fingerprint, Arc::new(frame));
    }

    pub fn clear(&self) {
        self.tracker.clear();
    }

    pub fn len(&self) -> usize {
        self.tracker.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracker.is_empty()
    }
}

impl Default for DataFrameTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::containers::{Column, Role};

    #[test]
    fn test_retrieve_requires_identical_inputs() {
        let tracker = DataFrameTracker::new();

        let mut population = DataFrame::new("pop");
        population
            .add_float_column(Column::new("x", vec![1.0]), Role::Numerical)
            .unwrap();

        let result = DataFrame::new("result");

        tracker.add(result, &[], &population, &[]);
        assert!(tracker.retrieve(&[], &population, &[]).is_some());

        // Mutating the input invalidates the cache entry.
        population
            .add_float_column(Column::new("y", vec![2.0]), Role::Numerical)
            .unwrap();
        assert!(tracker.retrieve(&[], &population, &[]).is_none());
    }
}
