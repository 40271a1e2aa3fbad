use serde::{Deserialize, Serialize};

use crate::commands::Fingerprint;

/// The four fingerprint sets of a fitted pipeline.
///
/// Each set transitively covers everything before it: the preprocessor
/// fingerprints depend on the data-frame fingerprints, the feature-learner
/// fingerprints on the preprocessors, and the feature-selector
/// fingerprints on the learners. Equality of `fs_fingerprints` therefore
/// proves an identical configuration on identical inputs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Fingerprints {
    pub df_fingerprints: Vec<Fingerprint>,
    pub preprocessor_fingerprints: Vec<Fingerprint>,
    pub fl_fingerprints: Vec<Fingerprint>,
    pub fs_fingerprints: Vec<Fingerprint>,
}
