//! Feature learners generate numeric auto-features from the relational
//! structure.
//!
//! Learners are pluggable behind the `FeatureLearner` capability set. A
//! learner that cannot handle multiple targets is replicated per target by
//! the orchestrator, with the target number carried in its parameters and
//! fingerprint.

pub mod fast_prop;
pub mod feature_learner;

pub use fast_prop::FastProp;
pub use feature_learner::{
    parse, FeatureLearner, FeatureLearnerParams, FitParams, TransformParams, USE_ALL_TARGETS,
};
