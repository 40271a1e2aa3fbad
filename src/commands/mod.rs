//! Declarative command values sent to the engine.
//!
//! Everything in this module is plain serializable data: the data model,
//! the pipeline definition, the hyperparameter sets and the fingerprints
//! derived from all of them.

pub mod data_model;
pub mod fingerprint;
pub mod hyperparameters;
pub mod pipeline_command;

pub use data_model::{DataModel, Join, Relationship, Roles};
pub use fingerprint::{Fingerprint, FingerprintValue};
pub use hyperparameters::{
    Aggregation, FastPropHyperparams, LinearRegressionHyperparams, LogisticRegressionHyperparams,
    LossFunction, XGBoostHyperparams, XGBoostObjective,
};
pub use pipeline_command::{
    FeatureLearnerCommand, PipelineCommand, PredictorCommand, PreprocessorCommand,
};
