//! Fingerprint-addressed caches.
//!
//! A tracker maps fingerprints to shared handles of fitted artifacts so
//! that identical work is never repeated within a project. Trackers are
//! add-only from the orchestrator's point of view; a cancelled fit simply
//! leaves a reusable prefix behind.

pub mod data_frame_tracker;
pub mod tracker;

pub use data_frame_tracker::DataFrameTracker;
pub use tracker::{DependencyTracker, Fingerprinted};

use std::sync::Arc;

use crate::featurelearners::FeatureLearner;
use crate::pipelines::check::Warnings;
use crate::predictors::Predictor;
use crate::preprocessors::Preprocessor;

pub type FeTracker = DependencyTracker<dyn FeatureLearner>;
pub type PredTracker = DependencyTracker<dyn Predictor>;
pub type PreprocessorTracker = DependencyTracker<dyn Preprocessor>;
pub type WarningTracker = DependencyTracker<Warnings>;

/// The five caches shared by every pipeline operation of a project.
#[derive(Clone)]
pub struct PipelineTrackers {
    pub data_frame_tracker: Arc<DataFrameTracker>,
    pub fe_tracker: Arc<FeTracker>,
    pub pred_tracker: Arc<PredTracker>,
    pub preprocessor_tracker: Arc<PreprocessorTracker>,
    pub warning_tracker: Arc<WarningTracker>,
}

impl PipelineTrackers {
    pub fn new() -> Self {
        Self {
            data_frame_tracker: Arc::new(DataFrameTracker::new()),
            fe_tracker: Arc::new(FeTracker::default()),
            pred_tracker: Arc::new(PredTracker::default()),
            preprocessor_tracker: Arc::new(PreprocessorTracker::default()),
            warning_tracker: Arc::new(WarningTracker::default()),
        }
    }

    /// Drops every cached artifact. Called when a project is switched.
    pub fn clear(&self) {
        self.data_frame_tracker.clear();
        self.fe_tracker.clear();
        self.pred_tracker.clear();
        self.preprocessor_tracker.clear();
        self.warning_tracker.clear();
    }
}

impl Default for PipelineTrackers {
    fn default() -> Self {
        Self::new()
    }
}
