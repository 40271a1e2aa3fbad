//! Process-wide registry of pipelines and data frames.
//!
//! One project is open at a time; switching projects clears the trackers.
//! Access goes through a single reader-writer lock: readers run
//! concurrently, and a fit performs its multi-second algorithmic work
//! under an upgradable read lock, taking the write lock only for the
//! final registry mutation.

use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::{RwLock, RwLockUpgradableReadGuard};

use crate::containers::{DataFrame, Encoding};
use crate::dependency::PipelineTrackers;
use crate::logging::ProgressLogger;
use crate::metrics::Scores;
use crate::pipelines::fit::{self, FitParams};
use crate::pipelines::transform::{self, TransformOutput, TransformParams};
use crate::pipelines::{FittedPipeline, Pipeline};
use crate::{Result, RfeError};

/// The global project manager.
pub static PROJECT_MANAGER: Lazy<ProjectManager> = Lazy::new(ProjectManager::new);

struct PipelineEntry {
    pipeline: Pipeline,
    fitted: Option<Arc<FittedPipeline>>,
}

/// One open project: its registry, its categories and its trackers.
pub struct Project {
    name: String,
    categories: Arc<Encoding>,
    trackers: PipelineTrackers,
    pipelines: HashMap<String, PipelineEntry>,
    data_frames: HashMap<String, DataFrame>,
}

impl Project {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            categories: Arc::new(Encoding::new()),
            trackers: PipelineTrackers::new(),
            pipelines: HashMap::new(),
            data_frames: HashMap::new(),
        }
    }
}

pub struct ProjectManager {
    project: RwLock<Option<Project>>,
}

impl ProjectManager {
    pub fn new() -> Self {
        Self {
            project: RwLock::new(None),
        }
    }

    /// Opens a project, clearing the previous project's trackers.
    pub fn open_project(&self, name: &str) {
        let mut guard = self.project.write();
        if let Some(previous) = guard.as_ref() {
            if previous.name == name {
                return;
            }
            previous.trackers.clear();
        }
        *guard = Some(Project::new(name));
    }

    pub fn project_name(&self) -> Option<String> {
        self.project.read().as_ref().map(|p| p.name.clone())
    }

    pub fn add_data_frame(&self, df: DataFrame) -> Result<()> {
        let mut guard = self.project.write();
        let project = guard
            .as_mut()
            .ok_or_else(|| RfeError::Configuration("No project is open.".to_string()))?;
        project.data_frames.insert(df.name().to_string(), df);
        Ok(())
    }

    pub fn get_data_frame(&self, name: &str) -> Result<DataFrame> {
        let guard = self.project.read();
        let project = guard
            .as_ref()
            .ok_or_else(|| RfeError::Configuration("No project is open.".to_string()))?;
        project.data_frames.get(name).cloned().ok_or_else(|| {
            RfeError::Data(format!("Data frame '{}' not found.", name))
        })
    }

    pub fn add_pipeline(&self, pipeline: Pipeline) -> Result<()> {
        let mut guard = self.project.write();
        let project = guard
            .as_mut()
            .ok_or_else(|| RfeError::Configuration("No project is open.".to_string()))?;
        project.pipelines.insert(
            pipeline.name().to_string(),
            PipelineEntry {
                pipeline,
                fitted: None,
            },
        );
        Ok(())
    }

    pub fn categories(&self) -> Result<Arc<Encoding>> {
        let guard = self.project.read();
        let project = guard
            .as_ref()
            .ok_or_else(|| RfeError::Configuration("No project is open.".to_string()))?;
        Ok(project.categories.clone())
    }

    /// Fits a registered pipeline.
    ///
    /// The algorithmic work runs under the upgradable read lock so
    /// concurrent readers are not starved; only the final registry update
    /// upgrades to a write lock.
    pub fn fit_pipeline(
        &self,
        name: &str,
        population_df: &DataFrame,
        peripheral_dfs: &[DataFrame],
        validation_df: Option<&DataFrame>,
    ) -> Result<Scores> {
        let guard = self.project.upgradable_read();

        let (pipeline, categories, trackers) = {
            let project = guard
                .as_ref()
                .ok_or_else(|| RfeError::Configuration("No project is open.".to_string()))?;
            let entry = project.pipelines.get(name).ok_or_else(|| {
                RfeError::Data(format!("Pipeline '{}' not found.", name))
            })?;
            (
                entry.pipeline.clone(),
                project.categories.clone(),
                project.trackers.clone(),
            )
        };

        let params = FitParams {
            trackers: &trackers,
            categories: &categories,
            logger: ProgressLogger::stdout(),
            population_df,
            peripheral_dfs,
            validation_df,
        };

        let (fitted, scores) = fit::fit(&pipeline, &params)?;

        let mut write_guard = RwLockUpgradableReadGuard::upgrade(guard);
        let project = write_guard
            .as_mut()
            .ok_or_else(|| RfeError::Configuration("No project is open.".to_string()))?;
        let entry = project
            .pipelines
            .get_mut(name)
            .ok_or_else(|| RfeError::Data(format!("Pipeline '{}' not found.", name)))?;

        entry.fitted = Some(fitted);
        *entry.pipeline.scores_mut() = scores.clone();

        Ok(scores)
    }

    /// Transforms new data through a fitted pipeline.
    pub fn transform_pipeline(
        &self,
        name: &str,
        population_df: &DataFrame,
        peripheral_dfs: &[DataFrame],
        predict: bool,
        score: bool,
        table_name: Option<String>,
    ) -> Result<TransformOutput> {
        let guard = self.project.read();
        let project = guard
            .as_ref()
            .ok_or_else(|| RfeError::Configuration("No project is open.".to_string()))?;
        let entry = project
            .pipelines
            .get(name)
            .ok_or_else(|| RfeError::Data(format!("Pipeline '{}' not found.", name)))?;
        let fitted = entry.fitted.as_ref().ok_or_else(|| {
            RfeError::Configuration(format!("Pipeline '{}' has not been fitted.", name))
        })?;

        let params = TransformParams {
            trackers: &project.trackers,
            categories: &project.categories,
            logger: ProgressLogger::stdout(),
            population_df,
            peripheral_dfs,
            predict,
            score,
            table_name,
        };

        transform::transform(&entry.pipeline, fitted, &params)
    }
}

impl Default for ProjectManager {
    fn default() -> Self {
        Self::new()
    }
}
