use chrono::Utc;

use crate::commands::PipelineCommand;
use crate::helpers::Placeholder;
use crate::metrics::Scores;
use crate::pipelines::make_placeholder;
use crate::{Float, Result};

/// A pipeline definition together with its evaluation history.
///
/// The command is immutable; fitting produces a separate `FittedPipeline`
/// value. Scores accumulate across fits and scoring runs.
#[derive(Clone, Debug)]
pub struct Pipeline {
    command: PipelineCommand,
    scores: Scores,
    creation_time: String,
}

impl Pipeline {
    pub fn new(command: PipelineCommand) -> Result<Self> {
        command.validate()?;
        Ok(Self {
            command,
            scores: Scores::new(),
            creation_time: Utc::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        })
    }

    pub fn command(&self) -> &PipelineCommand {
        &self.command
    }

    pub fn name(&self) -> &str {
        &self.command.name
    }

    pub fn scores(&self) -> &Scores {
        &self.scores
    }

    pub fn scores_mut(&mut self) -> &mut Scores {
        &mut self.scores
    }

    pub fn creation_time(&self) -> &str {
        &self.creation_time
    }

    pub fn allow_http(&self) -> bool {
        self.command.allow_http
    }

    pub fn include_categorical(&self) -> bool {
        self.command.include_categorical
    }

    pub fn share_selected_features(&self) -> Float {
        self.command.share_selected_features
    }

    /// The name of the population table, as declared in the data model.
    pub fn parse_population(&self) -> &str {
        &self.command.data_model.name
    }

    /// The user-declared peripheral names, in the order the peripheral
    /// data frames are passed.
    pub fn parse_peripheral(&self) -> &[String] {
        &self.command.peripheral
    }

    /// The canonical placeholder and the names of the peripheral tables
    /// reachable from it.
    pub fn make_placeholder(&self) -> Result<(Placeholder, Vec<String>)> {
        let placeholder =
            make_placeholder::make_population_placeholder(&self.command.data_model)?;
        let peripheral = make_placeholder::make_peripheral(&placeholder);
        Ok((placeholder, peripheral))
    }
}
