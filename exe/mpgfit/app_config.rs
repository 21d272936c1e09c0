use std::{path::PathBuf, time::Duration};

use mpgfit::{
  data::DataSource,
  model::{Activation, CompileOptions, FitOptions, ModelConfig, OptimizerConfig},
  WorkflowConfig,
};
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OptimizerKind {
  Adam,
  Sgd,
}

/// Defines the config file format (every field can be omitted).
/// Unset fields fall back to the library defaults.
#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
  /// Dataset URL
  pub url: Option<String>,
  /// Local dataset file, takes precedence over `url`
  pub data: Option<PathBuf>,
  /// Directory receiving charts and the run report
  pub out: Option<PathBuf>,
  pub timeout_secs: Option<u64>,
  pub epochs: Option<usize>,
  pub batch_size: Option<usize>,
  pub shuffle: Option<bool>,
  pub seed: Option<u64>,
  pub hidden_units: Option<usize>,
  pub activation: Option<Activation>,
  pub use_bias: Option<bool>,
  pub optimizer: Option<OptimizerKind>,
  pub learning_rate: Option<f64>,
}

impl AppConfig {
  // merge configs where the second overwrites the first
  pub fn merge(self, other: Self) -> Self {
    // `url` and `data` name one source; whichever side sets it owns both
    let (url, data) = if other.url.is_some() || other.data.is_some() {
      (other.url, other.data)
    } else {
      (self.url, self.data)
    };
    Self {
      url,
      data,
      out: other.out.or(self.out),
      timeout_secs: other.timeout_secs.or(self.timeout_secs),
      epochs: other.epochs.or(self.epochs),
      batch_size: other.batch_size.or(self.batch_size),
      shuffle: other.shuffle.or(self.shuffle),
      seed: other.seed.or(self.seed),
      hidden_units: other.hidden_units.or(self.hidden_units),
      activation: other.activation.or(self.activation),
      use_bias: other.use_bias.or(self.use_bias),
      optimizer: other.optimizer.or(self.optimizer),
      learning_rate: other.learning_rate.or(self.learning_rate),
    }
  }

  pub fn into_workflow_config(self) -> WorkflowConfig {
    let defaults = WorkflowConfig::default();
    let source = match (self.data, self.url) {
      (Some(path), _) => DataSource::File(path),
      (None, Some(url)) => DataSource::Url(url),
      (None, None) => defaults.source,
    };

    let learning_rate = self
      .learning_rate
      .unwrap_or_else(|| defaults.compile.optimizer.learning_rate());
    let optimizer = match self.optimizer {
      Some(OptimizerKind::Sgd) => OptimizerConfig::Sgd { learning_rate },
      Some(OptimizerKind::Adam) | None => OptimizerConfig::Adam { learning_rate },
    };

    WorkflowConfig {
      source,
      fetch_timeout: self.timeout_secs.map(Duration::from_secs),
      output_dir: self.out.unwrap_or(defaults.output_dir),
      model: ModelConfig {
        hidden_units: self.hidden_units.unwrap_or(defaults.model.hidden_units),
        activation: self.activation.unwrap_or(defaults.model.activation),
        use_bias: self.use_bias.unwrap_or(defaults.model.use_bias),
      },
      compile: CompileOptions {
        optimizer,
        ..defaults.compile
      },
      fit: FitOptions {
        epochs: self.epochs.unwrap_or(defaults.fit.epochs),
        batch_size: self.batch_size.unwrap_or(defaults.fit.batch_size),
        shuffle: self.shuffle.unwrap_or(defaults.fit.shuffle),
        seed: self.seed.unwrap_or(defaults.fit.seed),
      },
    }
  }
}
