use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// Nonlinearity applied after a dense layer's affine transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
  Linear,
  /// Bounded to (0, 1), which matches the range of the normalized labels.
  #[default]
  Sigmoid,
}

impl FromStr for Activation {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_ascii_lowercase().as_str() {
      "linear" | "none" => Ok(Activation::Linear),
      "sigmoid" => Ok(Activation::Sigmoid),
      other => Err(format!("unknown activation `{other}` (expected linear or sigmoid)")),
    }
  }
}

impl fmt::Display for Activation {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Activation::Linear => write!(f, "linear"),
      Activation::Sigmoid => write!(f, "sigmoid"),
    }
  }
}

/// Shape of the network built by [`create_model`](super::create_model): one scalar
/// input, `hidden_units` wide hidden layer, one scalar output followed by `activation`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
  pub hidden_units: usize,
  pub activation: Activation,
  pub use_bias: bool,
}

impl Default for ModelConfig {
  fn default() -> Self {
    Self {
      hidden_units: 50,
      activation: Activation::Sigmoid,
      use_bias: true,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DenseConfig {
  pub units: usize,
  /// Required on the first layer, inferred from the previous layer otherwise.
  pub input_units: Option<usize>,
  pub activation: Activation,
  pub use_bias: bool,
}

impl DenseConfig {
  pub fn new(units: usize) -> Self {
    Self {
      units,
      input_units: None,
      activation: Activation::Linear,
      use_bias: true,
    }
  }

  pub fn with_input_units(mut self, input_units: usize) -> Self {
    self.input_units = Some(input_units);
    self
  }

  pub fn with_activation(mut self, activation: Activation) -> Self {
    self.activation = activation;
    self
  }

  pub fn with_bias(mut self, use_bias: bool) -> Self {
    self.use_bias = use_bias;
    self
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum OptimizerConfig {
  Adam { learning_rate: f64 },
  Sgd { learning_rate: f64 },
}

impl OptimizerConfig {
  pub fn learning_rate(&self) -> f64 {
    match self {
      OptimizerConfig::Adam { learning_rate } | OptimizerConfig::Sgd { learning_rate } => *learning_rate,
    }
  }
}

impl Default for OptimizerConfig {
  fn default() -> Self {
    OptimizerConfig::Adam {
      learning_rate: 1e-3,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Loss {
  #[default]
  MeanSquaredError,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CompileOptions {
  pub optimizer: OptimizerConfig,
  pub loss: Loss,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FitOptions {
  pub epochs: usize,
  pub batch_size: usize,
  /// Reshuffle sample order at the start of every epoch.
  pub shuffle: bool,
  pub seed: u64,
}

impl Default for FitOptions {
  fn default() -> Self {
    Self {
      epochs: 50,
      batch_size: 32,
      shuffle: true,
      seed: 1,
    }
  }
}

/// Payload handed to [`EpochCallback::on_epoch_end`]. `loss` and `mse` are
/// sample-weighted means over the epoch's batches.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EpochLogs {
  pub epoch: usize,
  pub loss: f32,
  pub mse: f32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct History {
  pub epochs: Vec<EpochLogs>,
}

impl History {
  pub fn push(&mut self, logs: EpochLogs) {
    self.epochs.push(logs);
  }

  pub fn losses(&self) -> Vec<f32> {
    self.epochs.iter().map(|logs| logs.loss).collect()
  }

  pub fn last(&self) -> Option<&EpochLogs> {
    self.epochs.last()
  }
}

pub trait EpochCallback {
  fn on_epoch_end(&mut self, logs: &EpochLogs);

  fn on_train_end(&mut self, _history: &History) {}
}

impl<F: FnMut(&EpochLogs)> EpochCallback for F {
  fn on_epoch_end(&mut self, logs: &EpochLogs) {
    self(logs)
  }
}
