use std::fmt;

use burn::tensor::backend::AutodiffBackend;
use serde::Serialize;
use tracing::debug;

use super::{
  dense::{Dense, Network},
  CompileOptions, DenseConfig, ModelError,
};
use crate::tensor::{column, read_values};

/// Anything that maps a batch of scalar inputs to scalar outputs.
pub trait Predict {
  fn predict(&self, inputs: &[f32]) -> Result<Vec<f32>, ModelError>;
}

/// Layer-by-layer model, built once and then compiled, fitted and queried.
#[derive(Debug)]
pub struct Sequential<B: AutodiffBackend> {
  pub(crate) network: Network<B>,
  pub(crate) device: B::Device,
  pub(crate) compiled: Option<CompileOptions>,
}

impl<B: AutodiffBackend> Sequential<B> {
  pub fn new(device: B::Device) -> Self {
    Self {
      network: Network { layers: Vec::new() },
      device,
      compiled: None,
    }
  }

  pub fn add(&mut self, config: DenseConfig) -> Result<&mut Self, ModelError> {
    if config.units == 0 {
      return Err(ModelError::ZeroUnits);
    }
    let inputs = match (self.network.layers.last(), config.input_units) {
      (None, None) => return Err(ModelError::MissingInputShape),
      (None, Some(declared)) => declared,
      (Some(previous), None) => previous.units(),
      (Some(previous), Some(declared)) if declared == previous.units() => declared,
      (Some(previous), Some(declared)) => {
        return Err(ModelError::ShapeMismatch {
          expected: declared,
          actual: previous.units(),
        })
      }
    };
    debug!(inputs, units = config.units, activation = %config.activation, "adding dense layer");
    self.network.layers.push(Dense::new(inputs, &config, &self.device));
    Ok(self)
  }

  /// Binds the loss and optimizer used by subsequent `fit` calls.
  pub fn compile(&mut self, options: CompileOptions) {
    self.compiled = Some(options);
  }

  pub fn is_compiled(&self) -> bool {
    self.compiled.is_some()
  }

  pub fn layer_count(&self) -> usize {
    self.network.layers.len()
  }

  pub fn summary(&self) -> ModelSummary {
    let layers: Vec<LayerSummary> = self
      .network
      .layers
      .iter()
      .enumerate()
      .map(|(i, layer)| LayerSummary {
        name: format!("dense_{}", i + 1),
        activation: layer.activation().to_string(),
        inputs: layer.inputs(),
        units: layer.units(),
        params: layer.param_count(),
      })
      .collect();
    let total_params = layers.iter().map(|l| l.params).sum();
    ModelSummary {
      layers,
      total_params,
    }
  }
}

impl<B: AutodiffBackend> Predict for Sequential<B> {
  fn predict(&self, inputs: &[f32]) -> Result<Vec<f32>, ModelError> {
    if self.network.layers.is_empty() {
      return Err(ModelError::NoLayers);
    }
    let output = self.network.forward(column::<B>(inputs.to_vec(), &self.device));
    Ok(read_values(output)?)
  }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayerSummary {
  pub name: String,
  pub activation: String,
  pub inputs: usize,
  pub units: usize,
  pub params: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelSummary {
  pub layers: Vec<LayerSummary>,
  pub total_params: usize,
}

impl fmt::Display for ModelSummary {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    writeln!(f, "{:<12} {:<14} {:<10} {:>8}", "Layer", "Output shape", "Activation", "Params")?;
    for layer in &self.layers {
      writeln!(
        f,
        "{:<12} {:<14} {:<10} {:>8}",
        layer.name,
        format!("[batch,{}]", layer.units),
        layer.activation,
        layer.params
      )?;
    }
    write!(f, "Total params: {}", self.total_params)
  }
}
