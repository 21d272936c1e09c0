pub mod dense;
pub mod sequential;
pub mod training;
pub mod types;

use std::sync::{Mutex, PoisonError};

use burn::tensor::backend::AutodiffBackend;
use thiserror::Error;
use tracing::info;

use crate::tensor::{column, ReadbackError};

pub use sequential::*;
pub use training::ExponentialAverage;
pub use types::*;

#[derive(Debug, Error)]
pub enum ModelError {
  #[error("the first layer must declare its input units")]
  MissingInputShape,
  #[error("layer declares {expected} input units but the previous layer has {actual}")]
  ShapeMismatch { expected: usize, actual: usize },
  #[error("a dense layer needs at least one unit")]
  ZeroUnits,
  #[error("model has no layers")]
  NoLayers,
  #[error("model must be compiled before fitting")]
  NotCompiled,
  #[error("got {inputs} inputs but {labels} labels")]
  LengthMismatch { inputs: usize, labels: usize },
  #[error("cannot fit on an empty dataset")]
  EmptyDataset,
  #[error("batch size must be positive")]
  InvalidBatchSize,
  #[error("training diverged at epoch {epoch}: loss is {loss}")]
  Diverged { epoch: usize, loss: f32 },
  #[error("tensor readback failed: {0}")]
  Readback(#[from] ReadbackError),
}

/// Serializes backend seeding with the weight draws that depend on it.
static INIT_LOCK: Mutex<()> = Mutex::new(());

/// Builds the uncompiled regression network: `1 -> hidden_units -> 1`.
///
/// `seed` drives weight initialization. The backend RNG is process-global, so
/// seeding and the first draw of every parameter happen under one lock; burn
/// initializes parameters lazily, hence the forward pass before releasing it.
#[tracing::instrument(skip(device))]
pub fn create_model<B: AutodiffBackend>(
  config: &ModelConfig,
  device: &B::Device,
  seed: u64,
) -> Result<Sequential<B>, ModelError> {
  let _guard = INIT_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
  B::seed(seed);
  let mut model = Sequential::new(device.clone());
  model
    .add(
      DenseConfig::new(config.hidden_units)
        .with_input_units(1)
        .with_bias(config.use_bias),
    )?
    .add(
      DenseConfig::new(1)
        .with_activation(config.activation)
        .with_bias(config.use_bias),
    )?;
  drop(model.network.forward(column::<B>(vec![0.0], device)));
  info!("model has {} parameters", model.summary().total_params);
  Ok(model)
}
