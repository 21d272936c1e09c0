use burn::{
  nn::loss::{MseLoss, Reduction},
  optim::{AdamConfig, GradientsParams, Optimizer, SgdConfig},
  tensor::{
    backend::{AutodiffBackend, Backend},
    ElementConversion, Tensor,
  },
};
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use tracing::{info, trace};

use super::{
  dense::Network, EpochCallback, EpochLogs, FitOptions, History, Loss, ModelError, OptimizerConfig,
  Sequential,
};
use crate::tensor::column;

impl Loss {
  fn forward<B: Backend>(&self, output: Tensor<B, 2>, target: Tensor<B, 2>) -> Tensor<B, 1> {
    match self {
      Loss::MeanSquaredError => MseLoss::new().forward(output, target, Reduction::Mean),
    }
  }
}

fn mean_squared_error<B: Backend>(output: Tensor<B, 2>, target: Tensor<B, 2>) -> f32 {
  let diff = output.sub(target);
  diff.clone().mul(diff).mean().into_scalar().elem::<f32>()
}

/// Bias-corrected exponential moving average, used to log a smoothed batch loss.
pub struct ExponentialAverage {
  beta: f32,
  moment: f32,
  pub value: f32,
  t: i32,
}

impl ExponentialAverage {
  pub fn new(beta: f32) -> Self {
    ExponentialAverage {
      beta,
      moment: 0.,
      value: 0.,
      t: 0,
    }
  }

  pub fn update(&mut self, value: f32) {
    self.t += 1;
    self.moment = self.beta * self.moment + (1. - self.beta) * value;
    // bias correction
    self.value = self.moment / (1. - f32::powi(self.beta, self.t));
  }
}

impl<B: AutodiffBackend> Sequential<B> {
  /// Fits the compiled model to `inputs`/`labels`, calling `callback` after every epoch.
  ///
  /// Suspends once per epoch. A non-finite batch loss stops training with
  /// [`ModelError::Diverged`]; the weights reached up to that batch stay in the model.
  #[tracing::instrument(
    skip_all,
    fields(samples = inputs.len(), epochs = options.epochs, batch_size = options.batch_size)
  )]
  pub async fn fit<C: EpochCallback + ?Sized>(
    &mut self,
    inputs: &[f32],
    labels: &[f32],
    options: &FitOptions,
    callback: &mut C,
  ) -> Result<History, ModelError> {
    let compiled = self.compiled.ok_or(ModelError::NotCompiled)?;
    if self.network.layers.is_empty() {
      return Err(ModelError::NoLayers);
    }
    if inputs.len() != labels.len() {
      return Err(ModelError::LengthMismatch {
        inputs: inputs.len(),
        labels: labels.len(),
      });
    }
    if inputs.is_empty() {
      return Err(ModelError::EmptyDataset);
    }
    if options.batch_size == 0 {
      return Err(ModelError::InvalidBatchSize);
    }

    let learning_rate = compiled.optimizer.learning_rate();
    let history = match compiled.optimizer {
      OptimizerConfig::Adam { .. } => {
        let optim = AdamConfig::new().init::<B, Network<B>>();
        self
          .run_epochs(optim, learning_rate, compiled.loss, inputs, labels, options, callback)
          .await?
      }
      OptimizerConfig::Sgd { .. } => {
        let optim = SgdConfig::new().init::<B, Network<B>>();
        self
          .run_epochs(optim, learning_rate, compiled.loss, inputs, labels, options, callback)
          .await?
      }
    };
    callback.on_train_end(&history);
    Ok(history)
  }

  #[allow(clippy::too_many_arguments)]
  async fn run_epochs<O, C>(
    &mut self,
    mut optim: O,
    learning_rate: f64,
    loss_fn: Loss,
    inputs: &[f32],
    labels: &[f32],
    options: &FitOptions,
    callback: &mut C,
  ) -> Result<History, ModelError>
  where
    O: Optimizer<Network<B>, B>,
    C: EpochCallback + ?Sized,
  {
    let mut rng = StdRng::seed_from_u64(options.seed);
    let mut order: Vec<usize> = (0..inputs.len()).collect();
    let mut network = self.network.clone();
    let mut history = History::default();
    let mut smoothed = ExponentialAverage::new(0.9);
    let start = std::time::Instant::now();
    let mut iter = 0;

    for epoch in 1..=options.epochs {
      if options.shuffle {
        order.shuffle(&mut rng);
      }

      let (mut loss_sum, mut mse_sum) = (0f64, 0f64);
      for batch in order.chunks(options.batch_size) {
        let x = column::<B>(batch.iter().map(|&i| inputs[i]).collect(), &self.device);
        let y = column::<B>(batch.iter().map(|&i| labels[i]).collect(), &self.device);

        let output = network.forward(x);
        let loss = loss_fn.forward(output.clone(), y.clone());
        let batch_loss = loss.clone().into_scalar().elem::<f32>();
        if !batch_loss.is_finite() {
          self.network = network;
          return Err(ModelError::Diverged {
            epoch,
            loss: batch_loss,
          });
        }
        let batch_mse = mean_squared_error(output.inner(), y.inner());

        let grads = GradientsParams::from_grads(loss.backward(), &network);
        network = optim.step(learning_rate, network, grads);

        loss_sum += f64::from(batch_loss) * batch.len() as f64;
        mse_sum += f64::from(batch_mse) * batch.len() as f64;
        smoothed.update(batch_loss);
        trace!(epoch, batch_loss, "batch done");
        iter += 1;
      }

      let samples = inputs.len() as f64;
      let logs = EpochLogs {
        epoch,
        loss: (loss_sum / samples) as f32,
        mse: (mse_sum / samples) as f32,
      };
      info!(
        epoch,
        loss = logs.loss,
        mse = logs.mse,
        smoothed = smoothed.value,
        "epoch finished"
      );
      callback.on_epoch_end(&logs);
      history.push(logs);

      // let the host runtime make progress between epochs
      tokio::task::yield_now().await;
    }

    self.network = network;
    if iter > 0 {
      info!(
        "Finished in {iter} iterations, took {:.2}s, {:.2}µs / iter",
        start.elapsed().as_secs_f32(),
        start.elapsed().as_micros() / iter
      );
    }
    Ok(history)
  }
}
