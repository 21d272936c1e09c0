use serde::Serialize;
use tracing::debug;

use crate::{
  data::Car,
  model::{ModelError, Predict},
  preprocess::NormalizationStats,
};

/// Number of evenly spaced inputs swept through the trained model.
pub const SWEEP_POINTS: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Point {
  pub x: f32,
  pub y: f32,
}

/// `num` evenly spaced values from `start` to `stop`, both ends included.
pub fn linspace(start: f32, stop: f32, num: usize) -> Vec<f32> {
  match num {
    0 => Vec::new(),
    1 => vec![start],
    _ => {
      let step = (stop - start) / (num - 1) as f32;
      (0..num)
        .map(|i| if i == num - 1 { stop } else { start + step * i as f32 })
        .collect()
    }
  }
}

/// Sweeps [0, 1] through `model` and maps inputs and predictions back to
/// horsepower and mpg.
#[tracing::instrument(skip_all)]
pub fn test_model<M: Predict + ?Sized>(
  model: &M,
  stats: &NormalizationStats,
) -> Result<Vec<Point>, ModelError> {
  let xs = linspace(0.0, 1.0, SWEEP_POINTS);
  let predictions = model.predict(&xs)?;
  debug!("{} predictions", predictions.len());

  Ok(
    xs.iter()
      .zip(predictions)
      .map(|(&x, y)| Point {
        x: stats.denormalize_input(x),
        y: stats.denormalize_label(y),
      })
      .collect(),
  )
}

pub fn original_points(cars: &[Car]) -> Vec<Point> {
  cars
    .iter()
    .map(|car| Point {
      x: car.horsepower,
      y: car.mpg,
    })
    .collect()
}
