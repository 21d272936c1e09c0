//! Shuffling and min-max normalization of the cleaned records.

use burn::tensor::{backend::Backend, ElementConversion, Tensor};
use rand::{seq::SliceRandom, Rng};
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::{
  data::Car,
  tensor::{column, read_values, ReadbackError},
};

#[derive(Debug, Error)]
pub enum NormalizeError {
  #[error("insufficient data: {0}")]
  InsufficientData(String),
  #[error("tensor readback failed: {0}")]
  Readback(#[from] ReadbackError),
}

/// The statistics needed to invert the scaling after inference.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NormalizationStats {
  pub input_min: f32,
  pub input_max: f32,
  pub label_min: f32,
  pub label_max: f32,
}

impl NormalizationStats {
  pub fn denormalize_input(&self, value: f32) -> f32 {
    value * (self.input_max - self.input_min) + self.input_min
  }

  pub fn denormalize_label(&self, value: f32) -> f32 {
    value * (self.label_max - self.label_min) + self.label_min
  }
}

/// Horsepower inputs and mpg labels, both rescaled to [0, 1].
#[derive(Debug, Clone)]
pub struct NormalizedData {
  pub inputs: Vec<f32>,
  pub labels: Vec<f32>,
  pub stats: NormalizationStats,
}

impl NormalizedData {
  pub fn len(&self) -> usize {
    self.inputs.len()
  }

  pub fn is_empty(&self) -> bool {
    self.inputs.is_empty()
  }
}

fn min_max<B: Backend>(tensor: &Tensor<B, 2>) -> (f32, f32) {
  let min = tensor.clone().min().into_scalar().elem::<f32>();
  let max = tensor.clone().max().into_scalar().elem::<f32>();
  (min, max)
}

fn rescale<B: Backend>(tensor: Tensor<B, 2>, min: f32, max: f32) -> Result<Vec<f32>, NormalizeError> {
  Ok(read_values(tensor.sub_scalar(min).div_scalar(max - min))?)
}

fn check_range(feature: &str, min: f32, max: f32) -> Result<(), NormalizeError> {
  let range = max - min;
  if !range.is_finite() || range <= 0.0 {
    return Err(NormalizeError::InsufficientData(format!(
      "{feature} has no spread (min {min}, max {max})"
    )));
  }
  Ok(())
}

/// Shuffles `cars` in place, splits it into horsepower inputs and mpg labels and
/// min-max scales both columns.
///
/// Every tensor created here is owned by this call and dropped before it returns,
/// whichever way it returns.
#[tracing::instrument(skip_all, fields(records = cars.len()))]
pub fn convert_to_tensor<B: Backend, R: Rng + ?Sized>(
  cars: &mut [Car],
  rng: &mut R,
  device: &B::Device,
) -> Result<NormalizedData, NormalizeError> {
  if cars.is_empty() {
    return Err(NormalizeError::InsufficientData("no records left after cleaning".into()));
  }

  cars.shuffle(rng);

  let inputs: Vec<f32> = cars.iter().map(|car| car.horsepower).collect();
  let labels: Vec<f32> = cars.iter().map(|car| car.mpg).collect();

  let input_tensor = column::<B>(inputs, device);
  let label_tensor = column::<B>(labels, device);

  let (input_min, input_max) = min_max(&input_tensor);
  let (label_min, label_max) = min_max(&label_tensor);
  check_range("horsepower", input_min, input_max)?;
  check_range("mpg", label_min, label_max)?;

  let stats = NormalizationStats {
    input_min,
    input_max,
    label_min,
    label_max,
  };
  debug!(?stats, "normalization statistics");

  Ok(NormalizedData {
    inputs: rescale(input_tensor, input_min, input_max)?,
    labels: rescale(label_tensor, label_min, label_max)?,
    stats,
  })
}

#[cfg(test)]
mod tests {
  use burn::backend::NdArray;
  use proptest::prelude::*;
  use rand::{rngs::StdRng, SeedableRng};

  use super::*;

  type B = NdArray<f32>;

  fn car(mpg: f32, horsepower: f32) -> Car {
    Car { mpg, horsepower }
  }

  fn convert(cars: &mut [Car], seed: u64) -> Result<NormalizedData, NormalizeError> {
    let mut rng = StdRng::seed_from_u64(seed);
    convert_to_tensor::<B, _>(cars, &mut rng, &Default::default())
  }

  fn sorted_bits(cars: &[Car]) -> Vec<(u32, u32)> {
    let mut bits: Vec<_> = cars
      .iter()
      .map(|c| (c.mpg.to_bits(), c.horsepower.to_bits()))
      .collect();
    bits.sort_unstable();
    bits
  }

  #[test]
  fn scales_the_three_record_example() {
    let mut cars = vec![car(20.0, 100.0), car(30.0, 80.0)];
    let data = convert(&mut cars, 7).unwrap();

    assert_eq!(
      data.stats,
      NormalizationStats {
        input_min: 80.0,
        input_max: 100.0,
        label_min: 20.0,
        label_max: 30.0,
      }
    );
    // shuffling may reorder the rows but must keep each input with its label
    let mut pairs: Vec<(f32, f32)> = data.inputs.iter().copied().zip(data.labels.iter().copied()).collect();
    pairs.sort_by(|a, b| a.0.total_cmp(&b.0));
    assert_eq!(pairs, vec![(0.0, 1.0), (1.0, 0.0)]);
  }

  #[test]
  fn empty_dataset_is_rejected() {
    assert!(matches!(
      convert(&mut [], 1),
      Err(NormalizeError::InsufficientData(_))
    ));
  }

  #[test]
  fn zero_variance_is_rejected() {
    let mut same_horsepower = vec![car(20.0, 90.0), car(30.0, 90.0)];
    assert!(matches!(
      convert(&mut same_horsepower, 1),
      Err(NormalizeError::InsufficientData(_))
    ));

    let mut single = vec![car(20.0, 90.0)];
    assert!(matches!(
      convert(&mut single, 1),
      Err(NormalizeError::InsufficientData(_))
    ));
  }

  fn dataset() -> impl Strategy<Value = Vec<Car>> {
    prop::collection::vec((5.0f32..50.0, 40.0f32..250.0), 2..128)
      .prop_map(|rows| rows.into_iter().map(|(m, h)| car(m, h)).collect::<Vec<_>>())
      .prop_filter("both features need spread", |cars| {
        let spread = |f: fn(&Car) -> f32| {
          let first = f(&cars[0]);
          cars.iter().any(|c| f(c) != first)
        };
        spread(|c| c.mpg) && spread(|c| c.horsepower)
      })
  }

  proptest! {
    #[test]
    fn outputs_stay_in_unit_range(mut cars in dataset(), seed in any::<u64>()) {
      let n = cars.len();
      let data = convert(&mut cars, seed).unwrap();
      prop_assert_eq!(data.inputs.len(), n);
      prop_assert_eq!(data.labels.len(), n);
      for v in data.inputs.iter().chain(data.labels.iter()) {
        prop_assert!((0.0..=1.0).contains(v), "{} out of range", v);
      }
    }

    #[test]
    fn denormalizing_restores_the_records(mut cars in dataset(), seed in any::<u64>()) {
      let data = convert(&mut cars, seed).unwrap();
      let stats = data.stats;
      let input_tol = 1e-5 * (stats.input_max - stats.input_min).max(stats.input_max.abs());
      let label_tol = 1e-5 * (stats.label_max - stats.label_min).max(stats.label_max.abs());
      // `cars` is now in the shuffled order the columns were built from
      for (i, car) in cars.iter().enumerate() {
        prop_assert!((stats.denormalize_input(data.inputs[i]) - car.horsepower).abs() <= input_tol);
        prop_assert!((stats.denormalize_label(data.labels[i]) - car.mpg).abs() <= label_tol);
      }
    }

    #[test]
    fn shuffle_is_a_permutation(cars in dataset(), seed in any::<u64>()) {
      let mut shuffled = cars.clone();
      convert(&mut shuffled, seed).unwrap();
      prop_assert_eq!(sorted_bits(&shuffled), sorted_bits(&cars));
    }
  }
}
