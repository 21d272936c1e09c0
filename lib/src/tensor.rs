use burn::tensor::{backend::Backend, DataError as TensorDataError, Tensor, TensorData};
use thiserror::Error;

/// A tensor's contents could not be read back as `f32`.
#[derive(Debug, Error)]
#[error("{0:?}")]
pub struct ReadbackError(pub TensorDataError);

/// `[values.len(), 1]` column tensor, the only shape the regression feeds through the network.
pub fn column<B: Backend>(values: Vec<f32>, device: &B::Device) -> Tensor<B, 2> {
  let rows = values.len();
  Tensor::from_data(TensorData::new(values, [rows, 1]), device)
}

fn to_f32_vec(data: TensorData) -> Result<Vec<f32>, ReadbackError> {
  data.to_vec::<f32>().map_err(ReadbackError)
}

/// Synchronous readback into a flat vector.
pub fn read_values<B: Backend, const D: usize>(tensor: Tensor<B, D>) -> Result<Vec<f32>, ReadbackError> {
  to_f32_vec(tensor.into_data())
}
