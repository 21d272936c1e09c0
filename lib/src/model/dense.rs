use burn::{
  module::Module,
  nn::{Initializer, Linear, LinearConfig},
  tensor::{activation, backend::Backend, Tensor},
};

use super::{Activation, DenseConfig};

/// Fully connected layer, optionally followed by a sigmoid.
#[derive(Module, Debug)]
pub struct Dense<B: Backend> {
  linear: Linear<B>,
  inputs: usize,
  units: usize,
  use_bias: bool,
  sigmoid: bool,
}

impl<B: Backend> Dense<B> {
  pub fn new(inputs: usize, config: &DenseConfig, device: &B::Device) -> Self {
    let linear = LinearConfig::new(inputs, config.units)
      .with_bias(config.use_bias)
      .with_initializer(Initializer::XavierUniform { gain: 1.0 })
      .init::<B>(device);
    Self {
      linear,
      inputs,
      units: config.units,
      use_bias: config.use_bias,
      sigmoid: config.activation == Activation::Sigmoid,
    }
  }

  pub fn forward(&self, input: Tensor<B, 2>) -> Tensor<B, 2> {
    let output = self.linear.forward(input);
    if self.sigmoid {
      activation::sigmoid(output)
    } else {
      output
    }
  }

  pub fn inputs(&self) -> usize {
    self.inputs
  }

  pub fn units(&self) -> usize {
    self.units
  }

  pub fn activation(&self) -> Activation {
    if self.sigmoid {
      Activation::Sigmoid
    } else {
      Activation::Linear
    }
  }

  pub fn param_count(&self) -> usize {
    self.inputs * self.units + if self.use_bias { self.units } else { 0 }
  }
}

/// The layer stack the optimizer updates.
#[derive(Module, Debug)]
pub struct Network<B: Backend> {
  pub(crate) layers: Vec<Dense<B>>,
}

impl<B: Backend> Network<B> {
  pub fn forward(&self, input: Tensor<B, 2>) -> Tensor<B, 2> {
    self
      .layers
      .iter()
      .fold(input, |x, layer| layer.forward(x))
  }
}
