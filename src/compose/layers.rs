//! Multi-input affine layers used by the Tree-LSTM gates and the pair
//! classifier.

use burn::module::{Initializer, Param};
use burn::nn::{Linear, LinearConfig};
use burn::prelude::*;

/// `W_1 x_1 + W_2 x_2 + .. + b` over any number of inputs.
#[derive(Config, Debug)]
pub struct MergeConfig {
    /// Width of each input, in call order.
    pub d_inputs: Vec<usize>,
    pub d_output: usize,
}

#[derive(Module, Debug)]
pub struct Merge<B: Backend> {
    weights: Vec<Linear<B>>,
    bias: Param<Tensor<B, 1>>,
}

impl MergeConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> Merge<B> {
        let weights = self
            .d_inputs
            .iter()
            .map(|&d_in| {
                LinearConfig::new(d_in, self.d_output)
                    .with_bias(false)
                    .init(device)
            })
            .collect();
        Merge {
            weights,
            bias: Initializer::Zeros.init([self.d_output], device),
        }
    }
}

impl<B: Backend> Merge<B> {
    /// `inputs` must line up with `d_inputs`; extra inputs are ignored.
    pub fn forward(&self, inputs: &[Tensor<B, 1>]) -> Tensor<B, 1> {
        self.weights
            .iter()
            .zip(inputs)
            .fold(self.bias.val(), |acc, (layer, x)| acc + layer.forward(x.clone()))
    }

    /// Two-input shorthand for the Tree-LSTM gates.
    pub fn forward2(&self, a: Tensor<B, 1>, b: Tensor<B, 1>) -> Tensor<B, 1> {
        self.forward(&[a, b])
    }

    pub fn arity(&self) -> usize {
        self.weights.len()
    }
}

pub fn merge2<B: Backend>(
    d_a: usize,
    d_b: usize,
    d_output: usize,
    device: &B::Device,
) -> Merge<B> {
    MergeConfig::new(vec![d_a, d_b], d_output).init(device)
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type B = NdArray;

    #[test]
    fn merge_output_width() {
        let device = Default::default();
        let merge = MergeConfig::new(vec![3, 5], 4).init::<B>(&device);
        assert_eq!(merge.arity(), 2);
        let out = merge.forward2(
            Tensor::<B, 1>::ones([3], &device),
            Tensor::<B, 1>::ones([5], &device),
        );
        assert_eq!(out.dims(), [4]);
    }

    #[test]
    fn zero_inputs_give_bias() {
        let device = Default::default();
        let merge = merge2::<B>(2, 2, 3, &device);
        let out = merge.forward2(
            Tensor::<B, 1>::zeros([2], &device),
            Tensor::<B, 1>::zeros([2], &device),
        );
        let values = out.into_data().to_vec::<f32>().unwrap();
        assert_eq!(values, vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn sums_each_projection() {
        let device = Default::default();
        let merge = MergeConfig::new(vec![2, 2, 2, 2], 3).init::<B>(&device);
        let x = Tensor::<B, 1>::from_floats([1.0, -1.0], &device);
        let all = merge.forward(&[x.clone(), x.clone(), x.clone(), x.clone()]);
        let manual = merge
            .weights
            .iter()
            .fold(merge.bias.val(), |acc, l| acc + l.forward(x.clone()));
        let diff = (all - manual).abs().sum().into_scalar();
        assert!(diff < 1e-6);
    }
}
