//! Classifier heads over composed sentence vectors.

use burn::nn::{Linear, LinearConfig};
use burn::prelude::*;
use burn::tensor::activation::relu;

use crate::compose::layers::{Merge, MergeConfig};
use crate::error::{Error, Result};

/// `scorer(relu(projector(h)))`.
#[derive(Module, Debug)]
pub struct SingleClassifier<B: Backend> {
    projector: Linear<B>,
    scorer: Linear<B>,
}

/// `scorer(relu(merge(h1, h2, (h1 - h2)^2, h1 * h2)))` for sentence pairs.
#[derive(Module, Debug)]
pub struct PairClassifier<B: Backend> {
    merger: Merge<B>,
    scorer: Linear<B>,
}

#[derive(Module, Debug)]
pub enum ClassifierHead<B: Backend> {
    Single(SingleClassifier<B>),
    Pair(PairClassifier<B>),
}

impl<B: Backend> ClassifierHead<B> {
    pub fn new(
        pair: bool,
        repr_dim: usize,
        hidden_dim: usize,
        n_classes: usize,
        device: &B::Device,
    ) -> Self {
        let scorer = LinearConfig::new(hidden_dim, n_classes).init(device);
        if pair {
            Self::Pair(PairClassifier {
                merger: MergeConfig::new(vec![repr_dim; 4], hidden_dim).init(device),
                scorer,
            })
        } else {
            Self::Single(SingleClassifier {
                projector: LinearConfig::new(repr_dim, hidden_dim).init(device),
                scorer,
            })
        }
    }

    /// Number of composed sequences one instance carries.
    pub fn arity(&self) -> usize {
        match self {
            Self::Single(_) => 1,
            Self::Pair(_) => 2,
        }
    }

    /// Unnormalized class scores.
    pub fn logits(&self, reprs: &[Tensor<B, 1>]) -> Result<Tensor<B, 1>> {
        match (self, reprs) {
            (Self::Single(head), [h]) => Ok(head
                .scorer
                .forward(relu(head.projector.forward(h.clone())))),
            (Self::Pair(head), [h1, h2]) => {
                let diff = h1.clone() - h2.clone();
                let features = [
                    h1.clone(),
                    h2.clone(),
                    diff.clone() * diff,
                    h1.clone() * h2.clone(),
                ];
                Ok(head.scorer.forward(relu(head.merger.forward(&features))))
            }
            _ => Err(Error::InstanceArity {
                expected: self.arity(),
                got: reprs.len(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type B = NdArray;

    #[test]
    fn single_head_scores_classes() {
        let device = Default::default();
        let head = ClassifierHead::<B>::new(false, 4, 3, 5, &device);
        let logits = head.logits(&[Tensor::ones([4], &device)]).unwrap();
        assert_eq!(logits.dims(), [5]);
    }

    #[test]
    fn pair_head_needs_two_sequences() {
        let device = Default::default();
        let head = ClassifierHead::<B>::new(true, 4, 3, 3, &device);
        let h = Tensor::<B, 1>::ones([4], &device);
        assert_eq!(head.logits(&[h.clone(), h.clone()]).unwrap().dims(), [3]);
        assert!(matches!(
            head.logits(&[h]),
            Err(Error::InstanceArity { expected: 2, got: 1 })
        ));
    }
}
