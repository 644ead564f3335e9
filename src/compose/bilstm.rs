//! Dependency Tree-LSTM whose policy features come from a BiLSTM pass
//! over the sentence.

use burn::nn::{BiLstm, BiLstmConfig};
use burn::prelude::*;

use super::dependency::{DependencyComposer, DependencyComposerConfig};
use super::ComposeState;

#[derive(Config, Debug)]
pub struct BiLstmComposerConfig {
    pub word_dim: usize,
    pub hidden_dim: usize,
}

#[derive(Module, Debug)]
pub struct BiLstmComposer<B: Backend> {
    encoder: BiLstm<B>,
    pub(super) tree: DependencyComposer<B>,
}

impl BiLstmComposerConfig {
    /// Encoded tokens are `2 * hidden_dim` wide, so are the guards.
    pub fn init<B: Backend>(&self, device: &B::Device) -> BiLstmComposer<B> {
        BiLstmComposer {
            encoder: BiLstmConfig::new(self.word_dim, self.hidden_dim, true).init(device),
            tree: DependencyComposerConfig::new(
                self.word_dim,
                self.hidden_dim,
                2 * self.hidden_dim,
            )
            .init(device),
        }
    }
}

impl<B: Backend> BiLstmComposer<B> {
    /// Run the encoder once over all leaves; the child-sum recursion still
    /// reads the raw leaves.
    pub fn start(&self, leaves: Vec<Tensor<B, 1>>) -> ComposeState<B> {
        let n = leaves.len();
        if n == 0 {
            return self.tree.start(leaves, None);
        }
        let sequence: Tensor<B, 3> = Tensor::stack::<2>(leaves.clone(), 0).unsqueeze();
        let (encoded, _) = self.encoder.forward(sequence, None);
        let width = encoded.dims()[2];
        let features = encoded
            .reshape([n, width])
            .chunk(n, 0)
            .into_iter()
            .map(|row| row.reshape([width]))
            .collect();
        self.tree.start(leaves, Some(features))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::ParserState;
    use burn::backend::NdArray;

    type B = NdArray;

    #[test]
    fn features_are_bidirectional_width() {
        let device = Default::default();
        let composer = BiLstmComposerConfig::new(4, 3).init::<B>(&device);
        let leaves = (0..5).map(|_| Tensor::<B, 1>::ones([4], &device)).collect();
        let cs = composer.start(leaves);
        assert_eq!(cs.features.len(), 5);
        assert!(cs.features.iter().all(|f| f.dims() == [6]));
        assert_eq!(cs.inputs[0].dims(), [4]);
        let state = ParserState::new(5);
        assert_eq!(composer.tree.state_repr(&cs, &state).dims(), [18]);
    }
}
