//! The learning-to-compose model.
//!
//! One [`Model`] serves every training regime: word embeddings feed a
//! [`Composer`], a small policy network scores transitions from the
//! composer's state representation, and a [`ClassifierHead`] labels the
//! composed vector(s). How actions are picked is injected per call as a
//! [`RolloutPolicy`].

pub mod classifier;
pub mod policy;
pub mod rollout;

use burn::module::Param;
use burn::nn::{Dropout, DropoutConfig, Embedding, EmbeddingConfig, Linear, LinearConfig};
use burn::prelude::*;
use burn::tensor::activation::relu;
use burn::tensor::{ElementConversion, TensorData};

use crate::compose::Composer;
use crate::error::{Error, Result};
use crate::system::{ParserState, SystemKind};
pub use classifier::ClassifierHead;
pub use policy::{PolicyKind, RolloutPolicy};
pub use rollout::{PolicyStep, Rollout};

// ─── Configuration ─────────────────────────────────────────────────

#[derive(Config, Debug)]
pub struct ModelConfig {
    /// Rows of the embedding table, reserved ids included.
    pub vocab_size: usize,
    pub n_classes: usize,
    #[config(default = 100)]
    pub word_dim: usize,
    #[config(default = 100)]
    pub hidden_dim: usize,
    #[config(default = "SystemKind::Constituent")]
    pub system: SystemKind,
    /// Dropout on word vectors and composed representations.
    #[config(default = 0.0)]
    pub dropout: f64,
    /// Train the embedding table along with the rest.
    #[config(default = false)]
    pub tune_embedding: bool,
    /// Instances are sentence pairs (entailment).
    #[config(default = false)]
    pub pair: bool,
}

impl ModelConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> Model<B> {
        let state_repr_dim = Composer::<B>::state_repr_dim(self.system, self.word_dim, self.hidden_dim);
        let composer = Composer::new(self.system, self.word_dim, self.hidden_dim, device);
        let num_actions = self.system.transition_system().num_actions();
        let classifier = ClassifierHead::new(
            self.pair,
            composer.repr_dim(),
            self.hidden_dim,
            self.n_classes,
            device,
        );
        let model = Model {
            embedding: EmbeddingConfig::new(self.vocab_size, self.word_dim).init(device),
            composer,
            policy_projector: LinearConfig::new(state_repr_dim, self.hidden_dim).init(device),
            policy_scorer: LinearConfig::new(self.hidden_dim, num_actions).init(device),
            classifier,
            dropout: DropoutConfig::new(self.dropout).init(),
            tune_embedding: self.tune_embedding,
        };
        model.freeze_embedding()
    }
}

// ─── Model ─────────────────────────────────────────────────────────

#[derive(Module, Debug)]
pub struct Model<B: Backend> {
    embedding: Embedding<B>,
    pub(crate) composer: Composer<B>,
    policy_projector: Linear<B>,
    pub(crate) policy_scorer: Linear<B>,
    pub(crate) classifier: ClassifierHead<B>,
    dropout: Dropout,
    tune_embedding: bool,
}

impl<B: Backend> Model<B> {
    pub fn system(&self) -> SystemKind {
        match self.composer {
            Composer::Constituent(_) => SystemKind::Constituent,
            Composer::Dependency(_) => SystemKind::Dependency,
            Composer::DependencyBiLstm(_) => SystemKind::DependencyBiLstm,
        }
    }

    /// Sequences per instance the classifier expects.
    pub fn arity(&self) -> usize {
        self.classifier.arity()
    }

    /// Stop gradients into the embedding table unless it is tuned.
    pub fn freeze_embedding(mut self) -> Self {
        if !self.tune_embedding {
            self.embedding = self.embedding.no_grad();
        }
        self
    }

    /// Replace the embedding table with a `[vocab, word_dim]` row-major matrix.
    pub fn with_embedding_table(mut self, values: Vec<f32>) -> Result<Self> {
        let [vocab, dim] = self.embedding.weight.dims();
        if values.len() != vocab * dim {
            return Err(Error::Tensor(format!(
                "embedding table has {} values, expected {vocab} x {dim}",
                values.len()
            )));
        }
        let device = self.embedding.weight.device();
        let weight = Tensor::from_data(TensorData::new(values, [vocab, dim]), &device);
        self.embedding.weight = Param::from_tensor(weight);
        Ok(self.freeze_embedding())
    }

    /// The embedding table, row-major.
    pub fn embedding_table(&self) -> Vec<f32> {
        to_floats(self.embedding.weight.val())
    }

    /// One vector per token. Zero-length input is rejected.
    pub fn embed(&self, tokens: &[usize]) -> Result<Vec<Tensor<B, 1>>> {
        let n = tokens.len();
        if n == 0 {
            return Err(Error::EmptyInstance);
        }
        let device = self.embedding.weight.device();
        let ids: Tensor<B, 2, Int> = index_tensor::<B>(tokens, &device).reshape([1, n]);
        let vectors = self.dropout.forward(self.embedding.forward(ids));
        let dim = vectors.dims()[2];
        Ok(vectors
            .reshape([n, dim])
            .chunk(n, 0)
            .into_iter()
            .map(|row| row.reshape([dim]))
            .collect())
    }

    /// `scorer(relu(projector(state_repr)))`, one logit per action.
    pub fn policy_logits(&self, state_repr: Tensor<B, 1>) -> Tensor<B, 1> {
        self.policy_scorer
            .forward(relu(self.policy_projector.forward(state_repr)))
    }

    /// Class scores for composed representations, one per sequence.
    pub fn classifier_logits(&self, reprs: &[Tensor<B, 1>]) -> Result<Tensor<B, 1>> {
        let reprs: Vec<_> = reprs.iter().map(|r| self.dropout.forward(r.clone())).collect();
        self.classifier.logits(&reprs)
    }

    /// Roll out every sequence of an instance under `policy`.
    pub fn compose_all(
        &self,
        sequences: &[Vec<usize>],
        policy: &mut RolloutPolicy<'_>,
    ) -> Result<Vec<Rollout<B>>> {
        if sequences.len() != self.arity() {
            return Err(Error::InstanceArity {
                expected: self.arity(),
                got: sequences.len(),
            });
        }
        sequences
            .iter()
            .map(|tokens| self.rollout(self.embed(tokens)?, policy))
            .collect()
    }

    /// Predicted label plus the parser state of every sequence.
    pub fn predict_with_state(
        &self,
        sequences: &[Vec<usize>],
        policy: PolicyKind,
    ) -> Result<(usize, Vec<ParserState>)> {
        let rollouts = self.compose_all(sequences, &mut policy.decoder())?;
        let reprs: Vec<_> = rollouts.iter().map(|r| r.repr.clone()).collect();
        let scores = to_floats(self.classifier_logits(&reprs)?);
        let label = policy::argmax(&scores);
        Ok((label, rollouts.into_iter().map(|r| r.state).collect()))
    }

    pub fn predict(&self, sequences: &[Vec<usize>], policy: PolicyKind) -> Result<usize> {
        self.predict_with_state(sequences, policy).map(|(label, _)| label)
    }
}

// ─── Tensor helpers ────────────────────────────────────────────────

pub(crate) fn index_tensor<B: Backend>(ids: &[usize], device: &B::Device) -> Tensor<B, 1, Int> {
    let ids: Vec<i32> = ids.iter().map(|&i| i as i32).collect();
    let len = ids.len();
    Tensor::from_data(TensorData::new(ids, [len]), device)
}

pub(crate) fn to_floats<B: Backend, const D: usize>(tensor: Tensor<B, D>) -> Vec<f32> {
    tensor.into_data().iter::<f32>().collect()
}

pub(crate) fn to_scalar<B: Backend, const D: usize>(tensor: Tensor<B, D>) -> f32 {
    tensor.sum().into_scalar().elem::<f32>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type B = NdArray;

    fn config(system: SystemKind) -> ModelConfig {
        ModelConfig::new(10, 3)
            .with_word_dim(4)
            .with_hidden_dim(5)
            .with_system(system)
    }

    #[test]
    fn embeds_each_token() {
        let device = Default::default();
        let model = config(SystemKind::Constituent).init::<B>(&device);
        let vectors = model.embed(&[2, 3, 4]).unwrap();
        assert_eq!(vectors.len(), 3);
        assert!(vectors.iter().all(|v| v.dims() == [4]));
        assert!(matches!(model.embed(&[]), Err(Error::EmptyInstance)));
    }

    #[test]
    fn predicts_a_known_class() {
        let device = Default::default();
        for system in [
            SystemKind::Constituent,
            SystemKind::Dependency,
            SystemKind::DependencyBiLstm,
        ] {
            let model = config(system).init::<B>(&device);
            assert_eq!(model.system(), system);
            for policy in [PolicyKind::Sample, PolicyKind::Left, PolicyKind::Right] {
                let (label, states) = model
                    .predict_with_state(&[vec![2, 3, 4, 5]], policy)
                    .unwrap();
                assert!(label < 3);
                assert!(states[0].is_terminated());
            }
        }
    }

    #[test]
    fn pair_model_needs_two_sequences() {
        let device = Default::default();
        let model = config(SystemKind::Constituent)
            .with_pair(true)
            .init::<B>(&device);
        assert!(model
            .predict(&[vec![2, 3], vec![4]], PolicyKind::Left)
            .is_ok());
        assert!(matches!(
            model.predict(&[vec![2, 3]], PolicyKind::Left),
            Err(Error::InstanceArity { expected: 2, got: 1 })
        ));
    }

    #[test]
    fn embedding_table_is_replaced() {
        let device = Default::default();
        let model = ModelConfig::new(2, 2)
            .with_word_dim(2)
            .with_hidden_dim(2)
            .init::<B>(&device);
        assert!(model.clone().with_embedding_table(vec![1.0]).is_err());
        let model = model
            .with_embedding_table(vec![0.0, 0.0, 1.0, 2.0])
            .unwrap();
        let v = to_floats(model.embed(&[1]).unwrap().remove(0));
        assert_eq!(v, vec![1.0, 2.0]);
    }
}
