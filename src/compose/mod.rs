//! Tree-LSTM composition engines.
//!
//! A composer turns leaf vectors into one sentence vector while a
//! transition system drives the parse. Each rollout gets its own
//! [`ComposeState`], dropped once the final representation is read.
//!
//! - `Constituent`: binary Tree-LSTM, composes on every REDUCE.
//! - `Dependency`: child-sum Tree-LSTM, composes the finished arc tree.
//! - `DependencyBiLstm`: as `Dependency`, with BiLSTM-encoded policy features.

pub mod bilstm;
pub mod constituent;
pub mod dependency;
pub mod layers;

use burn::prelude::*;

use crate::error::Result;
use crate::system::{Action, ParserState, SystemKind};
use bilstm::{BiLstmComposer, BiLstmComposerConfig};
use constituent::{ConstituentComposer, ConstituentComposerConfig};
use dependency::{DependencyComposer, DependencyComposerConfig};

/// Standard deviation of the guard vectors at initialization.
pub(crate) const GUARD_STD: f64 = 0.1;

/// Hidden and memory vectors of one tree node.
#[derive(Clone, Debug)]
pub struct TreeLstmCell<B: Backend> {
    pub h: Tensor<B, 1>,
    pub c: Tensor<B, 1>,
}

/// Per-rollout composition state.
#[derive(Clone, Debug)]
pub struct ComposeState<B: Backend> {
    /// Per-token vectors the policy reads for buffer and stack slots.
    pub features: Vec<Tensor<B, 1>>,
    /// Per-token gate inputs of the child-sum recursion.
    pub inputs: Vec<Tensor<B, 1>>,
    /// Leaf cells waiting in the buffer (constituent).
    pub leaves: Vec<TreeLstmCell<B>>,
    /// Cells paralleling the parser stack (constituent).
    pub stack: Vec<TreeLstmCell<B>>,
    pub next_leaf: usize,
}

#[derive(Module, Debug)]
pub enum Composer<B: Backend> {
    Constituent(ConstituentComposer<B>),
    Dependency(DependencyComposer<B>),
    DependencyBiLstm(BiLstmComposer<B>),
}

impl<B: Backend> Composer<B> {
    pub fn new(system: SystemKind, word_dim: usize, hidden_dim: usize, device: &B::Device) -> Self {
        match system {
            SystemKind::Constituent => {
                Self::Constituent(ConstituentComposerConfig::new(word_dim, hidden_dim).init(device))
            }
            SystemKind::Dependency => Self::Dependency(
                DependencyComposerConfig::new(word_dim, hidden_dim, word_dim).init(device),
            ),
            SystemKind::DependencyBiLstm => {
                Self::DependencyBiLstm(BiLstmComposerConfig::new(word_dim, hidden_dim).init(device))
            }
        }
    }

    /// Width of `state_repr`: three slots of the per-token feature width.
    pub fn state_repr_dim(system: SystemKind, word_dim: usize, hidden_dim: usize) -> usize {
        3 * match system {
            SystemKind::Constituent => hidden_dim,
            SystemKind::Dependency => word_dim,
            SystemKind::DependencyBiLstm => 2 * hidden_dim,
        }
    }

    /// Width of the final representation.
    pub fn repr_dim(&self) -> usize {
        match self {
            Self::Constituent(c) => c.hidden_dim(),
            Self::Dependency(d) => d.hidden_dim(),
            Self::DependencyBiLstm(b) => b.tree.hidden_dim(),
        }
    }

    pub fn start(&self, leaves: Vec<Tensor<B, 1>>) -> ComposeState<B> {
        match self {
            Self::Constituent(c) => c.start(leaves),
            Self::Dependency(d) => d.start(leaves, None),
            Self::DependencyBiLstm(b) => b.start(leaves),
        }
    }

    /// Mirror one parser action. Dependency composers defer all work to
    /// [`Composer::final_repr`].
    pub fn perform_action(&self, cs: &mut ComposeState<B>, action: Action) -> Result<()> {
        match self {
            Self::Constituent(c) => c.perform_action(cs, action),
            Self::Dependency(_) | Self::DependencyBiLstm(_) => Ok(()),
        }
    }

    /// Policy input for the current parser position.
    pub fn state_repr(&self, cs: &ComposeState<B>, state: &ParserState) -> Tensor<B, 1> {
        match self {
            Self::Constituent(c) => c.state_repr(cs),
            Self::Dependency(d) => d.state_repr(cs, state),
            Self::DependencyBiLstm(b) => b.tree.state_repr(cs, state),
        }
    }

    /// Representation of the node on top of the stack, where one exists
    /// before the parse is finished (constituent only).
    pub fn top_repr(&self, cs: &ComposeState<B>) -> Option<Tensor<B, 1>> {
        match self {
            Self::Constituent(c) => c.top_repr(cs),
            Self::Dependency(_) | Self::DependencyBiLstm(_) => None,
        }
    }

    pub fn final_repr(&self, cs: &ComposeState<B>, state: &ParserState) -> Result<Tensor<B, 1>> {
        match self {
            Self::Constituent(c) => c.final_repr(cs),
            Self::Dependency(d) => d.final_repr(cs, state),
            Self::DependencyBiLstm(b) => b.tree.final_repr(cs, state),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type B = NdArray;

    #[test]
    fn state_repr_dim_matches_every_step() {
        let device = Default::default();
        for system in [
            SystemKind::Constituent,
            SystemKind::Dependency,
            SystemKind::DependencyBiLstm,
        ] {
            let composer = Composer::<B>::new(system, 4, 3, &device);
            let expected = Composer::<B>::state_repr_dim(system, 4, 3);
            let leaves = (0..3).map(|_| Tensor::<B, 1>::ones([4], &device)).collect();
            let mut cs = composer.start(leaves);
            let ts = system.transition_system();
            let mut state = ParserState::new(3);
            while !state.is_terminated() {
                assert_eq!(composer.state_repr(&cs, &state).dims(), [expected]);
                let action = ts.valid_actions(&state)[0];
                composer.perform_action(&mut cs, action).unwrap();
                ts.perform_action(&mut state, action).unwrap();
            }
            assert_eq!(composer.state_repr(&cs, &state).dims(), [expected]);
            let repr = composer.final_repr(&cs, &state).unwrap();
            assert_eq!(repr.dims(), [composer.repr_dim()]);
        }
    }

    #[test]
    fn only_constituent_exposes_top() {
        let device = Default::default();
        let composer = Composer::<B>::new(SystemKind::Dependency, 4, 3, &device);
        let cs = composer.start(vec![Tensor::ones([4], &device)]);
        assert!(composer.top_repr(&cs).is_none());
    }
}
