//! Child-sum Tree-LSTM over dependency arcs.
//!
//! Arc actions only move the parser; the whole tree is composed once,
//! bottom-up from the leaves, when the final representation is asked for.

use burn::module::{Initializer, Param};
use burn::prelude::*;
use burn::tensor::activation::sigmoid;

use super::layers::{merge2, Merge};
use super::{ComposeState, TreeLstmCell, GUARD_STD};
use crate::error::{Error, Result};
use crate::system::tree::ChildLists;
use crate::system::ParserState;

#[derive(Config, Debug)]
pub struct DependencyComposerConfig {
    /// Width of the token vectors fed to the gates.
    pub word_dim: usize,
    pub hidden_dim: usize,
    /// Width of the vectors the policy reads per token; the guards match it.
    pub feature_dim: usize,
}

#[derive(Module, Debug)]
pub struct DependencyComposer<B: Backend> {
    input_gate: Merge<B>,
    output_gate: Merge<B>,
    /// Applied once per child.
    forget_gate: Merge<B>,
    cell: Merge<B>,
    guard_second: Param<Tensor<B, 1>>,
    guard_top: Param<Tensor<B, 1>>,
    guard_buffer: Param<Tensor<B, 1>>,
    hidden_dim: usize,
}

impl DependencyComposerConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> DependencyComposer<B> {
        let (x, h) = (self.word_dim, self.hidden_dim);
        let guard = || {
            Initializer::Normal { mean: 0.0, std: GUARD_STD }.init([self.feature_dim], device)
        };
        DependencyComposer {
            input_gate: merge2(x, h, h, device),
            output_gate: merge2(x, h, h, device),
            forget_gate: merge2(x, h, h, device),
            cell: merge2(x, h, h, device),
            guard_second: guard(),
            guard_top: guard(),
            guard_buffer: guard(),
            hidden_dim: h,
        }
    }
}

impl<B: Backend> DependencyComposer<B> {
    pub fn hidden_dim(&self) -> usize {
        self.hidden_dim
    }

    /// Leaves are kept as they are; `features` defaults to the same vectors.
    pub fn start(
        &self,
        inputs: Vec<Tensor<B, 1>>,
        features: Option<Vec<Tensor<B, 1>>>,
    ) -> ComposeState<B> {
        ComposeState {
            features: features.unwrap_or_else(|| inputs.clone()),
            inputs,
            leaves: Vec::new(),
            stack: Vec::new(),
            next_leaf: 0,
        }
    }

    /// `[second; top; next token]` read off the parser's stack and buffer.
    pub fn state_repr(&self, cs: &ComposeState<B>, state: &ParserState) -> Tensor<B, 1> {
        let feature = |id: Option<usize>, guard: &Param<Tensor<B, 1>>| {
            id.and_then(|i| cs.features.get(i))
                .cloned()
                .unwrap_or_else(|| guard.val())
        };
        Tensor::cat(
            vec![
                feature(state.second(), &self.guard_second),
                feature(state.top(), &self.guard_top),
                feature(Some(state.beta), &self.guard_buffer),
            ],
            0,
        )
    }

    /// One child-sum node: `x` is the head's input, `children` its
    /// already composed dependents.
    pub fn compose(&self, x: Tensor<B, 1>, children: &[TreeLstmCell<B>]) -> TreeLstmCell<B> {
        let device = x.device();
        let mut h_sum: Tensor<B, 1> = Tensor::zeros([self.hidden_dim], &device);
        let mut c_sum: Tensor<B, 1> = Tensor::zeros([self.hidden_dim], &device);
        for child in children {
            let f = sigmoid(self.forget_gate.forward2(x.clone(), child.h.clone()));
            h_sum = h_sum + child.h.clone();
            c_sum = c_sum + f * child.c.clone();
        }
        let i = sigmoid(self.input_gate.forward2(x.clone(), h_sum.clone()));
        let o = sigmoid(self.output_gate.forward2(x.clone(), h_sum.clone()));
        let u = self.cell.forward2(x, h_sum).tanh();
        let c = i * u + c_sum;
        TreeLstmCell {
            h: o * c.clone().tanh(),
            c,
        }
    }

    /// Compose the tree recorded in `state.heads` and return the root's
    /// hidden vector. Zero or several roots are fatal.
    pub fn final_repr(&self, cs: &ComposeState<B>, state: &ParserState) -> Result<Tensor<B, 1>> {
        let tree = ChildLists::from_parents(&state.heads)?;

        // Reverse pre-order reaches every child before its head.
        let mut order = Vec::with_capacity(tree.len());
        let mut frontier = vec![tree.root];
        while let Some(node) = frontier.pop() {
            order.push(node);
            frontier.extend(&tree.children[node]);
        }

        let mut cells: Vec<Option<TreeLstmCell<B>>> = vec![None; tree.len()];
        for &node in order.iter().rev() {
            let children: Vec<_> = tree.children[node]
                .iter()
                .filter_map(|&c| cells[c].clone())
                .collect();
            let x = cs.inputs[node].clone();
            cells[node] = Some(self.compose(x, &children));
        }
        match cells[tree.root].take() {
            Some(cell) => Ok(cell.h),
            None => Err(Error::MissingRoot),
        }
    }
}
