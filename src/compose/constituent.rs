//! Binary Tree-LSTM over shift-reduce brackets.

use burn::module::{Initializer, Param};
use burn::nn::{Linear, LinearConfig};
use burn::prelude::*;
use burn::tensor::activation::sigmoid;

use super::layers::{merge2, Merge};
use super::{ComposeState, TreeLstmCell, GUARD_STD};
use crate::error::{Error, Result};
use crate::system::{Action, SHIFT};

#[derive(Config, Debug)]
pub struct ConstituentComposerConfig {
    pub word_dim: usize,
    pub hidden_dim: usize,
}

#[derive(Module, Debug)]
pub struct ConstituentComposer<B: Backend> {
    /// Leaf memory projection.
    input_gate_leaves: Linear<B>,
    output_gate_leaves: Linear<B>,
    input_gate: Merge<B>,
    output_gate: Merge<B>,
    left_forget_gate: Merge<B>,
    right_forget_gate: Merge<B>,
    cell: Merge<B>,
    /// Stand-ins for an absent second / top / buffer slot.
    guard_second: Param<Tensor<B, 1>>,
    guard_top: Param<Tensor<B, 1>>,
    guard_buffer: Param<Tensor<B, 1>>,
    hidden_dim: usize,
}

impl ConstituentComposerConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> ConstituentComposer<B> {
        let h = self.hidden_dim;
        let guard = || Initializer::Normal { mean: 0.0, std: GUARD_STD }.init([h], device);
        ConstituentComposer {
            input_gate_leaves: LinearConfig::new(self.word_dim, h).init(device),
            output_gate_leaves: LinearConfig::new(self.word_dim, h).init(device),
            input_gate: merge2(h, h, h, device),
            output_gate: merge2(h, h, h, device),
            left_forget_gate: merge2(h, h, h, device),
            right_forget_gate: merge2(h, h, h, device),
            cell: merge2(h, h, h, device),
            guard_second: guard(),
            guard_top: guard(),
            guard_buffer: guard(),
            hidden_dim: h,
        }
    }
}

impl<B: Backend> ConstituentComposer<B> {
    pub fn hidden_dim(&self) -> usize {
        self.hidden_dim
    }

    /// `c = W_i x`, `h = sigmoid(W_o x) * tanh(c)`; no forget gate at the leaves.
    pub fn leaf(&self, x: Tensor<B, 1>) -> TreeLstmCell<B> {
        let c = self.input_gate_leaves.forward(x.clone());
        let o = sigmoid(self.output_gate_leaves.forward(x));
        TreeLstmCell {
            h: o * c.clone().tanh(),
            c,
        }
    }

    /// Binary Tree-LSTM node from its left and right children.
    pub fn compose(&self, left: &TreeLstmCell<B>, right: &TreeLstmCell<B>) -> TreeLstmCell<B> {
        let (hl, hr) = (left.h.clone(), right.h.clone());
        let i = sigmoid(self.input_gate.forward2(hl.clone(), hr.clone()));
        let o = sigmoid(self.output_gate.forward2(hl.clone(), hr.clone()));
        let fl = sigmoid(self.left_forget_gate.forward2(hl.clone(), hr.clone()));
        let fr = sigmoid(self.right_forget_gate.forward2(hl.clone(), hr.clone()));
        let g = self.cell.forward2(hl, hr).tanh();
        let c = fl * left.c.clone() + fr * right.c.clone() + i * g;
        TreeLstmCell {
            h: o * c.clone().tanh(),
            c,
        }
    }

    pub fn start(&self, leaves: Vec<Tensor<B, 1>>) -> ComposeState<B> {
        let cells: Vec<_> = leaves.into_iter().map(|x| self.leaf(x)).collect();
        ComposeState {
            features: cells.iter().map(|cell| cell.h.clone()).collect(),
            inputs: Vec::new(),
            leaves: cells,
            stack: Vec::new(),
            next_leaf: 0,
        }
    }

    /// SHIFT pushes the next leaf cell, anything else reduces the top two.
    pub fn perform_action(&self, cs: &mut ComposeState<B>, action: Action) -> Result<()> {
        if action == SHIFT {
            let cell = cs.leaves.get(cs.next_leaf).cloned().ok_or(Error::InvalidAction {
                action,
                beta: cs.next_leaf,
                depth: cs.stack.len(),
            })?;
            cs.stack.push(cell);
            cs.next_leaf += 1;
            return Ok(());
        }
        let depth = cs.stack.len();
        if depth < 2 {
            return Err(Error::StackUnderflow { action, depth });
        }
        let (Some(right), Some(left)) = (cs.stack.pop(), cs.stack.pop()) else {
            return Err(Error::StackUnderflow { action, depth });
        };
        cs.stack.push(self.compose(&left, &right));
        Ok(())
    }

    /// `[second; top; next leaf]`, guards filling missing slots.
    pub fn state_repr(&self, cs: &ComposeState<B>) -> Tensor<B, 1> {
        let depth = cs.stack.len();
        let second = match depth.checked_sub(2) {
            Some(i) => cs.stack[i].h.clone(),
            None => self.guard_second.val(),
        };
        let top = match cs.stack.last() {
            Some(cell) => cell.h.clone(),
            None => self.guard_top.val(),
        };
        let buffer = match cs.features.get(cs.next_leaf) {
            Some(h) => h.clone(),
            None => self.guard_buffer.val(),
        };
        Tensor::cat(vec![second, top, buffer], 0)
    }

    /// Hidden vector of the node on top of the stack.
    pub fn top_repr(&self, cs: &ComposeState<B>) -> Option<Tensor<B, 1>> {
        cs.stack.last().map(|cell| cell.h.clone())
    }

    pub fn final_repr(&self, cs: &ComposeState<B>) -> Result<Tensor<B, 1>> {
        match cs.stack.as_slice() {
            [root] if cs.next_leaf == cs.leaves.len() => Ok(root.h.clone()),
            _ => Err(Error::IncompleteParse {
                depth: cs.stack.len(),
                remaining: cs.leaves.len() - cs.next_leaf,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::REDUCE;
    use burn::backend::NdArray;

    type B = NdArray;

    fn composer(device: &<B as Backend>::Device) -> ConstituentComposer<B> {
        ConstituentComposerConfig::new(4, 3).init(device)
    }

    fn leaves(n: usize, device: &<B as Backend>::Device) -> Vec<Tensor<B, 1>> {
        (0..n)
            .map(|i| Tensor::<B, 1>::ones([4], device).mul_scalar(i as f32 * 0.1))
            .collect()
    }

    #[test]
    fn leaf_cell_has_hidden_width() {
        let device = Default::default();
        let cell = composer(&device).leaf(Tensor::ones([4], &device));
        assert_eq!(cell.h.dims(), [3]);
        assert_eq!(cell.c.dims(), [3]);
    }

    #[test]
    fn stack_follows_actions() {
        let device = Default::default();
        let composer = composer(&device);
        let mut cs = composer.start(leaves(3, &device));
        for a in [SHIFT, SHIFT, REDUCE, SHIFT] {
            composer.perform_action(&mut cs, a).unwrap();
        }
        assert_eq!(cs.stack.len(), 2);
        composer.perform_action(&mut cs, REDUCE).unwrap();
        assert_eq!(cs.stack.len(), 1);
        assert_eq!(composer.final_repr(&cs).unwrap().dims(), [3]);
    }

    #[test]
    fn reduce_on_single_cell_underflows() {
        let device = Default::default();
        let composer = composer(&device);
        let mut cs = composer.start(leaves(2, &device));
        composer.perform_action(&mut cs, SHIFT).unwrap();
        let err = composer.perform_action(&mut cs, REDUCE).unwrap_err();
        assert!(matches!(err, Error::StackUnderflow { depth: 1, .. }));
        assert!(matches!(
            composer.final_repr(&cs),
            Err(Error::IncompleteParse { depth: 1, remaining: 1 })
        ));
    }

    #[test]
    fn state_repr_width_is_constant() {
        let device = Default::default();
        let composer = composer(&device);
        let mut cs = composer.start(leaves(2, &device));
        assert_eq!(composer.state_repr(&cs).dims(), [9]);
        for a in [SHIFT, SHIFT, REDUCE] {
            composer.perform_action(&mut cs, a).unwrap();
            assert_eq!(composer.state_repr(&cs).dims(), [9]);
        }
    }

    #[test]
    fn single_leaf_repr_is_leaf_hidden() {
        let device = Default::default();
        let composer = composer(&device);
        let input = leaves(1, &device);
        let expected = composer.leaf(input[0].clone()).h;
        let mut cs = composer.start(input);
        composer.perform_action(&mut cs, SHIFT).unwrap();
        let got = composer.final_repr(&cs).unwrap();
        let diff = (got - expected).abs().sum().into_scalar();
        assert!(diff < 1e-6);
    }
}
