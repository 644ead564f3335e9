//! One complete parse of one token sequence.

use burn::prelude::*;
use burn::tensor::activation::{log_softmax, softmax};

use super::policy::{argmax, sample_index, RolloutPolicy};
use super::{index_tensor, to_floats, Model};
use crate::error::{Error, Result};
use crate::system::{episode_len, Action, ParserState, SHIFT};

/// Policy scores at one decision point and the action taken there.
#[derive(Clone, Debug)]
pub struct PolicyStep<B: Backend> {
    /// Scores over every action of the system.
    pub logits: Tensor<B, 1>,
    /// Legal actions at this point, ascending.
    pub valid: Vec<Action>,
    /// Position of the chosen action in `valid`.
    pub choice: usize,
}

impl<B: Backend> PolicyStep<B> {
    pub fn action(&self) -> Action {
        self.valid[self.choice]
    }

    /// `-log p(action)` under the softmax restricted to `valid`, shape `[1]`.
    pub fn neg_log_prob(&self) -> Tensor<B, 1> {
        let device = self.logits.device();
        let restricted = self
            .logits
            .clone()
            .select(0, index_tensor::<B>(&self.valid, &device));
        log_softmax(restricted, 0)
            .select(0, index_tensor::<B>(&[self.choice], &device))
            .neg()
    }
}

/// Everything a rollout produced.
#[derive(Clone, Debug)]
pub struct Rollout<B: Backend> {
    /// Final representation of the sequence.
    pub repr: Tensor<B, 1>,
    /// Recorded decision points (see [`RolloutPolicy::needs_logits`]).
    pub steps: Vec<PolicyStep<B>>,
    /// Every action applied, `2n - 1` of them.
    pub actions: Vec<Action>,
    pub state: ParserState,
    /// Node id and representation on top of the stack after each action,
    /// for composers that build nodes incrementally.
    pub tops: Vec<(usize, Tensor<B, 1>)>,
}

impl<B: Backend> Model<B> {
    /// Drive one parse of `leaves` to completion under `policy`.
    pub fn rollout(
        &self,
        leaves: Vec<Tensor<B, 1>>,
        policy: &mut RolloutPolicy<'_>,
    ) -> Result<Rollout<B>> {
        let n = leaves.len();
        if n == 0 {
            return Err(Error::EmptyInstance);
        }
        let expected = episode_len(n);
        if let RolloutPolicy::Replay(actions) = policy {
            if actions.len() != expected {
                return Err(Error::OracleLength {
                    expected,
                    got: actions.len(),
                });
            }
        }

        let system = self.system().transition_system();
        let mut state = ParserState::new(n);
        let mut cs = self.composer.start(leaves);
        let mut steps = Vec::new();
        let mut actions = Vec::with_capacity(expected);
        let mut tops = Vec::new();

        while !state.is_terminated() {
            let valid = system.valid_actions(&state);
            if valid.is_empty() || actions.len() >= expected {
                return Err(Error::InvalidAction {
                    action: SHIFT,
                    beta: state.beta,
                    depth: state.depth(),
                });
            }
            let logits = policy
                .needs_logits(valid.len())
                .then(|| self.policy_logits(self.composer.state_repr(&cs, &state)));

            let action = match (&mut *policy, &logits) {
                (RolloutPolicy::Replay(oracle), _) => oracle[actions.len()],
                (RolloutPolicy::Left, _) => {
                    let reduce = system.reduce_action(&state);
                    if system.is_valid(&state, reduce) {
                        reduce
                    } else {
                        SHIFT
                    }
                }
                (RolloutPolicy::Right, _) => {
                    if system.is_valid(&state, SHIFT) {
                        SHIFT
                    } else {
                        system.reduce_action(&state)
                    }
                }
                (RolloutPolicy::Sample(rng), Some(logits)) => {
                    let probs = valid_probs(logits, &valid);
                    let pick = valid[sample_index(&probs, &mut **rng)?];
                    log::debug!("sampled {} from {probs:?}", system.action_name(pick));
                    pick
                }
                (RolloutPolicy::Decode, Some(logits)) => valid[argmax(&valid_probs(logits, &valid))],
                (RolloutPolicy::Sample(_) | RolloutPolicy::Decode, None) => valid[0],
            };

            let Some(choice) = valid.iter().position(|&a| a == action) else {
                return Err(Error::InvalidAction {
                    action,
                    beta: state.beta,
                    depth: state.depth(),
                });
            };
            if let Some(logits) = logits {
                steps.push(PolicyStep {
                    logits,
                    valid,
                    choice,
                });
            }

            self.composer.perform_action(&mut cs, action)?;
            system.perform_action(&mut state, action)?;
            actions.push(action);
            if let (Some(node), Some(repr)) = (state.top(), self.composer.top_repr(&cs)) {
                tops.push((node, repr));
            }
        }

        let repr = self.composer.final_repr(&cs, &state)?;
        Ok(Rollout {
            repr,
            steps,
            actions,
            state,
            tops,
        })
    }
}

/// Softmax over the valid actions only, in `valid` order.
fn valid_probs<B: Backend>(logits: &Tensor<B, 1>, valid: &[Action]) -> Vec<f32> {
    let restricted = logits
        .clone()
        .detach()
        .select(0, index_tensor::<B>(valid, &logits.device()));
    to_floats(softmax(restricted, 0))
}
