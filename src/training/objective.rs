//! Per-instance losses for the learning-to-compose regime.

use std::str::FromStr;

use burn::config::Config;
use burn::prelude::*;
use burn::tensor::activation::log_softmax;

use crate::error::{Error, Result};
use crate::model::{index_tensor, to_scalar, PolicyKind, PolicyStep};

/// Lower bound on the REINFORCE reward.
pub const REWARD_FLOOR: f32 = -50.0;

/// Which terms an epoch optimizes.
#[derive(Config, Debug, Copy, PartialEq, Eq)]
pub enum ObjectiveType {
    /// REINFORCE term only.
    PolicyOnly,
    /// Classification loss only.
    RewardOnly,
    BothPolicyAndReward,
}

impl ObjectiveType {
    pub fn name(&self) -> &'static str {
        match self {
            Self::PolicyOnly => "policy",
            Self::RewardOnly => "reward",
            Self::BothPolicyAndReward => "both",
        }
    }

    pub fn has_policy_term(&self) -> bool {
        !matches!(self, Self::RewardOnly)
    }
}

impl FromStr for ObjectiveType {
    type Err = Error;

    fn from_str(name: &str) -> Result<Self> {
        match name {
            "policy" => Ok(Self::PolicyOnly),
            "reward" => Ok(Self::RewardOnly),
            "both" => Ok(Self::BothPolicyAndReward),
            other => Err(Error::BadSchedule(format!("unknown objective '{other}'"))),
        }
    }
}

/// `-log softmax(logits)[label]`, shape `[1]`.
pub fn classification_nll<B: Backend>(logits: Tensor<B, 1>, label: usize) -> Tensor<B, 1> {
    let device = logits.device();
    log_softmax(logits, 0)
        .select(0, index_tensor::<B>(&[label], &device))
        .neg()
}

/// Reward for an instance whose classification loss is `nll`.
pub fn reward(nll: f32) -> f32 {
    (-nll).max(REWARD_FLOOR)
}

/// `sum_t -log p(a_t) * reward`, or `None` when nothing was recorded.
pub fn policy_loss<B: Backend>(steps: &[PolicyStep<B>], reward: f32) -> Option<Tensor<B, 1>> {
    steps
        .iter()
        .map(|step| step.neg_log_prob().mul_scalar(reward))
        .reduce(|acc, term| acc + term)
}

/// Loss of one instance plus its detached classification loss.
pub struct InstanceLoss<B: Backend> {
    /// `None` when no term depends on trainable parameters.
    pub loss: Option<Tensor<B, 1>>,
    pub nll: f32,
}

/// Assemble the learning-to-compose loss.
///
/// Fixed policies and `RewardOnly` return the classification loss.
/// `PolicyOnly` treats the reward as a constant; `BothPolicyAndReward`
/// adds the classification loss to the policy term.
pub fn learn_to_compose<B: Backend>(
    class_logits: Tensor<B, 1>,
    label: usize,
    steps: &[PolicyStep<B>],
    policy: PolicyKind,
    objective: ObjectiveType,
) -> InstanceLoss<B> {
    let nll_tensor = classification_nll(class_logits, label);
    let nll = to_scalar(nll_tensor.clone());
    if policy.is_fixed() || objective == ObjectiveType::RewardOnly {
        return InstanceLoss {
            loss: Some(nll_tensor),
            nll,
        };
    }
    let reinforce = policy_loss(steps, reward(nll));
    let loss = match objective {
        ObjectiveType::PolicyOnly => reinforce,
        _ => Some(match reinforce {
            Some(term) => term + nll_tensor,
            None => nll_tensor,
        }),
    };
    InstanceLoss { loss, nll }
}
