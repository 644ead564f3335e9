//! Plain policy gradient: the class label is one more sampled action.
//!
//! Every transition and the label are drawn from the model. The episode
//! earns `+1` when the label is gold and `-1` otherwise, and that return
//! weights the log-probability of every draw.

use burn::prelude::*;
use burn::tensor::activation::softmax;
use rand::RngCore;

use super::objective::{classification_nll, InstanceLoss};
use crate::data::Instance;
use crate::error::Result;
use crate::model::policy::sample_index;
use crate::model::{to_floats, to_scalar, Model, RolloutPolicy};

/// Return of an episode whose sampled label was `label`.
pub fn terminal_reward(label: usize, gold: usize) -> f32 {
    if label == gold {
        1.0
    } else {
        -1.0
    }
}

pub fn pg_loss<B: Backend>(
    model: &Model<B>,
    instance: &Instance,
    rng: &mut dyn RngCore,
) -> Result<InstanceLoss<B>> {
    let rollouts = model.compose_all(&instance.sequences, &mut RolloutPolicy::Sample(&mut *rng))?;
    let reprs: Vec<_> = rollouts.iter().map(|r| r.repr.clone()).collect();
    let logits = model.classifier_logits(&reprs)?;

    let probs = to_floats(softmax(logits.clone().detach(), 0));
    let label = sample_index(&probs, rng)?;
    let reward = terminal_reward(label, instance.label);
    let nll = to_scalar(classification_nll(logits.clone().detach(), instance.label));

    let loss = rollouts
        .iter()
        .flat_map(|r| r.steps.iter())
        .map(|step| step.neg_log_prob())
        .fold(classification_nll(logits, label), |acc, term| acc + term)
        .mul_scalar(reward);
    log::debug!("sampled label {label} (gold {}), reward {reward}", instance.label);
    Ok(InstanceLoss {
        loss: Some(loss),
        nll,
    })
}
