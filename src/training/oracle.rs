//! Supervised Tree-LSTM on gold trees.
//!
//! The parse replays the oracle actions of the gold tree, so the policy
//! network plays no part. Constituent trees are supervised at every
//! labelled node as it reaches the top of the stack; dependency trees
//! only at the root.

use burn::module::{Module, ModuleVisitor, Param};
use burn::prelude::*;

use super::objective::{classification_nll, InstanceLoss};
use crate::data::Instance;
use crate::error::{Error, Result};
use crate::model::{to_scalar, Model, RolloutPolicy};
use crate::system::{Action, TransitionSystem};

/// Sum of squared parameter values.
struct SquaredNorm<B: Backend> {
    total: Option<Tensor<B, 1>>,
}

impl<B: Backend> ModuleVisitor<B> for SquaredNorm<B> {
    fn visit_float<const D: usize>(&mut self, param: &Param<Tensor<B, D>>) {
        let term = param.val().square().sum();
        self.total = Some(match self.total.take() {
            Some(total) => total + term,
            None => term,
        });
    }
}

/// `sum ||theta||^2` over the composer and the classifier.
pub fn squared_norm<B: Backend>(model: &Model<B>) -> Option<Tensor<B, 1>> {
    let mut visitor = SquaredNorm { total: None };
    model.composer.visit(&mut visitor);
    model.classifier.visit(&mut visitor);
    visitor.total
}

pub fn oracle_loss<B: Backend>(
    model: &Model<B>,
    instance: &Instance,
    oracle: &[Action],
    l2: f64,
) -> Result<InstanceLoss<B>> {
    let [tokens] = instance.sequences.as_slice() else {
        return Err(Error::InstanceArity {
            expected: 1,
            got: instance.sequences.len(),
        });
    };
    let tree = instance.tree.as_ref().ok_or(Error::MissingTree)?;
    let rollout = model.rollout(model.embed(tokens)?, &mut RolloutPolicy::Replay(oracle))?;

    let mut class_loss: Option<Tensor<B, 1>> = None;
    if model.system().transition_system() == TransitionSystem::Constituent {
        for (node, repr) in &rollout.tops {
            let Some(&Some(label)) = tree.labels.get(*node) else {
                continue;
            };
            let term = classification_nll(model.classifier_logits(&[repr.clone()])?, label);
            class_loss = Some(match class_loss {
                Some(acc) => acc + term,
                None => term,
            });
        }
    }
    let class_loss = match class_loss {
        Some(loss) => loss,
        None => classification_nll(model.classifier_logits(&[rollout.repr])?, instance.label),
    };
    let nll = to_scalar(class_loss.clone());

    let loss = match squared_norm(model) {
        Some(norm) if l2 > 0.0 => class_loss + norm.mul_scalar(0.5 * l2),
        _ => class_loss,
    };
    Ok(InstanceLoss {
        loss: Some(loss),
        nll,
    })
}
