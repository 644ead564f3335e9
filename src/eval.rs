//! Accuracy over a corpus, optionally with a per-instance report.

use std::io::Write;

use burn::prelude::*;

use crate::data::Instance;
use crate::error::{Error, Result};
use crate::model::{policy::argmax, to_floats, Model, PolicyKind, RolloutPolicy};
use crate::system::ParserState;

/// How trees are chosen when predicting.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PredictMode {
    Policy(PolicyKind),
    /// Parse along the gold tree; needs a tree corpus.
    Oracle,
}

/// Predicted label and final parser states for one instance.
pub fn predict_instance<B: Backend>(
    model: &Model<B>,
    instance: &Instance,
    mode: PredictMode,
) -> Result<(usize, Vec<ParserState>)> {
    match mode {
        PredictMode::Policy(policy) => model.predict_with_state(&instance.sequences, policy),
        PredictMode::Oracle => {
            let tree = instance.tree.as_ref().ok_or(Error::MissingTree)?;
            let oracle = model.system().transition_system().oracle_actions(&tree.parents)?;
            let rollouts = model.compose_all(&instance.sequences, &mut RolloutPolicy::Replay(&oracle))?;
            let reprs: Vec<_> = rollouts.iter().map(|r| r.repr.clone()).collect();
            let label = argmax(&to_floats(model.classifier_logits(&reprs)?));
            Ok((label, rollouts.into_iter().map(|r| r.state).collect()))
        }
    }
}

/// Fraction of instances predicted correctly; `0.0` on an empty corpus.
///
/// With a `report`, each instance adds a `gold: X pred: Y` line followed
/// by the tree of every sequence.
pub fn evaluate<B: Backend>(
    model: &Model<B>,
    instances: &[Instance],
    mode: PredictMode,
    mut report: Option<&mut dyn Write>,
) -> Result<f64> {
    if instances.is_empty() {
        return Ok(0.0);
    }
    let system = model.system().transition_system();
    let mut correct = 0usize;
    for instance in instances {
        let (label, states) = predict_instance(model, instance, mode)?;
        if label == instance.label {
            correct += 1;
        }
        if let Some(out) = report.as_deref_mut() {
            let write = |out: &mut dyn Write| -> std::io::Result<()> {
                writeln!(out, "gold: {} pred: {label}", instance.label)?;
                for state in &states {
                    system.print_tree(state, out)?;
                }
                Ok(())
            };
            write(out).map_err(|e| Error::io("<report>", e))?;
        }
    }
    Ok(correct as f64 / instances.len() as f64)
}
