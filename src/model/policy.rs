//! How a rollout chooses its next action.

use std::str::FromStr;

use burn::config::Config;
use rand::distributions::{Distribution, WeightedIndex};
use rand::RngCore;

use crate::error::{Error, Result};
use crate::system::Action;

/// Policy named in configuration files and on the command line.
///
/// `left` and `right` are named after the tree they build, so `left`
/// composes eagerly and `right` shifts first.
#[derive(Config, Debug, Copy, PartialEq, Eq)]
pub enum PolicyKind {
    /// Learned policy: sampled while training, arg-max when predicting.
    Sample,
    /// Compose as soon as two nodes are on the stack (left-branching).
    Left,
    /// Shift the whole buffer before composing (right-branching).
    Right,
}

impl PolicyKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Sample => "sample",
            Self::Left => "left",
            Self::Right => "right",
        }
    }

    pub fn is_fixed(&self) -> bool {
        !matches!(self, Self::Sample)
    }

    /// Deterministic rollout for prediction.
    pub fn decoder<'a>(&self) -> RolloutPolicy<'a> {
        match self {
            Self::Sample => RolloutPolicy::Decode,
            Self::Left => RolloutPolicy::Left,
            Self::Right => RolloutPolicy::Right,
        }
    }
}

impl FromStr for PolicyKind {
    type Err = Error;

    fn from_str(name: &str) -> Result<Self> {
        match name {
            "sample" => Ok(Self::Sample),
            "left" => Ok(Self::Left),
            "right" => Ok(Self::Right),
            other => Err(Error::UnknownPolicy(other.to_string())),
        }
    }
}

/// Strategy for one rollout.
pub enum RolloutPolicy<'a> {
    /// Draw each non-forced action from the valid-restricted softmax.
    Sample(&'a mut dyn RngCore),
    /// Arg-max over the valid-restricted softmax.
    Decode,
    Left,
    Right,
    /// Apply a precomputed action sequence.
    Replay(&'a [Action]),
}

impl RolloutPolicy<'_> {
    /// Whether the policy network has to be evaluated at a step with
    /// `n_valid` legal actions.
    pub fn needs_logits(&self, n_valid: usize) -> bool {
        match self {
            Self::Sample(_) | Self::Decode => n_valid > 1,
            Self::Replay(_) => true,
            Self::Left | Self::Right => false,
        }
    }
}

/// Categorical draw over `probs`, returning the chosen index.
pub fn sample_index(probs: &[f32], rng: &mut dyn RngCore) -> Result<usize> {
    let dist = WeightedIndex::new(probs)
        .map_err(|e| Error::Tensor(format!("cannot sample from {probs:?}: {e}")))?;
    Ok(dist.sample(rng))
}

/// Index of the largest value; ties go to the earliest.
pub fn argmax(values: &[f32]) -> usize {
    values
        .iter()
        .enumerate()
        .fold((0, f32::NEG_INFINITY), |best, (i, &v)| {
            if v > best.1 {
                (i, v)
            } else {
                best
            }
        })
        .0
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn parses_policy_names() {
        assert_eq!("left".parse::<PolicyKind>().unwrap(), PolicyKind::Left);
        assert_eq!("sample".parse::<PolicyKind>().unwrap(), PolicyKind::Sample);
        assert!(matches!(
            "greedy".parse::<PolicyKind>(),
            Err(Error::UnknownPolicy(_))
        ));
        assert!(PolicyKind::Right.is_fixed());
    }

    #[test]
    fn argmax_prefers_first_maximum() {
        assert_eq!(argmax(&[0.2, 0.5, 0.5]), 1);
        assert_eq!(argmax(&[1.0]), 0);
    }

    #[test]
    fn sampling_follows_weights() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..20 {
            assert_eq!(sample_index(&[0.0, 1.0], &mut rng).unwrap(), 1);
        }
        assert!(sample_index(&[0.0, 0.0], &mut rng).is_err());
    }

    #[test]
    fn fixed_policies_skip_the_scorer() {
        assert!(!RolloutPolicy::Left.needs_logits(2));
        assert!(!RolloutPolicy::Decode.needs_logits(1));
        assert!(RolloutPolicy::Replay(&[]).needs_logits(1));
    }
}
