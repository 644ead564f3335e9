//! Per-epoch `(policy, objective)` schedule.
//!
//! Grammar, with `tok = policy_objective_times`:
//!
//! ```text
//! tok                  the same phase for every epoch
//! tok(tokA,tokB,..)+   `times` epochs of tok, then cycle the group
//! (tokA,tokB,..)+      cycle the group from the first epoch
//! ```
//!
//! `times` is a count or `+` (as many epochs as remain).

use std::fmt;

use super::objective::ObjectiveType;
use crate::error::{Error, Result};
use crate::model::PolicyKind;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Phase {
    pub policy: PolicyKind,
    pub objective: ObjectiveType,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.policy.name(), self.objective.name())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Times {
    Count(usize),
    Rest,
}

fn parse_token(token: &str) -> Result<(Phase, Times)> {
    let parts: Vec<&str> = token.trim().split('_').collect();
    let [policy, objective, times] = parts.as_slice() else {
        return Err(Error::BadSchedule(format!(
            "'{token}' is not policy_objective_times"
        )));
    };
    let policy: PolicyKind = policy.to_ascii_lowercase().parse()?;
    let objective: ObjectiveType = objective.to_ascii_lowercase().parse()?;
    let times = match *times {
        "+" => Times::Rest,
        n => Times::Count(
            n.parse()
                .map_err(|_| Error::BadSchedule(format!("bad repeat count '{n}' in '{token}'")))?,
        ),
    };
    if policy.is_fixed() && objective.has_policy_term() {
        log::warn!(
            "fixed policy {} paired with objective {} that trains the policy network",
            policy.name(),
            objective.name()
        );
    }
    Ok((Phase { policy, objective }, times))
}

fn push(seq: &mut Vec<Phase>, phase: Phase, times: Times, max_iter: usize) {
    let count = match times {
        Times::Count(n) => n,
        Times::Rest => max_iter.saturating_sub(seq.len()),
    };
    seq.extend(std::iter::repeat(phase).take(count));
}

fn parse_loop(expr: &str, max_iter: usize, seq: &mut Vec<Phase>) -> Result<()> {
    let body = expr
        .strip_prefix('(')
        .and_then(|rest| rest.split_once(')'))
        .map(|(body, _)| body)
        .ok_or_else(|| Error::BadSchedule(format!("unbalanced group '{expr}'")))?;
    let group = body
        .split(',')
        .map(parse_token)
        .collect::<Result<Vec<_>>>()?;
    if group
        .iter()
        .all(|(_, times)| *times == Times::Count(0))
    {
        return Err(Error::BadSchedule(format!("group '{expr}' never advances")));
    }
    for (phase, times) in group.iter().cycle() {
        if seq.len() >= max_iter {
            break;
        }
        push(seq, *phase, *times, max_iter);
    }
    Ok(())
}

/// Resolve `expr` into exactly `max_iter` phases.
pub fn parse_schedule(expr: &str, max_iter: usize) -> Result<Vec<Phase>> {
    let expr = expr.trim();
    let mut seq = Vec::with_capacity(max_iter);
    match expr.find('(') {
        Some(0) => parse_loop(expr, max_iter, &mut seq)?,
        Some(p) => {
            let (phase, times) = parse_token(&expr[..p])?;
            push(&mut seq, phase, times, max_iter);
            parse_loop(&expr[p..], max_iter, &mut seq)?;
        }
        None => {
            let (phase, _) = parse_token(expr)?;
            push(&mut seq, phase, Times::Rest, max_iter);
        }
    }
    seq.truncate(max_iter);
    Ok(seq)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codes(phases: &[Phase]) -> Vec<String> {
        phases.iter().map(|p| p.to_string()).collect()
    }

    #[test]
    fn single_token_fills_every_epoch() {
        let phases = parse_schedule("sample_both_+", 3).unwrap();
        assert_eq!(codes(&phases), ["sample_both", "sample_both", "sample_both"]);
        let phases = parse_schedule("right_reward_1", 2).unwrap();
        assert_eq!(codes(&phases), ["right_reward", "right_reward"]);
    }

    #[test]
    fn prefix_then_cycle() {
        let phases = parse_schedule("right_reward_1(sample_policy_1,sample_reward_2)+", 6).unwrap();
        assert_eq!(
            codes(&phases),
            [
                "right_reward",
                "sample_policy",
                "sample_reward",
                "sample_reward",
                "sample_policy",
                "sample_reward"
            ]
        );
    }

    #[test]
    fn bare_group_cycles() {
        let phases = parse_schedule("(left_reward_1,sample_both_1)+", 3).unwrap();
        assert_eq!(codes(&phases), ["left_reward", "sample_both", "left_reward"]);
    }

    #[test]
    fn long_prefix_is_truncated() {
        let phases = parse_schedule("left_reward_9(sample_both_1)+", 4).unwrap();
        assert_eq!(phases.len(), 4);
        assert!(phases.iter().all(|p| p.policy == PolicyKind::Left));
    }

    #[test]
    fn rejects_malformed_schedules() {
        for bad in [
            "sample_both",
            "sample_maybe_1",
            "greedy_both_1",
            "sample_both_x",
            "(sample_both_1",
            "(sample_both_0)+",
        ] {
            assert!(
                matches!(
                    parse_schedule(bad, 3),
                    Err(Error::BadSchedule(_) | Error::UnknownPolicy(_))
                ),
                "{bad}"
            );
        }
    }
}
