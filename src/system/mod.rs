//! Shift-reduce transition systems.
//!
//! Two closed variants share one `ParserState`:
//!
//! - **Constituent**: `SHIFT` / `REDUCE` build a binary bracketing. Every
//!   reduce allocates a fresh internal node id.
//! - **Dependency**: `SHIFT` / `LEFT-ARC` / `RIGHT-ARC` attach heads to
//!   tokens (arc-standard).
//!
//! Validity only ever depends on `beta < n` (shift) and a stack of at
//! least two entries (everything else). Every complete parse of `n`
//! tokens takes exactly `2n - 1` actions.

pub mod constituent;
pub mod dependency;
pub mod state;
pub mod tree;

use std::io;
use std::str::FromStr;

use burn::config::Config;

use crate::error::{Error, Result};
pub use state::{ParserState, UNSET};

/// Action index into the policy's logit vector.
pub type Action = usize;

pub const SHIFT: Action = 0;
pub const REDUCE: Action = 1;
pub const LEFT_ARC: Action = 1;
pub const RIGHT_ARC: Action = 2;

/// Number of actions in a complete parse of `n >= 1` tokens.
pub fn episode_len(n: usize) -> usize {
    (2 * n).saturating_sub(1)
}

// ─── Configuration ─────────────────────────────────────────────────

/// Transition system and composer pairing selected by name.
#[derive(Config, Debug, Copy, PartialEq, Eq)]
pub enum SystemKind {
    Constituent,
    Dependency,
    /// Dependency system whose stack/buffer features come from a BiLSTM.
    DependencyBiLstm,
}

impl SystemKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Constituent => "constituent",
            Self::Dependency => "dependency",
            Self::DependencyBiLstm => "dependency_bilstm",
        }
    }

    pub fn transition_system(&self) -> TransitionSystem {
        match self {
            Self::Constituent => TransitionSystem::Constituent,
            Self::Dependency | Self::DependencyBiLstm => TransitionSystem::Dependency,
        }
    }
}

impl FromStr for SystemKind {
    type Err = Error;

    fn from_str(name: &str) -> Result<Self> {
        match name {
            "constituent" | "cons" => Ok(Self::Constituent),
            "dependency" | "dep" => Ok(Self::Dependency),
            "dependency_bilstm" | "dep_bilstm" => Ok(Self::DependencyBiLstm),
            other => Err(Error::UnknownSystem(other.to_string())),
        }
    }
}

// ─── Transition system ─────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransitionSystem {
    Constituent,
    Dependency,
}

impl TransitionSystem {
    pub fn num_actions(&self) -> usize {
        match self {
            Self::Constituent => 2,
            Self::Dependency => 3,
        }
    }

    /// Legal actions in ascending order.
    pub fn valid_actions(&self, state: &ParserState) -> Vec<Action> {
        let mut actions = Vec::with_capacity(self.num_actions());
        if state.beta < state.n {
            actions.push(SHIFT);
        }
        if state.depth() > 1 {
            match self {
                Self::Constituent => actions.push(REDUCE),
                Self::Dependency => actions.extend([LEFT_ARC, RIGHT_ARC]),
            }
        }
        actions
    }

    pub fn is_valid(&self, state: &ParserState, action: Action) -> bool {
        if action == SHIFT {
            state.beta < state.n
        } else {
            action < self.num_actions() && state.depth() > 1
        }
    }

    /// Apply `action` to `state`.
    ///
    /// A composing action on a stack with fewer than two entries is
    /// `StackUnderflow`; a shift with an empty buffer or an out-of-range
    /// action is `InvalidAction`.
    pub fn perform_action(&self, state: &mut ParserState, action: Action) -> Result<()> {
        if action >= self.num_actions() || (action == SHIFT && state.beta >= state.n) {
            return Err(Error::InvalidAction {
                action,
                beta: state.beta,
                depth: state.depth(),
            });
        }
        if action == SHIFT {
            shift(state);
            return Ok(());
        }
        if state.depth() < 2 {
            return Err(Error::StackUnderflow {
                action,
                depth: state.depth(),
            });
        }
        match (self, action) {
            (Self::Constituent, _) => constituent::reduce(state),
            (Self::Dependency, LEFT_ARC) => dependency::left_arc(state),
            (Self::Dependency, _) => dependency::right_arc(state),
        }
    }

    pub fn shift_action(&self) -> Action {
        SHIFT
    }

    /// The composing action used by the fixed left/right policies.
    ///
    /// Dependency systems compose with RIGHT-ARC and fall back to
    /// LEFT-ARC when RIGHT-ARC is not valid.
    pub fn reduce_action(&self, state: &ParserState) -> Action {
        match self {
            Self::Constituent => REDUCE,
            Self::Dependency if self.is_valid(state, RIGHT_ARC) => RIGHT_ARC,
            Self::Dependency => LEFT_ARC,
        }
    }

    /// The unique action sequence that rebuilds the gold tree.
    ///
    /// Constituent `parents` span `2n - 1` nodes (leaves `0..n`);
    /// dependency `parents` span the `n` tokens.
    pub fn oracle_actions(&self, parents: &[usize]) -> Result<Vec<Action>> {
        match self {
            Self::Constituent => constituent::oracle_actions(parents),
            Self::Dependency => dependency::oracle_actions(parents),
        }
    }

    pub fn action_name(&self, action: Action) -> &'static str {
        match (self, action) {
            (_, SHIFT) => "SHIFT",
            (Self::Constituent, REDUCE) => "REDUCE",
            (Self::Dependency, LEFT_ARC) => "LEFT",
            (Self::Dependency, RIGHT_ARC) => "RIGHT",
            _ => "?",
        }
    }

    /// Text rendering of the (possibly partial) parse.
    pub fn render_tree(&self, state: &ParserState) -> String {
        match self {
            Self::Constituent => constituent::render(state),
            Self::Dependency => dependency::render(state),
        }
    }

    pub fn print_tree(&self, state: &ParserState, out: &mut dyn io::Write) -> io::Result<()> {
        out.write_all(self.render_tree(state).as_bytes())
    }
}

/// Move the next buffer token onto the stack.
pub fn shift(state: &mut ParserState) {
    state.sigma.push(state.beta);
    state.beta += 1;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(system: TransitionSystem, n: usize, actions: &[Action]) -> ParserState {
        let mut state = ParserState::new(n);
        for &a in actions {
            system.perform_action(&mut state, a).unwrap();
        }
        state
    }

    #[test]
    fn action_counts() {
        assert_eq!(TransitionSystem::Constituent.num_actions(), 2);
        assert_eq!(TransitionSystem::Dependency.num_actions(), 3);
    }

    #[test]
    fn valid_actions_follow_buffer_and_stack() {
        let cons = TransitionSystem::Constituent;
        let dep = TransitionSystem::Dependency;
        let mut state = ParserState::new(2);
        assert_eq!(cons.valid_actions(&state), vec![SHIFT]);
        shift(&mut state);
        assert_eq!(cons.valid_actions(&state), vec![SHIFT]);
        shift(&mut state);
        assert_eq!(cons.valid_actions(&state), vec![REDUCE]);
        assert_eq!(dep.valid_actions(&state), vec![LEFT_ARC, RIGHT_ARC]);
    }

    #[test]
    fn is_valid_agrees_with_valid_actions() {
        for system in [TransitionSystem::Constituent, TransitionSystem::Dependency] {
            for n in 1..5 {
                // Walk every reachable (beta, depth) pair via shift-first parses.
                let mut state = ParserState::new(n);
                loop {
                    let valid = system.valid_actions(&state);
                    for a in 0..system.num_actions() + 1 {
                        assert_eq!(system.is_valid(&state, a), valid.contains(&a));
                    }
                    if state.is_terminated() {
                        break;
                    }
                    let a = valid[0];
                    system.perform_action(&mut state, a).unwrap();
                }
            }
        }
    }

    #[test]
    fn reduce_builds_internal_node() {
        let state = run(TransitionSystem::Constituent, 2, &[SHIFT, SHIFT, REDUCE]);
        assert_eq!(state.sigma, vec![2]);
        assert_eq!(state.pst, vec![(0, 1)]);
        assert_eq!(state.nid, 3);
        assert!(state.is_terminated());
    }

    #[test]
    fn left_arc_keeps_top_as_head() {
        let state = run(TransitionSystem::Dependency, 2, &[SHIFT, SHIFT, LEFT_ARC]);
        assert_eq!(state.sigma, vec![1]);
        assert_eq!(state.heads, vec![1, UNSET]);
    }

    #[test]
    fn right_arc_keeps_second_as_head() {
        let state = run(TransitionSystem::Dependency, 2, &[SHIFT, SHIFT, RIGHT_ARC]);
        assert_eq!(state.sigma, vec![0]);
        assert_eq!(state.heads, vec![UNSET, 0]);
    }

    #[test]
    fn composing_on_short_stack_underflows() {
        let mut state = ParserState::new(2);
        shift(&mut state);
        let err = TransitionSystem::Constituent
            .perform_action(&mut state, REDUCE)
            .unwrap_err();
        assert!(matches!(err, Error::StackUnderflow { depth: 1, .. }));
    }

    #[test]
    fn shift_on_empty_buffer_is_invalid() {
        let mut state = run(TransitionSystem::Constituent, 1, &[SHIFT]);
        let err = TransitionSystem::Constituent
            .perform_action(&mut state, SHIFT)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidAction { .. }));
    }

    #[test]
    fn dependency_reduce_prefers_right_arc() {
        let state = run(TransitionSystem::Dependency, 2, &[SHIFT, SHIFT]);
        assert_eq!(TransitionSystem::Dependency.reduce_action(&state), RIGHT_ARC);
        assert_eq!(TransitionSystem::Constituent.reduce_action(&state), REDUCE);
    }

    #[test]
    fn system_names_and_aliases() {
        assert_eq!("cons".parse::<SystemKind>().unwrap(), SystemKind::Constituent);
        assert_eq!("dep".parse::<SystemKind>().unwrap(), SystemKind::Dependency);
        assert_eq!(
            "dependency_bilstm".parse::<SystemKind>().unwrap(),
            SystemKind::DependencyBiLstm
        );
        assert!(matches!(
            "ccg".parse::<SystemKind>(),
            Err(Error::UnknownSystem(_))
        ));
        assert_eq!(
            SystemKind::DependencyBiLstm.transition_system(),
            TransitionSystem::Dependency
        );
    }

    #[test]
    fn episode_length() {
        assert_eq!(episode_len(1), 1);
        assert_eq!(episode_len(5), 9);
    }
}
