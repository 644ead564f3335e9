//! Arc-standard dependency transitions: SHIFT / LEFT-ARC / RIGHT-ARC.

use super::state::{ParserState, UNSET};
use super::tree::ChildLists;
use super::{Action, TransitionSystem, LEFT_ARC, RIGHT_ARC, SHIFT};
use crate::error::{Error, Result};

/// Top is the head, the entry below it becomes its dependent.
pub(super) fn left_arc(state: &mut ParserState) -> Result<()> {
    let (Some(head), Some(modifier)) = (state.top(), state.second()) else {
        return Err(underflow(LEFT_ARC, state));
    };
    state.sigma.truncate(state.sigma.len() - 2);
    state.sigma.push(head);
    state.heads[modifier] = head;
    Ok(())
}

/// Top becomes a dependent of the entry below it, which stays on the stack.
pub(super) fn right_arc(state: &mut ParserState) -> Result<()> {
    let (Some(modifier), Some(head)) = (state.top(), state.second()) else {
        return Err(underflow(RIGHT_ARC, state));
    };
    state.sigma.pop();
    state.heads[modifier] = head;
    Ok(())
}

fn underflow(action: Action, state: &ParserState) -> Error {
    Error::StackUnderflow {
        action,
        depth: state.depth(),
    }
}

/// For each head: its left dependents' subtrees, SHIFT of the head,
/// one LEFT-ARC per left dependent, then each right dependent's subtree
/// followed by a RIGHT-ARC.
///
/// The walk assumes a projective tree. The result is replayed and
/// compared against `parents`, so a non-projective tree is reported
/// instead of silently producing the wrong arcs.
pub(super) fn oracle_actions(parents: &[usize]) -> Result<Vec<Action>> {
    let tree = ChildLists::from_parents(parents)?;
    let mut actions = Vec::with_capacity(2 * parents.len());
    travel(&tree, tree.root, &mut actions);

    let mut state = ParserState::new(parents.len());
    for &action in &actions {
        TransitionSystem::Dependency
            .perform_action(&mut state, action)
            .map_err(|_| Error::NonProjective { node: state.beta })?;
    }
    if let Some(node) = (0..parents.len()).find(|&i| state.heads[i] != parents[i]) {
        return Err(Error::NonProjective { node });
    }
    Ok(actions)
}

fn travel(tree: &ChildLists, node: usize, actions: &mut Vec<Action>) {
    let children = &tree.children[node];
    let n_left = children.iter().take_while(|&&c| c < node).count();
    for &child in &children[..n_left] {
        travel(tree, child, actions);
    }
    actions.push(SHIFT);
    actions.extend(std::iter::repeat(LEFT_ARC).take(n_left));
    for &child in &children[n_left..] {
        travel(tree, child, actions);
        actions.push(RIGHT_ARC);
    }
}

/// One row per depth level with each token at its column, then the
/// head list (`-` for unattached). Unfinished parses print the stack
/// instead of levels.
pub(super) fn render(state: &ParserState) -> String {
    let mut out = String::new();
    match ChildLists::from_parents(&state.heads) {
        Ok(tree) => {
            let width = digits(state.n.saturating_sub(1)) + 1;
            let depths = tree.depths();
            let max_depth = depths.iter().copied().max().unwrap_or(0);
            for level in 0..=max_depth {
                let mut row = String::new();
                for token in (0..state.n).filter(|&t| depths[t] == level) {
                    let column = token * width;
                    while row.len() < column {
                        row.push(' ');
                    }
                    row.push_str(&token.to_string());
                }
                out.push_str(&format!("{level}|{row}\n"));
            }
        }
        Err(_) => {
            let stack: Vec<String> = state.sigma.iter().map(|s| s.to_string()).collect();
            out.push_str(&format!("stack: {}\n", stack.join(" ")));
        }
    }
    let heads: Vec<String> = state
        .heads
        .iter()
        .map(|&h| {
            if h == UNSET {
                "-".to_string()
            } else {
                h.to_string()
            }
        })
        .collect();
    out.push_str(&format!("heads: {}\n", heads.join(" ")));
    out
}

fn digits(mut value: usize) -> usize {
    let mut count = 1;
    while value >= 10 {
        value /= 10;
        count += 1;
    }
    count
}
