//! Binary bracketing: SHIFT / REDUCE.

use super::state::ParserState;
use super::tree::ChildLists;
use super::{Action, REDUCE, SHIFT};
use crate::error::{Error, Result};

/// Pop the top two nodes, record them as children of a fresh node, push it.
pub(super) fn reduce(state: &mut ParserState) -> Result<()> {
    let (Some(right), Some(left)) = (state.top(), state.second()) else {
        return Err(Error::StackUnderflow {
            action: REDUCE,
            depth: state.depth(),
        });
    };
    state.sigma.truncate(state.sigma.len() - 2);
    state.pst.push((left, right));
    state.sigma.push(state.nid);
    state.nid += 1;
    Ok(())
}

/// Post-order walk of a strictly binary tree: SHIFT at each leaf, REDUCE
/// once both children of an internal node are emitted.
///
/// Children are visited in order of their leftmost leaf. Leaves must come
/// out as `0, 1, .., n-1`; anything else means crossing brackets.
pub(super) fn oracle_actions(parents: &[usize]) -> Result<Vec<Action>> {
    let tree = ChildLists::from_parents(parents)?;
    for (node, children) in tree.children.iter().enumerate() {
        if !children.is_empty() && children.len() != 2 {
            return Err(Error::NonBinaryTree {
                node,
                children: children.len(),
            });
        }
    }

    let leftmost = leftmost_leaves(&tree);
    let mut walk = OracleWalk {
        tree: &tree,
        leftmost: &leftmost,
        next_leaf: 0,
        actions: Vec::with_capacity(parents.len()),
    };
    walk.visit(tree.root)?;
    Ok(walk.actions)
}

struct OracleWalk<'a> {
    tree: &'a ChildLists,
    leftmost: &'a [usize],
    next_leaf: usize,
    actions: Vec<Action>,
}

impl OracleWalk<'_> {
    fn visit(&mut self, node: usize) -> Result<()> {
        let children = &self.tree.children[node];
        if children.is_empty() {
            if node != self.next_leaf {
                return Err(Error::NonProjective { node });
            }
            self.next_leaf += 1;
            self.actions.push(SHIFT);
            return Ok(());
        }
        let (mut first, mut second) = (children[0], children[1]);
        if self.leftmost[second] < self.leftmost[first] {
            std::mem::swap(&mut first, &mut second);
        }
        self.visit(first)?;
        self.visit(second)?;
        self.actions.push(REDUCE);
        Ok(())
    }
}

/// Smallest leaf id under every node.
fn leftmost_leaves(tree: &ChildLists) -> Vec<usize> {
    let mut leftmost: Vec<usize> = (0..tree.len()).collect();
    // Reverse pre-order visits children before their parents.
    let mut order = Vec::with_capacity(tree.len());
    let mut frontier = vec![tree.root];
    while let Some(node) = frontier.pop() {
        order.push(node);
        frontier.extend(&tree.children[node]);
    }
    for &node in order.iter().rev() {
        if let Some(min) = tree.children[node].iter().map(|&c| leftmost[c]).min() {
            leftmost[node] = min;
        }
    }
    leftmost
}

/// `((0 1) 2)` over token positions; unfinished parses list the stack.
pub(super) fn render(state: &ParserState) -> String {
    let mut out = state
        .sigma
        .iter()
        .map(|&node| bracket(state, node))
        .collect::<Vec<_>>()
        .join(" ");
    out.push('\n');
    out
}

fn bracket(state: &ParserState, node: usize) -> String {
    match state.children(node) {
        Some((left, right)) => format!("({} {})", bracket(state, left), bracket(state, right)),
        None => node.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::super::{TransitionSystem, UNSET};
    use super::*;

    fn replay(actions: &[Action], n: usize) -> ParserState {
        let mut state = ParserState::new(n);
        for &a in actions {
            TransitionSystem::Constituent
                .perform_action(&mut state, a)
                .unwrap();
        }
        state
    }

    #[test]
    fn left_branching_oracle() {
        // ((0 1) 2): node 3 = (0 1), node 4 = (3 2)
        let parents = [3, 3, 4, 4, UNSET];
        let actions = oracle_actions(&parents).unwrap();
        assert_eq!(actions, vec![SHIFT, SHIFT, REDUCE, SHIFT, REDUCE]);
    }

    #[test]
    fn right_branching_oracle() {
        // (0 (1 2)): node 3 = (1 2), node 4 = (0 3)
        let parents = [4, 3, 3, 4, UNSET];
        let actions = oracle_actions(&parents).unwrap();
        assert_eq!(actions, vec![SHIFT, SHIFT, SHIFT, REDUCE, REDUCE]);
    }

    #[test]
    fn oracle_round_trips_through_replay() {
        // ((0 1) (2 3)): 4 = (0 1), 5 = (2 3), 6 = (4 5)
        let parents = [4, 4, 5, 5, 6, 6, UNSET];
        let actions = oracle_actions(&parents).unwrap();
        assert_eq!(actions.len(), 7);
        let state = replay(&actions, 4);
        assert!(state.is_terminated());
        assert_eq!(state.constituent_parents(), parents.to_vec());
    }

    #[test]
    fn single_leaf_tree() {
        let actions = oracle_actions(&[UNSET]).unwrap();
        assert_eq!(actions, vec![SHIFT]);
    }

    #[test]
    fn rejects_unary_node() {
        // node 3 has three children, then node 2 a single one
        let err = oracle_actions(&[3, 3, 3, UNSET]).unwrap_err();
        assert!(matches!(err, Error::NonBinaryTree { node: 3, children: 3 }));
        let err = oracle_actions(&[2, 3, 3, UNSET]).unwrap_err();
        assert!(matches!(err, Error::NonBinaryTree { node: 2, children: 1 }));
    }

    #[test]
    fn rejects_crossing_brackets() {
        // (0 2) grouped before 1
        let parents = [3, 4, 3, 4, UNSET];
        let err = oracle_actions(&parents).unwrap_err();
        assert!(matches!(err, Error::NonProjective { .. }));
    }

    #[test]
    fn reduce_on_short_stack_leaves_state_untouched() {
        let mut state = replay(&[SHIFT], 2);
        let before = state.clone();
        assert!(matches!(
            reduce(&mut state),
            Err(Error::StackUnderflow { action: REDUCE, depth: 1 })
        ));
        assert_eq!(state, before);
    }

    #[test]
    fn renders_brackets() {
        let state = replay(&[SHIFT, SHIFT, REDUCE, SHIFT, REDUCE], 3);
        insta::assert_snapshot!(render(&state), @"((0 1) 2)");
        let state = replay(&[SHIFT, SHIFT, SHIFT, REDUCE, REDUCE], 3);
        insta::assert_snapshot!(render(&state), @"(0 (1 2))");
    }

    #[test]
    fn renders_partial_stack() {
        let state = replay(&[SHIFT, SHIFT, SHIFT, REDUCE], 3);
        insta::assert_snapshot!(render(&state), @"0 (1 2)");
    }
}
