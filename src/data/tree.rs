//! Gold trees as they come from tree corpora.

use crate::error::{Error, Result};
use crate::system::{episode_len, ParserState, SystemKind, TransitionSystem, REDUCE, SHIFT, UNSET};

/// Gold structure of one sentence.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GoldTree {
    /// Parent per node, `UNSET` at the root.
    ///
    /// Dependency trees have one node per token. Constituent trees have
    /// `2n - 1` nodes whose internal ids follow shift-reduce allocation
    /// order, so they line up with the node ids a parse produces.
    pub parents: Vec<usize>,
    /// Optional class label per node.
    pub labels: Vec<Option<usize>>,
}

/// Parse a `parent[:label]` list, 1-based with `0` as the root marker.
pub fn parse_parent_list(field: &str) -> std::result::Result<GoldTree, String> {
    let mut parents = Vec::new();
    let mut labels = Vec::new();
    for entry in field.split_whitespace() {
        let (parent, label) = match entry.split_once(':') {
            Some((p, l)) => (p, Some(l)),
            None => (entry, None),
        };
        let parent: usize = parent
            .parse()
            .map_err(|_| format!("bad parent '{parent}'"))?;
        parents.push(parent.checked_sub(1).unwrap_or(UNSET));
        labels.push(match label {
            Some(l) => Some(l.parse().map_err(|_| format!("bad node label '{l}'"))?),
            None => None,
        });
    }
    Ok(GoldTree { parents, labels })
}

impl GoldTree {
    /// Check the tree against a sentence of `n` tokens and put it in the
    /// node numbering `system` uses.
    pub fn normalize(self, n: usize, system: SystemKind) -> Result<Self> {
        match system.transition_system() {
            TransitionSystem::Dependency => {
                if self.parents.len() != n {
                    return Err(Error::OracleLength {
                        expected: n,
                        got: self.parents.len(),
                    });
                }
                TransitionSystem::Dependency.oracle_actions(&self.parents)?;
                Ok(self)
            }
            TransitionSystem::Constituent => self.renumber_constituent(n),
        }
    }

    /// Replay the oracle and give every internal node the id the reduce
    /// that builds it allocates.
    fn renumber_constituent(self, n: usize) -> Result<Self> {
        let expected = episode_len(n);
        if self.parents.len() != expected {
            return Err(Error::OracleLength {
                expected,
                got: self.parents.len(),
            });
        }
        for leaf in 0..n {
            let children = self.parents.iter().filter(|&&p| p == leaf).count();
            if children > 0 {
                return Err(Error::NonBinaryTree {
                    node: leaf,
                    children,
                });
            }
        }
        let actions = TransitionSystem::Constituent.oracle_actions(&self.parents)?;

        let mut state = ParserState::new(n);
        let mut renamed: Vec<usize> = (0..expected).collect();
        let mut old_stack: Vec<usize> = Vec::with_capacity(n);
        for action in actions {
            match action {
                SHIFT => old_stack.push(state.beta),
                REDUCE => {
                    let (Some(right), Some(_left)) = (old_stack.pop(), old_stack.pop()) else {
                        return Err(Error::StackUnderflow {
                            action,
                            depth: old_stack.len(),
                        });
                    };
                    let old = self.parents[right];
                    renamed[old] = state.nid;
                    old_stack.push(old);
                }
                _ => {}
            }
            TransitionSystem::Constituent.perform_action(&mut state, action)?;
        }

        let mut labels = vec![None; expected];
        for (old, label) in self.labels.into_iter().enumerate() {
            labels[renamed[old]] = label;
        }
        Ok(Self {
            parents: state.constituent_parents(),
            labels,
        })
    }
}
