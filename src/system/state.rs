//! Shift-reduce bookkeeping over a fixed-length input.

/// Head / parent sentinel for "not assigned" (roots, fresh tokens).
pub const UNSET: usize = usize::MAX;

/// Mutable parse progress over `n` tokens.
///
/// Node ids `0..n` are the tokens. The constituent system allocates
/// internal ids from `n` upward, one per reduce, recording the children
/// of each in `pst`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParserState {
    /// Token count.
    pub n: usize,
    /// Next unconsumed token.
    pub beta: usize,
    /// Un-combined nodes, bottom to top.
    pub sigma: Vec<usize>,
    /// Next fresh internal-node id.
    pub nid: usize,
    /// Head of every token (dependency systems).
    pub heads: Vec<usize>,
    /// Children of internal node `n + k` at index `k` (constituent system).
    pub pst: Vec<(usize, usize)>,
}

impl ParserState {
    pub fn new(n: usize) -> Self {
        Self {
            n,
            beta: 0,
            sigma: Vec::with_capacity(n),
            nid: n,
            heads: vec![UNSET; n],
            pst: Vec::with_capacity(n.saturating_sub(1)),
        }
    }

    /// All tokens consumed and reduced to a single root.
    pub fn is_terminated(&self) -> bool {
        self.sigma.len() == 1 && self.beta == self.n
    }

    pub fn depth(&self) -> usize {
        self.sigma.len()
    }

    pub fn top(&self) -> Option<usize> {
        self.sigma.last().copied()
    }

    /// Second-from-top stack entry.
    pub fn second(&self) -> Option<usize> {
        self.sigma.len().checked_sub(2).map(|i| self.sigma[i])
    }

    /// Children of an internal node built by a reduce.
    pub fn children(&self, node: usize) -> Option<(usize, usize)> {
        node.checked_sub(self.n).and_then(|k| self.pst.get(k)).copied()
    }

    /// Parent array over all `2n - 1` constituent nodes, rebuilt from `pst`.
    pub fn constituent_parents(&self) -> Vec<usize> {
        let mut parents = vec![UNSET; self.nid];
        for (k, &(left, right)) in self.pst.iter().enumerate() {
            parents[left] = self.n + k;
            parents[right] = self.n + k;
        }
        parents
    }
}
