//! Crate-wide error type.
//!
//! Structural violations (malformed gold trees, impossible actions) and
//! configuration mistakes are all fatal for the caller: nothing here is
//! retried. The binary prints the error and exits.

use std::path::PathBuf;

use thiserror::Error;

use crate::system::Action;

/// Derived `Config` impls name `Result<_, D::Error>` with this alias in scope.
pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("node {node} has {children} children, a binary tree needs 0 or 2")]
    NonBinaryTree { node: usize, children: usize },

    #[error("tree has no root (no node without a head)")]
    MissingRoot,

    #[error("tree has more than one root: nodes {first} and {second}")]
    MultipleRoots { first: usize, second: usize },

    #[error("tree contains a cycle")]
    CyclicTree,

    #[error("node {node} points at parent {parent}, outside 0..{len}")]
    ParentOutOfRange {
        node: usize,
        parent: usize,
        len: usize,
    },

    #[error("tree is not projective at node {node}")]
    NonProjective { node: usize },

    #[error("action {action} needs two stack entries, stack has {depth}")]
    StackUnderflow { action: Action, depth: usize },

    #[error("action {action} is not valid (beta={beta}, stack depth={depth})")]
    InvalidAction {
        action: Action,
        beta: usize,
        depth: usize,
    },

    #[error("parse is not finished: {depth} stack entries, {remaining} tokens left")]
    IncompleteParse { depth: usize, remaining: usize },

    #[error("cannot compose an empty token sequence")]
    EmptyInstance,

    #[error("action sequence has {got} actions, expected {expected}")]
    OracleLength { expected: usize, got: usize },

    #[error("classifier expects {expected} sequence(s), instance has {got}")]
    InstanceArity { expected: usize, got: usize },

    #[error("instance has no gold tree")]
    MissingTree,

    #[error("{}: instance {instance} has label {label}, outside the {n_classes} training classes", path.display())]
    LabelOutOfRange {
        path: PathBuf,
        /// 1-based position among the instances read, not the file line.
        instance: usize,
        label: usize,
        n_classes: usize,
    },

    #[error("unknown transition system '{0}' (expected constituent, dependency or dependency_bilstm)")]
    UnknownSystem(String),

    #[error("unknown policy '{0}' (expected sample, left or right)")]
    UnknownPolicy(String),

    #[error("unknown optimizer '{0}'")]
    UnknownOptimizer(String),

    #[error("bad objective sequence: {0}")]
    BadSchedule(String),

    #[error("{}:{line}: {message}", path.display())]
    Parse {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("tensor: {0}")]
    Tensor(String),

    #[error("checkpoint: {0}")]
    Checkpoint(String),
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn parse(path: impl Into<PathBuf>, line: usize, message: impl Into<String>) -> Self {
        Error::Parse {
            path: path.into(),
            line,
            message: message.into(),
        }
    }
}
