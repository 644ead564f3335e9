//! Learning to compose words into sentences.
//!
//! A shift-reduce [`system`] builds a binary tree over a sentence while a
//! Tree-LSTM [`compose`]r folds word vectors along it. The [`model`] adds
//! a policy network that picks the transitions and a classifier on top;
//! [`training`] fits both from sentence labels alone, using REINFORCE for
//! the discrete parsing decisions.

pub mod checkpoint;
pub mod compose;
pub mod data;
pub mod error;
pub mod eval;
pub mod model;
pub mod system;
pub mod training;

pub use error::{Error, Result};
