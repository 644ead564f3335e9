//! Corpora, vocabulary and pretrained vectors.

pub mod corpus;
pub mod embeddings;
pub mod tree;
pub mod vocab;

pub use corpus::{check_labels, n_classes, oracle_sequences, read_pairs, read_sentences, read_trees, Instance};
pub use embeddings::Embeddings;
pub use tree::GoldTree;
pub use vocab::Vocab;

/// Layout of a corpus file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CorpusFormat {
    Sentences,
    Trees,
    Pairs,
}

impl CorpusFormat {
    pub fn read(
        self,
        path: &std::path::Path,
        vocab: &mut Vocab,
        system: crate::system::SystemKind,
    ) -> crate::error::Result<Vec<Instance>> {
        match self {
            Self::Sentences => read_sentences(path, vocab),
            Self::Trees => read_trees(path, vocab, system),
            Self::Pairs => read_pairs(path, vocab),
        }
    }
}
