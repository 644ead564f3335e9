//! Pretrained word vectors in word2vec text format.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use burn::prelude::*;

use super::vocab::{Vocab, BAD0_ID, UNK_ID};
use crate::error::{Error, Result};
use crate::model::Model;

/// Word vectors keyed by normalized word.
#[derive(Clone, Debug, Default)]
pub struct Embeddings {
    pub dim: usize,
    pub vectors: HashMap<String, Vec<f32>>,
}

impl Embeddings {
    /// Header line, then `word v1 .. v_dim` per line. Every row must be
    /// `dim` wide.
    pub fn load(path: &Path, dim: usize) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        let mut vectors = HashMap::new();
        for (i, line) in text.lines().enumerate().skip(1) {
            let mut fields = line.split_whitespace();
            let Some(word) = fields.next() else {
                continue;
            };
            let values = fields
                .map(str::parse::<f32>)
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| Error::parse(path, i + 1, e.to_string()))?;
            if values.len() != dim {
                return Err(Error::parse(
                    path,
                    i + 1,
                    format!("vector for '{word}' has {} values, expected {dim}", values.len()),
                ));
            }
            vectors.insert(Vocab::normalize(word), values);
        }
        log::info!("{}: {} pretrained vectors", path.display(), vectors.len());
        Ok(Self { dim, vectors })
    }

    /// A vocabulary holding exactly the pretrained words.
    pub fn vocab(&self) -> Vocab {
        let mut words: Vec<&String> = self.vectors.keys().collect();
        words.sort();
        let mut vocab = Vocab::new();
        for word in words {
            vocab.insert(word);
        }
        vocab
    }

    /// Copy pretrained rows into the model's embedding table and zero
    /// the reserved ids.
    pub fn apply<B: Backend>(&self, model: Model<B>, vocab: &Vocab) -> Result<Model<B>> {
        let mut table = model.embedding_table();
        let dim = self.dim;
        let mut hits = 0usize;
        for id in 0..vocab.len() {
            let row = &mut table[id * dim..(id + 1) * dim];
            if id == BAD0_ID || id == UNK_ID {
                row.fill(0.0);
                continue;
            }
            if let Some(vector) = vocab.word(id).and_then(|w| self.vectors.get(w)) {
                row.copy_from_slice(vector);
                hits += 1;
            }
        }
        log::info!("pretrained vectors cover {hits} of {} words", vocab.len());
        model.with_embedding_table(table)
    }
}
