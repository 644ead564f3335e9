//! Word vocabulary.
//!
//! Id 0 is `<BAD0>` (never produced by lookup), id 1 is `<UNK>`.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::error::{Error, Result};

pub const BAD0: &str = "<BAD0>";
pub const UNK: &str = "<UNK>";
pub const BAD0_ID: usize = 0;
pub const UNK_ID: usize = 1;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Vocab {
    words: Vec<String>,
    ids: HashMap<String, usize>,
    /// Lookups of unseen words add them instead of mapping to `<UNK>`.
    growing: bool,
}

impl Default for Vocab {
    fn default() -> Self {
        Self::new()
    }
}

impl Vocab {
    pub fn new() -> Self {
        let mut vocab = Self {
            words: Vec::new(),
            ids: HashMap::new(),
            growing: true,
        };
        vocab.insert(BAD0);
        vocab.insert(UNK);
        vocab
    }

    /// Strip backslashes (PTB escapes) from a raw token.
    pub fn normalize(token: &str) -> String {
        token.replace('\\', "")
    }

    pub fn insert(&mut self, word: &str) -> usize {
        if let Some(&id) = self.ids.get(word) {
            return id;
        }
        let id = self.words.len();
        self.words.push(word.to_string());
        self.ids.insert(word.to_string(), id);
        id
    }

    /// Stop adding words; later lookups of unknown words give `<UNK>`.
    pub fn freeze(&mut self) {
        self.growing = false;
    }

    pub fn is_frozen(&self) -> bool {
        !self.growing
    }

    /// Id of a raw token, adding it while the vocabulary is still growing.
    pub fn lookup(&mut self, token: &str) -> usize {
        let word = Self::normalize(token);
        match self.ids.get(&word) {
            Some(&id) => id,
            None if self.growing => self.insert(&word),
            None => UNK_ID,
        }
    }

    pub fn get(&self, word: &str) -> Option<usize> {
        self.ids.get(word).copied()
    }

    pub fn word(&self, id: usize) -> Option<&str> {
        self.words.get(id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// One word per line, in id order.
    pub fn save(&self, path: &Path) -> Result<()> {
        let mut text = self.words.join("\n");
        text.push('\n');
        fs::write(path, text).map_err(|e| Error::io(path, e))
    }

    /// Load a saved vocabulary; the result is frozen.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        let mut vocab = Self {
            words: Vec::new(),
            ids: HashMap::new(),
            growing: true,
        };
        for word in text.lines() {
            vocab.insert(word);
        }
        if vocab.get(BAD0) != Some(BAD0_ID) || vocab.get(UNK) != Some(UNK_ID) {
            return Err(Error::parse(path, 1, "vocabulary must start with <BAD0> and <UNK>"));
        }
        vocab.freeze();
        Ok(vocab)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_ids() {
        let vocab = Vocab::new();
        assert_eq!(vocab.get(BAD0), Some(BAD0_ID));
        assert_eq!(vocab.get(UNK), Some(UNK_ID));
        assert_eq!(vocab.len(), 2);
    }

    #[test]
    fn grows_then_maps_unknowns() {
        let mut vocab = Vocab::new();
        assert_eq!(vocab.lookup("good"), 2);
        assert_eq!(vocab.lookup("good"), 2);
        vocab.freeze();
        assert_eq!(vocab.lookup("bad"), UNK_ID);
        assert_eq!(vocab.len(), 3);
    }

    #[test]
    fn strips_backslashes() {
        let mut vocab = Vocab::new();
        let id = vocab.lookup("1\\/2");
        assert_eq!(vocab.word(id), Some("1/2"));
    }

    #[test]
    fn save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vocab.txt");
        let mut vocab = Vocab::new();
        vocab.lookup("a");
        vocab.lookup("b");
        vocab.save(&path).unwrap();
        let loaded = Vocab::load(&path).unwrap();
        assert_eq!(loaded.get("b"), Some(3));
        assert!(loaded.is_frozen());
    }
}
