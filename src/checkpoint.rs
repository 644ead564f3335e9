//! Checkpoint directories.
//!
//! A checkpoint directory holds the weights in burn's NamedMpk format
//! (full precision) under a tag, plus everything needed to rebuild the
//! model around them:
//!
//! ```text
//! <dir>/best.mpk  <dir>/latest.mpk
//! <dir>/model.json
//! <dir>/vocab.txt
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use burn::config::Config;
use burn::module::Module;
use burn::prelude::*;
use burn::record::{FullPrecisionSettings, NamedMpkFileRecorder};

use crate::data::Vocab;
use crate::error::{Error, Result};
use crate::model::{Model, ModelConfig};

const MODEL_CONFIG: &str = "model.json";
const VOCAB: &str = "vocab.txt";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckpointTag {
    /// Highest dev accuracy so far.
    Best,
    /// End of training.
    Latest,
}

impl CheckpointTag {
    fn stem(&self) -> &'static str {
        match self {
            Self::Best => "best",
            Self::Latest => "latest",
        }
    }
}

/// A model together with the vocabulary its embedding rows index.
pub struct Loaded<B: Backend> {
    pub model: Model<B>,
    pub config: ModelConfig,
    pub vocab: Vocab,
}

#[derive(Debug, Clone)]
pub struct Checkpoint {
    dir: PathBuf,
}

impl Checkpoint {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Weights file for `tag`, with the extension burn adds.
    pub fn weights(&self, tag: CheckpointTag) -> PathBuf {
        self.dir.join(tag.stem()).with_extension("mpk")
    }

    pub fn exists(&self, tag: CheckpointTag) -> bool {
        self.weights(tag).exists()
    }

    pub fn save<B: Backend>(
        &self,
        tag: CheckpointTag,
        model: &Model<B>,
        config: &ModelConfig,
        vocab: &Vocab,
    ) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir).map_err(|e| Error::io(&self.dir, e))?;
        let recorder = NamedMpkFileRecorder::<FullPrecisionSettings>::new();
        model
            .clone()
            .save_file(self.dir.join(tag.stem()), &recorder)
            .map_err(|e| Error::Checkpoint(format!("save {}: {e}", self.weights(tag).display())))?;

        let config_path = self.dir.join(MODEL_CONFIG);
        config
            .save(&config_path)
            .map_err(|e| Error::io(&config_path, e))?;
        vocab.save(&self.dir.join(VOCAB))?;
        Ok(self.weights(tag))
    }

    pub fn load<B: Backend>(&self, tag: CheckpointTag, device: &B::Device) -> Result<Loaded<B>> {
        let weights = self.weights(tag);
        if !weights.exists() {
            return Err(Error::Checkpoint(format!("{} does not exist", weights.display())));
        }
        let config_path = self.dir.join(MODEL_CONFIG);
        let config = ModelConfig::load(&config_path)
            .map_err(|e| Error::Checkpoint(format!("{}: {e}", config_path.display())))?;
        let vocab = Vocab::load(&self.dir.join(VOCAB))?;
        if vocab.len() != config.vocab_size {
            return Err(Error::Checkpoint(format!(
                "vocabulary has {} words, model expects {}",
                vocab.len(),
                config.vocab_size
            )));
        }

        let recorder = NamedMpkFileRecorder::<FullPrecisionSettings>::new();
        let model = config
            .init::<B>(device)
            .load_file(self.dir.join(tag.stem()), &recorder, device)
            .map_err(|e| Error::Checkpoint(format!("load {}: {e}", weights.display())))?
            .freeze_embedding();
        log::info!("loaded {} ({} words)", weights.display(), vocab.len());
        Ok(Loaded {
            model,
            config,
            vocab,
        })
    }
}
