pub mod eval;
pub mod oracle;
pub mod train;

use std::path::Path;

use burn::backend::{Autodiff, NdArray};
use clap::ValueEnum;

use l2c::data::{check_labels, CorpusFormat, Instance, Vocab};
use l2c::system::SystemKind;
use l2c::Result;

pub type TrainBackend = Autodiff<NdArray>;
pub type EvalBackend = NdArray;

/// Corpus layout on the command line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Format {
    /// `label<TAB>tokens`
    Sentences,
    /// `label<TAB>tokens<TAB>parents`
    Trees,
    /// SNLI-style JSON lines
    Pairs,
}

impl From<Format> for CorpusFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Sentences => CorpusFormat::Sentences,
            Format::Trees => CorpusFormat::Trees,
            Format::Pairs => CorpusFormat::Pairs,
        }
    }
}

/// Read an optional held-out corpus and check its labels.
pub fn read_held_out(
    path: Option<&Path>,
    format: Format,
    vocab: &mut Vocab,
    system: SystemKind,
    n_classes: usize,
) -> Result<Vec<Instance>> {
    let Some(path) = path else {
        return Ok(Vec::new());
    };
    let instances = CorpusFormat::from(format).read(path, vocab, system)?;
    check_labels(path, &instances, n_classes)?;
    Ok(instances)
}
