use std::path::PathBuf;

use clap::Args;

use l2c::checkpoint::Checkpoint;
use l2c::data::{n_classes, CorpusFormat, Embeddings, Vocab};
use l2c::model::{ModelConfig, PolicyKind};
use l2c::system::SystemKind;
use l2c::training::{train, Corpora, OptimizerConfig, OptimizerKind, Regime, SaveTarget, TrainingConfig};
use l2c::{Error, Result};

use super::{read_held_out, Format, TrainBackend};

/// Classes of the entailment label set.
const PAIR_CLASSES: usize = 3;

#[derive(Args)]
pub struct TrainArgs {
    /// Training corpus
    #[arg(long)]
    pub train: PathBuf,
    /// Development corpus, used to pick the best checkpoint
    #[arg(long)]
    pub dev: Option<PathBuf>,
    /// Test corpus, scored whenever dev improves
    #[arg(long)]
    pub test: Option<PathBuf>,
    #[arg(long, value_enum, default_value = "sentences")]
    pub format: Format,
    /// Checkpoint directory
    #[arg(short, long, default_value = "checkpoints")]
    pub output: PathBuf,

    /// constituent, dependency or dependency_bilstm
    #[arg(long, default_value = "constituent")]
    pub system: SystemKind,
    #[arg(long, default_value_t = 100)]
    pub word_dim: usize,
    #[arg(long, default_value_t = 100)]
    pub hidden_dim: usize,
    #[arg(long, default_value_t = 0.0)]
    pub dropout: f64,
    /// Pretrained vectors in word2vec text format (`--word-dim` wide)
    #[arg(long)]
    pub embeddings: Option<PathBuf>,
    /// Update word vectors; otherwise only pretrained words are kept
    #[arg(long)]
    pub tune_embedding: bool,

    /// l2c, pg or oracle
    #[arg(long, default_value = "l2c")]
    pub regime: Regime,
    /// Epochs
    #[arg(long, default_value_t = 10)]
    pub max_iter: usize,
    #[arg(long, default_value_t = 1000)]
    pub report_stops: usize,
    #[arg(long, default_value_t = 5000)]
    pub evaluate_stops: usize,
    /// Per-epoch (policy, objective) schedule, e.g. `left_reward_2(sample_both_+)`
    #[arg(long, default_value = "sample_both_+")]
    pub objective_sequence: String,
    /// Policy used to predict on dev and test
    #[arg(long, default_value = "sample")]
    pub policy: PolicyKind,
    #[arg(long, default_value = "simple_sgd")]
    pub optimizer: OptimizerKind,
    #[arg(long)]
    pub eta: Option<f64>,
    #[arg(long, default_value_t = 0.0)]
    pub final_eta: f64,
    #[arg(long)]
    pub enable_eta_decay: bool,
    #[arg(long)]
    pub eta_decay: Option<f64>,
    /// Clip gradient norm at 5
    #[arg(long)]
    pub enable_clipping: bool,
    #[arg(long, default_value_t = 1234)]
    pub seed: u64,
    /// L2 weight (oracle regime)
    #[arg(long, default_value_t = 0.0)]
    pub l2: f64,
}

impl TrainArgs {
    fn training_config(&self) -> TrainingConfig {
        let optimizer = OptimizerConfig::new()
            .with_kind(self.optimizer)
            .with_eta(self.eta)
            .with_final_eta(self.final_eta)
            .with_enable_eta_decay(self.enable_eta_decay)
            .with_eta_decay(self.eta_decay)
            .with_enable_clipping(self.enable_clipping);
        TrainingConfig::new()
            .with_regime(self.regime)
            .with_max_iter(self.max_iter)
            .with_report_stops(self.report_stops)
            .with_evaluate_stops(self.evaluate_stops)
            .with_objective_sequence(self.objective_sequence.clone())
            .with_policy(self.policy)
            .with_optimizer(optimizer)
            .with_seed(self.seed)
            .with_l2(self.l2)
    }
}

pub fn cmd_train(args: TrainArgs) -> Result<()> {
    let config = args.training_config();
    // Configuration errors surface before any data is read.
    config.optimizer.choice()?;
    if config.regime == Regime::Oracle && args.format != Format::Trees {
        return Err(Error::MissingTree);
    }

    let embeddings = match &args.embeddings {
        Some(path) => Some(Embeddings::load(path, args.word_dim)?),
        None => None,
    };
    let mut vocab = match &embeddings {
        Some(emb) if !args.tune_embedding => {
            let mut vocab = emb.vocab();
            vocab.freeze();
            vocab
        }
        _ => Vocab::new(),
    };

    let train_set = CorpusFormat::from(args.format).read(&args.train, &mut vocab, args.system)?;
    vocab.freeze();
    let classes = match args.format {
        Format::Pairs => PAIR_CLASSES,
        _ => n_classes(&train_set),
    };
    let data = Corpora {
        dev: read_held_out(args.dev.as_deref(), args.format, &mut vocab, args.system, classes)?,
        test: read_held_out(args.test.as_deref(), args.format, &mut vocab, args.system, classes)?,
        train: train_set,
    };
    log::info!(
        "{} train / {} dev / {} test instances, {} words, {classes} classes",
        data.train.len(),
        data.dev.len(),
        data.test.len(),
        vocab.len()
    );

    let model_config = ModelConfig::new(vocab.len(), classes)
        .with_word_dim(args.word_dim)
        .with_hidden_dim(args.hidden_dim)
        .with_system(args.system)
        .with_dropout(args.dropout)
        .with_tune_embedding(args.tune_embedding)
        .with_pair(args.format == Format::Pairs);
    let device = Default::default();
    let mut model = model_config.init::<TrainBackend>(&device);
    if let Some(emb) = &embeddings {
        model = emb.apply(model, &vocab)?;
    }

    let checkpoint = Checkpoint::new(&args.output);
    std::fs::create_dir_all(checkpoint.dir()).map_err(|e| Error::Io {
        path: checkpoint.dir().to_path_buf(),
        source: e,
    })?;
    let training_path = checkpoint.dir().join("training.json");
    burn::config::Config::save(&config, &training_path).map_err(|e| Error::Io {
        path: training_path.clone(),
        source: e,
    })?;

    let outcome = train(
        model,
        &config,
        &data,
        Some(SaveTarget {
            checkpoint: &checkpoint,
            config: &model_config,
            vocab: &vocab,
        }),
    )?;
    match (outcome.best_dev, outcome.test_at_best) {
        (Some(dev), Some(test)) => println!("best dev {dev:.4}, test {test:.4}"),
        (Some(dev), None) => println!("best dev {dev:.4}"),
        _ => println!("trained without a dev set"),
    }
    Ok(())
}
