//! The training loop shared by every regime.
//!
//! One optimizer step per instance, in a freshly shuffled order each
//! epoch. Dev accuracy is checked every `evaluate_stops` instances and
//! at the end of every epoch; a new best is scored on test and saved.

use std::str::FromStr;

use burn::config::Config;
use burn::module::AutodiffModule;
use burn::optim::{GradientsParams, Optimizer};
use burn::tensor::backend::AutodiffBackend;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use statrs::statistics::Statistics;

use super::objective::{learn_to_compose, InstanceLoss, ObjectiveType};
use super::optim::{OptimizerChoice, OptimizerConfig};
use super::oracle::oracle_loss;
use super::pg::pg_loss;
use super::schedule::{parse_schedule, Phase};
use crate::checkpoint::{Checkpoint, CheckpointTag};
use crate::data::{oracle_sequences, Instance, Vocab};
use crate::error::{Error, Result};
use crate::eval::{evaluate, PredictMode};
use crate::model::{Model, ModelConfig, PolicyKind, RolloutPolicy};
use crate::system::Action;

/// What the loss of one instance is made of.
#[derive(Config, Debug, Copy, PartialEq, Eq)]
pub enum Regime {
    /// REINFORCE from the classification loss, per the phase schedule.
    LearnToCompose,
    /// Sampled actions and label, reward +1/-1.
    PolicyGradient,
    /// Gold trees replayed, classification loss only.
    Oracle,
}

impl Regime {
    pub fn name(&self) -> &'static str {
        match self {
            Self::LearnToCompose => "l2c",
            Self::PolicyGradient => "pg",
            Self::Oracle => "oracle",
        }
    }
}

impl FromStr for Regime {
    type Err = Error;

    fn from_str(name: &str) -> Result<Self> {
        match name {
            "l2c" | "learn_to_compose" => Ok(Self::LearnToCompose),
            "pg" | "policy_gradient" => Ok(Self::PolicyGradient),
            "oracle" => Ok(Self::Oracle),
            other => Err(Error::BadSchedule(format!("unknown regime '{other}'"))),
        }
    }
}

#[derive(Config, Debug)]
pub struct TrainingConfig {
    #[config(default = "Regime::LearnToCompose")]
    pub regime: Regime,
    /// Epochs.
    #[config(default = 10)]
    pub max_iter: usize,
    /// Instances between loss reports.
    #[config(default = 1000)]
    pub report_stops: usize,
    /// Instances between dev evaluations.
    #[config(default = 5000)]
    pub evaluate_stops: usize,
    #[config(default = "String::from(\"sample_both_+\")")]
    pub objective_sequence: String,
    /// Policy of every epoch when no schedule applies (pg, oracle).
    #[config(default = "PolicyKind::Sample")]
    pub policy: PolicyKind,
    #[config(default = "OptimizerConfig::new()")]
    pub optimizer: OptimizerConfig,
    #[config(default = 1234)]
    pub seed: u64,
    /// Weight of the L2 penalty in the oracle regime.
    #[config(default = 0.0)]
    pub l2: f64,
}

impl TrainingConfig {
    /// Dev and test decode with the policy of the epoch being trained.
    fn predict_mode(&self, phase: Phase) -> PredictMode {
        match self.regime {
            Regime::Oracle => PredictMode::Oracle,
            _ => PredictMode::Policy(phase.policy),
        }
    }
}

/// Training, development and test instances.
#[derive(Debug, Default)]
pub struct Corpora {
    pub train: Vec<Instance>,
    pub dev: Vec<Instance>,
    pub test: Vec<Instance>,
}

/// Where new bests and the final model are written.
pub struct SaveTarget<'a> {
    pub checkpoint: &'a Checkpoint,
    pub config: &'a ModelConfig,
    pub vocab: &'a Vocab,
}

impl SaveTarget<'_> {
    fn save<B: AutodiffBackend>(&self, tag: CheckpointTag, model: &Model<B>) -> Result<()> {
        let path = self.checkpoint.save(tag, model, self.config, self.vocab)?;
        log::info!("saved {}", path.display());
        Ok(())
    }
}

pub struct TrainOutcome<B: AutodiffBackend> {
    pub model: Model<B>,
    /// Best dev accuracy, `None` without a dev set.
    pub best_dev: Option<f64>,
    /// Test accuracy of the best dev model.
    pub test_at_best: Option<f64>,
}

/// Train `model` on `data.train`, dispatching on the configured optimizer.
pub fn train<B: AutodiffBackend>(
    model: Model<B>,
    config: &TrainingConfig,
    data: &Corpora,
    save: Option<SaveTarget<'_>>,
) -> Result<TrainOutcome<B>> {
    let phases = match config.regime {
        Regime::LearnToCompose => parse_schedule(&config.objective_sequence, config.max_iter)?,
        _ => vec![
            Phase {
                policy: config.policy,
                objective: ObjectiveType::PolicyOnly,
            };
            config.max_iter
        ],
    };
    let oracles = match config.regime {
        Regime::Oracle => oracle_sequences(&data.train, model.system())?,
        _ => Vec::new(),
    };
    log::info!(
        "regime {}, optimizer {}, eta {}",
        config.regime.name(),
        config.optimizer.kind.name(),
        config.optimizer.eta0()
    );

    let trainer = Trainer {
        config,
        data,
        phases,
        oracles,
        save,
    };
    match config.optimizer.choice()? {
        OptimizerChoice::Sgd(c) => trainer.run(model, c.init::<B, Model<B>>()),
        OptimizerChoice::AdaGrad(c) => trainer.run(model, c.init::<B, Model<B>>()),
        OptimizerChoice::RmsProp(c) => trainer.run(model, c.init::<B, Model<B>>()),
        OptimizerChoice::Adam(c) => trainer.run(model, c.init::<B, Model<B>>()),
    }
}

struct Trainer<'a> {
    config: &'a TrainingConfig,
    data: &'a Corpora,
    phases: Vec<Phase>,
    oracles: Vec<Vec<Action>>,
    save: Option<SaveTarget<'a>>,
}

struct Progress {
    best_dev: Option<f64>,
    test_at_best: Option<f64>,
    losses: Vec<f64>,
    seen: usize,
}

impl Trainer<'_> {
    fn run<B, O>(&self, mut model: Model<B>, mut optimizer: O) -> Result<TrainOutcome<B>>
    where
        B: AutodiffBackend,
        O: Optimizer<Model<B>, B>,
    {
        let config = self.config;
        let mut rng = StdRng::seed_from_u64(config.seed);
        let mut order: Vec<usize> = (0..self.data.train.len()).collect();
        let mut progress = Progress {
            best_dev: None,
            test_at_best: None,
            losses: Vec::new(),
            seen: 0,
        };

        for (epoch, phase) in self.phases.iter().enumerate() {
            let eta = config.optimizer.eta_at(epoch);
            log::info!("epoch {}/{}: {phase}, eta {eta:.6}", epoch + 1, self.phases.len());
            order.shuffle(&mut rng);

            for &i in &order {
                let step = self.instance_loss(&model, i, *phase, &mut rng)?;
                progress.losses.push(step.nll as f64);
                if let Some(loss) = step.loss {
                    let grads = GradientsParams::from_grads(loss.backward(), &model);
                    model = optimizer.step(eta, model, grads);
                }
                progress.seen += 1;
                if config.report_stops > 0 && progress.seen % config.report_stops == 0 {
                    report(&mut progress);
                }
                if config.evaluate_stops > 0 && progress.seen % config.evaluate_stops == 0 {
                    self.checkpoint_if_better(&model, *phase, &mut progress)?;
                }
            }

            report(&mut progress);
            self.checkpoint_if_better(&model, *phase, &mut progress)?;
            if config.optimizer.enable_eta_decay && epoch + 1 < self.phases.len() {
                log::info!("eta decays to {:.6}", config.optimizer.eta_at(epoch + 1));
            }
        }

        if let Some(save) = &self.save {
            save.save(CheckpointTag::Latest, &model)?;
        }
        Ok(TrainOutcome {
            model,
            best_dev: progress.best_dev,
            test_at_best: progress.test_at_best,
        })
    }

    fn instance_loss<B: AutodiffBackend>(
        &self,
        model: &Model<B>,
        i: usize,
        phase: Phase,
        rng: &mut StdRng,
    ) -> Result<InstanceLoss<B>> {
        let instance = &self.data.train[i];
        match self.config.regime {
            Regime::LearnToCompose => {
                let mut policy = match phase.policy {
                    PolicyKind::Sample if phase.objective == ObjectiveType::RewardOnly => {
                        RolloutPolicy::Decode
                    }
                    PolicyKind::Sample => RolloutPolicy::Sample(rng),
                    PolicyKind::Left => RolloutPolicy::Left,
                    PolicyKind::Right => RolloutPolicy::Right,
                };
                let rollouts = model.compose_all(&instance.sequences, &mut policy)?;
                let reprs: Vec<_> = rollouts.iter().map(|r| r.repr.clone()).collect();
                let steps: Vec<_> = rollouts.into_iter().flat_map(|r| r.steps).collect();
                let logits = model.classifier_logits(&reprs)?;
                Ok(learn_to_compose(
                    logits,
                    instance.label,
                    &steps,
                    phase.policy,
                    phase.objective,
                ))
            }
            Regime::PolicyGradient => pg_loss(model, instance, rng),
            Regime::Oracle => oracle_loss(model, instance, &self.oracles[i], self.config.l2),
        }
    }

    fn checkpoint_if_better<B: AutodiffBackend>(
        &self,
        model: &Model<B>,
        phase: Phase,
        progress: &mut Progress,
    ) -> Result<()> {
        if self.data.dev.is_empty() {
            return Ok(());
        }
        let mode = self.config.predict_mode(phase);
        let valid = model.valid();
        let dev = evaluate(&valid, &self.data.dev, mode, None)?;
        log::info!("[{} instances] dev accuracy {dev:.4}", progress.seen);
        if progress.best_dev.is_some_and(|best| dev <= best) {
            return Ok(());
        }
        progress.best_dev = Some(dev);
        if !self.data.test.is_empty() {
            let test = evaluate(&valid, &self.data.test, mode, None)?;
            progress.test_at_best = Some(test);
            log::info!("new best dev {dev:.4}, test accuracy {test:.4}");
        } else {
            log::info!("new best dev {dev:.4}");
        }
        if let Some(save) = &self.save {
            save.save(CheckpointTag::Best, model)?;
        }
        Ok(())
    }
}

fn report(progress: &mut Progress) {
    if progress.losses.is_empty() {
        return;
    }
    let mean = progress.losses.iter().mean();
    let std_dev = progress.losses.iter().std_dev();
    log::info!(
        "[{} instances] classification loss {mean:.4} (sd {std_dev:.4}) over {}",
        progress.seen,
        progress.losses.len()
    );
    progress.losses.clear();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ModelConfig;
    use crate::training::optim::OptimizerKind;
    use burn::backend::{Autodiff, NdArray};

    type B = Autodiff<NdArray>;

    fn corpora() -> Corpora {
        let train = (0..6)
            .map(|i| Instance {
                label: i % 2,
                sequences: vec![if i % 2 == 0 { vec![2, 3, 4] } else { vec![5, 6] }],
                tree: None,
            })
            .collect::<Vec<_>>();
        Corpora {
            dev: train.clone(),
            test: train[..2].to_vec(),
            train,
        }
    }

    fn model() -> Model<B> {
        ModelConfig::new(8, 2)
            .with_word_dim(4)
            .with_hidden_dim(4)
            .init(&Default::default())
    }

    #[test]
    fn regime_names() {
        for regime in [Regime::LearnToCompose, Regime::PolicyGradient, Regime::Oracle] {
            assert_eq!(regime.name().parse::<Regime>().unwrap(), regime);
        }
        assert!("rl".parse::<Regime>().is_err());
    }

    #[test]
    fn trains_and_tracks_the_best_dev_score() {
        let config = TrainingConfig::new()
            .with_max_iter(2)
            .with_report_stops(4)
            .with_evaluate_stops(5)
            .with_objective_sequence("left_reward_1(sample_both_+)".to_string());
        let outcome = train(model(), &config, &corpora(), None).unwrap();
        let best = outcome.best_dev.unwrap();
        assert!((0.0..=1.0).contains(&best));
        assert!(outcome.test_at_best.is_some());
    }

    #[test]
    fn every_optimizer_and_regime_runs() {
        for kind in [
            OptimizerKind::SimpleSgd,
            OptimizerKind::MomentumSgd,
            OptimizerKind::Adagrad,
            OptimizerKind::Rmsprop,
            OptimizerKind::Adam,
        ] {
            let config = TrainingConfig::new()
                .with_max_iter(1)
                .with_regime(Regime::PolicyGradient)
                .with_optimizer(OptimizerConfig::new().with_kind(kind));
            assert!(train(model(), &config, &corpora(), None).is_ok());
        }
    }

    #[test]
    fn bad_schedule_fails_before_training() {
        let config = TrainingConfig::new().with_objective_sequence("sample_all_+".to_string());
        assert!(matches!(
            train(model(), &config, &corpora(), None),
            Err(Error::BadSchedule(_))
        ));
    }

    #[test]
    fn dev_decodes_with_the_phase_policy() {
        let config = TrainingConfig::new()
            .with_max_iter(3)
            .with_objective_sequence("left_reward_+".to_string());
        let phases = parse_schedule(&config.objective_sequence, config.max_iter).unwrap();
        assert!(phases.iter().all(|p| p.policy == PolicyKind::Left));
        for phase in phases {
            assert_eq!(config.predict_mode(phase), PredictMode::Policy(PolicyKind::Left));
        }
        let warm_up = parse_schedule("right_reward_1(sample_both_+)", 2).unwrap();
        assert_eq!(
            config.predict_mode(warm_up[0]),
            PredictMode::Policy(PolicyKind::Right)
        );
        assert_eq!(
            config.predict_mode(warm_up[1]),
            PredictMode::Policy(PolicyKind::Sample)
        );
        let oracle = TrainingConfig::new().with_regime(Regime::Oracle);
        assert_eq!(oracle.predict_mode(warm_up[0]), PredictMode::Oracle);
    }

    #[test]
    fn config_survives_a_json_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("training.json");
        let config = TrainingConfig::new()
            .with_regime(Regime::PolicyGradient)
            .with_policy(PolicyKind::Right)
            .with_seed(7)
            .with_optimizer(OptimizerConfig::new().with_kind(OptimizerKind::Adam));
        config.save(&path).unwrap();
        let loaded = TrainingConfig::load(&path).unwrap();
        assert_eq!(loaded.regime, Regime::PolicyGradient);
        assert_eq!(loaded.policy, PolicyKind::Right);
        assert_eq!(loaded.seed, 7);
        assert_eq!(loaded.optimizer.kind, OptimizerKind::Adam);
        assert_eq!(loaded.objective_sequence, "sample_both_+");
    }

    #[test]
    fn oracle_regime_needs_trees() {
        let config = TrainingConfig::new().with_regime(Regime::Oracle);
        assert!(matches!(
            train(model(), &config, &corpora(), None),
            Err(Error::MissingTree)
        ));
    }
}
