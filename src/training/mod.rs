//! Training: objectives, phase schedules, optimizers and the loop.

pub mod objective;
pub mod optim;
pub mod oracle;
pub mod pg;
pub mod schedule;
pub mod trainer;

pub use objective::{learn_to_compose, InstanceLoss, ObjectiveType};
pub use optim::{OptimizerConfig, OptimizerKind};
pub use schedule::{parse_schedule, Phase};
pub use trainer::{train, Corpora, Regime, SaveTarget, TrainOutcome, TrainingConfig};
