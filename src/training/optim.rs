//! Optimizer selection and learning-rate decay.

use std::str::FromStr;

use burn::config::Config;
use burn::grad_clipping::GradientClippingConfig;
use burn::optim::momentum::MomentumConfig;
use burn::optim::{AdaGradConfig, AdamConfig, RmsPropConfig, SgdConfig};

use crate::error::{Error, Result};

/// Gradient norm ceiling when clipping is enabled.
pub const CLIP_NORM: f32 = 5.0;

#[derive(Config, Debug, Copy, PartialEq, Eq)]
pub enum OptimizerKind {
    SimpleSgd,
    MomentumSgd,
    Adagrad,
    /// Recognised so configs naming it fail with a clear message.
    Adadelta,
    Rmsprop,
    Adam,
}

impl OptimizerKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::SimpleSgd => "simple_sgd",
            Self::MomentumSgd => "momentum_sgd",
            Self::Adagrad => "adagrad",
            Self::Adadelta => "adadelta",
            Self::Rmsprop => "rmsprop",
            Self::Adam => "adam",
        }
    }

    pub fn default_eta(&self) -> f64 {
        match self {
            Self::SimpleSgd | Self::MomentumSgd => 0.1,
            Self::Adagrad => 0.01,
            Self::Adadelta => 1.0,
            Self::Rmsprop | Self::Adam => 0.001,
        }
    }

    pub fn default_eta_decay(&self) -> f64 {
        match self {
            Self::SimpleSgd | Self::MomentumSgd => 0.08,
            _ => 0.0,
        }
    }
}

impl FromStr for OptimizerKind {
    type Err = Error;

    fn from_str(name: &str) -> Result<Self> {
        match name {
            "simple_sgd" | "sgd" => Ok(Self::SimpleSgd),
            "momentum_sgd" => Ok(Self::MomentumSgd),
            "adagrad" => Ok(Self::Adagrad),
            "adadelta" => Ok(Self::Adadelta),
            "rmsprop" => Ok(Self::Rmsprop),
            "adam" => Ok(Self::Adam),
            other => Err(Error::UnknownOptimizer(other.to_string())),
        }
    }
}

#[derive(Config, Debug)]
pub struct OptimizerConfig {
    #[config(default = "OptimizerKind::SimpleSgd")]
    pub kind: OptimizerKind,
    /// Initial learning rate; the kind's default when unset.
    pub eta: Option<f64>,
    #[config(default = 0.0)]
    pub final_eta: f64,
    #[config(default = false)]
    pub enable_eta_decay: bool,
    pub eta_decay: Option<f64>,
    #[config(default = false)]
    pub enable_clipping: bool,
    #[config(default = 0.9)]
    pub adam_beta1: f32,
    #[config(default = 0.999)]
    pub adam_beta2: f32,
}

/// Concrete burn optimizer configuration for one [`OptimizerKind`].
pub enum OptimizerChoice {
    Sgd(SgdConfig),
    AdaGrad(AdaGradConfig),
    RmsProp(RmsPropConfig),
    Adam(AdamConfig),
}

impl OptimizerConfig {
    pub fn eta0(&self) -> f64 {
        self.eta.unwrap_or_else(|| self.kind.default_eta())
    }

    pub fn decay_rate(&self) -> f64 {
        self.eta_decay
            .unwrap_or_else(|| self.kind.default_eta_decay())
    }

    /// Learning rate for `epoch` (0-based): `eta0 / (1 + decay * epoch)`,
    /// pinned to `final_eta` once it drops that low.
    pub fn eta_at(&self, epoch: usize) -> f64 {
        let eta0 = self.eta0();
        if !self.enable_eta_decay {
            return eta0;
        }
        let eta = eta0 / (1.0 + self.decay_rate() * epoch as f64);
        eta.max(self.final_eta)
    }

    fn clipping(&self) -> Option<GradientClippingConfig> {
        self.enable_clipping
            .then_some(GradientClippingConfig::Norm(CLIP_NORM))
    }

    /// Map onto a burn optimizer. AdaDelta has no burn counterpart.
    pub fn choice(&self) -> Result<OptimizerChoice> {
        let clip = self.clipping();
        Ok(match self.kind {
            OptimizerKind::SimpleSgd => {
                OptimizerChoice::Sgd(SgdConfig::new().with_gradient_clipping(clip))
            }
            OptimizerKind::MomentumSgd => OptimizerChoice::Sgd(
                SgdConfig::new()
                    .with_momentum(Some(MomentumConfig::new().with_dampening(0.0)))
                    .with_gradient_clipping(clip),
            ),
            OptimizerKind::Adagrad => {
                OptimizerChoice::AdaGrad(AdaGradConfig::new().with_grad_clipping(clip))
            }
            OptimizerKind::Rmsprop => OptimizerChoice::RmsProp(
                RmsPropConfig::new()
                    .with_momentum(0.0)
                    .with_grad_clipping(clip),
            ),
            OptimizerKind::Adam => OptimizerChoice::Adam(
                AdamConfig::new()
                    .with_beta_1(self.adam_beta1)
                    .with_beta_2(self.adam_beta2)
                    .with_grad_clipping(clip),
            ),
            OptimizerKind::Adadelta => {
                return Err(Error::UnknownOptimizer(
                    "adadelta (not supported, use adagrad or rmsprop)".to_string(),
                ))
            }
        })
    }
}
