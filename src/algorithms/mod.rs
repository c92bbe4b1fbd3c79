pub mod baseline;
pub mod implicit;
pub mod initializer;
pub mod latent_factor;
pub mod optimizer;
pub mod parameters;
pub mod state;
pub mod topk;

pub use baseline::ItemAverageModel;
pub use implicit::{ImplicitAggregator, ImplicitBuckets};
pub use initializer::ParameterInitializer;
pub use latent_factor::{LatentFactorModel, ModelPhase, TrainingOutcome};
pub use optimizer::Sgd;
pub use parameters::{EntityKind, ParameterStore, VectorKind};
pub use state::ModelState;
pub use topk::top_k_test;

use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Anything that can score a user/item pair.
///
/// `predict` fails with `MissingEntity` when the model knows nothing about
/// the user or the item.
pub trait Scorable {
    fn predict(&self, user: &str, item: &str) -> Result<f64>;
}

/// The fixed parameter tuple a latent factor model is trained with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hyperparameters {
    /// Latent dimension F.
    pub factors: usize,
    /// L2 regularization weight (lambda).
    pub regularization: f64,
    /// SGD step size (eta).
    pub learning_rate: f64,
    pub max_epochs: usize,
    pub use_biases: bool,
    pub use_implicit_feedback: bool,
    pub only_negative_feedback: bool,
    /// Write a checkpoint every this many completed epochs.
    pub checkpoint_interval: Option<usize>,
}

impl Hyperparameters {
    pub fn new(factors: usize, regularization: f64, learning_rate: f64, max_epochs: usize) -> Self {
        Self {
            factors,
            regularization,
            learning_rate,
            max_epochs,
            use_biases: true,
            use_implicit_feedback: false,
            only_negative_feedback: false,
            checkpoint_interval: None,
        }
    }

    pub fn with_biases(mut self, use_biases: bool) -> Self {
        self.use_biases = use_biases;
        self
    }

    pub fn with_implicit_feedback(mut self, enabled: bool, only_negative: bool) -> Self {
        self.use_implicit_feedback = enabled;
        self.only_negative_feedback = only_negative;
        self
    }

    pub fn with_checkpoint_interval(mut self, interval: usize) -> Self {
        self.checkpoint_interval = Some(interval);
        self
    }

    /// Identifies a training configuration independent of progress.
    pub fn signature(&self) -> String {
        format!(
            "{}_{}_{}_{}_{}_{}",
            self.use_implicit_feedback,
            self.only_negative_feedback,
            self.use_biases,
            self.factors,
            self.regularization,
            self.learning_rate
        )
    }

    pub fn checkpoint_key(&self, epoch: usize) -> String {
        format!("{}_{}", self.signature(), epoch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checkpoint_key_reflects_parameters() {
        let params = Hyperparameters::new(20, 0.05, 0.01, 100).with_implicit_feedback(true, false);
        assert_eq!(params.signature(), "true_false_true_20_0.05_0.01");
        assert_eq!(params.checkpoint_key(40), "true_false_true_20_0.05_0.01_40");

        let other = params.clone().with_biases(false);
        assert_ne!(params.signature(), other.signature());
    }
}
