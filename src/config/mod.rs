use crate::algorithms::Hyperparameters;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub training: TrainingConfig,
    pub checkpoint: CheckpointConfig,
    pub evaluation: EvaluationConfig,
    pub data: DataConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    pub factors: usize,
    pub regularization: f64,
    pub learning_rate: f64,
    pub max_epochs: usize,
    pub use_biases: bool,
    pub use_implicit_feedback: bool,
    pub only_negative_feedback: bool,
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointConfig {
    pub interval: Option<usize>,
    pub directory: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationConfig {
    pub topk_distractors: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    pub train_ratings: String,
    pub test_ratings: String,
    pub implicit_feedback: Option<String>,
    pub topk_cases: Option<String>,
}

impl TrainingConfig {
    pub fn hyperparameters(&self, checkpoint: &CheckpointConfig) -> Hyperparameters {
        Hyperparameters {
            factors: self.factors,
            regularization: self.regularization,
            learning_rate: self.learning_rate,
            max_epochs: self.max_epochs,
            use_biases: self.use_biases,
            use_implicit_feedback: self.use_implicit_feedback,
            only_negative_feedback: self.only_negative_feedback,
            checkpoint_interval: checkpoint.interval,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            training: TrainingConfig {
                factors: 20,
                regularization: 0.05,
                learning_rate: 0.005,
                max_epochs: 100,
                use_biases: true,
                use_implicit_feedback: false,
                only_negative_feedback: false,
                seed: None,
            },
            checkpoint: CheckpointConfig {
                interval: Some(10),
                directory: "checkpoints".to_string(),
            },
            evaluation: EvaluationConfig {
                topk_distractors: 1000,
            },
            data: DataConfig {
                train_ratings: "data/train_ratings.json".to_string(),
                test_ratings: "data/test_ratings.json".to_string(),
                implicit_feedback: None,
                topk_cases: None,
            },
        }
    }
}

impl Config {
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::Config::try_from(&Config::default())?)
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix("LATENTREC").separator("__"))
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    pub fn hyperparameters(&self) -> Hyperparameters {
        self.training.hyperparameters(&self.checkpoint)
    }
}
