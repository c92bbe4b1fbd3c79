pub mod algorithms;
pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;

pub use algorithms::{
    top_k_test, Hyperparameters, ItemAverageModel, LatentFactorModel, ModelPhase,
    ParameterInitializer, Scorable, TrainingOutcome,
};
pub use config::Config;
pub use error::{ModelError, Result};
pub use models::*;
pub use services::checkpoint::{Checkpoint, CheckpointStore, FileCheckpointStore, InMemoryCheckpointStore};
pub use utils::metrics::{EvaluationReport, RankDistribution, COLD_START_PENALTY};

pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
}
