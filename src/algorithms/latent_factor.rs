use crate::algorithms::implicit::ImplicitAggregator;
use crate::algorithms::initializer::ParameterInitializer;
use crate::algorithms::optimizer::Sgd;
use crate::algorithms::parameters::{ParameterStore, VectorKind};
use crate::algorithms::state::ModelState;
use crate::algorithms::{Hyperparameters, Scorable};
use crate::error::Result;
use crate::models::{ImplicitFeedback, Rating};
use crate::services::checkpoint::{Checkpoint, CheckpointStore};
use crate::utils::metrics::{evaluate_ratings, EvaluationReport};
use crate::utils::{average_of_item_averages, validation};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelPhase {
    Untrained,
    Training,
    Converged,
    Diverged { epoch: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrainingOutcome {
    Converged { epochs: usize },
    /// A parameter became NaN or infinite during `epoch`. Retry with a
    /// smaller learning rate.
    Diverged { epoch: usize },
}

impl TrainingOutcome {
    pub fn succeeded(&self) -> bool {
        matches!(self, TrainingOutcome::Converged { .. })
    }
}

/// Matrix factorization model trained with SGD over explicit ratings,
/// optionally adjusted by implicit feedback.
#[derive(Debug, Clone)]
pub struct LatentFactorModel {
    hyperparameters: Hyperparameters,
    sgd: Sgd,
    train_ratings: Vec<Rating>,
    state: ModelState,
    phase: ModelPhase,
}

impl LatentFactorModel {
    /// Builds an untrained model. The rating average and the implicit
    /// feedback buckets are fixed here and never change afterwards.
    ///
    /// `implicit_feedback` is only consulted when the hyperparameters
    /// enable implicit feedback.
    pub fn new(
        train_ratings: Vec<Rating>,
        hyperparameters: Hyperparameters,
        implicit_feedback: Option<&[ImplicitFeedback]>,
        initializer: ParameterInitializer,
    ) -> Result<Self> {
        validation::validate_hyperparameters(&hyperparameters)?;
        validation::validate_training_ratings(&train_ratings)?;

        let rating_average = if hyperparameters.use_biases {
            average_of_item_averages(&train_ratings)
        } else {
            0.0
        };
        let implicit = hyperparameters.use_implicit_feedback.then(|| {
            ImplicitAggregator::from_feedback(
                implicit_feedback.unwrap_or_default(),
                hyperparameters.only_negative_feedback,
            )
        });
        if let Some(aggregator) = &implicit {
            debug!("Implicit feedback recorded for {} users", aggregator.user_count());
        }

        let store = ParameterStore::new(hyperparameters.factors, initializer);
        let state = ModelState::new(store, rating_average, implicit, hyperparameters.use_biases);

        Ok(Self {
            sgd: Sgd::new(hyperparameters.learning_rate, hyperparameters.regularization),
            hyperparameters,
            train_ratings,
            state,
            phase: ModelPhase::Untrained,
        })
    }

    /// Rebuilds a model from a checkpoint. Training resumes at the epoch
    /// after the checkpointed one.
    pub fn from_checkpoint(
        checkpoint: Checkpoint,
        train_ratings: Vec<Rating>,
        initializer: ParameterInitializer,
    ) -> Result<Self> {
        let hyperparameters = checkpoint.hyperparameters;
        validation::validate_hyperparameters(&hyperparameters)?;
        validation::validate_training_ratings(&train_ratings)?;

        let store = ParameterStore::from_snapshot(checkpoint.parameters, hyperparameters.factors, initializer)?;
        let implicit = hyperparameters.use_implicit_feedback.then(|| {
            ImplicitAggregator::from_buckets(
                checkpoint.implicit_buckets.unwrap_or_default(),
                hyperparameters.only_negative_feedback,
            )
        });
        let mut state = ModelState::new(
            store,
            checkpoint.rating_average,
            implicit,
            hyperparameters.use_biases,
        );
        state.completed_epochs = checkpoint.completed_epochs;

        let phase = if state.completed_epochs == 0 {
            ModelPhase::Untrained
        } else if state.completed_epochs >= hyperparameters.max_epochs {
            ModelPhase::Converged
        } else {
            ModelPhase::Training
        };

        info!(
            "Restored model {} at epoch {}",
            hyperparameters.signature(),
            state.completed_epochs
        );

        Ok(Self {
            sgd: Sgd::new(hyperparameters.learning_rate, hyperparameters.regularization),
            hyperparameters,
            train_ratings,
            state,
            phase,
        })
    }

    pub fn hyperparameters(&self) -> &Hyperparameters {
        &self.hyperparameters
    }

    pub fn state(&self) -> &ModelState {
        &self.state
    }

    pub fn store(&self) -> &ParameterStore {
        self.state.store()
    }

    pub fn rating_average(&self) -> f64 {
        self.state.rating_average()
    }

    pub fn completed_epochs(&self) -> usize {
        self.state.completed_epochs()
    }

    pub fn phase(&self) -> ModelPhase {
        self.phase
    }

    /// Raises or lowers the epoch target for the next `train` call.
    pub fn set_max_epochs(&mut self, max_epochs: usize) -> Result<()> {
        let mut hyperparameters = self.hyperparameters.clone();
        hyperparameters.max_epochs = max_epochs;
        validation::validate_hyperparameters(&hyperparameters)?;
        self.hyperparameters = hyperparameters;
        if self.phase == ModelPhase::Converged && self.completed_epochs() < max_epochs {
            self.phase = ModelPhase::Training;
        }
        Ok(())
    }

    /// Runs epochs `completed_epochs + 1 ..= max_epochs` without writing
    /// checkpoints.
    pub fn train(&mut self) -> Result<TrainingOutcome> {
        self.run_epochs(None)
    }

    /// Like [`train`](Self::train), saving a checkpoint every
    /// `checkpoint_interval` epochs.
    pub fn train_with_checkpoints(&mut self, checkpoints: &mut dyn CheckpointStore) -> Result<TrainingOutcome> {
        self.run_epochs(Some(checkpoints))
    }

    fn run_epochs(&mut self, mut checkpoints: Option<&mut dyn CheckpointStore>) -> Result<TrainingOutcome> {
        if let ModelPhase::Diverged { epoch } = self.phase {
            warn!("Model diverged at epoch {}; refusing to train further", epoch);
            return Ok(TrainingOutcome::Diverged { epoch });
        }

        let first_epoch = self.state.completed_epochs + 1;
        for epoch in first_epoch..=self.hyperparameters.max_epochs {
            self.phase = ModelPhase::Training;

            for rating in &self.train_ratings {
                if !self.state.apply_rating(&self.sgd, rating) {
                    warn!(
                        "Non-finite parameters after rating {} in epoch {}",
                        rating, epoch
                    );
                    self.phase = ModelPhase::Diverged { epoch };
                    return Ok(TrainingOutcome::Diverged { epoch });
                }
            }
            self.state.completed_epochs += 1;
            info!("Completed epoch {}/{}", epoch, self.hyperparameters.max_epochs);

            if let (Some(interval), Some(store)) = (self.hyperparameters.checkpoint_interval, checkpoints.as_mut()) {
                if epoch % interval == 0 {
                    let key = self.hyperparameters.checkpoint_key(epoch);
                    store.save(&key, &self.checkpoint())?;
                    info!("Saved checkpoint {}", key);
                }
            }
        }

        self.phase = ModelPhase::Converged;
        debug!(
            "Store holds {} users, {} items",
            self.store().vector_count(VectorKind::User),
            self.store().vector_count(VectorKind::Item)
        );
        Ok(TrainingOutcome::Converged {
            epochs: self.state.completed_epochs,
        })
    }

    /// Snapshot of the current state and hyperparameters.
    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint::new(
            self.hyperparameters.clone(),
            self.state.completed_epochs,
            self.state.rating_average,
            self.state.store.snapshot(),
            self.state.implicit.as_ref().map(|aggregator| aggregator.to_sorted_buckets()),
        )
    }

    /// RMSE and error distribution over `ratings`. Unknown users or items
    /// are not an error here; they land in the cold start bucket.
    pub fn test(&self, ratings: &[Rating]) -> Result<EvaluationReport> {
        evaluate_ratings(self, ratings)
    }
}

impl Scorable for LatentFactorModel {
    /// Unclamped score. Fails with `MissingEntity` for anything the model
    /// never trained on.
    fn predict(&self, user: &str, item: &str) -> Result<f64> {
        self.state.score(user, item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::EntityKind;
    use crate::error::ModelError;
    use crate::models::FeedbackStatus;

    fn ratings() -> Vec<Rating> {
        vec![
            Rating::new("u1", "i1", 8),
            Rating::new("u1", "i2", 6),
            Rating::new("u2", "i1", 7),
            Rating::new("u2", "i2", 5),
        ]
    }

    #[test]
    fn test_construction_rejects_empty_ratings() {
        let result = LatentFactorModel::new(
            Vec::new(),
            Hyperparameters::new(2, 0.0, 0.1, 10),
            None,
            ParameterInitializer::seeded(0),
        );
        assert!(matches!(result, Err(ModelError::InvalidConfiguration(_))));
    }

    #[test]
    fn test_construction_rejects_negative_regularization() {
        let result = LatentFactorModel::new(
            ratings(),
            Hyperparameters::new(2, -0.1, 0.1, 10),
            None,
            ParameterInitializer::seeded(0),
        );
        assert!(matches!(result, Err(ModelError::InvalidConfiguration(_))));
    }

    #[test]
    fn test_rating_average_only_with_biases() {
        let ratings = vec![
            Rating::new("u1", "a", 10),
            Rating::new("u2", "a", 6),
            Rating::new("u1", "b", 2),
        ];
        let with_biases = LatentFactorModel::new(
            ratings.clone(),
            Hyperparameters::new(2, 0.0, 0.1, 1),
            None,
            ParameterInitializer::seeded(0),
        )
        .unwrap();
        let without = LatentFactorModel::new(
            ratings,
            Hyperparameters::new(2, 0.0, 0.1, 1).with_biases(false),
            None,
            ParameterInitializer::seeded(0),
        )
        .unwrap();

        assert!((with_biases.rating_average() - 5.0).abs() < 1e-12);
        assert_eq!(without.rating_average(), 0.0);
    }

    #[test]
    fn test_phases_follow_training() {
        let mut model = LatentFactorModel::new(
            ratings(),
            Hyperparameters::new(2, 0.01, 0.01, 3),
            None,
            ParameterInitializer::seeded(5),
        )
        .unwrap();
        assert_eq!(model.phase(), ModelPhase::Untrained);

        let outcome = model.train().unwrap();
        assert_eq!(outcome, TrainingOutcome::Converged { epochs: 3 });
        assert_eq!(model.phase(), ModelPhase::Converged);
        assert_eq!(model.completed_epochs(), 3);

        // nothing left to do
        assert_eq!(model.train().unwrap(), TrainingOutcome::Converged { epochs: 3 });

        model.set_max_epochs(5).unwrap();
        assert_eq!(model.phase(), ModelPhase::Training);
        assert_eq!(model.train().unwrap(), TrainingOutcome::Converged { epochs: 5 });
    }

    #[test]
    fn test_diverged_model_stays_diverged() {
        let mut model = LatentFactorModel::new(
            ratings(),
            Hyperparameters::new(1, 0.0, 50.0, 20).with_biases(false),
            None,
            ParameterInitializer::seeded(11),
        )
        .unwrap();

        let outcome = model.train().unwrap();
        assert!(!outcome.succeeded());
        let TrainingOutcome::Diverged { epoch } = outcome else {
            panic!("expected divergence");
        };
        assert!(matches!(model.phase(), ModelPhase::Diverged { .. }));
        assert_eq!(model.completed_epochs(), epoch - 1);
        assert_eq!(model.train().unwrap(), TrainingOutcome::Diverged { epoch });
    }

    #[test]
    fn test_biases_materialized_only_in_bias_mode() {
        let mut model = LatentFactorModel::new(
            ratings(),
            Hyperparameters::new(3, 0.02, 0.01, 1).with_biases(false),
            None,
            ParameterInitializer::seeded(1),
        )
        .unwrap();
        model.train().unwrap();

        assert_eq!(model.store().bias_count(EntityKind::User), 0);
        assert_eq!(model.store().vector_count(VectorKind::User), 2);
        assert_eq!(model.store().vector(VectorKind::Item, "i1").unwrap().len(), 3);
    }

    #[test]
    fn test_predict_rejects_unknown_entities() {
        let mut model = LatentFactorModel::new(
            ratings(),
            Hyperparameters::new(2, 0.02, 0.01, 2),
            None,
            ParameterInitializer::seeded(1),
        )
        .unwrap();
        model.train().unwrap();

        assert!(model.predict("u1", "i2").is_ok());
        assert!(matches!(
            model.predict("ghost", "i1"),
            Err(ModelError::MissingEntity { kind: EntityKind::User, .. })
        ));
        assert!(matches!(
            model.predict("u1", "ghost"),
            Err(ModelError::MissingEntity { kind: EntityKind::Item, .. })
        ));
    }

    #[test]
    fn test_implicit_feedback_ignored_when_disabled() {
        let feedback = vec![ImplicitFeedback::new("u1", "i3", FeedbackStatus::Dropped)];
        let mut model = LatentFactorModel::new(
            ratings(),
            Hyperparameters::new(2, 0.02, 0.01, 1),
            Some(feedback.as_slice()),
            ParameterInitializer::seeded(1),
        )
        .unwrap();
        model.train().unwrap();

        assert!(model.state().implicit().is_none());
        assert_eq!(model.store().vector_count(VectorKind::NegativeImplicit), 0);
    }
}
