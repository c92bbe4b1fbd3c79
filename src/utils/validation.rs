use crate::algorithms::Hyperparameters;
use crate::error::{ModelError, Result};
use crate::models::{Rating, TopKCase};

pub fn validate_hyperparameters(params: &Hyperparameters) -> Result<()> {
    if params.factors == 0 {
        return Err(ModelError::invalid("Latent factor count must be greater than 0"));
    }

    if !params.regularization.is_finite() || params.regularization < 0.0 {
        return Err(ModelError::invalid(format!(
            "Regularization must be a non-negative number, got {}",
            params.regularization
        )));
    }

    if !params.learning_rate.is_finite() || params.learning_rate <= 0.0 {
        return Err(ModelError::invalid(format!(
            "Learning rate must be a positive number, got {}",
            params.learning_rate
        )));
    }

    if params.max_epochs == 0 {
        return Err(ModelError::invalid("Maximum epoch count must be greater than 0"));
    }

    if params.checkpoint_interval == Some(0) {
        return Err(ModelError::invalid("Checkpoint interval must be greater than 0"));
    }

    Ok(())
}

pub fn validate_training_ratings(ratings: &[Rating]) -> Result<()> {
    if ratings.is_empty() {
        return Err(ModelError::invalid("Training ratings cannot be empty"));
    }
    Ok(())
}

pub fn validate_top_k_cases(cases: &[TopKCase], distractor_total: usize) -> Result<()> {
    if distractor_total == 0 {
        return Err(ModelError::invalid("Top-K test needs at least one distractor per case"));
    }

    if cases.is_empty() {
        return Err(ModelError::invalid("Top-K test cases cannot be empty"));
    }

    if let Some(case) = cases.iter().find(|c| c.distractors.len() > distractor_total) {
        return Err(ModelError::invalid(format!(
            "Top-K case for user {} has {} distractors (max {})",
            case.user,
            case.distractors.len(),
            distractor_total
        )));
    }

    Ok(())
}
