use crate::algorithms::implicit::ImplicitAggregator;
use crate::algorithms::optimizer::Sgd;
use crate::algorithms::parameters::{EntityKind, ParameterStore, VectorKind};
use crate::error::{ModelError, Result};
use crate::models::Rating;
use crate::utils::all_finite;
use nalgebra::DVector;

/// Everything one latent factor model learns, plus how far it has come.
#[derive(Debug, Clone)]
pub struct ModelState {
    pub(crate) store: ParameterStore,
    pub(crate) rating_average: f64,
    pub(crate) implicit: Option<ImplicitAggregator>,
    pub(crate) completed_epochs: usize,
    pub(crate) use_biases: bool,
}

impl ModelState {
    pub fn new(
        store: ParameterStore,
        rating_average: f64,
        implicit: Option<ImplicitAggregator>,
        use_biases: bool,
    ) -> Self {
        Self {
            store,
            rating_average,
            implicit,
            completed_epochs: 0,
            use_biases,
        }
    }

    pub fn store(&self) -> &ParameterStore {
        &self.store
    }

    pub fn rating_average(&self) -> f64 {
        self.rating_average
    }

    pub fn implicit(&self) -> Option<&ImplicitAggregator> {
        self.implicit.as_ref()
    }

    pub fn completed_epochs(&self) -> usize {
        self.completed_epochs
    }

    /// One SGD update for a single rating. Returns false as soon as any
    /// parameter touched by the update is NaN or infinite.
    pub(crate) fn apply_rating(&mut self, sgd: &Sgd, rating: &Rating) -> bool {
        let user_vector = self.store.vector_for(VectorKind::User, &rating.user).clone();
        let item_vector = self.store.vector_for(VectorKind::Item, &rating.item).clone();
        let (user_bias, item_bias) = if self.use_biases {
            (
                *self.store.bias_for(EntityKind::User, &rating.user),
                *self.store.bias_for(EntityKind::Item, &rating.item),
            )
        } else {
            (0.0, 0.0)
        };

        let effective = match &self.implicit {
            Some(aggregator) => aggregator.effective_vector(&mut self.store, &rating.user, &user_vector),
            None => user_vector.clone(),
        };
        let guess = self.rating_average + user_bias + item_bias + effective.dot(&item_vector);
        let error = rating.score as f64 - guess;

        // Gradients always use the raw vectors from before this update.
        let mut finite = true;
        {
            let user = self.store.vector_for(VectorKind::User, &rating.user);
            sgd.step_vector(user, &item_vector, error);
            finite &= all_finite(user);
        }
        let updated_item = {
            let item = self.store.vector_for(VectorKind::Item, &rating.item);
            sgd.step_vector(item, &user_vector, error);
            finite &= all_finite(item);
            item.clone()
        };
        if self.use_biases {
            let user = self.store.bias_for(EntityKind::User, &rating.user);
            sgd.step_bias(user, error);
            finite &= user.is_finite();
            let item = self.store.bias_for(EntityKind::Item, &rating.item);
            sgd.step_bias(item, error);
            finite &= item.is_finite();
        }

        if let Some(aggregator) = &self.implicit {
            finite &= aggregator.apply_gradient(&mut self.store, &rating.user, error, &updated_item, sgd);
        }

        finite
    }

    /// Scores a pair without creating anything.
    pub(crate) fn score(&self, user: &str, item: &str) -> Result<f64> {
        let user_vector = self
            .store
            .vector(VectorKind::User, user)
            .ok_or_else(|| ModelError::missing(EntityKind::User, user))?;
        let user_bias = self.known_bias(EntityKind::User, user)?;
        let item_vector = self
            .store
            .vector(VectorKind::Item, item)
            .ok_or_else(|| ModelError::missing(EntityKind::Item, item))?;
        let item_bias = self.known_bias(EntityKind::Item, item)?;

        let effective = self.effective_user_vector(user, user_vector);
        Ok(self.rating_average + user_bias + item_bias + effective.dot(item_vector))
    }

    fn known_bias(&self, kind: EntityKind, id: &str) -> Result<f64> {
        if !self.use_biases {
            return Ok(0.0);
        }
        self.store
            .bias(kind, id)
            .ok_or_else(|| ModelError::missing(kind, id))
    }

    fn effective_user_vector(&self, user: &str, raw: &DVector<f64>) -> DVector<f64> {
        match &self.implicit {
            Some(aggregator) => aggregator.effective_vector_readonly(&self.store, user, raw),
            None => raw.clone(),
        }
    }
}
