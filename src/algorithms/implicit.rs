//! Implicit feedback adjustment of user vectors.
//!
//! A user's effective vector is their raw latent vector plus, for each
//! non-empty feedback bucket, the sum of that bucket's implicit item vectors
//! scaled by `1 / sqrt(bucket size)`. Dropped items feed the negative bucket,
//! every other status feeds the positive one.

use crate::algorithms::optimizer::Sgd;
use crate::algorithms::parameters::{ParameterStore, VectorKind};
use crate::models::{ImplicitFeedback, ItemId, UserId};
use crate::utils::{all_finite, bucket_scale};
use nalgebra::DVector;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImplicitBuckets {
    pub positive: Vec<ItemId>,
    pub negative: Vec<ItemId>,
}

#[derive(Debug, Clone, Default)]
pub struct ImplicitAggregator {
    buckets: HashMap<UserId, ImplicitBuckets>,
    only_negative: bool,
}

impl ImplicitAggregator {
    pub fn from_feedback(feedback: &[ImplicitFeedback], only_negative: bool) -> Self {
        let mut buckets: HashMap<UserId, ImplicitBuckets> = HashMap::new();
        for signal in feedback {
            let entry = buckets.entry(signal.user.clone()).or_default();
            if signal.is_positive() {
                entry.positive.push(signal.item.clone());
            } else {
                entry.negative.push(signal.item.clone());
            }
        }
        Self {
            buckets,
            only_negative,
        }
    }

    pub fn from_buckets(buckets: BTreeMap<UserId, ImplicitBuckets>, only_negative: bool) -> Self {
        Self {
            buckets: buckets.into_iter().collect(),
            only_negative,
        }
    }

    pub fn only_negative(&self) -> bool {
        self.only_negative
    }

    pub fn buckets_for(&self, user: &str) -> Option<&ImplicitBuckets> {
        self.buckets.get(user)
    }

    pub fn user_count(&self) -> usize {
        self.buckets.len()
    }

    pub fn to_sorted_buckets(&self) -> BTreeMap<UserId, ImplicitBuckets> {
        self.buckets
            .iter()
            .map(|(user, buckets)| (user.clone(), buckets.clone()))
            .collect()
    }

    /// Non-empty buckets that take part in scoring, negative first.
    fn active_buckets<'a>(&'a self, user: &str) -> [Option<(VectorKind, &'a [ItemId])>; 2] {
        let Some(buckets) = self.buckets.get(user) else {
            return [None, None];
        };
        let negative = (!buckets.negative.is_empty())
            .then(|| (VectorKind::NegativeImplicit, buckets.negative.as_slice()));
        let positive = (!self.only_negative && !buckets.positive.is_empty())
            .then(|| (VectorKind::PositiveImplicit, buckets.positive.as_slice()));
        [negative, positive]
    }

    /// Effective vector used while training. Implicit vectors that do not
    /// exist yet are materialized in `store`.
    pub fn effective_vector(
        &self,
        store: &mut ParameterStore,
        user: &str,
        raw: &DVector<f64>,
    ) -> DVector<f64> {
        let mut effective = raw.clone();
        for (kind, items) in self.active_buckets(user).into_iter().flatten() {
            let mut total = DVector::<f64>::zeros(raw.len());
            for item in items {
                total += &*store.vector_for(kind, item);
            }
            effective += total * bucket_scale(items.len());
        }
        effective
    }

    /// Effective vector for read-only scoring. Implicit vectors that were
    /// never materialized contribute nothing.
    pub fn effective_vector_readonly(
        &self,
        store: &ParameterStore,
        user: &str,
        raw: &DVector<f64>,
    ) -> DVector<f64> {
        let mut effective = raw.clone();
        for (kind, items) in self.active_buckets(user).into_iter().flatten() {
            let mut total = DVector::<f64>::zeros(raw.len());
            for vector in items.iter().filter_map(|item| store.vector(kind, item)) {
                total += vector;
            }
            effective += total * bucket_scale(items.len());
        }
        effective
    }

    /// Applies one gradient step to every implicit vector of `user`.
    /// Returns false if any updated vector is no longer finite.
    pub fn apply_gradient(
        &self,
        store: &mut ParameterStore,
        user: &str,
        error: f64,
        item_vector: &DVector<f64>,
        sgd: &Sgd,
    ) -> bool {
        let mut finite = true;
        for (kind, items) in self.active_buckets(user).into_iter().flatten() {
            let scale = bucket_scale(items.len());
            for item in items {
                let vector = store.vector_for(kind, item);
                sgd.step_vector(vector, item_vector, error * scale);
                finite &= all_finite(vector);
            }
        }
        finite
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::initializer::ParameterInitializer;
    use crate::models::FeedbackStatus;

    fn feedback() -> Vec<ImplicitFeedback> {
        vec![
            ImplicitFeedback::new("u", "d1", FeedbackStatus::Dropped),
            ImplicitFeedback::new("u", "d2", FeedbackStatus::Dropped),
            ImplicitFeedback::new("u", "w1", FeedbackStatus::Watching),
            ImplicitFeedback::new("v", "c1", FeedbackStatus::Completed),
        ]
    }

    #[test]
    fn test_buckets_split_by_polarity() {
        let aggregator = ImplicitAggregator::from_feedback(&feedback(), false);
        let buckets = aggregator.buckets_for("u").unwrap();

        assert_eq!(buckets.negative, vec!["d1".to_string(), "d2".to_string()]);
        assert_eq!(buckets.positive, vec!["w1".to_string()]);
        assert_eq!(aggregator.user_count(), 2);
    }

    #[test]
    fn test_unknown_user_unchanged() {
        let aggregator = ImplicitAggregator::from_feedback(&feedback(), false);
        let mut store = ParameterStore::new(3, ParameterInitializer::seeded(3));
        let raw = DVector::from_vec(vec![0.1, 0.2, 0.3]);

        assert_eq!(aggregator.effective_vector(&mut store, "nobody", &raw), raw);
        assert_eq!(store.vector_count(VectorKind::NegativeImplicit), 0);
    }

    #[test]
    fn test_effective_vector_normalizes_by_bucket_size() {
        let aggregator = ImplicitAggregator::from_feedback(&feedback(), false);
        let mut store = ParameterStore::new(2, ParameterInitializer::seeded(9));
        let raw = DVector::from_vec(vec![1.0, -1.0]);

        let effective = aggregator.effective_vector(&mut store, "u", &raw);

        let d1 = store.vector(VectorKind::NegativeImplicit, "d1").unwrap().clone();
        let d2 = store.vector(VectorKind::NegativeImplicit, "d2").unwrap().clone();
        let w1 = store.vector(VectorKind::PositiveImplicit, "w1").unwrap().clone();
        let expected = &raw + (&d1 + &d2) * (1.0 / 2f64.sqrt()) + &w1;

        assert!((effective - expected).norm() < 1e-12);
        let readonly = aggregator.effective_vector_readonly(&store, "u", &raw);
        assert_eq!(readonly, aggregator.effective_vector(&mut store, "u", &raw));
    }

    #[test]
    fn test_only_negative_ignores_positive_bucket() {
        let aggregator = ImplicitAggregator::from_feedback(&feedback(), true);
        let mut store = ParameterStore::new(2, ParameterInitializer::seeded(9));
        let raw = DVector::zeros(2);

        aggregator.effective_vector(&mut store, "v", &raw);
        aggregator.effective_vector(&mut store, "u", &raw);

        assert_eq!(store.vector_count(VectorKind::PositiveImplicit), 0);
        assert_eq!(store.vector_count(VectorKind::NegativeImplicit), 2);
    }

    #[test]
    fn test_apply_gradient_moves_implicit_vectors() {
        let aggregator = ImplicitAggregator::from_feedback(&feedback(), false);
        let mut store = ParameterStore::new(2, ParameterInitializer::seeded(4));
        let raw = DVector::zeros(2);
        aggregator.effective_vector(&mut store, "u", &raw);
        let before = store.vector(VectorKind::PositiveImplicit, "w1").unwrap().clone();

        let item = DVector::from_vec(vec![1.0, 2.0]);
        let finite = aggregator.apply_gradient(&mut store, "u", 0.5, &item, &Sgd::new(0.1, 0.0));

        assert!(finite);
        let after = store.vector(VectorKind::PositiveImplicit, "w1").unwrap();
        assert!((after - (&before + &item * 0.05)).norm() < 1e-12);
    }
}
