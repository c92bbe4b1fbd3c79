use crate::algorithms::{EntityKind, Scorable};
use crate::error::{ModelError, Result};
use crate::models::Rating;
use crate::utils::item_averages;
use crate::utils::metrics::{evaluate_ratings, EvaluationReport};
use std::collections::HashMap;

/// Baseline that predicts the mean training score of the item, ignoring
/// the user entirely.
#[derive(Debug, Clone, Default)]
pub struct ItemAverageModel {
    item_averages: HashMap<String, f64>,
}

impl ItemAverageModel {
    pub fn fit(train_ratings: &[Rating]) -> Self {
        Self {
            item_averages: item_averages(train_ratings).into_iter().collect(),
        }
    }

    pub fn average(&self, item: &str) -> Option<f64> {
        self.item_averages.get(item).copied()
    }

    pub fn item_count(&self) -> usize {
        self.item_averages.len()
    }

    pub fn test(&self, ratings: &[Rating]) -> Result<EvaluationReport> {
        evaluate_ratings(self, ratings)
    }
}

impl Scorable for ItemAverageModel {
    fn predict(&self, _user: &str, item: &str) -> Result<f64> {
        self.average(item)
            .ok_or_else(|| ModelError::missing(EntityKind::Item, item))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_predicts_item_mean() {
        let model = ItemAverageModel::fit(&[
            Rating::new("u1", "a", 4),
            Rating::new("u2", "a", 7),
            Rating::new("u1", "b", 9),
        ]);

        assert_eq!(model.predict("anyone", "a").unwrap(), 5.5);
        assert_eq!(model.predict("u1", "b").unwrap(), 9.0);
        assert_eq!(model.item_count(), 2);
        assert!(matches!(
            model.predict("u1", "c"),
            Err(ModelError::MissingEntity { kind: EntityKind::Item, .. })
        ));
    }

    #[test]
    fn test_unknown_items_penalized_in_test() {
        let model = ItemAverageModel::fit(&[Rating::new("u1", "a", 6)]);
        let report = model
            .test(&[Rating::new("u2", "a", 6), Rating::new("u2", "z", 3)])
            .unwrap();

        assert_eq!(report.total, 2);
        assert_eq!(report.cold_start, 1);
        assert_eq!(report.distribution[&0].count, 1);
    }
}
