use crate::models::Rating;
use nalgebra::DVector;
use std::collections::BTreeMap;

pub mod metrics;
pub mod validation;

pub fn all_finite(vector: &DVector<f64>) -> bool {
    vector.iter().all(|x| x.is_finite())
}

/// Normalization applied to a summed implicit feedback bucket.
pub fn bucket_scale(bucket_size: usize) -> f64 {
    1.0 / (bucket_size as f64).sqrt()
}

pub fn clamp_score(guess: f64, low: f64, high: f64) -> f64 {
    guess.max(low).min(high)
}

/// Mean score of every item in `ratings`, keyed and ordered by item id.
pub fn item_averages(ratings: &[Rating]) -> BTreeMap<String, f64> {
    let mut totals: BTreeMap<&str, (i64, usize)> = BTreeMap::new();
    for rating in ratings {
        let entry = totals.entry(rating.item.as_str()).or_insert((0, 0));
        entry.0 += rating.score as i64;
        entry.1 += 1;
    }

    totals
        .into_iter()
        .map(|(item, (sum, count))| (item.to_string(), sum as f64 / count as f64))
        .collect()
}

/// Average of the per-item averages. Every item weighs the same no matter
/// how many ratings it has. Returns 0 for an empty slice.
pub fn average_of_item_averages(ratings: &[Rating]) -> f64 {
    let averages = item_averages(ratings);
    if averages.is_empty() {
        return 0.0;
    }
    averages.values().sum::<f64>() / averages.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_average_of_item_averages_differs_from_global_mean() {
        let ratings = vec![
            Rating::new("u1", "a", 10),
            Rating::new("u2", "a", 8),
            Rating::new("u3", "a", 9),
            Rating::new("u1", "b", 3),
        ];

        // item a averages 9, item b averages 3; the global mean would be 7.5
        assert!((average_of_item_averages(&ratings) - 6.0).abs() < 1e-12);
        assert_eq!(item_averages(&ratings).get("a"), Some(&9.0));
    }

    #[test]
    fn test_bucket_scale() {
        assert_eq!(bucket_scale(1), 1.0);
        assert!((bucket_scale(4) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_all_finite() {
        assert!(all_finite(&DVector::from_vec(vec![1.0, -3.0])));
        assert!(!all_finite(&DVector::from_vec(vec![1.0, f64::NAN])));
        assert!(!all_finite(&DVector::from_vec(vec![f64::INFINITY])));
    }

    #[test]
    fn test_clamp_score() {
        assert_eq!(clamp_score(11.3, 1.0, 10.0), 10.0);
        assert_eq!(clamp_score(-2.0, 1.0, 10.0), 1.0);
        assert_eq!(clamp_score(4.5, 1.0, 10.0), 4.5);
    }
}
