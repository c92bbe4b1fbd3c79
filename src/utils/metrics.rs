use crate::algorithms::Scorable;
use crate::error::{ModelError, Result};
use crate::models::Rating;
use crate::utils::clamp_score;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{info, warn};

pub const MIN_SCORE: f64 = 1.0;
pub const MAX_SCORE: f64 = 10.0;

/// Histogram key and error magnitude charged for a rating whose user or
/// item the model has never seen.
pub const COLD_START_PENALTY: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ErrorBucket {
    pub count: usize,
    /// Share of all evaluated ratings, in percent.
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub rmse: f64,
    pub total: usize,
    pub cold_start: usize,
    /// Rounded absolute error (or [`COLD_START_PENALTY`]) to its frequency.
    pub distribution: BTreeMap<u32, ErrorBucket>,
}

#[derive(Debug, Clone, Default)]
pub struct ErrorAccumulator {
    squared_error: f64,
    total: usize,
    cold_start: usize,
    diff_counts: BTreeMap<u32, usize>,
}

impl ErrorAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one prediction. The guess is clamped to the rating scale
    /// first.
    pub fn record(&mut self, score: i32, guess: f64) {
        let guess = clamp_score(guess, MIN_SCORE, MAX_SCORE);
        let error = score as f64 - guess;
        self.squared_error += error * error;
        let diff = (score as f64 - guess.round()).abs() as u32;
        *self.diff_counts.entry(diff).or_insert(0) += 1;
        self.total += 1;
    }

    pub fn record_cold_start(&mut self) {
        let penalty = COLD_START_PENALTY as f64;
        self.squared_error += penalty * penalty;
        *self.diff_counts.entry(COLD_START_PENALTY).or_insert(0) += 1;
        self.cold_start += 1;
        self.total += 1;
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn finish(self) -> Result<EvaluationReport> {
        if self.total == 0 {
            return Err(ModelError::invalid("no ratings to evaluate"));
        }
        let total = self.total as f64;
        let distribution = self
            .diff_counts
            .into_iter()
            .map(|(diff, count)| {
                let bucket = ErrorBucket {
                    count,
                    percentage: 100.0 * count as f64 / total,
                };
                (diff, bucket)
            })
            .collect();

        Ok(EvaluationReport {
            rmse: (self.squared_error / total).sqrt(),
            total: self.total,
            cold_start: self.cold_start,
            distribution,
        })
    }
}

/// Scores every rating with `model` and summarizes the error.
///
/// A `MissingEntity` from the model is charged the cold start penalty
/// instead of failing the whole evaluation.
pub fn evaluate_ratings<M: Scorable + ?Sized>(model: &M, ratings: &[Rating]) -> Result<EvaluationReport> {
    let mut accumulator = ErrorAccumulator::new();
    for rating in ratings {
        match model.predict(&rating.user, &rating.item) {
            Ok(guess) => accumulator.record(rating.score, guess),
            Err(ModelError::MissingEntity { .. }) => accumulator.record_cold_start(),
            Err(e) => return Err(e),
        }
    }

    let report = accumulator.finish()?;
    if report.cold_start > 0 {
        warn!(
            "{} of {} ratings had no trained parameters",
            report.cold_start, report.total
        );
    }
    info!("RMSE: {}", report.rmse);
    for (diff, bucket) in &report.distribution {
        info!("{}: {} ({})", diff, bucket.count, bucket.percentage);
    }
    Ok(report)
}

/// Cumulative rank distribution produced by the top-K test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankDistribution {
    /// `rank / distractor_total` for every possible rank.
    pub positions: Vec<f64>,
    /// Share of cases whose true item ranked at or above each position.
    pub cumulative: Vec<f64>,
}

#[derive(Debug, Clone, Default)]
pub struct RankHistogram {
    counts: BTreeMap<usize, usize>,
    total: usize,
}

impl RankHistogram {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, rank: usize) {
        *self.counts.entry(rank).or_insert(0) += 1;
        self.total += 1;
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn count(&self, rank: usize) -> usize {
        self.counts.get(&rank).copied().unwrap_or(0)
    }

    pub fn cumulative_distribution(&self, distractor_total: usize) -> RankDistribution {
        let mut positions = Vec::with_capacity(distractor_total + 1);
        let mut cumulative = Vec::with_capacity(distractor_total + 1);
        let mut at_or_above = 0usize;

        for rank in 0..=distractor_total {
            at_or_above += self.count(rank);
            positions.push(rank as f64 / distractor_total as f64);
            cumulative.push(if self.total == 0 {
                0.0
            } else {
                at_or_above as f64 / self.total as f64
            });
        }

        RankDistribution {
            positions,
            cumulative,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guess_clamped_before_error() {
        let mut acc = ErrorAccumulator::new();
        acc.record(10, 14.0);
        acc.record(1, -3.0);
        let report = acc.finish().unwrap();

        assert_eq!(report.rmse, 0.0);
        assert_eq!(report.distribution[&0].count, 2);
        assert_eq!(report.distribution[&0].percentage, 100.0);
    }

    #[test]
    fn test_rounded_difference_histogram() {
        let mut acc = ErrorAccumulator::new();
        acc.record(7, 5.6);
        acc.record(7, 7.2);
        acc.record(3, 5.5);
        acc.record(5, 5.0);
        let report = acc.finish().unwrap();

        assert_eq!(report.distribution[&1].count, 1);
        assert_eq!(report.distribution[&0].count, 2);
        assert_eq!(report.distribution[&3].count, 1);
        assert_eq!(report.distribution[&0].percentage, 50.0);

        let expected = ((1.4f64.powi(2) + 0.2f64.powi(2) + 2.5f64.powi(2)) / 4.0).sqrt();
        assert!((report.rmse - expected).abs() < 1e-12);
    }

    #[test]
    fn test_cold_start_penalty() {
        let mut acc = ErrorAccumulator::new();
        acc.record(5, 5.0);
        acc.record_cold_start();
        let report = acc.finish().unwrap();

        assert_eq!(report.cold_start, 1);
        assert_eq!(report.distribution[&COLD_START_PENALTY].count, 1);
        assert!((report.rmse - (10_000.0f64 / 2.0).sqrt()).abs() < 1e-9);
    }

    #[test]
    fn test_empty_evaluation_rejected() {
        assert!(ErrorAccumulator::new().finish().is_err());
    }

    #[test]
    fn test_cumulative_distribution() {
        let mut histogram = RankHistogram::new();
        for rank in [0, 0, 1, 3] {
            histogram.record(rank);
        }
        let distribution = histogram.cumulative_distribution(4);

        assert_eq!(distribution.positions, vec![0.0, 0.25, 0.5, 0.75, 1.0]);
        assert_eq!(distribution.cumulative, vec![0.5, 0.75, 0.75, 1.0, 1.0]);
    }
}
