//! Top-K ranking test.
//!
//! Each case pits a user's top rated held-out item against a set of random
//! items. The model scores all of them, and the zero-based position of the
//! true item in the descending order is its rank. The result is the
//! cumulative share of cases at or above each normalized rank.

use crate::algorithms::Scorable;
use crate::error::Result;
use crate::models::TopKCase;
use crate::utils::metrics::{RankDistribution, RankHistogram};
use crate::utils::validation;
use tracing::{debug, info};

const PROGRESS_INTERVAL: usize = 200;

/// Zero-based rank of the true item among its distractors. Ties are
/// resolved against the true item.
pub fn rank_case<M: Scorable + ?Sized>(model: &M, case: &TopKCase) -> Result<usize> {
    let mut scored: Vec<(f64, bool)> = Vec::with_capacity(case.distractors.len() + 1);
    for distractor in &case.distractors {
        scored.push((model.predict(&case.user, distractor)?, false));
    }
    scored.push((model.predict(&case.user, &case.top_item)?, true));

    scored.sort_by(|a, b| b.0.total_cmp(&a.0));
    Ok(scored
        .iter()
        .position(|(_, is_top)| *is_top)
        .unwrap_or(case.distractors.len()))
}

pub fn top_k_test<M: Scorable + ?Sized>(
    model: &M,
    cases: &[TopKCase],
    distractor_total: usize,
) -> Result<RankDistribution> {
    validation::validate_top_k_cases(cases, distractor_total)?;

    let mut histogram = RankHistogram::new();
    for (done, case) in cases.iter().enumerate() {
        histogram.record(rank_case(model, case)?);
        if (done + 1) % PROGRESS_INTERVAL == 0 {
            debug!("Ranked {}/{} top-K cases", done + 1, cases.len());
        }
    }

    info!(
        "Top-K test over {} cases, {} at rank 0",
        histogram.total(),
        histogram.count(0)
    );
    Ok(histogram.cumulative_distribution(distractor_total))
}
