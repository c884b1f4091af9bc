//! Per-horizon model selection by cross-validated RMSE

use crate::error::{ForecastError, Result};
use crate::evaluation::{evaluate, AggregateMetrics, Evaluation, EvaluationParams};
use crate::features::TrainingSet;
use crate::models::{ModelSpec, Regressor};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// One candidate's ranking entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub model_name: String,
    pub metrics: AggregateMetrics,
}

/// Winner of one horizon plus the ranking of every candidate
#[derive(Debug, Clone)]
pub struct HorizonSelection {
    pub horizon: usize,
    pub winner: Evaluation,
    /// Sorted by mean RMSE, best first
    pub leaderboard: Vec<LeaderboardEntry>,
}

/// Evaluate every candidate on `set` and keep the one with the lowest mean
/// RMSE. Ties go to the candidate listed first.
pub fn select_best(
    set: &TrainingSet,
    params: &EvaluationParams,
    candidates: &[ModelSpec],
) -> Result<HorizonSelection> {
    if candidates.is_empty() {
        return Err(ForecastError::InvalidParameter(
            "At least one candidate model is required".to_string(),
        ));
    }

    let mut evaluations = Vec::with_capacity(candidates.len());
    for spec in candidates {
        let evaluation = evaluate(set, params, || spec.clone())?;
        debug!(
            horizon = set.horizon,
            model = spec.name(),
            rmse = evaluation.metrics.rmse,
            "scored candidate"
        );
        evaluations.push(evaluation);
    }

    let mut leaderboard: Vec<LeaderboardEntry> = evaluations
        .iter()
        .map(|e| LeaderboardEntry {
            model_name: e.model_name.clone(),
            metrics: e.metrics.clone(),
        })
        .collect();
    // Stable sort keeps listing order among equal scores
    leaderboard.sort_by(|a, b| a.metrics.rmse.total_cmp(&b.metrics.rmse));

    let mut best = 0;
    for (i, e) in evaluations.iter().enumerate().skip(1) {
        if e.metrics.rmse < evaluations[best].metrics.rmse {
            best = i;
        }
    }
    let winner = evaluations.swap_remove(best);

    Ok(HorizonSelection {
        horizon: set.horizon,
        winner,
        leaderboard,
    })
}
