//! Score-trend summary emitted after a refinement run (spec §4.6:
//! "deltas between adjacent scores, trend, total delta... sliding
//! window of the last N scores").

use serde::{Deserialize, Serialize};

/// Default size of the trailing score window kept in [`GradientSummary::window`].
pub const DEFAULT_WINDOW_SIZE: usize = 5;

/// Minimum total delta magnitude to call the trend anything other than
/// `stable`.
const TREND_EPSILON: f32 = 0.01;

/// Direction the evaluation score moved across iterations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    /// Scores moved up by more than [`TREND_EPSILON`] overall.
    Improving,
    /// Scores stayed within [`TREND_EPSILON`] overall.
    Stable,
    /// Scores moved down by more than [`TREND_EPSILON`] overall.
    Declining,
}

/// A summary of how the evaluation score moved across refinement
/// iterations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradientSummary {
    /// Every overall score produced this run, in iteration order.
    pub scores: Vec<f32>,
    /// `scores[i+1] - scores[i]` for each adjacent pair.
    pub deltas: Vec<f32>,
    /// `scores.last() - scores.first()`, or 0.0 with fewer than two scores.
    pub total_delta: f32,
    /// improving / stable / declining.
    pub trend: Trend,
    /// The last `window_size` scores.
    pub window: Vec<f32>,
}

/// Build a [`GradientSummary`] from the sequence of overall scores
/// produced across a refinement run's iterations.
pub fn summarize(scores: &[f32], window_size: usize) -> GradientSummary {
    let deltas: Vec<f32> = scores.windows(2).map(|w| w[1] - w[0]).collect();
    let total_delta = match (scores.first(), scores.last()) {
        (Some(first), Some(last)) if scores.len() >= 2 => last - first,
        _ => 0.0,
    };
    let trend = if total_delta > TREND_EPSILON {
        Trend::Improving
    } else if total_delta < -TREND_EPSILON {
        Trend::Declining
    } else {
        Trend::Stable
    };
    let window_start = scores.len().saturating_sub(window_size);
    GradientSummary {
        scores: scores.to_vec(),
        deltas,
        total_delta,
        trend,
        window: scores[window_start..].to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rising_scores_are_improving() {
        let summary = summarize(&[0.5, 0.6, 0.7], DEFAULT_WINDOW_SIZE);
        assert_eq!(summary.trend, Trend::Improving);
        assert_eq!(summary.deltas, vec![0.1, 0.1_f32]);
        assert!((summary.total_delta - 0.2).abs() < 1e-6);
    }

    #[test]
    fn falling_scores_are_declining() {
        let summary = summarize(&[0.8, 0.6], DEFAULT_WINDOW_SIZE);
        assert_eq!(summary.trend, Trend::Declining);
    }

    #[test]
    fn near_flat_scores_are_stable() {
        let summary = summarize(&[0.7, 0.702], DEFAULT_WINDOW_SIZE);
        assert_eq!(summary.trend, Trend::Stable);
    }

    #[test]
    fn single_score_has_no_delta() {
        let summary = summarize(&[0.9], DEFAULT_WINDOW_SIZE);
        assert_eq!(summary.total_delta, 0.0);
        assert!(summary.deltas.is_empty());
        assert_eq!(summary.window, vec![0.9]);
    }

    #[test]
    fn window_keeps_only_the_trailing_n_scores() {
        let summary = summarize(&[0.1, 0.2, 0.3, 0.4, 0.5, 0.6], 3);
        assert_eq!(summary.window, vec![0.4, 0.5, 0.6]);
    }
}
