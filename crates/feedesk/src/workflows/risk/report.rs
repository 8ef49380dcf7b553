use std::cmp::Ordering;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::workflows::fees::RecordId;

/// Scores above this are reported as high risk.
pub const HIGH_RISK_THRESHOLD: f64 = 0.5;
pub const DEFAULT_TOP: usize = 10;
pub const DEFAULT_HISTOGRAM_BINS: usize = 20;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskScore {
    pub record_id: RecordId,
    pub name: String,
    pub class: Option<String>,
    pub dues: Decimal,
    pub past_delay_count: Option<u32>,
    pub city: Option<String>,
    pub score: f64,
    pub high_risk: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskSort {
    #[default]
    RiskScore,
    Dues,
    PastDelayCount,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HistogramBin {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
}

/// One scoring pass over the record store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskReport {
    pub scores: Vec<RiskScore>,
    pub features: Vec<&'static str>,
    pub training_records: usize,
    pub holdout_records: usize,
    /// Share of hold-out records classified correctly; absent when nothing was held out.
    pub holdout_accuracy: Option<f64>,
    /// Records whose label came from the Defaulter column rather than the delay heuristic.
    pub recorded_labels: usize,
}

impl RiskReport {
    pub fn high_risk_count(&self) -> usize {
        self.scores.iter().filter(|score| score.high_risk).count()
    }

    /// Keep scores inside the closed interval `[min, max]`.
    pub fn within(&self, min: f64, max: f64) -> RiskReport {
        RiskReport {
            scores: self
                .scores
                .iter()
                .filter(|score| min <= score.score && score.score <= max)
                .cloned()
                .collect(),
            ..self.clone()
        }
    }

    /// Descending by the chosen key; ties keep store order.
    pub fn sorted_by(mut self, key: RiskSort) -> RiskReport {
        self.scores.sort_by(|a, b| match key {
            RiskSort::RiskScore => b.score.total_cmp(&a.score),
            RiskSort::Dues => b.dues.cmp(&a.dues),
            RiskSort::PastDelayCount => compare_delay(b.past_delay_count, a.past_delay_count),
        });
        self
    }

    /// Highest-scoring high-risk records.
    pub fn top(&self, limit: usize) -> Vec<&RiskScore> {
        let mut high = self
            .scores
            .iter()
            .filter(|score| score.high_risk)
            .collect::<Vec<_>>();
        high.sort_by(|a, b| b.score.total_cmp(&a.score));
        high.truncate(limit);
        high
    }

    /// Equal-width bins over `[0, 1]`; a score of exactly 1 lands in the last bin.
    pub fn histogram(&self, bins: usize) -> Vec<HistogramBin> {
        let bins = bins.max(1);
        let width = 1.0 / bins as f64;
        let mut counts = vec![0usize; bins];
        for score in &self.scores {
            let slot = ((score.score * bins as f64).floor().max(0.0) as usize).min(bins - 1);
            counts[slot] += 1;
        }
        counts
            .into_iter()
            .enumerate()
            .map(|(index, count)| HistogramBin {
                lower: index as f64 * width,
                upper: (index + 1) as f64 * width,
                count,
            })
            .collect()
    }
}

fn compare_delay(a: Option<u32>, b: Option<u32>) -> Ordering {
    a.unwrap_or(0).cmp(&b.unwrap_or(0))
}
