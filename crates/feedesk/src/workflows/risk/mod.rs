//! Defaulter risk scoring: a descriptive pass recomputed from the current record store.

mod features;
mod forest;
mod report;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::info;

use crate::workflows::fees::RecordStore;

pub use forest::ForestParams;
pub use report::{
    HistogramBin, RiskReport, RiskScore, RiskSort, DEFAULT_HISTOGRAM_BINS, DEFAULT_TOP,
    HIGH_RISK_THRESHOLD,
};

use forest::RandomForest;

/// Raised when the sheet cannot feed the model; other dashboard panels keep working.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelPrerequisiteError {
    #[error("risk scoring needs the column(s): {}", columns.join(", "))]
    MissingColumns { columns: Vec<&'static str> },
    #[error("risk scoring needs at least one fee record")]
    NoRecords,
    #[error("risk model could not be trained: {reason}")]
    Training { reason: String },
}

/// Share of records held out from training.
pub const HOLDOUT_FRACTION: f64 = 0.2;

#[derive(Debug, Clone, Default)]
pub struct RiskScorer {
    params: ForestParams,
}

impl RiskScorer {
    pub fn new(params: ForestParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &ForestParams {
        &self.params
    }

    /// Train on a seeded 80/20 split of the whole store and score every record.
    pub fn score(&self, store: &RecordStore) -> Result<RiskReport, ModelPrerequisiteError> {
        let set = features::training_set(store)?;
        let total = set.rows.len();

        let mut order = (0..total).collect::<Vec<_>>();
        order.shuffle(&mut StdRng::seed_from_u64(self.params.seed));
        let holdout_len = (total as f64 * HOLDOUT_FRACTION).ceil() as usize;
        let (holdout, mut training) = order.split_at(holdout_len.min(total));
        if training.is_empty() {
            training = holdout;
        }
        let holdout = if training.len() == total { &[][..] } else { holdout };

        let training_rows = training
            .iter()
            .map(|&i| set.rows[i].clone())
            .collect::<Vec<_>>();
        let training_labels = training.iter().map(|&i| set.labels[i]).collect::<Vec<_>>();
        let model = RandomForest::fit(&training_rows, &training_labels, &self.params)?;
        let probabilities = model.predict_proba(&set.rows)?;

        let holdout_accuracy = (!holdout.is_empty()).then(|| {
            let correct = holdout
                .iter()
                .filter(|&&i| (probabilities[i] > HIGH_RISK_THRESHOLD) == set.labels[i])
                .count();
            correct as f64 / holdout.len() as f64
        });

        let scores = store
            .records()
            .iter()
            .zip(&probabilities)
            .map(|(record, &score)| RiskScore {
                record_id: record.id.clone(),
                name: record.name.clone(),
                class: record.class.clone(),
                dues: record.dues,
                past_delay_count: record.past_delay_count,
                city: record.city.clone(),
                score,
                high_risk: score > HIGH_RISK_THRESHOLD,
            })
            .collect::<Vec<_>>();

        let report = RiskReport {
            scores,
            features: set.feature_names,
            training_records: training.len(),
            holdout_records: holdout.len(),
            holdout_accuracy,
            recorded_labels: set.recorded_labels,
        };

        info!(
            records = total,
            training = report.training_records,
            high_risk = report.high_risk_count(),
            "risk scores computed"
        );
        Ok(report)
    }
}
