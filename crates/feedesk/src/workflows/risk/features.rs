use std::collections::BTreeSet;

use rust_decimal::prelude::ToPrimitive;

use crate::workflows::fees::{ColumnRole, FeeRecord, RecordStore};

use super::ModelPrerequisiteError;

pub(crate) const PAST_DELAY_FEATURE: &str = "Past Delay Count";
pub(crate) const CLASS_FEATURE: &str = "Class";
pub(crate) const DUES_FEATURE: &str = "Total Payment Dues";
pub(crate) const CITY_FEATURE: &str = "City";

/// Maps each distinct category to its index in sorted order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct LabelEncoder {
    classes: Vec<String>,
}

impl LabelEncoder {
    pub(crate) fn fit<'a, I>(values: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let classes = values
            .into_iter()
            .map(str::to_string)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        Self { classes }
    }

    pub(crate) fn encode(&self, value: &str) -> f64 {
        self.classes
            .binary_search_by(|class| class.as_str().cmp(value))
            .map(|index| index as f64)
            .unwrap_or(-1.0)
    }
}

/// Feature rows and labels for every record of the store, in store order.
#[derive(Debug, Clone)]
pub(crate) struct TrainingSet {
    pub(crate) feature_names: Vec<&'static str>,
    pub(crate) rows: Vec<Vec<f64>>,
    pub(crate) labels: Vec<bool>,
    pub(crate) recorded_labels: usize,
}

pub(crate) fn training_set(store: &RecordStore) -> Result<TrainingSet, ModelPrerequisiteError> {
    let mut missing = Vec::new();
    if !store.has_column(ColumnRole::PastDelayCount) {
        missing.push(PAST_DELAY_FEATURE);
    }
    if !store.has_column(ColumnRole::Class) {
        missing.push(CLASS_FEATURE);
    }
    if !missing.is_empty() {
        return Err(ModelPrerequisiteError::MissingColumns { columns: missing });
    }
    if store.is_empty() {
        return Err(ModelPrerequisiteError::NoRecords);
    }

    let records = store.records();
    let class_encoder = LabelEncoder::fit(records.iter().map(FeeRecord::class_label));
    let city_encoder = store
        .has_location_column()
        .then(|| LabelEncoder::fit(records.iter().map(city_label)));

    let mut feature_names = vec![PAST_DELAY_FEATURE, CLASS_FEATURE, DUES_FEATURE];
    if city_encoder.is_some() {
        feature_names.push(CITY_FEATURE);
    }

    let rows = records
        .iter()
        .map(|record| {
            let mut row = vec![
                f64::from(record.past_delay_count.unwrap_or(0)),
                class_encoder.encode(record.class_label()),
                record.dues.to_f64().unwrap_or(0.0),
            ];
            if let Some(encoder) = &city_encoder {
                row.push(encoder.encode(city_label(record)));
            }
            row
        })
        .collect();

    let labels = records.iter().map(label_for).collect();
    let recorded_labels = records
        .iter()
        .filter(|record| record.defaulter.is_some())
        .count();

    Ok(TrainingSet {
        feature_names,
        rows,
        labels,
        recorded_labels,
    })
}

fn city_label(record: &FeeRecord) -> &str {
    record.city.as_deref().unwrap_or("")
}

/// The recorded defaulter flag wins; otherwise a record that was late before and still owes is
/// treated as a defaulter.
pub(crate) fn label_for(record: &FeeRecord) -> bool {
    record
        .defaulter
        .unwrap_or_else(|| record.past_delay_count.unwrap_or(0) > 0 && record.is_due())
}
