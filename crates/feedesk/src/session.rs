//! Operator session: the uploaded fee sheet plus the outcome log of the latest reminder run.
//!
//! Nothing here outlives the session; a new upload starts from a clean log.

use std::path::Path;

use serde::Serialize;

use crate::workflows::documents::{FeeReceipt, ReceiptError};
use crate::workflows::fees::{
    EditError, FeeFilter, FeeImporter, FeeRecord, FeeSummary, FilterOptions, IngestionError,
    NewRecord, PaymentLinker, RecordEdit, RecordId, RecordStore,
};
use crate::workflows::notifications::{
    DispatchError, DispatchReport, MessagePreview, NotificationDispatcher, NotificationLog,
    NotificationOutcome,
};
use crate::workflows::risk::{ModelPrerequisiteError, RiskReport, RiskScorer};

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("no fee sheet has been uploaded yet")]
    NotLoaded,
    #[error("no record with id {id}")]
    UnknownRecord { id: String },
    #[error(transparent)]
    Receipt(#[from] ReceiptError),
}

/// Drilldown for one student: the record and what the latest run did for it.
#[derive(Debug, Clone, Serialize)]
pub struct StudentProfile {
    pub record: FeeRecord,
    pub notifications: Vec<NotificationOutcome>,
}

#[derive(Debug)]
pub struct FeeSession {
    store: RecordStore,
    log: NotificationLog,
    school_name: String,
}

impl FeeSession {
    pub fn new(store: RecordStore, school_name: impl Into<String>) -> Self {
        Self {
            store,
            log: NotificationLog::default(),
            school_name: school_name.into(),
        }
    }

    pub fn load<P: AsRef<Path>>(
        path: P,
        linker: &PaymentLinker,
        school_name: impl Into<String>,
    ) -> Result<Self, IngestionError> {
        let store = FeeImporter::from_path(path, linker)?;
        Ok(Self::new(store, school_name))
    }

    pub fn load_bytes(
        file_name: &str,
        bytes: Vec<u8>,
        linker: &PaymentLinker,
        school_name: impl Into<String>,
    ) -> Result<Self, IngestionError> {
        let store = FeeImporter::from_bytes(file_name, bytes, linker)?;
        Ok(Self::new(store, school_name))
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    pub fn school_name(&self) -> &str {
        &self.school_name
    }

    pub fn log(&self) -> &NotificationLog {
        &self.log
    }

    /// Recomputed from the current records on every call.
    pub fn filter(&self, filter: &FeeFilter) -> Vec<&FeeRecord> {
        filter.apply(&self.store)
    }

    pub fn filter_options(&self) -> FilterOptions {
        FilterOptions::from_store(&self.store)
    }

    pub fn summary(&self, filter: &FeeFilter) -> FeeSummary {
        FeeSummary::from_records(self.filter(filter), self.store.layout())
    }

    /// Scores the whole sheet; the filter does not narrow the training population.
    pub fn score_risk(&self, scorer: &RiskScorer) -> Result<RiskReport, ModelPrerequisiteError> {
        scorer.score(&self.store)
    }

    pub fn preview(
        &self,
        dispatcher: &NotificationDispatcher,
        filter: &FeeFilter,
    ) -> Option<MessagePreview> {
        dispatcher.preview(self.filter(filter))
    }

    /// Runs reminders over the filtered working set and replaces the session log.
    pub fn dispatch(
        &mut self,
        dispatcher: &NotificationDispatcher,
        filter: &FeeFilter,
    ) -> Result<DispatchReport, DispatchError> {
        let report = dispatcher.dispatch(filter.apply(&self.store))?;
        self.log.replace(report.outcomes.clone());
        Ok(report)
    }

    pub fn profile(&self, id: &RecordId) -> Option<StudentProfile> {
        let record = self.store.get(id)?;
        Some(StudentProfile {
            record: record.clone(),
            notifications: self.log.for_record(id).cloned().collect(),
        })
    }

    pub fn receipt(&self, id: &RecordId) -> Result<FeeReceipt, SessionError> {
        let record = self.store.get(id).ok_or_else(|| SessionError::UnknownRecord {
            id: id.to_string(),
        })?;
        Ok(FeeReceipt::for_record(
            record,
            self.store.layout(),
            &self.school_name,
        )?)
    }

    pub fn edit(&mut self, id: &RecordId, edit: RecordEdit) -> Result<&FeeRecord, EditError> {
        self.store.edit(id, edit)
    }

    pub fn append(&mut self, record: NewRecord) -> Result<RecordId, EditError> {
        self.store.append(record)
    }

    pub fn remove(&mut self, id: &RecordId) -> Result<FeeRecord, EditError> {
        self.store.remove(id)
    }
}
