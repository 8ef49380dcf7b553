use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{Local, NaiveDateTime};
use tracing::info;

use super::domain::{
    AdmissionAction, AdmissionDecision, AdmissionId, AdmissionRequest, AdmissionStatus,
    AdmissionSubmission,
};
use super::repository::{AdmissionRepository, RepositoryError};
use super::validation::{validate_submission, AdmissionValidationError};

/// Intake and approval desk for new admissions.
pub struct AdmissionService<R> {
    repository: Arc<R>,
    sequence: AtomicU64,
    clock: fn() -> NaiveDateTime,
}

fn local_now() -> NaiveDateTime {
    Local::now().naive_local()
}

impl<R> AdmissionService<R>
where
    R: AdmissionRepository + 'static,
{
    pub fn new(repository: Arc<R>) -> Self {
        Self {
            repository,
            sequence: AtomicU64::new(1),
            clock: local_now,
        }
    }

    pub fn with_clock(mut self, clock: fn() -> NaiveDateTime) -> Self {
        self.clock = clock;
        self
    }

    fn next_id(&self) -> AdmissionId {
        let id = self.sequence.fetch_add(1, Ordering::Relaxed);
        AdmissionId(format!("adm-{id:06}"))
    }

    /// Validates and queues a submission. Invalid submissions are never stored.
    pub fn submit(
        &self,
        submission: AdmissionSubmission,
    ) -> Result<AdmissionRequest, AdmissionServiceError> {
        let fields = validate_submission(submission)?;
        let request = AdmissionRequest {
            id: self.next_id(),
            submitted_at: (self.clock)(),
            fields,
            status: AdmissionStatus::Pending,
            admin_comment: String::new(),
        };

        let stored = self.repository.insert(request)?;
        info!(
            admission = %stored.id.0,
            class = %stored.fields.class,
            "admission submitted for approval"
        );
        Ok(stored)
    }

    pub fn pending_queue(&self) -> Result<Vec<AdmissionRequest>, AdmissionServiceError> {
        Ok(self.repository.pending()?)
    }

    /// Decides the request at `position` (zero-based) of the current pending queue.
    pub fn decide(
        &self,
        position: usize,
        decision: AdmissionDecision,
    ) -> Result<AdmissionRequest, AdmissionServiceError> {
        let pending = self.repository.pending()?;
        let current = pending
            .into_iter()
            .nth(position)
            .ok_or(AdmissionServiceError::UnknownPosition { position })?;

        let mut updated = current.clone();
        updated.status = decision.action.resulting_status();
        updated.admin_comment = decision.comment.unwrap_or_default().trim().to_string();

        let decided =
            self.repository
                .transition(&current.id, AdmissionStatus::Pending, updated)?;
        if decision.action == AdmissionAction::Approve {
            self.repository.append_roster(decided.clone())?;
        }

        info!(
            admission = %decided.id.0,
            status = decided.status.label(),
            "admission decided"
        );
        Ok(decided)
    }

    pub fn list(&self) -> Result<Vec<AdmissionRequest>, AdmissionServiceError> {
        Ok(self.repository.list()?)
    }

    /// Approved requests, in approval order.
    pub fn roster(&self) -> Result<Vec<AdmissionRequest>, AdmissionServiceError> {
        Ok(self.repository.roster()?)
    }

    pub fn get(&self, id: &AdmissionId) -> Result<AdmissionRequest, AdmissionServiceError> {
        let request = self
            .repository
            .fetch(id)?
            .ok_or(RepositoryError::NotFound)?;
        Ok(request)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AdmissionServiceError {
    #[error(transparent)]
    Validation(#[from] AdmissionValidationError),
    #[error("no pending admission at position {position}")]
    UnknownPosition { position: usize },
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
