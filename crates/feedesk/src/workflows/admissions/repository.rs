use std::sync::{Mutex, MutexGuard};

use super::domain::{AdmissionId, AdmissionRequest, AdmissionStatus};

/// Storage abstraction so the service can be exercised in isolation.
pub trait AdmissionRepository: Send + Sync {
    fn insert(&self, request: AdmissionRequest) -> Result<AdmissionRequest, RepositoryError>;
    fn fetch(&self, id: &AdmissionId) -> Result<Option<AdmissionRequest>, RepositoryError>;
    /// Every request in submission order.
    fn list(&self) -> Result<Vec<AdmissionRequest>, RepositoryError>;
    /// Requests still awaiting a decision, in submission order.
    fn pending(&self) -> Result<Vec<AdmissionRequest>, RepositoryError>;
    fn roster(&self) -> Result<Vec<AdmissionRequest>, RepositoryError>;
    /// Replaces the stored request only while its status still equals `expected`.
    fn transition(
        &self,
        id: &AdmissionId,
        expected: AdmissionStatus,
        updated: AdmissionRequest,
    ) -> Result<AdmissionRequest, RepositoryError>;
    fn append_roster(&self, request: AdmissionRequest) -> Result<(), RepositoryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("request is already {found}")]
    StaleStatus { found: &'static str },
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Session-scoped store backing the admissions desk.
#[derive(Debug, Default)]
pub struct MemoryAdmissionRepository {
    requests: Mutex<Vec<AdmissionRequest>>,
    roster: Mutex<Vec<AdmissionRequest>>,
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, RepositoryError> {
    mutex
        .lock()
        .map_err(|_| RepositoryError::Unavailable("admission store lock poisoned".to_string()))
}

impl AdmissionRepository for MemoryAdmissionRepository {
    fn insert(&self, request: AdmissionRequest) -> Result<AdmissionRequest, RepositoryError> {
        let mut guard = lock(&self.requests)?;
        if guard.iter().any(|stored| stored.id == request.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.push(request.clone());
        Ok(request)
    }

    fn fetch(&self, id: &AdmissionId) -> Result<Option<AdmissionRequest>, RepositoryError> {
        let guard = lock(&self.requests)?;
        Ok(guard.iter().find(|stored| &stored.id == id).cloned())
    }

    fn list(&self) -> Result<Vec<AdmissionRequest>, RepositoryError> {
        Ok(lock(&self.requests)?.clone())
    }

    fn pending(&self) -> Result<Vec<AdmissionRequest>, RepositoryError> {
        let guard = lock(&self.requests)?;
        Ok(guard
            .iter()
            .filter(|stored| stored.status == AdmissionStatus::Pending)
            .cloned()
            .collect())
    }

    fn roster(&self) -> Result<Vec<AdmissionRequest>, RepositoryError> {
        Ok(lock(&self.roster)?.clone())
    }

    fn transition(
        &self,
        id: &AdmissionId,
        expected: AdmissionStatus,
        updated: AdmissionRequest,
    ) -> Result<AdmissionRequest, RepositoryError> {
        let mut guard = lock(&self.requests)?;
        let slot = guard
            .iter_mut()
            .find(|stored| &stored.id == id)
            .ok_or(RepositoryError::NotFound)?;
        if slot.status != expected {
            return Err(RepositoryError::StaleStatus {
                found: slot.status.label(),
            });
        }
        *slot = updated.clone();
        Ok(updated)
    }

    fn append_roster(&self, request: AdmissionRequest) -> Result<(), RepositoryError> {
        let mut guard = lock(&self.roster)?;
        if guard.iter().any(|stored| stored.id == request.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.push(request);
        Ok(())
    }
}
