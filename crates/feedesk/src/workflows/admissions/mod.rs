//! New-admission intake with a single-step approval desk and an approved roster.

pub mod domain;
pub mod repository;
pub mod router;
pub mod service;
mod validation;

#[cfg(test)]
mod tests;

pub use domain::{
    AdmissionAction, AdmissionDecision, AdmissionId, AdmissionRequest, AdmissionStatus,
    AdmissionSubmission, AdmissionView,
};
pub use repository::{AdmissionRepository, MemoryAdmissionRepository, RepositoryError};
pub use router::admission_router;
pub use service::{AdmissionService, AdmissionServiceError};
pub use validation::{validate_submission, AdmissionValidationError};
