use std::sync::Arc;

use axum::response::Response;
use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde_json::Value;

use crate::workflows::admissions::domain::{
    AdmissionId, AdmissionRequest, AdmissionStatus, AdmissionSubmission,
};
use crate::workflows::admissions::repository::{
    AdmissionRepository, MemoryAdmissionRepository, RepositoryError,
};
use crate::workflows::admissions::{admission_router, AdmissionService};

pub(super) fn fixed_clock() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 4, 1)
        .and_then(|date| date.and_hms_opt(10, 15, 0))
        .expect("valid timestamp")
}

pub(super) fn submission(student_name: &str) -> AdmissionSubmission {
    AdmissionSubmission {
        student_name: student_name.to_string(),
        father_name: "Ramesh Kumar".to_string(),
        mother_name: "Sunita Devi".to_string(),
        address: "12 Station Road, Darbhanga".to_string(),
        class: "3".to_string(),
        parent_mobile: "9876543210".to_string(),
        registration_fee: Decimal::new(1500, 0),
    }
}

pub(super) fn build_service() -> (
    AdmissionService<MemoryAdmissionRepository>,
    Arc<MemoryAdmissionRepository>,
) {
    let repository = Arc::new(MemoryAdmissionRepository::default());
    let service = AdmissionService::new(repository.clone()).with_clock(fixed_clock);
    (service, repository)
}

pub(super) struct UnavailableRepository;

impl AdmissionRepository for UnavailableRepository {
    fn insert(&self, _request: AdmissionRequest) -> Result<AdmissionRequest, RepositoryError> {
        Err(RepositoryError::Unavailable("store offline".to_string()))
    }

    fn fetch(&self, _id: &AdmissionId) -> Result<Option<AdmissionRequest>, RepositoryError> {
        Err(RepositoryError::Unavailable("store offline".to_string()))
    }

    fn list(&self) -> Result<Vec<AdmissionRequest>, RepositoryError> {
        Err(RepositoryError::Unavailable("store offline".to_string()))
    }

    fn pending(&self) -> Result<Vec<AdmissionRequest>, RepositoryError> {
        Err(RepositoryError::Unavailable("store offline".to_string()))
    }

    fn roster(&self) -> Result<Vec<AdmissionRequest>, RepositoryError> {
        Err(RepositoryError::Unavailable("store offline".to_string()))
    }

    fn transition(
        &self,
        _id: &AdmissionId,
        _expected: AdmissionStatus,
        _updated: AdmissionRequest,
    ) -> Result<AdmissionRequest, RepositoryError> {
        Err(RepositoryError::Unavailable("store offline".to_string()))
    }

    fn append_roster(&self, _request: AdmissionRequest) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("store offline".to_string()))
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

pub(super) fn admission_router_with_service(
    service: AdmissionService<MemoryAdmissionRepository>,
) -> axum::Router {
    admission_router(Arc::new(service))
}
