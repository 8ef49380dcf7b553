use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde_json::json;

use crate::workflows::documents::{export_roster_csv, export_roster_xlsx, XLSX_CONTENT_TYPE};

use super::domain::{AdmissionDecision, AdmissionRequest, AdmissionSubmission};
use super::repository::{AdmissionRepository, RepositoryError};
use super::service::{AdmissionService, AdmissionServiceError};

const ROSTER_CSV_NAME: &str = "new_admissions.csv";
const ROSTER_XLSX_NAME: &str = "new_admissions.xlsx";

/// Router builder exposing the admission intake and approval endpoints.
pub fn admission_router<R>(service: Arc<AdmissionService<R>>) -> Router
where
    R: AdmissionRepository + 'static,
{
    Router::new()
        .route(
            "/api/v1/admissions",
            post(submit_handler::<R>).get(list_handler::<R>),
        )
        .route("/api/v1/admissions/pending", get(pending_handler::<R>))
        .route(
            "/api/v1/admissions/pending/:position/decision",
            post(decision_handler::<R>),
        )
        .route("/api/v1/admissions/roster", get(roster_handler::<R>))
        .route("/api/v1/admissions/roster.csv", get(roster_csv_handler::<R>))
        .route(
            "/api/v1/admissions/roster.xlsx",
            get(roster_xlsx_handler::<R>),
        )
        .with_state(service)
}

pub(crate) async fn submit_handler<R>(
    State(service): State<Arc<AdmissionService<R>>>,
    axum::Json(submission): axum::Json<AdmissionSubmission>,
) -> Response
where
    R: AdmissionRepository + 'static,
{
    match service.submit(submission) {
        Ok(request) => (StatusCode::ACCEPTED, axum::Json(request.view())).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn list_handler<R>(State(service): State<Arc<AdmissionService<R>>>) -> Response
where
    R: AdmissionRepository + 'static,
{
    views(service.list())
}

pub(crate) async fn pending_handler<R>(
    State(service): State<Arc<AdmissionService<R>>>,
) -> Response
where
    R: AdmissionRepository + 'static,
{
    views(service.pending_queue())
}

pub(crate) async fn decision_handler<R>(
    State(service): State<Arc<AdmissionService<R>>>,
    Path(position): Path<usize>,
    axum::Json(decision): axum::Json<AdmissionDecision>,
) -> Response
where
    R: AdmissionRepository + 'static,
{
    match service.decide(position, decision) {
        Ok(request) => (StatusCode::OK, axum::Json(request.view())).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn roster_handler<R>(State(service): State<Arc<AdmissionService<R>>>) -> Response
where
    R: AdmissionRepository + 'static,
{
    views(service.roster())
}

pub(crate) async fn roster_csv_handler<R>(
    State(service): State<Arc<AdmissionService<R>>>,
) -> Response
where
    R: AdmissionRepository + 'static,
{
    let roster = match service.roster() {
        Ok(roster) => roster,
        Err(error) => return error_response(error),
    };
    match export_roster_csv(&roster) {
        Ok(bytes) => attachment(mime::TEXT_CSV.as_ref(), ROSTER_CSV_NAME, bytes),
        Err(error) => internal_error(error.to_string()),
    }
}

pub(crate) async fn roster_xlsx_handler<R>(
    State(service): State<Arc<AdmissionService<R>>>,
) -> Response
where
    R: AdmissionRepository + 'static,
{
    let roster = match service.roster() {
        Ok(roster) => roster,
        Err(error) => return error_response(error),
    };
    match export_roster_xlsx(&roster) {
        Ok(bytes) => attachment(XLSX_CONTENT_TYPE, ROSTER_XLSX_NAME, bytes),
        Err(error) => internal_error(error.to_string()),
    }
}

fn views(result: Result<Vec<AdmissionRequest>, AdmissionServiceError>) -> Response {
    match result {
        Ok(requests) => {
            let views: Vec<_> = requests.iter().map(AdmissionRequest::view).collect();
            (StatusCode::OK, axum::Json(views)).into_response()
        }
        Err(error) => error_response(error),
    }
}

fn attachment(content_type: &str, file_name: &str, bytes: Vec<u8>) -> Response {
    let disposition = format!("attachment; filename=\"{file_name}\"");
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response()
}

fn error_response(error: AdmissionServiceError) -> Response {
    let status = match &error {
        AdmissionServiceError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        AdmissionServiceError::UnknownPosition { .. }
        | AdmissionServiceError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
        AdmissionServiceError::Repository(
            RepositoryError::Conflict | RepositoryError::StaleStatus { .. },
        ) => StatusCode::CONFLICT,
        AdmissionServiceError::Repository(RepositoryError::Unavailable(_)) => {
            return internal_error(error.to_string())
        }
    };
    let payload = json!({
        "error": error.to_string(),
    });
    (status, axum::Json(payload)).into_response()
}

fn internal_error(message: String) -> Response {
    let payload = json!({
        "error": message,
    });
    (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
}
