use crate::infra::{dispatcher, mail_transport, preview_dispatcher, AppState, CredentialsInput, DeskState, FilterQuery};
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch, post};
use axum::{Extension, Json, Router};
use feedesk::error::AppError;
use feedesk::session::{FeeSession, SessionError, StudentProfile};
use feedesk::workflows::admissions::{admission_router, AdmissionRepository, AdmissionService};
use feedesk::workflows::documents::{
    export_records_csv, export_records_pdf, export_records_xlsx, ExportError,
};
use feedesk::workflows::fees::{
    FeeFilter, FeeRecord, FeeSummary, FilterOptions, NewRecord, RecordEdit, RecordId,
};
use feedesk::workflows::notifications::{
    receipt_mail, DispatchReport, DispatchSettings, MailTransport, MessagePreview,
    NotificationOutcome,
};
use feedesk::workflows::risk::{
    HistogramBin, RiskScore, RiskScorer, RiskSort, DEFAULT_HISTOGRAM_BINS, DEFAULT_TOP,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::info;

const RECORDS_CSV_NAME: &str = "student_data.csv";
const RECORDS_XLSX_NAME: &str = "student_data.xlsx";
const RECORDS_PDF_NAME: &str = "student_data.pdf";
const LOG_CSV_NAME: &str = "email_log.csv";

#[derive(Debug, Deserialize)]
pub(crate) struct ImportQuery {
    pub(crate) file_name: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct ImportResponse {
    pub(crate) file_name: String,
    pub(crate) records: usize,
    pub(crate) due_records: usize,
    pub(crate) columns: Vec<String>,
    pub(crate) options: FilterOptions,
}

#[derive(Debug, Serialize)]
pub(crate) struct RecordsResponse {
    pub(crate) records: Vec<FeeRecord>,
    pub(crate) options: FilterOptions,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RiskRequest {
    #[serde(default)]
    pub(crate) min_score: Option<f64>,
    #[serde(default)]
    pub(crate) max_score: Option<f64>,
    #[serde(default)]
    pub(crate) sort: RiskSort,
    #[serde(default)]
    pub(crate) top: Option<usize>,
    #[serde(default)]
    pub(crate) bins: Option<usize>,
}

#[derive(Debug, Serialize)]
pub(crate) struct RiskResponse {
    pub(crate) features: Vec<&'static str>,
    pub(crate) training_records: usize,
    pub(crate) holdout_records: usize,
    pub(crate) holdout_accuracy: Option<f64>,
    pub(crate) high_risk_count: usize,
    pub(crate) scores: Vec<RiskScore>,
    pub(crate) top: Vec<RiskScore>,
    pub(crate) histogram: Vec<HistogramBin>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct DispatchRequest {
    #[serde(default)]
    pub(crate) settings: DispatchSettings,
    #[serde(default)]
    pub(crate) filter: FeeFilter,
    #[serde(flatten)]
    pub(crate) credentials: CredentialsInput,
}

pub(crate) fn with_desk_routes<R>(
    desk: DeskState,
    admissions: Arc<AdmissionService<R>>,
) -> Router
where
    R: AdmissionRepository + 'static,
{
    Router::new()
        .route("/api/v1/records/import", post(import_endpoint))
        .route("/api/v1/records", get(records_endpoint).post(append_endpoint))
        .route(
            "/api/v1/records/:id",
            patch(edit_endpoint).delete(remove_endpoint),
        )
        .route("/api/v1/records/:id/profile", get(profile_endpoint))
        .route("/api/v1/records/:id/receipt", get(receipt_endpoint))
        .route(
            "/api/v1/records/:id/receipt/email",
            post(receipt_email_endpoint),
        )
        .route("/api/v1/summary", get(summary_endpoint))
        .route("/api/v1/risk", post(risk_endpoint))
        .route("/api/v1/notifications/preview", post(preview_endpoint))
        .route("/api/v1/notifications/dispatch", post(dispatch_endpoint))
        .route("/api/v1/notifications/log", get(log_endpoint))
        .route("/api/v1/notifications/log.csv", get(log_csv_endpoint))
        .route("/api/v1/exports/records.csv", get(export_csv_endpoint))
        .route("/api/v1/exports/records.xlsx", get(export_xlsx_endpoint))
        .route("/api/v1/exports/records.pdf", get(export_pdf_endpoint))
        .with_state(desk)
        .merge(admission_router(admissions))
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

/// Runs CPU-heavy or blocking work (QR rendering, model fitting, SMTP and SMS calls) off the
/// async workers.
async fn blocking<T, F>(task: F) -> Result<T, AppError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, AppError> + Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|err| AppError::Io(std::io::Error::other(err)))?
}

fn attachment(file_name: &str, bytes: Vec<u8>) -> Response {
    let content_type = mime_guess::from_path(file_name)
        .first_or_octet_stream()
        .to_string();
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, content_type),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{file_name}\""),
            ),
        ],
        bytes,
    )
        .into_response()
}

fn unknown_record(id: &RecordId) -> AppError {
    AppError::from(SessionError::UnknownRecord { id: id.to_string() })
}

pub(crate) async fn import_endpoint(
    State(desk): State<DeskState>,
    Query(query): Query<ImportQuery>,
    body: Bytes,
) -> Result<Json<ImportResponse>, AppError> {
    let state = desk.clone();
    blocking(move || {
        let session = FeeSession::load_bytes(
            &query.file_name,
            body.to_vec(),
            &state.linker,
            state.config.school.name.clone(),
        )?;
        let store = session.store();
        let response = ImportResponse {
            file_name: query.file_name,
            records: store.len(),
            due_records: store.records().iter().filter(|record| record.is_due()).count(),
            columns: store
                .layout()
                .columns()
                .iter()
                .map(|column| column.header.clone())
                .collect(),
            options: session.filter_options(),
        };
        state.replace(session);
        Ok(Json(response))
    })
    .await
}

pub(crate) async fn records_endpoint(
    State(desk): State<DeskState>,
    Query(query): Query<FilterQuery>,
) -> Result<Json<RecordsResponse>, AppError> {
    let filter = query.into_filter();
    desk.with_session(|session| {
        Ok(Json(RecordsResponse {
            records: session.filter(&filter).into_iter().cloned().collect(),
            options: session.filter_options(),
        }))
    })
}

pub(crate) async fn append_endpoint(
    State(desk): State<DeskState>,
    Json(record): Json<NewRecord>,
) -> Result<(StatusCode, Json<FeeRecord>), AppError> {
    desk.with_session(|session| {
        let id = session.append(record)?;
        let stored = session.store().get(&id).cloned().ok_or_else(|| unknown_record(&id))?;
        Ok((StatusCode::CREATED, Json(stored)))
    })
}

pub(crate) async fn edit_endpoint(
    State(desk): State<DeskState>,
    Path(id): Path<String>,
    Json(edit): Json<RecordEdit>,
) -> Result<Json<FeeRecord>, AppError> {
    let id = RecordId(id);
    desk.with_session(|session| Ok(Json(session.edit(&id, edit)?.clone())))
}

pub(crate) async fn remove_endpoint(
    State(desk): State<DeskState>,
    Path(id): Path<String>,
) -> Result<Json<FeeRecord>, AppError> {
    let id = RecordId(id);
    desk.with_session(|session| Ok(Json(session.remove(&id)?)))
}

pub(crate) async fn profile_endpoint(
    State(desk): State<DeskState>,
    Path(id): Path<String>,
) -> Result<Json<StudentProfile>, AppError> {
    let id = RecordId(id);
    desk.with_session(|session| {
        session
            .profile(&id)
            .map(Json)
            .ok_or_else(|| unknown_record(&id))
    })
}

pub(crate) async fn receipt_endpoint(
    State(desk): State<DeskState>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let id = RecordId(id);
    let receipt = desk.with_session(|session| Ok(session.receipt(&id)?))?;
    let bytes = receipt.render_pdf()?;
    Ok(attachment(&receipt.file_name(), bytes))
}

pub(crate) async fn receipt_email_endpoint(
    State(desk): State<DeskState>,
    Path(id): Path<String>,
    body: Option<Json<CredentialsInput>>,
) -> Result<Json<serde_json::Value>, AppError> {
    let id = RecordId(id);
    let credentials = body.map(|Json(input)| input).unwrap_or_default();
    let state = desk.clone();
    blocking(move || {
        let (mail, school_name) = state.with_session(|session| {
            let record = session
                .store()
                .get(&id)
                .cloned()
                .ok_or_else(|| unknown_record(&id))?;
            let pdf = session.receipt(&id)?.render_pdf()?;
            Ok((
                receipt_mail(&record, pdf, session.school_name()),
                session.school_name().to_string(),
            ))
        })?;
        let transport = mail_transport(&state.config, credentials.resolve(&state.config))?;
        transport.send(&mail)?;
        info!(record = %id, to = %mail.to, school = %school_name, "receipt e-mailed");
        Ok(Json(json!({ "sent_to": mail.to })))
    })
    .await
}

pub(crate) async fn summary_endpoint(
    State(desk): State<DeskState>,
    Query(query): Query<FilterQuery>,
) -> Result<Json<FeeSummary>, AppError> {
    let filter = query.into_filter();
    desk.with_session(|session| Ok(Json(session.summary(&filter))))
}

pub(crate) async fn risk_endpoint(
    State(desk): State<DeskState>,
    body: Option<Json<RiskRequest>>,
) -> Result<Json<RiskResponse>, AppError> {
    let request = body.map(|Json(request)| request).unwrap_or_default();
    let state = desk.clone();
    blocking(move || {
        let report = state.with_session(|session| Ok(session.score_risk(&RiskScorer::default())?))?;
        let view = report
            .within(
                request.min_score.unwrap_or(0.0),
                request.max_score.unwrap_or(1.0),
            )
            .sorted_by(request.sort);
        let top = view
            .top(request.top.unwrap_or(DEFAULT_TOP))
            .into_iter()
            .cloned()
            .collect();
        let histogram = view.histogram(request.bins.unwrap_or(DEFAULT_HISTOGRAM_BINS));
        Ok(Json(RiskResponse {
            features: view.features.clone(),
            training_records: view.training_records,
            holdout_records: view.holdout_records,
            holdout_accuracy: view.holdout_accuracy,
            high_risk_count: view.high_risk_count(),
            top,
            histogram,
            scores: view.scores,
        }))
    })
    .await
}

pub(crate) async fn preview_endpoint(
    State(desk): State<DeskState>,
    body: Option<Json<DispatchRequest>>,
) -> Result<Json<Option<MessagePreview>>, AppError> {
    let request = body.map(|Json(request)| request).unwrap_or_default();
    let dispatcher = preview_dispatcher(&desk.config, request.settings);
    desk.with_session(|session| Ok(Json(session.preview(&dispatcher, &request.filter))))
}

pub(crate) async fn dispatch_endpoint(
    State(desk): State<DeskState>,
    Json(request): Json<DispatchRequest>,
) -> Result<Json<DispatchReport>, AppError> {
    let state = desk.clone();
    blocking(move || {
        let DispatchRequest {
            settings,
            filter,
            credentials,
        } = request;
        // Refuse early so a missing session does not cost an SMTP handshake.
        state.with_session(|_| Ok(()))?;
        let dispatcher = dispatcher(
            &state.config,
            settings,
            credentials.resolve(&state.config),
        )?;
        state.with_session(|session| Ok(Json(session.dispatch(&dispatcher, &filter)?)))
    })
    .await
}

pub(crate) async fn log_endpoint(
    State(desk): State<DeskState>,
) -> Result<Json<Vec<NotificationOutcome>>, AppError> {
    desk.with_session(|session| Ok(Json(session.log().entries().to_vec())))
}

pub(crate) async fn log_csv_endpoint(State(desk): State<DeskState>) -> Result<Response, AppError> {
    let bytes = desk.with_session(|session| {
        session
            .log()
            .to_csv()
            .map_err(|err| AppError::from(ExportError::from(err)))
    })?;
    Ok(attachment(LOG_CSV_NAME, bytes))
}

pub(crate) async fn export_csv_endpoint(
    State(desk): State<DeskState>,
    Query(query): Query<FilterQuery>,
) -> Result<Response, AppError> {
    let filter = query.into_filter();
    let bytes = desk.with_session(|session| {
        Ok(export_records_csv(
            session.store().layout(),
            &session.filter(&filter),
        )?)
    })?;
    Ok(attachment(RECORDS_CSV_NAME, bytes))
}

pub(crate) async fn export_xlsx_endpoint(
    State(desk): State<DeskState>,
    Query(query): Query<FilterQuery>,
) -> Result<Response, AppError> {
    let filter = query.into_filter();
    let bytes = desk.with_session(|session| {
        Ok(export_records_xlsx(
            session.store().layout(),
            &session.filter(&filter),
        )?)
    })?;
    Ok(attachment(RECORDS_XLSX_NAME, bytes))
}

pub(crate) async fn export_pdf_endpoint(
    State(desk): State<DeskState>,
    Query(query): Query<FilterQuery>,
) -> Result<Response, AppError> {
    let filter = query.into_filter();
    let bytes = desk.with_session(|session| {
        Ok(export_records_pdf(
            session.store().layout(),
            &session.filter(&filter),
        )?)
    })?;
    Ok(attachment(RECORDS_PDF_NAME, bytes))
}
