use crate::config::ConfigError;
use crate::session::SessionError;
use crate::telemetry::TelemetryError;
use crate::workflows::admissions::AdmissionServiceError;
use crate::workflows::documents::{ExportError, ReceiptError};
use crate::workflows::fees::{EditError, IngestionError};
use crate::workflows::notifications::{DispatchError, TransportError};
use crate::workflows::risk::ModelPrerequisiteError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Server(axum::Error),
    Ingestion(IngestionError),
    Edit(EditError),
    Session(SessionError),
    Risk(ModelPrerequisiteError),
    Dispatch(DispatchError),
    Transport(TransportError),
    Receipt(ReceiptError),
    Export(ExportError),
    Admission(AdmissionServiceError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Server(err) => write!(f, "server error: {}", err),
            AppError::Ingestion(err) => write!(f, "upload rejected: {}", err),
            AppError::Edit(err) => write!(f, "edit rejected: {}", err),
            AppError::Session(err) => write!(f, "{}", err),
            AppError::Risk(err) => write!(f, "risk panel unavailable: {}", err),
            AppError::Dispatch(err) => write!(f, "dispatch not started: {}", err),
            AppError::Transport(err) => write!(f, "delivery failed: {}", err),
            AppError::Receipt(err) => write!(f, "receipt error: {}", err),
            AppError::Export(err) => write!(f, "export error: {}", err),
            AppError::Admission(err) => write!(f, "admission error: {}", err),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Server(err) => Some(err),
            AppError::Ingestion(err) => Some(err),
            AppError::Edit(err) => Some(err),
            AppError::Session(err) => Some(err),
            AppError::Risk(err) => Some(err),
            AppError::Dispatch(err) => Some(err),
            AppError::Transport(err) => Some(err),
            AppError::Receipt(err) => Some(err),
            AppError::Export(err) => Some(err),
            AppError::Admission(err) => Some(err),
        }
    }
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Ingestion(IngestionError::Io(_))
            | AppError::Risk(ModelPrerequisiteError::Training { .. }) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::Ingestion(_) | AppError::Dispatch(_) => StatusCode::BAD_REQUEST,
            AppError::Edit(EditError::UnknownRecord { .. })
            | AppError::Session(SessionError::UnknownRecord { .. })
            | AppError::Admission(AdmissionServiceError::UnknownPosition { .. }) => {
                StatusCode::NOT_FOUND
            }
            AppError::Session(SessionError::NotLoaded) => StatusCode::CONFLICT,
            AppError::Edit(_)
            | AppError::Risk(_)
            | AppError::Admission(AdmissionServiceError::Validation(_))
            | AppError::Receipt(
                ReceiptError::MissingEmail { .. } | ReceiptError::MissingPaymentLink { .. },
            )
            | AppError::Session(SessionError::Receipt(
                ReceiptError::MissingEmail { .. } | ReceiptError::MissingPaymentLink { .. },
            )) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Transport(_) => StatusCode::BAD_GATEWAY,
            AppError::Config(_)
            | AppError::Telemetry(_)
            | AppError::Io(_)
            | AppError::Server(_)
            | AppError::Session(SessionError::Receipt(ReceiptError::Render(_)))
            | AppError::Receipt(ReceiptError::Render(_))
            | AppError::Export(_)
            | AppError::Admission(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<axum::Error> for AppError {
    fn from(value: axum::Error) -> Self {
        Self::Server(value)
    }
}

impl From<IngestionError> for AppError {
    fn from(value: IngestionError) -> Self {
        Self::Ingestion(value)
    }
}

impl From<EditError> for AppError {
    fn from(value: EditError) -> Self {
        Self::Edit(value)
    }
}

impl From<SessionError> for AppError {
    fn from(value: SessionError) -> Self {
        Self::Session(value)
    }
}

impl From<ModelPrerequisiteError> for AppError {
    fn from(value: ModelPrerequisiteError) -> Self {
        Self::Risk(value)
    }
}

impl From<DispatchError> for AppError {
    fn from(value: DispatchError) -> Self {
        Self::Dispatch(value)
    }
}

impl From<TransportError> for AppError {
    fn from(value: TransportError) -> Self {
        Self::Transport(value)
    }
}

impl From<ReceiptError> for AppError {
    fn from(value: ReceiptError) -> Self {
        Self::Receipt(value)
    }
}

impl From<ExportError> for AppError {
    fn from(value: ExportError) -> Self {
        Self::Export(value)
    }
}

impl From<AdmissionServiceError> for AppError {
    fn from(value: AdmissionServiceError) -> Self {
        Self::Admission(value)
    }
}
